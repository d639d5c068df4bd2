//! Per-request view of a [`Map`] and the match engine.

use crate::accept::{AcceptMap, Quality};
use crate::captures::Captures;
use crate::map::{Compiled, Map};
use crate::pattern::{expand_template, PathMatch};
use crate::rule::{RedirectTarget, Rule};

use http::Method;
use log::warn;
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use smallvec::SmallVec;

/// Quoting set for request paths embedded in a `Location` URL: everything
/// outside the unreserved set except `/`, `:`, `|` and `+`.
const PATH_QUOTE: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~')
    .remove(b'/')
    .remove(b':')
    .remove(b'|')
    .remove(b'+');

/// The single, closed result of one match attempt.
#[derive(Debug)]
pub enum MatchOutcome<'a> {
    /// A rule matched; the handler is identified by `rule.endpoint()`.
    Matched {
        rule: &'a Rule,
        values: Captures<'a>,
    },
    /// The request URL must be canonicalized first (trailing slash, alias
    /// or default-parameter form). Maps to 301/308 with `Location`.
    Redirect(String),
    /// The path matched but no rule allows this method. Carries the union
    /// of methods declared across every rule at that path, sorted.
    MethodNotAllowed(Vec<Method>),
    /// Path and method matched, but every mimetype-constrained candidate
    /// was rejected by the `Accept` header.
    NotAcceptable,
    NotFound,
}

/// Binds a [`Map`] to one request's environment: host, subdomain, script
/// path, scheme, path, method, query string and negotiated `Accept` map.
///
/// Matching never mutates the map; the outcome depends only on the table
/// contents and the request fields.
pub struct Adapter<'m> {
    map: &'m Map,
    server_name: Box<str>,
    script_name: Box<str>,
    subdomain: Box<str>,
    url_scheme: Box<str>,
    default_method: Method,
    path_info: Box<str>,
    query_args: Option<Box<str>>,
    accept: AcceptMap,
}

impl<'m> Adapter<'m> {
    pub(crate) fn new(map: &'m Map, server_name: &str) -> Self {
        Self {
            map,
            server_name: server_name.into(),
            script_name: "/".into(),
            subdomain: "".into(),
            url_scheme: "http".into(),
            default_method: Method::GET,
            path_info: "/".into(),
            query_args: None,
            accept: AcceptMap::default(),
        }
    }

    pub fn script_name(mut self, script_name: &str) -> Self {
        self.script_name = normalize_script(script_name);
        self
    }

    pub fn subdomain(mut self, subdomain: &str) -> Self {
        self.subdomain = subdomain.into();
        self
    }

    pub fn scheme(mut self, scheme: &str) -> Self {
        self.url_scheme = scheme.into();
        self
    }

    pub fn method(mut self, method: Method) -> Self {
        self.default_method = method;
        self
    }

    pub fn path(mut self, path_info: &str) -> Self {
        self.path_info = path_info.into();
        self
    }

    pub fn query(mut self, query_args: &str) -> Self {
        self.query_args = Some(query_args.into());
        self
    }

    /// Parses and attaches the request's `Accept` header.
    pub fn accept(mut self, header: &str) -> Self {
        self.accept = AcceptMap::parse(header);
        self
    }

    pub fn accept_map(mut self, accept: AcceptMap) -> Self {
        self.accept = accept;
        self
    }

    pub fn server_name(&self) -> &str {
        &self.server_name
    }

    pub fn url_scheme(&self) -> &str {
        &self.url_scheme
    }

    /// Matches the bound request, or `path_info`/`method` overrides,
    /// against the map.
    ///
    /// Single pass over the rules in registration order. Slash and alias
    /// redirects terminate immediately. Method misses are accumulated so a
    /// 405 can list every declared method at the path. Mimetype-constrained
    /// rules win immediately on an exact (`q == 1`) match, are deferred on a
    /// fractional quality and marked as mismatch on zero. After the pass:
    /// 405 before the best deferred candidate (quality ties go to the
    /// earliest registered rule) before 406 before 404.
    pub fn matches<'s>(
        &'s self,
        path_info: Option<&'s str>,
        method: Option<&Method>,
    ) -> MatchOutcome<'s> {
        let compiled = self.map.update();
        let path = path_info.unwrap_or(&self.path_info);
        let method = method.unwrap_or(&self.default_method);
        let request_prefix: &str = if self.map.is_host_matching() {
            &self.server_name
        } else {
            &self.subdomain
        };

        let mut allowed: Vec<Method> = Vec::new();
        let mut deferred: SmallVec<[(Quality, usize, Captures<'s>); 4]> = SmallVec::new();
        let mut mime_mismatch = false;

        for &idx in &compiled.match_order {
            let rule = &self.map.rules()[idx];
            if self.map.rule_prefix(rule) != request_prefix {
                continue;
            }
            let values = match rule.match_path(path, self.map.is_strict()) {
                PathMatch::NoMatch => continue,
                PathMatch::SlashNeeded => {
                    let slashed = format!("{}/", utf8_percent_encode(path, PATH_QUOTE));
                    return MatchOutcome::Redirect(
                        self.make_redirect_url(&slashed, self.query_args.as_deref()),
                    );
                }
                PathMatch::Match(values) => values,
            };

            if rule.is_alias() {
                match self.alias_redirect_url(rule, &values) {
                    Some(url) => return MatchOutcome::Redirect(url),
                    None => {
                        warn!(
                            "alias rule {} has no canonical peer for endpoint {:?}",
                            rule.pattern(),
                            rule.endpoint()
                        );
                        continue;
                    }
                }
            }

            if let Some(methods) = rule.methods() {
                if !methods.contains(method) {
                    for m in methods {
                        if !allowed.contains(m) {
                            allowed.push(m.clone());
                        }
                    }
                    continue;
                }
            }

            if let Some(mimetype) = rule.mimetype() {
                let q = self.accept.quality(mimetype);
                if q.is_zero() {
                    mime_mismatch = true;
                    continue;
                }
                if q < Quality::MAX {
                    deferred.push((q, idx, values));
                    continue;
                }
            }

            return self.finish_match(compiled, rule, values, method);
        }

        if !allowed.is_empty() {
            allowed.sort_by(|a, b| a.as_str().cmp(b.as_str()));
            return MatchOutcome::MethodNotAllowed(allowed);
        }

        if !deferred.is_empty() {
            // strict '>' keeps the earliest registered rule on quality ties
            let mut best = 0;
            for (i, candidate) in deferred.iter().enumerate().skip(1) {
                if candidate.0 > deferred[best].0 {
                    best = i;
                }
            }
            let (_, idx, values) = deferred.swap_remove(best);
            return self.finish_match(compiled, &self.map.rules()[idx], values, method);
        }

        if mime_mismatch {
            return MatchOutcome::NotAcceptable;
        }
        MatchOutcome::NotFound
    }

    /// Reverse URL building: the path for `endpoint` with the given
    /// variable values, from the first rule that can produce it.
    pub fn build(&self, endpoint: &str, values: &[(&str, &str)]) -> Option<String> {
        let compiled = self.map.update();
        let rules = compiled.by_endpoint.get(endpoint)?;
        for &idx in rules {
            let rule = &self.map.rules()[idx];
            if rule.is_alias() {
                continue;
            }
            if let Some(path) = rule.build_path(values) {
                return Some(path);
            }
        }
        None
    }

    fn finish_match<'s>(
        &'s self,
        compiled: &'s Compiled,
        rule: &'s Rule,
        values: Captures<'s>,
        method: &Method,
    ) -> MatchOutcome<'s> {
        if self.map.redirects_defaults() {
            if let Some(url) = self.default_redirect_url(compiled, rule, &values, method) {
                return MatchOutcome::Redirect(url);
            }
        }

        match rule.redirect_to() {
            Some(RedirectTarget::Template(template)) => {
                let target = expand_template(template, |name| {
                    values
                        .get(name)
                        .or_else(|| rule.defaults().get(name).map(|v| &**v))
                });
                return MatchOutcome::Redirect(self.absolute_url(&target));
            }
            Some(RedirectTarget::Callable(f)) => {
                let target = f(self, &values);
                return MatchOutcome::Redirect(self.absolute_url(&target));
            }
            None => {}
        }

        MatchOutcome::Matched { rule, values }
    }

    /// Canonical redirect for a rule whose endpoint peers declare defaults
    /// covering the captured values.
    fn default_redirect_url(
        &self,
        compiled: &Compiled,
        rule: &Rule,
        values: &Captures<'_>,
        method: &Method,
    ) -> Option<String> {
        let peers = compiled.by_endpoint.get(rule.endpoint())?;
        for &idx in peers {
            let peer = &self.map.rules()[idx];
            if std::ptr::eq(peer, rule) {
                break;
            }
            if peer.provides_defaults_for(rule) && peer.suitable_for(values, Some(method)) {
                let path = peer.build_path(&values[..])?;
                return Some(self.make_redirect_url(&path, self.query_args.as_deref()));
            }
        }
        None
    }

    fn alias_redirect_url(&self, rule: &Rule, values: &Captures<'_>) -> Option<String> {
        let path = self.build(rule.endpoint(), &values[..])?;
        Some(self.make_redirect_url(&path, self.query_args.as_deref()))
    }

    fn external_base(&self) -> String {
        let mut base = format!("{}://", self.url_scheme);
        if !self.subdomain.is_empty() {
            base.push_str(&self.subdomain);
            base.push('.');
        }
        base.push_str(&self.server_name);
        base.push_str(&self.script_name);
        base
    }

    fn make_redirect_url(&self, path: &str, query_args: Option<&str>) -> String {
        let mut url = self.external_base();
        url.push_str(path.trim_start_matches('/'));
        if let Some(query) = query_args {
            if !query.is_empty() {
                url.push('?');
                url.push_str(query);
            }
        }
        url
    }

    fn absolute_url(&self, target: &str) -> String {
        if target.contains("://") {
            return target.to_owned();
        }
        let mut url = self.external_base();
        url.push_str(target.trim_start_matches('/'));
        url
    }
}

fn normalize_script(script_name: &str) -> Box<str> {
    let mut out = String::with_capacity(script_name.len() + 2);
    if !script_name.starts_with('/') {
        out.push('/');
    }
    out.push_str(script_name);
    if !out.ends_with('/') {
        out.push('/');
    }
    out.into_boxed_str()
}
