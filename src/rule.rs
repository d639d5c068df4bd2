use crate::adapter::Adapter;
use crate::captures::Captures;
use crate::error::RegistrationError;
use crate::pattern::{PathMatch, PathPattern};

use std::collections::{HashMap, HashSet};
use std::fmt;

use http::Method;

/// Target of a `redirect_to` rule: either a path template with `{name}`
/// placeholders or a callable computing the URL from the request context.
pub enum RedirectTarget {
    Template(Box<str>),
    Callable(Box<dyn Fn(&Adapter<'_>, &Captures<'_>) -> String + Send + Sync>),
}

impl fmt::Debug for RedirectTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Template(t) => f.debug_tuple("Template").field(t).finish(),
            Self::Callable(_) => f.write_str("Callable(..)"),
        }
    }
}

/// One route entry: a path template plus method set, endpoint id, optional
/// mimetype and legacy-redirect settings.
///
/// Rules are immutable once the map is compiled; only the mimetype may be
/// set, exactly once, between registration and compilation.
#[derive(Debug)]
pub struct Rule {
    pattern: Box<str>,
    matcher: PathPattern,
    methods: Option<HashSet<Method>>,
    endpoint: Box<str>,
    defaults: HashMap<Box<str>, Box<str>>,
    redirect_to: Option<RedirectTarget>,
    build_only: bool,
    alias: bool,
    strict_slashes: Option<bool>,
    subdomain: Option<Box<str>>,
    host: Option<Box<str>>,
    mimetype: Option<Box<str>>,
}

impl Rule {
    pub fn build(pattern: &str) -> RuleBuilder {
        RuleBuilder {
            pattern: pattern.to_owned(),
            methods: None,
            endpoint: None,
            defaults: HashMap::new(),
            redirect_to: None,
            build_only: false,
            alias: false,
            strict_slashes: None,
            subdomain: None,
            host: None,
            mimetype: None,
        }
    }

    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn mimetype(&self) -> Option<&str> {
        self.mimetype.as_deref()
    }

    /// `None` means the rule accepts any method.
    pub fn methods(&self) -> Option<&HashSet<Method>> {
        self.methods.as_ref()
    }

    pub fn defaults(&self) -> &HashMap<Box<str>, Box<str>> {
        &self.defaults
    }

    pub fn is_build_only(&self) -> bool {
        self.build_only
    }

    pub fn is_alias(&self) -> bool {
        self.alias
    }

    pub(crate) fn redirect_to(&self) -> Option<&RedirectTarget> {
        self.redirect_to.as_ref()
    }

    pub(crate) fn subdomain(&self) -> Option<&str> {
        self.subdomain.as_deref()
    }

    pub(crate) fn host(&self) -> Option<&str> {
        self.host.as_deref()
    }

    pub(crate) fn match_path<'p>(&'p self, path: &'p str, map_strict: bool) -> PathMatch<'p> {
        let mut outcome = self
            .matcher
            .matches(path, self.strict_slashes.unwrap_or(map_strict));
        // defaults not captured from the URL still reach the handler
        if let PathMatch::Match(values) = &mut outcome {
            for (name, value) in &self.defaults {
                if values.get(name).is_none() {
                    values.buf.push((&**name, &**value));
                }
            }
        }
        outcome
    }

    pub(crate) fn set_mimetype(&mut self, mimetype: &str) -> Result<(), RegistrationError> {
        if self.mimetype.is_some() {
            return Err(RegistrationError::MimetypeRebound(self.endpoint.clone()));
        }
        self.mimetype = Some(mimetype.into());
        Ok(())
    }

    /// Builds the rule's path with captures resolved from `values`, falling
    /// back to the rule's defaults.
    pub(crate) fn build_path<'a>(&'a self, values: &[(&'a str, &'a str)]) -> Option<String> {
        let lookup = |name: &str| {
            values
                .iter()
                .find(|&&(k, _)| k == name)
                .map(|&(_, v)| v)
                .or_else(|| self.defaults.get(name).map(|v| &**v))
        };
        self.matcher.build(lookup)
    }

    /// Whether this rule's defaults canonicalize URLs matched by `other`.
    pub(crate) fn provides_defaults_for(&self, other: &Rule) -> bool {
        !self.build_only
            && !self.defaults.is_empty()
            && !std::ptr::eq(self, other)
            && self.endpoint == other.endpoint
    }

    /// Whether the rule could produce a URL for `values` under `method`:
    /// every capture is covered by `values` or a default, and no default
    /// contradicts a captured value.
    pub(crate) fn suitable_for(&self, values: &Captures<'_>, method: Option<&Method>) -> bool {
        if let (Some(m), Some(methods)) = (method, &self.methods) {
            if !methods.contains(m) {
                return false;
            }
        }
        for name in self.matcher.capture_names() {
            if !self.defaults.contains_key(name) && values.get(name).is_none() {
                return false;
            }
        }
        for (key, value) in &self.defaults {
            if let Some(v) = values.get(key) {
                if v != value.as_ref() {
                    return false;
                }
            }
        }
        true
    }
}

pub struct RuleBuilder {
    pattern: String,
    methods: Option<HashSet<Method>>,
    endpoint: Option<Box<str>>,
    defaults: HashMap<Box<str>, Box<str>>,
    redirect_to: Option<RedirectTarget>,
    build_only: bool,
    alias: bool,
    strict_slashes: Option<bool>,
    subdomain: Option<Box<str>>,
    host: Option<Box<str>>,
    mimetype: Option<Box<str>>,
}

impl RuleBuilder {
    pub fn endpoint(mut self, endpoint: &str) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    /// Restricts the rule to the given methods. `HEAD` is implied by `GET`.
    pub fn methods<I: IntoIterator<Item = Method>>(mut self, methods: I) -> Self {
        let mut set: HashSet<Method> = methods.into_iter().collect();
        if set.contains(&Method::GET) {
            set.insert(Method::HEAD);
        }
        self.methods = Some(set);
        self
    }

    pub fn default(mut self, name: &str, value: &str) -> Self {
        self.defaults.insert(name.into(), value.into());
        self
    }

    pub fn redirect_to(mut self, template: &str) -> Self {
        self.redirect_to = Some(RedirectTarget::Template(template.into()));
        self
    }

    pub fn redirect_with(
        mut self,
        f: impl Fn(&Adapter<'_>, &Captures<'_>) -> String + Send + Sync + 'static,
    ) -> Self {
        self.redirect_to = Some(RedirectTarget::Callable(Box::new(f)));
        self
    }

    /// Excludes the rule from matching; it stays usable for URL building.
    pub fn build_only(mut self) -> Self {
        self.build_only = true;
        self
    }

    /// Marks the rule as a legacy alias: matching it redirects to the
    /// canonical URL of its endpoint.
    pub fn alias(mut self) -> Self {
        self.alias = true;
        self
    }

    pub fn strict_slashes(mut self, strict: bool) -> Self {
        self.strict_slashes = Some(strict);
        self
    }

    pub fn subdomain(mut self, subdomain: &str) -> Self {
        self.subdomain = Some(subdomain.into());
        self
    }

    pub fn host(mut self, host: &str) -> Self {
        self.host = Some(host.into());
        self
    }

    pub fn mimetype(mut self, mimetype: &str) -> Self {
        self.mimetype = Some(mimetype.into());
        self
    }

    /// Compiles the pattern. The endpoint defaults to the pattern text when
    /// none was given.
    pub fn finish(self) -> Result<Rule, RegistrationError> {
        let matcher = PathPattern::compile(&self.pattern)?;
        let endpoint = match self.endpoint {
            Some(endpoint) => endpoint,
            None => self.pattern.as_str().into(),
        };
        Ok(Rule {
            pattern: self.pattern.into_boxed_str(),
            matcher,
            methods: self.methods,
            endpoint,
            defaults: self.defaults,
            redirect_to: self.redirect_to,
            build_only: self.build_only,
            alias: self.alias,
            strict_slashes: self.strict_slashes,
            subdomain: self.subdomain,
            host: self.host,
            mimetype: self.mimetype,
        })
    }
}
