use crate::adapter::Adapter;
use crate::error::RegistrationError;
use crate::rule::Rule;

use std::collections::HashMap;
use std::sync::OnceLock;

use log::debug;
use smallvec::SmallVec;

/// Ordered collection of [`Rule`]s.
///
/// The map has two lifecycle phases: a single-writer registration phase
/// (`add`, `associate`, `bind_mimetype`) and a read-only serving phase that
/// starts with the first `bind()`. Compilation happens at most once per
/// mutation epoch; concurrent first-time callers are serialized by the
/// `OnceLock`.
#[derive(Debug)]
pub struct Map {
    rules: Vec<Rule>,
    handlers: HashMap<Box<str>, SmallVec<[Box<str>; 1]>>,
    default_subdomain: Box<str>,
    strict_slashes: bool,
    redirect_defaults: bool,
    host_matching: bool,
    compiled: OnceLock<Compiled>,
}

#[derive(Debug)]
pub(crate) struct Compiled {
    /// Matchable rules (build-only excluded) in registration order.
    pub(crate) match_order: Vec<usize>,
    /// Endpoint name to rule indices, registration order preserved.
    pub(crate) by_endpoint: HashMap<Box<str>, SmallVec<[usize; 2]>>,
}

impl Default for Map {
    fn default() -> Self {
        Self::new()
    }
}

impl Map {
    pub fn new() -> Self {
        Self {
            rules: Vec::new(),
            handlers: HashMap::new(),
            default_subdomain: "".into(),
            strict_slashes: true,
            redirect_defaults: true,
            host_matching: false,
            compiled: OnceLock::new(),
        }
    }

    pub fn strict_slashes(mut self, strict: bool) -> Self {
        self.strict_slashes = strict;
        self
    }

    pub fn redirect_defaults(mut self, redirect: bool) -> Self {
        self.redirect_defaults = redirect;
        self
    }

    /// Match rules by host instead of subdomain.
    pub fn host_matching(mut self, host: bool) -> Self {
        self.host_matching = host;
        self
    }

    pub fn default_subdomain(mut self, subdomain: &str) -> Self {
        self.default_subdomain = subdomain.into();
        self
    }

    /// Appends a rule. Registration order decides priority among rules that
    /// are otherwise equally eligible.
    pub fn add(&mut self, rule: Rule) -> &mut Self {
        debug!("rule registered: {} -> {}", rule.pattern(), rule.endpoint());
        self.rules.push(rule);
        self.compiled = OnceLock::new();
        self
    }

    /// Records that `handler` was registered under `endpoint`. A handler
    /// may be associated with several endpoints.
    pub fn associate(&mut self, handler: &str, endpoint: &str) -> &mut Self {
        self.handlers
            .entry(handler.into())
            .or_default()
            .push(endpoint.into());
        self.compiled = OnceLock::new();
        self
    }

    /// Sets `mimetype` on every rule whose endpoint is associated with
    /// `handler`. Must happen before the map is compiled for serving.
    pub fn bind_mimetype(&mut self, handler: &str, mimetype: &str) -> Result<(), RegistrationError> {
        if self.compiled.get().is_some() {
            return Err(RegistrationError::MapCompiled);
        }
        let endpoints = self
            .handlers
            .get(handler)
            .ok_or_else(|| RegistrationError::UnknownHandler(handler.into()))?;

        debug!("binding mimetype {:?} to handler {:?}", mimetype, handler);
        for rule in self.rules.iter_mut() {
            if endpoints.iter().any(|ep| ep.as_ref() == rule.endpoint()) {
                rule.set_mimetype(mimetype)?;
            }
        }
        Ok(())
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    pub fn is_compiled(&self) -> bool {
        self.compiled.get().is_some()
    }

    /// Binds the map to one request's environment. Further request fields
    /// are filled in on the returned [`Adapter`] before matching.
    pub fn bind(&self, server_name: &str) -> Adapter<'_> {
        self.update();
        Adapter::new(self, server_name)
    }

    /// One-time compilation for the current mutation epoch.
    pub(crate) fn update(&self) -> &Compiled {
        self.compiled.get_or_init(|| self.compile())
    }

    fn compile(&self) -> Compiled {
        let mut match_order = Vec::with_capacity(self.rules.len());
        let mut by_endpoint: HashMap<Box<str>, SmallVec<[usize; 2]>> = HashMap::new();
        for (i, rule) in self.rules.iter().enumerate() {
            by_endpoint.entry(rule.endpoint().into()).or_default().push(i);
            if !rule.is_build_only() {
                match_order.push(i);
            }
        }
        debug!(
            "routing table compiled: {} rules, {} endpoints",
            self.rules.len(),
            by_endpoint.len()
        );
        Compiled {
            match_order,
            by_endpoint,
        }
    }

    pub(crate) fn is_strict(&self) -> bool {
        self.strict_slashes
    }

    pub(crate) fn redirects_defaults(&self) -> bool {
        self.redirect_defaults
    }

    pub(crate) fn is_host_matching(&self) -> bool {
        self.host_matching
    }

    /// The host-or-subdomain prefix a rule is constrained to.
    pub(crate) fn rule_prefix<'a>(&'a self, rule: &'a Rule) -> &'a str {
        if self.host_matching {
            rule.host().unwrap_or("")
        } else {
            rule.subdomain().unwrap_or(&self.default_subdomain)
        }
    }
}
