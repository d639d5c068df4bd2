//! URL routing with HTTP content-type negotiation.
//!
//! Several rules may share a path and method while differing in the MIME
//! type they produce; matching picks the rule whose declared mimetype best
//! satisfies the request's `Accept` header, or yields a precise redirect
//! or HTTP-level failure.

#![forbid(unsafe_code)]

mod accept;
mod adapter;
mod captures;
mod error;
mod map;
mod pattern;
mod rule;

pub use crate::accept::{AcceptMap, Quality};
pub use crate::adapter::{Adapter, MatchOutcome};
pub use crate::captures::Captures;
pub use crate::error::RegistrationError;
pub use crate::map::Map;
pub use crate::pattern::PatternError;
pub use crate::rule::{RedirectTarget, Rule, RuleBuilder};

pub use http::Method;
