use crate::pattern::PatternError;

/// Setup-time failure. Raised while rules are registered or mimetypes are
/// bound, never during request matching.
#[derive(Debug, thiserror::Error)]
pub enum RegistrationError {
    #[error("no endpoint is registered for handler {0:?}")]
    UnknownHandler(Box<str>),

    #[error("mimetype binding is not allowed after the map has been compiled")]
    MapCompiled,

    #[error("a mimetype is already bound to the rule for endpoint {0:?}")]
    MimetypeRebound(Box<str>),

    #[error(transparent)]
    InvalidPattern(#[from] PatternError),
}
