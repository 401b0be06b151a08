use std::path::PathBuf;

/// Errors raised while building effects or preparing impulse responses.
///
/// Nothing on the streaming path returns these: `read`, parameter writes and
/// the dsp primitives clamp instead of failing.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("impulse response not found: {}", path.display())]
    ImpulseNotFound { path: PathBuf },

    #[error("unusable impulse response: {0}")]
    ImpulseFormat(String),
}

impl Error {
    pub(crate) fn invalid(message: impl Into<String>) -> Self {
        Error::InvalidArgument(message.into())
    }

    /// Does this error come from a bad constructor argument?
    pub fn is_invalid_argument(&self) -> bool {
        matches!(self, Error::InvalidArgument(_))
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
