use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    /// Fatal at startup: the artifacts cannot be served as given.
    #[error("Invalid configuration: {0}")]
    Configuration(String),

    #[error("Invalid vector dimension: expected {expected}, got {actual}")]
    InvalidDimension { expected: usize, actual: usize },

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl Error {
    pub(crate) fn config(msg: impl Into<String>) -> Self {
        Error::Configuration(msg.into())
    }

    /// True for errors that must abort startup rather than fail one request.
    #[inline]
    pub fn is_fatal(&self) -> bool {
        matches!(self, Error::Configuration(_))
    }
}
