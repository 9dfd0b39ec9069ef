use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    #[error("html parse error: {0}")]
    HtmlParse(String),
    #[error("invalid locator: {0}")]
    InvalidLocator(String),
    #[error("invalid search pattern: {0}")]
    InvalidPattern(String),
    #[error("node not found: {0}")]
    NodeNotFound(String),
    /// The DOM provider saw a node whose script peer is still being built.
    #[error("node not yet constructed: {0}")]
    NotYetConstructed(String),
    #[error("page index has no position for {node}\n{dump}")]
    IndexInconsistency { node: String, dump: String },
}

impl Error {
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::NotYetConstructed(_))
    }
}

impl From<crate::regex::RegexError> for Error {
    fn from(value: crate::regex::RegexError) -> Self {
        Self::InvalidPattern(value.to_string())
    }
}
