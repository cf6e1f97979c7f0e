use thiserror::Error;

/// Errors from the Jikan REST client.
#[derive(Debug, Error)]
pub enum JikanError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("invalid URL: {0}")]
    Url(#[from] url::ParseError),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("anime {0} not found")]
    NotFound(u64),

    #[error("parse error: {0}")]
    Parse(String),
}

impl crate::traits::LookupError for JikanError {
    fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}
