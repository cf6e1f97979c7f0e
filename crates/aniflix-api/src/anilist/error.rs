use thiserror::Error;

/// Errors from the AniList GraphQL client.
#[derive(Debug, Error)]
pub enum AniListError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("GraphQL error: {0}")]
    GraphQL(String),

    #[error("anime {0} not found")]
    NotFound(u64),

    #[error("parse error: {0}")]
    Parse(String),
}

impl crate::traits::LookupError for AniListError {
    fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}
