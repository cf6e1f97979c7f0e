use thiserror::Error;

/// Why a proposed watchlist change was refused.
///
/// Every variant is detected before anything is written.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ReconcileError {
    #[error("invalid status: {0:?}")]
    InvalidStatus(String),

    #[error("this anime has not released yet, only \"Plan to Watch\" is allowed")]
    NotYetReleased,

    #[error(
        "progress must be a whole number between 0 and {total} (got {episodes}){}",
        unknown_total_hint(.total)
    )]
    InvalidProgress { episodes: f64, total: u32 },

    #[error("rating must be between 0 and 10 (got {0})")]
    InvalidScore(f64),

    #[error("catalog unavailable, release state unknown: {0}")]
    CatalogUnavailable(String),
}

fn unknown_total_hint(total: &u32) -> &'static str {
    if *total == 0 {
        "; the catalog does not list an episode count for this anime yet"
    } else {
        ""
    }
}

#[derive(Debug, Error)]
pub enum AniflixError {
    #[error(transparent)]
    Rejected(#[from] ReconcileError),

    #[error("store unavailable: {0}")]
    StoreUnavailable(#[from] rusqlite::Error),

    #[error("store unavailable: database worker stopped")]
    StoreClosed,

    #[error("not found: {0}")]
    NotFound(String),

    #[error("username already taken: {0}")]
    UsernameTaken(String),

    #[error("missing fields: {0}")]
    MissingFields(String),

    #[error("config error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl AniflixError {
    /// Store failures are transient from the caller's point of view; nothing
    /// in this crate retries them.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::StoreUnavailable(_) | Self::StoreClosed)
    }

    /// The rejection kind, if this error is a validation rejection.
    pub fn rejection(&self) -> Option<&ReconcileError> {
        match self {
            Self::Rejected(e) => Some(e),
            _ => None,
        }
    }
}
