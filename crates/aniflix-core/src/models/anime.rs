use serde::{Deserialize, Serialize};

/// A catalog start date. Any part may be missing for unannounced titles.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReleaseDate {
    pub year: Option<i32>,
    pub month: Option<u32>,
    pub day: Option<u32>,
}

impl ReleaseDate {
    pub fn new(year: Option<i32>, month: Option<u32>, day: Option<u32>) -> Self {
        Self { year, month, day }
    }

    /// A title with no announced date at all.
    pub fn unannounced() -> Self {
        Self::default()
    }
}

/// The catalog facts reconciliation depends on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogSnapshot {
    pub total_episodes: u32,
    pub release_date: ReleaseDate,
}

/// Result of asking the catalog about an anime right before a write.
#[derive(Debug, Clone, PartialEq)]
pub enum CatalogLookup {
    Available(CatalogSnapshot),
    /// The lookup failed; the release state is unknown.
    Unavailable { reason: String },
}

impl CatalogLookup {
    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self::Unavailable {
            reason: reason.into(),
        }
    }
}
