use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ReconcileError;

/// User's watch status for a watchlist entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum WatchStatus {
    Watching,
    Completed,
    PlanToWatch,
    OnHold,
    Dropped,
}

impl WatchStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Watching => "Watching",
            Self::Completed => "Completed",
            Self::PlanToWatch => "Plan to Watch",
            Self::OnHold => "On Hold",
            Self::Dropped => "Dropped",
        }
    }

    /// Database and wire representation (lowercase, hyphenated).
    pub fn as_db_str(&self) -> &'static str {
        match self {
            Self::Watching => "watching",
            Self::Completed => "completed",
            Self::PlanToWatch => "plan-to-watch",
            Self::OnHold => "on-hold",
            Self::Dropped => "dropped",
        }
    }

    pub fn from_db_str(s: &str) -> Option<Self> {
        match s {
            "watching" => Some(Self::Watching),
            "completed" => Some(Self::Completed),
            "plan-to-watch" => Some(Self::PlanToWatch),
            "on-hold" => Some(Self::OnHold),
            "dropped" => Some(Self::Dropped),
            _ => None,
        }
    }

    /// Statuses that only make sense once an anime has started airing.
    pub fn requires_release(&self) -> bool {
        !matches!(self, Self::PlanToWatch)
    }

    pub const ALL: &[WatchStatus] = &[
        Self::Watching,
        Self::Completed,
        Self::PlanToWatch,
        Self::OnHold,
        Self::Dropped,
    ];
}

impl FromStr for WatchStatus {
    type Err = ReconcileError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_db_str(s.trim()).ok_or_else(|| ReconcileError::InvalidStatus(s.to_string()))
    }
}

impl std::fmt::Display for WatchStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A user's watchlist entry for one anime, as persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WatchlistEntry {
    pub user_id: i64,
    pub anime_id: i64,
    pub anime_title: String,
    pub image_url: Option<String>,
    pub status: WatchStatus,
    pub episodes_watched: u32,
    pub user_score: f32,
    /// Catalog episode count at the time of the last write.
    pub total_episodes: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
