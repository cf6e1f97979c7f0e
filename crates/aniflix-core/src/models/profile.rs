use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const DEFAULT_PROFILE_PICTURE: &str = "/profile.jpg";
pub const DEFAULT_BANNER_IMAGE: &str = "/banner.jpg";

/// Per-user profile and its aggregate counters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Profile {
    pub user_id: i64,
    pub username: Option<String>,
    pub description: String,
    pub profile_picture: String,
    pub banner_image: String,
    /// Number of watchlist entries currently in `completed`.
    pub total_anime_watched: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Partial profile update. `None` leaves a field untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProfilePatch {
    pub description: Option<String>,
    pub profile_picture: Option<String>,
    pub banner_image: Option<String>,
}

impl ProfilePatch {
    pub fn is_empty(&self) -> bool {
        self.description.is_none() && self.profile_picture.is_none() && self.banner_image.is_none()
    }
}
