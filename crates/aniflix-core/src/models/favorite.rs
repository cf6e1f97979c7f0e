use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A favorited anime. Favorites are a plain set with no transition rules.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Favorite {
    pub user_id: i64,
    pub anime_id: i64,
    pub title: String,
    pub rating: Option<f32>,
    pub episodes: Option<u32>,
    pub image: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Caller-supplied fields for adding a favorite. `title` and `image` are required.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FavoriteInput {
    pub title: String,
    pub rating: Option<f32>,
    pub episodes: Option<u32>,
    pub image: String,
}
