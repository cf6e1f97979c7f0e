//! Trait definitions for anime metadata catalogs.
//!
//! Every catalog client (AniList, Jikan) implements these traits, so the
//! runtime can look anime up without caring which service answers.

use std::future::Future;
use std::sync::LazyLock;

use chrono::Datelike;
use regex::Regex;

/// A read-only anime metadata catalog.
pub trait CatalogService: Send + Sync {
    type Error: LookupError;

    /// Fetch full details for one anime.
    fn get_anime(
        &self,
        anime_id: u64,
    ) -> impl Future<Output = Result<AnimeDetails, Self::Error>> + Send;

    /// Search for anime by title.
    fn search_anime(
        &self,
        query: &str,
        page: u32,
    ) -> impl Future<Output = Result<SearchPage, Self::Error>> + Send;

    /// Most popular anime, optionally restricted to one genre.
    ///
    /// Catalogs that filter genres after paging (Jikan) may return a short
    /// or empty page with `has_next` still set; keep paging for more.
    fn trending(
        &self,
        genre: Option<&str>,
        page: u32,
    ) -> impl Future<Output = Result<SearchPage, Self::Error>> + Send;

    /// Browse the anime airing in a given season.
    fn browse_season(
        &self,
        season: AnimeSeason,
        year: u32,
        page: u32,
    ) -> impl Future<Output = Result<SearchPage, Self::Error>> + Send;
}

/// Catalog errors tell a missing anime apart from a failed request.
pub trait LookupError: std::error::Error + Send + Sync + 'static {
    fn is_not_found(&self) -> bool;
}

/// A search or browse result from any catalog.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct AnimeSearchResult {
    pub service_id: u64,
    pub title: String,
    pub episodes: Option<u32>,
    pub cover_url: Option<String>,
    /// Community score on a 0-10 scale.
    pub mean_score: Option<f32>,
    pub genres: Vec<String>,
}

/// A catalog date where any part may be unknown.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct FuzzyDate {
    pub year: Option<i32>,
    pub month: Option<u32>,
    pub day: Option<u32>,
}

/// Full details for one anime.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct AnimeDetails {
    pub service_id: u64,
    pub title: String,
    pub description: Option<String>,
    pub genres: Vec<String>,
    /// `None` while the episode count is not known yet.
    pub episodes: Option<u32>,
    pub mean_score: Option<f32>,
    pub cover_url: Option<String>,
    pub banner_url: Option<String>,
    pub start_date: FuzzyDate,
}

/// A page of search or browse results.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct SearchPage {
    pub items: Vec<AnimeSearchResult>,
    pub has_next: bool,
}

/// Anime season (quarter of the year).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnimeSeason {
    Winter,
    Spring,
    Summer,
    Fall,
}

impl AnimeSeason {
    /// Convert to AniList GraphQL `MediaSeason` enum value.
    pub fn to_anilist_str(self) -> &'static str {
        match self {
            Self::Winter => "WINTER",
            Self::Spring => "SPRING",
            Self::Summer => "SUMMER",
            Self::Fall => "FALL",
        }
    }

    /// Path segment used by Jikan's `/seasons/{year}/{season}`.
    pub fn to_jikan_str(self) -> &'static str {
        match self {
            Self::Winter => "winter",
            Self::Spring => "spring",
            Self::Summer => "summer",
            Self::Fall => "fall",
        }
    }

    pub fn from_month(month: u32) -> Self {
        match month {
            1..=3 => Self::Winter,
            4..=6 => Self::Spring,
            7..=9 => Self::Summer,
            _ => Self::Fall,
        }
    }

    /// Determine the current anime season and year.
    pub fn current() -> (Self, u32) {
        let now = chrono::Local::now();
        (Self::from_month(now.month()), now.year() as u32)
    }
}

impl std::str::FromStr for AnimeSeason {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "winter" => Ok(Self::Winter),
            "spring" => Ok(Self::Spring),
            "summer" => Ok(Self::Summer),
            "fall" | "autumn" => Ok(Self::Fall),
            other => Err(format!("unknown season: {other}")),
        }
    }
}

impl std::fmt::Display for AnimeSeason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Winter => write!(f, "Winter"),
            Self::Spring => write!(f, "Spring"),
            Self::Summer => write!(f, "Summer"),
            Self::Fall => write!(f, "Fall"),
        }
    }
}

static RE_TAG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]+>").unwrap());

/// Remove HTML tags from catalog descriptions.
pub(crate) fn strip_tags(html: &str) -> String {
    RE_TAG.replace_all(html, "").trim().to_string()
}
