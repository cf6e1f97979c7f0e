//! Runtime selection between the supported catalogs.

use std::time::Duration;

use thiserror::Error;

use crate::anilist::{AniListClient, AniListError};
use crate::jikan::{JikanClient, JikanError};
use crate::traits::{AnimeDetails, AnimeSeason, CatalogService, LookupError, SearchPage};

/// Which catalog answers lookups.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CatalogKind {
    AniList,
    Jikan,
}

impl std::str::FromStr for CatalogKind {
    type Err = CatalogError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "anilist" => Ok(Self::AniList),
            "jikan" | "mal" => Ok(Self::Jikan),
            other => Err(CatalogError::UnknownCatalog(other.to_string())),
        }
    }
}

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error(transparent)]
    AniList(#[from] AniListError),

    #[error(transparent)]
    Jikan(#[from] JikanError),

    #[error("unknown catalog: {0}")]
    UnknownCatalog(String),
}

impl LookupError for CatalogError {
    fn is_not_found(&self) -> bool {
        match self {
            Self::AniList(e) => e.is_not_found(),
            Self::Jikan(e) => e.is_not_found(),
            Self::UnknownCatalog(_) => false,
        }
    }
}

/// Connection settings shared by both clients.
#[derive(Debug, Clone)]
pub struct CatalogSettings {
    pub anilist_url: String,
    pub jikan_url: String,
    pub timeout: Duration,
    pub page_size: u32,
}

impl Default for CatalogSettings {
    fn default() -> Self {
        Self {
            anilist_url: crate::anilist::client::DEFAULT_API_URL.into(),
            jikan_url: crate::jikan::client::DEFAULT_API_URL.into(),
            timeout: Duration::from_secs(10),
            page_size: 12,
        }
    }
}

/// The configured catalog client.
pub enum Catalog {
    AniList(AniListClient),
    Jikan(JikanClient),
}

impl Catalog {
    pub fn new(kind: CatalogKind, settings: &CatalogSettings) -> Result<Self, CatalogError> {
        tracing::debug!(?kind, timeout = ?settings.timeout, "Building catalog client");
        Ok(match kind {
            CatalogKind::AniList => Self::AniList(AniListClient::new(
                settings.anilist_url.clone(),
                settings.timeout,
                settings.page_size,
            )?),
            CatalogKind::Jikan => Self::Jikan(JikanClient::new(
                &settings.jikan_url,
                settings.timeout,
                settings.page_size,
            )?),
        })
    }

    pub fn kind(&self) -> CatalogKind {
        match self {
            Self::AniList(_) => CatalogKind::AniList,
            Self::Jikan(_) => CatalogKind::Jikan,
        }
    }
}

impl CatalogService for Catalog {
    type Error = CatalogError;

    async fn get_anime(&self, anime_id: u64) -> Result<AnimeDetails, CatalogError> {
        Ok(match self {
            Self::AniList(c) => c.get_anime(anime_id).await?,
            Self::Jikan(c) => c.get_anime(anime_id).await?,
        })
    }

    async fn search_anime(&self, query: &str, page: u32) -> Result<SearchPage, CatalogError> {
        Ok(match self {
            Self::AniList(c) => c.search_anime(query, page).await?,
            Self::Jikan(c) => c.search_anime(query, page).await?,
        })
    }

    async fn trending(&self, genre: Option<&str>, page: u32) -> Result<SearchPage, CatalogError> {
        Ok(match self {
            Self::AniList(c) => c.trending(genre, page).await?,
            Self::Jikan(c) => c.trending(genre, page).await?,
        })
    }

    async fn browse_season(
        &self,
        season: AnimeSeason,
        year: u32,
        page: u32,
    ) -> Result<SearchPage, CatalogError> {
        Ok(match self {
            Self::AniList(c) => c.browse_season(season, year, page).await?,
            Self::Jikan(c) => c.browse_season(season, year, page).await?,
        })
    }
}
