mod db;

use std::time::Duration;

use chrono::Local;
use serde::Serialize;

use aniflix_api::{
    AnimeDetails, AnimeSeason, Catalog, CatalogKind, CatalogService, CatalogSettings, LookupError,
    SearchPage,
};
use aniflix_core::config::AppConfig;
use aniflix_core::error::{AniflixError, ReconcileError};
use aniflix_core::models::{
    CatalogLookup, CatalogSnapshot, Favorite, FavoriteInput, Profile, ProfilePatch, ReleaseDate,
    WatchStatus, WatchlistEntry,
};
use aniflix_core::reconcile::progress_percent;
use aniflix_core::watchlist::{EntrySubmission, SubmitOutcome};

pub use db::DbHandle;

#[derive(Debug, thiserror::Error)]
pub enum RuntimeError {
    #[error(transparent)]
    Core(#[from] AniflixError),
    #[error("config error: {0}")]
    Config(String),
    #[error("database error: {0}")]
    Database(String),
    #[error("api error: {0}")]
    Api(String),
    #[error("not found: {0}")]
    NotFound(String),
}

impl RuntimeError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Core(e) if e.is_retryable())
    }

    pub fn rejection(&self) -> Option<&ReconcileError> {
        match self {
            Self::Core(e) => e.rejection(),
            _ => None,
        }
    }
}

/// One watchlist row with its derived progress.
#[derive(Debug, Clone, Serialize)]
pub struct WatchlistRowDto {
    #[serde(flatten)]
    pub entry: WatchlistEntry,
    pub progress_percent: f64,
}

/// Catalog details merged with the user's own state for that anime.
#[derive(Debug, Clone, Serialize)]
pub struct AnimeDetailDto {
    pub details: AnimeDetails,
    pub total_episodes: u32,
    pub release_date: String,
    pub has_released: bool,
    pub entry: Option<WatchlistEntry>,
    pub is_favorite: bool,
}

/// Async facade over the store actor and the configured catalog.
pub struct Runtime<C = Catalog> {
    db: DbHandle,
    catalog: C,
}

impl Runtime<Catalog> {
    /// Open the database and build the configured primary catalog.
    pub fn from_config(config: AppConfig) -> Result<Self, RuntimeError> {
        let kind: CatalogKind = config
            .catalog
            .primary
            .parse()
            .map_err(|e: aniflix_api::CatalogError| RuntimeError::Config(e.to_string()))?;
        let catalog = Catalog::new(kind, &catalog_settings(&config))
            .map_err(|e| RuntimeError::Config(e.to_string()))?;

        let db_path =
            AppConfig::ensure_db_path().map_err(|e| RuntimeError::Config(e.to_string()))?;
        let db = DbHandle::open(&db_path).map_err(|e| RuntimeError::Database(e.to_string()))?;

        tracing::info!(catalog = ?catalog.kind(), db = %db_path.display(), "Runtime ready");
        Ok(Self::with_parts(db, catalog))
    }
}

fn catalog_settings(config: &AppConfig) -> CatalogSettings {
    CatalogSettings {
        anilist_url: config.catalog.anilist_url.clone(),
        jikan_url: config.catalog.jikan_url.clone(),
        timeout: Duration::from_secs(config.catalog.timeout_secs),
        page_size: config.catalog.page_size,
    }
}

/// The catalog facts reconciliation needs, taken from full details.
pub fn snapshot_from_details(details: &AnimeDetails) -> CatalogSnapshot {
    CatalogSnapshot {
        total_episodes: details.episodes.unwrap_or(0),
        release_date: ReleaseDate::new(
            details.start_date.year,
            details.start_date.month,
            details.start_date.day,
        ),
    }
}

fn anime_key(anime_id: i64) -> Result<u64, RuntimeError> {
    u64::try_from(anime_id).map_err(|_| RuntimeError::NotFound(format!("anime {anime_id}")))
}

impl<C: CatalogService> Runtime<C> {
    pub fn with_parts(db: DbHandle, catalog: C) -> Self {
        Self { db, catalog }
    }

    /// Ask the catalog about an anime right before a write.
    ///
    /// A missing anime is an error; any other failure becomes
    /// `CatalogLookup::Unavailable` and is left to the release gate.
    async fn catalog_lookup(
        &self,
        anime_id: i64,
    ) -> Result<(CatalogLookup, Option<AnimeDetails>), RuntimeError> {
        match self.catalog.get_anime(anime_key(anime_id)?).await {
            Ok(details) => Ok((
                CatalogLookup::Available(snapshot_from_details(&details)),
                Some(details),
            )),
            Err(e) if e.is_not_found() => Err(RuntimeError::NotFound(format!("anime {anime_id}"))),
            Err(e) => {
                tracing::warn!(anime_id, error = %e, "Catalog lookup failed");
                Ok((CatalogLookup::unavailable(e.to_string()), None))
            }
        }
    }

    // ── Watchlist ───────────────────────────────────────────────

    /// Reconcile and store one watchlist submission.
    pub async fn submit_entry(
        &self,
        user_id: i64,
        anime_id: i64,
        mut submission: EntrySubmission,
    ) -> Result<SubmitOutcome, RuntimeError> {
        let (lookup, details) = self.catalog_lookup(anime_id).await?;

        if let Some(details) = &details {
            if submission.anime_title.trim().is_empty() {
                submission.anime_title = details.title.clone();
            }
            if submission.image_url.is_none() {
                submission.image_url = details.cover_url.clone();
            }
        }

        let today = Local::now().date_naive();
        Ok(self
            .db
            .submit_entry(user_id, anime_id, submission, lookup, today)
            .await?)
    }

    pub async fn watchlist(
        &self,
        user_id: i64,
        status: Option<WatchStatus>,
    ) -> Result<Vec<WatchlistRowDto>, RuntimeError> {
        let entries = self.db.get_watchlist(user_id, status).await?;
        Ok(entries
            .into_iter()
            .map(|entry| WatchlistRowDto {
                progress_percent: progress_percent(entry.episodes_watched, entry.total_episodes),
                entry,
            })
            .collect())
    }

    /// Catalog details plus the user's entry and favorite flag, fetched together.
    pub async fn anime_detail(
        &self,
        user_id: i64,
        anime_id: i64,
    ) -> Result<AnimeDetailDto, RuntimeError> {
        let key = anime_key(anime_id)?;
        let (details, entry, favorite) = futures::join!(
            self.catalog.get_anime(key),
            self.db.get_watchlist_entry(user_id, anime_id),
            self.db.get_favorite(user_id, anime_id),
        );

        let details = details.map_err(|e| {
            if e.is_not_found() {
                RuntimeError::NotFound(format!("anime {anime_id}"))
            } else {
                RuntimeError::Api(e.to_string())
            }
        })?;
        let snapshot = snapshot_from_details(&details);

        Ok(AnimeDetailDto {
            total_episodes: snapshot.total_episodes,
            release_date: snapshot.release_date.to_string(),
            has_released: snapshot.release_date.has_released_now(),
            entry: entry?,
            is_favorite: favorite?.is_some(),
            details,
        })
    }

    // ── Favorites ───────────────────────────────────────────────

    pub async fn favorites(&self, user_id: i64) -> Result<Vec<Favorite>, RuntimeError> {
        Ok(self.db.get_favorites(user_id).await?)
    }

    /// Add (or refresh) a favorite. Blank title or image are filled from the catalog.
    pub async fn add_favorite(
        &self,
        user_id: i64,
        anime_id: i64,
        mut input: FavoriteInput,
    ) -> Result<Favorite, RuntimeError> {
        if input.title.trim().is_empty() || input.image.trim().is_empty() {
            let details = self
                .catalog
                .get_anime(anime_key(anime_id)?)
                .await
                .map_err(|e| RuntimeError::Api(e.to_string()))?;
            if input.title.trim().is_empty() {
                input.title = details.title;
            }
            if input.image.trim().is_empty() {
                input.image = details.cover_url.unwrap_or_default();
            }
            input.rating = input.rating.or(details.mean_score);
            input.episodes = input.episodes.or(details.episodes);
        }
        let favorite = self.db.upsert_favorite(user_id, anime_id, input).await?;
        tracing::info!(user_id, anime_id, "Favorite saved");
        Ok(favorite)
    }

    /// Returns whether a favorite was actually removed.
    pub async fn remove_favorite(&self, user_id: i64, anime_id: i64) -> Result<bool, RuntimeError> {
        Ok(self.db.delete_favorite(user_id, anime_id).await?)
    }

    // ── Profile ─────────────────────────────────────────────────

    pub async fn profile(&self, user_id: i64) -> Result<Profile, RuntimeError> {
        Ok(self.db.ensure_profile(user_id).await?)
    }

    pub async fn profile_by_username(&self, username: &str) -> Result<Profile, RuntimeError> {
        self.db
            .get_profile_by_username(username)
            .await?
            .ok_or_else(|| RuntimeError::NotFound(format!("user {username}")))
    }

    pub async fn update_profile(
        &self,
        user_id: i64,
        patch: ProfilePatch,
    ) -> Result<Profile, RuntimeError> {
        if patch.is_empty() {
            return self.profile(user_id).await;
        }
        Ok(self.db.update_profile(user_id, patch).await?)
    }

    pub async fn set_username(&self, user_id: i64, username: &str) -> Result<Profile, RuntimeError> {
        Ok(self.db.set_username(user_id, username).await?)
    }

    pub async fn recount_completed(&self, user_id: i64) -> Result<u32, RuntimeError> {
        Ok(self.db.recount_completed(user_id).await?)
    }

    // ── Catalog browsing ────────────────────────────────────────

    pub async fn search(&self, query: &str, page: u32) -> Result<SearchPage, RuntimeError> {
        let query = query.trim();
        if query.is_empty() {
            return Err(AniflixError::MissingFields("search query".into()).into());
        }
        self.catalog
            .search_anime(query, page)
            .await
            .map_err(|e| RuntimeError::Api(e.to_string()))
    }

    /// Popular anime; a genre of "All" means no filter.
    pub async fn trending(
        &self,
        genre: Option<&str>,
        page: u32,
    ) -> Result<SearchPage, RuntimeError> {
        let genre = genre.filter(|g| !g.trim().is_empty() && !g.eq_ignore_ascii_case("all"));
        self.catalog
            .trending(genre, page)
            .await
            .map_err(|e| RuntimeError::Api(e.to_string()))
    }

    /// Browse a season, defaulting to the current one.
    pub async fn season(
        &self,
        season: Option<AnimeSeason>,
        year: Option<u32>,
        page: u32,
    ) -> Result<SearchPage, RuntimeError> {
        let (current, current_year) = AnimeSeason::current();
        let season = season.unwrap_or(current);
        let year = year.unwrap_or(current_year);
        tracing::debug!(%season, year, page, "Browsing season");
        self.catalog
            .browse_season(season, year, page)
            .await
            .map_err(|e| RuntimeError::Api(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use aniflix_api::{AnimeSearchResult, FuzzyDate};
    use aniflix_core::reconcile::CounterDelta;
    use aniflix_core::storage::Storage;

    use super::*;

    #[derive(Debug, thiserror::Error)]
    enum FakeError {
        #[error("anime {0} not found")]
        NotFound(u64),
        #[error("connection refused")]
        Down,
    }

    impl LookupError for FakeError {
        fn is_not_found(&self) -> bool {
            matches!(self, Self::NotFound(_))
        }
    }

    #[derive(Default)]
    struct FakeCatalog {
        anime: HashMap<u64, AnimeDetails>,
        down: bool,
    }

    impl FakeCatalog {
        fn with(mut self, id: u64, episodes: Option<u32>, start: FuzzyDate) -> Self {
            self.anime.insert(
                id,
                AnimeDetails {
                    service_id: id,
                    title: format!("Anime {id}"),
                    description: None,
                    genres: vec!["Drama".into()],
                    episodes,
                    mean_score: Some(8.0),
                    cover_url: Some(format!("https://img.example/{id}.jpg")),
                    banner_url: None,
                    start_date: start,
                },
            );
            self
        }

        fn page(&self) -> SearchPage {
            let mut items: Vec<AnimeSearchResult> = self
                .anime
                .values()
                .map(|a| AnimeSearchResult {
                    service_id: a.service_id,
                    title: a.title.clone(),
                    episodes: a.episodes,
                    cover_url: a.cover_url.clone(),
                    mean_score: a.mean_score,
                    genres: a.genres.clone(),
                })
                .collect();
            items.sort_by_key(|a| a.service_id);
            SearchPage {
                items,
                has_next: false,
            }
        }
    }

    impl CatalogService for FakeCatalog {
        type Error = FakeError;

        async fn get_anime(&self, anime_id: u64) -> Result<AnimeDetails, FakeError> {
            if self.down {
                return Err(FakeError::Down);
            }
            self.anime
                .get(&anime_id)
                .cloned()
                .ok_or(FakeError::NotFound(anime_id))
        }

        async fn search_anime(&self, _query: &str, _page: u32) -> Result<SearchPage, FakeError> {
            Ok(self.page())
        }

        async fn trending(&self, genre: Option<&str>, _page: u32) -> Result<SearchPage, FakeError> {
            let mut page = self.page();
            if let Some(genre) = genre {
                page.items.retain(|a| a.genres.iter().any(|g| g == genre));
            }
            Ok(page)
        }

        async fn browse_season(
            &self,
            _season: AnimeSeason,
            _year: u32,
            _page: u32,
        ) -> Result<SearchPage, FakeError> {
            Ok(self.page())
        }
    }

    const AIRED: FuzzyDate = FuzzyDate {
        year: Some(2020),
        month: Some(4),
        day: Some(1),
    };

    const FAR_FUTURE: FuzzyDate = FuzzyDate {
        year: Some(2999),
        month: Some(1),
        day: Some(1),
    };

    fn runtime(catalog: FakeCatalog) -> Runtime<FakeCatalog> {
        let db = DbHandle::spawn(Storage::open_memory().unwrap()).unwrap();
        Runtime::with_parts(db, catalog)
    }

    fn submission(status: &str, episodes: f64, score: f64) -> EntrySubmission {
        EntrySubmission {
            status: status.into(),
            episodes_watched: episodes,
            user_score: score,
            anime_title: String::new(),
            image_url: None,
        }
    }

    #[tokio::test]
    async fn test_submit_fills_display_fields_from_catalog() {
        let rt = runtime(FakeCatalog::default().with(5, Some(12), AIRED));
        let outcome = rt.submit_entry(1, 5, submission("completed", 3.0, 9.0)).await.unwrap();

        assert_eq!(outcome.entry.anime_title, "Anime 5");
        assert_eq!(outcome.entry.episodes_watched, 12);
        assert_eq!(outcome.entry.total_episodes, 12);
        assert_eq!(outcome.delta, CounterDelta::Increment);
        assert_eq!(rt.profile(1).await.unwrap().total_anime_watched, 1);
    }

    #[tokio::test]
    async fn test_unreleased_submission_rejected() {
        let rt = runtime(FakeCatalog::default().with(7, Some(12), FAR_FUTURE));
        let err = rt.submit_entry(1, 7, submission("watching", 1.0, 0.0)).await.unwrap_err();
        assert_eq!(err.rejection(), Some(&ReconcileError::NotYetReleased));
        assert!(!err.is_retryable());

        let planned = rt.submit_entry(1, 7, submission("plan-to-watch", 4.0, 6.0)).await.unwrap();
        assert_eq!(planned.entry.episodes_watched, 0);
        assert_eq!(planned.entry.user_score, 0.0);
    }

    #[tokio::test]
    async fn test_catalog_down_fails_closed() {
        let rt = runtime(FakeCatalog {
            down: true,
            ..FakeCatalog::default()
        });
        let err = rt.submit_entry(1, 5, submission("completed", 0.0, 0.0)).await.unwrap_err();
        assert!(matches!(
            err.rejection(),
            Some(ReconcileError::CatalogUnavailable(_))
        ));

        let planned = rt.submit_entry(1, 5, submission("plan-to-watch", 0.0, 0.0)).await.unwrap();
        assert_eq!(planned.warnings.len(), 1);
    }

    #[tokio::test]
    async fn test_unknown_anime_is_not_found() {
        let rt = runtime(FakeCatalog::default());
        let err = rt.submit_entry(1, 99, submission("watching", 1.0, 0.0)).await.unwrap_err();
        assert!(matches!(err, RuntimeError::NotFound(_)));
        assert!(rt.watchlist(1, None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_watchlist_progress_and_filter() {
        let rt = runtime(
            FakeCatalog::default()
                .with(1, Some(24), AIRED)
                .with(2, Some(12), AIRED),
        );
        rt.submit_entry(1, 1, submission("watching", 6.0, 0.0)).await.unwrap();
        rt.submit_entry(1, 2, submission("completed", 0.0, 7.5)).await.unwrap();

        let all = rt.watchlist(1, None).await.unwrap();
        assert_eq!(all.len(), 2);
        let watching = rt.watchlist(1, Some(WatchStatus::Watching)).await.unwrap();
        assert_eq!(watching.len(), 1);
        assert_eq!(watching[0].progress_percent, 25.0);
    }

    #[tokio::test]
    async fn test_anime_detail_merges_user_state() {
        let rt = runtime(FakeCatalog::default().with(3, None, FAR_FUTURE));
        rt.add_favorite(1, 3, FavoriteInput::default()).await.unwrap();

        let detail = rt.anime_detail(1, 3).await.unwrap();
        assert_eq!(detail.total_episodes, 0);
        assert!(!detail.has_released);
        assert_eq!(detail.release_date, "1/1/2999");
        assert!(detail.is_favorite);
        assert!(detail.entry.is_none());
    }

    #[tokio::test]
    async fn test_favorites_round_trip() {
        let rt = runtime(FakeCatalog::default().with(4, Some(13), AIRED));
        let fav = rt.add_favorite(1, 4, FavoriteInput::default()).await.unwrap();
        assert_eq!(fav.title, "Anime 4");
        assert_eq!(fav.episodes, Some(13));

        assert_eq!(rt.favorites(1).await.unwrap().len(), 1);
        assert!(rt.remove_favorite(1, 4).await.unwrap());
        assert!(!rt.remove_favorite(1, 4).await.unwrap());
    }

    #[tokio::test]
    async fn test_profile_username_flow() {
        let rt = runtime(FakeCatalog::default());
        let profile = rt.set_username(1, "frieren").await.unwrap();
        assert_eq!(profile.username.as_deref(), Some("frieren"));

        let err = rt.set_username(2, "frieren").await.unwrap_err();
        assert!(matches!(err, RuntimeError::Core(AniflixError::UsernameTaken(_))));

        let found = rt.profile_by_username("frieren").await.unwrap();
        assert_eq!(found.user_id, 1);

        let updated = rt
            .update_profile(
                1,
                ProfilePatch {
                    description: Some("Mage".into()),
                    ..ProfilePatch::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.description, "Mage");
    }

    #[tokio::test]
    async fn test_trending_all_means_no_filter() {
        let rt = runtime(
            FakeCatalog::default()
                .with(1, Some(12), AIRED)
                .with(2, Some(12), AIRED),
        );
        assert_eq!(rt.trending(Some("All"), 1).await.unwrap().items.len(), 2);
        assert!(rt.trending(Some("Comedy"), 1).await.unwrap().items.is_empty());
        assert!(rt.search("   ", 1).await.is_err());
    }

    #[tokio::test]
    async fn test_file_backed_runtime_persists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("aniflix.db");
        {
            let db = DbHandle::open(&path).unwrap();
            let rt = Runtime::with_parts(
                db,
                FakeCatalog::default().with(1, Some(12), AIRED),
            );
            rt.submit_entry(1, 1, submission("completed", 0.0, 0.0)).await.unwrap();
        }
        let db = DbHandle::open(&path).unwrap();
        let entry = db.get_watchlist_entry(1, 1).await.unwrap().unwrap();
        assert_eq!(entry.status, WatchStatus::Completed);
        assert_eq!(db.recount_completed(1).await.unwrap(), 1);
    }
}
