use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::AniflixError;
use crate::models::{CatalogLookup, WatchStatus, WatchlistEntry};
use crate::reconcile::{self, CounterDelta, Proposal, ReconcileWarning};
use crate::storage::{EntryFields, Storage};

/// What a caller submits for one anime in their watchlist.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntrySubmission {
    pub status: String,
    pub episodes_watched: f64,
    pub user_score: f64,
    /// Display fields, stored as given.
    pub anime_title: String,
    pub image_url: Option<String>,
}

impl EntrySubmission {
    fn proposal(&self) -> Proposal<'_> {
        Proposal {
            status: &self.status,
            episodes_watched: self.episodes_watched,
            user_score: self.user_score,
        }
    }
}

/// Outcome of an accepted submission.
#[derive(Debug, Clone, Serialize)]
pub struct SubmitOutcome {
    /// The entry as stored after the write.
    pub entry: WatchlistEntry,
    pub previous_status: Option<WatchStatus>,
    pub delta: CounterDelta,
    pub warnings: Vec<ReconcileWarning>,
}

/// Validate, normalize and persist one watchlist submission.
///
/// Reading the previous entry, writing the new one and adjusting the
/// profile counter happen in one store transaction. Rejections leave the
/// store untouched.
pub fn submit_entry(
    storage: &mut Storage,
    user_id: i64,
    anime_id: i64,
    submission: &EntrySubmission,
    catalog: &CatalogLookup,
    today: NaiveDate,
) -> Result<SubmitOutcome, AniflixError> {
    let mut warnings = Vec::new();

    let result = storage.write_watchlist_entry(user_id, anime_id, |previous| {
        let reconciled = reconcile::reconcile(&submission.proposal(), catalog, previous, today)?;
        warnings = reconciled.warnings;

        // Keep the stored title when the caller sends none.
        let anime_title = match (submission.anime_title.trim(), previous) {
            ("", Some(prev)) => prev.anime_title.clone(),
            (title, _) => title.to_string(),
        };
        let image_url = submission
            .image_url
            .clone()
            .or_else(|| previous.and_then(|p| p.image_url.clone()));

        Ok(EntryFields {
            anime_title,
            image_url,
            status: reconciled.status,
            episodes_watched: reconciled.episodes_watched,
            user_score: reconciled.user_score,
            total_episodes: reconciled.total_episodes,
            delta: reconciled.delta,
        })
    });

    let commit = match result {
        Ok(commit) => commit,
        Err(AniflixError::Rejected(reason)) => {
            warn!(user_id, anime_id, status = %submission.status, %reason, "Watchlist update rejected");
            return Err(reason.into());
        }
        Err(e) => return Err(e),
    };

    for warning in &warnings {
        warn!(user_id, anime_id, %warning, "Watchlist update accepted with warning");
    }
    if commit.delta != CounterDelta::Unchanged {
        debug!(user_id, delta = commit.delta.as_i64(), "Adjusted completed counter");
    }
    info!(
        user_id,
        anime_id,
        status = commit.entry.status.as_db_str(),
        episodes = commit.entry.episodes_watched,
        "Watchlist entry saved"
    );

    Ok(SubmitOutcome {
        previous_status: commit.previous.map(|p| p.status),
        entry: commit.entry,
        delta: commit.delta,
        warnings,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ReconcileError;
    use crate::models::{CatalogSnapshot, ReleaseDate};

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 15).unwrap()
    }

    fn aired(total: u32) -> CatalogLookup {
        CatalogLookup::Available(CatalogSnapshot {
            total_episodes: total,
            release_date: ReleaseDate::new(Some(2023), Some(9), Some(29)),
        })
    }

    fn submission(status: &str, episodes: f64, score: f64) -> EntrySubmission {
        EntrySubmission {
            status: status.into(),
            episodes_watched: episodes,
            user_score: score,
            anime_title: "Sousou no Frieren".into(),
            image_url: Some("https://img.anili.st/frieren.jpg".into()),
        }
    }

    fn completed_count(db: &Storage) -> u32 {
        db.get_profile(1)
            .unwrap()
            .map_or(0, |p| p.total_anime_watched)
    }

    #[test]
    fn test_watching_to_completed() {
        let mut db = Storage::open_memory().unwrap();
        let catalog = aired(12);

        submit_entry(&mut db, 1, 10, &submission("watching", 5.0, 7.0), &catalog, today()).unwrap();
        let outcome =
            submit_entry(&mut db, 1, 10, &submission("completed", 5.0, 7.0), &catalog, today())
                .unwrap();

        assert_eq!(outcome.previous_status, Some(WatchStatus::Watching));
        assert_eq!(outcome.entry.episodes_watched, 12);
        assert_eq!(outcome.delta, CounterDelta::Increment);
        assert_eq!(completed_count(&db), 1);
    }

    #[test]
    fn test_resubmission_is_idempotent() {
        let mut db = Storage::open_memory().unwrap();
        let catalog = aired(12);
        let input = submission("completed", 0.0, 8.5);

        let first = submit_entry(&mut db, 1, 10, &input, &catalog, today()).unwrap();
        let second = submit_entry(&mut db, 1, 10, &input, &catalog, today()).unwrap();

        assert_eq!(first.delta, CounterDelta::Increment);
        assert_eq!(second.delta, CounterDelta::Unchanged);
        assert_eq!(first.entry.status, second.entry.status);
        assert_eq!(first.entry.episodes_watched, second.entry.episodes_watched);
        assert_eq!(first.entry.user_score, second.entry.user_score);
        assert_eq!(first.entry.created_at, second.entry.created_at);
        assert_eq!(completed_count(&db), 1);
    }

    #[test]
    fn test_transition_sequence_counter() {
        let mut db = Storage::open_memory().unwrap();
        let catalog = aired(24);
        for status in ["plan-to-watch", "watching", "completed", "watching", "completed"] {
            submit_entry(&mut db, 1, 10, &submission(status, 3.0, 6.0), &catalog, today())
                .unwrap();
        }
        assert_eq!(completed_count(&db), 1);
    }

    #[test]
    fn test_completions_across_anime_accumulate() {
        let mut db = Storage::open_memory().unwrap();
        let catalog = aired(12);
        for anime_id in [1, 2, 3] {
            submit_entry(&mut db, 1, anime_id, &submission("completed", 0.0, 0.0), &catalog, today())
                .unwrap();
        }
        submit_entry(&mut db, 1, 2, &submission("dropped", 4.0, 0.0), &catalog, today()).unwrap();
        assert_eq!(completed_count(&db), 2);
    }

    #[test]
    fn test_rejection_leaves_store_untouched() {
        let mut db = Storage::open_memory().unwrap();
        let catalog = aired(24);
        submit_entry(&mut db, 1, 10, &submission("completed", 0.0, 9.0), &catalog, today())
            .unwrap();

        let err = submit_entry(&mut db, 1, 10, &submission("watching", 30.0, 9.0), &catalog, today())
            .unwrap_err();
        assert!(matches!(
            err.rejection(),
            Some(ReconcileError::InvalidProgress { .. })
        ));

        let entry = db.get_watchlist_entry(1, 10).unwrap().unwrap();
        assert_eq!(entry.status, WatchStatus::Completed);
        assert_eq!(entry.episodes_watched, 24);
        assert_eq!(completed_count(&db), 1);
    }

    #[test]
    fn test_unreleased_first_write_rejected() {
        let mut db = Storage::open_memory().unwrap();
        let catalog = CatalogLookup::Available(CatalogSnapshot {
            total_episodes: 12,
            release_date: ReleaseDate::new(Some(2025), Some(1), Some(5)),
        });

        let err = submit_entry(&mut db, 1, 10, &submission("completed", 12.0, 0.0), &catalog, today())
            .unwrap_err();
        assert_eq!(err.rejection(), Some(&ReconcileError::NotYetReleased));
        assert!(db.get_watchlist_entry(1, 10).unwrap().is_none());

        let ok = submit_entry(&mut db, 1, 10, &submission("plan-to-watch", 12.0, 4.0), &catalog, today())
            .unwrap();
        assert_eq!(ok.entry.episodes_watched, 0);
        assert_eq!(ok.entry.user_score, 0.0);
    }

    #[test]
    fn test_catalog_outage_keeps_previous_total() {
        let mut db = Storage::open_memory().unwrap();
        submit_entry(&mut db, 1, 10, &submission("completed", 0.0, 8.0), &aired(12), today())
            .unwrap();

        let outage = CatalogLookup::unavailable("connection refused");
        let err = submit_entry(&mut db, 1, 10, &submission("watching", 3.0, 8.0), &outage, today())
            .unwrap_err();
        assert!(matches!(
            err.rejection(),
            Some(ReconcileError::CatalogUnavailable(_))
        ));

        let outcome =
            submit_entry(&mut db, 1, 10, &submission("plan-to-watch", 3.0, 8.0), &outage, today())
                .unwrap();
        assert_eq!(outcome.entry.total_episodes, 12);
        assert_eq!(outcome.delta, CounterDelta::Decrement);
        assert_eq!(outcome.warnings.len(), 1);
        assert_eq!(completed_count(&db), 0);
    }

    #[test]
    fn test_blank_title_keeps_stored_title() {
        let mut db = Storage::open_memory().unwrap();
        let catalog = aired(12);
        submit_entry(&mut db, 1, 10, &submission("watching", 1.0, 0.0), &catalog, today()).unwrap();

        let mut update = submission("watching", 2.0, 0.0);
        update.anime_title = String::new();
        update.image_url = None;
        let outcome = submit_entry(&mut db, 1, 10, &update, &catalog, today()).unwrap();
        assert_eq!(outcome.entry.anime_title, "Sousou no Frieren");
        assert!(outcome.entry.image_url.is_some());
    }
}
