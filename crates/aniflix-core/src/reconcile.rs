//! Watchlist reconciliation.
//!
//! Turns a caller's proposed `(status, episodes, score)` into the normalized
//! record to persist plus the change to the profile's completed counter, or
//! a rejection. Pure: no I/O, `today` is passed in.

use chrono::NaiveDate;
use serde::Serialize;

use crate::error::ReconcileError;
use crate::models::{CatalogLookup, WatchStatus, WatchlistEntry};

pub const MAX_SCORE: f64 = 10.0;

/// Raw values as submitted. Numbers stay `f64` so malformed input
/// (fractions, negatives, NaN) reaches the validator instead of being
/// silently coerced at the edge.
#[derive(Debug, Clone, Copy)]
pub struct Proposal<'a> {
    pub status: &'a str,
    pub episodes_watched: f64,
    pub user_score: f64,
}

/// Change to apply to `Profile::total_anime_watched`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CounterDelta {
    Decrement,
    Unchanged,
    Increment,
}

impl CounterDelta {
    pub fn as_i64(self) -> i64 {
        match self {
            Self::Decrement => -1,
            Self::Unchanged => 0,
            Self::Increment => 1,
        }
    }
}

/// Non-fatal conditions attached to an accepted write.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum ReconcileWarning {
    /// The catalog could not be reached; only plan-to-watch was allowed and
    /// the episode total came from the previous entry.
    CatalogUnavailable(String),
}

impl std::fmt::Display for ReconcileWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::CatalogUnavailable(reason) => {
                write!(f, "could not fetch release date ({reason})")
            }
        }
    }
}

/// A validated, normalized entry ready to persist.
#[derive(Debug, Clone, PartialEq)]
pub struct Reconciled {
    pub status: WatchStatus,
    pub episodes_watched: u32,
    pub user_score: f32,
    pub total_episodes: u32,
    pub delta: CounterDelta,
    pub warnings: Vec<ReconcileWarning>,
}

/// Validate and normalize a proposal against the catalog and the previous entry.
pub fn reconcile(
    proposal: &Proposal<'_>,
    catalog: &CatalogLookup,
    previous: Option<&WatchlistEntry>,
    today: NaiveDate,
) -> Result<Reconciled, ReconcileError> {
    let status: WatchStatus = proposal.status.parse()?;

    let mut warnings = Vec::new();
    let total_episodes = match catalog {
        CatalogLookup::Available(snapshot) => {
            if status.requires_release() && !snapshot.has_released(today) {
                return Err(ReconcileError::NotYetReleased);
            }
            snapshot.total_episodes
        }
        // Unknown release state: fail closed for everything but plan-to-watch.
        CatalogLookup::Unavailable { reason } => {
            if status.requires_release() {
                return Err(ReconcileError::CatalogUnavailable(reason.clone()));
            }
            warnings.push(ReconcileWarning::CatalogUnavailable(reason.clone()));
            previous.map_or(0, |p| p.total_episodes)
        }
    };

    let (episodes_watched, user_score) = match status {
        WatchStatus::Completed => (total_episodes, validate_score(proposal.user_score)?),
        WatchStatus::PlanToWatch => (0, 0.0),
        _ => (
            validate_progress(proposal.episodes_watched, total_episodes)?,
            validate_score(proposal.user_score)?,
        ),
    };

    Ok(Reconciled {
        status,
        episodes_watched,
        user_score,
        total_episodes,
        delta: completion_delta(previous.map(|p| p.status), status),
        warnings,
    })
}

/// Counter change for a status transition. A first write has no previous status.
pub fn completion_delta(previous: Option<WatchStatus>, next: WatchStatus) -> CounterDelta {
    let was_completed = previous == Some(WatchStatus::Completed);
    let is_completed = next == WatchStatus::Completed;
    match (was_completed, is_completed) {
        (false, true) => CounterDelta::Increment,
        (true, false) => CounterDelta::Decrement,
        _ => CounterDelta::Unchanged,
    }
}

/// Watched share of the series in percent, clamped to `0..=100`.
pub fn progress_percent(episodes_watched: u32, total_episodes: u32) -> f64 {
    if total_episodes == 0 {
        return 0.0;
    }
    (f64::from(episodes_watched) / f64::from(total_episodes) * 100.0).clamp(0.0, 100.0)
}

fn validate_progress(episodes: f64, total: u32) -> Result<u32, ReconcileError> {
    if !episodes.is_finite() || episodes.fract() != 0.0 || episodes < 0.0 || episodes > f64::from(total)
    {
        return Err(ReconcileError::InvalidProgress { episodes, total });
    }
    Ok(episodes as u32)
}

fn validate_score(score: f64) -> Result<f32, ReconcileError> {
    if !score.is_finite() || !(0.0..=MAX_SCORE).contains(&score) {
        return Err(ReconcileError::InvalidScore(score));
    }
    Ok(score as f32)
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;
    use crate::models::{CatalogSnapshot, ReleaseDate};

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 15).unwrap()
    }

    fn released(total: u32) -> CatalogLookup {
        CatalogLookup::Available(CatalogSnapshot {
            total_episodes: total,
            release_date: ReleaseDate::new(Some(2023), Some(10), Some(1)),
        })
    }

    fn next_year(total: u32) -> CatalogLookup {
        CatalogLookup::Available(CatalogSnapshot {
            total_episodes: total,
            release_date: ReleaseDate::new(Some(2025), Some(4), Some(1)),
        })
    }

    fn proposal(status: &str, episodes: f64, score: f64) -> Proposal<'_> {
        Proposal {
            status,
            episodes_watched: episodes,
            user_score: score,
        }
    }

    fn previous(status: WatchStatus, episodes: u32, total: u32) -> WatchlistEntry {
        WatchlistEntry {
            user_id: 1,
            anime_id: 154587,
            anime_title: "Sousou no Frieren".into(),
            image_url: None,
            status,
            episodes_watched: episodes,
            user_score: 8.0,
            total_episodes: total,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_completed_forces_total() {
        for input in [0.0, 3.0, 99.0, -4.0, f64::NAN] {
            let r = reconcile(&proposal("completed", input, 9.0), &released(12), None, today())
                .unwrap();
            assert_eq!(r.episodes_watched, 12);
            assert_eq!(r.user_score, 9.0);
        }
    }

    #[test]
    fn test_plan_to_watch_resets_progress_and_score() {
        for (episodes, score) in [(5.0, 7.5), (300.0, 42.0), (f64::NAN, -1.0)] {
            let r = reconcile(
                &proposal("plan-to-watch", episodes, score),
                &released(24),
                None,
                today(),
            )
            .unwrap();
            assert_eq!(r.episodes_watched, 0);
            assert_eq!(r.user_score, 0.0);
        }
    }

    #[test]
    fn test_unreleased_rejects_released_only_statuses() {
        for status in ["watching", "completed", "on-hold", "dropped"] {
            let err = reconcile(&proposal(status, 0.0, 0.0), &next_year(12), None, today())
                .unwrap_err();
            assert_eq!(err, ReconcileError::NotYetReleased, "status {status}");
        }
        let ok = reconcile(&proposal("plan-to-watch", 0.0, 0.0), &next_year(12), None, today());
        assert!(ok.is_ok());
    }

    #[test]
    fn test_unannounced_is_unreleased() {
        let catalog = CatalogLookup::Available(CatalogSnapshot {
            total_episodes: 0,
            release_date: ReleaseDate::unannounced(),
        });
        let err = reconcile(&proposal("watching", 0.0, 0.0), &catalog, None, today()).unwrap_err();
        assert_eq!(err, ReconcileError::NotYetReleased);
    }

    #[test]
    fn test_progress_beyond_total_rejected() {
        let err = reconcile(&proposal("watching", 30.0, 0.0), &released(24), None, today())
            .unwrap_err();
        assert_eq!(
            err,
            ReconcileError::InvalidProgress {
                episodes: 30.0,
                total: 24
            }
        );
    }

    #[test]
    fn test_malformed_progress_rejected() {
        for episodes in [-1.0, 2.5, f64::NAN, f64::INFINITY] {
            let err = reconcile(&proposal("dropped", episodes, 0.0), &released(24), None, today())
                .unwrap_err();
            assert!(
                matches!(err, ReconcileError::InvalidProgress { .. }),
                "episodes {episodes}"
            );
        }
    }

    #[test]
    fn test_score_bounds() {
        let err = reconcile(&proposal("watching", 1.0, 11.0), &released(24), None, today())
            .unwrap_err();
        assert_eq!(err, ReconcileError::InvalidScore(11.0));

        let err = reconcile(&proposal("completed", 1.0, -0.5), &released(24), None, today())
            .unwrap_err();
        assert_eq!(err, ReconcileError::InvalidScore(-0.5));

        let r = reconcile(&proposal("on-hold", 4.0, 10.0), &released(24), None, today()).unwrap();
        assert_eq!(r.user_score, 10.0);
        assert_eq!(r.episodes_watched, 4);
    }

    #[test]
    fn test_unknown_status_rejected() {
        let err = reconcile(&proposal("binging", 1.0, 1.0), &released(24), None, today())
            .unwrap_err();
        assert_eq!(err, ReconcileError::InvalidStatus("binging".into()));
    }

    #[test]
    fn test_status_checked_before_release_gate() {
        let err = reconcile(&proposal("paused", 0.0, 0.0), &next_year(12), None, today())
            .unwrap_err();
        assert!(matches!(err, ReconcileError::InvalidStatus(_)));
    }

    #[test]
    fn test_watching_to_completed_fills_progress_and_increments() {
        let prev = previous(WatchStatus::Watching, 5, 12);
        let r = reconcile(&proposal("completed", 5.0, 8.0), &released(12), Some(&prev), today())
            .unwrap();
        assert_eq!(r.episodes_watched, 12);
        assert_eq!(r.delta, CounterDelta::Increment);
    }

    #[test]
    fn test_catalog_unavailable_fails_closed() {
        let catalog = CatalogLookup::unavailable("timed out");
        for status in ["watching", "completed", "on-hold", "dropped"] {
            let err = reconcile(&proposal(status, 0.0, 0.0), &catalog, None, today()).unwrap_err();
            assert_eq!(err, ReconcileError::CatalogUnavailable("timed out".into()));
        }
    }

    #[test]
    fn test_catalog_unavailable_allows_plan_to_watch_with_warning() {
        let catalog = CatalogLookup::unavailable("timed out");
        let prev = previous(WatchStatus::Completed, 12, 12);
        let r = reconcile(&proposal("plan-to-watch", 3.0, 5.0), &catalog, Some(&prev), today())
            .unwrap();
        assert_eq!(r.total_episodes, 12);
        assert_eq!(r.episodes_watched, 0);
        assert_eq!(r.delta, CounterDelta::Decrement);
        assert_eq!(
            r.warnings,
            vec![ReconcileWarning::CatalogUnavailable("timed out".into())]
        );

        let r = reconcile(&proposal("plan-to-watch", 0.0, 0.0), &catalog, None, today()).unwrap();
        assert_eq!(r.total_episodes, 0);
    }

    #[test]
    fn test_completion_delta() {
        use WatchStatus::*;
        assert_eq!(completion_delta(None, Completed), CounterDelta::Increment);
        assert_eq!(completion_delta(None, Watching), CounterDelta::Unchanged);
        assert_eq!(completion_delta(Some(Watching), Completed), CounterDelta::Increment);
        assert_eq!(completion_delta(Some(Completed), Completed), CounterDelta::Unchanged);
        assert_eq!(completion_delta(Some(Completed), Dropped), CounterDelta::Decrement);
        assert_eq!(completion_delta(Some(OnHold), Dropped), CounterDelta::Unchanged);
    }

    #[test]
    fn test_transition_sequence_nets_one() {
        use WatchStatus::*;
        let path = [PlanToWatch, Watching, Completed, Watching, Completed];
        let mut prev = None;
        let mut net = 0;
        for next in path {
            net += completion_delta(prev, next).as_i64();
            prev = Some(next);
        }
        assert_eq!(net, 1);
    }

    #[test]
    fn test_progress_percent() {
        assert_eq!(progress_percent(6, 12), 50.0);
        assert_eq!(progress_percent(0, 12), 0.0);
        assert_eq!(progress_percent(12, 12), 100.0);
        assert_eq!(progress_percent(30, 12), 100.0);
        assert_eq!(progress_percent(3, 0), 0.0);
    }
}
