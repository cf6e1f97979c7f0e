use std::fmt::Write as _;

use serde::Serialize;

use aniflix_api::SearchPage;
use aniflix_core::models::{Favorite, Profile, WatchlistEntry};
use aniflix_core::reconcile::CounterDelta;
use aniflix_core::watchlist::SubmitOutcome;
use aniflix_runtime::{AnimeDetailDto, WatchlistRowDto};

/// Prints command results as text or as pretty JSON.
pub struct Output {
    json: bool,
}

impl Output {
    pub fn new(json: bool) -> Self {
        Self { json }
    }

    pub fn emit<T: Serialize>(&self, value: &T, human: impl FnOnce(&T) -> String) {
        if self.json {
            match serde_json::to_string_pretty(value) {
                Ok(s) => println!("{s}"),
                Err(e) => eprintln!("error: could not encode output: {e}"),
            }
        } else {
            let text = human(value);
            if !text.is_empty() {
                println!("{}", text.trim_end());
            }
        }
    }
}

fn score(value: f32) -> String {
    if value > 0.0 {
        format!("{value:.1}")
    } else {
        "-".into()
    }
}

fn episodes(watched: u32, total: u32) -> String {
    if total > 0 {
        format!("{watched}/{total}")
    } else {
        format!("{watched}/?")
    }
}

pub fn search_page(page: &SearchPage) -> String {
    if page.items.is_empty() {
        return "No results.".into();
    }
    let mut out = String::new();
    for item in &page.items {
        let eps = item.episodes.map_or("?".into(), |e| e.to_string());
        let rating = item.mean_score.map_or("-".into(), |s| format!("{s:.1}"));
        let _ = writeln!(
            out,
            "{:>7}  {}  ({eps} eps, {rating})",
            item.service_id, item.title
        );
    }
    if page.has_next {
        out.push_str("More results on the next page (--page).\n");
    }
    out
}

pub fn anime_detail(detail: &AnimeDetailDto) -> String {
    let d = &detail.details;
    let mut out = String::new();
    let star = if detail.is_favorite { " ★" } else { "" };
    let _ = writeln!(out, "{}{star}", d.title);
    let _ = writeln!(
        out,
        "Episodes: {}",
        if detail.total_episodes > 0 {
            detail.total_episodes.to_string()
        } else {
            "unknown".into()
        }
    );
    let _ = writeln!(
        out,
        "Release:  {}{}",
        detail.release_date,
        if detail.has_released { "" } else { " (not yet released)" }
    );
    if let Some(mean) = d.mean_score {
        let _ = writeln!(out, "Rating:   {mean:.1}");
    }
    if !d.genres.is_empty() {
        let _ = writeln!(out, "Genres:   {}", d.genres.join(", "));
    }
    match &detail.entry {
        Some(entry) => {
            let _ = writeln!(
                out,
                "Yours:    {} {} score {}",
                entry.status,
                episodes(entry.episodes_watched, entry.total_episodes),
                score(entry.user_score)
            );
        }
        None => out.push_str("Yours:    not in your watchlist\n"),
    }
    let description = d
        .description
        .as_deref()
        .filter(|s| !s.is_empty())
        .unwrap_or("No description available.");
    let _ = write!(out, "\n{description}\n");
    out
}

fn entry_line(entry: &WatchlistEntry, percent: Option<f64>) -> String {
    let progress = episodes(entry.episodes_watched, entry.total_episodes);
    let progress = match percent {
        Some(p) => format!("{progress} ({p:.0}%)"),
        None => progress,
    };
    format!(
        "{:>7}  {:<13} {:<14} {:>4}  {}",
        entry.anime_id,
        entry.status.to_string(),
        progress,
        score(entry.user_score),
        entry.anime_title
    )
}

pub fn watchlist(rows: &[WatchlistRowDto]) -> String {
    if rows.is_empty() {
        return "Your watchlist is empty.".into();
    }
    rows.iter()
        .map(|r| entry_line(&r.entry, Some(r.progress_percent)) + "\n")
        .collect()
}

pub fn submit_outcome(outcome: &SubmitOutcome) -> String {
    let mut out = format!("Saved: {}\n", entry_line(&outcome.entry, None).trim_start());
    for warning in &outcome.warnings {
        let _ = writeln!(out, "warning: {warning}");
    }
    match outcome.delta {
        CounterDelta::Increment => out.push_str("Completed count +1\n"),
        CounterDelta::Decrement => out.push_str("Completed count -1\n"),
        CounterDelta::Unchanged => {}
    }
    out
}

pub fn favorites(favorites: &[Favorite]) -> String {
    if favorites.is_empty() {
        return "No favorites yet.".into();
    }
    let mut out = String::new();
    for fav in favorites {
        let rating = fav.rating.map_or("-".into(), |r| format!("{r:.1}"));
        let _ = writeln!(out, "{:>7}  {}  ({rating})", fav.anime_id, fav.title);
    }
    out
}

pub fn profile(profile: &Profile) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{} (user {})",
        profile.username.as_deref().unwrap_or("<no username>"),
        profile.user_id
    );
    if !profile.description.is_empty() {
        let _ = writeln!(out, "{}", profile.description);
    }
    let _ = writeln!(out, "Completed anime: {}", profile.total_anime_watched);
    let _ = writeln!(out, "Picture: {}", profile.profile_picture);
    let _ = writeln!(out, "Banner:  {}", profile.banner_image);
    out
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use aniflix_api::AnimeSearchResult;
    use aniflix_core::models::WatchStatus;

    use super::*;

    fn entry(status: WatchStatus, watched: u32, total: u32, user_score: f32) -> WatchlistEntry {
        WatchlistEntry {
            user_id: 1,
            anime_id: 52991,
            anime_title: "Sousou no Frieren".into(),
            image_url: None,
            status,
            episodes_watched: watched,
            user_score,
            total_episodes: total,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_entry_line() {
        let line = entry_line(&entry(WatchStatus::Watching, 7, 28, 9.0), Some(25.0));
        assert!(line.contains("Watching"));
        assert!(line.contains("7/28 (25%)"));
        assert!(line.contains("9.0"));
        assert!(line.ends_with("Sousou no Frieren"));

        let line = entry_line(&entry(WatchStatus::PlanToWatch, 0, 0, 0.0), None);
        assert!(line.contains("0/?"));
        assert!(line.contains(" - "));
    }

    #[test]
    fn test_submit_outcome_mentions_counter() {
        let outcome = SubmitOutcome {
            entry: entry(WatchStatus::Completed, 28, 28, 10.0),
            previous_status: Some(WatchStatus::Watching),
            delta: CounterDelta::Increment,
            warnings: vec![],
        };
        let text = submit_outcome(&outcome);
        assert!(text.starts_with("Saved: 52991"));
        assert!(text.contains("Completed count +1"));
    }

    #[test]
    fn test_search_page_next_hint() {
        let page = SearchPage {
            items: vec![AnimeSearchResult {
                service_id: 21,
                title: "One Piece".into(),
                episodes: None,
                cover_url: None,
                mean_score: Some(8.8),
                genres: vec![],
            }],
            has_next: true,
        };
        let text = search_page(&page);
        assert!(text.contains("One Piece  (? eps, 8.8)"));
        assert!(text.contains("--page"));
        assert_eq!(search_page(&SearchPage { items: vec![], has_next: false }), "No results.");
    }
}
