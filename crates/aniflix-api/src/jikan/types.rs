use serde::Deserialize;

use crate::traits::{strip_tags, AnimeDetails, AnimeSearchResult, FuzzyDate, SearchPage};

// ── Envelopes ────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct JikanSingleResponse {
    pub data: JikanAnime,
}

#[derive(Debug, Deserialize)]
pub struct JikanListResponse {
    pub data: Vec<JikanAnime>,
    pub pagination: Option<Pagination>,
}

#[derive(Debug, Deserialize)]
pub struct Pagination {
    #[serde(default)]
    pub has_next_page: bool,
}

// ── Anime resource ───────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct JikanAnime {
    pub mal_id: u64,
    pub title: Option<String>,
    pub title_english: Option<String>,
    pub synopsis: Option<String>,
    pub episodes: Option<u32>,
    pub score: Option<f32>,
    pub images: Option<JikanImages>,
    #[serde(default)]
    pub genres: Vec<JikanNamed>,
    pub aired: Option<JikanAired>,
}

#[derive(Debug, Deserialize)]
pub struct JikanImages {
    pub jpg: Option<JikanImageSet>,
}

#[derive(Debug, Deserialize)]
pub struct JikanImageSet {
    pub image_url: Option<String>,
    pub large_image_url: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct JikanNamed {
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct JikanAired {
    pub prop: Option<JikanAiredProp>,
}

#[derive(Debug, Deserialize)]
pub struct JikanAiredProp {
    pub from: Option<JikanDateParts>,
}

#[derive(Debug, Deserialize)]
pub struct JikanDateParts {
    pub day: Option<u32>,
    pub month: Option<u32>,
    pub year: Option<i32>,
}

// ── Conversions ──────────────────────────────────────────────────

impl JikanAnime {
    fn genre_names(&self) -> Vec<String> {
        self.genres.iter().map(|g| g.name.clone()).collect()
    }

    pub fn has_genre(&self, genre: &str) -> bool {
        self.genres.iter().any(|g| g.name.eq_ignore_ascii_case(genre))
    }

    fn start_date(&self) -> FuzzyDate {
        self.aired
            .as_ref()
            .and_then(|a| a.prop.as_ref())
            .and_then(|p| p.from.as_ref())
            .map(|d| FuzzyDate {
                year: d.year,
                month: d.month,
                day: d.day,
            })
            .unwrap_or_default()
    }

    pub fn into_search_result(self) -> AnimeSearchResult {
        let genres = self.genre_names();
        AnimeSearchResult {
            service_id: self.mal_id,
            title: self.title.or(self.title_english).unwrap_or_default(),
            episodes: self.episodes,
            cover_url: self
                .images
                .and_then(|i| i.jpg)
                .and_then(|j| j.image_url),
            mean_score: self.score,
            genres,
        }
    }

    pub fn into_details(self) -> AnimeDetails {
        let genres = self.genre_names();
        let start_date = self.start_date();
        let jpg = self.images.and_then(|i| i.jpg);
        AnimeDetails {
            service_id: self.mal_id,
            title: self
                .title_english
                .or(self.title)
                .unwrap_or_else(|| "Unknown Title".into()),
            description: self.synopsis.as_deref().map(strip_tags),
            genres,
            episodes: self.episodes,
            mean_score: self.score,
            cover_url: jpg.and_then(|j| j.large_image_url.or(j.image_url)),
            banner_url: None,
            start_date,
        }
    }
}

impl JikanListResponse {
    /// Drop entries outside `genre`. Pagination is left as Jikan reported
    /// it, so a filtered page can be short or empty and still have a next.
    pub fn retain_genre(&mut self, genre: &str) {
        self.data.retain(|a| a.has_genre(genre));
    }

    pub fn into_search_page(self) -> SearchPage {
        SearchPage {
            has_next: self.pagination.is_some_and(|p| p.has_next_page),
            items: self
                .data
                .into_iter()
                .map(JikanAnime::into_search_result)
                .collect(),
        }
    }
}
