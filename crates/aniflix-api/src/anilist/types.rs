use serde::Deserialize;

use crate::traits::{strip_tags, AnimeDetails, AnimeSearchResult, FuzzyDate, SearchPage};

// ── GraphQL response wrappers ────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct GraphQLResponse<T> {
    pub data: Option<T>,
    pub errors: Option<Vec<GraphQLError>>,
}

#[derive(Debug, Deserialize)]
pub struct GraphQLError {
    pub message: String,
    pub status: Option<u16>,
}

// ── Media queries ────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct MediaResponse {
    #[serde(rename = "Media")]
    pub media: Option<AniListMedia>,
}

#[derive(Debug, Deserialize)]
pub struct PageResponse {
    #[serde(rename = "Page")]
    pub page: PageData,
}

#[derive(Debug, Deserialize)]
pub struct PageData {
    #[serde(rename = "pageInfo")]
    pub page_info: Option<PageInfo>,
    pub media: Vec<AniListMedia>,
}

#[derive(Debug, Deserialize)]
pub struct PageInfo {
    #[serde(rename = "hasNextPage")]
    pub has_next_page: Option<bool>,
}

#[derive(Debug, Deserialize)]
pub struct AniListMedia {
    pub id: u64,
    pub title: Option<AniListTitle>,
    pub description: Option<String>,
    pub genres: Option<Vec<String>>,
    pub episodes: Option<u32>,
    #[serde(rename = "averageScore")]
    pub average_score: Option<u32>,
    #[serde(rename = "coverImage")]
    pub cover_image: Option<CoverImage>,
    #[serde(rename = "bannerImage")]
    pub banner_image: Option<String>,
    #[serde(rename = "startDate")]
    pub start_date: Option<AniListDate>,
}

#[derive(Debug, Deserialize)]
pub struct AniListTitle {
    pub romaji: Option<String>,
    pub english: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CoverImage {
    pub large: Option<String>,
    #[serde(rename = "extraLarge")]
    pub extra_large: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct AniListDate {
    pub year: Option<i32>,
    pub month: Option<u32>,
    pub day: Option<u32>,
}

// ── Conversions ──────────────────────────────────────────────────

impl<T> GraphQLResponse<T> {
    /// Joined error messages, if the server reported any.
    pub fn error_message(&self) -> Option<String> {
        let errors = self.errors.as_ref()?;
        if errors.is_empty() {
            return None;
        }
        Some(
            errors
                .iter()
                .map(|e| e.message.as_str())
                .collect::<Vec<_>>()
                .join("; "),
        )
    }

    /// Whether any reported error is a 404.
    pub fn is_not_found(&self) -> bool {
        self.errors
            .as_ref()
            .is_some_and(|errors| errors.iter().any(|e| e.status == Some(404)))
    }
}

/// AniList's `averageScore` is 0-100.
fn score_to_ten(score: u32) -> f32 {
    score as f32 / 10.0
}

impl AniListMedia {
    fn romaji(&self) -> Option<String> {
        self.title.as_ref().and_then(|t| t.romaji.clone())
    }

    fn english(&self) -> Option<String> {
        self.title.as_ref().and_then(|t| t.english.clone())
    }

    pub fn into_search_result(self) -> AnimeSearchResult {
        AnimeSearchResult {
            service_id: self.id,
            title: self.romaji().or_else(|| self.english()).unwrap_or_default(),
            episodes: self.episodes,
            cover_url: self.cover_image.and_then(|c| c.large),
            mean_score: self.average_score.map(score_to_ten),
            genres: self.genres.unwrap_or_default(),
        }
    }

    pub fn into_details(self) -> AnimeDetails {
        let title = self
            .english()
            .or_else(|| self.romaji())
            .unwrap_or_else(|| "Unknown Title".into());

        AnimeDetails {
            service_id: self.id,
            title,
            description: self.description.as_deref().map(strip_tags),
            genres: self.genres.unwrap_or_default(),
            episodes: self.episodes,
            mean_score: self.average_score.map(score_to_ten),
            cover_url: self.cover_image.and_then(|c| c.extra_large.or(c.large)),
            banner_url: self.banner_image,
            start_date: self
                .start_date
                .map(|d| FuzzyDate {
                    year: d.year,
                    month: d.month,
                    day: d.day,
                })
                .unwrap_or_default(),
        }
    }
}

impl PageData {
    pub fn into_search_page(self) -> SearchPage {
        let has_next = self
            .page_info
            .and_then(|p| p.has_next_page)
            .unwrap_or(false);
        SearchPage {
            items: self
                .media
                .into_iter()
                .map(AniListMedia::into_search_result)
                .collect(),
            has_next,
        }
    }
}
