use std::time::Duration;

use reqwest::Client;

use super::error::AniListError;
use super::types::{GraphQLResponse, MediaResponse, PageResponse};
use crate::traits::{AnimeDetails, AnimeSeason, CatalogService, SearchPage};

pub const DEFAULT_API_URL: &str = "https://graphql.anilist.co";

const LIST_FIELDS: &str = r#"
            id
            title { romaji english }
            coverImage { large }
            episodes
            averageScore
            genres
"#;

const GET_ANIME_QUERY: &str = r#"
query ($id: Int) {
    Media(id: $id, type: ANIME) {
        id
        title { romaji english }
        description
        genres
        episodes
        averageScore
        coverImage { large extraLarge }
        bannerImage
        startDate { year month day }
    }
}
"#;

/// AniList GraphQL API client. Read-only, no authentication.
pub struct AniListClient {
    api_url: String,
    per_page: u32,
    http: Client,
}

impl AniListClient {
    pub fn new(
        api_url: impl Into<String>,
        timeout: Duration,
        per_page: u32,
    ) -> Result<Self, AniListError> {
        let http = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            api_url: api_url.into(),
            per_page: per_page.max(1),
            http,
        })
    }

    async fn graphql_request<T: serde::de::DeserializeOwned>(
        &self,
        operation: &str,
        query: &str,
        variables: serde_json::Value,
    ) -> Result<GraphQLResponse<T>, AniListError> {
        tracing::debug!(operation, "AniList GraphQL request");

        let resp = self
            .http
            .post(&self.api_url)
            .header("Content-Type", "application/json")
            .header("Accept", "application/json")
            .json(&serde_json::json!({
                "query": query,
                "variables": variables,
            }))
            .send()
            .await?;

        let status = resp.status();
        // AniList answers a missing Media with 404 and a GraphQL error body.
        if !status.is_success() && status.as_u16() != 404 {
            let status_code = status.as_u16();
            let body = resp.text().await.unwrap_or_default();
            tracing::warn!(operation, status = status_code, "AniList API error");
            return Err(AniListError::Api {
                status: status_code,
                message: body,
            });
        }

        tracing::debug!(operation, status = %status, "AniList response received");
        resp.json::<GraphQLResponse<T>>()
            .await
            .map_err(|e| AniListError::Parse(e.to_string()))
    }

    async fn media_page(
        &self,
        operation: &str,
        query: &str,
        variables: serde_json::Value,
    ) -> Result<SearchPage, AniListError> {
        let resp: GraphQLResponse<PageResponse> =
            self.graphql_request(operation, query, variables).await?;
        if let Some(message) = resp.error_message() {
            return Err(AniListError::GraphQL(message));
        }
        let data = resp
            .data
            .ok_or_else(|| AniListError::Parse("response has no data".into()))?;
        Ok(data.page.into_search_page())
    }
}

fn page_query(args: &str, media_args: &str) -> String {
    format!(
        "query ($page: Int, $perPage: Int{args}) {{\n    Page(page: $page, perPage: $perPage) {{\n        pageInfo {{ hasNextPage }}\n        media(type: ANIME, isAdult: false{media_args}) {{{LIST_FIELDS}        }}\n    }}\n}}"
    )
}

impl CatalogService for AniListClient {
    type Error = AniListError;

    async fn get_anime(&self, anime_id: u64) -> Result<AnimeDetails, AniListError> {
        let resp: GraphQLResponse<MediaResponse> = self
            .graphql_request(
                "GetAnime",
                GET_ANIME_QUERY,
                serde_json::json!({ "id": anime_id }),
            )
            .await?;

        if resp.is_not_found() {
            return Err(AniListError::NotFound(anime_id));
        }
        if let Some(message) = resp.error_message() {
            return Err(AniListError::GraphQL(message));
        }
        resp.data
            .and_then(|d| d.media)
            .map(|m| m.into_details())
            .ok_or(AniListError::NotFound(anime_id))
    }

    async fn search_anime(&self, query: &str, page: u32) -> Result<SearchPage, AniListError> {
        self.media_page(
            "Search",
            &page_query(", $search: String", ", search: $search"),
            serde_json::json!({
                "search": query,
                "page": page.max(1),
                "perPage": self.per_page,
            }),
        )
        .await
    }

    async fn trending(&self, genre: Option<&str>, page: u32) -> Result<SearchPage, AniListError> {
        // A null genre variable means no genre filter.
        self.media_page(
            "Trending",
            &page_query(
                ", $genre: String",
                ", sort: POPULARITY_DESC, genre: $genre",
            ),
            serde_json::json!({
                "genre": genre,
                "page": page.max(1),
                "perPage": self.per_page,
            }),
        )
        .await
    }

    async fn browse_season(
        &self,
        season: AnimeSeason,
        year: u32,
        page: u32,
    ) -> Result<SearchPage, AniListError> {
        self.media_page(
            "SeasonBrowse",
            &page_query(
                ", $season: MediaSeason, $seasonYear: Int",
                ", season: $season, seasonYear: $seasonYear, sort: POPULARITY_DESC",
            ),
            serde_json::json!({
                "season": season.to_anilist_str(),
                "seasonYear": year,
                "page": page.max(1),
                "perPage": self.per_page,
            }),
        )
        .await
    }
}
