use std::time::Duration;

use reqwest::Client;
use url::Url;

use super::error::JikanError;
use super::types::{JikanListResponse, JikanSingleResponse};
use crate::traits::{AnimeDetails, AnimeSeason, CatalogService, SearchPage};

pub const DEFAULT_API_URL: &str = "https://api.jikan.moe/v4/";

/// Jikan (unofficial MyAnimeList) REST client.
pub struct JikanClient {
    base: Url,
    per_page: u32,
    http: Client,
}

impl JikanClient {
    pub fn new(base_url: &str, timeout: Duration, per_page: u32) -> Result<Self, JikanError> {
        // Relative joins drop the last path segment unless it ends in '/'.
        let base = if base_url.ends_with('/') {
            Url::parse(base_url)?
        } else {
            Url::parse(&format!("{base_url}/"))?
        };
        let http = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            base,
            per_page: per_page.max(1),
            http,
        })
    }

    fn endpoint(&self, path: &str, query: &[(&str, String)]) -> Result<Url, JikanError> {
        let mut url = self.base.join(path)?;
        if !query.is_empty() {
            url.query_pairs_mut()
                .extend_pairs(query.iter().map(|(k, v)| (*k, v.as_str())));
        }
        Ok(url)
    }

    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        operation: &str,
        url: Url,
    ) -> Result<Option<T>, JikanError> {
        tracing::debug!(operation, url = %url, "Jikan request");

        let resp = self
            .http
            .get(url)
            .header("Accept", "application/json")
            .send()
            .await?;

        let status = resp.status();
        if status.as_u16() == 404 {
            return Ok(None);
        }
        if !status.is_success() {
            let status_code = status.as_u16();
            let body = resp.text().await.unwrap_or_default();
            tracing::warn!(operation, status = status_code, "Jikan API error");
            return Err(JikanError::Api {
                status: status_code,
                message: body,
            });
        }

        resp.json::<T>()
            .await
            .map(Some)
            .map_err(|e| JikanError::Parse(e.to_string()))
    }

    async fn list(&self, operation: &str, url: Url) -> Result<JikanListResponse, JikanError> {
        self.get_json::<JikanListResponse>(operation, url)
            .await?
            .ok_or_else(|| JikanError::Parse(format!("{operation}: endpoint not found")))
    }

    fn paging(&self, page: u32) -> Vec<(&'static str, String)> {
        vec![
            ("page", page.max(1).to_string()),
            ("limit", self.per_page.to_string()),
        ]
    }
}

impl CatalogService for JikanClient {
    type Error = JikanError;

    async fn get_anime(&self, anime_id: u64) -> Result<AnimeDetails, JikanError> {
        let url = self.endpoint(&format!("anime/{anime_id}"), &[])?;
        self.get_json::<JikanSingleResponse>("GetAnime", url)
            .await?
            .map(|r| r.data.into_details())
            .ok_or(JikanError::NotFound(anime_id))
    }

    async fn search_anime(&self, query: &str, page: u32) -> Result<SearchPage, JikanError> {
        let mut params = vec![("q", query.to_string())];
        params.extend(self.paging(page));
        let url = self.endpoint("anime", &params)?;
        Ok(self.list("Search", url).await?.into_search_page())
    }

    async fn trending(&self, genre: Option<&str>, page: u32) -> Result<SearchPage, JikanError> {
        let mut params = vec![("filter", "bypopularity".to_string())];
        params.extend(self.paging(page));
        let url = self.endpoint("top/anime", &params)?;
        let mut resp = self.list("Trending", url).await?;
        // Jikan filters genres by numeric id only; match names on our side.
        if let Some(genre) = genre {
            resp.retain_genre(genre);
        }
        Ok(resp.into_search_page())
    }

    async fn browse_season(
        &self,
        season: AnimeSeason,
        year: u32,
        page: u32,
    ) -> Result<SearchPage, JikanError> {
        let url = self.endpoint(
            &format!("seasons/{year}/{}", season.to_jikan_str()),
            &self.paging(page),
        )?;
        Ok(self.list("SeasonBrowse", url).await?.into_search_page())
    }
}
