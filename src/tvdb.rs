use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use crate::error::{ApiError, ApiResult};
use crate::ids::{Identifier, Namespace};
use crate::utils::fetch_json;

const TVDB_BASE: &str = "https://api4.thetvdb.com/v4";

/// Maps IMDb show ids onto TVDB series ids.
#[async_trait]
pub trait TvdbApi: Send + Sync {
    async fn series_id(&self, imdb_id: &Identifier) -> ApiResult<Identifier>;
}

#[derive(Debug, Clone)]
pub struct TvdbClient {
    client: Client,
    api_key: Option<String>,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    data: Option<T>,
}

#[derive(Debug, Deserialize)]
struct Login {
    token: String,
}

#[derive(Debug, Deserialize)]
struct RemoteIdMatch {
    series: Option<SeriesRef>,
}

#[derive(Debug, Deserialize)]
struct SeriesRef {
    id: u64,
}

impl TvdbClient {
    pub fn new(client: Client, api_key: Option<String>) -> Self {
        Self {
            client,
            api_key,
            base_url: TVDB_BASE.to_string(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Exchanges the API key for a bearer token. Tokens aren't kept between
    /// requests.
    async fn login(&self, api_key: &str) -> ApiResult<String> {
        let url = format!("{}/login", self.base_url);
        let request = self.client.post(&url).json(&json!({ "apikey": api_key }));
        let envelope: Envelope<Login> = fetch_json(request, &url)
            .await
            .map_err(|e| e.unavailable("Could not get TVDB auth token"))?;
        envelope
            .data
            .map(|d| d.token)
            .filter(|t| !t.is_empty())
            .ok_or_else(|| ApiError::unavailable("Could not get TVDB auth token."))
    }
}

#[async_trait]
impl TvdbApi for TvdbClient {
    async fn series_id(&self, imdb_id: &Identifier) -> ApiResult<Identifier> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| ApiError::unavailable("TVDB API key is not defined."))?;
        let token = self.login(api_key).await?;

        let url = format!("{}/search/remoteid/{}", self.base_url, imdb_id.as_str());
        let request = self.client.get(&url).bearer_auth(token);
        let envelope: Envelope<Vec<RemoteIdMatch>> = fetch_json(request, &url)
            .await
            .map_err(|e| e.or_not_found("Could not find corresponding TVDb id."))?;

        let series_id = envelope
            .data
            .unwrap_or_default()
            .into_iter()
            .find_map(|m| m.series)
            .map(|s| s.id)
            .ok_or_else(|| ApiError::not_found("Could not find corresponding TVDb id."))?;
        debug!("TVDB remote id {} -> series {}", imdb_id.as_str(), series_id);

        Identifier::parse(Namespace::Tvdb, &series_id.to_string())
            .map_err(|_| ApiError::not_found(format!("TVDB returned an unusable series id {}.", series_id)))
    }
}
