use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

use crate::error::{ApiError, ApiResult};
use crate::ids::{Identifier, MediaKind, Namespace};
use crate::utils::fetch_json;

const TMDB_BASE: &str = "https://api.themoviedb.org/3";

/// TMDb external-id lookups.
#[async_trait]
pub trait TmdbApi: Send + Sync {
    async fn imdb_id(&self, kind: MediaKind, tmdb_id: &Identifier) -> ApiResult<Identifier>;
}

#[derive(Debug, Clone)]
pub struct TmdbClient {
    client: Client,
    api_key: Option<String>,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct ExternalIds {
    imdb_id: Option<String>,
}

impl TmdbClient {
    pub fn new(client: Client, api_key: Option<String>) -> Self {
        Self {
            client,
            api_key,
            base_url: TMDB_BASE.to_string(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn api_key(&self) -> ApiResult<&str> {
        self.api_key
            .as_deref()
            .ok_or_else(|| ApiError::unavailable("Missing TMDB API key."))
    }
}

#[async_trait]
impl TmdbApi for TmdbClient {
    async fn imdb_id(&self, kind: MediaKind, tmdb_id: &Identifier) -> ApiResult<Identifier> {
        let api_key = self.api_key()?;
        let path = match kind {
            MediaKind::Movie => "movie",
            MediaKind::Show => "tv",
        };
        let url = format!("{}/{}/{}/external_ids", self.base_url, path, tmdb_id.as_str());
        let request = self.client.get(&url).query(&[("api_key", api_key)]);

        let ids: ExternalIds = fetch_json(request, &url)
            .await
            .map_err(|e| e.or_not_found("No corresponding IMDb id found."))?;
        debug!("TMDb {} {} -> {:?}", path, tmdb_id.as_str(), ids.imdb_id);

        // TMDb answers with null or "" when it has no IMDb mapping.
        ids.imdb_id
            .filter(|id| !id.is_empty())
            .ok_or_else(|| ApiError::not_found("No corresponding IMDb id found."))
            .and_then(|id| {
                Identifier::parse(Namespace::Imdb, &id)
                    .map_err(|_| ApiError::not_found(format!("TMDb returned an unusable IMDb id '{}'.", id)))
            })
    }
}
