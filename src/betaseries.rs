//! Episode subtitles from the BetaSeries API.
//!
//! Two sequential calls: the TVDB show id plus season/episode resolve to a
//! BetaSeries episode id, which then lists the subtitle files. BetaSeries
//! doesn't rate subtitles, so every candidate is unrated and the language is
//! guessed from the filename.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

use crate::error::{ApiError, ApiResult};
use crate::ids::Identifier;
use crate::lang;
use crate::models::Candidate;
use crate::utils::{fetch_json, lenient_u64};

const BETASERIES_BASE: &str = "https://api.betaseries.com";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EpisodeQuery {
    pub season: u32,
    pub episode: u32,
    pub lang: Option<String>,
}

#[async_trait]
pub trait EpisodeSubtitleApi: Send + Sync {
    async fn resolve_episode_id(&self, show: &Identifier, query: &EpisodeQuery) -> ApiResult<u64>;
    async fn list_subtitles(&self, episode_id: u64) -> ApiResult<Vec<Candidate>>;
}

#[derive(Debug, Clone)]
pub struct BetaSeriesClient {
    client: Client,
    api_key: Option<String>,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct EpisodeList {
    episodes: Vec<EpisodeEntry>,
}

#[derive(Debug, Deserialize)]
struct EpisodeEntry {
    #[serde(deserialize_with = "lenient_u64")]
    id: u64,
}

#[derive(Debug, Deserialize)]
struct SubtitleList {
    subtitles: Vec<SubtitleEntry>,
}

#[derive(Debug, Deserialize)]
struct SubtitleEntry {
    file: String,
    url: String,
}

impl BetaSeriesClient {
    pub fn new(client: Client, api_key: Option<String>) -> Self {
        Self {
            client,
            api_key,
            base_url: BETASERIES_BASE.to_string(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn api_key(&self) -> ApiResult<&str> {
        self.api_key
            .as_deref()
            .ok_or_else(|| ApiError::unavailable("BetaSeries API key is not defined."))
    }
}

#[async_trait]
impl EpisodeSubtitleApi for BetaSeriesClient {
    async fn resolve_episode_id(&self, show: &Identifier, query: &EpisodeQuery) -> ApiResult<u64> {
        let api_key = self.api_key()?;
        let url = format!("{}/shows/episodes", self.base_url);
        let mut params = vec![
            ("thetvdb_id", show.as_str().to_string()),
            ("season", query.season.to_string()),
            ("episode", query.episode.to_string()),
        ];
        if let Some(lang) = &query.lang {
            params.push(("language", lang.clone()));
        }
        let request = self
            .client
            .get(&url)
            .header("X-BetaSeries-Key", api_key)
            .query(&params);

        let list: EpisodeList = fetch_json(request, &url)
            .await
            .map_err(|e| e.or_not_found("Episode not found."))?;
        first_episode_id(list)
    }

    async fn list_subtitles(&self, episode_id: u64) -> ApiResult<Vec<Candidate>> {
        let api_key = self.api_key()?;
        let url = format!("{}/subtitles/episode", self.base_url);
        let request = self
            .client
            .get(&url)
            .header("X-BetaSeries-Key", api_key)
            .query(&[("id", episode_id.to_string()), ("locale", "en".to_string())]);

        let list: SubtitleList = fetch_json(request, &url)
            .await
            .map_err(|e| e.or_not_found("Subtitles not found."))?;
        candidates_from(list)
    }
}

fn first_episode_id(list: EpisodeList) -> ApiResult<u64> {
    list.episodes
        .first()
        .map(|e| e.id)
        .ok_or_else(|| ApiError::not_found("Episode not found."))
}

fn candidates_from(list: SubtitleList) -> ApiResult<Vec<Candidate>> {
    if list.subtitles.is_empty() {
        return Err(ApiError::not_found("Subtitles not found."));
    }
    let total = list.subtitles.len();
    let candidates: Vec<Candidate> = list
        .subtitles
        .into_iter()
        .filter_map(|s| {
            let lang = lang::derive_from_filename(&s.file)?;
            Some(Candidate {
                lang,
                rating: None,
                download_url: s.url,
            })
        })
        .collect();
    debug!(
        "Derived a language for {} of {} subtitle files",
        candidates.len(),
        total
    );
    Ok(candidates)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::LanguageTag;
    use crate::utils::serve_stub;
    use axum::extract::Query;
    use axum::http::{HeaderMap, StatusCode};
    use axum::routing::get;
    use axum::{Json, Router};
    use serde_json::{json, Value};
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};

    #[derive(Debug, Default, Clone)]
    struct Seen {
        key: Option<String>,
        params: HashMap<String, String>,
    }

    type Recorder = Arc<Mutex<Vec<Seen>>>;

    fn record(recorder: &Recorder, headers: &HeaderMap, params: HashMap<String, String>) {
        let key = headers
            .get("x-betaseries-key")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        recorder.lock().unwrap().push(Seen { key, params });
    }

    async fn stub_client(episodes: Value, episodes_status: StatusCode) -> (BetaSeriesClient, Recorder) {
        let recorder: Recorder = Arc::default();
        let on_episodes = recorder.clone();
        let on_subtitles = recorder.clone();
        let router = Router::new()
            .route(
                "/shows/episodes",
                get(move |headers: HeaderMap, Query(params): Query<HashMap<String, String>>| {
                    record(&on_episodes, &headers, params);
                    let body = episodes.clone();
                    async move { (episodes_status, Json(body)) }
                }),
            )
            .route(
                "/subtitles/episode",
                get(move |headers: HeaderMap, Query(params): Query<HashMap<String, String>>| {
                    record(&on_subtitles, &headers, params);
                    async move {
                        Json(json!({ "subtitles": [
                            { "id": 9, "file": "Show.S01E02.720p.fr.srt", "url": "https://dl/9", "quality": 3 },
                            { "id": 10, "file": "Show.S01E02.srt", "url": "https://dl/10", "quality": 1 }
                        ] }))
                    }
                }),
            );
        let base = serve_stub(router).await;
        let client =
            BetaSeriesClient::new(Client::new(), Some("bs-key".to_string())).with_base_url(base);
        (client, recorder)
    }

    fn show() -> Identifier {
        Identifier::parse(crate::ids::Namespace::Tvdb, "81189").unwrap()
    }

    #[tokio::test]
    async fn episode_lookup_sends_key_and_language() {
        let (client, recorder) = stub_client(
            json!({ "episodes": [{ "id": "512", "season": 1, "episode": 2 }] }),
            StatusCode::OK,
        )
        .await;
        let query = EpisodeQuery {
            season: 1,
            episode: 2,
            lang: Some("fr".to_string()),
        };
        assert_eq!(client.resolve_episode_id(&show(), &query).await.unwrap(), 512);

        let seen = recorder.lock().unwrap()[0].clone();
        assert_eq!(seen.key.as_deref(), Some("bs-key"));
        assert_eq!(seen.params.get("thetvdb_id").map(String::as_str), Some("81189"));
        assert_eq!(seen.params.get("season").map(String::as_str), Some("1"));
        assert_eq!(seen.params.get("episode").map(String::as_str), Some("2"));
        assert_eq!(seen.params.get("language").map(String::as_str), Some("fr"));
    }

    #[tokio::test]
    async fn episode_lookup_omits_language_when_unset() {
        let (client, recorder) =
            stub_client(json!({ "episodes": [{ "id": 7 }] }), StatusCode::OK).await;
        let query = EpisodeQuery {
            season: 3,
            episode: 4,
            lang: None,
        };
        assert_eq!(client.resolve_episode_id(&show(), &query).await.unwrap(), 7);
        assert!(!recorder.lock().unwrap()[0].params.contains_key("language"));
    }

    #[tokio::test]
    async fn upstream_errors_and_schema_mismatches_are_not_found() {
        let query = EpisodeQuery {
            season: 1,
            episode: 2,
            lang: None,
        };
        let (client, _) = stub_client(
            json!({ "errors": [{ "code": 4001, "text": "Show not found" }] }),
            StatusCode::BAD_REQUEST,
        )
        .await;
        let err = client.resolve_episode_id(&show(), &query).await.unwrap_err();
        assert!(matches!(err, ApiError::NotFound(_)));
        assert_eq!(err.to_string(), "Episode not found.");

        let (client, _) = stub_client(json!({ "errors": [] }), StatusCode::OK).await;
        let err = client.resolve_episode_id(&show(), &query).await.unwrap_err();
        assert!(matches!(err, ApiError::NotFound(_)));
    }

    #[tokio::test]
    async fn subtitle_listing_sends_episode_id_and_locale() {
        let (client, recorder) = stub_client(json!({ "episodes": [] }), StatusCode::OK).await;
        let candidates = client.list_subtitles(512).await.unwrap();
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].lang, LanguageTag::new("fr", "French"));
        assert_eq!(candidates[0].download_url, "https://dl/9");

        let seen = recorder.lock().unwrap()[0].clone();
        assert_eq!(seen.key.as_deref(), Some("bs-key"));
        assert_eq!(seen.params.get("id").map(String::as_str), Some("512"));
        assert_eq!(seen.params.get("locale").map(String::as_str), Some("en"));
    }

    #[test]
    fn episode_payload_accepts_stringly_numbers() {
        let raw = r#"{"episodes": [{"id": "512", "season": 1, "episode": "2", "title": "Pilot"}]}"#;
        let list: EpisodeList = serde_json::from_str(raw).unwrap();
        assert_eq!(first_episode_id(list).unwrap(), 512);
    }

    #[test]
    fn empty_episode_list_is_not_found() {
        let list: EpisodeList = serde_json::from_str(r#"{"episodes": []}"#).unwrap();
        assert!(matches!(first_episode_id(list), Err(ApiError::NotFound(_))));
    }

    #[test]
    fn episode_payload_without_episodes_fails_schema() {
        assert!(serde_json::from_str::<EpisodeList>(r#"{"errors": [{"code": 4001}]}"#).is_err());
    }

    #[test]
    fn subtitles_without_language_are_dropped() {
        let raw = r#"{"subtitles": [
            {"id": 1, "file": "Show.S01E02.French.C.orig.Addic7ed.com.srt", "url": "https://dl/1", "quality": 3},
            {"id": 2, "file": "Show.S01E02.srt", "url": "https://dl/2", "quality": 1},
            {"id": 3, "file": "show.s01e02.en.srt", "url": "https://dl/3", "quality": "2"}
        ]}"#;
        let list: SubtitleList = serde_json::from_str(raw).unwrap();
        let candidates = candidates_from(list).unwrap();
        assert_eq!(candidates.len(), 2);
        assert_eq!(candidates[0].lang, LanguageTag::new("fr", "French"));
        assert_eq!(candidates[0].download_url, "https://dl/1");
        assert_eq!(candidates[1].lang, LanguageTag::new("en", "English"));
        assert!(candidates.iter().all(|c| c.rating.is_none()));
    }

    #[test]
    fn empty_subtitle_list_is_not_found() {
        let list: SubtitleList = serde_json::from_str(r#"{"subtitles": []}"#).unwrap();
        assert!(matches!(candidates_from(list), Err(ApiError::NotFound(_))));
    }
}
