use crate::betaseries::{BetaSeriesClient, EpisodeQuery, EpisodeSubtitleApi};
use crate::config::Config;
use crate::error::{ApiError, ApiResult};
use crate::ids::{Identifier, MediaKind, Namespace};
use crate::models::{SelectionQuery, SubtitleList};
use crate::resolve::IdResolver;
use crate::select::select;
use crate::tmdb::{TmdbApi, TmdbClient};
use crate::tvdb::{TvdbApi, TvdbClient};
use crate::utils::build_http_client;
use crate::yify::{self, MoviePageSource, YifyClient};
use anyhow::Result;
use axum::{
    extract::{Path, Query, RawQuery, State},
    http::{header, HeaderValue, Method, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde_json::json;
use std::{collections::HashMap, net::SocketAddr, sync::Arc};
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

#[derive(Clone)]
pub struct AppState {
    pub tmdb: Arc<dyn TmdbApi>,
    pub tvdb: Arc<dyn TvdbApi>,
    pub episodes: Arc<dyn EpisodeSubtitleApi>,
    pub movie_pages: Arc<dyn MoviePageSource>,
    pub cache_max_age: u64,
    pub cors_allowed: Vec<String>,
}

impl AppState {
    pub fn from_config(config: &Config) -> Result<Self> {
        let client = build_http_client()?;
        Ok(Self {
            tmdb: Arc::new(TmdbClient::new(client.clone(), config.tmdb_api_key.clone())),
            tvdb: Arc::new(TvdbClient::new(client.clone(), config.tvdb_api_key.clone())),
            episodes: Arc::new(BetaSeriesClient::new(
                client.clone(),
                config.betaseries_api_key.clone(),
            )),
            movie_pages: Arc::new(YifyClient::new(client)),
            cache_max_age: config.cache_max_age,
            cors_allowed: config.cors_allowed.clone(),
        })
    }
}

pub async fn run_server(config: Config) -> Result<()> {
    let state = AppState::from_config(&config)?;
    let app = build_router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    info!("Listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

pub fn build_router(state: AppState) -> Router {
    let cors = cors_layer(&state.cors_allowed);
    let api = Router::new()
        .route("/movie/imdb/:imdb", get(movie_by_imdb))
        .route("/movie/tmdb/:tmdb", get(movie_by_tmdb))
        .route("/show/imdb/:imdb", get(show_by_imdb))
        .route("/show/tmdb/:tmdb", get(show_by_tmdb))
        .route("/show/tvdb/:tvdb", get(show_by_tvdb));

    Router::new()
        .route("/", get(index))
        .route("/health", get(health))
        .nest("/api", api)
        .fallback(route_not_found)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let layer = CorsLayer::new().allow_methods([Method::GET]);
    if origins.iter().any(|o| o == "*") {
        return layer.allow_origin(AllowOrigin::any());
    }
    let parsed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|o| match HeaderValue::from_str(o) {
            Ok(v) => Some(v),
            Err(_) => {
                warn!("Ignoring invalid CORS origin '{}'", o);
                None
            }
        })
        .collect();
    layer.allow_origin(AllowOrigin::list(parsed))
}

async fn index() -> Json<serde_json::Value> {
    Json(json!({
        "status": 200,
        "message": format!("sublink is working properly (v{})", env!("CARGO_PKG_VERSION")),
    }))
}

async fn health() -> &'static str {
    "OK"
}

async fn route_not_found() -> ApiError {
    ApiError::not_found("Route not found.")
}

async fn movie_by_imdb(
    State(state): State<AppState>,
    Path(imdb): Path<String>,
    Query(params): Query<HashMap<String, String>>,
) -> ApiResult<Response> {
    let query = parse_selection_query(&params)?;
    let imdb = Identifier::parse(Namespace::Imdb, &imdb)?;

    let html = state.movie_pages.fetch_movie_page(&imdb).await?;
    let candidates = yify::extract_candidates(&html)?;
    let found = candidates.len();
    let subtitles = select(candidates, &query);
    info!(
        "Movie {}: {} of {} listed subtitles selected",
        imdb.as_str(),
        subtitles.len(),
        found
    );
    Ok(cached(state.cache_max_age, Json(SubtitleList::from(subtitles))))
}

async fn movie_by_tmdb(
    State(state): State<AppState>,
    Path(tmdb): Path<String>,
    RawQuery(query): RawQuery,
) -> ApiResult<Response> {
    let tmdb = Identifier::parse(Namespace::Tmdb, &tmdb)?;
    redirect_resolved(&state, MediaKind::Movie, &tmdb, query).await
}

async fn show_by_tmdb(
    State(state): State<AppState>,
    Path(tmdb): Path<String>,
    RawQuery(query): RawQuery,
) -> ApiResult<Response> {
    let tmdb = Identifier::parse(Namespace::Tmdb, &tmdb)?;
    redirect_resolved(&state, MediaKind::Show, &tmdb, query).await
}

async fn show_by_imdb(
    State(state): State<AppState>,
    Path(imdb): Path<String>,
    RawQuery(query): RawQuery,
) -> ApiResult<Response> {
    let imdb = Identifier::parse(Namespace::Imdb, &imdb)?;
    redirect_resolved(&state, MediaKind::Show, &imdb, query).await
}

/// `lang` is forwarded to BetaSeries and also filters the listed subtitles here.
async fn show_by_tvdb(
    State(state): State<AppState>,
    Path(tvdb): Path<String>,
    Query(params): Query<HashMap<String, String>>,
) -> ApiResult<Response> {
    let query = parse_episode_query(&params)?;
    let show = Identifier::parse(Namespace::Tvdb, &tvdb)?;

    let episode_id = state.episodes.resolve_episode_id(&show, &query).await?;
    let candidates = state.episodes.list_subtitles(episode_id).await?;
    let found = candidates.len();
    let selection = SelectionQuery {
        min_rating: None,
        lang_filter: query.lang.clone(),
    };
    let subtitles = select(candidates, &selection);
    info!(
        "Show {} S{:02}E{:02} (episode {}): {} of {} subtitles selected",
        show.as_str(),
        query.season,
        query.episode,
        episode_id,
        subtitles.len(),
        found
    );
    Ok(cached(state.cache_max_age, Json(SubtitleList::from(subtitles))))
}

async fn redirect_resolved(
    state: &AppState,
    kind: MediaKind,
    from: &Identifier,
    query: Option<String>,
) -> ApiResult<Response> {
    let resolver = IdResolver::new(state.tmdb.as_ref(), state.tvdb.as_ref());
    let target = resolver.resolve(kind, from).await?;
    let mut location = target.canonical_path(kind);
    if let Some(query) = query {
        location.push('?');
        location.push_str(&query);
    }
    Ok((
        StatusCode::FOUND,
        [
            (header::LOCATION, location),
            (header::CACHE_CONTROL, cache_control(state.cache_max_age)),
        ],
    )
        .into_response())
}

fn cached(max_age: u64, body: impl IntoResponse) -> Response {
    ([(header::CACHE_CONTROL, cache_control(max_age))], body).into_response()
}

fn cache_control(max_age: u64) -> String {
    format!("max-age={}", max_age)
}

fn parse_selection_query(params: &HashMap<String, String>) -> ApiResult<SelectionQuery> {
    let min_rating = match non_empty(params, "rating") {
        Some(raw) => match raw.parse::<f64>() {
            Ok(r) if r.is_finite() => Some(r),
            _ => {
                return Err(ApiError::bad_request(format!(
                    "Error parsing rating: expected a number, received '{}'",
                    raw
                )))
            }
        },
        None => None,
    };
    let lang_filter = non_empty(params, "lang").map(str::to_string);
    Ok(SelectionQuery {
        min_rating,
        lang_filter,
    })
}

fn parse_episode_query(params: &HashMap<String, String>) -> ApiResult<EpisodeQuery> {
    let season = positive_number(params, "season")?;
    let episode = positive_number(params, "episode")?;
    let lang = match non_empty(params, "lang") {
        Some(lang) if lang.chars().count() == 2 => Some(lang.to_string()),
        Some(lang) => {
            return Err(ApiError::bad_request(format!(
                "lang: expected a 2 character language code, received '{}'",
                lang
            )))
        }
        None => None,
    };
    Ok(EpisodeQuery {
        season,
        episode,
        lang,
    })
}

fn positive_number(params: &HashMap<String, String>, key: &str) -> ApiResult<u32> {
    let raw = non_empty(params, key)
        .ok_or_else(|| ApiError::bad_request(format!("{}: Required", key)))?;
    match raw.parse::<u32>() {
        Ok(n) if n >= 1 => Ok(n),
        _ => Err(ApiError::bad_request(format!(
            "{}: expected a whole number greater than or equal to 1, received '{}'",
            key, raw
        ))),
    }
}

fn non_empty<'a>(params: &'a HashMap<String, String>, key: &str) -> Option<&'a str> {
    params
        .get(key)
        .map(|v| v.trim())
        .filter(|v| !v.is_empty())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        let mut term = signal(SignalKind::terminate()).expect("failed to install SIGTERM handler");
        term.recv().await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Shutdown signal received (Ctrl+C)");
        }
        _ = terminate => {
            info!("Shutdown signal received (SIGTERM)");
        }
    }
}
