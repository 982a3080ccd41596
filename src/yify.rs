//! Movie subtitles scraped from the YIFY subtitle listing.

use async_trait::async_trait;
use once_cell::sync::Lazy;
use rand::Rng;
use reqwest::Client;
use scraper::{ElementRef, Html, Selector};
use tracing::{debug, warn};

use crate::error::{ApiError, ApiResult};
use crate::ids::Identifier;
use crate::lang;
use crate::models::{Candidate, LanguageTag};
use crate::utils::fetch_text;

pub const DEFAULT_MIRRORS: &[&str] = &["https://yts-subs.org", "https://yifysubtitles.ch"];
const DOWNLOAD_BASE: &str = "https://yifysubtitles.ch";

static ROW: Lazy<Selector> = Lazy::new(|| parse_selector("tbody tr"));
static LINK: Lazy<Selector> = Lazy::new(|| parse_selector("a"));
static LANGUAGE: Lazy<Selector> = Lazy::new(|| parse_selector(".sub-lang"));
static RATING: Lazy<Selector> = Lazy::new(|| parse_selector(".rating-cell span"));

fn parse_selector(css: &str) -> Selector {
    Selector::parse(css).expect("static selector is valid")
}

/// Source of the raw listing page for a movie.
#[async_trait]
pub trait MoviePageSource: Send + Sync {
    async fn fetch_movie_page(&self, imdb_id: &Identifier) -> ApiResult<String>;
}

#[derive(Debug, Clone)]
pub struct YifyClient {
    client: Client,
    mirrors: Vec<String>,
}

impl YifyClient {
    pub fn new(client: Client) -> Self {
        Self::with_mirrors(client, DEFAULT_MIRRORS.iter().map(|m| m.to_string()).collect())
    }

    pub fn with_mirrors(client: Client, mirrors: Vec<String>) -> Self {
        Self { client, mirrors }
    }
}

#[async_trait]
impl MoviePageSource for YifyClient {
    async fn fetch_movie_page(&self, imdb_id: &Identifier) -> ApiResult<String> {
        let mirror = {
            let mut rng = rand::rng();
            pick_mirror(&self.mirrors, &mut rng)
                .ok_or_else(|| ApiError::unavailable("No subtitle mirrors configured."))?
                .to_string()
        };
        let url = format!("{}/movie-imdb/{}", mirror, imdb_id.as_str());
        debug!("Fetching subtitle listing {}", url);
        fetch_text(self.client.get(&url), &url)
            .await
            .map_err(|e| e.or_not_found("No subtitles found"))
    }
}

/// Spreads load across mirrors; the RNG is a parameter so tests can pin it.
pub fn pick_mirror<'a, R: Rng>(mirrors: &'a [String], rng: &mut R) -> Option<&'a str> {
    if mirrors.is_empty() {
        return None;
    }
    let idx = rng.random_range(0..mirrors.len());
    Some(mirrors[idx].as_str())
}

/// Parses the listing table into candidates, one per row with a download link.
pub fn extract_candidates(html: &str) -> ApiResult<Vec<Candidate>> {
    let document = Html::parse_document(html);
    let rows: Vec<ElementRef> = document.select(&ROW).collect();
    if rows.is_empty() {
        return Err(ApiError::not_found("No subtitles found"));
    }

    let mut candidates = Vec::with_capacity(rows.len());
    for row in rows {
        let Some(href) = row.select(&LINK).next().and_then(|a| a.value().attr("href")) else {
            warn!("Skipping subtitle row without a download link");
            continue;
        };
        let label = text_of(row, &LANGUAGE);
        let name = lang::resolve_name(&label);
        let code = lang::resolve_code(&name);
        candidates.push(Candidate {
            lang: LanguageTag::new(code, name),
            rating: Some(parse_rating(&text_of(row, &RATING))),
            download_url: download_url(href),
        });
    }
    if candidates.is_empty() {
        return Err(ApiError::not_found("No subtitles found"));
    }
    Ok(candidates)
}

fn text_of(row: ElementRef, selector: &Selector) -> String {
    row.select(selector)
        .flat_map(|el| el.text())
        .collect::<String>()
        .trim()
        .to_string()
}

/// Listing links point at the detail page (`/subtitles/<slug>`); the archive
/// lives at `/subtitle/<slug>.zip`.
fn download_url(href: &str) -> String {
    format!("{}{}.zip", DOWNLOAD_BASE, href.replacen("subtitles", "subtitle", 1))
}

/// Empty cells count as zero votes; anything non-numeric ranks below every
/// real rating.
fn parse_rating(text: &str) -> f64 {
    if text.is_empty() {
        return 0.0;
    }
    match text.parse::<f64>() {
        Ok(r) if r.is_finite() => r,
        _ => f64::NEG_INFINITY,
    }
}
