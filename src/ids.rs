use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt;

use crate::error::ApiError;

static IMDB_ID: Lazy<Regex> = Lazy::new(|| Regex::new(r"^tt[0-9]{7,}$").expect("valid IMDb pattern"));
static NUMERIC_ID: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[0-9]{1,7}$").expect("valid id pattern"));

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Namespace {
    Imdb,
    Tmdb,
    Tvdb,
}

impl Namespace {
    pub fn as_str(&self) -> &'static str {
        match self {
            Namespace::Imdb => "imdb",
            Namespace::Tmdb => "tmdb",
            Namespace::Tvdb => "tvdb",
        }
    }

    fn label(&self) -> &'static str {
        match self {
            Namespace::Imdb => "IMDb",
            Namespace::Tmdb => "TMDb",
            Namespace::Tvdb => "TVDb",
        }
    }

    fn accepts(&self, raw: &str) -> bool {
        match self {
            Namespace::Imdb => IMDB_ID.is_match(raw),
            Namespace::Tmdb | Namespace::Tvdb => NUMERIC_ID.is_match(raw),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Movie,
    Show,
}

impl MediaKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MediaKind::Movie => "movie",
            MediaKind::Show => "show",
        }
    }
}

/// An id that matched its namespace's format.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identifier {
    namespace: Namespace,
    value: String,
}

impl Identifier {
    pub fn parse(namespace: Namespace, raw: &str) -> Result<Self, ApiError> {
        if !namespace.accepts(raw) {
            return Err(ApiError::bad_request(format!(
                "Missing or malformed {} id.",
                namespace.label()
            )));
        }
        Ok(Self {
            namespace,
            value: raw.to_string(),
        })
    }

    pub fn namespace(&self) -> Namespace {
        self.namespace
    }

    pub fn as_str(&self) -> &str {
        &self.value
    }

    /// Route serving this id, e.g. `/api/movie/imdb/tt0111161`.
    pub fn canonical_path(&self, kind: MediaKind) -> String {
        format!(
            "/api/{}/{}/{}",
            kind.as_str(),
            self.namespace.as_str(),
            self.value
        )
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.namespace.as_str(), self.value)
    }
}
