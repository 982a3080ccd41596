use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct LanguageTag {
    pub code: String,
    pub name: String,
}

impl LanguageTag {
    pub fn new(code: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            name: name.into(),
        }
    }
}

/// One subtitle row as seen upstream, before filtering and deduplication.
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    pub lang: LanguageTag,
    pub rating: Option<f64>,
    pub download_url: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Subtitle {
    pub lang: LanguageTag,
    pub url: String,
}

impl From<Candidate> for Subtitle {
    fn from(candidate: Candidate) -> Self {
        Self {
            lang: candidate.lang,
            url: candidate.download_url,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SelectionQuery {
    pub min_rating: Option<f64>,
    pub lang_filter: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct SubtitleList {
    pub count: usize,
    pub subtitles: Vec<Subtitle>,
}

impl From<Vec<Subtitle>> for SubtitleList {
    fn from(subtitles: Vec<Subtitle>) -> Self {
        Self {
            count: subtitles.len(),
            subtitles,
        }
    }
}
