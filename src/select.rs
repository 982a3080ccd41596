use std::cmp::Ordering;
use std::collections::HashSet;

use crate::models::{Candidate, SelectionQuery, Subtitle};

/// Filters, ranks and dedupes candidates so at most one subtitle survives per
/// language: the highest rated one, or the first seen for unrated sources.
pub fn select(candidates: Vec<Candidate>, query: &SelectionQuery) -> Vec<Subtitle> {
    let mut ranked: Vec<Candidate> = match query.min_rating {
        Some(min) => candidates
            .into_iter()
            .filter(|c| c.rating.map_or(true, |r| r >= min))
            .collect(),
        None => candidates,
    };

    // Stable, so equal ratings and unrated sources keep upstream order.
    ranked.sort_by(|a, b| compare_ratings(b.rating, a.rating));

    // Taken before the language filter on purpose: it is the dedupe list.
    let mut eligible: HashSet<String> = ranked.iter().map(|c| c.lang.code.clone()).collect();

    if let Some(lang) = query.lang_filter.as_deref() {
        ranked.retain(|c| c.lang.code == lang);
    }

    ranked
        .into_iter()
        .filter(|c| eligible.remove(&c.lang.code))
        .map(Subtitle::from)
        .collect()
}

fn compare_ratings(a: Option<f64>, b: Option<f64>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => a.total_cmp(&b),
        (Some(_), None) => Ordering::Greater,
        (None, Some(_)) => Ordering::Less,
        (None, None) => Ordering::Equal,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::LanguageTag;

    fn candidate(code: &str, rating: Option<f64>, url: &str) -> Candidate {
        Candidate {
            lang: LanguageTag::new(code, code.to_uppercase()),
            rating,
            download_url: url.to_string(),
        }
    }

    fn sample() -> Vec<Candidate> {
        vec![
            candidate("en", Some(7.0), "en-7"),
            candidate("fr", Some(5.0), "fr-5"),
            candidate("en", Some(9.0), "en-9"),
        ]
    }

    fn urls(subtitles: &[Subtitle]) -> Vec<&str> {
        subtitles.iter().map(|s| s.url.as_str()).collect()
    }

    #[test]
    fn keeps_highest_rated_per_language() {
        let out = select(sample(), &SelectionQuery::default());
        assert_eq!(urls(&out), vec!["en-9", "fr-5"]);
    }

    #[test]
    fn min_rating_drops_lower_rated_languages() {
        let query = SelectionQuery {
            min_rating: Some(8.0),
            lang_filter: None,
        };
        let out = select(sample(), &query);
        assert_eq!(urls(&out), vec!["en-9"]);
    }

    #[test]
    fn lang_filter_ignores_rating() {
        let query = SelectionQuery {
            min_rating: None,
            lang_filter: Some("fr".to_string()),
        };
        let out = select(sample(), &query);
        assert_eq!(urls(&out), vec!["fr-5"]);
    }

    #[test]
    fn lang_filter_without_match_is_empty() {
        let query = SelectionQuery {
            min_rating: None,
            lang_filter: Some("de".to_string()),
        };
        assert!(select(sample(), &query).is_empty());
    }

    #[test]
    fn unrated_candidates_keep_upstream_order_and_survive_min_rating() {
        let input = vec![
            candidate("fr", None, "fr-a"),
            candidate("en", None, "en-a"),
            candidate("fr", None, "fr-b"),
        ];
        let query = SelectionQuery {
            min_rating: Some(3.0),
            lang_filter: None,
        };
        let out = select(input, &query);
        assert_eq!(urls(&out), vec!["fr-a", "en-a"]);
    }

    #[test]
    fn unparsable_ratings_rank_last() {
        let input = vec![
            candidate("en", Some(f64::NEG_INFINITY), "en-bad"),
            candidate("en", Some(0.0), "en-zero"),
        ];
        let out = select(input, &SelectionQuery::default());
        assert_eq!(urls(&out), vec!["en-zero"]);
    }
}
