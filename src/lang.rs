//! Language label normalization.
//!
//! Upstream sources describe languages loosely: the movie listing uses English
//! display names ("Farsi/Persian", "Big 5 code"), while episode subtitles only
//! carry hints inside their filenames ("Show.S01E02.French.C.orig.srt",
//! "show.s01e02.fre.srt"). Everything funnels into a [`LanguageTag`] holding an
//! ISO 639-1 code (or one of the extended codes below) and a display name.

use isolang::Language;

use crate::models::LanguageTag;

/// Languages the ISO 639-1 table can't express, keyed by display name.
const OVERRIDE_CODES: &[(&str, &str)] = &[
    ("Persian", "fa"),
    ("Chinese Simplified", "zh-Hans"),
    ("Chinese Traditional", "zh-Hant"),
    ("Brazilian Portuguese", "pt-BR"),
];

/// Common English names for ISO 639-1 languages whose ISO 639-3 reference
/// name reads differently ("Modern Greek (1453-)", "Panjabi", ...).
const COMMON_NAMES: &[(&str, &str)] = &[
    ("el", "Greek"),
    ("ms", "Malay"),
    ("ne", "Nepali"),
    ("sw", "Swahili"),
    ("or", "Oriya"),
    ("ps", "Pashto"),
    ("pa", "Punjabi"),
    ("ky", "Kyrgyz"),
    ("dv", "Divehi"),
    ("ia", "Interlingua"),
    ("oc", "Occitan"),
];

/// Maps labels seen on the listing site to the names used everywhere else.
fn alias(label: &str) -> Option<&'static str> {
    let name = match label {
        "Chinese BG code" => "Chinese Simplified",
        "Big 5 code" => "Chinese Traditional",
        "Brazillian Portuguese" => "Brazilian Portuguese",
        "Farsi/Persian" => "Persian",
        _ => return None,
    };
    Some(name)
}

/// ISO 639-2/B codes that differ from their 639-2/T (= 639-3) spelling.
fn bibliographic_to_terminology(code: &str) -> Option<&'static str> {
    let t = match code {
        "fre" => "fra",
        "ger" => "deu",
        "dut" => "nld",
        "gre" => "ell",
        "chi" => "zho",
        "cze" => "ces",
        "ice" => "isl",
        "alb" => "sqi",
        "arm" => "hye",
        "baq" => "eus",
        "bur" => "mya",
        "per" => "fas",
        "geo" => "kat",
        "may" => "msa",
        "mac" => "mkd",
        "rum" => "ron",
        "slo" => "slk",
        "wel" => "cym",
        _ => return None,
    };
    Some(t)
}

/// Code for a display name, or `None` when neither table knows it.
pub fn lookup_code(label: &str) -> Option<&'static str> {
    if let Some((_, code)) = OVERRIDE_CODES.iter().find(|(name, _)| *name == label) {
        return Some(*code);
    }
    standard_code(label)
}

/// Code for a display name. Unknown labels are passed through untouched, so
/// callers that care must compare against the input or use [`lookup_code`].
pub fn resolve_code(label: &str) -> String {
    lookup_code(label)
        .map(str::to_string)
        .unwrap_or_else(|| label.to_string())
}

/// Display name for a code or a raw label; unknown input comes back as is.
pub fn resolve_name(code: &str) -> String {
    if let Some(name) = alias(code) {
        return name.to_string();
    }
    if let Some((name, _)) = OVERRIDE_CODES.iter().find(|(_, c)| *c == code) {
        return name.to_string();
    }
    if let Some(name) = standard_name(code) {
        return name;
    }
    code.to_string()
}

/// Extracts the subtitle language from a release-style filename.
///
/// A `C` segment marks the track naming scheme where the language word sits
/// right before the marker (`...English.C.orig.srt`). Without the marker the
/// last 2–3 letter segment that is a language code wins.
pub fn derive_from_filename(filename: &str) -> Option<LanguageTag> {
    let mut segments: Vec<&str> = filename.split('.').collect();
    segments.pop();

    if let Some(marker) = segments.iter().position(|s| *s == "C") {
        let before = marker.checked_sub(1).map(|i| segments[i])?;
        if before.len() == 2 {
            let further = marker
                .checked_sub(2)
                .map(|i| segments[i])
                .and_then(tag_for_label);
            return further.or_else(|| tag_for_label(before));
        }
        return tag_for_label(before);
    }

    segments
        .iter()
        .filter(|s| (2..=3).contains(&s.len()))
        .filter_map(|s| code_from_segment(s))
        .last()
        .and_then(tag_for_label)
}

fn tag_for_label(label: &str) -> Option<LanguageTag> {
    let label: String = label.chars().filter(|c| *c != '(' && *c != ')').collect();
    let code = lookup_code(&label).or_else(|| known_code(&label))?;
    Some(LanguageTag::new(code, resolve_name(code)))
}

/// Accepts a label that already is a code we can emit.
fn known_code(label: &str) -> Option<&'static str> {
    if let Some((_, code)) = OVERRIDE_CODES.iter().find(|(_, c)| *c == label) {
        return Some(*code);
    }
    code_from_segment(label)
}

/// Two-letter code for a lowercase ISO 639-1, 639-3 or 639-2/B segment.
fn code_from_segment(segment: &str) -> Option<&'static str> {
    if !segment.chars().all(|c| c.is_ascii_lowercase()) {
        return None;
    }
    match segment.len() {
        2 => Language::from_639_1(segment).and_then(|l| l.to_639_1()),
        3 => {
            let t = bibliographic_to_terminology(segment).unwrap_or(segment);
            Language::from_639_3(t).and_then(|l| l.to_639_1())
        }
        _ => None,
    }
}

fn standard_code(name: &str) -> Option<&'static str> {
    if let Some((code, _)) = COMMON_NAMES.iter().find(|(_, n)| *n == name) {
        return Some(*code);
    }
    Language::from_name(name).and_then(|l| l.to_639_1())
}

fn standard_name(code: &str) -> Option<String> {
    if let Some((_, name)) = COMMON_NAMES.iter().find(|(c, _)| *c == code) {
        return Some(name.to_string());
    }
    let language = Language::from_639_1(code)?;
    let name = language.to_name();
    // Drop qualifiers like " (macrolanguage)".
    let name = name.split(" (").next().unwrap_or(name);
    Some(name.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn override_table_wins_over_standard_names() {
        assert_eq!(resolve_code("Persian"), "fa");
        assert_eq!(resolve_code("Brazilian Portuguese"), "pt-BR");
        assert_eq!(resolve_code("Chinese Simplified"), "zh-Hans");
        assert_eq!(resolve_code("Chinese Traditional"), "zh-Hant");
    }

    #[test]
    fn override_codes_round_trip_through_names() {
        for (_, code) in OVERRIDE_CODES {
            assert_eq!(resolve_code(&resolve_name(code)), *code);
        }
    }

    #[test]
    fn standard_names_resolve_to_iso_codes() {
        assert_eq!(resolve_code("English"), "en");
        assert_eq!(resolve_code("French"), "fr");
        assert_eq!(resolve_code("Greek"), "el");
        assert_eq!(resolve_code("Malay"), "ms");
        assert_eq!(resolve_name("en"), "English");
        assert_eq!(resolve_name("el"), "Greek");
    }

    #[test]
    fn unknown_labels_pass_through() {
        assert_eq!(lookup_code("Dothraki"), None);
        assert_eq!(resolve_code("Dothraki"), "Dothraki");
        assert_eq!(resolve_name("Dothraki"), "Dothraki");
    }

    #[test]
    fn listing_aliases_map_to_canonical_names() {
        assert_eq!(resolve_name("Farsi/Persian"), "Persian");
        assert_eq!(resolve_name("Big 5 code"), "Chinese Traditional");
        assert_eq!(resolve_code(&resolve_name("Chinese BG code")), "zh-Hans");
        assert_eq!(resolve_code(&resolve_name("Brazillian Portuguese")), "pt-BR");
    }

    #[test]
    fn filename_marker_uses_preceding_language_word() {
        let tag = derive_from_filename("Show - 01x02 - Pilot.HDTV.French.C.orig.Addic7ed.com.srt");
        assert_eq!(tag, Some(LanguageTag::new("fr", "French")));
    }

    #[test]
    fn filename_marker_after_two_letter_code() {
        let tag = derive_from_filename("Show.S01E02.en.C.srt");
        assert_eq!(tag, Some(LanguageTag::new("en", "English")));

        let tag = derive_from_filename("Show.S01E02.German.de.C.srt");
        assert_eq!(tag, Some(LanguageTag::new("de", "German")));
    }

    #[test]
    fn filename_marker_strips_parentheses() {
        let tag = derive_from_filename("Show.S01E02.(Persian).C.srt");
        assert_eq!(tag, Some(LanguageTag::new("fa", "Persian")));
    }

    #[test]
    fn filename_scan_takes_last_language_code() {
        let tag = derive_from_filename("show.s01e02.720p.en.fre.srt");
        assert_eq!(tag, Some(LanguageTag::new("fr", "French")));

        let tag = derive_from_filename("show.s01e02.it.srt");
        assert_eq!(tag, Some(LanguageTag::new("it", "Italian")));
    }

    #[test]
    fn filename_without_language_is_absent() {
        assert_eq!(derive_from_filename("Show.S01E02.srt"), None);
        assert_eq!(derive_from_filename("Show.S01E02.HI.srt"), None);
        assert_eq!(derive_from_filename("C.srt"), None);
        assert_eq!(derive_from_filename(""), None);
    }
}
