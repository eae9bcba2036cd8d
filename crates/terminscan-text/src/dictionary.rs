// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Fuzzy correction of recognised tokens against curated vocabularies.
//
// Similarity is the Sørensen–Dice coefficient over character bigrams,
// compared case-insensitively. A token is only replaced when the single best
// (entry, dictionary) pair beats that dictionary's own threshold; otherwise the
// token comes back unchanged.

use terminscan_core::{Dictionary, DictionaryCategory};
use tracing::trace;

// -- Built-in vocabularies ----------------------------------------------------

const WEEKDAY_MARKERS: &[&str] = &["Mo.", "Di.", "Mi.", "Do.", "Fr."];

const LOCATIONS: &[&str] = &[
    "Arztzimmer",
    "Hauptgebäude",
    "GR",
    "Matterhorn",
    "Schulungsraum",
    "ARTelier",
    "Auditorium_Go",
    "Haupteingang",
    "Ergotherapieraum",
    "Fitnessraum",
    "Sitzungszimmer",
    "Venus",
    "Soz.-Dienstzimmer",
    "TZ",
    "22",
    "Eingangshalle",
    "Küche",
];

const ORGANIZERS: &[&str] = &[
    "Castano", "Alicioglu", "Berend", "Butko", "Günes", "Capaul", "Jordi", "Nied",
    "Bütler", "Sundberg", "Amrein", "Autilio", "Breit", "Brömmer", "Filippo", "Koch",
    "Hierzer", "Köse", "Kusluk", "Müller-Welti", "Beer", "Guercio", "Holenweg",
    "Imboden", "Mahendran", "Scheumann", "Widmer", "Mallien", "Suter", "Scheurmann",
    "Friedli", "Baranowska", "Germann", "Oeggerli", "Erni",
];

const EXPECTED_WORDS: &[&str] = &[
    "Melden",
    "bei",
    "der",
    "Pflege",
    "Aktivierungsspaziergang",
    "Selbstmanagement",
    "Eintrittsdiagnostik",
    "Bedarfsvisite",
    "Termin",
    "Station",
    "Mittagessen",
    "Gruppentherapie",
    "Einzeltherapie",
    "Forum",
    "STAIR-AR",
    "Einführung",
    "Psychoed.",
    "Sucht",
    "RPT",
    "Einzel",
    "Sozialdienst",
    "Willkommensrunde",
    "Ergotherapie",
    "S.T.A.R.K.",
    "Erstgespräch",
    "Aufnahme",
    "Ärztl.",
    "Patientenadministration",
    "Abendessen",
    "mit",
    "Götti",
    "Sporttherapie",
    "Kunsttherapie",
    "Themenzentriertes",
    "Gestalten",
    "Begleitung",
    "Haushaltstraining",
    "Cogpack",
    "Küchenkleider",
    "in",
    "Wäscherei",
    "abholen",
    "Ergo",
    "Küche",
    "Erholung",
    "Natur",
    "kreativer",
    "Ausdruck",
    "Recoverygruppe",
];

/// The four default vocabularies, in lookup order.
pub fn builtin_dictionaries() -> Vec<Dictionary> {
    vec![
        Dictionary::new(DictionaryCategory::WeekdayMarkers, 0.85, WEEKDAY_MARKERS.iter().copied()),
        Dictionary::new(DictionaryCategory::Locations, 0.85, LOCATIONS.iter().copied()),
        Dictionary::new(DictionaryCategory::Organizers, 0.55, ORGANIZERS.iter().copied()),
        Dictionary::new(DictionaryCategory::ExpectedWords, 0.8, EXPECTED_WORDS.iter().copied()),
    ]
}

// -- Matching -----------------------------------------------------------------

/// Case-insensitive Sørensen–Dice similarity in 0.0..=1.0.
pub fn similarity(a: &str, b: &str) -> f64 {
    strsim::sorensen_dice(&a.to_lowercase(), &b.to_lowercase())
}

/// An accepted correction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DictionaryMatch<'a> {
    pub entry: &'a str,
    pub category: DictionaryCategory,
    pub similarity: f64,
}

/// Best (entry, dictionary) pair over `dictionaries`, accepted only above that
/// dictionary's threshold. Earlier dictionaries and entries win ties.
fn best_over<'a>(
    token: &str,
    dictionaries: impl IntoIterator<Item = &'a Dictionary>,
) -> Option<DictionaryMatch<'a>> {
    let mut best: Option<(DictionaryMatch<'a>, f64)> = None;
    for dictionary in dictionaries {
        for entry in &dictionary.entries {
            let score = similarity(token, entry);
            if best.as_ref().is_none_or(|(b, _)| score > b.similarity) {
                best = Some((
                    DictionaryMatch {
                        entry,
                        category: dictionary.category,
                        similarity: score,
                    },
                    dictionary.similarity_threshold,
                ));
            }
        }
    }
    let (candidate, threshold) = best?;
    (candidate.similarity > threshold).then_some(candidate)
}

/// Correct `token` against `dictionaries`, or return it unchanged.
pub fn find_best_match(token: &str, dictionaries: &[Dictionary]) -> String {
    match best_over(token, dictionaries) {
        Some(found) => found.entry.to_string(),
        None => token.to_string(),
    }
}

/// The session's vocabularies. Immutable once built.
#[derive(Debug, Clone)]
pub struct DictionaryMatcher {
    dictionaries: Vec<Dictionary>,
}

impl Default for DictionaryMatcher {
    fn default() -> Self {
        Self::new(builtin_dictionaries())
    }
}

impl DictionaryMatcher {
    pub fn new(dictionaries: Vec<Dictionary>) -> Self {
        Self { dictionaries }
    }

    /// Configured vocabularies, or the built-in ones when none are configured.
    pub fn from_config(dictionaries: Option<Vec<Dictionary>>) -> Self {
        dictionaries.map(Self::new).unwrap_or_default()
    }

    pub fn dictionaries(&self) -> &[Dictionary] {
        &self.dictionaries
    }

    /// Best accepted match across every dictionary.
    pub fn best_match(&self, token: &str) -> Option<DictionaryMatch<'_>> {
        best_over(token, &self.dictionaries)
    }

    /// Best accepted match across the dictionaries of the given categories.
    pub fn best_match_in(
        &self,
        token: &str,
        categories: &[DictionaryCategory],
    ) -> Option<DictionaryMatch<'_>> {
        best_over(
            token,
            self.dictionaries
                .iter()
                .filter(|d| categories.contains(&d.category)),
        )
    }

    /// Corrected token, or the token itself on a miss.
    pub fn correct(&self, token: &str) -> String {
        find_best_match(token, &self.dictionaries)
    }

    /// Correct every purely alphabetic token of four or more characters.
    pub fn correct_tokens(&self, line: &str) -> String {
        line.split_whitespace()
            .map(|token| {
                let correctable = token.chars().count() >= 4 && token.chars().all(char::is_alphabetic);
                if !correctable {
                    return token.to_string();
                }
                match self.best_match(token) {
                    Some(found) if found.entry != token => {
                        trace!(token, corrected = found.entry, category = %found.category, "Token corrected");
                        found.entry.to_string()
                    }
                    _ => token.to_string(),
                }
            })
            .collect::<Vec<_>>()
            .join(" ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn organizers() -> Dictionary {
        Dictionary::new(DictionaryCategory::Organizers, 0.55, ORGANIZERS.iter().copied())
    }

    #[test]
    fn misspelled_organizer_is_corrected() {
        assert_eq!(find_best_match("Jorndi", &[organizers()]), "Jordi");
    }

    #[test]
    fn unrelated_token_is_returned_unchanged() {
        assert_eq!(find_best_match("xyz123", &builtin_dictionaries()), "xyz123");
    }

    #[test]
    fn similarity_ignores_case() {
        assert_eq!(similarity("FORUM", "forum"), 1.0);
        assert!(similarity("Forum", "Farum") < 1.0);
    }

    #[test]
    fn threshold_must_be_exceeded() {
        // "Koch" vs "Kochen": 3 shared bigrams of 3 + 5 gives exactly 0.75.
        let strict = Dictionary::new(DictionaryCategory::ExpectedWords, 0.75, ["Kochen"]);
        assert_eq!(find_best_match("Koch", std::slice::from_ref(&strict)), "Koch");
        let loose = Dictionary::new(DictionaryCategory::ExpectedWords, 0.7, ["Kochen"]);
        assert_eq!(find_best_match("Koch", &[loose]), "Kochen");
    }

    #[test]
    fn best_pair_is_checked_against_its_own_threshold() {
        // Best pair overall comes from the strict dictionary and misses it;
        // the weaker candidate in the loose dictionary must not be used.
        let strict = Dictionary::new(DictionaryCategory::Locations, 0.95, ["Forums"]);
        let loose = Dictionary::new(DictionaryCategory::Organizers, 0.1, ["Farm"]);
        assert_eq!(find_best_match("Forum", &[strict, loose]), "Forum");
    }

    #[test]
    fn match_reports_category() {
        let matcher = DictionaryMatcher::default();
        let found = matcher.best_match("Matterhorm").expect("match");
        assert_eq!(found.entry, "Matterhorn");
        assert_eq!(found.category, DictionaryCategory::Locations);
        assert!(matcher
            .best_match_in("Matterhorm", &[DictionaryCategory::Organizers])
            .is_none());
    }

    #[test]
    fn correct_tokens_leaves_short_and_mixed_tokens() {
        let matcher = DictionaryMatcher::default();
        assert_eq!(
            matcher.correct_tokens("Gruppentherapic 08:00 in Ergo"),
            "Gruppentherapie 08:00 in Ergo"
        );
        assert_eq!(matcher.correct_tokens("RPT2 abc"), "RPT2 abc");
    }

    #[test]
    fn configured_dictionaries_replace_builtins() {
        let matcher = DictionaryMatcher::from_config(Some(vec![organizers()]));
        assert_eq!(matcher.dictionaries().len(), 1);
        assert_eq!(DictionaryMatcher::from_config(None).dictionaries().len(), 4);
    }
}
