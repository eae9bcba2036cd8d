// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Text normalization — an ordered list of small named rules that turn raw
// recognised text into clean schedule lines, followed by segmentation.

use std::sync::Arc;

use once_cell::sync::Lazy;
use regex::Regex;
use terminscan_core::config::ParserConfig;
use tracing::{debug, instrument};

use crate::dictionary::DictionaryMatcher;
use crate::patterns::{contains_date, is_noise_line, starts_with_time, time_of};
use crate::section::{SectionKind, SectionMarkers, Segmenter};

/// One normalization step over the whole list of lines.
pub trait NormalizationRule: Send + Sync {
    fn name(&self) -> &'static str;

    fn apply(&self, lines: Vec<String>) -> Vec<String>;
}

static ARTIFACTS: Lazy<Regex> = Lazy::new(|| Regex::new(r"[\[\]\\|]").expect("valid artifact regex"));
static LEADING_JUNK: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\s*(?:Z_|_+)\s*").expect("valid junk regex"));
static DATE_SEPARATORS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b(\d{2})[.:,](\d{2})[.:,](\d{4})\b").expect("valid date regex")
});
static LOOSE_TIME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d{1,2})[.:](\d{2})$").expect("valid time regex"));
static BOILERPLATE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(\d{1,2}:\d{2}(?:\s*-?\s*\d{1,2}:\d{2})?)\s+(?:RE|EZEE|Ba)\s+")
        .expect("valid boilerplate regex")
});

fn map_lines(lines: Vec<String>, f: impl Fn(&str) -> String) -> Vec<String> {
    lines.iter().map(|line| f(line)).collect()
}

// -- Rules --------------------------------------------------------------------

/// Bracket and bar artifacts, leading `_`/`Z_` junk, typographic quotes.
pub struct StripArtifacts;

impl NormalizationRule for StripArtifacts {
    fn name(&self) -> &'static str {
        "strip_artifacts"
    }

    fn apply(&self, lines: Vec<String>) -> Vec<String> {
        map_lines(lines, |line| {
            let line = ARTIFACTS.replace_all(line, "");
            let line = LEADING_JUNK.replace(&line, "");
            line.replace(['‘', '’', '´', '`', '‚', '′'], "'")
        })
    }
}

/// Single spaces, trimmed lines, no empty lines.
pub struct CollapseWhitespace;

impl NormalizationRule for CollapseWhitespace {
    fn name(&self) -> &'static str {
        "collapse_whitespace"
    }

    fn apply(&self, lines: Vec<String>) -> Vec<String> {
        lines
            .iter()
            .map(|line| line.split_whitespace().collect::<Vec<_>>().join(" "))
            .filter(|line| !line.is_empty())
            .collect()
    }
}

/// Print stamps, lone `CIM`, timestamps and page footers.
pub struct DropNoiseLines;

impl NormalizationRule for DropNoiseLines {
    fn name(&self) -> &'static str {
        "drop_noise_lines"
    }

    fn apply(&self, lines: Vec<String>) -> Vec<String> {
        lines.into_iter().filter(|line| !is_noise_line(line)).collect()
    }
}

/// Re-join a parenthesised note that recognition split over several lines.
///
/// Only continuation text is pulled in: a following line that starts an
/// appointment, carries a date or ends the schedule stops the join, even when
/// the closing parenthesis was never recognised.
pub struct JoinSplitParentheses {
    pub max_follow_lines: usize,
    pub markers: SectionMarkers,
}

impl JoinSplitParentheses {
    pub fn new(markers: SectionMarkers) -> Self {
        Self {
            max_follow_lines: 3,
            markers,
        }
    }

    fn starts_entry(&self, line: &str) -> bool {
        starts_with_time(line) || contains_date(line) || self.markers.is_section_end(line)
    }
}

impl Default for JoinSplitParentheses {
    fn default() -> Self {
        Self::new(SectionMarkers::default())
    }
}

fn paren_balance(line: &str) -> i32 {
    line.chars().fold(0, |depth, c| match c {
        '(' => depth + 1,
        ')' => depth - 1,
        _ => depth,
    })
}

impl NormalizationRule for JoinSplitParentheses {
    fn name(&self) -> &'static str {
        "join_split_parentheses"
    }

    fn apply(&self, lines: Vec<String>) -> Vec<String> {
        let mut out = Vec::with_capacity(lines.len());
        let mut iter = lines.into_iter().peekable();
        while let Some(mut line) = iter.next() {
            let mut joined = 0;
            while paren_balance(&line) > 0 && joined < self.max_follow_lines {
                let Some(next) = iter.next_if(|next| !self.starts_entry(next)) else {
                    break;
                };
                line.push(' ');
                line.push_str(&next);
                joined += 1;
            }
            out.push(line);
        }
        out
    }
}

/// `dd:mm,yyyy` and friends become `dd.mm.yyyy`.
pub struct StandardizeDates;

impl NormalizationRule for StandardizeDates {
    fn name(&self) -> &'static str {
        "standardize_dates"
    }

    fn apply(&self, lines: Vec<String>) -> Vec<String> {
        map_lines(lines, |line| {
            DATE_SEPARATORS.replace_all(line, "${1}.${2}.${3}").into_owned()
        })
    }
}

/// `8.15`, `8:15` and `08.15` become `08:15`, also inside `a-b` ranges.
pub struct StandardizeTimes;

fn standardize_time(piece: &str) -> Option<String> {
    let caps = LOOSE_TIME.captures(piece)?;
    let time = time_of(&caps[1], &caps[2])?;
    Some(time.format("%H:%M").to_string())
}

impl NormalizationRule for StandardizeTimes {
    fn name(&self) -> &'static str {
        "standardize_times"
    }

    fn apply(&self, lines: Vec<String>) -> Vec<String> {
        map_lines(lines, |line| {
            line.split(' ')
                .map(|token| {
                    token
                        .split('-')
                        .map(|piece| standardize_time(piece).unwrap_or_else(|| piece.to_string()))
                        .collect::<Vec<_>>()
                        .join("-")
                })
                .collect::<Vec<_>>()
                .join(" ")
        })
    }
}

/// Lone letters left over from ruling lines and table borders.
pub struct DropStrayTokens;

impl NormalizationRule for DropStrayTokens {
    fn name(&self) -> &'static str {
        "drop_stray_tokens"
    }

    fn apply(&self, lines: Vec<String>) -> Vec<String> {
        lines
            .iter()
            .map(|line| {
                line.split_whitespace()
                    .filter(|token| {
                        let mut chars = token.chars();
                        !matches!((chars.next(), chars.next()), (Some(c), None) if c.is_alphabetic())
                    })
                    .collect::<Vec<_>>()
                    .join(" ")
            })
            .filter(|line| !line.is_empty())
            .collect()
    }
}

/// `RE`, `EZEE` or `Ba` right after the leading time token.
pub struct StripBoilerplatePrefixes;

impl NormalizationRule for StripBoilerplatePrefixes {
    fn name(&self) -> &'static str {
        "strip_boilerplate_prefixes"
    }

    fn apply(&self, lines: Vec<String>) -> Vec<String> {
        map_lines(lines, |line| BOILERPLATE.replace(line, "${1} ").into_owned())
    }
}

/// The rules in the order they run.
pub fn default_rules(markers: &SectionMarkers) -> Vec<Box<dyn NormalizationRule>> {
    vec![
        Box::new(StripArtifacts),
        Box::new(CollapseWhitespace),
        Box::new(DropNoiseLines),
        Box::new(JoinSplitParentheses::new(markers.clone())),
        Box::new(StandardizeDates),
        Box::new(StandardizeTimes),
        Box::new(DropStrayTokens),
        Box::new(StripBoilerplatePrefixes),
    ]
}

// -- Normalizer ---------------------------------------------------------------

/// Normalized lines together with their section tags.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NormalizedText {
    pub lines: Vec<String>,
    pub sections: Vec<SectionKind>,
}

impl NormalizedText {
    pub fn text(&self) -> String {
        self.lines.join("\n")
    }

    fn lines_in(&self, kind: SectionKind) -> Vec<&str> {
        self.lines
            .iter()
            .zip(&self.sections)
            .filter(|(_, k)| **k == kind)
            .map(|(line, _)| line.as_str())
            .collect()
    }

    pub fn schedule_lines(&self) -> Vec<&str> {
        self.lines_in(SectionKind::DailySchedule)
    }

    pub fn general_info(&self) -> Vec<&str> {
        self.lines_in(SectionKind::GeneralInfo)
    }
}

/// Runs the rule pipeline and segments the result.
pub struct TextNormalizer {
    rules: Vec<Box<dyn NormalizationRule>>,
    segmenter: Segmenter,
}

impl TextNormalizer {
    pub fn new(config: &ParserConfig, matcher: Arc<DictionaryMatcher>) -> Self {
        let markers = SectionMarkers::from_config(config);
        Self::with_rules(default_rules(&markers), Segmenter::new(markers, matcher))
    }

    pub fn with_rules(rules: Vec<Box<dyn NormalizationRule>>, segmenter: Segmenter) -> Self {
        Self { rules, segmenter }
    }

    pub fn rule_names(&self) -> Vec<&'static str> {
        self.rules.iter().map(|rule| rule.name()).collect()
    }

    #[instrument(skip_all, fields(input_len = raw.len()))]
    pub fn normalize(&self, raw: &str) -> NormalizedText {
        let mut lines: Vec<String> = raw.lines().map(str::to_string).collect();
        for rule in &self.rules {
            let before = lines.len();
            lines = rule.apply(lines);
            debug!(rule = rule.name(), before, after = lines.len(), "Normalization rule applied");
        }
        let sections = self.segmenter.segment(&lines);
        NormalizedText { lines, sections }
    }
}

impl Default for TextNormalizer {
    fn default() -> Self {
        Self::new(&ParserConfig::default(), Arc::new(DictionaryMatcher::default()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, NaiveTime};

    use crate::parser::AppointmentParser;

    fn run(rule: &dyn NormalizationRule, lines: &[&str]) -> Vec<String> {
        rule.apply(lines.iter().map(|l| l.to_string()).collect())
    }

    #[test]
    fn strip_artifacts_removes_brackets_and_junk() {
        assert_eq!(
            run(&StripArtifacts, &["Z_08:00 [Forum] | C. Jordi", "__Termin", "30’"]),
            vec!["08:00 Forum  C. Jordi", "Termin", "30'"]
        );
    }

    #[test]
    fn collapse_whitespace_drops_empty_lines() {
        assert_eq!(
            run(&CollapseWhitespace, &["  08:00\t Forum  ", "   ", "Termin"]),
            vec!["08:00 Forum", "Termin"]
        );
    }

    #[test]
    fn noise_lines_are_dropped() {
        assert_eq!(
            run(&DropNoiseLines, &["12.01.2024 / - Plan", "CIM", "Seite 2 von 3", "08:00 Forum"]),
            vec!["08:00 Forum"]
        );
    }

    #[test]
    fn split_parentheses_are_joined() {
        assert_eq!(
            run(
                &JoinSplitParentheses::default(),
                &["10:00 Spaziergang (Treffpunkt", "Eingangshalle)", "11:00 Forum"]
            ),
            vec!["10:00 Spaziergang (Treffpunkt Eingangshalle)", "11:00 Forum"]
        );
    }

    #[test]
    fn open_parenthesis_does_not_swallow_following_appointments() {
        assert_eq!(
            run(
                &JoinSplitParentheses::default(),
                &["10:00 Spaziergang (Treffpunkt", "11:00 Forum", "12:00 Sucht"]
            ),
            vec!["10:00 Spaziergang (Treffpunkt", "11:00 Forum", "12:00 Sucht"]
        );
        assert_eq!(
            run(
                &JoinSplitParentheses::default(),
                &["17:00 Abendessen (Station", "Di. 02.01.2024", "08:00 Forum"]
            ),
            vec!["17:00 Abendessen (Station", "Di. 02.01.2024", "08:00 Forum"]
        );
        assert_eq!(
            run(&JoinSplitParentheses::default(), &["8.00 Sport (Halle", "Essenszeiten"]),
            vec!["8.00 Sport (Halle", "Essenszeiten"]
        );
    }

    #[test]
    fn unclosed_note_keeps_every_appointment_and_day() {
        let normalizer = TextNormalizer::default();
        let parser = AppointmentParser::default();

        let normalized =
            normalizer.normalize("Mo. 01.01.2024\n10:00 Spaziergang (Treffpunkt\n11:00 Forum\n12:00 Sucht");
        let report = parser.parse(&normalized.lines);
        let starts: Vec<_> = report.appointments.iter().map(|a| a.start.time()).collect();
        assert_eq!(
            starts,
            vec![
                NaiveTime::from_hms_opt(10, 0, 0).unwrap(),
                NaiveTime::from_hms_opt(11, 0, 0).unwrap(),
                NaiveTime::from_hms_opt(12, 0, 0).unwrap(),
            ]
        );
        assert_eq!(report.appointments[0].end.time(), NaiveTime::from_hms_opt(10, 30, 0).unwrap());

        let normalized =
            normalizer.normalize("Mo. 01.01.2024\n17:00 Abendessen (Station\nDi. 02.01.2024\n08:00 Forum");
        let report = parser.parse(&normalized.lines);
        let starts: Vec<_> = report.appointments.iter().map(|a| a.start).collect();
        assert_eq!(
            starts,
            vec![
                NaiveDate::from_ymd_opt(2024, 1, 1).unwrap().and_hms_opt(17, 0, 0).unwrap(),
                NaiveDate::from_ymd_opt(2024, 1, 2).unwrap().and_hms_opt(8, 0, 0).unwrap(),
            ]
        );
    }

    #[test]
    fn unbalanced_parenthesis_joins_at_most_three_lines() {
        let out = run(&JoinSplitParentheses::default(), &["a (", "b", "c", "d", "e"]);
        assert_eq!(out, vec!["a ( b c d", "e"]);
    }

    #[test]
    fn dates_get_dots() {
        assert_eq!(
            run(&StandardizeDates, &["Mo. 01:01,2024", "Di. 02.01.2024"]),
            vec!["Mo. 01.01.2024", "Di. 02.01.2024"]
        );
    }

    #[test]
    fn times_get_colons_and_padding() {
        assert_eq!(
            run(&StandardizeTimes, &["8.15 9:30 Forum", "8.00-9.00 Sport", "Mo. 01.01.2024", "25.00 Uhr"]),
            vec!["08:15 09:30 Forum", "08:00-09:00 Sport", "Mo. 01.01.2024", "25.00 Uhr"]
        );
    }

    #[test]
    fn stray_letters_are_dropped() {
        assert_eq!(
            run(&DropStrayTokens, &["08:00 i Forum C. Jordi", "x"]),
            vec!["08:00 Forum C. Jordi"]
        );
    }

    #[test]
    fn boilerplate_after_time_is_stripped() {
        assert_eq!(
            run(&StripBoilerplatePrefixes, &["08:00 09:00 EZEE Forum", "10:00 Ba Sport", "RE Forum"]),
            vec!["08:00 09:00 Forum", "10:00 Sport", "RE Forum"]
        );
    }

    #[test]
    fn rules_run_in_documented_order() {
        assert_eq!(
            TextNormalizer::default().rule_names(),
            vec![
                "strip_artifacts",
                "collapse_whitespace",
                "drop_noise_lines",
                "join_split_parentheses",
                "standardize_dates",
                "standardize_times",
                "drop_stray_tokens",
                "strip_boilerplate_prefixes",
            ]
        );
    }

    #[test]
    fn normalize_segments_schedule_and_general_info() {
        let raw = "Wochenplan\n\nMo. 01.01.2024\n8.00 [Forum]\nCIM\nPausen\n10:00 Kaffee\n";
        let normalized = TextNormalizer::default().normalize(raw);
        assert_eq!(
            normalized.lines,
            vec!["Wochenplan", "Mo. 01.01.2024", "08:00 Forum", "Pausen", "10:00 Kaffee"]
        );
        assert_eq!(normalized.schedule_lines(), vec!["Mo. 01.01.2024", "08:00 Forum"]);
        assert_eq!(normalized.general_info(), vec!["Pausen", "10:00 Kaffee"]);
    }
}
