// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Shared line patterns — date lines, time tokens, durations, noise, location
// phrases and organizer names — compiled once and used by both the normalizer
// and the appointment parser.

use chrono::{NaiveDate, NaiveTime};
use once_cell::sync::Lazy;
use regex::Regex;
use terminscan_core::DictionaryCategory;

use crate::dictionary::DictionaryMatcher;

// -- Dates --------------------------------------------------------------------

static DATE_LINE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(?:^|\s)(?:Mo|Di|Mi|Do|Fr|Sa|So)\.?\s*(\d{2})\.(\d{2})\.(\d{4})\b")
        .expect("valid date line regex")
});

/// A short leading token followed by a date; the token may be a misspelled weekday.
static LOOSE_DATE_LINE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(\S{1,5}?)\s*(\d{2})\.(\d{2})\.(\d{4})\b").expect("valid loose date line regex")
});

/// A line introducing a new day in the schedule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DateLine {
    Date(NaiveDate),
    /// Weekday and date shape matched, but the date does not exist.
    Invalid(String),
}

fn calendar_date(day: &str, month: &str, year: &str) -> DateLine {
    let parsed = match (day.parse(), month.parse(), year.parse()) {
        (Ok(d), Ok(m), Ok(y)) => NaiveDate::from_ymd_opt(y, m, d),
        _ => None,
    };
    match parsed {
        Some(date) => DateLine::Date(date),
        None => DateLine::Invalid(format!("{day}.{month}.{year}")),
    }
}

/// Recognise a day heading such as `Mo. 01.01.2024`.
///
/// A leading token that is not a weekday abbreviation is corrected through the
/// weekday dictionary before the line is accepted.
pub fn date_line(line: &str, matcher: &DictionaryMatcher) -> Option<DateLine> {
    if let Some(caps) = DATE_LINE.captures(line) {
        return Some(calendar_date(&caps[1], &caps[2], &caps[3]));
    }
    let caps = LOOSE_DATE_LINE.captures(line.trim_start())?;
    matcher.best_match_in(&caps[1], &[DictionaryCategory::WeekdayMarkers])?;
    Some(calendar_date(&caps[2], &caps[3], &caps[4]))
}

// -- Times --------------------------------------------------------------------

/// Leading start time, optionally followed by `- hh:mm` or a second `hh:mm`.
pub static LEADING_TIME: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?:[Z_]+\s*)?(\d{1,2}):(\d{2})\b(?:\s*-?\s*(\d{1,2}):(\d{2})\b)?")
        .expect("valid leading time regex")
});

/// A free-standing `hh:mm` or `hhmm` token.
pub static END_TIME: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?:^|\s)(?:(\d{1,2}):(\d{2})|(\d{2})(\d{2}))(?:\s|$)").expect("valid end time regex")
});

/// `45'` or `45 min`.
pub static DURATION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)(?:^|\s)(\d{2,3})\s*(?:'|min\b)").expect("valid duration regex"));

static TIME_TOKEN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d{1,2}[:.]\d{2}$").expect("valid time token regex"));

/// A leading clock time in any separator style, `8.15` as well as `08:15`.
static RAW_LEADING_TIME: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?:[Z_]+\s*)?\d{1,2}[.:]\d{2}\b").expect("valid raw leading time regex")
});

/// A `dd.mm.yyyy` date before or after separator clean-up.
static RAW_DATE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b\d{2}[.:,]\d{2}[.:,]\d{4}\b").expect("valid raw date regex"));

/// Whether the line is led by a clock time, so it opens an appointment.
pub fn starts_with_time(line: &str) -> bool {
    RAW_LEADING_TIME.is_match(line.trim_start())
}

/// Whether the line carries a calendar date.
pub fn contains_date(line: &str) -> bool {
    RAW_DATE.is_match(line)
}

/// Hour and minute strings to a time of day; `None` when out of range.
pub fn time_of(hour: &str, minute: &str) -> Option<NaiveTime> {
    NaiveTime::from_hms_opt(hour.parse().ok()?, minute.parse().ok()?, 0)
}

/// Whether a single token looks like a clock time.
pub fn is_time_token(token: &str) -> bool {
    TIME_TOKEN.is_match(token)
}

// -- Noise --------------------------------------------------------------------

static NOISE: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"^\d{2}\.\d{2}\.\d{4}\s*/\s*-",
        r"^CIM\s*$",
        r"^\s*:\s*['`]\s*\d{2}\.\d{2}\.\d{4}",
        r"(?i)^Seite\s+\d+\s+von\s+\d+\s*$",
    ]
    .into_iter()
    .map(|pattern| Regex::new(pattern).expect("valid noise regex"))
    .collect()
});

/// Print stamps, footers and other lines that never carry schedule content.
pub fn is_noise_line(line: &str) -> bool {
    NOISE.iter().any(|re| re.is_match(line))
}

// -- Locations and organizers -------------------------------------------------

static LOCATIONS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"GR\s*Matterhorn",
        r"Arztzimmer",
        r"Schulungsraum",
        r"Station\s*\d+",
        r"Eingangshalle(?:\s+Hauptgebäude)?",
        r"Auditorium(?:_|\s*)Go",
        r"Sitzungszimmer\s+Venus",
        r"Soz\.-Dienstzimmer(?:\s*\(Fr\.\s*Widmer\))?",
        r"Ergotherapieraum",
        r"TZ\s*\d+(?:\s*\(Treffpunkt\s+Eingangshalle(?:\s+Hauptgebäude)?\))?",
    ]
    .into_iter()
    .map(|pattern| Regex::new(pattern).expect("valid location regex"))
    .collect()
});

/// First known location phrase in `text`, as a byte range.
pub fn find_location(text: &str) -> Option<(usize, usize)> {
    LOCATIONS
        .iter()
        .filter_map(|re| re.find(text))
        .min_by_key(|m| m.start())
        .map(|m| (m.start(), m.end()))
}

/// Optional title, an initial and a surname: `Dr. med. S. Berend`, `C. Jordi`.
/// Group 1 is the surname.
pub static ORGANIZER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?:Dr\.\s*(?:med\.\s*)?)?\b[A-ZÄÖÜ]\.\s?((?:(?:De|Del|Di|Da|Van|Von)\s+)?[A-ZÄÖÜ][a-zäöüß]+(?:-[A-ZÄÖÜ][a-zäöüß]+)?)",
    )
    .expect("valid organizer regex")
});

// -- Description cleanup ------------------------------------------------------

static MEETING_POINT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s*\(\s*Treffpunkt[^)]*\)?").expect("valid meeting point regex"));
static EMPTY_PARENS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\(\s*\)").expect("valid empty parentheses regex"));
static PUNCT_ONLY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[-–—;:,.'/]+$").expect("valid punctuation regex"));

/// Tidy a description fragment: meeting-point notes, empty parentheses,
/// separators and lone punctuation go; `|` is read as `I`.
pub fn clean_description(text: &str) -> String {
    let text = text.replace('|', "I");
    let text = MEETING_POINT.replace_all(&text, " ");
    let text = EMPTY_PARENS.replace_all(&text, " ");
    let kept: Vec<&str> = text
        .split_whitespace()
        .filter(|token| !PUNCT_ONLY.is_match(token))
        .collect();
    kept.join(" ")
        .trim_start_matches(['-', '–', '—', ';', ':', ',', '.', ' '])
        .trim_end_matches(['-', '–', '—', ';', ':', ',', ' '])
        .to_string()
}
