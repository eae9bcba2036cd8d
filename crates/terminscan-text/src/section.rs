// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Schedule / general-information segmentation.
//
// A weekly plan is a run of day blocks followed by free-form information
// (medication times, meal times, breaks). Section-end keywords open an
// information region; the next day heading closes it again.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use terminscan_core::config::ParserConfig;

use crate::dictionary::{DictionaryMatcher, similarity};
use crate::patterns::{date_line, starts_with_time};

/// Fuzzy detector for lines that end the daily schedule.
#[derive(Debug, Clone)]
pub struct SectionMarkers {
    keywords: Vec<String>,
    min_similarity: f64,
}

impl Default for SectionMarkers {
    fn default() -> Self {
        Self::from_config(&ParserConfig::default())
    }
}

impl SectionMarkers {
    pub fn new(keywords: Vec<String>, min_similarity: f64) -> Self {
        Self {
            keywords,
            min_similarity,
        }
    }

    pub fn from_config(config: &ParserConfig) -> Self {
        Self::new(config.section_end_keywords.clone(), config.keyword_similarity)
    }

    /// Substring match on any keyword, or a token similar enough to one.
    ///
    /// Time-led lines are appointments and only end the schedule on an exact
    /// keyword; `10:00 Pause` is not the `Pausen` heading.
    pub fn is_section_end(&self, line: &str) -> bool {
        let lower = line.to_lowercase();
        if self
            .keywords
            .iter()
            .any(|keyword| lower.contains(&keyword.to_lowercase()))
        {
            return true;
        }
        if starts_with_time(line) {
            return false;
        }
        lower
            .split(|c: char| !c.is_alphanumeric() && c != '-')
            .filter(|token| token.chars().count() >= 4)
            .any(|token| {
                self.keywords
                    .iter()
                    .any(|keyword| similarity(token, keyword) > self.min_similarity)
            })
    }
}

/// Which part of the plan a line belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SectionKind {
    /// Before the first day heading.
    Header,
    DailySchedule,
    GeneralInfo,
}

/// Tags normalized lines with their [`SectionKind`].
#[derive(Debug, Clone)]
pub struct Segmenter {
    markers: SectionMarkers,
    matcher: Arc<DictionaryMatcher>,
}

impl Segmenter {
    pub fn new(markers: SectionMarkers, matcher: Arc<DictionaryMatcher>) -> Self {
        Self { markers, matcher }
    }

    pub fn segment<S: AsRef<str>>(&self, lines: &[S]) -> Vec<SectionKind> {
        let mut current = SectionKind::Header;
        lines
            .iter()
            .map(|line| {
                let line = line.as_ref();
                if date_line(line, &self.matcher).is_some() {
                    current = SectionKind::DailySchedule;
                } else if self.markers.is_section_end(line) {
                    current = SectionKind::GeneralInfo;
                }
                current
            })
            .collect()
    }
}
