// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// An appointment under construction. Times are fixed when the builder opens;
// description text accumulates from continuation lines, and location and
// organizers are pulled out of it when the builder is finished.

use chrono::NaiveDateTime;
use terminscan_core::{Appointment, DictionaryCategory};

use crate::dictionary::DictionaryMatcher;
use crate::patterns::{ORGANIZER, clean_description, find_location};

#[derive(Debug, Clone)]
pub struct AppointmentBuilder {
    start: NaiveDateTime,
    end: NaiveDateTime,
    fragments: Vec<String>,
    raw_text: String,
}

fn single_spaced(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn token_core(token: &str) -> &str {
    token.trim_end_matches(['.', ',', ';', ':'])
}

/// Remove and return the first token `pick` accepts.
fn take_token(text: &mut String, mut pick: impl FnMut(&str) -> Option<String>) -> Option<String> {
    let tokens: Vec<&str> = text.split_whitespace().collect();
    let (index, found) = tokens
        .iter()
        .enumerate()
        .find_map(|(i, token)| pick(token).map(|found| (i, found)))?;
    let rest: Vec<&str> = tokens
        .iter()
        .enumerate()
        .filter(|(i, _)| *i != index)
        .map(|(_, token)| *token)
        .collect();
    *text = rest.join(" ");
    Some(found)
}

impl AppointmentBuilder {
    /// `end` must already be resolved and lie after `start`.
    pub fn new(start: NaiveDateTime, end: NaiveDateTime, raw_text: impl Into<String>) -> Self {
        Self {
            start,
            end,
            fragments: Vec::new(),
            raw_text: raw_text.into(),
        }
    }

    pub fn start(&self) -> NaiveDateTime {
        self.start
    }

    pub fn end(&self) -> NaiveDateTime {
        self.end
    }

    /// Append a description fragment (the rest of the time line, or a
    /// continuation line).
    pub fn push_text(&mut self, text: &str) {
        let cleaned = clean_description(text);
        if !cleaned.is_empty() {
            self.fragments.push(cleaned);
        }
    }

    fn extract_location(text: &mut String, matcher: &DictionaryMatcher) -> Option<String> {
        if let Some((start, end)) = find_location(text) {
            let location = single_spaced(&text[start..end]);
            text.replace_range(start..end, " ");
            return Some(location);
        }
        take_token(text, |token| {
            let core = token_core(token);
            if core.chars().count() < 2 {
                return None;
            }
            matcher
                .best_match(core)
                .filter(|found| found.category == DictionaryCategory::Locations)
                .map(|found| found.entry.to_string())
        })
    }

    fn extract_organizers(text: &mut String, matcher: &DictionaryMatcher) -> Vec<String> {
        let mut organizers = Vec::new();
        let mut spans = Vec::new();
        for caps in ORGANIZER.captures_iter(text) {
            let (Some(whole), Some(surname)) = (caps.get(0), caps.get(1)) else {
                continue;
            };
            let corrected = matcher
                .best_match_in(surname.as_str(), &[DictionaryCategory::Organizers])
                .map_or(surname.as_str(), |found| found.entry);
            let prefix = &text[whole.start()..surname.start()];
            organizers.push(single_spaced(&format!("{prefix}{corrected}")));
            spans.push(whole.range());
        }
        for span in spans.into_iter().rev() {
            text.replace_range(span, " ");
        }

        if organizers.is_empty() {
            while let Some(name) = take_token(text, |token| {
                let core = token_core(token);
                let capitalized = core.chars().next().is_some_and(char::is_uppercase);
                let wordlike = core.chars().all(|c| c.is_alphabetic() || c == '-');
                if !capitalized || !wordlike || core.chars().count() < 4 {
                    return None;
                }
                matcher
                    .best_match(core)
                    .filter(|found| found.category == DictionaryCategory::Organizers)
                    .map(|found| found.entry.to_string())
            }) {
                organizers.push(name);
            }
        }
        organizers
    }

    /// Pull out location and organizers and tidy the description. `None`
    /// when the appointment carries no text at all.
    pub fn finish(self, matcher: &DictionaryMatcher) -> Option<Appointment> {
        let full_text = single_spaced(&self.fragments.join(" "));
        if full_text.is_empty() {
            return None;
        }

        let mut rest = full_text.clone();
        let location = Self::extract_location(&mut rest, matcher);
        let organizers = Self::extract_organizers(&mut rest, matcher);

        let mut description = matcher.correct_tokens(&clean_description(&rest));
        if description.is_empty() {
            description = full_text;
        }

        Some(Appointment {
            start: self.start,
            end: self.end,
            description,
            location,
            organizers,
            raw_text: self.raw_text,
        })
    }
}
