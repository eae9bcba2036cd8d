// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Appointment parser — a line scanner over normalized schedule text.
//
// Day headings anchor the date, time-led lines open appointments, and
// everything else either continues the open appointment or is ignored. A
// section-end keyword switches to general information until the next day.

pub mod builder;

use std::ops::Range;
use std::sync::Arc;

use chrono::{Duration, NaiveDate, NaiveTime};
use serde::Serialize;
use terminscan_core::Appointment;
use terminscan_core::config::ParserConfig;
use tracing::{debug, info, instrument};

use crate::dictionary::DictionaryMatcher;
use crate::patterns::{self, DURATION, DateLine, END_TIME, LEADING_TIME, time_of};
use crate::section::SectionMarkers;

pub use builder::AppointmentBuilder;

/// Why a line produced nothing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case", tag = "kind", content = "detail")]
pub enum SkipReason {
    Noise,
    InvalidDate(String),
    InvalidTime(String),
    EmptyAppointment,
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Noise => f.write_str("noise line"),
            Self::InvalidDate(date) => write!(f, "invalid calendar date {date}"),
            Self::InvalidTime(time) => write!(f, "invalid start time {time}"),
            Self::EmptyAppointment => f.write_str("appointment without text"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SkippedLine {
    /// One-based.
    pub line_number: usize,
    pub text: String,
    pub reason: SkipReason,
}

/// Parser output: the appointments, sorted by start, and what was skipped.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ParseReport {
    pub appointments: Vec<Appointment>,
    pub skipped: Vec<SkippedLine>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ScanState {
    ScanningHeader,
    InDailySchedule(NaiveDate),
    InGeneralInfo,
}

fn record_skip(report: &mut ParseReport, line_number: usize, line: &str, reason: SkipReason) {
    debug!(line_number, %reason, "Line skipped");
    report.skipped.push(SkippedLine {
        line_number,
        text: line.to_string(),
        reason,
    });
}

/// Open appointment together with the line it came from.
struct Pending {
    builder: AppointmentBuilder,
    line_number: usize,
    line: String,
}

pub struct AppointmentParser {
    matcher: Arc<DictionaryMatcher>,
    markers: SectionMarkers,
    default_duration: Duration,
}

impl Default for AppointmentParser {
    fn default() -> Self {
        Self::new(&ParserConfig::default(), Arc::new(DictionaryMatcher::default()))
    }
}

impl AppointmentParser {
    pub fn new(config: &ParserConfig, matcher: Arc<DictionaryMatcher>) -> Self {
        Self {
            matcher,
            markers: SectionMarkers::from_config(config),
            // A zero default would give appointments that end as they start.
            default_duration: Duration::minutes(i64::from(
                config.default_duration_minutes.max(1),
            )),
        }
    }

    /// Parse newline-separated text.
    pub fn parse_text(&self, text: &str) -> ParseReport {
        let lines: Vec<&str> = text.lines().collect();
        self.parse(&lines)
    }

    #[instrument(skip_all, fields(lines = lines.len()))]
    pub fn parse<S: AsRef<str>>(&self, lines: &[S]) -> ParseReport {
        let mut report = ParseReport::default();
        let mut state = ScanState::ScanningHeader;
        let mut open: Option<Pending> = None;

        for (index, line) in lines.iter().enumerate() {
            let line = line.as_ref().trim();
            let line_number = index + 1;
            if line.is_empty() {
                continue;
            }
            if patterns::is_noise_line(line) {
                record_skip(&mut report, line_number, line, SkipReason::Noise);
                continue;
            }

            match patterns::date_line(line, &self.matcher) {
                Some(DateLine::Date(date)) => {
                    self.flush(&mut open, &mut report);
                    state = ScanState::InDailySchedule(date);
                    continue;
                }
                Some(DateLine::Invalid(date)) => {
                    record_skip(&mut report, line_number, line, SkipReason::InvalidDate(date));
                    continue;
                }
                None => {}
            }

            if self.markers.is_section_end(line) {
                self.flush(&mut open, &mut report);
                state = ScanState::InGeneralInfo;
                continue;
            }

            let ScanState::InDailySchedule(date) = state else {
                continue;
            };

            if LEADING_TIME.is_match(line) {
                self.flush(&mut open, &mut report);
                match self.open_appointment(line, date) {
                    Ok(builder) => {
                        open = Some(Pending {
                            builder,
                            line_number,
                            line: line.to_string(),
                        })
                    }
                    Err(reason) => record_skip(&mut report, line_number, line, reason),
                }
                continue;
            }

            if let Some(pending) = open.as_mut() {
                pending.builder.push_text(line);
            }
        }
        self.flush(&mut open, &mut report);

        report.appointments.sort_by_key(|a| a.start);
        info!(
            appointments = report.appointments.len(),
            skipped = report.skipped.len(),
            "Schedule parsed"
        );
        report
    }

    fn flush(&self, open: &mut Option<Pending>, report: &mut ParseReport) {
        let Some(pending) = open.take() else { return };
        match pending.builder.finish(&self.matcher) {
            Some(appointment) => report.appointments.push(appointment),
            None => report.skipped.push(SkippedLine {
                line_number: pending.line_number,
                text: pending.line,
                reason: SkipReason::EmptyAppointment,
            }),
        }
    }

    /// Resolve start and end from a time-led line and start a builder.
    fn open_appointment(&self, line: &str, date: NaiveDate) -> Result<AppointmentBuilder, SkipReason> {
        let caps = LEADING_TIME
            .captures(line)
            .ok_or_else(|| SkipReason::InvalidTime(line.to_string()))?;
        let start_time = time_of(&caps[1], &caps[2])
            .ok_or_else(|| SkipReason::InvalidTime(format!("{}:{}", &caps[1], &caps[2])))?;
        let start = date.and_time(start_time);
        let after_start = |time: NaiveTime| time > start_time;

        let second = match (caps.get(3), caps.get(4)) {
            (Some(h), Some(m)) => time_of(h.as_str(), m.as_str()).filter(|t| after_start(*t)),
            _ => None,
        };
        let mut rest = line[caps.get(0).map_or(0, |m| m.end())..].to_string();

        // Time and duration tokens never belong to the description, whichever
        // of them ends up setting the end.
        let mut consumed: Vec<Range<usize>> = Vec::new();
        let mut explicit_end = None;
        for c in END_TIME.captures_iter(&rest) {
            let (h, m, colon) = match (c.get(1), c.get(2), c.get(3), c.get(4)) {
                (Some(h), Some(m), _, _) => (h, m, true),
                (_, _, Some(h), Some(m)) => (h, m, false),
                _ => continue,
            };
            let Some(time) = time_of(h.as_str(), m.as_str()) else {
                continue;
            };
            if explicit_end.is_none() && after_start(time) {
                explicit_end = Some(time);
                consumed.push(h.start()..m.end());
            } else if colon {
                consumed.push(h.start()..m.end());
            }
        }
        let duration = DURATION.captures(&rest).and_then(|c| {
            let digits = c.get(1)?;
            let minutes: i64 = digits.as_str().parse().ok().filter(|m| *m > 0)?;
            Some((digits.start()..c.get(0)?.end(), minutes))
        });
        if let Some((range, _)) = &duration {
            consumed.push(range.clone());
        }

        let end = match (second, explicit_end, duration) {
            (Some(end_time), _, _) | (None, Some(end_time), _) => date.and_time(end_time),
            (None, None, Some((_, minutes))) => start + Duration::minutes(minutes),
            (None, None, None) => start + self.default_duration,
        };

        consumed.sort_by_key(|range| std::cmp::Reverse(range.start));
        let mut limit = rest.len();
        for range in consumed {
            if range.end <= limit {
                limit = range.start;
                rest.replace_range(range, " ");
            }
        }

        let mut builder = AppointmentBuilder::new(start, end, line);
        builder.push_text(&rest);
        Ok(builder)
    }
}
