// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// terminscan-text — Text side of the Terminscan pipeline.
//
// Reconciles words from several recognition passes, normalizes the recognised
// text, corrects tokens against curated vocabularies and scans the schedule
// into appointments.

pub mod cluster;
pub mod dictionary;
pub mod normalize;
pub mod parser;
pub mod patterns;
pub mod section;

pub use cluster::{MergedText, WordCluster, WordClusterer};
pub use dictionary::{DictionaryMatch, DictionaryMatcher, find_best_match};
pub use normalize::{NormalizedText, TextNormalizer};
pub use parser::{AppointmentParser, ParseReport, SkipReason, SkippedLine};
pub use section::{SectionKind, SectionMarkers, Segmenter};
