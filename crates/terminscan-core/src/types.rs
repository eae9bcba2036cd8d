// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Core domain types for Terminscan.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for one capture run (one or more photographs of the same
/// schedule page). Recorded in tracing spans.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CaptureId(pub Uuid);

impl CaptureId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for CaptureId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for CaptureId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// -- Image quality ------------------------------------------------------------

/// Sharpness, exposure and motion-blur metrics of a captured photograph.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QualityReport {
    /// Mean Sobel gradient magnitude per pixel.
    pub sharpness_score: f64,
    pub is_sharp: bool,
    /// Midpoint of the 5th/95th luminance percentiles, normalised to 0..1.
    pub brightness_score: f64,
    /// Spread of the 5th/95th luminance percentiles, normalised to 0..1.
    pub contrast_score: f64,
    pub is_good: bool,
    /// Mean directional colour difference between neighbouring pixels.
    pub blur_score: f64,
    pub is_not_blurred: bool,
}

impl QualityReport {
    /// Whether all three checks passed.
    pub fn passed(&self) -> bool {
        self.is_sharp && self.is_good && self.is_not_blurred
    }
}

/// A reason a capture was rejected by the quality gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum QualityIssue {
    Unsharp,
    TooDark,
    TooBright,
    LowContrast,
    MotionBlur,
}

impl QualityIssue {
    /// Short description, as shown next to the capture preview.
    pub fn message(&self) -> &'static str {
        match self {
            Self::Unsharp => "Image is unsharp",
            Self::TooDark => "Image is too dark",
            Self::TooBright => "Image is too bright",
            Self::LowContrast => "Image has too little contrast",
            Self::MotionBlur => "Image has motion blur",
        }
    }
}

impl std::fmt::Display for QualityIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.message())
    }
}

// -- Enhancement --------------------------------------------------------------

/// Named parameter set for one binarized enhancement variant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariantSpec {
    pub name: String,
    /// Contrast factor around mid-grey; 1.0 is a no-op.
    pub contrast: f32,
    /// Multiplicative brightness factor; 1.0 is a no-op.
    pub brightness: f32,
    /// Weight of the four-neighbour sharpening term; 0.0 disables it.
    pub sharpen_amount: f32,
    /// Luminance above which a pixel becomes white.
    pub threshold: u8,
    /// Power-law exponent applied after sharpening.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gamma: Option<f32>,
    /// Radial brightness compensation, strongest at the image corners.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vignette_strength: Option<f32>,
}

// -- Recognition --------------------------------------------------------------

/// Top-left corner of a recognised word, in image pixels.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x: f32,
    pub y: f32,
}

/// A single word reported by the recognition engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OcrWord {
    pub text: String,
    /// Engine confidence in the range 0..=100.
    pub confidence: f32,
    pub bounding_box: BoundingBox,
}

impl OcrWord {
    pub fn new(text: impl Into<String>, confidence: f32, x: f32, y: f32) -> Self {
        Self {
            text: text.into(),
            confidence: confidence.clamp(0.0, 100.0),
            bounding_box: BoundingBox { x, y },
        }
    }
}

/// Everything one recognition pass produced.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RecognitionOutput {
    pub text: String,
    pub words: Vec<OcrWord>,
    /// Mean confidence of the pass (0..=100).
    pub confidence: f32,
}

/// Language model and character whitelist handed to the recognition engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecognitionOptions {
    pub language_model: String,
    pub char_whitelist: String,
}

impl Default for RecognitionOptions {
    fn default() -> Self {
        Self {
            language_model: "deu".into(),
            char_whitelist:
                "ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyzäöüÄÖÜß.-_0123456789: "
                    .into(),
        }
    }
}

impl RecognitionOptions {
    /// Whether `c` may appear in recognised text.
    pub fn allows(&self, c: char) -> bool {
        self.char_whitelist.is_empty() || self.char_whitelist.contains(c)
    }
}

// -- Dictionaries -------------------------------------------------------------

/// The four fixed vocabularies used for fuzzy correction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DictionaryCategory {
    WeekdayMarkers,
    Locations,
    Organizers,
    ExpectedWords,
}

impl DictionaryCategory {
    pub fn label(&self) -> &'static str {
        match self {
            Self::WeekdayMarkers => "weekday-markers",
            Self::Locations => "locations",
            Self::Organizers => "organizers",
            Self::ExpectedWords => "expected-words",
        }
    }
}

impl std::fmt::Display for DictionaryCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// A curated vocabulary with its acceptance threshold.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dictionary {
    pub category: DictionaryCategory,
    /// Entries in priority order; earlier entries win ties.
    pub entries: Vec<String>,
    /// A match is accepted only when similarity strictly exceeds this value.
    pub similarity_threshold: f64,
}

impl Dictionary {
    pub fn new<I, S>(category: DictionaryCategory, threshold: f64, entries: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            category,
            entries: entries.into_iter().map(Into::into).collect(),
            similarity_threshold: threshold,
        }
    }
}

// -- Appointments -------------------------------------------------------------

/// One calendar entry extracted from the schedule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Appointment {
    pub start: NaiveDateTime,
    /// Always strictly after `start`.
    pub end: NaiveDateTime,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default)]
    pub organizers: Vec<String>,
    /// The schedule line the appointment was opened from.
    pub raw_text: String,
}

impl Appointment {
    pub fn duration(&self) -> chrono::Duration {
        self.end - self.start
    }
}
