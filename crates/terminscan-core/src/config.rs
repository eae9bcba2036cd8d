// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Pipeline configuration. Every section has working defaults; a TOML file only
// needs to name the values it overrides.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Result, TerminError};
use crate::types::{Dictionary, RecognitionOptions, VariantSpec};

/// Settings for one capture run, loaded once at process start.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub quality: QualityThresholds,
    pub enhancer: EnhancerConfig,
    pub recognition: RecognitionConfig,
    pub clustering: ClusterConfig,
    pub parser: ParserConfig,
    /// Replaces the built-in vocabularies when present.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dictionaries: Option<Vec<Dictionary>>,
}

impl PipelineConfig {
    /// Parse a configuration from TOML text.
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: Self = toml::from_str(text)
            .map_err(|err| TerminError::Config(format!("invalid configuration: {}", err)))?;
        config.validate()?;
        Ok(config)
    }

    /// Load a configuration file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path.as_ref())?;
        Self::from_toml_str(&text).map_err(|err| match err {
            TerminError::Config(detail) => {
                TerminError::Config(format!("{}: {}", path.as_ref().display(), detail))
            }
            other => other,
        })
    }

    /// Render the configuration as TOML (used by `terminscan config`).
    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string_pretty(self)
            .map_err(|err| TerminError::Config(format!("cannot render configuration: {}", err)))
    }

    /// Reject values that would make a stage meaningless.
    pub fn validate(&self) -> Result<()> {
        let cutoffs = &self.enhancer.cutoffs;
        if cutoffs.high_light_min_brightness > cutoffs.low_light_max_brightness {
            return Err(TerminError::Config(format!(
                "enhancer cutoffs overlap: highLight needs brightness >= {}, lowLight <= {}",
                cutoffs.high_light_min_brightness, cutoffs.low_light_max_brightness
            )));
        }
        if self.enhancer.sharpen_stride == 0 {
            return Err(TerminError::Config("enhancer.sharpen_stride must be at least 1".into()));
        }
        if let Some(dictionaries) = &self.dictionaries {
            for dict in dictionaries {
                let threshold = dict.similarity_threshold;
                if threshold <= 0.0 || threshold >= 1.0 {
                    return Err(TerminError::Config(format!(
                        "{} dictionary threshold {} must lie strictly between 0 and 1",
                        dict.category, dict.similarity_threshold
                    )));
                }
            }
        }
        if self.parser.default_duration_minutes == 0 {
            return Err(TerminError::Config(
                "parser.default_duration_minutes must be positive".into(),
            ));
        }
        Ok(())
    }
}

/// Cutoffs of the capture quality gate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QualityThresholds {
    /// Minimum mean Sobel magnitude for a sharp image.
    pub min_sharpness: f64,
    /// Minimum percentile contrast.
    pub min_contrast: f64,
    /// Exclusive lower bound of acceptable brightness.
    pub min_brightness: f64,
    /// Exclusive upper bound of acceptable brightness.
    pub max_brightness: f64,
    /// Maximum directional blur score.
    pub max_blur: f64,
}

impl Default for QualityThresholds {
    fn default() -> Self {
        Self {
            min_sharpness: 20.0,
            min_contrast: 0.35,
            min_brightness: 0.25,
            max_brightness: 0.75,
            max_blur: 15.0,
        }
    }
}

/// Brightness cutoffs that decide which exposure-specific variants run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VariantCutoffs {
    /// `lowLight` is skipped above this brightness.
    pub low_light_max_brightness: f64,
    /// `highLight` is skipped below this brightness.
    pub high_light_min_brightness: f64,
}

impl Default for VariantCutoffs {
    fn default() -> Self {
        Self {
            low_light_max_brightness: 0.6,
            high_light_min_brightness: 0.4,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnhancerConfig {
    pub cutoffs: VariantCutoffs,
    /// Sampling stride of the sharpening Laplacian.
    pub sharpen_stride: u32,
    /// Replaces the built-in presets when present.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub variants: Option<Vec<VariantSpec>>,
}

impl Default for EnhancerConfig {
    fn default() -> Self {
        Self {
            cutoffs: VariantCutoffs::default(),
            sharpen_stride: 2,
            variants: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecognitionConfig {
    #[serde(flatten)]
    pub options: RecognitionOptions,
    /// Upper bound for a single recognition call. Unset means wait forever.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,
    /// Directory holding the `ocrs` model files; the engine default when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model_dir: Option<std::path::PathBuf>,
    /// Also run recognition on every enhancement variant, not just the fused
    /// image, and reconcile the passes word by word.
    pub recognize_variants: bool,
}

impl RecognitionConfig {
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }
}

/// Reconciliation of words seen across several recognition passes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClusterConfig {
    /// Words at or below this confidence are discarded on arrival.
    pub min_word_confidence: f32,
    /// Maximum vertical distance (px) between observations of one word.
    pub vertical_tolerance: f32,
    /// Rows closer than this (px) are treated as the same text line.
    pub row_tolerance: f32,
    /// Similarity needed to merge words longer than `short_word_len`.
    pub merge_similarity: f64,
    /// Similarity needed when either word is short.
    pub short_word_similarity: f64,
    pub short_word_len: usize,
    /// Clusters need this many observations (capped at the number of passes).
    pub min_occurrences: usize,
    /// Clusters need a mean confidence above this value.
    pub min_cluster_confidence: f32,
    /// Confidence multiplier for dictionary-corrected clusters.
    pub correction_boost: f32,
}

impl Default for ClusterConfig {
    fn default() -> Self {
        Self {
            min_word_confidence: 30.0,
            vertical_tolerance: 30.0,
            row_tolerance: 25.0,
            merge_similarity: 0.8,
            short_word_similarity: 0.9,
            short_word_len: 3,
            min_occurrences: 2,
            min_cluster_confidence: 60.0,
            correction_boost: 1.2,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParserConfig {
    /// Phrases that open the trailing general-information section.
    pub section_end_keywords: Vec<String>,
    /// Token similarity above which a word counts as a section keyword.
    pub keyword_similarity: f64,
    /// Appointment length when neither an end time nor a duration is given.
    pub default_duration_minutes: u32,
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            section_end_keywords: vec![
                "Medikamentenabgabe".into(),
                "Essenszeiten".into(),
                "Pausen".into(),
                "NA-Meeting".into(),
            ],
            keyword_similarity: 0.8,
            default_duration_minutes: 30,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::DictionaryCategory;
    use std::io::Write;

    #[test]
    fn defaults_validate() {
        PipelineConfig::default().validate().expect("defaults must be valid");
    }

    #[test]
    fn partial_toml_keeps_other_defaults() {
        let config = PipelineConfig::from_toml_str(
            r#"
            [quality]
            min_sharpness = 12.5

            [recognition]
            timeout_secs = 45
            language_model = "eng"
            "#,
        )
        .expect("valid config");

        assert_eq!(config.quality.min_sharpness, 12.5);
        assert_eq!(config.quality.max_blur, 15.0);
        assert_eq!(config.recognition.timeout(), Some(Duration::from_secs(45)));
        assert_eq!(config.recognition.options.language_model, "eng");
        assert_eq!(config.parser.default_duration_minutes, 30);
        assert!(config.dictionaries.is_none());
    }

    #[test]
    fn dictionaries_can_be_replaced() {
        let config = PipelineConfig::from_toml_str(
            r#"
            [[dictionaries]]
            category = "organizers"
            entries = ["Jordi", "Koch"]
            similarity_threshold = 0.6
            "#,
        )
        .expect("valid config");

        let dicts = config.dictionaries.expect("dictionaries present");
        assert_eq!(dicts.len(), 1);
        assert_eq!(dicts[0].category, DictionaryCategory::Organizers);
        assert_eq!(dicts[0].entries, vec!["Jordi", "Koch"]);
    }

    #[test]
    fn overlapping_cutoffs_are_rejected() {
        let result = PipelineConfig::from_toml_str(
            r#"
            [enhancer.cutoffs]
            low_light_max_brightness = 0.3
            high_light_min_brightness = 0.7
            "#,
        );
        assert!(matches!(result, Err(TerminError::Config(_))));
    }

    #[test]
    fn threshold_outside_unit_interval_is_rejected() {
        let result = PipelineConfig::from_toml_str(
            r#"
            [[dictionaries]]
            category = "locations"
            entries = ["Venus"]
            similarity_threshold = 1.5
            "#,
        );
        assert!(matches!(result, Err(TerminError::Config(_))));
    }

    #[test]
    fn zero_threshold_is_rejected() {
        let result = PipelineConfig::from_toml_str(
            r#"
            [[dictionaries]]
            category = "organizers"
            entries = ["Jordi"]
            similarity_threshold = 0.0
            "#,
        );
        assert!(matches!(result, Err(TerminError::Config(_))));
    }

    #[test]
    fn load_from_file_and_render_back() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        writeln!(file, "[parser]\ndefault_duration_minutes = 45").expect("write");

        let config = PipelineConfig::load(file.path()).expect("load");
        assert_eq!(config.parser.default_duration_minutes, 45);

        let rendered = config.to_toml_string().expect("render");
        let reparsed = PipelineConfig::from_toml_str(&rendered).expect("reparse");
        assert_eq!(reparsed, config);
    }

    #[test]
    fn missing_file_is_io_error() {
        let result = PipelineConfig::load("/nonexistent/terminscan.toml");
        assert!(matches!(result, Err(TerminError::Io(_))));
    }
}
