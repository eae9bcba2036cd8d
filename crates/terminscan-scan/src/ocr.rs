// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Recognition engine backed by `ocrs`, a pure-Rust OCR engine running neural
// network models through `rten`.
//
// # Feature Gate
//
// Compiled only with the `ocr` feature, which the `terminscan` binary enables
// by default:
//
// ```toml
// terminscan-scan = { path = "crates/terminscan-scan", features = ["ocr"] }
// ```
//
// # Model Setup
//
// The engine requires two model files, `text-detection.rten` and
// `text-recognition.rten`. Running `ocrs-cli` once downloads them to
// `$XDG_CACHE_HOME/ocrs` (typically `~/.cache/ocrs`), which is the default
// location used here.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use image::DynamicImage;
use ocrs::{ImageSource, OcrEngine as Engine, OcrEngineParams, TextItem};
use rten::Model;
use terminscan_core::error::{Result, TerminError};
use terminscan_core::{OcrWord, RecognitionOptions, RecognitionOutput};
use tracing::{debug, info, instrument};

use crate::recognition::{EngineLoader, RecognitionEngine};

const DETECTION_MODEL_FILENAME: &str = "text-detection.rten";
const RECOGNITION_MODEL_FILENAME: &str = "text-recognition.rten";

/// `ocrs` reports no per-word score; words are passed on with this value.
const OCRS_WORD_CONFIDENCE: f32 = 100.0;

/// Default directory for cached model files.
fn default_model_dir() -> PathBuf {
    if let Ok(xdg) = std::env::var("XDG_CACHE_HOME") {
        PathBuf::from(xdg).join("ocrs")
    } else if let Ok(home) = std::env::var("HOME") {
        PathBuf::from(home).join(".cache").join("ocrs")
    } else {
        PathBuf::from("ocrs-models")
    }
}

/// Where to find the two model files.
#[derive(Debug, Clone)]
pub struct OcrsConfig {
    pub detection_model_path: PathBuf,
    pub recognition_model_path: PathBuf,
}

impl Default for OcrsConfig {
    fn default() -> Self {
        Self::from_dir(default_model_dir())
    }
}

impl OcrsConfig {
    /// Expects `dir` to contain `text-detection.rten` and `text-recognition.rten`.
    pub fn from_dir(dir: impl AsRef<Path>) -> Self {
        let dir = dir.as_ref();
        Self {
            detection_model_path: dir.join(DETECTION_MODEL_FILENAME),
            recognition_model_path: dir.join(RECOGNITION_MODEL_FILENAME),
        }
    }

    /// Use `dir` when given, the cache directory otherwise.
    pub fn from_optional_dir(dir: Option<&Path>) -> Self {
        dir.map(Self::from_dir).unwrap_or_default()
    }

    /// Verify that both model files exist.
    pub fn validate(&self) -> Result<()> {
        for path in [&self.detection_model_path, &self.recognition_model_path] {
            if !path.exists() {
                return Err(TerminError::Recognition(format!(
                    "OCR model not found at {}; run `ocrs-cli` once to download the models",
                    path.display()
                )));
            }
        }
        Ok(())
    }
}

/// [`RecognitionEngine`] over the `ocrs` engine.
pub struct OcrsEngine {
    engine: Arc<Engine>,
}

impl OcrsEngine {
    /// Load both models. This is the expensive step; one engine serves a whole
    /// capture run.
    #[instrument(skip_all, fields(
        detection = %config.detection_model_path.display(),
        recognition = %config.recognition_model_path.display(),
    ))]
    pub fn new(config: &OcrsConfig) -> Result<Self> {
        config.validate()?;

        info!(model = "detection", "Loading ocrs model");
        let detection_model = Model::load_file(&config.detection_model_path).map_err(|err| {
            TerminError::Recognition(format!(
                "cannot read detection model {}: {}",
                config.detection_model_path.display(),
                err
            ))
        })?;

        info!(model = "recognition", "Loading ocrs model");
        let recognition_model =
            Model::load_file(&config.recognition_model_path).map_err(|err| {
                TerminError::Recognition(format!(
                    "cannot read recognition model {}: {}",
                    config.recognition_model_path.display(),
                    err
                ))
            })?;

        let engine = Engine::new(OcrEngineParams {
            detection_model: Some(detection_model),
            recognition_model: Some(recognition_model),
            ..Default::default()
        })
        .map_err(|err| {
            TerminError::Recognition(format!("failed to initialise OCR engine: {}", err))
        })?;

        Ok(Self {
            engine: Arc::new(engine),
        })
    }
}

/// Word-level recognition on a blocking thread.
fn recognize_words(engine: &Engine, image: &DynamicImage, options: &RecognitionOptions) -> Result<Vec<OcrWord>> {
    let rgb = image.to_rgb8();
    let (width, height) = rgb.dimensions();
    let source = ImageSource::from_bytes(rgb.as_raw(), (width, height)).map_err(|err| {
        TerminError::Recognition(format!(
            "capture of {}x{} pixels rejected by ocrs: {}",
            width, height, err
        ))
    })?;

    let input = engine
        .prepare_input(source)
        .map_err(|err| TerminError::Recognition(format!("OCR preprocessing failed: {}", err)))?;
    let word_rects = engine
        .detect_words(&input)
        .map_err(|err| TerminError::Recognition(format!("word detection failed: {}", err)))?;
    let line_rects = engine.find_text_lines(&input, &word_rects);
    let lines = engine
        .recognize_text(&input, &line_rects)
        .map_err(|err| TerminError::Recognition(format!("line recognition failed: {}", err)))?;

    let mut words = Vec::new();
    for line in lines.iter().flatten() {
        for word in line.words() {
            let text: String = word
                .to_string()
                .chars()
                .filter(|c| options.allows(*c))
                .collect();
            if text.trim().is_empty() {
                continue;
            }
            let rect = word.bounding_rect();
            words.push(OcrWord::new(
                text.trim(),
                OCRS_WORD_CONFIDENCE,
                rect.left() as f32,
                rect.top() as f32,
            ));
        }
    }
    Ok(words)
}

#[async_trait]
impl RecognitionEngine for OcrsEngine {
    async fn recognize(
        &self,
        image: &DynamicImage,
        options: &RecognitionOptions,
    ) -> Result<RecognitionOutput> {
        debug!(
            language_model = %options.language_model,
            "ocrs ships one Latin model; the language hint is not used"
        );
        let engine = Arc::clone(&self.engine);
        let image = image.clone();
        let options = options.clone();

        let words = tokio::task::spawn_blocking(move || recognize_words(&engine, &image, &options))
            .await
            .map_err(|err| TerminError::Recognition(format!("OCR worker failed: {}", err)))??;

        let text = words
            .iter()
            .map(|w| w.text.as_str())
            .collect::<Vec<_>>()
            .join(" ");
        let confidence = if words.is_empty() { 0.0 } else { OCRS_WORD_CONFIDENCE };
        info!(word_count = words.len(), "ocrs recognition complete");
        Ok(RecognitionOutput {
            text,
            words,
            confidence,
        })
    }

    fn name(&self) -> &str {
        "ocrs"
    }
}

/// Loads an [`OcrsEngine`] for each capture run.
#[derive(Debug, Clone, Default)]
pub struct OcrsLoader {
    pub config: OcrsConfig,
}

impl EngineLoader for OcrsLoader {
    type Engine = OcrsEngine;

    fn load(&self) -> Result<OcrsEngine> {
        OcrsEngine::new(&self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_from_dir() {
        let config = OcrsConfig::from_dir("/srv/terminscan/models");
        assert_eq!(
            config.detection_model_path,
            PathBuf::from("/srv/terminscan/models/text-detection.rten")
        );
        assert_eq!(
            config.recognition_model_path,
            PathBuf::from("/srv/terminscan/models/text-recognition.rten")
        );
    }

    #[test]
    fn default_config_points_to_model_files() {
        let config = OcrsConfig::from_optional_dir(None);
        assert!(config.detection_model_path.ends_with(DETECTION_MODEL_FILENAME));
        assert!(config.recognition_model_path.ends_with(RECOGNITION_MODEL_FILENAME));
    }

    #[test]
    fn missing_models_fail_to_load() {
        let loader = OcrsLoader {
            config: OcrsConfig::from_dir("/nonexistent/path/ocr-models"),
        };
        assert!(matches!(loader.load(), Err(TerminError::Recognition(_))));
    }
}
