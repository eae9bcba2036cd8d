// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Unified error types for Terminscan.
//
// Quality-gate rejections, skipped schedule lines and dictionary misses are not
// errors: they are reported through `CaptureOutcome`, `ParseReport` and the
// unchanged token respectively.

use std::time::Duration;

use thiserror::Error;

/// Top-level error type for all Terminscan operations.
#[derive(Debug, Error)]
pub enum TerminError {
    // -- Capture errors --
    /// The capture could not be decoded into a pixel buffer. Fatal for that
    /// capture; the caller must acquire a new image.
    #[error("image decoding failed: {0}")]
    ImageDecode(String),

    /// Internal failure of the enhancement stage. Only surfaced by
    /// `ImageEnhancer::try_enhance`; the pipeline falls back to the source image.
    #[error("image enhancement failed: {0}")]
    Enhancement(String),

    // -- Recognition errors --
    #[error("text recognition failed: {0}")]
    Recognition(String),

    #[error("text recognition timed out after {0:?}")]
    RecognitionTimeout(Duration),

    // -- Configuration / persistence --
    #[error("configuration error: {0}")]
    Config(String),

    #[error("file I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, TerminError>;
