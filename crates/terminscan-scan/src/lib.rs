// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// terminscan-scan — Image side of the Terminscan pipeline.
//
// Provides the capture quality gate (sharpness, exposure, motion blur), the
// multi-variant enhancement stage with majority-vote fusion, and the seam to
// the external text recognition engine.

pub mod enhance;
pub mod quality;
pub mod recognition;

#[cfg(feature = "ocr")]
pub mod ocr;

// Re-export the primary structs so callers can use `terminscan_scan::ImageEnhancer` etc.
pub use enhance::{EnhancedImage, ImageEnhancer};
pub use quality::{QualityAssessor, QualityGate};
pub use recognition::{EngineLoader, RecognitionEngine, RecognitionSession};

#[cfg(feature = "ocr")]
pub use ocr::{OcrsEngine, OcrsLoader};
