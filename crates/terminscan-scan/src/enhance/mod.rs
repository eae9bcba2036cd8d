// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Multi-variant enhancement — several binarized renditions of the capture,
// fused by majority vote into the image handed to text recognition.

pub mod filters;
pub mod fusion;
pub mod variant;

use image::{DynamicImage, GrayImage};
use terminscan_core::VariantSpec;
use terminscan_core::config::EnhancerConfig;
use terminscan_core::error::{Result, TerminError};
use tracing::{debug, info, instrument, warn};

/// One intermediate rendition, kept for diagnostics.
#[derive(Debug, Clone)]
pub struct EnhancedVariant {
    pub name: String,
    pub image: GrayImage,
}

/// Output of the enhancement stage.
#[derive(Debug, Clone)]
pub struct EnhancedImage {
    /// Fused binary image, or the untouched source when `degraded` is set.
    pub image: DynamicImage,
    /// Variants in the order they were rendered.
    pub variants: Vec<EnhancedVariant>,
    /// Set when enhancement failed and the source image was passed through.
    pub degraded: bool,
}

/// Prepares a photographed schedule for text recognition.
///
/// Each selected preset is rendered from the same luminance plane and
/// binarized; the binary variants are then fused pixel by pixel.
#[derive(Debug, Clone, Default)]
pub struct ImageEnhancer {
    config: EnhancerConfig,
}

impl ImageEnhancer {
    pub fn new(config: EnhancerConfig) -> Self {
        Self { config }
    }

    /// Presets in effect (configured ones, or the built-in six).
    pub fn presets(&self) -> Vec<VariantSpec> {
        self.config
            .variants
            .clone()
            .unwrap_or_else(variant::builtin_presets)
    }

    /// Presets that will run for a capture with the given exposure.
    pub fn select_variants(&self, brightness_score: f64, flash_used: bool) -> Vec<VariantSpec> {
        variant::select_variants(
            &self.presets(),
            brightness_score,
            flash_used,
            &self.config.cutoffs,
        )
    }

    /// Render, binarize and fuse. Errors are returned to the caller.
    #[instrument(skip(self, source), fields(width = source.width(), height = source.height()))]
    pub fn try_enhance(
        &self,
        source: &DynamicImage,
        brightness_score: f64,
        flash_used: bool,
    ) -> Result<EnhancedImage> {
        if source.width() == 0 || source.height() == 0 {
            return Err(TerminError::Enhancement("source image has no pixels".into()));
        }
        let specs = self.select_variants(brightness_score, flash_used);
        if specs.is_empty() {
            return Err(TerminError::Enhancement(
                "no enhancement variant applies to this capture".into(),
            ));
        }

        let plane = filters::to_plane(&source.to_rgba8());
        let variants: Vec<EnhancedVariant> = specs
            .iter()
            .map(|spec| {
                debug!(variant = %spec.name, "Rendering enhancement variant");
                EnhancedVariant {
                    name: spec.name.clone(),
                    image: filters::render_variant(&plane, spec, self.config.sharpen_stride),
                }
            })
            .collect();

        let binaries: Vec<GrayImage> = variants.iter().map(|v| v.image.clone()).collect();
        let fused = fusion::majority_vote(&binaries)?;

        info!(variant_count = variants.len(), "Enhancement variants fused");
        Ok(EnhancedImage {
            image: DynamicImage::ImageLuma8(fused),
            variants,
            degraded: false,
        })
    }

    /// Like [`try_enhance`](Self::try_enhance), but never fails: on any
    /// internal error the source image is returned unchanged so recognition
    /// can still make a best-effort pass.
    pub fn enhance(
        &self,
        source: &DynamicImage,
        brightness_score: f64,
        flash_used: bool,
    ) -> EnhancedImage {
        match self.try_enhance(source, brightness_score, flash_used) {
            Ok(enhanced) => enhanced,
            Err(err) => {
                warn!(error = %err, "Enhancement failed; passing the source image through");
                EnhancedImage {
                    image: source.clone(),
                    variants: Vec::new(),
                    degraded: true,
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Luma, Rgba, RgbaImage};

    /// Dark text bars on a light page.
    fn schedule_page() -> DynamicImage {
        DynamicImage::ImageRgba8(RgbaImage::from_fn(48, 32, |x, y| {
            let ink = (8..12).contains(&y) && (4..40).contains(&x);
            let v = if ink { 20 } else { 230 };
            Rgba([v, v, v, 255])
        }))
    }

    #[test]
    fn fused_image_keeps_text_dark_and_page_white() {
        let enhanced = ImageEnhancer::default().enhance(&schedule_page(), 0.5, false);
        assert!(!enhanced.degraded);
        assert_eq!(enhanced.variants.len(), 5);

        let fused = enhanced.image.to_luma8();
        assert_eq!(fused.dimensions(), (48, 32));
        assert_eq!(*fused.get_pixel(20, 10), Luma([0]));
        assert_eq!(*fused.get_pixel(20, 24), Luma([255]));
    }

    #[test]
    fn flash_adds_flash_correction_variant() {
        let enhanced = ImageEnhancer::default().enhance(&schedule_page(), 0.5, true);
        let names: Vec<&str> = enhanced.variants.iter().map(|v| v.name.as_str()).collect();
        assert!(names.contains(&variant::FLASH_CORRECTION));
        assert_eq!(names.len(), 6);
    }

    #[test]
    fn failure_falls_back_to_source() {
        let enhancer = ImageEnhancer::new(EnhancerConfig {
            variants: Some(Vec::new()),
            ..EnhancerConfig::default()
        });
        let source = schedule_page();

        assert!(matches!(
            enhancer.try_enhance(&source, 0.5, false),
            Err(TerminError::Enhancement(_))
        ));

        let enhanced = enhancer.enhance(&source, 0.5, false);
        assert!(enhanced.degraded);
        assert!(enhanced.variants.is_empty());
        assert_eq!(enhanced.image, source);
    }

    #[test]
    fn empty_source_degrades() {
        let source = DynamicImage::ImageRgba8(RgbaImage::new(0, 0));
        let enhanced = ImageEnhancer::default().enhance(&source, 0.5, false);
        assert!(enhanced.degraded);
    }
}
