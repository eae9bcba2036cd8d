// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Capture quality gate — sharpness (Sobel), exposure (luminance percentiles)
// and directional motion blur, computed from a decoded RGBA buffer.

use image::{DynamicImage, GrayImage, Luma, Rgba, RgbaImage};
use imageproc::gradients::{horizontal_sobel, vertical_sobel};
use terminscan_core::config::QualityThresholds;
use terminscan_core::error::{Result, TerminError};
use terminscan_core::{QualityIssue, QualityReport};
use tracing::{debug, info, instrument};

/// Luminance of an RGBA pixel (ITU-R BT.601 weights), in 0.0..=255.0.
pub fn luminance(pixel: &Rgba<u8>) -> f64 {
    let [r, g, b, _] = pixel.0;
    0.299 * r as f64 + 0.587 * g as f64 + 0.114 * b as f64
}

/// Build the rounded luminance plane of an RGBA image.
pub fn luminance_plane(image: &RgbaImage) -> GrayImage {
    GrayImage::from_fn(image.width(), image.height(), |x, y| {
        let luma = luminance(image.get_pixel(x, y)).round().clamp(0.0, 255.0);
        Luma([luma as u8])
    })
}

/// Decode an encoded capture (PNG, JPEG, ...) into a pixel buffer.
#[instrument(skip(data), fields(data_len = data.len()))]
pub fn decode_image(data: &[u8]) -> Result<DynamicImage> {
    let image = image::load_from_memory(data).map_err(|err| {
        TerminError::ImageDecode(format!("failed to decode capture: {}", err))
    })?;
    if image.width() == 0 || image.height() == 0 {
        return Err(TerminError::ImageDecode("capture has no pixels".into()));
    }
    debug!(width = image.width(), height = image.height(), "Capture decoded");
    Ok(image)
}

/// Sharpness metric of one image.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sharpness {
    pub score: f64,
    pub is_sharp: bool,
}

/// Exposure metrics derived from the luminance histogram.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Exposure {
    pub p5: u8,
    pub p95: u8,
    pub brightness_score: f64,
    pub contrast_score: f64,
    pub is_good: bool,
}

/// Directional blur metric.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MotionBlur {
    pub score: f64,
    pub is_not_blurred: bool,
}

/// Computes a [`QualityReport`] for a captured photograph.
///
/// All methods are pure functions of the pixel buffer; the assessor only holds
/// the thresholds that turn scores into pass/fail flags.
#[derive(Debug, Clone, Default)]
pub struct QualityAssessor {
    thresholds: QualityThresholds,
}

impl QualityAssessor {
    pub fn new(thresholds: QualityThresholds) -> Self {
        Self { thresholds }
    }

    pub fn thresholds(&self) -> &QualityThresholds {
        &self.thresholds
    }

    /// Mean Sobel gradient magnitude over the interior pixels, divided by the
    /// full pixel count.
    pub fn sharpness(&self, image: &RgbaImage) -> Sharpness {
        let (width, height) = image.dimensions();
        let pixel_count = width as f64 * height as f64;
        if width < 3 || height < 3 {
            return Sharpness {
                score: 0.0,
                is_sharp: false,
            };
        }

        let luma = luminance_plane(image);
        let gx = horizontal_sobel(&luma);
        let gy = vertical_sobel(&luma);

        let mut total_magnitude = 0.0f64;
        for y in 1..height - 1 {
            for x in 1..width - 1 {
                let dx = gx.get_pixel(x, y).0[0] as f64;
                let dy = gy.get_pixel(x, y).0[0] as f64;
                total_magnitude += (dx * dx + dy * dy).sqrt();
            }
        }

        let score = total_magnitude / pixel_count;
        Sharpness {
            score,
            is_sharp: score > self.thresholds.min_sharpness,
        }
    }

    /// Percentile brightness and contrast of the luminance histogram.
    ///
    /// `p5` and `p95` are the first histogram bins whose cumulative count
    /// reaches 5% and 95% of all pixels.
    pub fn exposure(&self, image: &RgbaImage) -> Exposure {
        let luma = luminance_plane(image);
        let mut histogram = [0u64; 256];
        for pixel in luma.pixels() {
            histogram[pixel.0[0] as usize] += 1;
        }

        let pixel_count = luma.width() as u64 * luma.height() as u64;
        let p5_target = pixel_count as f64 * 0.05;
        let p95_target = pixel_count as f64 * 0.95;

        let mut cumulative = 0u64;
        let mut p5: Option<u8> = None;
        let mut p95: Option<u8> = None;
        for (value, &count) in histogram.iter().enumerate() {
            cumulative += count;
            if p5.is_none() && cumulative as f64 >= p5_target {
                p5 = Some(value as u8);
            }
            if cumulative as f64 >= p95_target {
                p95 = Some(value as u8);
                break;
            }
        }
        let p5 = p5.unwrap_or(0);
        let p95 = p95.unwrap_or(255);

        let brightness_score = (p95 as f64 + p5 as f64) / 2.0 / 255.0;
        let contrast_score = ((p95 as f64 - p5 as f64) / 255.0).max(0.01);
        let t = &self.thresholds;
        let is_good = contrast_score > t.min_contrast
            && brightness_score > t.min_brightness
            && brightness_score < t.max_brightness;

        Exposure {
            p5,
            p95,
            brightness_score,
            contrast_score,
            is_good,
        }
    }

    /// Directional colour difference between neighbouring interior pixels.
    ///
    /// Horizontal and vertical sums are kept apart; the weaker direction is
    /// the blur score.
    pub fn motion_blur(&self, image: &RgbaImage) -> MotionBlur {
        let (width, height) = image.dimensions();
        if width < 3 || height < 3 {
            return MotionBlur {
                score: 0.0,
                is_not_blurred: true,
            };
        }

        let mut horizontal = 0.0f64;
        let mut vertical = 0.0f64;
        for y in 1..height - 1 {
            for x in 1..width - 1 {
                let here = image.get_pixel(x, y);
                let right = image.get_pixel(x + 1, y);
                let below = image.get_pixel(x, y + 1);
                horizontal += channel_difference(here, right);
                vertical += channel_difference(here, below);
            }
        }

        let interior = (width - 2) as f64 * (height - 2) as f64;
        let score = horizontal.min(vertical) / interior;
        MotionBlur {
            score,
            is_not_blurred: score < self.thresholds.max_blur,
        }
    }

    /// Run all three checks.
    #[instrument(skip_all, fields(width = image.width(), height = image.height()))]
    pub fn assess(&self, image: &RgbaImage) -> Result<QualityReport> {
        if image.width() == 0 || image.height() == 0 {
            return Err(TerminError::ImageDecode("capture has no pixels".into()));
        }

        let sharpness = self.sharpness(image);
        let exposure = self.exposure(image);
        let blur = self.motion_blur(image);

        let report = QualityReport {
            sharpness_score: sharpness.score,
            is_sharp: sharpness.is_sharp,
            brightness_score: exposure.brightness_score,
            contrast_score: exposure.contrast_score,
            is_good: exposure.is_good,
            blur_score: blur.score,
            is_not_blurred: blur.is_not_blurred,
        };
        info!(
            sharpness = report.sharpness_score,
            brightness = report.brightness_score,
            contrast = report.contrast_score,
            blur = report.blur_score,
            passed = report.passed(),
            "Capture quality assessed"
        );
        Ok(report)
    }

    /// Assess an already-decoded image of any colour type.
    pub fn assess_dynamic(&self, image: &DynamicImage) -> Result<QualityReport> {
        self.assess(&image.to_rgba8())
    }

    /// Decode an encoded capture and assess it.
    pub fn assess_bytes(&self, data: &[u8]) -> Result<(DynamicImage, QualityReport)> {
        let image = decode_image(data)?;
        let report = self.assess_dynamic(&image)?;
        Ok((image, report))
    }
}

/// Absolute value of the summed per-channel RGB difference.
fn channel_difference(a: &Rgba<u8>, b: &Rgba<u8>) -> f64 {
    let sum: i32 = (0..3).map(|c| a.0[c] as i32 - b.0[c] as i32).sum();
    sum.unsigned_abs() as f64
}

/// Turns a [`QualityReport`] into the list of problems to show the user.
#[derive(Debug, Clone, Default)]
pub struct QualityGate {
    thresholds: QualityThresholds,
}

impl QualityGate {
    pub fn new(thresholds: QualityThresholds) -> Self {
        Self { thresholds }
    }

    /// Ordered issues; empty when the capture may proceed.
    pub fn issues(&self, report: &QualityReport) -> Vec<QualityIssue> {
        let mut issues = Vec::new();
        if !report.is_sharp {
            issues.push(QualityIssue::Unsharp);
        }
        if !report.is_good {
            if report.brightness_score <= self.thresholds.min_brightness {
                issues.push(QualityIssue::TooDark);
            } else if report.brightness_score >= self.thresholds.max_brightness {
                issues.push(QualityIssue::TooBright);
            } else {
                issues.push(QualityIssue::LowContrast);
            }
        }
        if !report.is_not_blurred {
            issues.push(QualityIssue::MotionBlur);
        }
        issues
    }
}
