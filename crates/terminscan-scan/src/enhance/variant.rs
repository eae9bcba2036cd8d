// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Enhancement presets and the exposure-driven choice of which ones to run.

use terminscan_core::VariantSpec;
use terminscan_core::config::VariantCutoffs;
use tracing::debug;

pub const STANDARD: &str = "standard";
pub const LOW_LIGHT: &str = "lowLight";
pub const HIGH_LIGHT: &str = "highLight";
pub const SHADOW: &str = "shadow";
pub const TEXT: &str = "text";
pub const FLASH_CORRECTION: &str = "flashCorrection";

/// The six built-in presets, in fusion order.
pub fn builtin_presets() -> Vec<VariantSpec> {
    vec![
        VariantSpec {
            name: STANDARD.into(),
            contrast: 1.4,
            brightness: 1.05,
            sharpen_amount: 0.5,
            threshold: 128,
            gamma: None,
            vignette_strength: None,
        },
        VariantSpec {
            name: LOW_LIGHT.into(),
            contrast: 1.6,
            brightness: 1.3,
            sharpen_amount: 0.6,
            threshold: 110,
            gamma: Some(0.8),
            vignette_strength: None,
        },
        VariantSpec {
            name: HIGH_LIGHT.into(),
            contrast: 1.3,
            brightness: 0.85,
            sharpen_amount: 0.4,
            threshold: 145,
            gamma: Some(1.2),
            vignette_strength: None,
        },
        VariantSpec {
            name: SHADOW.into(),
            contrast: 1.5,
            brightness: 1.15,
            sharpen_amount: 0.5,
            threshold: 120,
            gamma: None,
            vignette_strength: Some(0.35),
        },
        VariantSpec {
            name: TEXT.into(),
            contrast: 1.8,
            brightness: 1.0,
            sharpen_amount: 0.8,
            threshold: 128,
            gamma: None,
            vignette_strength: None,
        },
        VariantSpec {
            name: FLASH_CORRECTION.into(),
            contrast: 1.2,
            brightness: 0.9,
            sharpen_amount: 0.4,
            threshold: 135,
            gamma: Some(1.1),
            vignette_strength: Some(0.25),
        },
    ]
}

/// Drop presets that cannot help for the measured exposure.
///
/// `lowLight` is skipped for bright captures, `highLight` for dark ones and
/// `flashCorrection` when no flash fired. Presets with other names always run.
pub fn select_variants(
    presets: &[VariantSpec],
    brightness_score: f64,
    flash_used: bool,
    cutoffs: &VariantCutoffs,
) -> Vec<VariantSpec> {
    let selected: Vec<VariantSpec> = presets
        .iter()
        .filter(|spec| match spec.name.as_str() {
            LOW_LIGHT => brightness_score <= cutoffs.low_light_max_brightness,
            HIGH_LIGHT => brightness_score >= cutoffs.high_light_min_brightness,
            FLASH_CORRECTION => flash_used,
            _ => true,
        })
        .cloned()
        .collect();

    debug!(
        brightness_score,
        flash_used,
        selected = ?selected.iter().map(|s| s.name.as_str()).collect::<Vec<_>>(),
        "Enhancement variants selected"
    );
    selected
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(specs: &[VariantSpec]) -> Vec<&str> {
        specs.iter().map(|s| s.name.as_str()).collect()
    }

    #[test]
    fn mid_brightness_keeps_both_exposure_presets() {
        let selected = select_variants(&builtin_presets(), 0.5, false, &VariantCutoffs::default());
        assert_eq!(
            names(&selected),
            vec![STANDARD, LOW_LIGHT, HIGH_LIGHT, SHADOW, TEXT]
        );
    }

    #[test]
    fn bright_capture_skips_low_light() {
        let selected = select_variants(&builtin_presets(), 0.7, true, &VariantCutoffs::default());
        assert!(!names(&selected).contains(&LOW_LIGHT));
        assert!(names(&selected).contains(&HIGH_LIGHT));
        assert!(names(&selected).contains(&FLASH_CORRECTION));
    }

    #[test]
    fn dark_capture_skips_high_light() {
        let selected = select_variants(&builtin_presets(), 0.3, false, &VariantCutoffs::default());
        assert!(names(&selected).contains(&LOW_LIGHT));
        assert!(!names(&selected).contains(&HIGH_LIGHT));
    }

    #[test]
    fn custom_presets_always_run() {
        let custom = VariantSpec {
            name: "receipt".into(),
            ..builtin_presets()[0].clone()
        };
        let selected = select_variants(&[custom], 0.99, false, &VariantCutoffs::default());
        assert_eq!(names(&selected), vec!["receipt"]);
    }
}
