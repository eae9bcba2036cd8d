// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Per-pixel filters applied to a floating-point luminance plane: intensity
// transform, vignette compensation, four-neighbour sharpening, gamma and fixed
// threshold binarization.

use image::{GrayImage, ImageBuffer, Luma, RgbaImage};
use terminscan_core::VariantSpec;

use crate::quality::luminance;

/// Luminance plane with values in 0.0..=255.0.
pub type LumaPlane = ImageBuffer<Luma<f32>, Vec<f32>>;

/// Convert an RGBA capture to its luminance plane.
pub fn to_plane(image: &RgbaImage) -> LumaPlane {
    LumaPlane::from_fn(image.width(), image.height(), |x, y| {
        Luma([luminance(image.get_pixel(x, y)) as f32])
    })
}

fn map_plane(plane: &LumaPlane, f: impl Fn(u32, u32, f32) -> f32) -> LumaPlane {
    LumaPlane::from_fn(plane.width(), plane.height(), |x, y| {
        Luma([f(x, y, plane.get_pixel(x, y).0[0]).clamp(0.0, 255.0)])
    })
}

/// Scale brightness, then stretch contrast around mid-grey.
pub fn adjust_intensity(plane: &LumaPlane, contrast: f32, brightness: f32) -> LumaPlane {
    map_plane(plane, |_, _, v| (v * brightness - 128.0) * contrast + 128.0)
}

/// Brighten towards the edges to undo lens or flash fall-off.
///
/// The gain grows with the squared distance from the image centre and reaches
/// `1 + strength` in the corners.
pub fn compensate_vignette(plane: &LumaPlane, strength: f32) -> LumaPlane {
    let cx = (plane.width() as f32 - 1.0) / 2.0;
    let cy = (plane.height() as f32 - 1.0) / 2.0;
    let max_dist_sq = (cx * cx + cy * cy).max(f32::EPSILON);
    map_plane(plane, |x, y, v| {
        let dx = x as f32 - cx;
        let dy = y as f32 - cy;
        let falloff = (dx * dx + dy * dy) / max_dist_sq;
        v * (1.0 + strength * falloff)
    })
}

/// Unsharp-style sharpening: `v + amount * (4v - up - down - left - right)`.
///
/// The Laplacian is sampled every `stride` pixels in both directions and
/// reused for the whole `stride x stride` cell. Border pixels are left as is.
pub fn sharpen(plane: &LumaPlane, amount: f32, stride: u32) -> LumaPlane {
    let (width, height) = plane.dimensions();
    if amount == 0.0 || width < 3 || height < 3 {
        return plane.clone();
    }
    let stride = stride.max(1);
    let value = |x: u32, y: u32| plane.get_pixel(x, y).0[0];

    map_plane(plane, |x, y, v| {
        let sx = (x - x % stride).clamp(1, width - 2);
        let sy = (y - y % stride).clamp(1, height - 2);
        if x == 0 || y == 0 || x == width - 1 || y == height - 1 {
            return v;
        }
        let centre = value(sx, sy);
        let laplacian = 4.0 * centre
            - value(sx, sy - 1)
            - value(sx, sy + 1)
            - value(sx - 1, sy)
            - value(sx + 1, sy);
        v + amount * laplacian
    })
}

/// Power-law correction `255 * (v / 255)^gamma`.
pub fn apply_gamma(plane: &LumaPlane, gamma: f32) -> LumaPlane {
    map_plane(plane, |_, _, v| 255.0 * (v / 255.0).powf(gamma))
}

/// `v > threshold` becomes white, everything else black.
pub fn binarize(plane: &LumaPlane, threshold: u8) -> GrayImage {
    let threshold = threshold as f32;
    GrayImage::from_fn(plane.width(), plane.height(), |x, y| {
        let white = plane.get_pixel(x, y).0[0] > threshold;
        Luma([if white { 255 } else { 0 }])
    })
}

/// Run one preset end to end on a luminance plane.
pub fn render_variant(plane: &LumaPlane, spec: &VariantSpec, sharpen_stride: u32) -> GrayImage {
    let mut working = adjust_intensity(plane, spec.contrast, spec.brightness);
    if let Some(strength) = spec.vignette_strength {
        working = compensate_vignette(&working, strength);
    }
    working = sharpen(&working, spec.sharpen_amount, sharpen_stride);
    if let Some(gamma) = spec.gamma {
        working = apply_gamma(&working, gamma);
    }
    binarize(&working, spec.threshold)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn flat(width: u32, height: u32, value: f32) -> LumaPlane {
        LumaPlane::from_pixel(width, height, Luma([value]))
    }

    #[test]
    fn intensity_applies_brightness_then_contrast() {
        let out = adjust_intensity(&flat(2, 2, 100.0), 2.0, 1.1);
        // (100 * 1.1 - 128) * 2 + 128 = 92
        assert!((out.get_pixel(0, 0).0[0] - 92.0).abs() < 1e-3);
    }

    #[test]
    fn intensity_is_clamped() {
        let out = adjust_intensity(&flat(1, 1, 250.0), 3.0, 1.0);
        assert_eq!(out.get_pixel(0, 0).0[0], 255.0);
    }

    #[test]
    fn vignette_leaves_centre_and_lifts_corners() {
        let out = compensate_vignette(&flat(5, 5, 100.0), 0.5);
        assert!((out.get_pixel(2, 2).0[0] - 100.0).abs() < 1e-3);
        assert!((out.get_pixel(0, 0).0[0] - 150.0).abs() < 1e-3);
    }

    #[test]
    fn sharpen_keeps_flat_regions() {
        let out = sharpen(&flat(8, 8, 77.0), 0.8, 2);
        assert!(out.pixels().all(|p| (p.0[0] - 77.0).abs() < 1e-3));
    }

    #[test]
    fn sharpen_boosts_isolated_dark_dot() {
        let mut plane = flat(5, 5, 200.0);
        plane.put_pixel(2, 2, Luma([100.0]));
        let out = sharpen(&plane, 0.5, 1);
        // 100 + 0.5 * (400 - 800) = -100, clamped to black.
        assert_eq!(out.get_pixel(2, 2).0[0], 0.0);
        // The neighbour above sees one darker neighbour: 200 + 0.5 * 100.
        assert!((out.get_pixel(2, 1).0[0] - 250.0).abs() < 1e-3);
    }

    #[test]
    fn gamma_below_one_brightens() {
        let out = apply_gamma(&flat(1, 1, 64.0), 0.5);
        assert!(out.get_pixel(0, 0).0[0] > 64.0);
        let identity = apply_gamma(&flat(1, 1, 64.0), 1.0);
        assert!((identity.get_pixel(0, 0).0[0] - 64.0).abs() < 1e-3);
    }

    #[test]
    fn binarize_is_strictly_greater_than() {
        let mut plane = flat(2, 1, 128.0);
        plane.put_pixel(1, 0, Luma([128.5]));
        let out = binarize(&plane, 128);
        assert_eq!(out.get_pixel(0, 0).0[0], 0);
        assert_eq!(out.get_pixel(1, 0).0[0], 255);
    }

    #[test]
    fn white_page_renders_white_in_every_preset() {
        let plane = flat(16, 16, 240.0);
        for spec in crate::enhance::variant::builtin_presets() {
            let out = render_variant(&plane, &spec, 2);
            assert!(
                out.pixels().all(|p| p.0[0] == 255),
                "preset {} darkened a white page",
                spec.name
            );
        }
    }
}
