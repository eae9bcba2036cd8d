// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Majority-vote fusion of binarized variants.

use image::{GrayImage, Luma};
use terminscan_core::error::{Result, TerminError};

/// Fuse binary images pixel by pixel.
///
/// A pixel is white when strictly more than half of the inputs are white
/// there; ties go to black. All inputs must share one size.
pub fn majority_vote(variants: &[GrayImage]) -> Result<GrayImage> {
    let first = variants
        .first()
        .ok_or_else(|| TerminError::Enhancement("no variants to fuse".into()))?;
    let (width, height) = first.dimensions();
    if let Some(odd) = variants.iter().find(|v| v.dimensions() != (width, height)) {
        return Err(TerminError::Enhancement(format!(
            "variant size {:?} does not match {:?}",
            odd.dimensions(),
            (width, height)
        )));
    }

    let total = variants.len();
    Ok(GrayImage::from_fn(width, height, |x, y| {
        let whites = variants
            .iter()
            .filter(|v| v.get_pixel(x, y).0[0] > 127)
            .count();
        Luma([if whites * 2 > total { 255 } else { 0 }])
    }))
}
