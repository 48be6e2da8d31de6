//! Pure calculation functions for raster dimensions.
//!
//! All functions here are pure and testable without any I/O or pixels.
//! The reducer and the mock codec share these, so simulated and real
//! resizes agree on geometry.

use super::backend::Dimensions;

/// One fixed-ratio shrink step: both axes divided by `ratio` and rounded.
///
/// With the default ratio of 1.2 this is a 20% linear shrink (≈36% area)
/// per attempt. Rounding can stall at small dimensions (e.g. 3/1.2 rounds
/// back to 3) or reach 0 for aggressive ratios; the reducer guards both
/// cases, so no floor is applied here.
pub fn shrink_step(dims: Dimensions, ratio: f64) -> Dimensions {
    Dimensions {
        width: (dims.width as f64 / ratio).round() as u32,
        height: (dims.height as f64 / ratio).round() as u32,
    }
}

/// Aspect-preserving fit of `source` within `bounds` (no cropping).
///
/// Mirrors the `image` crate's bounding-box resize: the limiting axis is
/// scaled to the box and the other axis proportionally, each rounded and
/// floored at 1. Bounds larger than the source scale up — callers that
/// only shrink must pass bounds within the source.
pub fn fit_within(source: Dimensions, bounds: Dimensions) -> Dimensions {
    let wratio = bounds.width as f64 / source.width as f64;
    let hratio = bounds.height as f64 / source.height as f64;
    let ratio = wratio.min(hratio);

    Dimensions {
        width: ((source.width as f64 * ratio).round() as u32).max(1),
        height: ((source.height as f64 * ratio).round() as u32).max(1),
    }
}

/// Single-shot dimensions for the pixel-count budget.
///
/// Exact formula from the pixel-budget contract: with aspect ratio
/// `r = w/h`, `newW = floor(sqrt(P × r))` and `newH = floor(newW / r)`.
/// Pixel count after resize is computable in advance, so no measure loop
/// is needed. Returns `None` when the source is already within budget.
pub fn pixel_cap_dimensions(dims: Dimensions, max_pixels: u64) -> Option<Dimensions> {
    if dims.pixels() <= max_pixels {
        return None;
    }
    let r = dims.aspect_ratio();
    let new_width = ((max_pixels as f64 * r).sqrt().floor() as u32).max(1);
    let new_height = ((new_width as f64 / r).floor() as u32).max(1);
    Some(Dimensions {
        width: new_width,
        height: new_height,
    })
}
