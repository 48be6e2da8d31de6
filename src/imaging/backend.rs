//! Codec adapter trait and shared imaging types.
//!
//! The [`ImageCodec`] trait is the seam between pipeline logic and pixel
//! work: decode raw bytes into a raster, re-encode a raster as JPEG, and
//! resize a raster to fit inside a bounding box. The raster itself is an
//! associated type — the production [`JpegCodec`](super::jpeg_codec::JpegCodec)
//! uses a real decoded image, while the test mock simulates encoded sizes
//! from dimensions alone, so reduction-loop tests never pay for real
//! encoding.
//!
//! A raster is owned by exactly one processing step at a time and is
//! replaced wholesale by every resize; nothing here is shared across files.

use crate::naming::SourceFormat;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CodecError {
    #[error("decode failed: {0}")]
    Decode(String),
    #[error("encode failed: {0}")]
    Encode(String),
}

/// Width and height of a raster, in pixels. Both are always ≥ 1 for any
/// raster a codec hands out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

impl Dimensions {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Total pixel count. u64 so large sensor sizes cannot overflow.
    pub fn pixels(self) -> u64 {
        self.width as u64 * self.height as u64
    }

    /// Width over height.
    pub fn aspect_ratio(self) -> f64 {
        self.width as f64 / self.height as f64
    }
}

impl std::fmt::Display for Dimensions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Quality setting for lossy JPEG encoding (1-100). Clamped on construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Quality(u32);

impl Quality {
    pub fn new(value: u32) -> Self {
        Self(value.clamp(1, 100))
    }

    pub fn value(self) -> u32 {
        self.0
    }
}

impl Default for Quality {
    fn default() -> Self {
        Self(90)
    }
}

/// Trait for image codecs.
///
/// Implementations must uphold two contracts the reduction loop depends on:
/// - the raster returned by `resize_to_fit` fits within the requested
///   bounds with aspect ratio preserved (no cropping);
/// - `encode` output length is the only authority on encoded size — callers
///   never predict it from pixel count.
pub trait ImageCodec {
    /// In-memory decoded image handle.
    type Raster;

    /// Decode raw file bytes into a raster. The format hint selects the
    /// decoder; the bytes are still validated in full.
    fn decode(&self, bytes: &[u8], format: SourceFormat) -> Result<Self::Raster, CodecError>;

    /// Report a raster's current dimensions.
    fn dimensions(&self, raster: &Self::Raster) -> Dimensions;

    /// Serialize a raster as JPEG at the given quality.
    fn encode(&self, raster: &Self::Raster, quality: Quality) -> Result<Vec<u8>, CodecError>;

    /// Aspect-preserving resize to fit within `bounds` (longest side scaled
    /// to the box, shorter side proportionally, never cropped).
    fn resize_to_fit(&self, raster: &Self::Raster, bounds: Dimensions) -> Self::Raster;
}
