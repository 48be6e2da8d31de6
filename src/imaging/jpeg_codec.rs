//! Production codec — pure Rust via the `image` crate.
//!
//! ## Crate mapping
//!
//! | Operation | Crate / function |
//! |---|---|
//! | Decode JPEG, BMP | `image` crate (pure Rust decoders) |
//! | Decode HEIC (`heic` feature) | `libheif-rs` + interleaved-RGB copy |
//! | Resize | `DynamicImage::resize` with `Lanczos3` (fit within bounds) |
//! | Encode → JPEG | `image::codecs::jpeg::JpegEncoder` at configured quality |
//!
//! Everything works on in-memory byte buffers; the orchestrator owns all
//! file I/O.

use super::backend::{CodecError, Dimensions, ImageCodec, Quality};
use crate::naming::SourceFormat;
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, ExtendedColorType, ImageFormat};

/// Codec over the `image` crate. Stateless; one instance serves the whole
/// batch.
pub struct JpegCodec;

impl JpegCodec {
    pub fn new() -> Self {
        Self
    }
}

impl Default for JpegCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl ImageCodec for JpegCodec {
    type Raster = DynamicImage;

    fn decode(&self, bytes: &[u8], format: SourceFormat) -> Result<DynamicImage, CodecError> {
        let image_format = match format {
            SourceFormat::Jpeg => ImageFormat::Jpeg,
            SourceFormat::Bmp => ImageFormat::Bmp,
            #[cfg(feature = "heic")]
            SourceFormat::Heic => return decode_heic(bytes),
        };
        image::load_from_memory_with_format(bytes, image_format)
            .map_err(|e| CodecError::Decode(format!("{} decode: {}", format.name(), e)))
    }

    fn dimensions(&self, raster: &DynamicImage) -> Dimensions {
        Dimensions::new(raster.width(), raster.height())
    }

    fn encode(&self, raster: &DynamicImage, quality: Quality) -> Result<Vec<u8>, CodecError> {
        // JPEG has no alpha; flatten everything to RGB8 before encoding.
        let rgb = raster.to_rgb8();
        let mut buf = Vec::new();
        JpegEncoder::new_with_quality(&mut buf, quality.value() as u8)
            .encode(
                rgb.as_raw(),
                rgb.width(),
                rgb.height(),
                ExtendedColorType::Rgb8,
            )
            .map_err(|e| CodecError::Encode(format!("jpeg encode: {}", e)))?;
        Ok(buf)
    }

    fn resize_to_fit(&self, raster: &DynamicImage, bounds: Dimensions) -> DynamicImage {
        raster.resize(bounds.width, bounds.height, FilterType::Lanczos3)
    }
}

/// Decode a HEIC container to RGB via libheif.
///
/// Rows in the decoded plane may be stride-padded, so the copy is row by
/// row rather than one `to_vec`.
#[cfg(feature = "heic")]
fn decode_heic(bytes: &[u8]) -> Result<DynamicImage, CodecError> {
    use libheif_rs::{ColorSpace, HeifContext, LibHeif, RgbChroma};

    let lib_heif = LibHeif::new();
    let ctx = HeifContext::read_from_bytes(bytes)
        .map_err(|e| CodecError::Decode(format!("heic container: {}", e)))?;
    let handle = ctx
        .primary_image_handle()
        .map_err(|e| CodecError::Decode(format!("heic primary image: {}", e)))?;

    let decoded = lib_heif
        .decode(&handle, ColorSpace::Rgb(RgbChroma::Rgb), None)
        .map_err(|e| CodecError::Decode(format!("heic decode: {}", e)))?;

    let width = decoded.width();
    let height = decoded.height();
    let planes = decoded.planes();
    let plane = planes
        .interleaved
        .ok_or_else(|| CodecError::Decode("heic decode: no interleaved RGB plane".to_string()))?;

    let row_len = width as usize * 3;
    let mut rgb = Vec::with_capacity(row_len * height as usize);
    for row in 0..height as usize {
        let start = row * plane.stride;
        rgb.extend_from_slice(&plane.data[start..start + row_len]);
    }

    image::RgbImage::from_raw(width, height, rgb)
        .map(DynamicImage::ImageRgb8)
        .ok_or_else(|| CodecError::Decode("heic decode: plane size mismatch".to_string()))
}
