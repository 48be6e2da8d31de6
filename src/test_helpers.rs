//! Shared test utilities.
//!
//! Synthetic image builders used across unit tests and the integration
//! tests. The gradient fill gives JPEG something non-trivial to compress,
//! so encoded sizes scale believably with pixel count.

use image::codecs::bmp::BmpEncoder;
use image::codecs::jpeg::JpegEncoder;
use image::{ExtendedColorType, ImageEncoder, RgbImage};
use std::path::Path;

fn gradient(width: u32, height: u32) -> RgbImage {
    RgbImage::from_fn(width, height, |x, y| {
        image::Rgb([(x % 256) as u8, (y % 256) as u8, ((x + y) % 256) as u8])
    })
}

/// Encode a synthetic JPEG in memory.
pub fn encode_test_jpeg(width: u32, height: u32) -> Vec<u8> {
    let img = gradient(width, height);
    let mut buf = Vec::new();
    JpegEncoder::new(&mut buf)
        .write_image(img.as_raw(), width, height, ExtendedColorType::Rgb8)
        .unwrap();
    buf
}

/// Encode a synthetic BMP in memory (uncompressed, so it is large).
pub fn encode_test_bmp(width: u32, height: u32) -> Vec<u8> {
    let img = gradient(width, height);
    let mut buf = Vec::new();
    BmpEncoder::new(&mut buf)
        .write_image(img.as_raw(), width, height, ExtendedColorType::Rgb8)
        .unwrap();
    buf
}

/// Write a synthetic JPEG file.
pub fn write_test_jpeg(path: &Path, width: u32, height: u32) {
    std::fs::write(path, encode_test_jpeg(width, height)).unwrap();
}

/// Write a synthetic BMP file.
pub fn write_test_bmp(path: &Path, width: u32, height: u32) {
    std::fs::write(path, encode_test_bmp(width, height)).unwrap();
}
