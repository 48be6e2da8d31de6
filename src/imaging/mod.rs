//! Image codec adapter — pure Rust, zero external dependencies by default.
//!
//! | Operation | Crate / function |
//! |---|---|
//! | **Decode** | `image` crate (JPEG, BMP); `libheif-rs` behind the `heic` feature |
//! | **Encode → JPEG** | `image::codecs::jpeg::JpegEncoder` |
//! | **Resize** | Lanczos3, fit-within-bounds |
//!
//! The module is split into:
//! - **Calculations**: pure functions for dimension math (unit testable)
//! - **Backend**: [`ImageCodec`] trait + shared types ([`Dimensions`], [`Quality`])
//! - **JpegCodec**: the production implementation

pub mod backend;
pub mod calculations;
pub mod jpeg_codec;

pub use backend::{CodecError, Dimensions, ImageCodec, Quality};
pub use calculations::{fit_within, pixel_cap_dimensions, shrink_step};
pub use jpeg_codec::JpegCodec;
