//! Format normalization — any admitted format to JPEG bytes.
//!
//! JPEG input passes through untouched (no decode, no quality loss at this
//! stage). Everything else is decoded via the codec and re-encoded to the
//! target codec. Unadmitted extensions never reach this module; they are
//! classified as skips by [`naming`](crate::naming) before any bytes are
//! read.

use crate::imaging::{CodecError, ImageCodec, Quality};
use crate::naming::SourceFormat;

/// Normalize source bytes to the target codec.
///
/// Returns the input unchanged when the source is already JPEG. Failures
/// (malformed image, unsupported sub-format) are per-file recoverable
/// errors; the orchestrator reports them and moves on.
pub fn normalize<C: ImageCodec>(
    codec: &C,
    bytes: Vec<u8>,
    format: SourceFormat,
    quality: Quality,
) -> Result<Vec<u8>, CodecError> {
    if format.is_target() {
        return Ok(bytes);
    }
    let raster = codec.decode(&bytes, format)?;
    codec.encode(&raster, quality)
}
