//! # Photoshrink
//!
//! Batch-normalize a flat directory of images to JPEG within a size budget.
//! Every admitted source file becomes exactly one JPEG in the output
//! directory; anything over the configured ceiling is shrunk until it fits.
//!
//! # Architecture: Per-File Pipeline
//!
//! One run walks the input directory once and pushes each file through the
//! same four stages:
//!
//! ```text
//! 1. check     classify by extension, read bytes     (skip or admit)
//! 2. convert   normalize to JPEG                     (pass-through for JPEG)
//! 3. reduce    encode, measure, shrink until it fits (or give up, bounded)
//! 4. copy      place into the output directory       (_reduced / _original)
//! ```
//!
//! Files are fully independent: a corrupt image or an unreachable budget
//! fails that one file and the batch continues. That independence is also
//! what makes the batch embarrassingly parallel — files fan out across a
//! rayon pool while each file's own reduce loop stays sequential.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`batch`] | Orchestrator — directory setup, per-file pipeline, outcome report |
//! | [`reduce`] | The shrink loop: encode, measure, resize until the budget holds |
//! | [`normalize`] | Format normalization — any admitted format to JPEG bytes |
//! | [`imaging`] | Codec seam: the [`ImageCodec`](imaging::ImageCodec) trait, the production JPEG codec, and pure geometry math |
//! | [`naming`] | Extension classification and `_reduced`/`_original` output naming |
//! | [`config`] | `photoshrink.toml` loading, validation, defaults |
//! | [`cancel`] | Cooperative cancellation flag shared with the Ctrl-C handler |
//! | [`output`] | CLI output formatting — timestamped, stage-tagged progress lines |
//!
//! # Design Decisions
//!
//! ## The Encode Is the Measurement
//!
//! JPEG compression is non-linear in pixel count, so there is no way to
//! predict the encoded size of a resize without doing the encode. The byte
//! budget therefore works as an encode/measure/shrink loop, and the bytes
//! of the final passing measurement are exactly what gets written — the
//! output file is never re-encoded after being measured.
//!
//! ## Everything in the Output Directory Satisfies the Budget
//!
//! The output directory is deleted and recreated at the start of every run,
//! and a file whose budget proves unreachable (iteration cap, dimension
//! floor, or a rounding stall) produces *no* output at all. Both rules
//! serve the same invariant: the output directory's contents are exactly
//! the budget-satisfying results of the current inputs, never a mix of
//! runs and never a best-effort oversized file.
//!
//! ## Codec Behind a Trait
//!
//! Pipeline logic never touches pixels directly; it goes through
//! [`imaging::ImageCodec`], whose raster is an associated type. The
//! production codec wraps the `image` crate (Lanczos3 resampling, pure
//! Rust, no system dependencies). The test mock's raster is just a
//! [`Dimensions`](imaging::Dimensions) plus a configurable size curve, so
//! reduction-loop tests can exercise convergence, stalls, and caps on
//! simulated multi-hundred-megapixel images in microseconds.

pub mod batch;
pub mod cancel;
pub mod config;
pub mod imaging;
pub mod naming;
pub mod normalize;
pub mod output;
pub mod reduce;

#[cfg(test)]
pub(crate) mod test_helpers;
