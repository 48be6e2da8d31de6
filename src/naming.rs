//! Centralized extension classification and output file naming.
//!
//! Every input file is classified once, by extension, before any bytes are
//! read. The admitted set is fixed: JPEG (with `jpg` aliased to `jpeg`),
//! BMP, and — when the `heic` feature is compiled in — HEIC. Anything else
//! is a skip, not an error.
//!
//! ## Output names
//!
//! Outputs always carry the target `.jpeg` extension. Files that had to be
//! shrunk get a `_reduced` suffix; files already within budget get
//! `_original`:
//! - `holiday.bmp`, shrunk twice → `holiday_reduced.jpeg`
//! - `holiday.jpg`, already small → `holiday_original.jpeg`

use std::path::Path;

/// The extension written on every output file.
pub const TARGET_EXTENSION: &str = "jpeg";

/// An admitted source format, detected from the file extension.
///
/// `jpg` and `jpeg` both map to [`SourceFormat::Jpeg`]; matching is
/// case-insensitive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceFormat {
    Jpeg,
    Bmp,
    #[cfg(feature = "heic")]
    Heic,
}

impl SourceFormat {
    /// Classify a raw extension. Returns `None` for anything outside the
    /// admitted set (including files with no extension at all).
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "jpeg" | "jpg" => Some(Self::Jpeg),
            "bmp" => Some(Self::Bmp),
            #[cfg(feature = "heic")]
            "heic" => Some(Self::Heic),
            _ => None,
        }
    }

    /// Classify a path by its extension.
    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|e| e.to_str())
            .and_then(Self::from_extension)
    }

    /// Whether this format already matches the target codec, so
    /// normalization is a pass-through.
    pub fn is_target(self) -> bool {
        matches!(self, Self::Jpeg)
    }

    /// Canonical lower-case name, with the `jpg` alias already folded.
    pub fn name(self) -> &'static str {
        match self {
            Self::Jpeg => "jpeg",
            Self::Bmp => "bmp",
            #[cfg(feature = "heic")]
            Self::Heic => "heic",
        }
    }
}

/// How a file left the pipeline, as reflected in its output name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputKind {
    /// At least one shrink step was taken.
    Reduced,
    /// Already within budget; re-encoded (or passed through) untouched.
    Original,
}

impl OutputKind {
    fn suffix(self) -> &'static str {
        match self {
            Self::Reduced => "_reduced",
            Self::Original => "_original",
        }
    }
}

/// Build an output file name from a stem.
///
/// The source extension never appears in the output; only the stem
/// survives, suffixed by the outcome and the target extension. The caller
/// is responsible for stem uniqueness — distinct sources can share a stem
/// (`photo.jpg` / `photo.bmp`), and since every output carries the same
/// extension, colliding stems would collide as output files.
pub fn output_name(stem: &str, kind: OutputKind) -> String {
    format!("{}{}.{}", stem, kind.suffix(), TARGET_EXTENSION)
}
