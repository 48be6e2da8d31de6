//! Batch orchestration.
//!
//! Walks the input directory (non-recursive), and for each file: classify
//! by extension, stage into the work directory, normalize to JPEG, reduce
//! to the configured budget, copy the result to the output directory, and
//! clean up temporaries. One file's failure at any stage is fully
//! recovered — remaining files are still processed.
//!
//! ## Directory contract
//!
//! - The input directory is never mutated (created empty if missing).
//! - The output directory is deleted and recreated at the start of a run.
//! - The work directory holds per-file intermediate artifacts (staged
//!   source, normalized bytes, reduced bytes) and is cleared per file
//!   after the file's outcome — success or failure — is finalized, so a
//!   large batch never grows the disk.
//!
//! Files are independent, so they may be processed in parallel (pool size
//! comes from [`ProcessingConfig`](crate::config::ProcessingConfig)); the
//! reduction loop for a single file is always sequential. Progress events
//! stream over an mpsc channel to a printer thread; the report is sorted
//! by file name so results are deterministic either way.

use crate::cancel::CancelFlag;
use crate::config::RunConfig;
use crate::imaging::{Dimensions, ImageCodec, JpegCodec, Quality};
use crate::naming::{self, OutputKind, SourceFormat};
use crate::normalize::normalize;
use crate::reduce::{BudgetReading, ReduceError, ReducerConfig, reduce};
use rayon::prelude::*;
use serde::Serialize;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::mpsc::Sender;
use thiserror::Error;
use walkdir::WalkDir;

/// Fatal, run-level errors. Per-file errors never surface here; they end
/// up in the [`RunReport`].
#[derive(Error, Debug)]
pub enum BatchError {
    #[error("cannot prepare directory {path}: {source}")]
    Setup {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Why a file ended in `Failed`.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FailureKind {
    /// Source bytes could not be parsed as an image.
    Decode { message: String },
    /// Format normalization (or re-encoding) failed.
    Conversion { message: String },
    /// The reduction loop hit its cap or floor without meeting budget.
    BudgetUnreachable {
        attempts: u32,
        width: u32,
        height: u32,
    },
    /// Copy/write failure.
    Io { message: String },
}

impl FailureKind {
    fn message(&self) -> String {
        match self {
            Self::Decode { message } => format!("decode error: {}", message),
            Self::Conversion { message } => format!("conversion error: {}", message),
            Self::BudgetUnreachable {
                attempts,
                width,
                height,
            } => format!(
                "budget unreachable after {} attempts (reached {}x{})",
                attempts, width, height
            ),
            Self::Io { message } => format!("io error: {}", message),
        }
    }
}

/// Terminal state of one input file.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum FileOutcome {
    /// Shrunk at least once and copied to the output directory.
    Reduced {
        output: String,
        attempts: u32,
        width: u32,
        height: u32,
    },
    /// Already within budget; copied with the `_original` suffix.
    WithinBudget {
        output: String,
        width: u32,
        height: u32,
    },
    /// Extension not admitted; no output, not an error.
    Skipped { reason: String },
    /// Per-file recoverable error; no output for this file.
    Failed { failure: FailureKind },
    /// Run was cancelled before this file finished.
    Cancelled,
}

/// One line of the run report.
#[derive(Debug, Clone, Serialize)]
pub struct FileReport {
    pub file: String,
    #[serde(flatten)]
    pub outcome: FileOutcome,
}

/// Outcome counts for the final summary line and the JSON report.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Summary {
    pub reduced: usize,
    pub within_budget: usize,
    pub skipped: usize,
    pub failed: usize,
    pub cancelled: usize,
}

/// Everything that happened in one run, sorted by file name.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub files: Vec<FileReport>,
    pub summary: Summary,
    pub cancelled: bool,
}

fn summarize(files: &[FileReport]) -> Summary {
    let mut s = Summary::default();
    for report in files {
        match report.outcome {
            FileOutcome::Reduced { .. } => s.reduced += 1,
            FileOutcome::WithinBudget { .. } => s.within_budget += 1,
            FileOutcome::Skipped { .. } => s.skipped += 1,
            FileOutcome::Failed { .. } => s.failed += 1,
            FileOutcome::Cancelled => s.cancelled += 1,
        }
    }
    s
}

/// Progress events, consumed by a printer thread (see `output`).
#[derive(Debug, Clone)]
pub enum BatchEvent {
    FileStarted {
        file_name: String,
        size_bytes: u64,
    },
    FileSkipped {
        file_name: String,
        extension: String,
    },
    ConvertStarted {
        file_name: String,
        from: &'static str,
    },
    ConvertFinished {
        file_name: String,
    },
    ReduceStarted {
        file_name: String,
    },
    ReduceAttempt {
        file_name: String,
        attempt: u32,
        dims: Dimensions,
    },
    ReduceFinished {
        file_name: String,
        attempts: u32,
        dims: Dimensions,
        measured: BudgetReading,
    },
    Copied {
        file_name: String,
        output_name: String,
    },
    FileFailed {
        file_name: String,
        message: String,
    },
}

fn emit(events: Option<&Sender<BatchEvent>>, event: BatchEvent) {
    if let Some(tx) = events {
        // A dropped receiver just means nobody is listening anymore.
        let _ = tx.send(event);
    }
}

/// Run a full batch with the production codec.
pub fn run(
    config: &RunConfig,
    input_dir: &Path,
    output_dir: &Path,
    work_dir: &Path,
    cancel: &CancelFlag,
    events: Option<Sender<BatchEvent>>,
) -> Result<RunReport, BatchError> {
    let codec = JpegCodec::new();
    run_with_codec(&codec, config, input_dir, output_dir, work_dir, cancel, events)
}

/// Run a full batch using a specific codec (allows testing with the mock).
pub fn run_with_codec<C: ImageCodec + Sync>(
    codec: &C,
    config: &RunConfig,
    input_dir: &Path,
    output_dir: &Path,
    work_dir: &Path,
    cancel: &CancelFlag,
    events: Option<Sender<BatchEvent>>,
) -> Result<RunReport, BatchError> {
    // Originals live here and are never touched; a missing input directory
    // is created empty rather than treated as an error.
    fs::create_dir_all(input_dir).map_err(|e| setup_error(input_dir, e))?;
    reset_dir(output_dir)?;
    reset_dir(work_dir)?;

    let files = list_input_files(input_dir);
    let stems = assign_unique_stems(&files);
    let tasks: Vec<(&PathBuf, &String)> = files.iter().zip(stems.iter()).collect();
    let reducer_config = ReducerConfig::from_run_config(config);
    let quality = Quality::new(config.reducer.quality);

    let mut reports: Vec<FileReport> = tasks
        .par_iter()
        .map_with(events, |events, &(path, stem)| {
            let file_name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            let outcome = if cancel.is_cancelled() {
                FileOutcome::Cancelled
            } else {
                process_file(
                    codec,
                    path,
                    &file_name,
                    stem,
                    &reducer_config,
                    quality,
                    output_dir,
                    work_dir,
                    cancel,
                    events.as_ref(),
                )
            };
            FileReport {
                file: file_name,
                outcome,
            }
        })
        .collect();

    reports.sort_by(|a, b| a.file.cmp(&b.file));
    let summary = summarize(&reports);

    Ok(RunReport {
        files: reports,
        summary,
        cancelled: cancel.is_cancelled(),
    })
}

/// Assign each file a unique output stem, in listing (name) order.
///
/// Distinct inputs can share a stem (`photo.jpg` + `photo.bmp`), and every
/// output carries the same target extension, so colliding stems would
/// silently overwrite each other in the output directory. Later files get
/// a numeric disambiguator: `photo`, `photo-2`, `photo-3` — checked
/// against every stem assigned so far, including ones an input carried
/// literally. Output-name uniqueness is also what lets files be processed
/// in parallel with no coordination on the output directory.
fn assign_unique_stems(files: &[PathBuf]) -> Vec<String> {
    let mut used: HashSet<String> = HashSet::new();
    files
        .iter()
        .map(|path| {
            let stem = path
                .file_stem()
                .or_else(|| path.file_name())
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_default();
            let mut candidate = stem.clone();
            let mut n = 2;
            while !used.insert(candidate.clone()) {
                candidate = format!("{}-{}", stem, n);
                n += 1;
            }
            candidate
        })
        .collect()
}

fn setup_error(path: &Path, source: std::io::Error) -> BatchError {
    BatchError::Setup {
        path: path.to_path_buf(),
        source,
    }
}

/// Delete and recreate a directory. Fatal on failure: without a clean
/// output or work area the whole run is meaningless.
fn reset_dir(dir: &Path) -> Result<(), BatchError> {
    if dir.exists() {
        fs::remove_dir_all(dir).map_err(|e| setup_error(dir, e))?;
    }
    fs::create_dir_all(dir).map_err(|e| setup_error(dir, e))
}

/// One row of a dry `check` inspection: what a run would do with a file,
/// without touching anything.
#[derive(Debug, Clone, Serialize)]
pub struct CheckEntry {
    pub file: String,
    /// File size, or `None` when the entry's metadata cannot be read —
    /// distinct from a real zero-byte file.
    pub size_bytes: Option<u64>,
    /// Canonical format name, or `None` for a file a run would skip.
    pub format: Option<&'static str>,
}

/// Inspect the input directory without running: classify every file and
/// report its size. Never creates or mutates anything; a missing input
/// directory yields an empty listing.
pub fn check(input_dir: &Path) -> Vec<CheckEntry> {
    list_input_files(input_dir)
        .into_iter()
        .map(|path| CheckEntry {
            file: path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default(),
            size_bytes: fs::metadata(&path).map(|m| m.len()).ok(),
            format: SourceFormat::from_path(&path).map(|f| f.name()),
        })
        .collect()
}

/// Flat, name-ordered listing of the input directory.
fn list_input_files(input_dir: &Path) -> Vec<PathBuf> {
    WalkDir::new(input_dir)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| entry.into_path())
        .collect()
}

/// One input file's processing state: a private work subdirectory holding
/// staged artifacts, discarded once the outcome is final.
///
/// Each task works in its own subdirectory, named by the file's unique
/// stem, so parallel tasks never share a work-dir path however the inputs
/// are named.
struct FileTask {
    dir: PathBuf,
}

impl FileTask {
    fn new(work_dir: &Path, stem: &str) -> Self {
        Self {
            dir: work_dir.join(stem),
        }
    }

    /// Write an intermediate artifact into the task's work area.
    fn stage(&self, name: &str, bytes: &[u8]) -> std::io::Result<PathBuf> {
        fs::create_dir_all(&self.dir)?;
        let path = self.dir.join(name);
        fs::write(&path, bytes)?;
        Ok(path)
    }

    /// Remove the task's work area. Best effort: an already-missing
    /// directory is not worth failing the batch over.
    fn cleanup(&self) {
        let _ = fs::remove_dir_all(&self.dir);
    }
}

#[allow(clippy::too_many_arguments)]
fn process_file<C: ImageCodec>(
    codec: &C,
    source: &Path,
    file_name: &str,
    stem: &str,
    reducer_config: &ReducerConfig,
    quality: Quality,
    output_dir: &Path,
    work_dir: &Path,
    cancel: &CancelFlag,
    events: Option<&Sender<BatchEvent>>,
) -> FileOutcome {
    let Some(format) = SourceFormat::from_path(source) else {
        let extension = source
            .extension()
            .map(|e| e.to_string_lossy().into_owned())
            .unwrap_or_default();
        emit(
            events,
            BatchEvent::FileSkipped {
                file_name: file_name.to_string(),
                extension: extension.clone(),
            },
        );
        return FileOutcome::Skipped {
            reason: format!("extension {:?} not supported", extension),
        };
    };

    let task = FileTask::new(work_dir, stem);
    let outcome = process_task(
        codec,
        source,
        file_name,
        stem,
        format,
        &task,
        reducer_config,
        quality,
        output_dir,
        cancel,
        events,
    );
    // Success or failure, this file's temporaries go before the next file.
    task.cleanup();

    if let FileOutcome::Failed { ref failure } = outcome {
        emit(
            events,
            BatchEvent::FileFailed {
                file_name: file_name.to_string(),
                message: failure.message(),
            },
        );
    }
    outcome
}

#[allow(clippy::too_many_arguments)]
fn process_task<C: ImageCodec>(
    codec: &C,
    source: &Path,
    file_name: &str,
    stem: &str,
    format: SourceFormat,
    task: &FileTask,
    reducer_config: &ReducerConfig,
    quality: Quality,
    output_dir: &Path,
    cancel: &CancelFlag,
    events: Option<&Sender<BatchEvent>>,
) -> FileOutcome {
    let bytes = match fs::read(source) {
        Ok(bytes) => bytes,
        Err(e) => {
            return FileOutcome::Failed {
                failure: FailureKind::Io {
                    message: e.to_string(),
                },
            };
        }
    };

    emit(
        events,
        BatchEvent::FileStarted {
            file_name: file_name.to_string(),
            size_bytes: bytes.len() as u64,
        },
    );

    // Stage a copy of the source so everything downstream works off the
    // work area, never the input directory.
    if let Err(e) = task.stage(file_name, &bytes) {
        return FileOutcome::Failed {
            failure: FailureKind::Io {
                message: e.to_string(),
            },
        };
    }

    // Normalize to the target codec.
    let normalized = if format.is_target() {
        bytes
    } else {
        emit(
            events,
            BatchEvent::ConvertStarted {
                file_name: file_name.to_string(),
                from: format.name(),
            },
        );
        let converted = match normalize(codec, bytes, format, quality) {
            Ok(converted) => converted,
            Err(e) => {
                return FileOutcome::Failed {
                    failure: FailureKind::Conversion {
                        message: e.to_string(),
                    },
                };
            }
        };
        let staged_name = format!("{}.{}", stem, naming::TARGET_EXTENSION);
        if let Err(e) = task.stage(&staged_name, &converted) {
            return FileOutcome::Failed {
                failure: FailureKind::Io {
                    message: e.to_string(),
                },
            };
        }
        emit(
            events,
            BatchEvent::ConvertFinished {
                file_name: file_name.to_string(),
            },
        );
        converted
    };

    // Reduce. The raster is owned by this step alone and replaced on each
    // resize inside the loop.
    emit(
        events,
        BatchEvent::ReduceStarted {
            file_name: file_name.to_string(),
        },
    );
    let raster = match codec.decode(&normalized, SourceFormat::Jpeg) {
        Ok(raster) => raster,
        Err(e) => {
            return FileOutcome::Failed {
                failure: FailureKind::Decode {
                    message: e.to_string(),
                },
            };
        }
    };
    drop(normalized);

    let reduction = match reduce(codec, raster, reducer_config, cancel, |attempt, dims| {
        emit(
            events,
            BatchEvent::ReduceAttempt {
                file_name: file_name.to_string(),
                attempt,
                dims,
            },
        );
    }) {
        Ok(reduction) => reduction,
        Err(ReduceError::Cancelled) => return FileOutcome::Cancelled,
        Err(ReduceError::BudgetUnreachable {
            attempts, reached, ..
        }) => {
            // Policy: nothing over budget ever lands in the output
            // directory; the partial raster is discarded here.
            return FileOutcome::Failed {
                failure: FailureKind::BudgetUnreachable {
                    attempts,
                    width: reached.width,
                    height: reached.height,
                },
            };
        }
        Err(ReduceError::Codec(e)) => {
            return FileOutcome::Failed {
                failure: FailureKind::Conversion {
                    message: e.to_string(),
                },
            };
        }
    };

    emit(
        events,
        BatchEvent::ReduceFinished {
            file_name: file_name.to_string(),
            attempts: reduction.attempts,
            dims: reduction.dimensions,
            measured: reduction.measured,
        },
    );

    // Place the result: reduced bytes go through the work area, then a
    // plain copy into the output directory.
    let kind = if reduction.attempts > 0 {
        OutputKind::Reduced
    } else {
        OutputKind::Original
    };
    let output_name = naming::output_name(stem, kind);

    let staged = match task.stage(&output_name, &reduction.jpeg) {
        Ok(staged) => staged,
        Err(e) => {
            return FileOutcome::Failed {
                failure: FailureKind::Io {
                    message: e.to_string(),
                },
            };
        }
    };
    if let Err(e) = fs::copy(&staged, output_dir.join(&output_name)) {
        return FileOutcome::Failed {
            failure: FailureKind::Io {
                message: e.to_string(),
            },
        };
    }

    emit(
        events,
        BatchEvent::Copied {
            file_name: file_name.to_string(),
            output_name: output_name.clone(),
        },
    );

    match kind {
        OutputKind::Reduced => FileOutcome::Reduced {
            output: output_name,
            attempts: reduction.attempts,
            width: reduction.dimensions.width,
            height: reduction.dimensions.height,
        },
        OutputKind::Original => FileOutcome::WithinBudget {
            output: output_name,
            width: reduction.dimensions.width,
            height: reduction.dimensions.height,
        },
    }
}
