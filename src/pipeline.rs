//! Per-file and per-folder processing.
//!
//! `process_file` and `process_folder` are the narrow contract the CLI layer
//! calls through: pure with respect to anything but the filesystem, safe to
//! invoke concurrently across distinct paths. `run_batch` fans files out over
//! a bounded worker pool and aggregates outcomes in completion order.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use log::{debug, info};
use serde::Serialize;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use walkdir::WalkDir;

use crate::artwork;
use crate::config::ProcessOptions;
use crate::errors::{AppError, Result};
use crate::formats::{self, FormatKind};
use crate::naming;

/// Three-way outcome of processing one file or folder.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case", tag = "status", content = "reason")]
pub enum Outcome {
    Processed,
    Skipped(String),
    Error(String),
}

#[derive(Debug, Clone, Serialize)]
pub struct ProcessingResult {
    /// Asset path, updated when the file was renamed.
    pub path: PathBuf,
    pub outcome: Outcome,
}

#[derive(Debug, Clone, Serialize)]
pub struct FolderRenameResult {
    /// Folder path, updated when the folder was renamed.
    pub path: PathBuf,
    pub outcome: Outcome,
}

/// Aggregate counts for a finished batch.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Summary {
    pub total: usize,
    pub processed: usize,
    pub skipped: usize,
    pub errors: usize,
}

impl Summary {
    pub fn record(&mut self, outcome: &Outcome) {
        match outcome {
            Outcome::Processed => self.processed += 1,
            Outcome::Skipped(_) => self.skipped += 1,
            Outcome::Error(_) => self.errors += 1,
        }
    }
}

/// Recursively collect audio files under `root`, filtered by the configured
/// extension set.
pub fn find_audio_files(root: &Path, options: &ProcessOptions) -> Vec<PathBuf> {
    WalkDir::new(root)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| entry.into_path())
        .filter(|path| options.is_audio_file(path))
        .collect()
}

/// Immediate subdirectories of `root`, sorted for deterministic reporting.
pub fn immediate_subdirs(root: &Path) -> Result<Vec<PathBuf>> {
    let mut dirs: Vec<PathBuf> = fs::read_dir(root)?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.is_dir())
        .collect();
    dirs.sort();
    Ok(dirs)
}

/// Process one audio file: optionally re-embed a normalized cover, optionally
/// rename from track metadata. Never panics the batch — every failure comes
/// back as an `Error` outcome.
pub fn process_file(path: &Path, options: &ProcessOptions) -> ProcessingResult {
    match process_file_inner(path, options) {
        Ok(result) => result,
        Err(e) => ProcessingResult {
            path: path.to_path_buf(),
            outcome: Outcome::Error(e.to_string()),
        },
    }
}

fn process_file_inner(path: &Path, options: &ProcessOptions) -> Result<ProcessingResult> {
    let adapter = formats::adapter_for(FormatKind::from_path(path));
    let mut current = path.to_path_buf();
    let mut did_work = false;

    if options.do_embed {
        // A file without a cover is not a failure; rename may still apply.
        if let Some(cover) = adapter.read_cover(&current) {
            let normalized = artwork::normalize_to_jpeg(&cover.data, options)?;
            debug!(
                "normalized cover for {}: {} -> {}x{} jpeg",
                current.display(),
                cover.mime_type,
                normalized.width,
                normalized.height
            );
            if !options.dry_run {
                adapter.embed_cover(&current, &normalized, options.backup)?;
            }
            did_work = true;
        }
    }

    if options.do_rename {
        match adapter.read_track_number(&current) {
            Some(track) => {
                let title = adapter
                    .read_title(&current)
                    .unwrap_or_else(|| file_stem(&current));
                let ext = current
                    .extension()
                    .map(|e| format!(".{}", e.to_string_lossy()))
                    .unwrap_or_default();
                let target = current.with_file_name(naming::track_file_name(track, &title, &ext));
                let target = naming::resolve_collision(&target, &current);
                if !options.dry_run && target != current {
                    fs::rename(&current, &target).map_err(|e| {
                        AppError::Filesystem(format!(
                            "failed to rename {} -> {}: {e}",
                            current.display(),
                            target.display()
                        ))
                    })?;
                    info!("renamed to {}", target.display());
                }
                current = target;
                did_work = true;
            }
            None if !options.do_embed => {
                return Ok(ProcessingResult {
                    path: current,
                    outcome: Outcome::Skipped("no track number metadata".to_string()),
                });
            }
            None => {}
        }
    }

    if !did_work {
        let reason = match (options.do_embed, options.do_rename) {
            (true, false) => "no embedded cover",
            (false, true) => "no track number metadata",
            _ => "no cover and no track number",
        };
        return Ok(ProcessingResult {
            path: current,
            outcome: Outcome::Skipped(reason.to_string()),
        });
    }

    Ok(ProcessingResult {
        path: current,
        outcome: Outcome::Processed,
    })
}

fn file_stem(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Rename a folder after the majority album of its direct child audio files.
pub fn process_folder(folder: &Path, options: &ProcessOptions) -> FolderRenameResult {
    match process_folder_inner(folder, options) {
        Ok(result) => result,
        Err(e) => FolderRenameResult {
            path: folder.to_path_buf(),
            outcome: Outcome::Error(e.to_string()),
        },
    }
}

fn process_folder_inner(folder: &Path, options: &ProcessOptions) -> Result<FolderRenameResult> {
    let Some(album) = naming::majority_album(folder, options) else {
        return Ok(FolderRenameResult {
            path: folder.to_path_buf(),
            outcome: Outcome::Skipped("no album metadata found".to_string()),
        });
    };

    let safe_album = naming::sanitize_filename(&album);
    if safe_album.is_empty() {
        return Ok(FolderRenameResult {
            path: folder.to_path_buf(),
            outcome: Outcome::Skipped("album name empty after sanitization".to_string()),
        });
    }

    let current_name = folder
        .file_name()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    if current_name == safe_album {
        return Ok(FolderRenameResult {
            path: folder.to_path_buf(),
            outcome: Outcome::Skipped("already named correctly".to_string()),
        });
    }

    let parent = folder.parent().unwrap_or_else(|| Path::new(""));
    let target = naming::resolve_dir_collision(&parent.join(&safe_album));
    if !options.dry_run {
        fs::rename(folder, &target).map_err(|e| {
            AppError::Filesystem(format!(
                "failed to rename {} -> {}: {e}",
                folder.display(),
                target.display()
            ))
        })?;
    }

    Ok(FolderRenameResult {
        path: target,
        outcome: Outcome::Processed,
    })
}

/// Process `files` over a bounded worker pool.
///
/// Each file is one independent unit of work; results arrive in completion
/// order and are handed to `on_result` as they land. The final counts do not
/// depend on completion order. Callers must not submit the same path twice in
/// one batch — concurrent writers to a single file are not serialized here.
pub async fn run_batch<F>(
    files: Vec<PathBuf>,
    options: Arc<ProcessOptions>,
    mut on_result: F,
) -> (Summary, Vec<ProcessingResult>)
where
    F: FnMut(&ProcessingResult),
{
    let total = files.len();
    let workers = options.workers.max(1);
    let semaphore = Arc::new(Semaphore::new(workers));
    let mut tasks = JoinSet::new();

    for path in files {
        let semaphore = Arc::clone(&semaphore);
        let options = Arc::clone(&options);
        tasks.spawn(async move {
            let _permit = semaphore
                .acquire_owned()
                .await
                .expect("semaphore never closed");
            let worker_path = path.clone();
            tokio::task::spawn_blocking(move || process_file(&worker_path, &options))
                .await
                .unwrap_or_else(|e| ProcessingResult {
                    path,
                    outcome: Outcome::Error(format!("worker failed: {e}")),
                })
        });
    }

    let mut summary = Summary {
        total,
        ..Summary::default()
    };
    let mut results = Vec::with_capacity(total);
    while let Some(joined) = tasks.join_next().await {
        let result = match joined {
            Ok(result) => result,
            Err(e) => ProcessingResult {
                path: PathBuf::new(),
                outcome: Outcome::Error(format!("worker failed: {e}")),
            },
        };
        summary.record(&result.outcome);
        on_result(&result);
        results.push(result);
    }

    (summary, results)
}
