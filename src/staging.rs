//! Staging - Paths First, Processes Later
//!
//! Every group gets its temp directory and output file before anything
//! runs. The chain of artifacts is an explicit list: each item reads the
//! previous item's file.

use std::fs;
use std::path::{Path, PathBuf};

use uuid::Uuid;

use crate::consolidate::{group_consolidatables, ConsolidatedGroup};
use crate::drawable::Layer;
use crate::error::{RenderError, RenderResult};

/// Collision-resistant identifier for one staged artifact.
pub fn random_id() -> String {
    Uuid::new_v4().simple().to_string()
}

/// `<dir>/<id>/`
pub fn temp_dir_path(output_dir: &Path, id: &str) -> PathBuf {
    output_dir.join(id)
}

/// `<dir>/<id>.<format>`
pub fn temp_file_path(output_dir: &Path, id: &str, format: &str) -> PathBuf {
    output_dir.join(format!("{}.{}", id, format.trim_start_matches('.')))
}

/// Fresh file path under `output_dir`.
pub fn fresh_file(output_dir: &Path, format: &str) -> PathBuf {
    temp_file_path(output_dir, &random_id(), format)
}

/// Format implied by a destination path, falling back to `default`.
pub fn format_of<'p>(path: &'p Path, default: &'p str) -> &'p str {
    path.extension().and_then(|e| e.to_str()).unwrap_or(default)
}

pub fn ensure_dir(dir: &Path) -> RenderResult<()> {
    fs::create_dir_all(dir).map_err(|e| RenderError::filesystem(dir, e))
}

pub fn ensure_parent(path: &Path) -> RenderResult<()> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => ensure_dir(parent),
        _ => Ok(()),
    }
}

pub fn copy_file(from: &Path, to: &Path) -> RenderResult<()> {
    fs::copy(from, to)
        .map(|_| ())
        .map_err(|e| RenderError::filesystem(from, e))
}

/// Rename, falling back to copy + remove across filesystems.
pub fn move_file(from: &Path, to: &Path) -> RenderResult<()> {
    if fs::rename(from, to).is_ok() {
        return Ok(());
    }
    copy_file(from, to)?;
    fs::remove_file(from).map_err(|e| RenderError::filesystem(from, e))
}

/// One group plus the paths it reads from and writes to.
#[derive(Debug, Clone)]
pub struct PreprocessedItem<'a> {
    pub temp_dir_path: PathBuf,
    pub temp_file_path: PathBuf,
    pub group: ConsolidatedGroup<'a>,
    pub previous_output_path: Option<PathBuf>,
}

/// Consolidate a layer and assign every group its staged paths.
///
/// No filesystem writes happen here.
pub fn preprocess_drawables_for_rendering<'a>(
    layer: &'a Layer,
    output_dir: &Path,
    format: &str,
    include_foundation: bool,
) -> Vec<PreprocessedItem<'a>> {
    let drawables = layer.drawables(include_foundation);
    let mut previous: Option<PathBuf> = None;

    group_consolidatables(&drawables)
        .into_iter()
        .map(|group| {
            let id = random_id();
            let temp_file_path = temp_file_path(output_dir, &id, format);
            PreprocessedItem {
                temp_dir_path: temp_dir_path(output_dir, &id),
                temp_file_path: temp_file_path.clone(),
                group,
                previous_output_path: previous.replace(temp_file_path),
            }
        })
        .collect()
}
