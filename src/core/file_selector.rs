use crate::domain::error::{CombineError, Result};
use crate::domain::models::{ExclusionRule, InputSpec};
use crate::infra::file_system::list_code_files;
use crate::infra::unique_id::is_generated_file_name;
use log::{debug, info};
use std::path::{Path, PathBuf};

/// Full containing directory of `path`, `/`-spelled, lowercased and bounded by separators
/// (`/home/me/proj/src/`). Relative inputs are made absolute first so a fragment can
/// match segments above the input root.
fn bounded_dir(path: &Path) -> String {
    let dir = path.parent().unwrap_or_else(|| Path::new(""));
    let full = std::path::absolute(dir).unwrap_or_else(|_| dir.to_path_buf());
    let spelled = full.to_string_lossy().replace('\\', "/");
    let trimmed = spelled.trim_matches('/');
    if trimmed.is_empty() {
        "/".to_string()
    } else {
        format!("/{}/", trimmed.to_lowercase())
    }
}

pub fn is_excluded(path: &Path, rules: &[ExclusionRule]) -> bool {
    if rules.is_empty() {
        return false;
    }

    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_lowercase())
        .unwrap_or_default();
    let dir = bounded_dir(path);

    rules.iter().any(|rule| match rule {
        ExclusionRule::FileName(name) => *name == file_name,
        ExclusionRule::DirectoryFragment(fragment) => dir.contains(fragment.as_str()),
    })
}

/// Candidate files for a run. A single-file input is returned as is, without applying exclusions.
pub fn select(input: &InputSpec) -> Result<Vec<PathBuf>> {
    if input.path.is_file() {
        debug!("Input is a single file: {}", input.path.display());
        return Ok(vec![input.path.clone()]);
    }
    if !input.path.is_dir() {
        return Err(CombineError::InputNotFound(input.path.clone()));
    }

    debug!("Exclusions: {:?}", input.exclusions);
    let mut files = list_code_files(&input.path, &input.extensions)?;
    let before = files.len();
    files.retain(|path| {
        let excluded = is_excluded(path, &input.exclusions);
        if excluded {
            debug!("Excluding file: {}", path.display());
        }
        !excluded
    });

    info!(
        "Selected {} files ({} excluded)",
        files.len(),
        before - files.len()
    );
    Ok(files)
}

/// Drops the run's own target and outputs of earlier runs from a merge selection.
pub fn skip_generated_outputs(files: &mut Vec<PathBuf>, target: &Path, extension: &str) {
    files.retain(|path| {
        let is_target = std::path::absolute(path)
            .map(|abs| abs == target)
            .unwrap_or(false);
        let generated = path
            .file_name()
            .map(|n| is_generated_file_name(&n.to_string_lossy(), extension))
            .unwrap_or(false);

        if is_target || generated {
            info!("Skipping generated output: {}", path.display());
        }
        !(is_target || generated)
    });
}
