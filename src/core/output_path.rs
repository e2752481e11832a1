use crate::domain::error::{CombineError, Result};
use crate::domain::models::{InputSpec, OutputSpec, ResolvedOutputPath};
use crate::infra::file_system::{create_dir_all, ends_in_separator, ensure_trailing_separator};
use crate::infra::unique_id::unique_id;
use log::debug;
use std::path::{Path, PathBuf};

fn compose_file_name(output: &OutputSpec, stem: &str) -> String {
    format!(
        "{}{}{}{}",
        output.prefix.as_deref().unwrap_or(""),
        stem,
        output.suffix.as_deref().unwrap_or(""),
        output.extension
    )
}

fn base_path(input: &InputSpec) -> Result<PathBuf> {
    if input.is_file {
        input
            .path
            .parent()
            .map(Path::to_path_buf)
            .ok_or_else(|| CombineError::InvalidInput(input.path.clone()))
    } else {
        Ok(PathBuf::from(ensure_trailing_separator(
            &input.path.to_string_lossy(),
        )))
    }
}

fn absolute(path: &Path) -> Result<PathBuf> {
    std::path::absolute(path).map_err(|e| CombineError::from_io(path, e))
}

pub fn resolve(input: &InputSpec, output: &OutputSpec) -> Result<ResolvedOutputPath> {
    resolve_with_id(input, output, &unique_id())
}

/// Computes the output file, creating any missing output directory on the way.
/// Fails before anything is written when the target exists and overwriting is off.
pub fn resolve_with_id(
    input: &InputSpec,
    output: &OutputSpec,
    default_base_name: &str,
) -> Result<ResolvedOutputPath> {
    let base = base_path(input)?;

    let (dir, file_name) = match output.raw_output.as_deref() {
        None => (base, compose_file_name(output, default_base_name)),
        Some(raw) if ends_in_separator(raw) => {
            let dir = PathBuf::from(ensure_trailing_separator(raw));
            create_dir_all(&dir)?;
            (dir, compose_file_name(output, default_base_name))
        }
        Some(raw) => {
            let raw_path = Path::new(raw);
            let stem = raw_path
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_else(|| default_base_name.to_string());
            let dir = match raw_path.parent() {
                Some(parent) if !parent.as_os_str().is_empty() => {
                    create_dir_all(parent)?;
                    parent.to_path_buf()
                }
                _ => base,
            };
            (dir, compose_file_name(output, &stem))
        }
    };

    let file = absolute(&dir.join(file_name))?;
    let base_dir = absolute(&dir)?;
    debug!("Resolved output path: {}", file.display());

    if !output.overwrite && file.exists() {
        return Err(CombineError::OutputConflict(file));
    }

    Ok(ResolvedOutputPath { file, base_dir })
}
