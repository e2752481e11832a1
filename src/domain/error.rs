use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// How loudly a problem should be presented to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Warning,
    Error,
}

#[derive(Error, Debug)]
pub enum CombineError {
    #[error("Could not find path '{}'", .0.display())]
    InputNotFound(PathBuf),

    #[error(
        "The file {} already exists\nDid you mean to set --overwrite?\nYou can also leave --output empty to always have a new one generated (and maybe use --prefix or --suffix to identify it).",
        .0.display()
    )]
    OutputConflict(PathBuf),

    #[error("{} parent dir not found, try providing an absolute or relative path", .0.display())]
    InvalidInput(PathBuf),

    #[error("Access to the path '{}' is denied: {source}", path.display())]
    UnauthorizedAccess { path: PathBuf, source: io::Error },

    #[error("Failed to write archive entry '{entry}': {message}")]
    ArchiveWrite { entry: String, message: String },

    #[error("Extraction reported errors in {count} file(s); rerun without --strict to merge anyway")]
    ExtractionFailed { count: usize },

    #[error("I/O error at '{}': {source}", path.display())]
    Io { path: PathBuf, source: io::Error },
}

impl CombineError {
    /// Classifies a raw I/O failure that happened while touching `path`.
    pub fn from_io(path: &Path, source: io::Error) -> Self {
        match source.kind() {
            io::ErrorKind::PermissionDenied => CombineError::UnauthorizedAccess {
                path: path.to_path_buf(),
                source,
            },
            io::ErrorKind::AlreadyExists => CombineError::OutputConflict(path.to_path_buf()),
            _ => CombineError::Io {
                path: path.to_path_buf(),
                source,
            },
        }
    }

    pub fn severity(&self) -> Severity {
        Severity::Error
    }

    pub fn hint(&self) -> Option<String> {
        match self {
            CombineError::UnauthorizedAccess { path, .. } => Some(permission_hint(path)),
            _ => None,
        }
    }
}

fn permission_hint(path: &Path) -> String {
    if cfg!(windows) {
        format!(
            "If you intended to use '{}' as output file, try running `source-combine` from an elevated prompt (using \"Run as Administrator\").",
            path.display()
        )
    } else {
        format!(
            "If you intended to use '{}' as output file, try running `source-combine` as superuser (i.e. using 'sudo').",
            path.display()
        )
    }
}

pub type Result<T> = std::result::Result<T, CombineError>;
