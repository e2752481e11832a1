use crate::domain::error::{CombineError, Result};
use crate::domain::models::ArchiveEntry;
use crate::infra::file_system::relative_name;
use crate::infra::output::open_output;
use log::{debug, info};
use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};
use zip::CompressionMethod;
use zip::write::{SimpleFileOptions, ZipWriter};

/// Pairs each selected file with its entry name relative to `root`, keeping selection order.
pub fn plan_entries(files: &[PathBuf], root: &Path) -> Vec<ArchiveEntry> {
    files
        .iter()
        .map(|path| ArchiveEntry {
            source_path: path.clone(),
            entry_name: relative_name(path, root),
        })
        .collect()
}

fn entry_error(entry: &str, message: impl ToString) -> CombineError {
    CombineError::ArchiveWrite {
        entry: entry.to_string(),
        message: message.to_string(),
    }
}

/// Streams `files` into a new zip at `output`.
///
/// Any failure aborts the whole archive. Whatever was written before the
/// failure stays on disk.
pub fn build(files: &[PathBuf], root: &Path, output: &Path, overwrite: bool) -> Result<usize> {
    let entries = plan_entries(files, root);
    let target = open_output(output, overwrite)?;
    let mut zip = ZipWriter::new(target);

    for entry in &entries {
        debug!(
            "Adding {} as {}",
            entry.source_path.display(),
            entry.entry_name
        );

        let options =
            SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
        let mut source =
            File::open(&entry.source_path).map_err(|e| entry_error(&entry.entry_name, e))?;
        zip.start_file(entry.entry_name.as_str(), options)
            .map_err(|e| entry_error(&entry.entry_name, e))?;
        io::copy(&mut source, &mut zip).map_err(|e| entry_error(&entry.entry_name, e))?;
    }

    zip.finish()
        .map_err(|e| entry_error("<central directory>", e))?;

    info!("Archived {} files into {}", entries.len(), output.display());
    Ok(entries.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::io::Read;
    use tempfile::TempDir;
    use zip::ZipArchive;

    #[test]
    fn test_plan_entries_strips_root() {
        let root = Path::new("/work/project");
        let files = vec![
            PathBuf::from("/work/project/a.cs"),
            PathBuf::from("/work/project/src/nested/b.csproj"),
        ];

        let names: Vec<String> = plan_entries(&files, root)
            .into_iter()
            .map(|e| e.entry_name)
            .collect();

        assert_eq!(names, vec!["a.cs", "src/nested/b.csproj"]);
    }

    #[test]
    fn test_build_round_trip() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path().join("input");
        fs::create_dir_all(root.join("sub")).unwrap();
        fs::write(root.join("a.cs"), "class A { }\n").unwrap();
        fs::write(root.join("sub/b.cs"), [0u8, 159, 146, 150]).unwrap();
        let files = vec![root.join("a.cs"), root.join("sub/b.cs")];
        let output = temp_dir.path().join("out.zip");

        let count = build(&files, &root, &output, false).unwrap();
        assert_eq!(count, 2);

        let mut archive = ZipArchive::new(File::open(&output).unwrap()).unwrap();
        assert_eq!(archive.len(), 2);
        for (name, original) in [("a.cs", root.join("a.cs")), ("sub/b.cs", root.join("sub/b.cs"))] {
            let mut entry = archive.by_name(name).unwrap();
            let mut bytes = Vec::new();
            entry.read_to_end(&mut bytes).unwrap();
            assert_eq!(bytes, fs::read(original).unwrap());
        }
    }

    #[test]
    fn test_build_does_not_truncate_existing_archive() {
        let temp_dir = TempDir::new().unwrap();
        let output = temp_dir.path().join("out.zip");
        fs::write(&output, "not a zip").unwrap();

        let err = build(&[], temp_dir.path(), &output, false).unwrap_err();

        assert!(matches!(err, CombineError::OutputConflict(_)));
        assert_eq!(fs::read_to_string(&output).unwrap(), "not a zip");
    }

    #[test]
    fn test_build_aborts_on_unreadable_entry() {
        let temp_dir = TempDir::new().unwrap();
        let output = temp_dir.path().join("out.zip");
        let missing = temp_dir.path().join("gone.cs");

        let err = build(&[missing], temp_dir.path(), &output, false).unwrap_err();

        match err {
            CombineError::ArchiveWrite { entry, .. } => assert_eq!(entry, "gone.cs"),
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(output.exists());
    }
}
