use crate::domain::error::{CombineError, Result, Severity};
use std::path::{Path, PathBuf};

/// A user-supplied exclusion, already normalized for case-insensitive matching.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExclusionRule {
    /// Bare file name, lowercased.
    FileName(String),
    /// Directory fragment, lowercased, `/`-separated and bounded by separators (`/obj/`).
    DirectoryFragment(String),
}

impl ExclusionRule {
    pub fn parse(item: &str) -> Option<Self> {
        let item = item.trim();
        if item.is_empty() {
            return None;
        }

        if item.ends_with(std::path::is_separator) {
            let fragment = item
                .trim_end_matches(std::path::is_separator)
                .replace('\\', "/")
                .to_lowercase();
            if fragment.is_empty() {
                return None;
            }
            let fragment = fragment.trim_start_matches('/');
            Some(ExclusionRule::DirectoryFragment(format!("/{}/", fragment)))
        } else {
            Some(ExclusionRule::FileName(item.to_lowercase()))
        }
    }

    pub fn from_items<S: AsRef<str>>(items: &[S]) -> Vec<Self> {
        items
            .iter()
            .filter_map(|item| ExclusionRule::parse(item.as_ref()))
            .collect()
    }
}

/// Reduces `cs`, `.cs`, `*.cs` and `*.CS` to the bare suffix `cs`.
pub fn normalize_extension(ext: &str) -> Option<String> {
    let bare = ext.trim().trim_start_matches('*').trim_start_matches('.');
    if bare.is_empty() {
        None
    } else {
        Some(bare.to_lowercase())
    }
}

#[derive(Debug, Clone)]
pub struct InputSpec {
    pub path: PathBuf,
    pub is_file: bool,
    pub extensions: Vec<String>,
    pub exclusions: Vec<ExclusionRule>,
}

impl InputSpec {
    pub fn new<S: AsRef<str>>(path: &str, extensions: &[S], exclusions: &[S]) -> Result<Self> {
        let path = PathBuf::from(path);
        let is_file = path.is_file();
        if !is_file && !path.is_dir() {
            return Err(CombineError::InputNotFound(path));
        }

        let mut normalized: Vec<String> = Vec::new();
        for ext in extensions.iter().filter_map(|e| normalize_extension(e.as_ref())) {
            if !normalized.contains(&ext) {
                normalized.push(ext);
            }
        }

        Ok(Self {
            path,
            is_file,
            extensions: normalized,
            exclusions: ExclusionRule::from_items(exclusions),
        })
    }

    /// Directory that relative entry names and provenance labels are computed against.
    pub fn root_dir(&self) -> &Path {
        if self.is_file {
            self.path.parent().unwrap_or_else(|| Path::new(""))
        } else {
            &self.path
        }
    }
}

#[derive(Debug, Clone)]
pub struct OutputSpec {
    pub raw_output: Option<String>,
    pub prefix: Option<String>,
    pub suffix: Option<String>,
    pub overwrite: bool,
    pub extension: &'static str,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedOutputPath {
    pub file: PathBuf,
    pub base_dir: PathBuf,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourceUnit {
    pub origin_path: PathBuf,
    pub imports: Vec<String>,
    pub scope_name: Option<String>,
    pub body: Vec<String>,
    pub trailing_trivia: String,
}

impl SourceUnit {
    pub fn new(origin_path: PathBuf) -> Self {
        Self {
            origin_path,
            ..Default::default()
        }
    }

    pub fn add_import(&mut self, import: String) {
        if !self.imports.contains(&import) {
            self.imports.push(import);
        }
    }

    pub fn scope_len(&self) -> usize {
        self.scope_name.as_ref().map_or(0, |name| name.len())
    }

    pub fn body_text(&self) -> String {
        let mut text = self.body.concat();
        text.push_str(&self.trailing_trivia);
        text
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub severity: Severity,
    pub line: usize,
    pub message: String,
}

impl Diagnostic {
    pub fn error(line: usize, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            line,
            message: message.into(),
        }
    }

    pub fn warning(line: usize, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            line,
            message: message.into(),
        }
    }
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let tag = match self.severity {
            Severity::Error => "error",
            Severity::Warning => "warning",
        };
        write!(f, "({}): {}: {}", self.line, tag, self.message)
    }
}

#[derive(Debug, Clone)]
pub struct Extraction {
    pub unit: SourceUnit,
    pub diagnostics: Vec<Diagnostic>,
}

#[derive(Debug, Clone)]
pub struct FileDiagnostics {
    pub path: PathBuf,
    pub diagnostics: Vec<Diagnostic>,
}

impl FileDiagnostics {
    pub fn has_errors(&self) -> bool {
        self.diagnostics
            .iter()
            .any(|d| d.severity == Severity::Error)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DiagnosticPolicy {
    #[default]
    Lenient,
    /// Extraction errors abort the run. Warnings never do.
    Strict,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum AnnotationMode {
    /// One comment before every namespace block
    #[default]
    Scopes,
    /// One comment before every outermost type declaration
    Types,
}

#[derive(Debug)]
pub struct MergedOutput {
    pub header: String,
    pub imports: Vec<String>,
    pub sections: Vec<String>,
}

impl MergedOutput {
    pub fn render(&self) -> String {
        let mut result = String::new();

        result.push_str(&self.header);
        result.push_str("\n\n");

        for import in &self.imports {
            result.push_str(import);
            result.push('\n');
        }
        result.push('\n');

        // Sections are newline-terminated, never padded with blank lines.
        for section in &self.sections {
            result.push_str(section);
            if !section.ends_with('\n') {
                result.push('\n');
            }
        }

        result
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveEntry {
    pub source_path: PathBuf,
    pub entry_name: String,
}

#[derive(Debug, Clone)]
pub struct MergeConfig {
    pub input: String,
    pub output: Option<String>,
    pub overwrite: bool,
    pub exclude: Vec<String>,
    pub prefix: Option<String>,
    pub suffix: Option<String>,
    pub annotate: AnnotationMode,
    pub policy: DiagnosticPolicy,
}

#[derive(Debug, Clone)]
pub struct ArchiveConfig {
    pub input: String,
    pub output: Option<String>,
    pub overwrite: bool,
    pub exclude: Vec<String>,
    pub extensions: Vec<String>,
    pub prefix: Option<String>,
    pub suffix: Option<String>,
}
