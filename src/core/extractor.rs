use crate::core::annotator::AnnotationInjector;
use crate::core::lexer::{self, LineInfo};
use crate::domain::error::Result;
use crate::domain::models::{Diagnostic, Extraction, FileDiagnostics, SourceUnit};
use crate::infra::file_system::{read_file_contents, relative_name};
use log::{debug, info};
use rayon::prelude::*;
use std::path::{Path, PathBuf};

/// Turns one file's text into imports, scope name, top-level declarations and trailing trivia.
pub trait SourceUnitExtractor: Sync {
    fn extract(&self, path: &Path, text: &str) -> Extraction;
}

/// Line-based extractor for C# sources.
///
/// Imports are the `using` directives of the file prologue. The body is cut
/// into top-level declarations wherever the brace depth returns to zero, each
/// declaration keeping its leading comments and blank lines untouched.
#[derive(Debug, Default, Clone, Copy)]
pub struct CSharpExtractor;

fn is_import_line(line: &LineInfo) -> Option<String> {
    if line.start_depth == 0 && line.is_code_line() {
        lexer::using_directive(line.text)
    } else {
        None
    }
}

impl SourceUnitExtractor for CSharpExtractor {
    fn extract(&self, path: &Path, text: &str) -> Extraction {
        let lexed = lexer::lex(text);
        let lines = &lexed.lines;
        let mut unit = SourceUnit::new(path.to_path_buf());

        unit.scope_name = lines
            .iter()
            .filter(|line| line.is_code_line())
            .find_map(|line| lexer::namespace_declaration(line.text))
            .map(|(name, _)| name);

        let mut current = String::new();
        let mut idx = 0;
        let mut after_import = false;
        while idx < lines.len() {
            let line = &lines[idx];
            if let Some(directive) = is_import_line(line) {
                unit.add_import(directive);
                after_import = true;
                idx += 1;
                continue;
            }
            if line.has_code {
                break;
            }
            if !(after_import && line.text.trim().is_empty()) {
                current.push_str(line.text);
                after_import = false;
            }
            idx += 1;
        }

        let mut pending_code = false;
        for line in &lines[idx..] {
            current.push_str(line.text);
            pending_code |= line.has_code;
            if line.closes_top_level && line.end_depth == 0 && line.ends_in_code {
                unit.body.push(std::mem::take(&mut current));
                pending_code = false;
            }
        }

        if pending_code {
            unit.body.push(current);
        } else {
            unit.trailing_trivia = current;
        }

        debug!(
            "Extracted {}: {} imports, {} declarations, scope {:?}",
            path.display(),
            unit.imports.len(),
            unit.body.len(),
            unit.scope_name
        );

        Extraction {
            unit,
            diagnostics: lexed.diagnostics,
        }
    }
}

#[derive(Debug, Default)]
pub struct ExtractionBatch {
    pub units: Vec<SourceUnit>,
    pub reports: Vec<FileDiagnostics>,
}

/// Reads, extracts and annotates every file in parallel. The result keeps the order of `files`.
pub fn extract_all(
    files: &[PathBuf],
    root: &Path,
    extractor: &dyn SourceUnitExtractor,
    annotator: &dyn AnnotationInjector,
) -> Result<ExtractionBatch> {
    info!("Parsing {} files", files.len());

    let results: Vec<(SourceUnit, FileDiagnostics)> = files
        .par_iter()
        .map(|path| -> Result<(SourceUnit, FileDiagnostics)> {
            let source = read_file_contents(path)?;
            let mut extraction = extractor.extract(path, &source.text);
            if source.lossy {
                extraction.diagnostics.push(Diagnostic::warning(
                    1,
                    "file is not valid UTF-8; invalid bytes were replaced",
                ));
            }

            let label = relative_name(path, root);
            let unit = annotator.annotate(extraction.unit, &label);
            Ok((
                unit,
                FileDiagnostics {
                    path: path.clone(),
                    diagnostics: extraction.diagnostics,
                },
            ))
        })
        .collect::<Result<Vec<_>>>()?;

    let mut batch = ExtractionBatch::default();
    for (unit, report) in results {
        batch.units.push(unit);
        if !report.diagnostics.is_empty() {
            batch.reports.push(report);
        }
    }

    Ok(batch)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::annotator::ScopeAnnotator;
    use crate::domain::error::Severity;
    use std::fs;
    use tempfile::TempDir;

    fn extract(text: &str) -> Extraction {
        CSharpExtractor.extract(Path::new("Sample.cs"), text)
    }

    #[test]
    fn test_extract_block_namespace() {
        let source = "using System;\nusing System.IO;\n\nnamespace Example.Utils\n{\n    public class A { }\n}\n";
        let extraction = extract(source);
        let unit = extraction.unit;

        assert!(extraction.diagnostics.is_empty());
        assert_eq!(unit.imports, vec!["using System;", "using System.IO;"]);
        assert_eq!(unit.scope_name.as_deref(), Some("Example.Utils"));
        assert_eq!(unit.body.len(), 1);
        assert!(unit.body[0].starts_with("namespace Example.Utils\n"));
        assert_eq!(unit.trailing_trivia, "");
    }

    #[test]
    fn test_extract_top_level_statements() {
        let source = "// Using usings in top level statements\n\nusing System.Net.Http;\n\nusing var client = new HttpClient();\nusing var request = new HttpRequestMessage();\n\nawait client.SendAsync(request);\n";
        let unit = extract(source).unit;

        assert_eq!(unit.imports, vec!["using System.Net.Http;"]);
        assert_eq!(unit.scope_name, None);
        assert_eq!(unit.body.len(), 3);
        assert_eq!(
            unit.body[0],
            "// Using usings in top level statements\n\nusing var client = new HttpClient();\n"
        );
        assert_eq!(unit.body[2], "\nawait client.SendAsync(request);\n");
    }

    #[test]
    fn test_extract_file_scoped_namespace() {
        let source = "using System;\n\nnamespace Example.FileScoped;\n\npublic class A\n{\n}\n\npublic record R(int X);\n";
        let unit = extract(source).unit;

        assert_eq!(unit.scope_name.as_deref(), Some("Example.FileScoped"));
        assert_eq!(unit.body.len(), 3);
        assert_eq!(unit.body[0], "namespace Example.FileScoped;\n");
        assert_eq!(unit.body[2], "\npublic record R(int X);\n");
    }

    #[test]
    fn test_extract_keeps_preprocessor_at_end_of_file() {
        let source = "using System.Reflection;\n\n#if DEBUG\nRun(args, new DebugConfig());\n#else\n            Run(args);\n#endif\n";
        let unit = extract(source).unit;

        assert_eq!(unit.body.len(), 2);
        assert_eq!(unit.trailing_trivia, "#endif\n");
        assert!(unit.body_text().ends_with("#endif\n"));
    }

    #[test]
    fn test_extract_reports_unbalanced_braces() {
        let extraction = extract("namespace Broken\n{\n    class A {\n}\n");

        assert_eq!(extraction.diagnostics.len(), 1);
        assert_eq!(extraction.diagnostics[0].severity, Severity::Error);
        assert_eq!(extraction.unit.body.len(), 1);
    }

    #[test]
    fn test_extract_all_preserves_order_and_labels() {
        let temp_dir = TempDir::new().unwrap();
        fs::create_dir_all(temp_dir.path().join("sub")).unwrap();
        let first = temp_dir.path().join("sub/B.cs");
        let second = temp_dir.path().join("A.cs");
        fs::write(&first, "namespace X.Y\n{\n}\n").unwrap();
        fs::write(&second, "Console.WriteLine();\n").unwrap();

        let batch = extract_all(
            &[first.clone(), second.clone()],
            temp_dir.path(),
            &CSharpExtractor,
            &ScopeAnnotator,
        )
        .unwrap();

        assert_eq!(batch.units.len(), 2);
        assert_eq!(batch.units[0].origin_path, first);
        assert!(batch.units[0].body[0].starts_with("// sub/B.cs\nnamespace X.Y"));
        assert!(batch.units[1].body[0].starts_with("// A.cs\n"));
        assert!(batch.reports.is_empty());
    }
}
