use crate::core::lexer::{self, LineInfo};
use crate::domain::models::{AnnotationMode, SourceUnit};

/// Adds provenance comments to a unit's declarations.
pub trait AnnotationInjector: Sync {
    fn annotate(&self, unit: SourceUnit, label: &str) -> SourceUnit;
}

/// Comments every namespace block, nested ones included. File-scoped
/// namespaces are rewritten to the braced form first, since the merged file
/// may hold several of them.
#[derive(Debug, Default, Clone, Copy)]
pub struct ScopeAnnotator;

/// Comments every outermost type declaration. File-scoped namespaces are
/// braced here as well.
#[derive(Debug, Default, Clone, Copy)]
pub struct TypeAnnotator;

pub fn annotator_for(mode: AnnotationMode) -> Box<dyn AnnotationInjector> {
    match mode {
        AnnotationMode::Scopes => Box::new(ScopeAnnotator),
        AnnotationMode::Types => Box::new(TypeAnnotator),
    }
}

fn is_namespace_line(line: &LineInfo) -> bool {
    line.is_code_line() && lexer::namespace_declaration(line.text).is_some()
}

fn is_outer_type_line(line: &LineInfo) -> bool {
    line.is_code_line() && line.type_depth == 0 && lexer::is_type_declaration(line.text)
}

fn is_attached_prefix(text: &str) -> bool {
    let trimmed = text.trim();
    trimmed.starts_with("///") || (trimmed.starts_with('[') && trimmed.ends_with(']'))
}

/// Inserts `// label` before every line accepted by `matches`, above any
/// doc comments and attributes glued to that line.
fn annotate_matching(
    chunk: &str,
    label: &str,
    matches: impl Fn(&LineInfo) -> bool,
) -> (String, bool) {
    let lexed = lexer::lex(chunk);
    let mut out: Vec<String> = Vec::with_capacity(lexed.lines.len());
    let mut found = false;

    for line in &lexed.lines {
        if matches(line) {
            let mut at = out.len();
            while at > 0 && is_attached_prefix(&out[at - 1]) {
                at -= 1;
            }
            out.insert(
                at,
                format!("{}// {}{}", line.indent(), label, line.line_ending()),
            );
            found = true;
        }
        out.push(line.text.to_string());
    }

    (out.concat(), found)
}

/// Rewrites `namespace X;` into `namespace X { ... }`, wrapping everything after it.
fn brace_file_scoped(chunk: &str, rest: &str) -> String {
    let lexed = lexer::lex(chunk);
    let mut converted = String::new();
    let mut eol = "\n";

    for line in &lexed.lines {
        match lexer::namespace_declaration(line.text) {
            Some((name, true)) if line.is_code_line() && line.start_depth == 0 => {
                eol = line.line_ending();
                converted.push_str(&format!("{}namespace {}{}{{{}", line.indent(), name, eol, eol));
            }
            _ => converted.push_str(line.text),
        }
    }

    let mut body_lines = rest.split_inclusive('\n').peekable();
    if body_lines
        .peek()
        .is_some_and(|first| first.trim().is_empty())
    {
        body_lines.next();
    }
    for line in body_lines {
        converted.push_str(line);
    }

    if !converted.ends_with('\n') {
        converted.push_str(eol);
    }
    converted.push('}');
    converted.push_str(eol);
    converted
}

fn file_scoped_namespace(chunk: &str) -> bool {
    lexer::lex(chunk).lines.iter().any(|line| {
        line.is_code_line()
            && line.start_depth == 0
            && matches!(lexer::namespace_declaration(line.text), Some((_, true)))
    })
}

fn annotate_leading(body: &mut [String], label: &str) {
    if let Some(first) = body.first_mut() {
        let eol = if first.contains("\r\n") { "\r\n" } else { "\n" };
        first.insert_str(0, &format!("// {}{}", label, eol));
    }
}

/// Folds a file-scoped namespace and every declaration after it into one braced declaration.
fn normalize_file_scoped(body: Vec<String>) -> Vec<String> {
    let mut normalized = Vec::with_capacity(body.len());
    let mut chunks = body.into_iter();

    while let Some(chunk) = chunks.next() {
        if file_scoped_namespace(&chunk) {
            let rest: String = chunks.by_ref().collect::<Vec<_>>().concat();
            normalized.push(brace_file_scoped(&chunk, &rest));
        } else {
            normalized.push(chunk);
        }
    }

    normalized
}

fn annotate_body(
    mut unit: SourceUnit,
    label: &str,
    matches: impl Fn(&LineInfo) -> bool + Copy,
) -> SourceUnit {
    let mut found = false;
    let mut body: Vec<String> = normalize_file_scoped(std::mem::take(&mut unit.body))
        .iter()
        .map(|chunk| {
            let (text, hit) = annotate_matching(chunk, label, matches);
            found |= hit;
            text
        })
        .collect();

    if !found {
        annotate_leading(&mut body, label);
    }

    unit.body = body;
    unit
}

impl AnnotationInjector for ScopeAnnotator {
    fn annotate(&self, unit: SourceUnit, label: &str) -> SourceUnit {
        annotate_body(unit, label, is_namespace_line)
    }
}

impl AnnotationInjector for TypeAnnotator {
    fn annotate(&self, unit: SourceUnit, label: &str) -> SourceUnit {
        annotate_body(unit, label, is_outer_type_line)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::extractor::{CSharpExtractor, SourceUnitExtractor};
    use std::path::Path;

    fn unit_from(source: &str) -> SourceUnit {
        CSharpExtractor.extract(Path::new("x.cs"), source).unit
    }

    #[test]
    fn test_scope_annotation_block_namespace() {
        let unit = unit_from("using System;\n\nnamespace A.B\n{\n    class C { }\n}\n");
        let annotated = ScopeAnnotator.annotate(unit, "Utils/C.cs");

        assert_eq!(
            annotated.body[0],
            "// Utils/C.cs\nnamespace A.B\n{\n    class C { }\n}\n"
        );
    }

    #[test]
    fn test_scope_annotation_nested_namespaces() {
        let unit = unit_from("namespace Outer\n{\n    namespace Inner\n    {\n    }\n}\n");
        let annotated = ScopeAnnotator.annotate(unit, "n.cs");

        let text = annotated.body_text();
        assert_eq!(text.matches("// n.cs").count(), 2);
        assert!(text.contains("    // n.cs\n    namespace Inner"));
    }

    #[test]
    fn test_scope_annotation_converts_file_scoped_namespace() {
        let unit = unit_from(
            "using System;\n\nnamespace Example.FileScoped;\n\npublic class A\n{\n}\n\npublic record R(int X);\n",
        );
        let annotated = ScopeAnnotator.annotate(unit, "A.cs");

        assert_eq!(annotated.body.len(), 1);
        assert_eq!(
            annotated.body[0],
            "// A.cs\nnamespace Example.FileScoped\n{\npublic class A\n{\n}\n\npublic record R(int X);\n}\n"
        );
        assert_eq!(annotated.scope_name.as_deref(), Some("Example.FileScoped"));
    }

    #[test]
    fn test_scope_annotation_without_namespace_annotates_once() {
        let unit = unit_from("Console.WriteLine(1);\nConsole.WriteLine(2);\n");
        let annotated = ScopeAnnotator.annotate(unit, "Program.cs");

        assert_eq!(annotated.body_text().matches("// Program.cs").count(), 1);
        assert!(annotated.body[0].starts_with("// Program.cs\n"));
    }

    #[test]
    fn test_type_annotation_outermost_only() {
        let source = "namespace N\n{\n    /// <summary>Doc</summary>\n    [Serializable]\n    public class Outer\n    {\n        class Inner { }\n    }\n\n    public enum Kind { A }\n}\n";
        let annotated = TypeAnnotator.annotate(unit_from(source), "t.cs");
        let text = annotated.body_text();

        assert_eq!(text.matches("// t.cs").count(), 2);
        assert!(text.contains("    // t.cs\n    /// <summary>Doc</summary>\n    [Serializable]\n    public class Outer"));
        assert!(text.contains("    // t.cs\n    public enum Kind"));
        assert!(!text.contains("// t.cs\n        class Inner"));
    }

    #[test]
    fn test_annotation_ignores_namespace_in_comments_and_strings() {
        let source = "/*\nnamespace Fake\n*/\nvar s = @\"\nnamespace AlsoFake\n\";\n";
        let annotated = ScopeAnnotator.annotate(unit_from(source), "s.cs");

        assert_eq!(annotated.body_text().matches("// s.cs").count(), 1);
        assert!(annotated.body[0].starts_with("// s.cs\n/*"));
    }

    #[test]
    fn test_type_annotation_braces_file_scoped_namespace() {
        let unit = unit_from("namespace F;\n\npublic class A { }\n");
        let annotated = TypeAnnotator.annotate(unit, "f.cs");

        assert_eq!(
            annotated.body_text(),
            "namespace F\n{\n// f.cs\npublic class A { }\n}\n"
        );
    }

    #[test]
    fn test_annotator_for_mode() {
        let unit = unit_from("namespace N\n{\n    class A { }\n}\n");
        let by_scope = annotator_for(AnnotationMode::Scopes).annotate(unit.clone(), "m.cs");
        let by_type = annotator_for(AnnotationMode::Types).annotate(unit, "m.cs");

        assert!(by_scope.body[0].starts_with("// m.cs\nnamespace N"));
        assert!(by_type.body[0].contains("    // m.cs\n    class A"));
    }
}
