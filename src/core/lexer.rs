//! Line-oriented scanner for C# sources.
//!
//! It tracks brace depth while stepping over comments, string and char
//! literals and preprocessor lines. Extraction and annotation only need to
//! know where top-level declarations end and which lines open a namespace or
//! a type, so nothing here builds a syntax tree.

use crate::domain::models::Diagnostic;
use regex::Regex;
use std::sync::OnceLock;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockKind {
    Namespace,
    Type,
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StrKind {
    Regular,
    Verbatim,
    Raw(usize),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Code,
    BlockComment,
    Str { kind: StrKind, interpolated: bool },
    /// Code inside an interpolation hole; `braces` counts nested `{` within the hole.
    Hole { braces: usize },
}

#[derive(Debug, Clone)]
pub struct LineInfo<'a> {
    /// Full line including its terminator.
    pub text: &'a str,
    /// 1-based.
    pub number: usize,
    pub start_depth: usize,
    pub end_depth: usize,
    /// Type blocks enclosing the start of the line.
    pub type_depth: usize,
    pub starts_in_code: bool,
    pub ends_in_code: bool,
    pub is_directive: bool,
    pub has_code: bool,
    /// A `;` or `}` brought the depth back to zero somewhere on this line.
    pub closes_top_level: bool,
}

impl LineInfo<'_> {
    /// True when the line begins in plain code and is not a preprocessor directive.
    pub fn is_code_line(&self) -> bool {
        self.starts_in_code && !self.is_directive
    }

    pub fn indent(&self) -> &str {
        let trimmed = self.text.trim_start_matches([' ', '\t']);
        &self.text[..self.text.len() - trimmed.len()]
    }

    pub fn line_ending(&self) -> &'static str {
        if self.text.ends_with("\r\n") { "\r\n" } else { "\n" }
    }
}

#[derive(Debug)]
pub struct Lexed<'a> {
    pub lines: Vec<LineInfo<'a>>,
    pub diagnostics: Vec<Diagnostic>,
}

fn namespace_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| {
        Regex::new(r"^\s*namespace\s+(@?[A-Za-z_][\w.@]*)\s*(;)?").expect("valid namespace pattern")
    })
}

fn type_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| {
        Regex::new(
            r"^\s*(?:\[[^\]]*\]\s*)*(?:(?:public|private|protected|internal|static|sealed|abstract|partial|readonly|unsafe|new|file|ref)\s+)*(?:class|struct|interface|enum|record(?:\s+(?:class|struct))?)\s+@?[A-Za-z_]",
        )
        .expect("valid type declaration pattern")
    })
}

fn using_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| {
        Regex::new(
            r"^\s*((?:global\s+)?using\s+(?:static\s+)?(?:@?[A-Za-z_][\w@]*\s*=\s*)?@?[A-Za-z_][\w@.:<>,\s]*;)\s*(?://.*)?$",
        )
        .expect("valid using directive pattern")
    })
}

/// Name of the namespace declared on `line`, and whether it is the file-scoped (`namespace X;`) form.
pub fn namespace_declaration(line: &str) -> Option<(String, bool)> {
    namespace_regex()
        .captures(line)
        .map(|caps| (caps[1].to_string(), caps.get(2).is_some()))
}

pub fn is_type_declaration(line: &str) -> bool {
    type_regex().is_match(line)
}

/// The directive text of a `using` import line, without trailing comment or whitespace.
pub fn using_directive(line: &str) -> Option<String> {
    using_regex()
        .captures(line.trim_end())
        .map(|caps| caps[1].trim().to_string())
}

fn classify(header: &str) -> BlockKind {
    if namespace_regex().is_match(header) {
        BlockKind::Namespace
    } else if type_regex().is_match(header) {
        BlockKind::Type
    } else {
        BlockKind::Other
    }
}

struct Scanner {
    modes: Vec<Mode>,
    blocks: Vec<BlockKind>,
    header: String,
    open_ifs: Vec<usize>,
    diagnostics: Vec<Diagnostic>,
}

impl Scanner {
    fn new() -> Self {
        Self {
            modes: vec![Mode::Code],
            blocks: Vec::new(),
            header: String::new(),
            open_ifs: Vec::new(),
            diagnostics: Vec::new(),
        }
    }

    fn mode(&self) -> Mode {
        self.modes.last().copied().unwrap_or(Mode::Code)
    }

    fn pop_mode(&mut self) {
        if self.modes.len() > 1 {
            self.modes.pop();
        }
    }

    fn directive(&mut self, content: &str, number: usize) {
        let keyword = content
            .trim_start()
            .trim_start_matches('#')
            .trim_start()
            .split(|c: char| !c.is_ascii_alphabetic())
            .next()
            .unwrap_or("");

        match keyword {
            "if" => self.open_ifs.push(number),
            "endif" => {
                if self.open_ifs.pop().is_none() {
                    self.diagnostics
                        .push(Diagnostic::warning(number, "'#endif' without matching '#if'"));
                }
            }
            _ => {}
        }
    }

    fn scan_line<'a>(&mut self, text: &'a str, number: usize) -> LineInfo<'a> {
        let start_depth = self.blocks.len();
        let type_depth = self
            .blocks
            .iter()
            .filter(|kind| **kind == BlockKind::Type)
            .count();
        let starts_in_code = self.mode() == Mode::Code;
        let content = text.trim_end_matches(['\r', '\n']);

        let mut info = LineInfo {
            text,
            number,
            start_depth,
            end_depth: start_depth,
            type_depth,
            starts_in_code,
            ends_in_code: starts_in_code,
            is_directive: false,
            has_code: false,
            closes_top_level: false,
        };

        if starts_in_code && content.trim_start().starts_with('#') {
            self.directive(content, number);
            info.is_directive = true;
            return info;
        }

        let chars: Vec<char> = content.chars().collect();
        let mut i = 0;
        while i < chars.len() {
            let c = chars[i];
            let next = chars.get(i + 1).copied();

            match self.mode() {
                Mode::Code | Mode::Hole { .. } => {
                    let in_hole = matches!(self.mode(), Mode::Hole { .. });
                    if c == '/' && next == Some('/') {
                        break;
                    }
                    if c == '/' && next == Some('*') {
                        self.modes.push(Mode::BlockComment);
                        i += 2;
                        continue;
                    }
                    if c.is_whitespace() {
                        if !in_hole {
                            self.header.push(' ');
                        }
                        i += 1;
                        continue;
                    }

                    info.has_code = true;
                    match c {
                        '$' | '@' | '"' => {
                            let mut j = i;
                            let mut dollars = 0;
                            let mut verbatim = false;
                            while j < chars.len() && (chars[j] == '$' || chars[j] == '@') {
                                if chars[j] == '$' {
                                    dollars += 1;
                                } else {
                                    verbatim = true;
                                }
                                j += 1;
                            }
                            if chars.get(j) != Some(&'"') {
                                if !in_hole {
                                    self.header.push(c);
                                }
                                i += 1;
                                continue;
                            }
                            let quotes = chars[j..].iter().take_while(|ch| **ch == '"').count();
                            let kind = if quotes >= 3 {
                                StrKind::Raw(quotes)
                            } else if verbatim {
                                StrKind::Verbatim
                            } else {
                                StrKind::Regular
                            };
                            let consumed = match kind {
                                StrKind::Raw(q) => q,
                                _ => 1,
                            };
                            if kind == StrKind::Regular && quotes == 2 {
                                // empty literal
                                i = j + 2;
                                continue;
                            }
                            self.modes.push(Mode::Str {
                                kind,
                                interpolated: dollars > 0,
                            });
                            i = j + consumed;
                        }
                        '\'' => {
                            let mut j = i + 1;
                            if chars.get(j) == Some(&'\\') {
                                j += 2;
                            } else {
                                j += 1;
                            }
                            while j < chars.len() && chars[j] != '\'' && j - i < 12 {
                                j += 1;
                            }
                            i = j + 1;
                        }
                        '{' => {
                            if let Mode::Hole { braces } = self.mode() {
                                self.modes.pop();
                                self.modes.push(Mode::Hole { braces: braces + 1 });
                            } else {
                                let kind = classify(&self.header);
                                self.blocks.push(kind);
                                self.header.clear();
                            }
                            i += 1;
                        }
                        '}' => {
                            if let Mode::Hole { braces } = self.mode() {
                                self.modes.pop();
                                if braces > 0 {
                                    self.modes.push(Mode::Hole { braces: braces - 1 });
                                }
                            } else {
                                if self.blocks.pop().is_none() {
                                    self.diagnostics
                                        .push(Diagnostic::error(number, "unexpected '}'"));
                                }
                                self.header.clear();
                                if self.blocks.is_empty() {
                                    info.closes_top_level = true;
                                }
                            }
                            i += 1;
                        }
                        ';' => {
                            if !in_hole {
                                self.header.clear();
                                if self.blocks.is_empty() {
                                    info.closes_top_level = true;
                                }
                            }
                            i += 1;
                        }
                        _ => {
                            if !in_hole {
                                self.header.push(c);
                            }
                            i += 1;
                        }
                    }
                }
                Mode::BlockComment => {
                    if c == '*' && next == Some('/') {
                        self.pop_mode();
                        i += 2;
                    } else {
                        i += 1;
                    }
                }
                Mode::Str { kind, interpolated } => {
                    info.has_code = true;
                    match kind {
                        StrKind::Raw(quotes) => {
                            if c == '"' {
                                let run = chars[i..].iter().take_while(|ch| **ch == '"').count();
                                if run >= quotes {
                                    self.pop_mode();
                                }
                                i += run;
                            } else {
                                i += 1;
                            }
                        }
                        StrKind::Regular | StrKind::Verbatim => {
                            if kind == StrKind::Regular && c == '\\' {
                                i += 2;
                            } else if c == '"' {
                                if kind == StrKind::Verbatim && next == Some('"') {
                                    i += 2;
                                } else {
                                    self.pop_mode();
                                    i += 1;
                                }
                            } else if interpolated && c == '{' {
                                if next == Some('{') {
                                    i += 2;
                                } else {
                                    self.modes.push(Mode::Hole { braces: 0 });
                                    i += 1;
                                }
                            } else if interpolated && c == '}' && next == Some('}') {
                                i += 2;
                            } else {
                                i += 1;
                            }
                        }
                    }
                }
            }
        }

        if let Mode::Str {
            kind: StrKind::Regular,
            ..
        } = self.mode()
        {
            self.diagnostics
                .push(Diagnostic::error(number, "newline in constant"));
            self.pop_mode();
        }

        self.header.push(' ');
        info.end_depth = self.blocks.len();
        info.ends_in_code = self.mode() == Mode::Code;
        info
    }

    fn finish(&mut self, last_line: usize) {
        match self.mode() {
            Mode::BlockComment => self
                .diagnostics
                .push(Diagnostic::error(last_line, "unterminated block comment")),
            Mode::Str { .. } | Mode::Hole { .. } => self
                .diagnostics
                .push(Diagnostic::error(last_line, "unterminated string literal")),
            Mode::Code => {}
        }

        if !self.blocks.is_empty() {
            self.diagnostics.push(Diagnostic::error(
                last_line,
                format!("expected '}}' ({} block(s) left open)", self.blocks.len()),
            ));
        }

        for line in std::mem::take(&mut self.open_ifs) {
            self.diagnostics
                .push(Diagnostic::warning(line, "'#if' without matching '#endif'"));
        }
    }
}

pub fn lex(text: &str) -> Lexed<'_> {
    let mut scanner = Scanner::new();
    let mut lines = Vec::new();

    for (idx, line) in text.split_inclusive('\n').enumerate() {
        lines.push(scanner.scan_line(line, idx + 1));
    }

    scanner.finish(lines.len().max(1));

    Lexed {
        lines,
        diagnostics: scanner.diagnostics,
    }
}
