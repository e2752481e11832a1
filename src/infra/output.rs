use crate::domain::error::{CombineError, Result, Severity};
use crate::domain::models::FileDiagnostics;
use crossterm::{
    ExecutableCommand,
    style::{Color, ResetColor, SetForegroundColor},
};
use log::{debug, info};
use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

/// Opens the output target exclusively when `overwrite` is off, so an existing file is never truncated.
pub fn open_output(path: &Path, overwrite: bool) -> Result<File> {
    let mut options = OpenOptions::new();
    options.write(true);
    if overwrite {
        options.create(true).truncate(true);
    } else {
        options.create_new(true);
    }

    options.open(path).map_err(|e| CombineError::from_io(path, e))
}

pub trait OutputWriter {
    fn write(&self, content: &str) -> Result<()>;
}

pub struct FileWriter {
    path: PathBuf,
    overwrite: bool,
}

impl FileWriter {
    pub fn new(path: PathBuf, overwrite: bool) -> Self {
        Self { path, overwrite }
    }
}

impl OutputWriter for FileWriter {
    fn write(&self, content: &str) -> Result<()> {
        debug!("Writing output to file: {}", self.path.display());
        let mut file = open_output(&self.path, self.overwrite)?;
        file.write_all(content.as_bytes())
            .and_then(|_| file.flush())
            .map_err(|e| CombineError::from_io(&self.path, e))?;
        info!("Output written to file: {}", self.path.display());
        Ok(())
    }
}

fn color_for(severity: Severity) -> Color {
    match severity {
        Severity::Error => Color::Red,
        Severity::Warning => Color::Yellow,
    }
}

fn write_colored(out: &mut impl Write, color: Color, text: &str) -> io::Result<()> {
    out.execute(SetForegroundColor(color))?;
    writeln!(out, "{}", text)?;
    out.execute(ResetColor)?;
    Ok(())
}

pub fn print_success(output_path: &Path) {
    let mut stdout = io::stdout();
    let _ = write_colored(
        &mut stdout,
        Color::Green,
        &format!("Output file: {}", output_path.display()),
    );
}

pub fn print_failure(error: &anyhow::Error) {
    let mut stderr = io::stderr();

    match error.downcast_ref::<CombineError>() {
        Some(combine_error) => {
            let _ = write_colored(
                &mut stderr,
                color_for(combine_error.severity()),
                &combine_error.to_string(),
            );
            if let Some(hint) = combine_error.hint() {
                let _ = write_colored(&mut stderr, Color::Yellow, &hint);
            }
        }
        None => {
            let _ = write_colored(&mut stderr, Color::Red, &format!("{:#}", error));
        }
    }
}

pub fn format_diagnostics(report: &FileDiagnostics, severity: Severity) -> Option<String> {
    let lines: Vec<String> = report
        .diagnostics
        .iter()
        .filter(|d| d.severity == severity)
        .map(|d| format!("{}{}", report.path.display(), d))
        .collect();

    if lines.is_empty() {
        return None;
    }

    let heading = match severity {
        Severity::Error => "Errors",
        Severity::Warning => "Warnings",
    };

    Some(format!(
        "{} detected in {}:\n{}",
        heading,
        report.path.display(),
        lines.join("\n")
    ))
}

pub fn print_diagnostics(reports: &[FileDiagnostics]) {
    let mut stderr = io::stderr();

    for report in reports {
        for severity in [Severity::Error, Severity::Warning] {
            if let Some(block) = format_diagnostics(report, severity) {
                let _ = write_colored(&mut stderr, color_for(severity), &block);
            }
        }
    }
}
