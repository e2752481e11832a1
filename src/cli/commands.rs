use crate::core::aggregator::aggregate;
use crate::core::annotator::annotator_for;
use crate::core::archive;
use crate::core::extractor::{CSharpExtractor, extract_all};
use crate::core::file_selector::{select, skip_generated_outputs};
use crate::core::output_path::resolve;
use crate::domain::error::{CombineError, Result};
use crate::domain::models::{
    AnnotationMode, ArchiveConfig, DiagnosticPolicy, InputSpec, MergeConfig, OutputSpec,
};
use crate::infra::logger::setup_logger;
use crate::infra::output::{
    FileWriter, OutputWriter, print_diagnostics, print_failure, print_success,
};
use crate::infra::unique_id::unique_id;
use clap::{Parser, Subcommand};
use log::{debug, info};
use std::path::PathBuf;
use std::process::ExitCode;

pub const MERGE_EXTENSION: &str = ".cs";
pub const ARCHIVE_EXTENSION: &str = ".zip";

#[derive(Parser)]
#[command(name = "source-combine", version)]
#[command(about = "Merge a source tree into a single file, or pack it into a zip archive", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Combines multiple source code files (.cs) into a single one
    Merge {
        /// Input path (file or directory)
        input: String,

        /// Output path (file or dir). A trailing separator means a directory and a generated file name
        #[arg(short, long)]
        output: Option<String>,

        /// Overwrite the output file if it exists
        #[arg(short = 'f', long)]
        overwrite: bool,

        /// Excluded files and directories, separated by semicolons. Directories end in '/'
        #[arg(long, value_delimiter = ';', default_value = "bin/;obj/")]
        exclude: Vec<String>,

        /// Prefix for the output file name
        #[arg(short, long, allow_hyphen_values = true)]
        prefix: Option<String>,

        /// Suffix for the output file name
        #[arg(short, long, allow_hyphen_values = true)]
        suffix: Option<String>,

        /// Which declarations get a provenance comment
        #[arg(long, value_enum, default_value_t = AnnotationMode::Scopes)]
        annotate: AnnotationMode,

        /// Fail when any file reports extraction errors
        #[arg(long)]
        strict: bool,
    },

    /// Zips multiple files, keeping their paths relative to the input
    Archive {
        /// Input path (file or directory)
        input: String,

        /// Output path (file or dir). A trailing separator means a directory and a generated file name
        #[arg(short, long)]
        output: Option<String>,

        /// Overwrite the output file if it exists
        #[arg(short = 'f', long)]
        overwrite: bool,

        /// Excluded files and directories, separated by semicolons. Directories end in '/'
        #[arg(long, value_delimiter = ';', default_value = "bin/;obj/")]
        exclude: Vec<String>,

        /// File extensions to include, separated by semicolons
        #[arg(long, value_delimiter = ';', default_value = ".sln;.csproj;.cs")]
        extensions: Vec<String>,

        /// Prefix for the output file name
        #[arg(short, long, allow_hyphen_values = true)]
        prefix: Option<String>,

        /// Suffix for the output file name
        #[arg(short, long, allow_hyphen_values = true)]
        suffix: Option<String>,
    },
}

impl Commands {
    pub fn into_merge_config(self) -> Option<MergeConfig> {
        match self {
            Commands::Merge {
                input,
                output,
                overwrite,
                exclude,
                prefix,
                suffix,
                annotate,
                strict,
            } => Some(MergeConfig {
                input,
                output,
                overwrite,
                exclude,
                prefix,
                suffix,
                annotate,
                policy: if strict {
                    DiagnosticPolicy::Strict
                } else {
                    DiagnosticPolicy::Lenient
                },
            }),
            Commands::Archive { .. } => None,
        }
    }

    pub fn into_archive_config(self) -> Option<ArchiveConfig> {
        match self {
            Commands::Archive {
                input,
                output,
                overwrite,
                exclude,
                extensions,
                prefix,
                suffix,
            } => Some(ArchiveConfig {
                input,
                output,
                overwrite,
                exclude,
                extensions,
                prefix,
                suffix,
            }),
            Commands::Merge { .. } => None,
        }
    }
}

pub fn run() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let _ = e.print();
            return if e.use_stderr() {
                ExitCode::FAILURE
            } else {
                ExitCode::SUCCESS
            };
        }
    };

    match execute(cli) {
        Ok(output) => {
            print_success(&output);
            ExitCode::SUCCESS
        }
        Err(e) => {
            print_failure(&e);
            ExitCode::FAILURE
        }
    }
}

pub fn execute(cli: Cli) -> anyhow::Result<PathBuf> {
    setup_logger(cli.verbose)?;

    let output = match cli.command {
        command @ Commands::Merge { .. } => {
            info!("Starting merge command");
            let config = command
                .into_merge_config()
                .ok_or_else(|| anyhow::anyhow!("merge arguments expected"))?;
            debug!("Merge configuration: {:?}", config);
            merge_sources(&config)?
        }
        command @ Commands::Archive { .. } => {
            info!("Starting archive command");
            let config = command
                .into_archive_config()
                .ok_or_else(|| anyhow::anyhow!("archive arguments expected"))?;
            debug!("Archive configuration: {:?}", config);
            archive_sources(&config)?
        }
    };

    Ok(output)
}

pub fn merge_sources(config: &MergeConfig) -> Result<PathBuf> {
    let input = InputSpec::new(
        &config.input,
        &[MERGE_EXTENSION.to_string()],
        &config.exclude,
    )?;
    let output = OutputSpec {
        raw_output: config.output.clone(),
        prefix: config.prefix.clone(),
        suffix: config.suffix.clone(),
        overwrite: config.overwrite,
        extension: MERGE_EXTENSION,
    };

    let resolved = resolve(&input, &output)?;

    info!("Scanning for files in {}", input.path.display());
    let mut files = select(&input)?;
    if !input.is_file {
        skip_generated_outputs(&mut files, &resolved.file, MERGE_EXTENSION);
    }

    let annotator = annotator_for(config.annotate);
    let batch = extract_all(&files, input.root_dir(), &CSharpExtractor, annotator.as_ref())?;

    print_diagnostics(&batch.reports);
    let failing = batch.reports.iter().filter(|r| r.has_errors()).count();
    if config.policy == DiagnosticPolicy::Strict && failing > 0 {
        return Err(CombineError::ExtractionFailed { count: failing });
    }

    info!("Building merged output");
    let merged = aggregate(batch.units, &unique_id());

    info!("Writing output");
    FileWriter::new(resolved.file.clone(), config.overwrite).write(&merged.render())?;
    Ok(resolved.file)
}

pub fn archive_sources(config: &ArchiveConfig) -> Result<PathBuf> {
    let input = InputSpec::new(&config.input, &config.extensions, &config.exclude)?;
    let output = OutputSpec {
        raw_output: config.output.clone(),
        prefix: config.prefix.clone(),
        suffix: config.suffix.clone(),
        overwrite: config.overwrite,
        extension: ARCHIVE_EXTENSION,
    };

    let resolved = resolve(&input, &output)?;

    info!("Scanning for files in {}", input.path.display());
    let files = select(&input)?;

    archive::build(&files, input.root_dir(), &resolved.file, config.overwrite)?;
    Ok(resolved.file)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_cli_parsing_merge() {
        let cli = Cli::try_parse_from([
            "source-combine",
            "merge",
            "./src",
            "-o",
            "out/",
            "-f",
            "--exclude",
            "b.cs;sub/",
            "-p",
            "pre-",
            "--annotate",
            "types",
            "--strict",
        ])
        .unwrap();

        let config = cli.command.into_merge_config().unwrap();
        assert_eq!(config.input, "./src");
        assert_eq!(config.output.as_deref(), Some("out/"));
        assert!(config.overwrite);
        assert_eq!(config.exclude, vec!["b.cs", "sub/"]);
        assert_eq!(config.prefix.as_deref(), Some("pre-"));
        assert_eq!(config.suffix, None);
        assert_eq!(config.annotate, AnnotationMode::Types);
        assert_eq!(config.policy, DiagnosticPolicy::Strict);
    }

    #[test]
    fn test_cli_parsing_archive_defaults() {
        let cli = Cli::try_parse_from(["source-combine", "archive", "proj", "-vv"]).unwrap();

        assert_eq!(cli.verbose, 2);
        let config = cli.command.into_archive_config().unwrap();
        assert_eq!(config.exclude, vec!["bin/", "obj/"]);
        assert_eq!(config.extensions, vec![".sln", ".csproj", ".cs"]);
        assert!(!config.overwrite);
    }

    #[test]
    fn test_cli_parsing_hyphenated_affixes() {
        let cli = Cli::try_parse_from([
            "source-combine",
            "archive",
            "proj",
            "-p",
            "-v2-",
            "--suffix",
            "-post",
        ])
        .unwrap();

        assert_eq!(cli.verbose, 0);
        let config = cli.command.into_archive_config().unwrap();
        assert_eq!(config.prefix.as_deref(), Some("-v2-"));
        assert_eq!(config.suffix.as_deref(), Some("-post"));
    }

    fn merge_config(input: &std::path::Path, output: &std::path::Path) -> MergeConfig {
        MergeConfig {
            input: input.to_string_lossy().into_owned(),
            output: Some(output.to_string_lossy().into_owned()),
            overwrite: true,
            exclude: vec!["bin/".to_string(), "obj/".to_string()],
            prefix: None,
            suffix: None,
            annotate: AnnotationMode::Scopes,
            policy: DiagnosticPolicy::Lenient,
        }
    }

    #[test]
    fn test_merge_sources_end_to_end() {
        let temp_dir = TempDir::new().unwrap();
        let input = temp_dir.path().join("input");
        fs::create_dir_all(input.join("Utils")).unwrap();
        fs::create_dir_all(input.join("obj")).unwrap();
        fs::write(
            input.join("Utils/Helper.cs"),
            "using System;\nusing System.IO;\n\nnamespace App.Utils\n{\n    public static class Helper { }\n}\n",
        )
        .unwrap();
        fs::write(
            input.join("Program.cs"),
            "using System;\n\nConsole.WriteLine(\"hi\");\n",
        )
        .unwrap();
        fs::write(input.join("obj/Generated.cs"), "class Generated { }\n").unwrap();
        let output = temp_dir.path().join("out").join("merged.cs");

        let written = merge_sources(&merge_config(&input, &output)).unwrap();
        let content = fs::read_to_string(&written).unwrap();

        assert_eq!(written, output);
        assert!(content.starts_with("// File generated by source-combine at "));
        assert!(content.contains("\n\nusing System.IO;\nusing System;\n\n"));
        assert_eq!(content.matches("using System;").count(), 1);
        let program = content.find("// Program.cs").unwrap();
        let helper = content.find("// Utils/Helper.cs\nnamespace App.Utils").unwrap();
        assert!(program < helper);
        assert!(!content.contains("Generated"));
    }

    #[test]
    fn test_merge_sources_strict_mode() {
        let temp_dir = TempDir::new().unwrap();
        let input = temp_dir.path().join("input");
        fs::create_dir_all(&input).unwrap();
        fs::write(input.join("Broken.cs"), "namespace Broken\n{\n").unwrap();
        let output = temp_dir.path().join("merged.cs");

        let mut config = merge_config(&input, &output);
        config.policy = DiagnosticPolicy::Strict;
        let err = merge_sources(&config).unwrap_err();
        assert!(matches!(err, CombineError::ExtractionFailed { count: 1 }));
        assert!(!output.exists());

        config.policy = DiagnosticPolicy::Lenient;
        merge_sources(&config).unwrap();
        assert!(output.exists());
    }

    #[test]
    fn test_archive_sources_conflict_keeps_existing_file() {
        let temp_dir = TempDir::new().unwrap();
        let input = temp_dir.path().join("input");
        fs::create_dir_all(&input).unwrap();
        fs::write(input.join("a.cs"), "class A { }").unwrap();
        let output = temp_dir.path().join("existing.zip");
        fs::write(&output, "old").unwrap();

        let config = ArchiveConfig {
            input: input.to_string_lossy().into_owned(),
            output: Some(output.to_string_lossy().into_owned()),
            overwrite: false,
            exclude: vec![],
            extensions: vec![".cs".to_string()],
            prefix: None,
            suffix: None,
        };

        let err = archive_sources(&config).unwrap_err();
        assert!(matches!(err, CombineError::OutputConflict(_)));
        assert_eq!(fs::read_to_string(&output).unwrap(), "old");
    }
}
