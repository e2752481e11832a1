use source_combine::cli::commands::run;
use std::process::ExitCode;

fn main() -> ExitCode {
    run()
}
