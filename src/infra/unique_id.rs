use chrono::Local;
use regex::Regex;
use std::sync::OnceLock;

/// `2023-04-01__14_05_09`: sortable, and safe to embed in a file name.
pub const DATE_FORMAT: &str = "%Y-%m-%d__%H_%M_%S";

pub fn unique_id() -> String {
    Local::now().format(DATE_FORMAT).to_string()
}

fn generated_name_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| {
        Regex::new(r"\d{4}-\d{2}-\d{2}__\d{2}_\d{2}_\d{2}").expect("valid unique id pattern")
    })
}

/// True for file names such as `pre-2023-04-01__14_05_09-post.cs` that an earlier run produced.
pub fn is_generated_file_name(file_name: &str, extension: &str) -> bool {
    file_name
        .to_lowercase()
        .ends_with(&extension.to_lowercase())
        && generated_name_regex().is_match(file_name)
}
