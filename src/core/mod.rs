pub mod aggregator;
pub mod annotator;
pub mod archive;
pub mod extractor;
pub mod file_selector;
pub mod lexer;
pub mod output_path;
