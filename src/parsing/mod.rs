//! Access-log line parsing and classification

pub mod log_parser;

pub use log_parser::{parse_timestamp, ClassifyError, LineClassifier};
