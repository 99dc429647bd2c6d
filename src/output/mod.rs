//! Output formatters for detection results.
//!
//! - [`json`]: machine-readable report for automation and scripting
//! - [`text`]: colored summaries for terminals
//!
//! # Example
//!
//! ```no_run
//! use photoprune::engine::DetectionReport;
//! use photoprune::error::ExitCode;
//! use photoprune::output::JsonOutput;
//!
//! fn print(report: &DetectionReport) {
//!     let output = JsonOutput::new(report, ExitCode::Success);
//!     println!("{}", output.to_json_pretty().unwrap());
//! }
//! ```

pub mod json;
pub mod text;

pub use json::{JsonOutput, JsonOutputError};
pub use text::TextOutput;
