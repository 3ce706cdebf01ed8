//! CLI command implementations.
//!
//! Available commands:
//! - **report**: Build every requested category and write the report tree
//! - **init**: Initialize a new qualitymap configuration file

pub mod init;
pub mod report;

pub use init::init_config;
pub use report::{run_report, ReportCommand};
