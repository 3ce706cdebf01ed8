//! Command-line interface: argument parsing and runtime setup.

pub mod args;
pub mod setup;

pub use args::{Cli, ColorChoice, Commands};
pub use setup::init_runtime;

/// Parse CLI arguments using Clap
pub fn parse_args() -> Cli {
    args::parse_args()
}
