//! Runtime setup for the binary.

use crate::formatting::ColorMode;
use crate::observability::init_logging;

use super::args::ColorChoice;

/// Install logging and decide on terminal colors.
pub fn init_runtime(verbosity: u8, color: ColorChoice) -> ColorMode {
    init_logging(verbosity);
    let requested = match color {
        ColorChoice::Auto => ColorMode::Auto,
        ColorChoice::Always => ColorMode::Always,
        ColorChoice::Never => ColorMode::Never,
    };
    let mode = ColorMode::from_env(requested);
    mode.apply();
    mode
}
