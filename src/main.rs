use anyhow::Result;
use qualitymap::cli::{init_runtime, parse_args, Commands};
use qualitymap::commands::report::{exit_code, run_report, ReportCommand};

fn main() -> Result<()> {
    let cli = parse_args();

    match cli.command {
        Commands::Report {
            source_root,
            signals,
            output,
            categories,
            project,
            config,
            templates,
            no_charts,
            jobs,
            fail_on_error,
            color,
            verbosity,
        } => {
            let color_mode = init_runtime(verbosity, color);
            let command = ReportCommand {
                source_root,
                signals,
                output,
                categories,
                project,
                config,
                templates,
                no_charts,
                jobs,
                color: color_mode.should_use_color(),
            };
            let summary = run_report(&command)?;
            let code = exit_code(summary.overall, fail_on_error);
            if code != 0 {
                std::process::exit(code);
            }
            Ok(())
        }
        Commands::Init { force } => qualitymap::commands::init::init_config(force),
    }
}
