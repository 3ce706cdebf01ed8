use crate::core::Category;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "qualitymap")]
#[command(about = "Unified code quality reports from analysis tool output", long_about = None)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Generate the quality report
    Report {
        /// Source tree scanned for the dependency graph
        #[arg(default_value = ".")]
        source_root: PathBuf,

        /// Directory holding raw tool output, one file per category
        #[arg(short, long, default_value = "signals")]
        signals: PathBuf,

        /// Report output directory
        #[arg(short, long, default_value = "quality-report")]
        output: PathBuf,

        /// Categories to report on (comma-separated, default: all)
        #[arg(long, value_delimiter = ',', value_parser = parse_category)]
        categories: Option<Vec<Category>>,

        /// Project name used in document headings
        #[arg(long, env = "QUALITYMAP_PROJECT")]
        project: Option<String>,

        /// Configuration file (default: nearest .qualitymap.toml)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Directory with template overrides
        #[arg(long)]
        templates: Option<PathBuf>,

        /// Skip chart generation
        #[arg(long = "no-charts")]
        no_charts: bool,

        /// Number of category pipelines run in parallel (0 = one per CPU)
        #[arg(short = 'j', long = "jobs", env = "QUALITYMAP_JOBS")]
        jobs: Option<usize>,

        /// Exit non-zero when the overall status is Fail
        #[arg(long = "fail-on-error")]
        fail_on_error: bool,

        /// When to color terminal output
        #[arg(long, value_enum, default_value = "auto")]
        color: ColorChoice,

        /// Increase verbosity level (can be repeated: -v, -vv, -vvv)
        #[arg(short = 'v', long = "verbose", action = clap::ArgAction::Count)]
        verbosity: u8,
    },

    /// Initialize configuration file
    Init {
        /// Force overwrite existing config
        #[arg(short, long)]
        force: bool,
    },
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum ColorChoice {
    Auto,
    Always,
    Never,
}

fn parse_category(value: &str) -> Result<Category, String> {
    value.parse::<Category>().map_err(|e| e.to_string())
}

pub fn parse_args() -> Cli {
    Cli::parse()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parsing_report_command() {
        let cli = Cli::try_parse_from([
            "qualitymap",
            "report",
            "app",
            "--categories",
            "e2e,type-safety",
            "-j",
            "2",
            "-vv",
        ])
        .unwrap();
        match cli.command {
            Commands::Report {
                source_root,
                categories,
                jobs,
                verbosity,
                signals,
                ..
            } => {
                assert_eq!(source_root, PathBuf::from("app"));
                assert_eq!(
                    categories,
                    Some(vec![Category::E2eTests, Category::TypeSafety])
                );
                assert_eq!(jobs, Some(2));
                assert_eq!(verbosity, 2);
                assert_eq!(signals, PathBuf::from("signals"));
            }
            _ => panic!("Expected Report command"),
        }
    }

    #[test]
    fn test_unknown_category_rejected() {
        let result = Cli::try_parse_from(["qualitymap", "report", "--categories", "coverage"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_cli_parsing_init_command() {
        let cli = Cli::try_parse_from(["qualitymap", "init", "--force"]).unwrap();
        match cli.command {
            Commands::Init { force } => assert!(force),
            _ => panic!("Expected Init command"),
        }
    }
}
