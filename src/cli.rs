use crate::core::{RawTestScenario, ScenarioParameters, SystemDiagram};
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "perflab")]
#[command(
    about = "Architecture classification, performance insights and sandboxed test runs for Python submissions",
    long_about = None
)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Classify the architecture, report anti-patterns and recommend tests
    Analyze {
        /// Python source file to analyze
        file: PathBuf,

        #[command(flatten)]
        common: CommonArgs,
    },

    /// Analyze, then run the baseline scenario (or every recommended one)
    AnalyzeAndTest {
        /// Python source file to analyze
        file: PathBuf,

        /// Run every recommended scenario instead of only the baseline
        #[arg(long = "all")]
        run_all_tests: bool,

        #[command(flatten)]
        common: CommonArgs,
    },

    /// Run a single ad-hoc scenario against a submission
    PerformanceTest {
        /// Python source file to execute
        file: PathBuf,

        /// Scenario type (baseline, memory, concurrency, load)
        #[arg(long = "type")]
        test_type: String,

        /// Scenario name shown in the result
        #[arg(long)]
        name: Option<String>,

        #[arg(long)]
        iterations: Option<u64>,

        #[arg(long = "data-size")]
        data_size: Option<u64>,

        #[arg(long = "user-count")]
        user_count: Option<u64>,

        /// Scenario duration in seconds
        #[arg(long)]
        duration: Option<f64>,

        #[command(flatten)]
        common: CommonArgs,
    },

    /// Initialize configuration file
    Init {
        /// Force overwrite existing config
        #[arg(short, long)]
        force: bool,
    },
}

/// Flags shared by every analysis command.
#[derive(Args, Debug, Clone, Default)]
pub struct CommonArgs {
    /// Components the submission is expected to contain (comma-separated)
    #[arg(long, value_delimiter = ',')]
    pub components: Vec<String>,

    /// Architecture the submission claims to implement
    #[arg(long)]
    pub architecture: Option<String>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "terminal")]
    pub format: OutputFormat,

    /// Output file (defaults to stdout)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Configuration file (defaults to the nearest .perflab.toml)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Increase verbosity level (can be repeated: -v, -vv, -vvv)
    #[arg(short = 'v', long = "verbose", action = clap::ArgAction::Count)]
    pub verbosity: u8,
}

impl CommonArgs {
    pub fn system_diagram(&self) -> Option<SystemDiagram> {
        let components: Vec<String> = self
            .components
            .iter()
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty())
            .collect();
        if components.is_empty() && self.architecture.is_none() {
            return None;
        }
        Some(SystemDiagram {
            components,
            architecture: self.architecture.clone(),
        })
    }
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, ValueEnum)]
pub enum OutputFormat {
    Json,
    #[default]
    Terminal,
}

impl Commands {
    pub fn common(&self) -> Option<&CommonArgs> {
        match self {
            Self::Analyze { common, .. }
            | Self::AnalyzeAndTest { common, .. }
            | Self::PerformanceTest { common, .. } => Some(common),
            Self::Init { .. } => None,
        }
    }
}

/// Build the unvalidated scenario for `performance-test`.
pub fn raw_scenario(
    test_type: String,
    name: Option<String>,
    parameters: ScenarioParameters,
) -> RawTestScenario {
    RawTestScenario {
        name: name.unwrap_or_default(),
        test_type,
        description: String::new(),
        parameters,
    }
}

pub fn parse_args() -> Cli {
    Cli::parse()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parsing_analyze_with_diagram() {
        let cli = Cli::parse_from([
            "perflab",
            "analyze",
            "store.py",
            "--components",
            "api, cache,",
            "--format",
            "json",
        ]);
        match cli.command {
            Commands::Analyze { file, common } => {
                assert_eq!(file, PathBuf::from("store.py"));
                assert_eq!(common.format, OutputFormat::Json);
                let diagram = common.system_diagram().unwrap();
                assert_eq!(diagram.components, vec!["api", "cache"]);
                assert_eq!(diagram.architecture, None);
            }
            _ => panic!("Expected Analyze command"),
        }
    }

    #[test]
    fn test_cli_parsing_analyze_and_test_all() {
        let cli = Cli::parse_from(["perflab", "analyze-and-test", "a.py", "--all", "-vv"]);
        match cli.command {
            Commands::AnalyzeAndTest {
                run_all_tests,
                common,
                ..
            } => {
                assert!(run_all_tests);
                assert_eq!(common.verbosity, 2);
                assert!(common.system_diagram().is_none());
            }
            _ => panic!("Expected AnalyzeAndTest command"),
        }
    }

    #[test]
    fn test_cli_parsing_performance_test_keeps_type_unvalidated() {
        let cli = Cli::parse_from([
            "perflab",
            "performance-test",
            "a.py",
            "--type",
            "spike",
            "--user-count",
            "4",
            "--duration",
            "0.5",
        ]);
        match cli.command {
            Commands::PerformanceTest {
                test_type,
                user_count,
                duration,
                ..
            } => {
                assert_eq!(test_type, "spike");
                assert_eq!(user_count, Some(4));
                assert_eq!(duration, Some(0.5));
            }
            _ => panic!("Expected PerformanceTest command"),
        }
    }

    #[test]
    fn test_default_format_matches_flag_default() {
        let cli = Cli::parse_from(["perflab", "analyze", "a.py"]);
        let parsed = cli.command.common().map(|c| c.format);
        assert_eq!(parsed, Some(OutputFormat::Terminal));
        assert_eq!(CommonArgs::default().format, OutputFormat::Terminal);
    }

    #[test]
    fn test_cli_parsing_init_command() {
        let cli = Cli::parse_from(["perflab", "init", "--force"]);
        match cli.command {
            Commands::Init { force } => assert!(force),
            _ => panic!("Expected Init command"),
        }
        assert!(Cli::parse_from(["perflab", "init"]).command.common().is_none());
    }
}
