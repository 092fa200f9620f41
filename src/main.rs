use anyhow::Result;
use perflab::cli::{Cli, Commands};
use perflab::commands::run;
use perflab::core::ScenarioParameters;
use perflab::observability::install_panic_hook;
use perflab::output::{output_envelope, Envelope};
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    install_panic_hook();
    let cli = perflab::cli::parse_args();
    init_tracing(cli.command.common().map_or(0, |c| c.verbosity));

    let success = dispatch(cli)?;
    if !success {
        std::process::exit(1);
    }
    Ok(())
}

fn dispatch(cli: Cli) -> Result<bool> {
    if let Commands::Init { force } = cli.command {
        perflab::commands::init::init_config(force)?;
        return Ok(true);
    }

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|e| anyhow::anyhow!("Failed to create tokio runtime: {}", e))?;
    let (envelope, common) = runtime.block_on(handle_command(&cli.command))?;

    output_envelope(&envelope, common.format, common.output.clone())?;
    Ok(envelope.success())
}

async fn handle_command(command: &Commands) -> Result<(Envelope, &perflab::cli::CommonArgs)> {
    match command {
        Commands::Analyze { file, common } => Ok((run::run_analyze(file, common)?, common)),
        Commands::AnalyzeAndTest {
            file,
            run_all_tests,
            common,
        } => Ok((
            run::run_analyze_and_test(file, *run_all_tests, common).await?,
            common,
        )),
        Commands::PerformanceTest {
            file,
            test_type,
            name,
            iterations,
            data_size,
            user_count,
            duration,
            common,
        } => {
            let parameters = ScenarioParameters {
                iterations: *iterations,
                data_size: *data_size,
                user_count: *user_count,
                duration: *duration,
                max_calls: None,
            };
            let envelope = run::run_performance_test(
                file,
                test_type.clone(),
                name.clone(),
                parameters,
                common,
            )
            .await?;
            Ok((envelope, common))
        }
        Commands::Init { .. } => Err(anyhow::anyhow!("Invalid command")),
    }
}

/// `RUST_LOG` wins when set; otherwise `-v` flags raise the level from `warn`.
fn init_tracing(verbosity: u8) {
    let default_level = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("perflab={default_level}")));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}
