use clap::Parser;
use miette::{IntoDiagnostic, Result};
use std::fs::File;
use std::io;
use std::path::PathBuf;
use std::time::Duration;
use threeds_client::application::config::OrchestratorConfig;
use threeds_client::interfaces::csv::attempt_reader::AttemptReader;
use threeds_client::interfaces::csv::outcome_writer::OutcomeWriter;
use threeds_client::interfaces::runner::ScenarioRunner;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Input payment attempts CSV file
    input: PathBuf,

    /// Milliseconds to wait for the 3DS method step before falling back
    #[arg(long, default_value_t = 6000)]
    fallback_timeout_ms: u64,

    /// Log protocol progress to stderr
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "info" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(io::stderr)
        .with_target(false)
        .init();

    let config = OrchestratorConfig::default()
        .with_fallback_timeout(Duration::from_millis(cli.fallback_timeout_ms));
    let runner = ScenarioRunner::new(config);

    let file = File::open(cli.input).into_diagnostic()?;
    let reader = AttemptReader::new(file);

    let stdout = io::stdout();
    let mut writer = OutcomeWriter::new(stdout.lock());
    for record in reader.attempts() {
        match record {
            Ok(record) => match runner.run(&record).await {
                Ok(outcome) => writer.write(&outcome).into_diagnostic()?,
                Err(e) => eprintln!("Error processing attempt: {}", e),
            },
            Err(e) => {
                eprintln!("Error reading attempt: {}", e);
            }
        }
    }
    writer.flush().into_diagnostic()?;

    Ok(())
}
