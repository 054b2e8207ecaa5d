use clap::{CommandFactory, Parser};
use colored::*;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio_stream::wrappers::LinesStream;
use tracing_subscriber::EnvFilter;

use zephyr_client::app::App;
use zephyr_client::cli::Args;
use zephyr_client::config::ClientConfig;
use zephyr_client::health;
use zephyr_client::session::{generate_session_id, SessionIdSource};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    if let Some(shell) = args.completions {
        clap_complete::generate(shell, &mut Args::command(), "zephyr", &mut std::io::stdout());
        return Ok(());
    }

    if args.generate_session {
        println!("{}", generate_session_id(SessionIdSource::default()));
        return Ok(());
    }

    let config = ClientConfig::load(&args)?;

    // Logs go to stderr so they never interleave with the feed on stdout.
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.log_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    if !config.color {
        colored::control::set_override(false);
    }

    if args.check {
        match health::probe(&config.host).await {
            Ok(report) => eprintln!(
                "{}",
                format!(
                    "  {} is {}",
                    report.app.as_deref().unwrap_or("backend"),
                    report.status
                )
                .bright_green()
            ),
            Err(e) => eprintln!("{} {}", "  health check failed:".bright_red(), e),
        }
    }

    let lines = LinesStream::new(BufReader::new(tokio::io::stdin()).lines());
    App::new(config, std::io::stdout()).run(lines).await?;

    Ok(())
}
