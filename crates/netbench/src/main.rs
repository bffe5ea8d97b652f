use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use netbench_core::browser::chrome::ChromeSession;
use netbench_core::config::{BenchConfig, ConfigManager};
use netbench_core::engine::build_client;
use netbench_core::engine::chunked::ChunkedDownloader;
use netbench_core::runner::run_benchmark;
use netbench_core::types::BenchError;

#[derive(Parser, Debug)]
#[command(name = "netbench", version, about = "Download timing under emulated network conditions")]
struct Cli {
    /// Path to the TOML config; a default one is written if missing.
    #[arg(short, long, default_value = "netbench.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the full trial matrix through the browser and write the report.
    Run,
    /// Download one resource as concurrently fetched byte ranges.
    Fetch {
        url: String,
        dest: PathBuf,
        /// Chunk size in bytes (defaults to the config value).
        #[arg(long)]
        chunk_size: Option<u64>,
        /// Cap on simultaneous range requests (defaults to the config value).
        #[arg(long)]
        max_in_flight: Option<usize>,
    },
}

fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .try_init();
}

async fn run_matrix(config: &BenchConfig) -> Result<(), BenchError> {
    let session = ChromeSession::launch(&config.browser).await?;
    let (session, outcome) = run_benchmark(config, session).await;
    let shutdown = session.shutdown().await;
    let records = outcome?;
    tracing::info!(records = records.len(), "benchmark finished");
    shutdown
}

async fn fetch(
    config: &BenchConfig,
    url: &str,
    dest: &std::path::Path,
    chunk_size: Option<u64>,
    max_in_flight: Option<usize>,
) -> Result<(), BenchError> {
    let parsed = url::Url::parse(url)?;
    match parsed.scheme() {
        "http" | "https" => {}
        scheme => {
            return Err(BenchError::Config(format!("unsupported URL scheme: {scheme}")))
        }
    }
    if chunk_size == Some(0) || max_in_flight == Some(0) {
        return Err(BenchError::Config(
            "--chunk-size and --max-in-flight must be positive".to_string(),
        ));
    }

    let client = build_client(config.server.accept_invalid_certs)?;
    let downloader = ChunkedDownloader::new(client)
        .with_chunk_size(chunk_size.unwrap_or(config.chunked.chunk_size_bytes))
        .with_max_in_flight(max_in_flight.or(config.chunked.max_in_flight));

    let result = downloader.download(url, dest).await?;
    tracing::info!(
        path = %result.final_path.display(),
        bytes = result.downloaded_bytes,
        chunks = result.chunk_count,
        elapsed_ms = result.elapsed_ms,
        "saved"
    );
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    init_logging();
    let cli = Cli::parse();

    let config = match ConfigManager::load(&cli.config) {
        Ok(manager) => manager.into_config(),
        Err(e) => {
            tracing::error!(path = %cli.config.display(), error = %e, "cannot load config");
            return ExitCode::FAILURE;
        }
    };

    let result = match cli.command.unwrap_or(Command::Run) {
        Command::Run => run_matrix(&config).await,
        Command::Fetch {
            url,
            dest,
            chunk_size,
            max_in_flight,
        } => fetch(&config, &url, &dest, chunk_size, max_in_flight).await,
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "netbench failed");
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_to_run() {
        let cli = Cli::try_parse_from(["netbench"]).unwrap();
        assert_eq!(cli.config, PathBuf::from("netbench.toml"));
        assert!(cli.command.is_none());
    }

    #[test]
    fn test_parse_fetch() {
        let cli = Cli::try_parse_from([
            "netbench",
            "--config",
            "bench.toml",
            "fetch",
            "https://example.com/files/stream/1GB.bin",
            "out/1GB.bin",
            "--chunk-size",
            "1048576",
            "--max-in-flight",
            "8",
        ])
        .unwrap();

        assert_eq!(cli.config, PathBuf::from("bench.toml"));
        match cli.command {
            Some(Command::Fetch {
                url,
                dest,
                chunk_size,
                max_in_flight,
            }) => {
                assert_eq!(url, "https://example.com/files/stream/1GB.bin");
                assert_eq!(dest, PathBuf::from("out/1GB.bin"));
                assert_eq!(chunk_size, Some(1_048_576));
                assert_eq!(max_in_flight, Some(8));
            }
            other => panic!("expected fetch, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_fetch_rejects_non_http_scheme() {
        let err = fetch(
            &BenchConfig::default(),
            "ftp://example.com/1MB.bin",
            std::path::Path::new("1MB.bin"),
            None,
            None,
        )
        .await
        .unwrap_err();
        assert!(matches!(err, BenchError::Config(_)), "got {err:?}");
    }
}
