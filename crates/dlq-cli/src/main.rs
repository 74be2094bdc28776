//! CLI entry point.
//!
//! Creates one queue, submits every URL into it, renders a progress bar per
//! running item, and prints each outcome. Ctrl-C cancels everything still
//! queued or running.

mod cli;
mod progress;

use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use dlq_download::{
    Destination, DownloadManager, HttpTransport, HttpTransportConfig, Payload, file_name_for,
};

use cli::Cli;
use progress::ProgressBoard;

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let mut transport_config = HttpTransportConfig::new();
    if let Some(dir) = &cli.dir {
        transport_config = transport_config.with_download_dir(dir);
    }
    let transport =
        Arc::new(HttpTransport::new(transport_config).context("Failed to set up HTTP transport")?);

    // Item metadata is the display label.
    let manager: DownloadManager<String> = DownloadManager::new(transport);
    manager
        .create_queue_with_limit(&cli.queue, cli.concurrency)
        .with_context(|| format!("Failed to create queue '{}'", cli.queue))?;

    let board = Arc::new(ProgressBoard::new());
    manager.subscribe(board.clone());

    let destination = if cli.memory {
        Destination::Memory
    } else {
        Destination::File
    };

    let mut pending = Vec::with_capacity(cli.urls.len());
    for url in cli.urls {
        let label = file_name_for(&url).to_string();
        let ticket = manager
            .download(url.clone(), &cli.queue, label.clone(), destination)
            .with_context(|| format!("Failed to queue {url}"))?;
        board.register(ticket.handle.id(), &label);
        pending.push((url, ticket.completion));
    }

    let interrupt = manager.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            let cancelled = interrupt.shutdown();
            tracing::warn!(cancelled, "Interrupted, cancelled remaining downloads");
        }
    });

    let mut failures = 0_usize;
    for (url, completion) in pending {
        match completion.await {
            Ok(Payload::File(path)) => board.println(format!("{url} -> {}", path.display())),
            Ok(Payload::Data(bytes)) => board.println(format!("{url} -> {} bytes", bytes.len())),
            Err(e) => {
                failures += 1;
                board.println(format!("{url} failed: {e}"));
            }
        }
    }

    if failures > 0 {
        eprintln!("{failures} download(s) did not complete");
        return Ok(ExitCode::FAILURE);
    }
    Ok(ExitCode::SUCCESS)
}
