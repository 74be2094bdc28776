//! Command-line arguments.

use std::path::PathBuf;

use clap::Parser;
use url::Url;

/// Download URLs through a named, concurrency-bounded queue.
#[derive(Debug, Parser)]
#[command(name = "dlq")]
#[command(version, about)]
pub struct Cli {
    /// URLs to download, admitted in the order given
    #[arg(required = true)]
    pub urls: Vec<Url>,

    /// Name of the queue to create and submit into
    #[arg(short, long, env = "DLQ_QUEUE", default_value = "default")]
    pub queue: String,

    /// Maximum number of transfers running at once
    #[arg(
        short = 'j',
        long,
        env = "DLQ_CONCURRENCY",
        default_value_t = 4,
        value_parser = clap::value_parser!(u32).range(1..)
    )]
    pub concurrency: u32,

    /// Directory receiving downloaded files (defaults to the temp dir)
    #[arg(short, long, env = "DLQ_DIR")]
    pub dir: Option<PathBuf>,

    /// Keep downloads in memory and only report their size
    #[arg(long)]
    pub memory: bool,

    /// Enable verbose/debug output
    #[arg(short, long)]
    pub verbose: bool,
}
