//! CLI argument definitions using clap derive macros.

use std::path::PathBuf;

use clap::Parser;

use teamsearch::{DEFAULT_CONCURRENCY, DEFAULT_MAX_ATTEMPTS};

/// Search and retrieve files across a team's storage accounts.
///
/// Enumerates every member's personal and shared storage, filters files by
/// filename keyword and extension, and optionally downloads the matches.
#[derive(Parser, Debug)]
#[command(name = "teamsearch")]
#[command(author, version, about)]
pub struct Args {
    /// Keyword substring a file path must contain (repeatable; any one matches)
    #[arg(short = 'k', long = "keyword", value_name = "WORD")]
    pub keywords: Vec<String>,

    /// File extension to match, with or without the dot (repeatable)
    #[arg(short = 'e', long = "ext", value_name = "EXT")]
    pub extensions: Vec<String>,

    /// Download matched files after the search
    #[arg(short = 'd', long)]
    pub download: bool,

    /// Directory to place downloaded files under
    #[arg(short = 'o', long, default_value = "downloads")]
    pub output_dir: PathBuf,

    /// Concurrent member searches (1-10); sized for provider rate limits
    #[arg(short = 'c', long, default_value_t = DEFAULT_CONCURRENCY as u8, value_parser = clap::value_parser!(u8).range(1..=10))]
    pub concurrency: u8,

    /// Per-member search timeout in seconds
    #[arg(short = 't', long, default_value_t = 600, value_parser = clap::value_parser!(u64).range(1..=86400))]
    pub member_timeout: u64,

    /// Maximum attempts per listing call on transient failures (1-10)
    #[arg(short = 'r', long, default_value_t = DEFAULT_MAX_ATTEMPTS as u8, value_parser = clap::value_parser!(u8).range(1..=10))]
    pub max_retries: u8,

    /// Increase output verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(short, long)]
    pub quiet: bool,
}
