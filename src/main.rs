//! CLI entry point for the team file search tool.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use teamsearch::{
    Coordinator, Credential, DropboxTeamClient, FilterCriteria, Retriever, RetryPolicy, TeamApi,
    list_all_members,
};
use tracing::{debug, error, info, warn};

mod cli;

use cli::Args;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments first (before tracing, so --help works without logs)
    let args = Args::parse();

    // Determine log level based on verbose/quiet flags
    // Priority: RUST_LOG env var > quiet flag > verbose flag > default (info)
    let default_level = if args.quiet {
        "error"
    } else {
        match args.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    };

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));

    tracing_subscriber::fmt().with_env_filter(filter).init();

    debug!(?args, "CLI arguments parsed");
    info!("Team search starting");

    // A bad credential ends the run with a diagnostic, not a stack trace.
    let credential = match Credential::from_env() {
        Ok(credential) => credential,
        Err(e) => {
            error!(error = %e, "cannot start without a valid access token");
            info!("Set DROPBOX_ACCESS_TOKEN to a team-scoped access token and retry.");
            return Ok(());
        }
    };

    let api: Arc<dyn TeamApi> = Arc::new(DropboxTeamClient::new(credential.token()));

    let members = list_all_members(api.as_ref()).await;
    if members.is_empty() {
        info!("No team members found. Check the access token and its permissions.");
        return Ok(());
    }

    info!(members = members.len(), "found team members");
    for member in &members {
        info!(name = %member.display_name, email = %member.email, "searching account");
    }

    let criteria = FilterCriteria::new(&args.keywords, &args.extensions);
    if criteria.is_unconstrained() {
        info!("No keyword or extension filters given; every file will match");
    } else {
        info!(
            keywords = ?args.keywords,
            extensions = ?args.extensions,
            "searching with filters"
        );
    }

    let retry_policy = RetryPolicy::with_max_attempts(u32::from(args.max_retries));
    let coordinator = Coordinator::new(
        Arc::clone(&api),
        usize::from(args.concurrency),
        Duration::from_secs(args.member_timeout),
        retry_policy,
    )?;

    // Ctrl-C stops waiting for outstanding members and reports what has
    // been gathered so far.
    let report = coordinator
        .search_all_until(&members, &criteria, shutdown_signal())
        .await;

    if report.matches.is_empty() {
        info!("No files found matching the criteria");
        return Ok(());
    }

    info!(total = report.matches.len(), "matching files");
    for file_match in &report.matches {
        info!(
            file = %file_match.name,
            owner = %file_match.owner.display_name,
            path = %file_match.path_display,
            size = file_match.size,
            modified = %file_match.modified,
            "match"
        );
    }

    let mut downloaded = 0usize;
    let mut failed = 0usize;
    if args.download {
        // One file at a time; a failure never aborts the rest of the batch.
        let retriever = Retriever::new(api.as_ref());
        for file_match in &report.matches {
            let local_path = Retriever::local_path(&args.output_dir, file_match);
            if retriever.download(file_match, &local_path).await {
                downloaded += 1;
            } else {
                failed += 1;
            }
        }
    }

    info!(
        matches = report.matches.len(),
        members_searched = report.stats.members_searched(),
        members_timed_out = report.stats.members_timed_out(),
        files_checked = report.stats.files_checked(),
        downloaded,
        failed,
        "search complete"
    );

    Ok(())
}

/// Resolves when the user interrupts the process.
///
/// If the signal handler cannot be installed the future never resolves,
/// so the search simply runs to completion.
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "failed to install interrupt handler");
        std::future::pending::<()>().await;
    }
}
