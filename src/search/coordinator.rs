//! Fan-out coordination across the organization's members.
//!
//! One enumeration task per member runs under a semaphore-capped worker
//! pool. Each task is bounded by a per-member timeout; a timed-out member's
//! future is dropped, which aborts its in-flight provider call, and its
//! partial results are discarded. Other members are unaffected. Results are
//! aggregated in completion order over a channel, which also gives the
//! coordinator a natural point to stop waiting when the run is interrupted.

use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;

use tokio::sync::{Semaphore, mpsc};
use tracing::{debug, info, instrument, warn};

use crate::api::{FileMatch, Member, TeamApi};

use super::enumerator::{EnumerationOutcome, Enumerator};
use super::filter::FilterCriteria;
use super::retry::RetryPolicy;

/// Minimum allowed concurrency value.
const MIN_CONCURRENCY: usize = 1;

/// Maximum allowed concurrency value.
const MAX_CONCURRENCY: usize = 10;

/// Default worker cap; sized for the provider's rate limits rather than
/// throughput.
pub const DEFAULT_CONCURRENCY: usize = 3;

/// Default per-member enumeration timeout.
pub const DEFAULT_MEMBER_TIMEOUT: Duration = Duration::from_secs(600);

/// Error type for coordinator construction.
#[derive(Debug, thiserror::Error)]
pub enum CoordinatorError {
    /// Invalid concurrency value provided.
    #[error(
        "invalid concurrency value {value}: must be between {MIN_CONCURRENCY} and {MAX_CONCURRENCY}"
    )]
    InvalidConcurrency {
        /// The invalid value that was provided.
        value: usize,
    },
}

/// Counters from one search run.
///
/// Uses atomic counters so a shared reference can be updated from the
/// aggregation loop while tasks are still in flight.
#[derive(Debug, Default)]
pub struct SearchStats {
    members_searched: AtomicUsize,
    members_timed_out: AtomicUsize,
    members_failed: AtomicUsize,
    files_checked: AtomicU64,
    matches_found: AtomicUsize,
}

impl SearchStats {
    /// Creates a stats tracker with zero counts.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Members whose enumeration completed within the timeout.
    #[must_use]
    pub fn members_searched(&self) -> usize {
        self.members_searched.load(Ordering::SeqCst)
    }

    /// Members abandoned at the per-member timeout.
    #[must_use]
    pub fn members_timed_out(&self) -> usize {
        self.members_timed_out.load(Ordering::SeqCst)
    }

    /// Members whose task failed outright.
    #[must_use]
    pub fn members_failed(&self) -> usize {
        self.members_failed.load(Ordering::SeqCst)
    }

    /// Total entries inspected across completed members.
    #[must_use]
    pub fn files_checked(&self) -> u64 {
        self.files_checked.load(Ordering::SeqCst)
    }

    /// Total matches aggregated.
    #[must_use]
    pub fn matches_found(&self) -> usize {
        self.matches_found.load(Ordering::SeqCst)
    }

    fn record_completed(&self, outcome_files: u64, outcome_matches: usize) {
        self.members_searched.fetch_add(1, Ordering::SeqCst);
        self.files_checked.fetch_add(outcome_files, Ordering::SeqCst);
        self.matches_found.fetch_add(outcome_matches, Ordering::SeqCst);
    }

    fn record_timeout(&self) {
        self.members_timed_out.fetch_add(1, Ordering::SeqCst);
    }

    fn record_failure(&self) {
        self.members_failed.fetch_add(1, Ordering::SeqCst);
    }
}

/// Aggregated result of one search run.
#[derive(Debug)]
pub struct SearchReport {
    /// All matches, concatenated in member completion order.
    pub matches: Vec<FileMatch>,
    /// Run counters.
    pub stats: SearchStats,
}

/// Per-member task outcome sent back to the aggregation loop.
enum MemberResult {
    Completed {
        member: Member,
        outcome: EnumerationOutcome,
    },
    TimedOut {
        member: Member,
    },
    Failed {
        member: Member,
    },
}

/// Runs enumeration concurrently across all members with a fixed worker cap.
pub struct Coordinator {
    api: Arc<dyn TeamApi>,
    concurrency: usize,
    member_timeout: Duration,
    retry: RetryPolicy,
}

impl Coordinator {
    /// Creates a coordinator.
    ///
    /// # Errors
    ///
    /// Returns [`CoordinatorError::InvalidConcurrency`] if `concurrency` is
    /// outside the valid range (1-10).
    pub fn new(
        api: Arc<dyn TeamApi>,
        concurrency: usize,
        member_timeout: Duration,
        retry: RetryPolicy,
    ) -> Result<Self, CoordinatorError> {
        if !(MIN_CONCURRENCY..=MAX_CONCURRENCY).contains(&concurrency) {
            return Err(CoordinatorError::InvalidConcurrency { value: concurrency });
        }

        debug!(
            concurrency,
            member_timeout_secs = member_timeout.as_secs(),
            max_retries = retry.max_attempts(),
            "creating search coordinator"
        );

        Ok(Self {
            api,
            concurrency,
            member_timeout,
            retry,
        })
    }

    /// Returns the configured worker cap.
    #[must_use]
    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    /// Searches all members' accounts and aggregates their matches.
    ///
    /// Runs to completion; see [`search_all_until`](Self::search_all_until)
    /// for the interruptible variant.
    pub async fn search_all(&self, members: &[Member], criteria: &FilterCriteria) -> SearchReport {
        self.search_all_until(members, criteria, std::future::pending()).await
    }

    /// Searches all members' accounts, stopping early when `shutdown`
    /// resolves.
    ///
    /// On shutdown the coordinator stops waiting for outstanding members
    /// and returns whatever has been gathered so far; in-flight tasks are
    /// dropped with the runtime.
    #[instrument(skip(self, members, criteria, shutdown), fields(members = members.len()))]
    pub async fn search_all_until<F>(
        &self,
        members: &[Member],
        criteria: &FilterCriteria,
        shutdown: F,
    ) -> SearchReport
    where
        F: Future<Output = ()>,
    {
        let stats = SearchStats::new();
        let semaphore = Arc::new(Semaphore::new(self.concurrency));
        let (tx, mut rx) = mpsc::channel(members.len().max(1));

        info!(
            members = members.len(),
            concurrency = self.concurrency,
            "starting search across member accounts"
        );

        for member in members {
            let member = member.clone();
            let criteria = criteria.clone();
            let api = Arc::clone(&self.api);
            let retry = self.retry.clone();
            let semaphore = Arc::clone(&semaphore);
            let timeout = self.member_timeout;
            let tx = tx.clone();

            tokio::spawn(async move {
                // Acquire inside the task so submission never blocks and an
                // interrupted run abandons queued members cleanly.
                let Ok(_permit) = semaphore.acquire_owned().await else {
                    let _ = tx.send(MemberResult::Failed { member }).await;
                    return;
                };

                let enumerator = Enumerator::new(api, retry);
                let result =
                    match tokio::time::timeout(timeout, enumerator.enumerate(&member, &criteria))
                        .await
                    {
                        Ok(outcome) => MemberResult::Completed { member, outcome },
                        // Dropping the enumeration future aborts its
                        // in-flight provider call.
                        Err(_elapsed) => MemberResult::TimedOut { member },
                    };
                // Receiver may already be gone after an interrupt.
                let _ = tx.send(result).await;
            });
        }
        drop(tx);

        let mut matches = Vec::new();
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                received = rx.recv() => {
                    let Some(result) = received else {
                        break; // all members reported
                    };
                    self.record(&stats, &mut matches, result);
                }
                () = &mut shutdown => {
                    warn!(
                        matches = matches.len(),
                        "search interrupted; reporting what has been gathered so far"
                    );
                    break;
                }
            }
        }

        info!(
            members_searched = stats.members_searched(),
            members_timed_out = stats.members_timed_out(),
            members_failed = stats.members_failed(),
            files_checked = stats.files_checked(),
            matches = matches.len(),
            "search complete"
        );

        SearchReport { matches, stats }
    }

    fn record(&self, stats: &SearchStats, matches: &mut Vec<FileMatch>, result: MemberResult) {
        match result {
            MemberResult::Completed { member, outcome } => {
                debug!(
                    member = %member.display_name,
                    matches = outcome.matches.len(),
                    "member enumeration completed"
                );
                stats.record_completed(outcome.files_checked, outcome.matches.len());
                matches.extend(outcome.matches);
            }
            MemberResult::TimedOut { member } => {
                warn!(
                    member = %member.display_name,
                    timeout_secs = self.member_timeout.as_secs(),
                    "search timed out for member's account; dropping its results"
                );
                stats.record_timeout();
            }
            MemberResult::Failed { member } => {
                warn!(
                    member = %member.display_name,
                    "search task failed for member's account"
                );
                stats.record_failure();
            }
        }
    }
}
