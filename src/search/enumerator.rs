//! Per-member file enumeration.
//!
//! Walks one member's personal storage and mounted shared folders, following
//! continuation cursors, and applies the filename filters inline. Matching
//! is a pure function over each page of entries; the pagination loop folds
//! pages into an explicit accumulator, so no mutable state is shared across
//! scopes.

use std::collections::HashSet;
use std::sync::Arc;

use tracing::{debug, info, instrument, warn};

use crate::api::{ApiError, FileMatch, FolderEntry, Member, TeamApi};

use super::filter::FilterCriteria;
use super::retry::{RetryPolicy, with_retry};

/// Emit a progress log line every this many entries checked.
const PROGRESS_INTERVAL: u64 = 100;

/// Result of enumerating one member's account.
#[derive(Debug, Default)]
pub struct EnumerationOutcome {
    /// Files that passed both filters, in provider listing order.
    pub matches: Vec<FileMatch>,
    /// Total entries inspected, including folders and skipped kinds.
    pub files_checked: u64,
}

/// Walks a single member's storage and produces filtered matches.
pub struct Enumerator {
    api: Arc<dyn TeamApi>,
    retry: RetryPolicy,
}

impl Enumerator {
    /// Creates an enumerator over the given API boundary.
    #[must_use]
    pub fn new(api: Arc<dyn TeamApi>, retry: RetryPolicy) -> Self {
        Self { api, retry }
    }

    /// Enumerates the member's personal storage and shared folders.
    ///
    /// Never fails: any error that survives the per-call retry budget is
    /// logged with the member's identity and whatever matches were
    /// accumulated up to that point are returned.
    #[instrument(skip(self, criteria), fields(member = %member.display_name))]
    pub async fn enumerate(
        &self,
        member: &Member,
        criteria: &FilterCriteria,
    ) -> EnumerationOutcome {
        info!(member = %member.display_name, "starting search in member's account");

        let mut acc = Accumulator::default();
        if let Err(error) = self.enumerate_into(member, criteria, &mut acc).await {
            warn!(
                member = %member.display_name,
                error = %error,
                "enumeration aborted; keeping partial results"
            );
        }

        let outcome = acc.into_outcome();
        info!(
            member = %member.display_name,
            files_checked = outcome.files_checked,
            matches = outcome.matches.len(),
            "completed search in member's account"
        );
        outcome
    }

    async fn enumerate_into(
        &self,
        member: &Member,
        criteria: &FilterCriteria,
        acc: &mut Accumulator,
    ) -> Result<(), ApiError> {
        // A shared-folder listing failure must not block the personal
        // search; it degrades to "zero shared folders".
        let shared_roots = match self.shared_folder_roots(member).await {
            Ok(roots) => roots,
            Err(error) => {
                warn!(
                    member = %member.display_name,
                    error = %error,
                    "listing shared folders failed; searching personal storage only"
                );
                Vec::new()
            }
        };

        self.walk_root(member, "", criteria, acc).await?;
        for root in &shared_roots {
            self.walk_root(member, root, criteria, acc).await?;
        }
        Ok(())
    }

    /// Lists the member's shared folders fully and resolves each to its
    /// mount path. Unmounted folders and folders whose metadata lookup
    /// fails are skipped.
    async fn shared_folder_roots(&self, member: &Member) -> Result<Vec<String>, ApiError> {
        let member_id = &member.team_member_id;

        let mut page = with_retry(&self.retry, "sharing/list_folders", || {
            self.api.list_shared_folders(member_id)
        })
        .await?;

        let mut folders = Vec::new();
        loop {
            folders.append(&mut page.entries);
            let Some(cursor) = page.cursor.take() else {
                break;
            };
            page = with_retry(&self.retry, "sharing/list_folders/continue", || {
                self.api.list_shared_folders_continue(member_id, &cursor)
            })
            .await?;
        }

        let mut roots = Vec::new();
        for folder in folders {
            let lookup = with_retry(&self.retry, "sharing/get_folder_metadata", || {
                self.api
                    .shared_folder_path(member_id, &folder.shared_folder_id)
            })
            .await;
            match lookup {
                Ok(Some(path)) => roots.push(path),
                Ok(None) => {
                    debug!(
                        member = %member.display_name,
                        folder = %folder.name,
                        "shared folder is not mounted; skipping"
                    );
                }
                Err(error) => {
                    warn!(
                        member = %member.display_name,
                        folder = %folder.name,
                        error = %error,
                        "failed to resolve shared folder path; skipping"
                    );
                }
            }
        }
        Ok(roots)
    }

    /// Recursively lists one root, folding each page through the filter.
    async fn walk_root(
        &self,
        member: &Member,
        root: &str,
        criteria: &FilterCriteria,
        acc: &mut Accumulator,
    ) -> Result<(), ApiError> {
        let member_id = &member.team_member_id;
        debug!(member = %member.display_name, root, "walking root");

        let mut page = with_retry(&self.retry, "files/list_folder", || {
            self.api.list_folder(member_id, root)
        })
        .await?;

        loop {
            let found = matches_in_page(&page.entries, member, criteria);
            acc.absorb(member, page.entries.len() as u64, found);

            if !page.has_more {
                break;
            }
            let cursor = page.cursor.clone();
            page = with_retry(&self.retry, "files/list_folder/continue", || {
                self.api.list_folder_continue(member_id, &cursor)
            })
            .await?;
        }
        Ok(())
    }
}

/// Applies the filters to one page of entries.
///
/// Pure page-in, matches-out: the returned pairs carry the lowercased path
/// so the caller can de-duplicate files reachable from multiple roots.
fn matches_in_page(
    entries: &[FolderEntry],
    member: &Member,
    criteria: &FilterCriteria,
) -> Vec<(String, FileMatch)> {
    entries
        .iter()
        .filter_map(|entry| match entry {
            FolderEntry::File(file) if criteria.matches(&file.path_lower) => Some((
                file.path_lower.clone(),
                FileMatch {
                    name: file.name.clone(),
                    path_display: file.path_display.clone(),
                    size: file.size,
                    modified: file.client_modified,
                    owner: member.clone(),
                },
            )),
            _ => None,
        })
        .collect()
}

/// Explicit fold state for one member's enumeration.
#[derive(Debug, Default)]
struct Accumulator {
    matches: Vec<FileMatch>,
    files_checked: u64,
    seen_paths: HashSet<String>,
}

impl Accumulator {
    /// Folds one page's worth of results in, de-duplicating by lowercased
    /// path so a shared folder mounted under the personal tree cannot
    /// double-count a file.
    fn absorb(&mut self, member: &Member, entries_checked: u64, found: Vec<(String, FileMatch)>) {
        let before = self.files_checked;
        self.files_checked += entries_checked;
        // One line per interval even when a single large page crosses
        // several of them.
        for checked in progress_marks(before, self.files_checked) {
            info!(
                member = %member.display_name,
                checked,
                "search progress"
            );
        }

        for (path_lower, file_match) in found {
            if self.seen_paths.insert(path_lower) {
                info!(
                    member = %member.display_name,
                    file = %file_match.name,
                    "found matching file"
                );
                self.matches.push(file_match);
            }
        }
    }

    fn into_outcome(self) -> EnumerationOutcome {
        EnumerationOutcome {
            matches: self.matches,
            files_checked: self.files_checked,
        }
    }
}

/// Multiples of [`PROGRESS_INTERVAL`] crossed while the checked count moved
/// from `before` to `after`.
fn progress_marks(before: u64, after: u64) -> impl Iterator<Item = u64> {
    let first = before / PROGRESS_INTERVAL + 1;
    let last = after / PROGRESS_INTERVAL;
    (first..=last).map(|n| n * PROGRESS_INTERVAL)
}
