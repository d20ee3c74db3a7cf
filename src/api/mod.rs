//! Provider API boundary: the operations the search pipeline consumes.
//!
//! The [`TeamApi`] trait is the seam between orchestration and the vendor's
//! HTTP API. [`DropboxTeamClient`] is the production implementation; tests
//! substitute in-process fakes or point the client at a mock server.
//!
//! # Object Safety
//!
//! This trait uses `async_trait` to support dynamic dispatch via
//! `Arc<dyn TeamApi>`. Rust 2024 native async traits are not object-safe,
//! so `async_trait` is required here.

mod client;
mod error;
mod types;

pub use client::DropboxTeamClient;
pub use error::ApiError;
pub use types::{
    FileEntry, FileMatch, FolderEntry, FolderPage, Member, MemberPage, SharedFolderEntry,
    SharedFolderPage,
};

use async_trait::async_trait;
use tracing::error;

/// Provider operations consumed by the search pipeline.
///
/// Every per-member operation takes the member's stable identifier and acts
/// with that member's storage permissions (impersonation).
#[async_trait]
pub trait TeamApi: Send + Sync {
    /// Lists the first page of organization members.
    async fn list_members(&self) -> Result<MemberPage, ApiError>;

    /// Continues a member listing from a cursor.
    async fn list_members_continue(&self, cursor: &str) -> Result<MemberPage, ApiError>;

    /// Starts a recursive folder listing rooted at `path` (`""` for the
    /// member's personal root).
    async fn list_folder(&self, member_id: &str, path: &str) -> Result<FolderPage, ApiError>;

    /// Continues a folder listing from a cursor.
    async fn list_folder_continue(
        &self,
        member_id: &str,
        cursor: &str,
    ) -> Result<FolderPage, ApiError>;

    /// Lists the first page of shared folders visible to the member.
    async fn list_shared_folders(&self, member_id: &str) -> Result<SharedFolderPage, ApiError>;

    /// Continues a shared-folder listing from a cursor.
    async fn list_shared_folders_continue(
        &self,
        member_id: &str,
        cursor: &str,
    ) -> Result<SharedFolderPage, ApiError>;

    /// Resolves a shared folder to its mount path in the member's namespace.
    ///
    /// Returns `None` for shared folders that are not mounted.
    async fn shared_folder_path(
        &self,
        member_id: &str,
        shared_folder_id: &str,
    ) -> Result<Option<String>, ApiError>;

    /// Downloads the full content of a file by path.
    async fn download(&self, member_id: &str, path: &str) -> Result<Vec<u8>, ApiError>;
}

/// Resolves the full list of organization members visible to the credential.
///
/// Follows continuation cursors until the listing is exhausted. On any
/// failure the error is reported and an empty list is returned; downstream
/// search work then becomes a no-op rather than a startup crash.
pub async fn list_all_members(api: &dyn TeamApi) -> Vec<Member> {
    match list_all_members_inner(api).await {
        Ok(members) => members,
        Err(error) => {
            error!(error = %error, "failed to list organization members");
            Vec::new()
        }
    }
}

async fn list_all_members_inner(api: &dyn TeamApi) -> Result<Vec<Member>, ApiError> {
    let mut members = Vec::new();
    let mut page = api.list_members().await?;
    loop {
        members.append(&mut page.members);
        if !page.has_more {
            break;
        }
        page = api.list_members_continue(&page.cursor).await?;
    }
    Ok(members)
}
