//! HTTP implementation of the provider API boundary.
//!
//! All listing operations are RPC-style POSTs against the provider's API
//! host; file content comes from a separate content host. Per-member calls
//! impersonate the member by attaching their stable identifier in the
//! `Dropbox-API-Select-User` header.

use async_trait::async_trait;
use reqwest::header::{HeaderValue, RETRY_AFTER};
use reqwest::{Client, ClientBuilder};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::json;
use std::time::Duration;
use tracing::{debug, instrument};

use super::error::ApiError;
use super::types::{FolderPage, Member, MemberPage, SharedFolderPage};
use super::TeamApi;

/// Connect timeout for all provider calls.
const CONNECT_TIMEOUT_SECS: u64 = 30;

/// Read timeout; generous because recursive listings of large accounts
/// can take a while per page.
const READ_TIMEOUT_SECS: u64 = 120;

/// Production API host for RPC-style endpoints.
const DEFAULT_API_BASE: &str = "https://api.dropboxapi.com";

/// Production content host for file downloads.
const DEFAULT_CONTENT_BASE: &str = "https://content.dropboxapi.com";

/// Header selecting which team member a call acts as.
const SELECT_USER_HEADER: &str = "Dropbox-API-Select-User";

/// Header carrying the JSON argument for content-endpoint calls.
const API_ARG_HEADER: &str = "Dropbox-API-Arg";

/// Team-scoped client for the provider's HTTP API.
///
/// Designed to be created once and shared across enumeration tasks via
/// `Arc`, taking advantage of connection pooling.
#[derive(Debug, Clone)]
pub struct DropboxTeamClient {
    http: Client,
    token: String,
    api_base: String,
    content_base: String,
}

impl DropboxTeamClient {
    /// Creates a client against the production API hosts.
    ///
    /// # Panics
    ///
    /// Panics if the HTTP client builder fails to build with the static
    /// configuration. This should never happen in practice.
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn new(token: impl Into<String>) -> Self {
        Self::with_base_urls(token, DEFAULT_API_BASE, DEFAULT_CONTENT_BASE)
    }

    /// Creates a client with explicit API and content base URLs.
    ///
    /// Used by tests to point the client at a local mock server.
    ///
    /// # Panics
    ///
    /// Panics if the HTTP client builder fails to build with the static
    /// configuration. This should never happen in practice.
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn with_base_urls(
        token: impl Into<String>,
        api_base: impl Into<String>,
        content_base: impl Into<String>,
    ) -> Self {
        let http = ClientBuilder::new()
            .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
            .timeout(Duration::from_secs(READ_TIMEOUT_SECS))
            .gzip(true)
            .build()
            .expect("failed to build HTTP client with static configuration");

        Self {
            http,
            token: token.into(),
            api_base: trim_trailing_slash(api_base.into()),
            content_base: trim_trailing_slash(content_base.into()),
        }
    }

    /// Issues an RPC-style POST and decodes the JSON response.
    ///
    /// `member_id` attaches the impersonation header when present; team-level
    /// endpoints pass `None`.
    async fn rpc<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        member_id: Option<&str>,
        body: serde_json::Value,
    ) -> Result<T, ApiError> {
        let url = format!("{}{endpoint}", self.api_base);

        let mut request = self.http.post(&url).bearer_auth(&self.token).json(&body);
        if let Some(member_id) = member_id {
            request = request.header(SELECT_USER_HEADER, header_value(endpoint, member_id)?);
        }

        let response = request
            .send()
            .await
            .map_err(|e| ApiError::from_reqwest(endpoint, e))?;

        let status = response.status();
        if !status.is_success() {
            let retry_after = retry_after_header(&response);
            debug!(endpoint, status = status.as_u16(), "provider returned error status");
            return Err(ApiError::http_status_with_retry_after(
                endpoint,
                status.as_u16(),
                retry_after,
            ));
        }

        let text = response
            .text()
            .await
            .map_err(|e| ApiError::from_reqwest(endpoint, e))?;
        serde_json::from_str(&text).map_err(|e| ApiError::decode(endpoint, e))
    }
}

#[async_trait]
impl TeamApi for DropboxTeamClient {
    #[instrument(level = "debug", skip(self))]
    async fn list_members(&self) -> Result<MemberPage, ApiError> {
        let response: MembersListResponse = self
            .rpc("/2/team/members/list", None, json!({ "limit": 100 }))
            .await?;
        Ok(response.into_page())
    }

    #[instrument(level = "debug", skip(self, cursor))]
    async fn list_members_continue(&self, cursor: &str) -> Result<MemberPage, ApiError> {
        let response: MembersListResponse = self
            .rpc(
                "/2/team/members/list/continue",
                None,
                json!({ "cursor": cursor }),
            )
            .await?;
        Ok(response.into_page())
    }

    #[instrument(level = "debug", skip(self))]
    async fn list_folder(&self, member_id: &str, path: &str) -> Result<FolderPage, ApiError> {
        self.rpc(
            "/2/files/list_folder",
            Some(member_id),
            json!({ "path": path, "recursive": true }),
        )
        .await
    }

    #[instrument(level = "debug", skip(self, cursor))]
    async fn list_folder_continue(
        &self,
        member_id: &str,
        cursor: &str,
    ) -> Result<FolderPage, ApiError> {
        self.rpc(
            "/2/files/list_folder/continue",
            Some(member_id),
            json!({ "cursor": cursor }),
        )
        .await
    }

    #[instrument(level = "debug", skip(self))]
    async fn list_shared_folders(&self, member_id: &str) -> Result<SharedFolderPage, ApiError> {
        self.rpc(
            "/2/sharing/list_folders",
            Some(member_id),
            json!({ "limit": 100 }),
        )
        .await
    }

    #[instrument(level = "debug", skip(self, cursor))]
    async fn list_shared_folders_continue(
        &self,
        member_id: &str,
        cursor: &str,
    ) -> Result<SharedFolderPage, ApiError> {
        self.rpc(
            "/2/sharing/list_folders/continue",
            Some(member_id),
            json!({ "cursor": cursor }),
        )
        .await
    }

    #[instrument(level = "debug", skip(self))]
    async fn shared_folder_path(
        &self,
        member_id: &str,
        shared_folder_id: &str,
    ) -> Result<Option<String>, ApiError> {
        let response: SharedFolderMetadataResponse = self
            .rpc(
                "/2/sharing/get_folder_metadata",
                Some(member_id),
                json!({ "shared_folder_id": shared_folder_id }),
            )
            .await?;
        // Unmounted shared folders have no path in the member's namespace.
        Ok(response.path_lower)
    }

    #[instrument(level = "debug", skip(self))]
    async fn download(&self, member_id: &str, path: &str) -> Result<Vec<u8>, ApiError> {
        let endpoint = "/2/files/download";
        let url = format!("{}{endpoint}", self.content_base);
        let arg = json!({ "path": path }).to_string();

        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.token)
            .header(SELECT_USER_HEADER, header_value(endpoint, member_id)?)
            .header(API_ARG_HEADER, header_value(endpoint, &arg)?)
            .send()
            .await
            .map_err(|e| ApiError::from_reqwest(endpoint, e))?;

        let status = response.status();
        if !status.is_success() {
            let retry_after = retry_after_header(&response);
            return Err(ApiError::http_status_with_retry_after(
                endpoint,
                status.as_u16(),
                retry_after,
            ));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| ApiError::from_reqwest(endpoint, e))?;
        Ok(bytes.to_vec())
    }
}

/// Builds a header value, surfacing unencodable input as a structured error.
fn header_value(endpoint: &str, value: &str) -> Result<HeaderValue, ApiError> {
    HeaderValue::from_str(value).map_err(|_| ApiError::invalid_header(endpoint, value))
}

/// Extracts the Retry-After header from a response, if present and readable.
fn retry_after_header(response: &reqwest::Response) -> Option<String> {
    response
        .headers()
        .get(RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

fn trim_trailing_slash(mut base: String) -> String {
    while base.ends_with('/') {
        base.pop();
    }
    base
}

// ==================== Wire types ====================
//
// Member listings nest the interesting fields under `profile`; the flat
// [`Member`] domain type is built here so callers never see the nesting.

#[derive(Debug, Deserialize)]
struct MembersListResponse {
    members: Vec<TeamMemberEntry>,
    cursor: String,
    has_more: bool,
}

#[derive(Debug, Deserialize)]
struct TeamMemberEntry {
    profile: MemberProfile,
}

#[derive(Debug, Deserialize)]
struct MemberProfile {
    team_member_id: String,
    email: String,
    name: MemberName,
}

#[derive(Debug, Deserialize)]
struct MemberName {
    display_name: String,
}

#[derive(Debug, Deserialize)]
struct SharedFolderMetadataResponse {
    #[serde(default)]
    path_lower: Option<String>,
}

impl MembersListResponse {
    fn into_page(self) -> MemberPage {
        let members = self
            .members
            .into_iter()
            .map(|entry| Member {
                team_member_id: entry.profile.team_member_id,
                email: entry.profile.email,
                display_name: entry.profile.name.display_name,
            })
            .collect();
        MemberPage {
            members,
            cursor: self.cursor,
            has_more: self.has_more,
        }
    }
}
