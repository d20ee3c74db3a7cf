//! Integration tests for the search pipeline against a mock provider.
//!
//! These tests exercise the HTTP client, cursor-following enumeration, and
//! the fan-out coordinator end to end with mock API servers.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;
use teamsearch::api::{
    ApiError, DropboxTeamClient, FolderPage, Member, MemberPage, SharedFolderPage, TeamApi,
    list_all_members,
};
use teamsearch::search::{Coordinator, Enumerator, FilterCriteria, RetryPolicy};
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn test_member() -> Member {
    Member {
        team_member_id: "dbmid:test".to_string(),
        email: "ada@example.com".to_string(),
        display_name: "Ada Lovelace".to_string(),
    }
}

/// Retry policy with a tiny backoff so failure-path tests stay fast.
fn fast_retry(max_attempts: u32) -> RetryPolicy {
    RetryPolicy::new(
        max_attempts,
        Duration::from_millis(1),
        Duration::from_millis(5),
        2.0,
    )
}

fn client_for(server: &MockServer) -> Arc<dyn TeamApi> {
    Arc::new(DropboxTeamClient::with_base_urls(
        "test-token",
        server.uri(),
        server.uri(),
    ))
}

fn file_entry_json(name: &str, path_display: &str) -> serde_json::Value {
    json!({
        ".tag": "file",
        "name": name,
        "path_lower": path_display.to_lowercase(),
        "path_display": path_display,
        "size": 2048,
        "client_modified": "2024-03-01T12:00:00Z"
    })
}

/// Mounts an empty shared-folder listing so enumeration reaches the
/// personal root without interference.
async fn mount_no_shared_folders(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/2/sharing/list_folders"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "entries": [] })))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_pagination_visits_every_page_once_in_order() {
    let server = MockServer::start().await;
    mount_no_shared_folders(&server).await;

    Mock::given(method("POST"))
        .and(path("/2/files/list_folder"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "entries": [
                file_entry_json("a.pdf", "/Docs/a.pdf"),
                {".tag": "folder", "name": "Docs", "path_lower": "/docs"}
            ],
            "cursor": "c1",
            "has_more": true
        })))
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/2/files/list_folder/continue"))
        .and(body_partial_json(json!({ "cursor": "c1" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "entries": [file_entry_json("b.pdf", "/Docs/b.pdf")],
            "cursor": "c2",
            "has_more": false
        })))
        .mount(&server)
        .await;

    let enumerator = Enumerator::new(client_for(&server), fast_retry(2));
    let outcome = enumerator
        .enumerate(&test_member(), &FilterCriteria::default())
        .await;

    let names: Vec<&str> = outcome.matches.iter().map(|m| m.name.as_str()).collect();
    assert_eq!(names, vec!["a.pdf", "b.pdf"]);
    assert_eq!(outcome.files_checked, 3);
}

#[tokio::test]
async fn test_filters_applied_and_impersonation_header_sent() {
    let server = MockServer::start().await;
    mount_no_shared_folders(&server).await;

    Mock::given(method("POST"))
        .and(path("/2/files/list_folder"))
        .and(header("Dropbox-API-Select-User", "dbmid:test"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "entries": [
                file_entry_json("invoice_march.pdf", "/Docs/invoice_march.pdf"),
                file_entry_json("invoice_march.txt", "/Docs/invoice_march.txt"),
                file_entry_json("summary.pdf", "/Docs/summary.pdf")
            ],
            "cursor": "c1",
            "has_more": false
        })))
        .mount(&server)
        .await;

    let enumerator = Enumerator::new(client_for(&server), fast_retry(2));
    let criteria = FilterCriteria::new(&["invoice"], &["pdf"]);
    let outcome = enumerator.enumerate(&test_member(), &criteria).await;

    assert_eq!(outcome.matches.len(), 1);
    assert_eq!(outcome.matches[0].name, "invoice_march.pdf");
    assert_eq!(outcome.matches[0].owner.display_name, "Ada Lovelace");
    assert_eq!(outcome.files_checked, 3);
}

#[tokio::test]
async fn test_shared_folder_listing_failure_keeps_personal_matches() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/2/sharing/list_folders"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/2/files/list_folder"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "entries": [file_entry_json("report.pdf", "/report.pdf")],
            "cursor": "c1",
            "has_more": false
        })))
        .mount(&server)
        .await;

    let enumerator = Enumerator::new(client_for(&server), fast_retry(2));
    let outcome = enumerator
        .enumerate(&test_member(), &FilterCriteria::default())
        .await;

    assert_eq!(outcome.matches.len(), 1);
    assert_eq!(outcome.matches[0].name, "report.pdf");
}

#[tokio::test]
async fn test_shared_folder_walked_and_deduplicated_against_personal_tree() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/2/sharing/list_folders"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "entries": [{"shared_folder_id": "sf1", "name": "Shared"}]
        })))
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/2/sharing/get_folder_metadata"))
        .and(body_partial_json(json!({ "shared_folder_id": "sf1" })))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "shared_folder_id": "sf1", "path_lower": "/shared" })),
        )
        .mount(&server)
        .await;

    // The same file is reachable from the personal root and from the
    // shared-folder mount.
    Mock::given(method("POST"))
        .and(path("/2/files/list_folder"))
        .and(body_partial_json(json!({ "path": "" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "entries": [file_entry_json("doc.pdf", "/Shared/doc.pdf")],
            "cursor": "c1",
            "has_more": false
        })))
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/2/files/list_folder"))
        .and(body_partial_json(json!({ "path": "/shared" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "entries": [file_entry_json("doc.pdf", "/Shared/doc.pdf")],
            "cursor": "c2",
            "has_more": false
        })))
        .mount(&server)
        .await;

    let enumerator = Enumerator::new(client_for(&server), fast_retry(2));
    let outcome = enumerator
        .enumerate(&test_member(), &FilterCriteria::default())
        .await;

    assert_eq!(
        outcome.matches.len(),
        1,
        "file reachable via two roots must be counted once"
    );
    assert_eq!(outcome.files_checked, 2);
}

#[tokio::test]
async fn test_transient_listing_error_retried_until_success() {
    let server = MockServer::start().await;
    mount_no_shared_folders(&server).await;

    // Two failures, then the page arrives.
    Mock::given(method("POST"))
        .and(path("/2/files/list_folder"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(2)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/2/files/list_folder"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "entries": [file_entry_json("late.pdf", "/late.pdf")],
            "cursor": "c1",
            "has_more": false
        })))
        .mount(&server)
        .await;

    let enumerator = Enumerator::new(client_for(&server), fast_retry(5));
    let outcome = enumerator
        .enumerate(&test_member(), &FilterCriteria::default())
        .await;

    assert_eq!(outcome.matches.len(), 1);
    assert_eq!(outcome.matches[0].name, "late.pdf");
}

#[tokio::test]
async fn test_persistent_listing_failure_yields_partial_results_not_a_hang() {
    let server = MockServer::start().await;
    mount_no_shared_folders(&server).await;

    Mock::given(method("POST"))
        .and(path("/2/files/list_folder"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let enumerator = Enumerator::new(client_for(&server), fast_retry(3));
    let outcome = enumerator
        .enumerate(&test_member(), &FilterCriteria::default())
        .await;

    // Bounded retry: the member yields empty results instead of looping.
    assert!(outcome.matches.is_empty());
    assert_eq!(outcome.files_checked, 0);
}

#[tokio::test]
async fn test_member_directory_follows_cursor() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/2/team/members/list"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "members": [
                {"profile": {
                    "team_member_id": "dbmid:AAAA",
                    "email": "ada@example.com",
                    "name": {"display_name": "Ada Lovelace"}
                }}
            ],
            "cursor": "m1",
            "has_more": true
        })))
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/2/team/members/list/continue"))
        .and(body_partial_json(json!({ "cursor": "m1" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "members": [
                {"profile": {
                    "team_member_id": "dbmid:BBBB",
                    "email": "grace@example.com",
                    "name": {"display_name": "Grace Hopper"}
                }}
            ],
            "cursor": "m2",
            "has_more": false
        })))
        .mount(&server)
        .await;

    let api = client_for(&server);
    let members = list_all_members(api.as_ref()).await;

    assert_eq!(members.len(), 2);
    assert_eq!(members[0].display_name, "Ada Lovelace");
    assert_eq!(members[1].display_name, "Grace Hopper");
}

#[tokio::test]
async fn test_member_directory_failure_reports_empty() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/2/team/members/list"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let api = client_for(&server);
    let members = list_all_members(api.as_ref()).await;
    assert!(members.is_empty());
}

// ==================== Coordinator fan-out tests ====================

/// Fake API where one member's listing never completes and the rest
/// return a single file each.
struct OneSlowMemberApi {
    slow_member_id: String,
}

#[async_trait]
impl TeamApi for OneSlowMemberApi {
    async fn list_members(&self) -> Result<MemberPage, ApiError> {
        Ok(MemberPage {
            members: Vec::new(),
            cursor: String::new(),
            has_more: false,
        })
    }

    async fn list_members_continue(&self, _cursor: &str) -> Result<MemberPage, ApiError> {
        self.list_members().await
    }

    async fn list_folder(&self, member_id: &str, _path: &str) -> Result<FolderPage, ApiError> {
        if member_id == self.slow_member_id {
            // Far longer than any test timeout; the coordinator must
            // abandon this member.
            tokio::time::sleep(Duration::from_secs(600)).await;
        }
        let page = serde_json::from_value(json!({
            "entries": [{
                ".tag": "file",
                "name": format!("{member_id}.pdf"),
                "path_lower": format!("/{member_id}.pdf"),
                "path_display": format!("/{member_id}.pdf"),
                "size": 1,
                "client_modified": "2024-03-01T12:00:00Z"
            }],
            "cursor": "c",
            "has_more": false
        }))
        .map_err(|e| ApiError::decode("/2/files/list_folder", e))?;
        Ok(page)
    }

    async fn list_folder_continue(
        &self,
        member_id: &str,
        _cursor: &str,
    ) -> Result<FolderPage, ApiError> {
        self.list_folder(member_id, "").await
    }

    async fn list_shared_folders(&self, _member_id: &str) -> Result<SharedFolderPage, ApiError> {
        Ok(SharedFolderPage {
            entries: Vec::new(),
            cursor: None,
        })
    }

    async fn list_shared_folders_continue(
        &self,
        member_id: &str,
        _cursor: &str,
    ) -> Result<SharedFolderPage, ApiError> {
        self.list_shared_folders(member_id).await
    }

    async fn shared_folder_path(
        &self,
        _member_id: &str,
        _shared_folder_id: &str,
    ) -> Result<Option<String>, ApiError> {
        Ok(None)
    }

    async fn download(&self, _member_id: &str, _path: &str) -> Result<Vec<u8>, ApiError> {
        Ok(Vec::new())
    }
}

fn named_member(id: &str) -> Member {
    Member {
        team_member_id: id.to_string(),
        email: format!("{id}@example.com"),
        display_name: id.to_string(),
    }
}

#[tokio::test]
async fn test_timed_out_member_dropped_others_intact() {
    let api: Arc<dyn TeamApi> = Arc::new(OneSlowMemberApi {
        slow_member_id: "slow".to_string(),
    });
    let coordinator = Coordinator::new(
        api,
        3,
        Duration::from_millis(200),
        RetryPolicy::with_max_attempts(1),
    )
    .unwrap();

    let members = [named_member("fast1"), named_member("slow"), named_member("fast2")];
    let report = coordinator
        .search_all(&members, &FilterCriteria::default())
        .await;

    let mut names: Vec<&str> = report.matches.iter().map(|m| m.name.as_str()).collect();
    names.sort_unstable();
    assert_eq!(names, vec!["fast1.pdf", "fast2.pdf"]);
    assert_eq!(report.stats.members_searched(), 2);
    assert_eq!(report.stats.members_timed_out(), 1);
}

#[tokio::test]
async fn test_shutdown_returns_gathered_results() {
    let api: Arc<dyn TeamApi> = Arc::new(OneSlowMemberApi {
        slow_member_id: "slow".to_string(),
    });
    let coordinator = Coordinator::new(
        api,
        3,
        Duration::from_secs(600),
        RetryPolicy::with_max_attempts(1),
    )
    .unwrap();

    // The slow member would block the run for 10 minutes; the shutdown
    // future fires first and the fast member's results are kept.
    let members = [named_member("fast1"), named_member("slow")];
    let report = coordinator
        .search_all_until(
            &members,
            &FilterCriteria::default(),
            tokio::time::sleep(Duration::from_millis(500)),
        )
        .await;

    let names: Vec<&str> = report.matches.iter().map(|m| m.name.as_str()).collect();
    assert_eq!(names, vec!["fast1.pdf"]);
    assert_eq!(report.stats.members_timed_out(), 0);
}
