//! Domain and wire types for the provider API boundary.
//!
//! Wire shapes follow the provider's JSON: folder entries are an internally
//! tagged union on `.tag`, listings carry a continuation cursor, and file
//! timestamps are RFC 3339.

use chrono::{DateTime, Utc};
use serde::Deserialize;

/// A member of the organization's account.
///
/// Immutable once listed; lives for the duration of one search run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Member {
    /// Stable identifier used for impersonation.
    pub team_member_id: String,
    /// The member's email address.
    pub email: String,
    /// Human-readable display name.
    pub display_name: String,
}

/// A file that passed the configured filters during enumeration.
///
/// Created during enumeration, consumed by the retriever or by result
/// presentation; never mutated.
#[derive(Debug, Clone)]
pub struct FileMatch {
    /// File name (last path component).
    pub name: String,
    /// Display path within the owner's namespace.
    pub path_display: String,
    /// Size in bytes.
    pub size: u64,
    /// Last-modified timestamp reported by the provider.
    pub modified: DateTime<Utc>,
    /// The member whose account the file was found in.
    pub owner: Member,
}

/// One page of an organization member listing.
#[derive(Debug, Clone)]
pub struct MemberPage {
    /// Members on this page.
    pub members: Vec<Member>,
    /// Continuation cursor for the next page.
    pub cursor: String,
    /// Whether more pages exist beyond this one.
    pub has_more: bool,
}

/// A single entry in a folder listing.
///
/// The provider tags entries with `.tag`; anything that is not a regular
/// file is skipped during enumeration, so only files carry payload here.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = ".tag", rename_all = "snake_case")]
pub enum FolderEntry {
    /// A regular file.
    File(FileEntry),
    /// A directory.
    Folder,
    /// Any other entry kind (deleted markers, unknown future tags).
    #[serde(other)]
    Other,
}

/// Metadata for a regular file entry.
#[derive(Debug, Clone, Deserialize)]
pub struct FileEntry {
    /// File name.
    pub name: String,
    /// Lowercased full path, used for filtering and de-duplication.
    pub path_lower: String,
    /// Display-cased full path.
    pub path_display: String,
    /// Size in bytes.
    pub size: u64,
    /// Last-modified timestamp.
    pub client_modified: DateTime<Utc>,
}

/// One page of a folder listing.
#[derive(Debug, Clone, Deserialize)]
pub struct FolderPage {
    /// Entries on this page, in provider listing order.
    pub entries: Vec<FolderEntry>,
    /// Continuation cursor; only meaningful while `has_more` is true.
    pub cursor: String,
    /// Whether more entries exist beyond this page.
    pub has_more: bool,
}

/// A shared folder mounted into a member's namespace.
#[derive(Debug, Clone, Deserialize)]
pub struct SharedFolderEntry {
    /// Stable shared-folder identifier for metadata lookups.
    pub shared_folder_id: String,
    /// Folder name.
    pub name: String,
}

/// One page of a shared-folder listing.
///
/// Unlike folder listings, the cursor's absence is the end-of-listing
/// signal here; there is no `has_more` flag on the wire.
#[derive(Debug, Clone, Deserialize)]
pub struct SharedFolderPage {
    /// Shared folders on this page.
    pub entries: Vec<SharedFolderEntry>,
    /// Continuation cursor; `None` means the listing is exhausted.
    #[serde(default)]
    pub cursor: Option<String>,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_folder_entry_file_deserializes() {
        let json = r#"{
            ".tag": "file",
            "name": "invoice_march.pdf",
            "path_lower": "/docs/invoice_march.pdf",
            "path_display": "/Docs/invoice_march.pdf",
            "size": 4096,
            "client_modified": "2024-03-01T12:00:00Z",
            "rev": "0123456789abcdef"
        }"#;
        let entry: FolderEntry = serde_json::from_str(json).unwrap();
        match entry {
            FolderEntry::File(file) => {
                assert_eq!(file.name, "invoice_march.pdf");
                assert_eq!(file.path_lower, "/docs/invoice_march.pdf");
                assert_eq!(file.size, 4096);
            }
            other => panic!("Expected File entry, got: {other:?}"),
        }
    }

    #[test]
    fn test_folder_entry_folder_deserializes() {
        let json = r#"{
            ".tag": "folder",
            "name": "Docs",
            "path_lower": "/docs",
            "path_display": "/Docs"
        }"#;
        let entry: FolderEntry = serde_json::from_str(json).unwrap();
        assert!(matches!(entry, FolderEntry::Folder));
    }

    #[test]
    fn test_folder_entry_unknown_tag_falls_through() {
        let json = r#"{".tag": "deleted", "name": "gone.txt"}"#;
        let entry: FolderEntry = serde_json::from_str(json).unwrap();
        assert!(matches!(entry, FolderEntry::Other));
    }

    #[test]
    fn test_folder_page_deserializes() {
        let json = r#"{
            "entries": [],
            "cursor": "AAA123",
            "has_more": true
        }"#;
        let page: FolderPage = serde_json::from_str(json).unwrap();
        assert!(page.entries.is_empty());
        assert_eq!(page.cursor, "AAA123");
        assert!(page.has_more);
    }

    #[test]
    fn test_shared_folder_page_without_cursor() {
        let json = r#"{
            "entries": [
                {"shared_folder_id": "84528192421", "name": "Design Assets"}
            ]
        }"#;
        let page: SharedFolderPage = serde_json::from_str(json).unwrap();
        assert_eq!(page.entries.len(), 1);
        assert_eq!(page.entries[0].shared_folder_id, "84528192421");
        assert!(page.cursor.is_none());
    }
}
