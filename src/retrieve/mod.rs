//! Retrieval of matched files to the local filesystem.
//!
//! Downloads run strictly sequentially, one file after another. Failures
//! are logged and reported as a boolean outcome rather than raised; a
//! failed download never aborts the rest of the batch. Downloads are not
//! retried.

use std::path::{Path, PathBuf};

use thiserror::Error;
use tokio::fs;
use tracing::{info, instrument, warn};

use crate::api::{ApiError, FileMatch, TeamApi};

/// Errors that can occur while retrieving a file.
#[derive(Debug, Error)]
pub enum RetrieveError {
    /// The provider-side download failed.
    #[error(transparent)]
    Api(#[from] ApiError),

    /// File system error while writing the download.
    #[error("IO error writing to {path}: {source}")]
    Io {
        /// The path where the error occurred.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },
}

/// Fetches matched files and writes them under the output directory.
pub struct Retriever<'a> {
    api: &'a dyn TeamApi,
}

impl<'a> Retriever<'a> {
    /// Creates a retriever over the given API boundary.
    #[must_use]
    pub fn new(api: &'a dyn TeamApi) -> Self {
        Self { api }
    }

    /// Computes the local path for a match: `<output_dir>/<owner>/<name>`.
    #[must_use]
    pub fn local_path(output_dir: &Path, file_match: &FileMatch) -> PathBuf {
        output_dir
            .join(sanitize_component(&file_match.owner.display_name))
            .join(sanitize_component(&file_match.name))
    }

    /// Downloads one match to `local_path`, creating parent directories as
    /// needed and overwriting any existing file.
    ///
    /// Returns `true` on success. Errors are logged, not raised.
    #[instrument(skip(self, file_match), fields(file = %file_match.name, owner = %file_match.owner.display_name))]
    pub async fn download(&self, file_match: &FileMatch, local_path: &Path) -> bool {
        match self.download_inner(file_match, local_path).await {
            Ok(()) => {
                info!(path = %local_path.display(), "downloaded file");
                true
            }
            Err(error) => {
                warn!(
                    file = %file_match.name,
                    error = %error,
                    "failed to download file"
                );
                false
            }
        }
    }

    async fn download_inner(
        &self,
        file_match: &FileMatch,
        local_path: &Path,
    ) -> Result<(), RetrieveError> {
        if let Some(parent) = local_path.parent() {
            // Idempotent when the directory already exists.
            fs::create_dir_all(parent).await.map_err(|source| {
                RetrieveError::Io {
                    path: parent.to_path_buf(),
                    source,
                }
            })?;
        }

        let bytes = self
            .api
            .download(&file_match.owner.team_member_id, &file_match.path_display)
            .await?;

        fs::write(local_path, &bytes)
            .await
            .map_err(|source| RetrieveError::Io {
                path: local_path.to_path_buf(),
                source,
            })?;
        Ok(())
    }
}

/// Makes a name safe to use as a single path component.
fn sanitize_component(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| if matches!(c, '/' | '\\' | '\0') { '_' } else { c })
        .collect();
    let trimmed = cleaned.trim();
    if trimmed.is_empty() {
        "unnamed".to_string()
    } else {
        trimmed.to_string()
    }
}
