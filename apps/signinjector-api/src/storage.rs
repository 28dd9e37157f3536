//! File storage for uploaded originals and signed outputs
//!
//! All documents live flat in one directory; a document id is simply a file
//! name inside it. Ids that are not plain file names never resolve.

use std::path::{Path, PathBuf};

use chrono::Utc;
use serde::Serialize;
use tokio::fs;
use uuid::Uuid;

use crate::error::ApiError;

/// File name of the demo document written at startup
pub const SAMPLE_DOCUMENT_ID: &str = "sample-a4.pdf";

/// Public route prefix the upload directory is served under
pub const PUBLIC_PREFIX: &str = "/uploads";

/// A file written into storage
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredArtifact {
    pub file_name: String,
    pub url: String,
}

impl StoredArtifact {
    fn new(file_name: String) -> Self {
        let url = format!("{}/{}", PUBLIC_PREFIX, file_name);
        Self { file_name, url }
    }
}

#[derive(Debug, Clone)]
pub struct Storage {
    root: PathBuf,
}

/// `<unix-millis>-<8 hex chars>`, unique enough for concurrent writers
fn unique_stem() -> String {
    let id = Uuid::new_v4().simple().to_string();
    format!("{}-{}", Utc::now().timestamp_millis(), &id[..8])
}

/// Keep ASCII letters, digits, `.`, `_` and `-`; collapse everything else to `-`
pub fn sanitize_file_name(name: &str) -> String {
    let base = Path::new(name)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("");

    let mut out = String::with_capacity(base.len());
    for c in base.chars() {
        let keep = c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-');
        if keep {
            out.push(c);
        } else if !out.ends_with('-') {
            out.push('-');
        }
    }

    let out = out.trim_matches(|c| c == '-' || c == '.').to_string();
    if out.is_empty() {
        "document.pdf".to_string()
    } else {
        out
    }
}

/// True when `id` names a file directly inside the storage root
fn is_plain_file_name(id: &str) -> bool {
    !id.is_empty()
        && id != "."
        && id != ".."
        && !id.contains(['/', '\\', '\0'])
        && Path::new(id).file_name().and_then(|n| n.to_str()) == Some(id)
}

impl Storage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub async fn ensure_dir(&self) -> std::io::Result<()> {
        fs::create_dir_all(&self.root).await
    }

    /// Path of an existing stored document
    pub async fn resolve_document(&self, id: &str) -> Option<PathBuf> {
        if !is_plain_file_name(id) {
            return None;
        }
        let path = self.root.join(id);
        match fs::metadata(&path).await {
            Ok(meta) if meta.is_file() => Some(path),
            _ => None,
        }
    }

    /// Read a stored document, refusing anything over `max_bytes`
    pub async fn read_document(&self, id: &str, max_bytes: usize) -> Result<Vec<u8>, ApiError> {
        let path = self
            .resolve_document(id)
            .await
            .ok_or_else(|| ApiError::PdfNotFound(id.to_string()))?;

        let size = fs::metadata(&path).await?.len();
        if size > max_bytes as u64 {
            tracing::warn!(id, size, limit = max_bytes, "Stored PDF over size limit");
            return Err(ApiError::PdfTooLarge { limit: max_bytes });
        }

        Ok(fs::read(&path).await?)
    }

    pub async fn write_signed(&self, bytes: &[u8]) -> std::io::Result<StoredArtifact> {
        let file_name = format!("signed-{}.pdf", unique_stem());
        fs::write(self.root.join(&file_name), bytes).await?;
        Ok(StoredArtifact::new(file_name))
    }

    pub async fn write_upload(
        &self,
        original_name: &str,
        bytes: &[u8],
    ) -> std::io::Result<StoredArtifact> {
        let file_name = format!("{}-{}", unique_stem(), sanitize_file_name(original_name));
        fs::write(self.root.join(&file_name), bytes).await?;
        Ok(StoredArtifact::new(file_name))
    }

    /// Delete a file previously written into storage
    pub async fn remove(&self, file_name: &str) -> std::io::Result<()> {
        fs::remove_file(self.root.join(file_name)).await
    }

    /// Write the demo document unless it is already present
    ///
    /// Returns whether a new file was written.
    pub async fn ensure_sample(&self) -> anyhow::Result<bool> {
        if self.resolve_document(SAMPLE_DOCUMENT_ID).await.is_some() {
            return Ok(false);
        }
        let bytes = signinjector_core::sample_document()?;
        fs::write(self.root.join(SAMPLE_DOCUMENT_ID), bytes).await?;
        Ok(true)
    }
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        /// Any client-supplied name becomes a plain file name inside the root
        #[test]
        fn sanitized_names_stay_in_root(name in ".{0,64}") {
            let sanitized = sanitize_file_name(&name);
            prop_assert!(is_plain_file_name(&sanitized), "{:?} -> {:?}", name, sanitized);
            prop_assert!(sanitized
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-')));
        }
    }
}
