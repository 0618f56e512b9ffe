//! # Uploads
//!
//! Files land under the public root, so the returned `/<folder>/<file>` path is
//! directly usable as a static asset url.
//!
//! Nothing is rolled back: if the third file of a submission fails, the first
//! two stay on disk.
use std::{
    path::{Component, Path, PathBuf},
    sync::LazyLock,
};

use regex::Regex;
use tokio::fs;
use tracing::info;
use uuid::Uuid;

use crate::error::StoreError;

pub const CANDIDATES_FOLDER: &str = "candidates";

static UNSAFE_CHARS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^A-Za-z0-9._-]").expect("static regex"));
static REPEATED_DOTS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\.{2,}").expect("static regex"));

/// Documents kept per candidate under `candidates/<id>/`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CandidateDocument {
    ProfileImage,
    Affidavit,
    NominationPaper,
    TaxReturn,
}

impl CandidateDocument {
    pub const ALL: [CandidateDocument; 4] = [
        CandidateDocument::ProfileImage,
        CandidateDocument::Affidavit,
        CandidateDocument::NominationPaper,
        CandidateDocument::TaxReturn,
    ];

    pub fn file_name(self) -> &'static str {
        match self {
            CandidateDocument::ProfileImage => "profile_image.jpg",
            CandidateDocument::Affidavit => "affidavit.pdf",
            CandidateDocument::NominationPaper => "nomination_paper.pdf",
            CandidateDocument::TaxReturn => "tax_return.pdf",
        }
    }

    /// Multipart field carrying this document.
    pub fn field(self) -> &'static str {
        match self {
            CandidateDocument::ProfileImage => "photoFile",
            CandidateDocument::Affidavit => "affidavit",
            CandidateDocument::NominationPaper => "nomination_paper",
            CandidateDocument::TaxReturn => "tax_return",
        }
    }

    pub fn from_field(field: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|doc| doc.field() == field)
    }
}

pub fn candidate_folder(candidate_id: &str) -> String {
    format!("{CANDIDATES_FOLDER}/{}", sanitize_file_name(candidate_id))
}

/// Keeps letters, digits, `.`, `_` and `-`; collapses dot runs so `..` never survives.
pub fn sanitize_file_name(name: &str) -> String {
    let base = name.rsplit(['/', '\\']).next().unwrap_or_default();
    let cleaned = UNSAFE_CHARS.replace_all(base.trim(), "_");
    let cleaned = REPEATED_DOTS.replace_all(&cleaned, ".");

    cleaned.trim_matches('.').to_string()
}

/// Writes `bytes` to `<public_root>/<folder>/<name>` and returns `/<folder>/<name>`.
///
/// `name` is `explicit_name` when given, otherwise `<uuid>-<original name>`.
pub async fn save_uploaded_file(
    public_root: &Path,
    bytes: &[u8],
    original_name: &str,
    folder: &str,
    explicit_name: Option<&str>,
) -> Result<String, StoreError> {
    if bytes.is_empty() {
        return Err(StoreError::InvalidUpload(format!(
            "{original_name} is empty"
        )));
    }

    let folder = safe_folder(folder)?;
    let file_name = match explicit_name {
        Some(name) => sanitize_file_name(name),
        None => {
            let original = sanitize_file_name(original_name);
            if original.is_empty() {
                Uuid::new_v4().to_string()
            } else {
                format!("{}-{original}", Uuid::new_v4())
            }
        }
    };

    if file_name.is_empty() {
        return Err(StoreError::InvalidUpload("empty file name".to_string()));
    }

    let directory = public_root.join(&folder);
    fs::create_dir_all(&directory).await?;
    fs::write(directory.join(&file_name), bytes).await?;

    let public_path = format!("/{}/{file_name}", folder.to_string_lossy().replace('\\', "/"));
    info!("Saved upload {public_path} ({} bytes)", bytes.len());

    Ok(public_path)
}

/// Documents present on disk for a candidate, as `(document, public path)`.
pub async fn existing_documents(
    public_root: &Path,
    candidate_id: &str,
) -> Vec<(CandidateDocument, String)> {
    let folder = candidate_folder(candidate_id);
    let mut found = Vec::new();

    for doc in CandidateDocument::ALL {
        let path = public_root.join(&folder).join(doc.file_name());

        if fs::try_exists(&path).await.unwrap_or(false) {
            found.push((doc, format!("/{folder}/{}", doc.file_name())));
        }
    }

    found
}

fn safe_folder(folder: &str) -> Result<PathBuf, StoreError> {
    let path = Path::new(folder.trim_matches('/'));

    if path.as_os_str().is_empty()
        || !path.components().all(|c| matches!(c, Component::Normal(_)))
    {
        return Err(StoreError::InvalidUpload(format!("invalid folder {folder}")));
    }

    Ok(path.to_path_buf())
}

#[cfg(test)]
mod tests {
    use tempfile::tempdir;

    use super::*;

    #[test]
    fn test_sanitize() {
        assert_eq!(sanitize_file_name("boat.png"), "boat.png");
        assert_eq!(sanitize_file_name("../../etc/passwd"), "passwd");
        assert_eq!(sanitize_file_name("my photo (1).JPG"), "my_photo__1_.JPG");
        assert_eq!(sanitize_file_name("..hidden..png"), "hidden.png");
        assert_eq!(sanitize_file_name(""), "");
    }

    #[tokio::test]
    async fn test_explicit_name_is_predictable() {
        let dir = tempdir().unwrap();

        let path = save_uploaded_file(
            dir.path(),
            b"%PDF-1.4",
            "whatever.pdf",
            &candidate_folder("abc"),
            Some(CandidateDocument::Affidavit.file_name()),
        )
        .await
        .unwrap();

        assert_eq!(path, "/candidates/abc/affidavit.pdf");
        assert!(dir.path().join("candidates/abc/affidavit.pdf").exists());

        let docs = existing_documents(dir.path(), "abc").await;
        assert_eq!(docs, vec![(CandidateDocument::Affidavit, path)]);
    }

    #[tokio::test]
    async fn test_random_names_do_not_collide() {
        let dir = tempdir().unwrap();

        let a = save_uploaded_file(dir.path(), b"png", "boat.png", "symbols", None)
            .await
            .unwrap();
        let b = save_uploaded_file(dir.path(), b"png", "boat.png", "symbols", None)
            .await
            .unwrap();

        assert_ne!(a, b);
        assert!(a.starts_with("/symbols/") && a.ends_with("-boat.png"));
    }

    #[tokio::test]
    async fn test_rejects_empty_and_escaping_uploads() {
        let dir = tempdir().unwrap();

        let empty = save_uploaded_file(dir.path(), b"", "a.png", "symbols", None).await;
        assert!(matches!(empty, Err(StoreError::InvalidUpload(_))));

        let escape = save_uploaded_file(dir.path(), b"x", "a.png", "../outside", None).await;
        assert!(matches!(escape, Err(StoreError::InvalidUpload(_))));
    }
}
