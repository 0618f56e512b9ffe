use std::path::Path;

use indicatif::{ProgressBar, ProgressStyle};
use serde::de::DeserializeOwned;

pub async fn read_records<T: DeserializeOwned>(path: &Path) -> anyhow::Result<Vec<T>> {
    let raw = tokio::fs::read_to_string(path).await?;

    Ok(serde_json::from_str(&raw)?)
}

pub fn progress_bar(len: u64) -> ProgressBar {
    let pb = ProgressBar::new(len);
    let style = ProgressStyle::with_template(
        "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}",
    )
    .unwrap_or_else(|_| ProgressStyle::default_bar())
    .progress_chars("=> ");

    pb.set_style(style);
    pb
}

#[cfg(test)]
mod tests {
    use registry::{Candidate, Sign};
    use tempfile::tempdir;

    use super::read_records;

    #[tokio::test]
    async fn test_numeric_ids_become_strings() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("signs.json");
        std::fs::write(&path, r#"[{"id": 7, "name": "Boat", "imageUrl": "boat.png"}]"#).unwrap();

        let signs: Vec<Sign> = read_records(&path).await.unwrap();

        assert_eq!(signs[0].id, "7");
        assert_eq!(signs[0].resolved_image_url(), "/symbols/boat.png");
    }

    #[tokio::test]
    async fn test_candidate_without_sign() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("candidates.json");
        std::fs::write(
            &path,
            r#"[{"id": "c1", "name": "Jane", "party": "Independent", "photoUrl": "", "assignedCenterId": 3}]"#,
        )
        .unwrap();

        let candidates: Vec<Candidate> = read_records(&path).await.unwrap();

        assert_eq!(candidates[0].assigned_center_id, "3");
        assert!(candidates[0].sign_id.is_none());
    }

    #[tokio::test]
    async fn test_not_an_array() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("bad.json");
        std::fs::write(&path, r#"{"id": 1}"#).unwrap();

        assert!(read_records::<Sign>(&path).await.is_err());
    }
}
