//! Bug record store — the JSON work file is the sole persistence layer.
//!
//! The file holds either an array of records or a single object (legacy
//! variant, preserved on save). It is rewritten in full after every status
//! transition so a crash leaves it at the last completed transition and a
//! rerun naturally resumes.

use crate::error::{Result, SleuthError};
use crate::finding::Finding;
use crate::io;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

// ---------------------------------------------------------------------------
// BugStatus
// ---------------------------------------------------------------------------

/// Lifecycle status. Ordering matters: transitions are monotonic
/// todo → in-progress → done, never backward.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "kebab-case")]
pub enum BugStatus {
    #[default]
    Todo,
    InProgress,
    Done,
}

impl fmt::Display for BugStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            BugStatus::Todo => "todo",
            BugStatus::InProgress => "in-progress",
            BugStatus::Done => "done",
        };
        f.write_str(s)
    }
}

// ---------------------------------------------------------------------------
// BugRecord
// ---------------------------------------------------------------------------

/// One unit of work: a suspected defect plus target repositories.
///
/// Field names mirror the wire format (camelCase, plus the historical
/// `bug-details` key).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BugRecord {
    pub title: String,
    pub description: String,
    #[serde(default)]
    pub status: BugStatus,
    #[serde(default, rename = "localRepoUrls", skip_serializing_if = "Vec::is_empty")]
    pub local_repo_urls: Vec<String>,
    /// Legacy singular spelling, still accepted and preserved on save.
    #[serde(default, rename = "localRepoUrl", skip_serializing_if = "Option::is_none")]
    pub local_repo_url: Option<String>,
    #[serde(default, rename = "imagePaths", skip_serializing_if = "Option::is_none")]
    pub image_paths: Option<Vec<String>>,
    #[serde(default, rename = "bug-details", skip_serializing_if = "Option::is_none")]
    pub bug_details: Option<Finding>,
}

impl BugRecord {
    /// All repository paths for this bug: the plural field followed by the
    /// legacy singular one, deduplicated preserving order.
    pub fn repo_urls(&self) -> Vec<&str> {
        let mut urls: Vec<&str> = Vec::new();
        for url in self
            .local_repo_urls
            .iter()
            .map(String::as_str)
            .chain(self.local_repo_url.as_deref())
        {
            if !urls.contains(&url) {
                urls.push(url);
            }
        }
        urls
    }

    pub fn image_paths(&self) -> &[String] {
        self.image_paths.as_deref().unwrap_or(&[])
    }

    /// Validate required fields. `index` is the record's position in the
    /// file, used to qualify error messages.
    pub fn validate(&self, index: usize) -> Result<()> {
        if self.title.trim().is_empty() {
            return Err(SleuthError::InvalidField {
                index,
                field: "title",
                reason: "must be a non-empty string".into(),
            });
        }
        if self.description.trim().is_empty() {
            return Err(SleuthError::InvalidField {
                index,
                field: "description",
                reason: "must be a non-empty string".into(),
            });
        }
        if self.repo_urls().is_empty() {
            return Err(SleuthError::InvalidField {
                index,
                field: "localRepoUrls",
                reason: "must list at least one repository path".into(),
            });
        }
        Ok(())
    }

    /// Advance the status. Forward moves and same-state writes are allowed;
    /// any regression is an error.
    pub fn transition(&mut self, to: BugStatus) -> Result<()> {
        if to < self.status {
            return Err(SleuthError::InvalidTransition {
                from: self.status.to_string(),
                to: to.to_string(),
            });
        }
        self.status = to;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// BugFile
// ---------------------------------------------------------------------------

/// The bug work file, loaded in full and rewritten in full.
#[derive(Debug)]
pub struct BugFile {
    path: PathBuf,
    pub records: Vec<BugRecord>,
    /// The file held a single object rather than an array; saved back in
    /// the same shape.
    single: bool,
}

impl BugFile {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| SleuthError::InvalidBugFile(format!("{}: {e}", path.display())))?;
        let value: serde_json::Value = serde_json::from_str(&raw)
            .map_err(|e| SleuthError::InvalidBugFile(format!("malformed JSON: {e}")))?;

        let (elements, single) = match value {
            serde_json::Value::Array(items) => (items, false),
            obj @ serde_json::Value::Object(_) => (vec![obj], true),
            _ => {
                return Err(SleuthError::InvalidBugFile(
                    "expected a JSON array of bug records (or a single object)".into(),
                ))
            }
        };

        let mut records = Vec::with_capacity(elements.len());
        for (index, element) in elements.into_iter().enumerate() {
            let record: BugRecord = serde_json::from_value(element)
                .map_err(|e| SleuthError::InvalidBugFile(format!("bug[{index}]: {e}")))?;
            record.validate(index)?;
            records.push(record);
        }

        Ok(Self {
            path: path.to_path_buf(),
            records,
            single,
        })
    }

    /// Rewrite the file, pretty-printed, in the shape it was read in.
    pub fn save(&self) -> Result<()> {
        let json = if self.single {
            serde_json::to_string_pretty(&self.records[0])?
        } else {
            serde_json::to_string_pretty(&self.records)?
        };
        io::atomic_write(&self.path, format!("{json}\n").as_bytes())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write_file(dir: &TempDir, content: &str) -> PathBuf {
        let path = dir.path().join("bugs.json");
        std::fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn load_valid_array() {
        let dir = TempDir::new().unwrap();
        let path = write_file(
            &dir,
            r#"[{"title":"T","description":"D","localRepoUrls":["/repo"]}]"#,
        );
        let file = BugFile::load(&path).unwrap();
        assert_eq!(file.records.len(), 1);
        assert_eq!(file.records[0].title, "T");
        assert_eq!(file.records[0].status, BugStatus::Todo);
        assert_eq!(file.records[0].repo_urls(), vec!["/repo"]);
    }

    #[test]
    fn load_legacy_single_object() {
        let dir = TempDir::new().unwrap();
        let path = write_file(&dir, r#"{"title":"T","description":"D","localRepoUrl":"/r"}"#);
        let file = BugFile::load(&path).unwrap();
        assert_eq!(file.records.len(), 1);
        assert_eq!(file.records[0].repo_urls(), vec!["/r"]);
    }

    #[test]
    fn load_merges_plural_and_legacy_singular_deduped() {
        let dir = TempDir::new().unwrap();
        let path = write_file(
            &dir,
            r#"[{"title":"T","description":"D","localRepoUrls":["/a","/b"],"localRepoUrl":"/a"}]"#,
        );
        let file = BugFile::load(&path).unwrap();
        assert_eq!(file.records[0].repo_urls(), vec!["/a", "/b"]);
    }

    #[test]
    fn load_rejects_empty_title_with_field_qualified_error() {
        let dir = TempDir::new().unwrap();
        let path = write_file(
            &dir,
            r#"[{"title":"  ","description":"D","localRepoUrls":["/r"]}]"#,
        );
        let err = BugFile::load(&path).unwrap_err().to_string();
        assert!(err.contains("bug[0].title"), "got: {err}");
    }

    #[test]
    fn load_rejects_missing_repos() {
        let dir = TempDir::new().unwrap();
        let path = write_file(&dir, r#"[{"title":"T","description":"D"}]"#);
        let err = BugFile::load(&path).unwrap_err().to_string();
        assert!(err.contains("bug[0].localRepoUrls"), "got: {err}");
    }

    #[test]
    fn load_rejects_non_array_non_object() {
        let dir = TempDir::new().unwrap();
        let path = write_file(&dir, r#""just a string""#);
        assert!(BugFile::load(&path).is_err());
    }

    #[test]
    fn load_rejects_malformed_json() {
        let dir = TempDir::new().unwrap();
        let path = write_file(&dir, "{not json");
        let err = BugFile::load(&path).unwrap_err().to_string();
        assert!(err.contains("malformed JSON"), "got: {err}");
    }

    #[test]
    fn round_trip_preserves_records() {
        let dir = TempDir::new().unwrap();
        let path = write_file(
            &dir,
            r#"[{"title":"T","description":"D","status":"in-progress","localRepoUrls":["/r"],"imagePaths":["/i.png"]}]"#,
        );
        let file = BugFile::load(&path).unwrap();
        file.save().unwrap();
        let reloaded = BugFile::load(&path).unwrap();
        assert_eq!(reloaded.records.len(), 1);
        assert_eq!(reloaded.records[0].status, BugStatus::InProgress);
        assert_eq!(
            reloaded.records[0].image_paths(),
            &["/i.png".to_string()][..]
        );
    }

    #[test]
    fn round_trip_preserves_single_object_shape() {
        let dir = TempDir::new().unwrap();
        let path = write_file(&dir, r#"{"title":"T","description":"D","localRepoUrl":"/r"}"#);
        let file = BugFile::load(&path).unwrap();
        file.save().unwrap();
        let raw = std::fs::read_to_string(&path).unwrap();
        assert!(raw.trim_start().starts_with('{'), "kept object shape");
        BugFile::load(&path).unwrap();
    }

    #[test]
    fn transition_forward_and_same_state() {
        let mut record = BugRecord {
            title: "T".into(),
            description: "D".into(),
            status: BugStatus::Todo,
            local_repo_urls: vec!["/r".into()],
            local_repo_url: None,
            image_paths: None,
            bug_details: None,
        };
        record.transition(BugStatus::InProgress).unwrap();
        record.transition(BugStatus::InProgress).unwrap();
        record.transition(BugStatus::Done).unwrap();
        assert_eq!(record.status, BugStatus::Done);
    }

    #[test]
    fn transition_never_regresses() {
        let mut record = BugRecord {
            title: "T".into(),
            description: "D".into(),
            status: BugStatus::Done,
            local_repo_urls: vec!["/r".into()],
            local_repo_url: None,
            image_paths: None,
            bug_details: None,
        };
        let err = record.transition(BugStatus::InProgress).unwrap_err();
        assert!(err.to_string().contains("never moves backward"));
        assert_eq!(record.status, BugStatus::Done);
    }

    #[test]
    fn status_serializes_kebab_case() {
        assert_eq!(
            serde_json::to_string(&BugStatus::InProgress).unwrap(),
            r#""in-progress""#
        );
        let parsed: BugStatus = serde_json::from_str(r#""in-progress""#).unwrap();
        assert_eq!(parsed, BugStatus::InProgress);
    }

    #[test]
    fn null_bug_details_is_accepted() {
        let dir = TempDir::new().unwrap();
        let path = write_file(
            &dir,
            r#"[{"title":"T","description":"D","localRepoUrls":["/r"],"bug-details":null}]"#,
        );
        let file = BugFile::load(&path).unwrap();
        assert!(file.records[0].bug_details.is_none());
    }
}
