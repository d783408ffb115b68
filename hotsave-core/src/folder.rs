//! Dataset folder identifiers.
//!
//! A folder identifier names the on-disk directory of a dataset (not its
//! display name). It is what the rejoin path reopens, so it must be a
//! single plain path component.

use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// File whose presence marks a directory as a genuine dataset root.
pub const DATASET_MARKER: &str = "level.dat";

/// Last-resort identifier when neither the disk nor the display name yields one.
pub const DEFAULT_FOLDER_ID: &str = "world";

/// How many parent directories resolution inspects above the candidate.
const MAX_ASCENT: usize = 4;

/// A validated dataset folder identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct FolderId(String);

impl FolderId {
    /// Validate `raw`; rejects blank, `.`, `..` and anything containing a
    /// path separator.
    pub fn parse(raw: &str) -> Result<Self, CoreError> {
        if is_valid(raw) {
            Ok(Self(raw.to_string()))
        } else {
            Err(CoreError::InvalidFolderId(raw.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Resolve the identifier for a live dataset.
    ///
    /// Walks upward from `candidate_root` looking for [`DATASET_MARKER`];
    /// the first directory holding it names the dataset. Falls back to the
    /// display name, then to [`DEFAULT_FOLDER_ID`]. Every candidate is
    /// validated before it is accepted.
    pub fn resolve(candidate_root: Option<&Path>, display_name: Option<&str>) -> Self {
        if let Some(found) = candidate_root.and_then(find_marked_root) {
            return found;
        }

        if let Some(name) = display_name {
            match Self::parse(name) {
                Ok(id) => {
                    tracing::debug!(folder = %id, "folder id resolved from display name");
                    return id;
                }
                Err(err) => tracing::warn!(error = %err, "display name unusable as folder id"),
            }
        }

        tracing::warn!(
            fallback = DEFAULT_FOLDER_ID,
            "could not resolve dataset folder id, using default",
        );
        Self(DEFAULT_FOLDER_ID.to_string())
    }
}

fn find_marked_root(start: &Path) -> Option<FolderId> {
    for dir in start.ancestors().take(MAX_ASCENT + 1) {
        if !dir.join(DATASET_MARKER).is_file() {
            continue;
        }
        // `Path::file_name` is `None` for `..` and roots; treat those as a miss.
        let name = dir.file_name().and_then(|n| n.to_str())?;
        return match FolderId::parse(name) {
            Ok(id) => {
                tracing::debug!(folder = %id, root = %dir.display(), "dataset root located");
                Some(id)
            }
            Err(err) => {
                tracing::warn!(error = %err, "dataset root has an unusable folder name");
                None
            }
        };
    }
    None
}

fn is_valid(raw: &str) -> bool {
    !raw.trim().is_empty() && raw != "." && raw != ".." && !raw.contains(['/', '\\'])
}

impl fmt::Display for FolderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl TryFrom<String> for FolderId {
    type Error = CoreError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<FolderId> for String {
    fn from(id: FolderId) -> Self {
        id.0
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use rstest::rstest;
    use tempfile::TempDir;

    use super::*;

    #[rstest]
    #[case("")]
    #[case("   ")]
    #[case(".")]
    #[case("..")]
    #[case("a/b")]
    #[case("a\\b")]
    fn rejects_unsafe_identifiers(#[case] raw: &str) {
        assert!(FolderId::parse(raw).is_err(), "{raw:?} must be rejected");
    }

    #[rstest]
    #[case("New World")]
    #[case("world")]
    #[case("...")]
    #[case("Alpha-2")]
    fn accepts_plain_tokens(#[case] raw: &str) {
        assert_eq!(FolderId::parse(raw).expect("valid").as_str(), raw);
    }

    #[test]
    fn resolve_walks_up_to_marked_root() {
        let saves = TempDir::new().expect("saves");
        let root = saves.path().join("Survival_1");
        let nested = root.join("region").join("deep");
        fs::create_dir_all(&nested).expect("mkdir");
        fs::write(root.join(DATASET_MARKER), b"").expect("marker");

        let id = FolderId::resolve(Some(&nested), Some("My Survival"));
        assert_eq!(id.as_str(), "Survival_1");
    }

    #[test]
    fn resolve_falls_back_to_display_name_then_default() {
        let empty = TempDir::new().expect("empty");
        let id = FolderId::resolve(Some(empty.path()), Some("Display"));
        assert_eq!(id.as_str(), "Display");

        let id = FolderId::resolve(Some(empty.path()), Some("bad/name"));
        assert_eq!(id.as_str(), DEFAULT_FOLDER_ID);

        let id = FolderId::resolve(None, None);
        assert_eq!(id.as_str(), DEFAULT_FOLDER_ID);
    }

    #[test]
    fn deserialize_validates() {
        let ok: Result<FolderId, _> = serde_yaml::from_str("\"Alpha\"");
        assert!(ok.is_ok());
        let bad: Result<FolderId, _> = serde_yaml::from_str("\"..\"");
        assert!(bad.is_err());
    }
}
