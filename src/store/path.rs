use std::fmt;

use crate::error::AppError;
use crate::models::record::{Collection, RecordKey};

/// Top-level node holding one subtree per owner.
pub const OWNERS_ROOT: &str = "owners";

/// Child collection holding a project's comments.
pub const COMMENTS: &str = "comments";

const MAX_KEY_BYTES: usize = 768;

/// A validated, slash-delimited location in the document tree.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StorePath {
    segments: Vec<String>,
}

impl StorePath {
    /// Parse a slash-delimited path. Leading and trailing slashes are ignored.
    pub fn parse(raw: &str) -> Result<Self, AppError> {
        let mut path = Self { segments: vec![] };
        for segment in raw.split('/').filter(|s| !s.is_empty()) {
            path = path.child(segment)?;
        }
        Ok(path)
    }

    /// The `owners` node.
    pub fn owners() -> Self {
        Self {
            segments: vec![OWNERS_ROOT.to_string()],
        }
    }

    /// `owners/{ownerId}`
    pub fn owner(owner_id: &str) -> Result<Self, AppError> {
        Self::owners().child(owner_id)
    }

    /// `owners/{ownerId}/{collection}`
    pub fn collection(owner_id: &str, collection: Collection) -> Result<Self, AppError> {
        Self::owner(owner_id)?.child(collection.segment())
    }

    /// `owners/{ownerId}/{collection}/{recordId}`
    pub fn record(collection: Collection, key: &RecordKey) -> Result<Self, AppError> {
        Self::collection(&key.owner_id, collection)?.child(&key.record_id)
    }

    /// `owners/{ownerId}/projects/{recordId}/comments`
    pub fn comments(project: &RecordKey) -> Result<Self, AppError> {
        Self::record(Collection::Projects, project)?.child(COMMENTS)
    }

    /// Extend the path by one validated key.
    pub fn child(&self, key: &str) -> Result<Self, AppError> {
        validate_key(key)?;
        let mut segments = self.segments.clone();
        segments.push(key.to_string());
        Ok(Self { segments })
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    /// The path without its last segment, and that segment.
    pub fn split_last(&self) -> Option<(StorePath, &str)> {
        let (last, parent) = self.segments.split_last()?;
        Some((
            StorePath {
                segments: parent.to_vec(),
            },
            last.as_str(),
        ))
    }
}

impl fmt::Display for StorePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.segments.join("/"))
    }
}

/// Keys follow the hosted database's rules, which also keep them safe as
/// MongoDB dotted field names.
pub fn validate_key(key: &str) -> Result<(), AppError> {
    if key.is_empty() {
        return Err(AppError::Validation("Key cannot be empty".into()));
    }
    if key.len() > MAX_KEY_BYTES {
        return Err(AppError::Validation(format!(
            "Key is longer than {MAX_KEY_BYTES} bytes"
        )));
    }
    if let Some(bad) = key
        .chars()
        .find(|c| matches!(c, '.' | '$' | '#' | '[' | ']' | '/') || c.is_control())
    {
        return Err(AppError::Validation(format!(
            "Key '{}' contains forbidden character {:?}",
            key.escape_debug(),
            bad
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_path_layout() {
        let key = RecordKey::new("u1", "p1");
        let path = StorePath::record(Collection::Projects, &key).unwrap();
        assert_eq!(path.to_string(), "owners/u1/projects/p1");
        assert_eq!(
            StorePath::comments(&key).unwrap().to_string(),
            "owners/u1/projects/p1/comments"
        );
        assert_eq!(
            StorePath::record(Collection::Funding, &key)
                .unwrap()
                .to_string(),
            "owners/u1/funding/p1"
        );
    }

    #[test]
    fn test_parse_ignores_outer_slashes() {
        let path = StorePath::parse("/owners/u1/").unwrap();
        assert_eq!(path.segments(), ["owners", "u1"]);
        assert!(StorePath::parse("").unwrap().is_root());
    }

    #[test]
    fn test_forbidden_characters_rejected() {
        for key in ["a.b", "$set", "x#y", "a[0]", "tab\there"] {
            assert!(
                matches!(validate_key(key), Err(AppError::Validation(_))),
                "{key} should be rejected"
            );
        }
        assert!(StorePath::owner("").is_err());
    }

    #[test]
    fn test_overlong_key_rejected() {
        let key = "k".repeat(MAX_KEY_BYTES + 1);
        assert!(validate_key(&key).is_err());
        assert!(validate_key(&"k".repeat(MAX_KEY_BYTES)).is_ok());
    }

    #[test]
    fn test_split_last() {
        let path = StorePath::parse("owners/u1/projects").unwrap();
        let (parent, last) = path.split_last().unwrap();
        assert_eq!(parent.to_string(), "owners/u1");
        assert_eq!(last, "projects");
        assert!(StorePath::parse("").unwrap().split_last().is_none());
    }
}
