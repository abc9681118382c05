use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// The kind of a stored object.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum ObjectKind {
    /// Raw content (file contents, arbitrary data).
    #[default]
    Blob,
    /// Directory listing mapping names to `(mode, hash)` pairs.
    Tree,
    /// Snapshot record: tree, parents, authorship, message.
    Commit,
    /// Named pointer to another object with tagger metadata.
    Tag,
}

impl ObjectKind {
    /// All four kinds, in header-name order.
    pub const ALL: [ObjectKind; 4] = [Self::Blob, Self::Tree, Self::Commit, Self::Tag];

    /// The name written into object headers.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Blob => "blob",
            Self::Tree => "tree",
            Self::Commit => "commit",
            Self::Tag => "tag",
        }
    }

    /// Returns `true` for the kinds with a structured payload encoding.
    pub fn is_structured(&self) -> bool {
        !matches!(self, Self::Blob)
    }
}

impl fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ObjectKind {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "blob" => Ok(Self::Blob),
            "tree" => Ok(Self::Tree),
            "commit" => Ok(Self::Commit),
            "tag" => Ok(Self::Tag),
            other => Err(TypeError::UnknownKind(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_matches_header_names() {
        assert_eq!(ObjectKind::Blob.to_string(), "blob");
        assert_eq!(ObjectKind::Tree.to_string(), "tree");
        assert_eq!(ObjectKind::Commit.to_string(), "commit");
        assert_eq!(ObjectKind::Tag.to_string(), "tag");
    }

    #[test]
    fn parse_all_kinds() {
        for kind in ObjectKind::ALL {
            assert_eq!(kind.as_str().parse::<ObjectKind>().unwrap(), kind);
        }
    }

    #[test]
    fn parse_is_case_sensitive() {
        let err = "Blob".parse::<ObjectKind>().unwrap_err();
        assert_eq!(err, TypeError::UnknownKind("Blob".into()));
    }

    #[test]
    fn default_is_blob() {
        assert_eq!(ObjectKind::default(), ObjectKind::Blob);
        assert!(!ObjectKind::Blob.is_structured());
        assert!(ObjectKind::Tree.is_structured());
    }

    #[test]
    fn serde_uses_lowercase_names() {
        let json = serde_json::to_string(&ObjectKind::Commit).unwrap();
        assert_eq!(json, "\"commit\"");
        let parsed: ObjectKind = serde_json::from_str("\"tag\"").unwrap();
        assert_eq!(parsed, ObjectKind::Tag);
    }
}
