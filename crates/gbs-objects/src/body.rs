use gbs_types::ObjectKind;

use crate::commit::{parse_commit, serialize_commit, Commit};
use crate::error::ObjectResult;
use crate::tag::{parse_tag, serialize_tag, Tag};
use crate::tree::{parse_tree, serialize_tree, Tree};

/// A decoded payload of any kind.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ObjectBody {
    Blob(Vec<u8>),
    Tree(Tree),
    Commit(Commit),
    Tag(Tag),
}

impl ObjectBody {
    pub fn kind(&self) -> ObjectKind {
        match self {
            ObjectBody::Blob(_) => ObjectKind::Blob,
            ObjectBody::Tree(_) => ObjectKind::Tree,
            ObjectBody::Commit(_) => ObjectKind::Commit,
            ObjectBody::Tag(_) => ObjectKind::Tag,
        }
    }

    /// Check that the record encodes to a payload that parses back to it.
    /// Trees are checked when entries are inserted.
    pub fn validate(&self) -> ObjectResult<()> {
        match self {
            ObjectBody::Blob(_) | ObjectBody::Tree(_) => Ok(()),
            ObjectBody::Commit(commit) => commit.validate(),
            ObjectBody::Tag(tag) => tag.validate(),
        }
    }

    /// Canonical payload bytes (no header).
    pub fn encode(&self) -> Vec<u8> {
        match self {
            ObjectBody::Blob(bytes) => bytes.clone(),
            ObjectBody::Tree(tree) => serialize_tree(tree),
            ObjectBody::Commit(commit) => serialize_commit(commit),
            ObjectBody::Tag(tag) => serialize_tag(tag),
        }
    }

    /// Parse a payload according to its kind. Blobs are taken verbatim.
    pub fn parse(kind: ObjectKind, payload: &[u8]) -> ObjectResult<Self> {
        Ok(match kind {
            ObjectKind::Blob => ObjectBody::Blob(payload.to_vec()),
            ObjectKind::Tree => ObjectBody::Tree(parse_tree(payload)?),
            ObjectKind::Commit => ObjectBody::Commit(parse_commit(payload)?),
            ObjectKind::Tag => ObjectBody::Tag(parse_tag(payload)?),
        })
    }
}

impl From<Tree> for ObjectBody {
    fn from(tree: Tree) -> Self {
        ObjectBody::Tree(tree)
    }
}

impl From<Commit> for ObjectBody {
    fn from(commit: Commit) -> Self {
        ObjectBody::Commit(commit)
    }
}

impl From<Tag> for ObjectBody {
    fn from(tag: Tag) -> Self {
        ObjectBody::Tag(tag)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blob_is_verbatim() {
        let body = ObjectBody::parse(ObjectKind::Blob, b"\0\xff raw").unwrap();
        assert_eq!(body.kind(), ObjectKind::Blob);
        assert_eq!(body.encode(), b"\0\xff raw");
    }

    #[test]
    fn empty_tree_parses() {
        let body = ObjectBody::parse(ObjectKind::Tree, b"").unwrap();
        assert_eq!(body, ObjectBody::Tree(Tree::new()));
        assert!(body.encode().is_empty());
    }

    #[test]
    fn commit_parse_errors_propagate() {
        assert!(ObjectBody::parse(ObjectKind::Commit, b"garbage").is_err());
    }
}
