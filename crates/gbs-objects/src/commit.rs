use serde::{Deserialize, Serialize};

use gbs_types::ObjectId;

use crate::error::{ObjectError, ObjectResult};
use crate::fields::{check_extra_headers, push_field, split_block};
use crate::person::{decode_person, format_person, Person};

/// Header keys a commit writes itself.
const COMMIT_KEYS: &[&str] = &["tree", "parent", "author", "committer"];

/// A snapshot record: tree, parents, authorship, and message.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Commit {
    pub tree: ObjectId,
    /// Parent commits in order (empty for a root commit).
    #[serde(default)]
    pub parents: Vec<ObjectId>,
    pub author: Person,
    pub committer: Person,
    pub message: String,
    /// Header lines with keys this crate does not interpret, in order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub extra_headers: Vec<(String, String)>,
}

impl Commit {
    /// A commit whose committer is its author.
    pub fn new(tree: ObjectId, author: Person, message: impl Into<String>) -> Self {
        Self {
            tree,
            parents: Vec::new(),
            committer: author.clone(),
            author,
            message: message.into(),
            extra_headers: Vec::new(),
        }
    }

    pub fn with_parent(mut self, parent: ObjectId) -> Self {
        self.parents.push(parent);
        self
    }

    pub fn with_committer(mut self, committer: Person) -> Self {
        self.committer = committer;
        self
    }

    /// Check that the commit serializes to a payload that parses back to it.
    pub fn validate(&self) -> ObjectResult<()> {
        self.author.validate("author")?;
        self.committer.validate("committer")?;
        check_extra_headers(&self.extra_headers, COMMIT_KEYS)
    }
}

/// Encode a commit payload.
pub fn serialize_commit(commit: &Commit) -> Vec<u8> {
    let mut out = String::new();
    push_field(&mut out, "tree", commit.tree);
    for parent in &commit.parents {
        push_field(&mut out, "parent", parent);
    }
    push_field(&mut out, "author", format_person(&commit.author));
    push_field(&mut out, "committer", format_person(&commit.committer));
    for (key, value) in &commit.extra_headers {
        push_field(&mut out, key, value);
    }
    out.push('\n');
    out.push_str(&commit.message);
    out.into_bytes()
}

/// Decode a commit payload.
pub fn parse_commit(body: &[u8]) -> ObjectResult<Commit> {
    let block = split_block(body)?;

    let mut tree = None;
    let mut parents = Vec::new();
    let mut author = None;
    let mut committer = None;
    let mut extra_headers = Vec::new();

    for (key, value) in block.fields {
        match key.as_str() {
            "tree" => set_once(&mut tree, "tree", parse_id("tree", &value)?)?,
            "parent" => parents.push(parse_id("parent", &value)?),
            "author" => set_once(&mut author, "author", decode_person(&value)?)?,
            "committer" => set_once(&mut committer, "committer", decode_person(&value)?)?,
            _ => extra_headers.push((key, value)),
        }
    }

    Ok(Commit {
        tree: tree.ok_or_else(|| ObjectError::syntax("commit has no tree"))?,
        parents,
        author: author.ok_or_else(|| ObjectError::syntax("commit has no author"))?,
        committer: committer.ok_or_else(|| ObjectError::syntax("commit has no committer"))?,
        message: block.message,
        extra_headers,
    })
}

pub(crate) fn parse_id(field: &str, value: &str) -> ObjectResult<ObjectId> {
    ObjectId::from_hex(value).map_err(|e| ObjectError::bad_field(field, e))
}

pub(crate) fn set_once<T>(slot: &mut Option<T>, field: &str, value: T) -> ObjectResult<()> {
    if slot.replace(value).is_some() {
        return Err(ObjectError::Syntax(format!("duplicate {field} line")));
    }
    Ok(())
}
