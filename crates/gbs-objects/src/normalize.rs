//! Normalization of loosely-shaped records into typed ones.
//!
//! Callers often hold records in a looser shape than the serializers accept:
//! trees as arrays of `{name, mode, hash}`, hashes as raw byte arrays, dates
//! as calendar strings, a legacy singular `parent`, an absent committer. The
//! `Loose*` types accept those shapes (every field optional) and the
//! `normalize_*` functions produce the strict records, reporting the first
//! missing or wrong-typed field as [`ObjectError::Validation`].
//!
//! Defaults applied here:
//! - a person without `date` is stamped with the current local time
//! - a commit without `committer` uses its `author`
//! - a commit without `parents` uses its legacy `parent`, if any

use std::collections::BTreeMap;

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use gbs_types::{ObjectId, ObjectKind};

use crate::body::ObjectBody;
use crate::commit::Commit;
use crate::error::{ObjectError, ObjectResult};
use crate::person::{GitTime, Person};
use crate::tag::Tag;
use crate::tree::{Tree, TreeEntry};

/// A date as either an explicit `{seconds, offset}` stamp or an RFC 3339
/// calendar timestamp carrying its own UTC offset.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LooseDate {
    Stamp {
        seconds: i64,
        /// Minutes behind UTC.
        #[serde(default)]
        offset: i16,
    },
    Calendar(DateTime<FixedOffset>),
}

impl LooseDate {
    pub fn to_git_time(&self) -> GitTime {
        match self {
            LooseDate::Stamp { seconds, offset } => GitTime::new(*seconds, *offset),
            LooseDate::Calendar(dt) => GitTime::from_datetime(dt),
        }
    }
}

impl From<GitTime> for LooseDate {
    fn from(time: GitTime) -> Self {
        LooseDate::Stamp {
            seconds: time.seconds,
            offset: time.offset_minutes,
        }
    }
}

/// An object hash as 40 hex characters or 20 raw bytes.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LooseHash {
    Hex(String),
    Raw(Vec<u8>),
}

impl LooseHash {
    fn to_object_id(&self, field: &str) -> ObjectResult<ObjectId> {
        let parsed = match self {
            LooseHash::Hex(hex) => ObjectId::from_hex(hex),
            LooseHash::Raw(bytes) => ObjectId::from_slice(bytes),
        };
        parsed.map_err(|e| ObjectError::validation(field, e.to_string()))
    }
}

impl From<ObjectId> for LooseHash {
    fn from(id: ObjectId) -> Self {
        LooseHash::Hex(id.to_hex())
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoosePerson {
    pub name: Option<String>,
    pub email: Option<String>,
    pub date: Option<LooseDate>,
}

impl From<Person> for LoosePerson {
    fn from(person: Person) -> Self {
        Self {
            name: Some(person.name),
            email: Some(person.email),
            date: Some(person.date.into()),
        }
    }
}

/// Tree entry value in mapping form.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LooseEntry {
    pub mode: Option<u32>,
    pub hash: Option<LooseHash>,
}

/// Tree entry in array form.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LooseNamedEntry {
    pub name: Option<String>,
    pub mode: Option<u32>,
    pub hash: Option<LooseHash>,
}

/// A tree in array-of-entries or name-to-entry mapping form.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LooseTree {
    List(Vec<LooseNamedEntry>),
    Map(BTreeMap<String, LooseEntry>),
}

impl From<Tree> for LooseTree {
    fn from(tree: Tree) -> Self {
        let map: BTreeMap<String, TreeEntry> = tree.into();
        LooseTree::Map(
            map.into_iter()
                .map(|(name, e)| {
                    let entry = LooseEntry {
                        mode: Some(e.mode),
                        hash: Some(e.hash.into()),
                    };
                    (name, entry)
                })
                .collect(),
        )
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LooseCommit {
    pub tree: Option<LooseHash>,
    pub parents: Option<Vec<LooseHash>>,
    /// Legacy single-parent field, used only when `parents` is absent.
    pub parent: Option<LooseHash>,
    pub author: Option<LoosePerson>,
    pub committer: Option<LoosePerson>,
    pub message: Option<String>,
}

impl From<Commit> for LooseCommit {
    fn from(commit: Commit) -> Self {
        Self {
            tree: Some(commit.tree.into()),
            parents: Some(commit.parents.into_iter().map(Into::into).collect()),
            parent: None,
            author: Some(commit.author.into()),
            committer: Some(commit.committer.into()),
            message: Some(commit.message),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LooseTag {
    pub object: Option<LooseHash>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    #[serde(rename = "tag")]
    pub name: Option<String>,
    pub tagger: Option<LoosePerson>,
    pub message: Option<String>,
}

impl From<Tag> for LooseTag {
    fn from(tag: Tag) -> Self {
        Self {
            object: Some(tag.object.into()),
            kind: Some(tag.kind.to_string()),
            name: Some(tag.name),
            tagger: Some(tag.tagger.into()),
            message: Some(tag.message),
        }
    }
}

fn required<T>(value: Option<T>, field: &str) -> ObjectResult<T> {
    value.ok_or_else(|| ObjectError::missing(field))
}

/// Normalize a person, stamping the current time when `date` is absent.
///
/// `field` prefixes the names reported in validation errors.
pub fn normalize_person(loose: LoosePerson, field: &str) -> ObjectResult<Person> {
    let name = required(loose.name, &format!("{field}.name"))?;
    let email = required(loose.email, &format!("{field}.email"))?;
    let date = match loose.date {
        Some(date) => date.to_git_time(),
        None => {
            debug!(field, "person has no date; using current time");
            GitTime::now()
        }
    };
    let person = Person::new(name, email, date);
    person.validate(field)?;
    Ok(person)
}

/// Normalize either tree form into a [`Tree`].
pub fn normalize_tree(loose: LooseTree) -> ObjectResult<Tree> {
    let mut tree = Tree::new();
    match loose {
        LooseTree::List(entries) => {
            for (i, entry) in entries.into_iter().enumerate() {
                let name = required(entry.name, &format!("entries[{i}].name"))?;
                let mode = required(entry.mode, &format!("{name}.mode"))?;
                let hash = required(entry.hash, &format!("{name}.hash"))?
                    .to_object_id(&format!("{name}.hash"))?;
                if tree.get(&name).is_some() {
                    return Err(ObjectError::validation(name, "duplicate tree entry"));
                }
                tree.insert(name, TreeEntry::new(mode, hash))?;
            }
        }
        LooseTree::Map(entries) => {
            for (name, entry) in entries {
                let mode = required(entry.mode, &format!("{name}.mode"))?;
                let hash = required(entry.hash, &format!("{name}.hash"))?
                    .to_object_id(&format!("{name}.hash"))?;
                tree.insert(name, TreeEntry::new(mode, hash))?;
            }
        }
    }
    Ok(tree)
}

/// Normalize a commit, applying the committer and parent defaults.
pub fn normalize_commit(loose: LooseCommit) -> ObjectResult<Commit> {
    let tree = required(loose.tree, "tree")?.to_object_id("tree")?;
    let author = normalize_person(required(loose.author, "author")?, "author")?;
    let message = required(loose.message, "message")?;

    let parents = match (loose.parents, loose.parent) {
        (Some(list), _) => list
            .iter()
            .enumerate()
            .map(|(i, p)| p.to_object_id(&format!("parents[{i}]")))
            .collect::<ObjectResult<Vec<_>>>()?,
        (None, Some(single)) => vec![single.to_object_id("parent")?],
        (None, None) => Vec::new(),
    };

    let committer = match loose.committer {
        Some(c) => normalize_person(c, "committer")?,
        None => author.clone(),
    };

    let commit = Commit {
        tree,
        parents,
        author,
        committer,
        message,
        extra_headers: Vec::new(),
    };
    commit.validate()?;
    Ok(commit)
}

/// Normalize a tag. All five fields are required.
pub fn normalize_tag(loose: LooseTag) -> ObjectResult<Tag> {
    let object = required(loose.object, "object")?.to_object_id("object")?;
    let kind = required(loose.kind, "type")?
        .parse::<ObjectKind>()
        .map_err(|e| ObjectError::validation("type", e.to_string()))?;
    let name = required(loose.name, "tag")?;
    let tagger = normalize_person(required(loose.tagger, "tagger")?, "tagger")?;
    let message = required(loose.message, "message")?;

    let tag = Tag {
        object,
        kind,
        name,
        tagger,
        message,
        extra_headers: Vec::new(),
    };
    tag.validate()?;
    Ok(tag)
}

/// Normalize a JSON record of the given kind.
///
/// Blob content is a string (taken as UTF-8 bytes) or an array of bytes.
pub fn normalize_value(kind: ObjectKind, value: Value) -> ObjectResult<ObjectBody> {
    Ok(match kind {
        ObjectKind::Blob => ObjectBody::Blob(blob_bytes(value)?),
        ObjectKind::Tree => ObjectBody::Tree(normalize_tree(from_value(kind, value)?)?),
        ObjectKind::Commit => ObjectBody::Commit(normalize_commit(from_value(kind, value)?)?),
        ObjectKind::Tag => ObjectBody::Tag(normalize_tag(from_value(kind, value)?)?),
    })
}

/// Deserialize a JSON record that must already be in typed form.
///
/// No defaults are applied and trees must use the mapping form.
pub fn typed_value(kind: ObjectKind, value: Value) -> ObjectResult<ObjectBody> {
    let body = match kind {
        ObjectKind::Blob => ObjectBody::Blob(blob_bytes(value)?),
        ObjectKind::Tree => ObjectBody::Tree(from_value(kind, value)?),
        ObjectKind::Commit => ObjectBody::Commit(from_value(kind, value)?),
        ObjectKind::Tag => ObjectBody::Tag(from_value(kind, value)?),
    };
    body.validate()?;
    Ok(body)
}

fn from_value<T: serde::de::DeserializeOwned>(kind: ObjectKind, value: Value) -> ObjectResult<T> {
    serde_json::from_value(value).map_err(|e| ObjectError::validation(kind.as_str(), e.to_string()))
}

fn blob_bytes(value: Value) -> ObjectResult<Vec<u8>> {
    match value {
        Value::String(text) => Ok(text.into_bytes()),
        other => from_value(ObjectKind::Blob, other),
    }
}
