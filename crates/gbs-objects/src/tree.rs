use std::cmp::Ordering;
use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use gbs_types::{ObjectId, OBJECT_ID_LEN};

use crate::error::{ObjectError, ObjectResult};
use crate::mode::{modes, EntryMode};

/// Mode and target of a single tree entry. The entry name is the map key.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TreeEntry {
    /// Octal file mode (see [`modes`]).
    pub mode: u32,
    /// ID of the referenced object.
    pub hash: ObjectId,
}

impl TreeEntry {
    pub fn new(mode: u32, hash: ObjectId) -> Self {
        Self { mode, hash }
    }

    /// The named mode, if this is one of the common ones.
    pub fn entry_mode(&self) -> Option<EntryMode> {
        EntryMode::from_mode_bits(self.mode)
    }

    /// Returns `true` if this entry is a subtree.
    pub fn is_tree(&self) -> bool {
        self.entry_mode() == Some(EntryMode::Directory)
    }
}

/// Directory listing: entry name to `(mode, hash)`.
///
/// Names are unique, non-empty, and contain no NUL byte. Iteration order of
/// the map is irrelevant; [`serialize_tree`] always emits entries in
/// [`tree_order`].
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "BTreeMap<String, TreeEntry>", into = "BTreeMap<String, TreeEntry>")]
pub struct Tree {
    entries: BTreeMap<String, TreeEntry>,
}

impl Tree {
    /// Create an empty tree.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace an entry, validating the name.
    pub fn insert(&mut self, name: impl Into<String>, entry: TreeEntry) -> ObjectResult<()> {
        let name = name.into();
        validate_name(&name)?;
        self.entries.insert(name, entry);
        Ok(())
    }

    /// Builder form of [`insert`](Self::insert).
    ///
    /// `mode` is raw bits or an [`EntryMode`].
    pub fn with_entry(
        mut self,
        name: impl Into<String>,
        mode: impl Into<u32>,
        hash: ObjectId,
    ) -> ObjectResult<Self> {
        self.insert(name, TreeEntry::new(mode.into(), hash))?;
        Ok(self)
    }

    /// Look up an entry by name.
    pub fn get(&self, name: &str) -> Option<&TreeEntry> {
        self.entries.get(name)
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if the tree has no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in canonical serialization order.
    pub fn sorted_entries(&self) -> Vec<(&str, &TreeEntry)> {
        let mut list: Vec<(&str, &TreeEntry)> =
            self.entries.iter().map(|(n, e)| (n.as_str(), e)).collect();
        list.sort_by(|(a, ea), (b, eb)| tree_order(a, ea.mode, b, eb.mode));
        list
    }
}

impl TryFrom<BTreeMap<String, TreeEntry>> for Tree {
    type Error = ObjectError;

    fn try_from(entries: BTreeMap<String, TreeEntry>) -> ObjectResult<Self> {
        for name in entries.keys() {
            validate_name(name)?;
        }
        Ok(Self { entries })
    }
}

impl From<Tree> for BTreeMap<String, TreeEntry> {
    fn from(tree: Tree) -> Self {
        tree.entries
    }
}

fn validate_name(name: &str) -> ObjectResult<()> {
    if name.is_empty() {
        return Err(ObjectError::validation("name", "tree entry name is empty"));
    }
    if name.contains('\0') {
        return Err(ObjectError::validation(
            format!("{name:?}"),
            "tree entry name contains NUL",
        ));
    }
    Ok(())
}

/// Directory-aware name ordering.
///
/// Subtrees compare as if their name had a trailing `/`, so `a.txt` (0x2e)
/// sorts before directory `a` (`a/`, 0x2f), which sorts before `a0` (0x30).
pub fn tree_order(a: &str, a_mode: u32, b: &str, b_mode: u32) -> Ordering {
    let suffix = |mode: u32| (mode == modes::TREE).then_some(b'/');
    a.bytes()
        .chain(suffix(a_mode))
        .cmp(b.bytes().chain(suffix(b_mode)))
}

/// Encode a tree as concatenated `"<mode-octal> <name>\0<20 raw bytes>"` entries.
pub fn serialize_tree(tree: &Tree) -> Vec<u8> {
    let mut out = Vec::new();
    for (name, entry) in tree.sorted_entries() {
        out.extend_from_slice(format!("{:o} {}\0", entry.mode, name).as_bytes());
        out.extend_from_slice(entry.hash.as_bytes());
    }
    out
}

/// Decode a tree payload.
pub fn parse_tree(body: &[u8]) -> ObjectResult<Tree> {
    let mut entries = BTreeMap::new();
    let mut pos = 0;

    while pos < body.len() {
        let space = find(body, b' ', pos)
            .ok_or_else(|| ObjectError::syntax("missing space after mode"))?;
        let mode_str = std::str::from_utf8(&body[pos..space])
            .map_err(|_| ObjectError::syntax("mode is not ASCII"))?;
        let mode = u32::from_str_radix(mode_str, 8)
            .map_err(|e| ObjectError::Syntax(format!("invalid mode {mode_str:?}: {e}")))?;
        pos = space + 1;

        let nul = find(body, 0, pos).ok_or_else(|| ObjectError::syntax("missing NUL after name"))?;
        let name = std::str::from_utf8(&body[pos..nul])
            .map_err(|_| ObjectError::syntax("entry name is not valid UTF-8"))?;
        pos = nul + 1;

        let end = pos + OBJECT_ID_LEN;
        if end > body.len() {
            return Err(ObjectError::syntax("truncated entry hash"));
        }
        let hash = ObjectId::from_slice(&body[pos..end])
            .map_err(|e| ObjectError::bad_field("hash", e))?;
        pos = end;

        if name.is_empty() {
            return Err(ObjectError::syntax("empty entry name"));
        }
        if entries.insert(name.to_string(), TreeEntry::new(mode, hash)).is_some() {
            return Err(ObjectError::Syntax(format!("duplicate entry {name:?}")));
        }
    }

    Ok(Tree { entries })
}

pub(crate) fn find(buf: &[u8], byte: u8, from: usize) -> Option<usize> {
    buf[from..].iter().position(|&b| b == byte).map(|i| from + i)
}
