//! Structured object records for Git Blob Streams.
//!
//! Trees, commits, and tags have fixed, git-style payload encodings. This
//! crate holds the typed records, their canonical serializers and parsers,
//! and the normalizer that turns loosely-shaped input (JSON-like records,
//! array-form trees, calendar timestamps) into the strict records the
//! serializers require.
//!
//! # Encodings
//!
//! - Tree: repeated `"<mode-octal> <name>\0" + 20 raw hash bytes`, entries in
//!   directory-aware name order ([`tree_order`])
//! - Commit: `tree`, `parent`*, `author`, `committer` lines, blank line, message
//! - Tag: `object`, `type`, `tag`, `tagger` lines, blank line, message
//! - Person: `"<name> <<email>> <epoch-seconds> <±HHMM>"`, with name and email
//!   passed through [`sanitize`] on the way out
//!
//! # Design Rules
//!
//! 1. Serializers never fail. Tree entries are checked by [`Tree::insert`];
//!    commits and tags by their `validate` methods, which the normalizer and
//!    the object writers call before encoding.
//! 2. Two trees with the same entries encode to the same bytes.
//! 3. Parsers reject malformed input; they never guess.
//! 4. Sanitization of person fields is one-way.

pub mod body;
pub mod commit;
pub mod error;
mod fields;
pub mod mode;
pub mod normalize;
pub mod person;
pub mod sanitize;
pub mod tag;
pub mod tree;

pub use body::ObjectBody;
pub use commit::{parse_commit, serialize_commit, Commit};
pub use error::{ObjectError, ObjectResult};
pub use mode::{modes, EntryMode};
pub use normalize::{
    normalize_commit, normalize_person, normalize_tag, normalize_tree, normalize_value, typed_value,
    LooseCommit, LooseDate, LooseEntry, LooseHash, LooseNamedEntry, LoosePerson, LooseTag,
    LooseTree,
};
pub use person::{decode_person, format_person, GitTime, Person, MAX_OFFSET_MINUTES};
pub use sanitize::sanitize;
pub use tag::{parse_tag, serialize_tag, Tag};
pub use tree::{parse_tree, serialize_tree, tree_order, Tree, TreeEntry};
