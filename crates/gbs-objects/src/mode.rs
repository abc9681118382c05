use std::fmt;

use serde::{Deserialize, Serialize};

use gbs_types::ObjectKind;

/// Well-known tree entry modes and mode predicates.
pub mod modes {
    use gbs_types::ObjectKind;

    /// Subtree / directory.
    pub const TREE: u32 = 0o040000;
    /// Normal file.
    pub const BLOB: u32 = 0o100644;
    /// Normal file (alias of [`BLOB`]).
    pub const FILE: u32 = 0o100644;
    /// Executable file.
    pub const EXEC: u32 = 0o100755;
    /// Symbolic link.
    pub const SYM: u32 = 0o120000;
    /// Gitlink (submodule commit).
    pub const COMMIT: u32 = 0o160000;

    /// Mode refers to blob content (regular file, executable, or symlink).
    pub fn is_blob(mode: u32) -> bool {
        mode & 0o140000 == 0o100000
    }

    /// Mode refers to a regular or executable file.
    pub fn is_file(mode: u32) -> bool {
        mode & 0o160000 == 0o100000
    }

    /// Kind of object a tree entry with this mode points at.
    pub fn kind_of(mode: u32) -> Option<ObjectKind> {
        if mode == COMMIT {
            Some(ObjectKind::Commit)
        } else if mode == TREE {
            Some(ObjectKind::Tree)
        } else if is_blob(mode) {
            Some(ObjectKind::Blob)
        } else {
            None
        }
    }
}

/// Named classification of the common tree entry modes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntryMode {
    /// Normal file (0o100644).
    Regular,
    /// Executable file (0o100755).
    Executable,
    /// Symbolic link (0o120000).
    Symlink,
    /// Subtree / directory (0o040000).
    Directory,
    /// Submodule commit (0o160000).
    Gitlink,
}

impl EntryMode {
    /// Octal mode value.
    pub fn mode_bits(&self) -> u32 {
        match self {
            Self::Regular => modes::FILE,
            Self::Executable => modes::EXEC,
            Self::Symlink => modes::SYM,
            Self::Directory => modes::TREE,
            Self::Gitlink => modes::COMMIT,
        }
    }

    /// Parse from an octal mode value.
    pub fn from_mode_bits(bits: u32) -> Option<Self> {
        match bits {
            modes::FILE => Some(Self::Regular),
            modes::EXEC => Some(Self::Executable),
            modes::SYM => Some(Self::Symlink),
            modes::TREE => Some(Self::Directory),
            modes::COMMIT => Some(Self::Gitlink),
            _ => None,
        }
    }

    pub fn object_kind(&self) -> ObjectKind {
        match self {
            Self::Directory => ObjectKind::Tree,
            Self::Gitlink => ObjectKind::Commit,
            Self::Regular | Self::Executable | Self::Symlink => ObjectKind::Blob,
        }
    }
}

impl From<EntryMode> for u32 {
    fn from(mode: EntryMode) -> Self {
        mode.mode_bits()
    }
}

/// Wire form: octal without leading zeros (`40000`, `100644`).
impl fmt::Display for EntryMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:o}", self.mode_bits())
    }
}
