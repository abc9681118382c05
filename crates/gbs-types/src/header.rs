use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;
use crate::kind::ObjectKind;

/// Upper bound on the header length, terminator included.
///
/// The longest valid header is `"commit "` plus twenty digits plus NUL,
/// so anything longer cannot be a header.
pub const MAX_HEADER_LEN: usize = 64;

/// Parsed `"<kind> <size>\0"` object header.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ObjectHeader {
    /// Kind of the object that follows.
    pub kind: ObjectKind,
    /// Exact byte length of the payload that follows the header.
    pub size: u64,
}

impl ObjectHeader {
    pub fn new(kind: ObjectKind, size: u64) -> Self {
        Self { kind, size }
    }

    /// Header bytes including the NUL terminator.
    pub fn encode(&self) -> Vec<u8> {
        build_header(self.kind, self.size)
    }

    /// Parse the header text that precedes the NUL terminator.
    pub fn parse(text: &[u8]) -> Result<Self, TypeError> {
        let space = match text.iter().position(|&b| b == b' ') {
            Some(pos) if pos > 0 => pos,
            _ => {
                return Err(TypeError::MalformedHeader(
                    "missing space between kind and size".into(),
                ))
            }
        };

        let kind = std::str::from_utf8(&text[..space])
            .map_err(|_| TypeError::MalformedHeader("kind is not valid UTF-8".into()))?
            .parse::<ObjectKind>()?;

        let size_text = &text[space + 1..];
        if size_text.is_empty() || !size_text.iter().all(u8::is_ascii_digit) {
            return Err(TypeError::MalformedHeader(format!(
                "invalid size field {:?}",
                String::from_utf8_lossy(size_text)
            )));
        }
        // All-digit ASCII is valid UTF-8; only overflow can fail here.
        let size = std::str::from_utf8(size_text)
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .ok_or_else(|| TypeError::MalformedHeader("size does not fit in u64".into()))?;

        Ok(Self { kind, size })
    }
}

impl fmt::Display for ObjectHeader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.kind, self.size)
    }
}

/// Build the `"<kind> <size>\0"` header bytes.
pub fn build_header(kind: ObjectKind, size: u64) -> Vec<u8> {
    format!("{kind} {size}\0").into_bytes()
}

/// Build a header from a kind name, rejecting names outside the four kinds.
pub fn build_header_named(kind: &str, size: u64) -> Result<Vec<u8>, TypeError> {
    Ok(build_header(kind.parse()?, size))
}

/// Split a buffer at the header terminator.
///
/// Returns `Ok(None)` if no NUL byte is present yet: the caller must buffer
/// and retry with more input. On success returns the parsed header and the
/// bytes following the terminator.
pub fn split_header(bytes: &[u8]) -> Result<Option<(ObjectHeader, &[u8])>, TypeError> {
    let Some(nul) = bytes.iter().position(|&b| b == 0) else {
        return Ok(None);
    };
    let header = ObjectHeader::parse(&bytes[..nul])?;
    Ok(Some((header, &bytes[nul + 1..])))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn build_blob_header() {
        assert_eq!(build_header(ObjectKind::Blob, 12), b"blob 12\0");
        assert_eq!(build_header(ObjectKind::Commit, 0), b"commit 0\0");
    }

    #[test]
    fn build_named_rejects_unknown_kind() {
        assert_eq!(build_header_named("tree", 5).unwrap(), b"tree 5\0");
        let err = build_header_named("snapshot", 5).unwrap_err();
        assert_eq!(err, TypeError::UnknownKind("snapshot".into()));
    }

    #[test]
    fn split_complete_header() {
        let (header, rest) = split_header(b"blob 5\0hello").unwrap().unwrap();
        assert_eq!(header, ObjectHeader::new(ObjectKind::Blob, 5));
        assert_eq!(rest, b"hello");
    }

    #[test]
    fn split_incomplete_header_needs_more() {
        assert!(split_header(b"blob 5").unwrap().is_none());
        assert!(split_header(b"").unwrap().is_none());
    }

    #[test]
    fn split_rejects_missing_space() {
        let err = split_header(b"blob5\0").unwrap_err();
        assert!(matches!(err, TypeError::MalformedHeader(_)));
    }

    #[test]
    fn split_rejects_leading_space() {
        let err = split_header(b" 5\0").unwrap_err();
        assert!(matches!(err, TypeError::MalformedHeader(_)));
    }

    #[test]
    fn split_rejects_non_numeric_size() {
        let err = split_header(b"blob 5x\0").unwrap_err();
        assert!(matches!(err, TypeError::MalformedHeader(_)));
        let err = split_header(b"blob \0").unwrap_err();
        assert!(matches!(err, TypeError::MalformedHeader(_)));
    }

    #[test]
    fn split_rejects_unknown_kind() {
        let err = split_header(b"receipt 3\0abc").unwrap_err();
        assert_eq!(err, TypeError::UnknownKind("receipt".into()));
    }

    #[test]
    fn split_rejects_overflowing_size() {
        let err = split_header(b"blob 99999999999999999999999\0").unwrap_err();
        assert!(matches!(err, TypeError::MalformedHeader(_)));
    }

    #[test]
    fn display_omits_terminator() {
        assert_eq!(ObjectHeader::new(ObjectKind::Tag, 154).to_string(), "tag 154");
    }

    proptest! {
        #[test]
        fn encode_then_split_recovers_header(kind_idx in 0usize..4, size in any::<u64>()) {
            let header = ObjectHeader::new(ObjectKind::ALL[kind_idx], size);
            let bytes = header.encode();
            prop_assert!(bytes.len() <= MAX_HEADER_LEN);
            let (parsed, rest) = split_header(&bytes).unwrap().unwrap();
            prop_assert_eq!(parsed, header);
            prop_assert!(rest.is_empty());
        }
    }
}
