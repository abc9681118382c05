use std::fmt;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use serde::{Deserialize, Serialize};
use sha1::Digest as _;

use gbs_types::{build_header, ObjectId, ObjectKind, OBJECT_ID_LEN};

use crate::error::{DigestError, DigestResult};

/// Supported digest algorithms.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DigestAlgorithm {
    /// Git-compatible object IDs.
    #[default]
    Sha1,
    Sha256,
    Blake3,
}

impl DigestAlgorithm {
    /// Length of the raw digest in bytes.
    pub fn output_len(&self) -> usize {
        match self {
            Self::Sha1 => 20,
            Self::Sha256 | Self::Blake3 => 32,
        }
    }
}

impl fmt::Display for DigestAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sha1 => write!(f, "sha1"),
            Self::Sha256 => write!(f, "sha256"),
            Self::Blake3 => write!(f, "blake3"),
        }
    }
}

/// Encoding of a finalized digest.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HashFormat {
    #[default]
    Hex,
    Base64,
    Raw,
}

/// A finalized digest in the format it was requested in.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "format", content = "value", rename_all = "lowercase")]
pub enum HashOutput {
    Hex(String),
    Base64(String),
    Raw(Vec<u8>),
}

impl HashOutput {
    /// Encode raw digest bytes in the requested format.
    pub fn encode(raw: Vec<u8>, format: HashFormat) -> Self {
        match format {
            HashFormat::Hex => Self::Hex(hex::encode(raw)),
            HashFormat::Base64 => Self::Base64(STANDARD.encode(raw)),
            HashFormat::Raw => Self::Raw(raw),
        }
    }

    pub fn format(&self) -> HashFormat {
        match self {
            Self::Hex(_) => HashFormat::Hex,
            Self::Base64(_) => HashFormat::Base64,
            Self::Raw(_) => HashFormat::Raw,
        }
    }

    /// Decode back to raw digest bytes.
    pub fn to_bytes(&self) -> DigestResult<Vec<u8>> {
        match self {
            Self::Hex(s) => hex::decode(s).map_err(|e| DigestError::InvalidHex(e.to_string())),
            Self::Base64(s) => STANDARD
                .decode(s)
                .map_err(|e| DigestError::InvalidBase64(e.to_string())),
            Self::Raw(bytes) => Ok(bytes.clone()),
        }
    }

    /// Lowercase hex rendering, whatever the stored format.
    pub fn to_hex(&self) -> DigestResult<String> {
        match self {
            Self::Hex(s) => Ok(s.clone()),
            other => other.to_bytes().map(hex::encode),
        }
    }

    /// Convert a 20-byte digest into an [`ObjectId`] for use in trees,
    /// commits, and tags.
    pub fn to_object_id(&self) -> DigestResult<ObjectId> {
        let bytes = self.to_bytes()?;
        ObjectId::from_slice(&bytes).map_err(|_| DigestError::NotAnObjectId {
            expected: OBJECT_ID_LEN,
            actual: bytes.len(),
        })
    }
}

impl fmt::Display for HashOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Hex(s) | Self::Base64(s) => f.write_str(s),
            Self::Raw(bytes) => f.write_str(&hex::encode(bytes)),
        }
    }
}

enum HashState {
    Sha1(sha1::Sha1),
    Sha256(sha2::Sha256),
    Blake3(Box<blake3::Hasher>),
}

/// Incremental digest accumulator.
///
/// The digest is a pure function of the ordered bytes passed to
/// [`update`](Self::update). Object framing requires the header to be fed
/// first and the payload second, each exactly once. [`finalize`](Self::finalize)
/// consumes the sink.
pub struct DigestSink {
    algorithm: DigestAlgorithm,
    state: HashState,
    bytes_hashed: u64,
}

impl DigestSink {
    pub fn new(algorithm: DigestAlgorithm) -> Self {
        let state = match algorithm {
            DigestAlgorithm::Sha1 => HashState::Sha1(sha1::Sha1::new()),
            DigestAlgorithm::Sha256 => HashState::Sha256(sha2::Sha256::new()),
            DigestAlgorithm::Blake3 => HashState::Blake3(Box::new(blake3::Hasher::new())),
        };
        Self {
            algorithm,
            state,
            bytes_hashed: 0,
        }
    }

    /// Feed bytes into the accumulator.
    pub fn update(&mut self, data: &[u8]) {
        match &mut self.state {
            HashState::Sha1(h) => h.update(data),
            HashState::Sha256(h) => h.update(data),
            HashState::Blake3(h) => {
                h.update(data);
            }
        }
        self.bytes_hashed += data.len() as u64;
    }

    pub fn algorithm(&self) -> DigestAlgorithm {
        self.algorithm
    }

    /// Total bytes fed so far, header included.
    pub fn bytes_hashed(&self) -> u64 {
        self.bytes_hashed
    }

    /// Finish and return the raw digest bytes.
    pub fn finalize_raw(self) -> Vec<u8> {
        match self.state {
            HashState::Sha1(h) => h.finalize().to_vec(),
            HashState::Sha256(h) => h.finalize().to_vec(),
            HashState::Blake3(h) => h.finalize().as_bytes().to_vec(),
        }
    }

    /// Finish and return the digest in the requested format.
    pub fn finalize(self, format: HashFormat) -> HashOutput {
        HashOutput::encode(self.finalize_raw(), format)
    }
}

impl fmt::Debug for DigestSink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DigestSink")
            .field("algorithm", &self.algorithm)
            .field("bytes_hashed", &self.bytes_hashed)
            .finish()
    }
}

/// Digest of a whole in-memory object: header for `(kind, payload.len())`
/// followed by the payload.
pub fn hash_object(
    algorithm: DigestAlgorithm,
    kind: ObjectKind,
    payload: &[u8],
    format: HashFormat,
) -> HashOutput {
    let mut sink = DigestSink::new(algorithm);
    sink.update(&build_header(kind, payload.len() as u64));
    sink.update(payload);
    sink.finalize(format)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const HELLO_WORLD_SHA1: &str = "557db03de997c86a4a028e1ebd3a1ceb225be238";

    #[test]
    fn hello_world_blob_matches_git() {
        let out = hash_object(
            DigestAlgorithm::Sha1,
            ObjectKind::Blob,
            b"Hello World\n",
            HashFormat::Hex,
        );
        assert_eq!(out, HashOutput::Hex(HELLO_WORLD_SHA1.into()));
    }

    #[test]
    fn empty_blob_matches_git() {
        let out = hash_object(DigestAlgorithm::Sha1, ObjectKind::Blob, b"", HashFormat::Hex);
        assert_eq!(out.to_string(), "e69de29bb2d1d6434b8b29ae775ad8c2e48c5391");
    }

    #[test]
    fn sha256_of_framed_blob() {
        let mut sink = DigestSink::new(DigestAlgorithm::Sha256);
        sink.update(b"blob 12\0");
        sink.update(b"Hello World\n");
        assert_eq!(
            sink.finalize(HashFormat::Hex).to_string(),
            "7c5c8610459154bdde4984be72c48fb5d9c1c4ac793a6b5976fe38fd1b0b1284"
        );
    }

    #[test]
    fn blake3_matches_one_shot() {
        let mut sink = DigestSink::new(DigestAlgorithm::Blake3);
        sink.update(b"blob 3\0");
        sink.update(b"abc");
        assert_eq!(
            sink.finalize_raw(),
            blake3::hash(b"blob 3\0abc").as_bytes().to_vec()
        );
    }

    #[test]
    fn formats_encode_the_same_digest() {
        let hello = |format| {
            hash_object(DigestAlgorithm::Sha1, ObjectKind::Blob, b"Hello World\n", format)
        };
        let hex = hello(HashFormat::Hex);
        let b64 = hello(HashFormat::Base64);
        let raw = hello(HashFormat::Raw);

        assert_eq!(b64, HashOutput::Base64("VX2wPemXyGpKAo4evToc6yJb4jg=".into()));
        assert_eq!(b64.to_hex().unwrap(), HELLO_WORLD_SHA1);
        assert_eq!(raw.to_hex().unwrap(), HELLO_WORLD_SHA1);
        assert_eq!(raw.format(), HashFormat::Raw);
        assert_eq!(hex.to_bytes().unwrap(), raw.to_bytes().unwrap());
    }

    #[test]
    fn sha1_digest_converts_to_object_id() {
        let out =
            hash_object(DigestAlgorithm::Sha1, ObjectKind::Blob, b"Hello World\n", HashFormat::Raw);
        let id = out.to_object_id().unwrap();
        assert_eq!(id.to_hex(), HELLO_WORLD_SHA1);
    }

    #[test]
    fn sha256_digest_is_not_an_object_id() {
        let out = hash_object(DigestAlgorithm::Sha256, ObjectKind::Blob, b"x", HashFormat::Hex);
        let err = out.to_object_id().unwrap_err();
        assert_eq!(
            err,
            DigestError::NotAnObjectId {
                expected: 20,
                actual: 32
            }
        );
    }

    #[test]
    fn bytes_hashed_counts_header_and_payload() {
        let mut sink = DigestSink::new(DigestAlgorithm::Sha1);
        sink.update(b"blob 2\0");
        sink.update(b"hi");
        assert_eq!(sink.bytes_hashed(), 9);
        assert_eq!(sink.algorithm(), DigestAlgorithm::Sha1);
    }

    #[test]
    fn output_lengths() {
        for alg in [DigestAlgorithm::Sha1, DigestAlgorithm::Sha256, DigestAlgorithm::Blake3] {
            let raw = DigestSink::new(alg).finalize_raw();
            assert_eq!(raw.len(), alg.output_len(), "{alg}");
        }
    }

    #[test]
    fn hash_output_serde_is_tagged() {
        let out = HashOutput::Hex("ab".into());
        let json = serde_json::to_value(&out).unwrap();
        assert_eq!(json, serde_json::json!({"format": "hex", "value": "ab"}));
    }

    proptest! {
        #[test]
        fn chunking_does_not_change_digest(
            payload in proptest::collection::vec(any::<u8>(), 0..512),
            cut in any::<prop::sample::Index>(),
        ) {
            let split = cut.index(payload.len() + 1);
            let mut sink = DigestSink::new(DigestAlgorithm::Sha1);
            sink.update(&build_header(ObjectKind::Blob, payload.len() as u64));
            sink.update(&payload[..split]);
            sink.update(&[]);
            sink.update(&payload[split..]);
            let chunked = sink.finalize(HashFormat::Hex);
            let whole =
                hash_object(DigestAlgorithm::Sha1, ObjectKind::Blob, &payload, HashFormat::Hex);
            prop_assert_eq!(chunked, whole);
        }
    }
}
