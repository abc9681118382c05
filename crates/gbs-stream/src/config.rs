use serde::{Deserialize, Serialize};

use gbs_crypto::{DigestAlgorithm, HashFormat};
use gbs_types::ObjectKind;

use crate::error::{StreamError, StreamResult};

/// Default zlib compression level.
pub const DEFAULT_COMPRESSION_LEVEL: u32 = 6;

/// Where an encoder's framed bytes go.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputMode {
    /// Compressed bytes flow to the downstream consumer.
    #[default]
    Passthrough,
    /// Nothing is compressed or emitted; only the digest result is produced.
    SinkOnly,
}

/// Configuration for one encode operation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EncoderConfig {
    /// Object kind written into the header.
    pub kind: ObjectKind,
    /// Declared payload length. When set, the encoder streams; when absent
    /// it buffers the payload to discover the length.
    pub size: Option<u64>,
    pub hash_format: HashFormat,
    pub algorithm: DigestAlgorithm,
    pub output: OutputMode,
    /// zlib level, 0 (store) to 9 (best).
    pub compression_level: u32,
    /// Structured writers only: require typed input and skip normalization.
    pub strict: bool,
}

impl Default for EncoderConfig {
    fn default() -> Self {
        Self {
            kind: ObjectKind::Blob,
            size: None,
            hash_format: HashFormat::Hex,
            algorithm: DigestAlgorithm::Sha1,
            output: OutputMode::Passthrough,
            compression_level: DEFAULT_COMPRESSION_LEVEL,
            strict: false,
        }
    }
}

impl EncoderConfig {
    /// Configuration for a single kind with defaults elsewhere.
    pub fn for_kind(kind: ObjectKind) -> Self {
        Self {
            kind,
            ..Default::default()
        }
    }

    /// Hash-only configuration: no compressed output is produced.
    pub fn sink() -> Self {
        Self {
            output: OutputMode::SinkOnly,
            ..Default::default()
        }
    }

    pub fn with_kind(mut self, kind: ObjectKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn with_size(mut self, size: u64) -> Self {
        self.size = Some(size);
        self
    }

    pub fn with_hash_format(mut self, format: HashFormat) -> Self {
        self.hash_format = format;
        self
    }

    pub fn with_algorithm(mut self, algorithm: DigestAlgorithm) -> Self {
        self.algorithm = algorithm;
        self
    }

    pub fn with_output(mut self, output: OutputMode) -> Self {
        self.output = output;
        self
    }

    pub fn with_compression_level(mut self, level: u32) -> Self {
        self.compression_level = level;
        self
    }

    pub fn with_strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    /// Returns `true` if compressed bytes are produced.
    pub fn emits_output(&self) -> bool {
        self.output == OutputMode::Passthrough
    }

    /// Reject out-of-range values before any byte is processed.
    pub fn validate(&self) -> StreamResult<()> {
        if self.compression_level > 9 {
            return Err(StreamError::Config(format!(
                "compression_level must be 0..=9, got {}",
                self.compression_level
            )));
        }
        Ok(())
    }

    /// Parse and validate a JSON configuration. Missing fields take defaults.
    pub fn from_json(text: &str) -> StreamResult<Self> {
        let config: Self =
            serde_json::from_str(text).map_err(|e| StreamError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }
}

/// What a decoder emits once the header is parsed.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecodeMode {
    /// Forward payload bytes with the header stripped.
    #[default]
    Payload,
    /// Emit nothing; the parsed header is the only result.
    HeaderOnly,
}

/// Configuration for one decode operation.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DecoderConfig {
    pub mode: DecodeMode,
    /// Compare the declared size with the payload length at finish.
    pub verify_size: bool,
}

impl DecoderConfig {
    pub fn header_only() -> Self {
        Self {
            mode: DecodeMode::HeaderOnly,
            ..Default::default()
        }
    }

    pub fn with_verify_size(mut self, verify: bool) -> Self {
        self.verify_size = verify;
        self
    }

    pub fn from_json(text: &str) -> StreamResult<Self> {
        serde_json::from_str(text).map_err(|e| StreamError::Config(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = EncoderConfig::default();
        assert_eq!(config.kind, ObjectKind::Blob);
        assert_eq!(config.size, None);
        assert_eq!(config.hash_format, HashFormat::Hex);
        assert_eq!(config.algorithm, DigestAlgorithm::Sha1);
        assert!(config.emits_output());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn sink_suppresses_output() {
        assert!(!EncoderConfig::sink().emits_output());
    }

    #[test]
    fn rejects_out_of_range_level() {
        let err = EncoderConfig::default()
            .with_compression_level(10)
            .validate()
            .unwrap_err();
        assert!(matches!(err, StreamError::Config(_)));
    }

    #[test]
    fn from_json_fills_defaults() {
        let config = EncoderConfig::from_json(r#"{"kind": "tree", "size": 40}"#).unwrap();
        assert_eq!(config.kind, ObjectKind::Tree);
        assert_eq!(config.size, Some(40));
        assert_eq!(config.compression_level, DEFAULT_COMPRESSION_LEVEL);
    }

    #[test]
    fn from_json_rejects_unknown_kind() {
        let err = EncoderConfig::from_json(r#"{"kind": "snapshot"}"#).unwrap_err();
        assert!(matches!(err, StreamError::Config(_)));
    }

    #[test]
    fn from_json_rejects_fractional_size() {
        let err = EncoderConfig::from_json(r#"{"size": 1.5}"#).unwrap_err();
        assert!(matches!(err, StreamError::Config(_)));
    }

    #[test]
    fn from_json_validates_level() {
        let err = EncoderConfig::from_json(r#"{"compression_level": 12}"#).unwrap_err();
        assert!(matches!(err, StreamError::Config(_)));
    }

    #[test]
    fn decoder_config_from_json() {
        let config = DecoderConfig::from_json(r#"{"mode": "header_only"}"#).unwrap();
        assert_eq!(config, DecoderConfig::header_only());
        assert!(!config.verify_size);
    }
}
