use serde::{Deserialize, Serialize};

use gbs_types::{ObjectId, ObjectKind};

use crate::commit::{parse_id, set_once};
use crate::error::{ObjectError, ObjectResult};
use crate::fields::{check_extra_headers, check_value, push_field, split_block};
use crate::person::{decode_person, format_person, Person};

/// Header keys a tag writes itself.
const TAG_KEYS: &[&str] = &["object", "type", "tag", "tagger"];

/// An annotated, named pointer to another object.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    /// The tagged object.
    pub object: ObjectId,
    /// Kind of the tagged object (the `type` line).
    #[serde(rename = "type")]
    pub kind: ObjectKind,
    /// Tag name (the `tag` line).
    #[serde(rename = "tag")]
    pub name: String,
    pub tagger: Person,
    pub message: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub extra_headers: Vec<(String, String)>,
}

impl Tag {
    pub fn new(
        object: ObjectId,
        kind: ObjectKind,
        name: impl Into<String>,
        tagger: Person,
        message: impl Into<String>,
    ) -> Self {
        Self {
            object,
            kind,
            name: name.into(),
            tagger,
            message: message.into(),
            extra_headers: Vec::new(),
        }
    }

    /// Check that the tag serializes to a payload that parses back to it.
    pub fn validate(&self) -> ObjectResult<()> {
        check_value("tag", &self.name)?;
        self.tagger.validate("tagger")?;
        check_extra_headers(&self.extra_headers, TAG_KEYS)
    }
}

/// Encode a tag payload.
pub fn serialize_tag(tag: &Tag) -> Vec<u8> {
    let mut out = String::new();
    push_field(&mut out, "object", tag.object);
    push_field(&mut out, "type", tag.kind);
    push_field(&mut out, "tag", &tag.name);
    push_field(&mut out, "tagger", format_person(&tag.tagger));
    for (key, value) in &tag.extra_headers {
        push_field(&mut out, key, value);
    }
    out.push('\n');
    out.push_str(&tag.message);
    out.into_bytes()
}

/// Decode a tag payload.
pub fn parse_tag(body: &[u8]) -> ObjectResult<Tag> {
    let block = split_block(body)?;

    let mut object = None;
    let mut kind = None;
    let mut name = None;
    let mut tagger = None;
    let mut extra_headers = Vec::new();

    for (key, value) in block.fields {
        match key.as_str() {
            "object" => set_once(&mut object, "object", parse_id("object", &value)?)?,
            "type" => {
                let parsed = value
                    .parse::<ObjectKind>()
                    .map_err(|e| ObjectError::bad_field("type", e))?;
                set_once(&mut kind, "type", parsed)?
            }
            "tag" => set_once(&mut name, "tag", value)?,
            "tagger" => set_once(&mut tagger, "tagger", decode_person(&value)?)?,
            _ => extra_headers.push((key, value)),
        }
    }

    Ok(Tag {
        object: object.ok_or_else(|| ObjectError::syntax("tag has no object"))?,
        kind: kind.ok_or_else(|| ObjectError::syntax("tag has no type"))?,
        name: name.ok_or_else(|| ObjectError::syntax("tag has no name"))?,
        tagger: tagger.ok_or_else(|| ObjectError::syntax("tag has no tagger"))?,
        message: block.message,
        extra_headers,
    })
}
