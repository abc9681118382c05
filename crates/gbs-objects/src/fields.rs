//! Line-oriented `"key value\n"` header blocks shared by commits and tags.

use crate::error::{ObjectError, ObjectResult};
use crate::tree::find;

/// A decoded header block and the free-form message that follows it.
pub(crate) struct HeaderBlock {
    pub fields: Vec<(String, String)>,
    pub message: String,
}

/// Split a payload into its header lines and message.
///
/// Lines are read until one starts with `\n` (the blank separator line);
/// everything after that newline is the message, verbatim.
pub(crate) fn split_block(body: &[u8]) -> ObjectResult<HeaderBlock> {
    let mut fields = Vec::new();
    let mut pos = 0;

    loop {
        match body.get(pos) {
            None => return Err(ObjectError::syntax("missing blank line before message")),
            Some(b'\n') => break,
            Some(_) => {}
        }

        let lf = find(body, b'\n', pos).ok_or_else(|| ObjectError::syntax("missing linefeed"))?;
        let space =
            find(&body[..lf], b' ', pos).ok_or_else(|| ObjectError::syntax("missing space"))?;

        let key = utf8(&body[pos..space], "header key")?;
        let value = utf8(&body[space + 1..lf], "header value")?;
        fields.push((key, value));
        pos = lf + 1;
    }

    let message = utf8(&body[pos + 1..], "message")?;
    Ok(HeaderBlock { fields, message })
}

/// Append `"key value\n"` to a payload under construction.
pub(crate) fn push_field(out: &mut String, key: &str, value: impl std::fmt::Display) {
    out.push_str(key);
    out.push(' ');
    out.push_str(&value.to_string());
    out.push('\n');
}

/// Reject a header value that would spill onto a second line.
pub(crate) fn check_value(field: &str, value: &str) -> ObjectResult<()> {
    if value.contains('\n') {
        return Err(ObjectError::validation(field, "contains a line feed"));
    }
    Ok(())
}

/// Check pass-through header lines before they are written.
///
/// A key must not contain a space or line feed and must not be one of the
/// record's own keys; a value must stay on one line.
pub(crate) fn check_extra_headers(
    extra: &[(String, String)],
    reserved: &[&str],
) -> ObjectResult<()> {
    for (key, value) in extra {
        let field = format!("extra_headers.{key}");
        if key.contains([' ', '\n']) {
            return Err(ObjectError::validation(field, "key must be a single word"));
        }
        if reserved.contains(&key.as_str()) {
            return Err(ObjectError::validation(field, "key is reserved"));
        }
        check_value(&field, value)?;
    }
    Ok(())
}

fn utf8(bytes: &[u8], what: &str) -> ObjectResult<String> {
    String::from_utf8(bytes.to_vec())
        .map_err(|_| ObjectError::Syntax(format!("{what} is not valid UTF-8")))
}
