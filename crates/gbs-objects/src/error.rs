use gbs_types::TypeError;

/// Errors from building, encoding, or parsing structured records.
#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
pub enum ObjectError {
    /// A caller-supplied record is missing a field or has a wrong-typed one.
    #[error("validation error in `{field}`: {reason}")]
    Validation { field: String, reason: String },

    /// A payload does not follow its wire encoding.
    #[error("syntax error: {0}")]
    Syntax(String),

    /// A person line does not match `"<name> <<email>> <seconds> <±HHMM>"`.
    #[error("malformed person: {0}")]
    MalformedPerson(String),
}

impl ObjectError {
    /// Create a validation error for a named field.
    pub fn validation(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Create a missing-field validation error.
    pub fn missing(field: impl Into<String>) -> Self {
        Self::validation(field, "required field is missing")
    }

    pub(crate) fn syntax(message: impl Into<String>) -> Self {
        Self::Syntax(message.into())
    }

    /// Map a type error raised while parsing a wire field.
    pub(crate) fn bad_field(field: &str, err: TypeError) -> Self {
        Self::Syntax(format!("invalid {field}: {err}"))
    }
}

/// Result alias for record operations.
pub type ObjectResult<T> = Result<T, ObjectError>;
