//! Cleaning rules for person names and emails.
//!
//! A person line is `"<name> <<email>> ..."`, so the angle brackets and line
//! structure must never leak out of the name or email. The policy, applied to
//! each line of the input independently:
//!
//! 1. Strip a leading run of [`EDGE_PUNCTUATION`].
//! 2. Strip a trailing run of [`EDGE_PUNCTUATION`].
//! 3. Delete every [`FORBIDDEN`] character that remains.
//!
//! The lines are then joined without separators (the newline itself is
//! forbidden). Sanitization is one-way: the original text is not recoverable.

/// Characters stripped from the start and end of each line.
pub const EDGE_PUNCTUATION: &[char] = &['.', ',', ':', ';', '<', '>', '"', '\''];

/// Characters deleted wherever they appear.
pub const FORBIDDEN: &[char] = &['\0', '\n', '<', '>'];

/// Apply the person-field cleaning policy.
pub fn sanitize(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for line in input.split('\n') {
        let trimmed = line
            .trim_start_matches(EDGE_PUNCTUATION)
            .trim_end_matches(EDGE_PUNCTUATION);
        out.extend(trimmed.chars().filter(|c| !FORBIDDEN.contains(c)));
    }
    out
}

/// Returns `true` if [`sanitize`] would leave the input unchanged.
pub fn is_sanitized(input: &str) -> bool {
    sanitize(input) == input
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_leading_punctuation() {
        assert_eq!(sanitize(".Bob"), "Bob");
        assert_eq!(sanitize("\"'Alice"), "Alice");
    }

    #[test]
    fn strips_trailing_punctuation() {
        assert_eq!(sanitize("Bob Jr."), "Bob Jr");
        assert_eq!(sanitize("bob@example.com>"), "bob@example.com");
    }

    #[test]
    fn keeps_interior_punctuation() {
        assert_eq!(sanitize("J. R. Hacker"), "J. R. Hacker");
        assert_eq!(sanitize("first.last@example.com"), "first.last@example.com");
    }

    #[test]
    fn removes_forbidden_characters_anywhere() {
        assert_eq!(sanitize("Bo<b>by"), "Bobby");
        assert_eq!(sanitize("a\0b"), "ab");
    }

    #[test]
    fn newline_splits_edges() {
        // Each line is trimmed on its own, then the newline is dropped.
        assert_eq!(sanitize("Bob.\n.Smith"), "BobSmith");
    }

    #[test]
    fn edge_run_stops_at_forbidden_non_punctuation() {
        // NUL is not edge punctuation, so the dot after it survives.
        assert_eq!(sanitize("\0.a"), ".a");
        assert_eq!(sanitize("a.\0"), "a.");
    }

    #[test]
    fn all_punctuation_becomes_empty() {
        assert_eq!(sanitize("..;:"), "");
        assert_eq!(sanitize(""), "");
    }

    #[test]
    fn is_sanitized_detects_clean_input() {
        assert!(is_sanitized("Bozo the Clown"));
        assert!(!is_sanitized(".Bozo"));
    }
}
