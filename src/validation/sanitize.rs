//! Free-text field sanitizer.
//!
//! Every user-supplied string passes through [`sanitize`] before it is
//! forwarded: trimmed, bounded by a [`FieldLimit`] and stripped of markup
//! characters the backend never stores.

use serde_json::Value;

/// Characters rejected in any sanitized field
pub const FORBIDDEN_CHARS: [char; 5] = ['<', '>', '{', '}', '\\'];

/// Outcome of sanitizing one field: `Ok(None)` for absent/blank input
pub type SanitizeResult = Result<Option<String>, SanitizeError>;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SanitizeError {
    #[error("must be a string")]
    NotAString,

    #[error("exceeds maximum length of {max} characters")]
    TooLong { max: usize },

    #[error("contains forbidden characters")]
    ForbiddenCharacters,

    /// Raised by callers that demand a value, never by [`sanitize`] itself
    #[error("is required")]
    Required,
}

/// Sanitize a raw JSON field value.
///
/// - absent, `null`, `""` or all-whitespace → `Ok(None)`
/// - non-string → [`SanitizeError::NotAString`]
/// - trimmed length > `max_len` → [`SanitizeError::TooLong`]
/// - any of `< > { } \` → [`SanitizeError::ForbiddenCharacters`]
pub fn sanitize(value: Option<&Value>, max_len: usize) -> SanitizeResult {
    let raw = match value {
        None | Some(Value::Null) => return Ok(None),
        Some(Value::String(s)) => s,
        Some(_) => return Err(SanitizeError::NotAString),
    };

    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    if trimmed.chars().count() > max_len {
        return Err(SanitizeError::TooLong { max: max_len });
    }
    if trimmed.contains(&FORBIDDEN_CHARS[..]) {
        return Err(SanitizeError::ForbiddenCharacters);
    }
    Ok(Some(trimmed.to_string()))
}

// ============================================================================
// FieldLimit
// ============================================================================

/// Maximum character length for one named payload field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldLimit {
    pub field: &'static str,
    pub max_len: usize,
}

/// A sanitizer failure attributed to a field, e.g.
/// `product_name exceeds maximum length of 200 characters`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{field} {source}")]
pub struct FieldError {
    pub field: &'static str,
    pub source: SanitizeError,
}

impl FieldLimit {
    pub const PRODUCT_NAME: FieldLimit = FieldLimit::new("product_name", 200);
    pub const BRAND: FieldLimit = FieldLimit::new("brand", 100);
    pub const CATEGORY: FieldLimit = FieldLimit::new("category", 100);
    pub const PHOTO_URL: FieldLimit = FieldLimit::new("photo_url", 500);
    pub const NOTES: FieldLimit = FieldLimit::new("notes", 1000);
    pub const EVENT_NAME: FieldLimit = FieldLimit::new("event_name", 100);
    pub const SESSION_ID: FieldLimit = FieldLimit::new("session_id", 100);
    pub const SEARCH_NAME: FieldLimit = FieldLimit::new("name", 100);
    pub const SEARCH_QUERY: FieldLimit = FieldLimit::new("query", 200);

    pub const fn new(field: &'static str, max_len: usize) -> Self {
        Self { field, max_len }
    }

    /// Sanitize an optional field.
    pub fn optional(&self, value: Option<&Value>) -> Result<Option<String>, FieldError> {
        sanitize(value, self.max_len).map_err(|source| self.error(source))
    }

    /// Sanitize a field that must be non-empty after trimming.
    pub fn required(&self, value: Option<&Value>) -> Result<String, FieldError> {
        self.optional(value)?
            .ok_or_else(|| self.error(SanitizeError::Required))
    }

    fn error(&self, source: SanitizeError) -> FieldError {
        FieldError {
            field: self.field,
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn s(v: &str) -> Value {
        Value::String(v.to_string())
    }

    #[test]
    fn test_absent_and_blank_normalize_to_none() {
        assert_eq!(sanitize(None, 10), Ok(None));
        assert_eq!(sanitize(Some(&Value::Null), 10), Ok(None));
        assert_eq!(sanitize(Some(&s("")), 10), Ok(None));
        assert_eq!(sanitize(Some(&s(" \t\n ")), 10), Ok(None));
    }

    #[test]
    fn test_non_string_rejected() {
        assert_eq!(sanitize(Some(&json!(42)), 10), Err(SanitizeError::NotAString));
        assert_eq!(
            sanitize(Some(&json!(["a"])), 10),
            Err(SanitizeError::NotAString)
        );
        assert_eq!(sanitize(Some(&json!(false)), 10), Err(SanitizeError::NotAString));
    }

    #[test]
    fn test_length_boundary() {
        let exact = "a".repeat(20);
        let over = "a".repeat(21);
        assert_eq!(sanitize(Some(&s(&exact)), 20), Ok(Some(exact.clone())));
        assert_eq!(
            sanitize(Some(&s(&over)), 20),
            Err(SanitizeError::TooLong { max: 20 })
        );
    }

    #[test]
    fn test_length_measured_after_trim() {
        let padded = format!("  {}  ", "b".repeat(5));
        assert_eq!(sanitize(Some(&s(&padded)), 5), Ok(Some("bbbbb".to_string())));
    }

    #[test]
    fn test_length_counts_characters_not_bytes() {
        // 4 chars, 7 bytes
        assert_eq!(sanitize(Some(&s("żółw")), 4), Ok(Some("żółw".to_string())));
    }

    #[test]
    fn test_forbidden_characters_rejected_regardless_of_length() {
        for c in FORBIDDEN_CHARS {
            let value = format!("ok{}", c);
            assert_eq!(
                sanitize(Some(&s(&value)), 1000),
                Err(SanitizeError::ForbiddenCharacters),
                "char {:?} should be rejected",
                c
            );
        }
        assert_eq!(
            sanitize(Some(&s("<")), 1),
            Err(SanitizeError::ForbiddenCharacters)
        );
    }

    #[test]
    fn test_field_error_message_includes_field_name() {
        let err = FieldLimit::PRODUCT_NAME
            .optional(Some(&s(&"x".repeat(201))))
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "product_name exceeds maximum length of 200 characters"
        );
    }

    #[test]
    fn test_required_field() {
        let err = FieldLimit::SEARCH_NAME.required(Some(&s("   "))).unwrap_err();
        assert_eq!(err.to_string(), "name is required");
        assert_eq!(
            FieldLimit::SEARCH_NAME.required(Some(&s(" Vegan "))).unwrap(),
            "Vegan"
        );
    }
}
