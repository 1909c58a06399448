use chrono::NaiveDate;
use serde_json::json;
use std::collections::BTreeMap;

use crate::ipc::error::err;
use crate::store::StoreError;

pub struct HandlerErr {
    pub code: &'static str,
    pub message: String,
    pub details: Option<serde_json::Value>,
}

impl HandlerErr {
    pub fn bad_params(message: impl Into<String>) -> Self {
        HandlerErr {
            code: "bad_params",
            message: message.into(),
            details: None,
        }
    }

    pub fn response(self, id: &str) -> serde_json::Value {
        err(id, self.code, self.message, self.details)
    }
}

impl From<StoreError> for HandlerErr {
    fn from(e: StoreError) -> Self {
        HandlerErr {
            code: e.code(),
            message: e.to_string(),
            details: None,
        }
    }
}

/// Per-field validation messages collected before any repository call, the
/// same shape the shell renders next to form inputs.
#[derive(Default)]
pub struct FieldErrors {
    fields: BTreeMap<String, String>,
}

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.fields
            .entry(field.to_string())
            .or_insert_with(|| message.into());
    }

    pub fn check(self) -> Result<(), HandlerErr> {
        if self.fields.is_empty() {
            return Ok(());
        }
        Err(HandlerErr {
            code: "validation_failed",
            message: "validation failed".to_string(),
            details: Some(json!({ "fields": self.fields })),
        })
    }
}

pub fn require_id(params: &serde_json::Value, key: &str) -> Result<i64, HandlerErr> {
    params
        .get(key)
        .and_then(|v| v.as_i64())
        .ok_or_else(|| HandlerErr::bad_params(format!("missing {}", key)))
}

pub fn required_str(params: &serde_json::Value, key: &str) -> Result<String, HandlerErr> {
    params
        .get(key)
        .and_then(|v| v.as_str())
        .map(|s| s.to_string())
        .ok_or_else(|| HandlerErr::bad_params(format!("missing {}", key)))
}

/// Present-and-string, trimmed-empty treated as absent (forms submit blank
/// inputs as empty strings).
pub fn str_field<'a>(params: &'a serde_json::Value, key: &str) -> Option<&'a str> {
    params
        .get(key)
        .and_then(|v| v.as_str())
        .filter(|s| !s.trim().is_empty())
}

pub fn has_field(params: &serde_json::Value, key: &str) -> bool {
    params.get(key).map(|v| !v.is_null()).unwrap_or(false)
}

/// Mirrors the dashboard's pattern: one `@`, non-empty local part, and a
/// dot-separated domain with no whitespace anywhere.
pub fn is_valid_email(raw: &str) -> bool {
    if raw.contains(char::is_whitespace) || raw.matches('@').count() != 1 {
        return false;
    }
    let Some((local, domain)) = raw.split_once('@') else {
        return false;
    };
    if local.is_empty() {
        return false;
    }
    match domain.rsplit_once('.') {
        Some((host, tld)) => !host.is_empty() && !tld.is_empty(),
        None => false,
    }
}

/// Strict zero-padded YYYY-MM-DD; anything else fails at the boundary so
/// stored dates always compare lexically in chronological order.
pub fn is_valid_date(raw: &str) -> bool {
    raw.len() == 10 && NaiveDate::parse_from_str(raw, "%Y-%m-%d").is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn email_shape_checks() {
        assert!(is_valid_email("jordan@example.com"));
        assert!(is_valid_email("a.b+c@sub.example.org"));
        assert!(!is_valid_email("missing-at.example.com"));
        assert!(!is_valid_email("@example.com"));
        assert!(!is_valid_email("jordan@example"));
        assert!(!is_valid_email("jordan@.com"));
        assert!(!is_valid_email("jordan doe@example.com"));
        assert!(!is_valid_email("jordan@@example.com"));
    }

    #[test]
    fn date_shape_checks() {
        assert!(is_valid_date("2025-09-08"));
        assert!(!is_valid_date("2025-9-8"));
        assert!(!is_valid_date("09/08/2025"));
        assert!(!is_valid_date("2025-02-30"));
        assert!(!is_valid_date(""));
    }

    #[test]
    fn field_errors_keep_the_first_message_per_field() {
        let mut errors = FieldErrors::new();
        errors.add("email", "Email is required");
        errors.add("email", "Please enter a valid email address");
        let err = errors.check().err().expect("validation error");
        assert_eq!(err.code, "validation_failed");
        let details = err.details.expect("details");
        assert_eq!(
            details["fields"]["email"],
            serde_json::json!("Email is required")
        );
    }
}
