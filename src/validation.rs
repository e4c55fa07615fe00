//! Payload validation for inbound operation requests.
//!
//! A set of free functions returning `SchedulerError::Validation` with the
//! offending field named, called at the top of each component operation
//! before any state mutation.

use crate::error::{SchedulerError, SchedulerResult};

pub fn require_non_empty(field: &str, value: &str) -> SchedulerResult<()> {
    if value.trim().is_empty() {
        return Err(SchedulerError::Validation {
            field: field.to_string(),
            reason: "must not be empty".to_string(),
        });
    }
    Ok(())
}

pub fn require_full_name(field: &str, value: &str) -> SchedulerResult<()> {
    require_non_empty(field, value)?;
    if !value.contains('/') || value.starts_with('/') || value.ends_with('/') {
        return Err(SchedulerError::Validation {
            field: field.to_string(),
            reason: "must be of the form owner/name".to_string(),
        });
    }
    Ok(())
}

pub fn require_known_variant(field: &str, value: &str, known: &[&str]) -> SchedulerResult<()> {
    if !known.contains(&value) {
        return Err(SchedulerError::Validation {
            field: field.to_string(),
            reason: format!("must be one of {known:?}, got {value:?}"),
        });
    }
    Ok(())
}

pub fn require_non_negative(field: &str, value: i64) -> SchedulerResult<()> {
    if value < 0 {
        return Err(SchedulerError::Validation {
            field: field.to_string(),
            reason: "must be non-negative".to_string(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_empty_field() {
        assert!(require_non_empty("name", "").is_err());
        assert!(require_non_empty("name", "   ").is_err());
        assert!(require_non_empty("name", "ok").is_ok());
    }

    #[test]
    fn validates_full_name_shape() {
        assert!(require_full_name("fullName", "acme/foo").is_ok());
        assert!(require_full_name("fullName", "acme").is_err());
        assert!(require_full_name("fullName", "/foo").is_err());
        assert!(require_full_name("fullName", "acme/").is_err());
    }

    #[test]
    fn validates_known_variant() {
        assert!(require_known_variant("priority", "high", &["high", "low"]).is_ok());
        assert!(require_known_variant("priority", "urgent", &["high", "low"]).is_err());
    }
}
