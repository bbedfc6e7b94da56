//! Common validation utilities.

use validator::ValidationError;

use crate::duration::parse_duration_secs;

/// Validates that a platform identifier (snowflake) is positive.
pub fn validate_snowflake(id: i64) -> Result<(), ValidationError> {
    if id > 0 {
        Ok(())
    } else {
        let mut err = ValidationError::new("snowflake");
        err.message = Some("Identifier must be a positive integer".into());
        Err(err)
    }
}

/// Validates a human-readable duration string such as `10m`.
pub fn validate_duration(value: &str) -> Result<(), ValidationError> {
    parse_duration_secs(value).map(|_| ()).map_err(|e| {
        let mut err = ValidationError::new("duration");
        err.message = Some(e.to_string().into());
        err
    })
}

/// Validates that a search word for message filters is not blank.
pub fn validate_filter_word(word: &str) -> Result<(), ValidationError> {
    if word.trim().is_empty() {
        let mut err = ValidationError::new("filter_word");
        err.message = Some("Filter word cannot be blank".into());
        Err(err)
    } else {
        Ok(())
    }
}
