pub mod coach;
pub mod health;
pub mod league;
pub mod principal;

// common functions for the handlers
use crate::lifecycle::LifecycleError;
use axum::http::StatusCode;
use regex::Regex;
use tracing::error;

pub fn valid_email(email: &str) -> bool {
    Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").is_ok_and(|re| re.is_match(email))
}

pub fn valid_phone(phone: &str) -> bool {
    Regex::new(r"^\(?([0-9]{3})\)?[-. ]?([0-9]{3})[-. ]?([0-9]{4})$")
        .is_ok_and(|re| re.is_match(phone))
}

/// Every listed field must be present and non-empty.
pub fn require_all(fields: &[&str]) -> Result<(), LifecycleError> {
    if fields.iter().any(|field| field.trim().is_empty()) {
        return Err(LifecycleError::MissingFields);
    }
    Ok(())
}

/// Map a lifecycle failure onto the wire, keeping infrastructure causes
/// server-side only.
pub fn reply(err: LifecycleError) -> (StatusCode, String) {
    if let LifecycleError::Infra(cause) = &err {
        error!("lifecycle operation failed: {cause:#}");
    }
    (err.status(), err.to_string())
}
