//! Account lifecycle state machine for leagues and coaches.
//!
//! States per entity: `Pending` (initial), `Validated`, `Rejected`
//! (terminal, modeled as row deletion). All transitions go through the
//! guarded conditional writes in [`store`]; the affected-row count is the
//! sole concurrency primitive, so no in-process locks exist anywhere in
//! this module tree.
//!
//! Operations that generate a one-time password hash it *before* the
//! guarded write and mail the plaintext *after* it, exactly once. A
//! notification failure after a committed transition is logged and never
//! rolls the transition back.

pub mod coach;
pub mod league;
pub mod secrets;
pub(crate) mod store;

use axum::http::StatusCode;
use std::fmt;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Entity {
    League,
    Coach,
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::League => write!(f, "league"),
            Self::Coach => write!(f, "coach"),
        }
    }
}

/// Every way a lifecycle operation can fail, with its user-facing message.
///
/// Guard-predicate failures are expected and deterministic; infrastructure
/// failures collapse to a single generic message, with the cause kept for
/// operator-side logs only.
#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("All form fields are required.")]
    MissingFields,
    #[error("Invalid email. Email format should be: email@mailserver.com.")]
    InvalidEmail,
    #[error("Invalid phone number. Phone number format should be XXX-XXX-XXXX.")]
    InvalidPhone,
    #[error("Password must be at least 8 characters long and have a lowercase letter, an uppercase letter, and a number.")]
    WeakPassword,
    #[error("Old password and new password should not match.")]
    PasswordsMatch,
    #[error("This link is not valid.")]
    InvalidActionToken,
    #[error("Email/password/league name does not match.")]
    CredentialMismatch,
    #[error("Account needs to be validated by the administration.")]
    LeaguePending,
    #[error("Your account has not been validated.")]
    CoachPending,
    #[error("Current password is incorrect.")]
    WrongCurrentPassword,
    #[error("This {0} has already been validated.")]
    AlreadyValidated(Entity),
    #[error("This {0} does not exist.")]
    DoesNotExist(Entity),
    #[error("Please wait for your account to be validated before trying to reset your password.")]
    ResetPending,
    #[error("There is no such email associated with this league.")]
    NoSuchEmail,
    #[error("Email already associated with this league.")]
    DuplicateEmail,
    #[error("Please contact an admin.")]
    Infra(#[source] anyhow::Error),
}

impl LifecycleError {
    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self {
            Self::MissingFields
            | Self::InvalidEmail
            | Self::InvalidPhone
            | Self::WeakPassword
            | Self::PasswordsMatch
            | Self::InvalidActionToken => StatusCode::BAD_REQUEST,
            Self::CredentialMismatch
            | Self::LeaguePending
            | Self::CoachPending
            | Self::WrongCurrentPassword => StatusCode::UNAUTHORIZED,
            Self::AlreadyValidated(_) | Self::DuplicateEmail | Self::ResetPending => {
                StatusCode::CONFLICT
            }
            Self::DoesNotExist(_) | Self::NoSuchEmail => StatusCode::NOT_FOUND,
            Self::Infra(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<sqlx::Error> for LifecycleError {
    fn from(err: sqlx::Error) -> Self {
        Self::Infra(err.into())
    }
}

impl From<crate::tokens::TokenError> for LifecycleError {
    fn from(err: crate::tokens::TokenError) -> Self {
        Self::Infra(err.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_are_entity_specific() {
        assert_eq!(
            LifecycleError::AlreadyValidated(Entity::League).to_string(),
            "This league has already been validated."
        );
        assert_eq!(
            LifecycleError::DoesNotExist(Entity::Coach).to_string(),
            "This coach does not exist."
        );
    }

    #[test]
    fn infra_message_never_echoes_the_cause() {
        let err = LifecycleError::Infra(anyhow::anyhow!("connection refused to 10.0.0.7:5432"));
        assert_eq!(err.to_string(), "Please contact an admin.");
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn guard_failures_keep_their_statuses() {
        assert_eq!(
            LifecycleError::CredentialMismatch.status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            LifecycleError::AlreadyValidated(Entity::Coach).status(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            LifecycleError::NoSuchEmail.status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            LifecycleError::PasswordsMatch.status(),
            StatusCode::BAD_REQUEST
        );
    }
}
