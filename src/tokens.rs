//! Session and action token signing.
//!
//! Both token kinds are HS256-signed claim sets over a single configured
//! signing key. Session tokens are long-lived bearer credentials with the
//! historical claim shape (`iat` backdated 30 seconds for clock skew, no
//! expiry). Action tokens authorize exactly one lifecycle transition on a
//! specific entity; they carry an explicit 48-hour expiry plus a secondary
//! `linkKey` claim, so outstanding email links can be invalidated by
//! rotating the link key without touching the signing key.
//!
//! Action tokens are not single-use: replaying one is harmless because the
//! guarded state transition reports zero affected rows on the second
//! attempt.

use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::SystemTime;
use thiserror::Error;
use uuid::Uuid;

pub const ACTION_TOKEN_TTL_SECONDS: i64 = 48 * 60 * 60;

const SESSION_IAT_SKEW_SECONDS: i64 = 30;

#[derive(Debug, Error)]
pub enum TokenError {
    #[error("invalid token")]
    Invalid,
    #[error("failed to sign token")]
    Signing(#[source] jsonwebtoken::errors::Error),
}

/// Bearer session claims. League sessions carry no `leagueId`; coach
/// sessions carry the owning league. That asymmetry is load-bearing:
/// the absence of the tenant claim is what marks a league admin.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SessionClaims {
    pub iat: i64,
    pub id: Uuid,
    #[serde(
        rename = "leagueId",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub league_id: Option<Uuid>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ActionClaims {
    pub id: Uuid,
    pub iat: i64,
    pub exp: i64,
    #[serde(rename = "linkKey")]
    pub link_key: String,
}

#[derive(Clone)]
pub struct TokenService {
    signing_key: SecretString,
    link_key: SecretString,
}

impl TokenService {
    #[must_use]
    pub fn new(signing_key: SecretString, link_key: SecretString) -> Self {
        Self {
            signing_key,
            link_key,
        }
    }

    fn encoding_key(&self) -> EncodingKey {
        EncodingKey::from_secret(self.signing_key.expose_secret().as_bytes())
    }

    fn decoding_key(&self) -> DecodingKey {
        DecodingKey::from_secret(self.signing_key.expose_secret().as_bytes())
    }

    /// Issue a bearer session token for a league admin (`league_id: None`)
    /// or a coach (`league_id: Some`).
    ///
    /// # Errors
    ///
    /// Returns an error if signing fails.
    pub fn issue_session(&self, id: Uuid, league_id: Option<Uuid>) -> Result<String, TokenError> {
        let claims = SessionClaims {
            iat: now_unix_seconds() - SESSION_IAT_SKEW_SECONDS,
            id,
            league_id,
        };
        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key())
            .map_err(TokenError::Signing)
    }

    /// Verify a bearer session token and return its claims.
    ///
    /// # Errors
    ///
    /// Returns `TokenError::Invalid` for anything but a well-signed token.
    pub fn verify_session(&self, token: &str) -> Result<SessionClaims, TokenError> {
        let mut validation = Validation::new(Algorithm::HS256);
        // Sessions keep the historical claim set, which has no expiry.
        validation.validate_exp = false;
        validation.required_spec_claims.clear();

        decode::<SessionClaims>(token, &self.decoding_key(), &validation)
            .map(|data| data.claims)
            .map_err(|_| TokenError::Invalid)
    }

    /// Issue an action token authorizing one lifecycle transition on the
    /// given entity, valid for 48 hours.
    ///
    /// # Errors
    ///
    /// Returns an error if signing fails.
    pub fn issue_action(&self, id: Uuid) -> Result<String, TokenError> {
        self.issue_action_at(id, now_unix_seconds())
    }

    fn issue_action_at(&self, id: Uuid, issued_at: i64) -> Result<String, TokenError> {
        let claims = ActionClaims {
            id,
            iat: issued_at,
            exp: issued_at + ACTION_TOKEN_TTL_SECONDS,
            link_key: self.link_key.expose_secret().to_string(),
        };
        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key())
            .map_err(TokenError::Signing)
    }

    /// Redeem an action token, returning the entity id it authorizes.
    ///
    /// # Errors
    ///
    /// Returns `TokenError::Invalid` when the signature, expiry, or the
    /// embedded link key does not check out. Callers present all of these
    /// as one opaque "link is not valid" failure.
    pub fn redeem_action(&self, token: &str) -> Result<Uuid, TokenError> {
        let validation = Validation::new(Algorithm::HS256);
        let data = decode::<ActionClaims>(token, &self.decoding_key(), &validation)
            .map_err(|_| TokenError::Invalid)?;

        if data.claims.link_key != self.link_key.expose_secret() {
            return Err(TokenError::Invalid);
        }

        Ok(data.claims.id)
    }
}

impl fmt::Debug for TokenService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenService")
            .field("signing_key", &"<redacted>")
            .field("link_key", &"<redacted>")
            .finish()
    }
}

fn now_unix_seconds() -> i64 {
    SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .map(|d| i64::try_from(d.as_secs()).unwrap_or(i64::MAX))
        .unwrap_or(0)
}
