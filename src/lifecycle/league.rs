//! League lifecycle transitions.
//!
//! A league is created `Pending` by self-registration and reviewed
//! out-of-band: registration mails the administration a pair of signed
//! action links (validate/reject). Redemption of either link drives the
//! guarded transition; the affected-row count decides races and replays.

use sqlx::PgPool;
use tracing::warn;
use uuid::Uuid;

use crate::api::email::{notify, Notification, Notifier};
use crate::tokens::TokenService;

use super::{secrets, store, Entity, LifecycleError};

#[derive(Debug, Clone)]
pub struct NewLeague {
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub league_name: String,
    pub phone_number: String,
    pub city: String,
    pub state: String,
}

#[derive(Clone)]
pub struct LeagueLogin {
    pub email: String,
    pub password: String,
    pub league_name: String,
    pub city: String,
    pub state: String,
}

#[derive(Clone)]
pub struct ResetRequest {
    pub email: String,
    pub league_name: String,
    pub city: String,
    pub state: String,
}

/// Create a Pending league and ask the administration to review it.
///
/// The review notification carries both action links; it is dispatched
/// only after the row is committed, and its failure does not undo the
/// registration.
///
/// # Errors
///
/// `DuplicateEmail` when the (email, tenant key) pair already exists.
pub async fn register(
    pool: &PgPool,
    tokens: &TokenService,
    notifier: &dyn Notifier,
    base_url: &str,
    admin_email: &str,
    league: NewLeague,
) -> Result<Uuid, LifecycleError> {
    let id = Uuid::new_v4();
    if let Err(err) = store::insert_league(pool, id, &league).await {
        if store::is_unique_violation(&err) {
            return Err(LifecycleError::DuplicateEmail);
        }
        return Err(err.into());
    }

    match (tokens.issue_action(id), tokens.issue_action(id)) {
        (Ok(validate), Ok(reject)) => notify(
            notifier,
            &Notification::LeagueReviewRequested {
                to: admin_email.to_string(),
                league_name: league.league_name,
                city: league.city,
                state: league.state,
                contact_name: format!("{} {}", league.first_name, league.last_name),
                validate_url: action_url(base_url, "leagues/validate", &validate),
                reject_url: action_url(base_url, "leagues/reject", &reject),
            },
        ),
        _ => warn!("failed to issue review action tokens for league {id}"),
    }

    Ok(id)
}

/// Authenticate a league admin and issue a bearer session token.
///
/// # Errors
///
/// `CredentialMismatch` for unknown identities and wrong passwords alike;
/// `LeaguePending` when the account has not been validated yet.
pub async fn login(
    pool: &PgPool,
    tokens: &TokenService,
    credentials: &LeagueLogin,
) -> Result<String, LifecycleError> {
    let league = store::league_by_identity(
        pool,
        &credentials.email,
        &credentials.league_name,
        &credentials.city,
        &credentials.state,
    )
    .await?
    .ok_or(LifecycleError::CredentialMismatch)?;

    if !league.is_live {
        return Err(LifecycleError::LeaguePending);
    }

    let digest = league
        .password_hash
        .as_deref()
        .ok_or(LifecycleError::CredentialMismatch)?;
    if !secrets::verify(&credentials.password, digest)? {
        return Err(LifecycleError::CredentialMismatch);
    }

    Ok(tokens.issue_session(league.id, None)?)
}

/// Redeem a validation link: flip the league live and set a fresh
/// one-time password, atomically.
///
/// # Errors
///
/// `InvalidActionToken` for a bad link; `AlreadyValidated` when the
/// guarded write affects zero rows (replay or lost race).
pub async fn validate(
    pool: &PgPool,
    tokens: &TokenService,
    notifier: &dyn Notifier,
    token: &str,
) -> Result<(), LifecycleError> {
    let id = tokens
        .redeem_action(token)
        .map_err(|_| LifecycleError::InvalidActionToken)?;

    let one_time_password = secrets::generate_one_time_secret();
    let password_hash = secrets::hash(&one_time_password)?;

    let affected = store::GuardedUpdate::table("leagues")
        .set("is_live", true)
        .set("password_hash", password_hash)
        .filter_eq("id", id)
        .filter("is_live = FALSE", vec![])
        .execute(pool)
        .await?;
    if affected == 0 {
        return Err(LifecycleError::AlreadyValidated(Entity::League));
    }

    match store::league_by_id(pool, id).await? {
        Some(league) => notify(
            notifier,
            &Notification::LeagueValidated {
                to: league.email,
                first_name: league.first_name,
                league_name: league.league_name,
                one_time_password,
            },
        ),
        None => warn!("league {id} validated but vanished before notification"),
    }

    Ok(())
}

/// Redeem a rejection link: delete the league (terminal state).
///
/// # Errors
///
/// `DoesNotExist` when the row is already gone, including a concurrent
/// duplicate rejection.
pub async fn reject(
    pool: &PgPool,
    tokens: &TokenService,
    notifier: &dyn Notifier,
    token: &str,
) -> Result<(), LifecycleError> {
    let id = tokens
        .redeem_action(token)
        .map_err(|_| LifecycleError::InvalidActionToken)?;

    // Recipient data must be read before the delete; the delete itself is
    // the single source of truth for the transition.
    let league = store::league_by_id(pool, id)
        .await?
        .ok_or(LifecycleError::DoesNotExist(Entity::League))?;

    let affected = store::delete_league(pool, id).await?;
    if affected == 0 {
        return Err(LifecycleError::DoesNotExist(Entity::League));
    }

    notify(
        notifier,
        &Notification::LeagueRejected {
            to: league.email,
            first_name: league.first_name,
            league_name: league.league_name,
        },
    );

    Ok(())
}

/// Unauthenticated password reset by identity claim: a new one-time
/// password is written for a Validated league matching the composite key.
///
/// # Errors
///
/// `ResetPending` when the record exists but has not been validated,
/// `NoSuchEmail` when no record matches; the two are distinguished by a
/// follow-up read after the guarded write reports zero rows.
pub async fn reset_password(
    pool: &PgPool,
    notifier: &dyn Notifier,
    request: &ResetRequest,
) -> Result<(), LifecycleError> {
    let one_time_password = secrets::generate_one_time_secret();
    let password_hash = secrets::hash(&one_time_password)?;

    let affected = store::GuardedUpdate::table("leagues")
        .set("password_hash", password_hash)
        .filter_eq("email", request.email.as_str())
        .filter_eq("league_name", request.league_name.as_str())
        .filter_eq("city", request.city.as_str())
        .filter_eq("state", request.state.as_str())
        .filter("is_live = TRUE", vec![])
        .execute(pool)
        .await?;

    let league = store::league_by_identity(
        pool,
        &request.email,
        &request.league_name,
        &request.city,
        &request.state,
    )
    .await?;

    if affected == 0 {
        return Err(match league {
            Some(_) => LifecycleError::ResetPending,
            None => LifecycleError::NoSuchEmail,
        });
    }

    match league {
        Some(league) => notify(
            notifier,
            &Notification::LeaguePasswordReset {
                to: league.email,
                first_name: league.first_name,
                one_time_password,
            },
        ),
        None => warn!("league password reset applied but row vanished before notification"),
    }

    Ok(())
}

/// Authenticated password change, scoped to the authenticated league only.
///
/// # Errors
///
/// `PasswordsMatch` before any store access when old and new are equal;
/// `WrongCurrentPassword` when the old password does not verify;
/// `WeakPassword` when the new password fails the policy.
pub async fn change_password(
    pool: &PgPool,
    league_id: Uuid,
    old_password: &str,
    new_password: &str,
) -> Result<(), LifecycleError> {
    if old_password.is_empty() || new_password.is_empty() {
        return Err(LifecycleError::MissingFields);
    }
    if old_password == new_password {
        return Err(LifecycleError::PasswordsMatch);
    }
    if !secrets::meets_password_policy(old_password) {
        // A password that cannot pass the policy cannot be the current one.
        return Err(LifecycleError::WrongCurrentPassword);
    }
    if !secrets::meets_password_policy(new_password) {
        return Err(LifecycleError::WeakPassword);
    }

    let league = store::league_by_id(pool, league_id)
        .await?
        .ok_or(LifecycleError::WrongCurrentPassword)?;
    let digest = league
        .password_hash
        .as_deref()
        .ok_or(LifecycleError::WrongCurrentPassword)?;
    if !secrets::verify(old_password, digest)? {
        return Err(LifecycleError::WrongCurrentPassword);
    }

    let affected = store::GuardedUpdate::table("leagues")
        .set("password_hash", secrets::hash(new_password)?)
        .filter_eq("id", league_id)
        .execute(pool)
        .await?;
    if affected == 0 {
        return Err(LifecycleError::WrongCurrentPassword);
    }

    Ok(())
}

fn action_url(base_url: &str, path: &str, token: &str) -> String {
    let base = base_url.trim_end_matches('/');
    format!("{base}/{path}#token={token}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn action_url_trims_trailing_slash() {
        let url = action_url("https://leaguedesk.example.com/", "leagues/validate", "tok");
        assert_eq!(
            url,
            "https://leaguedesk.example.com/leagues/validate#token=tok"
        );
    }
}
