//! Coach lifecycle transitions.
//!
//! Coaches belong to exactly one league. Self-registration creates a
//! Pending coach whose tenant is resolved from the composite league key;
//! the trusted admin path creates a Validated coach directly. Validation
//! and rejection are admin operations whose guards carry the tenant scope,
//! so cross-tenant ids are rejected by the predicate itself.

use sqlx::PgPool;
use tracing::warn;
use uuid::Uuid;

use crate::api::email::{notify, Notification, Notifier};
use crate::tokens::TokenService;

use super::league::ResetRequest;
use super::{secrets, store, Entity, LifecycleError};

#[derive(Debug, Clone)]
pub struct NewCoach {
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub phone_number: String,
    pub division: String,
    pub birthday: String,
    pub gender: String,
    pub address: String,
    pub city: String,
    pub state: String,
    pub zip: String,
    pub years_experience: i16,
    pub past_league: String,
}

#[derive(Clone)]
pub struct CoachLogin {
    pub email: String,
    pub password: String,
    pub league_name: String,
    pub city: String,
    pub state: String,
}

/// Self-registration: resolve the owning league from the composite key and
/// create a Pending coach. The league admin is notified so they can act.
///
/// # Errors
///
/// `DoesNotExist(League)` when the composite key resolves to nothing;
/// `DuplicateEmail` when the email is already registered in that league.
pub async fn register(
    pool: &PgPool,
    notifier: &dyn Notifier,
    league_name: &str,
    league_city: &str,
    league_state: &str,
    coach: NewCoach,
) -> Result<Uuid, LifecycleError> {
    let league = store::league_by_tenant_key(pool, league_name, league_city, league_state)
        .await?
        .ok_or(LifecycleError::DoesNotExist(Entity::League))?;

    let id = Uuid::new_v4();
    let insert = store::CoachInsert {
        id,
        league_id: league.id,
        team_id: None,
        coach_type: store::COACH_TYPE_SELF_REGISTERED,
        validated: false,
        password_hash: None,
        coach: &coach,
    };
    if let Err(err) = store::insert_coach(pool, &insert).await {
        if store::is_unique_violation(&err) {
            return Err(LifecycleError::DuplicateEmail);
        }
        return Err(err.into());
    }

    notify(
        notifier,
        &Notification::CoachRegistered {
            to: league.email,
            coach_name: format!("{} {}", coach.first_name, coach.last_name),
            league_name: league.league_name,
        },
    );

    Ok(id)
}

/// Trusted admin path: create a coach already Validated, with a generated
/// one-time password mailed to them. Bypasses the review workflow.
///
/// # Errors
///
/// `DoesNotExist(League)` when the acting admin's league is gone;
/// `DuplicateEmail` on a duplicate email within the league.
pub async fn create(
    pool: &PgPool,
    notifier: &dyn Notifier,
    league_id: Uuid,
    team_id: Uuid,
    coach: NewCoach,
) -> Result<Uuid, LifecycleError> {
    let league = store::league_by_id(pool, league_id)
        .await?
        .ok_or(LifecycleError::DoesNotExist(Entity::League))?;

    let one_time_password = secrets::generate_one_time_secret();
    let password_hash = secrets::hash(&one_time_password)?;

    let id = Uuid::new_v4();
    let insert = store::CoachInsert {
        id,
        league_id,
        team_id: Some(team_id),
        coach_type: store::COACH_TYPE_PREVERIFIED,
        validated: true,
        password_hash: Some(&password_hash),
        coach: &coach,
    };
    if let Err(err) = store::insert_coach(pool, &insert).await {
        if store::is_unique_violation(&err) {
            return Err(LifecycleError::DuplicateEmail);
        }
        return Err(err.into());
    }

    notify(
        notifier,
        &Notification::CoachWelcome {
            to: coach.email,
            first_name: coach.first_name,
            league_name: league.league_name,
            one_time_password,
        },
    );

    Ok(id)
}

/// Authenticate a coach and issue a bearer session token carrying the
/// owning league.
///
/// # Errors
///
/// `CredentialMismatch` for unknown identities and wrong passwords alike;
/// `CoachPending` when the account has not been validated yet.
pub async fn login(
    pool: &PgPool,
    tokens: &TokenService,
    credentials: &CoachLogin,
) -> Result<String, LifecycleError> {
    let coach = store::coach_by_identity(
        pool,
        &credentials.email,
        &credentials.league_name,
        &credentials.city,
        &credentials.state,
    )
    .await?
    .ok_or(LifecycleError::CredentialMismatch)?;

    if !coach.validated {
        return Err(LifecycleError::CoachPending);
    }

    let digest = coach
        .password_hash
        .as_deref()
        .ok_or(LifecycleError::CredentialMismatch)?;
    if !secrets::verify(&credentials.password, digest)? {
        return Err(LifecycleError::CredentialMismatch);
    }

    Ok(tokens.issue_session(coach.id, Some(coach.league_id))?)
}

/// Validate a Pending coach on behalf of the owning league's admin.
///
/// The guard carries identity, tenant scope, and prior state; an unknown
/// or cross-tenant id is indistinguishable from a replay and reports
/// already-validated.
///
/// # Errors
///
/// `AlreadyValidated(Coach)` when the guarded write affects zero rows.
pub async fn validate(
    pool: &PgPool,
    notifier: &dyn Notifier,
    league_id: Uuid,
    coach_id: Uuid,
) -> Result<(), LifecycleError> {
    let one_time_password = secrets::generate_one_time_secret();
    let password_hash = secrets::hash(&one_time_password)?;

    let affected = store::GuardedUpdate::table("coaches")
        .set("validated", true)
        .set("password_hash", password_hash)
        .filter_eq("id", coach_id)
        .filter_eq("league_id", league_id)
        .filter("validated = FALSE", vec![])
        .execute(pool)
        .await?;
    if affected == 0 {
        return Err(LifecycleError::AlreadyValidated(Entity::Coach));
    }

    let coach = store::coach_by_id(pool, coach_id, league_id).await?;
    let league = store::league_by_id(pool, league_id).await?;
    match (coach, league) {
        (Some(coach), Some(league)) => notify(
            notifier,
            &Notification::CoachValidated {
                to: coach.email,
                first_name: coach.first_name,
                league_name: league.league_name,
                one_time_password,
            },
        ),
        _ => warn!("coach {coach_id} validated but vanished before notification"),
    }

    Ok(())
}

/// Assign a validated coach to a team, optionally moving its division.
/// Only the supplied fields are written.
///
/// # Errors
///
/// `MissingFields` when nothing is supplied; `DoesNotExist(Coach)` when
/// the tenant-scoped row is gone.
pub async fn assign(
    pool: &PgPool,
    league_id: Uuid,
    coach_id: Uuid,
    team_id: Option<Uuid>,
    division: Option<String>,
) -> Result<(), LifecycleError> {
    if team_id.is_none() && division.is_none() {
        return Err(LifecycleError::MissingFields);
    }

    let affected = store::GuardedUpdate::table("coaches")
        .set_if("team_id", team_id)
        .set_if("division", division)
        .filter_eq("id", coach_id)
        .filter_eq("league_id", league_id)
        .execute(pool)
        .await?;
    if affected == 0 {
        return Err(LifecycleError::DoesNotExist(Entity::Coach));
    }

    Ok(())
}

/// Reject (delete) a coach on behalf of the owning league's admin.
///
/// # Errors
///
/// `DoesNotExist(Coach)` when the tenant-scoped row is already gone,
/// including a concurrent duplicate rejection.
pub async fn reject(
    pool: &PgPool,
    notifier: &dyn Notifier,
    league_id: Uuid,
    coach_id: Uuid,
) -> Result<(), LifecycleError> {
    let coach = store::coach_by_id(pool, coach_id, league_id)
        .await?
        .ok_or(LifecycleError::DoesNotExist(Entity::Coach))?;

    let affected = store::delete_coach(pool, coach_id, league_id).await?;
    if affected == 0 {
        return Err(LifecycleError::DoesNotExist(Entity::Coach));
    }

    let league = store::league_by_id(pool, league_id).await?;
    notify(
        notifier,
        &Notification::CoachRejected {
            to: coach.email,
            first_name: coach.first_name,
            league_name: league.map(|league| league.league_name).unwrap_or_default(),
        },
    );

    Ok(())
}

/// Unauthenticated password reset by identity claim; the tenant is
/// resolved inside the guard via the composite-key subselect.
///
/// # Errors
///
/// Mirrors the league reset: `ResetPending` vs `NoSuchEmail`, decided by a
/// follow-up read when the guarded write affects zero rows.
pub async fn reset_password(
    pool: &PgPool,
    notifier: &dyn Notifier,
    request: &ResetRequest,
) -> Result<(), LifecycleError> {
    let one_time_password = secrets::generate_one_time_secret();
    let password_hash = secrets::hash(&one_time_password)?;

    let affected = store::GuardedUpdate::table("coaches")
        .set("password_hash", password_hash)
        .filter_eq("email", request.email.as_str())
        .filter(
            "league_id = (SELECT id FROM leagues WHERE league_name = {} AND city = {} \
             AND state = {} ORDER BY id LIMIT 1)",
            vec![
                request.league_name.as_str().into(),
                request.city.as_str().into(),
                request.state.as_str().into(),
            ],
        )
        .filter("validated = TRUE", vec![])
        .execute(pool)
        .await?;

    let coach = store::coach_by_identity(
        pool,
        &request.email,
        &request.league_name,
        &request.city,
        &request.state,
    )
    .await?;

    if affected == 0 {
        return Err(match coach {
            Some(_) => LifecycleError::ResetPending,
            None => LifecycleError::NoSuchEmail,
        });
    }

    match coach {
        Some(coach) => notify(
            notifier,
            &Notification::CoachPasswordReset {
                to: coach.email,
                first_name: coach.first_name,
                one_time_password,
            },
        ),
        None => warn!("coach password reset applied but row vanished before notification"),
    }

    Ok(())
}

/// Authenticated password change, scoped to the authenticated coach and
/// its owning league only.
///
/// # Errors
///
/// As for the league change-password operation.
pub async fn change_password(
    pool: &PgPool,
    coach_id: Uuid,
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
        return Err(LifecycleError::WrongCurrentPassword);
    }
    if !secrets::meets_password_policy(new_password) {
        return Err(LifecycleError::WeakPassword);
    }

    let coach = store::coach_by_id(pool, coach_id, league_id)
        .await?
        .ok_or(LifecycleError::WrongCurrentPassword)?;
    let digest = coach
        .password_hash
        .as_deref()
        .ok_or(LifecycleError::WrongCurrentPassword)?;
    if !secrets::verify(old_password, digest)? {
        return Err(LifecycleError::WrongCurrentPassword);
    }

    let affected = store::GuardedUpdate::table("coaches")
        .set("password_hash", secrets::hash(new_password)?)
        .filter_eq("id", coach_id)
        .filter_eq("league_id", league_id)
        .execute(pool)
        .await?;
    if affected == 0 {
        return Err(LifecycleError::WrongCurrentPassword);
    }

    Ok(())
}
