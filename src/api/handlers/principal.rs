//! Authenticated principal extraction.
//!
//! Sessions are bearer tokens; the claim shape doubles as the role model.
//! League sessions carry no `leagueId` claim, coach sessions do, so the
//! presence of the tenant claim is what separates the two.

use axum::http::{header::AUTHORIZATION, HeaderMap, StatusCode};
use uuid::Uuid;

use crate::tokens::TokenService;

/// Authenticated caller derived from the bearer session token.
#[derive(Clone, Debug)]
pub struct Principal {
    pub id: Uuid,
    pub league_id: Option<Uuid>,
}

/// Resolve the bearer token into a principal, or 401 for missing/invalid
/// sessions.
pub fn require_principal(
    headers: &HeaderMap,
    tokens: &TokenService,
) -> Result<Principal, (StatusCode, String)> {
    let unauthorized = || (StatusCode::UNAUTHORIZED, "Unauthorized".to_string());

    let token = headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .ok_or_else(unauthorized)?;

    let claims = tokens
        .verify_session(token)
        .map_err(|_| unauthorized())?;

    Ok(Principal {
        id: claims.id,
        league_id: claims.league_id,
    })
}

/// The acting league admin's id, or 403 when the session belongs to a coach.
pub fn require_league_admin(
    headers: &HeaderMap,
    tokens: &TokenService,
) -> Result<Uuid, (StatusCode, String)> {
    let principal = require_principal(headers, tokens)?;
    if principal.league_id.is_some() {
        return Err((
            StatusCode::FORBIDDEN,
            "You must be a league admin to use this route.".to_string(),
        ));
    }
    Ok(principal.id)
}

/// The acting coach's (id, owning league id), or 403 for a league session.
pub fn require_coach(
    headers: &HeaderMap,
    tokens: &TokenService,
) -> Result<(Uuid, Uuid), (StatusCode, String)> {
    let principal = require_principal(headers, tokens)?;
    match principal.league_id {
        Some(league_id) => Ok((principal.id, league_id)),
        None => Err((
            StatusCode::FORBIDDEN,
            "You must be a coach to use this route.".to_string(),
        )),
    }
}
