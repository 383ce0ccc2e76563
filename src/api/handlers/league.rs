//! League account endpoints.

use axum::{
    extract::Extension,
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use std::sync::Arc;
use tracing::instrument;
use utoipa::ToSchema;

use crate::{
    api::email::Notifier,
    api::handlers::{reply, require_all, valid_email, valid_phone},
    cli::globals::GlobalArgs,
    lifecycle::{league, secrets, LifecycleError},
    tokens::TokenService,
};

use super::principal::require_league_admin;

#[derive(ToSchema, Serialize, Deserialize)]
pub struct LeagueRegister {
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub league_name: String,
    pub phone_number: String,
    pub city: String,
    pub state: String,
}

#[derive(ToSchema, Serialize, Deserialize)]
pub struct LeagueLogin {
    pub email: String,
    pub password: String,
    pub league_name: String,
    pub city: String,
    pub state: String,
}

#[derive(ToSchema, Serialize, Deserialize)]
pub struct ActionLink {
    pub token: String,
}

#[derive(ToSchema, Serialize, Deserialize)]
pub struct PasswordReset {
    pub email: String,
    pub league_name: String,
    pub city: String,
    pub state: String,
}

#[derive(ToSchema, Serialize, Deserialize)]
pub struct PasswordChange {
    pub old_password: String,
    pub new_password: String,
}

impl LeagueRegister {
    fn check(&self) -> Result<(), LifecycleError> {
        require_all(&[
            &self.email,
            &self.first_name,
            &self.last_name,
            &self.league_name,
            &self.phone_number,
            &self.city,
            &self.state,
        ])?;
        if !valid_email(&self.email) {
            return Err(LifecycleError::InvalidEmail);
        }
        if !valid_phone(&self.phone_number) {
            return Err(LifecycleError::InvalidPhone);
        }
        Ok(())
    }
}

impl PasswordReset {
    fn check(&self) -> Result<(), LifecycleError> {
        require_all(&[&self.email, &self.league_name, &self.city, &self.state])?;
        if !valid_email(&self.email) {
            return Err(LifecycleError::InvalidEmail);
        }
        Ok(())
    }
}

#[utoipa::path(
    post,
    path = "/v1/leagues/register",
    request_body = LeagueRegister,
    responses(
        (status = 201, description = "League registered, pending review", body = String),
        (status = 400, description = "Invalid registration data", body = String),
        (status = 409, description = "Email already associated with this league", body = String),
    ),
    tag = "leagues"
)]
#[instrument(skip_all)]
pub async fn register(
    pool: Extension<PgPool>,
    globals: Extension<GlobalArgs>,
    tokens: Extension<TokenService>,
    notifier: Extension<Arc<dyn Notifier>>,
    payload: Option<Json<LeagueRegister>>,
) -> impl IntoResponse {
    let Some(Json(request)) = payload else {
        return reply(LifecycleError::MissingFields);
    };
    if let Err(err) = request.check() {
        return reply(err);
    }

    let new_league = league::NewLeague {
        email: request.email,
        first_name: request.first_name,
        last_name: request.last_name,
        league_name: request.league_name,
        phone_number: request.phone_number,
        city: request.city,
        state: request.state,
    };
    match league::register(
        &pool,
        &tokens,
        notifier.0.as_ref(),
        &globals.base_url,
        &globals.admin_email,
        new_league,
    )
    .await
    {
        Ok(_) => (
            StatusCode::CREATED,
            "League registration received".to_string(),
        ),
        Err(err) => reply(err),
    }
}

#[utoipa::path(
    post,
    path = "/v1/leagues/login",
    request_body = LeagueLogin,
    responses(
        (status = 200, description = "Login successful, body is the session token", body = String),
        (status = 401, description = "Unauthorized", body = String),
    ),
    tag = "leagues"
)]
#[instrument(skip_all)]
pub async fn login(
    pool: Extension<PgPool>,
    tokens: Extension<TokenService>,
    payload: Option<Json<LeagueLogin>>,
) -> impl IntoResponse {
    let Some(Json(request)) = payload else {
        return reply(LifecycleError::MissingFields);
    };
    if let Err(err) = require_all(&[
        &request.email,
        &request.password,
        &request.league_name,
        &request.city,
        &request.state,
    ]) {
        return reply(err);
    }
    // A password that cannot pass the policy cannot match any stored hash.
    if !secrets::meets_password_policy(&request.password) {
        return reply(LifecycleError::CredentialMismatch);
    }

    let credentials = league::LeagueLogin {
        email: request.email,
        password: request.password,
        league_name: request.league_name,
        city: request.city,
        state: request.state,
    };
    match league::login(&pool, &tokens, &credentials).await {
        Ok(token) => (StatusCode::OK, token),
        Err(err) => reply(err),
    }
}

#[utoipa::path(
    post,
    path = "/v1/leagues/validate",
    request_body = ActionLink,
    responses(
        (status = 200, description = "League validated", body = String),
        (status = 400, description = "This link is not valid", body = String),
        (status = 409, description = "This league has already been validated", body = String),
    ),
    tag = "leagues"
)]
#[instrument(skip_all)]
pub async fn validate(
    pool: Extension<PgPool>,
    tokens: Extension<TokenService>,
    notifier: Extension<Arc<dyn Notifier>>,
    payload: Option<Json<ActionLink>>,
) -> impl IntoResponse {
    let Some(Json(request)) = payload else {
        return reply(LifecycleError::InvalidActionToken);
    };

    match league::validate(&pool, &tokens, notifier.0.as_ref(), &request.token).await {
        Ok(()) => (StatusCode::OK, "League validated".to_string()),
        Err(err) => reply(err),
    }
}

#[utoipa::path(
    post,
    path = "/v1/leagues/reject",
    request_body = ActionLink,
    responses(
        (status = 200, description = "League rejected", body = String),
        (status = 400, description = "This link is not valid", body = String),
        (status = 404, description = "This league does not exist", body = String),
    ),
    tag = "leagues"
)]
#[instrument(skip_all)]
pub async fn reject(
    pool: Extension<PgPool>,
    tokens: Extension<TokenService>,
    notifier: Extension<Arc<dyn Notifier>>,
    payload: Option<Json<ActionLink>>,
) -> impl IntoResponse {
    let Some(Json(request)) = payload else {
        return reply(LifecycleError::InvalidActionToken);
    };

    match league::reject(&pool, &tokens, notifier.0.as_ref(), &request.token).await {
        Ok(()) => (StatusCode::OK, "League rejected".to_string()),
        Err(err) => reply(err),
    }
}

#[utoipa::path(
    post,
    path = "/v1/leagues/reset-password",
    request_body = PasswordReset,
    responses(
        (status = 200, description = "Password reset, one-time password mailed", body = String),
        (status = 404, description = "No matching record", body = String),
        (status = 409, description = "Record exists but is pending validation", body = String),
    ),
    tag = "leagues"
)]
#[instrument(skip_all)]
pub async fn reset_password(
    pool: Extension<PgPool>,
    notifier: Extension<Arc<dyn Notifier>>,
    payload: Option<Json<PasswordReset>>,
) -> impl IntoResponse {
    let Some(Json(request)) = payload else {
        return reply(LifecycleError::MissingFields);
    };
    if let Err(err) = request.check() {
        return reply(err);
    }

    let reset = league::ResetRequest {
        email: request.email,
        league_name: request.league_name,
        city: request.city,
        state: request.state,
    };
    match league::reset_password(&pool, notifier.0.as_ref(), &reset).await {
        Ok(()) => (StatusCode::OK, "Password reset".to_string()),
        Err(err) => reply(err),
    }
}

#[utoipa::path(
    post,
    path = "/v1/leagues/password",
    request_body = PasswordChange,
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Password changed", body = String),
        (status = 400, description = "Invalid password data", body = String),
        (status = 401, description = "Unauthorized or wrong current password", body = String),
    ),
    tag = "leagues"
)]
#[instrument(skip_all)]
pub async fn change_password(
    headers: HeaderMap,
    pool: Extension<PgPool>,
    tokens: Extension<TokenService>,
    payload: Option<Json<PasswordChange>>,
) -> impl IntoResponse {
    let league_id = match require_league_admin(&headers, &tokens) {
        Ok(id) => id,
        Err(response) => return response,
    };
    let Some(Json(request)) = payload else {
        return reply(LifecycleError::MissingFields);
    };

    match league::change_password(&pool, league_id, &request.old_password, &request.new_password)
        .await
    {
        Ok(()) => (StatusCode::OK, "Password changed".to_string()),
        Err(err) => reply(err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::email::LogNotifier;
    use axum::http::header::AUTHORIZATION;
    use axum::http::HeaderValue;
    use secrecy::SecretString;
    use sqlx::postgres::PgPoolOptions;
    use uuid::Uuid;

    fn lazy_pool() -> PgPool {
        PgPoolOptions::new()
            .connect_lazy("postgres://postgres@localhost/postgres")
            .unwrap()
    }

    fn token_service() -> TokenService {
        TokenService::new(
            SecretString::from("test-signing-key-minimum-32-characters".to_string()),
            SecretString::from("test-link-key".to_string()),
        )
    }

    fn globals() -> GlobalArgs {
        GlobalArgs::new(
            SecretString::from("test-signing-key-minimum-32-characters".to_string()),
            SecretString::from("test-link-key".to_string()),
            "http://localhost:8080".to_string(),
            "admins@example.com".to_string(),
        )
    }

    fn notifier() -> Arc<dyn Notifier> {
        Arc::new(LogNotifier)
    }

    #[tokio::test]
    async fn register_missing_payload() {
        let response = register(
            Extension(lazy_pool()),
            Extension(globals()),
            Extension(token_service()),
            Extension(notifier()),
            None,
        )
        .await
        .into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn register_rejects_invalid_email() {
        let payload = LeagueRegister {
            email: "not-an-email".to_string(),
            first_name: "Alex".to_string(),
            last_name: "Smith".to_string(),
            league_name: "Little League".to_string(),
            phone_number: "555-123-4567".to_string(),
            city: "Springfield".to_string(),
            state: "IL".to_string(),
        };
        let response = register(
            Extension(lazy_pool()),
            Extension(globals()),
            Extension(token_service()),
            Extension(notifier()),
            Some(Json(payload)),
        )
        .await
        .into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn register_rejects_blank_fields() {
        let payload = LeagueRegister {
            email: "a@example.com".to_string(),
            first_name: String::new(),
            last_name: "Smith".to_string(),
            league_name: "Little League".to_string(),
            phone_number: "555-123-4567".to_string(),
            city: "Springfield".to_string(),
            state: "IL".to_string(),
        };
        let response = register(
            Extension(lazy_pool()),
            Extension(globals()),
            Extension(token_service()),
            Extension(notifier()),
            Some(Json(payload)),
        )
        .await
        .into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn login_rejects_weak_password_without_store_access() {
        let payload = LeagueLogin {
            email: "a@example.com".to_string(),
            password: "short".to_string(),
            league_name: "Little League".to_string(),
            city: "Springfield".to_string(),
            state: "IL".to_string(),
        };
        // The lazy pool never connects; the policy pre-check must answer first.
        let response = login(
            Extension(lazy_pool()),
            Extension(token_service()),
            Some(Json(payload)),
        )
        .await
        .into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn validate_rejects_garbage_token_without_store_access() {
        let response = validate(
            Extension(lazy_pool()),
            Extension(token_service()),
            Extension(notifier()),
            Some(Json(ActionLink {
                token: "garbage".to_string(),
            })),
        )
        .await
        .into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn change_password_requires_auth() {
        let response = change_password(
            HeaderMap::new(),
            Extension(lazy_pool()),
            Extension(token_service()),
            None,
        )
        .await
        .into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn change_password_rejects_equal_passwords_before_store_access() {
        let tokens = token_service();
        let session = tokens.issue_session(Uuid::new_v4(), None).unwrap();
        let mut headers = HeaderMap::new();
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {session}")).unwrap(),
        );

        let response = change_password(
            headers,
            Extension(lazy_pool()),
            Extension(tokens),
            Some(Json(PasswordChange {
                old_password: "Same1234".to_string(),
                new_password: "Same1234".to_string(),
            })),
        )
        .await
        .into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
