//! Coach account endpoints.

use axum::{
    extract::{Extension, Path},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use std::sync::Arc;
use tracing::instrument;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    api::email::Notifier,
    api::handlers::{reply, require_all, valid_email, valid_phone},
    lifecycle::{coach, league::ResetRequest, secrets, LifecycleError},
    tokens::TokenService,
};

use super::league::{PasswordChange, PasswordReset};
use super::principal::{require_coach, require_league_admin};

#[derive(ToSchema, Serialize, Deserialize)]
pub struct CoachRegister {
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
    pub league_name: String,
    pub league_city: String,
    pub league_state: String,
}

#[derive(ToSchema, Serialize, Deserialize)]
pub struct CoachCreate {
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
    pub team_id: Uuid,
}

#[derive(ToSchema, Serialize, Deserialize)]
pub struct CoachAssign {
    pub team_id: Option<Uuid>,
    pub division: Option<String>,
}

#[derive(ToSchema, Serialize, Deserialize)]
pub struct CoachLogin {
    pub email: String,
    pub password: String,
    pub league_name: String,
    pub city: String,
    pub state: String,
}

impl CoachRegister {
    fn check(&self) -> Result<(), LifecycleError> {
        require_all(&[
            &self.email,
            &self.first_name,
            &self.last_name,
            &self.phone_number,
            &self.division,
            &self.birthday,
            &self.gender,
            &self.address,
            &self.city,
            &self.state,
            &self.zip,
            &self.past_league,
            &self.league_name,
            &self.league_city,
            &self.league_state,
        ])?;
        if !valid_phone(&self.phone_number) {
            return Err(LifecycleError::InvalidPhone);
        }
        if !valid_email(&self.email) {
            return Err(LifecycleError::InvalidEmail);
        }
        Ok(())
    }

    fn into_new_coach(self) -> (coach::NewCoach, String, String, String) {
        let new_coach = coach::NewCoach {
            email: self.email,
            first_name: self.first_name,
            last_name: self.last_name,
            phone_number: self.phone_number,
            division: self.division,
            birthday: self.birthday,
            gender: self.gender,
            address: self.address,
            city: self.city,
            state: self.state,
            zip: self.zip,
            years_experience: self.years_experience,
            past_league: self.past_league,
        };
        (new_coach, self.league_name, self.league_city, self.league_state)
    }
}

impl CoachCreate {
    fn check(&self) -> Result<(), LifecycleError> {
        require_all(&[
            &self.email,
            &self.first_name,
            &self.last_name,
            &self.phone_number,
            &self.division,
            &self.birthday,
            &self.gender,
            &self.address,
            &self.city,
            &self.state,
            &self.zip,
        ])?;
        if !valid_phone(&self.phone_number) {
            return Err(LifecycleError::InvalidPhone);
        }
        if !valid_email(&self.email) {
            return Err(LifecycleError::InvalidEmail);
        }
        Ok(())
    }

    fn into_new_coach(self) -> (coach::NewCoach, Uuid) {
        let new_coach = coach::NewCoach {
            email: self.email,
            first_name: self.first_name,
            last_name: self.last_name,
            phone_number: self.phone_number,
            division: self.division,
            birthday: self.birthday,
            gender: self.gender,
            address: self.address,
            city: self.city,
            state: self.state,
            zip: self.zip,
            years_experience: 0,
            past_league: String::new(),
        };
        (new_coach, self.team_id)
    }
}

#[utoipa::path(
    post,
    path = "/v1/coaches/register",
    request_body = CoachRegister,
    responses(
        (status = 201, description = "Coach registered, pending validation", body = String),
        (status = 400, description = "Invalid registration data", body = String),
        (status = 404, description = "This league does not exist", body = String),
        (status = 409, description = "Email already associated with this league", body = String),
    ),
    tag = "coaches"
)]
#[instrument(skip_all)]
pub async fn register(
    pool: Extension<PgPool>,
    notifier: Extension<Arc<dyn Notifier>>,
    payload: Option<Json<CoachRegister>>,
) -> impl IntoResponse {
    let Some(Json(request)) = payload else {
        return reply(LifecycleError::MissingFields);
    };
    if let Err(err) = request.check() {
        return reply(err);
    }

    let (new_coach, league_name, league_city, league_state) = request.into_new_coach();
    match coach::register(
        &pool,
        notifier.0.as_ref(),
        &league_name,
        &league_city,
        &league_state,
        new_coach,
    )
    .await
    {
        Ok(_) => (
            StatusCode::CREATED,
            "Coach registration received".to_string(),
        ),
        Err(err) => reply(err),
    }
}

#[utoipa::path(
    post,
    path = "/v1/coaches",
    request_body = CoachCreate,
    security(("bearer" = [])),
    responses(
        (status = 201, description = "Pre-verified coach created", body = String),
        (status = 403, description = "Only a league admin can add a pre-verified coach", body = String),
        (status = 409, description = "Email already associated with this league", body = String),
    ),
    tag = "coaches"
)]
#[instrument(skip_all)]
pub async fn create(
    headers: HeaderMap,
    pool: Extension<PgPool>,
    tokens: Extension<TokenService>,
    notifier: Extension<Arc<dyn Notifier>>,
    payload: Option<Json<CoachCreate>>,
) -> impl IntoResponse {
    let league_id = match require_league_admin(&headers, &tokens) {
        Ok(id) => id,
        Err(response) => return response,
    };
    let Some(Json(request)) = payload else {
        return reply(LifecycleError::MissingFields);
    };
    if let Err(err) = request.check() {
        return reply(err);
    }

    let (new_coach, team_id) = request.into_new_coach();
    match coach::create(&pool, notifier.0.as_ref(), league_id, team_id, new_coach).await {
        Ok(_) => (StatusCode::CREATED, "Coach created".to_string()),
        Err(err) => reply(err),
    }
}

#[utoipa::path(
    post,
    path = "/v1/coaches/login",
    request_body = CoachLogin,
    responses(
        (status = 200, description = "Login successful, body is the session token", body = String),
        (status = 401, description = "Unauthorized", body = String),
    ),
    tag = "coaches"
)]
#[instrument(skip_all)]
pub async fn login(
    pool: Extension<PgPool>,
    tokens: Extension<TokenService>,
    payload: Option<Json<CoachLogin>>,
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
    if !secrets::meets_password_policy(&request.password) {
        return reply(LifecycleError::CredentialMismatch);
    }

    let credentials = coach::CoachLogin {
        email: request.email,
        password: request.password,
        league_name: request.league_name,
        city: request.city,
        state: request.state,
    };
    match coach::login(&pool, &tokens, &credentials).await {
        Ok(token) => (StatusCode::OK, token),
        Err(err) => reply(err),
    }
}

#[utoipa::path(
    post,
    path = "/v1/coaches/{id}/validate",
    params(("id" = Uuid, Path, description = "Coach id")),
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Coach validated", body = String),
        (status = 403, description = "Not a league admin", body = String),
        (status = 409, description = "This coach has already been validated", body = String),
    ),
    tag = "coaches"
)]
#[instrument(skip_all)]
pub async fn validate(
    headers: HeaderMap,
    Path(id): Path<Uuid>,
    pool: Extension<PgPool>,
    tokens: Extension<TokenService>,
    notifier: Extension<Arc<dyn Notifier>>,
) -> impl IntoResponse {
    let league_id = match require_league_admin(&headers, &tokens) {
        Ok(admin) => admin,
        Err(response) => return response,
    };

    match coach::validate(&pool, notifier.0.as_ref(), league_id, id).await {
        Ok(()) => (StatusCode::OK, "Coach validated".to_string()),
        Err(err) => reply(err),
    }
}

#[utoipa::path(
    put,
    path = "/v1/coaches/{id}",
    request_body = CoachAssign,
    params(("id" = Uuid, Path, description = "Coach id")),
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Coach assignment updated", body = String),
        (status = 400, description = "No fields supplied", body = String),
        (status = 403, description = "Not a league admin", body = String),
        (status = 404, description = "This coach does not exist", body = String),
    ),
    tag = "coaches"
)]
#[instrument(skip_all)]
pub async fn assign(
    headers: HeaderMap,
    Path(id): Path<Uuid>,
    pool: Extension<PgPool>,
    tokens: Extension<TokenService>,
    payload: Option<Json<CoachAssign>>,
) -> impl IntoResponse {
    let league_id = match require_league_admin(&headers, &tokens) {
        Ok(admin) => admin,
        Err(response) => return response,
    };
    let Some(Json(request)) = payload else {
        return reply(LifecycleError::MissingFields);
    };

    match coach::assign(&pool, league_id, id, request.team_id, request.division).await {
        Ok(()) => (StatusCode::OK, "Coach updated".to_string()),
        Err(err) => reply(err),
    }
}

#[utoipa::path(
    delete,
    path = "/v1/coaches/{id}",
    params(("id" = Uuid, Path, description = "Coach id")),
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Coach rejected", body = String),
        (status = 403, description = "Not a league admin", body = String),
        (status = 404, description = "This coach does not exist", body = String),
    ),
    tag = "coaches"
)]
#[instrument(skip_all)]
pub async fn remove(
    headers: HeaderMap,
    Path(id): Path<Uuid>,
    pool: Extension<PgPool>,
    tokens: Extension<TokenService>,
    notifier: Extension<Arc<dyn Notifier>>,
) -> impl IntoResponse {
    let league_id = match require_league_admin(&headers, &tokens) {
        Ok(admin) => admin,
        Err(response) => return response,
    };

    match coach::reject(&pool, notifier.0.as_ref(), league_id, id).await {
        Ok(()) => (StatusCode::OK, "Coach rejected".to_string()),
        Err(err) => reply(err),
    }
}

#[utoipa::path(
    post,
    path = "/v1/coaches/reset-password",
    request_body = PasswordReset,
    responses(
        (status = 200, description = "Password reset, one-time password mailed", body = String),
        (status = 404, description = "No matching record", body = String),
        (status = 409, description = "Record exists but is pending validation", body = String),
    ),
    tag = "coaches"
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
    if let Err(err) = require_all(&[
        &request.email,
        &request.league_name,
        &request.city,
        &request.state,
    ]) {
        return reply(err);
    }
    if !valid_email(&request.email) {
        return reply(LifecycleError::InvalidEmail);
    }

    let reset = ResetRequest {
        email: request.email,
        league_name: request.league_name,
        city: request.city,
        state: request.state,
    };
    match coach::reset_password(&pool, notifier.0.as_ref(), &reset).await {
        Ok(()) => (StatusCode::OK, "Password reset".to_string()),
        Err(err) => reply(err),
    }
}

#[utoipa::path(
    post,
    path = "/v1/coaches/password",
    request_body = PasswordChange,
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Password changed", body = String),
        (status = 400, description = "Invalid password data", body = String),
        (status = 401, description = "Unauthorized or wrong current password", body = String),
    ),
    tag = "coaches"
)]
#[instrument(skip_all)]
pub async fn change_password(
    headers: HeaderMap,
    pool: Extension<PgPool>,
    tokens: Extension<TokenService>,
    payload: Option<Json<PasswordChange>>,
) -> impl IntoResponse {
    let (coach_id, league_id) = match require_coach(&headers, &tokens) {
        Ok(principal) => principal,
        Err(response) => return response,
    };
    let Some(Json(request)) = payload else {
        return reply(LifecycleError::MissingFields);
    };

    match coach::change_password(
        &pool,
        coach_id,
        league_id,
        &request.old_password,
        &request.new_password,
    )
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

    fn notifier() -> Arc<dyn Notifier> {
        Arc::new(LogNotifier)
    }

    fn bearer(token: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {token}")).unwrap(),
        );
        headers
    }

    #[tokio::test]
    async fn register_missing_payload() {
        let response = register(Extension(lazy_pool()), Extension(notifier()), None)
            .await
            .into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn register_rejects_invalid_phone() {
        let payload = CoachRegister {
            email: "coach@example.com".to_string(),
            first_name: "Sam".to_string(),
            last_name: "Jones".to_string(),
            phone_number: "12345".to_string(),
            division: "AA".to_string(),
            birthday: "1990-04-01".to_string(),
            gender: "F".to_string(),
            address: "1 Main St".to_string(),
            city: "Springfield".to_string(),
            state: "IL".to_string(),
            zip: "62701".to_string(),
            years_experience: 3,
            past_league: "None".to_string(),
            league_name: "Little League".to_string(),
            league_city: "Springfield".to_string(),
            league_state: "IL".to_string(),
        };
        let response = register(
            Extension(lazy_pool()),
            Extension(notifier()),
            Some(Json(payload)),
        )
        .await
        .into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn create_requires_a_league_admin() {
        let tokens = token_service();
        // A coach session must not be able to mint pre-verified coaches.
        let session = tokens
            .issue_session(Uuid::new_v4(), Some(Uuid::new_v4()))
            .unwrap();

        let response = create(
            bearer(&session),
            Extension(lazy_pool()),
            Extension(tokens),
            Extension(notifier()),
            None,
        )
        .await
        .into_response();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn login_rejects_weak_password_without_store_access() {
        let payload = CoachLogin {
            email: "coach@example.com".to_string(),
            password: "short".to_string(),
            league_name: "Little League".to_string(),
            city: "Springfield".to_string(),
            state: "IL".to_string(),
        };
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
    async fn assign_rejects_empty_assignment_before_store_access() {
        let tokens = token_service();
        let session = tokens.issue_session(Uuid::new_v4(), None).unwrap();

        let response = assign(
            bearer(&session),
            Path(Uuid::new_v4()),
            Extension(lazy_pool()),
            Extension(tokens),
            Some(Json(CoachAssign {
                team_id: None,
                division: None,
            })),
        )
        .await
        .into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn validate_requires_auth() {
        let response = validate(
            HeaderMap::new(),
            Path(Uuid::new_v4()),
            Extension(lazy_pool()),
            Extension(token_service()),
            Extension(notifier()),
        )
        .await
        .into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn change_password_requires_a_coach_session() {
        let tokens = token_service();
        let session = tokens.issue_session(Uuid::new_v4(), None).unwrap();

        let response = change_password(
            bearer(&session),
            Extension(lazy_pool()),
            Extension(tokens),
            Some(Json(PasswordChange {
                old_password: "Old1Password".to_string(),
                new_password: "New1Password".to_string(),
            })),
        )
        .await
        .into_response();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }
}
