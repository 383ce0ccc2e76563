//! OpenAPI document for the HTTP surface.

use utoipa::{
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};

use super::handlers::{coach, health, league};

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    info(
        title = "leaguedesk",
        description = "League and coach account lifecycle"
    ),
    modifiers(&SecurityAddon),
    paths(
        health::health,
        league::register,
        league::login,
        league::validate,
        league::reject,
        league::reset_password,
        league::change_password,
        coach::register,
        coach::create,
        coach::login,
        coach::validate,
        coach::assign,
        coach::remove,
        coach::reset_password,
        coach::change_password,
    ),
    components(schemas(
        league::LeagueRegister,
        league::LeagueLogin,
        league::ActionLink,
        league::PasswordReset,
        league::PasswordChange,
        coach::CoachRegister,
        coach::CoachCreate,
        coach::CoachAssign,
        coach::CoachLogin,
    )),
    tags(
        (name = "health", description = "Service health"),
        (name = "leagues", description = "League account lifecycle"),
        (name = "coaches", description = "Coach account lifecycle"),
    )
)]
pub struct ApiDoc;

/// Build the OpenAPI document.
#[must_use]
pub fn openapi() -> utoipa::openapi::OpenApi {
    ApiDoc::openapi()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_lists_every_route() {
        let doc = openapi();
        let paths = &doc.paths.paths;
        for path in [
            "/health",
            "/v1/leagues/register",
            "/v1/leagues/login",
            "/v1/leagues/validate",
            "/v1/leagues/reject",
            "/v1/leagues/reset-password",
            "/v1/leagues/password",
            "/v1/coaches/register",
            "/v1/coaches",
            "/v1/coaches/login",
            "/v1/coaches/{id}/validate",
            "/v1/coaches/{id}",
            "/v1/coaches/reset-password",
            "/v1/coaches/password",
        ] {
            assert!(paths.contains_key(path), "missing path: {path}");
        }
    }
}
