//! HTTP API. Every resource router is merged under `/api/v1`; the OpenAPI document is
//! served at `/api-docs/openapi.json` and the Scalar UI at `/docs`.

pub mod analytics;
pub mod api_keys;
pub mod bids;
pub mod crud;
pub mod inspections;
pub mod jobs;
pub mod licenses;
pub mod notifications;
pub mod organization;
pub mod profiles;
pub mod schedules;
pub mod settings;
pub mod system;
pub mod vehicles;

use axum::http::HeaderValue;
use axum::{Json, Router, routing::get};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};
use utoipa_axum::router::OpenApiRouter;
use utoipa_scalar::{Scalar, Servable};

use crate::config::ServerConfig;
use crate::state::AppState;

pub const API_PREFIX: &str = "/api/v1";
pub const OPENAPI_PATH: &str = "/api-docs/openapi.json";
pub const DOCS_PATH: &str = "/docs";

#[derive(OpenApi)]
#[openapi(
    info(
        title = "FleetOps API",
        description = "Vehicles, drivers, jobs and bids, inspections, licenses, schedules, notifications and settings for transport operators."
    ),
    modifiers(&BearerAuth),
    tags(
        (name = "vehicles", description = "Fleet vehicles"),
        (name = "profiles", description = "Users and drivers"),
        (name = "jobs", description = "Transport jobs and their status"),
        (name = "bids", description = "Driver bids on open jobs"),
        (name = "inspections", description = "Vehicle inspections"),
        (name = "notifications", description = "Per-user inbox"),
        (name = "licenses", description = "Driver licenses"),
        (name = "schedules", description = "Driver and vehicle bookings"),
        (name = "analytics", description = "Dashboard aggregates"),
        (name = "settings", description = "Organization settings by section"),
        (name = "organization", description = "The caller's organization"),
        (name = "api-keys", description = "API key management"),
        (name = "navigation", description = "Client route guard"),
        (name = "system", description = "Health"),
    )
)]
pub struct ApiDoc;

struct BearerAuth;

impl Modify for BearerAuth {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer",
            SecurityScheme::Http(HttpBuilder::new().scheme(HttpAuthScheme::Bearer).build()),
        );
    }
}

/// Every resource router, unprefixed.
pub fn api_router() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .merge(vehicles::router())
        .merge(profiles::router())
        .merge(jobs::router())
        .merge(bids::router())
        .merge(inspections::router())
        .merge(notifications::router())
        .merge(licenses::router())
        .merge(schedules::router())
        .merge(analytics::router())
        .merge(settings::router())
        .merge(organization::router())
        .merge(api_keys::router())
        .merge(system::router())
}

fn cors_layer(server: &ServerConfig) -> CorsLayer {
    if server.cors_allowed_origins.is_empty() {
        return CorsLayer::permissive();
    }
    let origins: Vec<HeaderValue> = server
        .cors_allowed_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(%origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();
    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods(tower_http::cors::Any)
        .allow_headers(tower_http::cors::Any)
}

/// The complete application: API, documentation, request tracing and CORS.
pub fn build_router(state: AppState) -> Router {
    let (api, openapi) = OpenApiRouter::with_openapi(ApiDoc::openapi())
        .nest(API_PREFIX, api_router())
        .split_for_parts();
    let cors = cors_layer(&state.config.server);
    let spec = openapi.clone();

    let serve_spec = move || {
        let spec = spec.clone();
        async move { Json(spec) }
    };

    api.route(OPENAPI_PATH, get(serve_spec))
        .merge(Scalar::with_url(DOCS_PATH, openapi))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_openapi_documents_prefixed_paths() {
        let (_, openapi) = OpenApiRouter::with_openapi(ApiDoc::openapi())
            .nest(API_PREFIX, api_router())
            .split_for_parts();
        let paths: Vec<&String> = openapi.paths.paths.keys().collect();
        for expected in [
            "/api/v1/vehicles",
            "/api/v1/vehicles/{id}",
            "/api/v1/vehicles/{id}/assign-driver",
            "/api/v1/bids/{id}/accept",
            "/api/v1/settings/{section}",
            "/api/v1/navigation",
        ] {
            assert!(paths.iter().any(|path| path.as_str() == expected), "missing {expected}");
        }
        assert!(openapi.components.is_some_and(|c| c.security_schemes.contains_key("bearer")));
    }

    #[test]
    fn test_settings_patch_documents_object_body() {
        let (_, openapi) = OpenApiRouter::with_openapi(ApiDoc::openapi())
            .nest(API_PREFIX, api_router())
            .split_for_parts();
        let patch = openapi
            .paths
            .paths
            .get("/api/v1/settings/{section}")
            .and_then(|item| item.patch.as_ref())
            .expect("settings patch documented");
        assert!(patch.request_body.is_some());

        let schema = serde_json::to_value(<settings::SettingsPatch as utoipa::PartialSchema>::schema())
            .expect("schema serializes");
        assert_eq!(schema["type"], "object");
    }

    #[test]
    fn test_cors_accepts_configured_origins() {
        let server = ServerConfig {
            cors_allowed_origins: vec!["https://ops.example.com".to_string(), "bad\norigin".to_string()],
            ..ServerConfig::default()
        };
        let _layer = cors_layer(&server);
    }
}
