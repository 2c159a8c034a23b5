pub mod config;
pub mod database;
pub mod entity;
pub mod error;
pub mod extractors;
pub mod handlers;
pub mod models;
pub mod routes;
pub mod seed;
pub mod services;
pub mod state;
pub mod utils;

use std::time::Duration;

use axum::http::HeaderValue;
use tower_http::cors::{Any, CorsLayer};
use utoipa::OpenApi;
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::Modify;
use utoipa_scalar::{Scalar, Servable as ScalarServable};
use utoipa_swagger_ui::SwaggerUi;

use crate::config::CorsConfig;
use crate::state::AppState;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Kohlrabi Drive API",
        version = "1.0.0",
        description = "Content-addressed file storage with dedup, per-user quotas, \
            a hierarchical namespace, and trash lifecycle"
    ),
    paths(
        handlers::auth::register,
        handlers::auth::login,
        handlers::auth::me,
        handlers::upload::check_upload,
        handlers::upload::signed_upload,
        handlers::upload::create_multipart_upload,
        handlers::upload::sign_part,
        handlers::upload::abort_multipart_upload,
        handlers::upload::complete_upload,
        handlers::upload::single_shot_upload,
        handlers::files::list_files,
        handlers::files::get_file,
        handlers::files::create_folder,
        handlers::files::rename_node,
        handlers::files::delete_node,
        handlers::files::permanent_delete_node,
        handlers::files::breadcrumbs,
        handlers::files::download,
        handlers::trash::list_trash,
        handlers::trash::restore_node,
        handlers::trash::purge_node,
    ),
    tags(
        (name = "Auth", description = "Authentication and user management"),
        (name = "Upload", description = "Dedup pre-check and the signed upload protocols"),
        (name = "Files", description = "Namespace CRUD, breadcrumbs, and downloads"),
        (name = "Trash", description = "Soft-delete lifecycle"),
    ),
    modifiers(&SecurityAddon),
)]
struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_default();
        components.add_security_scheme(
            "jwt",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

fn cors_layer(config: &CorsConfig) -> CorsLayer {
    let origins: Vec<HeaderValue> = config
        .allow_origins
        .iter()
        .filter_map(|origin| origin.parse().ok())
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods(Any)
        .allow_headers(Any)
        .max_age(Duration::from_secs(config.max_age))
}

/// Build the application router.
pub fn build_router(state: AppState) -> axum::Router {
    let api = ApiDoc::openapi();
    let cors = cors_layer(&state.config.server.cors);

    axum::Router::new()
        .nest("/api/v1", routes::v1::routes())
        .layer(cors)
        .with_state(state)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", api.clone()))
        .merge(Scalar::with_url("/scalar", api))
}
