use axum::{
    Router,
    routing::{delete, get, post, put},
};

use crate::handlers;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .nest("/auth", auth_routes())
        .nest("/upload", upload_routes())
        .nest("/files", file_routes())
}

fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/register", post(handlers::auth::register))
        .route("/login", post(handlers::auth::login))
        .route("/me", get(handlers::auth::me))
}

fn upload_routes() -> Router<AppState> {
    let signed = Router::new()
        .route("/check", post(handlers::upload::check_upload))
        .route("/signed", post(handlers::upload::signed_upload))
        .route(
            "/multipart/signed",
            post(handlers::upload::create_multipart_upload),
        )
        .route(
            "/multipart/{upload_id}",
            get(handlers::upload::sign_part).delete(handlers::upload::abort_multipart_upload),
        )
        .route(
            "/{upload_id}/complete",
            post(handlers::upload::complete_upload),
        );

    let single_shot = Router::new()
        .route("/", put(handlers::upload::single_shot_upload))
        .layer(handlers::upload::upload_body_limit());

    signed.merge(single_shot)
}

fn file_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::files::list_files))
        .route("/folder/create", post(handlers::files::create_folder))
        .route("/rename", post(handlers::files::rename_node))
        .route("/delete", delete(handlers::files::delete_node))
        .route(
            "/permanent-delete",
            delete(handlers::files::permanent_delete_node),
        )
        .route(
            "/breadcrumbs/{parent_id}",
            get(handlers::files::breadcrumbs),
        )
        .route("/trash", get(handlers::trash::list_trash))
        .route("/trash/restore/{id}", post(handlers::trash::restore_node))
        .route("/trash/{id}", delete(handlers::trash::purge_node))
        .route("/{id}", get(handlers::files::get_file))
        .route("/{id}/download", get(handlers::files::download))
}
