use axum::{
    Json, Router,
    extract::DefaultBodyLimit,
    routing::{delete, get, patch, post},
};
use serde_json::{Value, json};

use crate::auth::{self, AppState};
use crate::documents::{self, MAX_DOCUMENT_SIZE};
use crate::{koperasi, location};

/// Multipart framing and the text fields on top of the file itself.
const UPLOAD_BODY_LIMIT: usize = MAX_DOCUMENT_SIZE + 64 * 1024;

pub fn router(state: AppState) -> Router {
    let auth_routes = Router::new()
        .route("/api/auth/register", post(auth::register))
        .route("/api/auth/login", post(auth::login))
        .route("/api/auth/logout", post(auth::logout))
        .route("/api/auth/me", get(auth::me))
        .route("/api/users/create", post(auth::create_user));

    let koperasi_routes = Router::new()
        .route("/api/koperasi/create", post(koperasi::create_koperasi))
        .route("/api/koperasi/list", get(koperasi::list_koperasi))
        .route("/api/koperasi/detail/{id}", get(koperasi::get_koperasi))
        .route("/api/koperasi/status/{id}", patch(koperasi::update_status))
        .route("/api/koperasi/delete/{id}", delete(koperasi::delete_koperasi));

    let document_routes = Router::new()
        .route("/api/koperasi/documents/list", get(documents::list_documents))
        .route(
            "/api/koperasi/documents/upload",
            post(documents::upload_document).layer(DefaultBodyLimit::max(UPLOAD_BODY_LIMIT)),
        )
        .route("/api/koperasi/documents/download/{id}", get(documents::download_document))
        .route("/api/koperasi/documents/view/{id}", get(documents::view_document))
        .route("/api/koperasi/rat/view/{id}", get(documents::view_rat_document));

    Router::new()
        .merge(auth_routes)
        .merge(koperasi_routes)
        .merge(document_routes)
        .route(
            "/api/location/districts/{regency_code}",
            get(location::districts).options(location::districts_preflight),
        )
        .route("/api/test", get(health))
        .with_state(state)
}

/// GET /api/test: liveness check (no auth).
async fn health() -> Json<Value> {
    Json(json!({ "message": "API is working" }))
}
