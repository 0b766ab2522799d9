use axum::{
    Json,
    extract::{
        Path, Query, State,
        rejection::{JsonRejection, QueryRejection},
    },
};
use tracing::{info, warn};
use uuid::Uuid;

use koperasi_db::models::KoperasiRow;
use koperasi_types::api::{
    CreateKoperasiRequest, DeleteKoperasiResponse, KoperasiDetail, KoperasiListQuery,
    KoperasiResponse, UpdateStatusRequest,
};
use koperasi_types::models::{Koperasi, KoperasiStatus, Role};

use crate::auth::AppState;
use crate::convert::{self, now_timestamp};
use crate::error::{ApiError, blocking};
use crate::session::Session;
use crate::validation::Validator;

fn not_found() -> ApiError {
    ApiError::NotFound("Koperasi not found".into())
}

fn parse_status(raw: &str) -> Result<KoperasiStatus, ApiError> {
    raw.parse()
        .map_err(|_| ApiError::BadRequest(format!("Unknown koperasi status '{}'", raw)))
}

/// Empty optional strings are stored as NULL.
fn non_empty(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

/// POST /api/koperasi/create: submit a new application. Starts as DIPROSES.
pub async fn create_koperasi(
    State(state): State<AppState>,
    session: Session,
    payload: Result<Json<CreateKoperasiRequest>, JsonRejection>,
) -> Result<Json<KoperasiResponse>, ApiError> {
    let user = session.require_user()?;
    let Json(req) = payload?;

    let email = non_empty(req.email);
    let mut v = Validator::new();
    v.min_chars("name", req.name.trim(), 3, "Nama koperasi minimal 3 karakter")
        .min_chars("address", req.address.trim(), 5, "Alamat minimal 5 karakter")
        .min_chars("contactPerson", req.contact_person.trim(), 2, "Nama kontak minimal 2 karakter")
        .check(
            req.phone.chars().filter(char::is_ascii_digit).count() >= 6,
            "phone",
            "Nomor telepon tidak valid",
        );
    if let Some(email) = &email {
        v.email("email", email);
    }
    v.finish()?;

    let now = now_timestamp();
    let row = KoperasiRow {
        id: Uuid::new_v4().to_string(),
        name: req.name.trim().to_string(),
        address: req.address.trim().to_string(),
        contact_person: req.contact_person.trim().to_string(),
        phone: req.phone.trim().to_string(),
        email,
        regency_code: non_empty(req.regency_code),
        district_code: non_empty(req.district_code),
        status: KoperasiStatus::Diproses.as_str().to_string(),
        created_by: Some(user.id.clone()),
        created_at: now.clone(),
        updated_at: now,
    };

    let id = row.id.clone();
    let row = blocking(&state, move |db| {
        db.insert_koperasi(&row)?;
        Ok(row)
    })
    .await?;
    info!("Koperasi {} submitted by {}", id, user.id);

    Ok(Json(KoperasiResponse {
        koperasi: convert::koperasi_from_row(row)?,
    }))
}

/// GET /api/koperasi/list: newest first, optionally filtered by status.
pub async fn list_koperasi(
    State(state): State<AppState>,
    query: Result<Query<KoperasiListQuery>, QueryRejection>,
) -> Result<Json<Vec<Koperasi>>, ApiError> {
    let Query(query) = query?;
    let status = match query.status.as_deref().filter(|s| !s.is_empty()) {
        Some(raw) => Some(parse_status(raw)?),
        None => None,
    };

    let rows = blocking(&state, move |db| db.list_koperasi(status.map(|s| s.as_str()))).await?;
    let koperasi = rows
        .into_iter()
        .map(convert::koperasi_from_row)
        .collect::<anyhow::Result<Vec<_>>>()?;

    Ok(Json(koperasi))
}

/// GET /api/koperasi/detail/{id}: the koperasi with all of its documents.
pub async fn get_koperasi(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<KoperasiDetail>, ApiError> {
    let (row, documents) = blocking(&state, move |db| db.get_koperasi_with_documents(&id))
        .await?
        .ok_or_else(not_found)?;

    Ok(Json(KoperasiDetail {
        koperasi: convert::koperasi_from_row(row)?,
        documents: convert::documents_from_rows(documents)?,
    }))
}

/// PATCH /api/koperasi/status/{id}: review decision, HIGH users only.
pub async fn update_status(
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<String>,
    payload: Result<Json<UpdateStatusRequest>, JsonRejection>,
) -> Result<Json<KoperasiResponse>, ApiError> {
    let reviewer = session.require_role(Role::High)?;
    let Json(req) = payload?;
    let status = parse_status(&req.status)?;

    let target = id.clone();
    let row = blocking(&state, move |db| {
        if !db.update_koperasi_status(&target, status.as_str(), &now_timestamp())? {
            return Ok(None);
        }
        db.get_koperasi(&target)
    })
    .await?
    .ok_or_else(not_found)?;
    info!("Koperasi {} set to {} by {}", id, status, reviewer.id);

    Ok(Json(KoperasiResponse {
        koperasi: convert::koperasi_from_row(row)?,
    }))
}

/// DELETE /api/koperasi/delete/{id}: only rejected applications may be
/// deleted. Document files are unlinked first on a best-effort basis, then
/// the row is removed and the store cascades to documents, activities and
/// members.
pub async fn delete_koperasi(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<DeleteKoperasiResponse>, ApiError> {
    let lookup = id.clone();
    let (row, documents) = blocking(&state, move |db| db.get_koperasi_with_documents(&lookup))
        .await?
        .ok_or_else(not_found)?;

    let status: KoperasiStatus = row
        .status
        .parse()
        .map_err(|e| anyhow::anyhow!("koperasi {}: {}", row.id, e))?;
    if !status.is_deletable() {
        return Err(ApiError::BadRequest("Only rejected koperasi can be deleted".into()));
    }

    for doc in &documents {
        if let Err(e) = state.storage.delete_file(&doc.file_path).await {
            warn!(
                "Could not remove file {} of document {}: {:#}",
                doc.file_path, doc.id, e
            );
        }
    }

    let target = id.clone();
    // A concurrent delete may have removed the row since the lookup
    if !blocking(&state, move |db| db.delete_koperasi(&target)).await? {
        return Err(not_found());
    }
    info!("Deleted koperasi {} and {} document(s)", id, documents.len());

    Ok(Json(DeleteKoperasiResponse {
        message: "Koperasi deleted successfully".into(),
        id,
    }))
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use serde_json::json;

    use crate::test_support::TestApp;

    #[tokio::test]
    async fn delete_refuses_unless_rejected() {
        let app = TestApp::new().await;
        let id = app.seed_koperasi("DIPROSES");
        let doc = app.seed_document(&id, "AKTA", "2024-01-01T00:00:00Z").await;

        let (status, json) = app.send_json("DELETE", &format!("/api/koperasi/delete/{id}"), None, None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json, json!({ "error": "Only rejected koperasi can be deleted" }));

        assert!(app.state.db.get_koperasi(&id).unwrap().is_some());
        assert!(app.state.db.get_document(&doc).unwrap().is_some());
        let row = app.state.db.get_document(&doc).unwrap().unwrap();
        assert!(app.state.storage.resolve(&row.file_path).unwrap().exists());
    }

    #[tokio::test]
    async fn delete_rejected_removes_rows_and_files() {
        let app = TestApp::new().await;
        let id = app.seed_koperasi("DITOLAK");
        let kept = app.seed_document(&id, "AKTA", "2024-01-01T00:00:00Z").await;
        let missing = app.seed_document(&id, "RAT", "2024-01-02T00:00:00Z").await;

        let kept_path = {
            let row = app.state.db.get_document(&kept).unwrap().unwrap();
            app.state.storage.resolve(&row.file_path).unwrap()
        };
        // One file already gone from disk must not fail the delete
        let row = app.state.db.get_document(&missing).unwrap().unwrap();
        app.state.storage.delete_file(&row.file_path).await.unwrap();

        let (status, json) = app.send_json("DELETE", &format!("/api/koperasi/delete/{id}"), None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["id"], id.as_str());

        assert!(app.state.db.get_koperasi(&id).unwrap().is_none());
        assert!(app.state.db.get_document(&kept).unwrap().is_none());
        assert!(app.state.db.get_document(&missing).unwrap().is_none());
        assert!(!kept_path.exists());

        let (status, _) = app.send_json("DELETE", &format!("/api/koperasi/delete/{id}"), None, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn delete_skips_paths_outside_public_root() {
        let app = TestApp::new().await;
        let id = app.seed_koperasi("DITOLAK");
        let outside = app.public_root().parent().unwrap().join(format!("{id}-outside.txt"));
        std::fs::write(&outside, b"keep me").unwrap();
        app.insert_document_row(&id, "AKTA", &format!("../{id}-outside.txt"), "2024-01-01T00:00:00Z");

        let (status, _) = app.send_json("DELETE", &format!("/api/koperasi/delete/{id}"), None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert!(outside.exists());
        std::fs::remove_file(outside).ok();
    }

    #[tokio::test]
    async fn workflow_create_review_list() {
        let app = TestApp::new().await;
        let user = app.seed_user("jo@x.com", "LOW").await;
        let admin = app.seed_user("admin@x.com", "HIGH").await;
        let body = json!({
            "name": "Koperasi Sejahtera",
            "address": "Jl. Asia Afrika 8",
            "contactPerson": "Sari",
            "phone": "0812-3456-789",
            "email": "",
        });

        let (status, _) = app.post_json("/api/koperasi/create", &body, None).await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (status, json) = app.post_json("/api/koperasi/create", &body, Some(&user)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["koperasi"]["status"], "DIPROSES");
        assert!(json["koperasi"]["email"].is_null());
        let id = json["koperasi"]["id"].as_str().unwrap().to_string();

        let path = format!("/api/koperasi/status/{id}");
        let reject = json!({ "status": "DITOLAK" });
        let (status, _) = app.send_json("PATCH", &path, Some(&reject), Some(&user)).await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (status, _) = app.send_json("PATCH", &path, Some(&json!({ "status": "GONE" })), Some(&admin)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, json) = app.send_json("PATCH", &path, Some(&reject), Some(&admin)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["koperasi"]["status"], "DITOLAK");

        let (status, _) = app
            .send_json("PATCH", "/api/koperasi/status/unknown", Some(&reject), Some(&admin))
            .await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, json) = app.get_json("/api/koperasi/list?status=DITOLAK", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json.as_array().unwrap().len(), 1);

        let (status, json) = app.get_json("/api/koperasi/list?status=DISETUJUI", None).await;
        assert_eq!(status, StatusCode::OK);
        assert!(json.as_array().unwrap().is_empty());

        let (status, _) = app.get_json("/api/koperasi/list?status=nope", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, json) = app.get_json("/api/koperasi/list?status=a&status=b", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json, json!({ "error": "Invalid query string" }));

        let (status, json) = app.get_json(&format!("/api/koperasi/detail/{id}"), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["name"], "Koperasi Sejahtera");
        assert!(json["documents"].as_array().unwrap().is_empty());

        let (status, _) = app.get_json("/api/koperasi/detail/unknown", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn create_reports_field_errors() {
        let app = TestApp::new().await;
        let user = app.seed_user("jo@x.com", "LOW").await;
        let body = json!({ "name": "K", "address": "", "contactPerson": "", "phone": "12", "email": "x" });

        let (status, json) = app.post_json("/api/koperasi/create", &body, Some(&user)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["details"].as_array().unwrap().len(), 5);
    }
}
