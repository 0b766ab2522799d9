use std::path::Path as FsPath;

use axum::{
    Json,
    body::Body,
    extract::{
        Multipart, Path, Query, State,
        multipart::{MultipartError, MultipartRejection},
        rejection::QueryRejection,
    },
    http::{HeaderMap, HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use tokio_util::io::ReaderStream;
use tracing::{error, info, warn};
use uuid::Uuid;

use koperasi_db::models::DocumentRow;
use koperasi_types::api::{DocumentListQuery, DocumentResponse};
use koperasi_types::models::{Document, RAT_DOCUMENT_TYPE};

use crate::auth::AppState;
use crate::convert::{self, now_timestamp};
use crate::error::{ApiError, blocking};
use crate::session::Session;
use crate::storage::DOCUMENT_DIR;

/// 10 MB upload limit for documents
pub const MAX_DOCUMENT_SIZE: usize = 10 * 1024 * 1024;

const DEFAULT_DOCUMENT_TYPE: &str = "UMUM";

const FILE_TOO_LARGE: &str = "File exceeds the 10 MB limit";

#[derive(Clone, Copy)]
enum Disposition {
    Attachment,
    Inline,
}

impl Disposition {
    fn as_str(self) -> &'static str {
        match self {
            Self::Attachment => "attachment",
            Self::Inline => "inline",
        }
    }
}

/// GET /api/koperasi/documents/list?koperasiId=: every non-RAT document of
/// one koperasi, newest upload first.
pub async fn list_documents(
    State(state): State<AppState>,
    query: Result<Query<DocumentListQuery>, QueryRejection>,
) -> Result<Json<Vec<Document>>, ApiError> {
    let Query(query) = query?;
    let koperasi_id = query
        .koperasi_id
        .filter(|id| !id.trim().is_empty())
        .ok_or_else(|| ApiError::BadRequest("koperasiId is required".into()))?;

    let rows = blocking(&state, move |db| {
        db.list_documents_excluding_type(&koperasi_id, RAT_DOCUMENT_TYPE)
    })
    .await?;

    Ok(Json(convert::documents_from_rows(rows)?))
}

/// GET /api/koperasi/documents/download/{id}
pub async fn download_document(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    let doc = load_document(&state, id).await?;
    serve_document(&state, &doc, Disposition::Attachment).await
}

/// GET /api/koperasi/documents/view/{id}
pub async fn view_document(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    let doc = load_document(&state, id).await?;
    serve_document(&state, &doc, Disposition::Inline).await
}

/// GET /api/koperasi/rat/view/{id}: inline view restricted to RAT documents.
pub async fn view_rat_document(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    let doc = load_document(&state, id).await?;
    if !doc.is_rat() {
        return Err(ApiError::BadRequest("Document is not a RAT document".into()));
    }
    serve_document(&state, &doc, Disposition::Inline).await
}

/// POST /api/koperasi/documents/upload: multipart form with `koperasiId`,
/// optional `documentType` and `file`. The file is written under the public
/// root before the record is inserted; a failed insert removes it again.
pub async fn upload_document(
    State(state): State<AppState>,
    session: Session,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<DocumentResponse>, ApiError> {
    let user = session.require_user()?;
    let mut multipart = multipart?;

    let mut koperasi_id: Option<String> = None;
    let mut document_type: Option<String> = None;
    let mut file: Option<(String, String, Vec<u8>)> = None;

    while let Some(field) = multipart.next_field().await.map_err(upload_error)? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "koperasiId" | "documentType" => {
                let value = field
                    .text()
                    .await
                    .map_err(|_| ApiError::BadRequest(format!("Invalid {} field", name)))?
                    .trim()
                    .to_string();
                if value.is_empty() {
                    continue;
                }
                if name == "koperasiId" {
                    koperasi_id = Some(value);
                } else {
                    document_type = Some(value);
                }
            }
            "file" => {
                let original_name = field.file_name().unwrap_or("document").to_string();
                let mime_type = field
                    .content_type()
                    .unwrap_or("application/octet-stream")
                    .to_string();
                let bytes = field.bytes().await.map_err(upload_error)?;
                file = Some((original_name, mime_type, bytes.to_vec()));
            }
            _ => {}
        }
    }

    let koperasi_id =
        koperasi_id.ok_or_else(|| ApiError::BadRequest("koperasiId is required".into()))?;
    let (original_name, mime_type, bytes) =
        file.ok_or_else(|| ApiError::BadRequest("file is required".into()))?;
    if bytes.is_empty() {
        return Err(ApiError::BadRequest("File is empty".into()));
    }
    if bytes.len() > MAX_DOCUMENT_SIZE {
        return Err(ApiError::BadRequest(FILE_TOO_LARGE.into()));
    }

    let lookup = koperasi_id.clone();
    if blocking(&state, move |db| db.get_koperasi(&lookup)).await?.is_none() {
        return Err(ApiError::NotFound("Koperasi not found".into()));
    }

    let id = Uuid::new_v4().to_string();
    let file_path = format!("{}/{}{}", DOCUMENT_DIR, id, extension_of(&original_name));
    state.storage.write_file(&file_path, &bytes).await?;

    let row = DocumentRow {
        id,
        koperasi_id,
        document_type: document_type.unwrap_or_else(|| DEFAULT_DOCUMENT_TYPE.to_string()),
        file_path: file_path.clone(),
        original_name,
        mime_type,
        file_size: bytes.len() as i64,
        upload_date: now_timestamp(),
    };

    let inserted = blocking(&state, move |db| {
        db.insert_document(&row)?;
        Ok(row)
    })
    .await;

    let row = match inserted {
        Ok(row) => row,
        Err(e) => {
            if let Err(cleanup) = state.storage.delete_file(&file_path).await {
                error!("Orphaned upload {}: {:#}", file_path, cleanup);
            }
            return Err(e);
        }
    };
    info!(
        "Document {} ({}, {} bytes) uploaded to koperasi {} by {}",
        row.id, row.document_type, row.file_size, row.koperasi_id, user.id
    );

    Ok(Json(DocumentResponse {
        document: convert::document_from_row(row)?,
    }))
}

/// A body cut off by the route's length limit reports the size limit, not a
/// framing error.
fn upload_error(e: MultipartError) -> ApiError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        warn!("Upload over the body limit: {}", e);
        return ApiError::BadRequest(FILE_TOO_LARGE.into());
    }
    warn!("Malformed multipart upload: {}", e);
    ApiError::BadRequest("Invalid multipart body".into())
}

async fn load_document(state: &AppState, id: String) -> Result<Document, ApiError> {
    let row = blocking(state, move |db| db.get_document(&id))
        .await?
        .ok_or_else(|| ApiError::NotFound("Document not found".into()))?;
    Ok(convert::document_from_row(row)?)
}

/// Stream a stored document with its recorded content type. Content-Length
/// is the size on disk.
async fn serve_document(
    state: &AppState,
    doc: &Document,
    disposition: Disposition,
) -> Result<Response, ApiError> {
    if let Err(e) = state.storage.resolve(&doc.file_path) {
        warn!("Document {} has an unusable path: {:#}", doc.id, e);
        return Err(ApiError::NotFound("File not found".into()));
    }
    let Some((file, size)) = state.storage.open_file(&doc.file_path).await? else {
        warn!("File for document {} missing at {}", doc.id, doc.file_path);
        return Err(ApiError::NotFound("File not found".into()));
    };

    let mut headers = HeaderMap::new();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_str(&doc.mime_type)
            .unwrap_or_else(|_| HeaderValue::from_static("application/octet-stream")),
    );
    headers.insert(header::CONTENT_LENGTH, HeaderValue::from(size));
    let content_disposition = format!(
        "{}; filename=\"{}\"",
        disposition.as_str(),
        header_safe_filename(&doc.original_name)
    );
    headers.insert(
        header::CONTENT_DISPOSITION,
        HeaderValue::from_str(&content_disposition)
            .map_err(|e| anyhow::anyhow!("bad Content-Disposition: {}", e))?,
    );

    let body = Body::from_stream(ReaderStream::new(file));
    Ok((StatusCode::OK, headers, body).into_response())
}

/// Printable ASCII only, quotes and backslashes replaced.
fn header_safe_filename(name: &str) -> String {
    name.chars()
        .map(|c| match c {
            '"' | '\\' => '_',
            c if c.is_ascii_graphic() || c == ' ' => c,
            _ => '_',
        })
        .collect()
}

/// `.ext` of the uploaded name, lowercased, or empty when there is no
/// plain alphanumeric extension.
fn extension_of(name: &str) -> String {
    FsPath::new(name)
        .extension()
        .and_then(|ext| ext.to_str())
        .filter(|ext| !ext.is_empty() && ext.len() <= 10 && ext.bytes().all(|b| b.is_ascii_alphanumeric()))
        .map(|ext| format!(".{}", ext.to_ascii_lowercase()))
        .unwrap_or_default()
}
