//! In-process harness for handler tests: in-memory store, a throwaway public
//! root, and requests driven through the router with `oneshot`.

use std::path::Path;
use std::sync::Arc;

use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode, header},
    response::Response,
};
use http_body_util::BodyExt;
use serde_json::Value;
use tower::ServiceExt;
use uuid::Uuid;

use koperasi_db::Database;
use koperasi_db::models::{DocumentRow, KoperasiRow, NewUser};

use crate::auth::{AppState, AppStateInner, hash_password};
use crate::location::GeoClient;
use crate::routes::router;
use crate::session::issue_token;
use crate::storage::{DOCUMENT_DIR, Storage};

const JWT_SECRET: &str = "test-secret";
const MULTIPART_BOUNDARY: &str = "koperasi-test-boundary";

pub const SEEDED_FILE: &[u8] = b"%PDF-1.4 doc";

pub struct TestApp {
    pub state: AppState,
    router: Router,
}

impl TestApp {
    /// Geo lookups point at the discard port and always fail.
    pub async fn new() -> Self {
        Self::with_geo_base("http://127.0.0.1:9").await
    }

    pub async fn with_geo_base(base_url: &str) -> Self {
        let root = std::env::temp_dir().join(format!("koperasi-test-{}", Uuid::new_v4()));
        let state = Arc::new(AppStateInner {
            db: Database::open_in_memory().unwrap(),
            storage: Storage::new(root).await.unwrap(),
            geo: GeoClient::new(base_url).unwrap(),
            jwt_secret: JWT_SECRET.into(),
            secure_cookies: false,
        });
        Self {
            router: router(state.clone()),
            state,
        }
    }

    pub fn public_root(&self) -> &Path {
        self.state.storage.root()
    }

    /// Inserts a user and returns a `Cookie` header value carrying its session.
    pub async fn seed_user(&self, email: &str, role: &str) -> String {
        let id = Uuid::new_v4().to_string();
        let password_hash = hash_password("abcdef").unwrap();
        self.state
            .db
            .create_user(&NewUser {
                id: &id,
                name: "Seeded",
                email,
                password_hash: &password_hash,
                role,
                email_verified: None,
                created_at: "2024-01-01T00:00:00Z",
            })
            .unwrap();
        let token = issue_token(JWT_SECRET, &id).unwrap();
        format!("auth-token={token}")
    }

    pub fn seed_koperasi(&self, status: &str) -> String {
        let id = Uuid::new_v4().to_string();
        self.state
            .db
            .insert_koperasi(&KoperasiRow {
                id: id.clone(),
                name: "Koperasi Maju Bersama".into(),
                address: "Jl. Merdeka 1".into(),
                contact_person: "Sari".into(),
                phone: "081234567".into(),
                email: None,
                regency_code: Some("32.73".into()),
                district_code: None,
                status: status.into(),
                created_by: None,
                created_at: "2024-01-01T00:00:00Z".into(),
                updated_at: "2024-01-01T00:00:00Z".into(),
            })
            .unwrap();
        id
    }

    /// Document record only; nothing is written to disk.
    pub fn insert_document_row(
        &self,
        koperasi_id: &str,
        document_type: &str,
        file_path: &str,
        upload_date: &str,
    ) -> String {
        let id = Uuid::new_v4().to_string();
        self.state
            .db
            .insert_document(&DocumentRow {
                id: id.clone(),
                koperasi_id: koperasi_id.into(),
                document_type: document_type.into(),
                file_path: file_path.into(),
                original_name: "dokumen.pdf".into(),
                mime_type: "application/pdf".into(),
                file_size: SEEDED_FILE.len() as i64,
                upload_date: upload_date.into(),
            })
            .unwrap();
        id
    }

    /// Document record plus its file under the public root.
    pub async fn seed_document(&self, koperasi_id: &str, document_type: &str, upload_date: &str) -> String {
        let file_path = format!("{}/{}.pdf", DOCUMENT_DIR, Uuid::new_v4());
        self.state.storage.write_file(&file_path, SEEDED_FILE).await.unwrap();
        self.insert_document_row(koperasi_id, document_type, &file_path, upload_date)
    }

    pub async fn request(
        &self,
        method: &str,
        path: &str,
        body: Option<String>,
        cookie: Option<&str>,
    ) -> Response {
        let mut builder = Request::builder().method(method).uri(path);
        if body.is_some() {
            builder = builder.header(header::CONTENT_TYPE, "application/json");
        }
        if let Some(cookie) = cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        let request = builder.body(body.map(Body::from).unwrap_or_else(Body::empty)).unwrap();
        self.router.clone().oneshot(request).await.unwrap()
    }

    pub async fn send_json(
        &self,
        method: &str,
        path: &str,
        body: Option<&Value>,
        cookie: Option<&str>,
    ) -> (StatusCode, Value) {
        let response = self
            .request(method, path, body.map(Value::to_string), cookie)
            .await;
        let status = response.status();
        (status, Self::body_json(response).await)
    }

    pub async fn post_json(&self, path: &str, body: &Value, cookie: Option<&str>) -> (StatusCode, Value) {
        self.send_json("POST", path, Some(body), cookie).await
    }

    pub async fn get_json(&self, path: &str, cookie: Option<&str>) -> (StatusCode, Value) {
        self.send_json("GET", path, None, cookie).await
    }

    pub async fn send_raw(
        &self,
        method: &str,
        path: &str,
        body: &str,
        cookie: Option<&str>,
    ) -> (StatusCode, Value) {
        let response = self.request(method, path, Some(body.to_string()), cookie).await;
        let status = response.status();
        (status, Self::body_json(response).await)
    }

    /// Multipart upload with a `application/pdf` file part.
    pub async fn upload(
        &self,
        koperasi_id: &str,
        document_type: &str,
        file_name: &str,
        data: &[u8],
        cookie: Option<&str>,
    ) -> (StatusCode, Value) {
        self.upload_form(
            &[("koperasiId", koperasi_id), ("documentType", document_type)],
            Some((file_name, data)),
            cookie,
        )
        .await
    }

    /// Multipart upload built from arbitrary text fields and an optional file part.
    pub async fn upload_form(
        &self,
        fields: &[(&str, &str)],
        file: Option<(&str, &[u8])>,
        cookie: Option<&str>,
    ) -> (StatusCode, Value) {
        let mut body = Vec::new();
        for (name, value) in fields {
            body.extend_from_slice(
                format!(
                    "--{MULTIPART_BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
                )
                .as_bytes(),
            );
        }
        if let Some((file_name, data)) = file {
            body.extend_from_slice(
                format!(
                    "--{MULTIPART_BOUNDARY}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{file_name}\"\r\nContent-Type: application/pdf\r\n\r\n"
                )
                .as_bytes(),
            );
            body.extend_from_slice(data);
            body.extend_from_slice(b"\r\n");
        }
        body.extend_from_slice(format!("--{MULTIPART_BOUNDARY}--\r\n").as_bytes());

        let mut builder = Request::builder()
            .method("POST")
            .uri("/api/koperasi/documents/upload")
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={MULTIPART_BOUNDARY}"),
            );
        if let Some(cookie) = cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        let response = self
            .router
            .clone()
            .oneshot(builder.body(Body::from(body)).unwrap())
            .await
            .unwrap();
        let status = response.status();
        (status, Self::body_json(response).await)
    }

    /// Names of the files currently stored under the document directory.
    pub fn stored_documents(&self) -> Vec<String> {
        std::fs::read_dir(self.public_root().join(DOCUMENT_DIR))
            .unwrap()
            .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
            .collect()
    }

    pub async fn body_bytes(response: Response) -> Vec<u8> {
        response.into_body().collect().await.unwrap().to_bytes().to_vec()
    }

    /// `Null` when the body is not JSON.
    pub async fn body_json(response: Response) -> Value {
        serde_json::from_slice(&Self::body_bytes(response).await).unwrap_or(Value::Null)
    }
}

impl Drop for TestApp {
    fn drop(&mut self) {
        std::fs::remove_dir_all(self.public_root()).ok();
    }
}
