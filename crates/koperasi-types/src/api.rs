use serde::{Deserialize, Serialize};

use crate::models::{Document, Koperasi, User};

// -- JWT Claims --

/// Session token claims. `sub` is the user id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub exp: usize,
}

// -- Errors --

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

// -- Auth --

/// Public registration body. A `role` sent by the client is accepted and
/// ignored; registered users are always `LOW`.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Admin user creation body. `role` is kept as text so an unknown value is
/// reported as a field error instead of a body rejection.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct CreateUserRequest {
    pub name: String,
    pub email: String,
    pub password: String,
    pub role: String,
}

#[derive(Debug, Serialize)]
pub struct UserResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub user: User,
}

// -- Koperasi --

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CreateKoperasiRequest {
    pub name: String,
    pub address: String,
    pub contact_person: String,
    pub phone: String,
    pub email: Option<String>,
    pub regency_code: Option<String>,
    pub district_code: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct UpdateStatusRequest {
    pub status: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct KoperasiListQuery {
    pub status: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct KoperasiResponse {
    pub koperasi: Koperasi,
}

#[derive(Debug, Serialize)]
pub struct KoperasiDetail {
    #[serde(flatten)]
    pub koperasi: Koperasi,
    pub documents: Vec<Document>,
}

#[derive(Debug, Serialize)]
pub struct DeleteKoperasiResponse {
    pub message: String,
    pub id: String,
}

// -- Documents --

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentListQuery {
    pub koperasi_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct DocumentResponse {
    pub document: Document,
}
