//! Database row types. These map directly to SQLite rows and are kept
//! separate from the koperasi-types API models; enum columns stay as text
//! until the API layer parses them.

pub struct UserRow {
    pub id: String,
    pub name: String,
    pub email: String,
    pub password: String,
    pub role: String,
    pub email_verified: Option<String>,
    pub created_at: String,
}

pub struct NewUser<'a> {
    pub id: &'a str,
    pub name: &'a str,
    pub email: &'a str,
    pub password_hash: &'a str,
    pub role: &'a str,
    pub email_verified: Option<&'a str>,
    pub created_at: &'a str,
}

pub struct KoperasiRow {
    pub id: String,
    pub name: String,
    pub address: String,
    pub contact_person: String,
    pub phone: String,
    pub email: Option<String>,
    pub regency_code: Option<String>,
    pub district_code: Option<String>,
    pub status: String,
    pub created_by: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

pub struct DocumentRow {
    pub id: String,
    pub koperasi_id: String,
    pub document_type: String,
    pub file_path: String,
    pub original_name: String,
    pub mime_type: String,
    pub file_size: i64,
    pub upload_date: String,
}
