use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDateTime, SecondsFormat, Utc};

use koperasi_db::models::{DocumentRow, KoperasiRow, UserRow};
use koperasi_types::models::{Document, Koperasi, User};

/// Timestamp format written to the store. Fixed-width RFC 3339 in UTC, so
/// text ordering in SQL matches time ordering.
pub fn now_timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>> {
    raw.parse::<DateTime<Utc>>()
        .or_else(|_| {
            // SQLite's datetime('now') has no timezone; treat it as UTC.
            NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S").map(|ndt| ndt.and_utc())
        })
        .with_context(|| format!("corrupt timestamp '{}'", raw))
}

pub fn user_from_row(row: UserRow) -> Result<User> {
    Ok(User {
        role: row
            .role
            .parse()
            .with_context(|| format!("corrupt role on user '{}'", row.id))?,
        email_verified: row.email_verified.as_deref().map(parse_timestamp).transpose()?,
        created_at: parse_timestamp(&row.created_at)?,
        id: row.id,
        name: row.name,
        email: row.email,
    })
}

pub fn koperasi_from_row(row: KoperasiRow) -> Result<Koperasi> {
    Ok(Koperasi {
        status: row
            .status
            .parse()
            .with_context(|| format!("corrupt status on koperasi '{}'", row.id))?,
        created_at: parse_timestamp(&row.created_at)?,
        updated_at: parse_timestamp(&row.updated_at)?,
        id: row.id,
        name: row.name,
        address: row.address,
        contact_person: row.contact_person,
        phone: row.phone,
        email: row.email,
        regency_code: row.regency_code,
        district_code: row.district_code,
        created_by: row.created_by,
    })
}

pub fn document_from_row(row: DocumentRow) -> Result<Document> {
    Ok(Document {
        upload_date: parse_timestamp(&row.upload_date)?,
        file_size: u64::try_from(row.file_size)
            .with_context(|| format!("negative file size on document '{}'", row.id))?,
        id: row.id,
        koperasi_id: row.koperasi_id,
        document_type: row.document_type,
        file_path: row.file_path,
        original_name: row.original_name,
        mime_type: row.mime_type,
    })
}

pub fn documents_from_rows(rows: Vec<DocumentRow>) -> Result<Vec<Document>> {
    rows.into_iter().map(document_from_row).collect()
}
