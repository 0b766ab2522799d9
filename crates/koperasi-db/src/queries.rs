use crate::Database;
use crate::models::{DocumentRow, KoperasiRow, NewUser, UserRow};
use anyhow::Result;
use rusqlite::{Connection, Row};

const USER_COLUMNS: &str = "id, name, email, password, role, email_verified, created_at";

const KOPERASI_COLUMNS: &str = "id, name, address, contact_person, phone, email, regency_code, \
     district_code, status, created_by, created_at, updated_at";

const DOCUMENT_COLUMNS: &str =
    "id, koperasi_id, document_type, file_path, original_name, mime_type, file_size, upload_date";

impl Database {
    // -- Users --

    pub fn create_user(&self, user: &NewUser<'_>) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO users (id, name, email, password, role, email_verified, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                rusqlite::params![
                    user.id,
                    user.name,
                    user.email,
                    user.password_hash,
                    user.role,
                    user.email_verified,
                    user.created_at,
                ],
            )?;
            Ok(())
        })
    }

    pub fn get_user_by_email(&self, email: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| {
            let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE email = ?1");
            conn.query_row(&sql, [email], map_user).optional()
        })
    }

    pub fn get_user_by_id(&self, id: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| {
            let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1");
            conn.query_row(&sql, [id], map_user).optional()
        })
    }

    pub fn count_users(&self) -> Result<i64> {
        self.with_conn(|conn| Ok(conn.query_row("SELECT COUNT(*) FROM users", [], |r| r.get(0))?))
    }

    // -- Koperasi --

    pub fn insert_koperasi(&self, k: &KoperasiRow) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO koperasi (id, name, address, contact_person, phone, email, regency_code,
                                       district_code, status, created_by, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
                rusqlite::params![
                    k.id,
                    k.name,
                    k.address,
                    k.contact_person,
                    k.phone,
                    k.email,
                    k.regency_code,
                    k.district_code,
                    k.status,
                    k.created_by,
                    k.created_at,
                    k.updated_at,
                ],
            )?;
            Ok(())
        })
    }

    pub fn get_koperasi(&self, id: &str) -> Result<Option<KoperasiRow>> {
        self.with_conn(|conn| query_koperasi(conn, id))
    }

    /// Koperasi row plus every document attached to it, read under one lock.
    pub fn get_koperasi_with_documents(
        &self,
        id: &str,
    ) -> Result<Option<(KoperasiRow, Vec<DocumentRow>)>> {
        self.with_conn(|conn| {
            let Some(koperasi) = query_koperasi(conn, id)? else {
                return Ok(None);
            };
            let documents = query_documents(conn, id, None)?;
            Ok(Some((koperasi, documents)))
        })
    }

    pub fn list_koperasi(&self, status: Option<&str>) -> Result<Vec<KoperasiRow>> {
        self.with_conn(|conn| {
            let sql = format!(
                "SELECT {KOPERASI_COLUMNS} FROM koperasi
                 WHERE (?1 IS NULL OR status = ?1)
                 ORDER BY created_at DESC"
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map([status], map_koperasi)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Returns false when no koperasi has this id.
    pub fn update_koperasi_status(&self, id: &str, status: &str, updated_at: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE koperasi SET status = ?1, updated_at = ?2 WHERE id = ?3",
                rusqlite::params![status, updated_at, id],
            )?;
            Ok(changed > 0)
        })
    }

    /// Deletes the koperasi row. Documents, activities and members go with it
    /// through ON DELETE CASCADE. Returns false when nothing was deleted.
    pub fn delete_koperasi(&self, id: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let deleted = conn.execute("DELETE FROM koperasi WHERE id = ?1", [id])?;
            Ok(deleted > 0)
        })
    }

    // -- Documents --

    pub fn insert_document(&self, d: &DocumentRow) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO documents (id, koperasi_id, document_type, file_path, original_name,
                                        mime_type, file_size, upload_date)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                rusqlite::params![
                    d.id,
                    d.koperasi_id,
                    d.document_type,
                    d.file_path,
                    d.original_name,
                    d.mime_type,
                    d.file_size,
                    d.upload_date,
                ],
            )?;
            Ok(())
        })
    }

    pub fn get_document(&self, id: &str) -> Result<Option<DocumentRow>> {
        self.with_conn(|conn| {
            let sql = format!("SELECT {DOCUMENT_COLUMNS} FROM documents WHERE id = ?1");
            conn.query_row(&sql, [id], map_document).optional()
        })
    }

    /// Documents of a koperasi, newest upload first, leaving out one
    /// document type.
    pub fn list_documents_excluding_type(
        &self,
        koperasi_id: &str,
        excluded_type: &str,
    ) -> Result<Vec<DocumentRow>> {
        self.with_conn(|conn| query_documents(conn, koperasi_id, Some(excluded_type)))
    }
}

fn query_koperasi(conn: &Connection, id: &str) -> Result<Option<KoperasiRow>> {
    let sql = format!("SELECT {KOPERASI_COLUMNS} FROM koperasi WHERE id = ?1");
    conn.query_row(&sql, [id], map_koperasi).optional()
}

fn query_documents(
    conn: &Connection,
    koperasi_id: &str,
    excluded_type: Option<&str>,
) -> Result<Vec<DocumentRow>> {
    let sql = format!(
        "SELECT {DOCUMENT_COLUMNS} FROM documents
         WHERE koperasi_id = ?1 AND (?2 IS NULL OR document_type != ?2)
         ORDER BY upload_date DESC"
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map(rusqlite::params![koperasi_id, excluded_type], map_document)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

fn map_user(row: &Row<'_>) -> rusqlite::Result<UserRow> {
    Ok(UserRow {
        id: row.get(0)?,
        name: row.get(1)?,
        email: row.get(2)?,
        password: row.get(3)?,
        role: row.get(4)?,
        email_verified: row.get(5)?,
        created_at: row.get(6)?,
    })
}

fn map_koperasi(row: &Row<'_>) -> rusqlite::Result<KoperasiRow> {
    Ok(KoperasiRow {
        id: row.get(0)?,
        name: row.get(1)?,
        address: row.get(2)?,
        contact_person: row.get(3)?,
        phone: row.get(4)?,
        email: row.get(5)?,
        regency_code: row.get(6)?,
        district_code: row.get(7)?,
        status: row.get(8)?,
        created_by: row.get(9)?,
        created_at: row.get(10)?,
        updated_at: row.get(11)?,
    })
}

fn map_document(row: &Row<'_>) -> rusqlite::Result<DocumentRow> {
    Ok(DocumentRow {
        id: row.get(0)?,
        koperasi_id: row.get(1)?,
        document_type: row.get(2)?,
        file_path: row.get(3)?,
        original_name: row.get(4)?,
        mime_type: row.get(5)?,
        file_size: row.get(6)?,
        upload_date: row.get(7)?,
    })
}

/// Extension trait for optional query results
trait OptionalExt<T> {
    fn optional(self) -> Result<Option<T>>;
}

impl<T> OptionalExt<T> for std::result::Result<T, rusqlite::Error> {
    fn optional(self) -> Result<Option<T>> {
        match self {
            Ok(val) => Ok(Some(val)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}
