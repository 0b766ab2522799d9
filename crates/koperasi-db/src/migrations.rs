use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch("CREATE TABLE IF NOT EXISTS schema_version (version INTEGER NOT NULL);")?;

    let version: i64 = conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_version",
        [],
        |r| r.get(0),
    )?;

    if version < 1 {
        info!("Running migration v1 (initial schema)");
        conn.execute_batch(
            "
            CREATE TABLE users (
                id              TEXT PRIMARY KEY,
                name            TEXT NOT NULL,
                email           TEXT NOT NULL UNIQUE,
                password        TEXT NOT NULL,
                role            TEXT NOT NULL DEFAULT 'LOW' CHECK (role IN ('LOW', 'HIGH')),
                email_verified  TEXT,
                created_at      TEXT NOT NULL
            );

            CREATE TABLE koperasi (
                id              TEXT PRIMARY KEY,
                name            TEXT NOT NULL,
                address         TEXT NOT NULL,
                contact_person  TEXT NOT NULL,
                phone           TEXT NOT NULL,
                email           TEXT,
                regency_code    TEXT,
                district_code   TEXT,
                status          TEXT NOT NULL DEFAULT 'DIPROSES'
                                CHECK (status IN ('DIPROSES', 'DISETUJUI', 'DITOLAK')),
                created_by      TEXT REFERENCES users(id) ON DELETE SET NULL,
                created_at      TEXT NOT NULL,
                updated_at      TEXT NOT NULL
            );

            CREATE TABLE documents (
                id              TEXT PRIMARY KEY,
                koperasi_id     TEXT NOT NULL REFERENCES koperasi(id) ON DELETE CASCADE,
                document_type   TEXT NOT NULL,
                file_path       TEXT NOT NULL,
                original_name   TEXT NOT NULL,
                mime_type       TEXT NOT NULL,
                file_size       INTEGER NOT NULL,
                upload_date     TEXT NOT NULL
            );

            CREATE INDEX idx_documents_koperasi
                ON documents(koperasi_id, upload_date);

            CREATE TABLE activities (
                id              TEXT PRIMARY KEY,
                koperasi_id     TEXT NOT NULL REFERENCES koperasi(id) ON DELETE CASCADE,
                title           TEXT NOT NULL,
                description     TEXT,
                created_at      TEXT NOT NULL
            );

            CREATE TABLE members (
                id              TEXT PRIMARY KEY,
                koperasi_id     TEXT NOT NULL REFERENCES koperasi(id) ON DELETE CASCADE,
                name            TEXT NOT NULL,
                position        TEXT,
                created_at      TEXT NOT NULL
            );

            INSERT INTO schema_version (version) VALUES (1);
            ",
        )?;
    }

    info!("Database migrations complete");
    Ok(())
}
