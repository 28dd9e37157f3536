//! Append-only audit trail of signing operations

use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;
use serde_json::Value;
use sqlx::{FromRow, SqlitePool};
use uuid::Uuid;

/// One successful signing, never updated after insert
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditRecord {
    pub id: String,
    pub document_id: String,
    pub original_content_hash: String,
    pub signed_content_hash: String,
    pub output_location: String,
    pub metadata: Value,
    pub created_at: DateTime<Utc>,
}

/// Audit row as stored in SQLite
#[derive(Debug, Clone, FromRow)]
struct DbAudit {
    id: String,
    document_id: String,
    original_hash: String,
    signed_hash: String,
    output_location: String,
    metadata_json: String,
    created_at: DateTime<Utc>,
}

impl From<DbAudit> for AuditRecord {
    fn from(row: DbAudit) -> Self {
        Self {
            id: row.id,
            document_id: row.document_id,
            original_content_hash: row.original_hash,
            signed_content_hash: row.signed_hash,
            output_location: row.output_location,
            metadata: serde_json::from_str(&row.metadata_json).unwrap_or(Value::Null),
            created_at: row.created_at,
        }
    }
}

impl AuditRecord {
    pub fn new(
        document_id: &str,
        original_content_hash: String,
        signed_content_hash: String,
        output_location: String,
        metadata: Value,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            document_id: document_id.to_string(),
            original_content_hash,
            signed_content_hash,
            output_location,
            metadata,
            created_at: Utc::now(),
        }
    }
}

/// Create the audit table and its lookup index
pub async fn migrate(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS document_audits (
            id TEXT PRIMARY KEY,
            document_id TEXT NOT NULL,
            original_hash TEXT NOT NULL,
            signed_hash TEXT NOT NULL,
            output_location TEXT NOT NULL,
            metadata_json TEXT NOT NULL DEFAULT '{}',
            created_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE INDEX IF NOT EXISTS idx_document_audits_document
        ON document_audits(document_id, created_at DESC)
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

pub async fn insert(pool: &SqlitePool, record: &AuditRecord) -> Result<(), sqlx::Error> {
    // Fixed-width timestamps keep text ordering chronological
    let created_at = record
        .created_at
        .to_rfc3339_opts(SecondsFormat::Micros, true);

    sqlx::query(
        r#"
        INSERT INTO document_audits
            (id, document_id, original_hash, signed_hash, output_location, metadata_json, created_at)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&record.id)
    .bind(&record.document_id)
    .bind(&record.original_content_hash)
    .bind(&record.signed_content_hash)
    .bind(&record.output_location)
    .bind(record.metadata.to_string())
    .bind(created_at)
    .execute(pool)
    .await?;

    Ok(())
}

/// All audits for a document, most recent first
pub async fn list_for_document(
    pool: &SqlitePool,
    document_id: &str,
) -> Result<Vec<AuditRecord>, sqlx::Error> {
    let rows: Vec<DbAudit> = sqlx::query_as(
        r#"
        SELECT id, document_id, original_hash, signed_hash, output_location,
               metadata_json, created_at
        FROM document_audits
        WHERE document_id = ?
        ORDER BY created_at DESC, rowid DESC
        "#,
    )
    .bind(document_id)
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().map(AuditRecord::from).collect())
}
