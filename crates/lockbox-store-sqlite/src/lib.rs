//! SQLite SecretStore backend over sqlx.
//!
//! UUIDs are stored as text, timestamps as unix milliseconds, and the three
//! envelope fields as separate blob columns.

use chrono::{DateTime, Utc};
use lockbox_storage::{
    ActorId, Envelope, InsertSecretParams, ListQuery, OrganizationId, SecretId, SecretKind,
    SecretPage, SecretPatch, SecretRecord, SecretStore, StoreError,
};
use sqlx::{sqlite::SqlitePoolOptions, SqlitePool};
use uuid::Uuid;

static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("./migrations");

pub struct SqliteStore {
    pool: SqlitePool,
}

/// Row tuple as selected by every query: id, organization_id, created_by,
/// name, kind, ciphertext, nonce, tag, created_at, updated_at.
type SecretRow = (
    String,
    String,
    String,
    String,
    String,
    Vec<u8>,
    Vec<u8>,
    Vec<u8>,
    i64,
    i64,
);

const SELECT_COLUMNS: &str =
    "id, organization_id, created_by, name, kind, ciphertext, nonce, tag, created_at, updated_at";

impl SqliteStore {
    /// `~/.lockbox/store.db` (creates dir with 0700 perms on unix)
    pub async fn open_default() -> Result<Self, StoreError> {
        let dir = dirs::home_dir()
            .ok_or_else(|| StoreError::Backend("no home dir".into()))?
            .join(".lockbox");
        std::fs::create_dir_all(&dir).map_err(|e| StoreError::Backend(e.to_string()))?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(&dir, std::fs::Permissions::from_mode(0o700))
                .map_err(|e| StoreError::Backend(e.to_string()))?;
        }
        let path = dir.join("store.db");
        let url = format!("sqlite://{}?mode=rwc", path.to_string_lossy());
        Self::open(&url).await
    }

    pub async fn open_in_memory() -> Result<Self, StoreError> {
        Self::open("sqlite::memory:").await
    }

    pub async fn open(url: &str) -> Result<Self, StoreError> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect(url)
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))?;

        MIGRATOR
            .run(&pool)
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))?;

        Ok(Self { pool })
    }

    async fn fetch_row(
        &self,
        org_id: &OrganizationId,
        id: &SecretId,
    ) -> Result<SecretRecord, StoreError> {
        let sql = format!(
            "SELECT {SELECT_COLUMNS} FROM secrets WHERE id=? AND organization_id=?"
        );
        let row = sqlx::query_as::<_, SecretRow>(&sql)
            .bind(id.to_string())
            .bind(org_id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))?;

        match row {
            None => Err(StoreError::NotFound),
            Some(row) => decode_row(row),
        }
    }
}

fn parse_uuid(s: &str) -> Result<Uuid, StoreError> {
    Uuid::try_parse(s).map_err(|e| StoreError::Backend(e.to_string()))
}

fn parse_millis(ms: i64) -> Result<DateTime<Utc>, StoreError> {
    DateTime::from_timestamp_millis(ms)
        .ok_or_else(|| StoreError::Backend(format!("timestamp out of range: {}", ms)))
}

fn decode_row(row: SecretRow) -> Result<SecretRecord, StoreError> {
    let (id, org, created_by, name, kind, ciphertext, nonce, tag, created_at, updated_at) = row;
    Ok(SecretRecord {
        id: SecretId(parse_uuid(&id)?),
        organization_id: OrganizationId(parse_uuid(&org)?),
        created_by: ActorId(parse_uuid(&created_by)?),
        name,
        kind: kind
            .parse::<SecretKind>()
            .map_err(|e| StoreError::Backend(e.to_string()))?,
        envelope: Envelope {
            ciphertext,
            nonce,
            tag,
        },
        created_at: parse_millis(created_at)?,
        updated_at: parse_millis(updated_at)?,
    })
}

#[async_trait::async_trait]
impl SecretStore for SqliteStore {
    async fn insert(&self, params: &InsertSecretParams) -> Result<SecretRecord, StoreError> {
        let id = SecretId::generate();
        let now = Utc::now();
        let now_ms = now.timestamp_millis();

        sqlx::query(
            "INSERT INTO secrets(id, organization_id, created_by, name, kind,
                                 ciphertext, nonce, tag, created_at, updated_at)
             VALUES(?,?,?,?,?,?,?,?,?,?)",
        )
        .bind(id.to_string())
        .bind(params.organization_id.to_string())
        .bind(params.created_by.to_string())
        .bind(&params.name)
        .bind(params.kind.as_str())
        .bind(&params.envelope.ciphertext)
        .bind(&params.envelope.nonce)
        .bind(&params.envelope.tag)
        .bind(now_ms)
        .bind(now_ms)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            let s = e.to_string();
            if s.contains("UNIQUE") {
                StoreError::Conflict
            } else {
                StoreError::Backend(s)
            }
        })?;

        Ok(SecretRecord {
            id,
            organization_id: params.organization_id,
            created_by: params.created_by,
            name: params.name.clone(),
            kind: params.kind,
            envelope: params.envelope.clone(),
            // Re-read through the stored precision so the returned row
            // matches what a later get_by_id yields byte for byte.
            created_at: parse_millis(now_ms)?,
            updated_at: parse_millis(now_ms)?,
        })
    }

    async fn get_by_id(
        &self,
        org_id: &OrganizationId,
        id: &SecretId,
    ) -> Result<SecretRecord, StoreError> {
        self.fetch_row(org_id, id).await
    }

    async fn list_by_org(
        &self,
        org_id: &OrganizationId,
        query: &ListQuery,
    ) -> Result<SecretPage, StoreError> {
        let (offset, limit) = query.window();

        let (total_count,): (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM secrets WHERE organization_id=?")
                .bind(org_id.to_string())
                .fetch_one(&self.pool)
                .await
                .map_err(|e| StoreError::Backend(e.to_string()))?;

        let sql = format!(
            "SELECT {SELECT_COLUMNS} FROM secrets
             WHERE organization_id=?
             ORDER BY created_at DESC, id DESC
             LIMIT ? OFFSET ?"
        );
        let rows = sqlx::query_as::<_, SecretRow>(&sql)
            .bind(org_id.to_string())
            .bind(i64::from(limit))
            .bind(i64::from(offset))
            .fetch_all(&self.pool)
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))?;

        let mut records = Vec::with_capacity(rows.len());
        for row in rows {
            records.push(decode_row(row)?);
        }

        Ok(SecretPage {
            records,
            total_count: total_count as u64,
        })
    }

    async fn update(
        &self,
        org_id: &OrganizationId,
        id: &SecretId,
        patch: &SecretPatch,
    ) -> Result<SecretRecord, StoreError> {
        let current = self.fetch_row(org_id, id).await?;

        if matches!(patch.kind, Some(kind) if kind != current.kind) {
            return Err(StoreError::ImmutableField);
        }
        if matches!(patch.organization_id, Some(org) if org != current.organization_id) {
            return Err(StoreError::ImmutableField);
        }

        if patch.name.is_none() && patch.envelope.is_none() {
            return Ok(current);
        }

        let name = patch.name.as_ref().unwrap_or(&current.name);
        let envelope = patch.envelope.as_ref().unwrap_or(&current.envelope);
        let updated_ms = Utc::now().timestamp_millis();

        let result = sqlx::query(
            "UPDATE secrets
             SET name=?, ciphertext=?, nonce=?, tag=?, updated_at=?
             WHERE id=? AND organization_id=?",
        )
        .bind(name)
        .bind(&envelope.ciphertext)
        .bind(&envelope.nonce)
        .bind(&envelope.tag)
        .bind(updated_ms)
        .bind(id.to_string())
        .bind(org_id.to_string())
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::Backend(e.to_string()))?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }

        Ok(SecretRecord {
            name: name.clone(),
            envelope: envelope.clone(),
            updated_at: parse_millis(updated_ms)?,
            ..current
        })
    }

    async fn delete(&self, org_id: &OrganizationId, id: &SecretId) -> Result<(), StoreError> {
        let result = sqlx::query("DELETE FROM secrets WHERE id=? AND organization_id=?")
            .bind(id.to_string())
            .bind(org_id.to_string())
            .execute(&self.pool)
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }
}
