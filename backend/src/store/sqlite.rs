//! SQLite-backed store
//!
//! Handles all database interactions for users, events and file metadata.

use super::models::{Event, EventFields, EventStatus, FileRecord, FileSummary, User, UserFields};
use super::{DeletePolicy, Deletion, EventStore, StoreError};
use anyhow::Context;
use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::path::Path;
use std::str::FromStr;
use tracing::{debug, info};

const USER_COLUMNS: &str = "id, full_name, email, phone, gender, address, created_at";

const EVENT_COLUMNS: &str = "id, user_id, event_type, event_date, event_time, guest_count, \
     budget, venue, catering, decorations, photography, music, additional_notes, status, created_at";

const FILE_COLUMNS: &str =
    "id, event_id, user_id, file_name, file_type, file_path, file_size, uploaded_at";

/// Files that belong to a user: uploaded by them or attached to one of their events
const USER_FILES_FILTER: &str =
    "user_id = ? OR event_id IN (SELECT id FROM events WHERE user_id = ?)";

/// Database connection pool for users, events and files
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Open (creating if missing) the database at `db_path` and apply the schema
    pub async fn new(db_path: &Path) -> anyhow::Result<Self> {
        if let Some(parent) = db_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).with_context(|| {
                    format!("Failed to create db directory: {}", parent.display())
                })?;
            }
        }

        let connection_string = format!("sqlite:{}", db_path.display());
        let options = SqliteConnectOptions::from_str(&connection_string)
            .with_context(|| format!("Invalid database path: {}", db_path.display()))?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            // Event/file owners are logical references only
            .foreign_keys(false);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await
            .context("Failed to connect to database")?;

        info!("Connected to SQLite database at: {}", db_path.display());

        let store = Self { pool };
        store.run_migrations().await?;

        Ok(store)
    }

    /// Apply the bundled schema; every statement is idempotent
    async fn run_migrations(&self) -> anyhow::Result<()> {
        info!("Running database migrations...");

        let migration_sql = include_str!("../../migrations/001_create_tables.sql");

        for statement in split_statements(migration_sql) {
            sqlx::query(&statement)
                .execute(&self.pool)
                .await
                .with_context(|| {
                    format!(
                        "Migration failed - Statement: {}",
                        statement.chars().take(100).collect::<String>()
                    )
                })?;
        }

        info!("Database migrations completed successfully");
        Ok(())
    }
}

/// Strip `--` comments and split a SQL script into single statements
fn split_statements(sql: &str) -> Vec<String> {
    let mut cleaned = String::new();
    for line in sql.lines() {
        let code = match line.find("--") {
            Some(pos) => &line[..pos],
            None => line,
        };
        let code = code.trim();
        if code.is_empty() {
            continue;
        }
        cleaned.push_str(code);
        cleaned.push(' ');
    }

    cleaned
        .split(';')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

#[async_trait]
impl EventStore for SqliteStore {
    async fn create_user(&self, user: &User) -> Result<(), StoreError> {
        sqlx::query(&format!(
            "INSERT INTO users ({USER_COLUMNS}) VALUES (?, ?, ?, ?, ?, ?, ?)"
        ))
        .bind(&user.id)
        .bind(&user.full_name)
        .bind(&user.email)
        .bind(&user.phone)
        .bind(&user.gender)
        .bind(&user.address)
        .bind(user.created_at)
        .execute(&self.pool)
        .await?;

        debug!("Created user: {}", user.id);
        Ok(())
    }

    async fn list_users(&self) -> Result<Vec<User>, StoreError> {
        let users = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users ORDER BY created_at DESC"
        ))
        .fetch_all(&self.pool)
        .await?;

        Ok(users)
    }

    async fn get_user(&self, id: &str) -> Result<Option<User>, StoreError> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = ?"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    async fn update_user(&self, id: &str, fields: &UserFields) -> Result<bool, StoreError> {
        let result = sqlx::query(
            "UPDATE users SET full_name = ?, email = ?, phone = ?, gender = ?, address = ? WHERE id = ?",
        )
        .bind(&fields.full_name)
        .bind(&fields.email)
        .bind(&fields.phone)
        .bind(&fields.gender)
        .bind(&fields.address)
        .bind(id)
        .execute(&self.pool)
        .await?;

        debug!("Updated user: {}", id);
        Ok(result.rows_affected() > 0)
    }

    async fn delete_user(
        &self,
        id: &str,
        policy: DeletePolicy,
    ) -> Result<Option<Deletion>, StoreError> {
        let mut tx = self.pool.begin().await?;

        let deleted = sqlx::query("DELETE FROM users WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?
            .rows_affected();
        if deleted == 0 {
            tx.rollback().await?;
            return Ok(None);
        }

        let mut deletion = Deletion::default();
        if policy == DeletePolicy::Cascade {
            deletion.file_paths = sqlx::query_scalar::<_, String>(&format!(
                "SELECT file_path FROM files WHERE {USER_FILES_FILTER}"
            ))
            .bind(id)
            .bind(id)
            .fetch_all(&mut *tx)
            .await?;

            sqlx::query(&format!("DELETE FROM files WHERE {USER_FILES_FILTER}"))
                .bind(id)
                .bind(id)
                .execute(&mut *tx)
                .await?;

            sqlx::query("DELETE FROM events WHERE user_id = ?")
                .bind(id)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;

        debug!(
            "Deleted user {} ({} dependent files)",
            id,
            deletion.file_paths.len()
        );
        Ok(Some(deletion))
    }

    async fn create_event(&self, event: &Event) -> Result<(), StoreError> {
        sqlx::query(&format!(
            "INSERT INTO events ({EVENT_COLUMNS}) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"
        ))
        .bind(&event.id)
        .bind(&event.user_id)
        .bind(&event.event_type)
        .bind(&event.event_date)
        .bind(&event.event_time)
        .bind(event.guest_count)
        .bind(event.budget)
        .bind(&event.venue)
        .bind(&event.catering)
        .bind(&event.decorations)
        .bind(&event.photography)
        .bind(&event.music)
        .bind(&event.additional_notes)
        .bind(&event.status)
        .bind(event.created_at)
        .execute(&self.pool)
        .await?;

        debug!("Created event {} for user {}", event.id, event.user_id);
        Ok(())
    }

    async fn list_events(&self) -> Result<Vec<Event>, StoreError> {
        let events = sqlx::query_as::<_, Event>(&format!(
            "SELECT {EVENT_COLUMNS} FROM events ORDER BY created_at DESC"
        ))
        .fetch_all(&self.pool)
        .await?;

        Ok(events)
    }

    async fn list_events_for_user(&self, user_id: &str) -> Result<Vec<Event>, StoreError> {
        let events = sqlx::query_as::<_, Event>(&format!(
            "SELECT {EVENT_COLUMNS} FROM events WHERE user_id = ? ORDER BY created_at DESC"
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(events)
    }

    async fn get_event(&self, id: &str) -> Result<Option<Event>, StoreError> {
        let event = sqlx::query_as::<_, Event>(&format!(
            "SELECT {EVENT_COLUMNS} FROM events WHERE id = ?"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(event)
    }

    async fn update_event(
        &self,
        id: &str,
        fields: &EventFields,
        status: Option<EventStatus>,
    ) -> Result<bool, StoreError> {
        let result = sqlx::query(
            "UPDATE events SET event_type = ?, event_date = ?, event_time = ?, guest_count = ?, \
             budget = ?, venue = ?, catering = ?, decorations = ?, photography = ?, music = ?, \
             additional_notes = ?, status = COALESCE(?, status) WHERE id = ?",
        )
        .bind(&fields.event_type)
        .bind(&fields.event_date)
        .bind(&fields.event_time)
        .bind(fields.guest_count)
        .bind(fields.budget)
        .bind(&fields.venue)
        .bind(&fields.catering)
        .bind(&fields.decorations)
        .bind(&fields.photography)
        .bind(&fields.music)
        .bind(&fields.additional_notes)
        .bind(status.map(|s| s.as_str()))
        .bind(id)
        .execute(&self.pool)
        .await?;

        debug!("Updated event: {}", id);
        Ok(result.rows_affected() > 0)
    }

    async fn delete_event(
        &self,
        id: &str,
        policy: DeletePolicy,
    ) -> Result<Option<Deletion>, StoreError> {
        let mut tx = self.pool.begin().await?;

        let deleted = sqlx::query("DELETE FROM events WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?
            .rows_affected();
        if deleted == 0 {
            tx.rollback().await?;
            return Ok(None);
        }

        let mut deletion = Deletion::default();
        if policy == DeletePolicy::Cascade {
            deletion.file_paths =
                sqlx::query_scalar::<_, String>("SELECT file_path FROM files WHERE event_id = ?")
                    .bind(id)
                    .fetch_all(&mut *tx)
                    .await?;

            sqlx::query("DELETE FROM files WHERE event_id = ?")
                .bind(id)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;

        debug!(
            "Deleted event {} ({} dependent files)",
            id,
            deletion.file_paths.len()
        );
        Ok(Some(deletion))
    }

    async fn create_file(&self, file: &FileRecord) -> Result<(), StoreError> {
        sqlx::query(&format!(
            "INSERT INTO files ({FILE_COLUMNS}) VALUES (?, ?, ?, ?, ?, ?, ?, ?)"
        ))
        .bind(&file.id)
        .bind(&file.event_id)
        .bind(&file.user_id)
        .bind(&file.file_name)
        .bind(&file.file_type)
        .bind(&file.file_path)
        .bind(file.file_size)
        .bind(file.uploaded_at)
        .execute(&self.pool)
        .await?;

        debug!("Created file record {} for event {}", file.id, file.event_id);
        Ok(())
    }

    async fn list_files_for_event(&self, event_id: &str) -> Result<Vec<FileSummary>, StoreError> {
        let files = sqlx::query_as::<_, FileSummary>(
            "SELECT id, file_name, file_type, file_size, uploaded_at FROM files \
             WHERE event_id = ? ORDER BY uploaded_at ASC",
        )
        .bind(event_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(files)
    }

    async fn get_file(&self, id: &str) -> Result<Option<FileRecord>, StoreError> {
        let file = sqlx::query_as::<_, FileRecord>(&format!(
            "SELECT {FILE_COLUMNS} FROM files WHERE id = ?"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(file)
    }

    async fn delete_file(&self, id: &str) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM files WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        debug!("Deleted file record: {}", id);
        Ok(result.rows_affected() > 0)
    }

    async fn file_paths(&self) -> Result<Vec<String>, StoreError> {
        let paths = sqlx::query_scalar::<_, String>("SELECT file_path FROM files")
            .fetch_all(&self.pool)
            .await?;

        Ok(paths)
    }

    async fn count_users(&self) -> Result<i64, StoreError> {
        count(&self.pool, "users").await
    }

    async fn count_events(&self) -> Result<i64, StoreError> {
        count(&self.pool, "events").await
    }

    async fn count_files(&self) -> Result<i64, StoreError> {
        count(&self.pool, "files").await
    }
}

async fn count(pool: &SqlitePool, table: &'static str) -> Result<i64, StoreError> {
    let total = sqlx::query_scalar::<_, i64>(&format!("SELECT COUNT(*) FROM {table}"))
        .fetch_one(pool)
        .await?;
    Ok(total)
}
