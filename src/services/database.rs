use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};
use tokio::task;

use crate::config::APP_DIR_NAME;
use crate::models::ChatExchange;
use crate::services::store::ExchangeStore;

const SCHEMA_VERSION: i32 = 1;

#[derive(Debug, Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create data directory: {}", parent.display()))?;
        }

        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open database at {}", path.display()))?;

        conn.execute_batch("PRAGMA journal_mode=WAL;")?;

        let db = Database {
            conn: Arc::new(Mutex::new(conn)),
        };
        db.run_migrations()?;

        tracing::debug!("Opened database at {}", path.display());
        Ok(db)
    }

    #[cfg(test)]
    pub fn new_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let db = Database {
            conn: Arc::new(Mutex::new(conn)),
        };
        db.run_migrations()?;
        Ok(db)
    }

    pub fn default_path() -> Result<PathBuf> {
        let data_dir = match std::env::var("XDG_DATA_HOME") {
            Ok(dir) if !dir.is_empty() => PathBuf::from(dir),
            _ => {
                let home = std::env::var("HOME")
                    .context("Neither XDG_DATA_HOME nor HOME is set")?;
                PathBuf::from(home).join(".local/share")
            }
        };
        Ok(data_dir.join(APP_DIR_NAME).join("chatlog.db"))
    }

    fn lock(conn: &Mutex<Connection>) -> Result<std::sync::MutexGuard<'_, Connection>> {
        conn.lock().map_err(|_| anyhow!("Database connection lock poisoned"))
    }

    fn run_migrations(&self) -> Result<()> {
        let conn = Self::lock(&self.conn)?;

        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS schema_version (
                version INTEGER NOT NULL
            );",
        )?;

        let version: i32 = conn
            .query_row(
                "SELECT COALESCE(MAX(version), 0) FROM schema_version",
                [],
                |row| row.get(0),
            )
            .unwrap_or(0);

        if version < 1 {
            conn.execute_batch(
                "CREATE TABLE exchanges (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    question TEXT NOT NULL,
                    answer TEXT NOT NULL,
                    created_at TEXT
                );

                CREATE INDEX idx_exchanges_question ON exchanges(question);
                CREATE INDEX idx_exchanges_created ON exchanges(created_at);

                INSERT INTO schema_version (version) VALUES (1);",
            )?;
        }

        if version > SCHEMA_VERSION {
            tracing::warn!(
                "Database schema version {} is newer than supported version {}",
                version,
                SCHEMA_VERSION
            );
        }

        Ok(())
    }

    #[cfg(test)]
    fn schema_version(&self) -> Result<i32> {
        let conn = Self::lock(&self.conn)?;
        Ok(conn.query_row(
            "SELECT COALESCE(MAX(version), 0) FROM schema_version",
            [],
            |row| row.get(0),
        )?)
    }

    // --- Row helpers ---

    fn row_to_exchange(row: &rusqlite::Row) -> Result<ChatExchange> {
        let created_str: Option<String> = row.get(3)?;
        let created_at = created_str
            .map(|s| DateTime::parse_from_rfc3339(&s).map(|dt| dt.with_timezone(&Utc)))
            .transpose()?;

        Ok(ChatExchange {
            id: Some(row.get(0)?),
            question: row.get(1)?,
            answer: row.get(2)?,
            created_at,
        })
    }
}

#[async_trait]
impl ExchangeStore for Database {
    async fn list_all(&self) -> Result<Vec<ChatExchange>> {
        let conn = self.conn.clone();
        task::spawn_blocking(move || {
            let conn = Self::lock(&conn)?;
            let mut stmt = conn.prepare(
                "SELECT id, question, answer, created_at FROM exchanges ORDER BY id ASC",
            )?;
            let exchanges = stmt
                .query_map([], |row| Ok(Self::row_to_exchange(row)))?
                .collect::<Result<Vec<_>, _>>()?
                .into_iter()
                .collect::<Result<Vec<_>, _>>()?;
            Ok(exchanges)
        })
        .await?
    }

    async fn insert(
        &self,
        question: &str,
        answer: &str,
        created_at: DateTime<Utc>,
    ) -> Result<i64> {
        let conn = self.conn.clone();
        let question = question.to_string();
        let answer = answer.to_string();
        task::spawn_blocking(move || {
            let conn = Self::lock(&conn)?;
            conn.execute(
                "INSERT INTO exchanges (question, answer, created_at) VALUES (?1, ?2, ?3)",
                params![question, answer, created_at.to_rfc3339()],
            )?;
            Ok(conn.last_insert_rowid())
        })
        .await?
    }

    async fn delete_by_id(&self, id: i64) -> Result<()> {
        let conn = self.conn.clone();
        task::spawn_blocking(move || {
            let conn = Self::lock(&conn)?;
            let removed = conn.execute("DELETE FROM exchanges WHERE id = ?1", params![id])?;
            if removed == 0 {
                tracing::debug!("No exchange with id {} to delete", id);
            }
            Ok(())
        })
        .await?
    }
}
