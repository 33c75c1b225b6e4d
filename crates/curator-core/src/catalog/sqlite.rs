//! SQLite-backed catalog.
//!
//! One connection behind a mutex; every call runs on the blocking pool and is
//! independent (no multi-item transactions).

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, ErrorCode, OptionalExtension};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use super::Catalog;
use crate::error::{ConfigError, PipelineError, PipelineResult};
use crate::types::{CatalogRecord, Device};

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS catalog_records (
    id                  INTEGER PRIMARY KEY AUTOINCREMENT,
    slug                TEXT NOT NULL UNIQUE,
    title               TEXT NOT NULL,
    category            TEXT NOT NULL,
    device              TEXT NOT NULL,
    preview_url         TEXT NOT NULL,
    download_url        TEXT NOT NULL,
    width               INTEGER NOT NULL,
    height              INTEGER NOT NULL,
    download_size       INTEGER NOT NULL,
    tags_json           TEXT NOT NULL,
    preview_key         TEXT NOT NULL,
    download_key        TEXT NOT NULL,
    original_filename   TEXT NOT NULL,
    content_hash        TEXT NOT NULL,
    created_at          TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_catalog_records_category
    ON catalog_records(category);
";

const SELECT_COLUMNS: &str = "slug, title, category, device, preview_url, download_url, \
     width, height, download_size, tags_json, preview_key, download_key, \
     original_filename, content_hash, created_at";

/// Catalog stored in a local SQLite database.
#[derive(Clone)]
pub struct SqliteCatalog {
    conn: Arc<Mutex<Connection>>,
    path: Option<PathBuf>,
}

impl SqliteCatalog {
    /// Open (or create) the catalog database at `path`.
    pub fn open(path: &Path) -> Result<Self, ConfigError> {
        let open_error = |message: String| ConfigError::Catalog {
            path: path.to_path_buf(),
            message,
        };

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| open_error(e.to_string()))?;
        }

        let conn = Connection::open(path).map_err(|e| open_error(e.to_string()))?;
        conn.busy_timeout(Duration::from_secs(5))
            .map_err(|e| open_error(e.to_string()))?;
        conn.execute_batch(SCHEMA)
            .map_err(|e| open_error(e.to_string()))?;

        tracing::debug!("Catalog opened at {}", path.display());

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            path: Some(path.to_path_buf()),
        })
    }

    /// Private in-memory catalog.
    pub fn open_in_memory() -> Result<Self, ConfigError> {
        let open_error = |e: rusqlite::Error| ConfigError::Catalog {
            path: PathBuf::from(":memory:"),
            message: e.to_string(),
        };
        let conn = Connection::open_in_memory().map_err(open_error)?;
        conn.execute_batch(SCHEMA).map_err(open_error)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            path: None,
        })
    }

    /// Database file, `None` for in-memory catalogs.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Fetch one record by slug.
    pub async fn get(&self, slug: &str) -> PipelineResult<Option<CatalogRecord>> {
        let key = slug.to_string();
        self.with_conn(slug, move |conn| {
            let sql = format!("SELECT {SELECT_COLUMNS} FROM catalog_records WHERE slug = ?1");
            let row = conn
                .query_row(&sql, [&key], RawRecord::from_row)
                .optional()
                .map_err(|e| catalog_error(&key, e))?;
            row.map(|raw| raw.into_record()).transpose()
        })
        .await
    }

    /// Number of cataloged records.
    pub async fn count(&self) -> PipelineResult<u64> {
        self.with_conn("*", |conn| {
            conn.query_row("SELECT COUNT(*) FROM catalog_records", [], |row| {
                row.get::<_, i64>(0)
            })
            .map(|n| n as u64)
            .map_err(|e| catalog_error("*", e))
        })
        .await
    }

    /// Run `f` against the connection on the blocking pool.
    async fn with_conn<T, F>(&self, slug: &str, f: F) -> PipelineResult<T>
    where
        F: FnOnce(&Connection) -> PipelineResult<T> + Send + 'static,
        T: Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        let task_slug = slug.to_string();
        tokio::task::spawn_blocking(move || {
            let guard = conn.lock().map_err(|_| PipelineError::Catalog {
                slug: task_slug,
                message: "catalog connection poisoned".to_string(),
            })?;
            f(&guard)
        })
        .await
        .map_err(|e| PipelineError::Catalog {
            slug: slug.to_string(),
            message: format!("Task join error: {}", e),
        })?
    }
}

#[async_trait]
impl Catalog for SqliteCatalog {
    async fn exists(&self, slug: &str) -> PipelineResult<bool> {
        let key = slug.to_string();
        self.with_conn(slug, move |conn| {
            conn.query_row(
                "SELECT 1 FROM catalog_records WHERE slug = ?1 LIMIT 1",
                [&key],
                |_| Ok(()),
            )
            .optional()
            .map(|found| found.is_some())
            .map_err(|e| catalog_error(&key, e))
        })
        .await
    }

    async fn insert(&self, record: &CatalogRecord) -> PipelineResult<()> {
        let record = record.clone();
        let slug = record.slug.clone();
        self.with_conn(&slug, move |conn| {
            let tags_json = serde_json::to_string(&record.tags).map_err(|e| {
                PipelineError::Catalog {
                    slug: record.slug.clone(),
                    message: e.to_string(),
                }
            })?;

            let inserted = conn.execute(
                "INSERT INTO catalog_records (
                    slug, title, category, device, preview_url, download_url,
                    width, height, download_size, tags_json, preview_key,
                    download_key, original_filename, content_hash, created_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)",
                params![
                    record.slug,
                    record.title,
                    record.category,
                    record.device.as_str(),
                    record.preview_url,
                    record.download_url,
                    record.width as i64,
                    record.height as i64,
                    record.download_size as i64,
                    tags_json,
                    record.preview_key,
                    record.download_key,
                    record.original_filename,
                    record.content_hash,
                    record.created_at.to_rfc3339(),
                ],
            );

            match inserted {
                Ok(_) => Ok(()),
                Err(rusqlite::Error::SqliteFailure(err, _))
                    if err.code == ErrorCode::ConstraintViolation =>
                {
                    Err(PipelineError::Conflict {
                        slug: record.slug.clone(),
                    })
                }
                Err(e) => Err(catalog_error(&record.slug, e)),
            }
        })
        .await
    }
}

fn catalog_error(slug: &str, e: rusqlite::Error) -> PipelineError {
    PipelineError::Catalog {
        slug: slug.to_string(),
        message: e.to_string(),
    }
}

/// Row as stored, before text columns are parsed back into typed fields.
struct RawRecord {
    slug: String,
    title: String,
    category: String,
    device: String,
    preview_url: String,
    download_url: String,
    width: i64,
    height: i64,
    download_size: i64,
    tags_json: String,
    preview_key: String,
    download_key: String,
    original_filename: String,
    content_hash: String,
    created_at: String,
}

impl RawRecord {
    fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            slug: row.get(0)?,
            title: row.get(1)?,
            category: row.get(2)?,
            device: row.get(3)?,
            preview_url: row.get(4)?,
            download_url: row.get(5)?,
            width: row.get(6)?,
            height: row.get(7)?,
            download_size: row.get(8)?,
            tags_json: row.get(9)?,
            preview_key: row.get(10)?,
            download_key: row.get(11)?,
            original_filename: row.get(12)?,
            content_hash: row.get(13)?,
            created_at: row.get(14)?,
        })
    }

    fn into_record(self) -> PipelineResult<CatalogRecord> {
        let corrupt = |message: String| PipelineError::Catalog {
            slug: self.slug.clone(),
            message,
        };

        let device: Device = self.device.parse().map_err(corrupt)?;
        let tags: Vec<String> =
            serde_json::from_str(&self.tags_json).map_err(|e| corrupt(e.to_string()))?;
        let created_at = DateTime::parse_from_rfc3339(&self.created_at)
            .map_err(|e| corrupt(e.to_string()))?
            .with_timezone(&Utc);

        Ok(CatalogRecord {
            device,
            tags,
            created_at,
            width: self.width as u32,
            height: self.height as u32,
            download_size: self.download_size as u64,
            slug: self.slug,
            title: self.title,
            category: self.category,
            preview_url: self.preview_url,
            download_url: self.download_url,
            preview_key: self.preview_key,
            download_key: self.download_key,
            original_filename: self.original_filename,
            content_hash: self.content_hash,
        })
    }
}
