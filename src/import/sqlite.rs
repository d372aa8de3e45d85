//! SQLite-backed bulk loader.
//!
//! Each export row is stored as a JSON object keyed by the file's header
//! row. A whole batch runs in one transaction; re-importing a file name
//! replaces its earlier rows.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde_json::{Map, Value};
use tracing::{debug, instrument};

use super::{BulkLoader, ImportError, LoadReport, LoadedFile, list_staged_files};
use crate::db::Database;

const BYTE_ORDER_MARK: char = '\u{feff}';

/// Bulk loader writing into the `export_files`/`export_rows` tables.
#[derive(Debug, Clone)]
pub struct SqliteBulkLoader {
    db: Database,
}

/// A parsed export ready for insertion.
#[derive(Debug)]
struct ParsedExport {
    path: PathBuf,
    file_name: String,
    records: Vec<Value>,
}

impl SqliteBulkLoader {
    /// Creates a loader over `db`.
    #[must_use]
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// The backing database.
    #[must_use]
    pub fn database(&self) -> &Database {
        &self.db
    }

    /// Returns the stored rows of `file_name` in file order.
    ///
    /// # Errors
    ///
    /// Returns [`ImportError::Database`] if the query fails.
    pub async fn rows_for(&self, file_name: &str) -> Result<Vec<Value>, ImportError> {
        let rows: Vec<(String,)> = sqlx::query_as(
            "SELECT record FROM export_rows WHERE file_name = ? ORDER BY row_index",
        )
        .bind(file_name)
        .fetch_all(self.db.pool())
        .await?;

        rows.into_iter()
            .map(|(record,)| {
                serde_json::from_str(&record).map_err(|e| {
                    ImportError::Database(sqlx::Error::Decode(Box::new(e)))
                })
            })
            .collect()
    }
}

#[async_trait]
impl BulkLoader for SqliteBulkLoader {
    #[instrument(skip(self), fields(staging = %staging_dir.display()))]
    async fn load_directory(&self, staging_dir: &Path) -> Result<LoadReport, ImportError> {
        let paths = list_staged_files(staging_dir).await?;
        if paths.is_empty() {
            debug!("no staged exports to load");
            return Ok(LoadReport::default());
        }

        let parsed = tokio::task::spawn_blocking(move || {
            paths
                .into_iter()
                .map(|path| parse_export(&path))
                .collect::<Result<Vec<_>, _>>()
        })
        .await
        .map_err(|e| ImportError::Task(e.to_string()))??;

        let mut tx = self.db.pool().begin().await?;
        let mut files = Vec::with_capacity(parsed.len());

        for export in parsed {
            sqlx::query("DELETE FROM export_rows WHERE file_name = ?")
                .bind(&export.file_name)
                .execute(&mut *tx)
                .await?;

            for (index, record) in export.records.iter().enumerate() {
                sqlx::query(
                    "INSERT INTO export_rows (file_name, row_index, record) VALUES (?, ?, ?)",
                )
                .bind(&export.file_name)
                .bind(i64::try_from(index).unwrap_or(i64::MAX))
                .bind(record.to_string())
                .execute(&mut *tx)
                .await?;
            }

            let rows = export.records.len() as u64;
            sqlx::query(
                r"INSERT INTO export_files (file_name, row_count, imported_at)
                  VALUES (?, ?, datetime('now'))
                  ON CONFLICT(file_name) DO UPDATE SET
                      row_count = excluded.row_count,
                      imported_at = excluded.imported_at",
            )
            .bind(&export.file_name)
            .bind(i64::try_from(rows).unwrap_or(i64::MAX))
            .execute(&mut *tx)
            .await?;

            debug!(file = %export.file_name, rows, "export rows written");
            files.push(LoadedFile {
                path: export.path,
                file_name: export.file_name,
                rows,
            });
        }

        tx.commit().await?;
        Ok(LoadReport { files })
    }
}

/// Reads one export into JSON records.
///
/// Rows may be ragged: missing trailing cells are omitted from the record,
/// surplus cells are keyed `column_N` (1-based).
fn parse_export(path: &Path) -> Result<ParsedExport, ImportError> {
    let read_error = |source| ImportError::Read {
        path: path.to_path_buf(),
        source,
    };

    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .has_headers(true)
        .from_path(path)
        .map_err(read_error)?;

    let headers = normalize_headers(reader.byte_headers().map_err(read_error)?);

    let mut records = Vec::new();
    for result in reader.byte_records() {
        let record = result.map_err(read_error)?;
        let mut object = Map::with_capacity(record.len());
        for (i, cell) in record.iter().enumerate() {
            let key = headers
                .get(i)
                .cloned()
                .unwrap_or_else(|| positional_key(i));
            object.insert(key, Value::String(String::from_utf8_lossy(cell).into_owned()));
        }
        records.push(Value::Object(object));
    }

    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    Ok(ParsedExport {
        path: path.to_path_buf(),
        file_name,
        records,
    })
}

/// Strips a leading byte-order mark, trims, and makes every header unique.
fn normalize_headers(raw: &csv::ByteRecord) -> Vec<String> {
    let mut seen = HashSet::with_capacity(raw.len());
    raw.iter()
        .enumerate()
        .map(|(i, bytes)| {
            let text = String::from_utf8_lossy(bytes);
            let trimmed = text.trim_start_matches(BYTE_ORDER_MARK).trim();
            let key = if trimmed.is_empty() || seen.contains(trimmed) {
                positional_key(i)
            } else {
                trimmed.to_string()
            };
            seen.insert(key.clone());
            key
        })
        .collect()
}

fn positional_key(index: usize) -> String {
    format!("column_{}", index + 1)
}
