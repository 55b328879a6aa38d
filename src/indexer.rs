//! SQLite index over canonical news files.
//!
//! [`NewsIndex`] ingests canonical JSON batches one file at a time and
//! answers filtered searches (see [`crate::search`]). The database handle is
//! opened and closed inside every call; the only state kept between calls is
//! the database path and an in-process writer lock.

use chrono::Utc;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::db;
use crate::error::{Result, StoreError};
use crate::migrate;
use crate::models::{IndexRecord, NewsItem};
use crate::search::{self, SearchQuery};
use crate::stats::{self, IndexStats};
use crate::validator::{format_timestamp_utc, parse_timestamp};

/// Handle on the index database.
#[derive(Debug, Clone)]
pub struct NewsIndex {
    db_path: PathBuf,
    write_lock: Arc<Mutex<()>>,
}

impl NewsIndex {
    /// Open (and if necessary create) the index at `db_path`.
    pub async fn open(db_path: impl Into<PathBuf>) -> Result<Self> {
        let db_path = db_path.into();
        migrate::run_migrations(&db_path).await?;
        Ok(Self {
            db_path,
            write_lock: Arc::new(Mutex::new(())),
        })
    }

    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    /// Ingest every item of a canonical JSON array file.
    ///
    /// All rows for the file are written in one transaction: if the file
    /// cannot be parsed or any insert fails, nothing is committed. Returns
    /// the number of items indexed.
    pub async fn index_file(&self, file_path: &Path) -> Result<usize> {
        let content =
            std::fs::read_to_string(file_path).map_err(|e| StoreError::index(file_path, e))?;
        let items: Vec<NewsItem> =
            serde_json::from_str(&content).map_err(|e| StoreError::index(file_path, e))?;

        let stored_path = std::fs::canonicalize(file_path)
            .unwrap_or_else(|_| file_path.to_path_buf())
            .to_string_lossy()
            .into_owned();

        let _guard = self.write_lock.lock().await;
        let pool = db::connect(&self.db_path).await?;

        let result = insert_items(&pool, &items, &stored_path).await;
        pool.close().await;

        let category_rows = result.map_err(|e| StoreError::index(file_path, e))?;

        tracing::info!(
            file = %stored_path,
            items = items.len(),
            category_rows,
            "indexed file"
        );
        Ok(items.len())
    }

    /// Search the index and return full items read back from their files.
    pub async fn search(&self, query: &SearchQuery) -> Result<Vec<NewsItem>> {
        let records = self.search_records(query).await?;
        Ok(search::resolve_records(&records))
    }

    /// Search the index and return the matching rows only.
    pub async fn search_records(&self, query: &SearchQuery) -> Result<Vec<IndexRecord>> {
        let pool = db::connect(&self.db_path).await?;
        let records = search::fetch_records(&pool, query).await;
        pool.close().await;
        records
    }

    pub async fn stats(&self) -> Result<IndexStats> {
        let pool = db::connect(&self.db_path).await?;
        let collected = stats::collect(&pool, &self.db_path).await;
        pool.close().await;
        collected
    }
}

/// Insert one `news` row per item and one `categories` row per category,
/// inside a single transaction. Unscored items are indexed with relevance
/// 0. Returns the number of category rows.
async fn insert_items(
    pool: &sqlx::SqlitePool,
    items: &[NewsItem],
    file_path: &str,
) -> std::result::Result<usize, sqlx::Error> {
    let mut tx = pool.begin().await?;
    let created_at = format_timestamp_utc(&Utc::now());
    let mut category_rows = 0;

    for item in items {
        let published = item.published.as_deref().map(index_timestamp);

        let news_id = sqlx::query(
            "INSERT INTO news (title, source, published, relevance, file_path, created_at) \
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(&item.title)
        .bind(&item.source)
        .bind(&published)
        .bind(item.relevance.unwrap_or(0.0))
        .bind(file_path)
        .bind(&created_at)
        .execute(&mut *tx)
        .await?
        .last_insert_rowid();

        for category in item.categories.keys() {
            sqlx::query("INSERT INTO categories (news_id, category) VALUES (?, ?)")
                .bind(news_id)
                .bind(category)
                .execute(&mut *tx)
                .await?;
            category_rows += 1;
        }
    }

    tx.commit().await?;
    Ok(category_rows)
}

/// `published` as stored in the index: converted to UTC when it parses so
/// that string order is time order, otherwise kept verbatim.
fn index_timestamp(published: &str) -> String {
    parse_timestamp(published)
        .map(|dt| format_timestamp_utc(&dt.with_timezone(&Utc)))
        .unwrap_or_else(|| published.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_index_timestamp_converts_to_utc() {
        assert_eq!(
            index_timestamp("2025-04-24T15:49:50-03:00"),
            "2025-04-24T18:49:50+00:00"
        );
        assert_eq!(
            index_timestamp("2025-04-24T18:49:50Z"),
            "2025-04-24T18:49:50+00:00"
        );
    }

    #[test]
    fn test_index_timestamp_keeps_unparseable() {
        assert_eq!(index_timestamp("last Tuesday"), "last Tuesday");
    }
}
