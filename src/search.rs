//! Filtered search over the `news` index.
//!
//! Every predicate of a [`SearchQuery`] is optional and they combine with
//! AND. Matching rows are ordered by `published` descending and capped at
//! `limit`. Full items are then recovered from the canonical files the rows
//! point at; a row whose file or entry can no longer be found is logged and
//! skipped instead of failing the whole search.

use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::{QueryBuilder, Row, Sqlite, SqlitePool};
use std::collections::HashMap;

use crate::error::Result;
use crate::models::{IndexRecord, NewsItem};
use crate::validator::format_timestamp_utc;

pub const DEFAULT_LIMIT: i64 = 100;

/// Search predicates. `Default` matches everything.
#[derive(Debug, Clone, Default)]
pub struct SearchQuery {
    /// Substring of the title (SQLite `LIKE`, ASCII case-insensitive).
    pub query: Option<String>,
    /// Exact source name.
    pub source: Option<String>,
    /// Exact category membership.
    pub category: Option<String>,
    /// Inclusive lower bound on relevance.
    pub min_relevance: Option<f64>,
    /// Inclusive lower bound on `published`.
    pub start_date: Option<DateTime<Utc>>,
    /// Inclusive upper bound on `published`.
    pub end_date: Option<DateTime<Utc>>,
    /// Maximum rows; [`DEFAULT_LIMIT`] when unset.
    pub limit: Option<i64>,
}

pub(crate) async fn fetch_records(
    pool: &SqlitePool,
    query: &SearchQuery,
) -> Result<Vec<IndexRecord>> {
    let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new(
        "SELECT n.id, n.title, n.source, n.published, n.relevance, n.file_path, n.created_at \
         FROM news n WHERE 1 = 1",
    );

    if let Some(ref text) = query.query {
        qb.push(" AND n.title LIKE ")
            .push_bind(format!("%{}%", escape_like(text)))
            .push(" ESCAPE '\\'");
    }
    if let Some(ref source) = query.source {
        qb.push(" AND n.source = ").push_bind(source.clone());
    }
    if let Some(ref category) = query.category {
        qb.push(" AND EXISTS (SELECT 1 FROM categories c WHERE c.news_id = n.id AND c.category = ")
            .push_bind(category.clone())
            .push(")");
    }
    if let Some(min) = query.min_relevance {
        qb.push(" AND n.relevance >= ").push_bind(min);
    }
    if let Some(ref start) = query.start_date {
        qb.push(" AND n.published >= ")
            .push_bind(format_timestamp_utc(start));
    }
    if let Some(ref end) = query.end_date {
        qb.push(" AND n.published <= ")
            .push_bind(format_timestamp_utc(end));
    }

    let limit = query.limit.unwrap_or(DEFAULT_LIMIT).max(0);
    qb.push(" ORDER BY n.published DESC, n.id DESC LIMIT ")
        .push_bind(limit);

    tracing::debug!(sql = qb.sql(), "running index search");

    let rows = qb.build().fetch_all(pool).await?;

    Ok(rows
        .iter()
        .map(|row| IndexRecord {
            id: row.get("id"),
            title: row.get("title"),
            source: row.get("source"),
            published: row.get("published"),
            relevance: row.get("relevance"),
            file_path: row.get("file_path"),
            created_at: row.get("created_at"),
        })
        .collect())
}

/// Recover the full item behind each record, in record order.
///
/// Each canonical file is read at most once per call. The first entry whose
/// title equals the record's title wins.
pub(crate) fn resolve_records(records: &[IndexRecord]) -> Vec<NewsItem> {
    let mut files: HashMap<&str, Option<Vec<Value>>> = HashMap::new();
    let mut items = Vec::with_capacity(records.len());

    for record in records {
        let entries = files
            .entry(record.file_path.as_str())
            .or_insert_with(|| load_entries(&record.file_path));

        let Some(entries) = entries else {
            continue;
        };

        let found = entries
            .iter()
            .find(|entry| entry.get("title").and_then(Value::as_str) == Some(record.title.as_str()))
            .and_then(|entry| serde_json::from_value::<NewsItem>(entry.clone()).ok());

        match found {
            Some(item) => items.push(item),
            None => tracing::warn!(
                id = record.id,
                title = %record.title,
                file = %record.file_path,
                "indexed item not found in its file, skipping"
            ),
        }
    }

    items
}

fn load_entries(file_path: &str) -> Option<Vec<Value>> {
    let content = match std::fs::read_to_string(file_path) {
        Ok(c) => c,
        Err(e) => {
            tracing::warn!(file = %file_path, error = %e, "indexed file unreadable, skipping its rows");
            return None;
        }
    };
    match serde_json::from_str::<Vec<Value>>(&content) {
        Ok(entries) => Some(entries),
        Err(e) => {
            tracing::warn!(file = %file_path, error = %e, "indexed file is not a JSON array, skipping its rows");
            None
        }
    }
}

/// Escape `LIKE` wildcards so user text matches literally.
fn escape_like(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for ch in text.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped
}
