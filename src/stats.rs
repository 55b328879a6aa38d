//! Index statistics.
//!
//! A quick summary of what is indexed: row counts, how many canonical files
//! the rows point at, and per-source and per-category breakdowns. Used by
//! `nstore stats` to confirm that saves are landing in the index.

use serde::Serialize;
use sqlx::{Row, SqlitePool};
use std::path::Path;

use crate::error::Result;

/// Summary of the index contents.
#[derive(Debug, Clone, Serialize)]
pub struct IndexStats {
    pub db_path: String,
    pub db_size: u64,
    pub total_items: i64,
    pub category_rows: i64,
    pub files: i64,
    pub newest_published: Option<String>,
    pub by_source: Vec<(String, i64)>,
    pub by_category: Vec<(String, i64)>,
}

pub(crate) async fn collect(pool: &SqlitePool, db_path: &Path) -> Result<IndexStats> {
    let total_items: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM news")
        .fetch_one(pool)
        .await?;

    let category_rows: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM categories")
        .fetch_one(pool)
        .await?;

    let files: i64 = sqlx::query_scalar("SELECT COUNT(DISTINCT file_path) FROM news")
        .fetch_one(pool)
        .await?;

    let newest_published: Option<String> = sqlx::query_scalar("SELECT MAX(published) FROM news")
        .fetch_one(pool)
        .await?;

    let by_source: Vec<(String, i64)> = sqlx::query(
        "SELECT source, COUNT(*) AS n FROM news GROUP BY source ORDER BY n DESC, source ASC",
    )
    .fetch_all(pool)
    .await?
    .iter()
    .map(|row| (row.get::<String, _>("source"), row.get::<i64, _>("n")))
    .collect();

    let by_category: Vec<(String, i64)> = sqlx::query(
        "SELECT category, COUNT(*) AS n FROM categories GROUP BY category ORDER BY n DESC, category ASC",
    )
    .fetch_all(pool)
    .await?
    .iter()
    .map(|row| (row.get::<String, _>("category"), row.get::<i64, _>("n")))
    .collect();

    let db_size = std::fs::metadata(db_path).map(|m| m.len()).unwrap_or(0);

    Ok(IndexStats {
        db_path: db_path.display().to_string(),
        db_size,
        total_items,
        category_rows,
        files,
        newest_published,
        by_source,
        by_category,
    })
}

/// Print a stats summary to stdout.
pub fn print_stats(stats: &IndexStats) {
    println!("News Store — Index Stats");
    println!("========================");
    println!();
    println!("  Database:    {}", stats.db_path);
    println!("  Size:        {}", format_bytes(stats.db_size));
    println!();
    println!("  Items:       {}", stats.total_items);
    println!("  Categories:  {}", stats.category_rows);
    println!("  Files:       {}", stats.files);
    println!(
        "  Newest:      {}",
        stats.newest_published.as_deref().unwrap_or("never")
    );

    if !stats.by_source.is_empty() {
        println!();
        println!("  By source:");
        println!("  {:<32} {:>8}", "SOURCE", "ITEMS");
        println!("  {}", "-".repeat(41));
        for (source, count) in &stats.by_source {
            println!("  {:<32} {:>8}", source, count);
        }
    }

    if !stats.by_category.is_empty() {
        println!();
        println!("  By category:");
        println!("  {:<32} {:>8}", "CATEGORY", "ITEMS");
        println!("  {}", "-".repeat(41));
        for (category, count) in &stats.by_category {
            println!("  {:<32} {:>8}", category, count);
        }
    }

    println!();
}

/// Format a byte count as a human-readable string.
fn format_bytes(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{} B", bytes)
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else if bytes < 1024 * 1024 * 1024 {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    } else {
        format!("{:.2} GB", bytes as f64 / (1024.0 * 1024.0 * 1024.0))
    }
}
