use std::path::Path;

use crate::db;
use crate::error::Result;

/// Create the `news` and `categories` tables and their lookup indexes.
///
/// Idempotent. Both tables are append-only; nothing here adds uniqueness
/// constraints, so indexing the same file twice yields duplicate rows.
pub async fn run_migrations(db_path: &Path) -> Result<()> {
    let pool = db::connect(db_path).await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS news (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            title TEXT NOT NULL,
            source TEXT NOT NULL,
            published TEXT,
            relevance REAL,
            file_path TEXT NOT NULL,
            created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(&pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS categories (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            news_id INTEGER NOT NULL,
            category TEXT NOT NULL,
            FOREIGN KEY (news_id) REFERENCES news(id)
        )
        "#,
    )
    .execute(&pool)
    .await?;

    for statement in [
        "CREATE INDEX IF NOT EXISTS idx_news_title ON news(title)",
        "CREATE INDEX IF NOT EXISTS idx_news_source ON news(source)",
        "CREATE INDEX IF NOT EXISTS idx_news_published ON news(published DESC)",
        "CREATE INDEX IF NOT EXISTS idx_news_relevance ON news(relevance)",
        "CREATE INDEX IF NOT EXISTS idx_categories_category ON categories(category)",
        "CREATE INDEX IF NOT EXISTS idx_categories_news_id ON categories(news_id)",
    ] {
        sqlx::query(statement).execute(&pool).await?;
    }

    pool.close().await;
    Ok(())
}
