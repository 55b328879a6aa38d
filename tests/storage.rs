//! Library-level tests for the save pipeline and index search.

use chrono::{TimeZone, Utc};
use news_store::compressor;
use news_store::config::Config;
use news_store::{Area, NewsIndex, NewsItem, NewsStorage, SearchQuery, StoreError};
use serde_json::{json, Value};
use std::path::Path;
use tempfile::TempDir;

// ─── Helpers ────────────────────────────────────────────────────────

fn sample_items() -> Vec<Value> {
    vec![
        json!({
            "title": "Notícia 1",
            "link": "https://example.com/1",
            "source": "Site A",
            "published": "2025-04-24T18:49:50+00:00",
            "relevance": 3.4,
            "categories": {"economia": 0.8}
        }),
        json!({
            "title": "Notícia 2",
            "link": "https://example.com/2",
            "source": "Site B",
            "published": "2025-04-24T18:30:00+00:00",
            "relevance": 2.8,
            "categories": {"política": 0.9}
        }),
    ]
}

async fn open_storage(tmp: &TempDir) -> NewsStorage {
    NewsStorage::open(&Config::rooted_at(tmp.path())).await.unwrap()
}

fn files_in(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

fn titles(items: &[NewsItem]) -> Vec<&str> {
    items.iter().map(|i| i.title.as_str()).collect()
}

fn write_batch(tmp: &TempDir, name: &str, items: &Value) -> std::path::PathBuf {
    let path = tmp.path().join(name);
    std::fs::write(&path, serde_json::to_string_pretty(items).unwrap()).unwrap();
    path
}

// ─── Save pipeline ──────────────────────────────────────────────────

#[tokio::test]
async fn test_save_end_to_end() {
    let tmp = TempDir::new().unwrap();
    let storage = open_storage(&tmp).await;

    let report = storage.save(&sample_items(), Area::Processed).await.unwrap();
    assert_eq!(report.item_count, 2);
    assert!(report.path.starts_with(tmp.path().join("processed")));
    assert!(report.compressed_path.starts_with(tmp.path().join("compressed")));
    assert!(report.compressed_path.to_string_lossy().ends_with(".json.gz"));
    assert!(report.compression_ratio > 0.0);

    let by_title = storage
        .search(&SearchQuery {
            query: Some("Notícia".to_string()),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(titles(&by_title), vec!["Notícia 1", "Notícia 2"]);

    let by_source = storage
        .search(&SearchQuery {
            source: Some("Site A".to_string()),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(titles(&by_source), vec!["Notícia 1"]);

    let by_relevance = storage
        .search(&SearchQuery {
            min_relevance: Some(3.0),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(titles(&by_relevance), vec!["Notícia 1"]);
    assert_eq!(by_relevance[0].relevance, Some(3.4));
    assert_eq!(by_relevance[0].categories.get("economia"), Some(&0.8));
}

#[tokio::test]
async fn test_save_raw_area_and_archive_matches_canonical() {
    let tmp = TempDir::new().unwrap();
    let storage = open_storage(&tmp).await;

    let report = storage.save(&sample_items(), Area::Raw).await.unwrap();
    assert!(report.path.starts_with(tmp.path().join("raw")));
    assert!(files_in(&tmp.path().join("processed")).is_empty());

    let canonical: Value =
        serde_json::from_str(&std::fs::read_to_string(&report.path).unwrap()).unwrap();
    let archived: Value = compressor::decompress(&report.compressed_path, None).unwrap();
    assert_eq!(canonical, archived);
}

#[tokio::test]
async fn test_save_writes_cleaned_items() {
    let tmp = TempDir::new().unwrap();
    let storage = open_storage(&tmp).await;

    let items = vec![json!({
        "title": "  Ibovespa sobe 2%  ",
        "link": "https://example.com/ibov",
        "source": " InfoMoney ",
        "published": "2025-04-24T18:49:50Z",
        "relevance": 6.5,
        "sentiment": "positive"
    })];
    let report = storage.save(&items, Area::Processed).await.unwrap();

    let written: Vec<NewsItem> =
        serde_json::from_str(&std::fs::read_to_string(&report.path).unwrap()).unwrap();
    assert_eq!(written.len(), 1);
    let item = &written[0];
    assert_eq!(item.title, "Ibovespa sobe 2%");
    assert_eq!(item.source, "InfoMoney");
    assert_eq!(item.published.as_deref(), Some("2025-04-24T18:49:50+00:00"));
    assert_eq!(item.relevance, Some(5.0));
    assert!(item.categories.is_empty());
    assert_eq!(item.extra.get("sentiment"), Some(&json!("positive")));

    // Literal % in the query must not act as a wildcard.
    let hits = storage
        .search(&SearchQuery {
            query: Some("2%".to_string()),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(titles(&hits), vec!["Ibovespa sobe 2%"]);
}

#[tokio::test]
async fn test_save_rejects_invalid_batch_without_side_effects() {
    let tmp = TempDir::new().unwrap();
    let storage = open_storage(&tmp).await;

    let mut items = sample_items();
    items[1].as_object_mut().unwrap().remove("source");

    let err = storage.save(&items, Area::Processed).await.unwrap_err();
    match err {
        StoreError::Validation(errors) => {
            assert_eq!(errors.len(), 1);
            let item_errors = errors.get(1).unwrap();
            assert!(item_errors.iter().any(|e| e.contains("source")));
        }
        other => panic!("expected validation error, got {:?}", other),
    }

    for dir in ["raw", "processed", "compressed"] {
        assert!(files_in(&tmp.path().join(dir)).is_empty(), "{} not empty", dir);
    }
    let stats = storage.index().stats().await.unwrap();
    assert_eq!(stats.total_items, 0);
    assert_eq!(stats.category_rows, 0);
}

#[tokio::test]
async fn test_save_with_xz_codec() {
    let tmp = TempDir::new().unwrap();
    let mut config = Config::rooted_at(tmp.path());
    config.storage.codec = compressor::Codec::Xz;
    let storage = NewsStorage::open(&config).await.unwrap();

    let report = storage.save(&sample_items(), Area::Processed).await.unwrap();
    assert!(report.compressed_path.to_string_lossy().ends_with(".json.xz"));
    let archived: Vec<NewsItem> = compressor::decompress(&report.compressed_path, None).unwrap();
    assert_eq!(archived.len(), 2);
}

#[tokio::test]
async fn test_save_items_typed() {
    let tmp = TempDir::new().unwrap();
    let storage = open_storage(&tmp).await;

    let mut item = NewsItem::new("Typed item", "https://example.com/t", "Site T");
    item.categories.insert("tecnologia".to_string(), 0.7);
    storage.save_items(&[item], Area::Processed).await.unwrap();

    let hits = storage
        .search(&SearchQuery {
            category: Some("tecnologia".to_string()),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(titles(&hits), vec!["Typed item"]);
}

#[tokio::test]
async fn test_repeated_saves_create_new_rows() {
    let tmp = TempDir::new().unwrap();
    let storage = open_storage(&tmp).await;

    let first = storage.save(&sample_items(), Area::Processed).await.unwrap();
    let second = storage.save(&sample_items(), Area::Processed).await.unwrap();
    assert_ne!(first.path, second.path);

    let stats = storage.index().stats().await.unwrap();
    assert_eq!(stats.total_items, 4);
    assert_eq!(stats.files, 2);
}

// ─── Index and search ───────────────────────────────────────────────

#[tokio::test]
async fn test_category_search_matches_membership() {
    let tmp = TempDir::new().unwrap();
    let index = NewsIndex::open(tmp.path().join("index.db")).await.unwrap();
    let file = write_batch(
        &tmp,
        "batch.json",
        &json!([
            {"title": "A", "link": "https://x/a", "source": "S", "categories": {"economia": 0.9, "mercado": 0.5}},
            {"title": "B", "link": "https://x/b", "source": "S", "categories": {"mercado": 0.7}},
            {"title": "C", "link": "https://x/c", "source": "S", "categories": {}},
            {"title": "D", "link": "https://x/d", "source": "S", "categories": {"política": 1.0}}
        ]),
    );
    assert_eq!(index.index_file(&file).await.unwrap(), 4);

    let search = |category: &str| SearchQuery {
        category: Some(category.to_string()),
        ..Default::default()
    };

    let mut mercado = titles(&index.search(&search("mercado")).await.unwrap())
        .into_iter()
        .map(String::from)
        .collect::<Vec<_>>();
    mercado.sort();
    assert_eq!(mercado, vec!["A", "B"]);

    assert_eq!(
        titles(&index.search(&search("economia")).await.unwrap()),
        vec!["A"]
    );
    assert!(index.search(&search("esportes")).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_date_window_inclusive_and_ordered() {
    let tmp = TempDir::new().unwrap();
    let index = NewsIndex::open(tmp.path().join("index.db")).await.unwrap();
    let file = write_batch(
        &tmp,
        "batch.json",
        &json!([
            {"title": "early", "link": "https://x/1", "source": "S", "published": "2025-04-24T17:59:59+00:00"},
            {"title": "start", "link": "https://x/2", "source": "S", "published": "2025-04-24T18:00:00+00:00"},
            {"title": "middle", "link": "https://x/3", "source": "S", "published": "2025-04-24T15:30:00-03:00"},
            {"title": "end", "link": "https://x/4", "source": "S", "published": "2025-04-24T19:00:00+00:00"},
            {"title": "late", "link": "https://x/5", "source": "S", "published": "2025-04-24T19:00:01+00:00"},
            {"title": "undated", "link": "https://x/6", "source": "S"}
        ]),
    );
    index.index_file(&file).await.unwrap();

    let results = index
        .search(&SearchQuery {
            start_date: Some(Utc.with_ymd_and_hms(2025, 4, 24, 18, 0, 0).unwrap()),
            end_date: Some(Utc.with_ymd_and_hms(2025, 4, 24, 19, 0, 0).unwrap()),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(titles(&results), vec!["end", "middle", "start"]);

    // The -03:00 item keeps its original offset in the returned record.
    assert_eq!(
        results[1].published.as_deref(),
        Some("2025-04-24T15:30:00-03:00")
    );
}

#[tokio::test]
async fn test_no_predicates_returns_most_recent_up_to_limit() {
    let tmp = TempDir::new().unwrap();
    let index = NewsIndex::open(tmp.path().join("index.db")).await.unwrap();
    let file = write_batch(&tmp, "batch.json", &Value::Array(sample_items()));
    index.index_file(&file).await.unwrap();

    let all = index.search(&SearchQuery::default()).await.unwrap();
    assert_eq!(titles(&all), vec!["Notícia 1", "Notícia 2"]);

    let one = index
        .search(&SearchQuery {
            limit: Some(1),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(titles(&one), vec!["Notícia 1"]);
}

#[tokio::test]
async fn test_reindexing_duplicates_rows() {
    let tmp = TempDir::new().unwrap();
    let index = NewsIndex::open(tmp.path().join("index.db")).await.unwrap();
    let file = write_batch(&tmp, "batch.json", &Value::Array(sample_items()));

    index.index_file(&file).await.unwrap();
    index.index_file(&file).await.unwrap();

    let records = index
        .search_records(&SearchQuery {
            source: Some("Site A".to_string()),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(records.len(), 2);
    assert!(records[0].id > records[1].id);
    assert_eq!(records[0].file_path, records[1].file_path);
}

#[tokio::test]
async fn test_malformed_file_commits_nothing() {
    let tmp = TempDir::new().unwrap();
    let index = NewsIndex::open(tmp.path().join("index.db")).await.unwrap();

    let not_json = tmp.path().join("broken.json");
    std::fs::write(&not_json, "[{\"title\": ").unwrap();
    let err = index.index_file(&not_json).await.unwrap_err();
    assert!(matches!(err, StoreError::Index { .. }));

    // Second item lacks a title: the whole file is rejected.
    let partial = write_batch(
        &tmp,
        "partial.json",
        &json!([
            {"title": "ok", "link": "https://x/1", "source": "S"},
            {"link": "https://x/2", "source": "S"}
        ]),
    );
    assert!(index.index_file(&partial).await.is_err());

    let missing = index.index_file(&tmp.path().join("nope.json")).await;
    assert!(matches!(missing, Err(StoreError::Index { .. })));

    assert_eq!(index.stats().await.unwrap().total_items, 0);
}

#[tokio::test]
async fn test_failed_category_insert_rolls_back_file() {
    let tmp = TempDir::new().unwrap();
    let db_path = tmp.path().join("index.db");
    let index = NewsIndex::open(&db_path).await.unwrap();

    let pool = news_store::db::connect(&db_path).await.unwrap();
    sqlx::query(
        "CREATE TRIGGER reject_categories BEFORE INSERT ON categories \
         BEGIN SELECT RAISE(ABORT, 'categories rejected'); END",
    )
    .execute(&pool)
    .await
    .unwrap();
    pool.close().await;

    // The first item has no categories, so its news row is written before
    // the second item's category insert aborts.
    let batch = write_batch(
        &tmp,
        "batch.json",
        &json!([
            {"title": "plain", "link": "https://x/1", "source": "S"},
            sample_items()[0].clone()
        ]),
    );
    let err = index.index_file(&batch).await.unwrap_err();
    assert!(matches!(err, StoreError::Index { .. }), "got {:?}", err);

    let stats = index.stats().await.unwrap();
    assert_eq!(stats.total_items, 0);
    assert_eq!(stats.category_rows, 0);
}

#[tokio::test]
async fn test_unscored_items_index_as_zero_relevance() {
    let tmp = TempDir::new().unwrap();
    let storage = open_storage(&tmp).await;
    storage
        .save(
            &[json!({"title": "Sem nota", "link": "https://x/1", "source": "S"})],
            Area::Processed,
        )
        .await
        .unwrap();

    let at_zero = storage
        .search(&SearchQuery {
            min_relevance: Some(0.0),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(titles(&at_zero), vec!["Sem nota"]);
    assert_eq!(at_zero[0].relevance, None);

    let above_zero = storage
        .search(&SearchQuery {
            min_relevance: Some(0.1),
            ..Default::default()
        })
        .await
        .unwrap();
    assert!(above_zero.is_empty());
}

#[tokio::test]
async fn test_search_skips_rows_whose_file_is_gone() {
    let tmp = TempDir::new().unwrap();
    let index = NewsIndex::open(tmp.path().join("index.db")).await.unwrap();

    let kept = write_batch(&tmp, "kept.json", &json!([sample_items()[0].clone()]));
    let doomed = write_batch(&tmp, "doomed.json", &json!([sample_items()[1].clone()]));
    index.index_file(&kept).await.unwrap();
    index.index_file(&doomed).await.unwrap();
    std::fs::remove_file(&doomed).unwrap();

    let results = index.search(&SearchQuery::default()).await.unwrap();
    assert_eq!(titles(&results), vec!["Notícia 1"]);

    // The index itself still has both rows.
    let records = index.search_records(&SearchQuery::default()).await.unwrap();
    assert_eq!(records.len(), 2);
}

#[tokio::test]
async fn test_stats_breakdown() {
    let tmp = TempDir::new().unwrap();
    let storage = open_storage(&tmp).await;
    storage.save(&sample_items(), Area::Processed).await.unwrap();

    let stats = storage.index().stats().await.unwrap();
    assert_eq!(stats.total_items, 2);
    assert_eq!(stats.category_rows, 2);
    assert_eq!(stats.files, 1);
    assert_eq!(
        stats.newest_published.as_deref(),
        Some("2025-04-24T18:49:50+00:00")
    );
    assert_eq!(
        stats.by_source,
        vec![("Site A".to_string(), 1), ("Site B".to_string(), 1)]
    );
}
