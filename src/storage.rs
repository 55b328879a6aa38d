//! Storage facade: validate → clean → write → compress → index.
//!
//! ## Directory Structure
//!
//! ```text
//! <data_root>/
//! ├── raw/2025-04-24T18-49-50.json          # canonical batch (as_raw)
//! ├── processed/2025-04-24T18-55-02.json    # canonical batch
//! └── compressed/2025-04-24T18-49-50.json.gz
//! ```
//!
//! Canonical files are written once and never modified. Validation is the
//! only gate: once the canonical file is on disk, a failure to compress or
//! index is returned to the caller but the written files are left in place.

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use std::fs::OpenOptions;
use std::io::{BufWriter, ErrorKind, Write};
use std::path::{Path, PathBuf};

use crate::compressor::{self, Codec};
use crate::config::Config;
use crate::error::{Result, StoreError};
use crate::indexer::NewsIndex;
use crate::models::{Area, NewsItem};
use crate::search::SearchQuery;
use crate::validator;

const COMPRESSED_DIR: &str = "compressed";
const MAX_NAME_ATTEMPTS: u32 = 1000;

/// What a successful [`NewsStorage::save`] produced.
#[derive(Debug, Clone, Serialize)]
pub struct SaveReport {
    pub path: PathBuf,
    pub compressed_path: PathBuf,
    pub compression_ratio: f64,
    pub item_count: usize,
}

/// Coordinates validation, persistence, compression and indexing.
#[derive(Debug, Clone)]
pub struct NewsStorage {
    data_root: PathBuf,
    codec: Codec,
    index: NewsIndex,
}

impl NewsStorage {
    /// Open storage as configured, creating directories and the index schema.
    pub async fn open(config: &Config) -> Result<Self> {
        let data_root = config.storage.data_root.clone();
        for dir in [
            Area::Raw.dir_name(),
            Area::Processed.dir_name(),
            COMPRESSED_DIR,
        ] {
            std::fs::create_dir_all(data_root.join(dir))?;
        }

        let index = NewsIndex::open(config.db.path.clone()).await?;

        Ok(Self {
            data_root,
            codec: config.storage.codec,
            index,
        })
    }

    pub fn index(&self) -> &NewsIndex {
        &self.index
    }

    pub fn data_root(&self) -> &Path {
        &self.data_root
    }

    /// Persist a batch of raw upstream items.
    ///
    /// Fails with [`StoreError::Validation`] before anything is written if
    /// any item is invalid.
    pub async fn save(&self, items: &[Value], area: Area) -> Result<SaveReport> {
        let errors = validator::validate_items(items);
        if !errors.is_empty() {
            tracing::warn!(
                failed = errors.len(),
                total = items.len(),
                "batch rejected by validation"
            );
            return Err(StoreError::Validation(errors));
        }

        let cleaned = items
            .iter()
            .map(validator::clean_item)
            .collect::<Result<Vec<NewsItem>>>()?;

        let stamp = file_stamp(Utc::now());
        let (path, compressed_path) = self.write_canonical(&cleaned, area, &stamp)?;

        compressor::compress_file(&path, Some(compressed_path.as_path()), self.codec)?;
        self.index.index_file(&path).await?;

        let compression_ratio = compressor::compression_ratio(&path, &compressed_path)?;

        let report = SaveReport {
            path,
            compressed_path,
            compression_ratio,
            item_count: cleaned.len(),
        };

        tracing::info!(
            items = report.item_count,
            path = %report.path.display(),
            compressed = %report.compressed_path.display(),
            ratio = report.compression_ratio,
            "saved batch"
        );

        Ok(report)
    }

    /// Persist already-typed items. They go through the same validation
    /// and cleaning as raw input.
    pub async fn save_items(&self, items: &[NewsItem], area: Area) -> Result<SaveReport> {
        let values = items
            .iter()
            .map(serde_json::to_value)
            .collect::<std::result::Result<Vec<Value>, _>>()?;
        self.save(&values, area).await
    }

    pub async fn search(&self, query: &SearchQuery) -> Result<Vec<NewsItem>> {
        self.index.search(query).await
    }

    /// Write the canonical file under a fresh name.
    ///
    /// Names are the second-resolution stamp; if that name is taken (two
    /// saves within one second) a `-2`, `-3`, … suffix is added rather than
    /// overwriting an existing batch. Returns the canonical path and the
    /// matching archive path.
    fn write_canonical(
        &self,
        items: &[NewsItem],
        area: Area,
        stamp: &str,
    ) -> Result<(PathBuf, PathBuf)> {
        let area_dir = self.data_root.join(area.dir_name());
        let compressed_dir = self.data_root.join(COMPRESSED_DIR);

        for attempt in 1..=MAX_NAME_ATTEMPTS {
            let stem = if attempt == 1 {
                stamp.to_string()
            } else {
                format!("{}-{}", stamp, attempt)
            };
            let path = area_dir.join(format!("{}.json", stem));
            let compressed_path =
                compressed_dir.join(format!("{}.{}", stem, self.codec.extension()));

            if compressed_path.exists() {
                continue;
            }

            let file = match OpenOptions::new().write(true).create_new(true).open(&path) {
                Ok(f) => f,
                Err(e) if e.kind() == ErrorKind::AlreadyExists => continue,
                Err(e) => return Err(e.into()),
            };

            let mut writer = BufWriter::new(file);
            serde_json::to_writer_pretty(&mut writer, items)?;
            writer.flush()?;

            return Ok((path, compressed_path));
        }

        Err(StoreError::Io(std::io::Error::new(
            ErrorKind::AlreadyExists,
            format!("no free file name for stamp {}", stamp),
        )))
    }
}

/// Filesystem-safe timestamp: `YYYY-MM-DDTHH-MM-SS`.
pub fn file_stamp(now: DateTime<Utc>) -> String {
    now.format("%Y-%m-%dT%H-%M-%S").to_string()
}
