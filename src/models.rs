//! Core data models used throughout the storage layer.
//!
//! [`NewsItem`] is what upstream collectors hand in and what search hands
//! back. [`IndexRecord`] is the slim projection stored in SQLite.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// A collected news item in canonical (cleaned) form.
///
/// Fields the storage layer does not know about are kept in `extra` and
/// written back out unchanged, so downstream consumers see the shape the
/// collector produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewsItem {
    pub title: String,
    pub link: String,
    pub source: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub published: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relevance: Option<f64>,
    #[serde(default)]
    pub categories: BTreeMap<String, f64>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl NewsItem {
    pub fn new(
        title: impl Into<String>,
        link: impl Into<String>,
        source: impl Into<String>,
    ) -> Self {
        Self {
            title: title.into(),
            link: link.into(),
            source: source.into(),
            published: None,
            summary: None,
            relevance: None,
            categories: BTreeMap::new(),
            extra: Map::new(),
        }
    }
}

/// One row of the `news` table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IndexRecord {
    pub id: i64,
    pub title: String,
    pub source: String,
    pub published: Option<String>,
    pub relevance: Option<f64>,
    pub file_path: String,
    pub created_at: String,
}

/// Which area of the data root a batch is written to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Area {
    Raw,
    Processed,
}

impl Area {
    pub fn dir_name(self) -> &'static str {
        match self {
            Area::Raw => "raw",
            Area::Processed => "processed",
        }
    }
}
