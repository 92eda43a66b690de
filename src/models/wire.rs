use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A published wire story
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct WireItem {
    /// Unique identifier
    #[serde(default)]
    pub guid: String,

    pub headline: Option<String>,

    pub slugline: Option<String>,

    pub body_html: Option<String>,

    /// Publication state, e.g. "usable"
    pub pubstatus: Option<String>,

    /// Provider the story came from
    pub source: Option<String>,

    /// Version creation timestamp
    pub versioncreated: Option<DateTime<Utc>>,

    /// Release instant; the story is held until it passes
    pub embargoed: Option<DateTime<Utc>>,

    /// Editorial priority, 1 is highest
    pub urgency: Option<i64>,

    /// Controlled-vocabulary classifications
    #[serde(default)]
    pub service: Vec<VocabEntry>,

    #[serde(default)]
    pub subject: Vec<VocabEntry>,

    #[serde(default)]
    pub genre: Vec<VocabEntry>,

    /// Product codes stamped at ingest
    #[serde(default)]
    pub products: Vec<ProductRef>,

    /// Accounts that bookmarked the story
    #[serde(default)]
    pub bookmarks: Vec<Uuid>,

    /// Fields this crate does not model, carried through untouched
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl WireItem {
    /// Check whether the story is still held at the given instant
    pub fn is_embargoed_at(&self, now: DateTime<Utc>) -> bool {
        self.embargoed.map_or(false, |release| release > now)
    }
}

/// A controlled-vocabulary classification entry
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct VocabEntry {
    pub code: Option<String>,
    pub name: Option<String>,
    /// Vocabulary the entry belongs to; shared parents carry many schemes
    pub scheme: Option<String>,
}

/// Product stamp written onto items at ingest
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct ProductRef {
    pub code: String,
    pub name: Option<String>,
}
