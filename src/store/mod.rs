//! Document store access
//!
//! Portal content lives in an Elasticsearch-compatible document store. This
//! module owns the wire format: the request body a compiled search posts to
//! `{index}/_search` and the typed response envelope the rest of the crate
//! consumes. [`HttpDocumentStore`] is the real client; tests substitute
//! their own [`DocumentStore`] implementations with canned responses.

mod http;

pub use http::HttpDocumentStore;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

use crate::error::Result;

/// Queries an Elasticsearch-compatible index
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Run a search against the named index
    async fn search(&self, index: &str, body: &SearchBody) -> Result<StoreResponse>;
}

/// Search request body posted to the store
#[derive(Debug, Clone, Serialize)]
pub struct SearchBody {
    pub query: Value,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub aggs: Option<Value>,

    pub from: usize,

    pub size: usize,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub sort: Option<Value>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub highlight: Option<Value>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub post_filter: Option<Value>,

    #[serde(rename = "_source", skip_serializing_if = "Option::is_none")]
    pub source: Option<SourceFilter>,
}

impl SearchBody {
    /// Create a body with the given query and default paging
    pub fn new(query: Value) -> Self {
        Self {
            query,
            aggs: None,
            from: 0,
            size: 25,
            sort: None,
            highlight: None,
            post_filter: None,
            source: None,
        }
    }

    /// Set the aggregation spec
    pub fn with_aggs(mut self, aggs: Value) -> Self {
        self.aggs = Some(aggs);
        self
    }

    /// Set paging
    pub fn with_paging(mut self, from: usize, size: usize) -> Self {
        self.from = from;
        self.size = size;
        self
    }

    /// Set the sort spec
    pub fn with_sort(mut self, sort: Value) -> Self {
        self.sort = Some(sort);
        self
    }

    /// Set the highlight spec
    pub fn with_highlight(mut self, highlight: Value) -> Self {
        self.highlight = Some(highlight);
        self
    }

    /// Exclude fields from returned sources
    pub fn with_source_exclude(mut self, exclude: Vec<String>) -> Self {
        if !exclude.is_empty() {
            self.source = Some(SourceFilter { exclude });
        }
        self
    }
}

/// Source filtering spec
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct SourceFilter {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub exclude: Vec<String>,
}

/// Response envelope returned by the store
#[derive(Debug, Clone, Deserialize, Default)]
pub struct StoreResponse {
    #[serde(default)]
    pub took: Option<u64>,

    #[serde(default)]
    pub hits: HitsEnvelope,

    #[serde(default)]
    pub aggregations: Option<Value>,
}

impl StoreResponse {
    /// Total matching documents
    pub fn total(&self) -> u64 {
        self.hits.total.value()
    }

    /// Ids of the returned page
    pub fn hit_ids(&self) -> Vec<String> {
        self.hits.hits.iter().map(|h| h.id.clone()).collect()
    }
}

/// Hit list plus total
#[derive(Debug, Clone, Deserialize, Default)]
pub struct HitsEnvelope {
    #[serde(default)]
    pub total: TotalHits,

    #[serde(default)]
    pub hits: Vec<StoreHit>,
}

/// Total hit count; the store reports a bare number or a tracked object
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum TotalHits {
    Legacy(u64),
    Tracked { value: u64, relation: Option<String> },
}

impl TotalHits {
    pub fn value(&self) -> u64 {
        match self {
            TotalHits::Legacy(value) => *value,
            TotalHits::Tracked { value, .. } => *value,
        }
    }
}

impl Default for TotalHits {
    fn default() -> Self {
        TotalHits::Legacy(0)
    }
}

/// One returned document
#[derive(Debug, Clone, Deserialize)]
pub struct StoreHit {
    #[serde(rename = "_id")]
    pub id: String,

    #[serde(rename = "_source", default)]
    pub source: Value,

    #[serde(rename = "_score", default)]
    pub score: Option<f64>,

    /// Child documents matched under named nested clauses, keyed by tag
    #[serde(default)]
    pub inner_hits: HashMap<String, InnerHits>,

    #[serde(default)]
    pub highlight: Option<Value>,
}

/// Child hit envelope under one inner-hits tag
#[derive(Debug, Clone, Deserialize, Default)]
pub struct InnerHits {
    #[serde(default)]
    pub hits: HitsEnvelope,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_body_skips_absent_fields() {
        let body = SearchBody::new(json!({"match_all": {}}));
        let value = serde_json::to_value(&body).unwrap();
        assert!(value.get("aggs").is_none());
        assert!(value.get("sort").is_none());
        assert!(value.get("_source").is_none());
        assert_eq!(value["size"], 25);
    }

    #[test]
    fn test_body_source_exclude() {
        let body = SearchBody::new(json!({"match_all": {}}))
            .with_source_exclude(vec!["planning_items".to_string()])
            .with_paging(25, 50);
        let value = serde_json::to_value(&body).unwrap();
        assert_eq!(value["_source"]["exclude"][0], "planning_items");
        assert_eq!(value["from"], 25);
        assert_eq!(value["size"], 50);
    }

    #[test]
    fn test_response_tracked_total() {
        let response: StoreResponse = serde_json::from_value(json!({
            "took": 4,
            "hits": {
                "total": {"value": 120, "relation": "eq"},
                "hits": [{"_id": "item-1", "_source": {"headline": "x"}}]
            }
        }))
        .unwrap();
        assert_eq!(response.total(), 120);
        assert_eq!(response.hit_ids(), vec!["item-1".to_string()]);
    }

    #[test]
    fn test_response_legacy_total_and_inner_hits() {
        let response: StoreResponse = serde_json::from_value(json!({
            "hits": {
                "total": 3,
                "hits": [{
                    "_id": "event-1",
                    "_source": {},
                    "inner_hits": {
                        "coverage": {
                            "hits": {
                                "total": 1,
                                "hits": [{"_id": "c1", "_source": {"coverage_id": "cov-1"}}]
                            }
                        }
                    }
                }]
            }
        }))
        .unwrap();
        assert_eq!(response.total(), 3);
        let hit = &response.hits.hits[0];
        let inner = hit.inner_hits.get("coverage").unwrap();
        assert_eq!(inner.hits.hits[0].source["coverage_id"], "cov-1");
    }
}
