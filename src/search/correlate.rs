use async_trait::async_trait;
use futures::future::join_all;
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::warn;

use crate::models::{AgendaItem, Coverage, MatchedHits, WireItem};
use crate::store::InnerHits;

/// Correlation tags compiled as pure child filters
///
/// Every other planning-path tag comes from a parent-or-child alternative,
/// where an empty payload proves the parent matched on its own.
const STRICT_PLANNING_TAGS: [&str; 1] = ["agendas"];

/// Tags whose children are coverages rather than planning items
const COVERAGE_TAGS: [&str; 2] = ["coverage", "coverage_status"];

/// Looks up delivered wire items for completed text coverages
#[async_trait]
pub trait WireItemLookup: Send + Sync {
    async fn find_delivered(&self, delivery_id: &str) -> anyhow::Result<Option<WireItem>>;
}

/// Renders download links for completed non-text coverages
#[async_trait]
pub trait DeliveryFormatter: Send + Sync {
    async fn delivery_href(&self, coverage: &Coverage) -> anyhow::Result<Option<String>>;
}

/// Work out which child rows each hit actually matched through
///
/// Inner-hit payloads arrive per correlation tag. Coverage-class tags
/// intersect over coverage ids, planning-class tags over planning ids; the
/// result is written to the item's `_hits` block and never changes which
/// items are returned. Lookup collaborators enrich completed coverages and
/// fail soft.
#[derive(Clone, Default)]
pub struct ResultCorrelator {
    wire_lookup: Option<Arc<dyn WireItemLookup>>,
    delivery_formatter: Option<Arc<dyn DeliveryFormatter>>,
}

impl ResultCorrelator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_wire_lookup(mut self, lookup: Arc<dyn WireItemLookup>) -> Self {
        self.wire_lookup = Some(lookup);
        self
    }

    pub fn with_delivery_formatter(mut self, formatter: Arc<dyn DeliveryFormatter>) -> Self {
        self.delivery_formatter = Some(formatter);
        self
    }

    /// Annotate and enhance one page of agenda hits
    pub async fn process_page(&self, page: &mut [(AgendaItem, HashMap<String, InnerHits>)]) {
        join_all(
            page.iter_mut()
                .map(|(item, inner_hits)| self.annotate(item, inner_hits)),
        )
        .await;
    }

    async fn annotate(&self, item: &mut AgendaItem, inner_hits: &HashMap<String, InnerHits>) {
        correlate_hits(item, inner_hits);
        self.enhance_coverages(item).await;
    }

    /// Copy delivery metadata onto completed coverages
    ///
    /// Errors from the collaborators are logged and swallowed; a broken
    /// lookup must never drop the page.
    async fn enhance_coverages(&self, item: &mut AgendaItem) {
        for coverage in &mut item.coverages {
            if !coverage.is_completed() {
                continue;
            }
            if coverage.coverage_type.as_deref() == Some("text") {
                let Some(lookup) = &self.wire_lookup else {
                    continue;
                };
                let Some(delivery_id) = coverage.delivery_id.clone() else {
                    continue;
                };
                match lookup.find_delivered(&delivery_id).await {
                    Ok(Some(delivered)) => {
                        if let Some(versioncreated) = delivered.versioncreated {
                            coverage.publish_time = Some(versioncreated);
                        }
                    }
                    Ok(None) => {}
                    Err(error) => {
                        warn!(%delivery_id, %error, "delivered item lookup failed");
                    }
                }
            } else {
                let Some(formatter) = &self.delivery_formatter else {
                    continue;
                };
                match formatter.delivery_href(coverage).await {
                    Ok(Some(href)) => coverage.delivery_href = Some(href),
                    Ok(None) => {}
                    Err(error) => {
                        warn!(
                            coverage_id = %coverage.coverage_id,
                            %error,
                            "delivery href formatting failed"
                        );
                    }
                }
            }
        }
    }
}

/// Intersect the per-tag child id sets and write the result to `_hits`
pub fn correlate_hits(item: &mut AgendaItem, inner_hits: &HashMap<String, InnerHits>) {
    if inner_hits.is_empty() {
        return;
    }

    let mut coverage_sets: Vec<HashSet<String>> = Vec::new();
    let mut planning_sets: Vec<HashSet<String>> = Vec::new();

    for (tag, payload) in inner_hits {
        if COVERAGE_TAGS.contains(&tag.as_str()) {
            coverage_sets.push(coverage_ids(payload));
            continue;
        }
        let ids = planning_ids(payload);
        if ids.is_empty() {
            if payload.hits.hits.is_empty() {
                // Empty payload on a parent-or-child tag: the document
                // matched at parent level, so the tag stops narrowing
                if STRICT_PLANNING_TAGS.contains(&tag.as_str()) {
                    planning_sets.push(HashSet::new());
                }
            }
            // Children without planning ids sit on a foreign path and
            // cannot narrow anything
            continue;
        }
        planning_sets.push(ids);
    }

    item.hits = Some(MatchedHits {
        matched_coverages: intersect(coverage_sets),
        matched_planning_items: intersect(planning_sets),
    });
}

fn coverage_ids(payload: &InnerHits) -> HashSet<String> {
    payload
        .hits
        .hits
        .iter()
        .filter_map(|hit| {
            hit.source
                .get("coverage_id")
                .and_then(Value::as_str)
                .map(str::to_string)
        })
        .collect()
}

fn planning_ids(payload: &InnerHits) -> HashSet<String> {
    payload
        .hits
        .hits
        .iter()
        .filter_map(|hit| {
            hit.source
                .get("guid")
                .or_else(|| hit.source.get("planning_id"))
                .and_then(Value::as_str)
                .map(str::to_string)
        })
        .collect()
}

fn intersect(sets: Vec<HashSet<String>>) -> Vec<String> {
    let mut iter = sets.into_iter();
    let Some(first) = iter.next() else {
        return Vec::new();
    };
    let common = iter.fold(first, |acc, set| &acc & &set);
    let mut ids: Vec<String> = common.into_iter().collect();
    ids.sort();
    ids
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{HitsEnvelope, StoreHit, TotalHits};
    use serde_json::json;

    fn payload(sources: Vec<Value>) -> InnerHits {
        InnerHits {
            hits: HitsEnvelope {
                total: TotalHits::Legacy(sources.len() as u64),
                hits: sources
                    .into_iter()
                    .map(|source| StoreHit {
                        id: "agenda-1".to_string(),
                        source,
                        score: None,
                        inner_hits: HashMap::new(),
                        highlight: None,
                    })
                    .collect(),
            },
        }
    }

    fn coverage_payload(ids: &[&str]) -> InnerHits {
        payload(
            ids.iter()
                .map(|id| json!({"coverage_id": id, "coverage_type": "text"}))
                .collect(),
        )
    }

    fn planning_payload(ids: &[&str]) -> InnerHits {
        payload(ids.iter().map(|id| json!({"guid": id})).collect())
    }

    #[test]
    fn test_coverage_tags_intersect_not_union() {
        let mut item = AgendaItem::default();
        let mut inner = HashMap::new();
        inner.insert("coverage".to_string(), coverage_payload(&["c1", "c2"]));
        inner.insert("coverage_status".to_string(), coverage_payload(&["c2", "c3"]));

        correlate_hits(&mut item, &inner);

        let hits = item.hits.unwrap();
        assert_eq!(hits.matched_coverages, vec!["c2".to_string()]);
        assert!(hits.matched_planning_items.is_empty());
    }

    #[test]
    fn test_planning_tags_intersect() {
        let mut item = AgendaItem::default();
        let mut inner = HashMap::new();
        inner.insert("agendas".to_string(), planning_payload(&["p1", "p2"]));
        inner.insert(
            "planning_items_text".to_string(),
            planning_payload(&["p2", "p3"]),
        );

        correlate_hits(&mut item, &inner);

        let hits = item.hits.unwrap();
        assert_eq!(hits.matched_planning_items, vec!["p2".to_string()]);
    }

    #[test]
    fn test_empty_dual_origin_tag_is_suppressed() {
        let mut item = AgendaItem::default();
        let mut inner = HashMap::new();
        // The free-text should matched at document level only
        inner.insert("planning_items_text".to_string(), planning_payload(&[]));
        inner.insert("agendas".to_string(), planning_payload(&["p1"]));

        correlate_hits(&mut item, &inner);

        let hits = item.hits.unwrap();
        assert_eq!(hits.matched_planning_items, vec!["p1".to_string()]);
    }

    #[test]
    fn test_foreign_path_tags_drop_out() {
        let mut item = AgendaItem::default();
        let mut inner = HashMap::new();
        // A nested vocabulary payload carries no planning ids
        inner.insert(
            "topics".to_string(),
            payload(vec![json!({"code": "sports", "scheme": "topics"})]),
        );
        inner.insert("agendas".to_string(), planning_payload(&["p1"]));

        correlate_hits(&mut item, &inner);

        let hits = item.hits.unwrap();
        assert_eq!(hits.matched_planning_items, vec!["p1".to_string()]);
    }

    #[test]
    fn test_planning_id_fallback() {
        let mut item = AgendaItem::default();
        let mut inner = HashMap::new();
        inner.insert(
            "agendas".to_string(),
            payload(vec![json!({"planning_id": "legacy-1"})]),
        );

        correlate_hits(&mut item, &inner);

        let hits = item.hits.unwrap();
        assert_eq!(hits.matched_planning_items, vec!["legacy-1".to_string()]);
    }

    #[test]
    fn test_no_tags_leaves_hits_unset() {
        let mut item = AgendaItem::default();
        correlate_hits(&mut item, &HashMap::new());
        assert!(item.hits.is_none());
    }

    struct FixedLookup(chrono::DateTime<chrono::Utc>);

    #[async_trait]
    impl WireItemLookup for FixedLookup {
        async fn find_delivered(&self, _delivery_id: &str) -> anyhow::Result<Option<WireItem>> {
            Ok(Some(WireItem {
                versioncreated: Some(self.0),
                ..WireItem::default()
            }))
        }
    }

    struct FailingFormatter;

    #[async_trait]
    impl DeliveryFormatter for FailingFormatter {
        async fn delivery_href(&self, _coverage: &Coverage) -> anyhow::Result<Option<String>> {
            anyhow::bail!("formatter offline")
        }
    }

    #[tokio::test]
    async fn test_completed_text_coverage_gets_publish_time() {
        let delivered_at = chrono::Utc::now();
        let correlator =
            ResultCorrelator::new().with_wire_lookup(Arc::new(FixedLookup(delivered_at)));

        let mut item = AgendaItem::default();
        item.coverages.push(Coverage {
            coverage_id: "c1".to_string(),
            coverage_type: Some("text".to_string()),
            workflow_status: Some(crate::models::WorkflowStatus::Completed),
            delivery_id: Some("wire-1".to_string()),
            ..Coverage::default()
        });

        let mut page = vec![(item, HashMap::new())];
        correlator.process_page(&mut page).await;

        assert_eq!(page[0].0.coverages[0].publish_time, Some(delivered_at));
    }

    #[tokio::test]
    async fn test_formatter_failure_is_swallowed() {
        let correlator =
            ResultCorrelator::new().with_delivery_formatter(Arc::new(FailingFormatter));

        let mut item = AgendaItem::default();
        item.coverages.push(Coverage {
            coverage_id: "c1".to_string(),
            coverage_type: Some("picture".to_string()),
            workflow_status: Some(crate::models::WorkflowStatus::Completed),
            ..Coverage::default()
        });

        let mut page = vec![(item, HashMap::new())];
        correlator.process_page(&mut page).await;

        // Still here, still unenhanced
        assert!(page[0].0.coverages[0].delivery_href.is_none());
    }
}
