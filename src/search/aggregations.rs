use serde_json::{json, Value};

use super::facets::{FacetKind, FacetRegistry};
use crate::models::Section;

/// Build the facet aggregation spec for a section
///
/// Facets compile in registry order so the output is stable across calls.
/// Nested facets aggregate through a filter indirection named
/// `{facet}_filtered`; a parent facet hosting nested schemes gets the
/// negative form of the same indirection so specialised entries stay out
/// of its generic buckets.
pub fn facet_aggregations(registry: &FacetRegistry, section: Section, size: usize) -> Value {
    let mut aggs = serde_json::Map::new();
    // Planning-level facets share one nested traversal
    let mut planning_children = serde_json::Map::new();

    for (name, kind) in registry.aggregation_facets(section) {
        match kind {
            FacetKind::Direct(path) => {
                let hosted = registry.nested_entries_for_parent(section, &name);
                if hosted.is_empty() {
                    aggs.insert(name, terms_agg(&path, size));
                } else {
                    let discriminator = format!("{}.{}", name, hosted[0].field);
                    let values: Vec<String> =
                        hosted.into_iter().map(|entry| entry.value).collect();
                    aggs.insert(
                        name.clone(),
                        json!({
                            "nested": {"path": name},
                            "aggs": {(format!("{}_filtered", name)): {
                                "filter": {"bool": {"must_not": [
                                    {"terms": {(discriminator): values}},
                                ]}},
                                "aggs": {(name.clone()): terms_agg(&path, size)},
                            }},
                        }),
                    );
                }
            }
            FacetKind::Location => {
                aggs.insert(name, terms_agg("location.name.keyword", size));
            }
            FacetKind::Nested(entry) => {
                aggs.insert(
                    name.clone(),
                    json!({
                        "nested": {"path": entry.parent},
                        "aggs": {(format!("{}_filtered", name)): {
                            "filter": {"term": {
                                (format!("{}.{}", entry.parent, entry.field)): entry.value,
                            }},
                            "aggs": {(name.clone()): terms_agg(
                                &format!("{}.{}", entry.parent, entry.searchfield),
                                size,
                            )},
                        }},
                    }),
                );
            }
            FacetKind::Coverage => {
                aggs.insert(
                    "coverage".to_string(),
                    json!({
                        "nested": {"path": "coverages"},
                        "aggs": {"coverage": terms_agg("coverages.coverage_type", size)},
                    }),
                );
            }
            // Two fixed states, nothing worth counting
            FacetKind::CoverageStatus => {}
            FacetKind::Agendas => {
                planning_children.insert(
                    "agendas".to_string(),
                    terms_agg("planning_items.agendas.name", size),
                );
                planning_children.insert(
                    "planning_state".to_string(),
                    terms_agg("planning_items.state", size),
                );
            }
        }
    }

    if !planning_children.is_empty() {
        aggs.insert(
            "planning_items".to_string(),
            json!({
                "nested": {"path": "planning_items"},
                "aggs": planning_children,
            }),
        );
    }

    Value::Object(aggs)
}

fn terms_agg(field: &str, size: usize) -> Value {
    json!({"terms": {"field": field, "size": size}})
}
