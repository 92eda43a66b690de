use std::collections::HashMap;

use crate::config::{FacetsConfig, NestedFacetEntry};
use crate::models::Section;

/// How a facet compiles into filter clauses and aggregations
#[derive(Debug, Clone, PartialEq)]
pub enum FacetKind {
    /// Terms over a document field
    Direct(String),

    /// Carved out of a shared nested parent by a discriminator value
    Nested(NestedFacetEntry),

    /// Commissioned coverage content types
    Coverage,

    /// Coverage intention phrase; the only exclusion-capable facet
    CoverageStatus,

    /// Named planning groupings
    Agendas,

    /// Venue name on the location object
    Location,
}

/// Facet lookup keyed by section and facet name
///
/// Built once from configuration at start-up and shared read-only from
/// there on.
#[derive(Debug, Clone)]
pub struct FacetRegistry {
    facets: HashMap<(Section, String), FacetKind>,
    ordered: Vec<(Section, String)>,
}

impl FacetRegistry {
    /// Build the registry from facet configuration
    pub fn from_config(config: &FacetsConfig) -> Self {
        let mut facets = HashMap::new();
        let mut ordered = Vec::new();

        for name in &config.wire {
            facets.insert(
                (Section::Wire, name.clone()),
                default_kind(Section::Wire, name),
            );
            ordered.push((Section::Wire, name.clone()));
        }
        for name in &config.agenda {
            facets.insert(
                (Section::Agenda, name.clone()),
                default_kind(Section::Agenda, name),
            );
            ordered.push((Section::Agenda, name.clone()));
        }
        // Nested entries override the defaults under the same name
        for entry in &config.wire_nested {
            if !facets.contains_key(&(Section::Wire, entry.name.clone())) {
                ordered.push((Section::Wire, entry.name.clone()));
            }
            facets.insert(
                (Section::Wire, entry.name.clone()),
                FacetKind::Nested(entry.clone()),
            );
        }
        for entry in &config.agenda_nested {
            if !facets.contains_key(&(Section::Agenda, entry.name.clone())) {
                ordered.push((Section::Agenda, entry.name.clone()));
            }
            facets.insert(
                (Section::Agenda, entry.name.clone()),
                FacetKind::Nested(entry.clone()),
            );
        }

        Self { facets, ordered }
    }

    /// Resolve a facet name for a section
    ///
    /// Names outside the registry fall back to their conventional direct
    /// field so ad-hoc filters keep working.
    pub fn resolve(&self, section: Section, name: &str) -> FacetKind {
        self.facets
            .get(&(section, name.to_string()))
            .cloned()
            .unwrap_or_else(|| default_kind(section, name))
    }

    /// Facets exposed as aggregations for a section, in configured order
    pub fn aggregation_facets(&self, section: Section) -> Vec<(String, FacetKind)> {
        self.ordered
            .iter()
            .filter(|(s, _)| *s == section)
            .filter_map(|(s, name)| {
                self.facets
                    .get(&(*s, name.clone()))
                    .map(|kind| (name.clone(), kind.clone()))
            })
            .collect()
    }

    /// Nested facet definitions carved out of the given parent path
    pub fn nested_entries_for_parent(
        &self,
        section: Section,
        parent: &str,
    ) -> Vec<NestedFacetEntry> {
        self.ordered
            .iter()
            .filter(|(s, _)| *s == section)
            .filter_map(|(s, name)| match self.facets.get(&(*s, name.clone())) {
                Some(FacetKind::Nested(entry)) if entry.parent == parent => Some(entry.clone()),
                _ => None,
            })
            .collect()
    }

    /// Discriminator values registered under a nested parent path
    ///
    /// The parent's own aggregation excludes these so specialised schemes do
    /// not pollute the generic bucket.
    pub fn nested_values_for_parent(&self, section: Section, parent: &str) -> Vec<String> {
        self.nested_entries_for_parent(section, parent)
            .into_iter()
            .map(|entry| entry.value)
            .collect()
    }
}

fn default_kind(section: Section, name: &str) -> FacetKind {
    match (section, name) {
        (Section::Agenda, "coverage") => FacetKind::Coverage,
        (Section::Agenda, "coverage_status") => FacetKind::CoverageStatus,
        (Section::Agenda, "agendas") => FacetKind::Agendas,
        (Section::Agenda, "location") => FacetKind::Location,
        // Scalar fields facet on themselves, vocabularies on their name
        (_, "urgency") | (_, "priority") => FacetKind::Direct(name.to_string()),
        (_, other) => FacetKind::Direct(format!("{}.name", other)),
    }
}
