use serde_json::{json, Value};

use super::clauses::{
    bool_filter, bool_should, exists, free_text_query, multi_match, nested, nested_with_hits,
    query_string, range, term, terms,
};
use super::facets::{FacetKind, FacetRegistry};
use super::request::{ItemTypeFilter, SearchQuery};
use crate::config::{CompanyTypeRule, Config, SearchConfig};
use crate::entitlements::SectionPolicy;
use crate::error::{CoreError, Result};
use crate::models::Section;

/// Which side of the embargo gate one compile pass selects
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EmbargoPass {
    /// Single pass; the gate depends on the caller's entitlement
    #[default]
    Standard,

    /// Embargoed items only, for the first pass of a prepend request
    HeldOnly,

    /// Released items only, for the second pass of a prepend request
    Released,
}

/// Compiles a prepared request into a store query
///
/// Stages run in a fixed order and only ever append clauses, so compiling
/// the same request in a fresh context yields a structurally identical
/// tree. The compiler holds configuration snapshots and no per-request
/// state.
pub struct QueryCompiler {
    settings: SearchConfig,
    registry: FacetRegistry,
    company_types: Vec<CompanyTypeRule>,
}

impl QueryCompiler {
    pub fn new(config: &Config) -> Self {
        Self {
            settings: config.search.clone(),
            registry: FacetRegistry::from_config(&config.facets),
            company_types: config.company_types.clone(),
        }
    }

    pub fn settings(&self) -> &SearchConfig {
        &self.settings
    }

    pub fn registry(&self) -> &FacetRegistry {
        &self.registry
    }

    /// Run the full stage pipeline for an interactive search
    pub fn compile(
        &self,
        query: &mut SearchQuery,
        policy: Option<&SectionPolicy>,
        embargo: EmbargoPass,
    ) -> Result<()> {
        self.apply_section_policy(query, policy);
        self.apply_company_type(query);
        self.apply_archive_limit(query);
        self.apply_embargo_gate(query, embargo);
        self.apply_products(query);
        self.apply_free_text(query);
        self.apply_advanced(query);
        self.apply_structured_filters(query);
        self.apply_date_range(query);
        self.apply_created_window(query);
        self.apply_saved_items(query);
        self.apply_item_type(query)?;
        Ok(())
    }

    /// Run the stage subset used when evaluating stored topics
    ///
    /// Saved-item, embargo and partition concerns belong to interactive
    /// requests and are left out; the topic's stored fields have already
    /// been translated into request parameters.
    pub fn compile_topic(&self, query: &mut SearchQuery, policy: Option<&SectionPolicy>) {
        self.apply_section_policy(query, policy);
        self.apply_company_type(query);
        self.apply_archive_limit(query);
        self.apply_products(query);
        self.apply_free_text(query);
        self.apply_advanced(query);
        self.apply_structured_filters(query);
        self.apply_created_window(query);
    }

    fn apply_section_policy(&self, query: &mut SearchQuery, policy: Option<&SectionPolicy>) {
        let Some(q) = policy
            .and_then(|p| p.filter_query.as_deref())
            .map(str::trim)
            .filter(|s| !s.is_empty())
        else {
            return;
        };
        query
            .query
            .add_filter(query_string(q, &self.settings.default_operator));
    }

    fn apply_company_type(&self, query: &mut SearchQuery) {
        let Some(type_id) = query.company.as_ref().and_then(|c| c.company_type.as_deref()) else {
            return;
        };
        let Some(rule) = self.company_types.iter().find(|r| r.id == type_id) else {
            return;
        };
        if let Some(must) = rule.must.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            query
                .query
                .add_filter(query_string(must, &self.settings.default_operator));
        }
        if let Some(must_not) = rule
            .must_not
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
        {
            query
                .query
                .add_must_not(query_string(must_not, &self.settings.default_operator));
        }
    }

    fn apply_archive_limit(&self, query: &mut SearchQuery) {
        if query.is_admin {
            return;
        }
        if query.company.as_ref().map_or(false, |c| c.archive_access) {
            return;
        }
        query.query.add_filter(range(
            "versioncreated",
            json!({"gte": format!("now-{}d/d", self.settings.time_limit_days)}),
        ));
    }

    fn apply_embargo_gate(&self, query: &mut SearchQuery, pass: EmbargoPass) {
        if query.section != Section::Wire {
            return;
        }
        let held = range("embargoed", json!({"gt": "now"}));
        match pass {
            EmbargoPass::HeldOnly => query.query.add_filter(held),
            EmbargoPass::Released => query.query.add_must_not(held),
            EmbargoPass::Standard => {
                let entitled = query.is_admin
                    || query
                        .company
                        .as_ref()
                        .map_or(false, |c| c.embargoed_access);
                if !entitled {
                    query.query.add_must_not(held);
                }
            }
        }
    }

    /// One should-group over the entitled products
    ///
    /// An empty product scope means no restriction at all, which only
    /// operators reach.
    fn apply_products(&self, query: &mut SearchQuery) {
        if query.products.is_empty() {
            return;
        }

        let mut alternatives: Vec<Value> = Vec::new();
        let codes: Vec<String> = query
            .products
            .iter()
            .filter_map(|p| p.code.clone())
            .collect();
        if !codes.is_empty() {
            alternatives.push(terms("products.code", &codes));
        }
        for product in &query.products {
            if let Some(q) = product.query.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
                alternatives.push(query_string(q, &self.settings.default_operator));
            }
            if query.section == Section::Agenda {
                if let Some(q) = product
                    .planning_item_query
                    .as_deref()
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                {
                    alternatives.push(nested_with_hits(
                        "planning_items",
                        bool_filter(vec![query_string(q, &self.settings.default_operator)]),
                        &format!("products_{}", product.id),
                    ));
                }
            }
        }

        if !alternatives.is_empty() {
            for clause in alternatives {
                query.query.add_should(clause);
            }
            query.query.set_minimum_should_match(1);
        }
    }

    fn apply_free_text(&self, query: &mut SearchQuery) {
        let Some(q) = query.params.q.clone() else {
            return;
        };
        let doc_clause = free_text_query(
            &q,
            &self.settings.default_operator,
            self.settings.analyze_wildcard,
        );
        match query.section {
            Section::Wire => query.query.add_must(doc_clause),
            Section::Agenda => {
                // A hit on a child planning item surfaces the parent
                let planning_clause = nested_with_hits(
                    "planning_items",
                    bool_filter(vec![free_text_query(
                        &q,
                        &self.settings.default_operator,
                        self.settings.analyze_wildcard,
                    )]),
                    "planning_items_text",
                );
                query
                    .query
                    .add_must(bool_should(vec![doc_clause, planning_clause]));
            }
        }
    }

    fn apply_advanced(&self, query: &mut SearchQuery) {
        let Some(advanced) = query.params.advanced.clone() else {
            return;
        };
        let fields: Vec<String> = if advanced.fields.is_empty() {
            match query.section {
                Section::Wire => self.settings.wire_advanced_fields.clone(),
                Section::Agenda => self.settings.agenda_advanced_fields.clone(),
            }
        } else {
            advanced.fields.clone()
        };
        if fields.is_empty() {
            return;
        }

        if let Some(all) = advanced.all.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            query
                .query
                .add_filter(multi_match(all, &fields, "and", "cross_fields"));
        }
        if let Some(any) = advanced.any.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            query
                .query
                .add_filter(multi_match(any, &fields, "or", "best_fields"));
        }
        if let Some(exclude) = advanced
            .exclude
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
        {
            query
                .query
                .add_must_not(multi_match(exclude, &fields, "or", "best_fields"));
        }
    }

    fn apply_structured_filters(&self, query: &mut SearchQuery) {
        if query.params.filters.is_empty() {
            return;
        }
        // When planning items are in scope, a child match must promote the
        // parent rather than the clause excluding it
        let with_planning = query.section == Section::Agenda
            && query.params.item_type != ItemTypeFilter::Events
            && !query.events_only_company();

        let filters = query.params.filters.clone();
        for (facet, values) in &filters {
            if values.is_empty() {
                continue;
            }
            match self.facet_clause(query.section, facet, values, with_planning) {
                CompiledFilter::Include(clause) => query.query.add_filter(clause),
                CompiledFilter::Exclude(clause) => query.query.add_must_not(clause),
            }
        }
    }

    fn facet_clause(
        &self,
        section: Section,
        facet: &str,
        values: &[String],
        with_planning: bool,
    ) -> CompiledFilter {
        match self.registry.resolve(section, facet) {
            FacetKind::Direct(path) => {
                CompiledFilter::Include(self.direct_clause(facet, &path, values, with_planning))
            }
            FacetKind::Location => CompiledFilter::Include(self.direct_clause(
                facet,
                "location.name.keyword",
                values,
                with_planning,
            )),
            FacetKind::Nested(entry) => {
                let event_side = nested_with_hits(
                    &entry.parent,
                    bool_filter(vec![
                        term(
                            &format!("{}.{}", entry.parent, entry.field),
                            entry.value.clone(),
                        ),
                        terms(&format!("{}.{}", entry.parent, entry.searchfield), values),
                    ]),
                    facet,
                );
                if with_planning {
                    let twin = nested_with_hits(
                        "planning_items",
                        bool_filter(vec![
                            term(
                                &format!("planning_items.{}.{}", entry.parent, entry.field),
                                entry.value.clone(),
                            ),
                            terms(
                                &format!("planning_items.{}.{}", entry.parent, entry.searchfield),
                                values,
                            ),
                        ]),
                        &format!("planning_items_{}", facet),
                    );
                    CompiledFilter::Include(bool_should(vec![event_side, twin]))
                } else {
                    CompiledFilter::Include(event_side)
                }
            }
            FacetKind::Coverage => CompiledFilter::Include(nested_with_hits(
                "coverages",
                bool_filter(vec![terms("coverages.coverage_type", values)]),
                "coverage",
            )),
            FacetKind::CoverageStatus => {
                let wanted = bool_filter(vec![term("coverages.coverage_status", "coverage intended")]);
                if values.iter().any(|v| v == "planned") {
                    CompiledFilter::Include(nested_with_hits("coverages", wanted, "coverage_status"))
                } else {
                    CompiledFilter::Exclude(nested("coverages", wanted))
                }
            }
            FacetKind::Agendas => CompiledFilter::Include(nested_with_hits(
                "planning_items",
                bool_filter(vec![terms("planning_items.guid", values)]),
                "agendas",
            )),
        }
    }

    fn direct_clause(
        &self,
        facet: &str,
        path: &str,
        values: &[String],
        with_planning: bool,
    ) -> Value {
        let event_side = terms(path, values);
        if !with_planning {
            return event_side;
        }
        let twin = nested_with_hits(
            "planning_items",
            bool_filter(vec![terms(&format!("planning_items.{}", path), values)]),
            facet,
        );
        bool_should(vec![event_side, twin])
    }

    fn apply_date_range(&self, query: &mut SearchQuery) {
        let Some(window) = query.params.date_range.clone() else {
            return;
        };
        let clause = match query.section {
            Section::Wire => window.wire_clause(),
            Section::Agenda => window.agenda_clause(),
        };
        if let Some(clause) = clause {
            query.query.add_filter(clause);
        }
    }

    /// Creation-date window stored on topics; bounds pass through verbatim
    /// so date math keeps working
    fn apply_created_window(&self, query: &mut SearchQuery) {
        let Some(window) = query.params.created.clone() else {
            return;
        };
        let mut bounds = serde_json::Map::new();
        if let Some(from) = window.from.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            bounds.insert("gte".to_string(), json!(from));
        }
        if let Some(to) = window.to.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            bounds.insert("lte".to_string(), json!(to));
        }
        if bounds.is_empty() {
            return;
        }
        query
            .query
            .add_filter(range("versioncreated", Value::Object(bounds)));
    }

    fn apply_saved_items(&self, query: &mut SearchQuery) {
        if !query.params.bookmarks {
            return;
        }
        let Some(user_id) = query.user_id() else {
            return;
        };
        let ids = vec![user_id.to_string()];
        let mut alternatives = vec![terms("bookmarks", &ids), terms("watches", &ids)];
        if query.section == Section::Agenda {
            alternatives.push(nested(
                "coverages",
                bool_filter(vec![terms("coverages.watches", &ids)]),
            ));
        }
        query.query.add_filter(bool_should(alternatives));
    }

    /// Partition agenda documents into events, planning or both
    ///
    /// Items indexed before the type tag existed are classified by whether
    /// they carry an event id.
    fn apply_item_type(&self, query: &mut SearchQuery) -> Result<()> {
        if query.section != Section::Agenda {
            return Ok(());
        }

        let mut item_type = query.params.item_type;
        if query.events_only_company() {
            if item_type == ItemTypeFilter::Planning {
                return Err(CoreError::Forbidden(
                    "Company is restricted to event content".to_string(),
                ));
            }
            item_type = ItemTypeFilter::Events;
        }

        match item_type {
            ItemTypeFilter::Events => {
                query.query.add_filter(bool_should(vec![
                    term("item_type", "event"),
                    json!({"bool": {
                        "must": [exists("event_id")],
                        "must_not": [exists("item_type")],
                    }}),
                ]));
                query.source_exclude = vec![
                    "planning_items".to_string(),
                    "coverages".to_string(),
                    "display_dates".to_string(),
                ];
            }
            ItemTypeFilter::Planning => {
                query.query.add_filter(bool_should(vec![
                    term("item_type", "planning"),
                    json!({"bool": {
                        "must_not": [exists("item_type"), exists("event_id")],
                    }}),
                ]));
            }
            ItemTypeFilter::Combined => {
                query.query.add_filter(bool_should(vec![
                    terms(
                        "item_type",
                        &["event".to_string(), "planning".to_string()],
                    ),
                    json!({"bool": {"must_not": [exists("item_type")]}}),
                ]));
            }
        }
        Ok(())
    }
}

/// Where a compiled facet clause lands in the boolean tree
enum CompiledFilter {
    Include(Value),
    Exclude(Value),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Company, Product, User, UserRole};
    use crate::search::request::SearchParams;
    use uuid::Uuid;

    fn compiler() -> QueryCompiler {
        let config = Config {
            store: crate::config::StoreConfig {
                base_url: "http://localhost:9200".to_string(),
                wire_index: "items".to_string(),
                agenda_index: "agenda".to_string(),
                username: None,
                password_env: None,
                timeout_secs: 5,
            },
            search: SearchConfig::default(),
            facets: crate::config::FacetsConfig::default(),
            company_types: vec![CompanyTypeRule {
                id: "broadcaster".to_string(),
                must: Some("type:broadcast".to_string()),
                must_not: Some("source:internal".to_string()),
            }],
            observability: crate::config::ObservabilityConfig::default(),
        };
        QueryCompiler::new(&config)
    }

    fn member() -> User {
        User::new(
            "reader@example.com".to_string(),
            "Test".to_string(),
            "Reader".to_string(),
            UserRole::Member,
        )
    }

    fn wire_query(params: SearchParams) -> SearchQuery {
        SearchQuery::new(Section::Wire, params)
            .with_user(member())
            .with_company(Company::new("Example Media".to_string()))
    }

    fn agenda_query(params: SearchParams) -> SearchQuery {
        SearchQuery::new(Section::Agenda, params)
            .with_user(member())
            .with_company(Company::new("Example Media".to_string()))
    }

    #[test]
    fn test_baseline_stages_for_member() {
        let compiler = compiler();
        let mut query = wire_query(SearchParams::default());
        query.company.as_mut().unwrap().company_type = Some("broadcaster".to_string());
        let policy = SectionPolicy {
            section: Section::Wire,
            filter_query: Some("NOT pubstatus:canceled".to_string()),
        };

        compiler
            .compile(&mut query, Some(&policy), EmbargoPass::Standard)
            .unwrap();

        assert_eq!(
            query.query.filter[0]["query_string"]["query"],
            "NOT pubstatus:canceled"
        );
        assert_eq!(
            query.query.filter[1]["query_string"]["query"],
            "type:broadcast"
        );
        assert_eq!(
            query.query.filter[2]["range"]["versioncreated"]["gte"],
            "now-90d/d"
        );
        // Company type exclusion and the embargo gate
        assert_eq!(
            query.query.must_not[0]["query_string"]["query"],
            "source:internal"
        );
        assert_eq!(query.query.must_not[1]["range"]["embargoed"]["gt"], "now");
    }

    #[test]
    fn test_admin_skips_archive_and_embargo() {
        let compiler = compiler();
        let mut query =
            SearchQuery::new(Section::Wire, SearchParams::default()).with_admin(true);
        compiler
            .compile(&mut query, None, EmbargoPass::Standard)
            .unwrap();
        assert!(query.query.filter.is_empty());
        assert!(query.query.must_not.is_empty());
    }

    #[test]
    fn test_archive_access_company_skips_time_limit() {
        let compiler = compiler();
        let mut query = wire_query(SearchParams::default());
        query.company.as_mut().unwrap().archive_access = true;
        compiler
            .compile(&mut query, None, EmbargoPass::Standard)
            .unwrap();
        assert!(query
            .query
            .filter
            .iter()
            .all(|c| c.get("range").is_none()));
    }

    #[test]
    fn test_product_queries_become_should_group() {
        let compiler = compiler();
        let mut coded = Product::new("General News".to_string(), Section::Wire);
        coded.code = Some("gen".to_string());
        let mut queried = Product::new("Weather".to_string(), Section::Wire);
        queried.query = Some("headline:weather".to_string());
        let mut query = wire_query(SearchParams::default()).with_products(vec![coded, queried]);

        compiler
            .compile(&mut query, None, EmbargoPass::Standard)
            .unwrap();

        assert_eq!(query.query.minimum_should_match, Some(1));
        assert_eq!(
            query.query.should[0]["terms"]["products.code"][0],
            "gen"
        );
        assert_eq!(
            query.query.should[1]["query_string"]["query"],
            "headline:weather"
        );
    }

    #[test]
    fn test_planning_item_query_correlates_by_product() {
        let compiler = compiler();
        let mut product = Product::new("Sport Diary".to_string(), Section::Agenda);
        product.planning_item_query = Some("slugline:sport".to_string());
        let product_id = product.id;
        let mut query = agenda_query(SearchParams::default()).with_products(vec![product]);

        compiler
            .compile(&mut query, None, EmbargoPass::Standard)
            .unwrap();

        let nested = &query.query.should[0]["nested"];
        assert_eq!(nested["path"], "planning_items");
        assert_eq!(
            nested["inner_hits"]["name"],
            format!("products_{}", product_id)
        );
    }

    #[test]
    fn test_wire_free_text_is_a_must_clause() {
        let compiler = compiler();
        let mut query = wire_query(SearchParams {
            q: Some("flood levy".to_string()),
            ..SearchParams::default()
        });
        compiler
            .compile(&mut query, None, EmbargoPass::Standard)
            .unwrap();
        assert_eq!(
            query.query.must[0]["query_string"]["query"],
            "flood levy"
        );
        assert_eq!(query.query.must[0]["query_string"]["default_operator"], "AND");
    }

    #[test]
    fn test_agenda_free_text_reaches_planning_items() {
        let compiler = compiler();
        let mut query = agenda_query(SearchParams {
            q: Some("olympics".to_string()),
            ..SearchParams::default()
        });
        compiler
            .compile(&mut query, None, EmbargoPass::Standard)
            .unwrap();

        let alternatives = query.query.must[0]["bool"]["should"].as_array().unwrap();
        assert_eq!(alternatives.len(), 2);
        assert_eq!(alternatives[0]["query_string"]["query"], "olympics");
        assert_eq!(
            alternatives[1]["nested"]["inner_hits"]["name"],
            "planning_items_text"
        );
        assert_eq!(query.query.must[0]["bool"]["minimum_should_match"], 1);
    }

    #[test]
    fn test_advanced_blocks_compile_separately() {
        let compiler = compiler();
        let mut query = wire_query(SearchParams {
            advanced: Some(crate::models::AdvancedQuery {
                all: Some("budget".to_string()),
                any: Some("levy tax".to_string()),
                exclude: Some("rugby".to_string()),
                fields: vec!["headline".to_string()],
            }),
            ..SearchParams::default()
        });
        compiler
            .compile(&mut query, None, EmbargoPass::Standard)
            .unwrap();

        let all = query
            .query
            .filter
            .iter()
            .find(|c| c["multi_match"]["operator"] == "and")
            .unwrap();
        assert_eq!(all["multi_match"]["type"], "cross_fields");
        assert_eq!(all["multi_match"]["fields"][0], "headline");

        let any = query
            .query
            .filter
            .iter()
            .find(|c| c["multi_match"]["operator"] == "or")
            .unwrap();
        assert_eq!(any["multi_match"]["type"], "best_fields");

        let excluded = query
            .query
            .must_not
            .iter()
            .find(|c| c.get("multi_match").is_some())
            .unwrap();
        assert_eq!(excluded["multi_match"]["query"], "rugby");
    }

    #[test]
    fn test_wire_facet_filter_has_no_planning_twin() {
        let compiler = compiler();
        let mut params = SearchParams::default();
        params
            .filters
            .insert("service".to_string(), vec!["Sport".to_string()]);
        let mut query = wire_query(params);
        compiler
            .compile(&mut query, None, EmbargoPass::Standard)
            .unwrap();

        let clause = query
            .query
            .filter
            .iter()
            .find(|c| c.get("terms").is_some())
            .unwrap();
        assert_eq!(clause["terms"]["service.name"][0], "Sport");
    }

    #[test]
    fn test_agenda_facet_filter_duplicates_for_planning() {
        let compiler = compiler();
        let mut params = SearchParams::default();
        params
            .filters
            .insert("service".to_string(), vec!["Sport".to_string()]);
        let mut query = agenda_query(params);
        compiler
            .compile(&mut query, None, EmbargoPass::Standard)
            .unwrap();

        let clause = query
            .query
            .filter
            .iter()
            .find(|c| c["bool"]["should"][0].get("terms").is_some())
            .unwrap();
        let alternatives = clause["bool"]["should"].as_array().unwrap();
        assert_eq!(alternatives[0]["terms"]["service.name"][0], "Sport");
        assert_eq!(alternatives[1]["nested"]["path"], "planning_items");
        assert_eq!(
            alternatives[1]["nested"]["query"]["bool"]["filter"][0]["terms"]
                ["planning_items.service.name"][0],
            "Sport"
        );
        assert_eq!(alternatives[1]["nested"]["inner_hits"]["name"], "service");
    }

    #[test]
    fn test_events_partition_drops_planning_twin() {
        let compiler = compiler();
        let mut params = SearchParams::default();
        params.item_type = ItemTypeFilter::Events;
        params
            .filters
            .insert("service".to_string(), vec!["Sport".to_string()]);
        let mut query = agenda_query(params);
        compiler
            .compile(&mut query, None, EmbargoPass::Standard)
            .unwrap();

        assert!(query
            .query
            .filter
            .iter()
            .any(|c| c["terms"]["service.name"][0] == "Sport"));
    }

    #[test]
    fn test_nested_facet_filter_carries_inner_hits() {
        let mut config_facets = crate::config::FacetsConfig::default();
        config_facets
            .agenda_nested
            .push(crate::config::NestedFacetEntry {
                name: "topics".to_string(),
                parent: "subject".to_string(),
                field: "scheme".to_string(),
                value: "topics".to_string(),
                searchfield: "code".to_string(),
            });
        let config = Config {
            store: crate::config::StoreConfig {
                base_url: "http://localhost:9200".to_string(),
                wire_index: "items".to_string(),
                agenda_index: "agenda".to_string(),
                username: None,
                password_env: None,
                timeout_secs: 5,
            },
            search: SearchConfig::default(),
            facets: config_facets,
            company_types: Vec::new(),
            observability: crate::config::ObservabilityConfig::default(),
        };
        let compiler = QueryCompiler::new(&config);

        let mut params = SearchParams::default();
        params.item_type = ItemTypeFilter::Events;
        params
            .filters
            .insert("topics".to_string(), vec!["sports".to_string()]);
        let mut query = agenda_query(params);
        compiler
            .compile(&mut query, None, EmbargoPass::Standard)
            .unwrap();

        let clause = query
            .query
            .filter
            .iter()
            .find(|c| c.get("nested").is_some())
            .unwrap();
        assert_eq!(clause["nested"]["path"], "subject");
        assert_eq!(clause["nested"]["inner_hits"]["name"], "topics");
        assert_eq!(
            clause["nested"]["query"]["bool"]["filter"][0]["term"]["subject.scheme"],
            "topics"
        );
        assert_eq!(
            clause["nested"]["query"]["bool"]["filter"][1]["terms"]["subject.code"][0],
            "sports"
        );
    }

    #[test]
    fn test_coverage_status_flips_between_include_and_exclude() {
        let compiler = compiler();

        let mut params = SearchParams::default();
        params
            .filters
            .insert("coverage_status".to_string(), vec!["planned".to_string()]);
        let mut query = agenda_query(params);
        compiler
            .compile(&mut query, None, EmbargoPass::Standard)
            .unwrap();
        let positive = query
            .query
            .filter
            .iter()
            .find(|c| c["nested"]["inner_hits"]["name"] == "coverage_status")
            .unwrap();
        assert_eq!(
            positive["nested"]["query"]["bool"]["filter"][0]["term"]
                ["coverages.coverage_status"],
            "coverage intended"
        );

        let mut params = SearchParams::default();
        params.filters.insert(
            "coverage_status".to_string(),
            vec!["not planned".to_string()],
        );
        let mut query = agenda_query(params);
        compiler
            .compile(&mut query, None, EmbargoPass::Standard)
            .unwrap();
        let negative = query
            .query
            .must_not
            .iter()
            .find(|c| c.get("nested").is_some())
            .unwrap();
        assert!(negative["nested"].get("inner_hits").is_none());
    }

    #[test]
    fn test_saved_items_cover_coverage_watches() {
        let compiler = compiler();
        let mut query = agenda_query(SearchParams {
            bookmarks: true,
            ..SearchParams::default()
        });
        let user_id = query.user_id().unwrap().to_string();
        compiler
            .compile(&mut query, None, EmbargoPass::Standard)
            .unwrap();

        let clause = query
            .query
            .filter
            .iter()
            .find(|c| c["bool"]["should"][0].get("terms").is_some())
            .unwrap();
        let alternatives = clause["bool"]["should"].as_array().unwrap();
        assert_eq!(alternatives.len(), 3);
        assert_eq!(alternatives[0]["terms"]["bookmarks"][0], user_id);
        assert_eq!(alternatives[1]["terms"]["watches"][0], user_id);
        assert_eq!(alternatives[2]["nested"]["path"], "coverages");
    }

    #[test]
    fn test_events_partition_shape_and_source_strip() {
        let compiler = compiler();
        let mut params = SearchParams::default();
        params.item_type = ItemTypeFilter::Events;
        let mut query = agenda_query(params);
        compiler
            .compile(&mut query, None, EmbargoPass::Standard)
            .unwrap();

        let partition = query.query.filter.last().unwrap();
        let alternatives = partition["bool"]["should"].as_array().unwrap();
        assert_eq!(alternatives[0]["term"]["item_type"], "event");
        assert_eq!(
            alternatives[1]["bool"]["must"][0]["exists"]["field"],
            "event_id"
        );
        assert_eq!(
            alternatives[1]["bool"]["must_not"][0]["exists"]["field"],
            "item_type"
        );
        assert_eq!(
            query.source_exclude,
            vec!["planning_items", "coverages", "display_dates"]
        );
    }

    #[test]
    fn test_events_only_company_forces_events() {
        let compiler = compiler();
        let mut query = agenda_query(SearchParams::default());
        query.company.as_mut().unwrap().events_only = true;
        compiler
            .compile(&mut query, None, EmbargoPass::Standard)
            .unwrap();

        let partition = query.query.filter.last().unwrap();
        assert_eq!(partition["bool"]["should"][0]["term"]["item_type"], "event");
        assert!(!query.source_exclude.is_empty());
    }

    #[test]
    fn test_events_only_company_rejects_planning() {
        let compiler = compiler();
        let mut params = SearchParams::default();
        params.item_type = ItemTypeFilter::Planning;
        params.item_type_requested = true;
        let mut query = agenda_query(params);
        query.company.as_mut().unwrap().events_only = true;

        let err = compiler
            .compile(&mut query, None, EmbargoPass::Standard)
            .unwrap_err();
        assert_eq!(err.error_code(), "FORBIDDEN");
    }

    #[test]
    fn test_embargo_prepend_passes_differ_only_in_the_gate() {
        let compiler = compiler();
        let mut query = wire_query(SearchParams::default());
        query.company.as_mut().unwrap().embargoed_access = true;

        let mut held = query.clone();
        compiler
            .compile(&mut held, None, EmbargoPass::HeldOnly)
            .unwrap();
        let mut released = query.clone();
        compiler
            .compile(&mut released, None, EmbargoPass::Released)
            .unwrap();

        assert!(held
            .query
            .filter
            .iter()
            .any(|c| c["range"]["embargoed"]["gt"] == "now"));
        assert!(released
            .query
            .must_not
            .iter()
            .any(|c| c["range"]["embargoed"]["gt"] == "now"));
    }

    #[test]
    fn test_recompilation_is_structurally_identical() {
        let compiler = compiler();
        let mut params = SearchParams::default();
        params.q = Some("flood".to_string());
        params
            .filters
            .insert("service".to_string(), vec!["Weather".to_string()]);
        params
            .filters
            .insert("urgency".to_string(), vec!["3".to_string()]);

        let mut first = agenda_query(params.clone());
        compiler
            .compile(&mut first, None, EmbargoPass::Standard)
            .unwrap();
        let mut second = agenda_query(params);
        second.user = first.user.clone();
        second.company = first.company.clone();
        compiler
            .compile(&mut second, None, EmbargoPass::Standard)
            .unwrap();

        assert_eq!(first.query.to_query(), second.query.to_query());
    }

    #[test]
    fn test_topic_pipeline_skips_interactive_stages() {
        let compiler = compiler();
        let mut params = SearchParams::default();
        params.bookmarks = true;
        params.created = Some(crate::models::DateWindow {
            from: Some("now-30d/d".to_string()),
            to: None,
        });
        let mut query = wire_query(params);
        compiler.compile_topic(&mut query, None);

        // Created window compiles, the saved-items clause does not
        assert!(query
            .query
            .filter
            .iter()
            .any(|c| c["range"]["versioncreated"]["gte"] == "now-30d/d"));
        assert!(query
            .query
            .filter
            .iter()
            .all(|c| c["bool"]["should"][0].get("terms").is_none()));
        // No embargo gate either
        assert!(query.query.must_not.is_empty());
    }
}
