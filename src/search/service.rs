use serde::Serialize;
use serde_json::{json, Value};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::aggregations::facet_aggregations;
use super::clauses::ids;
use super::compiler::{EmbargoPass, QueryCompiler};
use super::correlate::ResultCorrelator;
use super::request::{ItemTypeFilter, SearchArgs, SearchParams, SearchQuery};
use crate::config::Config;
use crate::entitlements::{EntitlementProvider, EntitlementResolver, SectionPolicy};
use crate::error::{CoreError, Result};
use crate::models::{AgendaItem, Section};
use crate::store::{DocumentStore, InnerHits, SearchBody, StoreResponse, TotalHits};

const DEFAULT_PAGE_SIZE: usize = 25;

/// One page of search results
#[derive(Debug, Clone, Serialize)]
pub struct SearchResults {
    /// Total matching documents
    pub total: u64,

    /// The page, as store documents with per-request annotations
    pub items: Vec<Value>,

    /// Facet aggregations, first page only
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aggregations: Option<Value>,

    /// Store-side time spent (milliseconds)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub took: Option<u64>,
}

/// Runs prepared searches end to end
///
/// The service resolves entitlements, compiles the request, executes it
/// against the store and post-processes the page. It holds no per-request
/// state and is shared behind an `Arc`.
pub struct SearchService {
    store: Arc<dyn DocumentStore>,
    provider: Arc<dyn EntitlementProvider>,
    resolver: EntitlementResolver,
    compiler: QueryCompiler,
    correlator: ResultCorrelator,
    wire_index: String,
    agenda_index: String,
}

impl SearchService {
    pub fn new(
        config: &Config,
        store: Arc<dyn DocumentStore>,
        provider: Arc<dyn EntitlementProvider>,
    ) -> Self {
        Self {
            compiler: QueryCompiler::new(config),
            resolver: EntitlementResolver::new(provider.clone()),
            correlator: ResultCorrelator::new(),
            wire_index: config.store.wire_index.clone(),
            agenda_index: config.store.agenda_index.clone(),
            store,
            provider,
        }
    }

    /// Replace the default correlator, usually to attach collaborators
    pub fn with_correlator(mut self, correlator: ResultCorrelator) -> Self {
        self.correlator = correlator;
        self
    }

    pub fn compiler(&self) -> &QueryCompiler {
        &self.compiler
    }

    /// Run a search for raw request arguments
    pub async fn search(
        &self,
        section: Section,
        user_id: &Uuid,
        args: &SearchArgs,
    ) -> Result<SearchResults> {
        let params = SearchParams::from_args(args)?;
        self.search_with_params(section, user_id, params).await
    }

    /// Run a search for already-typed parameters
    pub async fn search_with_params(
        &self,
        section: Section,
        user_id: &Uuid,
        params: SearchParams,
    ) -> Result<SearchResults> {
        let (from, size) = self.validate_paging(&params)?;
        let prepared = self.resolver.prepare(section, user_id, params).await?;
        let policy = self.provider.get_section_policy(section).await?;

        let response = if self.wants_prepend(&prepared) {
            self.execute_prepend(&prepared, policy.as_ref(), from, size)
                .await?
        } else {
            let mut query = prepared.clone();
            self.compiler
                .compile(&mut query, policy.as_ref(), EmbargoPass::Standard)?;
            self.execute(&query, from, size).await?
        };

        let results = match section {
            Section::Wire => self.wire_results(response),
            Section::Agenda => {
                self.agenda_results(&prepared, policy.as_ref(), response)
                    .await?
            }
        };

        info!(
            section = %section,
            user = %user_id,
            total = results.total,
            returned = results.items.len(),
            "search completed"
        );
        Ok(results)
    }

    fn validate_paging(&self, params: &SearchParams) -> Result<(usize, usize)> {
        let settings = self.compiler.settings();
        if params.from >= settings.max_result_window {
            return Err(CoreError::BadParameter(format!(
                "Paging past {} results is not supported",
                settings.max_result_window
            )));
        }
        let size = params
            .size
            .unwrap_or(DEFAULT_PAGE_SIZE)
            .min(settings.max_page_size);
        Ok((params.from, size))
    }

    fn wants_prepend(&self, prepared: &SearchQuery) -> bool {
        prepared.section == Section::Wire
            && prepared.params.prepend_embargoed
            && (prepared.is_admin
                || prepared
                    .company
                    .as_ref()
                    .map_or(false, |c| c.embargoed_access))
    }

    fn index(&self, section: Section) -> &str {
        match section {
            Section::Wire => &self.wire_index,
            Section::Agenda => &self.agenda_index,
        }
    }

    fn build_body(&self, query: &SearchQuery, from: usize, size: usize) -> SearchBody {
        let settings = self.compiler.settings();
        let mut body = SearchBody::new(query.query.to_query())
            .with_paging(from, size)
            .with_sort(sort_spec(query.section));
        // Aggregations only count on the first page
        if query.params.aggregations && from == 0 {
            body = body.with_aggs(facet_aggregations(
                self.compiler.registry(),
                query.section,
                settings.aggregation_size,
            ));
        }
        if query.params.highlight && query.params.q.is_some() {
            body = body.with_highlight(highlight_spec(&settings.highlight_fields));
        }
        body.with_source_exclude(query.source_exclude.clone())
    }

    async fn execute(&self, query: &SearchQuery, from: usize, size: usize) -> Result<StoreResponse> {
        let body = self.build_body(query, from, size);
        self.store.search(self.index(query.section), &body).await
    }

    /// Embargo prepend: one extra pass over held items, concatenated first
    async fn execute_prepend(
        &self,
        prepared: &SearchQuery,
        policy: Option<&SectionPolicy>,
        from: usize,
        size: usize,
    ) -> Result<StoreResponse> {
        let mut held = prepared.clone();
        held.params.aggregations = false;
        self.compiler
            .compile(&mut held, policy, EmbargoPass::HeldOnly)?;
        let held_response = self.execute(&held, from, size).await?;

        let mut released = prepared.clone();
        self.compiler
            .compile(&mut released, policy, EmbargoPass::Released)?;
        let mut merged = self.execute(&released, from, size).await?;

        let combined_total = held_response.total() + merged.total();
        let mut hits = held_response.hits.hits;
        hits.append(&mut merged.hits.hits);
        merged.hits.hits = hits;
        merged.hits.total = TotalHits::Legacy(combined_total);
        Ok(merged)
    }

    fn wire_results(&self, response: StoreResponse) -> SearchResults {
        let total = response.total();
        let took = response.took;
        let aggregations = response.aggregations;
        let items = response
            .hits
            .hits
            .into_iter()
            .map(|hit| {
                let mut item = hit.source;
                if let (Value::Object(map), Some(highlight)) = (&mut item, hit.highlight) {
                    map.insert("es_highlight".to_string(), highlight);
                }
                item
            })
            .collect();
        SearchResults {
            total,
            items,
            aggregations,
            took,
        }
    }

    async fn agenda_results(
        &self,
        prepared: &SearchQuery,
        policy: Option<&SectionPolicy>,
        response: StoreResponse,
    ) -> Result<SearchResults> {
        let total = response.total();
        let took = response.took;
        let aggregations = response.aggregations;

        let mut page: Vec<(AgendaItem, HashMap<String, InnerHits>)> = Vec::new();
        let mut highlights: Vec<Option<Value>> = Vec::new();
        for hit in response.hits.hits {
            let item: AgendaItem = serde_json::from_value(hit.source)?;
            highlights.push(hit.highlight);
            page.push((item, hit.inner_hits));
        }

        self.correlator.process_page(&mut page).await;
        self.flag_event_matches(prepared, policy, &mut page).await;

        let mut items = Vec::with_capacity(page.len());
        for ((item, _), highlight) in page.into_iter().zip(highlights) {
            let mut value = serde_json::to_value(&item)?;
            if let (Value::Object(map), Some(highlight)) = (&mut value, highlight) {
                map.insert("es_highlight".to_string(), highlight);
            }
            items.push(value);
        }
        Ok(SearchResults {
            total,
            items,
            aggregations,
            took,
        })
    }

    /// Mark hits whose parent event also matches once dates are ignored
    ///
    /// A combined search over a bounded window may surface an item only
    /// through a child date. The page is rechecked against the events
    /// partition without the window; failures degrade to unmarked items.
    async fn flag_event_matches(
        &self,
        prepared: &SearchQuery,
        policy: Option<&SectionPolicy>,
        page: &mut [(AgendaItem, HashMap<String, InnerHits>)],
    ) {
        if prepared.params.item_type != ItemTypeFilter::Combined {
            return;
        }
        let bounded = prepared
            .params
            .date_range
            .as_ref()
            .map_or(false, |w| w.from.is_some() && w.to.is_some());
        if !bounded || page.is_empty() {
            return;
        }

        let mut recheck = prepared.clone();
        recheck.params.item_type = ItemTypeFilter::Events;
        recheck.params.item_type_requested = false;
        recheck.params.date_range = None;
        recheck.params.aggregations = false;
        recheck.params.highlight = false;
        if let Err(error) = self
            .compiler
            .compile(&mut recheck, policy, EmbargoPass::Standard)
        {
            debug!(%error, "event recheck compile failed");
            return;
        }

        let page_ids: Vec<String> = page.iter().map(|(item, _)| item.guid.clone()).collect();
        recheck.query.add_filter(ids(&page_ids));

        let body = SearchBody::new(recheck.query.to_query())
            .with_paging(0, page_ids.len())
            .with_source_exclude(vec!["*".to_string()]);
        match self.store.search(&self.agenda_index, &body).await {
            Ok(response) => {
                let matched: HashSet<String> = response.hit_ids().into_iter().collect();
                for (item, _) in page.iter_mut() {
                    if matched.contains(&item.guid) {
                        item.search_matched_event = Some(true);
                    }
                }
            }
            Err(error) => warn!(%error, "event recheck failed"),
        }
    }
}

fn sort_spec(section: Section) -> Value {
    match section {
        Section::Wire => json!([{"versioncreated": "desc"}]),
        Section::Agenda => json!([{"dates.start": "asc"}]),
    }
}

fn highlight_spec(fields: &[String]) -> Value {
    let mut field_specs = serde_json::Map::new();
    for field in fields {
        field_specs.insert(field.clone(), json!({}));
    }
    json!({
        "fields": field_specs,
        "pre_tags": ["<span class=\"es-highlight\">"],
        "post_tags": ["</span>"],
    })
}
