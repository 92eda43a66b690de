use futures::future::join_all;
use serde_json::{json, Map, Value};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

use super::repository::TopicRepository;
use crate::config::Config;
use crate::entitlements::{entitled_products, EntitlementProvider, SectionPolicy};
use crate::error::Result;
use crate::models::{Company, Product, Section, Topic, User};
use crate::search::compiler::QueryCompiler;
use crate::search::request::{SearchParams, SearchQuery};
use crate::store::{DocumentStore, SearchBody};

/// Why one topic was left out of a matching batch
#[derive(Debug, thiserror::Error)]
pub enum SkipReason {
    #[error("owner not found")]
    MissingOwner,

    #[error("owner account is disabled")]
    OwnerDisabled,

    #[error("owner has no company")]
    MissingCompany,

    #[error("company account is disabled")]
    CompanyDisabled,

    #[error("owner has no entitled products")]
    NotEntitled,
}

/// Reference data resolved once per batch
///
/// Per-topic compilation reads from here only, so it stays synchronous
/// whatever the batch size.
struct BatchContext {
    policy: Option<SectionPolicy>,
    users: HashMap<Uuid, User>,
    companies: HashMap<Uuid, Company>,
    products_by_id: HashMap<Uuid, Product>,
    section_products: Vec<Product>,
}

/// Finds the saved topics an item matches
///
/// Each topic's stored search is recompiled in its owner's scope and
/// registered as one bucket of a filters aggregation, keyed by the topic
/// id. The whole batch costs a single store round-trip; a bucket that
/// counted the item is a match. A topic that cannot be compiled is
/// skipped, never fatal.
pub struct TopicMatcher {
    store: Arc<dyn DocumentStore>,
    provider: Arc<dyn EntitlementProvider>,
    compiler: QueryCompiler,
    wire_index: String,
    agenda_index: String,
}

impl TopicMatcher {
    pub fn new(
        config: &Config,
        store: Arc<dyn DocumentStore>,
        provider: Arc<dyn EntitlementProvider>,
    ) -> Self {
        Self {
            compiler: QueryCompiler::new(config),
            wire_index: config.store.wire_index.clone(),
            agenda_index: config.store.agenda_index.clone(),
            store,
            provider,
        }
    }

    /// Match an item against every topic saved for the section
    pub async fn match_item(
        &self,
        section: Section,
        item_id: &str,
        repository: &dyn TopicRepository,
    ) -> Result<Vec<Uuid>> {
        let topics = repository.list_topics(section).await?;
        self.matching_topics(section, item_id, &topics).await
    }

    /// Match an item against the given topics
    ///
    /// Returns the matching topic ids in input order.
    pub async fn matching_topics(
        &self,
        section: Section,
        item_id: &str,
        topics: &[Topic],
    ) -> Result<Vec<Uuid>> {
        if topics.is_empty() {
            return Ok(Vec::new());
        }
        let ctx = self.load_context(section, topics).await?;

        let mut buckets = Map::new();
        for topic in topics {
            match self.topic_query(section, &ctx, topic) {
                Ok(query) => {
                    buckets.insert(topic.id.to_string(), query);
                }
                Err(reason) => debug!(topic = %topic.id, %reason, "topic skipped"),
            }
        }
        if buckets.is_empty() {
            return Ok(Vec::new());
        }
        let compiled = buckets.len();

        // The item-id filter caps every bucket count at 0 or 1
        let body = SearchBody::new(json!({
            "bool": {"filter": [{"term": {"_id": item_id}}]}
        }))
        .with_paging(0, 0)
        .with_aggs(json!({"topics": {"filters": {"filters": buckets}}}));

        let response = self.store.search(self.index(section), &body).await?;
        let counts = response
            .aggregations
            .as_ref()
            .and_then(|aggs| aggs["topics"]["buckets"].as_object())
            .cloned()
            .unwrap_or_default();

        let matched: Vec<Uuid> = topics
            .iter()
            .filter(|topic| {
                counts
                    .get(&topic.id.to_string())
                    .and_then(|bucket| bucket["doc_count"].as_u64())
                    .map_or(false, |count| count > 0)
            })
            .map(|topic| topic.id)
            .collect();

        info!(
            section = %section,
            item = %item_id,
            topics = topics.len(),
            compiled,
            matched = matched.len(),
            "topic matching completed"
        );
        Ok(matched)
    }

    fn index(&self, section: Section) -> &str {
        match section {
            Section::Wire => &self.wire_index,
            Section::Agenda => &self.agenda_index,
        }
    }

    async fn load_context(&self, section: Section, topics: &[Topic]) -> Result<BatchContext> {
        let policy = self.provider.get_section_policy(section).await?;
        let section_products = self.provider.get_section_products(section).await?;

        let owner_ids: HashSet<Uuid> = topics.iter().filter_map(|t| t.user).collect();
        let mut users = HashMap::new();
        for fetched in join_all(owner_ids.iter().map(|id| self.provider.get_user(id))).await {
            if let Some(user) = fetched? {
                users.insert(user.id, user);
            }
        }

        let company_ids: HashSet<Uuid> = users.values().filter_map(|u| u.company).collect();
        let mut companies = HashMap::new();
        for fetched in join_all(company_ids.iter().map(|id| self.provider.get_company(id))).await {
            if let Some(company) = fetched? {
                companies.insert(company.id, company);
            }
        }

        let product_ids: Vec<Uuid> = companies
            .values()
            .flat_map(|c| c.products.iter().map(|p| p.product_id))
            .collect::<HashSet<_>>()
            .into_iter()
            .collect();
        let products_by_id = self
            .provider
            .get_products(&product_ids)
            .await?
            .into_iter()
            .map(|p| (p.id, p))
            .collect();

        Ok(BatchContext {
            policy,
            users,
            companies,
            products_by_id,
            section_products,
        })
    }

    /// Compile one topic into its filter bucket
    ///
    /// Scope resolution mirrors an interactive request run as the topic's
    /// owner, with permission failures downgraded to skips.
    fn topic_query(
        &self,
        section: Section,
        ctx: &BatchContext,
        topic: &Topic,
    ) -> std::result::Result<Value, SkipReason> {
        let owner = topic.user.ok_or(SkipReason::MissingOwner)?;
        let user = ctx.users.get(&owner).ok_or(SkipReason::MissingOwner)?;
        if !user.is_enabled {
            return Err(SkipReason::OwnerDisabled);
        }
        let is_admin = user.is_admin();

        let company = user.company.and_then(|id| ctx.companies.get(&id));
        if let Some(company) = company {
            if !company.is_enabled {
                return Err(SkipReason::CompanyDisabled);
            }
        }

        let params = SearchParams::from_topic(topic);
        let products = if is_admin {
            if params.navigation.is_empty() {
                Vec::new()
            } else {
                ctx.section_products
                    .iter()
                    .filter(|p| p.matches_navigation(&params.navigation))
                    .cloned()
                    .collect()
            }
        } else {
            let company = company.ok_or(SkipReason::MissingCompany)?;
            let mut entitled = entitled_products(user, company, &ctx.products_by_id, section);
            if !params.navigation.is_empty() {
                entitled.retain(|p| p.matches_navigation(&params.navigation));
            }
            if entitled.is_empty() {
                return Err(SkipReason::NotEntitled);
            }
            entitled
        };

        let mut query = SearchQuery::new(section, params)
            .with_user(user.clone())
            .with_admin(is_admin)
            .with_products(products);
        if let Some(company) = company {
            query = query.with_company(company.clone());
        }

        self.compiler.compile_topic(&mut query, ctx.policy.as_ref());
        Ok(query.query.to_query())
    }
}
