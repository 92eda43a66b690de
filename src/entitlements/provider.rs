use async_trait::async_trait;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use crate::error::Result;
use crate::models::{Company, Product, Section, User};

/// Standing policy attached to a section
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SectionPolicy {
    /// Section the policy binds
    pub section: Section,

    /// Query every search on the section must satisfy
    pub filter_query: Option<String>,
}

/// Serves the directory entities entitlement decisions draw on
#[async_trait]
pub trait EntitlementProvider: Send + Sync {
    async fn get_user(&self, id: &Uuid) -> Result<Option<User>>;

    async fn get_company(&self, id: &Uuid) -> Result<Option<Company>>;

    /// Fetch products by id, preserving input order
    async fn get_products(&self, ids: &[Uuid]) -> Result<Vec<Product>>;

    /// Every live product of a section
    async fn get_section_products(&self, section: Section) -> Result<Vec<Product>>;

    async fn get_section_policy(&self, section: Section) -> Result<Option<SectionPolicy>>;
}

/// In-memory directory (for embedding and testing)
#[derive(Clone)]
pub struct InMemoryDirectory {
    users: Arc<DashMap<Uuid, User>>,
    companies: Arc<DashMap<Uuid, Company>>,
    products: Arc<DashMap<Uuid, Product>>,
    policies: Arc<DashMap<Section, SectionPolicy>>,
}

impl InMemoryDirectory {
    pub fn new() -> Self {
        Self {
            users: Arc::new(DashMap::new()),
            companies: Arc::new(DashMap::new()),
            products: Arc::new(DashMap::new()),
            policies: Arc::new(DashMap::new()),
        }
    }

    pub fn add_user(&self, user: User) {
        self.users.insert(user.id, user);
    }

    pub fn add_company(&self, company: Company) {
        self.companies.insert(company.id, company);
    }

    pub fn add_product(&self, product: Product) {
        self.products.insert(product.id, product);
    }

    pub fn set_policy(&self, policy: SectionPolicy) {
        self.policies.insert(policy.section, policy);
    }
}

impl Default for InMemoryDirectory {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EntitlementProvider for InMemoryDirectory {
    async fn get_user(&self, id: &Uuid) -> Result<Option<User>> {
        Ok(self.users.get(id).map(|entry| entry.clone()))
    }

    async fn get_company(&self, id: &Uuid) -> Result<Option<Company>> {
        Ok(self.companies.get(id).map(|entry| entry.clone()))
    }

    async fn get_products(&self, ids: &[Uuid]) -> Result<Vec<Product>> {
        Ok(ids
            .iter()
            .filter_map(|id| self.products.get(id).map(|entry| entry.clone()))
            .collect())
    }

    async fn get_section_products(&self, section: Section) -> Result<Vec<Product>> {
        let mut products: Vec<Product> = self
            .products
            .iter()
            .map(|entry| entry.value().clone())
            .filter(|p| p.section == section && p.is_enabled)
            .collect();
        // Map iteration order is arbitrary; keep compiled clauses stable
        products.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
        Ok(products)
    }

    async fn get_section_policy(&self, section: Section) -> Result<Option<SectionPolicy>> {
        Ok(self.policies.get(&section).map(|entry| entry.clone()))
    }
}
