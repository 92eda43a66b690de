//! Shared fixtures for the integration suites
//!
//! Builds a small entitlement directory and a canned document store so
//! suites can drive the full pipeline without a live backend.

use async_trait::async_trait;
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::Mutex;
use uuid::Uuid;

use newsdesk_core::config::{
    Config, FacetsConfig, NestedFacetEntry, ObservabilityConfig, SearchConfig, StoreConfig,
};
use newsdesk_core::entitlements::InMemoryDirectory;
use newsdesk_core::error::Result;
use newsdesk_core::models::{Company, CompanyProduct, Product, Section, User, UserRole};
use newsdesk_core::store::{DocumentStore, SearchBody, StoreResponse};

/// Configuration with one nested agenda facet and one company-type rule
pub fn test_config() -> Config {
    let mut facets = FacetsConfig::default();
    facets.agenda_nested.push(NestedFacetEntry {
        name: "topics".to_string(),
        parent: "subject".to_string(),
        field: "scheme".to_string(),
        value: "topics".to_string(),
        searchfield: "code".to_string(),
    });
    Config {
        store: StoreConfig {
            base_url: "http://localhost:9200".to_string(),
            wire_index: "items".to_string(),
            agenda_index: "agenda".to_string(),
            username: None,
            password_env: None,
            timeout_secs: 5,
        },
        search: SearchConfig::default(),
        facets,
        company_types: Vec::new(),
        observability: ObservabilityConfig::default(),
    }
}

/// Store double that logs requests and replays canned responses
pub struct CannedStore {
    requests: Mutex<Vec<(String, Value)>>,
    responses: Mutex<VecDeque<StoreResponse>>,
}

impl CannedStore {
    pub fn new(responses: Vec<StoreResponse>) -> Self {
        Self {
            requests: Mutex::new(Vec::new()),
            responses: Mutex::new(responses.into()),
        }
    }

    pub fn empty() -> Self {
        Self::new(Vec::new())
    }

    /// Request bodies in call order, as serialized JSON
    pub fn requests(&self) -> Vec<(String, Value)> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl DocumentStore for CannedStore {
    async fn search(&self, index: &str, body: &SearchBody) -> Result<StoreResponse> {
        let serialized = serde_json::to_value(body).expect("serializable body");
        self.requests
            .lock()
            .unwrap()
            .push((index.to_string(), serialized));
        Ok(self
            .responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_default())
    }
}

/// Parse a canned store response from JSON
pub fn response(value: Value) -> StoreResponse {
    serde_json::from_value(value).expect("well-formed response")
}

/// Accounts and products the suites share
pub struct Fixture {
    pub directory: InMemoryDirectory,
    pub admin_id: Uuid,
    pub member_id: Uuid,
    pub weather_product_id: Uuid,
}

/// One company holding a coded product and a query-driven product on each
/// section, an admin and an entitled member
pub fn fixture() -> Fixture {
    let directory = InMemoryDirectory::new();

    let mut general = Product::new("General News".to_string(), Section::Wire);
    general.code = Some("gen".to_string());
    let general_id = general.id;
    directory.add_product(general);

    let mut weather = Product::new("Weather".to_string(), Section::Wire);
    weather.query = Some("headline:weather".to_string());
    let weather_product_id = weather.id;
    directory.add_product(weather);

    let mut diary = Product::new("Sport Diary".to_string(), Section::Agenda);
    diary.planning_item_query = Some("slugline:sport".to_string());
    let diary_id = diary.id;
    directory.add_product(diary);

    let mut company = Company::new("Example Media".to_string());
    for (product_id, section) in [
        (general_id, Section::Wire),
        (weather_product_id, Section::Wire),
        (diary_id, Section::Agenda),
    ] {
        company.products.push(CompanyProduct {
            product_id,
            section,
            seats: 0,
        });
    }
    let company_id = company.id;
    directory.add_company(company);

    let admin = User::new(
        "ops@example.com".to_string(),
        "Dana".to_string(),
        "Ilic".to_string(),
        UserRole::Administrator,
    );
    let admin_id = admin.id;
    directory.add_user(admin);

    let mut member = User::new(
        "reader@example.com".to_string(),
        "Femi".to_string(),
        "Adeyemi".to_string(),
        UserRole::Member,
    );
    member.company = Some(company_id);
    let member_id = member.id;
    directory.add_user(member);

    Fixture {
        directory,
        admin_id,
        member_id,
        weather_product_id,
    }
}
