use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use uuid::Uuid;
use validator::Validate;

/// Content resource a request or entitlement is scoped to
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, EnumString, Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Section {
    Wire,
    Agenda,
}

/// A sellable content package
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct Product {
    /// Unique identifier
    pub id: Uuid,

    /// Display name
    #[validate(length(min = 1, max = 255))]
    pub name: String,

    /// Short description shown in the admin UI
    pub description: Option<String>,

    /// Resource this product entitles
    pub section: Section,

    /// Free-text query carving the product's slice of the index
    pub query: Option<String>,

    /// Agenda-only query matched against child planning items
    pub planning_item_query: Option<String>,

    /// Upstream code stamped on matching items at ingest
    pub code: Option<String>,

    /// Navigation tiles this product appears under
    #[serde(default)]
    pub navigations: Vec<Uuid>,

    /// Product is live
    #[serde(default = "default_enabled")]
    pub is_enabled: bool,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,
}

impl Product {
    /// Create a new product
    pub fn new(name: String, section: Section) -> Self {
        Self {
            id: Uuid::new_v4(),
            name,
            description: None,
            section,
            query: None,
            planning_item_query: None,
            code: None,
            navigations: Vec::new(),
            is_enabled: true,
            created_at: Utc::now(),
        }
    }

    /// Check whether the product appears under any of the given navigations
    pub fn matches_navigation(&self, navigations: &[Uuid]) -> bool {
        self.navigations.iter().any(|n| navigations.contains(n))
    }
}

fn default_enabled() -> bool {
    true
}
