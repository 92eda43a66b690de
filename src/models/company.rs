use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use super::product::Section;

/// A subscribing organisation
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct Company {
    /// Unique identifier
    pub id: Uuid,

    /// Display name
    #[validate(length(min = 1, max = 255))]
    pub name: String,

    /// Company type id, matched against the operator's company-type rules
    pub company_type: Option<String>,

    /// Exempt from the archive time limit
    #[serde(default)]
    pub archive_access: bool,

    /// May see items still under embargo
    #[serde(default)]
    pub embargoed_access: bool,

    /// Restricted to event content on the agenda resource
    #[serde(default)]
    pub events_only: bool,

    /// Product assignments with seat counts
    #[serde(default)]
    pub products: Vec<CompanyProduct>,

    /// Subscription is live
    #[serde(default = "default_enabled")]
    pub is_enabled: bool,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,
}

/// A product held by a company
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CompanyProduct {
    /// Product being held
    pub product_id: Uuid,

    /// Resource the assignment covers
    pub section: Section,

    /// Seat count; 0 means every user of the company is covered
    #[serde(default)]
    pub seats: u32,
}

impl Company {
    /// Create a new company
    pub fn new(name: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            name,
            company_type: None,
            archive_access: false,
            embargoed_access: false,
            events_only: false,
            products: Vec::new(),
            is_enabled: true,
            created_at: Utc::now(),
        }
    }

    /// Product refs held for a section
    pub fn section_products(&self, section: Section) -> impl Iterator<Item = &CompanyProduct> {
        self.products.iter().filter(move |p| p.section == section)
    }

    /// Check whether a product id is held by this company
    pub fn holds_product(&self, product_id: &Uuid) -> bool {
        self.products.iter().any(|p| &p.product_id == product_id)
    }
}

fn default_enabled() -> bool {
    true
}
