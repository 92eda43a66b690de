use serde::{Deserialize, Serialize};

/// Main configuration snapshot
///
/// Loaded once at start-up and passed by reference from there on. Request
/// handling never mutates it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Document store configuration
    pub store: StoreConfig,

    /// Search tuning
    #[serde(default)]
    pub search: SearchConfig,

    /// Facet registry configuration
    #[serde(default)]
    pub facets: FacetsConfig,

    /// Per-company-type query rules
    #[serde(default)]
    pub company_types: Vec<CompanyTypeRule>,

    /// Observability configuration
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

impl Config {
    /// Load configuration from file and environment
    pub fn load() -> Result<Self, config::ConfigError> {
        let config_path =
            std::env::var("CONFIG_PATH").unwrap_or_else(|_| "config/default.toml".to_string());

        config::Config::builder()
            // Start with default values
            .add_source(config::File::from_str(
                include_str!("../config/default.toml"),
                config::FileFormat::Toml,
            ))
            // Override with config file if it exists
            .add_source(config::File::with_name(&config_path).required(false))
            // Override with environment variables (prefix: NEWSDESK_)
            .add_source(
                config::Environment::with_prefix("NEWSDESK")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Document store base URL
    #[serde(default = "default_store_url")]
    pub base_url: String,

    /// Index holding wire items
    #[serde(default = "default_wire_index")]
    pub wire_index: String,

    /// Index holding agenda items
    #[serde(default = "default_agenda_index")]
    pub agenda_index: String,

    /// Basic auth username
    pub username: Option<String>,

    /// Env var holding the basic auth password
    pub password_env: Option<String>,

    /// Request timeout (seconds)
    #[serde(default = "default_store_timeout")]
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Default operator for free-text queries
    #[serde(default = "default_operator")]
    pub default_operator: String,

    /// Wildcard analysis in free-text queries
    #[serde(default)]
    pub analyze_wildcard: bool,

    /// Page size ceiling
    #[serde(default = "default_max_page_size")]
    pub max_page_size: usize,

    /// Deep-paging ceiling; offsets at or past it are rejected
    #[serde(default = "default_max_result_window")]
    pub max_result_window: usize,

    /// Archive window for time-limited companies (days)
    #[serde(default = "default_time_limit_days")]
    pub time_limit_days: u32,

    /// Bucket count per facet aggregation
    #[serde(default = "default_aggregation_size")]
    pub aggregation_size: usize,

    /// Advanced-search field set for wire requests
    #[serde(default = "default_wire_advanced_fields")]
    pub wire_advanced_fields: Vec<String>,

    /// Advanced-search field set for agenda requests
    #[serde(default = "default_agenda_advanced_fields")]
    pub agenda_advanced_fields: Vec<String>,

    /// Fields the highlighter runs over
    #[serde(default = "default_highlight_fields")]
    pub highlight_fields: Vec<String>,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            default_operator: default_operator(),
            analyze_wildcard: false,
            max_page_size: default_max_page_size(),
            max_result_window: default_max_result_window(),
            time_limit_days: default_time_limit_days(),
            aggregation_size: default_aggregation_size(),
            wire_advanced_fields: default_wire_advanced_fields(),
            agenda_advanced_fields: default_agenda_advanced_fields(),
            highlight_fields: default_highlight_fields(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FacetsConfig {
    /// Facet names exposed on the wire resource
    #[serde(default = "default_wire_facets")]
    pub wire: Vec<String>,

    /// Facet names exposed on the agenda resource
    #[serde(default = "default_agenda_facets")]
    pub agenda: Vec<String>,

    /// Nested facet definitions for the wire resource
    #[serde(default)]
    pub wire_nested: Vec<NestedFacetEntry>,

    /// Nested facet definitions for the agenda resource
    #[serde(default)]
    pub agenda_nested: Vec<NestedFacetEntry>,
}

impl Default for FacetsConfig {
    fn default() -> Self {
        Self {
            wire: default_wire_facets(),
            agenda: default_agenda_facets(),
            wire_nested: Vec::new(),
            agenda_nested: Vec::new(),
        }
    }
}

/// A facet carved out of a shared nested parent by a discriminator value
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NestedFacetEntry {
    /// Facet name as requested by clients
    pub name: String,

    /// Nested parent path, e.g. "subject"
    pub parent: String,

    /// Discriminator field under the parent, e.g. "scheme"
    pub field: String,

    /// Discriminator value selecting this facet's entries
    pub value: String,

    /// Field under the parent that carries the facet values
    pub searchfield: String,
}

/// Standing query rule attached to a company type
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompanyTypeRule {
    /// Company type id, matched against `Company::company_type`
    pub id: String,

    /// Query every search from this company type must satisfy
    pub must: Option<String>,

    /// Query no result for this company type may satisfy
    pub must_not: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    /// Log level
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Enable JSON logging
    #[serde(default)]
    pub json_logs: bool,

    /// Service name
    #[serde(default = "default_service_name")]
    pub service_name: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            json_logs: false,
            service_name: default_service_name(),
        }
    }
}

// Default value functions
fn default_store_url() -> String {
    "http://localhost:9200".to_string()
}

fn default_wire_index() -> String {
    "items".to_string()
}

fn default_agenda_index() -> String {
    "agenda".to_string()
}

fn default_store_timeout() -> u64 {
    30
}

fn default_operator() -> String {
    "AND".to_string()
}

fn default_max_page_size() -> usize {
    100
}

fn default_max_result_window() -> usize {
    1000
}

fn default_time_limit_days() -> u32 {
    90
}

fn default_aggregation_size() -> usize {
    50
}

fn default_wire_advanced_fields() -> Vec<String> {
    vec![
        "headline".to_string(),
        "slugline".to_string(),
        "body_html".to_string(),
    ]
}

fn default_agenda_advanced_fields() -> Vec<String> {
    vec![
        "name".to_string(),
        "headline".to_string(),
        "slugline".to_string(),
        "description_text".to_string(),
    ]
}

fn default_highlight_fields() -> Vec<String> {
    vec![
        "headline".to_string(),
        "slugline".to_string(),
        "body_html".to_string(),
    ]
}

fn default_wire_facets() -> Vec<String> {
    vec![
        "service".to_string(),
        "subject".to_string(),
        "genre".to_string(),
        "urgency".to_string(),
        "place".to_string(),
    ]
}

fn default_agenda_facets() -> Vec<String> {
    vec![
        "calendar".to_string(),
        "location".to_string(),
        "service".to_string(),
        "subject".to_string(),
        "urgency".to_string(),
        "place".to_string(),
        "coverage".to_string(),
        "agendas".to_string(),
    ]
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_service_name() -> String {
    "newsdesk-core".to_string()
}
