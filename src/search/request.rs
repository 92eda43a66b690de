use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::str::FromStr;
use strum::{Display, EnumString};
use uuid::Uuid;
use validator::Validate;

use super::clauses::BoolQuery;
use super::dates::{parse_bound, parse_timezone, DateRange};
use crate::error::{CoreError, Result};
use crate::models::{AdvancedQuery, Company, DateWindow, Product, Section, Topic, User};

/// Raw request arguments as the edge hands them over
///
/// Everything arrives as strings; parsing failures surface as bad
/// parameters before any store round-trip.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct SearchArgs {
    /// Free-text query
    #[validate(length(max = 2000))]
    #[serde(default)]
    pub q: Option<String>,

    /// JSON object of facet name to selected values
    #[serde(default)]
    pub filter: Option<String>,

    /// Restrict to saved items of the requesting account
    #[serde(default)]
    pub bookmarks: bool,

    /// Comma-separated navigation ids
    #[serde(default)]
    pub navigation: Option<String>,

    /// Requested product id
    #[serde(default)]
    pub product: Option<String>,

    #[serde(default)]
    pub date_from: Option<String>,

    #[serde(default)]
    pub date_to: Option<String>,

    /// IANA timezone the date window is local to
    #[serde(default)]
    pub timezone: Option<String>,

    /// Fallback zone as minutes east of UTC
    #[serde(default)]
    pub timezone_offset: Option<i32>,

    /// JSON advanced-search block
    #[serde(default)]
    pub advanced: Option<String>,

    /// Agenda partition: "events", "planning" or absent for both
    #[serde(default)]
    pub item_type: Option<String>,

    #[serde(default)]
    pub from: usize,

    #[serde(default)]
    pub size: Option<usize>,

    /// Suppress facet aggregations
    #[serde(default)]
    pub no_aggregations: bool,

    /// Embargo-entitled callers: surface held items ahead of the rest
    #[serde(default)]
    pub prepend_embargoed: bool,

    /// Ask the store to highlight matched text
    #[serde(default)]
    pub es_highlight: bool,

    /// Admin-only: evaluate in another account's scope
    #[serde(default)]
    pub user: Option<String>,
}

/// Agenda partition selector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, EnumString, Display)]
#[strum(serialize_all = "lowercase")]
pub enum ItemTypeFilter {
    Events,
    Planning,
    #[default]
    Combined,
}

/// Typed request parameters
#[derive(Debug, Clone)]
pub struct SearchParams {
    pub q: Option<String>,
    pub filters: BTreeMap<String, Vec<String>>,
    pub bookmarks: bool,
    pub navigation: Vec<Uuid>,
    pub product: Option<Uuid>,
    pub date_range: Option<DateRange>,
    /// Creation-date window stored on topics
    pub created: Option<DateWindow>,
    pub advanced: Option<AdvancedQuery>,
    pub item_type: ItemTypeFilter,
    /// Partition was requested explicitly rather than defaulted
    pub item_type_requested: bool,
    pub from: usize,
    pub size: Option<usize>,
    pub aggregations: bool,
    pub prepend_embargoed: bool,
    pub highlight: bool,
    pub impersonate: Option<Uuid>,
}

impl Default for SearchParams {
    fn default() -> Self {
        Self {
            q: None,
            filters: BTreeMap::new(),
            bookmarks: false,
            navigation: Vec::new(),
            product: None,
            date_range: None,
            created: None,
            advanced: None,
            item_type: ItemTypeFilter::Combined,
            item_type_requested: false,
            from: 0,
            size: None,
            aggregations: true,
            prepend_embargoed: false,
            highlight: false,
            impersonate: None,
        }
    }
}

impl SearchParams {
    /// Parse and validate raw arguments
    pub fn from_args(args: &SearchArgs) -> Result<Self> {
        args.validate()?;

        let q = args
            .q
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(sanitize_query);

        let filters = match args.filter.as_deref().map(str::trim) {
            Some(raw) if !raw.is_empty() => parse_filters(raw)?,
            _ => BTreeMap::new(),
        };

        let navigation = parse_id_list(args.navigation.as_deref(), "navigation")?;
        let product = parse_id(args.product.as_deref(), "product")?;
        let impersonate = parse_id(args.user.as_deref(), "user")?;

        let advanced = match args.advanced.as_deref().map(str::trim) {
            Some(raw) if !raw.is_empty() => {
                let block: AdvancedQuery = serde_json::from_str(raw)
                    .map_err(|e| CoreError::BadParameter(format!("Invalid advanced block: {}", e)))?;
                if block.is_empty() {
                    None
                } else {
                    Some(block)
                }
            }
            _ => None,
        };

        let (item_type, item_type_requested) =
            match args.item_type.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
                Some(raw) => (
                    ItemTypeFilter::from_str(raw).map_err(|_| {
                        CoreError::BadParameter(format!("Invalid itemType: {}", raw))
                    })?,
                    true,
                ),
                None => (ItemTypeFilter::Combined, false),
            };

        Ok(Self {
            q,
            filters,
            bookmarks: args.bookmarks,
            navigation,
            product,
            date_range: parse_date_range(args)?,
            created: None,
            advanced,
            item_type,
            item_type_requested,
            from: args.from,
            size: args.size,
            aggregations: !args.no_aggregations,
            prepend_embargoed: args.prepend_embargoed,
            highlight: args.es_highlight,
            impersonate,
        })
    }

    /// Build parameters from a stored topic
    ///
    /// The topic's saved fields stand in for request arguments. Paging,
    /// saved-item and aggregation concerns do not apply to matching.
    pub fn from_topic(topic: &Topic) -> Self {
        Self {
            q: topic
                .query
                .as_deref()
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(sanitize_query),
            filters: topic.filter.clone(),
            navigation: topic.navigation.clone(),
            created: topic.created.clone().filter(|w| !w.is_empty()),
            advanced: topic.advanced.clone().filter(|a| !a.is_empty()),
            aggregations: false,
            ..Self::default()
        }
    }
}

/// Everything one compiled search carries through the stage pipeline
#[derive(Debug, Clone)]
pub struct SearchQuery {
    /// Resource being searched
    pub section: Section,

    /// Account the search runs as
    pub user: Option<User>,

    /// Company scope of that account
    pub company: Option<Company>,

    /// Operator privileges apply
    pub is_admin: bool,

    /// Products in scope, already narrowed to the request
    pub products: Vec<Product>,

    /// Typed request parameters
    pub params: SearchParams,

    /// Accumulated boolean tree
    pub query: BoolQuery,

    /// Aggregation spec, attached late in the pipeline
    pub aggs: Option<Value>,

    /// Source fields stripped from returned documents
    pub source_exclude: Vec<String>,

    /// Highlight spec, attached when requested
    pub highlight: Option<Value>,
}

impl SearchQuery {
    /// Create a fresh compile context
    pub fn new(section: Section, params: SearchParams) -> Self {
        Self {
            section,
            user: None,
            company: None,
            is_admin: false,
            products: Vec::new(),
            params,
            query: BoolQuery::default(),
            aggs: None,
            source_exclude: Vec::new(),
            highlight: None,
        }
    }

    /// Set the resolved account
    pub fn with_user(mut self, user: User) -> Self {
        self.user = Some(user);
        self
    }

    /// Set the resolved company
    pub fn with_company(mut self, company: Company) -> Self {
        self.company = Some(company);
        self
    }

    /// Mark operator privileges
    pub fn with_admin(mut self, is_admin: bool) -> Self {
        self.is_admin = is_admin;
        self
    }

    /// Set the entitled product scope
    pub fn with_products(mut self, products: Vec<Product>) -> Self {
        self.products = products;
        self
    }

    /// Id of the account the search runs as
    pub fn user_id(&self) -> Option<Uuid> {
        self.user.as_ref().map(|u| u.id)
    }

    /// Company restricts the agenda resource to events
    pub fn events_only_company(&self) -> bool {
        self.company.as_ref().map_or(false, |c| c.events_only)
    }
}

static SLASH: Lazy<Regex> = Lazy::new(|| Regex::new(r"\\?/").expect("slash pattern"));

/// Make user-typed query text safe for the store's query parser
///
/// Bare slashes would start a regular expression; unbalanced quotes fail
/// the whole parse.
pub fn sanitize_query(q: &str) -> String {
    let mut out = SLASH
        .replace_all(q, |caps: &regex::Captures<'_>| {
            let matched = &caps[0];
            if matched.starts_with('\\') {
                matched.to_string()
            } else {
                "\\/".to_string()
            }
        })
        .into_owned();
    if out.matches('"').count() % 2 == 1 {
        if let Some(pos) = out.rfind('"') {
            out.remove(pos);
        }
    }
    out
}

fn parse_filters(raw: &str) -> Result<BTreeMap<String, Vec<String>>> {
    let parsed: BTreeMap<String, Value> = serde_json::from_str(raw)
        .map_err(|e| CoreError::BadParameter(format!("Invalid filter: {}", e)))?;

    let mut filters = BTreeMap::new();
    for (facet, value) in parsed {
        let values: Vec<String> = match value {
            Value::Array(items) => items.into_iter().filter_map(filter_value).collect(),
            Value::Null => Vec::new(),
            other => filter_value(other).into_iter().collect(),
        };
        if !values.is_empty() {
            filters.insert(facet, values);
        }
    }
    Ok(filters)
}

fn filter_value(value: Value) -> Option<String> {
    match value {
        Value::String(s) => {
            let trimmed = s.trim().to_string();
            (!trimmed.is_empty()).then_some(trimmed)
        }
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn parse_id(raw: Option<&str>, what: &str) -> Result<Option<Uuid>> {
    match raw.map(str::trim).filter(|s| !s.is_empty()) {
        Some(raw) => Uuid::parse_str(raw)
            .map(Some)
            .map_err(|_| CoreError::BadParameter(format!("Invalid {} id: {}", what, raw))),
        None => Ok(None),
    }
}

fn parse_id_list(raw: Option<&str>, what: &str) -> Result<Vec<Uuid>> {
    let mut ids = Vec::new();
    if let Some(raw) = raw {
        for part in raw.split(',').map(str::trim).filter(|s| !s.is_empty()) {
            let id = Uuid::parse_str(part)
                .map_err(|_| CoreError::BadParameter(format!("Invalid {} id: {}", what, part)))?;
            ids.push(id);
        }
    }
    Ok(ids)
}

fn parse_date_range(args: &SearchArgs) -> Result<Option<DateRange>> {
    let from = args.date_from.as_deref().map(str::trim).filter(|s| !s.is_empty());
    let to = args.date_to.as_deref().map(str::trim).filter(|s| !s.is_empty());
    if from.is_none() && to.is_none() {
        return Ok(None);
    }

    let timezone = match args.timezone.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        Some(name) => Some(parse_timezone(name)?),
        None => None,
    };

    Ok(Some(DateRange {
        from: from.map(parse_bound).transpose()?,
        to: to.map(parse_bound).transpose()?,
        timezone,
        offset_minutes: args.timezone_offset,
    }))
}
