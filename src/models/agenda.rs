use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use uuid::Uuid;

/// An event or planning document on the agenda resource
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AgendaItem {
    /// Unique identifier
    #[serde(default)]
    pub guid: String,

    /// Explicit kind tag; legacy documents predate it
    pub item_type: Option<ItemKind>,

    /// Upstream event id, present on event documents
    pub event_id: Option<String>,

    /// Display name
    pub name: Option<String>,

    /// Keyword line
    pub slugline: Option<String>,

    /// Headline shown in lists
    pub headline: Option<String>,

    /// Lifecycle state, e.g. "scheduled" or "cancelled"
    pub state: Option<String>,

    /// Scheduled dates
    pub dates: Option<EventDates>,

    /// Dates the item surfaces under, derived from itself and its children
    #[serde(default)]
    pub display_dates: Vec<DisplayDate>,

    /// Child planning items
    #[serde(default)]
    pub planning_items: Vec<PlanningItem>,

    /// Flattened coverages of every child planning item
    #[serde(default)]
    pub coverages: Vec<Coverage>,

    /// Accounts that bookmarked the item
    #[serde(default)]
    pub bookmarks: Vec<Uuid>,

    /// Accounts watching the item
    #[serde(default)]
    pub watches: Vec<Uuid>,

    /// Version creation timestamp
    pub versioncreated: Option<DateTime<Utc>>,

    /// Per-request child-match flags, set by result correlation
    #[serde(rename = "_hits", default, skip_serializing_if = "Option::is_none")]
    pub hits: Option<MatchedHits>,

    /// Set when a combined search matched through the parent event
    #[serde(
        rename = "_search_matched_event",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub search_matched_event: Option<bool>,

    /// Fields this crate does not model, carried through untouched
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, EnumString, Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ItemKind {
    Event,
    Planning,
}

/// Scheduled dates of an agenda item
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EventDates {
    pub start: DateTime<Utc>,

    pub end: Option<DateTime<Utc>>,

    /// Date-only item; boundaries compare in local dates, not instants
    #[serde(default)]
    pub all_day: bool,

    /// IANA timezone the event was entered in
    pub tz: Option<String>,
}

/// One derived display date
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DisplayDate {
    pub date: DateTime<Utc>,
}

/// A child planning item
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct PlanningItem {
    #[serde(default)]
    pub guid: String,

    /// Alternate id some upstreams key planning by
    pub planning_id: Option<String>,

    pub name: Option<String>,

    pub slugline: Option<String>,

    pub description_text: Option<String>,

    /// Workflow state, e.g. "draft" or "scheduled"
    pub state: Option<String>,

    pub planning_date: Option<DateTime<Utc>>,

    /// Coverages commissioned under this planning item
    #[serde(default)]
    pub coverages: Vec<Coverage>,

    /// Named agenda groupings this planning item belongs to
    #[serde(default)]
    pub agendas: Vec<AgendaRef>,
}

/// A named agenda grouping reference
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct AgendaRef {
    pub id: Option<String>,
    pub name: Option<String>,
}

/// A commissioned coverage
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Coverage {
    #[serde(default)]
    pub coverage_id: String,

    /// Content type being produced, e.g. "text" or "picture"
    pub coverage_type: Option<String>,

    /// Production workflow state
    pub workflow_status: Option<WorkflowStatus>,

    /// Intention phrase, e.g. "coverage intended"
    pub coverage_status: Option<String>,

    /// Owning planning item
    pub planning_id: Option<String>,

    pub scheduled: Option<DateTime<Utc>>,

    pub slugline: Option<String>,

    /// Deliveries into the wire, freshest first
    #[serde(default)]
    pub deliveries: Vec<Delivery>,

    /// Mirror of the freshest public delivery
    pub delivery_id: Option<String>,

    /// Mirror of the freshest public delivery
    pub delivery_href: Option<String>,

    /// Mirror of the freshest public delivery
    pub publish_time: Option<DateTime<Utc>>,

    /// Accounts watching this coverage
    #[serde(default)]
    pub watches: Vec<Uuid>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, EnumString, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum WorkflowStatus {
    Draft,
    Assigned,
    Active,
    Completed,
    Cancelled,
    #[serde(other)]
    Unknown,
}

/// One delivery of a coverage into the wire
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Delivery {
    #[serde(default)]
    pub delivery_id: String,

    pub delivery_href: Option<String>,

    /// Monotonic per-coverage counter; higher means fresher
    #[serde(default)]
    pub sequence_no: i64,

    pub publish_time: Option<DateTime<Utc>>,

    pub delivery_state: Option<DeliveryState>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, EnumString, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum DeliveryState {
    Published,
    Corrected,
    InProgress,
    Killed,
    Recalled,
    #[serde(other)]
    Unknown,
}

impl DeliveryState {
    /// Check whether the delivery is visible to subscribers
    pub fn is_public(&self) -> bool {
        matches!(self, DeliveryState::Published | DeliveryState::Corrected)
    }
}

/// Flags written onto an item by result correlation
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct MatchedHits {
    /// Coverage ids the request actually matched
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub matched_coverages: Vec<String>,

    /// Planning item ids the request actually matched
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub matched_planning_items: Vec<String>,
}

/// One step of planning metadata propagation
#[derive(Debug, Clone)]
pub enum PlanningUpdate {
    NoOp,
    Add(Box<PlanningItem>),
    Update(Box<PlanningItem>),
    Remove(String),
    Cancel(String),
}

impl Coverage {
    /// Record a delivery and re-establish the ordering and mirror invariants
    ///
    /// Deliveries stay sorted by descending sequence_no. The coverage-level
    /// delivery_id/delivery_href/publish_time mirror the freshest delivery
    /// whose state is public, or clear when none is.
    pub fn record_delivery(&mut self, delivery: Delivery) {
        self.deliveries
            .retain(|d| d.delivery_id != delivery.delivery_id);
        self.deliveries.push(delivery);
        self.deliveries.sort_by(|a, b| b.sequence_no.cmp(&a.sequence_no));
        self.sync_delivery_mirror();
    }

    fn sync_delivery_mirror(&mut self) {
        let freshest_public = self
            .deliveries
            .iter()
            .find(|d| d.delivery_state.map_or(false, |s| s.is_public()));
        match freshest_public {
            Some(delivery) => {
                self.delivery_id = Some(delivery.delivery_id.clone());
                self.delivery_href = delivery.delivery_href.clone();
                self.publish_time = delivery.publish_time;
            }
            None => {
                self.delivery_id = None;
                self.delivery_href = None;
                self.publish_time = None;
            }
        }
    }

    /// Check whether production has finished
    pub fn is_completed(&self) -> bool {
        matches!(self.workflow_status, Some(WorkflowStatus::Completed))
    }
}

impl AgendaItem {
    /// Check whether the document describes an event
    pub fn is_event(&self) -> bool {
        match self.item_type {
            Some(kind) => kind == ItemKind::Event,
            // Legacy documents: an event id and no tag means event
            None => self.event_id.is_some(),
        }
    }

    /// Apply one planning propagation step and re-derive dependent fields
    pub fn apply_planning_update(&mut self, update: PlanningUpdate) {
        match update {
            PlanningUpdate::NoOp => return,
            PlanningUpdate::Add(planning) | PlanningUpdate::Update(planning) => {
                self.planning_items.retain(|p| p.guid != planning.guid);
                self.planning_items.push(*planning);
            }
            PlanningUpdate::Remove(guid) => {
                self.planning_items.retain(|p| p.guid != guid);
            }
            PlanningUpdate::Cancel(guid) => {
                for planning in self.planning_items.iter_mut().filter(|p| p.guid == guid) {
                    planning.state = Some("cancelled".to_string());
                    for coverage in planning.coverages.iter_mut() {
                        coverage.workflow_status = Some(WorkflowStatus::Cancelled);
                    }
                }
            }
        }
        self.rebuild_flattened_coverages();
        self.recompute_display_dates();
    }

    fn rebuild_flattened_coverages(&mut self) {
        self.coverages = self
            .planning_items
            .iter()
            .flat_map(|p| p.coverages.iter().cloned())
            .collect();
    }

    /// Re-derive display dates from the item and all child scheduled dates
    pub fn recompute_display_dates(&mut self) {
        let mut dates: Vec<DateTime<Utc>> = Vec::new();
        if let Some(event_dates) = &self.dates {
            dates.push(event_dates.start);
            if let Some(end) = event_dates.end {
                dates.push(end);
            }
        }
        for planning in &self.planning_items {
            if let Some(date) = planning.planning_date {
                dates.push(date);
            }
            for coverage in &planning.coverages {
                if let Some(scheduled) = coverage.scheduled {
                    dates.push(scheduled);
                }
            }
        }
        dates.sort();
        dates.dedup();
        self.display_dates = dates.into_iter().map(|date| DisplayDate { date }).collect();
    }
}
