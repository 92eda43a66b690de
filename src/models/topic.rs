use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use strum::{Display, EnumString};
use uuid::Uuid;
use validator::Validate;

use super::product::Section;

/// A saved search subscribed for push notification
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct Topic {
    /// Unique identifier
    pub id: Uuid,

    /// Label shown in the follow list
    #[validate(length(min = 1, max = 255))]
    pub label: String,

    /// Owning account; entitlements are evaluated in their scope
    pub user: Option<Uuid>,

    /// Owning company
    pub company: Option<Uuid>,

    /// Resource the topic searches
    pub topic_type: Section,

    /// Stored free-text query
    pub query: Option<String>,

    /// Stored structured filters, facet name to selected values
    #[serde(default)]
    pub filter: BTreeMap<String, Vec<String>>,

    /// Stored advanced-search block
    pub advanced: Option<AdvancedQuery>,

    /// Stored creation-date window
    pub created: Option<DateWindow>,

    /// Navigation scope pinned when the topic was saved
    #[serde(default)]
    pub navigation: Vec<Uuid>,

    /// Shared with the whole company
    #[serde(default)]
    pub is_global: bool,

    /// Accounts following this topic
    #[serde(default)]
    pub subscribers: Vec<TopicSubscriber>,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,

    /// Last update timestamp
    pub updated_at: DateTime<Utc>,
}

impl Topic {
    /// Create a new topic
    pub fn new(label: String, user: Uuid, topic_type: Section) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            label,
            user: Some(user),
            company: None,
            topic_type,
            query: None,
            filter: BTreeMap::new(),
            advanced: None,
            created: None,
            navigation: Vec::new(),
            is_global: false,
            subscribers: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Ids of every subscribed account
    pub fn subscriber_ids(&self) -> Vec<Uuid> {
        self.subscribers.iter().map(|s| s.user_id).collect()
    }

    /// Check whether anybody is following
    pub fn has_subscribers(&self) -> bool {
        !self.subscribers.is_empty()
    }
}

/// An account following a topic
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TopicSubscriber {
    /// Subscribed account
    pub user_id: Uuid,

    /// How the account wants to be notified
    pub notification_type: NotificationType,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, EnumString, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum NotificationType {
    Realtime,
    Scheduled,
}

/// Advanced-search block: every term, any term, none of the terms
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct AdvancedQuery {
    /// Terms that must all appear
    #[serde(default)]
    pub all: Option<String>,

    /// Terms of which at least one must appear
    #[serde(default)]
    pub any: Option<String>,

    /// Terms that must not appear
    #[serde(default)]
    pub exclude: Option<String>,

    /// Fields the block searches over; empty means the section default
    #[serde(default)]
    pub fields: Vec<String>,
}

impl AdvancedQuery {
    /// Check whether the block carries any usable input
    pub fn is_empty(&self) -> bool {
        fn blank(v: &Option<String>) -> bool {
            v.as_deref().map_or(true, |s| s.trim().is_empty())
        }
        blank(&self.all) && blank(&self.any) && blank(&self.exclude)
    }
}

/// Half-open creation-date window, verbatim store date expressions
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct DateWindow {
    #[serde(default)]
    pub from: Option<String>,

    #[serde(default)]
    pub to: Option<String>,
}

impl DateWindow {
    /// Check whether either bound is set
    pub fn is_empty(&self) -> bool {
        self.from.is_none() && self.to.is_none()
    }
}
