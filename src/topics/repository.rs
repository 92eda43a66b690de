use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::Arc;
use uuid::Uuid;

use crate::error::Result;
use crate::models::{Section, Topic};

/// Serves saved topics to the matching engine
#[async_trait]
pub trait TopicRepository: Send + Sync {
    /// Every topic saved against a section, subscribers included
    async fn list_topics(&self, section: Section) -> Result<Vec<Topic>>;
}

/// In-memory topic store (for embedding and testing)
#[derive(Clone)]
pub struct InMemoryTopicStore {
    topics: Arc<DashMap<Uuid, Topic>>,
}

impl InMemoryTopicStore {
    pub fn new() -> Self {
        Self {
            topics: Arc::new(DashMap::new()),
        }
    }

    pub fn add_topic(&self, topic: Topic) {
        self.topics.insert(topic.id, topic);
    }
}

impl Default for InMemoryTopicStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TopicRepository for InMemoryTopicStore {
    async fn list_topics(&self, section: Section) -> Result<Vec<Topic>> {
        let mut topics: Vec<Topic> = self
            .topics
            .iter()
            .map(|entry| entry.value().clone())
            .filter(|t| t.topic_type == section)
            .collect();
        // Map iteration order is arbitrary; keep batches stable
        topics.sort_by_key(|t| (t.created_at, t.id));
        Ok(topics)
    }
}
