use std::collections::HashMap;
use std::fmt;

use tracing::trace;

pub const PROGRESS_EVENT: &str = "progress";
pub const COMPLETE_EVENT: &str = "complete";

#[derive(Debug, Clone, PartialEq)]
pub enum EventData {
    /// Asset loading progress in percent, `0.0..=100.0`.
    Progress { percent: f32 },
    Complete { percent: f32 },
    Custom(serde_json::Value),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

pub type EventHandler = Box<dyn FnMut(&EventData)>;

/// Named-topic publish/subscribe bus. Handlers run synchronously in
/// subscription order.
#[derive(Default)]
pub struct EventBus {
    next_id: u64,
    topics: HashMap<String, Vec<(SubscriptionId, EventHandler)>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(
        &mut self,
        topic: impl Into<String>,
        handler: impl FnMut(&EventData) + 'static,
    ) -> SubscriptionId {
        let id = SubscriptionId(self.next_id);
        self.next_id += 1;
        self.topics
            .entry(topic.into())
            .or_default()
            .push((id, Box::new(handler)));
        id
    }

    pub fn unsubscribe(&mut self, topic: &str, id: SubscriptionId) -> bool {
        let Some(handlers) = self.topics.get_mut(topic) else {
            return false;
        };
        let before = handlers.len();
        handlers.retain(|(handler_id, _)| *handler_id != id);
        let removed = handlers.len() != before;
        if handlers.is_empty() {
            self.topics.remove(topic);
        }
        removed
    }

    /// Returns how many handlers received the event.
    pub fn publish(&mut self, topic: &str, data: &EventData) -> usize {
        let Some(handlers) = self.topics.get_mut(topic) else {
            return 0;
        };
        for (_, handler) in handlers.iter_mut() {
            handler(data);
        }
        trace!(topic, handlers = handlers.len(), "event_published");
        handlers.len()
    }

    pub fn subscriber_count(&self, topic: &str) -> usize {
        self.topics.get(topic).map_or(0, Vec::len)
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut topics: Vec<(&str, usize)> = self
            .topics
            .iter()
            .map(|(topic, handlers)| (topic.as_str(), handlers.len()))
            .collect();
        topics.sort_unstable();
        f.debug_struct("EventBus").field("topics", &topics).finish()
    }
}
