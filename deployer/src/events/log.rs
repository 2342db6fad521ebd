//! Process-wide event log

use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};

use tracing::debug;

use crate::events::timeline::{Event, Timeline};

/// Receives each flushed timeline.
///
/// Implementations run on the request path and must return quickly; slow
/// forwarding belongs on a spawned task.
pub trait EventSubscriber: Send + Sync {
    fn receive(&self, timeline: &Timeline);
}

/// Keyed timelines, one per in-flight request
#[derive(Default)]
pub struct EventLog {
    streams: Mutex<HashMap<String, Timeline>>,
    subscribers: RwLock<Vec<Arc<dyn EventSubscriber>>>,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a subscriber for every future flush
    pub fn append_subscriber(&self, subscriber: Arc<dyn EventSubscriber>) {
        let mut subscribers = self.subscribers.write().unwrap_or_else(|e| e.into_inner());
        subscribers.push(subscriber);
    }

    /// Append `event` to the timeline of `request_id`, creating it on first use
    pub fn log(&self, request_id: &str, event: Event) {
        debug!(request_id, ?event, "event");
        let mut streams = self.streams.lock().unwrap_or_else(|e| e.into_inner());
        streams.entry(request_id.to_string()).or_default().push(event);
    }

    /// Log only when the caller has a request to correlate with
    pub fn log_opt(&self, request_id: Option<&str>, event: Event) {
        if let Some(request_id) = request_id {
            self.log(request_id, event);
        }
    }

    /// Remove the timeline of `request_id` and hand it to every subscriber
    pub fn flush(&self, request_id: &str) -> Option<Timeline> {
        let timeline = {
            let mut streams = self.streams.lock().unwrap_or_else(|e| e.into_inner());
            streams.remove(request_id)?
        };

        let subscribers = self.subscribers.read().unwrap_or_else(|e| e.into_inner()).clone();
        for subscriber in &subscribers {
            subscriber.receive(&timeline);
        }
        Some(timeline)
    }

    /// Number of timelines not yet flushed
    pub fn pending(&self) -> usize {
        self.streams.lock().unwrap_or_else(|e| e.into_inner()).len()
    }
}
