//! Timelines of request events

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

/// One entry of a timeline
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    /// A bare marker such as `start`, `deploy` or `success`
    Label { label: String },
    /// A labelled value such as `["commit", "<hash>"]`
    Pair { label: String, value: String },
    /// A failure raised while handling the request
    Error { kind: String, message: String },
}

impl Event {
    pub fn label(label: impl Into<String>) -> Self {
        Event::Label {
            label: label.into(),
        }
    }

    pub fn pair(label: impl Into<String>, value: impl ToString) -> Self {
        Event::Pair {
            label: label.into(),
            value: value.to_string(),
        }
    }

    pub fn error(kind: impl Into<String>, message: impl Into<String>) -> Self {
        Event::Error {
            kind: kind.into(),
            message: message.into(),
        }
    }

    /// Label of a marker or pair
    pub fn name(&self) -> Option<&str> {
        match self {
            Event::Label { label } | Event::Pair { label, .. } => Some(label),
            Event::Error { .. } => None,
        }
    }
}

impl From<&crate::errors::DeployError> for Event {
    fn from(err: &crate::errors::DeployError) -> Self {
        Event::error(err.kind(), err.to_string())
    }
}

/// Events of one request keyed by strictly increasing timestamps
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Timeline {
    events: BTreeMap<DateTime<Utc>, Event>,
}

impl Timeline {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `event` at `at`, nudged past the last entry if the clock has
    /// not moved on
    pub fn push_at(&mut self, at: DateTime<Utc>, event: Event) -> DateTime<Utc> {
        let stamp = match self.events.keys().next_back() {
            Some(last) if at <= *last => *last + Duration::microseconds(1),
            _ => at,
        };
        self.events.insert(stamp, event);
        stamp
    }

    pub fn push(&mut self, event: Event) -> DateTime<Utc> {
        self.push_at(Utc::now(), event)
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&DateTime<Utc>, &Event)> {
        self.events.iter()
    }

    pub fn events(&self) -> impl Iterator<Item = &Event> {
        self.events.values()
    }

    /// Value of the first pair labelled `label`
    pub fn value_of(&self, label: &str) -> Option<&str> {
        self.events().find_map(|event| match event {
            Event::Pair { label: l, value } if l == label => Some(value.as_str()),
            _ => None,
        })
    }

    /// First marker among `labels`
    pub fn first_label_of(&self, labels: &[&str]) -> Option<&str> {
        self.events().find_map(|event| match event {
            Event::Label { label } if labels.contains(&label.as_str()) => Some(label.as_str()),
            _ => None,
        })
    }

    /// Timestamp of the first marker among `labels`
    pub fn stamp_of(&self, labels: &[&str]) -> Option<DateTime<Utc>> {
        self.iter().find_map(|(stamp, event)| match event {
            Event::Label { label } if labels.contains(&label.as_str()) => Some(*stamp),
            _ => None,
        })
    }

    /// First error recorded, as `(kind, message)`
    pub fn first_error(&self) -> Option<(&str, &str)> {
        self.events().find_map(|event| match event {
            Event::Error { kind, message } => Some((kind.as_str(), message.as_str())),
            _ => None,
        })
    }
}
