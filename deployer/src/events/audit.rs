//! Audit line subscriber

use tracing::info;

use crate::events::log::EventSubscriber;
use crate::events::timeline::Timeline;

/// Labels that name the kind of request
pub const KIND_LABELS: [&str; 2] = ["deploy", "canary"];

/// Labels that end a request
pub const OUTCOME_LABELS: [&str; 2] = ["success", "fail"];

/// Writes one `;`-separated audit line per flushed request
#[derive(Debug, Default)]
pub struct AuditLogSubscriber;

impl AuditLogSubscriber {
    /// `repository;commit;kind outcome;duration s;author;+insertions;-deletions`
    pub fn render(timeline: &Timeline) -> String {
        let duration = match (
            timeline.stamp_of(&["start"]),
            timeline.stamp_of(&OUTCOME_LABELS),
        ) {
            (Some(start), Some(end)) => (end - start).num_seconds(),
            _ => 0,
        };

        format!(
            "{};{};{} {};{}s;{};+{};-{}",
            timeline.value_of("repository").unwrap_or_default(),
            timeline.value_of("commit").unwrap_or_default(),
            timeline.first_label_of(&KIND_LABELS).unwrap_or_default(),
            timeline.first_label_of(&OUTCOME_LABELS).unwrap_or_default(),
            duration,
            timeline.value_of("author").unwrap_or_default(),
            timeline.value_of("insertions").unwrap_or_default(),
            timeline.value_of("deletions").unwrap_or_default(),
        )
    }
}

impl EventSubscriber for AuditLogSubscriber {
    fn receive(&self, timeline: &Timeline) {
        info!(target: "audit", "{}", Self::render(timeline));
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};

    use super::*;
    use crate::events::timeline::Event;

    #[test]
    fn test_render_audit_line() {
        let now = Utc::now();
        let ago = |secs: i64| now - Duration::seconds(secs);
        let mut timeline = Timeline::new();
        timeline.push_at(ago(60), Event::label("start"));
        timeline.push_at(ago(59), Event::label("deploy"));
        timeline.push_at(ago(58), Event::pair("repository", "me/myapp"));
        timeline.push_at(
            ago(30),
            Event::pair("commit", "f9cbfa31ecdc44209a5da167109ec2c2ca556c3f"),
        );
        timeline.push_at(
            ago(29),
            Event::pair("tag", "test-f9cbfa31ecdc44209a5da167109ec2c2ca556c3f"),
        );
        timeline.push_at(ago(3), Event::label("success"));
        timeline.push_at(ago(2), Event::pair("author", "schasse"));
        timeline.push_at(ago(1), Event::pair("insertions", 10));
        timeline.push_at(now, Event::pair("deletions", 5));

        assert_eq!(
            AuditLogSubscriber::render(&timeline),
            "me/myapp;f9cbfa31ecdc44209a5da167109ec2c2ca556c3f;deploy success;57s;schasse;+10;-5"
        );
    }

    #[test]
    fn test_render_partial_timeline() {
        let mut timeline = Timeline::new();
        timeline.push(Event::label("canary"));
        timeline.push(Event::label("fail"));
        assert_eq!(AuditLogSubscriber::render(&timeline), ";;canary fail;0s;;+;-");
    }
}
