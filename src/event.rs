use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// How far in the future a synthesized event is stamped. Keeps it strictly
/// above the watermark on the run that creates it; the watermark itself only
/// ever advances to the real feed's Last-Modified, so the stamp is seen once.
pub const FUTURE_STAMP_DAYS: i64 = 1;

/// One record from the received-events feed. Synthesized follow events use
/// the same shape so the rest of the pipeline cannot tell them apart.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivityEvent {
    #[serde(rename = "type")]
    pub kind: String,
    pub actor: EventActor,
    pub repo: EventRepo,
    #[serde(default)]
    pub payload: Value,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventActor {
    pub login: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventRepo {
    pub name: String,
}

/// Which way a follow relationship changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Started,
    Stopped,
}

impl Direction {
    pub fn as_str(self) -> &'static str {
        match self {
            Direction::Started => "started",
            Direction::Stopped => "stopped",
        }
    }
}

impl ActivityEvent {
    /// Build a synthetic FollowEvent. GitHub retired this event type, so the
    /// feed never carries a real one; we fabricate them from followee diffs.
    pub fn follow_change(
        actor: &str,
        direction: Direction,
        target: &str,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            kind: "FollowEvent".to_string(),
            actor: EventActor {
                login: actor.to_string(),
            },
            repo: EventRepo {
                name: target.to_string(),
            },
            payload: json!({
                "action": direction.as_str(),
                "target": {
                    "login": target,
                    "html_url": format!("https://github.com/{target}"),
                },
            }),
            created_at: now + Duration::days(FUTURE_STAMP_DAYS),
        }
    }
}

/// Keep only events newer than the watermark. Events at or before it have
/// already been reported on an earlier run.
pub fn newer_than(events: Vec<ActivityEvent>, watermark: DateTime<Utc>) -> Vec<ActivityEvent> {
    events
        .into_iter()
        .filter(|e| e.created_at > watermark)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event_at(created_at: DateTime<Utc>) -> ActivityEvent {
        ActivityEvent {
            kind: "PushEvent".to_string(),
            actor: EventActor {
                login: "octocat".to_string(),
            },
            repo: EventRepo {
                name: "octocat/hello".to_string(),
            },
            payload: json!({}),
            created_at,
        }
    }

    #[test]
    fn test_synthetic_event_clears_current_watermark() {
        let now = Utc::now();
        let event = ActivityEvent::follow_change("alice", Direction::Started, "bob", now);
        assert!(event.created_at > now);
        assert_eq!(event.kind, "FollowEvent");
        assert_eq!(event.actor.login, "alice");
        assert_eq!(event.payload["action"], "started");
        assert_eq!(event.payload["target"]["login"], "bob");
        assert_eq!(
            event.payload["target"]["html_url"],
            "https://github.com/bob"
        );
    }

    #[test]
    fn test_filter_excludes_at_or_before_watermark() {
        let watermark = Utc::now();
        let events = vec![
            event_at(watermark - Duration::seconds(1)),
            event_at(watermark),
            event_at(watermark + Duration::seconds(1)),
        ];
        let fresh = newer_than(events, watermark);
        assert_eq!(fresh.len(), 1);
        assert_eq!(fresh[0].created_at, watermark + Duration::seconds(1));
    }

    #[test]
    fn test_real_event_deserializes_from_feed_json() {
        let raw = json!({
            "id": "32479",
            "type": "WatchEvent",
            "actor": { "id": 1, "login": "octocat", "display_login": "octocat" },
            "repo": { "id": 7, "name": "rails/rails", "url": "https://api.github.com/repos/rails/rails" },
            "payload": { "action": "started" },
            "public": true,
            "created_at": "2026-08-01T17:30:00Z"
        });
        let event: ActivityEvent = serde_json::from_value(raw).unwrap();
        assert_eq!(event.kind, "WatchEvent");
        assert_eq!(event.actor.login, "octocat");
        assert_eq!(event.repo.name, "rails/rails");
    }
}
