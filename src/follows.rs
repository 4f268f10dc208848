//! Follow-graph tracking. GitHub's events feed no longer carries follow
//! notices, so we keep the last-known following list of everyone the root
//! user follows and diff it against a fresh fetch each run.

use crate::event::Direction;
use crate::github::ApiPage;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// One watched user: their following list as of the last run, plus the cache
/// validator for the next fetch. Doubles as the fresh-fetch record, where
/// `modified` carries the server's answer for this run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Followee {
    pub username: String,
    #[serde(default)]
    pub etag: Option<String>,
    #[serde(default)]
    pub modified: bool,
    #[serde(default)]
    pub followees: BTreeSet<String>,
}

impl Followee {
    /// Collapse a paged following fetch into one record. Logins are kept with
    /// set semantics; duplicates across pages disappear.
    pub fn from_pages(username: &str, pages: &[ApiPage]) -> Self {
        let mut record = Self {
            username: username.to_string(),
            etag: None,
            modified: false,
            followees: BTreeSet::new(),
        };

        if let Some(first) = pages.first() {
            record.etag = first.etag.clone();
            record.modified = first.changed;
        }
        for page in pages {
            for item in &page.items {
                if let Some(login) = item.get("login").and_then(|v| v.as_str()) {
                    record.followees.insert(login.to_string());
                }
            }
        }

        record
    }
}

/// A single inferred relationship change, ready to become a synthetic event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FollowDelta {
    pub actor: String,
    pub direction: Direction,
    pub target: String,
}

/// Reconcile the root's own following list with the tracked map.
///
/// On a 304 the fresh record carries no logins, so the stored usernames are
/// copied in and everyone keeps being processed. On a real change, users the
/// root dropped leave the map silently; the root's own changes never become
/// events. Newly followed users need nothing here, they bootstrap in
/// [`reconcile`].
pub fn apply_root_changes(me: &mut Followee, tracked: &mut Vec<Followee>) {
    let previous: BTreeSet<String> = tracked.iter().map(|f| f.username.clone()).collect();

    if !me.modified {
        me.followees = previous;
    } else {
        tracked.retain(|f| me.followees.contains(&f.username));
    }
}

/// Fold freshly fetched following lists into the tracked map, returning the
/// inferred changes.
///
/// A first-time user is recorded with their full set and zero deltas, so a
/// newly followed account does not flood the feed with its entire history.
/// An unchanged fetch leaves the stored entry untouched. A changed fetch
/// yields one delta per difference and replaces the stored set and validator.
pub fn reconcile(tracked: &mut Vec<Followee>, fetched: Vec<Followee>) -> Vec<FollowDelta> {
    let mut deltas = Vec::new();

    for fresh in fetched {
        match tracked.iter_mut().find(|f| f.username == fresh.username) {
            None => {
                tracked.push(fresh);
            }
            Some(stored) if fresh.modified => {
                let started: Vec<String> = fresh
                    .followees
                    .difference(&stored.followees)
                    .cloned()
                    .collect();
                let stopped: Vec<String> = stored
                    .followees
                    .difference(&fresh.followees)
                    .cloned()
                    .collect();

                for target in started {
                    deltas.push(FollowDelta {
                        actor: fresh.username.clone(),
                        direction: Direction::Started,
                        target,
                    });
                }
                for target in stopped {
                    deltas.push(FollowDelta {
                        actor: fresh.username.clone(),
                        direction: Direction::Stopped,
                        target,
                    });
                }

                stored.followees = fresh.followees;
                stored.etag = fresh.etag;
            }
            Some(_) => {}
        }
    }

    deltas
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn set(names: &[&str]) -> BTreeSet<String> {
        names.iter().map(|n| n.to_string()).collect()
    }

    fn stored(username: &str, follows: &[&str]) -> Followee {
        Followee {
            username: username.to_string(),
            etag: Some("\"old\"".to_string()),
            modified: false,
            followees: set(follows),
        }
    }

    fn fetched(username: &str, modified: bool, follows: &[&str]) -> Followee {
        Followee {
            username: username.to_string(),
            etag: Some("\"new\"".to_string()),
            modified,
            followees: set(follows),
        }
    }

    #[test]
    fn test_bootstrap_records_without_deltas() {
        let mut tracked = Vec::new();
        let deltas = reconcile(&mut tracked, vec![fetched("alice", true, &["x", "y"])]);

        assert!(deltas.is_empty());
        assert_eq!(tracked.len(), 1);
        assert_eq!(tracked[0].username, "alice");
        assert_eq!(tracked[0].followees, set(&["x", "y"]));
    }

    #[test]
    fn test_changed_list_yields_symmetric_deltas() {
        let mut tracked = vec![stored("alice", &["x", "y"])];
        let deltas = reconcile(&mut tracked, vec![fetched("alice", true, &["y", "z"])]);

        assert_eq!(deltas.len(), 2);
        assert!(deltas.contains(&FollowDelta {
            actor: "alice".to_string(),
            direction: Direction::Started,
            target: "z".to_string(),
        }));
        assert!(deltas.contains(&FollowDelta {
            actor: "alice".to_string(),
            direction: Direction::Stopped,
            target: "x".to_string(),
        }));
        assert_eq!(tracked[0].followees, set(&["y", "z"]));
        assert_eq!(tracked[0].etag.as_deref(), Some("\"new\""));
    }

    #[test]
    fn test_unchanged_fetch_leaves_entry_untouched() {
        let mut tracked = vec![stored("alice", &["x", "y"])];
        // An unchanged fetch carries no body; whatever it claims is ignored.
        let deltas = reconcile(&mut tracked, vec![fetched("alice", false, &["q"])]);

        assert!(deltas.is_empty());
        assert_eq!(tracked[0].followees, set(&["x", "y"]));
        assert_eq!(tracked[0].etag.as_deref(), Some("\"old\""));
    }

    #[test]
    fn test_root_drop_removes_tracked_entry() {
        let mut tracked = vec![stored("alice", &["x"]), stored("bob", &["y"])];
        let mut me = fetched("root", true, &["alice"]);

        apply_root_changes(&mut me, &mut tracked);

        assert_eq!(tracked.len(), 1);
        assert_eq!(tracked[0].username, "alice");
    }

    #[test]
    fn test_root_not_modified_reuses_stored_usernames() {
        let mut tracked = vec![stored("alice", &["x"]), stored("bob", &["y"])];
        let mut me = fetched("root", false, &[]);

        apply_root_changes(&mut me, &mut tracked);

        assert_eq!(me.followees, set(&["alice", "bob"]));
        assert_eq!(tracked.len(), 2);
    }

    #[test]
    fn test_from_pages_dedupes_across_pages() {
        let pages = vec![
            ApiPage {
                changed: true,
                etag: Some("\"tag\"".to_string()),
                last_modified: None,
                items: vec![json!({ "login": "x" }), json!({ "login": "y" })],
            },
            ApiPage {
                changed: true,
                etag: Some("\"tag\"".to_string()),
                last_modified: None,
                items: vec![json!({ "login": "y" }), json!({ "login": "z" })],
            },
        ];
        let record = Followee::from_pages("alice", &pages);

        assert!(record.modified);
        assert_eq!(record.etag.as_deref(), Some("\"tag\""));
        assert_eq!(record.followees, set(&["x", "y", "z"]));
    }

    #[test]
    fn test_from_pages_not_modified_marker() {
        let pages = vec![ApiPage::default()];
        let record = Followee::from_pages("alice", &pages);

        assert!(!record.modified);
        assert!(record.followees.is_empty());
    }
}
