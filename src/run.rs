//! One reconciliation pass, end to end. The ordering here is the contract
//! the rest of the crate leans on: read the snapshot, fetch and compute,
//! attempt every delivery, and only then write the snapshot back. A fatal
//! error anywhere earlier leaves the stored snapshot untouched, so the next
//! run retries the same work.

use crate::actors;
use crate::error::Result;
use crate::event::{self, ActivityEvent};
use crate::follows::{self, Followee};
use crate::github::ActivityApi;
use crate::snapshot::SnapshotStore;
use crate::tweet::Tweet;
use crate::twitter::{DispatchOutcome, Notifier};
use chrono::Utc;
use tracing::{info, warn};

/// Per-run delivery accounting for the operator log.
#[derive(Debug, Default, Clone, Copy)]
pub struct RunSummary {
    pub attempted: usize,
    pub delivered: usize,
}

pub async fn run_once<A, N>(
    api: &A,
    notifier: &N,
    store: &SnapshotStore,
    root_username: &str,
) -> Result<RunSummary>
where
    A: ActivityApi,
    N: Notifier,
{
    let mut snapshot = store.load()?;
    let watermark = snapshot.watermark()?;

    // The real event stream, conditional on the watermark date.
    let event_pages = api.received_events(&snapshot.events_last_modified).await?;
    let mut events: Vec<ActivityEvent> = Vec::new();
    for page in &event_pages {
        for item in &page.items {
            events.push(serde_json::from_value(item.clone())?);
        }
    }

    // The follow notices the feed no longer carries: refresh the root's own
    // list, then diff every tracked user's following list against the stored
    // one and append the changes as synthetic events.
    let root_pages = api
        .following(root_username, snapshot.followees_etag.as_deref())
        .await?;
    let mut me = Followee::from_pages(root_username, &root_pages);
    follows::apply_root_changes(&mut me, &mut snapshot.followees);

    let mut fetched = Vec::with_capacity(me.followees.len());
    for username in &me.followees {
        let etag = snapshot
            .followees
            .iter()
            .find(|f| f.username == *username)
            .and_then(|f| f.etag.clone());
        let pages = api.following(username, etag.as_deref()).await?;
        fetched.push(Followee::from_pages(username, &pages));
    }

    let now = Utc::now();
    for delta in follows::reconcile(&mut snapshot.followees, fetched) {
        events.push(ActivityEvent::follow_change(
            &delta.actor,
            delta.direction,
            &delta.target,
            now,
        ));
    }

    // One freshness filter over real and synthetic events alike.
    let fresh = event::newer_than(events, watermark);
    let actor_table = actors::resolve_all(api, &fresh).await;

    let mut summary = RunSummary::default();
    for event in &fresh {
        let actor = &actor_table[&event.actor.login];
        let text = Tweet::build(event, actor).compose();

        summary.attempted += 1;
        match notifier.post(&text).await {
            Ok(DispatchOutcome::Posted(echoed)) => {
                summary.delivered += 1;
                info!("posted: {echoed}");
            }
            Ok(DispatchOutcome::Rejected { code, message }) => {
                warn!("post rejected (code {code}): {message}");
            }
            Err(e) => {
                warn!("post failed: {e}");
            }
        }
    }

    // Commit point. The watermark follows the real feed's Last-Modified only;
    // synthetic stamps never move it. The root validator survives a 304.
    let hint = event_pages
        .iter()
        .find(|p| p.changed)
        .and_then(|p| p.last_modified.clone());
    snapshot.advance_watermark(hint.as_deref());
    if me.modified {
        snapshot.followees_etag = me.etag.clone();
    }
    store.save(&snapshot)?;

    Ok(summary)
}
