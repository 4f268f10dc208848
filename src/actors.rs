use crate::event::ActivityEvent;
use crate::github::ActivityApi;
use std::collections::BTreeMap;
use tracing::warn;

/// A display-ready identity for an event's originating user.
#[derive(Debug, Clone)]
pub struct Actor {
    pub login: String,
    pub name: Option<String>,
}

impl Actor {
    /// `login (Real Name)` when the profile carries a name, bare login
    /// otherwise.
    pub fn display_name(&self) -> String {
        match &self.name {
            Some(name) if !name.trim().is_empty() => format!("{} ({})", self.login, name),
            _ => self.login.clone(),
        }
    }
}

/// Look up every distinct actor in the batch, one profile call per login.
///
/// A failed lookup costs only the display name: the bare login stands in and
/// the run carries on, so one unreachable profile cannot block the whole
/// batch.
pub async fn resolve_all<A: ActivityApi>(
    api: &A,
    events: &[ActivityEvent],
) -> BTreeMap<String, Actor> {
    let mut actors: BTreeMap<String, Actor> = BTreeMap::new();

    for event in events {
        let login = &event.actor.login;
        if actors.contains_key(login) {
            continue;
        }

        let name = match api.user(login).await {
            Ok(profile) => profile
                .get("name")
                .and_then(|v| v.as_str())
                .map(String::from),
            Err(e) => {
                warn!("profile lookup for {login} failed, using bare login: {e}");
                None
            }
        };

        actors.insert(
            login.clone(),
            Actor {
                login: login.clone(),
                name,
            },
        );
    }

    actors
}
