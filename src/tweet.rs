//! Turns activity events into tweet text. Each known event type has a rule
//! mapping its payload to a (verb, object, url) line; unknown types fall back
//! to a generic rule. Serialization fits the platform budget by degrading the
//! text step by step and hard-truncating as a last resort.

use crate::actors::Actor;
use crate::event::ActivityEvent;
use serde::de::DeserializeOwned;
use serde::Deserialize;

/// Platform length limit, counted in characters.
pub const TWEET_MAX_CHARS: usize = 280;
/// Reserved for the trailing link line when a url is present.
pub const URL_ALLOWANCE: usize = 30;

const ELLIPSIS: &str = "...";

/// A payload field the rule needed was missing or had the wrong shape.
#[derive(Debug, thiserror::Error)]
#[error("{0}")]
pub struct RenderError(String);

struct Line {
    verb: String,
    object: String,
    url: Option<String>,
}

type Rule = fn(&ActivityEvent) -> Result<Line, RenderError>;

/// Renderer rules keyed by event type. Adding a type means adding a row here
/// and a payload struct below.
const RULES: &[(&str, Rule)] = &[
    ("CreateEvent", create_event),
    ("DeleteEvent", delete_event),
    ("DownloadEvent", download_event),
    ("FollowEvent", follow_event),
    ("ForkEvent", fork_event),
    ("GollumEvent", gollum_event),
    ("InstallationEvent", installation_event),
    ("InstallationRepositoriesEvent", installation_repositories_event),
    ("IssueCommentEvent", issue_comment_event),
    ("IssuesEvent", issues_event),
    ("LabelEvent", label_event),
    ("MemberEvent", member_event),
    ("PublicEvent", public_event),
    ("PullRequestEvent", pull_request_event),
    ("PullRequestReviewCommentEvent", pull_request_review_comment_event),
    ("PushEvent", push_event),
    ("ReleaseEvent", release_event),
    ("WatchEvent", watch_event),
];

/// A rendered notification, ready to serialize within the platform budget.
#[derive(Debug, Clone)]
pub struct Tweet {
    pub actor_display: String,
    pub actor_login: String,
    pub kind: String,
    pub verb: String,
    pub object: String,
    pub url: Option<String>,
    pub parse_error: Option<String>,
}

impl Tweet {
    /// Map an event through the rule table. A payload that will not parse
    /// becomes an error-bodied tweet rather than a dropped event.
    pub fn build(event: &ActivityEvent, actor: &Actor) -> Self {
        let rule = RULES
            .iter()
            .find(|(kind, _)| *kind == event.kind)
            .map(|(_, rule)| *rule)
            .unwrap_or(unknown_event);

        match rule(event) {
            Ok(line) => Self {
                actor_display: actor.display_name(),
                actor_login: actor.login.clone(),
                kind: event.kind.clone(),
                verb: line.verb,
                object: line.object,
                url: line.url,
                parse_error: None,
            },
            Err(error) => Self {
                actor_display: actor.display_name(),
                actor_login: actor.login.clone(),
                kind: event.kind.clone(),
                verb: String::new(),
                object: String::new(),
                url: Some(repo_url(event)),
                parse_error: Some(error.to_string()),
            },
        }
    }

    /// Serialize within the budget. The url line rides outside the body
    /// budget but inside its fixed allowance.
    pub fn compose(&self) -> String {
        let mut budget = TWEET_MAX_CHARS;
        if self.url.is_some() {
            budget -= URL_ALLOWANCE;
        }

        let body = match &self.parse_error {
            Some(error) => {
                conform_to_length(&format!("Error parsing {}: {}", self.kind, error), budget)
            }
            None => self.normal_body(budget),
        };

        match &self.url {
            Some(url) => format!("{body}\n{url}"),
            None => body,
        }
    }

    fn normal_body(&self, budget: usize) -> String {
        let assemble =
            |actor: &str, object: &str| format!("{} {} {}", actor, self.verb, object);

        // Degrade until it fits: bare login first, then the shorter noun.
        let mut text = assemble(&self.actor_display, &self.object);
        if char_len(&text) > budget {
            text = assemble(&self.actor_login, &self.object);
            if char_len(&text) > budget {
                let short_object = self.object.replace("repository", "repo");
                text = assemble(&self.actor_login, &short_object);
            }
        }

        conform_to_length(&text, budget)
    }
}

fn char_len(text: &str) -> usize {
    text.chars().count()
}

/// Hard truncation: reserve room for the ellipsis, plus one more character
/// when the untruncated text ended with a closing quote so the quote can be
/// re-appended after the ellipsis.
fn conform_to_length(input: &str, max_chars: usize) -> String {
    if char_len(input) <= max_chars {
        return input.to_string();
    }

    let ends_quoted = input.ends_with('"');
    let mut keep = max_chars.saturating_sub(ELLIPSIS.len());
    if ends_quoted {
        keep = keep.saturating_sub(1);
    }

    let mut output: String = input.chars().take(keep).collect();
    output.push_str(ELLIPSIS);
    if ends_quoted {
        output.push('"');
    }
    output
}

fn payload<T: DeserializeOwned>(event: &ActivityEvent) -> Result<T, RenderError> {
    serde_json::from_value(event.payload.clone()).map_err(|e| RenderError(e.to_string()))
}

fn repo_url(event: &ActivityEvent) -> String {
    format!("https://github.com/{}", event.repo.name)
}

#[derive(Deserialize)]
struct RefPayload {
    ref_type: String,
    #[serde(rename = "ref")]
    ref_name: Option<String>,
}

#[derive(Deserialize)]
struct DownloadPayload {
    download: NamedLink,
}

#[derive(Deserialize)]
struct NamedLink {
    name: String,
    html_url: String,
}

#[derive(Deserialize)]
struct FollowPayload {
    action: String,
    target: FollowTarget,
}

#[derive(Deserialize)]
struct FollowTarget {
    login: String,
    html_url: String,
}

#[derive(Deserialize)]
struct ForkPayload {
    forkee: Linked,
}

#[derive(Deserialize)]
struct Linked {
    html_url: String,
}

#[derive(Deserialize)]
struct GollumPayload {
    pages: Vec<Linked>,
}

#[derive(Deserialize)]
struct InstallationPayload {
    action: String,
    installation: Linked,
}

#[derive(Deserialize)]
struct IssuePayload {
    action: String,
    issue: Titled,
}

#[derive(Deserialize)]
struct Titled {
    title: String,
    html_url: String,
}

#[derive(Deserialize)]
struct IssuesPayload {
    action: String,
    issue: Titled,
    assignee: Option<LoginOnly>,
    label: Option<NameOnly>,
}

#[derive(Deserialize)]
struct LoginOnly {
    login: String,
}

#[derive(Deserialize)]
struct NameOnly {
    name: String,
}

#[derive(Deserialize)]
struct LabelPayload {
    action: String,
    label: NameOnly,
}

#[derive(Deserialize)]
struct MemberPayload {
    action: String,
    member: LoginOnly,
}

#[derive(Deserialize)]
struct PullRequestPayload {
    action: String,
    pull_request: Titled,
}

#[derive(Deserialize)]
struct ReviewCommentPayload {
    action: String,
    pull_request: Titled,
    review_comment_url: String,
}

#[derive(Deserialize)]
struct ReleasePayload {
    release: Release,
}

#[derive(Deserialize)]
struct Release {
    name: Option<String>,
    html_url: String,
}

fn create_event(event: &ActivityEvent) -> Result<Line, RenderError> {
    let p: RefPayload = payload(event)?;
    let name = p.ref_name.unwrap_or_else(|| event.repo.name.clone());
    Ok(Line {
        verb: "created".to_string(),
        object: format!("{} \"{}\"", p.ref_type, name),
        url: Some(repo_url(event)),
    })
}

fn delete_event(event: &ActivityEvent) -> Result<Line, RenderError> {
    let p: RefPayload = payload(event)?;
    let name = p.ref_name.unwrap_or_else(|| event.repo.name.clone());
    Ok(Line {
        verb: "deleted".to_string(),
        object: format!("{} \"{}\"", p.ref_type, name),
        url: Some(repo_url(event)),
    })
}

fn download_event(event: &ActivityEvent) -> Result<Line, RenderError> {
    let p: DownloadPayload = payload(event)?;
    Ok(Line {
        verb: "created".to_string(),
        object: format!("download \"{}\"", p.download.name),
        url: Some(p.download.html_url),
    })
}

// The feed stopped carrying these, but the follow-graph diff fabricates them.
fn follow_event(event: &ActivityEvent) -> Result<Line, RenderError> {
    let p: FollowPayload = payload(event)?;
    Ok(Line {
        verb: format!("{} following", p.action),
        object: p.target.login,
        url: Some(p.target.html_url),
    })
}

fn fork_event(event: &ActivityEvent) -> Result<Line, RenderError> {
    let p: ForkPayload = payload(event)?;
    Ok(Line {
        verb: "forked".to_string(),
        object: format!("repository \"{}\"", event.repo.name),
        url: Some(p.forkee.html_url),
    })
}

fn gollum_event(event: &ActivityEvent) -> Result<Line, RenderError> {
    let p: GollumPayload = payload(event)?;
    let count = p.pages.len();
    let first = p
        .pages
        .into_iter()
        .next()
        .ok_or_else(|| RenderError("no wiki pages in payload".to_string()))?;
    Ok(Line {
        verb: "created".to_string(),
        object: format!("{} Wiki page{}", count, if count == 1 { "" } else { "s" }),
        url: Some(first.html_url),
    })
}

fn installation_event(event: &ActivityEvent) -> Result<Line, RenderError> {
    let p: InstallationPayload = payload(event)?;
    Ok(Line {
        verb: p.action,
        object: "a GitHub App".to_string(),
        url: Some(p.installation.html_url),
    })
}

fn installation_repositories_event(event: &ActivityEvent) -> Result<Line, RenderError> {
    let p: InstallationPayload = payload(event)?;
    Ok(Line {
        verb: p.action,
        object: "a repository from an installation".to_string(),
        url: Some(p.installation.html_url),
    })
}

fn issue_comment_event(event: &ActivityEvent) -> Result<Line, RenderError> {
    let p: IssuePayload = payload(event)?;
    Ok(Line {
        verb: p.action,
        object: format!("a comment in issue \"{}\"", p.issue.title),
        url: Some(p.issue.html_url),
    })
}

fn issues_event(event: &ActivityEvent) -> Result<Line, RenderError> {
    let p: IssuesPayload = payload(event)?;
    let mut object = format!("issue \"{}\"", p.issue.title);
    if let Some(assignee) = p.assignee {
        if !assignee.login.trim().is_empty() {
            object.push_str(&format!(" user {}", assignee.login));
        }
    }
    if let Some(label) = p.label {
        if !label.name.trim().is_empty() {
            object.push_str(&format!(" as \"{}\"", label.name));
        }
    }
    Ok(Line {
        verb: p.action,
        object,
        url: Some(p.issue.html_url),
    })
}

fn label_event(event: &ActivityEvent) -> Result<Line, RenderError> {
    let p: LabelPayload = payload(event)?;
    Ok(Line {
        verb: p.action,
        object: format!(
            "label \"{}\" for repository \"{}\"",
            p.label.name, event.repo.name
        ),
        url: Some(repo_url(event)),
    })
}

fn member_event(event: &ActivityEvent) -> Result<Line, RenderError> {
    let p: MemberPayload = payload(event)?;
    Ok(Line {
        verb: p.action,
        object: format!(
            "collaborator \"{}\" in repository \"{}\"",
            p.member.login, event.repo.name
        ),
        url: Some(repo_url(event)),
    })
}

fn public_event(event: &ActivityEvent) -> Result<Line, RenderError> {
    Ok(Line {
        verb: "went public".to_string(),
        object: format!("with repository \"{}\"", event.repo.name),
        url: Some(repo_url(event)),
    })
}

fn pull_request_event(event: &ActivityEvent) -> Result<Line, RenderError> {
    let p: PullRequestPayload = payload(event)?;
    Ok(Line {
        verb: p.action,
        object: format!(
            "pull request \"{}\" for repository \"{}\"",
            p.pull_request.title, event.repo.name
        ),
        url: Some(p.pull_request.html_url),
    })
}

fn pull_request_review_comment_event(event: &ActivityEvent) -> Result<Line, RenderError> {
    let p: ReviewCommentPayload = payload(event)?;
    Ok(Line {
        verb: p.action,
        object: format!(
            "a review comment for pull request \"{}\" for repository \"{}\"",
            p.pull_request.title, event.repo.name
        ),
        url: Some(p.review_comment_url),
    })
}

fn push_event(event: &ActivityEvent) -> Result<Line, RenderError> {
    Ok(Line {
        verb: "pushed".to_string(),
        object: format!("to repository \"{}\"", event.repo.name),
        url: Some(repo_url(event)),
    })
}

fn release_event(event: &ActivityEvent) -> Result<Line, RenderError> {
    let p: ReleasePayload = payload(event)?;
    Ok(Line {
        verb: "released".to_string(),
        object: format!("\"{}\"", p.release.name.unwrap_or_default()),
        url: Some(p.release.html_url),
    })
}

fn watch_event(event: &ActivityEvent) -> Result<Line, RenderError> {
    Ok(Line {
        verb: "starred".to_string(),
        object: format!("repository \"{}\"", event.repo.name),
        url: Some(repo_url(event)),
    })
}

fn unknown_event(event: &ActivityEvent) -> Result<Line, RenderError> {
    let mut verb = match event.kind.strip_suffix("Event") {
        Some(stripped) => stripped.to_lowercase(),
        None => event.kind.clone(),
    };
    if let Some(action) = event.payload.get("action").and_then(|v| v.as_str()) {
        if !action.trim().is_empty() {
            verb = format!("{action} {verb}");
        }
    }
    Ok(Line {
        verb,
        object: "(this is an unknown event)".to_string(),
        url: Some(repo_url(event)),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::{Direction, EventActor, EventRepo};
    use chrono::Utc;
    use serde_json::json;

    fn actor(login: &str, name: Option<&str>) -> Actor {
        Actor {
            login: login.to_string(),
            name: name.map(String::from),
        }
    }

    fn event(kind: &str, repo: &str, payload: serde_json::Value) -> ActivityEvent {
        ActivityEvent {
            kind: kind.to_string(),
            actor: EventActor {
                login: "octocat".to_string(),
            },
            repo: EventRepo {
                name: repo.to_string(),
            },
            payload,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_watch_event_renders_star() {
        let tweet = Tweet::build(
            &event("WatchEvent", "rails/rails", json!({ "action": "started" })),
            &actor("octocat", Some("The Octocat")),
        );
        assert_eq!(
            tweet.compose(),
            "octocat (The Octocat) starred repository \"rails/rails\"\nhttps://github.com/rails/rails"
        );
    }

    #[test]
    fn test_synthetic_follow_event_renders() {
        let follow = ActivityEvent::follow_change("alice", Direction::Started, "bob", Utc::now());
        let tweet = Tweet::build(&follow, &actor("alice", None));
        assert_eq!(
            tweet.compose(),
            "alice started following bob\nhttps://github.com/bob"
        );
    }

    #[test]
    fn test_stopped_follow_event_renders() {
        let follow = ActivityEvent::follow_change("alice", Direction::Stopped, "bob", Utc::now());
        let tweet = Tweet::build(&follow, &actor("alice", None));
        assert!(tweet.compose().starts_with("alice stopped following bob"));
    }

    #[test]
    fn test_create_event_falls_back_to_repo_name() {
        let tweet = Tweet::build(
            &event(
                "CreateEvent",
                "octocat/hello",
                json!({ "ref_type": "repository", "ref": null }),
            ),
            &actor("octocat", None),
        );
        assert_eq!(tweet.verb, "created");
        assert_eq!(tweet.object, "repository \"octocat/hello\"");
    }

    #[test]
    fn test_issues_event_appends_assignee_and_label() {
        let tweet = Tweet::build(
            &event(
                "IssuesEvent",
                "octocat/hello",
                json!({
                    "action": "labeled",
                    "issue": { "title": "It breaks", "html_url": "https://github.com/octocat/hello/issues/1" },
                    "assignee": { "login": "bob" },
                    "label": { "name": "bug" },
                }),
            ),
            &actor("octocat", None),
        );
        assert_eq!(tweet.object, "issue \"It breaks\" user bob as \"bug\"");
        assert_eq!(
            tweet.url.as_deref(),
            Some("https://github.com/octocat/hello/issues/1")
        );
    }

    #[test]
    fn test_unknown_kind_derives_verb_from_type() {
        let tweet = Tweet::build(
            &event("TeamAddEvent", "octocat/hello", json!({})),
            &actor("octocat", None),
        );
        assert_eq!(tweet.verb, "teamadd");
        assert_eq!(tweet.object, "(this is an unknown event)");
        assert_eq!(
            tweet.url.as_deref(),
            Some("https://github.com/octocat/hello")
        );
    }

    #[test]
    fn test_unknown_kind_prefixes_payload_action() {
        let tweet = Tweet::build(
            &event("MilestoneEvent", "octocat/hello", json!({ "action": "closed" })),
            &actor("octocat", None),
        );
        assert_eq!(tweet.verb, "closed milestone");
    }

    #[test]
    fn test_missing_payload_field_becomes_error_body() {
        let tweet = Tweet::build(
            &event("IssuesEvent", "octocat/hello", json!({ "action": "opened" })),
            &actor("octocat", None),
        );
        assert!(tweet.parse_error.is_some());

        let text = tweet.compose();
        assert!(text.starts_with("Error parsing IssuesEvent:"));
        assert!(text.ends_with("\nhttps://github.com/octocat/hello"));
    }

    #[test]
    fn test_long_display_name_degrades_to_login() {
        let long_name = "N".repeat(250);
        let tweet = Tweet::build(
            &event("PushEvent", "octocat/hello", json!({})),
            &actor("octocat", Some(&long_name)),
        );
        let text = tweet.compose();
        assert!(text.starts_with("octocat pushed"));
        assert!(text.chars().count() <= TWEET_MAX_CHARS);
    }

    #[test]
    fn test_repository_abbreviates_when_still_over() {
        let repo = format!("octocat/{}", "r".repeat(215));
        let tweet = Tweet::build(&event("PushEvent", &repo, json!({})), &actor("octocat", None));
        let body = tweet.compose();
        let first_line = body.lines().next().unwrap();
        assert!(first_line.contains("to repo \""));
        assert!(first_line.chars().count() <= TWEET_MAX_CHARS - URL_ALLOWANCE);
    }

    #[test]
    fn test_truncation_appends_ellipsis_within_budget() {
        let tweet = Tweet {
            actor_display: "octocat".to_string(),
            actor_login: "octocat".to_string(),
            kind: "PushEvent".to_string(),
            verb: "pushed".to_string(),
            object: "x".repeat(400),
            url: None,
            parse_error: None,
        };
        let text = tweet.compose();
        assert_eq!(text.chars().count(), TWEET_MAX_CHARS);
        assert!(text.ends_with("..."));
    }

    #[test]
    fn test_truncation_reappends_closing_quote() {
        let tweet = Tweet {
            actor_display: "octocat".to_string(),
            actor_login: "octocat".to_string(),
            kind: "IssuesEvent".to_string(),
            verb: "opened".to_string(),
            object: format!("issue \"{}\"", "t".repeat(400)),
            url: None,
            parse_error: None,
        };
        let text = tweet.compose();
        assert_eq!(text.chars().count(), TWEET_MAX_CHARS);
        assert!(text.ends_with("...\""));
    }

    #[test]
    fn test_url_shrinks_body_budget() {
        let tweet = Tweet {
            actor_display: "octocat".to_string(),
            actor_login: "octocat".to_string(),
            kind: "PushEvent".to_string(),
            verb: "pushed".to_string(),
            object: "x".repeat(400),
            url: Some("https://github.com/octocat/hello".to_string()),
            parse_error: None,
        };
        let text = tweet.compose();
        let body = text.lines().next().unwrap();
        assert_eq!(body.chars().count(), TWEET_MAX_CHARS - URL_ALLOWANCE);
        assert!(body.ends_with("..."));
    }

    #[test]
    fn test_short_text_is_untouched() {
        assert_eq!(conform_to_length("short", 280), "short");
    }
}
