use crate::config::GithubConfig;
use crate::error::{Error, Result};
use async_trait::async_trait;
use reqwest::StatusCode;
use serde_json::Value;
use std::future::Future;
use std::time::Duration;

const GITHUB_API_BASE: &str = "https://api.github.com";
const USER_AGENT: &str = "octoecho/0.1 (+https://github.com/muk2/octoecho)";

/// Which cache validator a collection fetch presents. Each logical collection
/// uses exactly one style: the events feed goes by Last-Modified date, the
/// following lists go by entity tag.
#[derive(Debug, Clone)]
pub enum Conditional {
    /// `If-Modified-Since` with an HTTP-date string.
    ModifiedSince(String),
    /// `If-None-Match` with the tag from the previous fetch, if there was one.
    NoneMatch(Option<String>),
}

/// One page of a conditional collection fetch.
#[derive(Debug, Clone, Default)]
pub struct ApiPage {
    /// False when the server answered 304 for the supplied validator.
    pub changed: bool,
    pub etag: Option<String>,
    pub last_modified: Option<String>,
    pub items: Vec<Value>,
}

/// Request pages 1, 2, 3… until one comes back empty. A 304 on the first page
/// short-circuits: the result is a single unchanged page and no further
/// requests are made. Pages that carry items are returned in request order.
pub async fn fetch_all<F, Fut>(mut fetch_page: F) -> Result<Vec<ApiPage>>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<ApiPage>>,
{
    let mut pages = Vec::new();
    let mut page = 1u32;

    loop {
        let result = fetch_page(page).await?;

        if !result.changed {
            if pages.is_empty() {
                pages.push(result);
            }
            break;
        }

        if result.items.is_empty() {
            break;
        }

        pages.push(result);
        page += 1;
    }

    Ok(pages)
}

/// The GitHub surface the engine needs. Kept as a trait so the run loop can be
/// exercised against an in-memory implementation.
#[async_trait]
pub trait ActivityApi: Send + Sync {
    /// The authenticated user's received-events feed, conditional on the
    /// watermark date.
    async fn received_events(&self, since: &str) -> Result<Vec<ApiPage>>;

    /// A user's following list, conditional on the stored entity tag.
    async fn following(&self, username: &str, etag: Option<&str>) -> Result<Vec<ApiPage>>;

    /// A single profile, unconditional.
    async fn user(&self, login: &str) -> Result<Value>;
}

pub struct GithubClient {
    username: String,
    token: String,
    http: reqwest::Client,
}

impl GithubClient {
    pub fn new(config: &GithubConfig) -> Self {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent(USER_AGENT)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            username: config.username.clone(),
            token: config.token.clone(),
            http,
        }
    }

    fn get(&self, url: &str) -> reqwest::RequestBuilder {
        self.http
            .get(url)
            .header("Authorization", format!("token {}", self.token))
            .header("Accept", "application/vnd.github.v3+json")
    }

    async fn fetch_page(&self, url: &str, page: u32, conditional: &Conditional) -> Result<ApiPage> {
        let call_url = format!("{url}?page={page}");
        let mut request = self.get(&call_url);

        match conditional {
            Conditional::ModifiedSince(date) => {
                request = request.header("If-Modified-Since", date.clone());
            }
            Conditional::NoneMatch(Some(etag)) if !etag.is_empty() => {
                request = request.header("If-None-Match", etag.clone());
            }
            Conditional::NoneMatch(_) => {}
        }

        let response = request.send().await?;
        let status = response.status();

        if status == StatusCode::NOT_MODIFIED {
            return Ok(ApiPage::default());
        }
        if !status.is_success() {
            return Err(Error::Api {
                status,
                url: call_url,
            });
        }

        let etag = header_string(&response, "ETag");
        let last_modified = header_string(&response, "Last-Modified");
        let items: Vec<Value> = response.json().await?;

        Ok(ApiPage {
            changed: true,
            etag,
            last_modified,
            items,
        })
    }
}

#[async_trait]
impl ActivityApi for GithubClient {
    async fn received_events(&self, since: &str) -> Result<Vec<ApiPage>> {
        let url = format!("{GITHUB_API_BASE}/users/{}/received_events", self.username);
        let conditional = Conditional::ModifiedSince(since.to_string());
        fetch_all(|page| self.fetch_page(&url, page, &conditional)).await
    }

    async fn following(&self, username: &str, etag: Option<&str>) -> Result<Vec<ApiPage>> {
        let url = format!("{GITHUB_API_BASE}/users/{username}/following");
        let conditional = Conditional::NoneMatch(etag.map(String::from));
        fetch_all(|page| self.fetch_page(&url, page, &conditional)).await
    }

    async fn user(&self, login: &str) -> Result<Value> {
        let url = format!("{GITHUB_API_BASE}/users/{login}");
        let response = self.get(&url).send().await?;
        let status = response.status();

        if !status.is_success() {
            return Err(Error::Api { status, url });
        }

        Ok(response.json().await?)
    }
}

fn header_string(response: &reqwest::Response, name: &str) -> Option<String> {
    response
        .headers()
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(String::from)
}
