//! Posts status updates, signed with OAuth 1.0a (HMAC-SHA1). One call per
//! tweet; the outcome is surfaced to the operator log and nothing else.

use crate::config::TwitterConfig;
use crate::error::Result;
use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use chrono::Utc;
use hmac::{Hmac, Mac};
use serde_json::Value;
use sha1::Sha1;
use std::time::Duration;
use urlencoding::encode;

const STATUS_UPDATE_URL: &str = "https://api.twitter.com/1.1/statuses/update.json";

/// What the platform said about one posted status.
#[derive(Debug, Clone)]
pub enum DispatchOutcome {
    /// Accepted; carries the text as the platform echoed it back.
    Posted(String),
    /// Refused with a structured error.
    Rejected { code: i64, message: String },
}

/// The dispatch surface the engine needs. A trait so the run loop can count
/// outcomes against an in-memory implementation.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn post(&self, text: &str) -> Result<DispatchOutcome>;
}

pub struct TwitterClient {
    config: TwitterConfig,
    http: reqwest::Client,
}

impl TwitterClient {
    pub fn new(config: &TwitterConfig) -> Self {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            config: config.clone(),
            http,
        }
    }
}

#[async_trait]
impl Notifier for TwitterClient {
    async fn post(&self, text: &str) -> Result<DispatchOutcome> {
        let mut params: Vec<(String, String)> = vec![
            ("status".to_string(), text.to_string()),
            (
                "oauth_consumer_key".to_string(),
                self.config.consumer_key.clone(),
            ),
            (
                "oauth_signature_method".to_string(),
                "HMAC-SHA1".to_string(),
            ),
            (
                "oauth_timestamp".to_string(),
                Utc::now().timestamp().to_string(),
            ),
            // Required, but the server does not appear to check it.
            ("oauth_nonce".to_string(), "a".to_string()),
            ("oauth_token".to_string(), self.config.access_token.clone()),
            ("oauth_version".to_string(), "1.0".to_string()),
        ];

        let base = signature_base("POST", STATUS_UPDATE_URL, &params);
        let signature = sign(
            &base,
            &self.config.consumer_secret,
            &self.config.access_token_secret,
        );
        params.push(("oauth_signature".to_string(), signature));

        let response = self
            .http
            .post(STATUS_UPDATE_URL)
            .header("Authorization", oauth_header(&params))
            .form(&[("status", text)])
            .send()
            .await?;
        let body: Value = response.json().await?;

        if let Some(error) = body
            .get("errors")
            .and_then(|e| e.as_array())
            .and_then(|a| a.first())
        {
            return Ok(DispatchOutcome::Rejected {
                code: error.get("code").and_then(|c| c.as_i64()).unwrap_or(0),
                message: error
                    .get("message")
                    .and_then(|m| m.as_str())
                    .unwrap_or("unknown error")
                    .to_string(),
            });
        }

        let echoed = body
            .get("text")
            .and_then(|t| t.as_str())
            .unwrap_or(text)
            .to_string();
        Ok(DispatchOutcome::Posted(echoed))
    }
}

/// `POST&<url>&<sorted k=v pairs>`, everything RFC 3986-encoded.
fn signature_base(method: &str, url: &str, params: &[(String, String)]) -> String {
    let mut pairs: Vec<String> = params
        .iter()
        .map(|(k, v)| format!("{}={}", encode(k), encode(v)))
        .collect();
    pairs.sort();

    format!(
        "{}&{}&{}",
        method,
        encode(url),
        encode(&pairs.join("&"))
    )
}

fn sign(base: &str, consumer_secret: &str, token_secret: &str) -> String {
    let key = format!("{consumer_secret}&{token_secret}");
    let mut mac =
        Hmac::<Sha1>::new_from_slice(key.as_bytes()).expect("HMAC accepts any key length");
    mac.update(base.as_bytes());
    BASE64.encode(mac.finalize().into_bytes())
}

/// The `Authorization` header: only the oauth_* parameters, sorted, quoted.
fn oauth_header(params: &[(String, String)]) -> String {
    let mut pairs: Vec<String> = params
        .iter()
        .filter(|(k, _)| k.starts_with("oauth_"))
        .map(|(k, v)| format!("{}=\"{}\"", encode(k), encode(v)))
        .collect();
    pairs.sort();

    format!("OAuth {}", pairs.join(", "))
}
