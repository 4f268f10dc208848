use crate::error::{Error, Result};
use std::env;

/// Everything a run needs, built once by the caller and passed into the engine.
#[derive(Debug, Clone)]
pub struct Config {
    pub github: GithubConfig,
    pub twitter: TwitterConfig,
}

/// GitHub API access: whose feed to read and with which token.
#[derive(Debug, Clone)]
pub struct GithubConfig {
    pub username: String,
    pub token: String,
}

/// OAuth 1.0a credentials for posting status updates.
#[derive(Debug, Clone)]
pub struct TwitterConfig {
    pub consumer_key: String,
    pub consumer_secret: String,
    pub access_token: String,
    pub access_token_secret: String,
}

impl Config {
    /// Read all credentials from the environment.
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            github: GithubConfig {
                username: required("GITHUB_USERNAME")?,
                token: required("GITHUB_TOKEN")?,
            },
            twitter: TwitterConfig {
                consumer_key: required("TWITTER_CONSUMER_KEY")?,
                consumer_secret: required("TWITTER_CONSUMER_SECRET")?,
                access_token: required("TWITTER_ACCESS_TOKEN")?,
                access_token_secret: required("TWITTER_ACCESS_TOKEN_SECRET")?,
            },
        })
    }
}

fn required(name: &str) -> Result<String> {
    match env::var(name) {
        Ok(value) if !value.trim().is_empty() => Ok(value),
        _ => Err(Error::Config(format!("{name} is not set"))),
    }
}
