use anyhow::Result;
use clap::Parser;
use octoecho::config::Config;
use octoecho::github::GithubClient;
use octoecho::run;
use octoecho::snapshot::SnapshotStore;
use octoecho::twitter::TwitterClient;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Echo a GitHub activity feed to Twitter.
///
/// Credentials come from the environment: GITHUB_USERNAME, GITHUB_TOKEN,
/// TWITTER_CONSUMER_KEY, TWITTER_CONSUMER_SECRET, TWITTER_ACCESS_TOKEN and
/// TWITTER_ACCESS_TOKEN_SECRET. Each invocation performs one pass; run it
/// from a scheduler, one invocation at a time.
#[derive(Parser, Debug)]
#[command(name = "octoecho")]
#[command(about = "Echoes a GitHub activity feed to Twitter")]
#[command(version)]
struct Args {
    /// Snapshot file tracking what earlier runs already reported
    #[arg(long, default_value = "./github.status.json")]
    snapshot: PathBuf,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env()
                .add_directive("info".parse()?)
                .add_directive("octoecho=debug".parse()?),
        )
        .init();

    let args = Args::parse();
    let config = Config::from_env()?;

    let github = GithubClient::new(&config.github);
    let twitter = TwitterClient::new(&config.twitter);
    let store = SnapshotStore::new(&args.snapshot);

    let summary = run::run_once(&github, &twitter, &store, &config.github.username).await?;
    tracing::info!(
        "run complete: attempted {} tweets, {} delivered",
        summary.attempted,
        summary.delivered
    );

    Ok(())
}
