//! Subcommand execution.
use log::*;
use std::sync::Arc;

use crate::{
    advisor::{CherryPickAdvisor, Outcome},
    cli::{Args, Command},
    command::{CommandRunner, ProcessRunner},
    config::AdvisorConfig,
    error::Result,
    event::PullRequestEvent,
    forge::{dry_run::DryRunPoster, github::Github, traits::CommentPoster},
    release::ReleaseMatrixResolver,
};

/// Run the subcommand selected in `args`.
pub async fn execute(args: &Args) -> Result<()> {
    let config = AdvisorConfig::load(&args.config)?;
    let runner: Arc<dyn CommandRunner> = Arc::new(ProcessRunner::new());

    debug!(
        "using integration checkout {} for organization {} over {}",
        config.integration_directory.display(),
        config.github_organization,
        config.github_protocol
    );

    match &args.command {
        Command::Suggest { event, dry_run } => {
            let event = PullRequestEvent::from_webhook_file(event)?;
            let poster: Arc<dyn CommentPoster> = if *dry_run {
                Arc::new(DryRunPoster)
            } else {
                Arc::new(Github::new(args.github_config()?)?)
            };
            suggest(config, runner, poster, &event).await
        }
        Command::ReleaseLines { count } => {
            let resolver = ReleaseMatrixResolver::new(runner, &config);
            let count = count.unwrap_or(config.release_line_count);
            for line in resolver.latest_release_lines(count).await? {
                println!("{line}");
            }
            Ok(())
        }
        Command::Matrix { repo, count } => {
            let resolver = ReleaseMatrixResolver::new(runner, &config);
            let count = count.unwrap_or(config.release_line_count);
            let lines = resolver.latest_release_lines(count).await?;
            let matrix = resolver.resolve_matrix(repo, &lines).await?;
            println!("{}", serde_json::to_string_pretty(&matrix)?);
            Ok(())
        }
        Command::RefreshManifest => {
            ReleaseMatrixResolver::new(runner, &config)
                .refresh_manifest()
                .await
        }
        Command::Repositories { version } => {
            let resolver = ReleaseMatrixResolver::new(runner, &config);
            for repo in resolver.versioned_repositories(version).await? {
                println!("{repo}");
            }
            Ok(())
        }
        Command::Integrations { repo, version } => {
            let resolver = ReleaseMatrixResolver::new(runner, &config);
            for branch in resolver
                .integration_versions_including(repo, version)
                .await?
            {
                println!("{branch}");
            }
            Ok(())
        }
    }
}

async fn suggest(
    config: AdvisorConfig,
    runner: Arc<dyn CommandRunner>,
    poster: Arc<dyn CommentPoster>,
    event: &PullRequestEvent,
) -> Result<()> {
    let advisor = CherryPickAdvisor::builder()
        .config(Arc::new(config))
        .runner(runner)
        .poster(poster)
        .build()?;

    let outcome = advisor.suggest_cherry_picks(event).await?;

    match outcome {
        Outcome::Delivered { .. } => info!(
            "suggested cherry-picks for {}#{}",
            event.pull_request.repository, event.pull_request.number
        ),
        other => info!("no cherry-pick suggestion posted: {other:?}"),
    }

    Ok(())
}
