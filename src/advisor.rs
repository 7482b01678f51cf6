//! End-to-end cherry-pick advice for merged pull requests.
//!
//! A run goes through eligibility, work area setup, the changelog gate,
//! release matrix resolution, composition and delivery. Every stage can end
//! the run early; only failures of external commands and comment delivery
//! are reported as errors. The work area is closed on every path.
use derive_builder::Builder;
use log::*;
use std::sync::Arc;

use crate::{
    changelog::ChangelogScanner,
    command::CommandRunner,
    config::AdvisorConfig,
    error::{AdvisorError, Result},
    event::{CLOSED_ACTION, PullRequestEvent},
    forge::traits::CommentPoster,
    release::ReleaseMatrixResolver,
    suggestion::{CherryPickSuggestion, SuggestionComposer},
    workarea::{RefSpec, WorkArea, WorkAreaOptions},
};

/// Local branch the main branch head is fetched into.
const MAIN_LOCAL_BRANCH: &str = "local";

/// How an advisory run ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Wrong action, not merged, or not targeting the main branch.
    NotEligible,
    /// No commit in the pull request carries a changelog entry.
    NoChangelog,
    /// The repository is not part of any recent release line.
    NoReleaseLines,
    /// The comment template could not be rendered; nothing was posted.
    RenderFailed,
    /// The suggestion was posted.
    Delivered { body: String },
}

#[derive(Builder)]
#[builder(setter(into), build_fn(private, name = "_build"))]
pub struct AdvisorParams {
    pub config: Arc<AdvisorConfig>,
    pub runner: Arc<dyn CommandRunner>,
    pub poster: Arc<dyn CommentPoster>,
}

impl AdvisorParamsBuilder {
    pub fn build(&self) -> Result<CherryPickAdvisor> {
        let params = self._build().map_err(|e| {
            AdvisorError::invalid_config(format!(
                "Failed to build cherry-pick advisor: {}",
                e
            ))
        })?;
        CherryPickAdvisor::new(params)
    }
}

pub struct CherryPickAdvisor {
    config: Arc<AdvisorConfig>,
    runner: Arc<dyn CommandRunner>,
    poster: Arc<dyn CommentPoster>,
    scanner: ChangelogScanner,
    resolver: ReleaseMatrixResolver,
    composer: SuggestionComposer,
}

impl CherryPickAdvisor {
    pub fn builder() -> AdvisorParamsBuilder {
        AdvisorParamsBuilder::default()
    }

    pub fn new(params: AdvisorParams) -> Result<Self> {
        let scanner = ChangelogScanner::new(&params.config.changelog_marker)?;
        let resolver = ReleaseMatrixResolver::new(
            Arc::clone(&params.runner),
            &params.config,
        );
        let composer =
            SuggestionComposer::new(params.config.comment_template.clone());

        Ok(Self {
            config: params.config,
            runner: params.runner,
            poster: params.poster,
            scanner,
            resolver,
            composer,
        })
    }

    /// Whether the event is a merge into the main integration branch.
    pub fn is_eligible(&self, event: &PullRequestEvent) -> bool {
        event.action == CLOSED_ACTION
            && event.pull_request.merged
            && event.pull_request.base_ref == self.config.main_branch
    }

    /// Suggest cherry-picks for the pull request in `event`.
    pub async fn suggest_cherry_picks(
        &self,
        event: &PullRequestEvent,
    ) -> Result<Outcome> {
        let pr = &event.pull_request;

        if event.action != CLOSED_ACTION || !pr.merged {
            info!(
                "Ignoring cherry-pick suggestions for action: {}, merged: {}",
                event.action, pr.merged
            );
            return Ok(Outcome::NotEligible);
        }

        if !self.is_eligible(event) {
            info!(
                "Ignoring cherry-pick suggestions for base ref: {}",
                pr.base_ref
            );
            return Ok(Outcome::NotEligible);
        }

        let refs = [
            RefSpec::new(&self.config.main_branch, MAIN_LOCAL_BRANCH),
            RefSpec::new(event.pr_head_ref(), event.pr_branch()),
        ];

        let mut work_area = WorkArea::open(
            Arc::clone(&self.runner),
            &WorkAreaOptions::from(self.config.as_ref()),
            &self.config.remote_url(&pr.repository),
            &refs,
        )
        .await?;

        let outcome = self.advise(&work_area, event).await;

        work_area.close();

        outcome
    }

    async fn advise(
        &self,
        work_area: &WorkArea,
        event: &PullRequestEvent,
    ) -> Result<Outcome> {
        let pr = &event.pull_request;

        let changelogs = self
            .scanner
            .count_marked_commits(work_area, &pr.base_sha, &event.pr_branch())
            .await?;

        if changelogs == 0 {
            info!(
                "Found no changelog entries, ignoring cherry-pick suggestions"
            );
            return Ok(Outcome::NoChangelog);
        }

        work_area.fetch_all().await?;

        let lines = self
            .resolver
            .latest_release_lines(self.config.release_line_count)
            .await?;

        let matrix =
            self.resolver.resolve_matrix(&pr.repository, &lines).await?;

        let suggestion = CherryPickSuggestion::from_matrix(matrix);

        if suggestion.is_empty() {
            info!(
                "{} is not part of any recent release: no suggestions",
                pr.repository
            );
            return Ok(Outcome::NoReleaseLines);
        }

        let body = match self.composer.compose(&suggestion) {
            Ok(body) => body,
            Err(err) => {
                error!("Failed to render the cherry-pick template: {err}");
                return Ok(Outcome::RenderFailed);
            }
        };

        self.poster
            .create_comment(
                &self.config.github_organization,
                &pr.repository,
                pr.number,
                &body,
            )
            .await
            .map_err(|err| match err {
                AdvisorError::Delivery(_) => err,
                other => AdvisorError::Delivery(other.to_string()),
            })?;

        Ok(Outcome::Delivered { body })
    }
}

#[cfg(test)]
#[path = "advisor_tests.rs"]
mod tests;
