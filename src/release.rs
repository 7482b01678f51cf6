//! Release line discovery and per-repository revision resolution.
//!
//! Release lines come from the tags of the integration (product manifest)
//! checkout. Which revision of a repository belongs to a release line is
//! answered by the external release tool, which prints one answer per line
//! on stdout and may prefix answers with a remote name (`origin/1.0.x`).
use log::*;
use semver::Version;
use serde::Serialize;
use std::{path::PathBuf, sync::Arc, time::Duration};

use crate::{
    command::{Capture, CommandRequest, CommandRunner},
    config::AdvisorConfig,
    error::{AdvisorError, Result},
};

/// Versions starting with this prefix are feature branches.
const FEATURE_BRANCH_PREFIX: &str = "feature-";

/// A maintained `major.minor` track and the revision a repository has in it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReleaseLine {
    /// Wildcard label, e.g. `3.1.x`.
    pub version: String,
    /// Revision or branch of the repository; `None` if the repository is
    /// not part of this release line.
    pub revision: Option<String>,
}

/// Reduce tag names to at most `count` release lines, newest first.
///
/// `tags` must be ordered most recently created first. Only numeric
/// `major.minor.patch` tags are considered; lines are collected in tag
/// order until `count` distinct ones are found, then sorted by version.
pub fn release_lines_from_tags<'a, I>(tags: I, count: usize) -> Vec<String>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut lines: Vec<Version> = vec![];

    for tag in tags {
        if lines.len() == count {
            break;
        }

        let Ok(version) = Version::parse(tag.trim()) else {
            continue;
        };

        if !version.pre.is_empty() || !version.build.is_empty() {
            continue;
        }

        let line = Version::new(version.major, version.minor, 0);
        if !lines.contains(&line) {
            lines.push(line);
        }
    }

    lines.sort_by(|a, b| b.cmp(a));

    lines
        .into_iter()
        .map(|v| format!("{}.{}.x", v.major, v.minor))
        .collect()
}

/// Drop a leading `<remote>/` from a release tool answer.
///
/// Only the first `/` is significant: `origin/feature/x` becomes
/// `feature/x`, and answers without a `/` are returned unchanged.
pub fn strip_remote_prefix(answer: &str) -> &str {
    match answer.split_once('/') {
        Some((_, rest)) => rest,
        None => answer,
    }
}

/// Interpret the release tool's answer to a revision query. Empty output
/// means the repository is not part of the release line.
pub fn parse_revision(output: &str) -> Option<String> {
    let revision = strip_remote_prefix(output.trim()).trim();
    if revision.is_empty() {
        None
    } else {
        Some(revision.to_string())
    }
}

/// Split multi-line release tool output into answers without remote
/// prefixes, skipping blank lines.
pub fn parse_answers(output: &str) -> Vec<String> {
    output
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(|line| strip_remote_prefix(line).to_string())
        .collect()
}

/// Answers release-matrix questions using the integration checkout.
pub struct ReleaseMatrixResolver {
    runner: Arc<dyn CommandRunner>,
    integration_directory: PathBuf,
    tool_directory: PathBuf,
    tool: Vec<String>,
    manifest_remote: String,
    timeout: Option<Duration>,
}

impl ReleaseMatrixResolver {
    pub fn new(runner: Arc<dyn CommandRunner>, config: &AdvisorConfig) -> Self {
        Self {
            runner,
            integration_directory: config.integration_directory.clone(),
            tool_directory: config.release_tool_directory(),
            tool: config.release_tool.clone(),
            manifest_remote: config.manifest_remote.clone(),
            timeout: config.git_operation_timeout(),
        }
    }

    /// The newest `count` release lines, e.g. `["3.1.x", "3.0.x"]`.
    pub async fn latest_release_lines(
        &self,
        count: usize,
    ) -> Result<Vec<String>> {
        let request = CommandRequest::git([
            "for-each-ref",
            "--sort=-creatordate",
            "--format=%(refname:short)",
            "refs/tags",
        ])
        .current_dir(&self.tool_directory)
        .capture(Capture::Stdout);

        let tags = self
            .runner
            .run(request)
            .await
            .map_err(AdvisorError::resolver)?;

        let lines = release_lines_from_tags(tags.lines(), count);

        info!("latest release lines: {lines:?}");

        Ok(lines)
    }

    /// Revision of `repo` pinned in `release_line`, if the repository is
    /// part of it.
    pub async fn resolve_repo_revision(
        &self,
        repo: &str,
        release_line: &str,
    ) -> Result<Option<String>> {
        let integration_version =
            format!("{}/{}", self.manifest_remote, release_line);

        let output = self
            .tool([
                "--version-of",
                repo,
                "--in-integration-version",
                integration_version.as_str(),
            ])
            .await?;

        let revision = parse_revision(&output);

        match &revision {
            Some(rev) => {
                info!("{repo} version {rev} is being used in {release_line}")
            }
            None => debug!("{repo} is not part of {release_line}"),
        }

        Ok(revision)
    }

    /// Resolve `repo` against each release line in order.
    pub async fn resolve_matrix(
        &self,
        repo: &str,
        release_lines: &[String],
    ) -> Result<Vec<ReleaseLine>> {
        let mut matrix = vec![];

        for line in release_lines.iter() {
            let revision = self.resolve_repo_revision(repo, line).await?;
            matrix.push(ReleaseLine {
                version: line.clone(),
                revision,
            });
        }

        Ok(matrix)
    }

    /// Integration branches that include `repo` at `version`.
    pub async fn integration_versions_including(
        &self,
        repo: &str,
        version: &str,
    ) -> Result<Vec<String>> {
        let mut args = vec![
            "--integration-versions-including",
            repo,
            "--version",
            version,
        ];

        if version.starts_with(FEATURE_BRANCH_PREFIX) {
            args.push("--feature-branches");
        }

        let output = self.tool(args).await?;
        let branches = parse_answers(&output);

        info!(
            "{repo}/{version} is being used in the following integration: \
             {branches:?}"
        );

        Ok(branches)
    }

    /// Repositories that are versioned as part of `in_version`.
    pub async fn versioned_repositories(
        &self,
        in_version: &str,
    ) -> Result<Vec<String>> {
        let output = self
            .tool(["--list", "--in-integration-version", in_version])
            .await?;

        Ok(parse_answers(&output))
    }

    /// Bring the integration checkout up to date, bounded by the git
    /// operation timeout.
    pub async fn refresh_manifest(&self) -> Result<()> {
        let request = CommandRequest::git([
            "pull",
            "--rebase",
            self.manifest_remote.as_str(),
        ])
        .current_dir(&self.integration_directory)
        .deadline(self.timeout);

        self.runner.run(request).await?;

        info!(
            "updated integration checkout {}",
            self.integration_directory.display()
        );

        Ok(())
    }

    async fn tool<I, S>(&self, args: I) -> Result<String>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let (program, leading) = self.tool.split_first().ok_or_else(|| {
            AdvisorError::invalid_config("release_tool is empty")
        })?;

        let args = leading
            .iter()
            .cloned()
            .chain(args.into_iter().map(Into::into));

        let request = CommandRequest::new(program.clone(), args)
            .current_dir(&self.tool_directory)
            .capture(Capture::Stdout);

        self.runner.run(request).await.map_err(AdvisorError::resolver)
    }
}

#[cfg(test)]
#[path = "release_tests.rs"]
mod tests;
