//! Configuration loading and parsing for `cherrypick-advisor.toml` files.
//!
//! Every field has a default so an absent or partial file is valid. The
//! resulting [`AdvisorConfig`] is passed explicitly to the constructors of
//! the work area, the resolver and the advisor.
use log::*;
use serde::Deserialize;
use std::{
    fmt,
    path::{Path, PathBuf},
    time::Duration,
};

use crate::{
    error::{AdvisorError, Result},
    suggestion::DEFAULT_COMMENT_TEMPLATE,
};

/// Default configuration filename.
pub const DEFAULT_CONFIG_FILE: &str = "cherrypick-advisor.toml";
/// Branch that pull requests must target to be considered for backports.
pub const DEFAULT_MAIN_BRANCH: &str = "master";
/// Number of release lines proposed as cherry-pick targets.
pub const DEFAULT_RELEASE_LINE_COUNT: usize = 3;
/// Deadline applied to git fetch and pull operations.
pub const DEFAULT_GIT_OPERATION_TIMEOUT_SECS: u64 = 30;
/// Commit message marker flagging a change as release-note worthy.
pub const DEFAULT_CHANGELOG_MARKER: &str = "Changelog";
/// Remote name used for the pull request repository inside a work area.
pub const WORK_AREA_REMOTE: &str = "github";
/// Sub-directory of the integration checkout holding the release tool.
pub const RELEASE_TOOL_SUBDIR: &str = "extra";

/// Transport used to build clone URLs for GitHub repositories.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GithubProtocol {
    #[default]
    Ssh,
    Https,
}

impl fmt::Display for GithubProtocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GithubProtocol::Ssh => write!(f, "ssh"),
            GithubProtocol::Https => write!(f, "https"),
        }
    }
}

/// Root configuration structure for `cherrypick-advisor.toml`.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)] // Use default for missing fields
pub struct AdvisorConfig {
    /// Checkout of the integration (product manifest) repository.
    pub integration_directory: PathBuf,
    /// GitHub organization owning the product repositories.
    pub github_organization: String,
    /// Transport for constructing remote clone URLs.
    pub github_protocol: GithubProtocol,
    /// Designated main integration branch.
    pub main_branch: String,
    /// How many of the newest release lines to consider.
    pub release_line_count: usize,
    /// Deadline in seconds for fetch/pull operations. 0 disables it.
    pub git_operation_timeout_secs: u64,
    /// Commit message marker token (matched case-insensitively).
    pub changelog_marker: String,
    /// Program and leading arguments of the version-resolution tool.
    pub release_tool: Vec<String>,
    /// Remote name the release tool expects in front of release lines.
    pub manifest_remote: String,
    /// Parent directory for transient work areas (system temp if unset).
    pub work_root: Option<PathBuf>,
    /// Tera template used for the suggestion comment.
    pub comment_template: String,
}

impl Default for AdvisorConfig {
    fn default() -> Self {
        Self {
            integration_directory: PathBuf::from("integration"),
            github_organization: "mendersoftware".into(),
            github_protocol: GithubProtocol::default(),
            main_branch: DEFAULT_MAIN_BRANCH.into(),
            release_line_count: DEFAULT_RELEASE_LINE_COUNT,
            git_operation_timeout_secs: DEFAULT_GIT_OPERATION_TIMEOUT_SECS,
            changelog_marker: DEFAULT_CHANGELOG_MARKER.into(),
            release_tool: vec!["python3".into(), "release_tool.py".into()],
            manifest_remote: "origin".into(),
            work_root: None,
            comment_template: DEFAULT_COMMENT_TEMPLATE.into(),
        }
    }
}

impl AdvisorConfig {
    /// Load configuration from a TOML file, falling back to defaults when
    /// the file does not exist.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            info!(
                "no configuration found at {}: using default",
                path.display()
            );
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Parse configuration from TOML content.
    pub fn from_toml(content: &str) -> Result<Self> {
        let config: AdvisorConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.release_tool.is_empty() {
            return Err(AdvisorError::invalid_config(
                "release_tool must name a program",
            ));
        }
        if self.github_organization.is_empty() {
            return Err(AdvisorError::invalid_config(
                "github_organization must not be empty",
            ));
        }
        Ok(())
    }

    /// Deadline for git fetch and pull operations.
    pub fn git_operation_timeout(&self) -> Option<Duration> {
        match self.git_operation_timeout_secs {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        }
    }

    /// Working directory of the version-resolution tool.
    pub fn release_tool_directory(&self) -> PathBuf {
        self.integration_directory.join(RELEASE_TOOL_SUBDIR)
    }

    /// Clone URL of a repository in the configured organization.
    pub fn remote_url(&self, repo: &str) -> String {
        match self.github_protocol {
            GithubProtocol::Ssh => format!(
                "git@github.com:/{}/{}.git",
                self.github_organization, repo
            ),
            GithubProtocol::Https => format!(
                "https://github.com/{}/{}.git",
                self.github_organization, repo
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loads_defaults() {
        let config = AdvisorConfig::default();
        assert_eq!(config.main_branch, "master");
        assert_eq!(config.release_line_count, 3);
        assert_eq!(
            config.git_operation_timeout(),
            Some(Duration::from_secs(30))
        );
        assert!(!config.comment_template.is_empty());
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let config = AdvisorConfig::from_toml(
            r#"
integration_directory = "/srv/integration"
github_protocol = "https"
release_line_count = 2
"#,
        )
        .unwrap();

        assert_eq!(
            config.integration_directory,
            PathBuf::from("/srv/integration")
        );
        assert_eq!(config.github_protocol, GithubProtocol::Https);
        assert_eq!(config.release_line_count, 2);
        assert_eq!(config.changelog_marker, "Changelog");
        assert_eq!(
            config.release_tool_directory(),
            PathBuf::from("/srv/integration/extra")
        );
    }

    #[test]
    fn rejects_empty_release_tool() {
        let result = AdvisorConfig::from_toml("release_tool = []");
        assert!(matches!(result, Err(AdvisorError::InvalidConfig(_))));
    }

    #[test]
    fn zero_timeout_disables_deadline() {
        let config =
            AdvisorConfig::from_toml("git_operation_timeout_secs = 0").unwrap();
        assert_eq!(config.git_operation_timeout(), None);
    }

    #[test]
    fn builds_remote_urls_per_protocol() {
        let mut config = AdvisorConfig::default();
        assert_eq!(
            config.remote_url("workflows"),
            "git@github.com:/mendersoftware/workflows.git"
        );

        config.github_protocol = GithubProtocol::Https;
        assert_eq!(
            config.remote_url("workflows"),
            "https://github.com/mendersoftware/workflows.git"
        );
    }

    #[test]
    fn missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config =
            AdvisorConfig::load(&dir.path().join("nope.toml")).unwrap();
        assert_eq!(config.github_organization, "mendersoftware");
    }
}
