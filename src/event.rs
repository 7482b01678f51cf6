//! Pull request events that trigger an advisory run.
use serde::Deserialize;
use std::path::Path;

use crate::error::Result;

/// Action GitHub reports when a pull request is closed or merged.
pub const CLOSED_ACTION: &str = "closed";

/// Immutable facts about the pull request under consideration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PullRequestContext {
    pub repository: String,
    pub number: u64,
    pub base_ref: String,
    pub base_sha: String,
    pub merged: bool,
}

/// A pull request event together with the action that triggered it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PullRequestEvent {
    pub action: String,
    pub pull_request: PullRequestContext,
}

impl PullRequestEvent {
    /// Local branch name the pull request head is fetched into.
    pub fn pr_branch(&self) -> String {
        format!("pr_{}", self.pull_request.number)
    }

    /// Remote ref of the pull request head on GitHub.
    pub fn pr_head_ref(&self) -> String {
        format!("pull/{}/head", self.pull_request.number)
    }

    /// Parse a GitHub `pull_request` webhook payload.
    pub fn from_webhook_json(payload: &str) -> Result<Self> {
        let payload: WebhookPayload = serde_json::from_str(payload)?;
        Ok(payload.into())
    }

    /// Read and parse a webhook payload stored on disk.
    pub fn from_webhook_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_webhook_json(&content)
    }
}

#[derive(Debug, Deserialize)]
struct WebhookBase {
    #[serde(rename = "ref")]
    git_ref: String,
    sha: String,
}

#[derive(Debug, Deserialize)]
struct WebhookPullRequest {
    #[serde(default)]
    merged: Option<bool>,
    base: WebhookBase,
}

#[derive(Debug, Deserialize)]
struct WebhookRepository {
    name: String,
}

#[derive(Debug, Deserialize)]
struct WebhookPayload {
    action: String,
    number: u64,
    pull_request: WebhookPullRequest,
    repository: WebhookRepository,
}

impl From<WebhookPayload> for PullRequestEvent {
    fn from(payload: WebhookPayload) -> Self {
        Self {
            action: payload.action,
            pull_request: PullRequestContext {
                repository: payload.repository.name,
                number: payload.number,
                base_ref: payload.pull_request.base.git_ref,
                base_sha: payload.pull_request.base.sha,
                merged: payload.pull_request.merged.unwrap_or(false),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAYLOAD: &str = r#"{
  "action": "closed",
  "number": 140,
  "pull_request": {
    "number": 140,
    "merged": true,
    "base": {
      "ref": "master",
      "sha": "0123abcd",
      "label": "mendersoftware:master"
    },
    "head": { "ref": "feature", "sha": "fedc3210" }
  },
  "repository": { "name": "workflows", "full_name": "mendersoftware/workflows" }
}"#;

    #[test]
    fn parses_webhook_payload() {
        let event = PullRequestEvent::from_webhook_json(PAYLOAD).unwrap();

        assert_eq!(event.action, "closed");
        assert_eq!(
            event.pull_request,
            PullRequestContext {
                repository: "workflows".into(),
                number: 140,
                base_ref: "master".into(),
                base_sha: "0123abcd".into(),
                merged: true,
            }
        );
        assert_eq!(event.pr_branch(), "pr_140");
        assert_eq!(event.pr_head_ref(), "pull/140/head");
    }

    #[test]
    fn missing_merged_flag_means_not_merged() {
        let payload = PAYLOAD.replace("\"merged\": true,", "");
        let event = PullRequestEvent::from_webhook_json(&payload).unwrap();
        assert!(!event.pull_request.merged);
    }

    #[test]
    fn rejects_malformed_payload() {
        let result = PullRequestEvent::from_webhook_json("{\"action\": 1}");
        assert!(matches!(
            result,
            Err(crate::error::AdvisorError::JsonParseError(_))
        ));
    }
}
