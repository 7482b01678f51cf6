//! Implements the CommentPoster trait for Github
use async_trait::async_trait;
use log::*;
use octocrab::Octocrab;

use crate::{
    error::{AdvisorError, Result},
    forge::{config::GithubConfig, traits::CommentPoster},
};

/// GitHub client using Octocrab for API interactions.
pub struct Github {
    instance: Octocrab,
}

impl Github {
    /// Create GitHub client with personal access token authentication and
    /// API base URL configuration.
    pub fn new(config: GithubConfig) -> Result<Self> {
        let instance = Octocrab::builder()
            .personal_token(config.token)
            .base_uri(config.base_uri)?
            .build()?;

        Ok(Self { instance })
    }
}

#[async_trait]
impl CommentPoster for Github {
    async fn create_comment(
        &self,
        organization: &str,
        repository: &str,
        issue_number: u64,
        body: &str,
    ) -> Result<()> {
        let result = self
            .instance
            .issues(organization, repository)
            .create_comment(issue_number, body)
            .await;

        match result {
            Ok(comment) => {
                info!(
                    "commented on {organization}/{repository}#{issue_number}: \
                     {}",
                    comment.html_url
                );
                Ok(())
            }
            Err(err) => {
                let msg = format!(
                    "failed to comment on \
                     {organization}/{repository}#{issue_number}: {err}"
                );
                error!("{msg}");
                Err(AdvisorError::Delivery(msg))
            }
        }
    }
}
