//! Traits related to remote git forges
use async_trait::async_trait;

#[cfg(test)]
use mockall::automock;

use crate::error::Result;

/// Posts comments on pull requests / issues.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait CommentPoster: Send + Sync {
    async fn create_comment(
        &self,
        organization: &str,
        repository: &str,
        issue_number: u64,
        body: &str,
    ) -> Result<()>;
}
