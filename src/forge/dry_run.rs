//! Comment poster for dry runs.
use async_trait::async_trait;
use log::*;

use crate::{error::Result, forge::traits::CommentPoster};

/// Logs the comment that would have been posted.
#[derive(Debug, Default)]
pub struct DryRunPoster;

#[async_trait]
impl CommentPoster for DryRunPoster {
    async fn create_comment(
        &self,
        organization: &str,
        repository: &str,
        issue_number: u64,
        body: &str,
    ) -> Result<()> {
        info!(
            "dry-run: would comment on \
             {organization}/{repository}#{issue_number}:\n{body}"
        );
        Ok(())
    }
}
