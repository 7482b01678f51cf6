//! Transient git workspaces.
//!
//! A [`WorkArea`] is a uniquely named temporary directory holding a freshly
//! initialised repository with a single remote. Only the refs needed to
//! establish a diff range are fetched up front; [`WorkArea::fetch_all`]
//! widens the view later if the run gets that far.
//!
//! The directory is removed by [`WorkArea::close`], which is also called on
//! drop, so every exit path of a run releases the workspace exactly once.
use log::*;
use std::{
    path::{Path, PathBuf},
    sync::Arc,
    time::Duration,
};
use tempfile::TempDir;

use crate::{
    command::{Capture, CommandRequest, CommandRunner},
    config::{AdvisorConfig, WORK_AREA_REMOTE},
    error::{AdvisorError, Result},
};

const WORK_AREA_PREFIX: &str = "cherrypick-";

/// A remote ref and the local branch it is fetched into.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefSpec {
    pub remote_ref: String,
    pub local_name: String,
}

impl RefSpec {
    pub fn new(
        remote_ref: impl Into<String>,
        local_name: impl Into<String>,
    ) -> Self {
        Self {
            remote_ref: remote_ref.into(),
            local_name: local_name.into(),
        }
    }

    fn refspec(&self) -> String {
        format!("{}:{}", self.remote_ref, self.local_name)
    }
}

/// Settings shared by every work area of a run.
#[derive(Debug, Clone, Default)]
pub struct WorkAreaOptions {
    /// Name given to the single remote.
    pub remote: String,
    /// Parent directory; system temp dir when `None`.
    pub root: Option<PathBuf>,
    /// Deadline for network operations (fetch).
    pub fetch_timeout: Option<Duration>,
}

impl From<&AdvisorConfig> for WorkAreaOptions {
    fn from(config: &AdvisorConfig) -> Self {
        Self {
            remote: WORK_AREA_REMOTE.into(),
            root: config.work_root.clone(),
            fetch_timeout: config.git_operation_timeout(),
        }
    }
}

/// Exclusively owned, disposable git workspace.
pub struct WorkArea {
    runner: Arc<dyn CommandRunner>,
    dir: Option<TempDir>,
    path: PathBuf,
    remote: String,
    branches: Vec<String>,
    fetch_timeout: Option<Duration>,
}

impl WorkArea {
    /// Create the workspace and fetch `refs` from `remote_url`.
    ///
    /// Runs `git init`, `git remote add` and one `git fetch` per ref in
    /// order, stopping at the first failure. A failed open still removes
    /// the directory.
    pub async fn open(
        runner: Arc<dyn CommandRunner>,
        options: &WorkAreaOptions,
        remote_url: &str,
        refs: &[RefSpec],
    ) -> Result<Self> {
        let mut builder = tempfile::Builder::new();
        builder.prefix(WORK_AREA_PREFIX);

        let dir = match &options.root {
            Some(root) => builder.tempdir_in(root),
            None => builder.tempdir(),
        }
        .map_err(|err| AdvisorError::workspace_setup(err.into()))?;

        let mut work_area = Self {
            runner,
            path: dir.path().to_path_buf(),
            dir: Some(dir),
            remote: options.remote.clone(),
            branches: vec![],
            fetch_timeout: options.fetch_timeout,
        };

        info!(
            "initializing work area {} for {remote_url}",
            work_area.path.display()
        );

        work_area.setup(remote_url, refs).await?;

        Ok(work_area)
    }

    async fn setup(
        &mut self,
        remote_url: &str,
        refs: &[RefSpec],
    ) -> Result<()> {
        self.git(["init", "."], Capture::Combined)
            .await
            .map_err(AdvisorError::workspace_setup)?;

        let remote = self.remote.clone();
        self.git(
            ["remote", "add", remote.as_str(), remote_url],
            Capture::Combined,
        )
        .await
        .map_err(AdvisorError::workspace_setup)?;

        for spec in refs.iter() {
            let request = CommandRequest::git([
                "fetch".to_string(),
                remote.clone(),
                spec.refspec(),
            ])
            .deadline(self.fetch_timeout);

            self.run(request)
                .await
                .map_err(AdvisorError::workspace_setup)?;

            self.branches.push(spec.local_name.clone());
        }

        Ok(())
    }

    /// Fetch every branch and tag of the remote.
    pub async fn fetch_all(&self) -> Result<()> {
        let request = CommandRequest::git(["fetch", self.remote.as_str()])
            .deadline(self.fetch_timeout);

        self.run(request)
            .await
            .map_err(AdvisorError::workspace_setup)?;

        Ok(())
    }

    /// Run a git command inside the work area.
    pub async fn git<I, S>(&self, args: I, capture: Capture) -> Result<String>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.run(CommandRequest::git(args).capture(capture)).await
    }

    async fn run(&self, request: CommandRequest) -> Result<String> {
        self.runner.run(request.current_dir(&self.path)).await
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn remote(&self) -> &str {
        &self.remote
    }

    /// Local branches created by the initial fetch, in fetch order.
    pub fn branches(&self) -> &[String] {
        &self.branches
    }

    pub fn is_closed(&self) -> bool {
        self.dir.is_none()
    }

    /// Remove the workspace directory. Safe to call more than once;
    /// failures are logged and swallowed.
    pub fn close(&mut self) {
        let Some(dir) = self.dir.take() else {
            return;
        };

        match dir.close() {
            Ok(()) => debug!("removed work area {}", self.path.display()),
            Err(err) => warn!(
                "failed to remove work area {}: {err}",
                self.path.display()
            ),
        }
    }
}

impl Drop for WorkArea {
    fn drop(&mut self) {
        self.close();
    }
}

#[cfg(test)]
#[path = "workarea_tests.rs"]
mod tests;
