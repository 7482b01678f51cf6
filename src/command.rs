//! Bounded execution of external commands.
//!
//! Every call spawns exactly one process, placed in its own process group on
//! unix. When a deadline is set, waiting for the process and reading all of
//! its output race a timer. On expiry the whole group is killed and the
//! process reaped before the call returns [`AdvisorError::Timeout`], so
//! nothing it started outlives [`CommandRunner::run`].
use async_trait::async_trait;
use log::*;
use std::{
    fmt,
    path::{Path, PathBuf},
    process::Stdio,
    time::Duration,
};
use tokio::{
    io::{AsyncRead, AsyncReadExt},
    process::{Child, Command},
    task::JoinHandle,
};

#[cfg(test)]
use mockall::automock;

use crate::error::{AdvisorError, Result};

/// Which streams are handed back to the caller on success.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum Capture {
    /// stdout followed by stderr, for diagnostic text.
    #[default]
    Combined,
    /// stdout only, for structured results.
    Stdout,
}

/// A single external command invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandRequest {
    pub program: String,
    pub args: Vec<String>,
    pub dir: PathBuf,
    pub deadline: Option<Duration>,
    pub capture: Capture,
}

impl CommandRequest {
    pub fn new<I, S>(program: impl Into<String>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
            dir: PathBuf::from("."),
            deadline: None,
            capture: Capture::default(),
        }
    }

    /// Shorthand for a `git` invocation.
    pub fn git<I, S>(args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new("git", args)
    }

    pub fn current_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.dir = dir.as_ref().to_path_buf();
        self
    }

    pub fn deadline(mut self, deadline: Option<Duration>) -> Self {
        self.deadline = deadline;
        self
    }

    pub fn capture(mut self, capture: Capture) -> Self {
        self.capture = capture;
        self
    }

    /// First argument, used to dispatch on git subcommands.
    pub fn subcommand(&self) -> Option<&str> {
        self.args.first().map(String::as_str)
    }
}

impl fmt::Display for CommandRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in self.args.iter() {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}

/// Executes external processes on behalf of the advisor.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// Run the command to completion and return its captured output with
    /// trailing whitespace removed.
    async fn run(&self, request: CommandRequest) -> Result<String>;
}

/// [`CommandRunner`] backed by real OS processes.
#[derive(Debug, Default, Clone)]
pub struct ProcessRunner;

impl ProcessRunner {
    pub fn new() -> Self {
        Self
    }
}

fn drain<R>(stream: Option<R>) -> JoinHandle<Vec<u8>>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut buf = vec![];
        if let Some(mut stream) = stream
            && let Err(err) = stream.read_to_end(&mut buf).await
        {
            warn!("failed to read command output: {err}");
        }
        buf
    })
}

async fn collect(handle: &mut JoinHandle<Vec<u8>>) -> String {
    let bytes = handle.await.unwrap_or_default();
    String::from_utf8_lossy(&bytes).to_string()
}

/// Kill everything in the process group led by `pid`, then reap the child.
async fn terminate(child: &mut Child, pid: Option<u32>) {
    #[cfg(unix)]
    {
        use nix::{
            sys::signal::{Signal, killpg},
            unistd::Pid,
        };

        if let Some(pid) = pid
            && let Err(err) = killpg(Pid::from_raw(pid as i32), Signal::SIGKILL)
        {
            warn!("failed to kill process group {pid}: {err}");
        }
    }

    #[cfg(not(unix))]
    {
        if let Err(err) = child.start_kill() {
            warn!("failed to kill process {pid:?}: {err}");
        }
    }

    if let Err(err) = child.wait().await {
        error!("failed to reap process {pid:?}: {err}");
    }
}

#[async_trait]
impl CommandRunner for ProcessRunner {
    async fn run(&self, request: CommandRequest) -> Result<String> {
        debug!("running: {request} (in {})", request.dir.display());

        let mut command = Command::new(&request.program);
        command
            .args(&request.args)
            .current_dir(&request.dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        // new process group; timeouts kill the whole group
        #[cfg(unix)]
        command.process_group(0);

        let mut child = command.spawn().map_err(|err| {
            AdvisorError::command_failed(
                request.to_string(),
                format!("failed to spawn: {err}"),
            )
        })?;

        let pid = child.id();
        let mut stdout = drain(child.stdout.take());
        let mut stderr = drain(child.stderr.take());

        // output is complete only once every holder of the pipes is gone
        let completion = async {
            let status = child.wait().await?;
            let stdout = collect(&mut stdout).await;
            let stderr = collect(&mut stderr).await;
            Ok::<_, AdvisorError>((status, stdout, stderr))
        };

        let (status, stdout, stderr) = match request.deadline {
            Some(deadline) => {
                let finished = tokio::time::timeout(deadline, completion).await;
                match finished {
                    Ok(result) => result?,
                    Err(_) => {
                        warn!("killing `{request}` after {deadline:?}");
                        terminate(&mut child, pid).await;
                        stdout.abort();
                        stderr.abort();
                        return Err(AdvisorError::Timeout {
                            command: request.to_string(),
                            timeout: deadline,
                        });
                    }
                }
            }
            None => completion.await?,
        };

        if !status.success() {
            let output = format!("{stdout}{stderr}").trim_end().to_string();
            return Err(AdvisorError::command_failed(
                request.to_string(),
                format!("{status}: {output}"),
            ));
        }

        let output = match request.capture {
            Capture::Combined => format!("{stdout}{stderr}"),
            Capture::Stdout => stdout,
        };

        Ok(output.trim_end().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn captures_stdout_and_trims_trailing_whitespace() {
        let request =
            CommandRequest::new("sh", ["-c", "printf 'hello  \\n\\n'"])
                .capture(Capture::Stdout);

        let output = ProcessRunner::new().run(request).await.unwrap();

        assert_eq!(output, "hello");
    }

    #[tokio::test]
    async fn combined_capture_includes_stderr() {
        let request =
            CommandRequest::new("sh", ["-c", "echo out; echo err >&2"]);

        let output = ProcessRunner::new().run(request).await.unwrap();

        assert!(output.contains("out"));
        assert!(output.contains("err"));
    }

    #[tokio::test]
    async fn stdout_capture_excludes_stderr() {
        let request =
            CommandRequest::new("sh", ["-c", "echo out; echo err >&2"])
                .capture(Capture::Stdout);

        let output = ProcessRunner::new().run(request).await.unwrap();

        assert_eq!(output, "out");
    }

    #[tokio::test]
    async fn non_zero_exit_reports_command_and_diagnostics() {
        let request =
            CommandRequest::new("sh", ["-c", "echo broken >&2; exit 3"])
                .capture(Capture::Stdout);

        let err = ProcessRunner::new().run(request).await.unwrap_err();

        match err {
            AdvisorError::CommandFailed { command, output } => {
                assert!(command.starts_with("sh -c"));
                assert!(output.contains("broken"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn missing_program_is_a_command_failure() {
        let request = CommandRequest::new("definitely-not-a-real-binary", [
            "--version",
        ]);

        let err = ProcessRunner::new().run(request).await.unwrap_err();

        assert!(matches!(err, AdvisorError::CommandFailed { .. }));
    }

    #[tokio::test]
    async fn runs_in_requested_directory() {
        let dir = tempfile::tempdir().unwrap();
        let request = CommandRequest::new("pwd", Vec::<String>::new())
            .current_dir(dir.path())
            .capture(Capture::Stdout);

        let output = ProcessRunner::new().run(request).await.unwrap();

        let expected = dir.path().canonicalize().unwrap();
        let actual = std::path::Path::new(&output).canonicalize().unwrap();
        assert_eq!(actual, expected);
    }

    #[tokio::test]
    async fn completes_within_deadline() {
        let request = CommandRequest::new("sh", ["-c", "echo quick"])
            .deadline(Some(Duration::from_secs(10)));

        let output = ProcessRunner::new().run(request).await.unwrap();

        assert_eq!(output, "quick");
    }

    /// Whether `pid` names a live process; zombies count as gone.
    #[cfg(target_os = "linux")]
    fn is_running(pid: &str) -> bool {
        std::fs::read_to_string(format!("/proc/{pid}/stat"))
            .ok()
            .and_then(|stat| {
                let (_, rest) = stat.rsplit_once(')')?;
                rest.split_whitespace().next().map(|s| s != "Z")
            })
            .unwrap_or(false)
    }

    #[cfg(target_os = "linux")]
    async fn wait_for_exit(pid: &str) -> bool {
        for _ in 0..40 {
            if !is_running(pid) {
                return true;
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
        false
    }

    #[cfg(target_os = "linux")]
    async fn run_until_timeout(script: &str) -> AdvisorError {
        let request = CommandRequest::new("sh", ["-c", script])
            .deadline(Some(Duration::from_millis(500)));

        ProcessRunner::new().run(request).await.unwrap_err()
    }

    #[cfg(target_os = "linux")]
    #[test_log::test(tokio::test)]
    async fn expired_deadline_kills_the_process() {
        let dir = tempfile::tempdir().unwrap();
        let pid_file = dir.path().join("pid");

        let err = run_until_timeout(&format!(
            "echo $$ > {}; exec sleep 30",
            pid_file.display()
        ))
        .await;

        assert!(err.is_timeout());

        let pid = std::fs::read_to_string(&pid_file).unwrap();
        let pid = pid.trim();
        assert!(!pid.is_empty());
        assert!(
            wait_for_exit(pid).await,
            "process {pid} still running after timeout"
        );
    }

    #[cfg(target_os = "linux")]
    #[test_log::test(tokio::test)]
    async fn expired_deadline_kills_spawned_children() {
        let dir = tempfile::tempdir().unwrap();
        let pid_file = dir.path().join("pid");

        let err = run_until_timeout(&format!(
            "sleep 30 & echo $! > {}; wait",
            pid_file.display()
        ))
        .await;

        assert!(err.is_timeout());

        let pid = std::fs::read_to_string(&pid_file).unwrap();
        let pid = pid.trim();
        assert!(!pid.is_empty());
        assert!(
            wait_for_exit(pid).await,
            "child {pid} still running after timeout"
        );
    }

    #[cfg(target_os = "linux")]
    #[test_log::test(tokio::test)]
    async fn deadline_covers_output_held_by_children() {
        let dir = tempfile::tempdir().unwrap();
        let pid_file = dir.path().join("pid");
        let started = std::time::Instant::now();

        // the shell exits at once but the background sleep keeps stdout open
        let err = run_until_timeout(&format!(
            "sleep 5 & echo $! > {}; echo hi",
            pid_file.display()
        ))
        .await;

        assert!(err.is_timeout());
        assert!(started.elapsed() < Duration::from_secs(3));

        let pid = std::fs::read_to_string(&pid_file).unwrap();
        assert!(wait_for_exit(pid.trim()).await);
    }

    #[test]
    fn displays_as_command_line() {
        let request = CommandRequest::git(["fetch", "github", "master:local"]);
        assert_eq!(request.to_string(), "git fetch github master:local");
        assert_eq!(request.subcommand(), Some("fetch"));
    }
}
