//! Counting of release-note worthy commits in a commit range.
use log::*;
use regex::Regex;

use crate::{command::Capture, error::Result, workarea::WorkArea};

/// Separates commit messages in the `git log` output.
const RECORD_SEPARATOR: char = '\u{1e}';

/// Literal free text that opts a commit out of the changelog.
const OPT_OUT: &str = "none";

/// Counts commits whose message carries a changelog marker line.
pub struct ChangelogScanner {
    matcher: Regex,
}

impl ChangelogScanner {
    /// Create a scanner for lines of the form `<marker>: <text>`; the marker
    /// is matched case-insensitively.
    pub fn new(marker: &str) -> Result<Self> {
        let pattern =
            format!(r"(?i)^\s*{}:(?<text>.*)$", regex::escape(marker));
        Ok(Self {
            matcher: Regex::new(&pattern)?,
        })
    }

    /// Number of commits in `from..to` with at least one marker line whose
    /// text is not `none`.
    pub async fn count_marked_commits(
        &self,
        work_area: &WorkArea,
        from: &str,
        to: &str,
    ) -> Result<usize> {
        let range = format!("{from}..{to}");
        let format = format!("--format={RECORD_SEPARATOR}%B");

        let log = work_area
            .git(["log", format.as_str(), range.as_str()], Capture::Stdout)
            .await?;

        let count = self.count_in_log(&log);

        debug!("found {count} commits with changelog entries in {range}");

        Ok(count)
    }

    /// Count marked commits in `git log` output where each message starts
    /// with the record separator.
    pub fn count_in_log(&self, log: &str) -> usize {
        log.split(RECORD_SEPARATOR)
            .filter(|message| self.is_marked(message))
            .count()
    }

    /// Whether a single commit message carries a changelog entry.
    pub fn is_marked(&self, message: &str) -> bool {
        message.lines().any(|line| {
            self.matcher
                .captures(line)
                .and_then(|caps| caps.name("text"))
                .map(|text| {
                    let text = text.as_str().trim();
                    !text.is_empty() && !text.eq_ignore_ascii_case(OPT_OUT)
                })
                .unwrap_or(false)
        })
    }
}
