//! Comment delivery to the forge hosting the product repositories.
//!
//! The advisor only needs to post a single comment per run, expressed by
//! the [`traits::CommentPoster`] trait so tests and dry runs can replace the
//! GitHub client.

/// Connection settings for the GitHub API.
pub mod config;

/// Poster that logs comments instead of sending them.
pub mod dry_run;

/// GitHub API client implementation.
pub mod github;

/// Common traits for forge platform abstraction.
pub mod traits;
