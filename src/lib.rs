//! Cherry-pick advice for merged pull requests of a multi-repository
//! product line.
//!
//! Given a merged pull request, the advisor materializes the merge in a
//! transient git work area, checks whether any commit carries a changelog
//! entry and, if so, asks the product's release tool which maintained
//! release lines contain the repository. The result is posted as a comment
//! suggesting the release branches to backport to.
pub mod advisor;
pub mod changelog;
pub mod cli;
pub mod command;
pub mod config;
pub mod error;
pub mod event;
pub mod forge;
pub mod release;
pub mod suggestion;
pub mod workarea;

pub use advisor::{CherryPickAdvisor, Outcome};
pub use error::{AdvisorError, Result};
