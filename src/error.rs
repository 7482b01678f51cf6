//! Custom error types for the cherry-pick advisor.

use std::time::Duration;

use thiserror::Error;

/// Main error type for advisor operations.
#[derive(Error, Debug)]
pub enum AdvisorError {
    // Cli args errors
    #[error("Invalid arguments: {0}")]
    InvalidArgs(String),

    // Configuration errors
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // External process errors
    #[error("Command `{command}` failed: {output}")]
    CommandFailed { command: String, output: String },

    #[error("Command `{command}` timed out after {timeout:?}")]
    Timeout { command: String, timeout: Duration },

    #[error("Workspace setup failed: {0}")]
    WorkspaceSetup(Box<AdvisorError>),

    #[error("Version resolution failed: {0}")]
    Resolver(Box<AdvisorError>),

    // Forge errors
    #[error("Failed to deliver comment: {0}")]
    Delivery(String),

    #[error("Forge operation failed: {0}")]
    ForgeError(String),

    // Parsing errors - automatic conversions via #[from]
    #[error("Template rendering failed: {0}")]
    TemplateError(#[from] tera::Error),

    #[error("TOML parse error: {0}")]
    TomlParseError(#[from] toml::de::Error),

    #[error("JSON parse error: {0}")]
    JsonParseError(#[from] serde_json::Error),

    #[error("Regular expression error: {0}")]
    RegexError(#[from] regex::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Logger initialization error: {0}")]
    LoggerError(#[from] log::SetLoggerError),
}

/// Result type alias using AdvisorError
pub type Result<T> = std::result::Result<T, AdvisorError>;

impl AdvisorError {
    /// Create a command failure with the rendered command line and its
    /// captured diagnostic output
    pub fn command_failed(
        command: impl Into<String>,
        output: impl Into<String>,
    ) -> Self {
        Self::CommandFailed {
            command: command.into(),
            output: output.into(),
        }
    }

    /// Create an invalid config error
    pub fn invalid_config(msg: impl Into<String>) -> Self {
        Self::InvalidConfig(msg.into())
    }

    /// Wrap an error raised while materializing a work area
    pub fn workspace_setup(err: AdvisorError) -> Self {
        Self::WorkspaceSetup(Box::new(err))
    }

    /// Wrap an error raised by the version-resolution tool
    pub fn resolver(err: AdvisorError) -> Self {
        Self::Resolver(Box::new(err))
    }

    /// Whether this error, or the error it wraps, is a command timeout.
    pub fn is_timeout(&self) -> bool {
        match self {
            Self::Timeout { .. } => true,
            Self::WorkspaceSetup(inner) | Self::Resolver(inner) => {
                inner.is_timeout()
            }
            _ => false,
        }
    }
}

// Implement From for octocrab errors (GitHub API)
impl From<octocrab::Error> for AdvisorError {
    fn from(err: octocrab::Error) -> Self {
        Self::ForgeError(format!("GitHub API error: {}", err))
    }
}
