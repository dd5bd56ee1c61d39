//! CLI error handling

use std::fmt;

use archfix_errors::UserFacingError;

/// CLI-specific error type
#[derive(Debug)]
pub enum CliError {
    /// Configuration error
    Config(archfix_errors::Error),
    /// Operations error
    Ops(archfix_errors::Error),
    /// No bundle path given and none of the known locations exist
    NoBundle,
    /// I/O error
    Io(std::io::Error),
}

impl CliError {
    /// Stable code for JSON error output
    pub fn code(&self) -> Option<&'static str> {
        match self {
            CliError::Config(e) | CliError::Ops(e) => e.user_code(),
            CliError::NoBundle => Some("cli.no_bundle"),
            CliError::Io(_) => Some("cli.io"),
        }
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliError::Config(e) => write!(f, "Configuration error: {}", e.user_message()),
            CliError::Ops(e) => {
                let message = e.user_message();
                write!(f, "{message}")?;
                if let Some(code) = e.user_code() {
                    write!(f, "\n  Code: {code}")?;
                }
                if let Some(hint) = e.user_hint() {
                    write!(f, "\n  Hint: {hint}")?;
                }
                if e.is_retryable() {
                    write!(f, "\n  Retry: safe to retry this operation.")?;
                }
                Ok(())
            }
            CliError::NoBundle => write!(
                f,
                "No bundle path given and no known installation was found"
            ),
            CliError::Io(e) => write!(f, "I/O error: {e}"),
        }
    }
}

impl std::error::Error for CliError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CliError::Config(e) | CliError::Ops(e) => Some(e),
            CliError::Io(e) => Some(e),
            CliError::NoBundle => None,
        }
    }
}

impl From<archfix_errors::Error> for CliError {
    fn from(e: archfix_errors::Error) -> Self {
        match e {
            archfix_errors::Error::Config(_) => CliError::Config(e),
            other => CliError::Ops(other),
        }
    }
}

impl From<std::io::Error> for CliError {
    fn from(e: std::io::Error) -> Self {
        CliError::Io(e)
    }
}
