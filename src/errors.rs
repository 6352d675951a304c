use std::fmt;

/// Error type carrying the process exit code
#[derive(Debug)]
pub enum CliError {
    /// Bad flags or arguments (exit code 2)
    Usage(String),
    /// Named profile does not exist (exit code 3)
    NotFound(String),
    /// Everything else (exit code 1)
    Other(anyhow::Error),
}

impl CliError {
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::Usage(_) => 2,
            CliError::NotFound(_) => 3,
            CliError::Other(_) => 1,
        }
    }

    pub fn usage(msg: impl Into<String>) -> Self {
        CliError::Usage(msg.into())
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliError::Usage(msg) => write!(f, "{}", msg),
            CliError::NotFound(msg) => write!(f, "{}", msg),
            CliError::Other(err) => write!(f, "{}", err),
        }
    }
}

impl std::error::Error for CliError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CliError::Other(err) => Some(err.as_ref()),
            _ => None,
        }
    }
}

impl From<anyhow::Error> for CliError {
    fn from(err: anyhow::Error) -> Self {
        CliError::Other(err)
    }
}

pub type CliResult<T> = Result<T, CliError>;
