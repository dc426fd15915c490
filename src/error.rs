//! Relay error types

/// Error type for relay server operations
#[derive(Debug)]
pub enum RelayError {
    /// I/O error (bind, accept, socket configuration)
    Io(std::io::Error),
    /// Invalid configuration (empty secret, bad bind address)
    Config(String),
}

impl std::fmt::Display for RelayError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RelayError::Io(e) => write!(f, "I/O error: {}", e),
            RelayError::Config(msg) => write!(f, "Invalid configuration: {}", msg),
        }
    }
}

impl std::error::Error for RelayError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            RelayError::Io(e) => Some(e),
            RelayError::Config(_) => None,
        }
    }
}

impl From<std::io::Error> for RelayError {
    fn from(e: std::io::Error) -> Self {
        RelayError::Io(e)
    }
}

/// Result alias for relay operations
pub type Result<T> = std::result::Result<T, RelayError>;
