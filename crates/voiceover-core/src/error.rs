//! Error types for the Voiceover core.

/// Result type alias for Voiceover operations
pub type VoiceoverResult<T> = Result<T, VoiceoverError>;

/// Main error type for Voiceover operations
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum VoiceoverError {
    /// Credential or text cannot be represented by the transport encoding
    #[error("Encoding error: {message}")]
    EncodingError {
        /// Error message describing the offending input
        message: String,
    },

    /// The speech provider answered with a non-success status
    #[error("Speech provider error (HTTP {status}): {body}")]
    ProviderError {
        /// HTTP status code returned by the provider
        status: u16,
        /// Raw response body, verbatim
        body: String,
    },

    /// Synthesis failed for a reason other than a provider status
    #[error("Speech synthesis failed: {message}")]
    SynthesisError {
        /// Error message describing the failure
        message: String,
    },

    /// Network or transport error
    #[error("Network error: {message}")]
    NetworkError {
        /// Error message describing the network issue
        message: String,
    },

    /// Timeout error
    #[error("Operation timed out: {message}")]
    TimeoutError {
        /// Error message describing the timeout
        message: String,
    },

    /// The account service rejected the session credentials
    #[error("Authentication rejected: {message}")]
    AuthInvalid {
        /// Message returned by the account service
        message: String,
    },

    /// Any other non-success answer from the account service
    #[error("Account service error (HTTP {status}): {message}")]
    RemoteError {
        /// HTTP status code returned by the account service
        status: u16,
        /// Message returned by the account service
        message: String,
    },

    /// External authorization flow failed or was cancelled
    #[error("OAuth flow failed: {message}")]
    OAuthFlowError {
        /// Error message describing the flow failure
        message: String,
    },

    /// Local key-value storage error
    #[error("Storage error: {message}")]
    StorageError {
        /// Error message describing the storage failure
        message: String,
    },

    /// Invalid input error
    #[error("Invalid input: {message}")]
    InvalidInput {
        /// Error message describing the invalid input
        message: String,
    },

    /// Configuration error
    #[error("Configuration error: {message}")]
    ConfigurationError {
        /// Error message describing the configuration issue
        message: String,
    },

    /// JSON or TOML (de)serialization error
    #[error("Serialization error: {message}")]
    SerializationError {
        /// Error message describing the serialization failure
        message: String,
    },
}

impl VoiceoverError {
    /// Create a new encoding error
    #[must_use]
    pub fn encoding<S: Into<String>>(message: S) -> Self {
        Self::EncodingError {
            message: message.into(),
        }
    }

    /// Create a new provider error from a status and raw body
    #[must_use]
    pub fn provider<S: Into<String>>(status: u16, body: S) -> Self {
        Self::ProviderError {
            status,
            body: body.into(),
        }
    }

    /// Create a new synthesis error
    #[must_use]
    pub fn synthesis<S: Into<String>>(message: S) -> Self {
        Self::SynthesisError {
            message: message.into(),
        }
    }

    /// Create a new network error
    #[must_use]
    pub fn network<S: Into<String>>(message: S) -> Self {
        Self::NetworkError {
            message: message.into(),
        }
    }

    /// Create a new timeout error
    #[must_use]
    pub fn timeout<S: Into<String>>(message: S) -> Self {
        Self::TimeoutError {
            message: message.into(),
        }
    }

    /// Create a new authentication rejection
    #[must_use]
    pub fn auth_invalid<S: Into<String>>(message: S) -> Self {
        Self::AuthInvalid {
            message: message.into(),
        }
    }

    /// Create a new account service error
    #[must_use]
    pub fn remote<S: Into<String>>(status: u16, message: S) -> Self {
        Self::RemoteError {
            status,
            message: message.into(),
        }
    }

    /// Create a new OAuth flow error
    #[must_use]
    pub fn oauth_flow<S: Into<String>>(message: S) -> Self {
        Self::OAuthFlowError {
            message: message.into(),
        }
    }

    /// Create a new storage error
    #[must_use]
    pub fn storage<S: Into<String>>(message: S) -> Self {
        Self::StorageError {
            message: message.into(),
        }
    }

    /// Create a new invalid input error
    #[must_use]
    pub fn invalid_input<S: Into<String>>(message: S) -> Self {
        Self::InvalidInput {
            message: message.into(),
        }
    }

    /// Create a new configuration error
    #[must_use]
    pub fn configuration<S: Into<String>>(message: S) -> Self {
        Self::ConfigurationError {
            message: message.into(),
        }
    }

    /// Create a new serialization error
    #[must_use]
    pub fn serialization<S: Into<String>>(message: S) -> Self {
        Self::SerializationError {
            message: message.into(),
        }
    }

    /// Check if this error is worth retrying at the transport level
    #[must_use]
    pub const fn is_retriable(&self) -> bool {
        matches!(self, Self::NetworkError { .. } | Self::TimeoutError { .. })
    }

    /// Check if this error is due to invalid user input
    #[must_use]
    pub const fn is_user_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidInput { .. }
                | Self::EncodingError { .. }
                | Self::ConfigurationError { .. }
        )
    }

    /// Check if the account service explicitly rejected the credentials
    #[must_use]
    pub const fn is_auth_rejection(&self) -> bool {
        matches!(self, Self::AuthInvalid { .. })
    }

    /// Get the error category for logging
    #[must_use]
    pub const fn category(&self) -> &'static str {
        match self {
            Self::EncodingError { .. } => "encoding",
            Self::ProviderError { .. } => "provider",
            Self::SynthesisError { .. } => "synthesis",
            Self::NetworkError { .. } => "network",
            Self::TimeoutError { .. } => "timeout",
            Self::AuthInvalid { .. } => "auth",
            Self::RemoteError { .. } => "remote",
            Self::OAuthFlowError { .. } => "oauth",
            Self::StorageError { .. } => "storage",
            Self::InvalidInput { .. } => "input",
            Self::ConfigurationError { .. } => "configuration",
            Self::SerializationError { .. } => "serialization",
        }
    }
}

// Convert from common error types
impl From<std::io::Error> for VoiceoverError {
    fn from(err: std::io::Error) -> Self {
        Self::storage(err.to_string())
    }
}

impl From<tokio::time::error::Elapsed> for VoiceoverError {
    fn from(err: tokio::time::error::Elapsed) -> Self {
        Self::timeout(err.to_string())
    }
}

impl From<serde_json::Error> for VoiceoverError {
    fn from(err: serde_json::Error) -> Self {
        Self::serialization(format!("JSON: {err}"))
    }
}

impl From<toml::de::Error> for VoiceoverError {
    fn from(err: toml::de::Error) -> Self {
        Self::configuration(format!("TOML: {err}"))
    }
}

impl From<reqwest::Error> for VoiceoverError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::timeout(err.to_string())
        } else if err.is_decode() {
            Self::serialization(err.to_string())
        } else {
            Self::network(err.to_string())
        }
    }
}
