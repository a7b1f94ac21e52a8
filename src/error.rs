use thiserror::Error;

/// Unified error type for git-versioning operations
#[derive(Error, Debug)]
pub enum GitVersioningError {
    #[error("Git operation failed: {0}")]
    Git(#[from] git2::Error),

    #[error("Invalid pattern: {0}")]
    Pattern(#[from] regex::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("No rule matches the current git situation")]
    NoMatch,

    #[error("Unknown placeholder: ${{{0}}}")]
    UnknownPlaceholder(String),

    #[error("Invalid increment: cannot add {delta} to '{token}'")]
    InvalidIncrement { token: String, delta: i64 },

    #[error("Stale mutation: {0} cannot change after placeholders were computed")]
    StaleMutation(String),

    #[error("Repository error: {0}")]
    Repository(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience type alias for Results in git-versioning
pub type Result<T> = std::result::Result<T, GitVersioningError>;

impl GitVersioningError {
    /// Create a configuration error with context
    pub fn config(msg: impl Into<String>) -> Self {
        GitVersioningError::Config(msg.into())
    }

    /// Create an unknown placeholder error for `key`
    pub fn unknown_placeholder(key: impl Into<String>) -> Self {
        GitVersioningError::UnknownPlaceholder(key.into())
    }

    /// Create an increment error
    pub fn invalid_increment(token: impl Into<String>, delta: i64) -> Self {
        GitVersioningError::InvalidIncrement {
            token: token.into(),
            delta,
        }
    }

    /// Create a stale mutation error naming the attribute
    pub fn stale_mutation(attribute: impl Into<String>) -> Self {
        GitVersioningError::StaleMutation(attribute.into())
    }

    /// Create a repository error with context
    pub fn repository(msg: impl Into<String>) -> Self {
        GitVersioningError::Repository(msg.into())
    }
}

impl From<toml::de::Error> for GitVersioningError {
    fn from(err: toml::de::Error) -> Self {
        GitVersioningError::Config(err.to_string())
    }
}
