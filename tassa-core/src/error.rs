//! Error types for tassa-core.

use std::path::PathBuf;

use thiserror::Error;

/// All errors that can arise from loading documents and profiles.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The desired-state document failed structural validation.
    ///
    /// Carries every violation, in document order.
    #[error("invalid configuration: {}", errors.join("; "))]
    Invalid { errors: Vec<String> },

    /// Underlying I/O failure, with the path that was being read or written.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// YAML serialization error (profile save path).
    #[error("YAML serialization error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// Profile YAML parse error on load.
    #[error("failed to parse profile at {path}: {source}")]
    Profile {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    /// The profile file did not exist at the expected path.
    #[error("profile not found at {path}")]
    ProfileNotFound { path: PathBuf },

    /// `dirs::home_dir()` returned `None`: cannot locate `~/.tassa/`.
    #[error("cannot determine home directory; set $HOME or equivalent")]
    HomeNotFound,
}

impl ConfigError {
    /// Validation violations, or an empty slice for every other variant.
    pub fn violations(&self) -> &[String] {
        match self {
            ConfigError::Invalid { errors } => errors,
            _ => &[],
        }
    }

    pub(crate) fn invalid(message: impl Into<String>) -> Self {
        ConfigError::Invalid {
            errors: vec![message.into()],
        }
    }
}

/// Convenience constructor for [`ConfigError::Io`].
pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> ConfigError {
    ConfigError::Io {
        path: path.into(),
        source,
    }
}
