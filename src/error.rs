//! Error types and handling for the skillshop application

use thiserror::Error;

/// Main error type for the skillshop application
#[derive(Error, Debug)]
pub enum SkillshopError {
    /// Configuration-related errors
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// Geocoding service errors
    #[error("Geocoding error: {message}")]
    Geocoding { message: String },

    /// Location store errors
    #[error("Store error: {message}")]
    Store { message: String },

    /// Input validation errors
    #[error("Invalid input: {message}")]
    Validation { message: String },

    /// The acting profile may not perform the operation
    #[error("Permission denied: {message}")]
    PermissionDenied { message: String },

    /// Requested record does not exist
    #[error("Not found: {message}")]
    NotFound { message: String },

    /// A listing's location text could not be geocoded
    #[error("Location not found: {query}")]
    LocationNotFound { query: String },

    /// I/O operation errors
    #[error("I/O error: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },
}

impl SkillshopError {
    /// Create a new configuration error
    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create a new geocoding error
    pub fn geocoding<S: Into<String>>(message: S) -> Self {
        Self::Geocoding {
            message: message.into(),
        }
    }

    /// Create a new store error
    pub fn store<S: Into<String>>(message: S) -> Self {
        Self::Store {
            message: message.into(),
        }
    }

    /// Create a new validation error
    pub fn validation<S: Into<String>>(message: S) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    pub fn permission_denied<S: Into<String>>(message: S) -> Self {
        Self::PermissionDenied {
            message: message.into(),
        }
    }

    pub fn not_found<S: Into<String>>(message: S) -> Self {
        Self::NotFound {
            message: message.into(),
        }
    }

    pub fn location_not_found<S: Into<String>>(query: S) -> Self {
        Self::LocationNotFound {
            query: query.into(),
        }
    }

    /// Get a user-friendly error message
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            SkillshopError::Config { .. } => {
                "Configuration error. Please check your config file.".to_string()
            }
            SkillshopError::Geocoding { .. } => {
                "Unable to reach the location service. Please try again later.".to_string()
            }
            SkillshopError::Store { .. } => {
                "Could not save or read locations. Please try again later.".to_string()
            }
            SkillshopError::Validation { message } => format!("Invalid input: {message}"),
            SkillshopError::PermissionDenied { .. } => {
                "You do not have permission to do that.".to_string()
            }
            SkillshopError::NotFound { message } => message.clone(),
            SkillshopError::LocationNotFound { .. } => {
                "Could not find that location. Try a postcode or full town/city name.".to_string()
            }
            SkillshopError::Io { .. } => {
                "File operation failed. Please check file permissions.".to_string()
            }
        }
    }
}

impl From<anyhow::Error> for SkillshopError {
    fn from(err: anyhow::Error) -> Self {
        SkillshopError::store(format!("{err:#}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_creation() {
        let config_err = SkillshopError::config("bad port");
        assert!(matches!(config_err, SkillshopError::Config { .. }));

        let denied = SkillshopError::permission_denied("not the owner");
        assert!(matches!(denied, SkillshopError::PermissionDenied { .. }));

        let validation_err = SkillshopError::validation("invalid coordinates");
        assert!(matches!(validation_err, SkillshopError::Validation { .. }));
    }

    #[test]
    fn test_user_messages() {
        let err = SkillshopError::location_not_found("Nowhereville");
        assert_eq!(
            err.user_message(),
            "Could not find that location. Try a postcode or full town/city name."
        );

        let validation_err = SkillshopError::validation("test input");
        assert!(validation_err.user_message().contains("test input"));

        let denied = SkillshopError::permission_denied("listing 4");
        assert!(!denied.user_message().contains("listing 4"));
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: SkillshopError = io_err.into();
        assert!(matches!(err, SkillshopError::Io { .. }));
    }

    #[test]
    fn test_anyhow_conversion_is_store_error() {
        let err: SkillshopError = anyhow::anyhow!("keyspace closed").into();
        assert!(matches!(err, SkillshopError::Store { .. }));
        assert!(err.to_string().contains("keyspace closed"));
    }
}
