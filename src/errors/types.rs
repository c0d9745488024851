//! # Error Types
//!
//! Error types for the meshplane generation core using `thiserror`.
//!
//! Only programming-level failures are errors here. A policy that does not
//! apply (no routes for a host, mTLS disabled) is expressed as `None` or an
//! explicit outcome value, never as an `Err`.

/// Custom result type for meshplane operations
pub type Result<T> = std::result::Result<T, MeshplaneError>;

/// Main error type for the meshplane generation core
#[derive(thiserror::Error, Debug)]
pub enum MeshplaneError {
    /// Configuration errors
    #[error("Configuration error: {message}")]
    Config {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Validation errors
    #[error("Validation error: {message}")]
    Validation {
        message: String,
        field: Option<String>,
    },

    /// Protobuf or JSON encoding errors while building proxy configuration
    #[error("Serialization error: {context}")]
    Serialization {
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
        context: String,
    },
}

impl MeshplaneError {
    /// Create a new configuration error
    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Config {
            message: message.into(),
            source: None,
        }
    }

    /// Create a configuration error with source
    pub fn config_with_source<S: Into<String>>(
        message: S,
        source: Box<dyn std::error::Error + Send + Sync>,
    ) -> Self {
        Self::Config {
            message: message.into(),
            source: Some(source),
        }
    }

    /// Create a validation error
    pub fn validation<S: Into<String>>(message: S) -> Self {
        Self::Validation {
            message: message.into(),
            field: None,
        }
    }

    /// Create a validation error with field information
    pub fn validation_field<S: Into<String>, F: Into<String>>(message: S, field: F) -> Self {
        Self::Validation {
            message: message.into(),
            field: Some(field.into()),
        }
    }

    /// Create a serialization error with context
    pub fn serialization<E, S>(source: E, context: S) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
        S: Into<String>,
    {
        Self::Serialization {
            source: Box::new(source),
            context: context.into(),
        }
    }

    /// Prefix the context of a serialization error
    pub(crate) fn add_context(mut self, context: &str) -> Self {
        if let MeshplaneError::Serialization { context: ctx, .. } = &mut self {
            *ctx = format!("{}: {}", context, ctx);
        }
        self
    }
}

impl From<prost::EncodeError> for MeshplaneError {
    fn from(error: prost::EncodeError) -> Self {
        Self::serialization(error, "Protobuf encoding failed")
    }
}

impl From<serde_json::Error> for MeshplaneError {
    fn from(error: serde_json::Error) -> Self {
        Self::serialization(error, "JSON serialization failed")
    }
}

impl From<validator::ValidationErrors> for MeshplaneError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let mut fields = errors
            .field_errors()
            .iter()
            .map(|(field, field_errors)| {
                let error_messages: Vec<String> = field_errors
                    .iter()
                    .map(|e| e.message.as_deref().unwrap_or("Invalid value").to_string())
                    .collect();
                format!("{}: {}", field, error_messages.join(", "))
            })
            .collect::<Vec<_>>();
        fields.sort();

        Self::validation(format!("Validation failed: {}", fields.join("; ")))
    }
}
