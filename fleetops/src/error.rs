//! Startup errors for the fleetops service.
//!
//! Request handling uses [`fleetcrud::ApiError`]; this type covers everything that can
//! stop the service from starting: configuration, database, migrations, bootstrap and
//! binding.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    /// Failed to load configuration.
    #[error("failed to load configuration: {0}")]
    ConfigLoad(Box<figment::Error>),

    /// Configuration validation failed.
    #[error("invalid configuration: {message}")]
    ConfigValidation { message: String },

    /// Connecting to or querying the database failed.
    #[error("database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    /// Failed to run database migrations.
    #[error("database migration failed: {0}")]
    Migration(String),

    /// Creating the first organization failed.
    #[error("bootstrap failed: {0}")]
    Bootstrap(#[from] fleetcrud::ApiError),

    /// Failed to bind the HTTP listener.
    #[error("failed to bind {address}: {source}")]
    Bind {
        address: String,
        #[source]
        source: std::io::Error,
    },

    /// The HTTP server stopped with an error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

impl From<figment::Error> for Error {
    fn from(err: figment::Error) -> Self {
        Self::ConfigLoad(Box::new(err))
    }
}

impl Error {
    #[must_use]
    pub fn config_validation(message: impl Into<String>) -> Self {
        Self::ConfigValidation {
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_validation_display() {
        let err = Error::config_validation("server.bind_address must not be empty");
        assert_eq!(
            err.to_string(),
            "invalid configuration: server.bind_address must not be empty"
        );
    }

    #[test]
    fn test_from_db_error() {
        let err: Error = sea_orm::DbErr::Custom("connection refused".to_string()).into();
        assert!(matches!(err, Error::Database(_)));
        assert!(err.to_string().contains("connection refused"));
    }

    #[test]
    fn test_bind_error_display() {
        let err = Error::Bind {
            address: "0.0.0.0:80".to_string(),
            source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        };
        let msg = err.to_string();
        assert!(msg.contains("0.0.0.0:80"));
        assert!(msg.contains("denied"));
    }
}
