//! Error context enhancement utilities
//!
//! Attaches an operation description or a file path to foreign errors while
//! converting them into [`AppError`].

use std::path::PathBuf;

use super::types::AppError;

/// Extension trait for adding context to error types
pub trait ErrorContextExt<T> {
    /// Add operation context to the error
    fn with_context(self, operation: impl Into<String>) -> Result<T, AppError>;

    /// Add operation and file context
    fn in_file_operation(
        self,
        path: impl Into<PathBuf>,
        operation: impl Into<String>,
    ) -> Result<T, AppError>;
}

impl<T, E> ErrorContextExt<T> for Result<T, E>
where
    E: std::error::Error + Send + Sync + 'static,
{
    fn with_context(self, operation: impl Into<String>) -> Result<T, AppError> {
        self.map_err(|e| {
            let operation = operation.into();
            AppError::Other {
                message: format!("{}: {}", operation, e),
                source: Some(Box::new(e)),
            }
        })
    }

    fn in_file_operation(
        self,
        path: impl Into<PathBuf>,
        operation: impl Into<String>,
    ) -> Result<T, AppError> {
        self.map_err(|e| AppError::io_with_source(path, operation, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_with_context() {
        let result: Result<(), std::io::Error> = Err(std::io::Error::new(
            std::io::ErrorKind::Other,
            "boom",
        ));
        let err = result.with_context("renewing wake hold").unwrap_err();
        assert_eq!(err.to_string(), "renewing wake hold: boom");
    }

    #[test]
    fn test_in_file_operation() {
        let result: Result<(), std::io::Error> = Err(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            "missing",
        ));
        let err = result
            .in_file_operation("/tmp/preferences.toml", "read preferences")
            .unwrap_err();

        match err {
            AppError::Io { path, operation, .. } => {
                assert_eq!(path, PathBuf::from("/tmp/preferences.toml"));
                assert_eq!(operation, "read preferences");
            }
            other => panic!("Expected AppError::Io, got {:?}", other),
        }
    }
}
