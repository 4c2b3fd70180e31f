use thiserror::Error;

/// Errors reported by the service adapters and the pure helpers around them.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ServiceError {
    #[error("{entity_type} not found: {id}")]
    NotFound {
        entity_type: &'static str,
        id: String,
    },
    #[error("{entity_type} already exists: {id}")]
    AlreadyExists {
        entity_type: &'static str,
        id: String,
    },
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),
    #[error("Request failed: {0}")]
    RequestFailed(String),
    #[error("Serialization error: {0}")]
    Serialization(String),
    #[error("Invalid data: {0}")]
    InvalidData(String),
    #[error("Invalid state: {0}")]
    InvalidState(String),
    #[error("Unsupported: {0}")]
    Unsupported(String),
}

/// Result type for service operations.
pub type Result<T> = std::result::Result<T, ServiceError>;

impl From<serde_json::Error> for ServiceError {
    fn from(err: serde_json::Error) -> Self {
        ServiceError::Serialization(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_display() {
        let error = ServiceError::NotFound {
            entity_type: "Bucket",
            id: "reports".to_string(),
        };
        assert_eq!(error.to_string(), "Bucket not found: reports");
    }

    #[test]
    fn test_already_exists_display() {
        let error = ServiceError::AlreadyExists {
            entity_type: "Movie",
            id: "2013/Rush".to_string(),
        };
        assert_eq!(error.to_string(), "Movie already exists: 2013/Rush");
    }

    #[test]
    fn test_request_failed_display() {
        let error = ServiceError::RequestFailed("Throughput exceeded, please retry".to_string());
        assert_eq!(
            error.to_string(),
            "Request failed: Throughput exceeded, please retry"
        );
    }

    #[test]
    fn test_unsupported_display() {
        let error = ServiceError::Unsupported("image type .gif".to_string());
        assert_eq!(error.to_string(), "Unsupported: image type .gif");
    }

    #[test]
    fn test_from_serde_json_error() {
        let err = serde_json::from_str::<serde_json::Value>("{not json").unwrap_err();
        let error: ServiceError = err.into();
        assert!(matches!(error, ServiceError::Serialization(_)));
    }
}
