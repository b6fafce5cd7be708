use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Result type for authentication and pipeline operations
pub type Result<T> = std::result::Result<T, AuthError>;

/// Authentication and pipeline error types
#[derive(Error, Debug)]
pub enum AuthError {
    /// Generic failure built from a plain message
    #[error("{0}")]
    Failed(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Authentication scheme not found: {0}")]
    SchemeNotFound(String),

    #[error("No authentication scheme was specified and no default scheme is configured")]
    NoDefaultScheme,

    #[error("Authentication required")]
    Unauthenticated,

    #[error("Service not registered: {0}")]
    ServiceNotRegistered(&'static str),

    #[error("Scoped service {0} cannot be resolved from the root provider")]
    ScopedFromRoot(&'static str),

    #[error("Circular dependency detected while resolving {0}")]
    CircularDependency(&'static str),

    #[error("Service factory failed for {service}: {message}")]
    Factory {
        service: &'static str,
        message: String,
    },

    #[error("No request service scope is attached to this request")]
    ScopeMissing,

    #[error("Internal server error: {0}")]
    Internal(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl AuthError {
    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            AuthError::Failed(_) => StatusCode::UNAUTHORIZED,
            AuthError::Unauthenticated => StatusCode::UNAUTHORIZED,
            AuthError::SchemeNotFound(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AuthError::NoDefaultScheme => StatusCode::INTERNAL_SERVER_ERROR,
            AuthError::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AuthError::ServiceNotRegistered(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AuthError::ScopedFromRoot(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AuthError::CircularDependency(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AuthError::Factory { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            AuthError::ScopeMissing => StatusCode::INTERNAL_SERVER_ERROR,
            AuthError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AuthError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AuthError::Other(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = Json(json!({
            "error": self.to_string(),
            "status": status.as_u16(),
        }));

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_status_codes() {
        assert_eq!(
            AuthError::Failed("bad".to_string()).status_code(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            AuthError::SchemeNotFound("Bearer".to_string()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            AuthError::ScopeMissing.status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_error_display() {
        let err = AuthError::Failed("signature mismatch".to_string());
        assert_eq!(err.to_string(), "signature mismatch");

        let err = AuthError::ServiceNotRegistered("app::Clock");
        assert_eq!(err.to_string(), "Service not registered: app::Clock");
    }

    #[tokio::test]
    async fn test_into_response_body() {
        let response = AuthError::Unauthenticated.into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let value: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(value["status"], 401);
        assert_eq!(value["error"], "Authentication required");
    }
}
