use thiserror::Error;

pub type ApiResult<T> = std::result::Result<T, ApiError>;

/// Failures talking to the admin backend.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),

    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("{message} (HTTP {status})")]
    Status { status: u16, message: String },

    #[error("unexpected response from {path}: {reason}")]
    UnexpectedShape { path: String, reason: String },
}

impl ApiError {
    /// The message a UI would show next to its error flag.
    pub fn message(&self) -> String {
        match self {
            ApiError::Status { message, .. } => message.clone(),
            other => other.to_string(),
        }
    }
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Api(#[from] ApiError),

    #[error("token storage failed: {0}")]
    Storage(#[from] std::io::Error),

    #[error("login response did not contain a token")]
    MissingToken,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_errors_surface_the_backend_message() {
        let err = ApiError::Status {
            status: 401,
            message: "Invalid credentials".to_string(),
        };
        assert_eq!(err.message(), "Invalid credentials");
        assert_eq!(err.to_string(), "Invalid credentials (HTTP 401)");
    }

    #[test]
    fn session_errors_wrap_api_errors_transparently() {
        let err: SessionError = ApiError::UnexpectedShape {
            path: "/categories".to_string(),
            reason: "expected a JSON array".to_string(),
        }
        .into();
        assert_eq!(
            err.to_string(),
            "unexpected response from /categories: expected a JSON array"
        );
    }
}
