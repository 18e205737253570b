use spin_sdk::http::Response;
use std::fmt;

#[derive(Debug)]
pub enum ApiError {
    Validation(String),
    Unauthorized,
    Forbidden(String),
    NotFound(String),
    Conflict(String),
    Internal(String),
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::Validation(msg) => write!(f, "Validation: {}", msg),
            ApiError::Unauthorized => write!(f, "Unauthorized"),
            ApiError::Forbidden(msg) => write!(f, "Forbidden: {}", msg),
            ApiError::NotFound(msg) => write!(f, "Not Found: {}", msg),
            ApiError::Conflict(msg) => write!(f, "Conflict: {}", msg),
            ApiError::Internal(msg) => write!(f, "Internal Error: {}", msg),
        }
    }
}

fn json_error(status: u16, msg: &str) -> Response {
    Response::builder()
        .status(status)
        .header("Content-Type", "application/json")
        .body(
            serde_json::to_vec(&serde_json::json!({
                "success": false,
                "message": msg,
            }))
            .unwrap(),
        )
        .build()
}

impl From<ApiError> for Response {
    fn from(err: ApiError) -> Self {
        match err {
            ApiError::Validation(msg) => json_error(400, &msg),
            ApiError::Unauthorized => json_error(401, "Unauthorized"),
            ApiError::Forbidden(msg) => json_error(403, &msg),
            ApiError::NotFound(msg) => json_error(404, &msg),
            ApiError::Conflict(msg) => json_error(400, &msg),
            ApiError::Internal(msg) => {
                // Full detail stays server-side; the caller gets an
                // opaque 500.
                eprintln!("internal error: {}", msg);
                json_error(500, "Internal Server Error")
            }
        }
    }
}

impl std::error::Error for ApiError {}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        ApiError::Internal(err.to_string())
    }
}
