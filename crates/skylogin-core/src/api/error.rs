use serde::Deserialize;
use thiserror::Error;

/// XRPC error name a PDS returns when an email sign-in code is needed.
pub const AUTH_FACTOR_TOKEN_REQUIRED: &str = "AuthFactorTokenRequired";

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("{}", xrpc_display(.error, .message.as_deref()))]
    Xrpc {
        status: u16,
        error: String,
        message: Option<String>,
    },

    #[error("Rate limited - please wait before retrying")]
    RateLimited,

    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

/// Error body shape shared by every XRPC endpoint.
#[derive(Debug, Deserialize)]
struct XrpcErrorBody {
    error: String,
    #[serde(default)]
    message: Option<String>,
}

/// Maximum length for error response bodies in error messages
const MAX_ERROR_BODY_LENGTH: usize = 500;

fn xrpc_display(error: &str, message: Option<&str>) -> String {
    match message {
        Some(message) if !message.is_empty() => message.to_string(),
        _ => error.to_string(),
    }
}

impl ApiError {
    /// Truncate a response body to avoid logging excessive data
    fn truncate_body(body: &str) -> String {
        if body.len() <= MAX_ERROR_BODY_LENGTH {
            body.to_string()
        } else {
            let cut = (0..=MAX_ERROR_BODY_LENGTH)
                .rev()
                .find(|&i| body.is_char_boundary(i))
                .unwrap_or(0);
            format!("{}... (truncated, {} total bytes)", &body[..cut], body.len())
        }
    }

    pub fn from_status(status: reqwest::StatusCode, body: &str) -> Self {
        if let Ok(parsed) = serde_json::from_str::<XrpcErrorBody>(body) {
            return ApiError::Xrpc {
                status: status.as_u16(),
                error: parsed.error,
                message: parsed.message,
            };
        }

        match status.as_u16() {
            429 => ApiError::RateLimited,
            _ => ApiError::InvalidResponse(format!(
                "Status {}: {}",
                status,
                Self::truncate_body(body)
            )),
        }
    }

    /// Human-readable message suitable for a notification, if there is one.
    pub fn message(&self) -> Option<String> {
        match self {
            ApiError::Xrpc { message, .. } => message.clone().filter(|m| !m.is_empty()),
            other => Some(other.to_string()),
        }
    }

    /// True when the server wants an emailed sign-in code before it will
    /// create a session.
    pub fn is_auth_factor_required(&self) -> bool {
        matches!(self, ApiError::Xrpc { error, .. } if error == AUTH_FACTOR_TOKEN_REQUIRED)
    }
}
