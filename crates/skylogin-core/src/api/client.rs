//! XRPC client for AT Protocol Personal Data Servers.
//!
//! Only the two session endpoints are used: `createSession` to log in and
//! `deleteSession` to revoke a refresh token on logout.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{header, Client};
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::auth::Credentials;

use super::ApiError;

// ============================================================================
// Constants
// ============================================================================

/// Service used when nothing is configured.
pub const DEFAULT_SERVICE_URL: &str = "https://bsky.social";

const CREATE_SESSION_NSID: &str = "com.atproto.server.createSession";
const DELETE_SESSION_NSID: &str = "com.atproto.server.deleteSession";

/// HTTP request timeout in seconds.
/// This is the only timeout on a login attempt; the flow adds none.
const REQUEST_TIMEOUT_SECS: u64 = 30;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CreateSessionRequest<'a> {
    identifier: &'a str,
    password: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    auth_factor_token: Option<&'a str>,
}

/// Success payload of `createSession`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatedSession {
    pub did: String,
    pub handle: String,
    #[serde(default)]
    pub email: Option<String>,
    pub access_jwt: String,
    pub refresh_jwt: String,
}

/// The external authentication operation.
///
/// `AtpClient` is the real implementation; tests substitute stubs.
#[async_trait]
pub trait Authenticator: Send + Sync {
    /// Exchange credentials (and optionally an emailed sign-in code) for a
    /// session on `service`.
    async fn create_session(
        &self,
        service: &str,
        credentials: &Credentials,
        auth_factor_token: Option<&str>,
    ) -> Result<CreatedSession, ApiError>;

    /// Revoke the session identified by `refresh_jwt`.
    async fn delete_session(&self, service: &str, refresh_jwt: &str) -> Result<(), ApiError>;
}

/// AT Protocol client.
/// Clone is cheap - reqwest::Client uses Arc internally for connection pooling.
#[derive(Clone)]
pub struct AtpClient {
    client: Client,
}

impl AtpClient {
    /// Create a new client
    pub fn new() -> Result<Self, ApiError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;

        Ok(Self { client })
    }

    fn xrpc_url(service: &str, nsid: &str) -> String {
        format!("{}/xrpc/{}", service.trim_end_matches('/'), nsid)
    }

    async fn check_response(response: reqwest::Response) -> Result<reqwest::Response, ApiError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        debug!(%status, "XRPC request failed");
        Err(ApiError::from_status(status, &body))
    }
}

#[async_trait]
impl Authenticator for AtpClient {
    async fn create_session(
        &self,
        service: &str,
        credentials: &Credentials,
        auth_factor_token: Option<&str>,
    ) -> Result<CreatedSession, ApiError> {
        let url = Self::xrpc_url(service, CREATE_SESSION_NSID);
        debug!(%url, identifier = %credentials.identifier, "Creating session");

        let body = CreateSessionRequest {
            identifier: &credentials.identifier,
            password: credentials.password.expose_secret(),
            auth_factor_token,
        };

        let response = self
            .client
            .post(&url)
            .header(header::ACCEPT, "application/json")
            .json(&body)
            .send()
            .await?;

        let response = Self::check_response(response).await?;

        response
            .json::<CreatedSession>()
            .await
            .map_err(|e| ApiError::InvalidResponse(format!("Failed to parse session: {}", e)))
    }

    async fn delete_session(&self, service: &str, refresh_jwt: &str) -> Result<(), ApiError> {
        let url = Self::xrpc_url(service, DELETE_SESSION_NSID);
        debug!(%url, "Deleting session");

        let response = self
            .client
            .post(&url)
            .bearer_auth(refresh_jwt)
            .send()
            .await?;

        Self::check_response(response).await?;
        Ok(())
    }
}
