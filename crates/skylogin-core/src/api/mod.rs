//! REST client module for AT Protocol services.
//!
//! This module provides the `AtpClient` for talking XRPC to a Personal
//! Data Server, and the `Authenticator` trait the login flow depends on
//! so it can be stubbed in tests.

pub mod client;
pub mod error;

pub use client::{AtpClient, Authenticator, CreatedSession, DEFAULT_SERVICE_URL};
pub use error::ApiError;
