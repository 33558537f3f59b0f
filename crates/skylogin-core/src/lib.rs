//! Core library for skylogin.
//!
//! Everything that does not touch the terminal lives here:
//!
//! - `api`: AT Protocol client implementing the authentication operation
//! - `auth`: credentials, session store, login flow and route guard
//! - `config`: persisted application configuration
//! - `notify`: timed notification queue shown by front ends

pub mod api;
pub mod auth;
pub mod config;
pub mod notify;

pub use api::{ApiError, AtpClient, Authenticator};
pub use auth::{
    Credentials, FileSessionStore, LoginFlow, LoginStep, MemorySessionStore, Route, RouteGuard,
    SessionData, SessionStore, SubmitOutcome,
};
pub use config::Config;
pub use notify::{Notification, Notifications, Variant};
