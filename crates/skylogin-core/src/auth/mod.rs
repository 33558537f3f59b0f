//! Authentication module for logging in and keeping a session.
//!
//! This module provides:
//! - `Credentials`: the login form's contents and their validation
//! - `SessionStore`: persisted record of at most one session
//! - `LoginFlow`: the submit state machine around the authentication call
//! - `RouteGuard`: session-presence check before rendering protected pages

pub mod credentials;
pub mod flow;
pub mod guard;
pub mod session;

pub use credentials::{Credentials, Field, FieldError};
pub use flow::{LoginFlow, LoginStep, Redirect, SubmitOutcome, REDIRECT_DELAY};
pub use guard::{Resolved, Route, RouteGuard, HOME_PATH, LOGIN_PATH};
pub use session::{FileSessionStore, MemorySessionStore, SessionData, SessionStore, StoreError};
