//! Login flow: validation, the authentication call, and its consequences.
//!
//! The flow is a two-state machine. Direct login keeps it in
//! `AwaitingCredentials`; it only moves to `AwaitingSecondFactor` when the
//! server demands an emailed sign-in code.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tracing::{error, info, warn};

use crate::api::{ApiError, Authenticator};
use crate::notify::Notification;

use super::credentials::{validate_code, Credentials, FieldError};
use super::guard::Route;
use super::session::{SessionData, SessionStore};

/// Delay between a successful login and navigation to the home page.
pub const REDIRECT_DELAY: Duration = Duration::from_millis(1500);

/// Shown when a failure carries no message of its own.
pub const GENERIC_FAILURE: &str = "Login failed. Please check your credentials.";

pub const SECOND_FACTOR_PROMPT: &str = "A sign-in code has been sent to your email";

const NO_PENDING_LOGIN: &str = "No sign-in in progress. Enter your username and password.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginStep {
    AwaitingCredentials,
    AwaitingSecondFactor,
}

enum State {
    AwaitingCredentials,
    /// Credentials are held in memory until the code is accepted or the
    /// step is cancelled. They stay held while a code is being checked.
    AwaitingSecondFactor(Arc<Credentials>),
}

/// Navigation requested by the flow, to happen after `after` has elapsed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Redirect {
    pub to: Route,
    pub after: Duration,
}

#[derive(Debug)]
pub enum SubmitOutcome {
    /// Form rejected before any network call.
    Invalid(Vec<FieldError>),
    /// Another submission is in flight; nothing happened.
    Busy,
    Succeeded {
        session: SessionData,
        notification: Notification,
        redirect: Redirect,
    },
    SecondFactorRequired {
        notification: Notification,
    },
    Failed {
        notification: Notification,
    },
}

/// Resets the in-flight flag when the submission finishes, however it ends.
struct InFlight<'a>(&'a AtomicBool);

impl<'a> InFlight<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

pub struct LoginFlow {
    auth: Arc<dyn Authenticator>,
    store: Arc<dyn SessionStore>,
    service: String,
    in_flight: AtomicBool,
    state: Mutex<State>,
}

impl LoginFlow {
    pub fn new(
        auth: Arc<dyn Authenticator>,
        store: Arc<dyn SessionStore>,
        service: impl Into<String>,
    ) -> Self {
        Self {
            auth,
            store,
            service: service.into(),
            in_flight: AtomicBool::new(false),
            state: Mutex::new(State::AwaitingCredentials),
        }
    }

    pub fn service(&self) -> &str {
        &self.service
    }

    pub fn is_busy(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    pub fn step(&self) -> LoginStep {
        match *self.lock_state() {
            State::AwaitingCredentials => LoginStep::AwaitingCredentials,
            State::AwaitingSecondFactor(_) => LoginStep::AwaitingSecondFactor,
        }
    }

    /// Go back to the credentials form, forgetting held credentials.
    pub fn cancel_second_factor(&self) {
        *self.lock_state() = State::AwaitingCredentials;
    }

    /// Submit the credentials form.
    pub async fn submit(&self, credentials: Credentials) -> SubmitOutcome {
        let Some(_in_flight) = InFlight::acquire(&self.in_flight) else {
            return SubmitOutcome::Busy;
        };

        if let Err(errors) = credentials.validate() {
            return SubmitOutcome::Invalid(errors);
        }

        *self.lock_state() = State::AwaitingCredentials;
        info!(identifier = %credentials.identifier, service = %self.service, "Attempting login");

        match self
            .auth
            .create_session(&self.service, &credentials, None)
            .await
        {
            Ok(created) => self.complete(created.into()),
            Err(e) if e.is_auth_factor_required() => {
                info!(identifier = %credentials.identifier, "Server requires a sign-in code");
                *self.lock_state() = State::AwaitingSecondFactor(Arc::new(credentials));
                SubmitOutcome::SecondFactorRequired {
                    notification: Notification::info("Verification Required", SECOND_FACTOR_PROMPT),
                }
            }
            Err(e) => Self::failure(&e),
        }
    }

    /// Submit the emailed sign-in code for the pending login.
    pub async fn submit_code(&self, code: &str) -> SubmitOutcome {
        let Some(_in_flight) = InFlight::acquire(&self.in_flight) else {
            return SubmitOutcome::Busy;
        };

        if let Err(e) = validate_code(code) {
            return SubmitOutcome::Invalid(vec![e]);
        }

        let credentials = match &*self.lock_state() {
            State::AwaitingSecondFactor(credentials) => Arc::clone(credentials),
            State::AwaitingCredentials => {
                return SubmitOutcome::Failed {
                    notification: Notification::destructive("Error", NO_PENDING_LOGIN),
                };
            }
        };

        let result = self
            .auth
            .create_session(&self.service, &credentials, Some(code.trim()))
            .await;

        // A failed code leaves the state alone: still awaiting the code, or
        // back at credentials if the step was cancelled during the call.
        match result {
            Ok(created) => {
                *self.lock_state() = State::AwaitingCredentials;
                self.complete(created.into())
            }
            Err(e) => Self::failure(&e),
        }
    }

    /// Revoke the stored session on a best-effort basis, then clear it.
    pub async fn logout(&self) -> Result<(), super::session::StoreError> {
        if let Some(session) = self.store.read() {
            if let Err(e) = self
                .auth
                .delete_session(&self.service, &session.refresh_jwt)
                .await
            {
                warn!(error = %e, "Failed to revoke session on server");
            }
            info!(handle = %session.handle, "Logged out");
        }
        *self.lock_state() = State::AwaitingCredentials;
        self.store.clear()
    }

    fn complete(&self, session: SessionData) -> SubmitOutcome {
        if let Err(e) = self.store.write(&session) {
            error!(error = %e, "Failed to save session");
            return SubmitOutcome::Failed {
                notification: Notification::destructive("Error", e.to_string()),
            };
        }

        info!(handle = %session.handle, "Login successful");
        let notification =
            Notification::info("Success", format!("Signed in as @{}. Redirecting...", session.handle));
        SubmitOutcome::Succeeded {
            session,
            notification,
            redirect: Redirect {
                to: Route::Home,
                after: REDIRECT_DELAY,
            },
        }
    }

    fn failure(e: &ApiError) -> SubmitOutcome {
        error!(error = %e, "Login failed");
        let description = e.message().unwrap_or_else(|| GENERIC_FAILURE.to_string());
        SubmitOutcome::Failed {
            notification: Notification::destructive("Error", description),
        }
    }

    fn lock_state(&self) -> std::sync::MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

// ============================================================================
// Tests
// ============================================================================
