//! Application state management for skylogin.
//!
//! This module contains the `App` struct that owns the current page, the
//! login form, the notification queue, and the background login task.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use skylogin_core::auth::{
    Credentials, Field, FieldError, LoginFlow, LoginStep, Resolved, Route, RouteGuard,
    SessionStore, SubmitOutcome, HOME_PATH, LOGIN_PATH,
};
use skylogin_core::{Authenticator, Config, Notification, Notifications};

// ============================================================================
// Constants
// ============================================================================

/// Buffer size for the background task message channel.
const CHANNEL_BUFFER_SIZE: usize = 8;

/// Maximum length for identifier input.
/// Handles are domain names (253 chars max); emails top out at 254.
const MAX_IDENTIFIER_LENGTH: usize = 254;

/// Maximum length for password input.
/// 128 chars accommodates password managers and passphrases.
const MAX_PASSWORD_LENGTH: usize = 128;

/// Maximum length for an emailed sign-in code.
const MAX_CODE_LENGTH: usize = 32;

/// How long the click counter notification stays up.
const CLICK_NOTIFICATION_DURATION: Duration = Duration::from_secs(2);

// ============================================================================
// UI State Types
// ============================================================================

/// Overall application state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppState {
    Normal,
    ConfirmingQuit,
    Quitting,
}

/// Login form focus state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginFocus {
    Identifier,
    Password,
    Code,
    Button,
}

#[derive(Debug)]
pub struct LoginForm {
    pub identifier: String,
    pub password: String,
    pub code: String,
    pub focus: LoginFocus,
    pub errors: Vec<FieldError>,
}

impl LoginForm {
    fn new(identifier: String) -> Self {
        let focus = if identifier.is_empty() {
            LoginFocus::Identifier
        } else {
            LoginFocus::Password
        };
        Self {
            identifier,
            password: String::new(),
            code: String::new(),
            focus,
            errors: Vec::new(),
        }
    }

    /// Inline message for `field`, if validation flagged it.
    pub fn error_for(&self, field: Field) -> Option<&'static str> {
        self.errors.iter().find(|e| e.field == field).map(|e| e.message)
    }
}

// ============================================================================
// Background Task Results
// ============================================================================

/// Results sent back from background tasks over the app's channel.
#[derive(Debug)]
enum BackgroundEvent {
    Login(SubmitOutcome),
    LoggedOut(Option<String>),
}

// ============================================================================
// Main Application Struct
// ============================================================================

pub struct App {
    pub config: Config,
    /// Whether a successful login writes `last_identifier` back to disk.
    pub persist_config: bool,
    guard: RouteGuard,
    flow: Arc<LoginFlow>,

    pub state: AppState,
    pub path: String,
    pub page: Resolved,
    pub clicks: u32,
    pub form: LoginForm,
    pub notifications: Notifications,

    /// Navigation target and the moment it becomes due.
    pending_redirect: Option<(Route, Instant)>,
    submitting: bool,
    logging_out: bool,

    background_rx: mpsc::Receiver<BackgroundEvent>,
    background_tx: mpsc::Sender<BackgroundEvent>,
}

impl App {
    /// Create the app and perform the initial navigation to `path`.
    pub fn new(
        config: Config,
        store: Arc<dyn SessionStore>,
        auth: Arc<dyn Authenticator>,
        path: &str,
    ) -> Self {
        let flow = Arc::new(LoginFlow::new(auth, store.clone(), config.service_url.clone()));
        let guard = RouteGuard::new(store);
        let (tx, rx) = mpsc::channel(CHANNEL_BUFFER_SIZE);
        let form = LoginForm::new(config.last_identifier.clone().unwrap_or_default());

        let mut app = Self {
            config,
            persist_config: true,
            guard,
            flow,
            state: AppState::Normal,
            path: String::new(),
            page: Resolved::Login,
            clicks: 0,
            form,
            notifications: Notifications::new(),
            pending_redirect: None,
            submitting: false,
            logging_out: false,
            background_rx: rx,
            background_tx: tx,
        };
        app.navigate(path);
        app
    }

    // =========================================================================
    // Navigation
    // =========================================================================

    /// Navigate to `path`, letting the route guard decide what renders.
    pub fn navigate(&mut self, path: &str) {
        let resolved = self.guard.resolve(path);
        self.path = resolved
            .route()
            .path()
            .map(str::to_string)
            .unwrap_or_else(|| path.to_string());
        if matches!(resolved, Resolved::Home(_)) && !matches!(self.page, Resolved::Home(_)) {
            self.clicks = 0;
        }
        debug!(requested = path, resolved = %self.path, "Navigated");
        self.page = resolved;
    }

    pub fn route(&self) -> Route {
        self.page.route()
    }

    pub fn login_step(&self) -> LoginStep {
        self.flow.step()
    }

    pub fn is_submitting(&self) -> bool {
        self.submitting
    }

    pub fn is_logging_out(&self) -> bool {
        self.logging_out
    }

    pub fn service_url(&self) -> &str {
        self.flow.service()
    }

    // =========================================================================
    // Login
    // =========================================================================

    /// Submit whichever login step is showing. No-op while a submission is
    /// already in flight.
    pub fn submit_login(&mut self) {
        if self.submitting || self.flow.is_busy() {
            debug!("Submission already in flight, ignoring");
            return;
        }

        let flow = self.flow.clone();
        let tx = self.background_tx.clone();

        match flow.step() {
            LoginStep::AwaitingCredentials => {
                let credentials =
                    Credentials::new(self.form.identifier.clone(), self.form.password.clone());
                if let Err(errors) = credentials.validate() {
                    self.form.errors = errors;
                    return;
                }
                self.form.errors.clear();
                tokio::spawn(async move {
                    let outcome = flow.submit(credentials).await;
                    let _ = tx.send(BackgroundEvent::Login(outcome)).await;
                });
            }
            LoginStep::AwaitingSecondFactor => {
                if let Err(error) = skylogin_core::auth::credentials::validate_code(&self.form.code) {
                    self.form.errors = vec![error];
                    return;
                }
                self.form.errors.clear();
                let code = self.form.code.clone();
                tokio::spawn(async move {
                    let outcome = flow.submit_code(&code).await;
                    let _ = tx.send(BackgroundEvent::Login(outcome)).await;
                });
            }
        }
        self.submitting = true;
    }

    /// Leave the sign-in code step and return to the credentials form.
    pub fn cancel_second_factor(&mut self) {
        self.flow.cancel_second_factor();
        self.form.code.clear();
        self.form.errors.clear();
        self.form.focus = LoginFocus::Password;
    }

    fn apply_login_outcome(&mut self, outcome: SubmitOutcome, now: Instant) {
        self.submitting = false;
        match outcome {
            SubmitOutcome::Invalid(errors) => {
                self.form.errors = errors;
            }
            SubmitOutcome::Busy => {}
            SubmitOutcome::Succeeded {
                session,
                notification,
                redirect,
            } => {
                self.notifications.push(notification, now);
                self.form.password.clear();
                self.form.code.clear();
                self.form.focus = LoginFocus::Password;

                self.config.last_identifier = Some(self.form.identifier.clone());
                if self.persist_config {
                    if let Err(e) = self.config.save() {
                        warn!(error = %e, "Failed to save config");
                    }
                }

                info!(handle = %session.handle, delay_ms = redirect.after.as_millis() as u64, "Redirect scheduled");
                self.pending_redirect = Some((redirect.to, now + redirect.after));
            }
            SubmitOutcome::SecondFactorRequired { notification } => {
                self.notifications.push(notification, now);
                self.form.code.clear();
                self.form.focus = LoginFocus::Code;
            }
            SubmitOutcome::Failed { notification } => {
                self.notifications.push(notification, now);
            }
        }
    }

    // =========================================================================
    // Home page
    // =========================================================================

    pub fn click(&mut self, now: Instant) {
        self.clicks += 1;
        self.notifications.push(
            Notification::info("Hello!", format!("You've clicked {} times!", self.clicks))
                .with_duration(CLICK_NOTIFICATION_DURATION),
            now,
        );
    }

    /// Revoke and forget the session, then go back to the login page.
    pub fn logout(&mut self) {
        if self.logging_out {
            return;
        }
        self.logging_out = true;
        let flow = self.flow.clone();
        let tx = self.background_tx.clone();
        tokio::spawn(async move {
            let error = flow.logout().await.err().map(|e| e.to_string());
            let _ = tx.send(BackgroundEvent::LoggedOut(error)).await;
        });
    }

    // =========================================================================
    // Event loop hooks
    // =========================================================================

    /// Drain finished background work without blocking.
    pub fn check_background_tasks(&mut self, now: Instant) {
        while let Ok(event) = self.background_rx.try_recv() {
            match event {
                BackgroundEvent::Login(outcome) => self.apply_login_outcome(outcome, now),
                BackgroundEvent::LoggedOut(error) => {
                    self.logging_out = false;
                    if let Some(error) = error {
                        self.notifications
                            .push(Notification::destructive("Error", error), now);
                    }
                    self.pending_redirect = None;
                    self.navigate(LOGIN_PATH);
                }
            }
        }
    }

    /// Expire notifications and perform any redirect that has come due.
    pub fn tick(&mut self, now: Instant) {
        self.notifications.prune(now);
        if let Some((route, due)) = self.pending_redirect {
            if now >= due {
                self.pending_redirect = None;
                self.navigate(route.path().unwrap_or(HOME_PATH));
            }
        }
    }
}

// ============================================================================
// Input Validation
// ============================================================================

fn is_valid_input_char(c: char) -> bool {
    !c.is_control()
}

pub fn can_add_identifier_char(current_len: usize, c: char) -> bool {
    current_len < MAX_IDENTIFIER_LENGTH && is_valid_input_char(c)
}

pub fn can_add_password_char(current_len: usize, c: char) -> bool {
    current_len < MAX_PASSWORD_LENGTH && is_valid_input_char(c)
}

pub fn can_add_code_char(current_len: usize, c: char) -> bool {
    current_len < MAX_CODE_LENGTH && is_valid_input_char(c) && !c.is_whitespace()
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    use async_trait::async_trait;
    use skylogin_core::api::CreatedSession;
    use skylogin_core::auth::{SessionData, StoreError};
    use skylogin_core::{ApiError, MemorySessionStore, Variant};

    #[derive(Default)]
    pub(crate) struct StubAuth {
        responses: Mutex<VecDeque<Result<CreatedSession, ApiError>>>,
        pub(crate) calls: AtomicUsize,
    }

    impl StubAuth {
        pub(crate) fn replying(responses: Vec<Result<CreatedSession, ApiError>>) -> Self {
            Self {
                responses: Mutex::new(responses.into()),
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl Authenticator for StubAuth {
        async fn create_session(
            &self,
            _service: &str,
            _credentials: &Credentials,
            _auth_factor_token: Option<&str>,
        ) -> Result<CreatedSession, ApiError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.responses
                .lock()
                .unwrap()
                .pop_front()
                .expect("unexpected create_session call")
        }

        async fn delete_session(&self, _service: &str, _refresh_jwt: &str) -> Result<(), ApiError> {
            Ok(())
        }
    }

    pub(crate) fn created(handle: &str) -> CreatedSession {
        CreatedSession {
            did: "did:plc:test".to_string(),
            handle: handle.to_string(),
            email: None,
            access_jwt: "access".to_string(),
            refresh_jwt: "refresh".to_string(),
        }
    }

    fn test_config() -> Config {
        Config {
            service_url: "https://pds.test".to_string(),
            last_identifier: None,
        }
    }

    pub(crate) fn test_app(
        auth: Arc<StubAuth>,
        store: Arc<MemorySessionStore>,
        path: &str,
    ) -> App {
        let mut app = App::new(test_config(), store, auth, path);
        app.persist_config = false;
        app
    }

    /// Yield until the background task has reported back.
    pub(crate) async fn settle(app: &mut App, now: Instant) {
        while app.submitting || app.logging_out {
            tokio::task::yield_now().await;
            app.check_background_tasks(now);
        }
    }

    #[test]
    fn test_can_add_identifier_char() {
        assert!(can_add_identifier_char(0, 'a'));
        assert!(can_add_identifier_char(0, '@'));
        assert!(!can_add_identifier_char(MAX_IDENTIFIER_LENGTH, 'a'));
        assert!(!can_add_identifier_char(0, '\n'));
    }

    #[test]
    fn test_can_add_password_char() {
        assert!(can_add_password_char(0, 'a'));
        assert!(can_add_password_char(127, '!'));
        assert!(can_add_password_char(0, ' '));
        assert!(!can_add_password_char(128, 'a'));
        assert!(!can_add_password_char(0, '\x00'));
    }

    #[test]
    fn test_can_add_code_char() {
        assert!(can_add_code_char(0, 'A'));
        assert!(can_add_code_char(0, '-'));
        assert!(!can_add_code_char(0, ' '));
        assert!(!can_add_code_char(MAX_CODE_LENGTH, 'A'));
    }

    #[tokio::test]
    async fn test_home_without_session_shows_login() {
        let app = test_app(Arc::default(), Arc::default(), "/");
        assert_eq!(app.route(), Route::Login);
        assert_eq!(app.path, "/auth");
    }

    #[tokio::test]
    async fn test_home_with_session_shows_home() {
        let store = Arc::new(MemorySessionStore::new());
        store.write(&SessionData::from(created("alice.test"))).unwrap();
        let app = test_app(Arc::default(), store, "/");
        assert_eq!(app.route(), Route::Home);
        assert_eq!(app.path, "/");
    }

    #[tokio::test]
    async fn test_unknown_path_is_not_found() {
        let app = test_app(Arc::default(), Arc::default(), "/missing");
        assert_eq!(app.page, Resolved::NotFound("/missing".to_string()));
        assert_eq!(app.path, "/missing");
    }

    #[tokio::test]
    async fn test_empty_form_shows_inline_errors_without_calling_auth() {
        let auth = Arc::new(StubAuth::default());
        let mut app = test_app(auth.clone(), Arc::default(), "/auth");

        app.submit_login();
        assert!(!app.is_submitting());
        assert!(app.form.error_for(Field::Identifier).is_some());
        assert!(app.form.error_for(Field::Password).is_some());
        assert_eq!(auth.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_successful_login_redirects_after_delay() {
        let auth = Arc::new(StubAuth::replying(vec![Ok(created("alice.test"))]));
        let store = Arc::new(MemorySessionStore::new());
        let mut app = test_app(auth, store.clone(), "/");
        assert_eq!(app.route(), Route::Login);

        app.form.identifier = "alice.test".to_string();
        app.form.password = "hunter2".to_string();
        app.submit_login();
        assert!(app.is_submitting());

        let start = Instant::now();
        settle(&mut app, start).await;

        assert_eq!(store.read().unwrap().handle, "alice.test");
        assert!(app.form.password.is_empty());
        let toast = app.notifications.current().unwrap();
        assert!(toast.description.contains("alice.test"));

        app.tick(start + Duration::from_millis(1499));
        assert_eq!(app.route(), Route::Login);

        app.tick(start + Duration::from_millis(1500));
        assert_eq!(app.route(), Route::Home);
        assert_eq!(app.path, "/");
    }

    #[tokio::test]
    async fn test_failed_login_notifies_and_stays() {
        let auth = Arc::new(StubAuth::replying(vec![Err(ApiError::Xrpc {
            status: 401,
            error: "AuthenticationRequired".to_string(),
            message: Some("Invalid password".to_string()),
        })]));
        let store = Arc::new(MemorySessionStore::new());
        let mut app = test_app(auth, store.clone(), "/auth");

        app.form.identifier = "alice.test".to_string();
        app.form.password = "wrong".to_string();
        app.submit_login();
        let now = Instant::now();
        settle(&mut app, now).await;

        let toast = app.notifications.current().unwrap();
        assert_eq!(toast.variant, Variant::Destructive);
        assert!(toast.description.contains("Invalid password"));
        assert_eq!(store.read(), None);

        app.tick(now + Duration::from_secs(2));
        assert_eq!(app.route(), Route::Login);
    }

    struct ReadOnlyStore;

    impl SessionStore for ReadOnlyStore {
        fn read(&self) -> Option<SessionData> {
            None
        }

        fn write(&self, _session: &SessionData) -> Result<(), StoreError> {
            Err(StoreError::Io(std::io::Error::new(
                std::io::ErrorKind::PermissionDenied,
                "read-only file system",
            )))
        }

        fn clear(&self) -> Result<(), StoreError> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_unsaved_session_never_leaves_login() {
        let auth = Arc::new(StubAuth::replying(vec![Ok(created("alice.test"))]));
        let mut app = App::new(test_config(), Arc::new(ReadOnlyStore), auth, "/");
        app.persist_config = false;

        app.form.identifier = "alice.test".to_string();
        app.form.password = "hunter2".to_string();
        app.submit_login();
        let now = Instant::now();
        settle(&mut app, now).await;

        let toast = app.notifications.current().unwrap();
        assert_eq!(toast.variant, Variant::Destructive);
        assert!(app.pending_redirect.is_none());

        app.tick(now + Duration::from_secs(5));
        assert_eq!(app.route(), Route::Login);
        assert_eq!(app.path, "/auth");
    }

    #[tokio::test]
    async fn test_double_submit_calls_auth_once() {
        let auth = Arc::new(StubAuth::replying(vec![Ok(created("alice.test"))]));
        let mut app = test_app(auth.clone(), Arc::default(), "/auth");

        app.form.identifier = "alice.test".to_string();
        app.form.password = "hunter2".to_string();
        app.submit_login();
        app.submit_login();
        settle(&mut app, Instant::now()).await;

        assert_eq!(auth.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_second_factor_moves_focus_to_code() {
        let auth = Arc::new(StubAuth::replying(vec![Err(ApiError::Xrpc {
            status: 401,
            error: "AuthFactorTokenRequired".to_string(),
            message: None,
        })]));
        let mut app = test_app(auth, Arc::default(), "/auth");

        app.form.identifier = "alice.test".to_string();
        app.form.password = "hunter2".to_string();
        app.submit_login();
        settle(&mut app, Instant::now()).await;

        assert_eq!(app.login_step(), LoginStep::AwaitingSecondFactor);
        assert_eq!(app.form.focus, LoginFocus::Code);

        app.submit_login();
        assert!(!app.is_submitting());
        assert!(app.form.error_for(Field::Code).is_some());

        app.cancel_second_factor();
        assert_eq!(app.login_step(), LoginStep::AwaitingCredentials);
    }

    #[tokio::test]
    async fn test_click_counter_notifies() {
        let store = Arc::new(MemorySessionStore::new());
        store.write(&SessionData::from(created("alice.test"))).unwrap();
        let mut app = test_app(Arc::default(), store, "/");

        let now = Instant::now();
        app.click(now);
        app.click(now);
        assert_eq!(app.clicks, 2);
        let toast = app.notifications.current().unwrap();
        assert_eq!(toast.description, "You've clicked 2 times!");
        assert_eq!(toast.duration, Duration::from_secs(2));

        app.tick(now + Duration::from_secs(2));
        assert!(app.notifications.is_empty());
    }

    #[tokio::test]
    async fn test_logout_returns_to_login() {
        let store = Arc::new(MemorySessionStore::new());
        store.write(&SessionData::from(created("alice.test"))).unwrap();
        let mut app = test_app(Arc::default(), store.clone(), "/");
        assert_eq!(app.route(), Route::Home);

        app.logout();
        settle(&mut app, Instant::now()).await;

        assert_eq!(store.read(), None);
        assert_eq!(app.route(), Route::Login);
        app.navigate("/");
        assert_eq!(app.route(), Route::Login);
    }
}
