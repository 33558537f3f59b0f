use std::sync::Arc;

use tracing::debug;

use super::session::{SessionData, SessionStore};

pub const LOGIN_PATH: &str = "/auth";
pub const HOME_PATH: &str = "/";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Login,
    Home,
    NotFound,
}

impl Route {
    /// Match a path exactly against the known routes.
    pub fn from_path(path: &str) -> Self {
        match path {
            LOGIN_PATH => Route::Login,
            HOME_PATH => Route::Home,
            _ => Route::NotFound,
        }
    }

    pub fn path(&self) -> Option<&'static str> {
        match self {
            Route::Login => Some(LOGIN_PATH),
            Route::Home => Some(HOME_PATH),
            Route::NotFound => None,
        }
    }

    pub fn is_protected(&self) -> bool {
        matches!(self, Route::Home)
    }
}

/// What a navigation ends up rendering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolved {
    Login,
    Home(SessionData),
    NotFound(String),
}

impl Resolved {
    pub fn route(&self) -> Route {
        match self {
            Resolved::Login => Route::Login,
            Resolved::Home(_) => Route::Home,
            Resolved::NotFound(_) => Route::NotFound,
        }
    }
}

/// Gate on session presence, checked once per navigation.
///
/// Token freshness is not checked and the server is not consulted.
#[derive(Clone)]
pub struct RouteGuard {
    store: Arc<dyn SessionStore>,
}

impl RouteGuard {
    pub fn new(store: Arc<dyn SessionStore>) -> Self {
        Self { store }
    }

    pub fn resolve(&self, path: &str) -> Resolved {
        match Route::from_path(path) {
            Route::Login => Resolved::Login,
            Route::NotFound => Resolved::NotFound(path.to_string()),
            Route::Home => match self.store.read() {
                Some(session) => Resolved::Home(session),
                None => {
                    debug!(path, "No session, redirecting to login");
                    Resolved::Login
                }
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::session::MemorySessionStore;
    use chrono::Utc;

    fn guard_with(session: Option<SessionData>) -> RouteGuard {
        let store = MemorySessionStore::new();
        if let Some(session) = session {
            store.write(&session).unwrap();
        }
        RouteGuard::new(Arc::new(store))
    }

    fn alice() -> SessionData {
        SessionData {
            handle: "alice.test".to_string(),
            did: "did:plc:alice".to_string(),
            email: None,
            access_jwt: "a".to_string(),
            refresh_jwt: "r".to_string(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_route_from_path() {
        assert_eq!(Route::from_path("/"), Route::Home);
        assert_eq!(Route::from_path("/auth"), Route::Login);
        assert_eq!(Route::from_path("/auth/"), Route::NotFound);
        assert_eq!(Route::from_path("/settings"), Route::NotFound);
        assert_eq!(Route::from_path(""), Route::NotFound);
    }

    #[test]
    fn test_absent_session_redirects_home_to_login() {
        let guard = guard_with(None);
        assert_eq!(guard.resolve("/"), Resolved::Login);
    }

    #[test]
    fn test_present_session_renders_home() {
        let guard = guard_with(Some(alice()));
        match guard.resolve("/") {
            Resolved::Home(session) => assert_eq!(session.handle, "alice.test"),
            other => panic!("expected home, got {other:?}"),
        }
    }

    #[test]
    fn test_login_route_is_never_guarded() {
        assert_eq!(guard_with(None).resolve("/auth"), Resolved::Login);
        assert_eq!(guard_with(Some(alice())).resolve("/auth"), Resolved::Login);
    }

    #[test]
    fn test_unknown_path_is_not_found_regardless_of_session() {
        assert_eq!(
            guard_with(None).resolve("/nope"),
            Resolved::NotFound("/nope".to_string())
        );
        assert_eq!(guard_with(Some(alice())).resolve("/nope").route(), Route::NotFound);
    }

    #[test]
    fn test_guard_rereads_store_each_navigation() {
        let store = Arc::new(MemorySessionStore::new());
        let guard = RouteGuard::new(store.clone());
        assert_eq!(guard.resolve("/").route(), Route::Login);
        store.write(&alice()).unwrap();
        assert_eq!(guard.resolve("/").route(), Route::Home);
    }
}
