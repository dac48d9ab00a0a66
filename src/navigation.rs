//! Route table and the per-transition navigation guard.
//!
//! Each transition is decided on its own: protected routes resolve the
//! caller's identity, unresolvable or anonymous callers are sent to the
//! login route, and the original target is not remembered.

use std::collections::HashMap;
use std::future::Future;

use crate::identity::{AuthError, Identity};

pub const LOGIN_ROUTE: &str = "login";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Route {
    pub name: &'static str,
    pub path: &'static str,
    pub requires_auth: bool,
}

impl Route {
    pub const fn open(name: &'static str, path: &'static str) -> Self {
        Self { name, path, requires_auth: false }
    }

    pub const fn protected(name: &'static str, path: &'static str) -> Self {
        Self { name, path, requires_auth: true }
    }

    /// Match a concrete path against this route's pattern, capturing `:params`
    pub fn matches(&self, path: &str) -> Option<HashMap<String, String>> {
        let pattern: Vec<&str> = segments(self.path).collect();
        let actual: Vec<&str> = segments(path).collect();
        if pattern.len() != actual.len() {
            return None;
        }

        let mut params = HashMap::new();
        for (p, a) in pattern.iter().zip(actual.iter()) {
            match p.strip_prefix(':') {
                Some(name) => {
                    params.insert(name.to_string(), a.to_string());
                }
                None if p == a => {}
                None => return None,
            }
        }
        Some(params)
    }
}

fn segments(path: &str) -> impl Iterator<Item = &str> {
    path.split('/').filter(|s| !s.is_empty())
}

/// The journal's page routes
pub fn journal_routes() -> Vec<Route> {
    vec![
        Route::protected("home", "/"),
        Route::open(LOGIN_ROUTE, "/login"),
        Route::open("signup", "/signup"),
        Route::protected("entry", "/entry/:id"),
        Route::protected("new", "/new"),
    ]
}

#[derive(Debug, Clone)]
pub struct RouteTable {
    routes: Vec<Route>,
}

impl RouteTable {
    pub fn new(routes: Vec<Route>) -> Self {
        Self { routes }
    }

    pub fn by_name(&self, name: &str) -> Option<&Route> {
        self.routes.iter().find(|r| r.name == name)
    }

    /// First route whose pattern matches `path`
    pub fn resolve(&self, path: &str) -> Option<&Route> {
        self.routes.iter().find(|r| r.matches(path).is_some())
    }

    pub fn routes(&self) -> &[Route] {
        &self.routes
    }
}

impl Default for RouteTable {
    fn default() -> Self {
        Self::new(journal_routes())
    }
}

/// Outcome of one route transition
#[derive(Debug, Clone, PartialEq)]
pub enum Navigation {
    /// Proceed to the target. `identity` is set when it was resolved.
    Allowed { identity: Option<Identity> },
    /// Divert to the login route
    Redirected { to: &'static str },
}

#[derive(Debug, Clone)]
pub struct NavigationGuard {
    routes: RouteTable,
    login_path: &'static str,
}

impl NavigationGuard {
    pub fn new(routes: RouteTable) -> Self {
        let login_path = routes.by_name(LOGIN_ROUTE).map_or("/login", |r| r.path);
        Self { routes, login_path }
    }

    pub fn routes(&self) -> &RouteTable {
        &self.routes
    }

    pub fn login_path(&self) -> &'static str {
        self.login_path
    }

    /// Decide a transition to `target`. `resolve` is only awaited for routes
    /// that require auth; a failed resolution redirects (fail closed).
    pub async fn before_each<F, Fut>(&self, target: &Route, resolve: F) -> Navigation
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Option<Identity>, AuthError>>,
    {
        if !target.requires_auth {
            return Navigation::Allowed { identity: None };
        }

        match resolve().await {
            Ok(Some(identity)) => {
                tracing::debug!("Navigation to '{}' allowed for {}", target.name, identity.id);
                Navigation::Allowed { identity: Some(identity) }
            }
            Ok(None) => {
                tracing::debug!("Navigation to '{}' requires login", target.name);
                Navigation::Redirected { to: self.login_path }
            }
            Err(e) => {
                tracing::warn!("Navigation to '{}' redirected; identity unresolved: {}", target.name, e);
                Navigation::Redirected { to: self.login_path }
            }
        }
    }
}

impl Default for NavigationGuard {
    fn default() -> Self {
        Self::new(RouteTable::default())
    }
}
