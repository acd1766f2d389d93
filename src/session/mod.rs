// src/session/mod.rs

//! Browser automation session the measurement engine connects to.
//!
//! The session owns the browser process; the engine attaches to it through
//! the debugging port in [`BrowserEndpoint`]. What has to happen on the
//! audited page is described by a [`NavigationHook`] handed to the engine
//! with the measurement options. Auth data is passed into the hook
//! explicitly when it is built, never looked up from shared state.

pub mod chrome;

use crate::errors::Result;
use crate::login::SessionToken;
use crate::types::BoxFuture;

pub use chrome::ChromeLauncher;

/// Cookie carrying the session token on the audited page.
pub const AUTH_COOKIE_NAME: &str = "lhtoken";

/// Where the engine can reach the browser.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrowserEndpoint {
    /// Remote debugging port.
    pub port: u16,
    /// Full DevTools websocket URL, when known.
    pub ws_url: Option<String>,
}

/// Authentication resolved before measurement.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionAuth {
    pub token: SessionToken,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cookie {
    pub name: String,
    pub value: String,
}

/// What to apply to a page right after navigation.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PageOverrides {
    pub cookies: Vec<Cookie>,
}

impl PageOverrides {
    /// The cookies as a single `Cookie` request header value.
    pub fn cookie_header(&self) -> Option<String> {
        if self.cookies.is_empty() {
            return None;
        }
        Some(
            self.cookies
                .iter()
                .map(|c| format!("{}={}", c.name, c.value))
                .collect::<Vec<_>>()
                .join("; "),
        )
    }
}

/// Fires on navigation; only the audited URL gets overrides.
#[derive(Debug, Clone, PartialEq)]
pub struct NavigationHook {
    target_url: String,
    auth: Option<SessionAuth>,
}

impl NavigationHook {
    pub fn new(target_url: impl Into<String>, auth: Option<SessionAuth>) -> Self {
        Self {
            target_url: target_url.into(),
            auth,
        }
    }

    pub fn target_url(&self) -> &str {
        &self.target_url
    }

    pub fn on_navigate(&self, url: &str) -> Option<PageOverrides> {
        if url != self.target_url {
            return None;
        }

        let cookies = self
            .auth
            .iter()
            .map(|auth| Cookie {
                name: AUTH_COOKIE_NAME.to_string(),
                value: auth.token.cookie_value(),
            })
            .collect();

        Some(PageOverrides { cookies })
    }
}

/// A live browser the engine drives.
pub trait AutomationSession: Send {
    fn endpoint(&self) -> BrowserEndpoint;

    /// Orderly shutdown.
    fn close(&mut self) -> BoxFuture<'_, Result<()>>;

    /// Synchronous best-effort shutdown, for paths that cannot await.
    fn abort(&mut self);
}

/// Opens automation sessions.
pub trait BrowserLauncher: Send + Sync {
    fn open(&self) -> BoxFuture<'_, Result<Box<dyn AutomationSession>>>;
}
