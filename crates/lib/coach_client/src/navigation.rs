//! Client-side navigation triggered by session changes.

use tokio::sync::watch;
use tracing::info;

/// Destinations the client can send the user to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    /// Public landing page, after logout.
    Landing,
    /// Login page, after the session was rejected.
    Login,
}

impl Route {
    pub fn path(&self) -> &'static str {
        match self {
            Route::Landing => "/",
            Route::Login => "/login",
        }
    }
}

/// Performs navigation on behalf of the client.
pub trait Navigator: Send + Sync {
    fn navigate(&self, route: Route);
}

/// Logs navigation requests. Default for headless use.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingNavigator;

impl Navigator for TracingNavigator {
    fn navigate(&self, route: Route) {
        info!(route = route.path(), "navigate");
    }
}

/// Publishes the latest route on a watch channel for a UI to follow.
#[derive(Debug)]
pub struct ChannelNavigator {
    tx: watch::Sender<Option<Route>>,
}

impl ChannelNavigator {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(None);
        Self { tx }
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<Route>> {
        self.tx.subscribe()
    }

    pub fn current(&self) -> Option<Route> {
        *self.tx.borrow()
    }
}

impl Default for ChannelNavigator {
    fn default() -> Self {
        Self::new()
    }
}

impl Navigator for ChannelNavigator {
    fn navigate(&self, route: Route) {
        info!(route = route.path(), "navigate");
        self.tx.send_replace(Some(route));
    }
}
