// Browser session seam
//
// The pipeline drives the page through `BrowserSession` so the procedure can
// be exercised without a real Chrome. Implementations are blocking and are
// only ever used from `spawn_blocking`.

use anyhow::{Context, Result};
use std::ops::{Deref, DerefMut};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tracing::{debug, warn};

/// One live browser with a single page
pub trait BrowserSession: Send {
    /// Load `url` and wait (bounded) until `ready_selector` is in the DOM
    fn navigate(&mut self, url: &str, ready_selector: &str, timeout: Duration) -> Result<()>;

    /// Wait (bounded) until at least one element matches `selector`
    fn wait_for(&mut self, selector: &str, timeout: Duration) -> Result<()>;

    /// Number of elements currently matching `selector`
    fn count(&mut self, selector: &str) -> Result<usize>;

    /// Choose `value` in the `position`-th element matching `selector` and
    /// fire its change event. `Ok(false)` when there is no such element.
    fn select_option(&mut self, selector: &str, position: usize, value: &str) -> Result<bool>;

    /// Serialized DOM of the page as currently rendered
    fn content(&mut self) -> Result<String>;

    /// Terminate the browser process. Must be safe to call more than once.
    fn close(&mut self) -> Result<()>;
}

pub trait BrowserLauncher: Send + Sync {
    fn launch(&self) -> Result<Box<dyn BrowserSession>>;
}

/// Closes its session on drop, whatever path the scrape took
pub struct SessionGuard {
    session: Box<dyn BrowserSession>,
}

impl SessionGuard {
    pub fn new(session: Box<dyn BrowserSession>) -> Self {
        Self { session }
    }
}

impl Deref for SessionGuard {
    type Target = dyn BrowserSession;

    fn deref(&self) -> &Self::Target {
        self.session.as_ref()
    }
}

impl DerefMut for SessionGuard {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.session.as_mut()
    }
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        debug!("Closing browser session");
        if let Err(e) = self.session.close() {
            warn!("Failed to close browser session cleanly: {:#}", e);
        }
    }
}

/// Bounds how many browsers run at once.
///
/// A checkout is a semaphore permit; the browser itself is still launched
/// fresh per checkout and torn down by its [`SessionGuard`].
#[derive(Clone)]
pub struct BrowserPool {
    launcher: Arc<dyn BrowserLauncher>,
    permits: Arc<Semaphore>,
    capacity: usize,
}

/// A permit plus the launcher to use while holding it
pub struct Checkout {
    launcher: Arc<dyn BrowserLauncher>,
    _permit: OwnedSemaphorePermit,
}

impl Checkout {
    pub fn launch(&self) -> Result<SessionGuard> {
        let session = self.launcher.launch()?;
        Ok(SessionGuard::new(session))
    }
}

impl BrowserPool {
    pub fn new(launcher: Arc<dyn BrowserLauncher>, max_browsers: usize) -> Self {
        let capacity = max_browsers.max(1);
        Self {
            launcher,
            permits: Arc::new(Semaphore::new(capacity)),
            capacity,
        }
    }

    /// Wait for a free slot. Errors only if the pool was closed.
    pub async fn checkout(&self) -> Result<Checkout> {
        let permit = self
            .permits
            .clone()
            .acquire_owned()
            .await
            .context("Browser pool is closed")?;
        Ok(Checkout {
            launcher: self.launcher.clone(),
            _permit: permit,
        })
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn available(&self) -> usize {
        self.permits.available_permits()
    }

    pub fn close(&self) {
        self.permits.close();
    }
}
