// Headless Chrome driver
//
// Production `BrowserLauncher`. headless_chrome talks DevTools over a
// blocking websocket client, so every call here blocks the calling thread.

use anyhow::{Context, Result};
use headless_chrome::browser::tab::NoElementFound;
use headless_chrome::{Browser, LaunchOptions, Tab};
use std::ffi::OsStr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

use super::browser::{BrowserLauncher, BrowserSession};

/// Launches headless Chrome/Chromium through the DevTools protocol
#[derive(Debug, Clone, Default)]
pub struct ChromeLauncher {
    /// Executable to use; headless_chrome auto-detects when `None`
    pub chrome_path: Option<PathBuf>,
}

impl ChromeLauncher {
    pub fn new(chrome_path: Option<PathBuf>) -> Self {
        Self { chrome_path }
    }
}

impl BrowserLauncher for ChromeLauncher {
    fn launch(&self) -> Result<Box<dyn BrowserSession>> {
        info!("Launching headless Chrome browser");

        let options = LaunchOptions {
            headless: true,
            // Containers rarely allow the Chrome sandbox
            sandbox: false,
            path: self.chrome_path.clone(),
            window_size: Some((1920, 1080)),
            args: vec![
                OsStr::new("--disable-dev-shm-usage"),
                OsStr::new("--disable-gpu"),
                OsStr::new("--no-first-run"),
                OsStr::new("--disable-blink-features=AutomationControlled"),
            ],
            ..Default::default()
        };

        let browser = Browser::new(options)
            .context("Failed to launch headless Chrome. Is Chrome/Chromium installed?")?;
        let tab = browser
            .new_tab()
            .context("Failed to create new browser tab")?;

        Ok(Box::new(ChromeSession {
            browser: Some(browser),
            tab,
        }))
    }
}

struct ChromeSession {
    browser: Option<Browser>,
    tab: Arc<Tab>,
}

const SELECT_OPTION_JS: &str = r#"function (value) {
    this.value = value;
    this.dispatchEvent(new Event('input', { bubbles: true }));
    this.dispatchEvent(new Event('change', { bubbles: true }));
    return this.value;
}"#;

impl BrowserSession for ChromeSession {
    fn navigate(&mut self, url: &str, ready_selector: &str, timeout: Duration) -> Result<()> {
        self.tab.set_default_timeout(timeout);
        self.tab
            .navigate_to(url)
            .with_context(|| format!("Failed to navigate to {}", url))?;
        // DOM content is enough; the page keeps a socket open so load/idle may never settle
        self.tab
            .wait_for_element_with_custom_timeout(ready_selector, timeout)
            .with_context(|| {
                format!(
                    "Timed out after {}s waiting for '{}' on {}",
                    timeout.as_secs(),
                    ready_selector,
                    url
                )
            })?;
        Ok(())
    }

    fn wait_for(&mut self, selector: &str, timeout: Duration) -> Result<()> {
        self.tab
            .wait_for_element_with_custom_timeout(selector, timeout)
            .with_context(|| {
                format!(
                    "Timed out after {}s waiting for '{}'",
                    timeout.as_secs(),
                    selector
                )
            })?;
        Ok(())
    }

    fn count(&mut self, selector: &str) -> Result<usize> {
        let found = self.tab.find_elements(selector).map(|elements| elements.len());
        count_or_none(found).with_context(|| format!("Failed to count '{}'", selector))
    }

    fn select_option(&mut self, selector: &str, position: usize, value: &str) -> Result<bool> {
        let elements = self
            .tab
            .find_elements(selector)
            .with_context(|| format!("Failed to query '{}'", selector))?;
        let Some(element) = elements.get(position) else {
            return Ok(false);
        };
        element
            .call_js_fn(
                SELECT_OPTION_JS,
                vec![serde_json::Value::String(value.to_string())],
                false,
            )
            .with_context(|| {
                format!("Failed to select '{}' in {}[{}]", value, selector, position)
            })?;
        Ok(true)
    }

    fn content(&mut self) -> Result<String> {
        self.tab.get_content().context("Failed to get page content")
    }

    fn close(&mut self) -> Result<()> {
        let Some(browser) = self.browser.take() else {
            return Ok(());
        };
        if let Err(e) = self.tab.close(false) {
            debug!("Tab close failed, killing browser anyway: {}", e);
        }
        // Dropping the handle kills the Chrome process
        drop(browser);
        info!("Browser closed");
        Ok(())
    }
}

/// find_elements errors when nothing matches; that is a count of zero.
/// Any other error (a dropped DevTools connection) is passed on.
fn count_or_none(found: Result<usize>) -> Result<usize> {
    match found {
        Err(e) if e.downcast_ref::<NoElementFound>().is_some() => Ok(0),
        other => other,
    }
}

impl Drop for ChromeSession {
    fn drop(&mut self) {
        let _ = self.close();
    }
}
