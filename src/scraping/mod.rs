// Browser-driven scraping of the market table
// headless_chrome renders the page; scraper parses the resulting DOM

pub mod browser;
pub mod chrome;
pub mod extract;
pub mod settle;

pub use browser::{BrowserLauncher, BrowserPool, BrowserSession, Checkout, SessionGuard};
pub use chrome::ChromeLauncher;
