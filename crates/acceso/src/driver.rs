//! The seam between page objects and a concrete browser.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │  LoginPage / DashboardPage / AuthenticatedSession             │
//! │           │ LocatorChain, wait::poll_until                    │
//! │           ▼                                                   │
//! │  PageDriver (trait, Arc<dyn PageDriver>)                       │
//! │     ├── ChromiumDriver   CDP via chromiumoxide (`browser`)    │
//! │     └── MockDriver       scripted in-memory page              │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! Drivers only answer point-in-time questions (how many matches, is the
//! first one visible, what is the URL). All waiting happens above this layer.

mod mock;

pub use mock::{ClickHandler, LoginMarkup, MockDriver, MockElement, MockLoginApp, MockPage};

use crate::locator::Selector;
use crate::result::AccesoResult;
use crate::wait::LoadState;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Browser configuration for a driver
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DriverConfig {
    /// Run in headless mode
    pub headless: bool,
    /// Viewport width
    pub viewport_width: u32,
    /// Viewport height
    pub viewport_height: u32,
    /// Path to chromium binary (None = auto-detect)
    pub chromium_path: Option<String>,
    /// Sandbox mode (disable for containers)
    pub sandbox: bool,
    /// User agent string
    pub user_agent: Option<String>,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            headless: true,
            viewport_width: 1280,
            viewport_height: 720,
            chromium_path: None,
            sandbox: true,
            user_agent: None,
        }
    }
}

impl DriverConfig {
    /// Set headless mode
    #[must_use]
    pub const fn with_headless(mut self, headless: bool) -> Self {
        self.headless = headless;
        self
    }

    /// Set viewport dimensions
    #[must_use]
    pub const fn with_viewport(mut self, width: u32, height: u32) -> Self {
        self.viewport_width = width;
        self.viewport_height = height;
        self
    }

    /// Set chromium path
    #[must_use]
    pub fn with_chromium_path(mut self, path: impl Into<String>) -> Self {
        self.chromium_path = Some(path.into());
        self
    }

    /// Disable sandbox (for containers)
    #[must_use]
    pub const fn with_no_sandbox(mut self) -> Self {
        self.sandbox = false;
        self
    }
}

/// Point-in-time page operations.
///
/// Element operations act on the first match of `selector` in document order.
#[async_trait]
pub trait PageDriver: Send + Sync + std::fmt::Debug {
    /// Navigate to an absolute URL
    async fn navigate(&self, url: &str) -> AccesoResult<()>;

    /// Current page URL
    async fn current_url(&self) -> AccesoResult<String>;

    /// Reload the current page
    async fn reload(&self) -> AccesoResult<()>;

    /// Whether the page has reached `state` right now
    async fn load_state_reached(&self, state: LoadState) -> AccesoResult<bool>;

    /// Number of elements matching `selector`
    async fn count(&self, selector: &Selector) -> AccesoResult<usize>;

    /// Whether the first match is rendered and visible; `false` when none
    async fn is_visible(&self, selector: &Selector) -> AccesoResult<bool>;

    /// Replace the value of the first match
    async fn fill(&self, selector: &Selector, text: &str) -> AccesoResult<()>;

    /// Click the first match
    async fn click(&self, selector: &Selector) -> AccesoResult<()>;

    /// Tick the first match (checkbox)
    async fn check(&self, selector: &Selector) -> AccesoResult<()>;

    /// Text content of the first match
    async fn text_content(&self, selector: &Selector) -> AccesoResult<Option<String>>;

    /// Release the page
    async fn close(&self) -> AccesoResult<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_driver_config_builders() {
        let config = DriverConfig::default()
            .with_headless(false)
            .with_viewport(800, 600)
            .with_chromium_path("/usr/bin/chromium")
            .with_no_sandbox();
        assert!(!config.headless);
        assert_eq!((config.viewport_width, config.viewport_height), (800, 600));
        assert_eq!(config.chromium_path.as_deref(), Some("/usr/bin/chromium"));
        assert!(!config.sandbox);
    }

    #[test]
    fn test_driver_config_default_is_headless() {
        assert!(DriverConfig::default().headless);
    }
}
