//! Page objects.
//!
//! A page object binds a [`LocatorSet`] to a [`PageContext`] and exposes
//! intent-level actions (`login`, `logout`) and verifications
//! (`verify_on_dashboard`). Page objects hold no state of their own beyond
//! the context, so any number of them may share one driver within a test.

pub mod dashboard;
pub mod login;

pub use dashboard::DashboardPage;
pub use login::LoginPage;

use crate::config::{Settings, DEFAULT_ACTION_TIMEOUT_MS, DEFAULT_NAVIGATION_TIMEOUT_MS};
use crate::driver::PageDriver;
use crate::locator::{LocatorChain, LocatorSet};
use crate::result::{AccesoError, AccesoResult};
use crate::wait::{self, LoadState, UrlPattern, WaitOptions, WaitResult};
use std::sync::Arc;
use std::time::Duration;

/// The browser page plus the settings every page object needs
#[derive(Debug, Clone)]
pub struct PageContext {
    driver: Arc<dyn PageDriver>,
    base_url: String,
    action_timeout_ms: u64,
    navigation_timeout_ms: u64,
}

impl PageContext {
    /// Context for the application described by `settings`
    #[must_use]
    pub fn new(driver: Arc<dyn PageDriver>, settings: &Settings) -> Self {
        Self::with_base_url(driver, settings.base_url.clone())
            .with_timeouts(settings.action_timeout_ms, settings.navigation_timeout_ms)
    }

    /// Context with default timeouts
    #[must_use]
    pub fn with_base_url(driver: Arc<dyn PageDriver>, base_url: impl Into<String>) -> Self {
        Self {
            driver,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            action_timeout_ms: DEFAULT_ACTION_TIMEOUT_MS,
            navigation_timeout_ms: DEFAULT_NAVIGATION_TIMEOUT_MS,
        }
    }

    /// Override both timeouts
    #[must_use]
    pub const fn with_timeouts(mut self, action_ms: u64, navigation_ms: u64) -> Self {
        self.action_timeout_ms = action_ms;
        self.navigation_timeout_ms = navigation_ms;
        self
    }

    /// The driver, borrowed
    #[must_use]
    pub fn driver(&self) -> &dyn PageDriver {
        self.driver.as_ref()
    }

    /// The driver, shared
    #[must_use]
    pub fn shared_driver(&self) -> Arc<dyn PageDriver> {
        Arc::clone(&self.driver)
    }

    /// Base URL without trailing slash
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Absolute URL for an application path
    #[must_use]
    pub fn url_for(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    /// Bound applied to element waits
    #[must_use]
    pub const fn action_timeout(&self) -> Duration {
        Duration::from_millis(self.action_timeout_ms)
    }

    /// Bound applied to element waits, in milliseconds
    #[must_use]
    pub const fn action_timeout_ms(&self) -> u64 {
        self.action_timeout_ms
    }

    /// Bound applied to navigation waits, in milliseconds
    #[must_use]
    pub const fn navigation_timeout_ms(&self) -> u64 {
        self.navigation_timeout_ms
    }

    /// Navigate to `path` and wait for the network to settle.
    pub async fn goto(&self, path: &str) -> AccesoResult<()> {
        let url = self.url_for(path);
        tracing::debug!(%url, "goto");
        self.driver.navigate(&url).await?;
        self.wait_for_network_idle().await?;
        Ok(())
    }

    /// Wait for `LoadState::NetworkIdle` within the navigation timeout.
    pub async fn wait_for_network_idle(&self) -> AccesoResult<WaitResult> {
        wait::wait_for_load_state(
            self.driver(),
            LoadState::NetworkIdle,
            WaitOptions::with_timeout(self.navigation_timeout_ms),
        )
        .await
    }

    /// Wait for the URL to match `pattern` within `timeout_ms`.
    pub async fn wait_for_url(&self, pattern: &UrlPattern, timeout_ms: u64) -> AccesoResult<WaitResult> {
        wait::wait_for_url(self.driver(), pattern, WaitOptions::with_timeout(timeout_ms)).await
    }

    /// Current page URL
    pub async fn current_url(&self) -> AccesoResult<String> {
        self.driver.current_url().await
    }

    /// Reload the page and wait for the network to settle.
    pub async fn reload(&self) -> AccesoResult<()> {
        self.driver.reload().await?;
        self.wait_for_network_idle().await?;
        Ok(())
    }
}

/// Common page-object surface
pub trait PageObject {
    /// Name used in errors and logs
    fn page_name(&self) -> &'static str;

    /// URL pattern that identifies this page
    fn url_pattern(&self) -> &UrlPattern;

    /// Registered locator chains
    fn locators(&self) -> &LocatorSet;

    /// Context the page acts through
    fn context(&self) -> &PageContext;

    /// Chain registered as `name`
    fn locator(&self, name: &str) -> AccesoResult<&LocatorChain> {
        self.locators().require(self.page_name(), name)
    }

    /// Whether `url` belongs to this page
    fn matches_url(&self, url: &str) -> bool {
        self.url_pattern().matches(url)
    }
}

/// Wait for `chain` to become visible; a timeout is reported as a failed
/// expectation.
pub(crate) async fn expect_visible(ctx: &PageContext, chain: &LocatorChain) -> AccesoResult<()> {
    chain
        .wait_for_visible(ctx.driver(), "see")
        .await
        .map(|_| ())
        .map_err(|e| expectation(e, || format!("expected {} to be visible", chain.name())))
}

/// Wait for the URL to match `pattern`; a timeout is reported as a failed
/// expectation.
pub(crate) async fn expect_url(ctx: &PageContext, pattern: &UrlPattern, timeout_ms: u64) -> AccesoResult<()> {
    match ctx.wait_for_url(pattern, timeout_ms).await {
        Ok(_) => Ok(()),
        Err(AccesoError::Timeout { ms, .. }) => {
            let actual = ctx.current_url().await.unwrap_or_default();
            Err(AccesoError::assertion(format!(
                "expected {pattern} within {ms}ms, page is at {actual:?}"
            )))
        }
        Err(other) => Err(other),
    }
}

fn expectation(err: AccesoError, describe: impl FnOnce() -> String) -> AccesoError {
    match err {
        AccesoError::Timeout { ms, .. } => {
            AccesoError::assertion(format!("{} within {ms}ms", describe()))
        }
        other => other,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::driver::MockDriver;
    use crate::result::FailureKind;

    fn context(driver: &Arc<MockDriver>) -> PageContext {
        PageContext::with_base_url(driver.clone(), "http://app.test/").with_timeouts(200, 400)
    }

    mod context_tests {
        use super::*;

        #[test]
        fn test_url_for_joins_cleanly() {
            let ctx = context(&Arc::new(MockDriver::new()));
            assert_eq!(ctx.url_for("/login"), "http://app.test/login");
            assert_eq!(ctx.url_for("dashboard"), "http://app.test/dashboard");
        }

        #[test]
        fn test_from_settings() {
            let settings = Settings {
                base_url: "http://staging.test".into(),
                action_timeout_ms: 1234,
                ..Settings::default()
            };
            let ctx = PageContext::new(Arc::new(MockDriver::new()), &settings);
            assert_eq!(ctx.base_url(), "http://staging.test");
            assert_eq!(ctx.action_timeout_ms(), 1234);
            assert_eq!(ctx.navigation_timeout_ms(), settings.navigation_timeout_ms);
        }

        #[tokio::test(start_paused = true)]
        async fn test_goto_waits_for_network_idle() {
            let driver = Arc::new(MockDriver::new());
            driver.set_network_busy_polls(2);
            let ctx = context(&driver);
            ctx.goto("/login").await.unwrap();
            assert_eq!(ctx.current_url().await.unwrap(), "http://app.test/login");
        }

        #[tokio::test(start_paused = true)]
        async fn test_goto_times_out_on_busy_network() {
            let driver = Arc::new(MockDriver::new());
            driver.set_network_busy_polls(u32::MAX);
            let err = context(&driver).goto("/login").await.unwrap_err();
            assert_eq!(err.kind(), FailureKind::Timeout);
        }
    }

    mod expectation_tests {
        use super::*;

        #[tokio::test(start_paused = true)]
        async fn test_expect_url_reports_assertion() {
            let driver = Arc::new(MockDriver::new());
            let ctx = context(&driver);
            ctx.goto("/login").await.unwrap();
            let err = expect_url(&ctx, &UrlPattern::any_of(["dashboard"]), 100)
                .await
                .unwrap_err();
            assert_eq!(err.kind(), FailureKind::Assertion);
            assert!(err.to_string().contains("http://app.test/login"));
        }

        #[test]
        fn test_expectation_keeps_other_errors() {
            let err = expectation(AccesoError::driver("gone"), || "x".into());
            assert_eq!(err.kind(), FailureKind::Driver);
        }
    }
}
