//! Dashboard page, reached after a successful login.

use super::{expect_url, expect_visible, PageContext, PageObject};
use crate::locator::{LocatorChain, LocatorSet, Selector};
use crate::result::{AccesoError, AccesoResult};
use crate::wait::UrlPattern;

/// Application path of the dashboard
pub const DASHBOARD_PATH: &str = "/dashboard";

/// Bound on the post-logout redirect
pub const LOGOUT_TIMEOUT_MS: u64 = 5_000;

/// Greeting heading
pub const WELCOME_MESSAGE: &str = "welcome message";
/// Account menu toggle
pub const USER_MENU: &str = "user menu";
/// Logout control
pub const LOGOUT_BUTTON: &str = "logout button";
/// Page title
pub const DASHBOARD_TITLE: &str = "dashboard title";
/// Main navigation
pub const NAVIGATION_MENU: &str = "navigation menu";

/// URL fragments that count as "logged in"
pub const AUTHENTICATED_URLS: [&str; 2] = ["dashboard", "home"];

/// The landing page for authenticated users
#[derive(Debug, Clone)]
pub struct DashboardPage {
    ctx: PageContext,
    locators: LocatorSet,
    url: UrlPattern,
}

impl DashboardPage {
    /// Bind the dashboard locators to `ctx`
    #[must_use]
    pub fn new(ctx: PageContext) -> Self {
        let locators = Self::locator_set().with_timeout(ctx.action_timeout());
        Self {
            ctx,
            locators,
            url: UrlPattern::any_of(AUTHENTICATED_URLS),
        }
    }

    /// Fallback chains for every dashboard element
    #[must_use]
    pub fn locator_set() -> LocatorSet {
        LocatorSet::new()
            .with(
                LocatorChain::new(WELCOME_MESSAGE, Selector::css("h1"))
                    .or(Selector::css("h2"))
                    .or(Selector::css(".welcome"))
                    .or(Selector::css(r#"[class*="welcome"]"#)),
            )
            .with(
                LocatorChain::new(USER_MENU, Selector::test_id("user-menu"))
                    .or(Selector::css(".user-menu"))
                    .or(Selector::css(r#"[class*="user-menu"]"#))
                    .or(Selector::css_with_text("button", "User")),
            )
            .with(
                LocatorChain::new(LOGOUT_BUTTON, Selector::css_with_text("button", "Logout"))
                    .or(Selector::css_with_text("button", "Sign out"))
                    .or(Selector::css_with_text("a", "Logout")),
            )
            .with(
                LocatorChain::new(DASHBOARD_TITLE, Selector::css_with_text("h1", "Dashboard"))
                    .or(Selector::css_with_text("h1", "Home"))
                    .or(Selector::test_id("dashboard-title")),
            )
            .with(
                LocatorChain::new(NAVIGATION_MENU, Selector::css("nav"))
                    .or(Selector::role("navigation"))
                    .or(Selector::css(".navigation"))
                    .or(Selector::css(r#"[class*="nav"]"#)),
            )
    }

    /// Open the dashboard and wait for the network to settle.
    pub async fn goto(&self) -> AccesoResult<()> {
        self.ctx.goto(DASHBOARD_PATH).await
    }

    /// URL matches `dashboard|home`, then the network settles.
    pub async fn verify_on_dashboard(&self) -> AccesoResult<()> {
        expect_url(&self.ctx, &self.url, self.ctx.navigation_timeout_ms()).await?;
        self.ctx.wait_for_network_idle().await?;
        Ok(())
    }

    /// Greeting is visible and, when `username` is given, mentions it. A
    /// greeting that never appears is a `Timeout`.
    pub async fn verify_welcome_message(&self, username: Option<&str>) -> AccesoResult<()> {
        let chain = self.locator(WELCOME_MESSAGE)?;
        chain.wait_for_visible(self.ctx.driver(), "see").await?;

        let Some(username) = username else {
            return Ok(());
        };
        let text = chain.text_content(self.ctx.driver()).await?;
        if text.contains(username) {
            Ok(())
        } else {
            Err(AccesoError::assertion(format!(
                "expected welcome message to contain {username:?}, got {text:?}"
            )))
        }
    }

    /// Open the user menu if there is one, click logout, and wait for the
    /// login page.
    pub async fn logout(&self) -> AccesoResult<()> {
        let driver = self.ctx.driver();
        let menu = self.locator(USER_MENU)?;
        let logout = self.locator(LOGOUT_BUTTON)?;

        if menu.is_visible(driver).await? {
            menu.click(driver).await?;
            logout.wait_for_visible(driver, "see").await?;
        }
        logout.click(driver).await?;

        self.ctx
            .wait_for_url(&UrlPattern::Contains("login".into()), LOGOUT_TIMEOUT_MS)
            .await?;
        tracing::info!("logged out");
        Ok(())
    }

    /// Title is visible.
    pub async fn verify_dashboard_title(&self) -> AccesoResult<()> {
        expect_visible(&self.ctx, self.locator(DASHBOARD_TITLE)?).await
    }

    /// Navigation is visible.
    pub async fn verify_navigation_menu(&self) -> AccesoResult<()> {
        expect_visible(&self.ctx, self.locator(NAVIGATION_MENU)?).await
    }

    /// Current page URL
    pub async fn current_url(&self) -> AccesoResult<String> {
        self.ctx.current_url().await
    }
}

impl PageObject for DashboardPage {
    fn page_name(&self) -> &'static str {
        "dashboard page"
    }

    fn url_pattern(&self) -> &UrlPattern {
        &self.url
    }

    fn locators(&self) -> &LocatorSet {
        &self.locators
    }

    fn context(&self) -> &PageContext {
        &self.ctx
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::driver::{LoginMarkup, MockDriver, MockElement, MockLoginApp, PageDriver};
    use crate::page::LoginPage;
    use crate::result::FailureKind;
    use std::sync::Arc;

    const BASE: &str = "http://app.test";
    const USER: &str = "testuser@example.com";
    const PASS: &str = "TestPassword123!";

    async fn logged_in(markup: LoginMarkup) -> (Arc<MockDriver>, DashboardPage) {
        let driver = Arc::new(
            MockLoginApp::new(BASE)
                .with_account(USER, PASS)
                .with_markup(markup)
                .driver(),
        );
        let ctx = PageContext::with_base_url(driver.clone(), BASE).with_timeouts(300, 600);
        let login = LoginPage::new(ctx.clone());
        login.goto().await.unwrap();
        login.login(USER, PASS).await.unwrap();
        (driver, DashboardPage::new(ctx))
    }

    #[test]
    fn test_url_pattern() {
        let ctx = PageContext::with_base_url(Arc::new(MockDriver::new()), BASE);
        let page = DashboardPage::new(ctx);
        assert!(page.matches_url("http://app.test/home"));
        assert!(page.matches_url("http://app.test/dashboard?tab=2"));
        assert!(!page.matches_url("http://app.test/login"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_verifications_standard_markup() {
        let (_driver, page) = logged_in(LoginMarkup::Standard).await;
        page.verify_on_dashboard().await.unwrap();
        page.verify_welcome_message(Some(USER)).await.unwrap();
        page.verify_welcome_message(None).await.unwrap();
        page.verify_dashboard_title().await.unwrap();
        page.verify_navigation_menu().await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_verifications_alternate_markup() {
        let (_driver, page) = logged_in(LoginMarkup::Alternate).await;
        page.verify_on_dashboard().await.unwrap();
        page.verify_welcome_message(Some(USER)).await.unwrap();
        page.verify_dashboard_title().await.unwrap();
        page.verify_navigation_menu().await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_welcome_message_mismatch() {
        let (_driver, page) = logged_in(LoginMarkup::Standard).await;
        let err = page
            .verify_welcome_message(Some("someone-else"))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), FailureKind::Assertion);
    }

    #[tokio::test(start_paused = true)]
    async fn test_missing_welcome_message_times_out() {
        let driver = Arc::new(MockDriver::new());
        driver.add_route("/dashboard", vec![MockElement::new("nav")]);
        let page = DashboardPage::new(
            PageContext::with_base_url(driver.clone(), BASE).with_timeouts(100, 200),
        );
        page.goto().await.unwrap();
        page.verify_navigation_menu().await.unwrap();

        let err = page.verify_welcome_message(None).await.unwrap_err();
        assert_eq!(err.kind(), FailureKind::Timeout);
        assert!(matches!(err, AccesoError::Timeout { ms: 100, .. }));
        assert!(err.to_string().contains(WELCOME_MESSAGE));
    }

    #[tokio::test(start_paused = true)]
    async fn test_logout_through_user_menu() {
        let (driver, page) = logged_in(LoginMarkup::Standard).await;
        page.logout().await.unwrap();
        assert!(driver.was_called(r#"click:[data-testid="user-menu"]"#));
        assert!(page.current_url().await.unwrap().ends_with("/login"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_logout_without_user_menu() {
        let (driver, page) = logged_in(LoginMarkup::Alternate).await;
        page.logout().await.unwrap();
        assert!(!driver.was_called(r#"click:[data-testid="user-menu"]"#));
        assert!(driver.was_called(r#"click:a:has-text("Logout")"#));
    }

    #[tokio::test(start_paused = true)]
    async fn test_logout_without_redirect_times_out() {
        let driver = Arc::new(MockDriver::new());
        driver.add_route("/dashboard", vec![MockElement::new("button").text("Logout")]);
        let page = DashboardPage::new(PageContext::with_base_url(driver.clone(), BASE));
        page.goto().await.unwrap();
        let err = page.logout().await.unwrap_err();
        assert!(matches!(err, AccesoError::Timeout { ms: LOGOUT_TIMEOUT_MS, .. }));
    }

    #[tokio::test(start_paused = true)]
    async fn test_verify_on_dashboard_from_login_fails() {
        let driver = Arc::new(MockDriver::new());
        driver.navigate("http://app.test/login").await.unwrap();
        let page = DashboardPage::new(
            PageContext::with_base_url(driver.clone(), BASE).with_timeouts(100, 200),
        );
        let err = page.verify_on_dashboard().await.unwrap_err();
        assert_eq!(err.kind(), FailureKind::Assertion);
    }
}
