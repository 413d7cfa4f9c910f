//! Login page.

use super::{expect_url, expect_visible, PageContext, PageObject};
use crate::config::Credentials;
use crate::locator::{LocatorChain, LocatorSet, Selector};
use crate::result::{AccesoError, AccesoResult};
use crate::wait::{poll_until, UrlPattern, WaitOptions};
use secrecy::ExposeSecret;

/// Application path of the login form
pub const LOGIN_PATH: &str = "/login";

/// Username field
pub const USERNAME: &str = "username";
/// Password field
pub const PASSWORD: &str = "password";
/// Submit button
pub const LOGIN_BUTTON: &str = "login button";
/// Error banner
pub const ERROR_MESSAGE: &str = "error message";
/// Forgot-password link
pub const FORGOT_PASSWORD: &str = "forgot password";
/// Remember-me checkbox
pub const REMEMBER_ME: &str = "remember me";

/// The login form
#[derive(Debug, Clone)]
pub struct LoginPage {
    ctx: PageContext,
    locators: LocatorSet,
    url: UrlPattern,
}

impl LoginPage {
    /// Bind the login locators to `ctx`
    #[must_use]
    pub fn new(ctx: PageContext) -> Self {
        let locators = Self::locator_set().with_timeout(ctx.action_timeout());
        Self {
            ctx,
            locators,
            url: UrlPattern::Contains("login".into()),
        }
    }

    /// Fallback chains for every login element
    #[must_use]
    pub fn locator_set() -> LocatorSet {
        LocatorSet::new()
            .with(
                LocatorChain::new(USERNAME, Selector::css(r#"input[name="username"]"#))
                    .or(Selector::css(r#"input[type="email"]"#))
                    .or(Selector::css(r#"input[id*="username"]"#))
                    .or(Selector::css(r#"input[id*="email"]"#)),
            )
            .with(
                LocatorChain::new(PASSWORD, Selector::css(r#"input[name="password"]"#))
                    .or(Selector::css(r#"input[type="password"]"#))
                    .or(Selector::css(r#"input[id*="password"]"#)),
            )
            .with(
                LocatorChain::new(LOGIN_BUTTON, Selector::css(r#"button[type="submit"]"#))
                    .or(Selector::css_with_text("button", "Log in"))
                    .or(Selector::css_with_text("button", "Sign in"))
                    .or(Selector::css_with_text("button", "Login")),
            )
            .with(
                LocatorChain::new(ERROR_MESSAGE, Selector::css(".error"))
                    .or(Selector::css(".alert-danger"))
                    .or(Selector::css(r#"[role="alert"]"#))
                    .or(Selector::css(".message-error")),
            )
            .with(
                LocatorChain::new(FORGOT_PASSWORD, Selector::css_with_text("a", "Forgot"))
                    .or(Selector::css_with_text("a", "forgot password")),
            )
            .with(
                LocatorChain::new(
                    REMEMBER_ME,
                    Selector::css(r#"input[type="checkbox"][name*="remember"]"#),
                )
                .or(Selector::css(r#"input[type="checkbox"][id*="remember"]"#)),
            )
    }

    /// Open the login page and wait for the network to settle.
    pub async fn goto(&self) -> AccesoResult<()> {
        self.ctx.goto(LOGIN_PATH).await
    }

    /// Type into the username field
    pub async fn fill_username(&self, username: &str) -> AccesoResult<()> {
        self.locator(USERNAME)?.fill(self.ctx.driver(), username).await
    }

    /// Type into the password field
    pub async fn fill_password(&self, password: &str) -> AccesoResult<()> {
        self.locator(PASSWORD)?.fill(self.ctx.driver(), password).await
    }

    /// Press the submit button
    pub async fn click_login(&self) -> AccesoResult<()> {
        self.locator(LOGIN_BUTTON)?.click(self.ctx.driver()).await
    }

    /// Fill both fields and submit. Stops at the first failing step.
    pub async fn login(&self, username: &str, password: &str) -> AccesoResult<()> {
        tracing::debug!(username, "login");
        self.fill_username(username).await?;
        self.fill_password(password).await?;
        self.click_login().await
    }

    /// [`Self::login`] with configured credentials
    pub async fn login_as(&self, credentials: &Credentials) -> AccesoResult<()> {
        self.login(&credentials.username, credentials.password.expose_secret())
            .await
    }

    /// Fill both fields, tick remember-me when the form offers it, submit.
    pub async fn login_with_remember_me(&self, username: &str, password: &str) -> AccesoResult<()> {
        self.fill_username(username).await?;
        self.fill_password(password).await?;

        let remember = self.locator(REMEMBER_ME)?;
        if remember.is_visible(self.ctx.driver()).await? {
            remember.check(self.ctx.driver()).await?;
        } else {
            tracing::debug!("no remember-me checkbox on this form");
        }

        self.click_login().await
    }

    /// URL is the login page and the form is usable.
    pub async fn verify_on_login_page(&self) -> AccesoResult<()> {
        expect_url(&self.ctx, &self.url, self.ctx.action_timeout_ms()).await?;
        self.verify_login_form_visible().await
    }

    /// Username, password and submit are visible.
    pub async fn verify_login_form_visible(&self) -> AccesoResult<()> {
        for name in [USERNAME, PASSWORD, LOGIN_BUTTON] {
            expect_visible(&self.ctx, self.locator(name)?).await?;
        }
        Ok(())
    }

    /// Error banner is visible and its text contains `expected`. A banner
    /// that never appears is a `Timeout`; wrong text is an assertion failure.
    pub async fn verify_error_message(&self, expected: &str) -> AccesoResult<()> {
        let chain = self.locator(ERROR_MESSAGE)?;
        chain.wait_for_visible(self.ctx.driver(), "see").await?;

        let driver = self.ctx.driver();
        let options = WaitOptions::with_timeout(self.ctx.action_timeout_ms());
        let matched = poll_until("match", ERROR_MESSAGE, options, || async move {
            Ok(chain.text_content(driver).await?.contains(expected))
        })
        .await;

        match matched {
            Ok(_) => Ok(()),
            Err(AccesoError::Timeout { .. }) => {
                let actual = chain.text_content(driver).await?;
                Err(AccesoError::assertion(format!(
                    "expected error message to contain {expected:?}, got {actual:?}"
                )))
            }
            Err(other) => Err(other),
        }
    }

    /// Error banner becomes visible within `timeout_ms`; text is not checked.
    pub async fn wait_for_error(&self, timeout_ms: u64) -> AccesoResult<()> {
        self.locator(ERROR_MESSAGE)?
            .wait_for_visible_within(self.ctx.driver(), "see", WaitOptions::with_timeout(timeout_ms))
            .await
            .map(|_| ())
    }

    /// Whether the error banner is showing right now
    pub async fn is_error_visible(&self) -> AccesoResult<bool> {
        self.locator(ERROR_MESSAGE)?.is_visible(self.ctx.driver()).await
    }

    /// Empty both fields
    pub async fn clear_form(&self) -> AccesoResult<()> {
        self.locator(USERNAME)?.clear(self.ctx.driver()).await?;
        self.locator(PASSWORD)?.clear(self.ctx.driver()).await
    }

    /// Follow the forgot-password link
    pub async fn click_forgot_password(&self) -> AccesoResult<()> {
        self.locator(FORGOT_PASSWORD)?.click(self.ctx.driver()).await
    }
}

impl PageObject for LoginPage {
    fn page_name(&self) -> &'static str {
        "login page"
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
    use crate::result::FailureKind;
    use std::sync::Arc;

    const BASE: &str = "http://app.test";

    fn page(driver: &Arc<MockDriver>) -> LoginPage {
        LoginPage::new(PageContext::with_base_url(driver.clone(), BASE).with_timeouts(300, 600))
    }

    fn app(markup: LoginMarkup) -> Arc<MockDriver> {
        Arc::new(
            MockLoginApp::new(BASE)
                .with_account("testuser@example.com", "TestPassword123!")
                .with_markup(markup)
                .driver(),
        )
    }

    mod locator_tests {
        use super::*;

        #[test]
        fn test_chain_order() {
            let set = LoginPage::locator_set();
            let username = set.get(USERNAME).unwrap();
            assert_eq!(username.candidates().len(), 4);
            assert_eq!(username.candidates()[0], Selector::css(r#"input[name="username"]"#));
            assert_eq!(
                set.get(LOGIN_BUTTON).unwrap().candidates()[1],
                Selector::css_with_text("button", "Log in")
            );
            assert_eq!(set.len(), 6);
        }

        #[test]
        fn test_unknown_locator() {
            let driver = Arc::new(MockDriver::new());
            let err = page(&driver).locator("captcha").unwrap_err();
            assert_eq!(err.kind(), FailureKind::Driver);
        }

        #[test]
        fn test_timeouts_follow_context() {
            let driver = Arc::new(MockDriver::new());
            let login = page(&driver);
            assert!(login
                .locators()
                .names()
                .all(|n| login.locators().get(n).unwrap().options().timeout.as_millis() == 300));
        }
    }

    mod flow_tests {
        use super::*;

        #[tokio::test(start_paused = true)]
        async fn test_login_fills_in_order() {
            let driver = app(LoginMarkup::Standard);
            let login = page(&driver);
            login.goto().await.unwrap();
            login.login("testuser@example.com", "TestPassword123!").await.unwrap();

            let steps: Vec<_> = driver
                .history()
                .into_iter()
                .filter(|h| !h.starts_with("navigate"))
                .collect();
            assert_eq!(
                steps,
                vec![
                    r#"fill:input[name="username"]"#.to_string(),
                    r#"fill:input[name="password"]"#.to_string(),
                    r#"click:button[type="submit"]"#.to_string(),
                ]
            );
            assert!(driver.current_url().await.unwrap().ends_with("/dashboard"));
        }

        #[tokio::test(start_paused = true)]
        async fn test_alternate_markup_resolves_fallbacks() {
            let driver = app(LoginMarkup::Alternate);
            let login = page(&driver);
            login.goto().await.unwrap();
            login.verify_on_login_page().await.unwrap();
            login.login("testuser@example.com", "wrong").await.unwrap();
            login.verify_error_message("Invalid").await.unwrap();
            assert!(driver.was_called(r#"fill:input[type="email"]"#));
            assert!(driver.was_called(r#"click:button:has-text("Sign in")"#));
        }

        #[tokio::test(start_paused = true)]
        async fn test_failed_fill_aborts_login() {
            let driver = Arc::new(MockDriver::new());
            driver.add_route("/login", vec![MockElement::new("input").attr("name", "username")]);
            let login = page(&driver);
            login.goto().await.unwrap();
            let err = login.login("a", "b").await.unwrap_err();
            assert_eq!(err.to_string(), "Timed out after 300ms waiting to fill password");
            assert!(!driver.was_called("click"));
        }

        #[tokio::test(start_paused = true)]
        async fn test_remember_me_absent_is_noop() {
            let driver = app(LoginMarkup::Alternate);
            let login = page(&driver);
            login.goto().await.unwrap();
            login
                .login_with_remember_me("testuser@example.com", "TestPassword123!")
                .await
                .unwrap();
            assert!(!driver.was_called("check"));
            assert!(driver.current_url().await.unwrap().ends_with("/dashboard"));
        }

        #[tokio::test(start_paused = true)]
        async fn test_remember_me_flow_checks_box() {
            let driver = app(LoginMarkup::Standard);
            let login = page(&driver);
            login.goto().await.unwrap();
            login
                .login_with_remember_me("testuser@example.com", "TestPassword123!")
                .await
                .unwrap();
            assert!(driver.was_called("check:"));
        }
    }

    mod verification_tests {
        use super::*;

        #[tokio::test(start_paused = true)]
        async fn test_error_text_mismatch_is_assertion() {
            let driver = app(LoginMarkup::Standard);
            let login = page(&driver);
            login.goto().await.unwrap();
            login.login("testuser@example.com", "nope").await.unwrap();
            let err = login.verify_error_message("Account locked").await.unwrap_err();
            assert_eq!(err.kind(), FailureKind::Assertion);
            assert!(err.to_string().contains("Invalid username or password"));
        }

        #[tokio::test(start_paused = true)]
        async fn test_missing_error_is_timeout() {
            let driver = app(LoginMarkup::Standard);
            let login = page(&driver);
            login.goto().await.unwrap();
            let err = login.verify_error_message("anything").await.unwrap_err();
            assert_eq!(err.kind(), FailureKind::Timeout);
            assert!(matches!(err, AccesoError::Timeout { ms: 300, .. }));
            assert!(err.to_string().contains(ERROR_MESSAGE));
        }

        #[tokio::test(start_paused = true)]
        async fn test_error_visibility_follows_submit() {
            let driver = app(LoginMarkup::Standard);
            let login = page(&driver);
            login.goto().await.unwrap();
            assert!(!login.is_error_visible().await.unwrap());

            login.login("testuser@example.com", "nope").await.unwrap();
            login.wait_for_error(300).await.unwrap();
            assert!(login.is_error_visible().await.unwrap());
        }

        #[tokio::test(start_paused = true)]
        async fn test_wait_for_error_times_out() {
            let driver = app(LoginMarkup::Standard);
            let login = page(&driver);
            login.goto().await.unwrap();
            let err = login.wait_for_error(150).await.unwrap_err();
            assert!(matches!(err, AccesoError::Timeout { ms: 150, .. }));
        }

        #[tokio::test(start_paused = true)]
        async fn test_empty_username_error() {
            let driver = app(LoginMarkup::Standard);
            let login = page(&driver);
            login.goto().await.unwrap();
            login.login("", "TestPassword123!").await.unwrap();
            login.wait_for_error(300).await.unwrap();
            login.verify_error_message("Username is required").await.unwrap();
        }

        #[tokio::test(start_paused = true)]
        async fn test_clear_form() {
            let driver = app(LoginMarkup::Standard);
            let login = page(&driver);
            login.goto().await.unwrap();
            login.fill_username("someone").await.unwrap();
            login.fill_password("secret").await.unwrap();
            login.clear_form().await.unwrap();
            assert_eq!(driver.value_of("username").as_deref(), Some(""));
            assert_eq!(driver.value_of("password").as_deref(), Some(""));
        }

        #[tokio::test(start_paused = true)]
        async fn test_verify_on_login_page_fails_elsewhere() {
            let driver = app(LoginMarkup::Standard);
            let login = page(&driver);
            driver.navigate("http://app.test/forgot-password").await.unwrap();
            let err = login.verify_on_login_page().await.unwrap_err();
            assert_eq!(err.kind(), FailureKind::Assertion);
        }

        #[tokio::test(start_paused = true)]
        async fn test_forgot_password_link() {
            let driver = app(LoginMarkup::Standard);
            let login = page(&driver);
            login.goto().await.unwrap();
            login.click_forgot_password().await.unwrap();
            assert!(driver.current_url().await.unwrap().ends_with("/forgot-password"));
        }
    }
}
