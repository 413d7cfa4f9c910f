//! Resilient locators.
//!
//! A [`LocatorChain`] names one logical UI element and lists several ways of
//! finding it. The first candidate that matches anything on the page at
//! evaluation time wins, so markup variants across deployments (a `name`
//! attribute here, an `id` there) resolve to the same logical element.
//!
//! Chains are re-resolved on every poll; nothing is cached between calls.

use crate::driver::PageDriver;
use crate::result::{AccesoError, AccesoResult};
use crate::wait::{poll_for, WaitOptions, DEFAULT_POLL_INTERVAL_MS};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default locator timeout (5 seconds)
pub const DEFAULT_TIMEOUT_MS: u64 = crate::config::DEFAULT_ACTION_TIMEOUT_MS;

// =============================================================================
// SELECTOR
// =============================================================================

/// One way of finding elements
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Selector {
    /// CSS selector (e.g., `input[name="username"]`)
    Css(String),
    /// Innermost elements whose text contains the string (case-insensitive)
    Text(String),
    /// CSS selector filtered by text content (`button:has-text("Log in")`)
    CssWithText {
        /// Base CSS selector
        css: String,
        /// Text content to match (case-insensitive)
        text: String,
    },
    /// ARIA role, explicit or implied by the tag
    Role(String),
    /// Test ID selector (data-testid attribute)
    TestId(String),
    /// XPath selector
    XPath(String),
}

impl Selector {
    /// Create a CSS selector
    #[must_use]
    pub fn css(selector: impl Into<String>) -> Self {
        Self::Css(selector.into())
    }

    /// Create a text selector
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text(text.into())
    }

    /// Create a CSS selector filtered by text
    #[must_use]
    pub fn css_with_text(css: impl Into<String>, text: impl Into<String>) -> Self {
        Self::CssWithText {
            css: css.into(),
            text: text.into(),
        }
    }

    /// Create a role selector
    #[must_use]
    pub fn role(role: impl Into<String>) -> Self {
        Self::Role(role.into())
    }

    /// Create a test ID selector
    #[must_use]
    pub fn test_id(id: impl Into<String>) -> Self {
        Self::TestId(id.into())
    }

    /// Create an XPath selector
    #[must_use]
    pub fn xpath(path: impl Into<String>) -> Self {
        Self::XPath(path.into())
    }

    /// JavaScript expression yielding every match as an array, in document order
    #[must_use]
    pub fn to_all_query(&self) -> String {
        match self {
            Self::Css(s) => format!("Array.from(document.querySelectorAll({}))", js_str(s)),
            Self::Text(t) => format!(
                "Array.from(document.querySelectorAll('body *')).filter(el => \
                 el.textContent.toLowerCase().includes({t}) && \
                 !Array.from(el.children).some(c => c.textContent.toLowerCase().includes({t})))",
                t = js_str(&t.to_lowercase())
            ),
            Self::CssWithText { css, text } => format!(
                "Array.from(document.querySelectorAll({})).filter(el => el.textContent.toLowerCase().includes({}))",
                js_str(css),
                js_str(&text.to_lowercase())
            ),
            Self::Role(role) => format!(
                "Array.from(document.querySelectorAll({}))",
                js_str(&role_css(role))
            ),
            Self::TestId(id) => format!(
                "Array.from(document.querySelectorAll({}))",
                js_str(&format!("[data-testid=\"{id}\"]"))
            ),
            Self::XPath(s) => format!(
                "(() => {{ const r = document.evaluate({}, document, null, \
                 XPathResult.ORDERED_NODE_SNAPSHOT_TYPE, null); \
                 return Array.from({{ length: r.snapshotLength }}, (_, i) => r.snapshotItem(i)); }})()",
                js_str(s)
            ),
        }
    }

    /// JavaScript expression yielding the first match or `null`
    #[must_use]
    pub fn to_query(&self) -> String {
        format!("({}[0] || null)", self.to_all_query())
    }

    /// JavaScript expression yielding the number of matches
    #[must_use]
    pub fn to_count_query(&self) -> String {
        format!("{}.length", self.to_all_query())
    }
}

impl std::fmt::Display for Selector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Css(s) => f.write_str(s),
            Self::Text(t) => write!(f, "text={t:?}"),
            Self::CssWithText { css, text } => write!(f, "{css}:has-text({text:?})"),
            Self::Role(role) => write!(f, "role={role}"),
            Self::TestId(id) => write!(f, "[data-testid={id:?}]"),
            Self::XPath(s) => write!(f, "xpath={s}"),
        }
    }
}

/// Tags carrying an ARIA role implicitly.
#[must_use]
pub fn implicit_role_tags(role: &str) -> &'static [&'static str] {
    match role {
        "navigation" => &["nav"],
        "button" => &["button", "input[type=\"submit\"]", "input[type=\"button\"]"],
        "link" => &["a[href]"],
        "heading" => &["h1", "h2", "h3", "h4", "h5", "h6"],
        "textbox" => &["input:not([type])", "input[type=\"text\"]", "input[type=\"email\"]", "textarea"],
        "checkbox" => &["input[type=\"checkbox\"]"],
        "main" => &["main"],
        "form" => &["form"],
        _ => &[],
    }
}

fn role_css(role: &str) -> String {
    std::iter::once(format!("[role=\"{role}\"]"))
        .chain(implicit_role_tags(role).iter().map(|t| (*t).to_string()))
        .collect::<Vec<_>>()
        .join(", ")
}

fn js_str(s: &str) -> String {
    serde_json::Value::String(s.to_owned()).to_string()
}

// =============================================================================
// LOCATOR OPTIONS
// =============================================================================

/// Options for locator operations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LocatorOptions {
    /// Timeout for auto-waiting
    pub timeout: Duration,
    /// Polling interval for auto-waiting
    pub poll_interval: Duration,
}

impl Default for LocatorOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_millis(DEFAULT_TIMEOUT_MS),
            poll_interval: Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
        }
    }
}

impl LocatorOptions {
    fn wait_options(&self) -> WaitOptions {
        WaitOptions {
            timeout_ms: u64::try_from(self.timeout.as_millis()).unwrap_or(u64::MAX),
            poll_interval_ms: u64::try_from(self.poll_interval.as_millis()).unwrap_or(u64::MAX),
        }
    }
}

// =============================================================================
// LOCATOR CHAIN
// =============================================================================

/// Ordered fallback candidates for one logical element
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocatorChain {
    name: String,
    candidates: Vec<Selector>,
    options: LocatorOptions,
}

impl LocatorChain {
    /// Chain with a single candidate; add fallbacks with [`Self::or`].
    #[must_use]
    pub fn new(name: impl Into<String>, first: Selector) -> Self {
        Self {
            name: name.into(),
            candidates: vec![first],
            options: LocatorOptions::default(),
        }
    }

    /// Append a fallback candidate
    #[must_use]
    pub fn or(mut self, selector: Selector) -> Self {
        self.candidates.push(selector);
        self
    }

    /// Set the auto-wait timeout
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.options.timeout = timeout;
        self
    }

    /// Set the polling interval
    #[must_use]
    pub const fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.options.poll_interval = interval;
        self
    }

    /// Logical name, used in timeout messages
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Candidates in priority order
    #[must_use]
    pub fn candidates(&self) -> &[Selector] {
        &self.candidates
    }

    /// Current options
    #[must_use]
    pub const fn options(&self) -> &LocatorOptions {
        &self.options
    }

    /// First candidate with at least one match right now.
    pub async fn resolve(&self, driver: &dyn PageDriver) -> AccesoResult<Option<&Selector>> {
        for candidate in &self.candidates {
            if driver.count(candidate).await? > 0 {
                return Ok(Some(candidate));
            }
        }
        Ok(None)
    }

    /// Non-waiting check: resolved and its first match visible.
    pub async fn is_visible(&self, driver: &dyn PageDriver) -> AccesoResult<bool> {
        match self.resolve(driver).await? {
            Some(selector) => driver.is_visible(selector).await,
            None => Ok(false),
        }
    }

    /// Wait until the chain resolves to a visible element, bounded by the
    /// chain's timeout. Returns the winning candidate.
    pub async fn wait_for_visible(
        &self,
        driver: &dyn PageDriver,
        action: &str,
    ) -> AccesoResult<Selector> {
        self.wait_for_visible_within(driver, action, self.options.wait_options())
            .await
    }

    /// [`Self::wait_for_visible`] with an explicit bound.
    pub async fn wait_for_visible_within(
        &self,
        driver: &dyn PageDriver,
        action: &str,
        options: WaitOptions,
    ) -> AccesoResult<Selector> {
        let (selector, _) = poll_for(action, &self.name, options, || async move {
            match self.resolve(driver).await? {
                Some(selector) if driver.is_visible(selector).await? => Ok(Some(selector.clone())),
                _ => Ok(None),
            }
        })
        .await?;
        Ok(selector)
    }

    /// Wait for visibility, then replace the field's value.
    pub async fn fill(&self, driver: &dyn PageDriver, text: &str) -> AccesoResult<()> {
        let selector = self.wait_for_visible(driver, "fill").await?;
        tracing::debug!(locator = %self.name, %selector, "fill");
        driver.fill(&selector, text).await
    }

    /// Wait for visibility, then empty the field.
    pub async fn clear(&self, driver: &dyn PageDriver) -> AccesoResult<()> {
        let selector = self.wait_for_visible(driver, "clear").await?;
        tracing::debug!(locator = %self.name, %selector, "clear");
        driver.fill(&selector, "").await
    }

    /// Wait for visibility, then click.
    pub async fn click(&self, driver: &dyn PageDriver) -> AccesoResult<()> {
        let selector = self.wait_for_visible(driver, "click").await?;
        tracing::debug!(locator = %self.name, %selector, "click");
        driver.click(&selector).await
    }

    /// Wait for visibility, then tick the checkbox.
    pub async fn check(&self, driver: &dyn PageDriver) -> AccesoResult<()> {
        let selector = self.wait_for_visible(driver, "check").await?;
        tracing::debug!(locator = %self.name, %selector, "check");
        driver.check(&selector).await
    }

    /// Wait for visibility, then read the text content.
    pub async fn text_content(&self, driver: &dyn PageDriver) -> AccesoResult<String> {
        let selector = self.wait_for_visible(driver, "read").await?;
        Ok(driver.text_content(&selector).await?.unwrap_or_default())
    }
}

// =============================================================================
// LOCATOR SET
// =============================================================================

/// Named chains for one page
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LocatorSet {
    chains: Vec<LocatorChain>,
}

impl LocatorSet {
    /// Empty set
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a chain under its own name, replacing any previous one.
    #[must_use]
    pub fn with(mut self, chain: LocatorChain) -> Self {
        self.chains.retain(|c| c.name != chain.name);
        self.chains.push(chain);
        self
    }

    /// Apply one timeout to every chain.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        for chain in &mut self.chains {
            chain.options.timeout = timeout;
        }
        self
    }

    /// Chain registered as `name`
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&LocatorChain> {
        self.chains.iter().find(|c| c.name == name)
    }

    /// Chain registered as `name`, or `UnknownLocator`.
    pub fn require(&self, page: &str, name: &str) -> AccesoResult<&LocatorChain> {
        self.get(name).ok_or_else(|| AccesoError::UnknownLocator {
            page: page.to_string(),
            name: name.to_string(),
        })
    }

    /// Registered names in registration order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.chains.iter().map(|c| c.name.as_str())
    }

    /// Number of chains
    #[must_use]
    pub fn len(&self) -> usize {
        self.chains.len()
    }

    /// True when no chain is registered
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.chains.is_empty()
    }
}
