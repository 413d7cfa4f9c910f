//! Wait Mechanisms
//!
//! Playwright-compatible bounded waits. Every suspension point in a page
//! action goes through [`poll_until`], so exceeding a bound always surfaces as
//! [`AccesoError::Timeout`] naming what was awaited.
//!
//! Time is read from `tokio::time`, so tests can run with a paused clock.

use crate::driver::PageDriver;
use crate::result::{AccesoError, AccesoResult};
use regex::Regex;
use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;

// =============================================================================
// CONSTANTS
// =============================================================================

/// Default polling interval (50ms)
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 50;

/// Network idle threshold (500ms without requests)
pub const NETWORK_IDLE_THRESHOLD_MS: u64 = 500;

// =============================================================================
// LOAD STATE
// =============================================================================

/// Page load states (Playwright parity)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum LoadState {
    /// Wait for the `load` event to fire
    #[default]
    Load,
    /// Wait for `DOMContentLoaded` event
    DomContentLoaded,
    /// Wait for network to be idle (no requests for 500ms)
    NetworkIdle,
}

impl LoadState {
    /// Get the JavaScript event name for this load state
    #[must_use]
    pub const fn event_name(&self) -> &'static str {
        match self {
            Self::Load => "load",
            Self::DomContentLoaded => "DOMContentLoaded",
            Self::NetworkIdle => "networkidle",
        }
    }
}

impl std::fmt::Display for LoadState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.event_name())
    }
}

// =============================================================================
// WAIT OPTIONS
// =============================================================================

/// Options for wait operations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaitOptions {
    /// Timeout in milliseconds
    pub timeout_ms: u64,
    /// Polling interval in milliseconds
    pub poll_interval_ms: u64,
}

impl Default for WaitOptions {
    fn default() -> Self {
        Self {
            timeout_ms: crate::config::DEFAULT_ACTION_TIMEOUT_MS,
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
        }
    }
}

impl WaitOptions {
    /// Options bounded by `timeout_ms` with the default poll interval
    #[must_use]
    pub const fn with_timeout(timeout_ms: u64) -> Self {
        Self {
            timeout_ms,
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
        }
    }

    /// Set polling interval in milliseconds
    #[must_use]
    pub const fn poll_every(mut self, poll_interval_ms: u64) -> Self {
        self.poll_interval_ms = poll_interval_ms;
        self
    }

    /// Get timeout as Duration
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Get poll interval as Duration
    #[must_use]
    pub const fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

// =============================================================================
// URL PATTERNS
// =============================================================================

/// Pattern for matching the page URL
#[derive(Debug, Clone)]
pub enum UrlPattern {
    /// Exact URL match
    Exact(String),
    /// Prefix match
    Prefix(String),
    /// Contains substring
    Contains(String),
    /// Contains any of the substrings
    AnyOf(Vec<String>),
    /// Regex match
    Regex(Regex),
    /// Match any URL
    Any,
}

impl UrlPattern {
    /// Compile a regex pattern.
    pub fn regex(pattern: &str) -> AccesoResult<Self> {
        Regex::new(pattern)
            .map(Self::Regex)
            .map_err(|e| AccesoError::Config {
                message: format!("invalid URL pattern {pattern:?}: {e}"),
            })
    }

    /// URL contains any of `needles`.
    pub fn any_of<I, S>(needles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::AnyOf(needles.into_iter().map(Into::into).collect())
    }

    /// Check if a URL matches this pattern
    #[must_use]
    pub fn matches(&self, url: &str) -> bool {
        match self {
            Self::Exact(pattern) => url == pattern,
            Self::Prefix(pattern) => url.starts_with(pattern.as_str()),
            Self::Contains(pattern) => url.contains(pattern.as_str()),
            Self::AnyOf(needles) => needles.iter().any(|n| url.contains(n.as_str())),
            Self::Regex(re) => re.is_match(url),
            Self::Any => true,
        }
    }
}

impl std::fmt::Display for UrlPattern {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Exact(p) => write!(f, "URL == {p}"),
            Self::Prefix(p) => write!(f, "URL starting with {p}"),
            Self::Contains(p) => write!(f, "URL containing {p}"),
            Self::AnyOf(needles) => write!(f, "URL matching {}", needles.join("|")),
            Self::Regex(re) => write!(f, "URL matching /{}/", re.as_str()),
            Self::Any => f.write_str("any URL"),
        }
    }
}

// =============================================================================
// WAIT RESULT
// =============================================================================

/// Result of a successful wait
#[derive(Debug, Clone)]
pub struct WaitResult {
    /// Time spent waiting
    pub elapsed: Duration,
    /// Number of attempts made
    pub polls: u32,
}

// =============================================================================
// POLLING
// =============================================================================

/// Poll `check` until it yields a value or the bound is exceeded.
///
/// The check always runs at least once. A check error aborts the wait and is
/// returned as-is. On timeout the error names `action` and `target`.
pub async fn poll_for<T, F, Fut>(
    action: &str,
    target: &str,
    options: WaitOptions,
    mut check: F,
) -> AccesoResult<(T, WaitResult)>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = AccesoResult<Option<T>>>,
{
    let start = Instant::now();
    let deadline = start + options.timeout();
    let mut polls = 0;

    loop {
        polls += 1;
        if let Some(value) = check().await? {
            let result = WaitResult {
                elapsed: start.elapsed(),
                polls,
            };
            return Ok((value, result));
        }

        let now = Instant::now();
        if now >= deadline {
            tracing::debug!(action, target, timeout_ms = options.timeout_ms, polls, "wait timed out");
            return Err(AccesoError::timeout(action, target, options.timeout_ms));
        }
        tokio::time::sleep(options.poll_interval().min(deadline - now)).await;
    }
}

/// Poll `check` until it reports `true` or the bound is exceeded.
pub async fn poll_until<F, Fut>(
    action: &str,
    target: &str,
    options: WaitOptions,
    mut check: F,
) -> AccesoResult<WaitResult>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = AccesoResult<bool>>,
{
    let ((), result) = poll_for(action, target, options, || {
        let ready = check();
        async move { Ok(ready.await?.then_some(())) }
    })
    .await?;
    Ok(result)
}

/// Wait until the page URL matches `pattern`.
pub async fn wait_for_url(
    driver: &dyn PageDriver,
    pattern: &UrlPattern,
    options: WaitOptions,
) -> AccesoResult<WaitResult> {
    let target = pattern.to_string();
    poll_until("reach", &target, options, || async move {
        let url = driver.current_url().await?;
        Ok(pattern.matches(&url))
    })
    .await
}

/// Wait until the page reaches `state`.
pub async fn wait_for_load_state(
    driver: &dyn PageDriver,
    state: LoadState,
    options: WaitOptions,
) -> AccesoResult<WaitResult> {
    let target = format!("load state {state}");
    poll_until("reach", &target, options, || driver.load_state_reached(state)).await
}

// =============================================================================
// TESTS
// =============================================================================
