//! Real browser control over CDP.
//!
//! Every [`PageDriver`] operation is a single `Runtime.evaluate` built from
//! [`Selector::to_query`], so the browser and [`MockDriver`](crate::driver::MockDriver)
//! answer the same questions.

use crate::driver::{DriverConfig, PageDriver};
use crate::locator::Selector;
use crate::result::{AccesoError, AccesoResult};
use crate::wait::{LoadState, NETWORK_IDLE_THRESHOLD_MS};
use async_trait::async_trait;
use chromiumoxide::browser::{Browser as CdpBrowser, BrowserConfig as CdpConfig};
use chromiumoxide::cdp::browser_protocol::emulation::SetUserAgentOverrideParams;
use chromiumoxide::page::Page as CdpPage;
use futures::StreamExt;
use serde::de::DeserializeOwned;
use tokio::sync::Mutex;

/// One browser with one page, driven over CDP
#[derive(Debug)]
pub struct ChromiumDriver {
    config: DriverConfig,
    browser: Mutex<CdpBrowser>,
    page: CdpPage,
    handle: tokio::task::JoinHandle<()>,
}

impl ChromiumDriver {
    /// Launch chromium and open a blank page
    pub async fn launch(config: DriverConfig) -> AccesoResult<Self> {
        let mut builder = CdpConfig::builder().window_size(config.viewport_width, config.viewport_height);

        if !config.headless {
            builder = builder.with_head();
        }

        if !config.sandbox {
            builder = builder.no_sandbox();
        }

        if let Some(ref path) = config.chromium_path {
            builder = builder.chrome_executable(path);
        }

        let cdp_config = builder
            .build()
            .map_err(|message| AccesoError::BrowserLaunch { message })?;

        let (browser, mut handler) =
            CdpBrowser::launch(cdp_config)
                .await
                .map_err(|e| AccesoError::BrowserLaunch {
                    message: e.to_string(),
                })?;

        let handle = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if event.is_err() {
                    break;
                }
            }
        });

        let page = browser
            .new_page("about:blank")
            .await
            .map_err(|e| AccesoError::BrowserLaunch {
                message: e.to_string(),
            })?;

        if let Some(ref agent) = config.user_agent {
            page.set_user_agent(SetUserAgentOverrideParams::new(agent.clone()))
                .await
                .map_err(|e| AccesoError::driver(e.to_string()))?;
        }

        tracing::info!(headless = config.headless, "browser launched");
        Ok(Self {
            config,
            browser: Mutex::new(browser),
            page,
            handle,
        })
    }

    /// Configuration the browser was launched with
    #[must_use]
    pub const fn config(&self) -> &DriverConfig {
        &self.config
    }

    async fn eval<T: DeserializeOwned>(&self, expression: String) -> AccesoResult<T> {
        let result = self
            .page
            .evaluate(expression)
            .await
            .map_err(|e| AccesoError::driver(e.to_string()))?;
        result
            .into_value()
            .map_err(|e| AccesoError::driver(e.to_string()))
    }

    /// Run `body` against the first match, bound as `el`. Evaluates to
    /// `false` when nothing matches.
    async fn with_element(&self, selector: &Selector, body: &str) -> AccesoResult<()> {
        let script = format!(
            "(() => {{ const el = {}; if (!el) return false; {body}; return true; }})()",
            selector.to_query()
        );
        if self.eval::<bool>(script).await? {
            Ok(())
        } else {
            Err(AccesoError::driver(format!("no element matches {selector}")))
        }
    }
}

fn set_value_script(text: &str) -> String {
    let literal = serde_json::Value::String(text.to_owned());
    format!(
        "el.focus(); el.value = {literal}; \
         el.dispatchEvent(new Event('input', {{ bubbles: true }})); \
         el.dispatchEvent(new Event('change', {{ bubbles: true }}))"
    )
}

fn load_state_script(state: LoadState) -> String {
    match state {
        LoadState::Load => "document.readyState === 'complete'".to_string(),
        LoadState::DomContentLoaded => "document.readyState !== 'loading'".to_string(),
        LoadState::NetworkIdle => format!(
            "document.readyState === 'complete' && \
             performance.now() - Math.max(0, ...performance.getEntriesByType('resource')\
             .map(e => e.responseEnd)) >= {NETWORK_IDLE_THRESHOLD_MS}"
        ),
    }
}

#[async_trait]
impl PageDriver for ChromiumDriver {
    async fn navigate(&self, url: &str) -> AccesoResult<()> {
        tracing::debug!(url, "navigate");
        self.page
            .goto(url)
            .await
            .map_err(|e| AccesoError::Navigation {
                url: url.to_string(),
                message: e.to_string(),
            })?;
        Ok(())
    }

    async fn current_url(&self) -> AccesoResult<String> {
        let url = self
            .page
            .url()
            .await
            .map_err(|e| AccesoError::driver(e.to_string()))?;
        Ok(url.unwrap_or_default())
    }

    async fn reload(&self) -> AccesoResult<()> {
        self.page
            .reload()
            .await
            .map_err(|e| AccesoError::driver(e.to_string()))?;
        Ok(())
    }

    async fn load_state_reached(&self, state: LoadState) -> AccesoResult<bool> {
        self.eval(load_state_script(state)).await
    }

    async fn count(&self, selector: &Selector) -> AccesoResult<usize> {
        self.eval(selector.to_count_query()).await
    }

    async fn is_visible(&self, selector: &Selector) -> AccesoResult<bool> {
        self.eval(format!(
            "(el => !!el && !!(el.offsetWidth || el.offsetHeight || el.getClientRects().length) \
             && getComputedStyle(el).visibility !== 'hidden')({})",
            selector.to_query()
        ))
        .await
    }

    async fn fill(&self, selector: &Selector, text: &str) -> AccesoResult<()> {
        self.with_element(selector, &set_value_script(text)).await
    }

    async fn click(&self, selector: &Selector) -> AccesoResult<()> {
        self.with_element(selector, "el.click()").await
    }

    async fn check(&self, selector: &Selector) -> AccesoResult<()> {
        self.with_element(selector, "if (!el.checked) el.click()").await
    }

    async fn text_content(&self, selector: &Selector) -> AccesoResult<Option<String>> {
        let (found, text): (bool, String) = self
            .eval(format!(
                "(el => el ? [true, el.textContent || ''] : [false, ''])({})",
                selector.to_query()
            ))
            .await?;
        Ok(found.then_some(text))
    }

    async fn close(&self) -> AccesoResult<()> {
        let mut browser = self.browser.lock().await;
        browser
            .close()
            .await
            .map_err(|e| AccesoError::driver(e.to_string()))?;
        self.handle.abort();
        Ok(())
    }
}
