//! Chromium-based renderer using chromiumoxide.

use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::page::CaptureScreenshotFormat;
use chromiumoxide::element::Element;
use chromiumoxide::error::CdpError;
use chromiumoxide::handler::viewport::Viewport;
use chromiumoxide::page::Page;
use futures::StreamExt;
use std::future::Future;
use std::time::Duration;
use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinHandle;
use tokio::time::{sleep_until, timeout, Instant};
use tracing::{debug, info, warn};

use crate::config::RendererConfig;

use super::{ElementHandle, PageRenderer, RenderError};

/// Interval between DOM polls while waiting for items to appear.
const ITEM_POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Headless Chromium renderer.
pub struct ChromiumRenderer {
    config: RendererConfig,
    browser: Mutex<Browser>,
    handler_task: JoinHandle<()>,
    page: RwLock<Option<Page>>,
    elements: RwLock<Vec<Element>>,
}

impl ChromiumRenderer {
    /// Launch a Chromium instance configured from `config`.
    pub async fn launch(config: RendererConfig) -> Result<Self, RenderError> {
        let mut builder = BrowserConfig::builder()
            .window_size(config.viewport_width, config.viewport_height)
            .viewport(Viewport {
                width: config.viewport_width,
                height: config.viewport_height,
                ..Viewport::default()
            })
            .request_timeout(Duration::from_millis(config.navigation_timeout_ms))
            .arg("--disable-gpu")
            .arg("--no-sandbox")
            .arg("--disable-dev-shm-usage")
            .arg("--disable-extensions");

        if !config.headless {
            builder = builder.with_head();
        }
        if let Some(path) = &config.chrome_executable {
            builder = builder.chrome_executable(path);
        }

        let browser_config = builder.build().map_err(RenderError::Launch)?;

        let (browser, mut handler) = Browser::launch(browser_config)
            .await
            .map_err(|e| RenderError::Launch(e.to_string()))?;

        let handler_task = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    debug!(error = %e, "Browser handler event error");
                }
            }
        });

        info!(headless = config.headless, "Chromium launched");

        Ok(Self {
            config,
            browser: Mutex::new(browser),
            handler_task,
            page: RwLock::new(None),
            elements: RwLock::new(Vec::new()),
        })
    }

    async fn current_page(&self) -> Result<Page, RenderError> {
        self.page.read().await.clone().ok_or(RenderError::NoPage)
    }

    async fn query(page: &Page, selector: &str) -> Result<Vec<Element>, RenderError> {
        page.find_elements(selector)
            .await
            .map_err(|e| classify(e, RenderError::Query))
    }
}

/// Re-run `query` every `interval` until it returns at least one element.
///
/// Fails with [`RenderError::Timeout`] once `wait` has passed with nothing found.
async fn poll_until_found<T, F, Fut>(
    mut query: F,
    wait: Duration,
    interval: Duration,
    selector: &str,
) -> Result<Vec<T>, RenderError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<Vec<T>, RenderError>>,
{
    let deadline = Instant::now() + wait;
    loop {
        let found = query().await?;
        if !found.is_empty() {
            return Ok(found);
        }
        if Instant::now() >= deadline {
            warn!(selector, "No items appeared before the wait deadline");
            return Err(RenderError::Timeout {
                operation: format!("wait for {selector}"),
                timeout_ms: wait.as_millis() as u64,
            });
        }
        sleep_until((Instant::now() + interval).min(deadline)).await;
    }
}

/// Map a CDP error, treating transport failures as fatal.
fn classify(err: CdpError, otherwise: impl FnOnce(String) -> RenderError) -> RenderError {
    match err {
        CdpError::NoResponse | CdpError::Ws(_) | CdpError::ChannelSendError(_) => {
            RenderError::Disconnected(err.to_string())
        }
        other => otherwise(other.to_string()),
    }
}

#[async_trait]
impl PageRenderer for ChromiumRenderer {
    fn name(&self) -> &str {
        "chromium"
    }

    async fn open(&self, url: &str) -> Result<(), RenderError> {
        let timeout_ms = self.config.navigation_timeout_ms;
        let navigation = async {
            let browser = self.browser.lock().await;
            let page = browser.new_page(url).await?;
            page.wait_for_navigation().await?;
            Ok::<Page, CdpError>(page)
        };

        let page = match timeout(Duration::from_millis(timeout_ms), navigation).await {
            Ok(Ok(page)) => page,
            Ok(Err(e)) => {
                return Err(classify(e, |reason| RenderError::Navigation {
                    url: url.to_string(),
                    reason,
                }))
            }
            Err(_) => {
                return Err(RenderError::Timeout {
                    operation: format!("navigation to {}", url),
                    timeout_ms,
                })
            }
        };

        if let Some(previous) = self.page.write().await.replace(page) {
            let _ = previous.close().await;
        }
        self.elements.write().await.clear();

        info!(url, "Page opened");
        Ok(())
    }

    async fn find_items(&self, selector: &str) -> Result<Vec<ElementHandle>, RenderError> {
        let page = self.current_page().await?;
        let page_ref = &page;

        // Items are often injected by script after load; poll until one shows up.
        let mut found = poll_until_found(
            move || Self::query(page_ref, selector),
            Duration::from_millis(self.config.wait_for_items_ms),
            ITEM_POLL_INTERVAL,
            selector,
        )
        .await?;

        if self.config.settle_ms > 0 {
            tokio::time::sleep(Duration::from_millis(self.config.settle_ms)).await;
            found = Self::query(&page, selector).await?;
        }

        let handles = (0..found.len()).map(ElementHandle::new).collect();
        debug!(selector, count = found.len(), "Items located");
        *self.elements.write().await = found;
        Ok(handles)
    }

    async fn attribute(
        &self,
        element: ElementHandle,
        name: &str,
    ) -> Result<Option<String>, RenderError> {
        let elements = self.elements.read().await;
        let el = elements
            .get(element.index())
            .ok_or(RenderError::ElementNotFound(element.index()))?;
        el.attribute(name)
            .await
            .map_err(|e| classify(e, RenderError::Query))
    }

    async fn screenshot(&self, element: ElementHandle) -> Result<Vec<u8>, RenderError> {
        let elements = self.elements.read().await;
        let el = elements
            .get(element.index())
            .ok_or(RenderError::ElementNotFound(element.index()))?;
        el.scroll_into_view()
            .await
            .map_err(|e| classify(e, RenderError::Screenshot))?;
        el.screenshot(CaptureScreenshotFormat::Png)
            .await
            .map_err(|e| classify(e, RenderError::Screenshot))
    }

    async fn close(&self) -> Result<(), RenderError> {
        self.elements.write().await.clear();
        if let Some(page) = self.page.write().await.take() {
            let _ = page.close().await;
        }

        let mut browser = self.browser.lock().await;
        let result = browser.close().await;
        let _ = browser.wait().await;
        self.handler_task.abort();

        result
            .map(|_| ())
            .map_err(|e| RenderError::Disconnected(e.to_string()))
    }
}

impl Drop for ChromiumRenderer {
    fn drop(&mut self) {
        self.handler_task.abort();
    }
}
