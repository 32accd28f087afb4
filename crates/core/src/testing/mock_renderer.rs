//! Mock renderer for testing.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tokio::time::Instant;

use crate::renderer::{ElementHandle, PageRenderer, RenderError};

/// One fake element on the mock page.
#[derive(Debug, Clone, Default)]
struct MockElement {
    attributes: HashMap<String, String>,
}

/// Mock implementation of the PageRenderer trait.
///
/// Provides controllable behavior for testing:
/// - A page of elements with arbitrary `id` attributes (or none)
/// - One-shot failures for `open`, `find_items`, `attribute` and `screenshot`
/// - Recorded navigation and screenshot start times
///
/// # Example
///
/// ```rust,ignore
/// use snapshelf_core::testing::MockRenderer;
///
/// let renderer = MockRenderer::with_items(&["item1", "item2"]);
/// renderer.fail_screenshot(1, RenderError::Screenshot("detached".into())).await;
///
/// // ... run a capture ...
///
/// assert_eq!(renderer.screenshot_instants().await.len(), 2);
/// ```
#[derive(Debug, Default)]
pub struct MockRenderer {
    elements: Arc<RwLock<Vec<MockElement>>>,
    opened: Arc<RwLock<Vec<String>>>,
    closed: Arc<RwLock<bool>>,
    open_error: Arc<RwLock<Option<RenderError>>>,
    find_error: Arc<RwLock<Option<RenderError>>>,
    attribute_errors: Arc<RwLock<HashMap<usize, RenderError>>>,
    screenshot_errors: Arc<RwLock<HashMap<usize, RenderError>>>,
    empty_screenshots: Arc<RwLock<Vec<usize>>>,
    screenshot_starts: Arc<RwLock<Vec<Instant>>>,
}

impl MockRenderer {
    /// Create a renderer whose page has no items.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a renderer whose page lists elements with these `id`s, in order.
    pub fn with_items(ids: &[&str]) -> Self {
        let elements = ids
            .iter()
            .map(|id| MockElement {
                attributes: HashMap::from([("id".to_string(), id.to_string())]),
            })
            .collect();
        Self {
            elements: Arc::new(RwLock::new(elements)),
            ..Self::default()
        }
    }

    /// Append an element; `None` creates one without an `id` attribute.
    pub async fn push_item(&self, id: Option<&str>) {
        let mut element = MockElement::default();
        if let Some(id) = id {
            element.attributes.insert("id".to_string(), id.to_string());
        }
        self.elements.write().await.push(element);
    }

    /// Replace the page contents, e.g. between two runs.
    pub async fn set_items(&self, ids: &[&str]) {
        let mut elements = self.elements.write().await;
        elements.clear();
        for id in ids {
            elements.push(MockElement {
                attributes: HashMap::from([("id".to_string(), id.to_string())]),
            });
        }
    }

    /// The next `open` fails with this error.
    pub async fn fail_open(&self, error: RenderError) {
        *self.open_error.write().await = Some(error);
    }

    /// The next `find_items` fails with this error.
    pub async fn fail_find_items(&self, error: RenderError) {
        *self.find_error.write().await = Some(error);
    }

    /// The next attribute read of element `index` fails with this error.
    pub async fn fail_attribute(&self, index: usize, error: RenderError) {
        self.attribute_errors.write().await.insert(index, error);
    }

    /// The next screenshot of element `index` fails with this error.
    pub async fn fail_screenshot(&self, index: usize, error: RenderError) {
        self.screenshot_errors.write().await.insert(index, error);
    }

    /// Screenshots of element `index` come back with no bytes.
    pub async fn return_empty_screenshot(&self, index: usize) {
        self.empty_screenshots.write().await.push(index);
    }

    /// URLs passed to `open`, in call order.
    pub async fn opened_urls(&self) -> Vec<String> {
        self.opened.read().await.clone()
    }

    /// When each screenshot call started, in call order.
    pub async fn screenshot_instants(&self) -> Vec<Instant> {
        self.screenshot_starts.read().await.clone()
    }

    /// Whether `close` has been called.
    pub async fn is_closed(&self) -> bool {
        *self.closed.read().await
    }

    async fn check_open(&self) -> Result<(), RenderError> {
        if self.opened.read().await.is_empty() {
            return Err(RenderError::NoPage);
        }
        Ok(())
    }
}

#[async_trait]
impl PageRenderer for MockRenderer {
    fn name(&self) -> &str {
        "mock"
    }

    async fn open(&self, url: &str) -> Result<(), RenderError> {
        if let Some(error) = self.open_error.write().await.take() {
            return Err(error);
        }
        *self.closed.write().await = false;
        self.opened.write().await.push(url.to_string());
        Ok(())
    }

    async fn find_items(&self, _selector: &str) -> Result<Vec<ElementHandle>, RenderError> {
        if let Some(error) = self.find_error.write().await.take() {
            return Err(error);
        }
        self.check_open().await?;
        let count = self.elements.read().await.len();
        Ok((0..count).map(ElementHandle::new).collect())
    }

    async fn attribute(
        &self,
        element: ElementHandle,
        name: &str,
    ) -> Result<Option<String>, RenderError> {
        if let Some(error) = self.attribute_errors.write().await.remove(&element.index()) {
            return Err(error);
        }
        let elements = self.elements.read().await;
        let found = elements
            .get(element.index())
            .ok_or(RenderError::ElementNotFound(element.index()))?;
        Ok(found.attributes.get(name).cloned())
    }

    async fn screenshot(&self, element: ElementHandle) -> Result<Vec<u8>, RenderError> {
        self.screenshot_starts.write().await.push(Instant::now());

        if let Some(error) = self.screenshot_errors.write().await.remove(&element.index()) {
            return Err(error);
        }
        if self.empty_screenshots.read().await.contains(&element.index()) {
            return Ok(Vec::new());
        }

        let elements = self.elements.read().await;
        let found = elements
            .get(element.index())
            .ok_or(RenderError::ElementNotFound(element.index()))?;
        let label = found
            .attributes
            .get("id")
            .cloned()
            .unwrap_or_else(|| format!("element-{}", element.index()));

        let mut png = b"\x89PNG\r\n\x1a\n".to_vec();
        png.extend_from_slice(label.as_bytes());
        Ok(png)
    }

    async fn close(&self) -> Result<(), RenderError> {
        *self.closed.write().await = true;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_find_items_requires_open_page() {
        let renderer = MockRenderer::with_items(&["item1"]);
        assert!(matches!(
            renderer.find_items("*").await,
            Err(RenderError::NoPage)
        ));

        renderer.open("http://x").await.unwrap();
        assert_eq!(renderer.find_items("*").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_injected_failure_is_one_shot() {
        let renderer = MockRenderer::with_items(&["item1"]);
        renderer
            .fail_screenshot(0, RenderError::Screenshot("boom".to_string()))
            .await;

        assert!(renderer.screenshot(ElementHandle::new(0)).await.is_err());
        let png = renderer.screenshot(ElementHandle::new(0)).await.unwrap();
        assert!(png.starts_with(b"\x89PNG"));
        assert_eq!(renderer.screenshot_instants().await.len(), 2);
    }
}
