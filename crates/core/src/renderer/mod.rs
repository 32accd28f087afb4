//! Page rendering collaborator.
//!
//! The pipeline needs exactly two things from a browser: the ordered list of
//! item elements on the target page, and a raster screenshot of one element.
//! `PageRenderer` abstracts over the engine (Chromium via chromiumoxide in
//! production, `testing::MockRenderer` in tests).

mod chromium;
mod error;

pub use chromium::ChromiumRenderer;
pub use error::RenderError;

use async_trait::async_trait;

/// Opaque reference to an element found by [`PageRenderer::find_items`].
///
/// Only valid for the page that produced it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ElementHandle {
    index: usize,
}

impl ElementHandle {
    pub fn new(index: usize) -> Self {
        Self { index }
    }

    /// Position of the element in page order.
    pub fn index(&self) -> usize {
        self.index
    }
}

/// A browser engine that can open the target page and capture its items.
#[async_trait]
pub trait PageRenderer: Send + Sync {
    /// Returns the name of this renderer implementation.
    fn name(&self) -> &str;

    /// Navigate to `url`, replacing any previously opened page.
    async fn open(&self, url: &str) -> Result<(), RenderError>;

    /// All elements matching `selector`, in document order.
    ///
    /// Implementations may wait for matches to appear; giving up yields
    /// [`RenderError::Timeout`] rather than an empty list.
    async fn find_items(&self, selector: &str) -> Result<Vec<ElementHandle>, RenderError>;

    /// Read one attribute of an element.
    async fn attribute(
        &self,
        element: ElementHandle,
        name: &str,
    ) -> Result<Option<String>, RenderError>;

    /// Lossless (PNG) screenshot of a single element.
    async fn screenshot(&self, element: ElementHandle) -> Result<Vec<u8>, RenderError>;

    /// Release the page and the browser.
    async fn close(&self) -> Result<(), RenderError>;
}
