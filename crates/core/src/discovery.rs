//! Item discovery on the target page.

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::identity::{IdentityExtractor, ItemIdentity};
use crate::renderer::{ElementHandle, PageRenderer, RenderError};

/// An item found on the page this run. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveredItem {
    pub identity: ItemIdentity,
    pub element: ElementHandle,
}

/// An element that matched the selector but yielded no identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedElement {
    /// Position in page order.
    pub index: usize,
    pub reason: String,
}

/// Result of scanning the target page.
#[derive(Debug, Clone, Default)]
pub struct Discovery {
    /// Identified items in page order.
    pub items: Vec<DiscoveredItem>,
    pub skipped: Vec<SkippedElement>,
}

/// Run-fatal discovery failures.
#[derive(Debug, Error)]
pub enum DiscoveryError {
    #[error("target page {url} unavailable: {source}")]
    PageUnavailable {
        url: String,
        #[source]
        source: RenderError,
    },

    #[error("failed to locate items matching {selector:?}: {source}")]
    ItemQuery {
        selector: String,
        #[source]
        source: RenderError,
    },
}

/// Open `url` and identify every element matching `selector`, in page order.
///
/// Elements without a usable identity are skipped and reported, not fatal.
pub async fn discover(
    renderer: &dyn PageRenderer,
    url: &str,
    selector: &str,
    extractor: &IdentityExtractor,
) -> Result<Discovery, DiscoveryError> {
    renderer
        .open(url)
        .await
        .map_err(|source| DiscoveryError::PageUnavailable {
            url: url.to_string(),
            source,
        })?;

    let elements = renderer
        .find_items(selector)
        .await
        .map_err(|source| DiscoveryError::ItemQuery {
            selector: selector.to_string(),
            source,
        })?;

    let mut discovery = Discovery::default();

    for element in elements {
        let raw = match renderer.attribute(element, extractor.attribute()).await {
            Ok(raw) => raw,
            Err(source) if source.is_fatal() => {
                return Err(DiscoveryError::ItemQuery {
                    selector: selector.to_string(),
                    source,
                })
            }
            Err(e) => {
                warn!(index = element.index(), error = %e, "Could not read identity attribute");
                discovery.skipped.push(SkippedElement {
                    index: element.index(),
                    reason: e.to_string(),
                });
                continue;
            }
        };

        match extractor.extract(raw.as_deref()) {
            Ok(identity) => {
                debug!(index = element.index(), identity = %identity, "Item discovered");
                discovery.items.push(DiscoveredItem { identity, element });
            }
            Err(e) => {
                warn!(index = element.index(), error = %e, "Skipping element without identity");
                discovery.skipped.push(SkippedElement {
                    index: element.index(),
                    reason: e.to_string(),
                });
            }
        }
    }

    info!(
        found = discovery.items.len(),
        skipped = discovery.skipped.len(),
        "Discovery finished"
    );
    Ok(discovery)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockRenderer;

    fn extractor() -> IdentityExtractor {
        IdentityExtractor::new("id", r"^item\d+$").unwrap()
    }

    #[tokio::test]
    async fn test_discover_in_page_order() {
        let renderer = MockRenderer::with_items(&["item003", "item001", "item002"]);
        let discovery = discover(&renderer, "http://x/sales.html", "[id]", &extractor())
            .await
            .unwrap();

        let ids: Vec<&str> = discovery.items.iter().map(|i| i.identity.as_str()).collect();
        assert_eq!(ids, vec!["item003", "item001", "item002"]);
        assert_eq!(discovery.items[1].element.index(), 1);
        assert_eq!(renderer.opened_urls().await, vec!["http://x/sales.html"]);
    }

    #[tokio::test]
    async fn test_elements_without_identity_are_skipped() {
        let renderer = MockRenderer::new();
        renderer.push_item(Some("item1")).await;
        renderer.push_item(None).await;
        renderer.push_item(Some("banner")).await;
        renderer.push_item(Some("item2")).await;

        let discovery = discover(&renderer, "http://x", "[id]", &extractor())
            .await
            .unwrap();

        assert_eq!(discovery.items.len(), 2);
        let skipped: Vec<usize> = discovery.skipped.iter().map(|s| s.index).collect();
        assert_eq!(skipped, vec![1, 2]);
    }

    #[tokio::test]
    async fn test_unreachable_page_is_fatal() {
        let renderer = MockRenderer::with_items(&["item1"]);
        renderer
            .fail_open(RenderError::Timeout {
                operation: "navigation".to_string(),
                timeout_ms: 30_000,
            })
            .await;

        let err = discover(&renderer, "http://x", "[id]", &extractor())
            .await
            .unwrap_err();
        assert!(matches!(err, DiscoveryError::PageUnavailable { .. }));
    }

    #[tokio::test]
    async fn test_empty_page_is_not_an_error() {
        let renderer = MockRenderer::new();
        let discovery = discover(&renderer, "http://x", "[id]", &extractor())
            .await
            .unwrap();
        assert!(discovery.items.is_empty());
        assert!(discovery.skipped.is_empty());
    }
}
