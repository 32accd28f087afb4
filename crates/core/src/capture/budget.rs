use std::collections::HashSet;

use tracing::{debug, info};

use crate::discovery::DiscoveredItem;
use crate::identity::ItemIdentity;

/// Outcome of selecting this run's capture candidates.
#[derive(Debug, Clone, Default)]
pub struct BudgetDecision {
    /// Items to capture, in page order. Never longer than the cap.
    pub eligible: Vec<DiscoveredItem>,
    /// Examined items whose identity is already cataloged.
    pub already_cataloged: usize,
    /// Examined items repeating an identity seen earlier on the page.
    pub duplicates_in_page: usize,
    /// Items never examined because the cap was reached first.
    pub deferred: usize,
}

/// Per-run hard cap on new captures.
///
/// Once the cap is reached no further items are examined; they become
/// candidates on a later run. Total catalog size is not bounded here.
#[derive(Debug, Clone, Copy)]
pub struct CaptureBudget {
    max_items_per_run: usize,
}

impl CaptureBudget {
    pub fn new(max_items_per_run: usize) -> Self {
        Self { max_items_per_run }
    }

    pub fn max_items_per_run(&self) -> usize {
        self.max_items_per_run
    }

    /// Pick uncataloged, first-occurrence items in page order until the cap.
    pub fn select<I>(&self, existing: &HashSet<ItemIdentity>, discovered: I) -> BudgetDecision
    where
        I: IntoIterator<Item = DiscoveredItem>,
    {
        let mut decision = BudgetDecision::default();
        let mut seen: HashSet<ItemIdentity> = HashSet::new();
        let mut items = discovered.into_iter();

        while decision.eligible.len() < self.max_items_per_run {
            let Some(item) = items.next() else {
                break;
            };

            if existing.contains(&item.identity) {
                decision.already_cataloged += 1;
                continue;
            }
            if !seen.insert(item.identity.clone()) {
                debug!(identity = %item.identity, "Duplicate identity on page");
                decision.duplicates_in_page += 1;
                continue;
            }
            decision.eligible.push(item);
        }

        decision.deferred = items.count();

        info!(
            eligible = decision.eligible.len(),
            already_cataloged = decision.already_cataloged,
            duplicates = decision.duplicates_in_page,
            deferred = decision.deferred,
            cap = self.max_items_per_run,
            "Capture budget applied"
        );
        decision
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::fixtures::discovered;

    fn ids(items: &[DiscoveredItem]) -> Vec<&str> {
        items.iter().map(|i| i.identity.as_str()).collect()
    }

    fn existing(ids: &[&str]) -> HashSet<ItemIdentity> {
        ids.iter().map(|s| ItemIdentity::new(*s)).collect()
    }

    #[test]
    fn test_skips_cataloged_and_keeps_page_order() {
        let decision = CaptureBudget::new(60).select(
            &existing(&["item2"]),
            discovered(&["item3", "item2", "item1"]),
        );
        assert_eq!(ids(&decision.eligible), vec!["item3", "item1"]);
        assert_eq!(decision.already_cataloged, 1);
        assert_eq!(decision.deferred, 0);
    }

    #[test]
    fn test_cap_stops_examination() {
        let page: Vec<String> = (1..=100).map(|n| format!("item{n}")).collect();
        let page_refs: Vec<&str> = page.iter().map(String::as_str).collect();

        let decision = CaptureBudget::new(60).select(&HashSet::new(), discovered(&page_refs));

        assert_eq!(decision.eligible.len(), 60);
        assert_eq!(decision.eligible[0].identity.as_str(), "item1");
        assert_eq!(decision.eligible[59].identity.as_str(), "item60");
        assert_eq!(decision.deferred, 40);
    }

    #[test]
    fn test_cataloged_items_do_not_consume_budget() {
        let decision = CaptureBudget::new(2).select(
            &existing(&["item1", "item2"]),
            discovered(&["item1", "item2", "item3", "item4", "item5"]),
        );
        assert_eq!(ids(&decision.eligible), vec!["item3", "item4"]);
        assert_eq!(decision.already_cataloged, 2);
        assert_eq!(decision.deferred, 1);
    }

    #[test]
    fn test_duplicate_identity_on_page_captured_once() {
        let decision = CaptureBudget::new(10).select(
            &HashSet::new(),
            discovered(&["item1", "item2", "item1"]),
        );
        assert_eq!(ids(&decision.eligible), vec!["item1", "item2"]);
        assert_eq!(decision.duplicates_in_page, 1);
        // First occurrence wins.
        assert_eq!(decision.eligible[0].element.index(), 0);
    }

    #[test]
    fn test_zero_cap_selects_nothing() {
        let decision =
            CaptureBudget::new(0).select(&HashSet::new(), discovered(&["item1", "item2"]));
        assert!(decision.eligible.is_empty());
        assert_eq!(decision.deferred, 2);
    }

    #[test]
    fn test_everything_cataloged() {
        let decision = CaptureBudget::new(60).select(
            &existing(&["item1", "item2"]),
            discovered(&["item1", "item2"]),
        );
        assert!(decision.eligible.is_empty());
        assert_eq!(decision.already_cataloged, 2);
    }
}
