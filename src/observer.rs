//! Watches host mutations for compose windows appearing

use crate::config::AssistConfig;
use crate::dom::{parse_selector, HostDocument, MutationRecord};
use crate::error::AssistResult;
use scraper::Selector;
use std::time::Duration;

/// Decides which mutation batches warrant an injection attempt
#[derive(Debug, Clone)]
pub struct StructuralObserver {
    compose_signal: Selector,
    settle_delay: Duration,
}

impl StructuralObserver {
    pub fn new(compose_signal: &str, settle_delay: Duration) -> AssistResult<Self> {
        Ok(Self {
            compose_signal: parse_selector(compose_signal)?,
            settle_delay,
        })
    }

    pub fn from_config(config: &AssistConfig) -> AssistResult<Self> {
        Self::new(&config.selectors.compose_signal, config.settle_delay())
    }

    pub fn settle_delay(&self) -> Duration {
        self.settle_delay
    }

    /// True when any inserted element is, or contains, a compose surface
    pub fn qualifies(&self, doc: &HostDocument, records: &[MutationRecord]) -> bool {
        records
            .iter()
            .flat_map(|record| record.added.iter())
            .any(|node| doc.matches_or_contains(*node, &self.compose_signal))
    }

    /// Delay after which to inject, if this batch calls for it
    pub fn observe(&self, doc: &HostDocument, records: &[MutationRecord]) -> Option<Duration> {
        if self.qualifies(doc, records) {
            tracing::info!("Compose window detected");
            Some(self.settle_delay)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::HostChange;

    fn observer() -> StructuralObserver {
        StructuralObserver::from_config(&AssistConfig::default()).unwrap()
    }

    #[test]
    fn test_inserted_dialog_qualifies() {
        let mut doc = HostDocument::parse("<html><body></body></html>");
        let records = doc
            .apply(&HostChange::append("body", r#"<div role="dialog">compose</div>"#))
            .unwrap();
        assert_eq!(observer().observe(&doc, &records), Some(Duration::from_millis(500)));
    }

    #[test]
    fn test_nested_toolbar_qualifies() {
        let mut doc = HostDocument::parse("<html><body></body></html>");
        let records = doc
            .apply(&HostChange::append(
                "body",
                r#"<section><div><div class="btC"></div></div></section>"#,
            ))
            .unwrap();
        assert!(observer().qualifies(&doc, &records));
    }

    #[test]
    fn test_unrelated_insertions_are_ignored() {
        let mut doc = HostDocument::parse("<html><body></body></html>");
        let records = doc
            .apply(&HostChange::append("body", "plain text <span>label</span>"))
            .unwrap();
        assert!(observer().observe(&doc, &records).is_none());
    }

    #[test]
    fn test_removals_are_ignored() {
        let mut doc = HostDocument::parse(r#"<html><body><div class="btC"></div></body></html>"#);
        let records = doc.apply(&HostChange::remove(".btC")).unwrap();
        assert!(!observer().qualifies(&doc, &records));
    }
}
