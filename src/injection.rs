//! Idempotent injection of the reply control into the compose toolbar

use crate::action::{ActionController, ActionState};
use crate::config::AssistConfig;
use crate::control::{ControlFactory, InjectedControl};
use crate::dom::{HostDocument, NodeId};
use crate::error::{AssistError, AssistResult};
use crate::locator::CandidateList;
use scraper::Selector;
use std::sync::Arc;
use uuid::Uuid;

/// Handle to the control currently attached to the host tree
pub struct LiveControl {
    node: NodeId,
    control: InjectedControl,
    state: ActionState,
    handler: Arc<ActionController>,
}

impl LiveControl {
    pub fn id(&self) -> Uuid {
        self.control.id()
    }

    pub fn node(&self) -> NodeId {
        self.node
    }

    pub fn control(&self) -> &InjectedControl {
        &self.control
    }

    pub fn control_mut(&mut self) -> &mut InjectedControl {
        &mut self.control
    }

    pub fn state(&self) -> ActionState {
        self.state
    }

    pub(crate) fn set_state(&mut self, state: ActionState) {
        self.state = state;
    }

    /// Interaction handler wired at injection time
    pub fn handler(&self) -> Arc<ActionController> {
        Arc::clone(&self.handler)
    }

    #[cfg(test)]
    pub(crate) fn with_handler(mut self, handler: Arc<ActionController>) -> Self {
        self.handler = handler;
        self
    }

    /// Whether this control is still part of the host tree
    pub fn is_attached(&self, doc: &HostDocument) -> bool {
        doc.is_attached(self.node)
    }

    /// Push the control's current presentation into the tree
    pub(crate) fn render(&self, doc: &mut HostDocument) {
        if !doc.render_markup(self.node, &self.control.markup()) {
            tracing::debug!("Control {} is no longer renderable", self.id());
        }
    }
}

impl std::fmt::Debug for LiveControl {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LiveControl")
            .field("node", &self.node)
            .field("control", &self.control)
            .field("state", &self.state)
            .finish()
    }
}

/// Keeps at most one marked control in the host tree
pub struct InjectionManager {
    toolbar: CandidateList,
    factory: ControlFactory,
    marker: Selector,
}

impl InjectionManager {
    pub fn new(toolbar: CandidateList, factory: ControlFactory) -> AssistResult<Self> {
        let marker = factory.marker_selector()?;
        Ok(Self {
            toolbar,
            factory,
            marker,
        })
    }

    pub fn from_config(config: &AssistConfig) -> AssistResult<Self> {
        Self::new(
            CandidateList::parse(&config.selectors.toolbar)?,
            ControlFactory::new(config.control.clone()),
        )
    }

    /// Detach every marked control, returning how many were removed
    pub fn remove_existing(&self, doc: &mut HostDocument) -> usize {
        let existing = doc.query_all(&self.marker);
        existing.into_iter().filter(|id| doc.remove(*id)).count()
    }

    /// Number of marked controls in the tree
    pub fn live_count(&self, doc: &HostDocument) -> usize {
        doc.query_all(&self.marker).len()
    }

    /// Remove any stale control, then insert a fresh one as the anchor's first child
    pub fn inject_into(
        &self,
        doc: &mut HostDocument,
        handler: &Arc<ActionController>,
    ) -> AssistResult<LiveControl> {
        let removed = self.remove_existing(doc);
        if removed > 0 {
            tracing::debug!("Removed {} existing control(s)", removed);
        }

        let Some(anchor) = self.toolbar.locate_element(doc) else {
            tracing::info!("Toolbar not found");
            return Err(AssistError::anchor_not_found(self.toolbar.patterns()));
        };

        tracing::info!("Toolbar found, injecting reply control");
        let mut control = self.factory.create_control();
        control.mark();

        let node = doc
            .prepend_markup(anchor, &control.markup())
            .ok_or_else(|| AssistError::anchor_not_found(self.toolbar.patterns()))?;

        Ok(LiveControl {
            node,
            control,
            state: ActionState::Idle,
            handler: Arc::clone(handler),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::parse_selector;
    use crate::generation::{GenerationRequest, ReplyGenerator};
    use crate::notice::LogNotices;
    use async_trait::async_trait;

    struct NeverCalled;

    #[async_trait]
    impl ReplyGenerator for NeverCalled {
        fn name(&self) -> &str {
            "never"
        }

        async fn generate(&self, _request: &GenerationRequest) -> AssistResult<String> {
            Err(AssistError::network_failure("not expected"))
        }
    }

    fn handler(config: &AssistConfig) -> Arc<ActionController> {
        Arc::new(ActionController::new(config, Arc::new(NeverCalled), Arc::new(LogNotices)).unwrap())
    }

    #[test]
    fn test_inject_prepends_to_anchor() {
        let config = AssistConfig::default();
        let manager = InjectionManager::from_config(&config).unwrap();
        let mut doc = HostDocument::parse(
            r#"<html><body><div class="aDh"><div id="send">Send</div></div></body></html>"#,
        );

        let live = manager.inject_into(&mut doc, &handler(&config)).unwrap();
        let anchor = doc.query_first(&parse_selector(".aDh").unwrap()).unwrap();
        assert_eq!(doc.child_elements(anchor)[0], live.node());
        assert_eq!(live.state(), ActionState::Idle);
        assert!(live.control().is_marked());
        assert_eq!(manager.live_count(&doc), 1);
    }

    #[test]
    fn test_repeated_injection_keeps_one_control() {
        let config = AssistConfig::default();
        let manager = InjectionManager::from_config(&config).unwrap();
        let handler = handler(&config);
        let mut doc = HostDocument::parse(
            r#"<html><body><div class="btC"></div></body></html>"#,
        );

        let first = manager.inject_into(&mut doc, &handler).unwrap();
        let second = manager.inject_into(&mut doc, &handler).unwrap();
        let third = manager.inject_into(&mut doc, &handler).unwrap();

        assert_eq!(manager.live_count(&doc), 1);
        assert!(!first.is_attached(&doc));
        assert!(!second.is_attached(&doc));
        assert!(third.is_attached(&doc));
    }

    #[test]
    fn test_missing_anchor_still_removes_stale_control() {
        let config = AssistConfig::default();
        let manager = InjectionManager::from_config(&config).unwrap();
        let handler = handler(&config);
        let mut doc = HostDocument::parse(
            r#"<html><body><div class="btC"></div><div class="other"></div></body></html>"#,
        );
        manager.inject_into(&mut doc, &handler).unwrap();

        doc.apply(&crate::dom::HostChange::remove(".btC")).unwrap();
        let stale = ControlFactory::new(config.control.clone());
        let mut control = stale.create_control();
        control.mark();
        let other = doc.query_first(&parse_selector(".other").unwrap()).unwrap();
        doc.prepend_markup(other, &control.markup()).unwrap();
        assert_eq!(manager.live_count(&doc), 1);

        let err = manager.inject_into(&mut doc, &handler).unwrap_err();
        assert!(err.is_transient_host_state());
        assert_eq!(manager.live_count(&doc), 0);
    }
}
