//! Generate-and-insert action behind the injected control
//!
//! Each control instance runs a two-state machine: `Idle` on creation,
//! `Generating` while its request is in flight, and back to `Idle` on every
//! outcome. The request is the only suspension point, so the cycle is split
//! into [`ActionController::begin`] and [`ActionController::finish`] that an
//! event loop can call around it; [`ActionController::activate`] runs both.

use crate::config::AssistConfig;
use crate::dom::{parse_selector, HostDocument};
use crate::error::{AssistError, AssistResult};
use crate::generation::{GenerationRequest, ReplyGenerator};
use crate::injection::LiveControl;
use crate::locator::CandidateList;
use crate::notice::{Notice, NoticeSink};
use scraper::Selector;
use std::sync::Arc;

/// Interaction state of one control instance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ActionState {
    #[default]
    Idle,
    Generating,
}

/// How a generation cycle ended
#[derive(Debug, Clone)]
pub enum ActionOutcome {
    /// Reply inserted into the edit surface
    Inserted { chars: usize },
    /// The request failed or the endpoint answered with an error status
    GenerationFailed { error: AssistError },
    /// Generation worked but there was nowhere to put the reply
    SurfaceMissing,
}

impl ActionOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, ActionOutcome::Inserted { .. })
    }
}

/// Shared handler wired to every control the injector creates
pub struct ActionController {
    content: CandidateList,
    surface: Selector,
    surface_pattern: String,
    tone: String,
    failure_title: String,
    failure_message: String,
    generator: Arc<dyn ReplyGenerator>,
    notices: Arc<dyn NoticeSink>,
}

impl ActionController {
    pub fn new(
        config: &AssistConfig,
        generator: Arc<dyn ReplyGenerator>,
        notices: Arc<dyn NoticeSink>,
    ) -> AssistResult<Self> {
        Ok(Self {
            content: CandidateList::parse(&config.selectors.content)?,
            surface: parse_selector(&config.selectors.edit_surface)?,
            surface_pattern: config.selectors.edit_surface.clone(),
            tone: config.tone.clone(),
            failure_title: config.notices.failure_title.clone(),
            failure_message: config.notices.failure_message.clone(),
            generator,
            notices,
        })
    }

    pub fn generator(&self) -> Arc<dyn ReplyGenerator> {
        Arc::clone(&self.generator)
    }

    /// Email text for the request; empty when nothing matches
    pub fn extract_content(&self, doc: &HostDocument) -> String {
        self.content.locate_text(doc).unwrap_or_default()
    }

    /// `Idle -> Generating`: flip the control to its working look and build the request
    pub fn begin(
        &self,
        doc: &mut HostDocument,
        live: &mut LiveControl,
    ) -> AssistResult<GenerationRequest> {
        if live.state() == ActionState::Generating {
            tracing::debug!("Ignoring activation of control {} while generating", live.id());
            return Err(AssistError::AlreadyGenerating);
        }

        live.set_state(ActionState::Generating);
        live.control_mut().show_working();
        live.render(doc);

        let email_content = self.extract_content(doc);
        if email_content.is_empty() {
            tracing::debug!("No email content found, sending empty request body");
        }
        tracing::info!("Generating reply for control {}", live.id());
        Ok(GenerationRequest::new(email_content, self.tone.clone()))
    }

    /// `Generating -> Idle`: deliver the reply (or report the failure) and restore the control
    ///
    /// `originating` is `None` when the control that started the request has
    /// since been replaced; the reply is still inserted.
    pub fn finish(
        &self,
        doc: &mut HostDocument,
        originating: Option<&mut LiveControl>,
        result: AssistResult<String>,
    ) -> ActionOutcome {
        let outcome = match result {
            Ok(reply) => self.insert_reply(doc, &reply),
            Err(error) => {
                tracing::error!("Reply generation failed: {}", error);
                self.notices.notify(Notice::error(
                    self.failure_title.clone(),
                    self.failure_message.clone(),
                ));
                ActionOutcome::GenerationFailed { error }
            }
        };

        match originating {
            Some(live) => {
                live.control_mut().show_idle();
                live.set_state(ActionState::Idle);
                live.render(doc);
            }
            None => tracing::debug!("Originating control was replaced before the reply arrived"),
        }
        outcome
    }

    /// Run a whole cycle inline
    pub async fn activate(
        &self,
        doc: &mut HostDocument,
        live: &mut LiveControl,
    ) -> AssistResult<ActionOutcome> {
        let request = self.begin(doc, live)?;
        let result = self.generator.generate(&request).await;
        Ok(self.finish(doc, Some(live), result))
    }

    fn insert_reply(&self, doc: &mut HostDocument, reply: &str) -> ActionOutcome {
        let Some(surface) = doc.query_first(&self.surface) else {
            tracing::error!(
                "{}",
                AssistError::surface_not_found(self.surface_pattern.as_str())
            );
            return ActionOutcome::SurfaceMissing;
        };

        if doc.focus(surface) && doc.insert_text(reply) {
            tracing::info!("Inserted {} chars of generated reply", reply.chars().count());
            ActionOutcome::Inserted {
                chars: reply.chars().count(),
            }
        } else {
            tracing::error!("Edit surface could not take focus");
            ActionOutcome::SurfaceMissing
        }
    }
}
