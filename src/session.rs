//! Single-threaded event loop tying the engine together
//!
//! Every callback the host would deliver (structural change, settle timer,
//! user activation, network completion) arrives as a [`SessionEvent`] and is
//! handled to completion before the next one. The document is only touched
//! from inside the loop; timers and generation requests run as tasks that
//! post their completion back as events.

use crate::action::{ActionController, ActionOutcome, ActionState};
use crate::config::AssistConfig;
use crate::dom::{HostChange, HostDocument};
use crate::error::AssistResult;
use crate::generation::{GenerationRequest, ReplyGenerator};
use crate::injection::{InjectionManager, LiveControl};
use crate::notice::NoticeSink;
use crate::observer::StructuralObserver;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, mpsc};
use uuid::Uuid;

/// Inputs to the session loop
#[derive(Debug)]
pub enum SessionEvent {
    /// The host changed its own tree
    Host(HostChange),
    /// Settle delay after a compose window appeared has elapsed
    InjectionDue,
    /// The user activated the live control
    Activate,
    /// The generation request for `control` completed
    GenerationFinished {
        control: Uuid,
        result: AssistResult<String>,
    },
    /// Stop taking input and drain outstanding work
    Shutdown,
}

/// Progress published to subscribers
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionUpdate {
    InjectionScheduled { delay: Duration },
    Injected { control: Uuid },
    InjectionSkipped,
    GenerationStarted { control: Uuid },
    ActivationRejected,
    GenerationCompleted { control: Uuid, inserted: bool },
    HostChangeFailed { message: String },
}

/// Counters collected over a session
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionStats {
    pub injections: usize,
    pub skipped_injections: usize,
    pub activations: usize,
    pub rejected_activations: usize,
    pub replies_inserted: usize,
    pub generation_failures: usize,
    pub surface_misses: usize,
}

/// What a finished session leaves behind
#[derive(Debug)]
pub struct SessionReport {
    pub document: HostDocument,
    pub stats: SessionStats,
    pub live_control: Option<Uuid>,
}

/// Cloneable sender side of a session
#[derive(Debug, Clone)]
pub struct SessionHandle {
    events: mpsc::UnboundedSender<SessionEvent>,
    updates: broadcast::Sender<SessionUpdate>,
}

impl SessionHandle {
    pub fn host_change(&self, change: HostChange) -> bool {
        self.events.send(SessionEvent::Host(change)).is_ok()
    }

    pub fn activate(&self) -> bool {
        self.events.send(SessionEvent::Activate).is_ok()
    }

    pub fn shutdown(&self) -> bool {
        self.events.send(SessionEvent::Shutdown).is_ok()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionUpdate> {
        self.updates.subscribe()
    }
}

/// The augmentation engine bound to one host document
pub struct AssistSession {
    document: HostDocument,
    observer: StructuralObserver,
    injector: InjectionManager,
    handler: Arc<ActionController>,
    live: Option<LiveControl>,
    in_flight: HashMap<Uuid, Arc<ActionController>>,
    events_tx: mpsc::UnboundedSender<SessionEvent>,
    events_rx: mpsc::UnboundedReceiver<SessionEvent>,
    updates: broadcast::Sender<SessionUpdate>,
    pending: usize,
    closing: bool,
    stats: SessionStats,
}

impl AssistSession {
    pub fn new(
        document: HostDocument,
        config: &AssistConfig,
        generator: Arc<dyn ReplyGenerator>,
        notices: Arc<dyn NoticeSink>,
    ) -> AssistResult<Self> {
        config.validate()?;
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let (updates, _) = broadcast::channel(64);

        Ok(Self {
            document,
            observer: StructuralObserver::from_config(config)?,
            injector: InjectionManager::from_config(config)?,
            handler: Arc::new(ActionController::new(config, generator, notices)?),
            live: None,
            in_flight: HashMap::new(),
            events_tx,
            events_rx,
            updates,
            pending: 0,
            closing: false,
            stats: SessionStats::default(),
        })
    }

    pub fn handle(&self) -> SessionHandle {
        SessionHandle {
            events: self.events_tx.clone(),
            updates: self.updates.clone(),
        }
    }

    pub fn document(&self) -> &HostDocument {
        &self.document
    }

    pub fn live_control(&self) -> Option<&LiveControl> {
        self.live.as_ref()
    }

    pub fn stats(&self) -> &SessionStats {
        &self.stats
    }

    /// Inject right away, as if a compose window had settled
    pub fn inject_now(&mut self) -> Option<Uuid> {
        self.inject();
        self.live.as_ref().map(|l| l.id())
    }

    /// Process events until shutdown has been requested and nothing is outstanding
    pub async fn run(mut self) -> SessionReport {
        tracing::info!("Compose assist session started");

        while let Some(event) = self.events_rx.recv().await {
            self.dispatch(event);
            if self.closing && self.pending == 0 {
                break;
            }
        }

        tracing::info!("Compose assist session finished: {:?}", self.stats);
        SessionReport {
            live_control: self.live.as_ref().map(|l| l.id()),
            document: self.document,
            stats: self.stats,
        }
    }

    fn dispatch(&mut self, event: SessionEvent) {
        match event {
            SessionEvent::Host(change) => {
                if self.closing {
                    tracing::debug!("Ignoring host change after shutdown");
                    return;
                }
                self.on_host_change(&change);
            }
            SessionEvent::InjectionDue => {
                self.pending = self.pending.saturating_sub(1);
                self.inject();
            }
            SessionEvent::Activate => {
                if self.closing {
                    tracing::debug!("Ignoring activation after shutdown");
                    return;
                }
                self.activate();
            }
            SessionEvent::GenerationFinished { control, result } => {
                self.pending = self.pending.saturating_sub(1);
                self.on_generation_finished(control, result);
            }
            SessionEvent::Shutdown => {
                tracing::debug!("Shutdown requested with {} pending task(s)", self.pending);
                self.closing = true;
            }
        }
    }

    fn on_host_change(&mut self, change: &HostChange) {
        let records = match self.document.apply(change) {
            Ok(records) => records,
            Err(e) => {
                tracing::warn!("Host change could not be applied: {}", e);
                self.publish(SessionUpdate::HostChangeFailed {
                    message: e.to_string(),
                });
                return;
            }
        };

        if self
            .live
            .as_ref()
            .is_some_and(|live| !live.is_attached(&self.document))
        {
            tracing::debug!("Live control was removed by the host");
            self.live = None;
        }

        if let Some(delay) = self.observer.observe(&self.document, &records) {
            self.schedule_injection(delay);
        }
    }

    fn schedule_injection(&mut self, delay: Duration) {
        self.pending += 1;
        let tx = self.events_tx.clone();
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = tx.send(SessionEvent::InjectionDue);
        });
        self.publish(SessionUpdate::InjectionScheduled { delay });
    }

    fn inject(&mut self) {
        match self.injector.inject_into(&mut self.document, &self.handler) {
            Ok(live) => {
                let control = live.id();
                if let Some(old) = self.live.replace(live) {
                    if old.state() == ActionState::Generating {
                        tracing::debug!("Replaced control {} while its request is in flight", old.id());
                    }
                }
                self.stats.injections += 1;
                self.publish(SessionUpdate::Injected { control });
            }
            Err(e) => {
                // Any previous control was removed before the anchor lookup.
                self.live = None;
                if e.is_transient_host_state() {
                    tracing::debug!("Injection skipped: {}", e);
                } else {
                    tracing::warn!("Injection failed: {}", e);
                }
                self.stats.skipped_injections += 1;
                self.publish(SessionUpdate::InjectionSkipped);
            }
        }
    }

    fn activate(&mut self) {
        let Some(live) = self
            .live
            .as_mut()
            .filter(|live| live.is_attached(&self.document))
        else {
            tracing::debug!("Activation with no live control");
            self.stats.rejected_activations += 1;
            self.publish(SessionUpdate::ActivationRejected);
            return;
        };

        let handler = live.handler();
        match handler.begin(&mut self.document, live) {
            Ok(request) => {
                let control = live.id();
                self.stats.activations += 1;
                self.spawn_generation(control, handler, request);
                self.publish(SessionUpdate::GenerationStarted { control });
            }
            Err(e) => {
                tracing::debug!("Activation rejected: {}", e);
                self.stats.rejected_activations += 1;
                self.publish(SessionUpdate::ActivationRejected);
            }
        }
    }

    fn spawn_generation(
        &mut self,
        control: Uuid,
        handler: Arc<ActionController>,
        request: GenerationRequest,
    ) {
        self.pending += 1;
        let generator = handler.generator();
        self.in_flight.insert(control, handler);
        let tx = self.events_tx.clone();
        tokio::spawn(async move {
            tracing::debug!("Sending request via {} generator", generator.name());
            let result = generator.generate(&request).await;
            let _ = tx.send(SessionEvent::GenerationFinished { control, result });
        });
    }

    fn on_generation_finished(&mut self, control: Uuid, result: AssistResult<String>) {
        let handler = self
            .in_flight
            .remove(&control)
            .unwrap_or_else(|| Arc::clone(&self.handler));
        let originating = self.live.as_mut().filter(|l| l.id() == control);
        let outcome = handler.finish(&mut self.document, originating, result);

        let inserted = outcome.is_success();
        match outcome {
            ActionOutcome::Inserted { .. } => self.stats.replies_inserted += 1,
            ActionOutcome::GenerationFailed { .. } => self.stats.generation_failures += 1,
            ActionOutcome::SurfaceMissing => self.stats.surface_misses += 1,
        }
        self.publish(SessionUpdate::GenerationCompleted { control, inserted });
    }

    fn publish(&self, update: SessionUpdate) {
        // No subscribers is fine.
        let _ = self.updates.send(update);
    }
}
