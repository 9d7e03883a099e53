//! Compose Assist
//!
//! Adds a reply-generation control to a webmail compose toolbar whose markup
//! we do not own. The engine keeps re-finding its insertion point as the host
//! page changes, keeps exactly one control alive, and turns a click into a
//! request to a local generation service whose answer lands in the reply box.

pub mod action;
pub mod cli;
pub mod config;
pub mod control;
pub mod dom;
pub mod error;
pub mod generation;
pub mod injection;
pub mod locator;
pub mod notice;
pub mod observer;
pub mod session;

pub use action::{ActionController, ActionOutcome, ActionState};
pub use config::AssistConfig;
pub use control::{ControlFactory, InjectedControl};
pub use dom::{HostChange, HostDocument, MutationRecord};
pub use error::{AssistError, AssistResult};
pub use generation::{GenerationRequest, HttpReplyGenerator, ReplyGenerator};
pub use injection::{InjectionManager, LiveControl};
pub use locator::{Candidate, CandidateList, Located};
pub use notice::{Notice, NoticeLevel, NoticeSink};
pub use observer::StructuralObserver;
pub use session::{AssistSession, SessionEvent, SessionHandle, SessionReport, SessionStats, SessionUpdate};
