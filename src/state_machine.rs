//! Dialog state machine
//!
//! Implements the Elm Architecture pattern with pure state transitions:
//! `transition(conversation, context, event)` returns the next conversation
//! and the effects the runtime must execute.

pub mod effect;
pub mod event;
mod navigation;
pub mod prompts;
pub mod state;
pub(crate) mod transition;

#[cfg(test)]
mod proptests;

pub use effect::{Button, Card, Effect};
pub use event::{Event, Payload};
pub use state::{CartItem, Conversation, DeliveryType, DialogContext, DialogState, Language};
pub use transition::{transition, TransitionResult};
