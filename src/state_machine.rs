//! Dialogue state machine
//!
//! Implements the Elm Architecture pattern with pure state transitions:
//! `(state, intent, context) -> Transition`, with answer cells resolved by a
//! second lookup on the evaluator's verdict.

mod action;
mod intent;
mod state;
mod transition;

#[cfg(test)]
mod proptests;

pub use action::{Action, Effect, EndReason};
pub use intent::{Intent, IntentCategory, IntentDetail, MetaTopic};
pub use state::{Language, Question, SessionContext, State, UnknownState};
pub use transition::{after_verdict, transition, Target, Transition, TransitionError};
