//! Attempt state machine and the async driver built on it.

mod runner;
mod state;

pub use runner::{AvatarControl, AvatarEvent, AvatarResolver};
pub use state::{
    AttemptState, LookupTicket, PendingLookup, ResolutionContext, ResolutionPhase, TicketId, Transition, Trigger, UrlSource, fallback_text,
    transition,
};
