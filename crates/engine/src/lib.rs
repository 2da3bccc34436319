//! # Avatarkit Engine
//!
//! Resolves a bag of identity hints into one renderable avatar: the first
//! provider image that loads, or an initials tile when every source fails.
//!
//! ## Usage
//!
//! ```rust
//! use avatarkit_engine::{AttemptState, ProviderChain, ProviderSettings, ResolutionContext, Trigger, transition};
//! use avatarkit_types::IdentityHints;
//!
//! let hints = IdentityHints {
//!     facebook_id: Some("4".into()),
//!     ..IdentityHints::default()
//! };
//! let chain = ProviderChain::standard();
//! let settings = ProviderSettings::default();
//! let context = ResolutionContext { hints: &hints, chain: &chain, settings: &settings };
//!
//! let step = transition(&AttemptState::default(), &context, Trigger::Mount);
//! assert_eq!(step.state.resolved_url(), Some("https://graph.facebook.com/4/picture?width=32"));
//! ```
//!
//! ## Architecture
//!
//! - **`provider`**: URL builders for each identity service and the fixed chain order
//! - **`resolution`**: the pure [`transition`] function plus [`AvatarResolver`], which
//!   runs lookups and reacts to renderer feedback
//! - **`visual`**: projection of attempt state into a [`ResolvedVisual`](avatarkit_types::ResolvedVisual)

pub mod provider;
pub mod resolution;
pub mod visual;

pub use provider::{Candidate, ChainEntry, IdentityProvider, LookupRequest, ProviderChain, ProviderSettings, gravatar_hash};
pub use resolution::{
    AttemptState, AvatarControl, AvatarEvent, AvatarResolver, LookupTicket, PendingLookup, ResolutionContext, ResolutionPhase, TicketId,
    Transition, Trigger, UrlSource, fallback_text, transition,
};
pub use visual::{VisualStyle, project_visual};
