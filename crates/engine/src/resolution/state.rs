//! Attempt state and the pure transition function that drives it.
//!
//! Every trigger (mount, image-load failure, hint change, lookup completion)
//! goes through [`transition`], which takes the current [`AttemptState`] and
//! returns the next one plus an optional lookup the caller must perform. The
//! function never blocks and never touches the network; asynchronous
//! providers are represented by a [`LookupTicket`] whose completion comes back
//! in as another trigger.

use avatarkit_types::{HintField, IdentityHints, ProviderKind};
use avatarkit_util::{initials, placeholder_names, substitute_placeholders};
use tracing::{debug, info};

use crate::provider::{Candidate, ProviderChain, ProviderSettings};

/// Identifier tying a lookup completion to the request that produced it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TicketId(u64);

impl TicketId {
    pub fn value(self) -> u64 {
        self.0
    }
}

/// A lookup the caller must perform and report back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LookupTicket {
    pub id: TicketId,
    pub provider: ProviderKind,
    pub url: String,
    /// Size the candidate was built for; extraction uses the same size.
    pub size_px: u32,
}

/// The single in-flight lookup of an attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PendingLookup {
    pub ticket: TicketId,
    pub provider: ProviderKind,
}

/// Where the current image URL came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UrlSource {
    Provider(ProviderKind),
    /// The explicit URL hint used as the final fallback.
    ExplicitUrl,
    /// The explicit URL hint changed after mount.
    HintOverride,
}

/// Observable phase of a resolution attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolutionPhase {
    Idle,
    Trying(ProviderKind),
    ExhaustedResolvingFallback,
    SettledImage,
    SettledInitials,
}

/// Mutable record of one avatar's resolution progress.
///
/// When `resolved_url` is set the fallback text is kept but not displayed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AttemptState {
    tried: [bool; ProviderKind::ALL.len()],
    tried_explicit_url: bool,
    resolved_url: Option<String>,
    resolved_by: Option<UrlSource>,
    fallback_text: Option<String>,
    pending: Option<PendingLookup>,
    next_ticket: u64,
}

impl AttemptState {
    pub fn has_tried(&self, kind: ProviderKind) -> bool {
        self.tried[kind.index()]
    }

    /// Providers tried so far, in priority order.
    pub fn tried_providers(&self) -> Vec<ProviderKind> {
        ProviderKind::ALL.into_iter().filter(|kind| self.has_tried(*kind)).collect()
    }

    pub fn resolved_url(&self) -> Option<&str> {
        self.resolved_url.as_deref()
    }

    pub fn resolved_by(&self) -> Option<UrlSource> {
        self.resolved_by
    }

    pub fn fallback_text(&self) -> Option<&str> {
        self.fallback_text.as_deref()
    }

    pub fn pending(&self) -> Option<PendingLookup> {
        self.pending
    }

    pub fn phase(&self) -> ResolutionPhase {
        if let Some(pending) = self.pending {
            return ResolutionPhase::Trying(pending.provider);
        }
        if self.resolved_url.is_some() {
            return ResolutionPhase::SettledImage;
        }
        if self.fallback_text.is_some() {
            return ResolutionPhase::SettledInitials;
        }
        if self.tried.iter().any(|tried| *tried) {
            ResolutionPhase::ExhaustedResolvingFallback
        } else {
            ResolutionPhase::Idle
        }
    }

    fn mark_tried(&mut self, kind: ProviderKind) {
        self.tried[kind.index()] = true;
    }

    fn issue_ticket(&mut self) -> TicketId {
        self.next_ticket += 1;
        TicketId(self.next_ticket)
    }

    fn resolve(&mut self, url: String, source: UrlSource) {
        self.resolved_url = Some(url);
        self.resolved_by = Some(source);
    }

    fn clear_resolved(&mut self) {
        self.resolved_url = None;
        self.resolved_by = None;
    }
}

/// Events that re-enter the state machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Trigger {
    Mount,
    /// The renderer could not load `url`.
    LoadFailed { url: String },
    /// Hints changed after mount; the context carries the new hints.
    HintsChanged { previous: IdentityHints },
    LookupSucceeded { ticket: TicketId, url: String },
    LookupFailed { ticket: TicketId },
}

/// Read-only inputs to a transition.
#[derive(Debug, Clone, Copy)]
pub struct ResolutionContext<'a> {
    pub hints: &'a IdentityHints,
    pub chain: &'a ProviderChain,
    pub settings: &'a ProviderSettings,
}

/// Result of applying a trigger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    pub state: AttemptState,
    /// Lookup to start, if the walk stopped at an asynchronous provider.
    pub lookup: Option<LookupTicket>,
}

impl Transition {
    fn settled(state: AttemptState) -> Self {
        Self { state, lookup: None }
    }
}

/// Apply `trigger` to `current` and return the next state.
///
/// Providers fire at most once per attempt state, in chain order, and at most
/// one lookup is outstanding at a time. Stale triggers (a load failure for a
/// URL no longer shown, a completion for a ticket no longer pending) leave the
/// state unchanged.
pub fn transition(current: &AttemptState, context: &ResolutionContext<'_>, trigger: Trigger) -> Transition {
    let mut state = current.clone();

    match trigger {
        Trigger::Mount => {}
        Trigger::LoadFailed { url } => {
            if state.resolved_url.as_deref() != Some(url.as_str()) {
                debug!(%url, "ignoring load failure for a URL that is no longer shown");
                return Transition::settled(state);
            }
            info!(%url, source = ?state.resolved_by, "image failed to load; advancing");
            state.clear_resolved();
        }
        Trigger::HintsChanged { previous } => apply_hint_change(&mut state, &previous, context),
        Trigger::LookupSucceeded { ticket, url } => {
            let Some(pending) = take_pending(&mut state, ticket) else {
                return Transition::settled(state);
            };
            info!(provider = %pending.provider, %url, "lookup produced a candidate");
            state.resolve(url, UrlSource::Provider(pending.provider));
        }
        Trigger::LookupFailed { ticket } => {
            let Some(pending) = take_pending(&mut state, ticket) else {
                return Transition::settled(state);
            };
            debug!(provider = %pending.provider, "lookup declined");
        }
    }

    advance(state, context)
}

fn take_pending(state: &mut AttemptState, ticket: TicketId) -> Option<PendingLookup> {
    match state.pending {
        Some(pending) if pending.ticket == ticket => state.pending.take(),
        _ => {
            debug!(ticket = ticket.value(), "ignoring completion for a stale lookup");
            None
        }
    }
}

/// Hint changes after mount: a new explicit URL replaces the image, otherwise
/// a new name or literal value replaces the fallback text. Tried flags stay.
fn apply_hint_change(state: &mut AttemptState, previous: &IdentityHints, context: &ResolutionContext<'_>) {
    let current = context.hints;
    let changed = |field: HintField| current.field(field).filter(|value| previous.field(field) != Some(*value));

    if let Some(url) = changed(HintField::ExplicitImageUrl) {
        let url = sized_url(url, current.target_size_px);
        debug!(%url, "explicit image URL changed");
        // A late completion must not overwrite the caller's URL.
        state.pending = None;
        state.tried_explicit_url = true;
        state.resolve(url, UrlSource::HintOverride);
    } else if let Some(name) = changed(HintField::DisplayName) {
        state.fallback_text = Some(initials(name));
    } else if let Some(value) = changed(HintField::LiteralValue) {
        state.fallback_text = Some(value.to_string());
    }
}

/// Walk the chain from the first untried provider.
fn advance(mut state: AttemptState, context: &ResolutionContext<'_>) -> Transition {
    if state.pending.is_some() || state.resolved_url.is_some() {
        return Transition::settled(state);
    }

    let size_px = context.hints.target_size_px;
    for provider in context.chain.iter() {
        let kind = provider.kind();
        if state.has_tried(kind) {
            continue;
        }
        let Some(token) = context.hints.field(provider.required_hint()) else {
            continue;
        };
        state.mark_tried(kind);

        match provider.build_candidate(token, size_px, context.settings) {
            Candidate::Url(url) => {
                info!(provider = %kind, %url, "provider produced a candidate");
                state.resolve(url, UrlSource::Provider(kind));
                return Transition::settled(state);
            }
            Candidate::Lookup(request) => {
                let id = state.issue_ticket();
                debug!(provider = %kind, url = %request.url, ticket = id.value(), "provider requires a lookup");
                state.pending = Some(PendingLookup { ticket: id, provider: kind });
                let ticket = LookupTicket {
                    id,
                    provider: kind,
                    url: request.url,
                    size_px,
                };
                return Transition {
                    state,
                    lookup: Some(ticket),
                };
            }
            Candidate::Declined => debug!(provider = %kind, "provider declined"),
        }
    }

    settle(state, context)
}

/// Every provider is spent: compute the fallback text, then try the explicit
/// URL once as the weakest image source.
fn settle(mut state: AttemptState, context: &ResolutionContext<'_>) -> Transition {
    let hints = context.hints;
    if state.fallback_text.is_none() {
        state.fallback_text = Some(fallback_text(hints));
    }

    if !state.tried_explicit_url
        && let Some(url) = hints.field(HintField::ExplicitImageUrl)
    {
        state.tried_explicit_url = true;
        let url = sized_url(url, hints.target_size_px);
        info!(%url, "using explicit image URL");
        state.resolve(url, UrlSource::ExplicitUrl);
    }

    Transition::settled(state)
}

/// Initials of the display name, else the literal value, else empty.
pub fn fallback_text(hints: &IdentityHints) -> String {
    if let Some(name) = hints.field(HintField::DisplayName) {
        return initials(name);
    }
    hints.field(HintField::LiteralValue).unwrap_or_default().to_string()
}

fn sized_url(pattern: &str, size_px: u32) -> String {
    let url = substitute_placeholders(pattern, &[("size", size_px)]);
    let unresolved = placeholder_names(&url);
    if !unresolved.is_empty() {
        debug!(%url, ?unresolved, "explicit image URL keeps unresolved placeholders");
    }
    url
}
