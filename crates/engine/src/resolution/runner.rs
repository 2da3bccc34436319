//! Asynchronous avatar resolution driver.
//!
//! [`AvatarResolver::drive`] owns one [`AttemptState`] for the lifetime of a
//! rendered avatar. It feeds controls from the renderer (load failures, hint
//! changes, teardown) and lookup completions through [`transition`], and
//! emits an [`AvatarEvent::VisualChanged`] whenever the projected visual
//! changes. Lookups run on spawned tasks bound to a child cancellation token,
//! so a torn-down session never sees a late completion.

use std::sync::Arc;

use anyhow::Result;
use avatarkit_api::{ImageProbe, JsonFetcher};
use avatarkit_types::{IdentityHints, ProviderKind, ResolvedVisual};
use avatarkit_util::ColorSelector;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender, unbounded_channel};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use super::state::{AttemptState, LookupTicket, ResolutionContext, ResolutionPhase, TicketId, Trigger, UrlSource, transition};
use crate::provider::{ProviderChain, ProviderSettings};
use crate::visual::project_visual;

/// Messages a renderer sends to a running session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AvatarControl {
    /// The image at `url` failed to load.
    LoadFailed { url: String },
    /// The caller replaced the hints.
    HintsChanged(IdentityHints),
    /// The avatar is gone; stop and drop pending lookups.
    Teardown,
}

/// Messages a running session sends to its renderer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AvatarEvent {
    LookupStarted { provider: ProviderKind, url: String },
    VisualChanged { visual: ResolvedVisual, phase: ResolutionPhase },
}

#[derive(Debug)]
struct LookupCompletion {
    ticket: TicketId,
    url: Option<String>,
}

impl LookupCompletion {
    fn into_trigger(self) -> Trigger {
        match self.url {
            Some(url) => Trigger::LookupSucceeded { ticket: self.ticket, url },
            None => Trigger::LookupFailed { ticket: self.ticket },
        }
    }
}

/// Resolves avatars against a provider chain and a network fetcher.
#[derive(Clone)]
pub struct AvatarResolver {
    chain: Arc<ProviderChain>,
    settings: ProviderSettings,
    fetcher: Arc<dyn JsonFetcher>,
}

impl std::fmt::Debug for AvatarResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AvatarResolver")
            .field("chain", &self.chain)
            .field("settings", &self.settings)
            .finish()
    }
}

impl AvatarResolver {
    /// Resolver over the standard provider chain.
    pub fn new(fetcher: Arc<dyn JsonFetcher>, settings: ProviderSettings) -> Self {
        Self {
            chain: ProviderChain::standard(),
            settings,
            fetcher,
        }
    }

    pub fn settings(&self) -> &ProviderSettings {
        &self.settings
    }

    fn context<'a>(&'a self, hints: &'a IdentityHints) -> ResolutionContext<'a> {
        ResolutionContext {
            hints,
            chain: &self.chain,
            settings: &self.settings,
        }
    }

    /// Walk the chain until it settles, awaiting lookups inline.
    ///
    /// Without renderer feedback the first candidate URL wins.
    pub async fn resolve(&self, hints: &IdentityHints, colors: &mut dyn ColorSelector) -> ResolvedVisual {
        self.resolve_with_probe(hints, colors, None).await
    }

    /// Like [`resolve`](Self::resolve), but every candidate URL is checked with
    /// `probe` and a failed probe is treated as an image-load failure.
    pub async fn resolve_with_probe(
        &self,
        hints: &IdentityHints,
        colors: &mut dyn ColorSelector,
        probe: Option<&dyn ImageProbe>,
    ) -> ResolvedVisual {
        let context = self.context(hints);
        let mut step = transition(&AttemptState::default(), &context, Trigger::Mount);

        loop {
            if let Some(ticket) = step.lookup.take() {
                let completion = perform_lookup(self.fetcher.as_ref(), &self.chain, &ticket).await;
                step = transition(&step.state, &context, completion.into_trigger());
                continue;
            }

            let (Some(probe), Some(url)) = (probe, step.state.resolved_url()) else {
                break;
            };
            match probe.probe(url).await {
                Ok(()) => break,
                Err(error) => {
                    debug!(%url, error = %error, "image probe failed");
                    let url = url.to_string();
                    step = transition(&step.state, &context, Trigger::LoadFailed { url });
                }
            }
        }

        project_visual(&step.state, hints, &colors.select())
    }

    /// Drive one avatar session until teardown.
    ///
    /// The session ends on [`AvatarControl::Teardown`], when the control
    /// channel closes, when the event receiver is dropped, or when
    /// `cancellation` fires. Pending lookups are cancelled on the way out.
    pub async fn drive(
        &self,
        mut hints: IdentityHints,
        colors: &mut dyn ColorSelector,
        mut control_rx: UnboundedReceiver<AvatarControl>,
        event_tx: UnboundedSender<AvatarEvent>,
        cancellation: CancellationToken,
    ) -> Result<()> {
        let session = cancellation.child_token();
        let background = colors.select();
        let (completion_tx, mut completion_rx) = unbounded_channel::<LookupCompletion>();
        let mut state = AttemptState::default();
        let mut next_trigger = Some(Trigger::Mount);
        // Source is part of the key so a retry that lands on an identical URL is still reported.
        let mut last_emitted: Option<(ResolvedVisual, Option<UrlSource>)> = None;
        let mut in_flight: Option<(TicketId, CancellationToken)> = None;

        loop {
            if let Some(trigger) = next_trigger.take() {
                let completed = completed_ticket(&trigger);
                let step = transition(&state, &self.context(&hints), trigger);
                state = step.state;

                let pending_ticket = state.pending().map(|pending| pending.ticket);
                if let Some((ticket, token)) = in_flight.take_if(|(ticket, _)| pending_ticket != Some(*ticket)) {
                    if completed != Some(ticket) {
                        debug!(ticket = ticket.value(), "cancelling superseded lookup");
                    }
                    token.cancel();
                }

                if let Some(ticket) = step.lookup {
                    let started = AvatarEvent::LookupStarted {
                        provider: ticket.provider,
                        url: ticket.url.clone(),
                    };
                    if event_tx.send(started).is_err() {
                        break;
                    }
                    let token = session.child_token();
                    in_flight = Some((ticket.id, token.clone()));
                    self.spawn_lookup(ticket, completion_tx.clone(), token);
                }

                let visual = project_visual(&state, &hints, &background);
                let key = (visual, state.resolved_by());
                if last_emitted.as_ref() != Some(&key) {
                    let visual = key.0.clone();
                    last_emitted = Some(key);
                    let changed = AvatarEvent::VisualChanged {
                        visual,
                        phase: state.phase(),
                    };
                    if event_tx.send(changed).is_err() {
                        debug!("renderer dropped its event receiver");
                        break;
                    }
                }
            }

            tokio::select! {
                biased;
                _ = session.cancelled() => break,
                Some(completion) = completion_rx.recv() => next_trigger = Some(completion.into_trigger()),
                control = control_rx.recv() => match control {
                    Some(AvatarControl::LoadFailed { url }) => next_trigger = Some(Trigger::LoadFailed { url }),
                    Some(AvatarControl::HintsChanged(next)) => {
                        let previous = std::mem::replace(&mut hints, next);
                        next_trigger = Some(Trigger::HintsChanged { previous });
                    }
                    Some(AvatarControl::Teardown) | None => break,
                },
            }
        }

        session.cancel();
        debug!(tried = ?state.tried_providers(), "avatar session finished");
        Ok(())
    }

    fn spawn_lookup(&self, ticket: LookupTicket, completion_tx: UnboundedSender<LookupCompletion>, token: CancellationToken) {
        let fetcher = Arc::clone(&self.fetcher);
        let chain = Arc::clone(&self.chain);

        tokio::spawn(async move {
            let completion = tokio::select! {
                _ = token.cancelled() => {
                    debug!(provider = %ticket.provider, "lookup cancelled");
                    return;
                }
                completion = perform_lookup(fetcher.as_ref(), &chain, &ticket) => completion,
            };
            if token.is_cancelled() {
                return;
            }
            let _ = completion_tx.send(completion);
        });
    }
}

fn completed_ticket(trigger: &Trigger) -> Option<TicketId> {
    match trigger {
        Trigger::LookupSucceeded { ticket, .. } | Trigger::LookupFailed { ticket } => Some(*ticket),
        _ => None,
    }
}

async fn perform_lookup(fetcher: &dyn JsonFetcher, chain: &ProviderChain, ticket: &LookupTicket) -> LookupCompletion {
    let url = match fetcher.fetch_json(&ticket.url).await {
        Ok(body) => chain
            .provider(ticket.provider)
            .and_then(|provider| provider.extract_candidate(&body, ticket.size_px)),
        Err(error) => {
            warn!(provider = %ticket.provider, url = %ticket.url, error = %error, "lookup failed");
            None
        }
    };
    LookupCompletion { ticket: ticket.id, url }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use avatarkit_api::FetchError;
    use avatarkit_util::FixedColorSelector;
    use serde_json::{Value, json};
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::time::Duration;

    struct ThumbnailFetcher;

    #[async_trait]
    impl JsonFetcher for ThumbnailFetcher {
        async fn fetch_json(&self, _url: &str) -> Result<Value, FetchError> {
            Ok(json!({ "entry": { "gphoto$thumbnail": { "$t": "https://lh3.example.com/s64/me.jpg" } } }))
        }
    }

    struct UnreachableNetwork;

    #[async_trait]
    impl JsonFetcher for UnreachableNetwork {
        async fn fetch_json(&self, _url: &str) -> Result<Value, FetchError> {
            Err(FetchError::Status(503))
        }
    }

    struct SetOnDrop(Arc<AtomicBool>);

    impl Drop for SetOnDrop {
        fn drop(&mut self) {
            self.0.store(true, Ordering::SeqCst);
        }
    }

    /// Never answers; records when its in-flight future is dropped.
    struct StalledFetcher {
        dropped: Arc<AtomicBool>,
    }

    #[async_trait]
    impl JsonFetcher for StalledFetcher {
        async fn fetch_json(&self, _url: &str) -> Result<Value, FetchError> {
            let _guard = SetOnDrop(Arc::clone(&self.dropped));
            std::future::pending::<()>().await;
            Err(FetchError::Status(0))
        }
    }

    async fn next_visual(event_rx: &mut UnboundedReceiver<AvatarEvent>) -> Option<(ResolvedVisual, ResolutionPhase)> {
        while let Some(event) = event_rx.recv().await {
            if let AvatarEvent::VisualChanged { visual, phase } = event {
                return Some((visual, phase));
            }
        }
        None
    }

    #[tokio::test]
    async fn load_failure_control_advances_to_next_provider() {
        let resolver = AvatarResolver::new(Arc::new(UnreachableNetwork), ProviderSettings::default());
        let hints = IdentityHints {
            email: Some("ada@example.org".into()),
            ..IdentityHints::default()
        };
        let (control_tx, control_rx) = unbounded_channel();
        let (event_tx, mut event_rx) = unbounded_channel();
        let mut colors = FixedColorSelector("#000000".into());

        let script = async move {
            let (first, _) = next_visual(&mut event_rx).await.expect("first visual");
            let url = first.image_url().expect("gravatar url").to_string();
            control_tx.send(AvatarControl::LoadFailed { url }).expect("send load failure");
            let (second, phase) = next_visual(&mut event_rx).await.expect("second visual");
            control_tx.send(AvatarControl::Teardown).expect("send teardown");
            (first, second, phase)
        };

        let (result, (first, second, phase)) =
            tokio::join!(resolver.drive(hints, &mut colors, control_rx, event_tx, CancellationToken::new()), script);
        result.expect("drive");
        assert!(first.image_url().expect("first url").contains("gravatar.com"));
        assert_eq!(second.image_url(), Some("https://secure.logo.clearbit.com/example.org"));
        assert_eq!(phase, ResolutionPhase::SettledImage);
    }

    #[tokio::test]
    async fn lookup_completion_resolves_thumbnail() {
        let resolver = AvatarResolver::new(Arc::new(ThumbnailFetcher), ProviderSettings::default());
        let hints = IdentityHints {
            google_id: Some("118".into()),
            target_size_px: 96,
            ..IdentityHints::default()
        };
        let (control_tx, control_rx) = unbounded_channel();
        let (event_tx, mut event_rx) = unbounded_channel();
        let mut colors = FixedColorSelector("#000000".into());

        let script = async move {
            let mut events = Vec::new();
            while let Some(event) = event_rx.recv().await {
                let settled = matches!(&event, AvatarEvent::VisualChanged { phase: ResolutionPhase::SettledImage, .. });
                events.push(event);
                if settled {
                    break;
                }
            }
            control_tx.send(AvatarControl::Teardown).expect("send teardown");
            events
        };

        let (result, events) = tokio::join!(resolver.drive(hints, &mut colors, control_rx, event_tx, CancellationToken::new()), script);
        result.expect("drive");
        assert_eq!(
            events.first(),
            Some(&AvatarEvent::LookupStarted {
                provider: ProviderKind::Google,
                url: "https://picasaweb.google.com/data/entry/api/user/118?alt=json".into(),
            })
        );
        match events.last() {
            Some(AvatarEvent::VisualChanged { visual, .. }) => {
                assert_eq!(visual.image_url(), Some("https://lh3.example.com/s96/me.jpg"));
            }
            other => panic!("expected settled visual, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn teardown_cancels_pending_lookup() {
        let dropped = Arc::new(AtomicBool::new(false));
        let fetcher = StalledFetcher {
            dropped: Arc::clone(&dropped),
        };
        let resolver = AvatarResolver::new(Arc::new(fetcher), ProviderSettings::default());
        let hints = IdentityHints {
            google_id: Some("118".into()),
            display_name: Some("Ada Lovelace".into()),
            ..IdentityHints::default()
        };
        let (control_tx, control_rx) = unbounded_channel();
        let (event_tx, mut event_rx) = unbounded_channel();
        let mut colors = FixedColorSelector("#000000".into());

        let script = async move {
            let (visual, phase) = next_visual(&mut event_rx).await.expect("initial visual");
            control_tx.send(AvatarControl::Teardown).expect("send teardown");
            let mut remaining = Vec::new();
            while let Some(event) = event_rx.recv().await {
                remaining.push(event);
            }
            (visual, phase, remaining)
        };

        let (result, (visual, phase, remaining)) =
            tokio::join!(resolver.drive(hints, &mut colors, control_rx, event_tx, CancellationToken::new()), script);
        result.expect("drive");
        assert_eq!(phase, ResolutionPhase::Trying(ProviderKind::Google));
        assert!(visual.is_transparent());
        assert!(remaining.is_empty());

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(dropped.load(Ordering::SeqCst), "stalled lookup should be dropped after teardown");
    }

    #[tokio::test]
    async fn parent_cancellation_ends_session() {
        let resolver = AvatarResolver::new(Arc::new(UnreachableNetwork), ProviderSettings::default());
        let (_control_tx, control_rx) = unbounded_channel();
        let (event_tx, mut event_rx) = unbounded_channel();
        let mut colors = FixedColorSelector("#000000".into());
        let token = CancellationToken::new();
        token.cancel();

        resolver
            .drive(IdentityHints::default(), &mut colors, control_rx, event_tx, token)
            .await
            .expect("drive");

        let (visual, phase) = next_visual(&mut event_rx).await.expect("initial visual");
        assert_eq!(phase, ResolutionPhase::SettledInitials);
        assert!(visual.is_transparent());
        assert!(event_rx.recv().await.is_none());
    }

    #[tokio::test]
    async fn name_change_updates_initials() {
        let resolver = AvatarResolver::new(Arc::new(UnreachableNetwork), ProviderSettings::default());
        let hints = IdentityHints {
            display_name: Some("Ada Lovelace".into()),
            ..IdentityHints::default()
        };
        let renamed = IdentityHints {
            display_name: Some("Grace Hopper".into()),
            ..hints.clone()
        };
        let (control_tx, control_rx) = unbounded_channel();
        let (event_tx, mut event_rx) = unbounded_channel();
        let mut colors = FixedColorSelector("#7e3794".into());

        let script = async move {
            let (first, _) = next_visual(&mut event_rx).await.expect("first visual");
            control_tx.send(AvatarControl::HintsChanged(renamed)).expect("send hints");
            let (second, _) = next_visual(&mut event_rx).await.expect("second visual");
            drop(control_tx);
            (first, second)
        };

        let (result, (first, second)) =
            tokio::join!(resolver.drive(hints, &mut colors, control_rx, event_tx, CancellationToken::new()), script);
        result.expect("drive");
        assert_eq!(first.initials_text(), Some("AL"));
        assert_eq!(second.initials_text(), Some("GH"));
        match second {
            ResolvedVisual::Initials { background_color, .. } => assert_eq!(background_color, "#7e3794"),
            other => panic!("expected initials, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn explicit_url_change_emits_new_image() {
        let resolver = AvatarResolver::new(Arc::new(UnreachableNetwork), ProviderSettings::default());
        let hints = IdentityHints {
            display_name: Some("Ada Lovelace".into()),
            ..IdentityHints::default()
        };
        let with_url = IdentityHints {
            explicit_image_url: Some("https://cdn.example/<size>/ada.png".into()),
            ..hints.clone()
        };
        let (control_tx, control_rx) = unbounded_channel();
        let (event_tx, mut event_rx) = unbounded_channel();
        let mut colors = FixedColorSelector("#000000".into());

        let script = async move {
            let (first, _) = next_visual(&mut event_rx).await.expect("first visual");
            control_tx.send(AvatarControl::HintsChanged(with_url)).expect("send hints");
            let (second, phase) = next_visual(&mut event_rx).await.expect("second visual");
            control_tx.send(AvatarControl::Teardown).expect("send teardown");
            (first, second, phase)
        };

        let (result, (first, second, phase)) =
            tokio::join!(resolver.drive(hints, &mut colors, control_rx, event_tx, CancellationToken::new()), script);
        result.expect("drive");
        assert_eq!(first.initials_text(), Some("AL"));
        assert_eq!(second.image_url(), Some("https://cdn.example/32/ada.png"));
        assert_eq!(phase, ResolutionPhase::SettledImage);
    }

    #[tokio::test]
    async fn superseded_lookup_is_cancelled_before_teardown() {
        let dropped = Arc::new(AtomicBool::new(false));
        let fetcher = StalledFetcher {
            dropped: Arc::clone(&dropped),
        };
        let resolver = AvatarResolver::new(Arc::new(fetcher), ProviderSettings::default());
        let hints = IdentityHints {
            google_id: Some("118".into()),
            ..IdentityHints::default()
        };
        let with_url = IdentityHints {
            explicit_image_url: Some("https://cdn.example/me.png".into()),
            ..hints.clone()
        };
        let (control_tx, control_rx) = unbounded_channel();
        let (event_tx, mut event_rx) = unbounded_channel();
        let mut colors = FixedColorSelector("#000000".into());
        let observed = Arc::clone(&dropped);

        let script = async move {
            let (_, phase) = next_visual(&mut event_rx).await.expect("initial visual");
            assert_eq!(phase, ResolutionPhase::Trying(ProviderKind::Google));
            control_tx.send(AvatarControl::HintsChanged(with_url)).expect("send hints");
            let (visual, _) = next_visual(&mut event_rx).await.expect("overridden visual");
            tokio::time::sleep(Duration::from_millis(20)).await;
            let dropped_while_live = observed.load(Ordering::SeqCst);
            control_tx.send(AvatarControl::Teardown).expect("send teardown");
            (visual, dropped_while_live)
        };

        let (result, (visual, dropped_while_live)) =
            tokio::join!(resolver.drive(hints, &mut colors, control_rx, event_tx, CancellationToken::new()), script);
        result.expect("drive");
        assert_eq!(visual.image_url(), Some("https://cdn.example/me.png"));
        assert!(dropped_while_live, "lookup replaced by an explicit URL should stop while the session is live");
    }
}
