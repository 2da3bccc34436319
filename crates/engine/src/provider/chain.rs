use std::{fmt, sync::Arc};

use avatarkit_types::{HintField, ProviderKind};
use once_cell::sync::Lazy;

use super::{ClearbitProvider, FacebookProvider, GoogleProvider, GravatarProvider, IdentityProvider, SkypeProvider};

static STANDARD_CHAIN: Lazy<Arc<ProviderChain>> = Lazy::new(|| {
    Arc::new(ProviderChain::new(vec![
        Box::new(FacebookProvider),
        Box::new(GoogleProvider),
        Box::new(SkypeProvider),
        Box::new(GravatarProvider),
        Box::new(ClearbitProvider),
    ]))
});

/// Static description of one chain position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChainEntry {
    pub kind: ProviderKind,
    pub required_hint: HintField,
    pub synchronous: bool,
}

/// Providers in the order the resolver tries them, shared process-wide.
pub struct ProviderChain {
    providers: Vec<Box<dyn IdentityProvider>>,
}

impl fmt::Debug for ProviderChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.entries()).finish()
    }
}

impl ProviderChain {
    fn new(providers: Vec<Box<dyn IdentityProvider>>) -> Self {
        Self { providers }
    }

    /// Facebook, Google, Skype, Gravatar, then Clearbit.
    pub fn standard() -> Arc<ProviderChain> {
        Arc::clone(&STANDARD_CHAIN)
    }

    pub fn iter(&self) -> impl Iterator<Item = &dyn IdentityProvider> {
        self.providers.iter().map(|provider| provider.as_ref())
    }

    pub fn provider(&self, kind: ProviderKind) -> Option<&dyn IdentityProvider> {
        self.iter().find(|provider| provider.kind() == kind)
    }

    pub fn entries(&self) -> Vec<ChainEntry> {
        self.iter()
            .map(|provider| ChainEntry {
                kind: provider.kind(),
                required_hint: provider.required_hint(),
                synchronous: provider.is_synchronous(),
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.providers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }
}
