//! Dependency overrides consulted by the request scope.
//!
//! Entries are keyed either by protocol or by provider identity. The route
//! table only ever consults provider keys; `Container::merge_overrides`
//! turns resolvable protocol keys into provider keys and folds a secondary
//! container in.

use std::collections::HashMap;

use crate::implementation::Implementation;
use crate::key::Key;
use crate::lifetime::Lifetime;
use crate::provider::Provider;

/// Key of an override entry.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum OverrideKey {
    Protocol(Key),
    Provider(Provider),
}

impl OverrideKey {
    /// Override keyed by the protocol `P`, resolved at merge time.
    pub fn protocol<P: ?Sized + 'static>() -> Self {
        OverrideKey::Protocol(Key::of::<P>())
    }
}

impl From<Key> for OverrideKey {
    fn from(key: Key) -> Self {
        OverrideKey::Protocol(key)
    }
}

impl From<Provider> for OverrideKey {
    fn from(provider: Provider) -> Self {
        OverrideKey::Provider(provider)
    }
}

/// Replacement callable plus the lifetime it effectively runs with.
#[derive(Clone, Debug)]
pub struct OverrideEntry {
    pub replacement: Implementation,
    /// `None` until merged against a container.
    pub lifetime: Option<Lifetime>,
}

/// Override table installed on a route table.
///
/// ```rust
/// use ferrous_inject::{Implementation, OverrideKey, Overrides};
///
/// trait Clock: Send + Sync {}
///
/// let overrides = Overrides::new()
///     .with(OverrideKey::protocol::<dyn Clock>(), Implementation::instance(0u64));
/// assert_eq!(overrides.len(), 1);
/// ```
#[derive(Clone, Debug, Default)]
pub struct Overrides {
    entries: HashMap<OverrideKey, OverrideEntry>,
}

impl Overrides {
    /// Empty override set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces the override for `key`.
    pub fn insert(&mut self, key: impl Into<OverrideKey>, replacement: Implementation) {
        self.entries.insert(
            key.into(),
            OverrideEntry {
                replacement,
                lifetime: None,
            },
        );
    }

    /// Builder-style [`insert`](Self::insert).
    pub fn with(mut self, key: impl Into<OverrideKey>, replacement: Implementation) -> Self {
        self.insert(key, replacement);
        self
    }

    pub(crate) fn insert_entry(&mut self, key: OverrideKey, entry: OverrideEntry) {
        self.entries.insert(key, entry);
    }

    /// Override entry for `key`.
    pub fn get(&self, key: &OverrideKey) -> Option<&OverrideEntry> {
        self.entries.get(key)
    }

    /// Entry keyed by `provider`'s identity.
    pub fn entry_for(&self, provider: &Provider) -> Option<&OverrideEntry> {
        self.entries.get(&OverrideKey::Provider(provider.clone()))
    }

    /// Replacement for `provider`, looked up by identity.
    pub fn replacement_for(&self, provider: &Provider) -> Option<&Implementation> {
        self.entry_for(provider).map(|entry| &entry.replacement)
    }

    /// Whether an override is set for `key`.
    pub fn contains_key(&self, key: &OverrideKey) -> bool {
        self.entries.contains_key(key)
    }

    /// Number of overrides.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Overrides in arbitrary order.
    pub fn iter(&self) -> impl Iterator<Item = (&OverrideKey, &OverrideEntry)> {
        self.entries.iter()
    }
}

impl IntoIterator for Overrides {
    type Item = (OverrideKey, OverrideEntry);
    type IntoIter = std::collections::hash_map::IntoIter<OverrideKey, OverrideEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}
