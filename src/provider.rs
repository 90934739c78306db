//! Lifetime-aware providers and the provider builder.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::error::{DiError, DiResult};
use crate::implementation::{Implementation, Produced};
use crate::key::Key;
use crate::lifetime::Lifetime;
use crate::scope::RequestScope;
use crate::signature::Signature;

static NEXT_PROVIDER_ID: AtomicU64 = AtomicU64::new(1);

/// Identity of a provider; the request-scope cache is keyed by it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ProviderId(u64);

impl ProviderId {
    fn next() -> Self {
        ProviderId(NEXT_PROVIDER_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Raw numeric id.
    pub fn get(self) -> u64 {
        self.0
    }
}

struct ProviderInner {
    id: ProviderId,
    implementation: Implementation,
    use_cache: bool,
    lifetime: Option<Lifetime>,
    protocol: Option<Key>,
}

/// Marker the host invokes to obtain an instance.
///
/// Cloning shares identity: clones compare equal and hit the same cache
/// slot. Two providers built from the same implementation are distinct.
///
/// # Examples
///
/// ```rust
/// use ferrous_inject::{Implementation, Provider, Signature};
///
/// let current_user = Implementation::function("current_user", Signature::new(), |_| Ok("ferris".to_string()));
/// let marker = Provider::new(current_user.clone(), true);
///
/// assert_eq!(marker, marker.clone());
/// assert_ne!(marker, Provider::new(current_user, true));
/// assert!(marker.lifetime().is_none());
/// ```
#[derive(Clone)]
pub struct Provider {
    inner: Arc<ProviderInner>,
}

impl Provider {
    /// Host marker around `implementation`, outside any registry.
    pub fn new(implementation: Implementation, use_cache: bool) -> Self {
        Self::build(implementation, use_cache, None, None)
    }

    pub(crate) fn registered(protocol: Key, implementation: Implementation, lifetime: Lifetime) -> Self {
        Self::build(implementation, lifetime.use_cache(), Some(lifetime), Some(protocol))
    }

    fn build(
        implementation: Implementation,
        use_cache: bool,
        lifetime: Option<Lifetime>,
        protocol: Option<Key>,
    ) -> Self {
        Provider {
            inner: Arc::new(ProviderInner {
                id: ProviderId::next(),
                implementation,
                use_cache,
                lifetime,
                protocol,
            }),
        }
    }

    /// Identity used for override lookup and scope caching.
    pub fn id(&self) -> ProviderId {
        self.inner.id
    }

    /// The callable this provider resolves through.
    pub fn implementation(&self) -> &Implementation {
        &self.inner.implementation
    }

    /// Signature of the wrapped implementation.
    pub fn signature(&self) -> &Signature {
        self.inner.implementation.signature()
    }

    /// Name of the wrapped implementation.
    pub fn name(&self) -> &'static str {
        self.inner.implementation.name()
    }

    /// Whether the request scope caches this provider's result.
    pub fn use_cache(&self) -> bool {
        self.inner.use_cache
    }

    /// Registered lifetime; `None` for host markers built with `new`.
    pub fn lifetime(&self) -> Option<Lifetime> {
        self.inner.lifetime
    }

    /// Protocol this provider was registered for.
    pub fn protocol(&self) -> Option<Key> {
        self.inner.protocol
    }
}

impl PartialEq for Provider {
    fn eq(&self, other: &Self) -> bool {
        self.inner.id == other.inner.id
    }
}

impl Eq for Provider {}

impl Hash for Provider {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.inner.id.hash(state);
    }
}

impl fmt::Debug for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Provider")
            .field("id", &self.inner.id.0)
            .field("implementation", &self.name())
            .field("use_cache", &self.inner.use_cache)
            .field("lifetime", &self.inner.lifetime)
            .finish()
    }
}

/// Builds the provider stored in the registry for a rewritten
/// implementation.
///
/// Singletons are constructed here, once, with their parameters bound
/// through `scope`; the result is wrapped in a constant provider.
/// Scoped and factory implementations are wrapped as-is.
pub(crate) fn build_provider(
    protocol: Key,
    implementation: Implementation,
    lifetime: Lifetime,
    scope: &RequestScope,
) -> DiResult<Provider> {
    match lifetime {
        Lifetime::Singleton => {
            if implementation.is_generator() {
                return Err(DiError::SingletonGenerator(implementation.name()));
            }

            let args = scope.bind(implementation.name(), implementation.signature())?;
            let instance = match implementation.invoke(&args)? {
                Produced::Value(instance) => instance,
                Produced::Generator(..) => {
                    return Err(DiError::SingletonGenerator(implementation.name()))
                }
            };
            tracing::debug!(
                protocol = protocol.display_name(),
                implementation = implementation.name(),
                "singleton constructed"
            );

            let constant = Implementation::constant(implementation.name(), instance);
            Ok(Provider::registered(protocol, constant, lifetime))
        }
        Lifetime::Scoped | Lifetime::Factory => {
            Ok(Provider::registered(protocol, implementation, lifetime))
        }
    }
}
