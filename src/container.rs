//! The protocol registry.

use std::fmt;
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};

use crate::config::ContainerConfig;
use crate::dependency::{Dependency, DependencyDescriptor};
use crate::error::{DiError, DiResult};
use crate::hooks::{ContainerHooks, FnRegisterHook, FnResolveHook, Hooks};
use crate::implementation::{Implementation, ImplementationKind};
use crate::injector;
use crate::internal::DisposeBag;
use crate::key::Key;
use crate::lifetime::Lifetime;
use crate::overrides::{OverrideEntry, OverrideKey, Overrides};
use crate::provider::{build_provider, Provider};
use crate::routing::{DependencyItem, Injectable, Injectified};
use crate::scope::RequestScope;
use crate::signature::Signature;

#[cfg(feature = "ahash")]
type Map<K, V> = std::collections::HashMap<K, V, ahash::RandomState>;
#[cfg(not(feature = "ahash"))]
type Map<K, V> = std::collections::HashMap<K, V>;

#[derive(Clone)]
struct Entry {
    provider: Provider,
    lifetime: Lifetime,
    kind: ImplementationKind,
    injected_params: usize,
}

struct ContainerInner {
    registry: RwLock<Map<Key, Entry>>,
    hooks: RwLock<Hooks>,
    config: ContainerConfig,
    root_disposers: Mutex<DisposeBag>,
}

/// Registry of protocol implementations with lifetime-aware providers.
///
/// `Container` is a cheap handle: clones share the same registry. Every
/// registration runs the implementation through nested injection (its own
/// parameters are matched against what is already registered) and then
/// builds the provider for its lifetime. Register dependencies before the
/// services that use them.
///
/// # Examples
///
/// ```rust
/// use std::sync::Arc;
/// use ferrous_inject::{Arguments, Container, DiResult, Implementation, Lifetime, Parameter, RequestScope, Signature};
///
/// trait Repository: Send + Sync {
///     fn find(&self, id: u32) -> String;
/// }
///
/// struct InMemory;
/// impl Repository for InMemory {
///     fn find(&self, id: u32) -> String { format!("user-{}", id) }
/// }
///
/// struct UserService {
///     repo: Arc<dyn Repository>,
/// }
///
/// fn in_memory(_: &Arguments) -> DiResult<Arc<dyn Repository>> {
///     Ok(Arc::new(InMemory))
/// }
///
/// let container = Container::new();
/// container.add_singleton::<dyn Repository>(
///     Implementation::provides("InMemory", Signature::new(), in_memory),
/// )?;
/// container.add_scoped::<UserService>(Implementation::class(
///     Signature::new().param(Parameter::typed::<dyn Repository>("repo")),
///     |args| Ok(UserService { repo: args.get_trait::<dyn Repository>("repo")? }),
/// ))?;
///
/// let provider = container.resolve_type::<UserService>()?;
/// assert_eq!(provider.lifetime(), Some(Lifetime::Scoped));
///
/// let scope = RequestScope::detached();
/// let service = scope.resolve_as::<UserService>(&provider)?;
/// assert_eq!(service.repo.find(7), "user-7");
/// # Ok::<(), ferrous_inject::DiError>(())
/// ```
#[derive(Clone)]
pub struct Container {
    inner: Arc<ContainerInner>,
}

impl Container {
    /// Empty container with the default configuration.
    pub fn new() -> Self {
        Self::with_config(ContainerConfig::default())
    }

    /// Empty container using `config`.
    pub fn with_config(config: ContainerConfig) -> Self {
        Container {
            inner: Arc::new(ContainerInner {
                registry: RwLock::new(Map::default()),
                hooks: RwLock::new(Hooks::default()),
                config,
                root_disposers: Mutex::new(DisposeBag::default()),
            }),
        }
    }

    /// Active configuration.
    pub fn config(&self) -> &ContainerConfig {
        &self.inner.config
    }

    // ----- Registration -----

    /// Registers `implementation` for `protocol`.
    ///
    /// Hooks see the record first. A later registration of the same
    /// protocol replaces the earlier one.
    ///
    /// # Errors
    ///
    /// - `SingletonGenerator` for a generator registered as singleton
    /// - `LifetimeViolation` under `ViolationPolicy::Deny`
    /// - any error raised while constructing a singleton
    pub fn register(&self, protocol: Key, implementation: Implementation, lifetime: Lifetime) -> DiResult<()> {
        let hooks = self.hooks();
        let dependency = hooks.before_register(Dependency::new(protocol, implementation, lifetime));

        let implementation = injector::nested_inject(self, &dependency)?;
        let injected_params = implementation
            .signature()
            .params()
            .iter()
            .filter(|p| p.has_marker_default())
            .count();
        let kind = implementation.kind();

        let scope = RequestScope::detached();
        let built = build_provider(dependency.protocol, implementation, dependency.lifetime, &scope);
        self.adopt_teardowns(&scope);
        let provider = built?;

        tracing::debug!(
            protocol = dependency.protocol.display_name(),
            implementation = provider.name(),
            lifetime = %dependency.lifetime,
            "registered"
        );

        let previous = self.inner.registry.write().insert(
            dependency.protocol,
            Entry {
                provider,
                lifetime: dependency.lifetime,
                kind,
                injected_params,
            },
        );
        if previous.is_some() {
            tracing::debug!(protocol = dependency.protocol.display_name(), "registration replaced");
        }
        Ok(())
    }

    /// Moves teardowns collected while building a singleton into the
    /// container's own bag.
    fn adopt_teardowns(&self, scope: &RequestScope) {
        let mut captured = scope.take_disposers();
        if !captured.is_empty() {
            tracing::warn!(
                count = captured.len(),
                "singleton captured generator dependencies; teardown deferred to dispose_all"
            );
            self.inner.root_disposers.lock().append(&mut captured);
        }
    }

    /// Registers a singleton, constructed once right now.
    pub fn add_singleton<P: ?Sized + 'static>(&self, implementation: Implementation) -> DiResult<&Self> {
        self.register(Key::of::<P>(), implementation, Lifetime::Singleton)?;
        Ok(self)
    }

    /// Registers a request-scoped implementation.
    pub fn add_scoped<P: ?Sized + 'static>(&self, implementation: Implementation) -> DiResult<&Self> {
        self.register(Key::of::<P>(), implementation, Lifetime::Scoped)?;
        Ok(self)
    }

    /// Registers a factory: a new instance on every resolution.
    pub fn add_factory<P: ?Sized + 'static>(&self, implementation: Implementation) -> DiResult<&Self> {
        self.register(Key::of::<P>(), implementation, Lifetime::Factory)?;
        Ok(self)
    }

    /// Alias for [`Container::add_factory`].
    pub fn add_transient<P: ?Sized + 'static>(&self, implementation: Implementation) -> DiResult<&Self> {
        self.add_factory::<P>(implementation)
    }

    // ----- Lookup -----

    /// Fails with `NotRegistered` if `protocol` has no registration.
    pub fn check_registered(&self, protocol: &Key) -> DiResult<()> {
        if self.is_registered(protocol) {
            Ok(())
        } else {
            Err(DiError::NotRegistered(protocol.display_name()))
        }
    }

    /// [`check_registered`](Self::check_registered) for the type `P`.
    pub fn check_registered_type<P: ?Sized + 'static>(&self) -> DiResult<()> {
        self.check_registered(&Key::of::<P>())
    }

    /// Provider registered for `protocol`, after the resolve hooks.
    pub fn resolve(&self, protocol: &Key) -> DiResult<Provider> {
        let provider = self
            .inner
            .registry
            .read()
            .get(protocol)
            .map(|entry| entry.provider.clone())
            .ok_or(DiError::NotRegistered(protocol.display_name()))?;

        let hooks = self.hooks();
        if hooks.is_empty() {
            return Ok(provider);
        }
        Ok(hooks.before_resolve(provider))
    }

    /// Provider registered for the type `P`.
    pub fn resolve_type<P: ?Sized + 'static>(&self) -> DiResult<Provider> {
        self.resolve(&Key::of::<P>())
    }

    /// Whether `protocol` has a registration.
    pub fn is_registered(&self, protocol: &Key) -> bool {
        self.inner.registry.read().contains_key(protocol)
    }

    /// Lifetime `protocol` was registered with.
    pub fn lifetime_of(&self, protocol: &Key) -> Option<Lifetime> {
        self.inner.registry.read().get(protocol).map(|entry| entry.lifetime)
    }

    /// Number of registered protocols.
    pub fn len(&self) -> usize {
        self.inner.registry.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.registry.read().is_empty()
    }

    /// Every registration, sorted by protocol name.
    pub fn descriptors(&self) -> Vec<DependencyDescriptor> {
        let mut descriptors: Vec<_> = self
            .inner
            .registry
            .read()
            .iter()
            .map(|(protocol, entry)| DependencyDescriptor {
                protocol: *protocol,
                lifetime: entry.lifetime,
                implementation_name: entry.provider.name(),
                implementation_kind: entry.kind,
                injected_params: entry.injected_params,
            })
            .collect();
        descriptors.sort_by_key(|d| d.protocol.display_name());
        descriptors
    }

    fn entries(&self) -> Vec<(Key, Provider, Lifetime)> {
        self.inner
            .registry
            .read()
            .iter()
            .map(|(key, entry)| (*key, entry.provider.clone(), entry.lifetime))
            .collect()
    }

    // ----- Hooks -----

    /// Installs hooks; they run after any installed earlier.
    pub fn add_hooks(&self, hooks: Arc<dyn ContainerHooks>) {
        self.inner.hooks.write().add(hooks);
    }

    /// Installs a closure as a before-register hook.
    pub fn on_before_register<F>(&self, hook: F)
    where
        F: Fn(Dependency) -> Dependency + Send + Sync + 'static,
    {
        self.add_hooks(Arc::new(FnRegisterHook(hook)));
    }

    /// Installs a closure as a before-resolve hook.
    pub fn on_before_resolve<F>(&self, hook: F)
    where
        F: Fn(Provider) -> Provider + Send + Sync + 'static,
    {
        self.add_hooks(Arc::new(FnResolveHook(hook)));
    }

    /// Number of installed registration hooks.
    pub fn hook_count(&self) -> usize {
        self.inner.hooks.read().len()
    }

    // Snapshot so hooks may call back into the container.
    fn hooks(&self) -> Hooks {
        self.inner.hooks.read().clone()
    }

    // ----- Injection -----

    /// Rewrites an endpoint or implementation signature against the
    /// registry, filling in provider defaults.
    pub fn inject_signature(&self, signature: &Signature) -> Signature {
        injector::inject_signature(self, signature).0
    }

    /// Resolves one route-level dependency entry.
    ///
    /// Markers and callables pass through unchanged; registered protocols
    /// become their provider; unregistered protocols are returned as-is.
    pub fn inject_dependency(&self, item: DependencyItem) -> DependencyItem {
        match item {
            DependencyItem::Protocol(key) => match self.resolve(&key) {
                Ok(provider) => DependencyItem::Marker(provider),
                Err(_) => {
                    if self.inner.config.warn_unresolved_dependencies {
                        tracing::warn!(
                            protocol = key.display_name(),
                            "route dependency is not registered; passing it through"
                        );
                    }
                    DependencyItem::Protocol(key)
                }
            },
            other => other,
        }
    }

    /// Resolves a whole dependency list, preserving order.
    pub fn process_dependencies(&self, items: Vec<DependencyItem>) -> Vec<DependencyItem> {
        items
            .into_iter()
            .map(|item| self.inject_dependency(item))
            .collect()
    }

    /// Attaches this container to a route registrar.
    ///
    /// Injectifying an already wrapped registrar swaps its container and
    /// returns the same wrapper rather than nesting a new one.
    pub fn injectify<T: Injectable>(&self, target: T) -> Injectified<T::Registrar> {
        target.injectify(self)
    }

    // ----- Overrides -----

    /// Builds an override table keyed by provider identity.
    ///
    /// Protocol keys registered here are replaced by their provider;
    /// anything else is kept. When `secondary` is given, every protocol it
    /// shares with this container is overridden by the secondary's
    /// callable, keeping this container's cache flag. The resulting
    /// lifetime is recorded per entry (see [`Lifetime::reconcile`]).
    ///
    /// ```rust
    /// use ferrous_inject::{Container, Implementation, Lifetime, OverrideKey, Overrides};
    ///
    /// struct Clock(u64);
    ///
    /// let app = Container::new();
    /// app.add_singleton::<Clock>(Implementation::instance(Clock(1)))?;
    ///
    /// let mocks = Container::new();
    /// mocks.add_factory::<Clock>(Implementation::instance(Clock(2)))?;
    ///
    /// let merged = app.merge_overrides(Overrides::new(), Some(&mocks));
    /// let primary = app.resolve_type::<Clock>()?;
    /// let entry = merged.get(&OverrideKey::Provider(primary)).unwrap();
    /// assert_eq!(entry.lifetime, Some(Lifetime::Scoped));
    /// # Ok::<(), ferrous_inject::DiError>(())
    /// ```
    pub fn merge_overrides(&self, overrides: Overrides, secondary: Option<&Container>) -> Overrides {
        let mut merged = Overrides::new();

        for (key, mut entry) in overrides {
            let key = match key {
                OverrideKey::Protocol(protocol) => match self.resolve(&protocol) {
                    Ok(provider) => {
                        entry.lifetime = provider.lifetime();
                        OverrideKey::Provider(provider)
                    }
                    Err(_) => OverrideKey::Protocol(protocol),
                },
                OverrideKey::Provider(provider) => {
                    entry.lifetime = entry.lifetime.or(provider.lifetime());
                    OverrideKey::Provider(provider)
                }
            };
            merged.insert_entry(key, entry);
        }

        if let Some(secondary) = secondary {
            for (protocol, replacement, secondary_lifetime) in secondary.entries() {
                let Ok(primary) = self.resolve(&protocol) else {
                    continue;
                };
                let lifetime = primary
                    .lifetime()
                    .map(|primary_lifetime| Lifetime::reconcile(primary_lifetime, secondary_lifetime));
                tracing::debug!(
                    protocol = protocol.display_name(),
                    replacement = replacement.name(),
                    lifetime = ?lifetime,
                    "override from secondary container"
                );
                merged.insert_entry(
                    OverrideKey::Provider(primary),
                    OverrideEntry {
                        replacement: replacement.implementation().clone(),
                        lifetime,
                    },
                );
            }
        }

        merged
    }

    // ----- Disposal -----

    /// Runs teardowns of generator dependencies captured by singletons
    /// during registration.
    pub async fn dispose_all(&self) {
        let mut bag = std::mem::take(&mut *self.inner.root_disposers.lock());
        bag.dispose().await;
    }

    /// Teardowns waiting for [`dispose_all`](Self::dispose_all).
    pub fn pending_teardowns(&self) -> usize {
        self.inner.root_disposers.lock().len()
    }
}

impl Default for Container {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Container {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Container")
            .field("registrations", &self.len())
            .field("hooks", &self.hook_count())
            .field("config", &self.inner.config)
            .finish()
    }
}
