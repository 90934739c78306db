//! Registration and resolution hooks.
//!
//! Hooks see every dependency record before it is registered and every
//! provider before it is handed out by `Container::resolve`. Both default
//! methods pass their input through unchanged, so an implementation only
//! overrides what it cares about. Returning a different value replaces the
//! original.

use std::sync::Arc;

use crate::dependency::Dependency;
use crate::provider::Provider;

/// Interception points on the container.
///
/// # Examples
///
/// ```rust
/// use ferrous_inject::{ContainerHooks, Dependency, Lifetime};
///
/// /// Downgrades every registration to factory lifetime.
/// struct AlwaysFresh;
///
/// impl ContainerHooks for AlwaysFresh {
///     fn before_register(&self, dependency: Dependency) -> Dependency {
///         dependency.with_lifetime(Lifetime::Factory)
///     }
/// }
/// ```
pub trait ContainerHooks: Send + Sync {
    fn before_register(&self, dependency: Dependency) -> Dependency {
        dependency
    }

    fn before_resolve(&self, provider: Provider) -> Provider {
        provider
    }
}

/// Emits an `info` event for every registration and resolution.
pub struct LoggingHooks {
    prefix: String,
}

impl LoggingHooks {
    /// Hooks logging under the `ferrous-inject` prefix.
    pub fn new() -> Self {
        Self {
            prefix: "ferrous-inject".to_string(),
        }
    }

    /// Hooks logging under a custom prefix.
    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }
}

impl Default for LoggingHooks {
    fn default() -> Self {
        Self::new()
    }
}

impl ContainerHooks for LoggingHooks {
    fn before_register(&self, dependency: Dependency) -> Dependency {
        tracing::info!(
            target: "ferrous_inject::hooks",
            prefix = %self.prefix,
            protocol = dependency.protocol.display_name(),
            implementation = dependency.implementation.name(),
            lifetime = %dependency.lifetime,
            "registering"
        );
        dependency
    }

    fn before_resolve(&self, provider: Provider) -> Provider {
        tracing::info!(
            target: "ferrous_inject::hooks",
            prefix = %self.prefix,
            provider = provider.name(),
            use_cache = provider.use_cache(),
            "resolving"
        );
        provider
    }
}

pub(crate) struct FnRegisterHook<F>(pub(crate) F);

impl<F> ContainerHooks for FnRegisterHook<F>
where
    F: Fn(Dependency) -> Dependency + Send + Sync,
{
    fn before_register(&self, dependency: Dependency) -> Dependency {
        (self.0)(dependency)
    }
}

pub(crate) struct FnResolveHook<F>(pub(crate) F);

impl<F> ContainerHooks for FnResolveHook<F>
where
    F: Fn(Provider) -> Provider + Send + Sync,
{
    fn before_resolve(&self, provider: Provider) -> Provider {
        (self.0)(provider)
    }
}

/// Installed hooks, applied in installation order.
#[derive(Clone, Default)]
pub(crate) struct Hooks {
    hooks: Vec<Arc<dyn ContainerHooks>>,
}

impl Hooks {
    pub(crate) fn add(&mut self, hooks: Arc<dyn ContainerHooks>) {
        self.hooks.push(hooks);
    }

    #[inline]
    pub(crate) fn is_empty(&self) -> bool {
        self.hooks.is_empty()
    }

    pub(crate) fn len(&self) -> usize {
        self.hooks.len()
    }

    pub(crate) fn before_register(&self, dependency: Dependency) -> Dependency {
        self.hooks
            .iter()
            .fold(dependency, |dep, hook| hook.before_register(dep))
    }

    pub(crate) fn before_resolve(&self, provider: Provider) -> Provider {
        self.hooks
            .iter()
            .fold(provider, |p, hook| hook.before_resolve(p))
    }
}
