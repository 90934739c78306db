//! Per-request resolution.
//!
//! A `RequestScope` executes binding plans: it resolves providers (caching
//! those with `use_cache`), reads host-native parameters from the request,
//! and collects generator teardowns until the scope is closed.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::error::{DiError, DiResult};
use crate::implementation::{Implementation, Produced};
use crate::internal::DisposeBag;
use crate::overrides::Overrides;
use crate::provider::{Provider, ProviderId};
use crate::routing::Request;
use crate::signature::{downcast_instance, downcast_trait, AnyArc, Arguments, ParamDefault, Signature};

/// Resolution context for a single request.
///
/// # Examples
///
/// ```rust
/// use std::sync::atomic::{AtomicUsize, Ordering};
/// use std::sync::Arc;
/// use ferrous_inject::{Implementation, Provider, RequestScope, Signature};
///
/// let counter = Arc::new(AtomicUsize::new(0));
/// let c = counter.clone();
/// let provider = Provider::new(
///     Implementation::function("tick", Signature::new(), move |_| Ok(c.fetch_add(1, Ordering::SeqCst))),
///     true,
/// );
///
/// let scope = RequestScope::detached();
/// let first = scope.resolve_as::<usize>(&provider).unwrap();
/// let second = scope.resolve_as::<usize>(&provider).unwrap();
/// assert_eq!(first, second);
/// assert_eq!(counter.load(Ordering::SeqCst), 1);
/// ```
pub struct RequestScope {
    request: Request,
    overrides: Option<Arc<Overrides>>,
    cache: Mutex<HashMap<ProviderId, AnyArc>>,
    resolving: Mutex<Vec<(ProviderId, &'static str)>>,
    disposers: Mutex<DisposeBag>,
}

impl RequestScope {
    /// Scope for one request, with no overrides.
    pub fn new(request: Request) -> Self {
        RequestScope {
            request,
            overrides: None,
            cache: Mutex::new(HashMap::new()),
            resolving: Mutex::new(Vec::new()),
            disposers: Mutex::new(DisposeBag::default()),
        }
    }

    /// Scope without request data, used for registration-time construction.
    pub fn detached() -> Self {
        Self::new(Request::default())
    }

    /// Consult `overrides` by provider identity before invoking providers.
    pub fn with_overrides(mut self, overrides: Arc<Overrides>) -> Self {
        if !overrides.is_empty() {
            self.overrides = Some(overrides);
        }
        self
    }

    /// The request this scope serves.
    pub fn request(&self) -> &Request {
        &self.request
    }

    /// Resolves a provider, honouring overrides and the cache flag.
    pub fn resolve(&self, provider: &Provider) -> DiResult<AnyArc> {
        let id = provider.id();

        if provider.use_cache() {
            if let Some(hit) = self.cache.lock().get(&id) {
                tracing::trace!(provider = provider.name(), "request cache hit");
                return Ok(hit.clone());
            }
        }

        let callable = self.callable_for(provider);
        let _guard = ResolvingGuard::enter(&self.resolving, id, callable.name())?;

        let args = self.bind(callable.name(), callable.signature())?;
        let instance = match callable.invoke(&args)? {
            Produced::Value(instance) => instance,
            Produced::Generator(instance, teardown) => {
                self.disposers.lock().push(teardown);
                instance
            }
        };

        if provider.use_cache() {
            let mut cache = self.cache.lock();
            return Ok(cache.entry(id).or_insert(instance).clone());
        }
        Ok(instance)
    }

    /// Resolves and downcasts to a concrete type.
    pub fn resolve_as<T: Send + Sync + 'static>(&self, provider: &Provider) -> DiResult<Arc<T>> {
        downcast_instance(self.resolve(provider)?)
    }

    /// Resolves and downcasts to a trait object.
    pub fn resolve_trait<T: ?Sized + Send + Sync + 'static>(&self, provider: &Provider) -> DiResult<Arc<T>> {
        downcast_trait(&self.resolve(provider)?)
    }

    fn callable_for(&self, provider: &Provider) -> Implementation {
        self.overrides
            .as_ref()
            .and_then(|overrides| overrides.replacement_for(provider))
            .unwrap_or_else(|| provider.implementation())
            .clone()
    }

    /// Binds every parameter of `signature`, in declaration order.
    ///
    /// Order per parameter: provider default, then the request (query,
    /// path, header or cookie), then a declared plain default.
    pub fn bind(&self, target: &'static str, signature: &Signature) -> DiResult<Arguments> {
        let mut args = Arguments::new(target);

        for param in signature.params() {
            if param.is_receiver() {
                continue;
            }

            if let Some(provider) = param.marker() {
                args.insert(param.name(), self.resolve(provider)?);
                continue;
            }

            if let Some(provider) = param.annotation().and_then(|a| a.marker()) {
                args.insert(param.name(), self.resolve(provider)?);
                continue;
            }

            let raw = param
                .source()
                .and_then(|source| self.request.value(source, param.name()));
            if let Some(raw) = raw {
                args.insert(param.name(), param.parse(raw)?);
                continue;
            }

            match param.default() {
                ParamDefault::Value(value) => args.insert(param.name(), value.clone()),
                _ => {
                    return Err(DiError::MissingArgument {
                        target,
                        parameter: param.name(),
                    })
                }
            }
        }

        Ok(args)
    }

    /// Number of teardowns waiting for `close`.
    pub fn pending_teardowns(&self) -> usize {
        self.disposers.lock().len()
    }

    pub(crate) fn take_disposers(&self) -> DisposeBag {
        std::mem::take(&mut *self.disposers.lock())
    }

    /// Runs generator teardowns: async ones first, then sync, each LIFO.
    pub async fn close(self) {
        let mut bag = self.take_disposers();
        drop(self);
        bag.dispose().await;
    }
}

impl Drop for RequestScope {
    fn drop(&mut self) {
        let bag = self.disposers.get_mut();
        if !bag.is_empty() {
            tracing::warn!(
                pending = bag.len(),
                "request scope dropped with pending teardowns; call close().await before dropping"
            );
        }
    }
}

/// Entry on the resolution stack, popped on drop.
struct ResolvingGuard<'a> {
    stack: &'a Mutex<Vec<(ProviderId, &'static str)>>,
}

impl<'a> ResolvingGuard<'a> {
    fn enter(
        stack: &'a Mutex<Vec<(ProviderId, &'static str)>>,
        id: ProviderId,
        name: &'static str,
    ) -> DiResult<Self> {
        let mut entries = stack.lock();
        if entries.iter().any(|(entry, _)| *entry == id) {
            let mut path: Vec<&'static str> = entries.iter().map(|(_, n)| *n).collect();
            path.push(name);
            return Err(DiError::Circular(path));
        }
        entries.push((id, name));
        Ok(ResolvingGuard { stack })
    }
}

impl Drop for ResolvingGuard<'_> {
    fn drop(&mut self) {
        self.stack.lock().pop();
    }
}
