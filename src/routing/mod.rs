//! Route registration and dispatch.
//!
//! [`RouteRegistrar`] is the host's route-registration primitive,
//! [`RouteTable`] the reference host implementing it, and
//! [`Injectified`] the wrapper that rewrites endpoints against a
//! [`Container`](crate::Container) before delegating.

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::DiResult;
use crate::implementation::Implementation;
use crate::key::Key;
use crate::provider::Provider;
use crate::signature::{Arguments, Signature};

pub mod interceptor;
pub mod request;
pub mod table;

pub use interceptor::{Injectable, Injectified};
pub use request::{Method, Request, Response};
pub use table::{Route, RouteTable};

/// Endpoint body. Receives the bound arguments, returns a JSON body.
#[async_trait]
pub trait Handler: Send + Sync {
    async fn call(&self, args: Arguments) -> DiResult<Value>;
}

#[async_trait]
impl<F, Fut> Handler for F
where
    F: Fn(Arguments) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = DiResult<Value>> + Send + 'static,
{
    async fn call(&self, args: Arguments) -> DiResult<Value> {
        (self)(args).await
    }
}

struct SyncHandler<F>(F);

#[async_trait]
impl<F> Handler for SyncHandler<F>
where
    F: Fn(&Arguments) -> DiResult<Value> + Send + Sync + 'static,
{
    async fn call(&self, args: Arguments) -> DiResult<Value> {
        (self.0)(&args)
    }
}

/// A route handler plus its declared parameters.
///
/// ```rust
/// use serde_json::json;
/// use ferrous_inject::routing::Endpoint;
/// use ferrous_inject::{Parameter, Signature};
///
/// let echo = Endpoint::sync(
///     "echo",
///     Signature::new().param(Parameter::new("text")),
///     |args| Ok(json!({ "text": args.value::<String>("text")? })),
/// );
/// assert_eq!(echo.name(), "echo");
/// ```
#[derive(Clone)]
pub struct Endpoint {
    name: &'static str,
    signature: Signature,
    handler: Arc<dyn Handler>,
}

impl Endpoint {
    /// Endpoint with an async handler.
    pub fn new(name: &'static str, signature: Signature, handler: impl Handler + 'static) -> Self {
        Endpoint {
            name,
            signature,
            handler: Arc::new(handler),
        }
    }

    /// Endpoint with a synchronous handler.
    pub fn sync<F>(name: &'static str, signature: Signature, handler: F) -> Self
    where
        F: Fn(&Arguments) -> DiResult<Value> + Send + Sync + 'static,
    {
        Self::new(name, signature, SyncHandler(handler))
    }

    /// Name reported in binding errors.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Declared parameters of the handler.
    pub fn signature(&self) -> &Signature {
        &self.signature
    }

    /// Same handler with a rewritten signature.
    pub fn with_signature(self, signature: Signature) -> Self {
        Endpoint { signature, ..self }
    }

    pub(crate) fn handler(&self) -> &dyn Handler {
        self.handler.as_ref()
    }
}

impl fmt::Debug for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Endpoint")
            .field("name", &self.name)
            .field("signature", &self.signature)
            .finish()
    }
}

/// Entry of a route, router or application dependency list.
#[derive(Clone, Debug)]
pub enum DependencyItem {
    /// Host marker, used as-is.
    Marker(Provider),
    /// Protocol to look up in the container.
    Protocol(Key),
    /// Plain callable; the host wraps it in a cached marker.
    Callable(Implementation),
}

impl DependencyItem {
    /// Unresolved reference to the provider registered for `P`.
    pub fn protocol<P: ?Sized + 'static>() -> Self {
        DependencyItem::Protocol(Key::of::<P>())
    }

    /// Display name of the provider, protocol or callable.
    pub fn name(&self) -> &'static str {
        match self {
            DependencyItem::Marker(provider) => provider.name(),
            DependencyItem::Protocol(key) => key.display_name(),
            DependencyItem::Callable(implementation) => implementation.name(),
        }
    }
}

impl PartialEq for DependencyItem {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (DependencyItem::Marker(a), DependencyItem::Marker(b)) => a == b,
            (DependencyItem::Protocol(a), DependencyItem::Protocol(b)) => a == b,
            (DependencyItem::Callable(a), DependencyItem::Callable(b)) => a.same_callable(b),
            _ => false,
        }
    }
}

impl From<Provider> for DependencyItem {
    fn from(provider: Provider) -> Self {
        DependencyItem::Marker(provider)
    }
}

impl From<Key> for DependencyItem {
    fn from(key: Key) -> Self {
        DependencyItem::Protocol(key)
    }
}

impl From<Implementation> for DependencyItem {
    fn from(implementation: Implementation) -> Self {
        DependencyItem::Callable(implementation)
    }
}

/// Per-route registration options.
#[derive(Clone, Debug)]
pub struct RouteOptions {
    pub methods: Vec<Method>,
    pub dependencies: Vec<DependencyItem>,
    pub status: u16,
}

impl Default for RouteOptions {
    fn default() -> Self {
        RouteOptions {
            methods: vec![Method::Get],
            dependencies: Vec::new(),
            status: 200,
        }
    }
}

impl RouteOptions {
    /// Options answering `methods`, status 200.
    pub fn methods(methods: impl IntoIterator<Item = Method>) -> Self {
        RouteOptions {
            methods: methods.into_iter().collect(),
            ..Default::default()
        }
    }

    /// GET-only options.
    pub fn get() -> Self {
        Self::methods([Method::Get])
    }

    /// POST-only options.
    pub fn post() -> Self {
        Self::methods([Method::Post])
    }

    /// Appends a route-level dependency.
    pub fn dependency(mut self, item: impl Into<DependencyItem>) -> Self {
        self.dependencies.push(item.into());
        self
    }

    /// Replaces the route-level dependency list.
    pub fn dependencies(mut self, items: Vec<DependencyItem>) -> Self {
        self.dependencies = items;
        self
    }

    /// Status code of successful responses.
    pub fn status(mut self, status: u16) -> Self {
        self.status = status;
        self
    }
}

/// Host route-registration primitive.
pub trait RouteRegistrar {
    fn add_route(&mut self, path: &str, endpoint: Endpoint, options: RouteOptions) -> DiResult<()>;

    /// Router-level dependencies, applied to every route.
    fn dependencies(&self) -> &[DependencyItem];

    fn set_dependencies(&mut self, dependencies: Vec<DependencyItem>) -> DiResult<()>;
}
