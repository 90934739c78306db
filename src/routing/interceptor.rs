//! Route-registration interception.
//!
//! `Injectified<R>` sits in front of a registrar's `add_route`: endpoint
//! signatures are rewritten against the attached container and dependency
//! lists are resolved before the original registrar sees them. Routes added
//! to the registrar before it was wrapped are not revisited.

use crate::container::Container;
use crate::error::DiResult;
use crate::implementation::Implementation;
use crate::overrides::Overrides;

use super::{DependencyItem, Endpoint, Method, Request, Response, RouteOptions, RouteRegistrar, RouteTable};

/// Something a container can be attached to.
///
/// Wrapping an [`Injectified`] again only replaces its container.
pub trait Injectable {
    type Registrar: RouteRegistrar;

    fn injectify(self, container: &Container) -> Injectified<Self::Registrar>;
}

impl Injectable for RouteTable {
    type Registrar = RouteTable;

    fn injectify(self, container: &Container) -> Injectified<RouteTable> {
        Injectified::with_container(self, container.clone())
    }
}

impl<R: RouteRegistrar> Injectable for Injectified<R> {
    type Registrar = R;

    fn injectify(mut self, container: &Container) -> Injectified<R> {
        tracing::debug!("registrar already injectified; replacing container");
        self.container = container.clone();
        self
    }
}

/// A route registrar with a container attached.
///
/// # Examples
///
/// ```rust
/// use std::sync::Arc;
/// use serde_json::json;
/// use ferrous_inject::routing::{Endpoint, Request, RouteTable};
/// use ferrous_inject::{Arguments, DiResult, Implementation, Injectified, Parameter, Signature};
///
/// trait Greeter: Send + Sync {
///     fn greet(&self) -> String;
/// }
///
/// struct English;
/// impl Greeter for English {
///     fn greet(&self) -> String { "hello".into() }
/// }
///
/// fn english(_: &Arguments) -> DiResult<Arc<dyn Greeter>> {
///     Ok(Arc::new(English))
/// }
///
/// # tokio::runtime::Runtime::new().unwrap().block_on(async {
/// let mut app = Injectified::new(RouteTable::new());
/// app.add_scoped::<dyn Greeter>(Implementation::provides("English", Signature::new(), english)).unwrap();
///
/// app.get("/greet", Endpoint::sync(
///     "greet",
///     Signature::new().param(Parameter::typed::<dyn Greeter>("greeter")),
///     |args| Ok(json!({ "message": args.get_trait::<dyn Greeter>("greeter")?.greet() })),
/// )).unwrap();
///
/// let response = app.dispatch(Request::get("/greet")).await;
/// assert_eq!(response.body, json!({ "message": "hello" }));
/// # });
/// ```
pub struct Injectified<R> {
    original: R,
    container: Container,
}

impl<R: RouteRegistrar> Injectified<R> {
    /// Wraps `target` with a fresh, empty container.
    pub fn new(target: R) -> Self {
        Self::with_container(target, Container::new())
    }

    /// Wraps `target` with an existing container.
    pub fn with_container(target: R, container: Container) -> Self {
        Injectified {
            original: target,
            container,
        }
    }

    /// The container routes are rewritten against.
    pub fn container(&self) -> &Container {
        &self.container
    }

    /// Swaps the attached container; later routes resolve against it.
    pub fn set_container(&mut self, container: Container) {
        self.container = container;
    }

    /// The wrapped registrar.
    pub fn original(&self) -> &R {
        &self.original
    }

    /// Mutable access to the wrapped registrar; routes added through it are not rewritten.
    pub fn original_mut(&mut self) -> &mut R {
        &mut self.original
    }

    /// Unwraps to the registrar that was originally wrapped.
    pub fn into_original(self) -> R {
        self.original
    }

    /// Rewrites the endpoint and its dependency list, then registers it
    /// with the original registrar.
    pub fn add_route(&mut self, path: &str, endpoint: Endpoint, options: RouteOptions) -> DiResult<()> {
        let signature = self.container.inject_signature(endpoint.signature());
        let endpoint = endpoint.with_signature(signature);
        let options = RouteOptions {
            dependencies: self.container.process_dependencies(options.dependencies),
            ..options
        };
        tracing::debug!(path, endpoint = endpoint.name(), "route intercepted");
        self.original.add_route(path, endpoint, options)
    }

    /// Registers `endpoint` for `methods` after rewriting its signature.
    pub fn route(&mut self, path: &str, methods: impl IntoIterator<Item = Method>, endpoint: Endpoint) -> DiResult<()> {
        self.add_route(path, endpoint, RouteOptions::methods(methods))
    }

    /// Registers a GET route.
    pub fn get(&mut self, path: &str, endpoint: Endpoint) -> DiResult<()> {
        self.route(path, [Method::Get], endpoint)
    }

    /// Registers a POST route.
    pub fn post(&mut self, path: &str, endpoint: Endpoint) -> DiResult<()> {
        self.route(path, [Method::Post], endpoint)
    }

    /// Registers a PUT route.
    pub fn put(&mut self, path: &str, endpoint: Endpoint) -> DiResult<()> {
        self.route(path, [Method::Put], endpoint)
    }

    /// Registers a PATCH route.
    pub fn patch(&mut self, path: &str, endpoint: Endpoint) -> DiResult<()> {
        self.route(path, [Method::Patch], endpoint)
    }

    /// Registers a DELETE route.
    pub fn delete(&mut self, path: &str, endpoint: Endpoint) -> DiResult<()> {
        self.route(path, [Method::Delete], endpoint)
    }

    // ----- Registration sugar -----

    /// Registers a singleton on the attached container.
    pub fn add_singleton<P: ?Sized + 'static>(&self, implementation: Implementation) -> DiResult<&Self> {
        self.container.add_singleton::<P>(implementation)?;
        Ok(self)
    }

    /// Registers a scoped provider on the attached container.
    pub fn add_scoped<P: ?Sized + 'static>(&self, implementation: Implementation) -> DiResult<&Self> {
        self.container.add_scoped::<P>(implementation)?;
        Ok(self)
    }

    /// Registers a factory on the attached container.
    pub fn add_factory<P: ?Sized + 'static>(&self, implementation: Implementation) -> DiResult<&Self> {
        self.container.add_factory::<P>(implementation)?;
        Ok(self)
    }

    // ----- Router-level dependencies -----

    /// Router-level dependencies, as the registrar stores them.
    pub fn dependencies(&self) -> &[DependencyItem] {
        self.original.dependencies()
    }

    /// Replaces the router-level dependency list, resolving it first.
    pub fn set_dependencies(&mut self, dependencies: Vec<DependencyItem>) -> DiResult<()> {
        let dependencies = self.container.process_dependencies(dependencies);
        self.original.set_dependencies(dependencies)
    }

    /// Appends one entry to the router-level dependency list.
    pub fn add_global_dependency(&mut self, item: impl Into<DependencyItem>) -> DiResult<()> {
        let mut dependencies = self.original.dependencies().to_vec();
        dependencies.push(self.container.inject_dependency(item.into()));
        self.original.set_dependencies(dependencies)
    }
}

impl Injectified<RouteTable> {
    /// Merges a sub-router under `prefix`.
    pub fn include_router(&mut self, prefix: &str, router: impl Into<RouteTable>) {
        self.original.include(prefix, router);
    }

    /// Installs overrides on the wrapped table.
    pub fn set_overrides(&mut self, overrides: Overrides) {
        self.original.set_overrides(overrides);
    }

    /// Dispatches through the wrapped table.
    pub async fn dispatch(&self, request: Request) -> Response {
        self.original.dispatch(request).await
    }
}

impl From<Injectified<RouteTable>> for RouteTable {
    fn from(injectified: Injectified<RouteTable>) -> Self {
        injectified.into_original()
    }
}
