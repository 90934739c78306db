//! Reference route table: registration and request dispatch.

use std::collections::HashMap;
use std::sync::Arc;

use percent_encoding::percent_decode_str;

use crate::error::{DiError, DiResult};
use crate::overrides::Overrides;
use crate::provider::Provider;
use crate::scope::RequestScope;

use super::{DependencyItem, Endpoint, Method, Request, Response, RouteOptions, RouteRegistrar};

#[derive(Clone, Debug, PartialEq)]
enum Segment {
    Static(String),
    Param(String),
}

/// Leading slash, no trailing slash except for the root.
fn normalize_path(path: &str) -> String {
    let trimmed = path.trim_matches('/');
    if trimmed.is_empty() {
        "/".to_string()
    } else {
        format!("/{}", trimmed)
    }
}

fn parse_segments(path: &str) -> Vec<Segment> {
    path.split('/')
        .filter(|s| !s.is_empty())
        .map(|s| match s.strip_prefix('{').and_then(|s| s.strip_suffix('}')) {
            Some(name) => Segment::Param(name.to_string()),
            None => Segment::Static(s.to_string()),
        })
        .collect()
}

/// Host marker for a route-level dependency entry.
fn marker_for(item: &DependencyItem) -> DiResult<Provider> {
    match item {
        DependencyItem::Marker(provider) => Ok(provider.clone()),
        DependencyItem::Callable(implementation) => Ok(Provider::new(implementation.clone(), true)),
        DependencyItem::Protocol(key) => Err(DiError::InvalidDependency(key.display_name())),
    }
}

fn markers_for(items: &[DependencyItem]) -> DiResult<Vec<Provider>> {
    items.iter().map(marker_for).collect()
}

/// A registered route.
#[derive(Clone, Debug)]
pub struct Route {
    path: String,
    segments: Vec<Segment>,
    methods: Vec<Method>,
    endpoint: Endpoint,
    dependencies: Vec<Provider>,
    status: u16,
}

impl Route {
    /// Normalized path template, always starting with `/`.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Methods this route answers.
    pub fn methods(&self) -> &[Method] {
        &self.methods
    }

    /// The endpoint invoked on a match.
    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    /// Route-level markers, resolved before the endpoint is called.
    pub fn dependencies(&self) -> &[Provider] {
        &self.dependencies
    }

    fn matches(&self, method: Method, path: &str) -> Option<HashMap<String, String>> {
        if !self.methods.contains(&method) {
            return None;
        }
        let parts: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
        if parts.len() != self.segments.len() {
            return None;
        }

        let mut params = HashMap::new();
        for (segment, part) in self.segments.iter().zip(parts) {
            let part = percent_decode_str(part).decode_utf8_lossy();
            match segment {
                Segment::Static(expected) if *expected == part => {}
                Segment::Static(_) => return None,
                Segment::Param(name) => {
                    params.insert(name.clone(), part.into_owned());
                }
            }
        }
        Some(params)
    }
}

/// In-process host: stores routes and dispatches requests through a
/// per-request [`RequestScope`].
///
/// # Examples
///
/// ```rust
/// use serde_json::json;
/// use ferrous_inject::routing::{Endpoint, Request, RouteOptions, RouteRegistrar, RouteTable};
/// use ferrous_inject::Signature;
///
/// # tokio::runtime::Runtime::new().unwrap().block_on(async {
/// let mut table = RouteTable::new();
/// table.add_route(
///     "/health",
///     Endpoint::sync("health", Signature::new(), |_| Ok(json!({ "ok": true }))),
///     RouteOptions::get(),
/// ).unwrap();
///
/// let response = table.dispatch(Request::get("/health")).await;
/// assert_eq!(response.status, 200);
/// assert_eq!(response.body, json!({ "ok": true }));
///
/// assert_eq!(table.dispatch(Request::get("/missing")).await.status, 404);
/// # });
/// ```
#[derive(Clone, Default)]
pub struct RouteTable {
    routes: Vec<Route>,
    dependencies: Vec<DependencyItem>,
    markers: Vec<Provider>,
    overrides: Arc<Overrides>,
}

impl RouteTable {
    /// Empty table with no routes or dependencies.
    pub fn new() -> Self {
        Self::default()
    }

    /// Routes in registration order; the first match wins.
    pub fn routes(&self) -> &[Route] {
        &self.routes
    }

    /// Installs dependency overrides, consulted by provider identity.
    pub fn set_overrides(&mut self, overrides: Overrides) {
        self.overrides = Arc::new(overrides);
    }

    /// Overrides consulted by every dispatched request.
    pub fn overrides(&self) -> &Overrides {
        &self.overrides
    }

    /// Merges the routes of `router` under `prefix`.
    ///
    /// The router's own dependencies run before each route's.
    pub fn include(&mut self, prefix: &str, router: impl Into<RouteTable>) {
        let router = router.into();
        let prefix = prefix.trim_end_matches('/');

        for route in router.routes {
            let path = normalize_path(&format!("{}{}", prefix, route.path));
            let mut dependencies = router.markers.clone();
            dependencies.extend(route.dependencies);
            tracing::debug!(path = %path, endpoint = route.endpoint.name(), "route included");

            self.routes.push(Route {
                segments: parse_segments(&path),
                path,
                dependencies,
                ..route
            });
        }
    }

    fn find(&self, method: Method, path: &str) -> Option<(&Route, HashMap<String, String>)> {
        self.routes
            .iter()
            .find_map(|route| route.matches(method, path).map(|params| (route, params)))
    }

    /// Dispatches a request; errors become JSON error responses.
    pub async fn dispatch(&self, request: Request) -> Response {
        match self.try_dispatch(request).await {
            Ok(response) => response,
            Err(err) => {
                tracing::debug!(error = %err, status = err.status_code(), "request failed");
                Response::from_error(&err)
            }
        }
    }

    /// Dispatches a request, returning binding and handler errors as-is.
    ///
    /// Application-level dependencies run first, then route-level ones,
    /// then the endpoint. Generator teardowns run before this returns.
    pub async fn try_dispatch(&self, mut request: Request) -> DiResult<Response> {
        let (route, params) = self
            .find(request.method(), request.path())
            .ok_or_else(|| DiError::RouteNotFound {
                method: request.method().to_string(),
                path: request.path().to_string(),
            })?;
        request.set_path_params(params);

        let scope = RequestScope::new(request).with_overrides(self.overrides.clone());
        let result = Self::run(&self.markers, route, &scope).await;
        scope.close().await;

        result.map(|body| Response::new(route.status, body))
    }

    async fn run(
        global: &[Provider],
        route: &Route,
        scope: &RequestScope,
    ) -> DiResult<serde_json::Value> {
        for provider in global.iter().chain(route.dependencies.iter()) {
            scope.resolve(provider)?;
        }
        let endpoint = &route.endpoint;
        let args = scope.bind(endpoint.name(), endpoint.signature())?;
        endpoint.handler().call(args).await
    }
}

impl RouteRegistrar for RouteTable {
    fn add_route(&mut self, path: &str, endpoint: Endpoint, options: RouteOptions) -> DiResult<()> {
        let dependencies = markers_for(&options.dependencies)?;
        let path = normalize_path(path);
        tracing::debug!(path = %path, endpoint = endpoint.name(), "route added");

        self.routes.push(Route {
            segments: parse_segments(&path),
            path,
            methods: options.methods,
            endpoint,
            dependencies,
            status: options.status,
        });
        Ok(())
    }

    fn dependencies(&self) -> &[DependencyItem] {
        &self.dependencies
    }

    fn set_dependencies(&mut self, dependencies: Vec<DependencyItem>) -> DiResult<()> {
        self.markers = markers_for(&dependencies)?;
        self.dependencies = dependencies;
        Ok(())
    }
}
