//! Axum integration.
//!
//! Every route of a [`RouteTable`] becomes an axum route whose handler runs
//! the same dispatch pipeline as [`RouteTable::dispatch`]: a fresh
//! [`RequestScope`](crate::RequestScope) per request, application and
//! route dependencies first, JSON responses.

use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    extract::{Query, Request as AxumRequest},
    http::StatusCode,
    response::{IntoResponse, Response as AxumResponse},
    routing::{MethodFilter, MethodRouter},
    Extension, Json, Router,
};
use tokio::net::TcpListener;
use tower::ServiceBuilder;

use crate::routing::{Injectified, Method, Request, Response, RouteTable};

impl IntoResponse for Response {
    fn into_response(self) -> AxumResponse {
        let status = StatusCode::from_u16(self.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(self.body)).into_response()
    }
}

fn method_filter(method: Method) -> MethodFilter {
    match method {
        Method::Get => MethodFilter::GET,
        Method::Post => MethodFilter::POST,
        Method::Put => MethodFilter::PUT,
        Method::Patch => MethodFilter::PATCH,
        Method::Delete => MethodFilter::DELETE,
        Method::Head => MethodFilter::HEAD,
        Method::Options => MethodFilter::OPTIONS,
    }
}

/// `/items/{id}` to axum's `/items/:p0`.
///
/// Captures get positional names, so templates differing only in parameter
/// names share one axum route; the table re-matches every request and binds
/// the real names. Static segments that axum would read as captures are
/// turned into captures too.
fn axum_path(path: &str) -> String {
    let mut captures = 0;
    let converted: Vec<String> = path
        .split('/')
        .filter(|segment| !segment.is_empty())
        .map(|segment| {
            let is_param = segment.starts_with('{') && segment.ends_with('}');
            if is_param || segment.contains(':') || segment.contains('*') {
                captures += 1;
                format!(":p{}", captures - 1)
            } else {
                segment.to_string()
            }
        })
        .collect();
    format!("/{}", converted.join("/"))
}

/// Converts an axum request into the binding layer's view of it.
///
/// The body is not read; parameters come from the path, query string,
/// headers and cookies.
pub fn to_request(request: AxumRequest) -> Result<Request, AxumResponse> {
    let (parts, _body) = request.into_parts();
    let method: Method = parts
        .method
        .as_str()
        .parse()
        .map_err(|err: String| (StatusCode::METHOD_NOT_ALLOWED, err).into_response())?;

    let mut converted = Request::new(method, parts.uri.path());
    if let Ok(Query(params)) = Query::<HashMap<String, String>>::try_from_uri(&parts.uri) {
        for (name, value) in params {
            converted = converted.query(name, value);
        }
    }
    for (name, value) in parts.headers.iter() {
        if let Ok(value) = value.to_str() {
            converted = converted.header(name.as_str(), value);
        }
    }
    Ok(converted)
}

/// Builds an axum router serving every route of `table`.
///
/// # Examples
///
/// ```rust
/// use serde_json::json;
/// use ferrous_inject::axum_integration::into_axum_router;
/// use ferrous_inject::routing::{Endpoint, RouteOptions, RouteRegistrar, RouteTable};
/// use ferrous_inject::Signature;
///
/// let mut table = RouteTable::new();
/// table.add_route(
///     "/health",
///     Endpoint::sync("health", Signature::new(), |_| Ok(json!({ "ok": true }))),
///     RouteOptions::get(),
/// ).unwrap();
///
/// let router: axum::Router = into_axum_router(table);
/// ```
pub fn into_axum_router(table: impl Into<RouteTable>) -> Router {
    let table = Arc::new(table.into());

    let mut by_path: Vec<(String, Vec<Method>)> = Vec::new();
    for route in table.routes() {
        let path = axum_path(route.path());
        match by_path.iter_mut().find(|(p, _)| *p == path) {
            Some((_, methods)) => {
                for method in route.methods() {
                    if !methods.contains(method) {
                        methods.push(*method);
                    }
                }
            }
            None => by_path.push((path, route.methods().to_vec())),
        }
    }

    by_path
        .into_iter()
        .fold(Router::new(), |router, (path, methods)| {
            let method_router = methods
                .into_iter()
                .fold(MethodRouter::<()>::new(), |method_router, method| {
                    let table = table.clone();
                    method_router.on(method_filter(method), move |request: AxumRequest| async move {
                        match to_request(request) {
                            Ok(request) => table.dispatch(request).await.into_response(),
                            Err(rejection) => rejection,
                        }
                    })
                });
            router.route(&path, method_router)
        })
}

/// Builds the axum app for an injectified route table, lets `configure`
/// add native axum routes or layers, and exposes the container to native
/// handlers as `Extension<Container>`.
pub fn create_app_with_di<F>(app: Injectified<RouteTable>, configure: F) -> Router
where
    F: FnOnce(Router) -> Router,
{
    let container = app.container().clone();
    let router = configure(into_axum_router(app));
    router.layer(ServiceBuilder::new().layer(Extension(container)))
}

/// Serves an injectified route table on `listener` until the server stops.
pub async fn serve(listener: TcpListener, app: Injectified<RouteTable>) -> std::io::Result<()> {
    let router = create_app_with_di(app, |router| router);
    if let Ok(addr) = listener.local_addr() {
        tracing::info!(%addr, "serving injectified routes");
    }
    axum::serve(listener, router).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn converts_path_parameters() {
        assert_eq!(axum_path("/items/{id}"), "/items/:p0");
        assert_eq!(axum_path("/a/{x}/b/{y}"), "/a/:p0/b/:p1");
        assert_eq!(axum_path("/"), "/");
        assert_eq!(axum_path("/n"), "/n");
        assert_eq!(axum_path("users/{name}"), "/users/:p0");
        assert_eq!(axum_path("/files/*rest"), "/files/:p0");
        assert_eq!(axum_path("/time/12:30"), "/time/:p0");
    }

    #[test]
    fn request_conversion_reads_query_and_cookies() {
        let request = axum::http::Request::builder()
            .method("GET")
            .uri("/search?q=rust&page=2")
            .header("cookie", "session=abc")
            .body(axum::body::Body::empty())
            .unwrap();

        let converted = to_request(request).unwrap();
        assert_eq!(converted.method(), Method::Get);
        assert_eq!(converted.path(), "/search");
        assert_eq!(converted.query_value("q"), Some("rust"));
        assert_eq!(converted.cookie_value("session"), Some("abc"));
    }
}
