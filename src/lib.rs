//! # ferrous-inject
//!
//! Lifetime-aware dependency injection for web endpoints.
//!
//! Implementations are registered against abstract *protocols* (usually
//! `dyn Trait` types) with a lifetime. When a route is added through an
//! injectified registrar, every endpoint parameter annotated with a
//! registered protocol gets that protocol's provider as its default, and
//! route-level dependency lists are resolved the same way. Implementations
//! are themselves rewritten at registration time, so dependencies of
//! dependencies resolve too.
//!
//! ## Features
//!
//! - **Lifetimes**: singleton (built once at registration), scoped (once per
//!   request), factory (on every resolution)
//! - **Nested injection**: an implementation's own parameters are matched
//!   against what is already registered
//! - **Lifetime checks**: singleton → scoped/factory and scoped → factory
//!   are reported (warn, deny or ignore)
//! - **Overrides**: merge a mock container over the real one for tests
//! - **Hooks**: observe or replace registrations and resolutions
//! - **Axum**: serve an injectified route table as an axum `Router`
//!
//! ## Quick Start
//!
//! ```rust
//! use std::sync::Arc;
//! use serde_json::json;
//! use ferrous_inject::routing::{Endpoint, Request, RouteTable};
//! use ferrous_inject::{Arguments, Container, DiResult, Implementation, Parameter, Signature};
//!
//! trait NumberService: Send + Sync {
//!     fn number(&self) -> i64;
//! }
//!
//! struct Fixed(i64);
//! impl NumberService for Fixed {
//!     fn number(&self) -> i64 { self.0 }
//! }
//!
//! fn fixed(_: &Arguments) -> DiResult<Arc<dyn NumberService>> {
//!     Ok(Arc::new(Fixed(42)))
//! }
//!
//! # tokio::runtime::Runtime::new().unwrap().block_on(async {
//! let container = Container::new();
//! container.add_scoped::<dyn NumberService>(
//!     Implementation::provides("Fixed", Signature::new(), fixed),
//! ).unwrap();
//!
//! let mut app = container.injectify(RouteTable::new());
//! app.get("/n", Endpoint::sync(
//!     "number",
//!     Signature::new().param(Parameter::typed::<dyn NumberService>("service")),
//!     |args| Ok(json!({ "n": args.get_trait::<dyn NumberService>("service")?.number() })),
//! )).unwrap();
//!
//! let response = app.dispatch(Request::get("/n")).await;
//! assert_eq!(response.body, json!({ "n": 42 }));
//! # });
//! ```
//!
//! ## Lifetimes
//!
//! | lifetime  | constructed            | cached by the request scope |
//! |-----------|------------------------|-----------------------------|
//! | Singleton | once, at registration  | yes (constant provider)     |
//! | Scoped    | first use per request  | yes                         |
//! | Factory   | every resolution       | no                          |
//!
//! Generators (`Implementation::generator`) yield a value and tear it down
//! when the request ends. They cannot be singletons.

pub mod config;
pub mod container;
pub mod dependency;
pub mod error;
pub mod hooks;
pub mod implementation;
pub mod key;
pub mod lifetime;
pub mod overrides;
pub mod provider;
pub mod routing;
pub mod scope;
pub mod signature;

#[cfg(feature = "axum-integration")]
pub mod axum_integration;

mod injector;
mod internal;

pub use config::{ContainerConfig, ViolationPolicy};
pub use container::Container;
pub use dependency::{Dependency, DependencyDescriptor};
pub use error::{DiError, DiResult};
pub use hooks::{ContainerHooks, LoggingHooks};
pub use implementation::{Generated, Implementation, ImplementationKind, Produced};
pub use internal::dispose_bag::Teardown;
pub use key::{key_of, Key};
pub use lifetime::Lifetime;
pub use overrides::{OverrideEntry, OverrideKey, Overrides};
pub use provider::{Provider, ProviderId};
pub use routing::{DependencyItem, Endpoint, Injectable, Injectified, RouteOptions, RouteRegistrar};
pub use scope::RequestScope;
pub use signature::{
    downcast_instance, downcast_trait, Annotation, AnyArc, Arguments, Metadata, ParamDefault,
    Parameter, Signature, ValueSource,
};
