//! Error types for the dependency injection container.

use std::fmt;

use crate::lifetime::Lifetime;

/// Dependency injection errors
///
/// Registration errors (`SingletonGenerator`, `LifetimeViolation`) surface
/// at application startup. `NotRegistered` is raised by direct lookups and
/// is treated internally as "not ours to resolve". The remaining variants
/// come from binding and dispatching requests.
///
/// # Examples
///
/// ```rust
/// use ferrous_inject::{Container, DiError};
///
/// trait Mailer: Send + Sync {}
///
/// let container = Container::new();
/// match container.resolve_type::<dyn Mailer>() {
///     Err(DiError::NotRegistered(name)) => assert!(name.contains("Mailer")),
///     _ => unreachable!(),
/// }
/// ```
#[derive(Debug, Clone, PartialEq)]
pub enum DiError {
    /// Protocol has no registration in the container
    NotRegistered(&'static str),
    /// Generator-style implementation registered as singleton
    SingletonGenerator(&'static str),
    /// Longer-lived service depends on a shorter-lived one (deny policy only)
    LifetimeViolation {
        service: &'static str,
        service_lifetime: Lifetime,
        dependency: &'static str,
        dependency_lifetime: Lifetime,
    },
    /// Resolved value could not be downcast to the requested type
    TypeMismatch(&'static str),
    /// A required parameter had no provider, request value or default
    MissingArgument {
        target: &'static str,
        parameter: &'static str,
    },
    /// A request value could not be parsed into the declared type
    InvalidParameter {
        parameter: &'static str,
        value: String,
    },
    /// Provider graph loops back on itself (includes path)
    Circular(Vec<&'static str>),
    /// A dependency list entry the host cannot use
    InvalidDependency(&'static str),
    /// No route matches the request
    RouteNotFound { method: String, path: String },
    /// Implementation or handler reported a failure
    Construction(String),
}

impl fmt::Display for DiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DiError::NotRegistered(name) => {
                write!(f, "Protocol {} is not registered in the container", name)
            }
            DiError::SingletonGenerator(name) => write!(
                f,
                "Cannot register generator {} as a singleton dependency",
                name
            ),
            DiError::LifetimeViolation {
                service,
                service_lifetime,
                dependency,
                dependency_lifetime,
            } => write!(
                f,
                "Lifetime error: {} service {} depends on {} service {}",
                service_lifetime, service, dependency_lifetime, dependency
            ),
            DiError::TypeMismatch(name) => write!(f, "Type mismatch for: {}", name),
            DiError::MissingArgument { target, parameter } => {
                write!(f, "Missing argument '{}' for {}", parameter, target)
            }
            DiError::InvalidParameter { parameter, value } => {
                write!(f, "Invalid value '{}' for parameter '{}'", value, parameter)
            }
            DiError::Circular(path) => {
                write!(f, "Circular dependency: {}", path.join(" -> "))
            }
            DiError::InvalidDependency(name) => {
                write!(f, "Dependency {} cannot be used by the route", name)
            }
            DiError::RouteNotFound { method, path } => {
                write!(f, "No route for {} {}", method, path)
            }
            DiError::Construction(msg) => write!(f, "Construction failed: {}", msg),
        }
    }
}

impl std::error::Error for DiError {}

impl DiError {
    /// Wraps any error produced by user code.
    pub fn construction(err: impl fmt::Display) -> Self {
        DiError::Construction(err.to_string())
    }

    /// Whether this error is the "protocol not registered" miss.
    pub fn is_not_registered(&self) -> bool {
        matches!(self, DiError::NotRegistered(_))
    }

    /// HTTP status the host surface reports for this error.
    pub fn status_code(&self) -> u16 {
        match self {
            DiError::RouteNotFound { .. } => 404,
            DiError::MissingArgument { .. } | DiError::InvalidParameter { .. } => 422,
            _ => 500,
        }
    }
}

/// Result type for DI operations
pub type DiResult<T> = Result<T, DiError>;
