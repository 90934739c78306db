//! Callables that produce protocol instances.

use std::any::type_name;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

use crate::error::DiResult;
use crate::internal::dispose_bag::Teardown;
use crate::signature::{AnyArc, Arguments, Signature};

type InvokeFn = Arc<dyn Fn(&Arguments) -> DiResult<Produced> + Send + Sync>;

/// Shape of an implementation, used for registration checks and logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImplementationKind {
    /// Constructs a concrete type.
    Class,
    /// Plain callable returning a value.
    Function,
    /// Yields a value and tears it down when the request ends.
    Generator,
    /// Generator whose teardown is asynchronous.
    AsyncGenerator,
    /// Pre-built instance.
    Constant,
}

impl ImplementationKind {
    /// Whether instances come with a teardown.
    pub fn is_generator(self) -> bool {
        matches!(self, ImplementationKind::Generator | ImplementationKind::AsyncGenerator)
    }
}

/// Result of invoking an implementation.
pub enum Produced {
    Value(AnyArc),
    Generator(AnyArc, Teardown),
}

impl Produced {
    /// The produced instance.
    pub fn value(&self) -> &AnyArc {
        match self {
            Produced::Value(v) | Produced::Generator(v, _) => v,
        }
    }
}

/// Value yielded by a generator implementation together with its cleanup.
///
/// ```rust
/// use ferrous_inject::Generated;
///
/// let session = Generated::new(String::from("session"), || {
///     // close connection
/// });
/// assert_eq!(session.value(), "session");
/// ```
pub struct Generated<T> {
    value: T,
    teardown: Teardown,
}

impl<T> Generated<T> {
    /// Value with synchronous cleanup.
    pub fn new(value: T, teardown: impl FnOnce() + Send + 'static) -> Self {
        Generated {
            value,
            teardown: Teardown::Sync(Box::new(teardown)),
        }
    }

    /// Value with asynchronous cleanup, awaited when the scope closes.
    pub fn with_async<F, Fut>(value: T, teardown: F) -> Self
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        Generated {
            value,
            teardown: Teardown::Async(Box::new(move || Box::pin(teardown()))),
        }
    }

    /// The yielded value.
    pub fn value(&self) -> &T {
        &self.value
    }

    fn is_async(&self) -> bool {
        matches!(self.teardown, Teardown::Async(_))
    }
}

/// A callable registered for a protocol or used directly as a host marker.
///
/// The invoke closure receives arguments bound according to `signature`.
/// Rewriting the signature never touches the closure, so the same
/// implementation can be registered in several containers.
///
/// # Examples
///
/// ```rust
/// use std::sync::Arc;
/// use ferrous_inject::{Arguments, DiResult, Implementation, Parameter, Signature};
///
/// trait NumberService: Send + Sync {
///     fn number(&self) -> i64;
/// }
///
/// struct Fixed;
/// impl NumberService for Fixed {
///     fn number(&self) -> i64 { 42 }
/// }
///
/// fn fixed(_: &Arguments) -> DiResult<Arc<dyn NumberService>> {
///     Ok(Arc::new(Fixed))
/// }
///
/// let service = Implementation::provides::<dyn NumberService, _>("Fixed", Signature::new(), fixed);
/// assert_eq!(service.name(), "Fixed");
///
/// let doubled = Implementation::function(
///     "doubled",
///     Signature::new().param(Parameter::typed::<dyn NumberService>("service")),
///     |args| Ok(args.get_trait::<dyn NumberService>("service")?.number() * 2),
/// );
/// assert_eq!(doubled.signature().len(), 1);
/// ```
#[derive(Clone)]
pub struct Implementation {
    name: &'static str,
    kind: ImplementationKind,
    signature: Signature,
    invoke: InvokeFn,
}

impl Implementation {
    /// Constructs a concrete `C`; the name is the type's short name.
    pub fn class<C, F>(signature: Signature, construct: F) -> Self
    where
        C: Send + Sync + 'static,
        F: Fn(&Arguments) -> DiResult<C> + Send + Sync + 'static,
    {
        Implementation {
            name: short_type_name::<C>(),
            kind: ImplementationKind::Class,
            signature,
            invoke: Arc::new(move |args| Ok(Produced::Value(Arc::new(construct(args)?)))),
        }
    }

    /// Produces a trait object for protocol `P`.
    ///
    /// The instance is stored as `Arc<Arc<P>>` and read back with
    /// `Arguments::get_trait`.
    pub fn provides<P, F>(name: &'static str, signature: Signature, construct: F) -> Self
    where
        P: ?Sized + Send + Sync + 'static,
        F: Fn(&Arguments) -> DiResult<Arc<P>> + Send + Sync + 'static,
    {
        Implementation {
            name,
            kind: ImplementationKind::Class,
            signature,
            invoke: Arc::new(move |args| Ok(Produced::Value(Arc::new(construct(args)?)))),
        }
    }

    /// Plain callable returning `T`.
    pub fn function<T, F>(name: &'static str, signature: Signature, call: F) -> Self
    where
        T: Send + Sync + 'static,
        F: Fn(&Arguments) -> DiResult<T> + Send + Sync + 'static,
    {
        Implementation {
            name,
            kind: ImplementationKind::Function,
            signature,
            invoke: Arc::new(move |args| Ok(Produced::Value(Arc::new(call(args)?)))),
        }
    }

    /// Generator yielding `T` and tearing it down when the request scope
    /// closes. Generators cannot be registered as singletons.
    pub fn generator<T, F>(name: &'static str, signature: Signature, call: F) -> Self
    where
        T: Send + Sync + 'static,
        F: Fn(&Arguments) -> DiResult<Generated<T>> + Send + Sync + 'static,
    {
        Self::generator_of_kind(name, ImplementationKind::Generator, signature, call)
    }

    /// Generator whose teardown is awaited. Use `Generated::with_async`.
    pub fn async_generator<T, F>(name: &'static str, signature: Signature, call: F) -> Self
    where
        T: Send + Sync + 'static,
        F: Fn(&Arguments) -> DiResult<Generated<T>> + Send + Sync + 'static,
    {
        Self::generator_of_kind(name, ImplementationKind::AsyncGenerator, signature, call)
    }

    fn generator_of_kind<T, F>(
        name: &'static str,
        kind: ImplementationKind,
        signature: Signature,
        call: F,
    ) -> Self
    where
        T: Send + Sync + 'static,
        F: Fn(&Arguments) -> DiResult<Generated<T>> + Send + Sync + 'static,
    {
        Implementation {
            name,
            kind,
            signature,
            invoke: Arc::new(move |args| {
                let generated = call(args)?;
                if generated.is_async() {
                    tracing::trace!(generator = name, "async teardown scheduled");
                }
                Ok(Produced::Generator(Arc::new(generated.value), generated.teardown))
            }),
        }
    }

    /// Returns the same pre-built instance on every call.
    pub fn constant(name: &'static str, instance: AnyArc) -> Self {
        Implementation {
            name,
            kind: ImplementationKind::Constant,
            signature: Signature::new(),
            invoke: Arc::new(move |_| Ok(Produced::Value(instance.clone()))),
        }
    }

    /// Constant wrapping a concrete value.
    pub fn instance<T: Send + Sync + 'static>(value: T) -> Self {
        Self::constant(short_type_name::<T>(), Arc::new(value))
    }

    /// Display name used in logs and errors.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// How the callable produces values.
    pub fn kind(&self) -> ImplementationKind {
        self.kind
    }

    /// Declared parameters.
    pub fn signature(&self) -> &Signature {
        &self.signature
    }

    /// Whether calls yield a teardown.
    pub fn is_generator(&self) -> bool {
        self.kind.is_generator()
    }

    /// Same callable with a rewritten signature.
    pub fn with_signature(&self, signature: Signature) -> Self {
        Implementation {
            signature,
            ..self.clone()
        }
    }

    /// Calls the implementation with already-bound arguments.
    pub fn invoke(&self, args: &Arguments) -> DiResult<Produced> {
        (self.invoke)(args)
    }

    /// Whether both values wrap the same callable.
    pub fn same_callable(&self, other: &Implementation) -> bool {
        Arc::ptr_eq(&self.invoke, &other.invoke)
    }
}

impl fmt::Debug for Implementation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Implementation")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("params", &self.signature.len())
            .finish()
    }
}

fn short_type_name<T: ?Sized>() -> &'static str {
    let full = type_name::<T>();
    match full.find('<') {
        Some(_) => full,
        None => full.rsplit("::").next().unwrap_or(full),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Counter(u32);

    #[test]
    fn class_uses_short_type_name() {
        let imp = Implementation::class(Signature::new(), |_| Ok(Counter(1)));
        assert_eq!(imp.name(), "Counter");
        assert_eq!(imp.kind(), ImplementationKind::Class);

        let produced = imp.invoke(&Arguments::new("test")).unwrap();
        let counter = produced.value().clone().downcast::<Counter>().unwrap();
        assert_eq!(counter.0, 1);
    }

    #[test]
    fn generator_hands_back_teardown() {
        let imp = Implementation::generator("session", Signature::new(), |_| {
            Ok(Generated::new(5u8, || {}))
        });
        assert!(imp.is_generator());

        match imp.invoke(&Arguments::new("test")).unwrap() {
            Produced::Generator(value, Teardown::Sync(_)) => {
                assert_eq!(*value.downcast::<u8>().unwrap(), 5)
            }
            _ => panic!("expected generator output"),
        }
    }

    #[test]
    fn rewritten_signature_keeps_callable() {
        let imp = Implementation::instance(3u16);
        let rewritten = imp.with_signature(Signature::new());
        assert!(imp.same_callable(&rewritten));
        assert!(!imp.same_callable(&Implementation::instance(3u16)));
    }
}
