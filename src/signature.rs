//! Declared parameter lists and bound arguments.
//!
//! Rust closures carry no reflective signature, so every implementation and
//! endpoint declares one explicitly. The container rewrites these
//! declarations at registration time (filling in provider defaults) and the
//! request scope consumes the rewritten version as a binding plan.

use std::any::Any;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use crate::error::{DiError, DiResult};
use crate::key::Key;
use crate::provider::Provider;

/// Type-erased shared instance.
pub type AnyArc = Arc<dyn Any + Send + Sync>;

type ParseFn = Arc<dyn Fn(&str) -> Option<AnyArc> + Send + Sync>;

/// Extra metadata attached to an annotation, the equivalent of the extras
/// in `Annotated[T, ...]`.
#[derive(Clone)]
pub enum Metadata {
    /// An additional protocol to resolve this parameter from.
    Tag(Key),
    /// A host marker; the parameter is already resolved by the host.
    Marker(Provider),
}

impl fmt::Debug for Metadata {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Metadata::Tag(key) => write!(f, "Tag({})", key.display_name()),
            Metadata::Marker(provider) => write!(f, "Marker({:?})", provider),
        }
    }
}

/// Declared type of a parameter plus its metadata.
///
/// ```rust
/// use ferrous_inject::Annotation;
///
/// trait Clock: Send + Sync {}
/// struct Timestamp;
///
/// let annotation = Annotation::of::<u64>().tagged::<Timestamp>().tagged::<dyn Clock>();
/// assert_eq!(annotation.tags().count(), 2);
/// assert!(!annotation.has_marker());
/// ```
#[derive(Clone, Debug)]
pub struct Annotation {
    key: Key,
    metadata: Vec<Metadata>,
}

impl Annotation {
    /// Bare annotation of type `T`.
    pub fn of<T: ?Sized + 'static>() -> Self {
        Annotation {
            key: Key::of::<T>(),
            metadata: Vec::new(),
        }
    }

    /// Adds a protocol tag; tags are tried in declaration order.
    pub fn tagged<P: ?Sized + 'static>(mut self) -> Self {
        self.metadata.push(Metadata::Tag(Key::of::<P>()));
        self
    }

    /// Adds a host marker to the metadata.
    pub fn with_marker(mut self, provider: Provider) -> Self {
        self.metadata.push(Metadata::Marker(provider));
        self
    }

    /// Type key of the annotated parameter.
    pub fn key(&self) -> Key {
        self.key
    }

    /// Tags and markers in declaration order.
    pub fn metadata(&self) -> &[Metadata] {
        &self.metadata
    }

    /// Protocol tags in declaration order.
    pub fn tags(&self) -> impl Iterator<Item = Key> + '_ {
        self.metadata.iter().filter_map(|m| match m {
            Metadata::Tag(key) => Some(*key),
            Metadata::Marker(_) => None,
        })
    }

    /// The first host marker in the metadata, if any.
    pub fn marker(&self) -> Option<&Provider> {
        self.metadata.iter().find_map(|m| match m {
            Metadata::Marker(provider) => Some(provider),
            Metadata::Tag(_) => None,
        })
    }

    /// Whether a host marker is present.
    pub fn has_marker(&self) -> bool {
        self.marker().is_some()
    }
}

/// Default of a declared parameter.
#[derive(Clone)]
pub enum ParamDefault {
    /// No default; the value must come from the request.
    Empty,
    /// A plain value used when the request does not supply one.
    Value(AnyArc),
    /// A provider resolved by the request scope.
    Marker(Provider),
}

impl fmt::Debug for ParamDefault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamDefault::Empty => f.write_str("Empty"),
            ParamDefault::Value(_) => f.write_str("Value(..)"),
            ParamDefault::Marker(provider) => write!(f, "Marker({:?})", provider),
        }
    }
}

/// Where the host reads a parameter that no provider satisfies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueSource {
    Query,
    Path,
    Header,
    Cookie,
}

/// One declared parameter: `(name, annotation, default)`.
///
/// # Examples
///
/// ```rust
/// use ferrous_inject::{Parameter, ValueSource};
///
/// trait NumberService: Send + Sync {}
///
/// let service = Parameter::typed::<dyn NumberService>("service");
/// assert!(service.annotation().is_some());
/// assert!(!service.has_marker_default());
///
/// let page = Parameter::query::<u32>("page").with_value(1u32);
/// assert_eq!(page.source(), Some(ValueSource::Query));
/// ```
#[derive(Clone)]
pub struct Parameter {
    name: &'static str,
    annotation: Option<Annotation>,
    default: ParamDefault,
    source: Option<ValueSource>,
    parser: Option<ParseFn>,
}

impl Parameter {
    /// Unannotated parameter, read from the query string as a `String`.
    pub fn new(name: &'static str) -> Self {
        Parameter {
            name,
            annotation: None,
            default: ParamDefault::Empty,
            source: Some(ValueSource::Query),
            parser: Some(parser_for::<String>()),
        }
    }

    /// Parameter annotated with type `T` and nothing else.
    pub fn typed<T: ?Sized + 'static>(name: &'static str) -> Self {
        Self::annotated(name, Annotation::of::<T>())
    }

    /// Parameter with a full annotation, e.g. one carrying protocol tags.
    pub fn annotated(name: &'static str, annotation: Annotation) -> Self {
        Parameter {
            name,
            annotation: Some(annotation),
            default: ParamDefault::Empty,
            source: None,
            parser: None,
        }
    }

    /// Query-string parameter parsed into `T`.
    pub fn query<T>(name: &'static str) -> Self
    where
        T: FromStr + Send + Sync + 'static,
    {
        Self::from_request::<T>(name, ValueSource::Query)
    }

    /// Path segment parameter (`/items/{id}`) parsed into `T`.
    pub fn path<T>(name: &'static str) -> Self
    where
        T: FromStr + Send + Sync + 'static,
    {
        Self::from_request::<T>(name, ValueSource::Path)
    }

    /// Header parameter parsed into `T`; header names are case-insensitive.
    pub fn header<T>(name: &'static str) -> Self
    where
        T: FromStr + Send + Sync + 'static,
    {
        Self::from_request::<T>(name, ValueSource::Header)
    }

    /// Cookie parameter parsed into `T`.
    pub fn cookie<T>(name: &'static str) -> Self
    where
        T: FromStr + Send + Sync + 'static,
    {
        Self::from_request::<T>(name, ValueSource::Cookie)
    }

    fn from_request<T>(name: &'static str, source: ValueSource) -> Self
    where
        T: FromStr + Send + Sync + 'static,
    {
        Parameter {
            name,
            annotation: Some(Annotation::of::<T>()),
            default: ParamDefault::Empty,
            source: Some(source),
            parser: Some(parser_for::<T>()),
        }
    }

    /// Receiver parameter; dropped when the signature is rewritten.
    pub fn receiver() -> Self {
        Parameter {
            name: "self",
            annotation: None,
            default: ParamDefault::Empty,
            source: None,
            parser: None,
        }
    }

    /// Sets an explicit host marker as the default.
    pub fn depends(mut self, provider: Provider) -> Self {
        self.default = ParamDefault::Marker(provider);
        self
    }

    /// Sets a plain default value.
    pub fn with_value<T: Send + Sync + 'static>(mut self, value: T) -> Self {
        self.default = ParamDefault::Value(Arc::new(value));
        self
    }

    /// Parameter name, used as the argument key.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Type annotation, if declared.
    pub fn annotation(&self) -> Option<&Annotation> {
        self.annotation.as_ref()
    }

    /// Declared default.
    pub fn default(&self) -> &ParamDefault {
        &self.default
    }

    /// Request location for non-injected parameters.
    pub fn source(&self) -> Option<ValueSource> {
        self.source
    }

    /// Whether this is the `self` receiver.
    pub fn is_receiver(&self) -> bool {
        self.name == "self"
    }

    /// The provider this parameter resolves from, if one is set.
    pub fn marker(&self) -> Option<&Provider> {
        match &self.default {
            ParamDefault::Marker(provider) => Some(provider),
            _ => None,
        }
    }

    /// Whether the default is a provider marker.
    pub fn has_marker_default(&self) -> bool {
        self.marker().is_some()
    }

    /// Copy of this parameter with `provider` as its default.
    pub(crate) fn replace_default(&self, provider: Provider) -> Self {
        let mut param = self.clone();
        param.default = ParamDefault::Marker(provider);
        param
    }

    pub(crate) fn parse(&self, raw: &str) -> DiResult<AnyArc> {
        let parser = self.parser.as_ref().ok_or(DiError::MissingArgument {
            target: "request",
            parameter: self.name,
        })?;
        parser(raw).ok_or_else(|| DiError::InvalidParameter {
            parameter: self.name,
            value: raw.to_string(),
        })
    }
}

impl fmt::Debug for Parameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Parameter")
            .field("name", &self.name)
            .field("annotation", &self.annotation)
            .field("default", &self.default)
            .field("source", &self.source)
            .finish()
    }
}

fn parser_for<T>() -> ParseFn
where
    T: FromStr + Send + Sync + 'static,
{
    Arc::new(|raw: &str| raw.parse::<T>().ok().map(|v| Arc::new(v) as AnyArc))
}

/// Ordered parameter list of an implementation or endpoint.
#[derive(Clone, Debug, Default)]
pub struct Signature {
    params: Vec<Parameter>,
}

impl Signature {
    /// Empty signature.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style append.
    pub fn param(mut self, param: Parameter) -> Self {
        self.params.push(param);
        self
    }

    /// Parameters in declaration order.
    pub fn params(&self) -> &[Parameter] {
        &self.params
    }

    /// Parameter named `name`.
    pub fn get(&self, name: &str) -> Option<&Parameter> {
        self.params.iter().find(|p| p.name == name)
    }

    /// Number of parameters.
    pub fn len(&self) -> usize {
        self.params.len()
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    /// Same signature with a new parameter list.
    pub fn replace(&self, params: Vec<Parameter>) -> Self {
        Signature { params }
    }
}

impl FromIterator<Parameter> for Signature {
    fn from_iter<I: IntoIterator<Item = Parameter>>(iter: I) -> Self {
        Signature {
            params: iter.into_iter().collect(),
        }
    }
}

/// Arguments bound for one invocation, keyed by parameter name.
///
/// # Examples
///
/// ```rust
/// use ferrous_inject::Arguments;
///
/// let args = Arguments::new("Greeting").with("name", "ferris".to_string());
/// assert_eq!(*args.get::<String>("name").unwrap(), "ferris");
/// assert!(args.get::<u32>("name").is_err());
/// assert!(args.get::<String>("missing").is_err());
/// ```
#[derive(Clone, Default)]
pub struct Arguments {
    target: &'static str,
    values: Vec<(&'static str, AnyArc)>,
}

impl Arguments {
    /// Empty argument set for `target`.
    pub fn new(target: &'static str) -> Self {
        Arguments {
            target,
            values: Vec::new(),
        }
    }

    /// Builder-style insert of a concrete value.
    pub fn with<T: Send + Sync + 'static>(mut self, name: &'static str, value: T) -> Self {
        self.insert(name, Arc::new(value));
        self
    }

    pub(crate) fn insert(&mut self, name: &'static str, value: AnyArc) {
        match self.values.iter_mut().find(|(n, _)| *n == name) {
            Some(slot) => slot.1 = value,
            None => self.values.push((name, value)),
        }
    }

    /// Raw type-erased value.
    pub fn raw(&self, name: &str) -> Option<&AnyArc> {
        self.values.iter().find(|(n, _)| *n == name).map(|(_, v)| v)
    }

    fn require(&self, name: &'static str) -> DiResult<&AnyArc> {
        self.raw(name).ok_or(DiError::MissingArgument {
            target: self.target,
            parameter: name,
        })
    }

    /// Concrete value of type `T`.
    pub fn get<T: Send + Sync + 'static>(&self, name: &'static str) -> DiResult<Arc<T>> {
        self.require(name)?
            .clone()
            .downcast::<T>()
            .map_err(|_| DiError::TypeMismatch(std::any::type_name::<T>()))
    }

    /// Trait object registered through `Implementation::provides`.
    pub fn get_trait<T: ?Sized + Send + Sync + 'static>(&self, name: &'static str) -> DiResult<Arc<T>> {
        self.require(name)?
            .downcast_ref::<Arc<T>>()
            .cloned()
            .ok_or(DiError::TypeMismatch(std::any::type_name::<T>()))
    }

    /// Cloned concrete value, convenient for `String` and numbers.
    pub fn value<T: Clone + Send + Sync + 'static>(&self, name: &'static str) -> DiResult<T> {
        self.get::<T>(name).map(|v| (*v).clone())
    }

    /// Whether a value is bound for `name`.
    pub fn contains(&self, name: &str) -> bool {
        self.raw(name).is_some()
    }

    /// Number of bound values.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Name of the callable these arguments are bound for.
    pub fn target(&self) -> &'static str {
        self.target
    }
}

impl fmt::Debug for Arguments {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Arguments")
            .field("target", &self.target)
            .field("names", &self.values.iter().map(|(n, _)| *n).collect::<Vec<_>>())
            .finish()
    }
}

/// Downcasts a resolved instance to a concrete type.
pub fn downcast_instance<T: Send + Sync + 'static>(instance: AnyArc) -> DiResult<Arc<T>> {
    instance
        .downcast::<T>()
        .map_err(|_| DiError::TypeMismatch(std::any::type_name::<T>()))
}

/// Downcasts a resolved instance to a trait object.
pub fn downcast_trait<T: ?Sized + Send + Sync + 'static>(instance: &AnyArc) -> DiResult<Arc<T>> {
    instance
        .downcast_ref::<Arc<T>>()
        .cloned()
        .ok_or(DiError::TypeMismatch(std::any::type_name::<T>()))
}
