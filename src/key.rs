//! Protocol keys for the dependency injection container.

use std::any::TypeId;
use std::fmt;

/// Key identifying a protocol in the container.
///
/// Any `'static` type can act as a protocol, including unsized trait
/// objects such as `dyn NumberService`. The `TypeId` drives equality and
/// hashing while the name is kept for diagnostics and error messages.
///
/// # Examples
///
/// ```rust
/// use ferrous_inject::Key;
///
/// trait NumberService: Send + Sync {
///     fn number(&self) -> i64;
/// }
///
/// let a = Key::of::<dyn NumberService>();
/// let b = Key::of::<dyn NumberService>();
/// assert_eq!(a, b);
/// assert!(a.display_name().contains("NumberService"));
/// assert_ne!(a, Key::of::<String>());
/// ```
#[derive(Clone, Copy)]
pub struct Key {
    id: TypeId,
    name: &'static str,
}

impl Key {
    /// Key for the protocol type `P`.
    #[inline(always)]
    pub fn of<P: ?Sized + 'static>() -> Self {
        Key {
            id: TypeId::of::<P>(),
            name: std::any::type_name::<P>(),
        }
    }

    /// Human-readable protocol name (`std::any::type_name`).
    pub fn display_name(&self) -> &'static str {
        self.name
    }

    /// The last path segment of the protocol name, e.g. `NumberService`
    /// for `dyn my_app::services::NumberService`.
    pub fn short_name(&self) -> &'static str {
        let name = self.name.strip_prefix("dyn ").unwrap_or(self.name);
        match name.find('<') {
            // Generic names keep their arguments intact
            Some(_) => name,
            None => name.rsplit("::").next().unwrap_or(name),
        }
    }

    /// The underlying `TypeId`.
    pub fn type_id(&self) -> TypeId {
        self.id
    }
}

// Equality and hashing use the TypeId only; the name is diagnostic
impl PartialEq for Key {
    #[inline(always)]
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Key {}

impl std::hash::Hash for Key {
    #[inline(always)]
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Debug for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Key({})", self.name)
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.short_name())
    }
}

/// Helper for creating protocol keys.
#[inline(always)]
pub fn key_of<P: ?Sized + 'static>() -> Key {
    Key::of::<P>()
}
