//! Dependency records and registry descriptors.

use std::fmt;

use crate::implementation::{Implementation, ImplementationKind};
use crate::key::Key;
use crate::lifetime::Lifetime;

/// One registration request: `protocol → implementation` with a lifetime.
///
/// Hooks receive the record before it is processed and may return a
/// different one.
#[derive(Clone, Debug)]
pub struct Dependency {
    pub protocol: Key,
    pub implementation: Implementation,
    pub lifetime: Lifetime,
}

impl Dependency {
    /// Registration record for `protocol`.
    pub fn new(protocol: Key, implementation: Implementation, lifetime: Lifetime) -> Self {
        Dependency {
            protocol,
            implementation,
            lifetime,
        }
    }

    /// Same record with a different implementation.
    pub fn with_implementation(self, implementation: Implementation) -> Self {
        Dependency {
            implementation,
            ..self
        }
    }

    /// Same record with a different lifetime.
    pub fn with_lifetime(self, lifetime: Lifetime) -> Self {
        Dependency { lifetime, ..self }
    }
}

/// Metadata about a registered protocol, for introspection and diagnostics.
///
/// # Examples
///
/// ```rust
/// use ferrous_inject::{Container, Implementation, Lifetime, Signature};
///
/// struct Settings;
///
/// let container = Container::new();
/// container.add_scoped::<Settings>(Implementation::class(Signature::new(), |_| Ok(Settings))).unwrap();
///
/// let descriptors = container.descriptors();
/// assert_eq!(descriptors.len(), 1);
/// assert_eq!(descriptors[0].lifetime, Lifetime::Scoped);
/// assert_eq!(descriptors[0].implementation_name, "Settings");
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct DependencyDescriptor {
    pub protocol: Key,
    pub lifetime: Lifetime,
    pub implementation_name: &'static str,
    pub implementation_kind: ImplementationKind,
    /// Number of parameters resolved to providers at registration.
    pub injected_params: usize,
}

impl DependencyDescriptor {
    /// Display name of the protocol.
    pub fn protocol_name(&self) -> &'static str {
        self.protocol.display_name()
    }

    /// Whether the lifetime is singleton.
    pub fn is_singleton(&self) -> bool {
        self.lifetime == Lifetime::Singleton
    }
}

impl fmt::Display for DependencyDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} -> {} ({})",
            self.protocol.short_name(),
            self.implementation_name,
            self.lifetime
        )
    }
}
