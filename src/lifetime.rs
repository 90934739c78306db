//! Service lifetime definitions.

use std::fmt;

/// Lifetime policy controlling how a registered protocol is cached.
///
/// - **Singleton**: built once at registration time and shared by every
///   request for the life of the process
/// - **Scoped**: built once per request; every consumer inside the same
///   request sees the same instance
/// - **Factory**: built fresh on every resolution, never cached
///
/// # Examples
///
/// ```rust
/// use ferrous_inject::Lifetime;
///
/// assert!(Lifetime::Singleton.use_cache());
/// assert!(Lifetime::Scoped.use_cache());
/// assert!(!Lifetime::Factory.use_cache());
///
/// // A singleton must not capture short-lived state
/// assert!(!Lifetime::Singleton.may_depend_on(Lifetime::Scoped));
/// assert!(Lifetime::Factory.may_depend_on(Lifetime::Singleton));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "config", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "config", serde(rename_all = "lowercase"))]
pub enum Lifetime {
    /// One instance per process, constructed eagerly at registration.
    Singleton,
    /// One instance per request, cached by the request scope.
    Scoped,
    /// A new instance per resolution.
    Factory,
}

impl Lifetime {
    /// Whether providers of this lifetime are cached by the request scope.
    ///
    /// True for `Singleton` and `Scoped`, false for `Factory`.
    #[inline]
    pub fn use_cache(self) -> bool {
        !matches!(self, Lifetime::Factory)
    }

    /// Whether a service of this lifetime can safely hold a dependency of
    /// lifetime `dependency`.
    ///
    /// Singleton → Scoped/Factory and Scoped → Factory are reported as
    /// lifetime violations: the longer-lived instance would capture state
    /// that is meant to be short-lived.
    pub fn may_depend_on(self, dependency: Lifetime) -> bool {
        !matches!(
            (self, dependency),
            (Lifetime::Singleton, Lifetime::Scoped)
                | (Lifetime::Singleton, Lifetime::Factory)
                | (Lifetime::Scoped, Lifetime::Factory)
        )
    }

    /// Effective lifetime of an override when a secondary container
    /// replaces a protocol registered in the primary one.
    ///
    /// The replacement callable comes from the secondary registration while
    /// the cache flag stays the primary's, which gives:
    ///
    /// | primary   | secondary     | effective |
    /// |-----------|---------------|-----------|
    /// | Singleton | Scoped/Factory| Scoped    |
    /// | Scoped/Factory | Singleton| Singleton |
    /// | any       | any other     | primary   |
    ///
    /// ```rust
    /// use ferrous_inject::Lifetime;
    ///
    /// assert_eq!(Lifetime::reconcile(Lifetime::Singleton, Lifetime::Factory), Lifetime::Scoped);
    /// assert_eq!(Lifetime::reconcile(Lifetime::Factory, Lifetime::Singleton), Lifetime::Singleton);
    /// assert_eq!(Lifetime::reconcile(Lifetime::Scoped, Lifetime::Factory), Lifetime::Scoped);
    /// ```
    pub fn reconcile(primary: Lifetime, secondary: Lifetime) -> Lifetime {
        match (primary, secondary) {
            (Lifetime::Singleton, Lifetime::Singleton) => Lifetime::Singleton,
            (Lifetime::Singleton, _) => Lifetime::Scoped,
            (_, Lifetime::Singleton) => Lifetime::Singleton,
            (primary, _) => primary,
        }
    }
}

impl fmt::Display for Lifetime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Lifetime::Singleton => "singleton",
            Lifetime::Scoped => "scoped",
            Lifetime::Factory => "factory",
        })
    }
}

impl std::str::FromStr for Lifetime {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "singleton" => Ok(Lifetime::Singleton),
            "scoped" => Ok(Lifetime::Scoped),
            "factory" | "transient" => Ok(Lifetime::Factory),
            other => Err(format!("unknown lifetime: {}", other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: [Lifetime; 3] = [Lifetime::Singleton, Lifetime::Scoped, Lifetime::Factory];

    #[test]
    fn reconcile_keeps_primary_unless_singleton_involved() {
        for primary in ALL {
            for secondary in ALL {
                let effective = Lifetime::reconcile(primary, secondary);
                match (primary, secondary) {
                    (Lifetime::Singleton, Lifetime::Singleton) => assert_eq!(effective, Lifetime::Singleton),
                    (Lifetime::Singleton, _) => assert_eq!(effective, Lifetime::Scoped),
                    (_, Lifetime::Singleton) => assert_eq!(effective, Lifetime::Singleton),
                    _ => assert_eq!(effective, primary),
                }
            }
        }
    }

    #[test]
    fn same_lifetime_is_always_safe() {
        for lifetime in ALL {
            assert!(lifetime.may_depend_on(lifetime));
            assert!(lifetime.may_depend_on(Lifetime::Singleton));
        }
    }

    #[test]
    fn parses_transient_alias() {
        assert_eq!("transient".parse::<Lifetime>(), Ok(Lifetime::Factory));
        assert_eq!(" Scoped ".parse::<Lifetime>(), Ok(Lifetime::Scoped));
        assert!("request".parse::<Lifetime>().is_err());
    }
}
