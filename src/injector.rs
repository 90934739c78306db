//! Nested injection: rewriting declared signatures against the registry.
//!
//! Per parameter, in order:
//!
//! 1. an explicit provider default or an annotation carrying a host marker
//!    is left untouched;
//! 2. protocol tags in the annotation are tried in declaration order and
//!    the first registered one becomes the default;
//! 3. otherwise the bare annotation is looked up.
//!
//! Lookups that miss leave the parameter as declared. Receiver parameters
//! are dropped.

use crate::config::ViolationPolicy;
use crate::container::Container;
use crate::dependency::Dependency;
use crate::error::{DiError, DiResult};
use crate::implementation::Implementation;
use crate::provider::Provider;
use crate::signature::{Parameter, Signature};

/// Provider a parameter should default to, if the registry has one.
pub(crate) fn provider_for(container: &Container, param: &Parameter) -> Option<Provider> {
    if param.has_marker_default() {
        return None;
    }
    let annotation = param.annotation()?;
    if annotation.has_marker() {
        return None;
    }

    let mut tags = annotation.tags().peekable();
    if tags.peek().is_some() {
        return tags.find_map(|tag| container.resolve(&tag).ok());
    }

    container.resolve(&annotation.key()).ok()
}

/// Rewrites `signature`, returning the new signature and the number of
/// parameters that received a provider.
pub(crate) fn inject_signature(container: &Container, signature: &Signature) -> (Signature, usize) {
    let mut injected = 0;
    let params = signature
        .params()
        .iter()
        .filter(|param| !param.is_receiver())
        .map(|param| match provider_for(container, param) {
            Some(provider) => {
                injected += 1;
                param.replace_default(provider)
            }
            None => param.clone(),
        })
        .collect();
    (signature.replace(params), injected)
}

/// Rewrites the implementation of `dependency` and checks the lifetimes of
/// every provider it now depends on.
pub(crate) fn nested_inject(container: &Container, dependency: &Dependency) -> DiResult<Implementation> {
    let implementation = &dependency.implementation;
    let (signature, injected) = inject_signature(container, implementation.signature());

    for param in signature.params() {
        let Some(provider) = param.marker() else {
            continue;
        };
        let Some(dependency_lifetime) = provider.lifetime() else {
            continue;
        };
        if dependency.lifetime.may_depend_on(dependency_lifetime) {
            continue;
        }

        match container.config().lifetime_violations {
            ViolationPolicy::Ignore => {}
            ViolationPolicy::Warn => tracing::warn!(
                service = implementation.name(),
                service_lifetime = %dependency.lifetime,
                dependency = provider.name(),
                dependency_lifetime = %dependency_lifetime,
                parameter = param.name(),
                "lifetime violation: longer-lived service captures a shorter-lived dependency"
            ),
            ViolationPolicy::Deny => {
                return Err(DiError::LifetimeViolation {
                    service: implementation.name(),
                    service_lifetime: dependency.lifetime,
                    dependency: provider.name(),
                    dependency_lifetime,
                })
            }
        }
    }

    if injected > 0 {
        tracing::debug!(
            implementation = implementation.name(),
            injected,
            "nested dependencies injected"
        );
    }
    Ok(implementation.with_signature(signature))
}
