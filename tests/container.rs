use ferrous_inject::{
    Arguments, Container, ContainerHooks, Dependency, DiError, DiResult, Implementation,
    ImplementationKind, Key, Lifetime, LoggingHooks, Provider, RequestScope, Signature,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

trait NumberService: Send + Sync {
    fn number(&self) -> i64;
}

struct Fixed(i64);

impl NumberService for Fixed {
    fn number(&self) -> i64 {
        self.0
    }
}

fn fixed(value: i64) -> Implementation {
    Implementation::provides::<dyn NumberService, _>("Fixed", Signature::new(), move |_| {
        Ok(Arc::new(Fixed(value)) as Arc<dyn NumberService>)
    })
}

fn number_of(provider: &Provider) -> i64 {
    RequestScope::detached()
        .resolve_trait::<dyn NumberService>(provider)
        .unwrap()
        .number()
}

#[test]
fn test_unregistered_protocol() {
    let container = Container::new();
    let err = container.resolve_type::<dyn NumberService>().unwrap_err();
    assert!(err.is_not_registered());
    assert!(err.to_string().contains("NumberService"));
    assert!(err.to_string().ends_with("is not registered in the container"));
    assert_eq!(
        container.check_registered_type::<dyn NumberService>(),
        Err(DiError::NotRegistered(Key::of::<dyn NumberService>().display_name()))
    );
}

#[test]
fn test_last_registration_wins() {
    let container = Container::new();
    container.add_scoped::<dyn NumberService>(fixed(1)).unwrap();
    container.add_singleton::<dyn NumberService>(fixed(2)).unwrap();

    let provider = container.resolve_type::<dyn NumberService>().unwrap();
    assert_eq!(number_of(&provider), 2);
    assert_eq!(provider.lifetime(), Some(Lifetime::Singleton));
    assert_eq!(container.len(), 1);
}

#[test]
fn test_resolve_returns_same_provider() {
    let container = Container::new();
    container.add_scoped::<dyn NumberService>(fixed(5)).unwrap();
    let a = container.resolve_type::<dyn NumberService>().unwrap();
    let b = container.resolve_type::<dyn NumberService>().unwrap();
    assert_eq!(a, b);
    assert_eq!(a.protocol(), Some(Key::of::<dyn NumberService>()));
}

#[test]
fn test_singleton_constructed_once_at_registration() {
    let built = Arc::new(AtomicUsize::new(0));
    let counter = built.clone();

    let container = Container::new();
    container
        .add_singleton::<dyn NumberService>(Implementation::provides::<dyn NumberService, _>(
            "Counted",
            Signature::new(),
            move |_| {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(Arc::new(Fixed(9)) as Arc<dyn NumberService>)
            },
        ))
        .unwrap();
    assert_eq!(built.load(Ordering::SeqCst), 1);

    let provider = container.resolve_type::<dyn NumberService>().unwrap();
    let first = RequestScope::detached().resolve(&provider).unwrap();
    let second = RequestScope::detached().resolve(&provider).unwrap();
    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(built.load(Ordering::SeqCst), 1);
}

#[test]
fn test_construction_error_propagates() {
    let container = Container::new();
    let err = container
        .add_singleton::<dyn NumberService>(Implementation::provides::<dyn NumberService, _>(
            "Broken",
            Signature::new(),
            |_: &Arguments| -> DiResult<Arc<dyn NumberService>> {
                Err(DiError::construction("database unreachable"))
            },
        ))
        .unwrap_err();
    assert_eq!(err, DiError::Construction("database unreachable".into()));
    assert!(container.is_empty());
}

#[test]
fn test_hooks_observe_registration_and_resolution() {
    let registered = Arc::new(Mutex::new(Vec::new()));
    let resolved = Arc::new(AtomicUsize::new(0));

    let container = Container::new();
    {
        let registered = registered.clone();
        container.on_before_register(move |dependency: Dependency| {
            registered
                .lock()
                .unwrap()
                .push((dependency.implementation.name(), dependency.lifetime));
            dependency
        });
    }
    {
        let resolved = resolved.clone();
        container.on_before_resolve(move |provider| {
            resolved.fetch_add(1, Ordering::SeqCst);
            provider
        });
    }

    container.add_scoped::<dyn NumberService>(fixed(3)).unwrap();
    let provider = container.resolve_type::<dyn NumberService>().unwrap();

    assert_eq!(number_of(&provider), 3);
    assert_eq!(*registered.lock().unwrap(), vec![("Fixed", Lifetime::Scoped)]);
    assert_eq!(resolved.load(Ordering::SeqCst), 1);
    assert_eq!(container.hook_count(), 2);
}

struct SwapImplementation;

impl ContainerHooks for SwapImplementation {
    fn before_register(&self, dependency: Dependency) -> Dependency {
        dependency
            .with_implementation(fixed(100))
            .with_lifetime(Lifetime::Factory)
    }
}

struct SwapProvider(Provider);

impl ContainerHooks for SwapProvider {
    fn before_resolve(&self, _provider: Provider) -> Provider {
        self.0.clone()
    }
}

#[test]
fn test_hooks_can_replace_records_and_providers() {
    let container = Container::new();
    container.add_hooks(Arc::new(SwapImplementation));
    container.add_scoped::<dyn NumberService>(fixed(1)).unwrap();

    let provider = container.resolve_type::<dyn NumberService>().unwrap();
    assert_eq!(number_of(&provider), 100);
    assert_eq!(provider.lifetime(), Some(Lifetime::Factory));

    let replacement = Provider::new(fixed(7), true);
    container.add_hooks(Arc::new(SwapProvider(replacement.clone())));
    assert_eq!(container.resolve_type::<dyn NumberService>().unwrap(), replacement);
}

#[test]
fn test_hooks_run_in_installation_order() {
    let order = Arc::new(Mutex::new(Vec::new()));
    let container = Container::new();
    for label in ["first", "second"] {
        let order = order.clone();
        container.on_before_register(move |dependency| {
            order.lock().unwrap().push(label);
            dependency
        });
    }
    container.add_factory::<dyn NumberService>(fixed(0)).unwrap();
    assert_eq!(*order.lock().unwrap(), vec!["first", "second"]);
}

#[test]
fn test_logging_hooks_pass_through() {
    let _guard = tracing::subscriber::set_default(
        tracing_subscriber::fmt().with_test_writer().finish(),
    );

    let container = Container::new();
    container.add_hooks(Arc::new(LoggingHooks::with_prefix("test")));
    container.add_scoped::<dyn NumberService>(fixed(11)).unwrap();
    let provider = container.resolve_type::<dyn NumberService>().unwrap();
    assert_eq!(number_of(&provider), 11);
}

#[test]
fn test_descriptors() {
    struct Settings;

    let container = Container::new();
    container.add_scoped::<dyn NumberService>(fixed(1)).unwrap();
    container
        .add_singleton::<Settings>(Implementation::class(Signature::new(), |_| Ok(Settings)))
        .unwrap();

    let descriptors = container.descriptors();
    assert_eq!(descriptors.len(), 2);

    let number = descriptors
        .iter()
        .find(|d| d.protocol == Key::of::<dyn NumberService>())
        .unwrap();
    assert_eq!(number.lifetime, Lifetime::Scoped);
    assert_eq!(number.implementation_kind, ImplementationKind::Class);
    assert_eq!(number.to_string(), "NumberService -> Fixed (scoped)");

    let settings = descriptors.iter().find(|d| d.is_singleton()).unwrap();
    assert_eq!(settings.implementation_name, "Settings");
    assert_eq!(settings.implementation_kind, ImplementationKind::Class);
}
