use ferrous_inject::routing::{Endpoint, Request, RouteTable};
use ferrous_inject::{
    Annotation, Arguments, Container, DependencyItem, DiResult, Implementation, Injectified,
    Parameter, RequestScope, Signature,
};
use serde_json::json;
use std::sync::atomic::{AtomicI64, AtomicUsize, Ordering};
use std::sync::Arc;

const SERVICE_NUMBER: i64 = 7;
const NESTED_NUMBER: i64 = 3;

trait NumberService: Send + Sync {
    fn number(&self) -> i64;
    fn instance(&self) -> usize;
}

struct Numbers {
    instance: usize,
}

impl NumberService for Numbers {
    fn number(&self) -> i64 {
        SERVICE_NUMBER
    }

    fn instance(&self) -> usize {
        self.instance
    }
}

// Protocol for a plain number derived from `dyn NumberService`
enum NestedNumber {}

trait NestedService: Send + Sync {
    fn number(&self) -> i64;
    fn service_number(&self) -> i64;
    fn service_instance(&self) -> usize;
}

struct Nested {
    service: Arc<dyn NumberService>,
    nested: i64,
}

impl NestedService for Nested {
    fn number(&self) -> i64 {
        self.nested
    }

    fn service_number(&self) -> i64 {
        self.service.number()
    }

    fn service_instance(&self) -> usize {
        self.service.instance()
    }
}

enum GlobalNested {}

fn nested_service(args: &Arguments) -> DiResult<Arc<dyn NestedService>> {
    Ok(Arc::new(Nested {
        service: args.get_trait::<dyn NumberService>("service")?,
        nested: args.value::<i64>("nested")?,
    }))
}

struct Fixture {
    app: Injectified<RouteTable>,
    container: Container,
    global_state: Arc<AtomicI64>,
}

fn fixture() -> Fixture {
    let instances = Arc::new(AtomicUsize::new(0));
    let global_state = Arc::new(AtomicI64::new(0));
    let container = Container::new();

    container
        .add_scoped::<dyn NumberService>(Implementation::provides::<dyn NumberService, _>(
            "Numbers",
            Signature::new(),
            move |_| {
                let instance = instances.fetch_add(1, Ordering::SeqCst);
                Ok(Arc::new(Numbers { instance }) as Arc<dyn NumberService>)
            },
        ))
        .unwrap();

    container
        .add_scoped::<NestedNumber>(Implementation::function(
            "nested_number",
            Signature::new().param(Parameter::typed::<dyn NumberService>("service")),
            |args| Ok(args.get_trait::<dyn NumberService>("service")?.number() - 4),
        ))
        .unwrap();

    container
        .add_scoped::<dyn NestedService>(Implementation::provides(
            "Nested",
            Signature::new()
                .param(Parameter::receiver())
                .param(Parameter::typed::<dyn NumberService>("service"))
                .param(Parameter::annotated("nested", Annotation::of::<i64>().tagged::<NestedNumber>())),
            nested_service,
        ))
        .unwrap();

    let state = global_state.clone();
    container
        .add_scoped::<GlobalNested>(Implementation::function(
            "global_nested",
            Signature::new().param(Parameter::annotated(
                "number",
                Annotation::of::<i64>().tagged::<NestedNumber>(),
            )),
            move |args| {
                state.store(args.value::<i64>("number")?, Ordering::SeqCst);
                Ok(())
            },
        ))
        .unwrap();

    let usual = container.resolve_type::<NestedNumber>().unwrap();
    let signature = Signature::new()
        .param(Parameter::new("text"))
        .param(Parameter::typed::<dyn NestedService>("service"))
        .param(Parameter::typed::<dyn NumberService>("numbers"))
        .param(Parameter::annotated("nested", Annotation::of::<i64>().tagged::<NestedNumber>()))
        .param(Parameter::typed::<i64>("usual").depends(usual));

    let mut app = container.injectify(RouteTable::new());
    app.add_global_dependency(DependencyItem::protocol::<GlobalNested>())
        .unwrap();
    app.get(
        "/test",
        Endpoint::sync("nested", signature, |args| {
            let service = args.get_trait::<dyn NestedService>("service")?;
            let numbers = args.get_trait::<dyn NumberService>("numbers")?;
            Ok(json!({
                "n1": service.number(),
                "n2": service.service_number(),
                "n4": args.value::<i64>("nested")?,
                "n5": args.value::<i64>("usual")?,
                "txt": args.value::<String>("text")?,
                "same_instance": service.service_instance() == numbers.instance(),
            }))
        }),
    )
    .unwrap();

    Fixture {
        app,
        container,
        global_state,
    }
}

#[tokio::test]
async fn test_nested_dependencies() {
    let fixture = fixture();

    let response = fixture
        .app
        .dispatch(Request::get("/test").query("text", "hello"))
        .await;
    assert_eq!(response.status, 200, "{}", response.body);

    let data = &response.body;
    assert_eq!(data["n2"], SERVICE_NUMBER);
    assert_eq!(data["n1"], NESTED_NUMBER);
    assert_eq!(data["n4"], NESTED_NUMBER);
    assert_eq!(data["n5"], NESTED_NUMBER);
    assert_eq!(data["txt"], "hello");
    // The nested field is the same scoped instance the endpoint receives
    assert_eq!(data["same_instance"], true);
    assert_eq!(fixture.global_state.load(Ordering::SeqCst), NESTED_NUMBER);
}

#[tokio::test]
async fn test_missing_query_parameter_is_unprocessable() {
    let fixture = fixture();
    let response = fixture.app.dispatch(Request::get("/test")).await;
    assert_eq!(response.status, 422);
    assert!(response.body["detail"].as_str().unwrap().contains("text"));
}

#[test]
fn test_nested_field_matches_direct_resolution() {
    let fixture = fixture();
    let container = &fixture.container;

    let scope = RequestScope::detached();
    let nested = scope
        .resolve_trait::<dyn NestedService>(&container.resolve_type::<dyn NestedService>().unwrap())
        .unwrap();
    let direct = scope
        .resolve_trait::<dyn NumberService>(&container.resolve_type::<dyn NumberService>().unwrap())
        .unwrap();

    assert_eq!(nested.service_instance(), direct.instance());
    assert_eq!(nested.service_number(), direct.number());
}

#[test]
fn test_registration_order_matters() {
    // Registered before its dependency: the parameter stays unresolved
    let container = Container::new();
    container
        .add_factory::<dyn NestedService>(Implementation::provides(
            "Nested",
            Signature::new()
                .param(Parameter::typed::<dyn NumberService>("service"))
                .param(Parameter::annotated("nested", Annotation::of::<i64>().tagged::<NestedNumber>())),
            nested_service,
        ))
        .unwrap();

    let descriptor = container.descriptors().pop().unwrap();
    assert_eq!(descriptor.injected_params, 0);

    let provider = container.resolve_type::<dyn NestedService>().unwrap();
    assert!(RequestScope::detached().resolve(&provider).is_err());
}
