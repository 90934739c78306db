use ferrous_inject::routing::{Endpoint, Request, RouteOptions, RouteRegistrar, RouteTable};
use ferrous_inject::{
    Annotation, Container, DependencyItem, Implementation, Injectified, Key, ParamDefault, Parameter,
    Provider, Signature,
};
use serde_json::json;

struct Greeting(&'static str);

fn greeting_endpoint() -> Endpoint {
    Endpoint::sync(
        "greet",
        Signature::new().param(Parameter::typed::<Greeting>("greeting")),
        |args| Ok(json!({ "message": args.get::<Greeting>("greeting")?.0 })),
    )
}

fn container_with(message: &'static str) -> Container {
    let container = Container::new();
    container
        .add_scoped::<Greeting>(Implementation::instance(Greeting(message)))
        .unwrap();
    container
}

#[tokio::test]
async fn test_injectify_is_idempotent() {
    let first = container_with("first");
    let second = container_with("second");

    let mut app = first.injectify(RouteTable::new());
    app.get("/a", greeting_endpoint()).unwrap();

    let mut app = second.injectify(app);
    app.get("/b", greeting_endpoint()).unwrap();

    // Existing routes keep the provider they were rewritten with
    assert_eq!(app.dispatch(Request::get("/a")).await.body, json!({ "message": "first" }));
    assert_eq!(app.dispatch(Request::get("/b")).await.body, json!({ "message": "second" }));

    let table: RouteTable = app.into_original();
    assert_eq!(table.routes().len(), 2);
}

#[tokio::test]
async fn test_routes_added_before_wrapping_are_not_rewritten() {
    let mut table = RouteTable::new();
    table
        .add_route("/before", greeting_endpoint(), RouteOptions::get())
        .unwrap();

    let mut app = container_with("hello").injectify(table);
    app.get("/after", greeting_endpoint()).unwrap();

    assert_eq!(app.dispatch(Request::get("/before")).await.status, 422);
    assert_eq!(
        app.dispatch(Request::get("/after")).await.body,
        json!({ "message": "hello" })
    );
}

#[tokio::test]
async fn test_set_container_affects_later_routes() {
    let mut app = Injectified::with_container(RouteTable::new(), container_with("old"));
    app.get("/old", greeting_endpoint()).unwrap();
    app.set_container(container_with("new"));
    app.get("/new", greeting_endpoint()).unwrap();

    assert_eq!(app.dispatch(Request::get("/old")).await.body["message"], "old");
    assert_eq!(app.dispatch(Request::get("/new")).await.body["message"], "new");
}

#[test]
fn test_rewritten_signature_carries_provider_defaults() {
    enum Loud {}

    let container = container_with("hello");
    container
        .add_scoped::<Loud>(Implementation::instance(Greeting("HELLO")))
        .unwrap();
    let explicit = Provider::new(Implementation::instance(Greeting("explicit")), true);

    let signature = Signature::new()
        .param(Parameter::receiver())
        .param(Parameter::typed::<Greeting>("plain"))
        .param(Parameter::annotated("loud", Annotation::of::<Greeting>().tagged::<Loud>()))
        .param(Parameter::typed::<Greeting>("explicit").depends(explicit.clone()))
        .param(Parameter::new("text"));

    let rewritten = container.inject_signature(&signature);
    let names: Vec<&str> = rewritten.params().iter().map(|p| p.name()).collect();
    assert_eq!(names, vec!["plain", "loud", "explicit", "text"]);

    let plain = rewritten.get("plain").unwrap().marker().unwrap();
    assert_eq!(*plain, container.resolve_type::<Greeting>().unwrap());
    let loud = rewritten.get("loud").unwrap().marker().unwrap();
    assert_eq!(*loud, container.resolve_type::<Loud>().unwrap());
    assert_eq!(*rewritten.get("explicit").unwrap().marker().unwrap(), explicit);
    assert!(matches!(rewritten.get("text").unwrap().default(), ParamDefault::Empty));
}

#[test]
fn test_tags_do_not_fall_back_to_the_bare_type() {
    enum Missing {}

    let container = container_with("hello");
    let signature = Signature::new().param(Parameter::annotated(
        "tagged",
        Annotation::of::<Greeting>().tagged::<Missing>(),
    ));
    let rewritten = container.inject_signature(&signature);
    assert!(!rewritten.get("tagged").unwrap().has_marker_default());
}

#[test]
fn test_global_dependencies_are_resolved_when_added() {
    enum Audit {}

    let container = Container::new();
    container
        .add_scoped::<Audit>(Implementation::function("audit", Signature::new(), |_| Ok(())))
        .unwrap();

    let mut app = container.injectify(RouteTable::new());
    app.add_global_dependency(DependencyItem::protocol::<Audit>())
        .unwrap();

    let audit = container.resolve(&Key::of::<Audit>()).unwrap();
    assert_eq!(app.dependencies(), &[DependencyItem::Marker(audit)]);
    assert_eq!(app.original().dependencies().len(), 1);
}
