/// Unit tests for DiError and DiResult types
/// Display strings double as the `detail` of error responses, so they are pinned here

use ferrous_inject::{DiError, DiResult, Lifetime};
use std::error::Error;

#[test]
fn test_error_display_not_registered() {
    let error = DiError::NotRegistered("dyn app::Mailer");
    let display_str = format!("{}", error);
    assert_eq!(display_str, "Protocol dyn app::Mailer is not registered in the container");

    assert!(display_str.contains("dyn app::Mailer"));
    assert!(error.is_not_registered());
}

#[test]
fn test_error_display_type_mismatch() {
    let error = DiError::TypeMismatch("std::string::String");
    let display_str = format!("{}", error);
    assert_eq!(display_str, "Type mismatch for: std::string::String");
    assert!(!error.is_not_registered());
}

#[test]
fn test_error_display_circular() {
    let path = vec!["ServiceA", "ServiceB", "ServiceA"];
    let error = DiError::Circular(path);
    let display_str = format!("{}", error);
    assert_eq!(display_str, "Circular dependency: ServiceA -> ServiceB -> ServiceA");
}

#[test]
fn test_error_display_empty_circular_path() {
    let error = DiError::Circular(vec![]);
    assert_eq!(format!("{}", error), "Circular dependency: ");
}

#[test]
fn test_error_display_lifetime_violation() {
    let error = DiError::LifetimeViolation {
        service: "Report",
        service_lifetime: Lifetime::Singleton,
        dependency: "RequestClock",
        dependency_lifetime: Lifetime::Scoped,
    };
    assert_eq!(
        format!("{}", error),
        "Lifetime error: singleton service Report depends on scoped service RequestClock"
    );
}

#[test]
fn test_error_display_singleton_generator() {
    let error = DiError::SingletonGenerator("session");
    assert_eq!(
        format!("{}", error),
        "Cannot register generator session as a singleton dependency"
    );
}

#[test]
fn test_error_display_request_errors() {
    let missing = DiError::MissingArgument {
        target: "search",
        parameter: "q",
    };
    assert_eq!(missing.to_string(), "Missing argument 'q' for search");

    let invalid = DiError::InvalidParameter {
        parameter: "page",
        value: "three".into(),
    };
    assert_eq!(invalid.to_string(), "Invalid value 'three' for parameter 'page'");

    let not_found = DiError::RouteNotFound {
        method: "GET".into(),
        path: "/nowhere".into(),
    };
    assert_eq!(not_found.to_string(), "No route for GET /nowhere");
}

#[test]
fn test_construction_wraps_any_display() {
    let io = std::io::Error::new(std::io::ErrorKind::Other, "disk full");
    assert_eq!(DiError::construction(io), DiError::Construction("disk full".into()));
    assert_eq!(
        DiError::construction("boom").to_string(),
        "Construction failed: boom"
    );
}

#[test]
fn test_status_codes() {
    assert_eq!(
        DiError::RouteNotFound {
            method: "GET".into(),
            path: "/".into()
        }
        .status_code(),
        404
    );
    assert_eq!(
        DiError::MissingArgument {
            target: "t",
            parameter: "p"
        }
        .status_code(),
        422
    );
    assert_eq!(
        DiError::InvalidParameter {
            parameter: "p",
            value: String::new()
        }
        .status_code(),
        422
    );
    assert_eq!(DiError::NotRegistered("X").status_code(), 500);
    assert_eq!(DiError::Circular(vec!["A"]).status_code(), 500);
    assert_eq!(DiError::InvalidDependency("X").status_code(), 500);
}

#[test]
fn test_diresult_err() {
    let result: DiResult<String> = Err(DiError::NotRegistered("TestService"));
    assert!(result.is_err());

    match result {
        Err(DiError::NotRegistered(name)) => assert_eq!(name, "TestService"),
        _ => panic!("Expected NotRegistered error"),
    }
}

#[test]
fn test_error_debug_format() {
    let error = DiError::NotRegistered("TestService");
    let debug_str = format!("{:?}", error);
    assert!(debug_str.contains("NotRegistered"));
    assert!(debug_str.contains("TestService"));
}

#[test]
fn test_error_as_std_error() {
    let error = DiError::InvalidDependency("TestService");
    let _: &dyn std::error::Error = &error;
    assert!(error.source().is_none());
}
