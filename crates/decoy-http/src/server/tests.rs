//! Tests for interception and dispatch.

use super::*;
use crate::error::DecoyError;
use crate::transport::{
    Body, Headers, OpenOptions, ReadyState, Transport, TransportBinding,
};
use serde_json::json;
use serial_test::serial;
use std::collections::HashMap;
use std::sync::Arc;
use tracing_test::traced_test;

fn request(
    server: &Server,
    method: &str,
    url: &str,
) -> (crate::transport::FakeTransport, crate::error::Result<()>) {
    let mut transport = server.transport();
    transport.open(method, url, OpenOptions::default());
    let result = transport.send(None);
    (transport, result)
}

// ============================================================================
// Dispatch
// ============================================================================

#[test]
fn test_matched_request_is_answered() {
    let server = Server::new();
    server
        .get("/users/:id", |req| {
            assert_eq!(req.param("id"), Some("42"));
            Ok(HandlerResult::json(200, &json!({"ok": true})))
        })
        .unwrap();

    let (transport, result) = request(&server, "GET", "/users/42");
    result.unwrap();

    assert_eq!(transport.ready_state(), ReadyState::Done);
    assert_eq!(transport.status(), 200);
    assert_eq!(transport.response_text(), Some(r#"{"ok":true}"#));
    assert_eq!(
        transport.get_response_header("content-type"),
        Some("application/json")
    );
}

#[test]
fn test_lowercase_verb_is_uppercased() {
    let server = Server::new();
    server.post("/items", |_| Ok(HandlerResult::empty(201))).unwrap();

    let (transport, result) = request(&server, "post", "/items");
    result.unwrap();
    assert_eq!(transport.status(), 201);
    assert_eq!(transport.status_text(), "Created");
}

#[test]
fn test_request_log_carries_params_and_query() {
    let server = Server::new();
    let handler = server
        .get("/users/:id/posts", |_| Ok(HandlerResult::text(200, "[]")))
        .unwrap();

    let (_, result) = request(&server, "GET", "/users/7/posts?page=2&tag[]=a&tag[]=b");
    result.unwrap();
    let (_, result) = request(&server, "GET", "/users/8/posts");
    result.unwrap();

    assert_eq!(handler.number_of_calls(), 2);
    let handled = server.handled_requests();
    assert_eq!(handled.len(), 2);
    assert_eq!(handled[0].method, "GET");
    assert_eq!(handled[0].param("id"), Some("7"));
    assert_eq!(handled[0].query("page"), Some("2"));
    assert_eq!(handled[0].query("tag"), Some("a"));
    assert_eq!(handled[1].param("id"), Some("8"));
    assert!(server.unhandled_requests().is_empty());
}

#[test]
fn test_routing_miss_is_fatal_by_default() {
    let server = Server::new();
    server.get("/users/:id", |_| Ok(HandlerResult::empty(200))).unwrap();

    let (transport, result) = request(&server, "DELETE", "/users/1");
    let err = result.unwrap_err();

    assert!(err.is_routing_miss());
    assert_eq!(
        err.to_string(),
        "intercepted DELETE /users/1 but no handler was defined for this type of request"
    );
    assert_eq!(transport.ready_state(), ReadyState::Opened);
    assert_eq!(server.unhandled_requests().len(), 1);
    assert!(server.handled_requests().is_empty());
}

#[test]
fn test_unknown_verb_is_a_miss() {
    let server = Server::new();
    server.get("/", |_| Ok(HandlerResult::empty(200))).unwrap();

    let (_, result) = request(&server, "OPTIONS", "/");
    assert!(result.unwrap_err().is_routing_miss());
}

#[test]
fn test_handler_fault_is_annotated() {
    let server = Server::new();
    let handler = server
        .get("/boom", |_| Err(anyhow::anyhow!("kaboom")))
        .unwrap();

    let (_, result) = request(&server, "GET", "/boom");
    let err = result.unwrap_err();

    assert!(err.is_handler_fault());
    assert_eq!(
        err.to_string(),
        "intercepted GET /boom but encountered an error: kaboom"
    );
    assert_eq!(handler.number_of_calls(), 1);
    assert_eq!(server.handled_requests().len(), 1);
}

#[test]
fn test_binary_body_surfaces_as_invalid_body() {
    let server = Server::new();
    server
        .get("/blob", |_| {
            Ok(HandlerResult::new(200, Headers::new(), vec![0xc3u8, 0x28]))
        })
        .unwrap();

    let (_, result) = request(&server, "GET", "/blob");
    match result.unwrap_err() {
        DecoyError::HandlerFault { source, .. } => {
            assert!(matches!(
                source.downcast_ref::<DecoyError>(),
                Some(DecoyError::InvalidBody(_))
            ));
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_dispatch_returns_typed_outcome() {
    let server = Server::new();
    server.get("/ok", |_| Ok(HandlerResult::empty(204))).unwrap();
    server.get("/fail", |_| anyhow::bail!("nope")).unwrap();
    let dispatcher = server.dispatcher();

    let mut transport = crate::transport::FakeTransport::new();
    transport.open("GET", "/ok", OpenOptions::default());
    transport.send(None).unwrap();
    assert!(matches!(
        dispatcher.dispatch(&mut transport),
        DispatchOutcome::Handled { status: 204 }
    ));

    transport.open("GET", "/missing", OpenOptions::default());
    transport.send(None).unwrap();
    let outcome = dispatcher.dispatch(&mut transport);
    assert!(outcome.is_unhandled());
    assert!(dispatcher.settle(outcome).unwrap_err().is_routing_miss());

    transport.open("GET", "/fail", OpenOptions::default());
    transport.send(None).unwrap();
    match dispatcher.dispatch(&mut transport) {
        DispatchOutcome::Faulted { request, error } => {
            assert_eq!(request.url, "/fail");
            assert_eq!(error.to_string(), "nope");
        }
        other => panic!("unexpected outcome: {other:?}"),
    }
}

// ============================================================================
// Hooks
// ============================================================================

#[test]
#[traced_test]
fn test_logging_hooks_swallow_misses_and_faults() {
    let server = Server::new();
    server.set_hooks(Arc::new(LoggingHooks));
    server.get("/boom", |_| anyhow::bail!("kaboom")).unwrap();

    let (_, result) = request(&server, "GET", "/nowhere");
    result.unwrap();
    let (_, result) = request(&server, "GET", "/boom");
    result.unwrap();

    assert!(logs_contain("Unhandled request: GET /nowhere"));
    assert!(logs_contain("kaboom"));
}

#[test]
fn test_policy_hooks_mix_reactions() {
    use crate::config::FailurePolicy;

    let server = Server::new();
    server.set_hooks(Arc::new(PolicyHooks::new(
        FailurePolicy::Log,
        FailurePolicy::Error,
    )));
    server.get("/boom", |_| anyhow::bail!("kaboom")).unwrap();

    let (_, result) = request(&server, "GET", "/nowhere");
    assert!(result.is_ok());
    let (_, result) = request(&server, "GET", "/boom");
    assert!(result.unwrap_err().is_handler_fault());
}

struct Shouting;

impl RequestHooks for Shouting {
    fn prepare_body(&self, body: Body) -> Body {
        match body {
            Body::Text(text) => Body::Text(text.to_uppercase()),
            other => other,
        }
    }
}

#[test]
fn test_prepare_body_hook() {
    let server = Server::new();
    server.set_hooks(Arc::new(Shouting));
    server.get("/hello", |_| Ok(HandlerResult::text(200, "hello"))).unwrap();

    let (transport, result) = request(&server, "GET", "/hello");
    result.unwrap();
    assert_eq!(transport.response_text(), Some("HELLO"));
}

// ============================================================================
// Registry Extras
// ============================================================================

#[test]
fn test_handlers_in_registration_order() {
    let server = Server::new();
    server.get("/a", |_| Ok(HandlerResult::empty(200))).unwrap();
    server.post("/b", |_| Ok(HandlerResult::empty(200))).unwrap();
    server.head("/c", |_| Ok(HandlerResult::empty(200))).unwrap();

    let labels: Vec<String> = server
        .handlers()
        .iter()
        .map(|h| h.label().to_string())
        .collect();
    assert_eq!(labels, vec!["GET /a", "POST /b", "HEAD /c"]);
}

#[test]
fn test_reregistering_a_route_overrides_it() {
    let server = Server::new();
    server.get("/users", |_| Ok(HandlerResult::text(200, "old"))).unwrap();
    server.get("/users", |_| Ok(HandlerResult::text(200, "new"))).unwrap();

    let (transport, result) = request(&server, "GET", "/users");
    result.unwrap();
    assert_eq!(transport.response_text(), Some("new"));
}

#[test]
fn test_named_route_generation() {
    let server = Server::new();
    server
        .register_named(Method::Get, "user", "/users/:id", |_| {
            Ok(HandlerResult::empty(200))
        })
        .unwrap();

    assert!(server.has_route(Method::Get, "user"));
    assert!(!server.has_route(Method::Post, "user"));

    let params: HashMap<String, String> = [("id".to_string(), "5".to_string())].into();
    assert_eq!(
        server.generate(Method::Get, "user", &params, None).unwrap(),
        "/users/5"
    );
    assert!(matches!(
        server.generate(Method::Post, "user", &params, None),
        Err(DecoyError::UnknownRoute(_))
    ));
}

#[test]
fn test_map_declares_nested_routes() {
    let server = Server::new();
    let show = RouteHandler::new("show", |req| {
        Ok(HandlerResult::text(200, req.param("id").unwrap_or_default()))
    });
    let parent = RouteHandler::new("posts", |_| Ok(HandlerResult::empty(500)));
    server
        .map(Method::Get, |m| {
            m.nest("/posts", Arc::clone(&parent), |m| {
                m.route("/:id", Arc::clone(&show));
            });
        })
        .unwrap();

    let (transport, result) = request(&server, "GET", "/posts/12");
    result.unwrap();
    assert_eq!(transport.status(), 500);
    assert_eq!(parent.number_of_calls(), 1);
    assert_eq!(show.number_of_calls(), 0);
}

#[test]
fn test_chunk_size_applies_to_new_transports() {
    let mut server = Server::new();
    server.set_chunk_size(3);
    assert_eq!(server.transport().chunk_size(), 3);
}

// ============================================================================
// Interception
// ============================================================================

#[test]
fn test_intercept_and_shutdown_restore_binding() {
    let binding = Arc::new(TransportBinding::new());
    let original = binding.current();

    let mut server = Server::intercept(Arc::clone(&binding));
    assert!(server.is_intercepting());
    assert!(!Arc::ptr_eq(&binding.current(), &original));
    server.get("/ping", |_| Ok(HandlerResult::text(200, "pong"))).unwrap();

    let mut transport = binding.create();
    transport.open("GET", "/ping", OpenOptions::default());
    transport.send(None).unwrap();
    assert_eq!(transport.response_text(), Some("pong"));

    server.shutdown();
    assert!(!server.is_intercepting());
    assert!(Arc::ptr_eq(&binding.current(), &original));

    // Restored transports are detached again.
    let mut transport = binding.create();
    transport.open("GET", "/ping", OpenOptions::default());
    transport.send(None).unwrap();
    assert_eq!(transport.ready_state(), ReadyState::Opened);

    server.shutdown();
    assert!(Arc::ptr_eq(&binding.current(), &original));
}

#[test]
fn test_drop_restores_binding() {
    let binding = Arc::new(TransportBinding::new());
    let original = binding.current();
    {
        let _server = Server::intercept(Arc::clone(&binding));
        assert!(!Arc::ptr_eq(&binding.current(), &original));
    }
    assert!(Arc::ptr_eq(&binding.current(), &original));
}

#[test]
#[serial]
fn test_start_intercepts_global_binding() {
    let server = Server::start();
    server.get("/global", |_| Ok(HandlerResult::text(200, "caught"))).unwrap();

    let mut transport = TransportBinding::global().create();
    transport.open("GET", "/global", OpenOptions::default());
    transport.send(None).unwrap();
    assert_eq!(transport.response_text(), Some("caught"));

    drop(server);
    let mut transport = TransportBinding::global().create();
    transport.open("GET", "/global", OpenOptions::default());
    transport.send(None).unwrap();
    assert!(transport.response_text().is_none());
}
