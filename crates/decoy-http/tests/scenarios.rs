//! End-to-end scenarios through the public API
//!
//! Each test drives transports obtained from a binding the way application
//! code would, with a server or agent intercepting it.

use decoy_http::agent::{Agent, Store};
use decoy_http::config::{DecoyConfig, FailurePolicy};
use decoy_http::recognizer::query;
use decoy_http::server::{HandlerResult, Method, Server};
use decoy_http::transport::{Headers, OpenOptions, ReadyState, Transport, TransportBinding};
use decoy_http::DecoyError;
use serde_json::{json, Value};
use serial_test::serial;
use std::collections::HashMap;
use std::sync::Arc;

fn intercepted() -> (Server, Arc<TransportBinding>) {
    let binding = Arc::new(TransportBinding::new());
    let server = Server::intercept(Arc::clone(&binding));
    (server, binding)
}

#[test]
fn test_json_handler_completes_the_request() {
    let (server, binding) = intercepted();
    server
        .get("/users/:id", |req| {
            assert_eq!(req.param("id"), Some("42"));
            let mut headers = Headers::new();
            headers.insert("Content-Type".into(), "application/json".into());
            Ok(HandlerResult::from((200, headers, r#"{"ok":true}"#)))
        })
        .unwrap();

    let mut transport = binding.create();
    transport.open("GET", "/users/42", OpenOptions::default());
    transport.send(None).unwrap();

    assert_eq!(transport.ready_state(), ReadyState::Done);
    assert_eq!(transport.status(), 200);
    assert_eq!(transport.response_text(), Some(r#"{"ok":true}"#));
}

#[test]
fn test_second_send_is_a_state_violation() {
    let (server, binding) = intercepted();
    server.get("/ping", |_| Ok(HandlerResult::text(200, "pong"))).unwrap();

    let mut transport = binding.create();
    transport.open("GET", "/ping", OpenOptions::default());
    transport.send(None).unwrap();

    let err = transport.send(None).unwrap_err();
    assert!(matches!(err, DecoyError::InvalidState { .. }));
}

#[test]
fn test_cookie_header_is_forbidden() {
    let (_server, binding) = intercepted();
    let mut transport = binding.create();
    transport.open("GET", "/", OpenOptions::default());

    let err = transport.set_request_header("Cookie", "a=1").unwrap_err();
    assert!(matches!(err, DecoyError::ForbiddenHeader(name) if name == "Cookie"));
}

#[test]
fn test_unregistered_delete_is_a_routing_miss() {
    let (server, binding) = intercepted();
    server.get("/users/:id", |_| Ok(HandlerResult::empty(200))).unwrap();

    let mut transport = binding.create();
    transport.open("DELETE", "/users/1", OpenOptions::default());
    let err = transport.send(None).unwrap_err();

    assert!(err.is_routing_miss());
    assert!(!err.is_handler_fault());
    assert_eq!(server.unhandled_requests()[0].url, "/users/1");
}

#[test]
fn test_static_segment_wins_over_dynamic() {
    let (server, binding) = intercepted();
    server.get("/posts/:id", |_| Ok(HandlerResult::text(200, "show"))).unwrap();
    server.get("/posts/new", |_| Ok(HandlerResult::text(200, "new"))).unwrap();
    server
        .get("/files/*path", |req| {
            let path = req.param("path").unwrap_or_default();
            Ok(HandlerResult::text(200, format!("star:{path}")))
        })
        .unwrap();
    server.get("/files/:name", |_| Ok(HandlerResult::text(200, "dynamic"))).unwrap();

    let fetch = |url: &str| {
        let mut transport = binding.create();
        transport.open("GET", url, OpenOptions::default());
        transport.send(None).unwrap();
        transport.response_text().map(str::to_string)
    };

    assert_eq!(fetch("/posts/new").as_deref(), Some("new"));
    assert_eq!(fetch("/posts/7").as_deref(), Some("show"));
    assert_eq!(fetch("/files/a/b").as_deref(), Some("star:a/b"));
    assert_eq!(fetch("/files/a").as_deref(), Some("dynamic"));
}

#[test]
fn test_generated_path_is_recognized() {
    let (server, _binding) = intercepted();
    server
        .register_named(Method::Get, "comment", "/posts/:post/comments/:id", |_| {
            Ok(HandlerResult::empty(200))
        })
        .unwrap();

    let params: HashMap<String, String> = [
        ("post".to_string(), "9".to_string()),
        ("id".to_string(), "3".to_string()),
    ]
    .into();
    let path = server
        .generate(Method::Get, "comment", &params, None)
        .unwrap();
    assert_eq!(path, "/posts/9/comments/3");

    let resolved = server.resolve("GET", &path).unwrap();
    assert_eq!(resolved.params, params);
}

#[test]
fn test_query_codec_is_semantically_stable() {
    let parsed = query::parse("b=2&a[]=x&a[]=y&flag");
    let encoded = query::encode(&parsed);
    let reparsed = query::parse(encoded.trim_start_matches('?'));
    assert_eq!(parsed, reparsed);
}

#[test]
fn test_logging_policy_keeps_tests_running() {
    let config = DecoyConfig {
        unhandled: FailurePolicy::Log,
        ..DecoyConfig::default()
    };
    let binding = Arc::new(TransportBinding::new());
    let mut agent = Agent::with_binding(config, Arc::clone(&binding)).unwrap();
    agent.server().unwrap();

    let mut transport = binding.create();
    transport.open("GET", "/nowhere", OpenOptions::default());
    transport.send(None).unwrap();
    assert_eq!(transport.ready_state(), ReadyState::Opened);
}

#[test]
#[serial]
fn test_agent_serves_fixtures_over_global_binding() {
    let config: DecoyConfig = serde_yaml::from_str(
        r#"
useUuid: false
resources:
  - /api/users
  - /api/users/:id
"#,
    )
    .unwrap();

    let mut agent = Agent::new(config).unwrap();
    agent.make_ids("users", 2);
    agent.group("users", |g| {
        for n in 1..=2 {
            let id = g.id("users", n).unwrap_or(Value::Null);
            g.fixture(id, json!({"name": format!("user {n}")}));
        }
    });
    agent.build().unwrap();
    agent.server().unwrap();

    let send = |method: &str, url: &str, body: Option<&str>| {
        let mut transport = TransportBinding::global().create();
        transport.open(method, url, OpenOptions::default());
        transport.send(body).unwrap();
        let text = transport.response_text().unwrap_or_default().to_string();
        (transport.status(), text)
    };

    let (status, text) = send("GET", "/api/users", None);
    assert_eq!(status, 200);
    let listed: Value = serde_json::from_str(&text).unwrap();
    assert_eq!(listed["users"].as_array().unwrap().len(), 2);

    let (status, _) = send("PATCH", "/api/users/2", Some(r#"{"name":"renamed"}"#));
    assert_eq!(status, 200);
    assert_eq!(
        agent.store().get_record("users", "2").unwrap().unwrap()["name"],
        "renamed"
    );

    let (status, _) = send("DELETE", "/api/users/1", None);
    assert_eq!(status, 204);
    let (status, _) = send("GET", "/api/users/1", None);
    assert_eq!(status, 404);

    agent.shutdown();
    let mut transport = TransportBinding::global().create();
    transport.open("GET", "/api/users", OpenOptions::default());
    transport.send(None).unwrap();
    assert!(transport.response_text().is_none());
}
