//! Engine behavior against a live HTTP policy endpoint.

use std::sync::Arc;
use std::time::Duration;

use rolegate::prelude::*;
use serde_json::json;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn blog_policy() -> serde_json::Value {
    json!({
        "items": {
            "post.edit":   { "type": "permission", "description": "Edit posts" },
            "post.delete": { "type": "permission", "ruleName": "isOwner" },
            "editor":      { "type": "role", "children": ["post.edit", "post.delete", "post.archive"] },
            "admin":       { "type": "role", "children": ["editor"] }
        },
        "rules": {
            "isOwner": { "data": { "typeName": "owner", "rule": "{\"param\":\"resourceOwner\"}" } }
        },
        "assignments": {
            "alice": ["editor"],
            "root": ["admin"]
        }
    })
}

fn source_config(server: &MockServer) -> SourceConfig {
    SourceConfig::new()
        .with_base_url(server.uri())
        .with_request_timeout(Duration::from_secs(5))
}

fn engine_for(server: &MockServer) -> RbacEngine {
    let config = RbacConfig {
        source: source_config(server),
        engine: EngineConfig::default(),
    };
    RbacEngine::from_config(&config, RuleRegistry::with_builtin_rules(), None).unwrap()
}

async fn mount_policy(server: &MockServer, body: serde_json::Value) {
    Mock::given(method("GET"))
        .and(path("/rbac"))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_inherited_and_rule_gated_access() {
    let server = MockServer::start().await;
    mount_policy(&server, blog_policy()).await;
    let engine = engine_for(&server);

    let none = RuleParams::new();
    assert!(engine.check_access("alice", "post.edit", &none).await.unwrap());
    assert!(!engine.check_access("bob", "post.edit", &none).await.unwrap());
    assert!(engine.check_access("root", "post.edit", &none).await.unwrap());

    let carol_owns = RuleParams::new().with("resourceOwner", "carol");
    let alice_owns = RuleParams::new().with("resourceOwner", "alice");
    assert!(!engine.check_access("alice", "post.delete", &carol_owns).await.unwrap());
    assert!(engine.check_access("alice", "post.delete", &alice_owns).await.unwrap());

    // Dangling child reference is dropped.
    assert!(!engine.check_access("alice", "post.archive", &none).await.unwrap());
}

#[tokio::test]
async fn test_single_fetch_for_many_checks() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/rbac"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(blog_policy())
                .set_delay(Duration::from_millis(100)),
        )
        .expect(1)
        .mount(&server)
        .await;

    let engine = Arc::new(engine_for(&server));
    let handles: Vec<_> = (0..10)
        .map(|i| {
            let engine = engine.clone();
            tokio::spawn(async move {
                let user = if i % 2 == 0 { "alice" } else { "bob" };
                engine.check_access(user, "post.edit", &RuleParams::new()).await
            })
        })
        .collect();

    for (i, handle) in handles.into_iter().enumerate() {
        assert_eq!(handle.await.unwrap().unwrap(), i % 2 == 0);
    }

    for _ in 0..3 {
        engine
            .check_access("alice", "editor", &RuleParams::new())
            .await
            .unwrap();
    }
    assert_eq!(engine.status(), EngineStatus::Ready { version: 1 });
}

#[tokio::test]
async fn test_not_found_yields_empty_policy() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/rbac"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;

    let engine = engine_for(&server);
    assert!(!engine.check_access("alice", "post.edit", &RuleParams::new()).await.unwrap());
    assert!(!engine.check_access("alice", "editor", &RuleParams::new()).await.unwrap());

    let stats = engine.stats().unwrap();
    assert_eq!(stats.items, 0);
    assert_eq!(stats.rules, 0);
    assert_eq!(stats.actors, 0);
}

#[tokio::test]
async fn test_server_error_keeps_previous_policy() {
    let server = MockServer::start().await;
    mount_policy(&server, blog_policy()).await;
    let engine = engine_for(&server);
    engine.load().await.unwrap();

    server.reset().await;
    Mock::given(method("GET"))
        .and(path("/rbac"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let err = engine.load().await.unwrap_err();
    assert_eq!(err, RbacError::HttpStatus { status: 500 });
    assert!(err.is_load_error());

    assert_eq!(engine.status(), EngineStatus::Ready { version: 1 });
    assert!(engine.check_access("alice", "post.edit", &RuleParams::new()).await.unwrap());
}

#[tokio::test]
async fn test_server_error_on_first_load() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/rbac"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let engine = engine_for(&server);
    let err = engine.check_access("alice", "post.edit", &RuleParams::new()).await.unwrap_err();
    assert_eq!(err.category(), ErrorCategory::Load);
    assert_eq!(engine.status(), EngineStatus::NotLoaded);
}

#[tokio::test]
async fn test_malformed_body_is_a_load_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/rbac"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
        .mount(&server)
        .await;

    let engine = engine_for(&server);
    let err = engine.load().await.unwrap_err();
    assert!(matches!(err, RbacError::InvalidSnapshot { .. }));
    assert!(!engine.is_ready());
}

#[tokio::test]
async fn test_unknown_item_type_is_a_load_error() {
    let server = MockServer::start().await;
    mount_policy(
        &server,
        json!({ "items": { "x": { "type": "group" } } }),
    )
    .await;

    let err = engine_for(&server).load().await.unwrap_err();
    assert!(matches!(err, RbacError::InvalidSnapshot { .. }));
}

#[tokio::test]
async fn test_malformed_rule_config_fails_the_load() {
    let server = MockServer::start().await;
    mount_policy(
        &server,
        json!({
            "items": { "p": { "type": "permission", "ruleName": "broken" } },
            "rules": { "broken": { "data": { "typeName": "customX", "rule": "{not json" } } }
        }),
    )
    .await;

    let err = engine_for(&server).load().await.unwrap_err();
    assert!(matches!(err, RbacError::MalformedRule { ref rule, .. } if rule == "broken"));
}

#[tokio::test]
async fn test_unregistered_rule_type_grants() {
    let server = MockServer::start().await;
    mount_policy(
        &server,
        json!({
            "items": { "p": { "type": "permission", "ruleName": "custom" } },
            "rules": { "custom": { "data": { "typeName": "customX", "rule": "{}" } } },
            "assignments": { "alice": ["p"] }
        }),
    )
    .await;

    let engine = engine_for(&server);
    assert!(engine.check_access("alice", "p", &RuleParams::new()).await.unwrap());
}

#[tokio::test]
async fn test_missing_rule_surfaces_as_error() {
    let server = MockServer::start().await;
    mount_policy(
        &server,
        json!({
            "items": { "p": { "type": "permission", "ruleName": "gone" } },
            "assignments": { "alice": ["p"] }
        }),
    )
    .await;

    let engine = engine_for(&server);
    let err = engine.check_access("alice", "p", &RuleParams::new()).await.unwrap_err();
    assert!(err.is_resolution_error());
    assert!(engine.is_ready());
}

#[tokio::test]
async fn test_bearer_token_is_sent() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/rbac"))
        .and(header("authorization", "Bearer secret-token"))
        .and(header("accept", "application/json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(blog_policy()))
        .expect(1)
        .mount(&server)
        .await;

    let config = RbacConfig {
        source: source_config(&server),
        engine: EngineConfig::default(),
    };
    let engine = RbacEngine::from_config(
        &config,
        RuleRegistry::with_builtin_rules(),
        Some(Arc::new(|| Some("secret-token".to_string()))),
    )
    .unwrap();

    assert!(engine.check_access("alice", "post.edit", &RuleParams::new()).await.unwrap());
}

#[tokio::test]
async fn test_oversized_response_is_rejected() {
    let server = MockServer::start().await;
    mount_policy(&server, blog_policy()).await;

    let source = HttpSnapshotSource::new(&source_config(&server).with_max_response_size(16)).unwrap();
    let err = source.fetch().await.unwrap_err();
    assert!(matches!(err, RbacError::Fetch { .. }));
}

#[tokio::test]
async fn test_custom_path() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v2/policy"))
        .respond_with(ResponseTemplate::new(200).set_body_json(blog_policy()))
        .mount(&server)
        .await;

    let source = HttpSnapshotSource::new(&source_config(&server).with_path("/api/v2/policy")).unwrap();
    let snapshot = source.fetch().await.unwrap();
    assert_eq!(snapshot.items.len(), 4);
    assert_eq!(snapshot.assignments["alice"], vec!["editor".to_string()]);
}

#[tokio::test]
async fn test_role_list_checks() {
    let server = MockServer::start().await;
    mount_policy(&server, blog_policy()).await;
    let engine = engine_for(&server);

    let editors = CheckAccessOptions::new().with_roles(["viewer", "editor"]);
    assert!(engine.check(&Actor::user("alice"), &editors).await.unwrap());
    assert!(!engine.check(&Actor::user("bob"), &editors).await.unwrap());
    assert!(!engine.check(&Actor::guest(), &editors).await.unwrap());

    let guests_only = CheckAccessOptions::new().with_roles([GUEST_ROLE]);
    assert!(engine.check(&Actor::guest(), &guests_only).await.unwrap());
    assert!(!engine.check(&Actor::user("alice"), &guests_only).await.unwrap());

    let denied = CheckAccessOptions::new().with_roles(["editor"]).with_allow(false);
    assert!(!engine.check(&Actor::user("alice"), &denied).await.unwrap());
    assert!(engine.check(&Actor::superuser("bob"), &denied).await.unwrap());

    let owner_delete = CheckAccessOptions::new()
        .with_roles(["post.delete"])
        .with_params_producer(|| RuleParams::new().with("resourceOwner", "alice"));
    assert!(engine.check(&Actor::user("alice"), &owner_delete).await.unwrap());
}
