//! Transport selection and fallback routing tests
//!
//! Exercises the dispatcher end to end: direct calls over a mock
//! session, fallback calls through a mock proxy, synthetic app id
//! substitution, and grace-period hysteresis.

use std::sync::Arc;
use std::time::Duration;

use pretty_assertions::assert_eq;

use memdeck_conn::{ToolDispatcher, TransportMode};
use memdeck_core::{DomainEvent, InMemoryProjectStore, ToolApp};
use tests::events::drain;
use tests::{settle, LinkHarness, MockProxyApi, ProxyCall};

const CALL_TIMEOUT: Duration = Duration::from_secs(60);

struct DispatchHarness {
    link: LinkHarness,
    proxy: Arc<MockProxyApi>,
    store: Arc<InMemoryProjectStore>,
    dispatcher: ToolDispatcher,
}

impl DispatchHarness {
    fn new() -> Self {
        let link = LinkHarness::new();
        let proxy = MockProxyApi::new();
        let store = Arc::new(InMemoryProjectStore::new());
        let dispatcher = ToolDispatcher::new(
            link.manager.clone(),
            proxy.clone(),
            store.clone(),
            link.bus.sender(),
            CALL_TIMEOUT,
        );
        Self {
            link,
            proxy,
            store,
            dispatcher,
        }
    }
}

#[tokio::test(start_paused = true)]
async fn connected_link_calls_direct() {
    let h = DispatchHarness::new();
    h.link.manager.connect().await;
    settle().await;

    let app = ToolApp::new("app-1", "memory", "search_notes");
    let outcome = h
        .dispatcher
        .call_tool(&app, serde_json::json!({ "q": "meeting" }))
        .await
        .unwrap();

    assert!(!outcome.is_error);
    assert_eq!(h.dispatcher.last_mode(), TransportMode::Direct);
    assert_eq!(h.link.transport.session(0).call_count(), 1);
    assert!(h.proxy.recorded().is_empty());
}

#[tokio::test(start_paused = true)]
async fn disconnected_link_falls_back_by_app_id() {
    let h = DispatchHarness::new();

    let app = ToolApp::new("app-1", "memory", "search_notes");
    let outcome = h
        .dispatcher
        .call_tool(&app, serde_json::json!({}))
        .await
        .unwrap();

    assert!(!outcome.is_error);
    assert_eq!(h.dispatcher.last_mode(), TransportMode::Fallback);
    assert_eq!(
        h.proxy.recorded(),
        vec![ProxyCall::ByApp {
            app_id: "app-1".to_string(),
            tool_name: "search_notes".to_string(),
        }]
    );
}

#[tokio::test(start_paused = true)]
async fn synthetic_id_is_substituted_and_announced() {
    let h = DispatchHarness::new();
    h.store
        .set_tool_apps(
            h.link.project_id,
            vec![
                ToolApp::new("app-other", "memory", "other_tool"),
                ToolApp::new("real-1", "memory", "search_notes"),
            ],
        )
        .await;

    let mut rx = h.link.subscribe();
    let app = ToolApp::synthetic("memory", "search_notes");
    let outcome = h
        .dispatcher
        .call_tool(&app, serde_json::json!({}))
        .await
        .unwrap();

    assert!(!outcome.is_error);
    assert_eq!(
        h.proxy.recorded(),
        vec![ProxyCall::ByApp {
            app_id: "real-1".to_string(),
            tool_name: "search_notes".to_string(),
        }]
    );

    let events = drain(&mut rx);
    assert!(events.iter().any(|e| matches!(
        e,
        DomainEvent::ToolAppSubstituted {
            requested_app_id,
            resolved_app_id,
            ..
        } if requested_app_id == &app.id && resolved_app_id == "real-1"
    )));
}

#[tokio::test(start_paused = true)]
async fn unknown_synthetic_id_routes_by_server() {
    let h = DispatchHarness::new();

    let app = ToolApp::synthetic("memory", "search_notes");
    h.dispatcher
        .call_tool(&app, serde_json::json!({}))
        .await
        .unwrap();

    assert_eq!(
        h.proxy.recorded(),
        vec![ProxyCall::ByServer {
            server_name: "memory".to_string(),
            tool_name: "search_notes".to_string(),
        }]
    );
}

#[tokio::test(start_paused = true)]
async fn dead_end_route_is_a_displayable_outcome() {
    let h = DispatchHarness::new();

    let mut app = ToolApp::synthetic("memory", "search_notes");
    app.server_name = String::new();

    // Never an Err: the caller renders the outcome like any other
    let outcome = h
        .dispatcher
        .call_tool(&app, serde_json::json!({}))
        .await
        .unwrap();

    assert!(outcome.is_error);
    let text = outcome.content[0]["text"].as_str().unwrap();
    assert!(text.contains("search_notes"));
    assert!(h.proxy.recorded().is_empty());
}

#[tokio::test(start_paused = true)]
async fn proxy_failure_surfaces_as_error_outcome() {
    let h = DispatchHarness::new();
    h.proxy.fail_with("401 Unauthorized: token expired");

    // Never an Err: the failure rides the same envelope as a tool error
    let app = ToolApp::new("app-1", "memory", "search_notes");
    let outcome = h
        .dispatcher
        .call_tool(&app, serde_json::json!({}))
        .await
        .unwrap();

    assert!(outcome.is_error);
    let text = outcome.content[0]["text"].as_str().unwrap();
    assert!(text.contains("token expired"));
}

#[tokio::test(start_paused = true)]
async fn calls_stay_direct_through_a_grace_period() {
    let h = DispatchHarness::new();
    h.link.manager.connect().await;
    settle().await;

    // Establish Direct as the prior mode
    let app = ToolApp::new("app-1", "memory", "search_notes");
    h.dispatcher
        .call_tool(&app, serde_json::json!({}))
        .await
        .unwrap();
    assert_eq!(h.dispatcher.last_mode(), TransportMode::Direct);

    // Transient drop: the link enters grace, the handle stays set
    h.link.transport.drop_session(0);
    settle().await;
    assert!(h.link.manager.in_grace_period());

    h.dispatcher
        .call_tool(&app, serde_json::json!({}))
        .await
        .unwrap();
    assert_eq!(h.dispatcher.last_mode(), TransportMode::Direct);
    assert_eq!(h.link.transport.session(0).call_count(), 2);
    assert!(h.proxy.recorded().is_empty());
}

#[tokio::test(start_paused = true)]
async fn error_state_forces_fallback() {
    let h = DispatchHarness::new();
    h.link.transport.push_failures(1, "connection refused");
    h.link.manager.connect().await;
    settle().await;

    let app = ToolApp::new("app-1", "memory", "search_notes");
    h.dispatcher
        .call_tool(&app, serde_json::json!({}))
        .await
        .unwrap();

    assert_eq!(h.dispatcher.last_mode(), TransportMode::Fallback);
    assert_eq!(h.proxy.recorded().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn resources_follow_the_same_selection() {
    let h = DispatchHarness::new();

    // Disconnected: both resource operations go through the proxy
    let resources = h.dispatcher.list_resources("memory").await.unwrap();
    assert!(resources.is_empty());
    h.dispatcher
        .read_resource("memory", "memdeck://notes/1")
        .await
        .unwrap();
    assert_eq!(
        h.proxy.recorded(),
        vec![
            ProxyCall::ListResources {
                server_name: "memory".to_string(),
            },
            ProxyCall::ReadResource {
                server_name: "memory".to_string(),
                uri: "memdeck://notes/1".to_string(),
            },
        ]
    );

    // Connected: they use the live session
    h.link.manager.connect().await;
    settle().await;
    let resources = h.dispatcher.list_resources("memory").await.unwrap();
    assert_eq!(resources.len(), 1);
    assert_eq!(resources[0].uri, "memdeck://notes/1");
    assert_eq!(h.proxy.recorded().len(), 2);
}
