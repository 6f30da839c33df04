//! HTTP proxy API client tests
//!
//! Runs the real reqwest client against a wiremock server and checks
//! paths, auth headers, and envelope unwrapping.

use std::sync::Arc;

use pretty_assertions::assert_eq;
use uuid::Uuid;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use memdeck_conn::{HttpProxyApi, ProxyApi};
use memdeck_core::InMemoryTokenStore;

async fn make_client(server: &MockServer, project_id: Uuid) -> HttpProxyApi {
    let tokens = Arc::new(InMemoryTokenStore::new());
    tokens.set_token(project_id, "tok-1").await;
    HttpProxyApi::new(server.uri(), tokens).unwrap()
}

#[tokio::test]
async fn call_by_app_posts_arguments_and_unwraps_envelope() {
    let server = MockServer::start().await;
    let project_id = Uuid::new_v4();

    Mock::given(method("POST"))
        .and(path(format!(
            "/v1/projects/{}/apps/app-1/tools/search_notes/call",
            project_id
        )))
        .and(header("authorization", "Bearer tok-1"))
        .and(body_partial_json(serde_json::json!({
            "arguments": { "q": "standup" }
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "data": {
                "content": [{ "type": "text", "text": "found 2 notes" }],
                "is_error": false
            },
            "meta": null
        })))
        .expect(1)
        .mount(&server)
        .await;

    let api = make_client(&server, project_id).await;
    let outcome = api
        .call_tool_by_app(
            project_id,
            "app-1",
            "search_notes",
            serde_json::json!({ "q": "standup" }),
        )
        .await
        .unwrap();

    assert!(!outcome.is_error);
    assert_eq!(outcome.content[0]["text"], "found 2 notes");
}

#[tokio::test]
async fn call_by_server_uses_the_server_route() {
    let server = MockServer::start().await;
    let project_id = Uuid::new_v4();

    Mock::given(method("POST"))
        .and(path(format!(
            "/v1/projects/{}/servers/memory/tools/search_notes/call",
            project_id
        )))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "data": { "content": [], "is_error": false }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let api = make_client(&server, project_id).await;
    let outcome = api
        .call_tool_by_server(project_id, "memory", "search_notes", serde_json::json!({}))
        .await
        .unwrap();
    assert!(!outcome.is_error);
}

#[tokio::test]
async fn missing_token_sends_no_auth_header() {
    let server = MockServer::start().await;
    let project_id = Uuid::new_v4();

    Mock::given(method("GET"))
        .and(path(format!(
            "/v1/projects/{}/servers/memory/resources",
            project_id
        )))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "data": [{
                "uri": "memdeck://notes/1",
                "name": "note-1",
                "mime_type": "text/markdown"
            }]
        })))
        .mount(&server)
        .await;

    // No token provisioned for this project
    let tokens = Arc::new(InMemoryTokenStore::new());
    let api = HttpProxyApi::new(server.uri(), tokens).unwrap();

    let resources = api.list_resources(project_id, "memory").await.unwrap();
    assert_eq!(resources.len(), 1);
    assert_eq!(resources[0].uri, "memdeck://notes/1");
    assert_eq!(resources[0].mime_type.as_deref(), Some("text/markdown"));
}

#[tokio::test]
async fn read_resource_posts_the_uri() {
    let server = MockServer::start().await;
    let project_id = Uuid::new_v4();

    Mock::given(method("POST"))
        .and(path(format!(
            "/v1/projects/{}/servers/memory/resources/read",
            project_id
        )))
        .and(body_partial_json(serde_json::json!({
            "uri": "memdeck://notes/1"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "data": [{ "uri": "memdeck://notes/1", "text": "hello" }]
        })))
        .mount(&server)
        .await;

    let api = make_client(&server, project_id).await;
    let contents = api
        .read_resource(project_id, "memory", "memdeck://notes/1")
        .await
        .unwrap();
    assert_eq!(contents[0]["text"], "hello");
}

#[tokio::test]
async fn http_errors_surface_status_and_body() {
    let server = MockServer::start().await;
    let project_id = Uuid::new_v4();

    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(502).set_body_string("upstream tool server unreachable"),
        )
        .mount(&server)
        .await;

    let api = make_client(&server, project_id).await;
    let err = api
        .call_tool_by_app(project_id, "app-1", "search_notes", serde_json::json!({}))
        .await
        .unwrap_err();

    let message = format!("{:#}", err);
    assert!(message.contains("502"));
    assert!(message.contains("unreachable"));
}
