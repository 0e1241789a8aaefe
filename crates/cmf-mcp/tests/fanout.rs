//! End-to-end: JSON-RPC in, HTTP to mock CMF servers, aggregate out.

use cmf_core::Config;
use cmf_mcp::McpServer;
use serde_json::{json, Value};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn config_for(urls: &[&str]) -> Config {
    let mut config = Config::default();
    let mut slots = [
        &mut config.cmf.base_url,
        &mut config.cmf.base_url_2,
        &mut config.cmf.base_url_3,
        &mut config.cmf.base_url_4,
    ];
    for (slot, url) in slots.iter_mut().zip(urls) {
        **slot = Some(url.to_string());
    }
    config
}

async fn call_tool(server: &McpServer, name: &str, arguments: Value) -> Value {
    let request = json!({
        "jsonrpc": "2.0",
        "id": 1,
        "method": "tools/call",
        "params": {"name": name, "arguments": arguments}
    });
    let response = server
        .handle_line(&request.to_string())
        .await
        .expect("tools/call gets a response");
    let response: Value = serde_json::from_str(&response).unwrap();
    assert_eq!(response["result"]["isError"], false, "{}", response);
    response["result"]["structuredContent"]["result"].clone()
}

#[tokio::test]
async fn test_one_failing_server_does_not_hide_the_other() {
    let healthy = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/display_executions/train"))
        .and(query_param("page", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "total_items": 1,
            "items": [{"id": 1}]
        })))
        .mount(&healthy)
        .await;

    let broken = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500).set_body_string("database unavailable"))
        .mount(&broken)
        .await;

    let server =
        McpServer::from_config(&config_for(&[&healthy.uri(), &broken.uri()])).unwrap();
    let result = call_tool(&server, "cmf_show_executions", json!({"pipeline": "train"})).await;

    assert_eq!(
        result,
        json!([
            {"cmfClient": healthy.uri(), "data": {"total_items": 1, "items": [{"id": 1}]}},
            {"cmfClient": broken.uri(), "error": "CMF server returned 500: database unavailable"}
        ])
    );
}

#[tokio::test]
async fn test_target_filter_selects_servers() {
    let first = MockServer::start().await;
    let second = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/display_pipelines"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!(["train"])))
        .expect(0)
        .mount(&first)
        .await;
    Mock::given(method("GET"))
        .and(path("/display_pipelines"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!(["eval"])))
        .expect(1)
        .mount(&second)
        .await;

    let server = McpServer::from_config(&config_for(&[&first.uri(), &second.uri()])).unwrap();

    let result = call_tool(
        &server,
        "cmf_show_pipelines",
        json!({"cmfClient_instances": [second.uri(), "http://unknown:8080"]}),
    )
    .await;
    assert_eq!(result, json!([{"cmfClient": second.uri(), "data": ["eval"]}]));

    let result = call_tool(
        &server,
        "cmf_show_pipelines",
        json!({"cmfClient_instances": ["http://unknown:8080"]}),
    )
    .await;
    assert_eq!(result, json!([]));
}

#[tokio::test]
async fn test_queries_after_shutdown_report_closed_sessions() {
    let backend = MockServer::start().await;
    let server = McpServer::from_config(&config_for(&[&backend.uri()])).unwrap();

    assert!(server.context().shutdown().await);
    assert!(!server.context().shutdown().await);

    let result = call_tool(&server, "cmf_show_python_env", json!({})).await;
    assert_eq!(
        result,
        json!([{"cmfClient": backend.uri(), "error": "session closed"}])
    );
}

#[test]
fn test_missing_primary_is_fatal() {
    let mut config = Config::default();
    config.cmf.base_url_2 = Some("http://h2".to_string());
    let err = McpServer::from_config(&config).err().unwrap();
    assert_eq!(
        err.to_string(),
        "Primary CMF configuration (CMF_BASE_URL) is required"
    );
}
