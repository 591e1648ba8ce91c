use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

pub mod handlers;
pub mod rpc;
pub mod state;
pub mod tools;

pub use state::AppState;

pub fn create_app(state: AppState) -> Router {
    let cors = CorsLayer::permissive();

    Router::new()
        .route("/health", get(handlers::health))
        .route("/mcp", post(handlers::mcp))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(Arc::new(state))
}

/// Binds `addr` and serves until the process is stopped.
pub async fn serve(addr: &str, state: AppState) -> va_core::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Listening on {}", listener.local_addr()?);
    axum::serve(listener, create_app(state)).await?;
    Ok(())
}

pub mod prelude {
    pub use crate::AppState;
    pub use va_core::{Error, Result};
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use serde_json::{json, Value};
    use tempfile::TempDir;
    use tower::ServiceExt;
    use va_core::Config;
    use va_publish::PublisherKind;

    fn state(output_dir: &TempDir) -> AppState {
        let config = Config {
            output_dir: output_dir.path().to_path_buf(),
            ..Config::default()
        };
        AppState::new(config, PublisherKind::Memory).unwrap()
    }

    async fn rpc(app: Router, body: Value) -> Value {
        let response = app
            .oneshot(
                Request::post("/mcp")
                    .header("content-type", "application/json")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn call(id: i64, tool: &str, arguments: Value) -> Value {
        json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": "tools/call",
            "params": {"name": tool, "arguments": arguments}
        })
    }

    #[tokio::test]
    async fn test_health() {
        let dir = TempDir::new().unwrap();
        let response = create_app(state(&dir))
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["status"], "ok");
        assert_eq!(body["service"], "va");
    }

    #[tokio::test]
    async fn test_initialize_and_list_tools() {
        let dir = TempDir::new().unwrap();
        let app = create_app(state(&dir));

        let init = rpc(
            app.clone(),
            json!({"jsonrpc": "2.0", "id": 1, "method": "initialize", "params": {}}),
        )
        .await;
        assert_eq!(init["result"]["protocolVersion"], rpc::MCP_PROTOCOL_VERSION);
        assert_eq!(init["result"]["serverInfo"]["name"], "va");

        let list = rpc(app, json!({"jsonrpc": "2.0", "id": "two", "method": "tools/list"})).await;
        assert_eq!(list["id"], "two");
        let tools = list["result"]["tools"].as_array().unwrap();
        assert_eq!(tools.len(), 2);
        assert_eq!(tools[0]["name"], "scrape_jama_article");
        assert!(tools[1]["inputSchema"]["properties"]["github_repo"].is_object());
    }

    #[tokio::test]
    async fn test_protocol_errors() {
        let dir = TempDir::new().unwrap();
        let app = create_app(state(&dir));

        let unknown = rpc(app.clone(), json!({"jsonrpc": "2.0", "id": 1, "method": "resources/list"})).await;
        assert_eq!(unknown["error"]["code"], -32601);

        let bad_tool = rpc(app.clone(), call(2, "delete_everything", json!({}))).await;
        assert_eq!(bad_tool["error"]["code"], -32602);

        let response = app
            .oneshot(
                Request::post("/mcp")
                    .body(Body::from("{not json"))
                    .unwrap(),
            )
            .await
            .unwrap();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["error"]["code"], -32700);
    }

    #[tokio::test]
    async fn test_notification_gets_no_body() {
        let dir = TempDir::new().unwrap();
        let response = create_app(state(&dir))
            .oneshot(
                Request::post("/mcp")
                    .body(Body::from(
                        json!({"jsonrpc": "2.0", "method": "notifications/initialized"}).to_string(),
                    ))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::ACCEPTED);
    }

    #[tokio::test]
    async fn test_scrape_rejects_foreign_url() {
        let dir = TempDir::new().unwrap();
        let reply = rpc(
            create_app(state(&dir)),
            call(3, "scrape_jama_article", json!({"url": "https://example.org/article"})),
        )
        .await;
        let result = &reply["result"];
        assert_eq!(result["isError"], true);
        assert_eq!(result["structuredContent"]["kind"], "validation_error");
    }

    #[tokio::test]
    async fn test_create_powerpoint_with_publish() {
        let dir = TempDir::new().unwrap();
        let reply = rpc(
            create_app(state(&dir)),
            call(
                4,
                "create_powerpoint",
                json!({
                    "data": {
                        "title": "Effect of Exercise on Sleep",
                        "sourceUrl": "https://jamanetwork.com/journals/jama/fullarticle/1",
                        "abstractSections": {"Results": "Sleep improved."},
                        "keyPoints": ["Findings: yes"]
                    },
                    "output_filename": "sleep",
                    "github_repo": "owner/repo",
                    "github_token": "token"
                }),
            ),
        )
        .await;

        let payload = &reply["result"]["structuredContent"];
        let path = payload["output_path"].as_str().unwrap();
        assert!(path.ends_with("sleep.pptx"));
        assert!(std::path::Path::new(path).exists());
        assert_eq!(payload["download_url"], "memory://owner/repo/sleep.pptx");
        assert!(payload["result"].as_str().unwrap().contains("uploaded to"));
    }

    #[tokio::test]
    async fn test_create_powerpoint_blank_title() {
        let dir = TempDir::new().unwrap();
        let reply = rpc(
            create_app(state(&dir)),
            call(5, "create_powerpoint", json!({"data": {"title": "  "}})),
        )
        .await;
        assert_eq!(reply["result"]["isError"], true);
        assert_eq!(reply["result"]["structuredContent"]["kind"], "render_error");
    }
}
