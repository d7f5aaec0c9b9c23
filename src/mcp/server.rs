//! MCP server implementation
//!
//! Newline-delimited JSON-RPC over stdio. Requests are handled one at a
//! time; notifications never get a reply.

use crate::mcp::protocol::*;
use crate::mcp::tools;
use crate::service::MarketService;
use anyhow::Result;
use futures::StreamExt;
use serde_json::{json, Value};
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tokio::sync::Mutex;
use tokio_util::codec::{FramedRead, LinesCodec};
use tracing::{debug, info, warn};

pub struct McpServer {
    service: Arc<MarketService>,
    initialized: Arc<Mutex<bool>>,
}

impl McpServer {
    pub fn new(service: Arc<MarketService>) -> Self {
        Self {
            service,
            initialized: Arc::new(Mutex::new(false)),
        }
    }

    /// Serve stdin/stdout until the client closes the stream
    pub async fn run(&self) -> Result<()> {
        info!("MCP server starting on stdio");
        self.run_with(tokio::io::stdin(), tokio::io::stdout()).await
    }

    pub async fn run_with<R, W>(&self, reader: R, mut writer: W) -> Result<()>
    where
        R: AsyncRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let mut lines = FramedRead::new(reader, LinesCodec::new());

        while let Some(line) = lines.next().await {
            let line = line?;
            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            debug!("Received message: {}", line);

            if let Some(response) = self.handle_message(line).await {
                let mut payload = serde_json::to_vec(&response)?;
                payload.push(b'\n');
                writer.write_all(&payload).await?;
                writer.flush().await?;
                debug!("Sent response");
            }
        }

        info!("Client closed connection");
        Ok(())
    }

    /// Handle one raw message; `None` means nothing is written back.
    pub async fn handle_message(&self, content: &str) -> Option<JsonRpcResponse> {
        let request: JsonRpcRequest = match serde_json::from_str(content) {
            Ok(req) => req,
            Err(e) => {
                return Some(JsonRpcResponse::failure(
                    Value::Null,
                    JsonRpcError::new(PARSE_ERROR, format!("Parse error: {}", e)),
                ));
            }
        };

        if request.is_notification() {
            self.handle_notification(&request).await;
            return None;
        }

        let id = request.id.clone().unwrap_or(Value::Null);
        if request.jsonrpc != "2.0" {
            return Some(JsonRpcResponse::failure(
                id,
                JsonRpcError::new(INVALID_REQUEST, "jsonrpc must be \"2.0\""),
            ));
        }

        let result = match request.method.as_str() {
            "initialize" => self.handle_initialize(request.params).await,
            "ping" => Ok(json!({})),
            "tools/list" => self.handle_list_tools().await,
            "tools/call" => self.handle_call_tool(request.params).await,
            _ => Err(JsonRpcError::new(
                METHOD_NOT_FOUND,
                format!("Method not found: {}", request.method),
            )),
        };

        Some(match result {
            Ok(result) => JsonRpcResponse::success(id, result),
            Err(error) => JsonRpcResponse::failure(id, error),
        })
    }

    async fn handle_notification(&self, request: &JsonRpcRequest) {
        match request.method.as_str() {
            "notifications/initialized" => info!("Client finished initialization"),
            "notifications/cancelled" => debug!("Ignoring cancellation notice"),
            other => warn!("Ignoring unknown notification: {}", other),
        }
    }

    async fn handle_initialize(&self, params: Option<Value>) -> Result<Value, JsonRpcError> {
        let params: InitializeParams = match params {
            Some(params) => serde_json::from_value(params).map_err(|e| {
                JsonRpcError::new(INVALID_PARAMS, format!("Invalid initialize params: {}", e))
            })?,
            None => InitializeParams::default(),
        };

        if let Some(client) = &params.client_info {
            info!(
                "Initializing for client {} {}",
                client.name,
                client.version.as_deref().unwrap_or("")
            );
        }

        *self.initialized.lock().await = true;

        let server = &self.service.config().server;
        let result = InitializeResult {
            protocol_version: PROTOCOL_VERSION.to_string(),
            capabilities: ServerCapabilities {
                logging: None,
                tools: Some(json!({})),
            },
            server_info: ServerInfo {
                name: server.name.clone(),
                version: server.version.clone(),
            },
        };

        serde_json::to_value(result).map_err(|e| {
            JsonRpcError::new(INTERNAL_ERROR, format!("Failed to serialize result: {}", e))
        })
    }

    async fn handle_list_tools(&self) -> Result<Value, JsonRpcError> {
        let tools = tools::get_tool_definitions(&self.service.config().features);

        let result = ListToolsResult { tools };

        serde_json::to_value(result).map_err(|e| {
            JsonRpcError::new(INTERNAL_ERROR, format!("Failed to serialize tools: {}", e))
        })
    }

    async fn handle_call_tool(&self, params: Option<Value>) -> Result<Value, JsonRpcError> {
        if !*self.initialized.lock().await {
            return Err(JsonRpcError::new(INTERNAL_ERROR, "Server not initialized"));
        }

        let params: CallToolParams = serde_json::from_value(params.unwrap_or(Value::Null))
            .map_err(|e| {
                JsonRpcError::new(INVALID_PARAMS, format!("Invalid tool call params: {}", e))
            })?;

        let result = tools::call_tool(&params.name, params.arguments, &self.service).await;

        serde_json::to_value(result).map_err(|e| {
            JsonRpcError::new(
                INTERNAL_ERROR,
                format!("Failed to serialize tool result: {}", e),
            )
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MarketConfig;
    use crate::http::PageFetcher;
    use crate::types::MarketError;
    use async_trait::async_trait;

    struct Offline;

    #[async_trait]
    impl PageFetcher for Offline {
        async fn get_text(&self, _url: &str) -> crate::types::Result<String> {
            Err(MarketError::upstream("offline"))
        }
    }

    fn server() -> McpServer {
        let mut config = MarketConfig::default();
        config.request.max_retries = 1;
        config.request.retry_delay_ms = 0;
        let service = MarketService::with_fetchers(
            Arc::new(config),
            Arc::new(Offline),
            Arc::new(Offline),
            Arc::new(Offline),
        )
        .unwrap();
        McpServer::new(Arc::new(service))
    }

    #[tokio::test]
    async fn test_initialize() {
        let server = server();
        let response = server
            .handle_message(
                r#"{"jsonrpc":"2.0","id":1,"method":"initialize","params":{"protocolVersion":"2024-11-05","capabilities":{},"clientInfo":{"name":"test","version":"1.0"}}}"#,
            )
            .await
            .unwrap();

        let result = response.result.unwrap();
        assert_eq!(response.id, json!(1));
        assert_eq!(result["protocolVersion"], "2024-11-05");
        assert_eq!(result["serverInfo"]["name"], "market-mcp");
        assert!(result["capabilities"]["tools"].is_object());
    }

    #[tokio::test]
    async fn test_tool_call_requires_initialize() {
        let server = server();
        let response = server
            .handle_message(
                r#"{"jsonrpc":"2.0","id":2,"method":"tools/call","params":{"name":"check_services"}}"#,
            )
            .await
            .unwrap();
        assert_eq!(response.error.unwrap().code, INTERNAL_ERROR);
    }

    #[tokio::test]
    async fn test_parse_error_and_unknown_method() {
        let server = server();

        let response = server.handle_message("{not json").await.unwrap();
        assert_eq!(response.id, Value::Null);
        assert_eq!(response.error.unwrap().code, PARSE_ERROR);

        let response = server
            .handle_message(r#"{"jsonrpc":"2.0","id":"a","method":"resources/list"}"#)
            .await
            .unwrap();
        assert_eq!(response.error.unwrap().code, METHOD_NOT_FOUND);
    }

    #[tokio::test]
    async fn test_notifications_are_silent() {
        let server = server();
        let response = server
            .handle_message(r#"{"jsonrpc":"2.0","method":"notifications/initialized"}"#)
            .await;
        assert!(response.is_none());
    }

    #[tokio::test]
    async fn test_bad_tool_call_params() {
        let server = server();
        server
            .handle_message(r#"{"jsonrpc":"2.0","id":1,"method":"initialize"}"#)
            .await;
        let response = server
            .handle_message(r#"{"jsonrpc":"2.0","id":2,"method":"tools/call","params":{"arguments":{}}}"#)
            .await
            .unwrap();
        assert_eq!(response.error.unwrap().code, INVALID_PARAMS);
    }

    #[tokio::test]
    async fn test_stdio_session() {
        let server = server();
        let input = concat!(
            r#"{"jsonrpc":"2.0","id":1,"method":"initialize","params":{}}"#,
            "\n",
            r#"{"jsonrpc":"2.0","method":"notifications/initialized"}"#,
            "\n\n",
            r#"{"jsonrpc":"2.0","id":2,"method":"tools/list"}"#,
            "\n",
            r#"{"jsonrpc":"2.0","id":3,"method":"ping"}"#,
            "\n",
        );
        let mut output = Vec::new();
        server.run_with(input.as_bytes(), &mut output).await.unwrap();

        let replies: Vec<Value> = String::from_utf8(output)
            .unwrap()
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(replies.len(), 3);
        assert_eq!(replies[1]["id"], 2);
        assert_eq!(replies[1]["result"]["tools"].as_array().unwrap().len(), 15);
        assert_eq!(replies[2]["result"], json!({}));
    }
}
