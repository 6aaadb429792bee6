use std::sync::Arc;
use std::time::Duration;

use anyhow::anyhow;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use fsview_core::tools::r#trait::ToolDefinition;
use fsview_core::{ToolOutput, ToolRegistry};

#[derive(Debug, Deserialize)]
#[serde(tag = "method", rename_all = "snake_case")]
pub enum Method {
    ListTools,
    CallTool {
        name: String,
        #[serde(default)]
        arguments: Value,
    },
}

/// One request line.
#[derive(Debug, Deserialize)]
pub struct Request {
    #[serde(default)]
    pub id: Value,
    #[serde(flatten)]
    pub method: Method,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum ResponseBody {
    Tools { tools: Vec<ToolDefinition> },
    Output(ToolOutput),
}

/// One response line; `id` is copied from the request.
#[derive(Debug, Serialize)]
pub struct Response {
    pub id: Value,
    #[serde(flatten)]
    pub body: ResponseBody,
}

/// Answers a single request line. Lines that are not a valid request get an
/// error response carrying whatever `id` could be recovered.
pub async fn handle_line(registry: &ToolRegistry, line: &str) -> Response {
    let raw: Value = match serde_json::from_str(line) {
        Ok(raw) => raw,
        Err(e) => {
            return Response {
                id: Value::Null,
                body: ResponseBody::Output(ToolOutput::error(format!("Invalid request: {e}"))),
            }
        }
    };

    let id = raw.get("id").cloned().unwrap_or(Value::Null);
    let request: Request = match serde_json::from_value(raw) {
        Ok(request) => request,
        Err(e) => {
            return Response {
                id,
                body: ResponseBody::Output(ToolOutput::error(format!("Invalid request: {e}"))),
            }
        }
    };

    let body = match request.method {
        Method::ListTools => ResponseBody::Tools {
            tools: registry.definitions(),
        },
        Method::CallTool { name, arguments } => {
            ResponseBody::Output(registry.call(&name, &arguments).await)
        }
    };

    Response { id, body }
}

/// Serves requests from `reader` until it closes. Requests are handled
/// concurrently, so responses may come back out of request order.
pub async fn serve<R, W>(registry: Arc<ToolRegistry>, reader: R, mut writer: W) -> anyhow::Result<()>
where
    R: AsyncRead + Unpin + Send + 'static,
    W: AsyncWrite + Unpin + Send + 'static,
{
    let (tx, mut rx) = mpsc::unbounded_channel::<Response>();
    let mut join_set: JoinSet<anyhow::Result<()>> = JoinSet::new();

    join_set.spawn(async move {
        while let Some(response) = rx.recv().await {
            let json = serde_json::to_string(&response)?;
            let json = format!("{json}\n");
            writer.write_all(json.as_bytes()).await?;
            writer.flush().await?;
        }
        Ok(())
    });

    let mut lines = BufReader::new(reader).lines();
    let mut requests = JoinSet::new();
    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }
        let registry = registry.clone();
        let tx = tx.clone();
        requests.spawn(async move {
            let response = handle_line(&registry, &line).await;
            if tx.send(response).is_err() {
                debug!("Writer closed before response was sent");
            }
        });
    }

    while let Some(result) = requests.join_next().await {
        if let Err(e) = result {
            warn!(error = %e, "Request task failed");
        }
    }
    drop(tx);

    match join_set.join_next().await {
        Some(Ok(result)) => result,
        Some(Err(panic)) => Err(anyhow!(panic)),
        None => Ok(()),
    }
}

pub async fn serve_stdio(registry: Arc<ToolRegistry>) -> anyhow::Result<()> {
    info!("Serving on stdio");
    serve(registry, tokio::io::stdin(), tokio::io::stdout()).await
}

/// Pause after a failed `accept` so a persistent error (EMFILE) does not spin.
const ACCEPT_BACKOFF: Duration = Duration::from_millis(100);

pub async fn serve_tcp(addr: &str, registry: Arc<ToolRegistry>) -> anyhow::Result<()> {
    let listener = TcpListener::bind(addr).await?;
    info!(addr = %listener.local_addr()?, "Listening for connections");
    serve_listener(listener, registry).await
}

/// Accepts connections forever, serving each on its own task. Accept errors
/// are logged and do not stop the listener.
pub async fn serve_listener(listener: TcpListener, registry: Arc<ToolRegistry>) -> anyhow::Result<()> {
    loop {
        let (stream, peer) = match listener.accept().await {
            Ok(accepted) => accepted,
            Err(e) => {
                warn!(error = %e, "Failed to accept connection");
                tokio::time::sleep(ACCEPT_BACKOFF).await;
                continue;
            }
        };
        debug!(%peer, "Accepted connection");
        let registry = registry.clone();
        tokio::spawn(async move {
            let (reader, writer) = stream.into_split();
            if let Err(e) = serve(registry, reader, writer).await {
                warn!(%peer, error = ?e, "Connection closed with error");
            }
            debug!(%peer, "Connection closed");
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fsview_core::Config;
    use serde_json::json;
    use std::fs;
    use tempfile::TempDir;

    fn registry() -> (TempDir, ToolRegistry) {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("a.txt"), "alpha\n").unwrap();
        let config = Config::for_base_path(dir.path()).validate().unwrap();
        (dir, ToolRegistry::for_config(Arc::new(config)))
    }

    async fn respond(registry: &ToolRegistry, line: &str) -> Value {
        serde_json::to_value(handle_line(registry, line).await).unwrap()
    }

    #[tokio::test]
    async fn test_list_tools() {
        let (_dir, registry) = registry();
        let response = respond(&registry, r#"{"id": 1, "method": "list_tools"}"#).await;

        assert_eq!(response["id"], 1);
        let names: Vec<&str> = response["tools"]
            .as_array()
            .unwrap()
            .iter()
            .map(|t| t["name"].as_str().unwrap())
            .collect();
        assert_eq!(
            names,
            vec!["grep_search", "read_file_contents", "read_file_structure"]
        );
    }

    #[tokio::test]
    async fn test_call_tool() {
        let (_dir, registry) = registry();
        let line = json!({
            "id": "req-7",
            "method": "call_tool",
            "name": "read_file_contents",
            "arguments": {"file_path": "a.txt"}
        })
        .to_string();
        let response = respond(&registry, &line).await;

        assert_eq!(response["id"], "req-7");
        assert_eq!(response["is_error"], false);
        let content: Value = serde_json::from_str(response["content"].as_str().unwrap()).unwrap();
        assert_eq!(content["content"], "alpha\n");
    }

    #[tokio::test]
    async fn test_malformed_lines() {
        let (_dir, registry) = registry();

        let response = respond(&registry, "not json").await;
        assert_eq!(response["id"], Value::Null);
        assert_eq!(response["is_error"], true);

        let response = respond(&registry, r#"{"id": 3, "method": "delete_everything"}"#).await;
        assert_eq!(response["id"], 3);
        assert_eq!(response["is_error"], true);
        assert!(response["content"]
            .as_str()
            .unwrap()
            .starts_with("Invalid request"));
    }

    #[tokio::test]
    async fn test_serve_answers_every_line() {
        let (_dir, registry) = registry();
        let input = concat!(
            r#"{"id": 1, "method": "list_tools"}"#,
            "\n\ngarbage\n",
            r#"{"id": 2, "method": "call_tool", "name": "read_file_structure"}"#,
            "\n"
        );
        let (client, server_side) = tokio::io::duplex(64 * 1024);

        serve(Arc::new(registry), input.as_bytes(), server_side)
            .await
            .unwrap();

        let mut output = String::new();
        let mut client = client;
        tokio::io::AsyncReadExt::read_to_string(&mut client, &mut output)
            .await
            .unwrap();

        let mut ids: Vec<Value> = output
            .lines()
            .map(|l| serde_json::from_str::<Value>(l).unwrap()["id"].clone())
            .collect();
        ids.sort_by_key(|id| id.as_i64().unwrap_or(0));
        assert_eq!(ids, vec![Value::Null, json!(1), json!(2)]);
    }

    #[tokio::test]
    async fn test_listener_outlives_each_connection() {
        use tokio::io::AsyncReadExt;
        use tokio::net::TcpStream;

        let (_dir, registry) = registry();
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let server = tokio::spawn(serve_listener(listener, Arc::new(registry)));

        for id in 1..=2 {
            let mut stream = TcpStream::connect(addr).await.unwrap();
            let line = format!("{}\n", json!({"id": id, "method": "list_tools"}));
            stream.write_all(line.as_bytes()).await.unwrap();
            stream.shutdown().await.unwrap();

            let mut output = String::new();
            stream.read_to_string(&mut output).await.unwrap();
            let response: Value = serde_json::from_str(output.trim()).unwrap();
            assert_eq!(response["id"], id);
            assert_eq!(response["tools"].as_array().unwrap().len(), 3);
        }

        assert!(!server.is_finished());
        server.abort();
    }
}
