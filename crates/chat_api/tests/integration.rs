use std::sync::{Arc, Mutex};

use chat_api::{
    ChatApiClient, ChatApiConfig, ChatApiError, ChatMessage, ChatRequest, ChatTransport,
    SseStreamParser,
};
use futures_util::StreamExt;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;
use tokio::time::{sleep, Duration};

fn allow_local_integration() -> bool {
    std::env::var("CHAT_API_ALLOW_LOCAL_INTEGRATION")
        .map(|value| matches!(value.as_str(), "1" | "true" | "TRUE" | "yes" | "YES"))
        .unwrap_or(false)
}

#[derive(Clone)]
struct ResponseChunk {
    delay_ms: u64,
    bytes: Vec<u8>,
}

#[derive(Clone)]
struct ScriptedResponse {
    status: u16,
    content_type: &'static str,
    chunks: Vec<ResponseChunk>,
}

struct ScriptedServer {
    base_url: String,
    captured: Arc<Mutex<Vec<CapturedRequest>>>,
    handle: JoinHandle<()>,
}

#[derive(Debug, Clone)]
struct CapturedRequest {
    head: String,
    body: Vec<u8>,
}

impl ScriptedServer {
    async fn new(response: ScriptedResponse) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("local TCP listener should bind");
        let addr = listener
            .local_addr()
            .expect("resolved local listener address");
        let base_url = format!("http://{addr}");
        let captured = Arc::new(Mutex::new(Vec::new()));

        let handle = tokio::spawn({
            let captured = Arc::clone(&captured);
            async move {
                loop {
                    let (socket, _) = match listener.accept().await {
                        Ok(pair) => pair,
                        Err(_) => break,
                    };
                    let response = response.clone();
                    let captured = Arc::clone(&captured);
                    tokio::spawn(async move {
                        serve_one(socket, response, captured).await;
                    });
                }
            }
        });

        Self {
            base_url,
            captured,
            handle,
        }
    }

    fn captured(&self) -> Vec<CapturedRequest> {
        self.captured
            .lock()
            .map(|captured| captured.clone())
            .unwrap_or_default()
    }

    fn shutdown(&self) {
        self.handle.abort();
    }
}

fn event_stream(status: u16, chunks: &[(u64, &str)]) -> ScriptedResponse {
    ScriptedResponse {
        status,
        content_type: "text/event-stream",
        chunks: chunks
            .iter()
            .map(|(delay_ms, text)| ResponseChunk {
                delay_ms: *delay_ms,
                bytes: text.as_bytes().to_vec(),
            })
            .collect(),
    }
}

async fn collect_events(client: &ChatApiClient, request: &ChatRequest) -> Vec<String> {
    let mut fragments = client.open(request).await.expect("stream should open");
    let mut parser = SseStreamParser::default();
    let mut names = Vec::new();
    while let Some(fragment) = fragments.next().await {
        let fragment = fragment.expect("fragment");
        names.extend(parser.feed(&fragment).into_iter().map(|event| event.name));
    }
    names.extend(parser.finish().into_iter().map(|event| event.name));
    names
}

#[tokio::test]
async fn stream_integration_posts_history_and_reads_split_frames() {
    if !allow_local_integration() {
        return;
    }

    let server = ScriptedServer::new(event_stream(
        200,
        &[
            (0, "event: delta\ndata: {\"te"),
            (10, "xt\":\"DWC is...\"}\n\nevent: do"),
            (10, "ne\ndata: {}\n\n"),
        ],
    ))
    .await;

    let client = ChatApiClient::new(ChatApiConfig::new(&server.base_url)).expect("client");
    let request = ChatRequest::new(vec![ChatMessage::user("What is DWC?")]);
    let names = collect_events(&client, &request).await;
    assert_eq!(names, vec!["delta".to_string(), "done".to_string()]);

    let captured = server.captured();
    assert_eq!(captured.len(), 1);
    assert!(captured[0].head.starts_with("POST /chat/stream "));
    assert!(captured[0]
        .head
        .to_ascii_lowercase()
        .contains("accept: text/event-stream"));
    let body: serde_json::Value =
        serde_json::from_slice(&captured[0].body).expect("request body is JSON");
    assert_eq!(
        body,
        serde_json::json!({"messages": [{"role": "user", "content": "What is DWC?"}]})
    );

    server.shutdown();
}

#[tokio::test]
async fn stream_integration_rejects_non_success_status() {
    if !allow_local_integration() {
        return;
    }

    let server = ScriptedServer::new(ScriptedResponse {
        status: 503,
        content_type: "application/json",
        chunks: vec![ResponseChunk {
            delay_ms: 0,
            bytes: br#"{"detail":"index warming up"}"#.to_vec(),
        }],
    })
    .await;

    let client = ChatApiClient::new(ChatApiConfig::new(&server.base_url)).expect("client");
    let request = ChatRequest::new(vec![ChatMessage::user("hi")]);
    let error = match client.open(&request).await {
        Ok(_) => panic!("503 must not open a stream"),
        Err(error) => error,
    };

    match error {
        ChatApiError::Status(status, message) => {
            assert_eq!(status.as_u16(), 503);
            assert_eq!(message, "index warming up");
        }
        other => panic!("unexpected error: {other}"),
    }

    server.shutdown();
}

async fn serve_one(
    mut socket: TcpStream,
    response: ScriptedResponse,
    captured: Arc<Mutex<Vec<CapturedRequest>>>,
) {
    let Ok(request) = read_request(&mut socket).await else {
        return;
    };
    if let Ok(mut captured) = captured.lock() {
        captured.push(request);
    }

    let headers = format!(
        "HTTP/1.1 {} {}\r\nContent-Type: {}\r\nTransfer-Encoding: chunked\r\nConnection: close\r\n\r\n",
        response.status,
        status_reason(response.status),
        response.content_type,
    );
    if socket.write_all(headers.as_bytes()).await.is_err() {
        return;
    }

    for chunk in response.chunks {
        if chunk.delay_ms > 0 {
            sleep(Duration::from_millis(chunk.delay_ms)).await;
        }
        let prefix = format!("{:X}\r\n", chunk.bytes.len());
        if socket.write_all(prefix.as_bytes()).await.is_err() {
            return;
        }
        if socket.write_all(&chunk.bytes).await.is_err() {
            return;
        }
        if socket.write_all(b"\r\n").await.is_err() {
            return;
        }
    }

    let _ = socket.write_all(b"0\r\n\r\n").await;
    let _ = socket.shutdown().await;
}

async fn read_request(socket: &mut TcpStream) -> std::io::Result<CapturedRequest> {
    let mut request = Vec::new();
    let mut buffer = [0_u8; 2048];

    let head_end = loop {
        let n = socket.read(&mut buffer).await?;
        if n == 0 {
            return Err(std::io::ErrorKind::UnexpectedEof.into());
        }
        request.extend_from_slice(&buffer[..n]);
        if let Some(position) = request.windows(4).position(|window| window == b"\r\n\r\n") {
            break position + 4;
        }
    };

    let head = String::from_utf8_lossy(&request[..head_end]).into_owned();
    let content_length = head
        .lines()
        .filter_map(|line| line.split_once(':'))
        .find(|(name, _)| name.trim().eq_ignore_ascii_case("content-length"))
        .and_then(|(_, value)| value.trim().parse::<usize>().ok())
        .unwrap_or(0);

    while request.len() < head_end + content_length {
        let n = socket.read(&mut buffer).await?;
        if n == 0 {
            break;
        }
        request.extend_from_slice(&buffer[..n]);
    }

    Ok(CapturedRequest {
        head,
        body: request[head_end..].to_vec(),
    })
}

fn status_reason(status: u16) -> &'static str {
    match status {
        200 => "OK",
        503 => "Service Unavailable",
        _ => "Status",
    }
}
