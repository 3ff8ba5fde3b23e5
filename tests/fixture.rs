#![allow(dead_code)]

use std::fs;
use std::path::PathBuf;
use std::sync::Mutex;

use async_trait::async_trait;
use chat_api::{ChatApiError, ChatRequest, ChatTransport, FragmentStream};
use doc_chat::render::sink::{Advisory, Banner, RenderSink, SourceList};
use doc_chat::{RenderedDocument, ResponseView};
use futures_util::stream::{self, StreamExt};
use tokio::time::{sleep, Duration};

pub fn read_fixture(name: &str) -> String {
    let mut path = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    path.push("tests");
    path.push("fixtures");
    path.push(name);
    fs::read_to_string(&path).unwrap_or_else(|err| panic!("failed to read fixture {name}: {err}"))
}

/// Fixture lines with trailing whitespace removed.
pub fn read_lines(name: &str) -> Vec<String> {
    let raw = read_fixture(name).replace("\r\n", "\n");
    raw.strip_suffix('\n')
        .unwrap_or(&raw)
        .split('\n')
        .map(|line| line.trim_end().to_string())
        .collect()
}

/// One `event:`/`data:` frame.
pub fn frame(name: &str, payload: &str) -> String {
    format!("event: {name}\ndata: {payload}\n\n")
}

pub fn delta(text: &str) -> String {
    frame(
        "delta",
        &serde_json::json!({ "text": text }).to_string(),
    )
}

pub fn done() -> String {
    frame("done", "{}")
}

#[derive(Clone)]
pub enum Step {
    Bytes { delay_ms: u64, bytes: Vec<u8> },
    Fail(String),
    /// The body never yields again.
    Stall,
}

impl Step {
    pub fn now(text: impl AsRef<str>) -> Self {
        Self::after(0, text)
    }

    pub fn after(delay_ms: u64, text: impl AsRef<str>) -> Self {
        Self::Bytes {
            delay_ms,
            bytes: text.as_ref().as_bytes().to_vec(),
        }
    }
}

pub enum OpenBehavior {
    Stream(Vec<Step>),
    Reject(fn() -> ChatApiError),
    Hang,
}

/// Replays a fixed script for every `open` and records the requests it saw.
pub struct ScriptedTransport {
    behavior: OpenBehavior,
    requests: Mutex<Vec<ChatRequest>>,
}

impl ScriptedTransport {
    pub fn new(steps: Vec<Step>) -> Self {
        Self::with_behavior(OpenBehavior::Stream(steps))
    }

    pub fn with_behavior(behavior: OpenBehavior) -> Self {
        Self {
            behavior,
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn requests(&self) -> Vec<ChatRequest> {
        self.requests
            .lock()
            .map(|requests| requests.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl ChatTransport for ScriptedTransport {
    async fn open(&self, request: &ChatRequest) -> Result<FragmentStream, ChatApiError> {
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(request.clone());
        }

        let steps = match &self.behavior {
            OpenBehavior::Stream(steps) => steps.clone(),
            OpenBehavior::Reject(error) => return Err(error()),
            OpenBehavior::Hang => {
                futures_util::future::pending::<()>().await;
                Vec::new()
            }
        };

        let fragments = stream::iter(steps)
            .then(|step| async move {
                match step {
                    Step::Bytes { delay_ms, bytes } => {
                        if delay_ms > 0 {
                            sleep(Duration::from_millis(delay_ms)).await;
                        }
                        Some(Ok(bytes))
                    }
                    Step::Fail(message) => Some(Err(ChatApiError::Stream(message))),
                    Step::Stall => {
                        futures_util::future::pending::<()>().await;
                        None
                    }
                }
            })
            .filter_map(|item| async move { item });
        Ok(Box::pin(fragments))
    }
}

/// Response view that also keeps the plain text of every render it received.
#[derive(Default)]
pub struct RecordingSink {
    pub view: ResponseView,
    pub renders: Vec<Vec<String>>,
}

impl RenderSink for RecordingSink {
    fn render(&mut self, document: &RenderedDocument) {
        self.renders.push(document.plain_lines());
        self.view.render(document);
    }

    fn advisory(&mut self, advisory: Advisory) {
        self.view.advisory(advisory);
    }

    fn annotate(&mut self, code_block: usize, banner: Banner) {
        self.view.annotate(code_block, banner);
    }

    fn append_aside(&mut self, sources: SourceList) {
        self.view.append_aside(sources);
    }

    fn fail(&mut self, message: &str) {
        self.view.fail(message);
    }

    fn finish(&mut self) {
        self.view.finish();
    }
}
