//! One streamed turn: open the request, read fragments, dispatch events, render
//! on frame ticks, and finalize on `done`, end of input or cancellation.

use std::sync::atomic::Ordering;
use std::time::Duration;

use chat_api::client::CANCEL_POLL_INTERVAL;
use chat_api::{
    await_or_cancel, is_cancelled, CancellationSignal, ChatApiError, ChatEvent, ChatRequest,
    ChatTransport, SseStreamParser, StreamEvent, Usage,
};
use futures_util::StreamExt;
use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::chat::TurnId;
use crate::error::TurnFailure;
use crate::postprocess::{FinalizeSummary, Finalizer};
use crate::render::coalescer::RenderCoalescer;
use crate::render::markdown::{MarkdownRenderer, RenderedDocument};
use crate::render::sink::{Advisory, RenderSink};
use crate::render::render_streaming;

pub const SERVER_ERROR_FALLBACK: &str = "An error occurred";

#[derive(Debug)]
pub enum TurnOutcome {
    /// The server sent `done`.
    Completed { text: String, usage: Usage },
    /// The caller cancelled; `partial` is whatever had arrived.
    Cancelled { partial: String },
    /// The stream ended without `done`.
    Truncated { partial: String },
    Failed { error: TurnFailure },
}

impl TurnOutcome {
    /// Text to keep in history, if any.
    pub fn answer_text(&self) -> Option<&str> {
        let text = match self {
            Self::Completed { text, .. } => text,
            Self::Cancelled { partial } | Self::Truncated { partial } => partial,
            Self::Failed { .. } => return None,
        };
        (!text.is_empty()).then_some(text.as_str())
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }
}

#[derive(Debug)]
pub struct SessionReport {
    pub turn_id: TurnId,
    pub outcome: TurnOutcome,
    /// Data lines that were not JSON plus recognised events of the wrong shape.
    pub dropped_payloads: usize,
    /// `render` calls made on the sink, coalesced and final.
    pub renders: usize,
    pub finalize: Option<FinalizeSummary>,
}

enum LoopEnd {
    Done(Usage),
    EndOfInput,
    Cancelled,
    ServerError(String),
    Transport(ChatApiError),
}

/// Per-turn state. Created by [`crate::Chat::begin_turn`], consumed by [`StreamSession::run`].
#[derive(Debug)]
pub struct StreamSession {
    turn_id: TurnId,
    request: ChatRequest,
    cancel: CancellationSignal,
    frame_interval: Duration,
    accumulated: String,
    parser: SseStreamParser,
    finalizer: Finalizer,
    malformed_events: usize,
    renders: usize,
}

impl StreamSession {
    pub fn new(
        turn_id: TurnId,
        request: ChatRequest,
        cancel: CancellationSignal,
        frame_interval: Duration,
    ) -> Self {
        Self {
            turn_id,
            request,
            cancel,
            frame_interval,
            accumulated: String::new(),
            parser: SseStreamParser::default(),
            finalizer: Finalizer::new(),
            malformed_events: 0,
            renders: 0,
        }
    }

    pub fn turn_id(&self) -> TurnId {
        self.turn_id
    }

    pub fn request(&self) -> &ChatRequest {
        &self.request
    }

    pub fn cancel_signal(&self) -> CancellationSignal {
        self.cancel.clone()
    }

    pub fn cancel(&self) {
        self.cancel.store(true, Ordering::Release);
    }

    fn is_cancelled(&self) -> bool {
        is_cancelled(Some(&self.cancel))
    }

    pub async fn run<T, S>(
        mut self,
        transport: &T,
        renderer: &MarkdownRenderer,
        sink: &mut S,
    ) -> SessionReport
    where
        T: ChatTransport + ?Sized,
        S: RenderSink + ?Sized,
    {
        info!(
            turn_id = self.turn_id,
            messages = self.request.messages.len(),
            "starting turn"
        );

        let mut fragments =
            match await_or_cancel(transport.open(&self.request), Some(&self.cancel)).await {
                Ok(Ok(fragments)) => fragments,
                Ok(Err(error)) | Err(error) => {
                    let end = if error.is_transport() {
                        LoopEnd::Transport(error)
                    } else {
                        LoopEnd::Cancelled
                    };
                    return self.conclude(end, renderer, sink);
                }
            };

        let mut coalescer = RenderCoalescer::new(self.frame_interval);
        let end = loop {
            if self.is_cancelled() {
                break LoopEnd::Cancelled;
            }

            tokio::select! {
                biased;

                _ = coalescer.next_frame(), if coalescer.is_pending() => {
                    if coalescer.take_pending() {
                        self.render_now(renderer, sink);
                    }
                }
                fragment = fragments.next() => match fragment {
                    Some(Ok(bytes)) => {
                        let events = self.parser.feed(&bytes);
                        if let Some(end) = self.dispatch(events, &mut coalescer, sink) {
                            break end;
                        }
                    }
                    Some(Err(error)) => break LoopEnd::Transport(error),
                    None => {
                        let events = self.parser.finish();
                        break self
                            .dispatch(events, &mut coalescer, sink)
                            .unwrap_or(LoopEnd::EndOfInput);
                    }
                },
                _ = sleep(CANCEL_POLL_INTERVAL) => {}
            }
        };

        // Dropping the stream releases the connection.
        drop(fragments);
        coalescer.cancel();
        self.conclude(end, renderer, sink)
    }

    /// Applies events in arrival order; returns how the loop ends, if it does.
    fn dispatch<S>(
        &mut self,
        events: Vec<StreamEvent>,
        coalescer: &mut RenderCoalescer,
        sink: &mut S,
    ) -> Option<LoopEnd>
    where
        S: RenderSink + ?Sized,
    {
        for event in events {
            let name = event.name.clone();
            let Some(event) = ChatEvent::from_stream_event(event) else {
                debug!(event = %name, "dropping event with malformed payload");
                self.malformed_events += 1;
                continue;
            };

            match event {
                ChatEvent::Sources(sources) => {
                    debug!(count = sources.len(), "sources received");
                    if self.finalizer.record_sources(sources) {
                        sink.advisory(Advisory::LowConfidence);
                    }
                }
                ChatEvent::Delta { text } => {
                    self.accumulated.push_str(&text);
                    coalescer.request_render();
                }
                ChatEvent::Done { usage } => return Some(LoopEnd::Done(usage)),
                ChatEvent::Error { message } => {
                    return Some(LoopEnd::ServerError(
                        message.unwrap_or_else(|| SERVER_ERROR_FALLBACK.to_string()),
                    ));
                }
                ChatEvent::ValidationWarning(warning) => {
                    self.finalizer.push_warning(warning);
                }
                ChatEvent::Unknown { name, .. } => {
                    debug!(event = %name, "ignoring unknown event");
                }
            }
        }
        None
    }

    fn render_now<S>(&mut self, renderer: &MarkdownRenderer, sink: &mut S) -> RenderedDocument
    where
        S: RenderSink + ?Sized,
    {
        let document = render_streaming(renderer, &self.accumulated);
        sink.render(&document);
        self.renders += 1;
        document
    }

    fn conclude<S>(
        mut self,
        end: LoopEnd,
        renderer: &MarkdownRenderer,
        sink: &mut S,
    ) -> SessionReport
    where
        S: RenderSink + ?Sized,
    {
        let mut finalize = None;
        let outcome = match end {
            LoopEnd::Transport(error) => {
                warn!(turn_id = self.turn_id, %error, "turn failed");
                sink.fail(&error.to_string());
                TurnOutcome::Failed {
                    error: TurnFailure::Transport(error),
                }
            }
            LoopEnd::ServerError(message) => {
                warn!(turn_id = self.turn_id, %message, "server reported an error");
                sink.fail(&message);
                TurnOutcome::Failed {
                    error: TurnFailure::Server(message),
                }
            }
            end => {
                let document = self.render_now(renderer, sink);
                finalize = self.finalizer.finalize(&document, sink);
                let text = std::mem::take(&mut self.accumulated);
                match end {
                    LoopEnd::Done(usage) => {
                        info!(
                            turn_id = self.turn_id,
                            chars = text.len(),
                            input_tokens = ?usage.input_tokens,
                            output_tokens = ?usage.output_tokens,
                            "turn completed"
                        );
                        TurnOutcome::Completed { text, usage }
                    }
                    LoopEnd::Cancelled => {
                        info!(turn_id = self.turn_id, chars = text.len(), "turn cancelled");
                        TurnOutcome::Cancelled { partial: text }
                    }
                    _ => {
                        warn!(
                            turn_id = self.turn_id,
                            chars = text.len(),
                            "stream ended without done"
                        );
                        TurnOutcome::Truncated { partial: text }
                    }
                }
            }
        };

        let dropped_payloads = self.parser.dropped_payloads() + self.malformed_events;
        if dropped_payloads > 0 {
            debug!(turn_id = self.turn_id, dropped_payloads, "malformed payloads dropped");
        }

        SessionReport {
            turn_id: self.turn_id,
            outcome,
            dropped_payloads,
            renders: self.renders,
            finalize,
        }
    }
}
