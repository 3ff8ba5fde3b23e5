//! Chat aggregate: conversation history plus the in-flight turn marker.

use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::time::Duration;

use chat_api::{CancellationSignal, ChatMessage, ChatTransport};
use tracing::{debug, warn};

use crate::config::EnvConfig;
use crate::conversation::Conversation;
use crate::error::ChatError;
use crate::render::coalescer::DEFAULT_FRAME_INTERVAL;
use crate::render::markdown::MarkdownRenderer;
use crate::render::sink::RenderSink;
use crate::session::{SessionReport, StreamSession};

pub type TurnId = u64;

pub struct Chat {
    conversation: Conversation,
    renderer: MarkdownRenderer,
    frame_interval: Duration,
    in_flight: Option<TurnId>,
    next_turn_id: TurnId,
}

impl Default for Chat {
    fn default() -> Self {
        Self::new(MarkdownRenderer::default())
    }
}

impl Chat {
    pub fn new(renderer: MarkdownRenderer) -> Self {
        Self {
            conversation: Conversation::new(),
            renderer,
            frame_interval: DEFAULT_FRAME_INTERVAL,
            in_flight: None,
            next_turn_id: 0,
        }
    }

    pub fn from_config(config: &EnvConfig) -> Self {
        Self::new(config.renderer()).with_frame_interval(config.frame_interval)
    }

    pub fn with_frame_interval(mut self, frame_interval: Duration) -> Self {
        self.frame_interval = frame_interval;
        self
    }

    pub fn messages(&self) -> &[ChatMessage] {
        self.conversation.messages()
    }

    pub fn conversation(&self) -> &Conversation {
        &self.conversation
    }

    pub fn renderer(&self) -> &MarkdownRenderer {
        &self.renderer
    }

    pub fn in_flight(&self) -> Option<TurnId> {
        self.in_flight
    }

    pub fn is_busy(&self) -> bool {
        self.in_flight.is_some()
    }

    pub fn begin_turn(&mut self, prompt: &str) -> Result<StreamSession, ChatError> {
        self.begin_turn_with_cancel(prompt, Arc::new(AtomicBool::new(false)))
    }

    /// Starts a turn whose cancellation is driven by a caller-owned signal.
    pub fn begin_turn_with_cancel(
        &mut self,
        prompt: &str,
        cancel: CancellationSignal,
    ) -> Result<StreamSession, ChatError> {
        let prompt = prompt.trim();
        if prompt.is_empty() {
            return Err(ChatError::EmptyPrompt);
        }
        if let Some(turn_id) = self.in_flight {
            return Err(ChatError::TurnInFlight(turn_id));
        }

        self.conversation.push_user(prompt)?;
        self.next_turn_id += 1;
        let turn_id = self.next_turn_id;
        self.in_flight = Some(turn_id);
        debug!(turn_id, "turn started");

        Ok(StreamSession::new(
            turn_id,
            self.conversation.to_request(),
            cancel,
            self.frame_interval,
        ))
    }

    /// Records a finished turn. Returns whether an assistant message was appended.
    pub fn finish_turn(&mut self, report: &SessionReport) -> Result<bool, ChatError> {
        if self.in_flight != Some(report.turn_id) {
            warn!(
                expected = ?self.in_flight,
                actual = report.turn_id,
                "rejecting stale turn report"
            );
            return Err(ChatError::StaleTurn {
                expected: self.in_flight,
                actual: report.turn_id,
            });
        }
        self.in_flight = None;

        match report.outcome.answer_text() {
            Some(text) => {
                self.conversation.push_assistant(text)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    pub async fn send<T, S>(
        &mut self,
        prompt: &str,
        transport: &T,
        sink: &mut S,
    ) -> Result<SessionReport, ChatError>
    where
        T: ChatTransport + ?Sized,
        S: RenderSink + ?Sized,
    {
        self.send_with_cancel(prompt, Arc::new(AtomicBool::new(false)), transport, sink)
            .await
    }

    pub async fn send_with_cancel<T, S>(
        &mut self,
        prompt: &str,
        cancel: CancellationSignal,
        transport: &T,
        sink: &mut S,
    ) -> Result<SessionReport, ChatError>
    where
        T: ChatTransport + ?Sized,
        S: RenderSink + ?Sized,
    {
        let session = self.begin_turn_with_cancel(prompt, cancel)?;
        let report = session.run(transport, &self.renderer, sink).await;
        self.finish_turn(&report)?;
        Ok(report)
    }

    /// Starts a new chat. A report from a turn begun before the clear is stale.
    pub fn clear(&mut self) {
        self.conversation.clear();
        self.in_flight = None;
    }
}

#[cfg(test)]
mod tests {
    use super::Chat;
    use crate::error::ChatError;
    use crate::render::markdown::MarkdownRenderer;
    use crate::session::{SessionReport, TurnOutcome};
    use chat_api::{ChatMessage, Usage};

    fn completed(turn_id: u64, text: &str) -> SessionReport {
        SessionReport {
            turn_id,
            outcome: TurnOutcome::Completed {
                text: text.to_string(),
                usage: Usage::default(),
            },
            dropped_payloads: 0,
            renders: 1,
            finalize: None,
        }
    }

    #[test]
    fn begin_turn_snapshots_history_with_prompt() {
        let mut chat = Chat::new(MarkdownRenderer::plain());
        let session = chat.begin_turn("  What is DWC?  ").expect("turn");
        assert_eq!(
            session.request().messages,
            vec![ChatMessage::user("What is DWC?")]
        );
        assert_eq!(chat.in_flight(), Some(session.turn_id()));
    }

    #[test]
    fn empty_prompt_is_rejected() {
        let mut chat = Chat::new(MarkdownRenderer::plain());
        assert!(matches!(chat.begin_turn("   "), Err(ChatError::EmptyPrompt)));
        assert!(chat.messages().is_empty());
    }

    #[test]
    fn second_turn_while_in_flight_is_rejected() {
        let mut chat = Chat::new(MarkdownRenderer::plain());
        let first = chat.begin_turn("one").expect("turn");
        assert!(matches!(
            chat.begin_turn("two"),
            Err(ChatError::TurnInFlight(id)) if id == first.turn_id()
        ));
        assert_eq!(chat.messages().len(), 1);
    }

    #[test]
    fn stale_report_is_rejected() {
        let mut chat = Chat::new(MarkdownRenderer::plain());
        let first = chat.begin_turn("one").expect("turn");
        chat.clear();
        let second = chat.begin_turn("two").expect("turn");

        let stale = completed(first.turn_id(), "late");
        assert_eq!(
            chat.finish_turn(&stale),
            Err(ChatError::StaleTurn {
                expected: Some(second.turn_id()),
                actual: first.turn_id(),
            })
        );
        assert_eq!(chat.finish_turn(&completed(second.turn_id(), "ok")), Ok(true));
        assert_eq!(
            chat.messages(),
            &[ChatMessage::user("two"), ChatMessage::assistant("ok")]
        );
    }

    #[test]
    fn empty_answers_are_not_recorded() {
        let mut chat = Chat::new(MarkdownRenderer::plain());
        let session = chat.begin_turn("one").expect("turn");
        let report = SessionReport {
            turn_id: session.turn_id(),
            outcome: TurnOutcome::Cancelled {
                partial: String::new(),
            },
            dropped_payloads: 0,
            renders: 1,
            finalize: None,
        };
        assert_eq!(chat.finish_turn(&report), Ok(false));
        assert!(!chat.is_busy());
        assert_eq!(chat.messages().len(), 1);
    }
}
