//! Line-oriented chat loop state: one input line in, one answer (or command) out.

use std::io::{self, Write};

use chat_api::ChatTransport;
use doc_chat::{Chat, ChatError, SessionReport, TurnOutcome};
use tracing::{debug, info};

use crate::commands::{parse_slash_command, SlashCommand, HELP_TEXT};
use crate::interrupt::Interrupt;
use crate::terminal::{RedrawMode, TerminalSink};

pub const TRANSPORT_HINT: &str = "Could not reach the chat service. Check DOC_CHAT_ENDPOINT.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

pub struct App<T> {
    chat: Chat,
    transport: T,
    interrupt: Interrupt,
    mode: RedrawMode,
    columns: u16,
}

impl<T: ChatTransport> App<T> {
    pub fn new(chat: Chat, transport: T, interrupt: Interrupt) -> Self {
        Self {
            chat,
            transport,
            interrupt,
            mode: RedrawMode::FinalOnly,
            columns: 80,
        }
    }

    pub fn with_redraw(mut self, mode: RedrawMode, columns: u16) -> Self {
        self.mode = mode;
        self.columns = columns;
        self
    }

    pub fn chat(&self) -> &Chat {
        &self.chat
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub async fn handle_line<W: Write>(&mut self, line: &str, out: &mut W) -> io::Result<Flow> {
        if let Some(command) = parse_slash_command(line) {
            return self.handle_command(command, out);
        }
        if line.trim().is_empty() {
            return Ok(Flow::Continue);
        }

        self.interrupt.reset();
        let mut sink = TerminalSink::new(&mut *out, self.mode, self.columns);
        let result = self
            .chat
            .send_with_cancel(line, self.interrupt.signal(), &self.transport, &mut sink)
            .await;
        self.interrupt.reset();

        match result {
            Ok(report) => {
                log_report(&report);
                match &report.outcome {
                    TurnOutcome::Cancelled { .. } => writeln!(out, "[stopped]")?,
                    TurnOutcome::Failed { error } if error.is_transport() => {
                        writeln!(out, "{TRANSPORT_HINT}")?
                    }
                    _ => {}
                }
            }
            Err(error @ ChatError::EmptyPrompt) => debug!(%error, "ignoring input"),
            Err(error) => writeln!(out, "Error: {error}")?,
        }
        writeln!(out)?;
        Ok(Flow::Continue)
    }

    fn handle_command<W: Write>(&mut self, command: SlashCommand, out: &mut W) -> io::Result<Flow> {
        match command {
            SlashCommand::Help => writeln!(out, "{HELP_TEXT}")?,
            SlashCommand::Clear => {
                self.chat.clear();
                writeln!(out, "Started a new conversation.")?;
            }
            SlashCommand::Quit => return Ok(Flow::Quit),
            SlashCommand::Unknown(name) => {
                writeln!(out, "Unknown command {name}. Type /help for commands.")?
            }
        }
        Ok(Flow::Continue)
    }
}

fn log_report(report: &SessionReport) {
    info!(
        turn_id = report.turn_id,
        renders = report.renders,
        dropped_payloads = report.dropped_payloads,
        failed = report.outcome.is_failed(),
        transport_failure = matches!(
            &report.outcome,
            TurnOutcome::Failed { error } if error.is_transport()
        ),
        "turn finished"
    );
}
