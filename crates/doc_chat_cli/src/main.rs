use std::io::{self, Write};
use std::process::ExitCode;

use chat_api::client::CANCEL_POLL_INTERVAL;
use chat_api::ChatApiClient;
use doc_chat::logging::{init_logging, log_output};
use doc_chat::{prewarm_highlighting, Chat, EnvConfig};
use doc_chat_cli::interrupt::Interrupt;
use doc_chat_cli::terminal::{redraw_mode, stderr_is_terminal, terminal_columns, RedrawMode};
use doc_chat_cli::{App, Flow};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::error;

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let config = EnvConfig::from_env();
    let mode = redraw_mode();
    let output = log_output(&config, mode == RedrawMode::Live && stderr_is_terminal());
    if let Err(error) = init_logging(&config, &output) {
        eprintln!("logging disabled: {error}");
    }

    if config.highlighting_enabled() {
        let _ = std::thread::Builder::new()
            .name("highlight-prewarm".to_string())
            .spawn(prewarm_highlighting);
    }

    match run(config, mode).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            error!(%error, "doc-chat exited with an error");
            eprintln!("doc-chat: {error}");
            ExitCode::FAILURE
        }
    }
}

async fn run(config: EnvConfig, mode: RedrawMode) -> io::Result<()> {
    let client = ChatApiClient::new(config.api_config()).map_err(io::Error::other)?;
    let interrupt = Interrupt::install()?;
    let mut app = App::new(Chat::from_config(&config), client, interrupt.clone())
        .with_redraw(mode, terminal_columns());

    let mut stdin = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = io::stdout();
    writeln!(stdout, "Ask about the docs. /help for commands.")?;

    loop {
        write!(stdout, "> ")?;
        stdout.flush()?;

        let line = tokio::select! {
            line = stdin.next_line() => line?,
            _ = wait_for_interrupt(&interrupt) => None,
        };
        let Some(line) = line else {
            writeln!(stdout)?;
            return Ok(());
        };

        if app.handle_line(&line, &mut stdout).await? == Flow::Quit {
            return Ok(());
        }
    }
}

/// Resolves when Ctrl-C is pressed at the prompt.
async fn wait_for_interrupt(interrupt: &Interrupt) {
    while !interrupt.is_set() {
        tokio::time::sleep(CANCEL_POLL_INTERVAL).await;
    }
}
