//! Terminal client for a running Tomoni chat server
//!
//! Type a message and press enter; the reply is printed as it streams in.
//! `/quit` or end of input leaves.

use std::io::Write;
use std::sync::Mutex;

use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use tomoni_chat::client::{
    ChatSession, ChatView, HttpTransport, SendOutcome, SessionSettings, DEFAULT_CLIENT_MODEL,
    DEFAULT_CLIENT_TEMPERATURE,
};
use tomoni_chat::conversation::{Message, Role};

#[derive(Debug, Parser)]
#[command(name = "tomoni-cli", version, about = "Chat with Tomoni from the terminal")]
struct Cli {
    /// Server root URL
    #[arg(long, env = "TOMONI_SERVER_URL", default_value = "http://127.0.0.1:3000")]
    server: String,

    /// Model requested for each reply
    #[arg(long, default_value = DEFAULT_CLIENT_MODEL)]
    model: String,

    #[arg(long, default_value_t = DEFAULT_CLIENT_TEMPERATURE)]
    temperature: f32,
}

/// Prints only what is new since the previous frame.
#[derive(Default)]
struct TerminalView {
    /// (index of the message being printed, bytes of it already printed)
    cursor: Mutex<Option<(usize, usize)>>,
}

impl ChatView for TerminalView {
    fn render(&self, messages: &[Message]) {
        let Some(last) = messages.last() else {
            return;
        };
        if last.role != Role::Assistant {
            return;
        }

        let index = messages.len() - 1;
        let Ok(mut cursor) = self.cursor.lock() else {
            return;
        };

        let printed = match *cursor {
            Some((i, printed)) if i == index => printed,
            Some(_) => {
                print!("\ntomoni> ");
                0
            }
            None => {
                print!("tomoni> ");
                0
            }
        };

        if let Some(fresh) = last.content.get(printed..) {
            print!("{fresh}");
        }
        let _ = std::io::stdout().flush();
        *cursor = Some((index, last.content.len()));
    }
}

impl ChatView for &TerminalView {
    fn render(&self, messages: &[Message]) {
        (**self).render(messages)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let transport = HttpTransport::new(&cli.server)?;
    let view = TerminalView::default();
    let settings = SessionSettings {
        model: cli.model,
        temperature: cli.temperature,
    };

    let session = ChatSession::new(transport, &view, settings);
    for message in session.messages().await.iter().skip(1) {
        println!("tomoni> {}", message.content);
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("\nyou> ");
        std::io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        if line.trim() == "/quit" {
            break;
        }

        // Each reply starts on a fresh line.
        if let Ok(mut cursor) = view.cursor.lock() {
            *cursor = None;
        }

        match session.submit(&line).await {
            SendOutcome::Completed | SendOutcome::Failed => println!(),
            SendOutcome::Ignored | SendOutcome::Busy => {}
        }
    }

    Ok(())
}
