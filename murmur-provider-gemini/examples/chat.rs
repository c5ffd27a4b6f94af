//! Interactive streaming chat against Gemini.
//!
//! Set `GOOGLE_API_KEY` and run:
//!   cargo run --example chat -- "Explain ownership in one paragraph."
//!
//! Without an argument, reads one message per line from stdin and keeps the
//! conversation history between turns. `RUST_LOG=debug` shows request logs.

use std::io::{BufRead, Write};

use murmur_provider_gemini::Gemini;
use murmur_types::{ChatRequest, ChatSink, Content, SessionId, send_message_stream};
use tracing_subscriber::EnvFilter;

/// Prints deltas as they arrive.
struct StdoutSink;

impl ChatSink for StdoutSink {
    fn on_chunk(&mut self, delta: &str) {
        print!("{delta}");
        let _ = std::io::stdout().flush();
    }

    fn on_complete(&mut self, _text: &str) {
        println!();
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let client = Gemini::from_env();
    let session_id = SessionId::with_prefix("gemini");

    if let Some(message) = std::env::args().nth(1) {
        let request = ChatRequest::new(message).with_session_id(session_id);
        send_message_stream(&client, request, Some(&mut StdoutSink)).await?;
        return Ok(());
    }

    let mut history: Vec<Content> = Vec::new();
    for line in std::io::stdin().lock().lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let request = ChatRequest::new(line)
            .with_history(history.clone())
            .with_session_id(session_id.clone());
        match send_message_stream(&client, request, Some(&mut StdoutSink)).await {
            Ok(reply) => history = reply.history,
            Err(err) => eprintln!("error: {err}"),
        }
    }

    Ok(())
}
