#![deny(missing_docs)]
//! Gemini provider for murmur.
//!
//! Implements [`murmur_types::ChatProvider`] for the Gemini
//! `streamGenerateContent` endpoint. The endpoint answers with a JSON array
//! whose elements arrive one by one; [`ObjectExtractor`] pulls each complete
//! element out of the byte stream as soon as its closing brace arrives, and
//! the text delta it carries is emitted immediately.
//!
//! ```no_run
//! use futures::StreamExt;
//! use murmur_provider_gemini::Gemini;
//! use murmur_types::{ChatProvider, ChatRequest, StreamEvent};
//!
//! # async fn run() -> Result<(), murmur_types::ChatError> {
//! let client = Gemini::from_env();
//! let mut handle = client.stream_chat(ChatRequest::new("Hello")).await?;
//! while let Some(event) = handle.receiver.next().await {
//!     match event {
//!         StreamEvent::TextDelta(text) => print!("{text}"),
//!         StreamEvent::Error(err) => return Err(err.into()),
//!         _ => {}
//!     }
//! }
//! # Ok(())
//! # }
//! ```

mod client;
pub mod decode;
mod error;
pub mod extractor;
pub mod mapping;
mod streaming;
pub mod types;

pub use client::Gemini;
pub use decode::Utf8Decoder;
pub use extractor::ObjectExtractor;
