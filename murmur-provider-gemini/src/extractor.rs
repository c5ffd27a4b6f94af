//! Incremental extraction of top-level JSON objects from a text stream.
//!
//! `streamGenerateContent` answers with one JSON array whose elements arrive
//! over time:
//!
//! ```text
//! [{"candidates":[{"content":{"parts":[{"text":"Hel"}]}}]}
//! ,{"candidates":[{"content":{"parts":[{"text":"lo"}]}}]}
//! ]
//! ```
//!
//! The array itself is never complete until the stream ends, so instead of
//! parsing it, [`ObjectExtractor`] finds each balanced `{ ... }` span as soon
//! as its closing brace arrives. Everything between objects (`[`, `]`, `,`,
//! whitespace) is skipped.

/// Lexical position of the scanner inside the current candidate object.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ScanState {
    /// Outside any string literal.
    Scanning,
    /// Inside a string literal.
    InString,
    /// The previous character was a backslash; the next one is taken literally.
    Escaped {
        /// State to return to after the escaped character.
        in_string: bool,
    },
}

/// Splits a stream of text into complete top-level JSON object spans.
///
/// The buffer is append-only between extractions and the scan state is kept
/// across [`feed`](Self::feed) calls, so every byte is examined once no
/// matter how the input is chunked.
///
/// ```
/// use murmur_provider_gemini::ObjectExtractor;
///
/// let mut extractor = ObjectExtractor::new();
/// assert!(extractor.feed(r#"[{"a":"}"#).is_empty());
/// assert_eq!(extractor.feed(r#"{"}, {"b":2}"#), vec![r#"{"a":"}{"}"#, r#"{"b":2}"#]);
/// ```
#[derive(Debug)]
pub struct ObjectExtractor {
    /// Unconsumed text. Starts at the open brace of the pending object, if any.
    buffer: String,
    /// Byte offset of the next character to examine.
    cursor: usize,
    /// Byte offset of the open brace of the object being scanned.
    start: Option<usize>,
    /// Unquoted brace depth within the current object.
    depth: usize,
    state: ScanState,
}

impl ObjectExtractor {
    /// Create an empty extractor.
    #[must_use]
    pub fn new() -> Self {
        Self {
            buffer: String::new(),
            cursor: 0,
            start: None,
            depth: 0,
            state: ScanState::Scanning,
        }
    }

    /// Append `chunk` and return every object it completes, in order.
    ///
    /// An object whose closing brace has not arrived yet is retained, starting
    /// at its opening brace, for the next call. Text before it is dropped.
    pub fn feed(&mut self, chunk: &str) -> Vec<String> {
        self.buffer.push_str(chunk);

        let mut objects = Vec::new();
        while let Some(object) = self.next_object() {
            objects.push(object);
        }
        self.compact();
        objects
    }

    /// Final pass at end of stream.
    ///
    /// Returns any object completed by text not yet scanned, then drops an
    /// unterminated trailing fragment and resets the extractor.
    pub fn finish(&mut self) -> Vec<String> {
        let objects = self.feed("");
        if !self.buffer.is_empty() {
            tracing::warn!(
                len = self.buffer.len(),
                "dropping unterminated JSON object at end of stream"
            );
        }
        *self = Self::new();
        objects
    }

    /// Text retained for the next call: the incomplete object, if any.
    #[must_use]
    pub fn pending(&self) -> &str {
        &self.buffer
    }

    /// Scan forward from the cursor for the next complete object.
    fn next_object(&mut self) -> Option<String> {
        let bytes = self.buffer.as_bytes();

        if self.start.is_none() {
            match bytes[self.cursor..].iter().position(|&b| b == b'{') {
                Some(offset) => {
                    self.cursor += offset;
                    self.start = Some(self.cursor);
                    self.depth = 0;
                    self.state = ScanState::Scanning;
                }
                None => {
                    self.cursor = bytes.len();
                    return None;
                }
            }
        }

        // Delimiters are ASCII; bytes of multi-byte characters are all >= 0x80
        // and never match, so byte offsets here are always char boundaries.
        while self.cursor < bytes.len() {
            let byte = bytes[self.cursor];
            self.cursor += 1;

            self.state = match (self.state, byte) {
                (ScanState::Escaped { in_string: true }, _) => ScanState::InString,
                (ScanState::Escaped { in_string: false }, _) => ScanState::Scanning,
                (ScanState::InString, b'\\') => ScanState::Escaped { in_string: true },
                (ScanState::InString, b'"') => ScanState::Scanning,
                (ScanState::InString, _) => ScanState::InString,
                (ScanState::Scanning, b'\\') => ScanState::Escaped { in_string: false },
                (ScanState::Scanning, b'"') => ScanState::InString,
                (ScanState::Scanning, b'{') => {
                    self.depth += 1;
                    ScanState::Scanning
                }
                (ScanState::Scanning, b'}') => {
                    self.depth = self.depth.saturating_sub(1);
                    if self.depth == 0 {
                        let start = self.start.take()?;
                        return Some(self.buffer[start..self.cursor].to_owned());
                    }
                    ScanState::Scanning
                }
                (ScanState::Scanning, _) => ScanState::Scanning,
            };
        }

        None
    }

    /// Drop everything before the pending object (or everything, if none).
    fn compact(&mut self) {
        let keep_from = self.start.unwrap_or(self.cursor);
        if keep_from == 0 {
            return;
        }
        self.buffer.drain(..keep_from);
        self.cursor -= keep_from;
        if let Some(start) = self.start.as_mut() {
            *start = 0;
        }
    }
}

impl Default for ObjectExtractor {
    fn default() -> Self {
        Self::new()
    }
}
