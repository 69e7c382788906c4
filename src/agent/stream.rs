//! Typewriter-style progressive reveal of agent answers.
//!
//! Text is split into chunks up front and a background task emits one chunk
//! per tick over a channel. Chunks always concatenate back to the source
//! text, so a consumer can append them verbatim.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::debug;

/// How text is split before it is revealed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum StreamMode {
    /// Greedy word packing up to the chunk size.
    #[default]
    Words,
    /// One sentence per chunk.
    Sentences,
}

#[derive(Debug, Clone)]
pub struct StreamOptions {
    /// Minimum characters per word chunk.
    pub chunk_size: usize,
    /// Delay before each chunk.
    pub delay: Duration,
    pub mode: StreamMode,
}

impl Default for StreamOptions {
    fn default() -> Self {
        Self {
            chunk_size: 80,
            delay: Duration::from_millis(40),
            mode: StreamMode::Words,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamEvent {
    Chunk(String),
    Done,
}

/// Split text into chunks of whole words.
///
/// Words are appended to a chunk until it reaches `chunk_size` characters.
/// Every chunk after the first starts with the space that separated it from
/// the previous one.
pub fn chunk_words(text: &str, chunk_size: usize) -> Vec<String> {
    if text.is_empty() {
        return Vec::new();
    }

    let mut groups: Vec<Vec<&str>> = Vec::new();
    let mut current: Vec<&str> = Vec::new();
    let mut len = 0;

    for word in text.split(' ') {
        if !current.is_empty() && len >= chunk_size {
            groups.push(std::mem::take(&mut current));
            len = 0;
        }
        if !current.is_empty() {
            len += 1;
        }
        len += word.chars().count();
        current.push(word);
    }
    if !current.is_empty() {
        groups.push(current);
    }

    groups
        .into_iter()
        .enumerate()
        .map(|(i, words)| {
            if i == 0 {
                words.join(" ")
            } else {
                format!(" {}", words.join(" "))
            }
        })
        .collect()
}

/// Split text after each run of `.`, `!` or `?`.
///
/// Trailing text without terminal punctuation becomes the last chunk.
pub fn chunk_sentences(text: &str) -> Vec<String> {
    let is_terminator = |c: char| matches!(c, '.' | '!' | '?');

    let mut chunks = Vec::new();
    let mut start = 0;
    let mut chars = text.char_indices().peekable();

    while let Some((i, c)) = chars.next() {
        if !is_terminator(c) {
            continue;
        }
        let mut end = i + c.len_utf8();
        while let Some(&(j, next)) = chars.peek() {
            if !is_terminator(next) {
                break;
            }
            end = j + next.len_utf8();
            chars.next();
        }
        chunks.push(text[start..end].to_string());
        start = end;
    }

    let rest = &text[start..];
    if !rest.is_empty() {
        match chunks.last_mut() {
            Some(last) if rest.trim().is_empty() => last.push_str(rest),
            _ => chunks.push(rest.to_string()),
        }
    }

    chunks
}

/// Split `text` according to `options.mode`.
pub fn chunk_text(text: &str, options: &StreamOptions) -> Vec<String> {
    match options.mode {
        StreamMode::Words => chunk_words(text, options.chunk_size),
        StreamMode::Sentences => chunk_sentences(text),
    }
}

/// Handle to a running reveal. Dropping it stops the stream.
#[derive(Debug)]
pub struct StreamHandle {
    task: JoinHandle<()>,
}

impl StreamHandle {
    /// Stop emitting chunks. The receiver then yields `None`.
    pub fn cancel(&self) {
        self.task.abort();
    }
}

impl Drop for StreamHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Start revealing `text`, one chunk per `options.delay`.
///
/// The receiver yields every chunk followed by [`StreamEvent::Done`]. Must be
/// called from within a tokio runtime.
pub fn spawn_stream(
    text: &str,
    options: &StreamOptions,
) -> (StreamHandle, mpsc::UnboundedReceiver<StreamEvent>) {
    let chunks = chunk_text(text, options);
    let delay = options.delay;
    let (tx, rx) = mpsc::unbounded_channel();

    debug!("Streaming {} chunks every {:?}", chunks.len(), delay);

    let task = tokio::spawn(async move {
        for chunk in chunks {
            tokio::time::sleep(delay).await;
            if tx.send(StreamEvent::Chunk(chunk)).is_err() {
                return;
            }
        }
        let _ = tx.send(StreamEvent::Done);
    });

    (StreamHandle { task }, rx)
}

#[cfg(test)]
mod tests {
    use super::*;

    const ANSWER: &str = "Rice exports rose sharply in the first quarter while palm oil imports stayed flat across every month.";

    fn fast_options(mode: StreamMode) -> StreamOptions {
        StreamOptions {
            chunk_size: 20,
            delay: Duration::from_millis(1),
            mode,
        }
    }

    #[test]
    fn test_chunk_words_concatenates_to_source() {
        let chunks = chunk_words(ANSWER, 20);

        assert!(chunks.len() > 1);
        assert_eq!(chunks.concat(), ANSWER);
        assert!(chunks[1].starts_with(' '));
        for chunk in &chunks[..chunks.len() - 1] {
            assert!(chunk.trim_start().chars().count() >= 20);
        }
    }

    #[test]
    fn test_chunk_words_short_text_is_one_chunk() {
        assert_eq!(chunk_words("Hello there", 80), vec!["Hello there"]);
        assert!(chunk_words("", 80).is_empty());
    }

    #[test]
    fn test_chunk_words_keeps_repeated_spaces() {
        let text = "alpha  beta   gamma";
        assert_eq!(chunk_words(text, 1).concat(), text);
    }

    #[test]
    fn test_chunk_sentences() {
        let chunks = chunk_sentences("Imports fell. Why?! Exports grew and");
        assert_eq!(chunks, vec!["Imports fell.", " Why?!", " Exports grew and"]);

        let chunks = chunk_sentences("Done.  ");
        assert_eq!(chunks, vec!["Done.  "]);

        assert!(chunk_sentences("").is_empty());
    }

    #[test]
    fn test_stream_emits_chunks_then_done() {
        tokio_test::block_on(async {
            let options = fast_options(StreamMode::Words);
            let (_handle, mut rx) = spawn_stream(ANSWER, &options);

            let mut revealed = String::new();
            loop {
                match rx.recv().await {
                    Some(StreamEvent::Chunk(c)) => revealed.push_str(&c),
                    Some(StreamEvent::Done) => break,
                    None => panic!("stream ended without Done"),
                }
            }
            assert_eq!(revealed, ANSWER);
        });
    }

    #[tokio::test]
    async fn test_sentence_stream() {
        let options = fast_options(StreamMode::Sentences);
        let (_handle, mut rx) = spawn_stream("One. Two.", &options);

        assert_eq!(rx.recv().await, Some(StreamEvent::Chunk("One.".to_string())));
        assert_eq!(rx.recv().await, Some(StreamEvent::Chunk(" Two.".to_string())));
        assert_eq!(rx.recv().await, Some(StreamEvent::Done));
    }

    #[tokio::test]
    async fn test_cancel_closes_channel() {
        let options = StreamOptions {
            delay: Duration::from_secs(60),
            ..StreamOptions::default()
        };
        let (handle, mut rx) = spawn_stream(ANSWER, &options);

        handle.cancel();
        assert_eq!(rx.recv().await, None);
    }

    #[tokio::test]
    async fn test_drop_stops_stream() {
        let options = StreamOptions {
            delay: Duration::from_secs(60),
            ..StreamOptions::default()
        };
        let (handle, mut rx) = spawn_stream(ANSWER, &options);

        drop(handle);
        assert_eq!(rx.recv().await, None);
    }
}
