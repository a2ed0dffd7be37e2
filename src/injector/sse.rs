//! Server-sent event decoding
//!
//! Only `data:` lines are surfaced. Comments, `event:`/`id:` fields and the
//! blank lines separating events are dropped.

use futures::{Stream, StreamExt, stream};
use std::collections::VecDeque;
use std::fmt::Display;
use std::pin::Pin;

use crate::{Error, Result};

/// Stream of text chunks yielded to the host
pub type TextStream = Pin<Box<dyn Stream<Item = Result<String>> + Send>>;

/// Incremental decoder turning raw bytes into `data:` payloads
///
/// Lines may be split across network chunks; partial lines are buffered
/// until their terminator arrives.
#[derive(Debug, Default)]
pub struct SseDecoder {
    buffer: Vec<u8>,
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one network chunk and collect the payloads it completes
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<String> {
        self.buffer.extend_from_slice(chunk);

        let mut payloads = Vec::new();
        while let Some(pos) = self.buffer.iter().position(|&b| b == b'\n') {
            let line: Vec<u8> = self.buffer.drain(..=pos).collect();
            if let Some(data) = data_of(&line) {
                payloads.push(data);
            }
        }
        payloads
    }

    /// Flush a trailing line that was never terminated
    pub fn finish(&mut self) -> Option<String> {
        let line = std::mem::take(&mut self.buffer);
        data_of(&line)
    }
}

fn data_of(line: &[u8]) -> Option<String> {
    let line = String::from_utf8_lossy(line);
    let line = line.trim_end_matches(['\n', '\r']);
    let data = line.strip_prefix("data:")?;
    Some(data.strip_prefix(' ').unwrap_or(data).to_string())
}

struct DecodeState<S> {
    inner: Pin<Box<S>>,
    decoder: SseDecoder,
    pending: VecDeque<String>,
    done: bool,
}

/// Decode a byte stream into its `data:` payloads
pub fn data_stream<S, B, E>(bytes: S) -> TextStream
where
    S: Stream<Item = std::result::Result<B, E>> + Send + 'static,
    B: AsRef<[u8]> + Send,
    E: Display + Send,
{
    let state = DecodeState {
        inner: Box::pin(bytes),
        decoder: SseDecoder::new(),
        pending: VecDeque::new(),
        done: false,
    };

    Box::pin(stream::unfold(state, |mut state| async move {
        loop {
            if let Some(payload) = state.pending.pop_front() {
                return Some((Ok(payload), state));
            }
            if state.done {
                return None;
            }

            match state.inner.next().await {
                Some(Ok(chunk)) => {
                    let payloads = state.decoder.feed(chunk.as_ref());
                    state.pending.extend(payloads);
                }
                Some(Err(e)) => {
                    state.done = true;
                    let err = Error::stream(format!("SSE body failed: {}", e));
                    return Some((Err(err), state));
                }
                None => {
                    state.done = true;
                    if let Some(last) = state.decoder.finish() {
                        state.pending.push_back(last);
                    }
                }
            }
        }
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strips_data_prefix() {
        let mut decoder = SseDecoder::new();
        let payloads = decoder.feed(b"data: Hello\n\ndata:world\n\n");
        assert_eq!(payloads, vec!["Hello", "world"]);
    }

    #[test]
    fn test_only_one_space_is_stripped() {
        let mut decoder = SseDecoder::new();
        assert_eq!(decoder.feed(b"data:  indented\n"), vec![" indented"]);
    }

    #[test]
    fn test_lines_split_across_chunks() {
        let mut decoder = SseDecoder::new();
        assert!(decoder.feed(b"data: par").is_empty());
        assert_eq!(decoder.feed(b"tial\r\n"), vec!["partial"]);
    }

    #[test]
    fn test_non_data_lines_ignored() {
        let mut decoder = SseDecoder::new();
        let payloads = decoder.feed(b": keepalive\nevent: chunk\nid: 7\ndata: text\n\n");
        assert_eq!(payloads, vec!["text"]);
    }

    #[test]
    fn test_finish_flushes_unterminated_line() {
        let mut decoder = SseDecoder::new();
        assert!(decoder.feed(b"data: tail").is_empty());
        assert_eq!(decoder.finish().as_deref(), Some("tail"));
        assert_eq!(decoder.finish(), None);
    }

    #[tokio::test]
    async fn test_data_stream() {
        let chunks: Vec<std::result::Result<Vec<u8>, String>> = vec![
            Ok(b"data: Try ".to_vec()),
            Ok(b"\n\ndata: our new blend\n\n".to_vec()),
            Ok(b"data: today".to_vec()),
        ];
        let collected: Vec<String> = data_stream(stream::iter(chunks))
            .map(|item| item.unwrap())
            .collect()
            .await;
        assert_eq!(collected, vec!["Try ", "our new blend", "today"]);
    }

    #[tokio::test]
    async fn test_data_stream_surfaces_body_error() {
        let chunks: Vec<std::result::Result<Vec<u8>, String>> =
            vec![Ok(b"data: first\n".to_vec()), Err("connection reset".to_string())];
        let items: Vec<Result<String>> = data_stream(stream::iter(chunks)).collect().await;

        assert_eq!(items.len(), 2);
        assert_eq!(items[0].as_ref().unwrap(), "first");
        let err = items[1].as_ref().unwrap_err();
        assert!(err.to_string().contains("connection reset"));
    }
}
