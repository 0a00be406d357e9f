use futures::stream::{self, Stream, StreamExt};
use std::collections::VecDeque;
use std::fmt::Display;

use crate::ai_agent::llm::error::LLMError;

struct SseState<S> {
  inner: S,
  buffer: Vec<u8>,
  pending: VecDeque<String>,
  exhausted: bool,
}

impl<S> SseState<S> {
  fn drain_lines(&mut self) {
    while let Some(pos) = self.buffer.iter().position(|b| *b == b'\n') {
      let line: Vec<u8> = self.buffer.drain(..=pos).collect();
      self.push_line(&line);
    }
  }

  fn flush_tail(&mut self) {
    if !self.buffer.is_empty() {
      let line = std::mem::take(&mut self.buffer);
      self.push_line(&line);
    }
  }

  fn push_line(&mut self, raw: &[u8]) {
    let line = String::from_utf8_lossy(raw);
    let line = line.trim_end_matches(|c| c == '\r' || c == '\n');
    if let Some(data) = line.strip_prefix("data:") {
      let data = data.trim_start();
      if !data.is_empty() && data != "[DONE]" {
        self.pending.push_back(data.to_string());
      }
    }
  }
}

/// Splits a server-sent-events byte stream into the payloads of its `data:` lines.
/// Chunk boundaries may fall anywhere, including inside a UTF-8 sequence.
pub fn data_events<S, B, E>(inner: S) -> impl Stream<Item = Result<String, LLMError>>
where
  S: Stream<Item = Result<B, E>> + Unpin,
  B: AsRef<[u8]>,
  E: Display,
{
  let state = SseState { inner, buffer: Vec::new(), pending: VecDeque::new(), exhausted: false };

  stream::unfold(state, |mut state| async move {
    loop {
      if let Some(event) = state.pending.pop_front() {
        return Some((Ok(event), state));
      }
      if state.exhausted {
        return None;
      }
      match state.inner.next().await {
        Some(Ok(chunk)) => {
          state.buffer.extend_from_slice(chunk.as_ref());
          state.drain_lines();
        }
        Some(Err(e)) => {
          state.exhausted = true;
          return Some((Err(LLMError::Transport(e.to_string())), state));
        }
        None => {
          state.exhausted = true;
          state.flush_tail();
        }
      }
    }
  })
}

#[cfg(test)]
mod tests {
  use super::*;

  fn chunks(parts: Vec<&'static str>) -> impl Stream<Item = Result<&'static [u8], String>> + Unpin {
    stream::iter(parts.into_iter().map(|p| Ok(p.as_bytes())))
  }

  #[tokio::test]
  async fn reassembles_events_split_across_chunks() {
    let events: Vec<_> = data_events(chunks(vec!["data: {\"a\":", "1}\n\nda", "ta: {\"b\":2}\r\n\r\n"]))
      .collect().await;
    let events: Vec<String> = events.into_iter().map(|e| e.unwrap()).collect();
    assert_eq!(events, vec!["{\"a\":1}".to_string(), "{\"b\":2}".to_string()]);
  }

  #[tokio::test]
  async fn skips_comments_and_done_marker() {
    let events: Vec<_> = data_events(chunks(vec![": keep-alive\n", "event: message\ndata: x\n\n", "data: [DONE]\n\n"]))
      .collect().await;
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].as_ref().unwrap(), "x");
  }

  #[tokio::test]
  async fn emits_unterminated_last_line() {
    let events: Vec<_> = data_events(chunks(vec!["data: tail"])).collect().await;
    assert_eq!(events[0].as_ref().unwrap(), "tail");
  }

  #[tokio::test]
  async fn transport_error_ends_the_stream() {
    let inner = stream::iter(vec![
      Ok("data: one\n".as_bytes()),
      Err("connection reset".to_string()),
      Ok("data: two\n".as_bytes()),
    ]);
    let events: Vec<_> = data_events(inner).collect().await;
    assert_eq!(events.len(), 2);
    assert_eq!(events[0].as_ref().unwrap(), "one");
    assert!(matches!(events[1], Err(LLMError::Transport(_))));
  }
}
