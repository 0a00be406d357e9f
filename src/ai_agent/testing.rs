//! In-process stand-ins used by tests: a scripted model, a one-shot HTTP server
//! and an in-memory workbook builder.

use async_trait::async_trait;
use futures::stream;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use rust_xlsxwriter::Workbook;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

use crate::ai_agent::llm::error::LLMError;
use crate::ai_agent::llm::model_provider::{ChatMessage, FragmentStream, LLMChatter, LLMModelConfig, LLMResponse};

pub struct ScriptedChatter {
  reply: Result<String, LLMError>,
  fragments: Vec<Result<String, LLMError>>,
  calls: AtomicUsize,
  prompts: Mutex<Vec<Vec<ChatMessage>>>,
}

impl ScriptedChatter {
  pub fn replying(text: &str) -> Self {
    ScriptedChatter::new(Ok(text.to_string()), vec![Ok(text.to_string())])
  }

  pub fn streaming(fragments: Vec<Result<String, LLMError>>) -> Self {
    let joined: String = fragments.iter().filter_map(|f| f.as_ref().ok().cloned()).collect();
    ScriptedChatter::new(Ok(joined), fragments)
  }

  /// Fails both calls before any text is produced.
  pub fn failing(error: LLMError) -> Self {
    ScriptedChatter::new(Err(error), Vec::new())
  }

  fn new(reply: Result<String, LLMError>, fragments: Vec<Result<String, LLMError>>) -> Self {
    ScriptedChatter { reply, fragments, calls: AtomicUsize::new(0), prompts: Mutex::new(Vec::new()) }
  }

  pub fn calls(&self) -> usize {
    self.calls.load(Ordering::SeqCst)
  }

  pub fn prompts(&self) -> Vec<Vec<ChatMessage>> {
    self.prompts.lock().unwrap().clone()
  }

  fn record(&self, messages: Vec<ChatMessage>) {
    self.calls.fetch_add(1, Ordering::SeqCst);
    self.prompts.lock().unwrap().push(messages);
  }
}

#[async_trait]
impl LLMChatter for ScriptedChatter {
  async fn chat(&self, messages: Vec<ChatMessage>, _config: &LLMModelConfig) -> Result<LLMResponse, LLMError> {
    self.record(messages);
    self.reply.clone().map(|content| LLMResponse { content })
  }

  async fn chat_stream(&self, messages: Vec<ChatMessage>, _config: &LLMModelConfig) -> Result<FragmentStream, LLMError> {
    self.record(messages);
    if let Err(e) = &self.reply {
      return Err(e.clone());
    }
    Ok(Box::pin(stream::iter(self.fragments.clone())))
  }
}

/// One spreadsheet cell for [`workbook`].
pub enum Cell {
  Text(&'static str),
  Number(f64),
  Blank,
}

/// An `.xlsx` file whose first worksheet holds `rows`, starting at A1.
pub fn workbook(rows: &[[Cell; 3]]) -> Vec<u8> {
  let mut workbook = Workbook::new();
  let sheet = workbook.add_worksheet();
  for (r, row) in rows.iter().enumerate() {
    for (c, cell) in row.iter().enumerate() {
      match cell {
        Cell::Text(text) => { sheet.write_string(r as u32, c as u16, *text).unwrap(); }
        Cell::Number(value) => { sheet.write_number(r as u32, c as u16, *value).unwrap(); }
        Cell::Blank => {}
      }
    }
  }
  workbook.save_to_buffer().unwrap()
}

/// A raw HTTP/1.1 response. `body_length` overrides the advertised length to simulate a cut-off body;
/// without it the body is delimited by closing the connection.
pub fn http_response(status: &str, content_type: &str, body: &str, body_length: Option<usize>) -> String {
  let length = match body_length {
    Some(length) => format!("content-length: {}\r\n", length),
    None => String::new(),
  };
  format!("HTTP/1.1 {}\r\ncontent-type: {}\r\n{}connection: close\r\n\r\n{}", status, content_type, length, body)
}

async fn read_request(socket: &mut TcpStream) {
  let mut request: Vec<u8> = Vec::new();
  let mut chunk = [0u8; 4096];
  loop {
    let read = socket.read(&mut chunk).await.unwrap_or(0);
    if read == 0 {
      return;
    }
    request.extend_from_slice(&chunk[..read]);
    if let Some(end) = request.windows(4).position(|w| w == b"\r\n\r\n") {
      let head = String::from_utf8_lossy(&request[..end]).to_lowercase();
      let body_length = head.lines()
        .find_map(|line| line.strip_prefix("content-length:"))
        .and_then(|value| value.trim().parse::<usize>().ok())
        .unwrap_or(0);
      if request.len() >= end + 4 + body_length {
        return;
      }
    }
  }
}

/// Accepts a single connection on a local port, reads the request and answers with `response`.
/// Returns the base URL to point a provider at.
pub async fn serve_once(response: String) -> String {
  let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
  let address = listener.local_addr().unwrap();
  tokio::spawn(async move {
    let (mut socket, _) = listener.accept().await.unwrap();
    read_request(&mut socket).await;
    socket.write_all(response.as_bytes()).await.unwrap();
    let _ = socket.shutdown().await;
  });
  format!("http://{}", address)
}
