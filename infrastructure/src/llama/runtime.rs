//! [`ModelRuntime`] implementation backed by `llama-server`.

use super::protocol::{ChatRequest, ChunkEvent, parse_chunk};
use super::server::{LlamaServer, ServerLaunch};
use super::sse::{LineBuffer, SseLine, parse_sse_line};
use crate::config::FileRuntimeConfig;
use async_trait::async_trait;
use futures::StreamExt;
use pocketllm_application::ports::model_runtime::{
    ModelHandle, ModelRuntime, RuntimeError, StreamHandle,
};
use pocketllm_application::RuntimeOptions;
use pocketllm_domain::{CompletionRequest, ModelId, StreamEvent};
use std::path::Path;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

const STREAM_BUFFER: usize = 64;

/// Settings for launching `llama-server`
pub type LlamaServerConfig = ServerLaunch;

impl From<&FileRuntimeConfig> for LlamaServerConfig {
    fn from(config: &FileRuntimeConfig) -> Self {
        Self {
            binary: config.server_binary.clone(),
            host: config.host.clone(),
            port: config.port,
            load_timeout: config.load_timeout(),
        }
    }
}

/// Loads models by starting a dedicated `llama-server` process.
pub struct LlamaServerRuntime {
    launch: LlamaServerConfig,
}

impl LlamaServerRuntime {
    pub fn new(launch: LlamaServerConfig) -> Self {
        Self { launch }
    }
}

#[async_trait]
impl ModelRuntime for LlamaServerRuntime {
    async fn load(
        &self,
        model_id: &ModelId,
        path: &Path,
        options: &RuntimeOptions,
    ) -> Result<Box<dyn ModelHandle>, RuntimeError> {
        info!(model = %model_id, binary = %self.launch.binary, "Starting llama-server");
        let server = LlamaServer::start(&self.launch, path, options)
            .await
            .map_err(|e| RuntimeError::LoadFailed(e.to_string()))?;
        Ok(Box::new(LlamaModelHandle {
            model_id: model_id.clone(),
            server,
        }))
    }
}

struct LlamaModelHandle {
    model_id: ModelId,
    server: LlamaServer,
}

#[async_trait]
impl ModelHandle for LlamaModelHandle {
    fn model_id(&self) -> &ModelId {
        &self.model_id
    }

    async fn complete(
        &self,
        request: CompletionRequest,
        cancel: CancellationToken,
    ) -> Result<StreamHandle, RuntimeError> {
        if cancel.is_cancelled() {
            return Err(RuntimeError::Cancelled);
        }
        debug!(
            model = %self.model_id,
            messages = request.messages.len(),
            "Starting completion"
        );
        let response = self
            .server
            .chat_stream(&ChatRequest::streaming(&request))
            .await
            .map_err(|e| RuntimeError::GenerationFailed(e.to_string()))?;

        let (tx, rx) = mpsc::channel(STREAM_BUFFER);
        tokio::spawn(forward_stream(response, tx, cancel));
        Ok(StreamHandle::new(rx))
    }

    async fn release(&self) -> Result<(), RuntimeError> {
        self.server
            .stop()
            .await
            .map_err(|e| RuntimeError::ReleaseFailed(e.to_string()))
    }
}

/// Relay the SSE body as [`StreamEvent`]s until it ends or `cancel` fires.
///
/// Dropping the response on cancellation closes the connection, which makes
/// the server stop generating.
async fn forward_stream(
    response: reqwest::Response,
    tx: mpsc::Sender<StreamEvent>,
    cancel: CancellationToken,
) {
    let mut body = response.bytes_stream();
    let mut decoder = StreamDecoder::default();

    loop {
        let chunk = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                debug!("Completion cancelled, closing stream");
                return;
            }
            chunk = body.next() => chunk,
        };

        let events = match chunk {
            Some(Ok(bytes)) => decoder.feed(&bytes),
            Some(Err(e)) => vec![StreamEvent::Error(e.to_string())],
            None => decoder.finish(),
        };
        for event in events {
            let terminal = event.is_terminal();
            if tx.send(event).await.is_err() || terminal {
                return;
            }
        }
    }
}

/// Turns raw body bytes into stream events.
#[derive(Debug, Default)]
struct StreamDecoder {
    lines: LineBuffer,
    text: String,
    done: bool,
}

impl StreamDecoder {
    fn feed(&mut self, bytes: &[u8]) -> Vec<StreamEvent> {
        let lines = self.lines.push(bytes);
        let mut events = Vec::new();
        for line in &lines {
            if let Some(event) = self.decode_line(line) {
                let terminal = event.is_terminal();
                events.push(event);
                if terminal {
                    break;
                }
            }
        }
        events
    }

    /// The body ended. Emits the completion if `[DONE]` never arrived.
    fn finish(&mut self) -> Vec<StreamEvent> {
        let mut events = Vec::new();
        if let Some(rest) = self.lines.finish()
            && let Some(event) = self.decode_line(&rest)
        {
            events.push(event);
        }
        if !self.done {
            self.done = true;
            events.push(StreamEvent::Completed(std::mem::take(&mut self.text)));
        }
        events
    }

    fn decode_line(&mut self, line: &str) -> Option<StreamEvent> {
        if self.done {
            return None;
        }
        match parse_sse_line(line) {
            SseLine::Skip => None,
            SseLine::Done => {
                self.done = true;
                Some(StreamEvent::Completed(std::mem::take(&mut self.text)))
            }
            SseLine::Data(data) => match parse_chunk(data) {
                Ok(ChunkEvent::Delta(token)) if token.is_empty() => None,
                Ok(ChunkEvent::Delta(token)) => {
                    self.text.push_str(&token);
                    Some(StreamEvent::Token(token))
                }
                Ok(ChunkEvent::Error(message)) => {
                    self.done = true;
                    Some(StreamEvent::Error(message))
                }
                Err(e) => {
                    warn!("Skipping malformed stream payload: {}", e);
                    None
                }
            },
        }
    }
}
