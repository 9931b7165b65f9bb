//! Bodies of the `/v1/chat/completions` endpoint.

use pocketllm_domain::{CompletionRequest, Message};
use serde::{Deserialize, Serialize};

/// Streaming chat completion request
#[derive(Debug, Serialize)]
pub struct ChatRequest<'a> {
    pub messages: Vec<ChatMessage<'a>>,
    pub max_tokens: usize,
    #[serde(skip_serializing_if = "no_stops")]
    pub stop: &'a [String],
    pub stream: bool,
}

#[derive(Debug, Serialize)]
pub struct ChatMessage<'a> {
    pub role: &'static str,
    pub content: &'a str,
}

fn no_stops(stop: &&[String]) -> bool {
    stop.is_empty()
}

impl<'a> From<&'a Message> for ChatMessage<'a> {
    fn from(message: &'a Message) -> Self {
        Self {
            role: message.role.as_str(),
            content: &message.content,
        }
    }
}

impl<'a> ChatRequest<'a> {
    pub fn streaming(request: &'a CompletionRequest) -> Self {
        Self {
            messages: request.messages.iter().map(ChatMessage::from).collect(),
            max_tokens: request.token_limit,
            stop: &request.stop_sequences,
            stream: true,
        }
    }
}

/// One `data:` payload of the response stream
#[derive(Debug, Deserialize)]
struct ChatChunk {
    #[serde(default)]
    choices: Vec<ChunkChoice>,
    error: Option<ChunkError>,
}

#[derive(Debug, Deserialize)]
struct ChunkChoice {
    #[serde(default)]
    delta: ChunkDelta,
}

#[derive(Debug, Default, Deserialize)]
struct ChunkDelta {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChunkError {
    message: String,
}

/// What a stream payload carries
#[derive(Debug, PartialEq, Eq)]
pub enum ChunkEvent {
    /// Newly generated text (possibly empty)
    Delta(String),
    /// The server reported an error mid-stream
    Error(String),
}

/// Parse one `data:` payload.
pub fn parse_chunk(data: &str) -> Result<ChunkEvent, serde_json::Error> {
    let chunk: ChatChunk = serde_json::from_str(data)?;
    if let Some(error) = chunk.error {
        return Ok(ChunkEvent::Error(error.message));
    }
    let text = chunk
        .choices
        .into_iter()
        .filter_map(|choice| choice.delta.content)
        .collect();
    Ok(ChunkEvent::Delta(text))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_body() {
        let request = CompletionRequest::new(
            vec![Message::system("be brief"), Message::user("hi")],
            vec!["</s>".to_string()],
            128,
        );
        let body = serde_json::to_value(ChatRequest::streaming(&request)).unwrap();

        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["messages"][1]["content"], "hi");
        assert_eq!(body["max_tokens"], 128);
        assert_eq!(body["stop"][0], "</s>");
        assert_eq!(body["stream"], true);
    }

    #[test]
    fn test_request_without_stops_omits_field() {
        let request = CompletionRequest::new(vec![Message::user("hi")], Vec::new(), 8);
        let body = serde_json::to_value(ChatRequest::streaming(&request)).unwrap();
        assert!(body.get("stop").is_none());
    }

    #[test]
    fn test_parse_delta() {
        let data = r#"{"choices":[{"index":0,"delta":{"content":"Hel"},"finish_reason":null}]}"#;
        assert_eq!(parse_chunk(data).unwrap(), ChunkEvent::Delta("Hel".to_string()));
    }

    #[test]
    fn test_parse_role_only_delta() {
        let data = r#"{"choices":[{"index":0,"delta":{"role":"assistant"}}]}"#;
        assert_eq!(parse_chunk(data).unwrap(), ChunkEvent::Delta(String::new()));
    }

    #[test]
    fn test_parse_error_payload() {
        let data = r#"{"error":{"code":500,"message":"context overflow"}}"#;
        assert_eq!(
            parse_chunk(data).unwrap(),
            ChunkEvent::Error("context overflow".to_string())
        );
    }

    #[test]
    fn test_parse_garbage() {
        assert!(parse_chunk("not json").is_err());
    }
}
