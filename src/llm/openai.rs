use async_trait::async_trait;
use futures::StreamExt;
use log::{ debug, info };
use reqwest::{ Client as HttpClient, header::{ HeaderMap, HeaderValue, CONTENT_TYPE, AUTHORIZATION } };
use serde::{ Deserialize, Serialize };
use std::error::Error as StdError;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;

use super::{ ChatClient, ChatStream, LlmConfig };
use crate::models::chat::ChatMessage;

pub struct OpenAIChatClient {
    http: HttpClient,
    api_key: String,
    model: String,
    base_url: String,
}

#[derive(Serialize)]
struct OpenAIChatRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    stream: bool,
}

#[derive(Deserialize)]
struct OpenAIStreamResponse {
    choices: Vec<OpenAIStreamChoice>,
}

#[derive(Deserialize)]
struct OpenAIStreamChoice {
    delta: OpenAIDelta,
    #[serde(rename = "finish_reason")]
    finish_reason: Option<String>,
}

#[derive(Deserialize)]
struct OpenAIDelta {
    content: Option<String>,
}

/// One parsed server-sent event from the completions stream.
#[derive(Debug, PartialEq, Eq)]
pub enum SsePayload {
    Delta(String),
    Done,
}

/// Parse a single complete SSE line. Returns `None` for blank lines,
/// comments, and fragments that carry no text payload (role announcements,
/// metadata-only deltas).
pub fn parse_sse_line(line: &str) -> Option<SsePayload> {
    let line = line.trim_end_matches('\r');
    if line.is_empty() {
        return None;
    }

    let data = line.strip_prefix("data: ")?;
    if data == "[DONE]" {
        return Some(SsePayload::Done);
    }

    match serde_json::from_str::<OpenAIStreamResponse>(data) {
        Ok(stream_resp) => {
            for choice in stream_resp.choices {
                if let Some(content) = choice.delta.content {
                    if !content.is_empty() {
                        return Some(SsePayload::Delta(content));
                    }
                }
                if choice.finish_reason.as_deref() == Some("stop") {
                    return Some(SsePayload::Done);
                }
            }
            None
        }
        Err(e) => {
            debug!("JSON parse error: {} for data: {}", e, data);
            None
        }
    }
}

impl OpenAIChatClient {
    pub fn new(
        api_key: String,
        model: Option<String>,
        base_url: Option<String>
    ) -> Result<Self, Box<dyn StdError + Send + Sync>> {
        let chat_model = model.unwrap_or_else(|| "gpt-3.5-turbo".to_string());
        let api_url = base_url.unwrap_or_else(||
            "https://api.openai.com/v1/chat/completions".to_string()
        );
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", api_key))
                .map_err(|e| format!("Invalid API key format: {}", e))?
        );

        let http = HttpClient::builder()
            .default_headers(headers)
            .build()
            .map_err(|e| Box::new(e) as Box<dyn StdError + Send + Sync>)?;

        Ok(Self {
            http,
            api_key,
            model: chat_model,
            base_url: api_url,
        })
    }

    pub fn from_config(config: &LlmConfig) -> Result<Self, Box<dyn StdError + Send + Sync>> {
        let api_key = config.api_key.clone().unwrap_or_default();
        Self::new(api_key, config.completion_model.clone(), config.base_url.clone())
    }
}

#[async_trait]
impl ChatClient for OpenAIChatClient {
    async fn stream_chat(
        &self,
        messages: &[ChatMessage]
    ) -> Result<ChatStream, Box<dyn StdError + Send + Sync>> {
        let url = self.base_url.trim_end_matches('/').to_string();

        let req = OpenAIChatRequest {
            model: &self.model,
            messages,
            stream: true,
        };
        let body = serde_json::to_vec(&req)?;

        let (tx, rx) = mpsc::channel(32);
        let client = self.http.clone();
        let auth_header = format!("Bearer {}", self.api_key);

        tokio::spawn(async move {
            let resp = match
                client
                    .post(&url)
                    .header(AUTHORIZATION, auth_header)
                    .header(CONTENT_TYPE, "application/json")
                    .body(body)
                    .send().await
            {
                Ok(r) => r,
                Err(e) => {
                    let _ = tx.send(Err(Box::new(e) as _)).await;
                    return;
                }
            };

            if let Err(e) = resp.error_for_status_ref() {
                let _ = tx.send(Err(Box::new(e) as _)).await;
                return;
            }

            let mut stream = resp.bytes_stream();

            // SSE lines can straddle transport chunks; buffer raw bytes and
            // only parse up to the last complete line.
            let mut pending: Vec<u8> = Vec::new();

            while let Some(chunk_result) = stream.next().await {
                match chunk_result {
                    Ok(chunk) => {
                        pending.extend_from_slice(&chunk);

                        while let Some(pos) = pending.iter().position(|&b| b == b'\n') {
                            let line_bytes: Vec<u8> = pending.drain(..=pos).collect();
                            let line = String::from_utf8_lossy(&line_bytes[..pos]);

                            match parse_sse_line(&line) {
                                Some(SsePayload::Delta(content)) => {
                                    if tx.send(Ok(content)).await.is_err() {
                                        return;
                                    }
                                }
                                Some(SsePayload::Done) => {
                                    return;
                                }
                                None => {}
                            }
                        }
                    }
                    Err(e) => {
                        let _ = tx.send(Err(Box::new(e) as _)).await;
                        return;
                    }
                }
            }

            info!("Upstream stream ended without [DONE]");
        });

        Ok(Box::pin(ReceiverStream::new(rx)))
    }

    fn get_model(&self) -> String {
        self.model.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_content_delta() {
        let line = r#"data: {"choices":[{"delta":{"content":"Sure"},"finish_reason":null}]}"#;
        assert_eq!(parse_sse_line(line), Some(SsePayload::Delta("Sure".to_string())));
    }

    #[test]
    fn test_parse_done_marker() {
        assert_eq!(parse_sse_line("data: [DONE]"), Some(SsePayload::Done));
    }

    #[test]
    fn test_role_only_delta_skipped() {
        let line = r#"data: {"choices":[{"delta":{"role":"assistant"},"finish_reason":null}]}"#;
        assert_eq!(parse_sse_line(line), None);
    }

    #[test]
    fn test_finish_reason_stop_ends_stream() {
        let line = r#"data: {"choices":[{"delta":{},"finish_reason":"stop"}]}"#;
        assert_eq!(parse_sse_line(line), Some(SsePayload::Done));
    }

    #[test]
    fn test_blank_and_comment_lines_skipped() {
        assert_eq!(parse_sse_line(""), None);
        assert_eq!(parse_sse_line(": keep-alive"), None);
        assert_eq!(parse_sse_line("event: ping"), None);
    }

    #[test]
    fn test_empty_content_delta_skipped() {
        let line = r#"data: {"choices":[{"delta":{"content":""},"finish_reason":null}]}"#;
        assert_eq!(parse_sse_line(line), None);
    }

    #[test]
    fn test_crlf_line_endings_accepted() {
        let line = "data: {\"choices\":[{\"delta\":{\"content\":\"hi\"},\"finish_reason\":null}]}\r";
        assert_eq!(parse_sse_line(line), Some(SsePayload::Delta("hi".to_string())));
    }
}
