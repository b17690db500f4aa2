pub mod openai;

use async_trait::async_trait;
use futures::Stream;
use std::error::Error as StdError;
use std::pin::Pin;
use std::sync::Arc;

use crate::models::chat::ChatMessage;
use self::openai::OpenAIChatClient;

/// Incremental reply: one item per text fragment, in arrival order.
pub type ChatStream = Pin<
    Box<dyn Stream<Item = Result<String, Box<dyn StdError + Send + Sync>>> + Send>
>;

#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub api_key: Option<String>,
    pub completion_model: Option<String>,
    pub base_url: Option<String>,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            completion_model: None,
            base_url: None,
        }
    }
}

#[async_trait]
pub trait ChatClient: Send + Sync {
    /// Open a streamed completion for the given conversation. Fragments
    /// carrying no text payload are filtered out before they reach the
    /// stream.
    async fn stream_chat(
        &self,
        messages: &[ChatMessage]
    ) -> Result<ChatStream, Box<dyn StdError + Send + Sync>>;

    fn get_model(&self) -> String;
}

pub fn new_client(
    config: &LlmConfig
) -> Result<Arc<dyn ChatClient>, Box<dyn StdError + Send + Sync>> {
    let client = OpenAIChatClient::from_config(config)?;
    Ok(Arc::new(client))
}
