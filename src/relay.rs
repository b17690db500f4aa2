use crate::cli::Args;
use crate::config::prompt::{ self, PromptConfig };
use crate::llm::{ new_client, ChatClient, ChatStream, LlmConfig };
use crate::models::chat::ChatMessage;

use log::info;
use std::error::Error;
use std::sync::Arc;

/// Stateless bridge between the chat endpoint and the upstream completion
/// API. Holds only immutable configuration, so handlers may share one
/// instance across concurrent requests.
#[derive(Clone)]
pub struct Relay {
    chat_client: Arc<dyn ChatClient>,
    prompt_config: Arc<PromptConfig>,
}

impl Relay {
    pub fn new(args: &Args) -> Result<Self, Box<dyn Error + Send + Sync>> {
        let chat_config = LlmConfig {
            api_key: if args.chat_api_key.is_empty() {
                None
            } else {
                Some(args.chat_api_key.clone())
            },
            completion_model: args.chat_model.clone(),
            base_url: args.chat_base_url.clone(),
        };
        let chat_client = new_client(&chat_config)?;

        let prompt_config = match &args.prompts_path {
            Some(path) => prompt::load_prompts(path)?,
            None => Arc::new(PromptConfig::builtin()),
        };

        info!("Relay targeting model: {}", chat_client.get_model());

        Ok(Self {
            chat_client,
            prompt_config,
        })
    }

    #[cfg(test)]
    pub fn with_client(chat_client: Arc<dyn ChatClient>, prompt_config: PromptConfig) -> Self {
        Self {
            chat_client,
            prompt_config: Arc::new(prompt_config),
        }
    }

    /// Build the upstream message list: the configured system instruction
    /// followed by the caller's conversation, order preserved. The system
    /// message exists only on this outbound path.
    pub fn outbound_messages(&self, conversation: &[ChatMessage]) -> Vec<ChatMessage> {
        let mut messages = Vec::with_capacity(conversation.len() + 1);
        messages.push(ChatMessage::system(self.prompt_config.system_prompt.clone()));
        messages.extend_from_slice(conversation);
        messages
    }

    /// Open the streamed upstream completion for a conversation. Each item
    /// is one text fragment, in arrival order.
    pub async fn stream_reply(
        &self,
        conversation: &[ChatMessage]
    ) -> Result<ChatStream, Box<dyn Error + Send + Sync>> {
        let messages = self.outbound_messages(conversation);
        self.chat_client.stream_chat(&messages).await
    }

    /// Swap in a newer prompt file if it changed on disk. Returns whether a
    /// reload happened.
    pub fn reload_prompts_if_changed(
        &mut self,
        args: &Args
    ) -> Result<bool, Box<dyn Error + Send + Sync>> {
        let path = match &args.prompts_path {
            Some(p) => p,
            None => {
                return Ok(false);
            }
        };

        match prompt::reload_prompts_if_changed(path, &self.prompt_config)? {
            Some(new_config) => {
                self.prompt_config = new_config;
                info!("System prompt successfully reloaded");
                Ok(true)
            }
            None => Ok(false),
        }
    }
}
