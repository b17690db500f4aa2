use serde::Deserialize;
use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::time::SystemTime;
use log::info;
use thiserror::Error;

/// Instruction text used when no prompt file is configured. Taken as-is
/// from the product copy; treated as an opaque string everywhere else.
pub const DEFAULT_SYSTEM_PROMPT: &str =
    "You are a highly knowledgeable and friendly AI travel assistant specialized in \
helping users plan and book their ideal vacations. Your role is to assist with every \
aspect of the travel experience, from suggesting destinations and activities to finding \
the best flights, accommodations, and local attractions. You should provide personalized \
recommendations based on the user's preferences, budget, and interests. Be proactive in \
offering travel tips, such as the best times to visit certain places, visa requirements, \
and local customs. Ensure that the user feels supported and informed throughout the \
entire booking process, and always strive to make their vacation planning experience as \
seamless and enjoyable as possible.";

/// Greeting the client seeds the conversation with before any turn.
pub const DEFAULT_GREETING: &str =
    "Hi! I'm the GlobeGuide, a travel support assistant, specializing in travel \
assistance! How can I help you today? You can say Booking Assistance, Concierge \
Services, Customer Services!, or any other travel-related questions you may have!";

#[derive(Debug, Error)]
pub enum PromptError {
    #[error("system prompt must not be empty")]
    EmptyPrompt,
    #[error("prompt file IO error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("prompt JSON parsing error: {0}")]
    JsonError(#[from] serde_json::Error),
}

#[derive(Deserialize, Debug, Clone)]
pub struct PromptConfig {
    pub system_prompt: String,
    #[serde(default)]
    pub greeting: Option<String>,
    #[serde(skip)]
    pub last_loaded: Option<SystemTime>,
}

impl PromptConfig {
    /// Built-in configuration, used when no prompt file is given.
    pub fn builtin() -> Self {
        Self {
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
            greeting: Some(DEFAULT_GREETING.to_string()),
            last_loaded: None,
        }
    }

    pub fn greeting(&self) -> &str {
        self.greeting.as_deref().unwrap_or(DEFAULT_GREETING)
    }

    fn validate(&self) -> Result<(), PromptError> {
        if self.system_prompt.trim().is_empty() {
            return Err(PromptError::EmptyPrompt);
        }
        Ok(())
    }
}

pub fn load_prompts<P: AsRef<Path>>(path: P) -> Result<Arc<PromptConfig>, PromptError> {
    let file_content = fs::read_to_string(&path)?;
    let mut config: PromptConfig = serde_json::from_str(&file_content)?;
    config.validate()?;
    config.last_loaded = Some(SystemTime::now());
    Ok(Arc::new(config))
}

/// Reload the prompt file if its mtime is newer than the loaded config.
/// Returns `Ok(None)` when the file is unchanged.
pub fn reload_prompts_if_changed<P: AsRef<Path>>(
    path: P,
    current_config: &Arc<PromptConfig>
) -> Result<Option<Arc<PromptConfig>>, PromptError> {
    let metadata = fs::metadata(&path)?;

    if let Ok(modified) = metadata.modified() {
        if let Some(last_loaded) = current_config.last_loaded {
            if modified > last_loaded {
                info!("Prompt file changed, reloading...");
                return Ok(Some(load_prompts(path)?));
            }
        } else {
            info!("No last_loaded timestamp, reloading prompts...");
            return Ok(Some(load_prompts(path)?));
        }
    }
    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_builtin_config_is_valid() {
        let config = PromptConfig::builtin();
        assert!(config.validate().is_ok());
        assert!(!config.greeting().is_empty());
    }

    #[test]
    fn test_load_prompts_from_file() {
        let dir = std::env::temp_dir();
        let path = dir.join("globeguide_prompt_test.json");
        let mut file = fs::File::create(&path).unwrap();
        write!(file, r#"{{"system_prompt": "Be terse.", "greeting": "Hello."}}"#).unwrap();

        let config = load_prompts(&path).unwrap();
        assert_eq!(config.system_prompt, "Be terse.");
        assert_eq!(config.greeting(), "Hello.");
        assert!(config.last_loaded.is_some());

        fs::remove_file(&path).ok();
    }

    #[test]
    fn test_empty_prompt_rejected() {
        let dir = std::env::temp_dir();
        let path = dir.join("globeguide_prompt_empty_test.json");
        fs::write(&path, r#"{"system_prompt": "   "}"#).unwrap();

        let result = load_prompts(&path);
        assert!(matches!(result, Err(PromptError::EmptyPrompt)));

        fs::remove_file(&path).ok();
    }
}
