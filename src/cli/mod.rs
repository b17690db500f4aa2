use clap::Parser;

#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    // --- Chat LLM Provider Args ---
    /// Base URL for the chat completions endpoint (OpenAI-compatible).
    #[arg(long, env = "CHAT_BASE_URL")] // No default, let the client pick its own
    pub chat_base_url: Option<String>,

    /// API Key for the completion provider. An empty key surfaces as an upstream auth failure.
    #[arg(long, env = "OPENAI_API_KEY", default_value = "")]
    pub chat_api_key: String,

    /// Model identifier for chat completion (e.g., gpt-3.5-turbo, gpt-4o)
    #[arg(long, env = "CHAT_MODEL")] // No default, rely on client default if None
    pub chat_model: Option<String>,

    // --- General App Args ---
    /// Path to the prompt configuration file. Uses the built-in prompt when unset.
    #[arg(long, env = "PROMPTS_PATH")]
    pub prompts_path: Option<String>,

    /// Host address and port for the HTTP server to listen on.
    #[arg(long, env = "SERVER_ADDR", default_value = "127.0.0.1:4000")]
    pub server_addr: String,

    // --- TLS Args ---
    /// Serve HTTPS instead of plain HTTP. Requires cert and key paths.
    #[arg(long, env = "ENABLE_TLS", default_value = "false")]
    pub enable_tls: bool,

    /// Path to the PEM-encoded TLS certificate chain.
    #[arg(long, env = "TLS_CERT_PATH")]
    pub tls_cert_path: Option<String>,

    /// Path to the PEM-encoded PKCS8 TLS private key.
    #[arg(long, env = "TLS_KEY_PATH")]
    pub tls_key_path: Option<String>,
}

impl Default for Args {
    fn default() -> Self {
        Self {
            chat_base_url: None,
            chat_api_key: String::new(),
            chat_model: None,
            prompts_path: None,
            server_addr: "127.0.0.1:4000".to_string(),
            enable_tls: false,
            tls_cert_path: None,
            tls_key_path: None,
        }
    }
}
