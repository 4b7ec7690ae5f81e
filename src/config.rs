use anyhow::{Context, Result};

/// Process-wide configuration, loaded once at startup and read-only afterwards.
#[derive(Debug, Clone)]
pub struct Config {
    pub telegram: TelegramConfig,
    pub deepl: DeepLConfig,
}

#[derive(Debug, Clone)]
pub struct TelegramConfig {
    pub bot_token: String,
}

#[derive(Debug, Clone)]
pub struct DeepLConfig {
    pub api_key: String,
    pub api_url: String,
}

impl Config {
    /// Loads configuration from environment variables.
    ///
    /// Required: `TELEGRAM_BOT_TOKEN`, `DEEPL_API_KEY`.
    /// Optional: `DEEPL_API_URL` (defaults based on the key tier).
    pub fn from_env() -> Result<Self> {
        let bot_token = std::env::var("TELEGRAM_BOT_TOKEN")
            .context("TELEGRAM_BOT_TOKEN not found in environment")?;
        let api_key =
            std::env::var("DEEPL_API_KEY").context("DEEPL_API_KEY not found in environment")?;
        let api_url = match std::env::var("DEEPL_API_URL") {
            Ok(url) => url.trim_end_matches('/').to_string(),
            Err(_) => default_api_url(&api_key).to_string(),
        };

        Ok(Self {
            telegram: TelegramConfig { bot_token },
            deepl: DeepLConfig { api_key, api_url },
        })
    }
}

/// Free-tier DeepL keys carry an `:fx` suffix and must use the free endpoint.
fn default_api_url(api_key: &str) -> &'static str {
    if api_key.ends_with(":fx") {
        "https://api-free.deepl.com"
    } else {
        "https://api.deepl.com"
    }
}
