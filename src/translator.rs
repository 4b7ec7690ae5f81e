use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

use crate::config::DeepLConfig;
use crate::language::Language;

/// A completed translation.
#[derive(Debug, Clone)]
pub struct Translation {
    pub text: String,
    pub detected_source_language: String,
}

/// Seam over the translation service so the relay can be exercised without
/// touching the network.
#[async_trait]
pub trait Translate: Send + Sync {
    async fn translate(&self, text: &str, target: Language) -> Result<Translation>;
}

#[derive(Debug, Deserialize)]
struct DeepLResponse {
    translations: Vec<DeepLTranslation>,
}

#[derive(Debug, Deserialize)]
struct DeepLTranslation {
    text: String,
    detected_source_language: String,
}

/// Client for the DeepL v2 translate endpoint.
pub struct DeepLClient {
    client: reqwest::Client,
    config: DeepLConfig,
}

impl DeepLClient {
    pub fn new(config: DeepLConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(10))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self { client, config })
    }

    /// One probe translation so a bad key fails at startup instead of on the
    /// first relayed message.
    pub async fn verify_credentials(&self) -> Result<()> {
        self.translate("test", Language::English)
            .await
            .context("DeepL credential check failed")?;
        Ok(())
    }
}

#[async_trait]
impl Translate for DeepLClient {
    async fn translate(&self, text: &str, target: Language) -> Result<Translation> {
        let url = format!("{}/v2/translate", self.config.api_url);
        let params = [("text", text), ("target_lang", target.deepl_code())];

        debug!("Requesting translation to {} from {}", target, url);

        let response = self
            .client
            .post(&url)
            .header(
                "Authorization",
                format!("DeepL-Auth-Key {}", self.config.api_key),
            )
            .form(&params)
            .send()
            .await
            .context("Failed to send request to DeepL")?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("DeepL API error ({}): {}", status, body);
        }

        let parsed: DeepLResponse = response
            .json()
            .await
            .context("Failed to parse DeepL response")?;

        parsed
            .translations
            .into_iter()
            .next()
            .map(|t| Translation {
                text: t.text,
                detected_source_language: t.detected_source_language,
            })
            .context("DeepL returned no translations")
    }
}
