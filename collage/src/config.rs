//! Provider configuration.
//!
//! Configuration is resolved env-first (the way the CLI uses it), with an
//! optional TOML file for overrides. Nothing here is persisted by the
//! pipeline itself.

use serde::{Deserialize, Serialize};

use crate::error::CapabilityError;

/// Supported provider backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderType {
    /// Google Generative Language API (the backend the product ships with).
    Gemini,
    /// Deterministic in-process provider for tests and offline demos.
    Stub,
}

/// Configuration for a collage model provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    pub provider_type: ProviderType,
    /// Model used for planning and page composition.
    pub text_model: String,
    /// Model used for asset image generation.
    pub image_model: String,
    pub api_key: Option<String>,
    pub base_url: Option<String>,
    pub timeout_seconds: Option<u64>,
    pub temperature: Option<f64>,
    pub max_output_tokens: Option<u32>,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            provider_type: ProviderType::Gemini,
            text_model: "gemini-3-pro-preview".to_string(),
            image_model: "gemini-2.5-flash-image".to_string(),
            api_key: None,
            base_url: None,
            timeout_seconds: Some(120),
            temperature: None,
            max_output_tokens: None,
        }
    }
}

impl ProviderConfig {
    /// Build a configuration from environment variables.
    ///
    /// `GEMINI_API_KEY` selects the Gemini backend; `COLLAGE_PROVIDER=stub`
    /// forces the stub. `COLLAGE_TEXT_MODEL`, `COLLAGE_IMAGE_MODEL`,
    /// `COLLAGE_BASE_URL` and `COLLAGE_TIMEOUT_SECONDS` override defaults.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(provider) = std::env::var("COLLAGE_PROVIDER") {
            if provider.eq_ignore_ascii_case("stub") {
                config.provider_type = ProviderType::Stub;
            }
        }
        if let Ok(api_key) = std::env::var("GEMINI_API_KEY") {
            config.api_key = Some(api_key);
        }
        if let Ok(model) = std::env::var("COLLAGE_TEXT_MODEL") {
            config.text_model = model;
        }
        if let Ok(model) = std::env::var("COLLAGE_IMAGE_MODEL") {
            config.image_model = model;
        }
        if let Ok(base_url) = std::env::var("COLLAGE_BASE_URL") {
            config.base_url = Some(base_url);
        }
        if let Ok(timeout) = std::env::var("COLLAGE_TIMEOUT_SECONDS") {
            if let Ok(seconds) = timeout.parse() {
                config.timeout_seconds = Some(seconds);
            }
        }

        config
    }

    /// Parse a configuration from TOML text. Missing fields fall back to the
    /// defaults through serde.
    pub fn from_toml(text: &str) -> Result<Self, CapabilityError> {
        toml::from_str::<ProviderConfigFile>(text)
            .map(ProviderConfigFile::into_config)
            .map_err(|e| CapabilityError::Config(format!("invalid provider config: {}", e)))
    }
}

/// On-disk shape of the config file. Every field optional so partial files
/// compose with the defaults.
#[derive(Debug, Default, Deserialize)]
struct ProviderConfigFile {
    provider_type: Option<ProviderType>,
    text_model: Option<String>,
    image_model: Option<String>,
    api_key: Option<String>,
    base_url: Option<String>,
    timeout_seconds: Option<u64>,
    temperature: Option<f64>,
    max_output_tokens: Option<u32>,
}

impl ProviderConfigFile {
    fn into_config(self) -> ProviderConfig {
        let defaults = ProviderConfig::default();
        ProviderConfig {
            provider_type: self.provider_type.unwrap_or(defaults.provider_type),
            text_model: self.text_model.unwrap_or(defaults.text_model),
            image_model: self.image_model.unwrap_or(defaults.image_model),
            api_key: self.api_key.or(defaults.api_key),
            base_url: self.base_url.or(defaults.base_url),
            timeout_seconds: self.timeout_seconds.or(defaults.timeout_seconds),
            temperature: self.temperature.or(defaults.temperature),
            max_output_tokens: self.max_output_tokens.or(defaults.max_output_tokens),
        }
    }
}
