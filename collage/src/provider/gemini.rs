//! Gemini provider.
//!
//! Talks to the Google Generative Language `generateContent` endpoint over
//! HTTP. Planning requests declare a JSON response schema so the model is
//! forced to answer with a structured plan; paint requests go to a separate
//! image model and are read back as inline base64 data.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::config::ProviderConfig;
use crate::error::CapabilityError;

use super::{CollageModel, PaintedImage, PlanPayload, ProviderInfo};

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

pub struct GeminiProvider {
    config: ProviderConfig,
    client: reqwest::Client,
}

impl GeminiProvider {
    pub fn new(config: ProviderConfig) -> Result<Self, CapabilityError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds.unwrap_or(120)))
            .build()
            .map_err(|e| {
                CapabilityError::Config(format!("failed to create HTTP client: {}", e))
            })?;

        Ok(Self { config, client })
    }

    async fn generate(
        &self,
        model: &str,
        request: GenerateContentRequest,
    ) -> Result<GenerateContentResponse, CapabilityError> {
        let api_key = self.config.api_key.as_ref().ok_or_else(|| {
            CapabilityError::Config("API key required for Gemini provider".to_string())
        })?;

        let base_url = self.config.base_url.as_deref().unwrap_or(DEFAULT_BASE_URL);
        let url = format!("{}/models/{}:generateContent", base_url, model);

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", api_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        let raw_body = response.text().await?;

        if !status.is_success() {
            return Err(CapabilityError::Api {
                status: status.as_u16(),
                body: preview(&raw_body, 1000),
            });
        }

        serde_json::from_str(&raw_body).map_err(|e| {
            CapabilityError::Parse(format!(
                "invalid generateContent response: {} (body: {})",
                e,
                preview(&raw_body, 500)
            ))
        })
    }

    fn generation_config(&self) -> GenerationConfig {
        GenerationConfig {
            temperature: self.config.temperature,
            max_output_tokens: self.config.max_output_tokens,
            response_mime_type: None,
            response_schema: None,
        }
    }
}

/// Truncate a response body for error messages without splitting a code
/// point.
fn preview(body: &str, limit: usize) -> String {
    if body.chars().count() <= limit {
        return body.to_string();
    }
    let cut: String = body.chars().take(limit).collect();
    format!("{}... [truncated, total length: {} chars]", cut, body.len())
}

/// Pull the JSON object out of a completion that may be wrapped in prose or
/// markdown fences: everything from the first `{` to the last `}`.
fn extract_json_object(text: &str) -> &str {
    match (text.find('{'), text.rfind('}')) {
        (Some(start), Some(end)) if end > start => &text[start..=end],
        _ => text,
    }
}

/// Response schema declared on planning requests, mirroring the shape of
/// [`PlanPayload`].
fn plan_response_schema() -> serde_json::Value {
    serde_json::json!({
        "type": "OBJECT",
        "properties": {
            "designSystem": {
                "type": "OBJECT",
                "properties": {
                    "themeName": { "type": "STRING" },
                    "visualDescription": { "type": "STRING" },
                    "colorPalette": { "type": "ARRAY", "items": { "type": "STRING" } },
                    "backgroundHex": { "type": "STRING" },
                    "fontPairing": {
                        "type": "OBJECT",
                        "properties": {
                            "heading": { "type": "STRING" },
                            "body": { "type": "STRING" }
                        }
                    }
                },
                "required": [
                    "themeName",
                    "visualDescription",
                    "colorPalette",
                    "backgroundHex",
                    "fontPairing"
                ]
            },
            "assets": {
                "type": "ARRAY",
                "items": {
                    "type": "OBJECT",
                    "properties": {
                        "id": { "type": "STRING" },
                        "name": { "type": "STRING" },
                        "description": { "type": "STRING" },
                        "type": {
                            "type": "STRING",
                            "enum": [
                                "background_texture",
                                "hero_cutout",
                                "ui_sticker",
                                "decoration_cutout"
                            ]
                        }
                    },
                    "required": ["id", "name", "description", "type"]
                }
            }
        },
        "required": ["designSystem", "assets"]
    })
}

#[async_trait]
impl CollageModel for GeminiProvider {
    async fn plan_collage(&self, prompt: &str) -> Result<PlanPayload, CapabilityError> {
        let request = GenerateContentRequest {
            contents: vec![Content::from_text(prompt)],
            generation_config: Some(GenerationConfig {
                response_mime_type: Some("application/json".to_string()),
                response_schema: Some(plan_response_schema()),
                ..self.generation_config()
            }),
        };

        let response = self.generate(&self.config.text_model, request).await?;
        let text = response
            .first_text()
            .ok_or_else(|| CapabilityError::MissingContent("plan response has no text".into()))?;

        serde_json::from_str(extract_json_object(&text))
            .map_err(|e| CapabilityError::Parse(format!("plan payload is not valid JSON: {}", e)))
    }

    async fn paint_asset(&self, instruction: &str) -> Result<PaintedImage, CapabilityError> {
        let request = GenerateContentRequest {
            contents: vec![Content::from_text(instruction)],
            generation_config: None,
        };

        let response = self.generate(&self.config.image_model, request).await?;
        response.first_inline_image().ok_or_else(|| {
            CapabilityError::MissingContent("paint response has no inline image".into())
        })
    }

    async fn compose_page(&self, instruction: &str) -> Result<String, CapabilityError> {
        let request = GenerateContentRequest {
            contents: vec![Content::from_text(instruction)],
            generation_config: Some(self.generation_config()),
        };

        let response = self.generate(&self.config.text_model, request).await?;
        if response.finished_for_length() {
            tracing::warn!(
                model = %self.config.text_model,
                "compose response was truncated (finish reason MAX_TOKENS)"
            );
        }
        response.first_text().ok_or_else(|| {
            CapabilityError::MissingContent("compose response has no text".into())
        })
    }

    fn info(&self) -> ProviderInfo {
        ProviderInfo {
            name: "gemini".to_string(),
            text_model: self.config.text_model.clone(),
            image_model: self.config.image_model.clone(),
        }
    }
}

// Generative Language API types

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    contents: Vec<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<GenerationConfig>,
}

#[derive(Serialize, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

impl Content {
    fn from_text(text: &str) -> Self {
        Self {
            parts: vec![Part {
                text: Some(text.to_string()),
                inline_data: None,
            }],
        }
    }
}

#[derive(Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct Part {
    #[serde(skip_serializing_if = "Option::is_none")]
    text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    inline_data: Option<InlineData>,
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InlineData {
    #[serde(default)]
    mime_type: Option<String>,
    data: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_output_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_mime_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_schema: Option<serde_json::Value>,
}

#[derive(Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<Content>,
    #[serde(default)]
    finish_reason: Option<String>,
}

impl GenerateContentResponse {
    fn first_text(&self) -> Option<String> {
        self.candidates
            .first()?
            .content
            .as_ref()?
            .parts
            .iter()
            .find_map(|part| part.text.clone())
    }

    fn first_inline_image(&self) -> Option<PaintedImage> {
        self.candidates
            .first()?
            .content
            .as_ref()?
            .parts
            .iter()
            .find_map(|part| {
                part.inline_data.as_ref().map(|inline| PaintedImage {
                    mime_type: inline
                        .mime_type
                        .clone()
                        .unwrap_or_else(|| "image/png".to_string()),
                    data: inline.data.clone(),
                })
            })
    }

    fn finished_for_length(&self) -> bool {
        self.candidates
            .first()
            .and_then(|c| c.finish_reason.as_deref())
            == Some("MAX_TOKENS")
    }
}
