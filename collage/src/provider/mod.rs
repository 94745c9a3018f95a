//! Model provider boundary.
//!
//! The pipeline consumes three opaque generative capabilities (plan a
//! collage, paint one asset, compose the final page) behind a single
//! [`CollageModel`] trait so it can run against different backends while
//! keeping one interface. The shipped backends are [`GeminiProvider`]
//! (HTTP) and [`StubProvider`] (deterministic, for tests and offline use).
//!
//! None of the capabilities is retried here; retry policy, if any, belongs
//! to the caller.

pub mod gemini;
pub mod stub;

pub use gemini::GeminiProvider;
pub use stub::{StubBehavior, StubProvider};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::config::{ProviderConfig, ProviderType};
use crate::error::CapabilityError;

/// Raw planning payload as declared to the model.
///
/// Every field is optional at the wire layer: the planner, not the
/// provider, decides whether a payload amounts to a valid plan. Unknown
/// asset kinds arrive as plain strings for the same reason.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PlanPayload {
    pub design_system: Option<DesignSystemPayload>,
    pub assets: Option<Vec<AssetPayload>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DesignSystemPayload {
    pub theme_name: Option<String>,
    pub visual_description: Option<String>,
    pub color_palette: Option<Vec<String>>,
    pub background_hex: Option<String>,
    pub font_pairing: Option<FontPairingPayload>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FontPairingPayload {
    pub heading: Option<String>,
    pub body: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AssetPayload {
    pub id: Option<String>,
    pub name: Option<String>,
    pub description: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
}

/// Inline image returned by the paint capability.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaintedImage {
    pub mime_type: String,
    /// Base64 payload, as delivered by the backend.
    pub data: String,
}

impl PaintedImage {
    /// Encode as an embeddable `data:` URL, the media handle the rest of
    /// the pipeline carries around.
    pub fn to_data_url(&self) -> String {
        format!("data:{};base64,{}", self.mime_type, self.data)
    }
}

/// Information about a provider, for logs and run metadata.
#[derive(Debug, Clone)]
pub struct ProviderInfo {
    pub name: String,
    pub text_model: String,
    pub image_model: String,
}

/// Abstract interface to the three generative capabilities.
///
/// Implementations take fully built instruction text; prompt construction
/// is owned by the pipeline stages. A provider either returns a usable
/// payload or a [`CapabilityError`]; "response present but empty" is an
/// error, never a silent success.
#[async_trait]
pub trait CollageModel: Send + Sync {
    /// Produce a structured collage plan for the given planning prompt.
    async fn plan_collage(&self, prompt: &str) -> Result<PlanPayload, CapabilityError>;

    /// Paint a single asset image for the given instruction.
    async fn paint_asset(&self, instruction: &str) -> Result<PaintedImage, CapabilityError>;

    /// Compose the final page markup for the given instruction. Returns the
    /// raw completion text; fence stripping happens downstream.
    async fn compose_page(&self, instruction: &str) -> Result<String, CapabilityError>;

    fn info(&self) -> ProviderInfo;
}

/// Builds providers from configuration.
pub struct ProviderFactory;

impl ProviderFactory {
    pub fn create(config: ProviderConfig) -> Result<Box<dyn CollageModel>, CapabilityError> {
        match config.provider_type {
            ProviderType::Gemini => Ok(Box::new(GeminiProvider::new(config)?)),
            ProviderType::Stub => Ok(Box::new(StubProvider::new(config))),
        }
    }
}
