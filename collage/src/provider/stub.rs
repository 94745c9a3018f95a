//! Deterministic stub provider.
//!
//! Serves a canonical plan, counterfeit images and a minimal page so the
//! pipeline can run without network access. Every capability call is
//! counted, and [`StubBehavior`] injects failures at any stage, which is
//! how the partial-failure paths get exercised in tests.

use once_cell::sync::Lazy;
use regex::Regex;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;

use crate::config::ProviderConfig;
use crate::error::CapabilityError;
use crate::types::AssetKind;

use super::{
    AssetPayload, CollageModel, DesignSystemPayload, FontPairingPayload, PaintedImage,
    PlanPayload, ProviderInfo,
};

/// Canonical asset catalog the stub plans from, spanning all four kinds.
const CATALOG: &[(&str, &str, AssetKind, &str)] = &[
    (
        "paper_texture",
        "Paper Texture",
        AssetKind::BackgroundTexture,
        "subtle crumpled paper wash covering the whole page",
    ),
    (
        "hero_cutout",
        "Hero Cutout",
        AssetKind::HeroCutout,
        "the main subject of the page, drawn large",
    ),
    (
        "cta_sticker",
        "Call To Action Sticker",
        AssetKind::UiSticker,
        "a start button drawn on a piece of tape",
    ),
    (
        "nav_sticker",
        "Nav Sticker",
        AssetKind::UiSticker,
        "a small menu drawn on a torn receipt",
    ),
    (
        "doodle_star",
        "Doodle Star",
        AssetKind::DecorationCutout,
        "a hand-drawn five pointed star",
    ),
    (
        "coffee_stain",
        "Coffee Stain",
        AssetKind::DecorationCutout,
        "a ring shaped coffee stain",
    ),
    (
        "arrow_doodle",
        "Arrow Doodle",
        AssetKind::DecorationCutout,
        "a curly arrow pointing at the hero",
    ),
];

static TOKEN_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"__ASSET_[A-Za-z0-9_-]+__").unwrap());

/// Failure injection knobs for the stub.
#[derive(Debug, Clone)]
pub struct StubBehavior {
    /// Number of assets the stub plans (clamped to the catalog size).
    pub asset_count: usize,
    pub fail_planning: bool,
    /// Leave `backgroundHex` out of the plan payload.
    pub omit_background_hex: bool,
    /// Reuse the first asset id for the second asset.
    pub duplicate_asset_ids: bool,
    /// 0-indexed plan positions whose paint call fails.
    pub fail_paint_indices: Vec<usize>,
    pub fail_compose: bool,
}

impl Default for StubBehavior {
    fn default() -> Self {
        Self {
            asset_count: 6,
            fail_planning: false,
            omit_background_hex: false,
            duplicate_asset_ids: false,
            fail_paint_indices: Vec::new(),
            fail_compose: false,
        }
    }
}

pub struct StubProvider {
    config: ProviderConfig,
    behavior: StubBehavior,
    plan_calls: AtomicU64,
    paint_calls: AtomicU64,
    compose_calls: AtomicU64,
}

impl StubProvider {
    pub fn new(config: ProviderConfig) -> Self {
        Self::with_behavior(config, StubBehavior::default())
    }

    pub fn with_behavior(config: ProviderConfig, behavior: StubBehavior) -> Self {
        Self {
            config,
            behavior,
            plan_calls: AtomicU64::new(0),
            paint_calls: AtomicU64::new(0),
            compose_calls: AtomicU64::new(0),
        }
    }

    pub fn plan_calls(&self) -> u64 {
        self.plan_calls.load(Ordering::Relaxed)
    }

    pub fn paint_calls(&self) -> u64 {
        self.paint_calls.load(Ordering::Relaxed)
    }

    pub fn compose_calls(&self) -> u64 {
        self.compose_calls.load(Ordering::Relaxed)
    }

    fn stub_plan(&self) -> PlanPayload {
        let count = self.behavior.asset_count.clamp(1, CATALOG.len());
        let mut assets: Vec<AssetPayload> = CATALOG[..count]
            .iter()
            .map(|(id, name, kind, description)| AssetPayload {
                id: Some((*id).to_string()),
                name: Some((*name).to_string()),
                description: Some((*description).to_string()),
                kind: Some(kind.wire_name().to_string()),
            })
            .collect();

        if self.behavior.duplicate_asset_ids && assets.len() > 1 {
            assets[1].id = assets[0].id.clone();
        }

        PlanPayload {
            design_system: Some(DesignSystemPayload {
                theme_name: Some("Sticker Bomb".to_string()),
                visual_description: Some(
                    "organic, overlapping, hand-made collage of die-cut stickers".to_string(),
                ),
                color_palette: Some(vec![
                    "#ff5714".to_string(),
                    "#1b9aaa".to_string(),
                    "#ffc43d".to_string(),
                ]),
                background_hex: if self.behavior.omit_background_hex {
                    None
                } else {
                    Some("#fdfbf7".to_string())
                },
                font_pairing: Some(FontPairingPayload {
                    heading: Some("Rubik Mono One".to_string()),
                    body: Some("Patrick Hand".to_string()),
                }),
            }),
            assets: Some(assets),
        }
    }

    /// Recover the plan position of the asset a paint instruction refers to
    /// by matching the quoted asset name the instruction leads with.
    fn asset_index(&self, instruction: &str) -> Option<usize> {
        let count = self.behavior.asset_count.clamp(1, CATALOG.len());
        CATALOG[..count]
            .iter()
            .position(|(_, name, _, _)| instruction.contains(&format!("\"{}\"", name)))
    }
}

#[async_trait]
impl CollageModel for StubProvider {
    async fn plan_collage(&self, _prompt: &str) -> Result<PlanPayload, CapabilityError> {
        self.plan_calls.fetch_add(1, Ordering::Relaxed);
        if self.behavior.fail_planning {
            return Err(CapabilityError::Api {
                status: 500,
                body: "stub planning failure".to_string(),
            });
        }
        Ok(self.stub_plan())
    }

    async fn paint_asset(&self, instruction: &str) -> Result<PaintedImage, CapabilityError> {
        self.paint_calls.fetch_add(1, Ordering::Relaxed);
        let index = self.asset_index(instruction);
        if let Some(index) = index {
            if self.behavior.fail_paint_indices.contains(&index) {
                return Err(CapabilityError::MissingContent(format!(
                    "stub paint failure for asset {}",
                    index
                )));
            }
        }
        Ok(PaintedImage {
            mime_type: "image/png".to_string(),
            data: format!("U1RVQl8{}", index.unwrap_or(0)),
        })
    }

    async fn compose_page(&self, instruction: &str) -> Result<String, CapabilityError> {
        self.compose_calls.fetch_add(1, Ordering::Relaxed);
        if self.behavior.fail_compose {
            return Err(CapabilityError::Api {
                status: 500,
                body: "stub compose failure".to_string(),
            });
        }

        // Echo back one <img> per placeholder token named in the catalog the
        // instruction carries, fenced the way live models tend to answer.
        let images: Vec<String> = TOKEN_RE
            .find_iter(instruction)
            .map(|token| {
                format!(
                    "  <img src=\"{}\" class=\"mix-blend-multiply\" />",
                    token.as_str()
                )
            })
            .collect();

        Ok(format!(
            "```html\n<div class=\"collage\" style=\"background:#fdfbf7\">\n  <h1>Sticker Bomb</h1>\n{}\n</div>\n```",
            images.join("\n")
        ))
    }

    fn info(&self) -> ProviderInfo {
        ProviderInfo {
            name: "stub".to_string(),
            text_model: self.config.text_model.clone(),
            image_model: self.config.image_model.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ProviderType;

    fn stub_config() -> ProviderConfig {
        ProviderConfig {
            provider_type: ProviderType::Stub,
            ..ProviderConfig::default()
        }
    }

    #[tokio::test]
    async fn stub_plans_a_full_catalog() {
        let provider = StubProvider::new(stub_config());
        let payload = provider.plan_collage("a lemonade stand").await.unwrap();

        let assets = payload.assets.unwrap();
        assert_eq!(assets.len(), 6);
        assert_eq!(assets[0].kind.as_deref(), Some("background_texture"));
        assert_eq!(
            payload.design_system.unwrap().background_hex.as_deref(),
            Some("#fdfbf7")
        );
        assert_eq!(provider.plan_calls(), 1);
    }

    #[tokio::test]
    async fn stub_fails_the_requested_paint_indices() {
        let provider = StubProvider::with_behavior(
            stub_config(),
            StubBehavior {
                fail_paint_indices: vec![1],
                ..StubBehavior::default()
            },
        );

        let ok = provider
            .paint_asset("Create a design asset: \"Paper Texture\"")
            .await;
        assert!(ok.is_ok());

        let failed = provider
            .paint_asset("Create a design asset: \"Hero Cutout\"")
            .await;
        assert!(matches!(failed, Err(CapabilityError::MissingContent(_))));
        assert_eq!(provider.paint_calls(), 2);
    }

    #[tokio::test]
    async fn stub_compose_echoes_catalog_tokens_in_fences() {
        let provider = StubProvider::new(stub_config());
        let html = provider
            .compose_page("Token: __ASSET_hero_cutout__\nToken: __ASSET_doodle_star__")
            .await
            .unwrap();

        assert!(html.starts_with("```html"));
        assert!(html.contains("__ASSET_hero_cutout__"));
        assert!(html.contains("__ASSET_doodle_star__"));
    }
}
