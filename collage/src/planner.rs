//! Planning stage.
//!
//! Turns the user's free-text request into a validated [`CollagePlan`] by
//! prompting the plan capability for a poster-style composition and then
//! checking the returned payload field by field. A payload that fails any
//! check aborts the run; no partial plan ever leaves this module.

use std::collections::HashSet;

use crate::error::PipelineError;
use crate::provider::{AssetPayload, CollageModel, PlanPayload};
use crate::types::{AssetKind, CollagePlan, DesignSystem, FontPairing, PlannedAsset};

/// Build the planning prompt for a user request.
pub(crate) fn build_plan_prompt(request: &str) -> String {
    format!(
        r#"You are an Avant-Garde Web Designer.
User Request: "{}"

GOAL: Plan a "One-Page Poster" style website.
DO NOT plan a standard scrollable website with blocks.
Plan a chaotic, artistic, organic COLLAGE that fits on a single screen.

1. Design System:
   - Theme Name.
   - Visual Description: Emphasize "organic", "overlapping", "hand-made".
   - Color Palette: 3-5 vivid colors.
   - Background: Must be a very light paper-like color (e.g. #fdfbf7, #fffdf0)
     so blending modes work against it later.

2. Visual Assets (plan 5-7 items, spanning all four types):
   - background_texture: A full-screen subtle texture (paper, wall, noise).
   - hero_cutout: The main visual centerpiece (e.g. a giant character, a machine, a building).
   - ui_sticker: Functional elements treated as "stickers" (e.g. a "Start" button drawn on a piece of tape, a nav menu on a torn receipt).
   - decoration_cutout: Floating elements to add depth (e.g. stars, doodles, arrows, coffee stains).

Ensure variety in shapes (tall, wide, circular, irregular).
Give every asset a short unique id."#,
        request
    )
}

/// Run the plan capability and validate its payload.
pub async fn plan_collage(
    provider: &dyn CollageModel,
    request: &str,
) -> Result<CollagePlan, PipelineError> {
    let prompt = build_plan_prompt(request);
    let payload = provider
        .plan_collage(&prompt)
        .await
        .map_err(|e| PipelineError::PlanningFailed(e.to_string()))?;

    let plan = validate_payload(payload)?;
    let n = plan.assets.len();
    if !(5..=7).contains(&n) {
        // The prompt asks for 5-7; fewer or more still forms a usable plan.
        tracing::warn!(assets = n, "plan asset count outside the requested range");
    }
    Ok(plan)
}

fn missing(field: &str) -> PipelineError {
    PipelineError::PlanningFailed(format!("plan payload is missing {}", field))
}

fn require_text(value: Option<String>, field: &str) -> Result<String, PipelineError> {
    match value {
        Some(text) if !text.trim().is_empty() => Ok(text),
        _ => Err(missing(field)),
    }
}

/// Check a raw payload against the plan schema and produce the validated
/// plan. Also rejects duplicate asset ids, which the token substitution
/// protocol depends on.
pub(crate) fn validate_payload(payload: PlanPayload) -> Result<CollagePlan, PipelineError> {
    let design = payload.design_system.ok_or_else(|| missing("designSystem"))?;

    let font_pairing = design
        .font_pairing
        .ok_or_else(|| missing("designSystem.fontPairing"))?;
    let design_system = DesignSystem {
        theme_name: require_text(design.theme_name, "designSystem.themeName")?,
        visual_description: require_text(
            design.visual_description,
            "designSystem.visualDescription",
        )?,
        color_palette: match design.color_palette {
            Some(palette) if !palette.is_empty() => palette,
            _ => return Err(missing("designSystem.colorPalette")),
        },
        background_hex: require_text(design.background_hex, "designSystem.backgroundHex")?,
        font_pairing: FontPairing {
            heading: require_text(font_pairing.heading, "designSystem.fontPairing.heading")?,
            body: require_text(font_pairing.body, "designSystem.fontPairing.body")?,
        },
    };

    let raw_assets = match payload.assets {
        Some(assets) if !assets.is_empty() => assets,
        _ => return Err(missing("assets")),
    };

    let mut seen = HashSet::new();
    let mut assets = Vec::with_capacity(raw_assets.len());
    for (index, raw) in raw_assets.into_iter().enumerate() {
        let asset = validate_asset(raw, index)?;
        if !seen.insert(asset.id.clone()) {
            return Err(PipelineError::PlanningFailed(format!(
                "duplicate asset id '{}'",
                asset.id
            )));
        }
        assets.push(asset);
    }

    Ok(CollagePlan {
        design_system,
        assets,
    })
}

fn validate_asset(raw: AssetPayload, index: usize) -> Result<PlannedAsset, PipelineError> {
    let id = require_text(raw.id, &format!("assets[{}].id", index))?;
    let name = require_text(raw.name, &format!("assets[{}].name", index))?;
    let description = require_text(raw.description, &format!("assets[{}].description", index))?;
    let kind_name = require_text(raw.kind, &format!("assets[{}].type", index))?;
    let kind = AssetKind::from_wire(&kind_name).ok_or_else(|| {
        PipelineError::PlanningFailed(format!(
            "assets[{}] has unknown type '{}'",
            index, kind_name
        ))
    })?;

    Ok(PlannedAsset {
        id,
        name,
        description,
        kind,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::{DesignSystemPayload, FontPairingPayload};

    fn full_payload() -> PlanPayload {
        PlanPayload {
            design_system: Some(DesignSystemPayload {
                theme_name: Some("Lemonade Punk".to_string()),
                visual_description: Some("hand-made overlapping collage".to_string()),
                color_palette: Some(vec!["#ffd500".to_string(), "#111111".to_string()]),
                background_hex: Some("#fffdf0".to_string()),
                font_pairing: Some(FontPairingPayload {
                    heading: Some("Bangers".to_string()),
                    body: Some("Patrick Hand".to_string()),
                }),
            }),
            assets: Some(vec![
                AssetPayload {
                    id: Some("bg".to_string()),
                    name: Some("Paper".to_string()),
                    description: Some("paper texture".to_string()),
                    kind: Some("background_texture".to_string()),
                },
                AssetPayload {
                    id: Some("hero".to_string()),
                    name: Some("Lemon".to_string()),
                    description: Some("a giant lemon".to_string()),
                    kind: Some("hero_cutout".to_string()),
                },
            ]),
        }
    }

    #[test]
    fn valid_payload_becomes_a_plan() {
        let plan = validate_payload(full_payload()).unwrap();
        assert_eq!(plan.design_system.theme_name, "Lemonade Punk");
        assert_eq!(plan.assets.len(), 2);
        assert_eq!(plan.assets[1].kind, AssetKind::HeroCutout);
    }

    #[test]
    fn missing_background_hex_is_a_planning_failure() {
        let mut payload = full_payload();
        payload.design_system.as_mut().unwrap().background_hex = None;

        let err = validate_payload(payload).unwrap_err();
        assert!(matches!(err, PipelineError::PlanningFailed(_)));
        assert!(err.to_string().contains("backgroundHex"));
    }

    #[test]
    fn blank_theme_name_is_rejected() {
        let mut payload = full_payload();
        payload.design_system.as_mut().unwrap().theme_name = Some("   ".to_string());
        assert!(validate_payload(payload).is_err());
    }

    #[test]
    fn empty_palette_is_rejected() {
        let mut payload = full_payload();
        payload.design_system.as_mut().unwrap().color_palette = Some(vec![]);
        let err = validate_payload(payload).unwrap_err();
        assert!(err.to_string().contains("colorPalette"));
    }

    #[test]
    fn empty_asset_list_is_rejected() {
        let mut payload = full_payload();
        payload.assets = Some(vec![]);
        let err = validate_payload(payload).unwrap_err();
        assert!(err.to_string().contains("assets"));
    }

    #[test]
    fn duplicate_asset_ids_are_rejected() {
        let mut payload = full_payload();
        payload.assets.as_mut().unwrap()[1].id = Some("bg".to_string());
        let err = validate_payload(payload).unwrap_err();
        assert!(err.to_string().contains("duplicate asset id 'bg'"));
    }

    #[test]
    fn unknown_asset_kind_is_rejected() {
        let mut payload = full_payload();
        payload.assets.as_mut().unwrap()[0].kind = Some("hologram".to_string());
        let err = validate_payload(payload).unwrap_err();
        assert!(err.to_string().contains("unknown type 'hologram'"));
    }

    #[test]
    fn plan_prompt_carries_the_request_and_the_constraints() {
        let prompt = build_plan_prompt("a lemonade stand");
        assert!(prompt.contains("\"a lemonade stand\""));
        assert!(prompt.contains("5-7 items"));
        assert!(prompt.contains("background_texture"));
        assert!(prompt.contains("paper-like color"));
    }
}
