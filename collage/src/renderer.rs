//! Paint stage: concurrent asset rendering.
//!
//! One paint call per planned asset, all in flight at once. The stage only
//! returns once every call has settled: a failing asset never cancels its
//! siblings and never aborts the stage, it is recorded as failed and
//! carried forward so the assembly stage can decide what to do with the
//! survivors. The returned collection is index-stable by plan order no
//! matter which calls finish first.

use futures::future::join_all;

use crate::error::PipelineError;
use crate::pipeline::ProgressSink;
use crate::provider::CollageModel;
use crate::types::{
    ArtStyle, AssetKind, AssetStatus, CollagePlan, DesignSystem, PlannedAsset, RenderedAsset,
};

/// Build the paint instruction for one asset.
///
/// Background textures must tile the whole page; everything else is painted
/// as an isolated object on pure white so it can be blend-composited onto
/// the page background later.
pub(crate) fn build_paint_instruction(
    asset: &PlannedAsset,
    style: ArtStyle,
    design: &DesignSystem,
) -> String {
    let specific = match asset.kind {
        AssetKind::BackgroundTexture => {
            "A seamless full-page paper or wall texture. Light and subtle pattern. No text."
        }
        _ => {
            "ISOLATED OBJECT on a PURE WHITE (#FFFFFF) background.\n\
             High contrast.\n\
             Die-cut sticker style.\n\
             Definite edges.\n\
             NO cropped edges (keep the whole object in frame)."
        }
    };

    format!(
        "Create a design asset: \"{}\"\nType: {}\nStyle: {}\nPalette: {}\n\nInstructions:\n{}\n{}",
        asset.name,
        asset.kind.wire_name(),
        style.instruction_fragment(),
        design.color_palette.join(", "),
        asset.description,
        specific
    )
}

/// Paint every planned asset concurrently and wait for all of them to
/// settle.
///
/// Each asset's slot in the result is written exactly once, by the future
/// that owns it; the join is the only shared point. Status transitions
/// (painting, then completed or failed) are published to the sink as they
/// happen so callers can render progress.
pub async fn render_all(
    provider: &dyn CollageModel,
    plan: &CollagePlan,
    style: ArtStyle,
    sink: &dyn ProgressSink,
) -> Vec<RenderedAsset> {
    let paints = plan.assets.iter().map(|asset| async move {
        sink.asset_status(&asset.id, AssetStatus::Painting);
        let instruction = build_paint_instruction(asset, style, &plan.design_system);

        let rendered = match provider.paint_asset(&instruction).await {
            Ok(image) if !image.data.is_empty() => {
                RenderedAsset::completed(asset, image.to_data_url())
            }
            Ok(_) => RenderedAsset::failed(
                asset,
                PipelineError::AssetRenderFailed(format!(
                    "empty image payload for '{}'",
                    asset.name
                ))
                .to_string(),
            ),
            Err(e) => RenderedAsset::failed(
                asset,
                PipelineError::AssetRenderFailed(e.to_string()).to_string(),
            ),
        };

        if rendered.status == AssetStatus::Failed {
            tracing::warn!(
                asset = %asset.id,
                error = rendered.error.as_deref().unwrap_or(""),
                "asset paint failed"
            );
        }
        sink.asset_status(&asset.id, rendered.status);
        rendered
    });

    join_all(paints).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ProviderConfig, ProviderType};
    use crate::pipeline::NoopProgress;
    use crate::planner;
    use crate::provider::{StubBehavior, StubProvider};
    use std::sync::Mutex;

    fn stub_config() -> ProviderConfig {
        ProviderConfig {
            provider_type: ProviderType::Stub,
            ..ProviderConfig::default()
        }
    }

    async fn plan_from(provider: &StubProvider) -> CollagePlan {
        let payload = provider.plan_collage("a lemonade stand").await.unwrap();
        planner::validate_payload(payload).unwrap()
    }

    struct RecordingSink {
        events: Mutex<Vec<(String, AssetStatus)>>,
    }

    impl RecordingSink {
        fn new() -> Self {
            Self {
                events: Mutex::new(Vec::new()),
            }
        }
    }

    impl ProgressSink for RecordingSink {
        fn asset_status(&self, asset_id: &str, status: AssetStatus) {
            self.events
                .lock()
                .unwrap()
                .push((asset_id.to_string(), status));
        }
    }

    #[tokio::test]
    async fn all_assets_settle_in_plan_order() {
        let provider = StubProvider::new(stub_config());
        let plan = plan_from(&provider).await;

        let rendered = render_all(&provider, &plan, ArtStyle::Doodle, &NoopProgress).await;

        assert_eq!(rendered.len(), plan.assets.len());
        for (planned, painted) in plan.assets.iter().zip(&rendered) {
            assert_eq!(planned.id, painted.id);
            assert!(painted.status.is_terminal());
            assert_eq!(painted.status, AssetStatus::Completed);
            assert!(painted.image_url.as_deref().unwrap().starts_with("data:image/png;base64,"));
        }
    }

    #[tokio::test]
    async fn failures_are_recorded_without_dropping_or_reordering() {
        let provider = StubProvider::with_behavior(
            stub_config(),
            StubBehavior {
                fail_paint_indices: vec![1, 4],
                ..StubBehavior::default()
            },
        );
        let plan = plan_from(&provider).await;

        let rendered = render_all(&provider, &plan, ArtStyle::Marker, &NoopProgress).await;

        assert_eq!(rendered.len(), 6);
        for (index, asset) in rendered.iter().enumerate() {
            assert_eq!(asset.id, plan.assets[index].id);
            if index == 1 || index == 4 {
                assert_eq!(asset.status, AssetStatus::Failed);
                assert!(asset.image_url.is_none());
                assert!(asset.error.as_deref().unwrap().contains("asset paint failed"));
            } else {
                assert_eq!(asset.status, AssetStatus::Completed);
            }
        }
        // every asset was attempted: no short-circuit on first failure
        assert_eq!(provider.paint_calls(), 6);
    }

    #[tokio::test]
    async fn every_asset_reaches_a_terminal_status_even_when_all_fail() {
        let provider = StubProvider::with_behavior(
            stub_config(),
            StubBehavior {
                fail_paint_indices: (0..6).collect(),
                ..StubBehavior::default()
            },
        );
        let plan = plan_from(&provider).await;

        let rendered = render_all(&provider, &plan, ArtStyle::Graffiti, &NoopProgress).await;
        assert!(rendered.iter().all(|a| a.status == AssetStatus::Failed));
        assert!(rendered.iter().all(|a| a.image_url.is_none()));
    }

    #[tokio::test]
    async fn sink_observes_painting_then_terminal_per_asset() {
        let provider = StubProvider::with_behavior(
            stub_config(),
            StubBehavior {
                fail_paint_indices: vec![2],
                ..StubBehavior::default()
            },
        );
        let plan = plan_from(&provider).await;
        let sink = RecordingSink::new();

        render_all(&provider, &plan, ArtStyle::Doodle, &sink).await;

        let events = sink.events.lock().unwrap();
        for planned in &plan.assets {
            let for_asset: Vec<AssetStatus> = events
                .iter()
                .filter(|(id, _)| id == &planned.id)
                .map(|(_, status)| *status)
                .collect();
            assert_eq!(for_asset[0], AssetStatus::Painting);
            assert_eq!(for_asset.len(), 2);
            assert!(for_asset[1].is_terminal());
        }
    }

    #[test]
    fn texture_and_cutout_instructions_differ() {
        let design = DesignSystem {
            theme_name: "T".to_string(),
            visual_description: "d".to_string(),
            color_palette: vec!["#fff".to_string(), "#000".to_string()],
            background_hex: "#fdfbf7".to_string(),
            font_pairing: crate::types::FontPairing {
                heading: "A".to_string(),
                body: "B".to_string(),
            },
        };
        let texture = PlannedAsset {
            id: "bg".to_string(),
            name: "Paper".to_string(),
            description: "paper grain".to_string(),
            kind: AssetKind::BackgroundTexture,
        };
        let sticker = PlannedAsset {
            id: "cta".to_string(),
            name: "Start Button".to_string(),
            description: "button on tape".to_string(),
            kind: AssetKind::UiSticker,
        };

        let texture_prompt = build_paint_instruction(&texture, ArtStyle::Doodle, &design);
        assert!(texture_prompt.contains("seamless full-page"));
        assert!(texture_prompt.contains("No text."));

        let sticker_prompt = build_paint_instruction(&sticker, ArtStyle::Doodle, &design);
        assert!(sticker_prompt.contains("PURE WHITE"));
        assert!(sticker_prompt.contains("Die-cut sticker style"));
        assert!(sticker_prompt.contains("#fff, #000"));
        assert!(sticker_prompt.contains(ArtStyle::Doodle.instruction_fragment()));
    }
}
