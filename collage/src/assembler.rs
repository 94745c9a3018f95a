//! Assembly stage.
//!
//! Describes the surviving assets to the compose capability as a catalog of
//! placeholder tokens (the media itself is never sent), strips whatever
//! formatting the model wraps its markup in, and then substitutes each
//! token with the asset's data-URL handle. Substitution is exact-string and
//! global; tokens with no matching asset are left in place as a visible
//! sign of a model defect rather than being treated as an error.
//!
//! A compose-capability failure does not kill the run: the caller gets a
//! minimal error page marked as degraded instead.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::PipelineError;
use crate::provider::CollageModel;
use crate::types::{CollagePlan, DesignSystem, RenderedAsset};

/// Minimal document served when the compose capability itself fails.
pub const FALLBACK_PAGE: &str = "<div class='text-red-500'>Failed to assemble collage.</div>";

static FENCE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"```(?:html|tsx|jsx|javascript|typescript|react)?\s*([\s\S]*?)\s*```").unwrap()
});

/// Placeholder token for one asset, as promised to the compose capability.
pub fn asset_token(id: &str) -> String {
    format!("__ASSET_{}__", id)
}

/// Outcome of the assembly stage. `failure` carries the compose error when
/// the page had to fall back to [`FALLBACK_PAGE`].
#[derive(Debug, Clone)]
pub struct AssembledPage {
    pub html: String,
    pub degraded: bool,
    pub failure: Option<String>,
}

/// The subset of painted assets usable for assembly: completed, with a
/// non-empty media handle.
pub(crate) fn usable_assets(rendered: &[RenderedAsset]) -> Vec<&RenderedAsset> {
    rendered.iter().filter(|asset| asset.is_usable()).collect()
}

/// Strip the markup out of a raw completion: fenced block content if there
/// is one, else the span from the first `<` to the last `>`, else the
/// trimmed text.
pub(crate) fn strip_code_fences(text: &str) -> String {
    if let Some(caps) = FENCE_RE.captures(text) {
        return caps[1].trim().to_string();
    }
    if let (Some(first), Some(last)) = (text.find('<'), text.rfind('>')) {
        if last > first {
            return text[first..=last].to_string();
        }
    }
    text.trim().to_string()
}

/// Replace every occurrence of each asset's placeholder token with its
/// media handle. Ids are unique, so substitution order cannot change the
/// result; re-running on already substituted text is a no-op.
pub(crate) fn substitute_tokens(markup: &str, assets: &[&RenderedAsset]) -> String {
    let mut html = markup.to_string();
    for asset in assets {
        if let Some(url) = &asset.image_url {
            html = html.replace(&asset_token(&asset.id), url);
        }
    }
    html
}

/// Build the compose instruction: asset catalog, design system, and the
/// composition rules that make the collage look pasted rather than laid
/// out.
pub(crate) fn build_compose_instruction(
    assets: &[&RenderedAsset],
    design: &DesignSystem,
    request: &str,
) -> String {
    let catalog: String = assets
        .iter()
        .map(|asset| {
            format!(
                "  - ID: {}\n    Type: {}\n    Desc: {}\n    Token: {}\n",
                asset.id,
                asset.kind.wire_name(),
                asset.name,
                asset_token(&asset.id)
            )
        })
        .collect();

    format!(
        r#"You are an Award-Winning Digital Collage Artist and Frontend Developer.
User Request: "{request}"

GOAL: Create a single-screen, immersive, poster-style landing page.
AESTHETIC: "Ordered Chaos". Organic, overlapping, tactile.

ASSETS AVAILABLE:
{catalog}
DESIGN SYSTEM:
- Background Hex: {background}
- Colors: {palette}
- Fonts: {heading}, {body}

CRITICAL IMPLEMENTATION RULES (READ CAREFULLY):

1. NO WHITE BOXES:
   - All images provided have white backgrounds.
   - You MUST apply mix-blend-multiply (class="mix-blend-multiply") to ALL
     foreground images (hero, stickers, decorations) so the white backing
     disappears into the page background.

2. Composition & Layout:
   - Do NOT use a standard grid.
   - Use absolute positioning for almost everything to create a collage.
   - Use transform: rotate(...) liberally (e.g. -2deg, 5deg) so elements look pasted on.
   - Use z-index to layer decorations behind or in front of the hero.
   - The background_texture should be absolute inset-0 object-cover -z-50 opacity-50.

3. UI Elements as Stickers:
   - Buttons should look like they are drawn on their ui_sticker asset:
     wrap the text in a div, put the image absolutely behind the text, and
     rotate the whole container slightly.

4. Typography:
   - Big, bold, artistic typography, placed organically.

5. Interaction:
   - Add hover:scale-105 hover:rotate-0 transition-transform duration-300 to interactive elements.

OUTPUT:
- Return ONLY the valid HTML string. Reference images exclusively through their tokens."#,
        request = request,
        catalog = catalog,
        background = design.background_hex,
        palette = design.color_palette.join(", "),
        heading = design.font_pairing.heading,
        body = design.font_pairing.body,
    )
}

/// Assemble the final page from the joined paint results.
///
/// Fails with [`PipelineError::NoAssetsRendered`] before touching the
/// compose capability when nothing usable survived the paint stage.
pub async fn assemble_page(
    provider: &dyn CollageModel,
    rendered: &[RenderedAsset],
    plan: &CollagePlan,
    request: &str,
) -> Result<AssembledPage, PipelineError> {
    let usable = usable_assets(rendered);
    if usable.is_empty() {
        return Err(PipelineError::NoAssetsRendered);
    }

    let instruction = build_compose_instruction(&usable, &plan.design_system, request);
    match provider.compose_page(&instruction).await {
        Ok(raw) => {
            let html = substitute_tokens(&strip_code_fences(&raw), &usable);
            Ok(AssembledPage {
                html,
                degraded: false,
                failure: None,
            })
        }
        Err(e) => {
            let cause = PipelineError::AssemblyFailed(e.to_string());
            tracing::error!(error = %cause, "falling back to the error page");
            Ok(AssembledPage {
                html: FALLBACK_PAGE.to_string(),
                degraded: true,
                failure: Some(cause.to_string()),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{AssetKind, PlannedAsset};

    fn asset(id: &str, url: Option<&str>) -> RenderedAsset {
        let planned = PlannedAsset {
            id: id.to_string(),
            name: format!("Asset {}", id),
            description: "test asset".to_string(),
            kind: AssetKind::DecorationCutout,
        };
        match url {
            Some(url) => RenderedAsset::completed(&planned, url.to_string()),
            None => RenderedAsset::failed(&planned, "paint failed".to_string()),
        }
    }

    #[test]
    fn fenced_markup_is_unwrapped() {
        let fenced = "Sure!\n```html\n<div>hi</div>\n```\nAnything else?";
        assert_eq!(strip_code_fences(fenced), "<div>hi</div>");

        let anonymous_fence = "```\n<p>x</p>\n```";
        assert_eq!(strip_code_fences(anonymous_fence), "<p>x</p>");
    }

    #[test]
    fn unfenced_markup_is_cut_between_first_and_last_angle_bracket() {
        let prose = "Here you go: <main><img src=\"a\"/></main> hope you like it";
        assert_eq!(strip_code_fences(prose), "<main><img src=\"a\"/></main>");
    }

    #[test]
    fn plain_text_is_only_trimmed() {
        assert_eq!(strip_code_fences("  no markup at all  "), "no markup at all");
    }

    #[test]
    fn substitution_is_global_and_leaves_unknown_tokens() {
        let a = asset("hero", Some("data:image/png;base64,AAA"));
        let b = asset("star", Some("data:image/png;base64,BBB"));
        let markup = "<img src=\"__ASSET_hero__\"/><img src=\"__ASSET_hero__\"/>\
                      <img src=\"__ASSET_star__\"/><img src=\"__ASSET_ghost__\"/>";

        let html = substitute_tokens(markup, &[&a, &b]);

        assert!(!html.contains("__ASSET_hero__"));
        assert!(!html.contains("__ASSET_star__"));
        assert_eq!(html.matches("data:image/png;base64,AAA").count(), 2);
        // an unmatched token survives untouched
        assert!(html.contains("__ASSET_ghost__"));
    }

    #[test]
    fn substitution_is_idempotent() {
        let a = asset("hero", Some("data:image/png;base64,AAA"));
        let once = substitute_tokens("<img src=\"__ASSET_hero__\"/>", &[&a]);
        let twice = substitute_tokens(&once, &[&a]);
        assert_eq!(once, twice);
    }

    #[test]
    fn usable_assets_drop_failures_and_empty_handles() {
        let ok = asset("a", Some("data:image/png;base64,AAA"));
        let failed = asset("b", None);
        let empty = asset("c", Some(""));

        let rendered = vec![ok, failed, empty];
        let usable = usable_assets(&rendered);
        assert_eq!(usable.len(), 1);
        assert_eq!(usable[0].id, "a");
    }

    #[test]
    fn compose_instruction_lists_tokens_but_never_media() {
        let a = asset("hero", Some("data:image/png;base64,SECRET"));
        let design = DesignSystem {
            theme_name: "T".to_string(),
            visual_description: "d".to_string(),
            color_palette: vec!["#ff5714".to_string()],
            background_hex: "#fdfbf7".to_string(),
            font_pairing: crate::types::FontPairing {
                heading: "Bangers".to_string(),
                body: "Patrick Hand".to_string(),
            },
        };

        let instruction = build_compose_instruction(&[&a], &design, "a lemonade stand");
        assert!(instruction.contains("__ASSET_hero__"));
        assert!(instruction.contains("#fdfbf7"));
        assert!(instruction.contains("mix-blend-multiply"));
        assert!(instruction.contains("a lemonade stand"));
        assert!(!instruction.contains("SECRET"));
    }

    mod stage {
        use super::*;
        use crate::config::{ProviderConfig, ProviderType};
        use crate::planner;
        use crate::provider::{CollageModel, StubBehavior, StubProvider};

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

        #[tokio::test]
        async fn no_usable_assets_fails_without_calling_compose() {
            let provider = StubProvider::new(stub_config());
            let plan = plan_from(&provider).await;
            let rendered: Vec<RenderedAsset> = plan
                .assets
                .iter()
                .map(|a| RenderedAsset::failed(a, "paint failed".to_string()))
                .collect();

            let err = assemble_page(&provider, &rendered, &plan, "a lemonade stand")
                .await
                .unwrap_err();
            assert!(matches!(err, PipelineError::NoAssetsRendered));
            assert_eq!(provider.compose_calls(), 0);
        }

        #[tokio::test]
        async fn partial_success_substitutes_exactly_the_survivors() {
            let provider = StubProvider::new(stub_config());
            let plan = plan_from(&provider).await;
            let rendered: Vec<RenderedAsset> = plan
                .assets
                .iter()
                .enumerate()
                .map(|(i, a)| {
                    if i == 1 || i == 4 {
                        RenderedAsset::failed(a, "paint failed".to_string())
                    } else {
                        RenderedAsset::completed(a, format!("data:image/png;base64,IMG{}", i))
                    }
                })
                .collect();

            let page = assemble_page(&provider, &rendered, &plan, "a lemonade stand")
                .await
                .unwrap();

            assert!(!page.degraded);
            for (i, planned) in plan.assets.iter().enumerate() {
                let token = asset_token(&planned.id);
                if i == 1 || i == 4 {
                    assert!(!page.html.contains(&format!("IMG{}", i)));
                } else {
                    assert!(!page.html.contains(&token), "token {} not substituted", token);
                    assert!(page.html.contains(&format!("IMG{}", i)));
                }
            }
        }

        #[tokio::test]
        async fn compose_failure_degrades_to_the_fallback_page() {
            let provider = StubProvider::with_behavior(
                stub_config(),
                StubBehavior {
                    fail_compose: true,
                    ..StubBehavior::default()
                },
            );
            let plan = plan_from(&provider).await;
            let rendered: Vec<RenderedAsset> = plan
                .assets
                .iter()
                .map(|a| RenderedAsset::completed(a, "data:image/png;base64,AAA".to_string()))
                .collect();

            let page = assemble_page(&provider, &rendered, &plan, "a lemonade stand")
                .await
                .unwrap();

            assert!(page.degraded);
            assert_eq!(page.html, FALLBACK_PAGE);
            assert!(page.failure.as_deref().unwrap().contains("page assembly failed"));
        }
    }
}
