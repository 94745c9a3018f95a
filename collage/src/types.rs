//! Shared data model for the collage generation pipeline.
//!
//! A run flows strictly forward: request text -> [`CollagePlan`] -> a set of
//! [`RenderedAsset`]s -> an assembled [`CollagePage`]. Everything here is
//! transient, scoped to a single run; there is no persistence layer.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

/// Artistic style selected once per run by the caller.
///
/// The style never changes during a run; the painter reads it to pick a
/// style-specific instruction fragment for every asset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtStyle {
    Doodle,
    Graffiti,
    Watercolor,
    Marker,
    Blueprint,
}

impl ArtStyle {
    /// Instruction fragment appended to every paint request for this style.
    pub fn instruction_fragment(&self) -> &'static str {
        match self {
            ArtStyle::Doodle => "black ink doodle on white paper, thick varied line weight",
            ArtStyle::Graffiti => {
                "street art sticker, distinct outline, vibrant marker colors on white"
            }
            ArtStyle::Watercolor => "watercolor painting, distinct edges, white background",
            ArtStyle::Marker => "permanent marker sketch, bold strokes, white background",
            ArtStyle::Blueprint => "blue ink technical drawing on white paper",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ArtStyle::Doodle => "Hand-drawn Doodle (Black & White)",
            ArtStyle::Graffiti => "Colorful Graffiti",
            ArtStyle::Watercolor => "Watercolor Sketch",
            ArtStyle::Marker => "Permanent Marker",
            ArtStyle::Blueprint => "Rough Blueprint",
        }
    }
}

impl FromStr for ArtStyle {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "doodle" => Ok(ArtStyle::Doodle),
            "graffiti" => Ok(ArtStyle::Graffiti),
            "watercolor" => Ok(ArtStyle::Watercolor),
            "marker" => Ok(ArtStyle::Marker),
            "blueprint" => Ok(ArtStyle::Blueprint),
            other => Err(format!(
                "unknown art style '{}' (expected doodle, graffiti, watercolor, marker or blueprint)",
                other
            )),
        }
    }
}

impl fmt::Display for ArtStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ArtStyle::Doodle => "doodle",
            ArtStyle::Graffiti => "graffiti",
            ArtStyle::Watercolor => "watercolor",
            ArtStyle::Marker => "marker",
            ArtStyle::Blueprint => "blueprint",
        };
        write!(f, "{}", name)
    }
}

/// Heading/body font pairing chosen by the planner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FontPairing {
    pub heading: String,
    pub body: String,
}

/// Design system produced by the planning stage.
///
/// All fields are required; a payload missing any of them never becomes a
/// `DesignSystem` (plan validation rejects it instead).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DesignSystem {
    pub theme_name: String,
    pub visual_description: String,
    /// Ordered, non-empty list of color tokens.
    pub color_palette: Vec<String>,
    /// Near-white paper-like tone so blend compositing works downstream.
    pub background_hex: String,
    pub font_pairing: FontPairing,
}

/// Role an asset plays in the collage. Fixed at planning time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssetKind {
    /// Full-screen subtle texture layered behind everything else.
    BackgroundTexture,
    /// The main visual centerpiece.
    HeroCutout,
    /// Functional element treated as a sticker (button, nav, badge).
    UiSticker,
    /// Floating element added for depth (stars, doodles, arrows).
    DecorationCutout,
}

impl AssetKind {
    pub fn wire_name(&self) -> &'static str {
        match self {
            AssetKind::BackgroundTexture => "background_texture",
            AssetKind::HeroCutout => "hero_cutout",
            AssetKind::UiSticker => "ui_sticker",
            AssetKind::DecorationCutout => "decoration_cutout",
        }
    }

    pub fn from_wire(s: &str) -> Option<Self> {
        match s {
            "background_texture" => Some(AssetKind::BackgroundTexture),
            "hero_cutout" => Some(AssetKind::HeroCutout),
            "ui_sticker" => Some(AssetKind::UiSticker),
            "decoration_cutout" => Some(AssetKind::DecorationCutout),
            _ => None,
        }
    }
}

/// One visual unit of the composition, as planned. Immutable after planning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlannedAsset {
    /// Unique within the run; opaque to callers. Token substitution during
    /// assembly relies on this uniqueness.
    pub id: String,
    pub name: String,
    pub description: String,
    pub kind: AssetKind,
}

/// Validated output of the planning stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CollagePlan {
    pub design_system: DesignSystem,
    /// Ordered, non-empty. Result order of the paint stage follows this order.
    pub assets: Vec<PlannedAsset>,
}

/// Lifecycle of a single asset during the paint stage.
///
/// Pending -> Painting -> Completed | Failed. Terminal states are final;
/// the paint stage is the only writer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssetStatus {
    Pending,
    Painting,
    Completed,
    Failed,
}

impl AssetStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, AssetStatus::Completed | AssetStatus::Failed)
    }
}

/// A planned asset plus its paint outcome.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderedAsset {
    pub id: String,
    pub name: String,
    pub description: String,
    pub kind: AssetKind,
    pub status: AssetStatus,
    /// Embeddable media reference (`data:<mime>;base64,<data>`); present iff
    /// the asset completed.
    pub image_url: Option<String>,
    /// Human-readable failure cause; present iff the asset failed.
    pub error: Option<String>,
}

impl RenderedAsset {
    pub fn completed(planned: &PlannedAsset, image_url: String) -> Self {
        Self {
            id: planned.id.clone(),
            name: planned.name.clone(),
            description: planned.description.clone(),
            kind: planned.kind,
            status: AssetStatus::Completed,
            image_url: Some(image_url),
            error: None,
        }
    }

    pub fn failed(planned: &PlannedAsset, error: String) -> Self {
        Self {
            id: planned.id.clone(),
            name: planned.name.clone(),
            description: planned.description.clone(),
            kind: planned.kind,
            status: AssetStatus::Failed,
            image_url: None,
            error: Some(error),
        }
    }

    /// True when the asset completed with a usable media handle.
    pub fn is_usable(&self) -> bool {
        self.status == AssetStatus::Completed
            && self.image_url.as_deref().map_or(false, |url| !url.is_empty())
    }
}

/// Overall status of one run. Monotonic forward except on failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Idle,
    Planning,
    Painting,
    Assembling,
    Completed,
    Failed,
}

/// Final artifact of a successful run. Immutable once produced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollagePage {
    /// Fully substituted markup.
    pub html: String,
    pub plan: CollagePlan,
    /// Final state of every planned asset, in plan order.
    pub assets: Vec<RenderedAsset>,
    /// True when assembly fell back to the minimal error document. The run
    /// still completes, but callers can tell the page apart from a fully
    /// assembled one.
    pub degraded: bool,
    pub created_at: u64,
    /// Run trace data (run id, request hash, stage latencies, provider info).
    pub metadata: HashMap<String, String>,
}
