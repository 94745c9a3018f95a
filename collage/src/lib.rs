// Collage - natural language to a poster-style page
//
// Orchestrates three generative capabilities: plan a collage from a user
// request, paint each planned asset concurrently, and assemble the painted
// assets into a single page of markup via placeholder-token substitution.

pub mod assembler;
pub mod config;
pub mod error;
pub mod pipeline;
pub mod planner;
pub mod provider;
pub mod renderer;
pub mod types;

// Re-export the main surface for easy access
pub use config::{ProviderConfig, ProviderType};
pub use error::{CapabilityError, PipelineError};
pub use pipeline::{CollagePipeline, NoopProgress, ProgressSink};
pub use provider::{CollageModel, GeminiProvider, ProviderFactory, StubProvider};
pub use types::{
    ArtStyle, AssetKind, AssetStatus, CollagePage, CollagePlan, DesignSystem, PlannedAsset,
    RenderedAsset, RunStatus,
};
