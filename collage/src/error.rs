//! Error types for the capability boundary and the pipeline core.

use thiserror::Error;

/// Errors raised at the model provider boundary.
#[derive(Debug, Error)]
pub enum CapabilityError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API request failed (HTTP {status}): {body}")]
    Api { status: u16, body: String },

    /// The call succeeded but the response carried no usable payload
    /// (e.g. an image response with no inline image part). Treated exactly
    /// like a hard failure by the pipeline.
    #[error("response missing expected content: {0}")]
    MissingContent(String),

    #[error("failed to parse provider response: {0}")]
    Parse(String),

    #[error("provider configuration error: {0}")]
    Config(String),
}

/// Errors surfaced by the pipeline driver.
///
/// `PlanningFailed`, `NoAssetsRendered` and `InvalidRequest` abort the run.
/// `AssetRenderFailed` is recorded on the failing asset only and never
/// propagates past the paint stage's join. `AssemblyFailed` marks the
/// degraded path: the run still completes with a fallback page.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("request text must not be empty")]
    InvalidRequest,

    #[error("planning failed: {0}")]
    PlanningFailed(String),

    #[error("asset paint failed: {0}")]
    AssetRenderFailed(String),

    #[error("no assets could be painted")]
    NoAssetsRendered,

    #[error("page assembly failed: {0}")]
    AssemblyFailed(String),
}
