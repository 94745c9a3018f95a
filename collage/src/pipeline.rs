//! Pipeline driver.
//!
//! Sequences plan -> paint -> assemble for a single run, owns the run's
//! status state machine, and surfaces either a [`CollagePage`] or a
//! terminal [`PipelineError`]. Each call to [`CollagePipeline::run`] owns
//! its own run context, so independent runs never share state.

use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use crate::assembler;
use crate::error::PipelineError;
use crate::planner;
use crate::provider::CollageModel;
use crate::renderer;
use crate::types::{ArtStyle, AssetStatus, CollagePage, RunStatus};

/// Observer for run progress. All methods default to no-ops; correctness of
/// the pipeline never depends on anyone listening.
pub trait ProgressSink: Send + Sync {
    fn run_status(&self, _status: RunStatus) {}
    fn asset_status(&self, _asset_id: &str, _status: AssetStatus) {}
}

/// Sink that ignores everything.
pub struct NoopProgress;

impl ProgressSink for NoopProgress {}

fn sha256_hex(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    format!("{:x}", hasher.finalize())
}

fn unix_now() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap()
        .as_secs()
}

/// Per-run state. Created fresh by every `run` call; the driver is its sole
/// writer.
struct RunContext<'a> {
    run_id: String,
    status: RunStatus,
    sink: &'a dyn ProgressSink,
}

impl RunContext<'_> {
    fn advance(&mut self, status: RunStatus) {
        tracing::debug!(run_id = %self.run_id, from = ?self.status, to = ?status, "run status");
        self.status = status;
        self.sink.run_status(status);
    }

    fn fail(&mut self, cause: &PipelineError) {
        tracing::error!(run_id = %self.run_id, error = %cause, "collage run failed");
        self.advance(RunStatus::Failed);
    }
}

/// Drives one natural-language request to an assembled collage page.
pub struct CollagePipeline {
    provider: Arc<dyn CollageModel>,
    sink: Arc<dyn ProgressSink>,
}

impl CollagePipeline {
    pub fn new(provider: Arc<dyn CollageModel>) -> Self {
        Self::with_sink(provider, Arc::new(NoopProgress))
    }

    pub fn with_sink(provider: Arc<dyn CollageModel>, sink: Arc<dyn ProgressSink>) -> Self {
        Self { provider, sink }
    }

    /// Run the full pipeline for one request.
    ///
    /// An empty (after trimming) request is rejected before any capability
    /// call and before any status transition. Stage failures abort the run
    /// with status `Failed`; a compose-capability failure instead degrades
    /// the page (see [`CollagePage::degraded`]) and the run still
    /// completes.
    pub async fn run(
        &self,
        request: &str,
        style: ArtStyle,
    ) -> Result<CollagePage, PipelineError> {
        let request = request.trim();
        if request.is_empty() {
            return Err(PipelineError::InvalidRequest);
        }

        let started = Instant::now();
        let mut run = RunContext {
            run_id: uuid::Uuid::new_v4().to_string(),
            status: RunStatus::Idle,
            sink: self.sink.as_ref(),
        };
        tracing::info!(run_id = %run.run_id, style = %style, "starting collage run");

        run.advance(RunStatus::Planning);
        let plan = match planner::plan_collage(self.provider.as_ref(), request).await {
            Ok(plan) => plan,
            Err(e) => {
                run.fail(&e);
                return Err(e);
            }
        };
        tracing::info!(
            run_id = %run.run_id,
            theme = %plan.design_system.theme_name,
            assets = plan.assets.len(),
            "plan ready"
        );
        for asset in &plan.assets {
            run.sink.asset_status(&asset.id, AssetStatus::Pending);
        }

        run.advance(RunStatus::Painting);
        let rendered =
            renderer::render_all(self.provider.as_ref(), &plan, style, run.sink).await;
        let completed = rendered.iter().filter(|a| a.is_usable()).count();
        tracing::info!(
            run_id = %run.run_id,
            completed,
            failed = rendered.len() - completed,
            "paint stage settled"
        );

        if completed == 0 {
            let e = PipelineError::NoAssetsRendered;
            run.fail(&e);
            return Err(e);
        }

        run.advance(RunStatus::Assembling);
        let page = match assembler::assemble_page(
            self.provider.as_ref(),
            &rendered,
            &plan,
            request,
        )
        .await
        {
            Ok(page) => page,
            Err(e) => {
                run.fail(&e);
                return Err(e);
            }
        };

        let info = self.provider.info();
        let mut metadata = HashMap::new();
        metadata.insert("run.id".to_string(), run.run_id.clone());
        metadata.insert(
            "request.sha256".to_string(),
            sha256_hex(request.as_bytes()),
        );
        metadata.insert("provider".to_string(), info.name);
        metadata.insert("model.text".to_string(), info.text_model);
        metadata.insert("model.image".to_string(), info.image_model);
        metadata.insert("assets.completed".to_string(), completed.to_string());
        metadata.insert(
            "assets.failed".to_string(),
            (rendered.len() - completed).to_string(),
        );
        metadata.insert(
            "latency_ms".to_string(),
            started.elapsed().as_millis().to_string(),
        );
        if let Some(failure) = &page.failure {
            metadata.insert("assembly.error".to_string(), failure.clone());
        }

        run.advance(RunStatus::Completed);
        tracing::info!(run_id = %run.run_id, degraded = page.degraded, "collage run completed");

        Ok(CollagePage {
            html: page.html,
            plan,
            assets: rendered,
            degraded: page.degraded,
            created_at: unix_now(),
            metadata,
        })
    }
}
