//! Orchestrator signals.
//!
//! The intake scheduler and the reconciler consult the pipeline orchestrator
//! for live counts of running workers and pipeline executions, and the
//! failure controller consumes its failure events. The orchestrator itself is
//! an external collaborator; this module is only the seam.

use async_trait::async_trait;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

/// Errors reading orchestrator state.
#[derive(Debug, Clone, thiserror::Error)]
#[error("orchestrator signal unavailable: {message}")]
pub struct OrchestratorError {
    /// Backend-supplied detail.
    pub message: String,
}

/// Live capacity signals from the pipeline orchestrator.
#[async_trait]
pub trait Orchestrator: Send + Sync {
    /// Number of currently running worker processes.
    async fn running_workers(&self) -> Result<u32, OrchestratorError>;

    /// Number of currently running pipeline executions.
    async fn running_pipelines(&self) -> Result<u32, OrchestratorError>;
}

/// A terminal pipeline failure event, as delivered by the orchestrator.
#[derive(Debug, Clone)]
pub struct PipelineFailure {
    /// Orchestrator execution identifier.
    pub execution_id: String,
    /// Processing-area key of the failed item.
    pub item_path: String,
    /// Raw failure cause string from the orchestrator.
    pub raw_cause: String,
    /// Terminal status (failed, timed out, aborted).
    pub status: String,
}

/// Fixed-count orchestrator for tests.
#[derive(Debug, Default)]
pub struct StaticOrchestrator {
    workers: AtomicU32,
    pipelines: AtomicU32,
}

impl StaticOrchestrator {
    /// Creates an orchestrator reporting the given counts.
    pub fn new(workers: u32, pipelines: u32) -> Arc<Self> {
        Arc::new(Self {
            workers: AtomicU32::new(workers),
            pipelines: AtomicU32::new(pipelines),
        })
    }

    /// Updates the reported worker count.
    pub fn set_workers(&self, workers: u32) {
        self.workers.store(workers, Ordering::SeqCst);
    }

    /// Updates the reported pipeline count.
    pub fn set_pipelines(&self, pipelines: u32) {
        self.pipelines.store(pipelines, Ordering::SeqCst);
    }
}

#[async_trait]
impl Orchestrator for StaticOrchestrator {
    async fn running_workers(&self) -> Result<u32, OrchestratorError> {
        Ok(self.workers.load(Ordering::SeqCst))
    }

    async fn running_pipelines(&self) -> Result<u32, OrchestratorError> {
        Ok(self.pipelines.load(Ordering::SeqCst))
    }
}
