//! Optional diagnostic analyzer hook.

use crate::controller::FailureAction;
use async_trait::async_trait;
use quotagate_core::PipelineFailure;

/// Diagnostic analyzer invoked after each handled failure.
///
/// Invocation is fire-and-forget: the controller spawns the analysis and
/// ignores its outcome, so a slow or broken analyzer can never delay failure
/// routing.
#[async_trait]
pub trait FailureAnalyzer: Send + Sync {
    /// Analyzes a handled failure.
    async fn analyze(&self, failure: PipelineFailure, action: FailureAction);
}
