//! Distributed admission control for a metered remediation API.
//!
//! An arbitrary stream of work items on one side, an external API with a
//! hard global quota on the other. `quotagate` is the subsystem in between:
//!
//! - a **rate gate** enforcing a concurrent in-flight cap and a per-minute
//!   request cap around every outbound call ([`RateGate`]),
//! - an **intake scheduler** throttling how much work enters the pipeline,
//!   driven by live capacity signals ([`IntakeScheduler`]),
//! - a **failure controller** moving failed items through a bounded retry
//!   ladder with durable retry counts ([`FailureController`]),
//! - a **reconciler** repairing counter drift left behind by crashed
//!   workers ([`Reconciler`]).
//!
//! All four share one transactional counter store ([`CounterStore`]) whose
//! conditional updates are the only synchronization primitive in the system.
//!
//! # Quick start
//!
//! ```
//! use quotagate::CoreContext;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), quotagate::GateError> {
//! // In-memory wiring; production swaps in shared backends.
//! let ctx = CoreContext::in_memory();
//! let gate = ctx.rate_gate(Default::default());
//!
//! let guard = gate.acquire("autotag", Some("reports/q3.pdf")).await?;
//! // ... call the metered API ...
//! guard.release().await;
//! # Ok(())
//! # }
//! ```

mod context;

pub use context::CoreContext;

pub use quotagate_core::{
    Area, Clock, ComponentEvent, EventListener, EventListeners, FnListener, ManualClock,
    MemoryObjectStore, ObjectInfo, ObjectStore, ObjectStoreError, Orchestrator,
    OrchestratorError, PipelineFailure, StaticOrchestrator, SystemClock,
};
pub use quotagate_failure::{
    normalize_failure_reason, FailureAction, FailureAnalyzer, FailureController, FailureError,
    FailureOutcome,
};
pub use quotagate_gate::{
    GateConfig, GateConfigBuilder, GateError, GateUsage, InFlightRegistry, LimitKind, RateGate,
    RateGateEvent, SlotGuard,
};
pub use quotagate_intake::{IntakeAction, IntakeReport, IntakeScheduler};
pub use quotagate_params::{
    names, CachedParameters, ParamError, ParameterSource, StaticParameters, Tuning,
};
pub use quotagate_reconciler::{ReconcileAction, ReconcileReport, Reconciler};
pub use quotagate_store::{
    keys, rows, CounterStore, Fields, MemoryCounterStore, Mutation, Precondition, StoreError,
};

#[cfg(feature = "layer")]
pub use quotagate_gate::{CallLabel, RateGateLayer, RateGateService};
