//! Explicit wiring context.
//!
//! Every component takes its collaborators as constructor arguments; nothing
//! reaches for process-global handles. `CoreContext` is the one place a
//! deployment assembles those collaborators, and the place tests swap in the
//! in-memory store, a manual clock, and a static orchestrator.

use quotagate_core::{Clock, ManualClock, MemoryObjectStore, ObjectStore, Orchestrator,
    StaticOrchestrator, SystemClock};
use quotagate_failure::FailureController;
use quotagate_gate::{GateConfig, InFlightRegistry, RateGate};
use quotagate_intake::IntakeScheduler;
use quotagate_params::{CachedParameters, ParameterSource, StaticParameters, Tuning};
use quotagate_reconciler::Reconciler;
use quotagate_store::{CounterStore, MemoryCounterStore};
use std::sync::Arc;

/// Shared collaborators for the admission-control components.
#[derive(Clone)]
pub struct CoreContext {
    store: Arc<dyn CounterStore>,
    objects: Arc<dyn ObjectStore>,
    orchestrator: Arc<dyn Orchestrator>,
    params: Arc<CachedParameters>,
    clock: Arc<dyn Clock>,
}

impl CoreContext {
    /// Assembles a context from explicit backends.
    pub fn new(
        store: Arc<dyn CounterStore>,
        objects: Arc<dyn ObjectStore>,
        orchestrator: Arc<dyn Orchestrator>,
        params: Arc<dyn ParameterSource>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let params = Arc::new(CachedParameters::new(params, Arc::clone(&clock)));
        Self {
            store,
            objects,
            orchestrator,
            params,
            clock,
        }
    }

    /// Fully in-memory context on the system clock, for single-node use.
    pub fn in_memory() -> Self {
        let clock: Arc<dyn Clock> = Arc::new(SystemClock::new());
        Self::in_memory_with_clock(clock)
    }

    /// Fully in-memory context on a manual clock, for tests.
    pub fn in_memory_manual() -> (Self, ManualClock) {
        let clock = ManualClock::new();
        let ctx = Self::in_memory_with_clock(Arc::new(clock.clone()));
        (ctx, clock)
    }

    fn in_memory_with_clock(clock: Arc<dyn Clock>) -> Self {
        Self::new(
            Arc::new(MemoryCounterStore::new(Arc::clone(&clock))),
            Arc::new(MemoryObjectStore::new(Arc::clone(&clock))),
            StaticOrchestrator::new(0, 0),
            StaticParameters::new(),
            clock,
        )
    }

    /// The shared counter store.
    pub fn store(&self) -> Arc<dyn CounterStore> {
        Arc::clone(&self.store)
    }

    /// The work-item object store.
    pub fn objects(&self) -> Arc<dyn ObjectStore> {
        Arc::clone(&self.objects)
    }

    /// The orchestrator signal source.
    pub fn orchestrator(&self) -> Arc<dyn Orchestrator> {
        Arc::clone(&self.orchestrator)
    }

    /// The clock every component reads.
    pub fn clock(&self) -> Arc<dyn Clock> {
        Arc::clone(&self.clock)
    }

    /// Typed tuning-knob reads over the cached parameters.
    pub fn tuning(&self) -> Tuning {
        Tuning::new(Arc::clone(&self.params))
    }

    /// Builds a rate gate with the given configuration.
    pub fn rate_gate(&self, config: GateConfig) -> RateGate {
        RateGate::new(self.store(), self.tuning(), self.clock(), config)
    }

    /// Builds the in-flight registry view of the counter store.
    pub fn registry(&self) -> InFlightRegistry {
        InFlightRegistry::new(self.store(), self.clock())
    }

    /// Builds the intake scheduler.
    pub fn intake_scheduler(&self) -> IntakeScheduler {
        IntakeScheduler::new(
            self.store(),
            self.objects(),
            self.orchestrator(),
            self.tuning(),
            self.clock(),
        )
    }

    /// Builds the failure controller.
    pub fn failure_controller(&self) -> FailureController {
        FailureController::new(self.store(), self.objects(), self.tuning(), self.clock())
    }

    /// Builds the reconciler.
    pub fn reconciler(&self) -> Reconciler {
        Reconciler::new(
            self.store(),
            self.orchestrator(),
            self.tuning(),
            self.clock(),
        )
    }
}
