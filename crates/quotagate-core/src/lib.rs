//! Core infrastructure for the quotagate admission-control workspace.
//!
//! This crate provides the shared seams used across all quotagate components:
//! - Injectable clock (wall time + sleep) so control loops and rate windows
//!   are testable without real time
//! - Event system for observability
//! - The work-item area model and object-store seam
//! - Orchestrator signals (running workers/pipelines, failure events)

pub mod area;
pub mod clock;
pub mod events;
pub mod object_store;
pub mod orchestrator;

pub use area::Area;
pub use clock::{Clock, ManualClock, SystemClock};
pub use events::{ComponentEvent, EventListener, EventListeners, FnListener};
pub use object_store::{MemoryObjectStore, ObjectInfo, ObjectStore, ObjectStoreError};
pub use orchestrator::{Orchestrator, OrchestratorError, PipelineFailure, StaticOrchestrator};
