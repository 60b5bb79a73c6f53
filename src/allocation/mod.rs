pub mod engine;
pub mod recorder;

pub use engine::{plan_allocation, AllocationEngine, AllocationPlan, ApplicationDraft};
pub use recorder::{AllocationRecorder, CommitReceipt, UnitLockMap};
