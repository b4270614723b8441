pub mod controller;
pub mod evaluation;
pub mod gate;
pub mod harness;
pub mod metrics;
pub mod store;
pub mod sweep;

mod error;

pub use controller::{CycleReport, Publication, TuningController};
pub use error::{Error, Result};
pub use evaluation::{
	AggregateMetrics, EvalDataset, EvaluationResult, HarnessReport, LabeledQuery, QueryMetrics,
	load_dataset,
};
pub use gate::{GateRatchet, RatchetOutcome, RatchetState, REQUIRED_CONSECUTIVE_PASSES};
pub use harness::{EvaluationHarness, ReplayHarness};
pub use store::{GateRecord, StateStore};
pub use sweep::{SweepReport, run_sweep};
