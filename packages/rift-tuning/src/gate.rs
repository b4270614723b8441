use serde::{Deserialize, Serialize};

use crate::{Error, Result, evaluation::AggregateMetrics};
use rift_config::GateStep;

pub const REQUIRED_CONSECUTIVE_PASSES: u32 = 2;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RatchetState {
	/// Bumped on every recorded observation.
	pub version: u64,
	pub step_index: usize,
	pub consecutive_passes: u32,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum RatchetOutcome {
	/// A pass that has not yet reached the required streak.
	Counting { consecutive_passes: u32 },
	Advanced { from: usize, to: usize },
	/// A failure. The step is kept and the streak restarts.
	Reset { step_index: usize },
	/// A pass at the last step. Recorded but nothing left to advance to.
	Final { consecutive_passes: u32 },
}

/// One-way threshold ratchet over the configured gate steps.
#[derive(Clone, Debug, PartialEq)]
pub struct GateRatchet {
	steps: Vec<GateStep>,
	state: RatchetState,
}
impl GateRatchet {
	pub fn new(steps: Vec<GateStep>, state: RatchetState) -> Result<Self> {
		if steps.is_empty() {
			return Err(Error::Validation {
				message: "Gate must have at least one step.".to_string(),
			});
		}
		if state.step_index >= steps.len() {
			return Err(Error::Validation {
				message: format!(
					"Ratchet step {} is out of range for {} gate steps.",
					state.step_index,
					steps.len()
				),
			});
		}

		Ok(Self { steps, state })
	}

	pub fn steps(&self) -> &[GateStep] {
		&self.steps
	}

	pub fn state(&self) -> RatchetState {
		self.state
	}

	pub fn current_step(&self) -> &GateStep {
		&self.steps[self.state.step_index]
	}

	pub fn is_final(&self) -> bool {
		self.state.step_index + 1 == self.steps.len()
	}

	pub fn judge(&self, metrics: &AggregateMetrics) -> bool {
		metrics.satisfies(self.current_step())
	}

	pub fn observe(&mut self, passed: bool) -> RatchetOutcome {
		self.state.version = self.state.version.saturating_add(1);

		if !passed {
			self.state.consecutive_passes = 0;

			tracing::info!(step_index = self.state.step_index, "Gate run failed. Streak reset.");

			return RatchetOutcome::Reset { step_index: self.state.step_index };
		}

		self.state.consecutive_passes = self.state.consecutive_passes.saturating_add(1);

		if self.is_final() {
			return RatchetOutcome::Final { consecutive_passes: self.state.consecutive_passes };
		}
		if self.state.consecutive_passes < REQUIRED_CONSECUTIVE_PASSES {
			return RatchetOutcome::Counting { consecutive_passes: self.state.consecutive_passes };
		}

		let from = self.state.step_index;

		self.state.step_index += 1;
		self.state.consecutive_passes = 0;

		tracing::info!(from, to = self.state.step_index, "Gate ratchet advanced.");

		RatchetOutcome::Advanced { from, to: self.state.step_index }
	}
}
