use std::sync::Arc;

use serde::Serialize;
use time::{OffsetDateTime, format_description::well_known::Rfc3339};
use uuid::Uuid;

use crate::{
	Error, Result,
	evaluation::{EvaluationResult, LabeledQuery},
	gate::{GateRatchet, RatchetOutcome, RatchetState},
	harness::EvaluationHarness,
	store::{GateRecord, StateStore},
	sweep::{self, SweepReport},
};
use rift_config::{Gate, PipelineConfig, Tuning};
use rift_service::ConfigStore;

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Publication {
	Published { version: u64 },
	/// The sweep found nothing better than the live config.
	Unchanged,
	/// The tuned config missed the current gate step.
	Held { reason: String },
}

#[derive(Clone, Debug, Serialize)]
pub struct CycleReport {
	pub dry_run: bool,
	pub evaluation: EvaluationResult,
	pub ratchet: RatchetOutcome,
	pub ratchet_state: RatchetState,
	pub sweep: SweepReport,
	pub publication: Publication,
}

/// Sole writer of the published pipeline config and the gate state.
pub struct TuningController {
	config: Arc<ConfigStore>,
	harness: Arc<dyn EvaluationHarness>,
	store: StateStore,
	ratchet: GateRatchet,
	tuning: Tuning,
}
impl TuningController {
	/// Restores persisted state. A stored gate wins over `gate`, which only seeds a fresh store.
	/// A stored snapshot newer than the live config is published on open.
	pub fn open(
		config: Arc<ConfigStore>,
		harness: Arc<dyn EvaluationHarness>,
		store: StateStore,
		tuning: Tuning,
		gate: &Gate,
	) -> Result<Self> {
		let ratchet = match store.load_gate()? {
			Some(record) => GateRatchet::new(record.steps, record.ratchet)?,
			None => GateRatchet::new(gate.steps.clone(), RatchetState::default())?,
		};

		if let Some(stored) = store.load_current_config()?
			&& stored.version > config.version()
		{
			tracing::info!(version = stored.version, "Restoring stored pipeline config.");
			config.publish(stored)?;
		}

		Ok(Self { config, harness, store, ratchet, tuning })
	}

	pub fn ratchet(&self) -> &GateRatchet {
		&self.ratchet
	}

	pub fn store(&self) -> &StateStore {
		&self.store
	}

	/// Evaluate the live config, feed the gate, sweep, and publish an improvement that passes the
	/// current gate step. With `dry_run` nothing is written or published.
	pub async fn run_cycle(
		&mut self,
		queries: &[LabeledQuery],
		dry_run: bool,
	) -> Result<CycleReport> {
		if queries.is_empty() {
			return Err(Error::Validation {
				message: "A tuning cycle needs at least one labeled query.".to_string(),
			});
		}

		let base = self.config.current();
		let baseline = self.harness.evaluate(&base, queries).await?;
		let step_index = self.ratchet.state().step_index;
		let passed = self.ratchet.judge(&baseline.aggregate);
		let evaluation = EvaluationResult {
			run_id: Uuid::new_v4().to_string(),
			config_version: base.version,
			gate_step: step_index,
			thresholds: *self.ratchet.current_step(),
			passed,
			aggregate: baseline.aggregate,
			per_query: baseline.per_query.clone(),
			recorded_at: now_rfc3339()?,
		};

		tracing::info!(
			run_id = evaluation.run_id.as_str(),
			config_version = base.version,
			gate_step = step_index,
			passed,
			precision = baseline.aggregate.precision,
			recall = baseline.aggregate.recall,
			faithfulness = baseline.aggregate.faithfulness,
			"Baseline evaluated."
		);

		let sweep =
			sweep::run_sweep(self.harness.as_ref(), &base, &baseline, &self.tuning, queries)
				.await?;

		if dry_run {
			let mut preview = self.ratchet.clone();
			let ratchet = preview.observe(passed);
			let publication = decide(&preview, &base, &sweep);

			return Ok(CycleReport {
				dry_run,
				evaluation,
				ratchet,
				ratchet_state: preview.state(),
				sweep,
				publication,
			});
		}

		if self.store.current_version()?.is_none_or(|stored| stored < base.version) {
			self.store.save_config(&base)?;
		}

		self.store.append_evaluation(&evaluation)?;

		let ratchet = self.ratchet.observe(passed);

		self.store.save_gate(&GateRecord::from(&self.ratchet))?;

		let publication = match decide(&self.ratchet, &base, &sweep) {
			Publication::Published { .. } => {
				let next = PipelineConfig { version: base.version + 1, ..sweep.config.clone() };

				self.store.save_config(&next)?;

				let published = self.config.publish(next)?;

				Publication::Published { version: published.version }
			},
			other => other,
		};

		Ok(CycleReport {
			dry_run,
			evaluation,
			ratchet,
			ratchet_state: self.ratchet.state(),
			sweep,
			publication,
		})
	}
}

/// Judges the tuned metrics against the step the ratchet sits on after recording this cycle.
fn decide(ratchet: &GateRatchet, base: &PipelineConfig, sweep: &SweepReport) -> Publication {
	if !sweep.improved() {
		return Publication::Unchanged;
	}
	if !ratchet.judge(&sweep.best) {
		let step = ratchet.current_step();
		let reason = format!(
			"Tuned metrics (precision {:.3}, recall {:.3}, faithfulness {:.3}) miss gate step {} \
			(precision {:.3}, recall {:.3}, faithfulness {:.3}).",
			sweep.best.precision,
			sweep.best.recall,
			sweep.best.faithfulness,
			ratchet.state().step_index,
			step.precision_min,
			step.recall_min,
			step.faithfulness_min,
		);

		tracing::info!(reason = reason.as_str(), "Tuned config held back.");

		return Publication::Held { reason };
	}

	Publication::Published { version: base.version + 1 }
}

fn now_rfc3339() -> Result<String> {
	OffsetDateTime::now_utc()
		.format(&Rfc3339)
		.map_err(|err| Error::Validation { message: format!("Failed to format timestamp: {err}.") })
}
