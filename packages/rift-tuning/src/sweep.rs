use serde::Serialize;

use crate::{
	Error, Result,
	evaluation::{AggregateMetrics, HarnessReport, LabeledQuery},
	harness::EvaluationHarness,
};
use rift_config::{Knob, PipelineConfig, Tuning, TuningPhase};

const VALUE_EPSILON: f64 = 1e-9;

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SweepReport {
	/// Best knob settings found. Carries the baseline version until published.
	pub config: PipelineConfig,
	pub baseline: AggregateMetrics,
	pub best: AggregateMetrics,
	pub accepted: Vec<AcceptedValue>,
	pub divergences: Vec<Divergence>,
	pub skipped: Vec<SkippedDimension>,
	pub evaluations: usize,
}
impl SweepReport {
	pub fn improved(&self) -> bool {
		!self.accepted.is_empty()
	}
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct AcceptedValue {
	pub phase: TuningPhase,
	pub knob: Knob,
	pub from: f64,
	pub to: f64,
	pub objective: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Divergence {
	pub phase: TuningPhase,
	pub knob: Knob,
	pub value: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SkippedDimension {
	pub phase: TuningPhase,
	pub knob: Knob,
}

struct Contender {
	value: f64,
	config: PipelineConfig,
	metrics: AggregateMetrics,
	score: f64,
}

pub fn knob_value(cfg: &PipelineConfig, knob: Knob) -> f64 {
	match knob {
		Knob::LexicalTopK => cfg.retrieval.lexical_top_k as f64,
		Knob::VectorTopK => cfg.retrieval.vector_top_k as f64,
		Knob::FusionK => cfg.fusion.k,
		Knob::LexicalWeight => cfg.fusion.lexical_weight,
		Knob::VectorWeight => cfg.fusion.vector_weight,
		Knob::CosineMin => cfg.prefilter.cosine_min,
		Knob::Bm25BackstopRank => cfg.prefilter.bm25_backstop_rank as f64,
		Knob::KeepTopFused => cfg.prefilter.keep_top_fused as f64,
		Knob::RerankAlpha => cfg.rerank.alpha,
		Knob::SelectTopN => cfg.rerank.select_top_n as f64,
		Knob::MmrLambda => cfg.packing.mmr_lambda,
		Knob::ContextCapTokens => cfg.packing.context_cap_tokens as f64,
	}
}

/// A copy of `cfg` with one knob changed. The version is left alone.
pub fn apply_knob(cfg: &PipelineConfig, knob: Knob, value: f64) -> PipelineConfig {
	let mut next = cfg.clone();
	let count = value.round().max(0.0) as u32;

	match knob {
		Knob::LexicalTopK => next.retrieval.lexical_top_k = count,
		Knob::VectorTopK => next.retrieval.vector_top_k = count,
		Knob::FusionK => next.fusion.k = value,
		Knob::LexicalWeight => next.fusion.lexical_weight = value,
		Knob::VectorWeight => next.fusion.vector_weight = value,
		Knob::CosineMin => next.prefilter.cosine_min = value,
		Knob::Bm25BackstopRank => next.prefilter.bm25_backstop_rank = count,
		Knob::KeepTopFused => next.prefilter.keep_top_fused = count,
		Knob::RerankAlpha => next.rerank.alpha = value,
		Knob::SelectTopN => next.rerank.select_top_n = count,
		Knob::MmrLambda => next.packing.mmr_lambda = value,
		Knob::ContextCapTokens => next.packing.context_cap_tokens = count,
	}

	next
}

/// The phase objective, or `None` when `metrics` break the phase's floor.
pub fn objective(phase: TuningPhase, metrics: &AggregateMetrics, tuning: &Tuning) -> Option<f64> {
	let precision_ok = metrics.precision >= tuning.precision_floor;
	let recall_ok = metrics.recall >= tuning.recall_floor;

	match phase {
		TuningPhase::Recall => precision_ok.then_some(metrics.recall),
		TuningPhase::Precision => recall_ok.then_some(metrics.precision),
		TuningPhase::Balanced => (precision_ok && recall_ok).then_some(metrics.f1),
	}
}

/// Coordinate ascent over the configured dimensions, one phase at a time.
///
/// Each dimension is swept with every other knob fixed at the incumbent. A value replaces the
/// incumbent only if it is feasible and strictly improves the phase objective. Values that
/// regress every metric are reported as divergences and never kept.
pub async fn run_sweep(
	harness: &dyn EvaluationHarness,
	base: &PipelineConfig,
	baseline: &HarnessReport,
	tuning: &Tuning,
	queries: &[LabeledQuery],
) -> Result<SweepReport> {
	let mut incumbent = base.clone();
	let mut incumbent_metrics = baseline.aggregate;
	let mut accepted = Vec::new();
	let mut divergences = Vec::new();
	let mut skipped = Vec::new();
	let mut evaluations = 0_usize;

	for &phase in &tuning.phases {
		for dimension in &tuning.dimensions {
			let knob = dimension.knob;
			let current = knob_value(&incumbent, knob);
			let mut attempted = 0_usize;
			let mut failed = 0_usize;
			let mut best: Option<Contender> = None;

			for &value in &dimension.values {
				let candidate = apply_knob(&incumbent, knob, value);
				let applied = knob_value(&candidate, knob);

				if (applied - current).abs() < VALUE_EPSILON {
					continue;
				}
				if let Err(err) = rift_config::validate_pipeline(&candidate) {
					tracing::debug!(
						error = %err,
						knob = knob.as_str(),
						value = applied,
						"Sweep value produces an invalid config."
					);

					continue;
				}

				attempted += 1;

				let report = match harness.evaluate(&candidate, queries).await {
					Ok(report) => report,
					Err(err) => {
						failed += 1;

						tracing::warn!(
							error = %err,
							phase = phase.as_str(),
							knob = knob.as_str(),
							value = applied,
							"Sweep evaluation failed. Skipping value."
						);

						continue;
					},
				};

				evaluations += 1;

				if report.aggregate.regresses_everywhere(&incumbent_metrics) {
					let err = Error::TuningDivergence {
						dimension: knob.as_str().to_string(),
						value: applied,
					};

					tracing::warn!(error = %err, phase = phase.as_str(), "Divergent sweep value.");
					divergences.push(Divergence { phase, knob, value: applied });

					continue;
				}

				let Some(score) = objective(phase, &report.aggregate, tuning) else { continue };

				if best.as_ref().is_none_or(|best| score > best.score) {
					best = Some(Contender {
						value: applied,
						config: candidate,
						metrics: report.aggregate,
						score,
					});
				}
			}

			if attempted > 0 && failed == attempted {
				tracing::warn!(
					phase = phase.as_str(),
					knob = knob.as_str(),
					"Every sweep value failed. Dimension skipped."
				);
				skipped.push(SkippedDimension { phase, knob });

				continue;
			}

			let Some(best) = best else { continue };
			let incumbent_score = objective(phase, &incumbent_metrics, tuning);

			if incumbent_score.is_some_and(|score| best.score <= score) {
				continue;
			}

			tracing::info!(
				phase = phase.as_str(),
				knob = knob.as_str(),
				from = current,
				to = best.value,
				objective = best.score,
				"Sweep accepted a new value."
			);
			accepted.push(AcceptedValue {
				phase,
				knob,
				from: current,
				to: best.value,
				objective: best.score,
			});

			incumbent = best.config;
			incumbent_metrics = best.metrics;
		}
	}

	Ok(SweepReport {
		config: incumbent,
		baseline: baseline.aggregate,
		best: incumbent_metrics,
		accepted,
		divergences,
		skipped,
		evaluations,
	})
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn integer_knobs_round_and_keep_version() {
		let base = PipelineConfig::default();
		let next = apply_knob(&base, Knob::SelectTopN, 6.6);

		assert_eq!(next.rerank.select_top_n, 7);
		assert_eq!(next.version, base.version);
		assert_eq!(knob_value(&next, Knob::SelectTopN), 7.0);
	}

	#[test]
	fn objective_respects_floors() {
		let tuning = Tuning { precision_floor: 0.4, recall_floor: 0.5, ..Tuning::default() };
		let metrics = AggregateMetrics {
			precision: 0.3,
			recall: 0.9,
			f1: 0.45,
			..AggregateMetrics::default()
		};

		assert_eq!(objective(TuningPhase::Recall, &metrics, &tuning), None);
		assert_eq!(objective(TuningPhase::Precision, &metrics, &tuning), Some(0.3));
		assert_eq!(objective(TuningPhase::Balanced, &metrics, &tuning), None);
	}
}
