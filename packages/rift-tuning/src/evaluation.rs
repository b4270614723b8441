use std::{fs, path::Path};

use serde::{Deserialize, Serialize};

use crate::{Error, Result};
use rift_config::GateStep;
use rift_domain::intent::Intent;

#[derive(Clone, Debug, Deserialize)]
pub struct EvalDataset {
	#[serde(default)]
	pub name: Option<String>,
	pub queries: Vec<LabeledQuery>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LabeledQuery {
	#[serde(default)]
	pub id: Option<String>,
	pub query: String,
	#[serde(default)]
	pub intent: Option<Intent>,
	pub expected_doc_ids: Vec<String>,
}
impl LabeledQuery {
	pub fn new(query: impl Into<String>, expected: &[&str]) -> Self {
		Self {
			id: None,
			query: query.into(),
			intent: None,
			expected_doc_ids: expected.iter().map(|id| id.to_string()).collect(),
		}
	}

	/// Dataset id, or the 1-based position when the dataset leaves it out.
	pub fn label(&self, index: usize) -> String {
		self.id.clone().unwrap_or_else(|| format!("q{}", index + 1))
	}
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct QueryMetrics {
	pub id: String,
	pub query: String,
	pub retrieved_doc_ids: Vec<String>,
	pub precision: f64,
	pub recall: f64,
	pub rr: f64,
	/// 1.0 when the evidence slot holds an expected document.
	pub faithfulness: f64,
	pub latency_ms: f64,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub error: Option<String>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct AggregateMetrics {
	pub precision: f64,
	pub recall: f64,
	pub f1: f64,
	pub faithfulness: f64,
	pub mrr: f64,
	pub latency_ms_p50: f64,
	pub latency_ms_p95: f64,
}
impl AggregateMetrics {
	pub fn satisfies(&self, step: &GateStep) -> bool {
		self.precision >= step.precision_min
			&& self.recall >= step.recall_min
			&& self.faithfulness >= step.faithfulness_min
	}

	/// Strictly worse than `baseline` on precision, recall, F1 and faithfulness at once.
	pub fn regresses_everywhere(&self, baseline: &Self) -> bool {
		self.precision < baseline.precision
			&& self.recall < baseline.recall
			&& self.f1 < baseline.f1
			&& self.faithfulness < baseline.faithfulness
	}
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct HarnessReport {
	pub config_version: u64,
	pub per_query: Vec<QueryMetrics>,
	pub aggregate: AggregateMetrics,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EvaluationResult {
	pub run_id: String,
	pub config_version: u64,
	pub gate_step: usize,
	pub thresholds: GateStep,
	pub passed: bool,
	pub aggregate: AggregateMetrics,
	pub per_query: Vec<QueryMetrics>,
	pub recorded_at: String,
}

pub fn load_dataset(path: &Path) -> Result<EvalDataset> {
	let raw = fs::read_to_string(path).map_err(|err| Error::store(path, err))?;
	let dataset: EvalDataset = serde_json::from_str(&raw).map_err(|err| Error::store(path, err))?;

	if dataset.queries.is_empty() {
		return Err(Error::Validation {
			message: "Dataset must include at least one query.".to_string(),
		});
	}
	if let Some(index) = dataset.queries.iter().position(|query| query.query.trim().is_empty()) {
		return Err(Error::Validation {
			message: format!("Dataset query {} must be non-empty.", index + 1),
		});
	}

	Ok(dataset)
}
