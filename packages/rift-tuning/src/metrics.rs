use std::collections::HashSet;

use crate::evaluation::{AggregateMetrics, QueryMetrics};

pub struct Scored {
	pub precision: f64,
	pub recall: f64,
	pub rr: f64,
	pub faithfulness: f64,
}

/// Precision and recall over the packed context, reciprocal rank of the first hit, and whether
/// the evidence slot (position 0) is an expected document.
pub fn compute_metrics(retrieved: &[String], expected: &HashSet<&str>) -> Scored {
	let relevant_count =
		retrieved.iter().filter(|doc_id| expected.contains(doc_id.as_str())).count();
	let rr = retrieved
		.iter()
		.position(|doc_id| expected.contains(doc_id.as_str()))
		.map(|idx| 1.0 / (idx + 1) as f64)
		.unwrap_or(0.0);
	let faithfulness = match retrieved.first() {
		Some(doc_id) if expected.contains(doc_id.as_str()) => 1.0,
		_ => 0.0,
	};
	let precision =
		if retrieved.is_empty() { 0.0 } else { relevant_count as f64 / retrieved.len() as f64 };
	let recall =
		if expected.is_empty() { 0.0 } else { relevant_count as f64 / expected.len() as f64 };

	Scored { precision, recall, rr, faithfulness }
}

/// Means over every query, with F1 taken from the mean precision and mean recall. Failed queries
/// count as zeros.
pub fn summarize(per_query: &[QueryMetrics]) -> AggregateMetrics {
	let count = per_query.len().max(1) as f64;
	let precision = per_query.iter().map(|q| q.precision).sum::<f64>() / count;
	let recall = per_query.iter().map(|q| q.recall).sum::<f64>() / count;
	let faithfulness = per_query.iter().map(|q| q.faithfulness).sum::<f64>() / count;
	let mrr = per_query.iter().map(|q| q.rr).sum::<f64>() / count;
	let f1 = f1(precision, recall);
	let mut latencies: Vec<f64> = per_query.iter().map(|q| q.latency_ms).collect();

	latencies.sort_by(|a, b| a.total_cmp(b));

	AggregateMetrics {
		precision,
		recall,
		f1,
		faithfulness,
		mrr,
		latency_ms_p50: percentile(&latencies, 0.50),
		latency_ms_p95: percentile(&latencies, 0.95),
	}
}

pub fn f1(precision: f64, recall: f64) -> f64 {
	if precision + recall <= 0.0 { 0.0 } else { 2.0 * precision * recall / (precision + recall) }
}

/// Linear interpolation over already sorted values.
pub fn percentile(values: &[f64], percentile: f64) -> f64 {
	if values.is_empty() {
		return 0.0;
	}

	let clamped = percentile.clamp(0.0, 1.0);
	let pos = clamped * (values.len() as f64 - 1.0);
	let lower = pos.floor() as usize;
	let upper = pos.ceil() as usize;

	if lower == upper {
		values[lower]
	} else {
		let weight = pos - lower as f64;

		values[lower] * (1.0 - weight) + values[upper] * weight
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn ids(raw: &[&str]) -> Vec<String> {
		raw.iter().map(|id| id.to_string()).collect()
	}

	#[test]
	fn metrics_count_hits_and_evidence_slot() {
		let expected: HashSet<&str> = ["b", "z"].into_iter().collect();
		let scored = compute_metrics(&ids(&["a", "b", "c", "d"]), &expected);

		assert_eq!(scored.precision, 0.25);
		assert_eq!(scored.recall, 0.5);
		assert_eq!(scored.rr, 0.5);
		assert_eq!(scored.faithfulness, 0.0);
	}

	#[test]
	fn percentile_interpolates() {
		assert_eq!(percentile(&[], 0.5), 0.0);
		assert_eq!(percentile(&[1.0, 3.0], 0.5), 2.0);
		assert_eq!(percentile(&[1.0, 2.0, 3.0], 1.0), 3.0);
	}

	#[test]
	fn f1_of_zero_is_zero() {
		assert_eq!(f1(0.0, 0.0), 0.0);
		assert!((f1(0.5, 1.0) - 2.0 / 3.0).abs() < 1e-12);
	}
}
