use std::{cmp::Ordering, collections::BTreeMap};

use crate::{
	Error, Result,
	search::{Candidate, FusedCandidate},
};
use rift_config::Fusion;

/// Weighted reciprocal rank fusion of the lexical and vector lists.
///
/// The output holds one entry per `doc_id`, ordered by fused score descending with ties broken by
/// `doc_id` ascending, so the result does not depend on input interleaving.
pub fn fuse(
	lexical: &[Candidate],
	vector: &[Candidate],
	weights: &Fusion,
) -> Result<Vec<FusedCandidate>> {
	let mut merged: BTreeMap<&str, Candidate> = BTreeMap::new();

	for candidate in lexical.iter().chain(vector) {
		if candidate.lexical_rank.is_none() && candidate.vector_rank.is_none() {
			return Err(Error::InvalidCandidate {
				message: format!(
					"Candidate {} has neither a lexical nor a vector rank.",
					candidate.doc_id
				),
			});
		}

		match merged.get_mut(candidate.doc_id.as_str()) {
			Some(existing) => merge_candidate(existing, candidate),
			None => {
				merged.insert(candidate.doc_id.as_str(), candidate.clone());
			},
		}
	}

	let mut out: Vec<FusedCandidate> = merged
		.into_values()
		.map(|candidate| {
			let fused_score = fused_score(&candidate, weights);

			FusedCandidate { candidate, fused_score, survived_prefilter: false }
		})
		.collect();

	out.sort_by(|left, right| {
		cmp_f64_desc(left.fused_score, right.fused_score)
			.then_with(|| left.candidate.doc_id.cmp(&right.candidate.doc_id))
	});

	Ok(out)
}

pub fn fused_score(candidate: &Candidate, weights: &Fusion) -> f64 {
	let lexical = candidate
		.lexical_rank
		.map(|rank| weights.lexical_weight / (weights.k + rank as f64))
		.unwrap_or(0.0);
	let vector = candidate
		.vector_rank
		.map(|rank| weights.vector_weight / (weights.k + rank as f64))
		.unwrap_or(0.0);

	lexical + vector
}

pub fn cmp_f64_desc(a: f64, b: f64) -> Ordering {
	match (a.is_nan(), b.is_nan()) {
		(true, true) => Ordering::Equal,
		(true, false) => Ordering::Greater,
		(false, true) => Ordering::Less,
		(false, false) => b.partial_cmp(&a).unwrap_or(Ordering::Equal),
	}
}

fn merge_candidate(existing: &mut Candidate, other: &Candidate) {
	existing.lexical_rank = min_rank(existing.lexical_rank, other.lexical_rank);
	existing.vector_rank = min_rank(existing.vector_rank, other.vector_rank);
	existing.lexical_score = existing.lexical_score.or(other.lexical_score);
	existing.vector_score = existing.vector_score.or(other.vector_score);

	if existing.source_path.is_empty() {
		existing.source_path = other.source_path.clone();
	}
	if existing.snippet.is_empty() {
		existing.snippet = other.snippet.clone();
	}
}

fn min_rank(lhs: Option<u32>, rhs: Option<u32>) -> Option<u32> {
	match (lhs, rhs) {
		(Some(l), Some(r)) => Some(l.min(r)),
		(l, r) => l.or(r),
	}
}
