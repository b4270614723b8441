use std::collections::HashSet;

use crate::{
	Error, Result,
	search::{RerankedCandidate, ranking::fusion},
};
use rift_config::Packing;
use rift_domain::text;

const MAX_SNIPPET_TERMS: usize = 1_024;

#[derive(Clone, Debug, PartialEq)]
pub struct Packed {
	pub candidates: Vec<RerankedCandidate>,
	pub used_tokens: u32,
}

#[derive(Clone, Copy)]
struct DiversityPick {
	remaining_pos: usize,
	mmr_score: f64,
	pool_idx: usize,
}
impl DiversityPick {
	fn better_than(self, other: &Self) -> bool {
		self.mmr_score > other.mmr_score
			|| (self.mmr_score == other.mmr_score && self.pool_idx < other.pool_idx)
	}
}

/// Maximal marginal relevance packing under the context token budget.
///
/// The first pick is always the most relevant candidate. When it alone exceeds the budget its
/// snippet is truncated to fit; any later candidate that would overflow is skipped while smaller
/// ones may still fit.
pub fn pack(mut pool: Vec<RerankedCandidate>, policy: &Packing) -> Result<Packed> {
	if pool.is_empty() {
		return Err(Error::EmptyAnswer {
			message: "No candidates reached the packer.".to_string(),
		});
	}

	pool.sort_by(|left, right| {
		fusion::cmp_f64_desc(left.final_score, right.final_score)
			.then_with(|| fusion::cmp_f64_desc(left.fused.fused_score, right.fused.fused_score))
			.then_with(|| left.fused.candidate.doc_id.cmp(&right.fused.candidate.doc_id))
	});

	let cap = policy.context_cap_tokens;
	let lambda = policy.mmr_lambda;
	let relevance = normalized_relevance(&pool);
	let terms: Vec<HashSet<String>> = pool
		.iter()
		.map(|candidate| {
			text::tokenize_text_terms(&candidate.fused.candidate.snippet, MAX_SNIPPET_TERMS)
		})
		.collect();
	let mut remaining: Vec<usize> = (0..pool.len()).collect();
	let mut selected: Vec<usize> = Vec::new();
	let mut truncated_first: Option<String> = None;
	let mut used_tokens = 0_u32;

	while !remaining.is_empty() {
		let mut best: Option<DiversityPick> = None;

		for (remaining_pos, pool_idx) in remaining.iter().copied().enumerate() {
			let redundancy = selected
				.iter()
				.map(|chosen| similarity(&pool, &terms, pool_idx, *chosen))
				.fold(0.0_f64, f64::max);
			let pick = DiversityPick {
				remaining_pos,
				mmr_score: lambda * relevance[pool_idx] - (1.0 - lambda) * redundancy,
				pool_idx,
			};

			if best.as_ref().map(|current| pick.better_than(current)).unwrap_or(true) {
				best = Some(pick);
			}
		}

		let Some(pick) = best else { break };

		remaining.remove(pick.remaining_pos);

		let cost = text::estimate_tokens(&pool[pick.pool_idx].fused.candidate.snippet);

		if used_tokens.saturating_add(cost) <= cap {
			used_tokens += cost;

			selected.push(pick.pool_idx);

			continue;
		}
		if selected.is_empty() {
			let original = &pool[pick.pool_idx].fused.candidate.snippet;
			let snippet = text::truncate_to_tokens(original, cap);

			used_tokens = text::estimate_tokens(&snippet);
			truncated_first = Some(snippet);

			tracing::debug!(
				doc_id = pool[pick.pool_idx].fused.candidate.doc_id.as_str(),
				cost,
				cap,
				"Truncated top candidate to fit the context budget."
			);
			selected.push(pick.pool_idx);

			continue;
		}

		tracing::debug!(
			doc_id = pool[pick.pool_idx].fused.candidate.doc_id.as_str(),
			cost,
			used_tokens,
			cap,
			"Skipped candidate over the context budget."
		);
	}

	let mut slots: Vec<Option<RerankedCandidate>> = pool.into_iter().map(Some).collect();
	let mut candidates = Vec::with_capacity(selected.len());

	for (rank, idx) in selected.into_iter().enumerate() {
		let Some(mut candidate) = slots[idx].take() else { continue };

		if rank == 0
			&& let Some(snippet) = truncated_first.take()
		{
			candidate.fused.candidate.snippet = snippet;
		}

		candidates.push(candidate);
	}

	if candidates.is_empty() {
		return Err(Error::EmptyAnswer { message: "Packer selected no candidates.".to_string() });
	}

	Ok(Packed { candidates, used_tokens })
}

/// Min-max normalized final scores. A pool with a single distinct score is uniformly relevant.
fn normalized_relevance(pool: &[RerankedCandidate]) -> Vec<f64> {
	let finite = pool.iter().map(|candidate| candidate.final_score).filter(|s| s.is_finite());
	let (min, max) = finite.fold((f64::INFINITY, f64::NEG_INFINITY), |(min, max), score| {
		(min.min(score), max.max(score))
	});
	let span = max - min;

	pool.iter()
		.map(|candidate| {
			let score = candidate.final_score;

			if !score.is_finite() {
				0.0
			} else if span.is_finite() && span > f64::EPSILON {
				((score - min) / span).clamp(0.0, 1.0)
			} else {
				1.0
			}
		})
		.collect()
}

fn similarity(
	pool: &[RerankedCandidate],
	terms: &[HashSet<String>],
	lhs: usize,
	rhs: usize,
) -> f64 {
	if pool[lhs].fused.candidate.doc_id == pool[rhs].fused.candidate.doc_id {
		return 1.0;
	}

	text::jaccard(&terms[lhs], &terms[rhs])
}
