use tokio_util::sync::CancellationToken;

use crate::{
	Error, Providers, Result,
	search::{
		Candidate, FusedCandidate, Query, RerankedCandidate,
		ranking::{self, Packed, ResolvedIntentPolicy},
	},
};
use rift_domain::{evidence, intent::Intent, text};

/// Put the exact identifier match of a lookup query in front of its packed context.
///
/// A match already in the context is promoted to the first slot. Otherwise the lexical index is
/// re-queried and its best exact match is spliced in. Returns whether a splice happened.
pub(crate) async fn ensure_exact_match(
	providers: &Providers,
	query: &Query,
	packed: &mut Packed,
	policy: &ResolvedIntentPolicy,
	cancel: &CancellationToken,
) -> Result<bool> {
	if query.intent != Intent::Lookup || evidence::identifier_terms(&query.text).is_empty() {
		return Ok(false);
	}

	let matched = packed
		.candidates
		.iter()
		.position(|candidate| has_key_match(&query.text, &candidate.fused.candidate));

	match matched {
		Some(0) => Ok(false),
		Some(position) => {
			let candidate = packed.candidates.remove(position);

			tracing::debug!(
				doc_id = candidate.fused.candidate.doc_id.as_str(),
				from = position,
				"Promoted exact match to the evidence slot."
			);
			packed.candidates.insert(0, candidate);

			Ok(false)
		},
		None => splice(providers, query, packed, policy, cancel).await,
	}
}

/// Index failures leave `packed` untouched.
async fn splice(
	providers: &Providers,
	query: &Query,
	packed: &mut Packed,
	policy: &ResolvedIntentPolicy,
	cancel: &CancellationToken,
) -> Result<bool> {
	let top_k = policy.packing.lookup_backstop_k;
	let hits = tokio::select! {
		biased;
		_ = cancel.cancelled() => return Err(Error::Cancelled),
		hits = providers.lexical.search(&query.text, top_k) => hits,
	};
	let hits = match hits {
		Ok(hits) => hits,
		Err(err) => {
			tracing::warn!(error = %err, top_k, "Lookup backstop search failed.");

			return Ok(false);
		},
	};
	let exact = hits.into_iter().take(top_k as usize).enumerate().find(|(_, hit)| {
		evidence::key_match(&query.text, &hit.snippet)
			|| evidence::key_match(&query.text, &hit.source_path)
	});
	let Some((position, hit)) = exact else {
		tracing::debug!(top_k, "Lookup backstop found no exact match.");

		return Ok(false);
	};
	let cap = policy.packing.context_cap_tokens;
	let mut snippet = hit.snippet;

	if text::estimate_tokens(&snippet) > cap {
		snippet = text::truncate_to_tokens(&snippet, cap);
	}

	let candidate = Candidate {
		doc_id: hit.doc_id,
		source_path: hit.source_path,
		snippet,
		lexical_rank: Some(position as u32 + 1),
		vector_rank: None,
		lexical_score: hit.score,
		vector_score: None,
	};
	let fused_score = ranking::fused_score(&candidate, &policy.fusion);
	let cost = text::estimate_tokens(&candidate.snippet);

	packed.candidates.retain(|existing| existing.fused.candidate.doc_id != candidate.doc_id);

	let mut used_tokens = token_total(&packed.candidates);
	let mut evicted = 0_usize;

	while used_tokens.saturating_add(cost) > cap {
		let Some(dropped) = packed.candidates.pop() else { break };

		let freed = text::estimate_tokens(&dropped.fused.candidate.snippet);

		used_tokens = used_tokens.saturating_sub(freed);
		evicted += 1;
	}

	tracing::info!(
		doc_id = candidate.doc_id.as_str(),
		lexical_rank = position + 1,
		evicted,
		"Lookup backstop spliced an exact match."
	);

	packed.candidates.insert(0, RerankedCandidate {
		fused: FusedCandidate { candidate, fused_score, survived_prefilter: false },
		rerank_score: None,
		final_score: fused_score,
	});
	packed.used_tokens = used_tokens + cost;

	Ok(true)
}

fn has_key_match(query: &str, candidate: &Candidate) -> bool {
	evidence::key_match(query, &candidate.snippet)
		|| evidence::key_match(query, &candidate.source_path)
}

fn token_total(candidates: &[RerankedCandidate]) -> u32 {
	candidates
		.iter()
		.map(|candidate| text::estimate_tokens(&candidate.fused.candidate.snippet))
		.fold(0_u32, u32::saturating_add)
}
