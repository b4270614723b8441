use std::{cmp::Ordering, time::Duration};

use tokio_util::sync::CancellationToken;

use crate::{
	Error, RerankDocument, RerankProvider, Result,
	search::{FusedCandidate, Query, RerankedCandidate, ranking::fusion},
};
use rift_config::{Rerank, RerankProviderConfig};
use rift_domain::evidence;

/// Timeout and retry budget for the single batched rerank call of a query.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RerankCallPolicy {
	pub timeout: Duration,
	/// Never more than one.
	pub max_retries: u32,
	pub backoff: Duration,
}
impl RerankCallPolicy {
	pub fn from_config(cfg: &RerankProviderConfig) -> Self {
		Self {
			timeout: Duration::from_millis(cfg.timeout_ms),
			max_retries: cfg.max_retries.min(1),
			backoff: Duration::from_millis(cfg.retry_backoff_ms),
		}
	}
}
impl Default for RerankCallPolicy {
	fn default() -> Self {
		Self {
			timeout: Duration::from_millis(300),
			max_retries: 1,
			backoff: Duration::from_millis(50),
		}
	}
}

pub(crate) struct RerankOutcome {
	pub(crate) selected: Vec<RerankedCandidate>,
	pub(crate) degraded: bool,
}

pub(crate) async fn rerank(
	provider: &dyn RerankProvider,
	call: RerankCallPolicy,
	query: &Query,
	candidates: Vec<FusedCandidate>,
	policy: &Rerank,
	cancel: &CancellationToken,
) -> Result<RerankOutcome> {
	if candidates.is_empty() {
		return Ok(RerankOutcome { selected: Vec::new(), degraded: false });
	}

	let docs: Vec<RerankDocument> = candidates
		.iter()
		.map(|candidate| RerankDocument {
			doc_id: candidate.candidate.doc_id.clone(),
			text: candidate.candidate.snippet.clone(),
		})
		.collect();
	let scores = match call_with_retry(provider, call, &query.text, &docs, cancel).await {
		Ok(scores) => Some(scores),
		Err(Error::Cancelled) => return Err(Error::Cancelled),
		Err(err) => {
			tracing::warn!(
				error = %err,
				candidates = docs.len(),
				intent = query.intent.as_str(),
				"Rerank degraded. Falling back to fused scores."
			);

			None
		},
	};
	let degraded = scores.is_none();
	let blended = blend(candidates, scores.as_deref(), policy.alpha);

	Ok(RerankOutcome { selected: select_top_n(blended, query, policy), degraded })
}

/// `final = alpha * rerank + (1 - alpha) * fused`, or the fused score when no rerank scores exist.
pub fn blend(
	candidates: Vec<FusedCandidate>,
	scores: Option<&[f64]>,
	alpha: f64,
) -> Vec<RerankedCandidate> {
	candidates
		.into_iter()
		.enumerate()
		.map(|(idx, fused)| {
			let rerank_score = scores.and_then(|scores| scores.get(idx).copied());
			let final_score = match rerank_score {
				Some(score) => alpha * score + (1.0 - alpha) * fused.fused_score,
				None => fused.fused_score,
			};

			RerankedCandidate { fused, rerank_score, final_score }
		})
		.collect()
}

/// Greedy top-N selection by final score.
///
/// Candidates within `tie_epsilon` of the current best are ordered by exact query match (an
/// identifier-like term outranks a plain query word), then by sharing a source path with an
/// already selected candidate, then by fenced code for technical intents, and finally by fused
/// score and `doc_id`.
pub fn select_top_n(
	mut pool: Vec<RerankedCandidate>,
	query: &Query,
	policy: &Rerank,
) -> Vec<RerankedCandidate> {
	pool.sort_by(|left, right| {
		fusion::cmp_f64_desc(left.final_score, right.final_score)
			.then_with(|| fallback_order(left, right))
	});

	let limit = (policy.select_top_n as usize).min(pool.len());
	let identifiers = evidence::identifier_terms(&query.text);
	let technical = query.intent.is_technical();
	let mut selected: Vec<RerankedCandidate> = Vec::with_capacity(limit);

	while selected.len() < limit && !pool.is_empty() {
		let top = pool[0].final_score;
		let tied = pool
			.iter()
			.take_while(|candidate| (top - candidate.final_score).abs() <= policy.tie_epsilon)
			.count()
			.max(1);
		let mut best = 0_usize;

		for idx in 1..tied {
			let ord = cmp_tie_signals(
				&TieSignals::of(&pool[idx], &selected, &query.text, &identifiers, technical),
				&TieSignals::of(&pool[best], &selected, &query.text, &identifiers, technical),
			)
			.then_with(|| fallback_order(&pool[idx], &pool[best]));

			if ord == Ordering::Less {
				best = idx;
			}
		}

		selected.push(pool.remove(best));
	}

	selected
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
enum ExactMatch {
	None,
	Word,
	Identifier,
}

#[derive(Clone, Copy, Debug)]
struct TieSignals {
	exact_match: ExactMatch,
	path_proximity: bool,
	fenced_code: bool,
}
impl TieSignals {
	fn of(
		candidate: &RerankedCandidate,
		selected: &[RerankedCandidate],
		query: &str,
		identifiers: &[String],
		technical: bool,
	) -> Self {
		let inner = &candidate.fused.candidate;
		let exact_match = if identifiers.iter().any(|term| {
			inner.snippet.contains(term.as_str()) || inner.source_path.contains(term.as_str())
		}) {
			ExactMatch::Identifier
		} else if evidence::has_exact_token_match(query, &inner.snippet)
			|| evidence::has_exact_token_match(query, &inner.source_path)
		{
			ExactMatch::Word
		} else {
			ExactMatch::None
		};
		let path_proximity = !inner.source_path.is_empty()
			&& selected
				.iter()
				.any(|chosen| chosen.fused.candidate.source_path == inner.source_path);
		let fenced_code = technical && evidence::has_fenced_code(&inner.snippet);

		Self { exact_match, path_proximity, fenced_code }
	}
}

fn cmp_tie_signals(left: &TieSignals, right: &TieSignals) -> Ordering {
	right
		.exact_match
		.cmp(&left.exact_match)
		.then_with(|| right.path_proximity.cmp(&left.path_proximity))
		.then_with(|| right.fenced_code.cmp(&left.fenced_code))
}

fn fallback_order(left: &RerankedCandidate, right: &RerankedCandidate) -> Ordering {
	fusion::cmp_f64_desc(left.fused.fused_score, right.fused.fused_score)
		.then_with(|| left.fused.candidate.doc_id.cmp(&right.fused.candidate.doc_id))
}

async fn call_with_retry(
	provider: &dyn RerankProvider,
	call: RerankCallPolicy,
	query: &str,
	docs: &[RerankDocument],
	cancel: &CancellationToken,
) -> Result<Vec<f64>> {
	let mut attempt = 0_u32;

	loop {
		let outcome = tokio::select! {
			biased;
			_ = cancel.cancelled() => return Err(Error::Cancelled),
			outcome = tokio::time::timeout(call.timeout, provider.rerank(query, docs)) => outcome,
		};
		let message = match outcome {
			Ok(Ok(scores)) if scores.len() == docs.len() && scores.iter().all(|s| s.is_finite()) =>
				return Ok(scores),
			Ok(Ok(scores)) => format!(
				"Reranker returned {} usable scores for {} documents.",
				scores.iter().filter(|s| s.is_finite()).count(),
				docs.len()
			),
			Ok(Err(err)) => err.to_string(),
			Err(_) => format!("Reranker timed out after {} ms.", call.timeout.as_millis()),
		};

		if attempt >= call.max_retries.min(1) {
			return Err(Error::RerankDegraded { message });
		}

		attempt += 1;

		tracing::debug!(attempt, error = %message, "Retrying rerank call.");

		tokio::select! {
			biased;
			_ = cancel.cancelled() => return Err(Error::Cancelled),
			_ = tokio::time::sleep(call.backoff) => {},
		}
	}
}
