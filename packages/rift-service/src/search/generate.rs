use std::collections::HashSet;

use tokio_util::sync::CancellationToken;

use crate::{
	Error, Providers, Result, SearchHit,
	search::{Candidate, ranking::ResolvedIntentPolicy},
};

#[derive(Clone, Copy, Debug)]
enum ListSource {
	Lexical,
	Vector,
}
impl ListSource {
	fn as_str(self) -> &'static str {
		match self {
			Self::Lexical => "lexical",
			Self::Vector => "vector",
		}
	}
}

#[derive(Debug)]
pub(crate) struct Generated {
	pub(crate) lexical: Vec<Candidate>,
	pub(crate) vector: Vec<Candidate>,
	pub(crate) degraded: bool,
}

/// Query both indices concurrently. One failed index degrades to single-list mode.
pub(crate) async fn generate(
	providers: &Providers,
	query: &str,
	policy: &ResolvedIntentPolicy,
	cancel: &CancellationToken,
) -> Result<Generated> {
	let lexical_top_k = policy.retrieval.lexical_top_k;
	let vector_top_k = policy.retrieval.vector_top_k;
	let searches = async {
		tokio::join!(
			providers.lexical.search(query, lexical_top_k),
			providers.vector.search(query, vector_top_k),
		)
	};
	let (lexical, vector) = tokio::select! {
		biased;
		_ = cancel.cancelled() => return Err(Error::Cancelled),
		results = searches => results,
	};

	match (lexical, vector) {
		(Ok(lexical), Ok(vector)) => Ok(Generated {
			lexical: to_candidates(lexical, lexical_top_k, ListSource::Lexical),
			vector: to_candidates(vector, vector_top_k, ListSource::Vector),
			degraded: false,
		}),
		(Ok(lexical), Err(err)) => {
			tracing::warn!(
				error = %err,
				failed = ListSource::Vector.as_str(),
				intent = policy.intent.as_str(),
				"Index search failed. Continuing with lexical results only."
			);

			Ok(Generated {
				lexical: to_candidates(lexical, lexical_top_k, ListSource::Lexical),
				vector: Vec::new(),
				degraded: true,
			})
		},
		(Err(err), Ok(vector)) => {
			tracing::warn!(
				error = %err,
				failed = ListSource::Lexical.as_str(),
				intent = policy.intent.as_str(),
				"Index search failed. Continuing with vector results only."
			);

			Ok(Generated {
				lexical: Vec::new(),
				vector: to_candidates(vector, vector_top_k, ListSource::Vector),
				degraded: true,
			})
		},
		(Err(lexical_err), Err(vector_err)) => Err(Error::RetrievalUnavailable {
			message: format!(
				"Lexical index failed: {lexical_err}. Vector index failed: {vector_err}."
			),
		}),
	}
}

/// Hits to candidates with 1-based ranks. A repeated `doc_id` keeps its first rank.
fn to_candidates(hits: Vec<SearchHit>, top_k: u32, source: ListSource) -> Vec<Candidate> {
	let mut seen = HashSet::new();
	let mut out = Vec::with_capacity(hits.len().min(top_k as usize));

	for hit in hits {
		if out.len() >= top_k as usize {
			break;
		}
		if !seen.insert(hit.doc_id.clone()) {
			continue;
		}

		let rank = out.len() as u32 + 1;
		let (lexical_rank, vector_rank, lexical_score, vector_score) = match source {
			ListSource::Lexical => (Some(rank), None, hit.score, None),
			ListSource::Vector => (None, Some(rank), None, hit.score),
		};

		out.push(Candidate {
			doc_id: hit.doc_id,
			source_path: hit.source_path,
			snippet: hit.snippet,
			lexical_rank,
			vector_rank,
			lexical_score,
			vector_score,
		});
	}

	out
}

#[cfg(test)]
mod tests {
	use super::*;

	fn hit(doc_id: &str) -> SearchHit {
		SearchHit {
			doc_id: doc_id.to_string(),
			source_path: format!("docs/{doc_id}.md"),
			snippet: format!("about {doc_id}"),
			score: Some(0.5),
		}
	}

	#[test]
	fn duplicate_hits_keep_first_rank_and_truncate() {
		let candidates =
			to_candidates(vec![hit("a"), hit("a"), hit("b"), hit("c")], 2, ListSource::Vector);
		let ranks: Vec<(&str, Option<u32>)> =
			candidates.iter().map(|c| (c.doc_id.as_str(), c.vector_rank)).collect();

		assert_eq!(ranks, vec![("a", Some(1)), ("b", Some(2))]);
		assert_eq!(candidates[0].vector_score, Some(0.5));
		assert_eq!(candidates[0].lexical_rank, None);
	}
}
