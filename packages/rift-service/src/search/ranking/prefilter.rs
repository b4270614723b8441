use crate::search::FusedCandidate;
use rift_config::{Prefilter, PrefilterRule};

/// Drop weak candidates and cap the survivors at `keep_top_fused`, preserving fused order.
pub fn filter(fused: Vec<FusedCandidate>, cfg: &Prefilter) -> Vec<FusedCandidate> {
	let keep = cfg.keep_top_fused as usize;
	let mut out = Vec::with_capacity(fused.len().min(keep));
	let mut dropped = 0_usize;

	for mut candidate in fused {
		if out.len() >= keep {
			break;
		}
		if should_drop(&candidate, cfg) {
			dropped += 1;

			continue;
		}

		candidate.survived_prefilter = true;

		out.push(candidate);
	}

	if dropped > 0 {
		tracing::debug!(
			dropped,
			kept = out.len(),
			rule = cfg.rule.as_str(),
			"Pre-filter dropped candidates."
		);
	}

	out
}

/// Cosine score from the vector index when present, otherwise the fused score.
pub fn signal(candidate: &FusedCandidate) -> f64 {
	candidate.candidate.vector_score.unwrap_or(candidate.fused_score)
}

pub fn should_drop(candidate: &FusedCandidate, cfg: &Prefilter) -> bool {
	let weak = signal(candidate) < cfg.cosine_min;

	match cfg.rule {
		PrefilterRule::Off => false,
		PrefilterRule::SignalOnly => weak,
		PrefilterRule::LexicalBackstop =>
			weak
				&& candidate
					.candidate
					.lexical_rank
					.is_none_or(|rank| rank > cfg.bm25_backstop_rank),
	}
}
