use serde::Serialize;

use rift_config::{Fusion, IntentOverride, Packing, PipelineConfig, Prefilter, Rerank, Retrieval};
use rift_domain::intent::Intent;

/// Knobs for one query after the intent's overrides have been applied to the base snapshot.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ResolvedIntentPolicy {
	pub intent: Intent,
	pub config_version: u64,
	pub retrieval: Retrieval,
	pub fusion: Fusion,
	pub prefilter: Prefilter,
	pub rerank: Rerank,
	pub packing: Packing,
}
impl ResolvedIntentPolicy {
	/// Stable digest of the resolved knobs, for correlating logs and replays.
	pub fn hash(&self) -> String {
		let raw = serde_json::to_vec(self).unwrap_or_default();

		blake3::hash(&raw).to_hex().to_string()
	}
}

pub fn resolve_intent_policy(cfg: &PipelineConfig, intent: Intent) -> ResolvedIntentPolicy {
	let override_ = intent_override(cfg, intent);
	let mut policy = ResolvedIntentPolicy {
		intent,
		config_version: cfg.version,
		retrieval: cfg.retrieval.clone(),
		fusion: cfg.fusion.clone(),
		prefilter: cfg.prefilter.clone(),
		rerank: cfg.rerank.clone(),
		packing: cfg.packing.clone(),
	};

	if let Some(value) = override_.lexical_top_k {
		policy.retrieval.lexical_top_k = value;
	}
	if let Some(value) = override_.vector_top_k {
		policy.retrieval.vector_top_k = value;
	}
	if let Some(value) = override_.cosine_min {
		policy.prefilter.cosine_min = value;
	}
	if let Some(value) = override_.bm25_backstop_rank {
		policy.prefilter.bm25_backstop_rank = value;
	}
	if let Some(value) = override_.select_top_n {
		policy.rerank.select_top_n = value;
	}
	if let Some(value) = override_.mmr_lambda {
		policy.packing.mmr_lambda = value;
	}
	if let Some(value) = override_.context_cap_tokens {
		policy.packing.context_cap_tokens = value;
	}

	policy.rerank.select_top_n = policy.rerank.select_top_n.min(policy.prefilter.keep_top_fused);

	policy
}

fn intent_override(cfg: &PipelineConfig, intent: Intent) -> &IntentOverride {
	match intent {
		Intent::Lookup => &cfg.intents.lookup,
		Intent::HowTo => &cfg.intents.how_to,
		Intent::Status => &cfg.intents.status,
		Intent::MultiHop => &cfg.intents.multi_hop,
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn overrides_replace_only_the_fields_they_set() {
		let cfg = PipelineConfig::default();
		let lookup = resolve_intent_policy(&cfg, Intent::Lookup);
		let how_to = resolve_intent_policy(&cfg, Intent::HowTo);
		let multi_hop = resolve_intent_policy(&cfg, Intent::MultiHop);

		assert_eq!(lookup.retrieval.lexical_top_k, 40);
		assert_eq!(lookup.packing.mmr_lambda, cfg.packing.mmr_lambda);
		assert_eq!(how_to.retrieval.lexical_top_k, 80);
		assert_eq!(multi_hop.packing.mmr_lambda, 0.6);
		assert_eq!(multi_hop.retrieval, cfg.retrieval);
	}

	#[test]
	fn hash_tracks_resolved_knobs() {
		let cfg = PipelineConfig::default();
		let base = resolve_intent_policy(&cfg, Intent::HowTo);
		let mut tweaked = cfg.successor();

		tweaked.fusion.k = 30.0;

		assert_eq!(base.hash(), resolve_intent_policy(&cfg, Intent::HowTo).hash());
		assert_ne!(base.hash(), resolve_intent_policy(&tweaked, Intent::HowTo).hash());
	}
}
