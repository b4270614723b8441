use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
	pub service: Service,
	pub providers: Providers,
	#[serde(default)]
	pub pipeline: PipelineConfig,
	#[serde(default)]
	pub tuning: Tuning,
	pub gate: Gate,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Service {
	pub log_level: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Providers {
	pub lexical: SearchProviderConfig,
	pub vector: SearchProviderConfig,
	pub rerank: RerankProviderConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SearchProviderConfig {
	pub provider_id: String,
	pub api_base: String,
	pub api_key: String,
	pub path: String,
	pub timeout_ms: u64,
	#[serde(default)]
	pub default_headers: Map<String, Value>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RerankProviderConfig {
	pub provider_id: String,
	pub api_base: String,
	pub api_key: String,
	pub path: String,
	pub model: String,
	/// Budget for one batched rerank call, retries excluded.
	#[serde(default = "default_rerank_timeout_ms")]
	pub timeout_ms: u64,
	/// Capped at one retry regardless of the configured value.
	#[serde(default = "default_rerank_max_retries")]
	pub max_retries: u32,
	#[serde(default = "default_rerank_retry_backoff_ms")]
	pub retry_backoff_ms: u64,
	#[serde(default)]
	pub default_headers: Map<String, Value>,
}

/// Every tunable knob of the query pipeline.
///
/// Snapshots are immutable once published. A changed knob set is always a new value carrying a
/// higher `version`, which is what evaluation records reference for replay.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
	pub version: u64,
	pub retrieval: Retrieval,
	pub fusion: Fusion,
	pub prefilter: Prefilter,
	pub rerank: Rerank,
	pub packing: Packing,
	pub intents: IntentOverrides,
}
impl Default for PipelineConfig {
	fn default() -> Self {
		Self {
			version: 1,
			retrieval: Retrieval::default(),
			fusion: Fusion::default(),
			prefilter: Prefilter::default(),
			rerank: Rerank::default(),
			packing: Packing::default(),
			intents: IntentOverrides::default(),
		}
	}
}
impl PipelineConfig {
	/// A copy carrying the next version, ready to be modified and published.
	pub fn successor(&self) -> Self {
		Self { version: self.version.saturating_add(1), ..self.clone() }
	}
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Retrieval {
	pub lexical_top_k: u32,
	pub vector_top_k: u32,
}
impl Default for Retrieval {
	fn default() -> Self {
		Self { lexical_top_k: 80, vector_top_k: 80 }
	}
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Fusion {
	pub k: f64,
	pub lexical_weight: f64,
	pub vector_weight: f64,
}
impl Default for Fusion {
	fn default() -> Self {
		Self { k: 60.0, lexical_weight: 0.6, vector_weight: 0.4 }
	}
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PrefilterRule {
	/// Drop only when the signal is weak and the lexical rank is outside the backstop.
	#[default]
	LexicalBackstop,
	/// Drop whenever the signal is weak.
	SignalOnly,
	/// Truncate to `keep_top_fused` without dropping.
	Off,
}
impl PrefilterRule {
	pub fn as_str(self) -> &'static str {
		match self {
			Self::LexicalBackstop => "lexical_backstop",
			Self::SignalOnly => "signal_only",
			Self::Off => "off",
		}
	}
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Prefilter {
	pub keep_top_fused: u32,
	pub cosine_min: f64,
	pub bm25_backstop_rank: u32,
	pub rule: PrefilterRule,
}
impl Default for Prefilter {
	fn default() -> Self {
		Self {
			keep_top_fused: 50,
			cosine_min: 0.25,
			bm25_backstop_rank: 20,
			rule: PrefilterRule::LexicalBackstop,
		}
	}
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Rerank {
	pub alpha: f64,
	pub select_top_n: u32,
	pub tie_epsilon: f64,
}
impl Default for Rerank {
	fn default() -> Self {
		Self { alpha: 0.6, select_top_n: 8, tie_epsilon: 1e-6 }
	}
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Packing {
	pub mmr_lambda: f64,
	pub context_cap_tokens: u32,
	pub lookup_backstop_k: u32,
}
impl Default for Packing {
	fn default() -> Self {
		Self { mmr_lambda: 0.7, context_cap_tokens: 1_400, lookup_backstop_k: 3 }
	}
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IntentOverrides {
	pub lookup: IntentOverride,
	pub how_to: IntentOverride,
	pub status: IntentOverride,
	pub multi_hop: IntentOverride,
}
impl Default for IntentOverrides {
	fn default() -> Self {
		Self {
			lookup: IntentOverride {
				lexical_top_k: Some(40),
				vector_top_k: Some(40),
				..IntentOverride::default()
			},
			how_to: IntentOverride::default(),
			status: IntentOverride {
				lexical_top_k: Some(40),
				vector_top_k: Some(40),
				..IntentOverride::default()
			},
			multi_hop: IntentOverride { mmr_lambda: Some(0.6), ..IntentOverride::default() },
		}
	}
}

/// Per-intent replacements for the base knobs. Unset fields fall back to the base value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IntentOverride {
	#[serde(skip_serializing_if = "Option::is_none")]
	pub lexical_top_k: Option<u32>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub vector_top_k: Option<u32>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub cosine_min: Option<f64>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub bm25_backstop_rank: Option<u32>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub select_top_n: Option<u32>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub mmr_lambda: Option<f64>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub context_cap_tokens: Option<u32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Knob {
	LexicalTopK,
	VectorTopK,
	FusionK,
	LexicalWeight,
	VectorWeight,
	CosineMin,
	Bm25BackstopRank,
	KeepTopFused,
	RerankAlpha,
	SelectTopN,
	MmrLambda,
	ContextCapTokens,
}
impl Knob {
	pub fn as_str(self) -> &'static str {
		match self {
			Self::LexicalTopK => "lexical_top_k",
			Self::VectorTopK => "vector_top_k",
			Self::FusionK => "fusion_k",
			Self::LexicalWeight => "lexical_weight",
			Self::VectorWeight => "vector_weight",
			Self::CosineMin => "cosine_min",
			Self::Bm25BackstopRank => "bm25_backstop_rank",
			Self::KeepTopFused => "keep_top_fused",
			Self::RerankAlpha => "rerank_alpha",
			Self::SelectTopN => "select_top_n",
			Self::MmrLambda => "mmr_lambda",
			Self::ContextCapTokens => "context_cap_tokens",
		}
	}

	pub fn is_integer(self) -> bool {
		matches!(
			self,
			Self::LexicalTopK
				| Self::VectorTopK
				| Self::Bm25BackstopRank
				| Self::KeepTopFused
				| Self::SelectTopN
				| Self::ContextCapTokens
		)
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TuningPhase {
	/// Maximize recall while precision stays above `precision_floor`.
	Recall,
	/// Maximize precision while recall stays above `recall_floor`.
	Precision,
	/// Maximize F1.
	Balanced,
}
impl TuningPhase {
	pub fn as_str(self) -> &'static str {
		match self {
			Self::Recall => "recall",
			Self::Precision => "precision",
			Self::Balanced => "balanced",
		}
	}
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SweepDimension {
	pub knob: Knob,
	pub values: Vec<f64>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Tuning {
	pub concurrency: u32,
	pub precision_floor: f64,
	pub recall_floor: f64,
	pub phases: Vec<TuningPhase>,
	pub dimensions: Vec<SweepDimension>,
}
impl Default for Tuning {
	fn default() -> Self {
		Self {
			concurrency: 2,
			precision_floor: 0.3,
			recall_floor: 0.5,
			phases: vec![TuningPhase::Recall, TuningPhase::Precision, TuningPhase::Balanced],
			dimensions: vec![
				SweepDimension { knob: Knob::LexicalTopK, values: vec![40.0, 60.0, 80.0, 120.0] },
				SweepDimension { knob: Knob::FusionK, values: vec![20.0, 40.0, 60.0, 80.0] },
				SweepDimension {
					knob: Knob::LexicalWeight,
					values: vec![0.4, 0.5, 0.6, 0.7, 0.8],
				},
				SweepDimension { knob: Knob::CosineMin, values: vec![0.15, 0.25, 0.35] },
				SweepDimension { knob: Knob::RerankAlpha, values: vec![0.4, 0.6, 0.8] },
				SweepDimension { knob: Knob::SelectTopN, values: vec![6.0, 7.0, 8.0] },
				SweepDimension { knob: Knob::MmrLambda, values: vec![0.5, 0.6, 0.7, 0.8, 0.9] },
			],
		}
	}
}

#[derive(Debug, Clone, Deserialize)]
pub struct Gate {
	pub steps: Vec<GateStep>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GateStep {
	pub precision_min: f64,
	pub recall_min: f64,
	pub faithfulness_min: f64,
}

fn default_rerank_timeout_ms() -> u64 {
	300
}

fn default_rerank_max_retries() -> u32 {
	1
}

fn default_rerank_retry_backoff_ms() -> u64 {
	50
}
