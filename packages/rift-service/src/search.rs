pub mod ranking;

mod backstop;
mod generate;

pub use ranking::RerankCallPolicy;

use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use crate::{Error, Result, RetrievalService};
use rift_config::PipelineConfig;
use rift_domain::intent::{self, Intent};

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SearchRequest {
	pub query: String,
	/// Declared intent. Skips classification when present.
	#[serde(default)]
	pub intent: Option<Intent>,
	#[serde(default)]
	pub session_id: Option<String>,
}
impl SearchRequest {
	pub fn new(query: impl Into<String>) -> Self {
		Self { query: query.into(), intent: None, session_id: None }
	}

	pub fn with_intent(mut self, intent: Intent) -> Self {
		self.intent = Some(intent);

		self
	}
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Query {
	pub text: String,
	pub intent: Intent,
	pub session_id: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
	pub doc_id: String,
	pub source_path: String,
	pub snippet: String,
	pub lexical_rank: Option<u32>,
	pub vector_rank: Option<u32>,
	pub lexical_score: Option<f64>,
	pub vector_score: Option<f64>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FusedCandidate {
	#[serde(flatten)]
	pub candidate: Candidate,
	pub fused_score: f64,
	pub survived_prefilter: bool,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RerankedCandidate {
	#[serde(flatten)]
	pub fused: FusedCandidate,
	pub rerank_score: Option<f64>,
	pub final_score: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EvidenceHeader {
	pub source_path: String,
	pub snippet: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AnswerEnvelope {
	pub query: String,
	pub intent: Intent,
	pub session_id: Option<String>,
	pub config_version: u64,
	pub policy_hash: String,
	pub evidence_first: bool,
	pub evidence: EvidenceHeader,
	pub candidates: Vec<RerankedCandidate>,
	/// Left empty for a downstream writer.
	pub summary: Option<String>,
	pub used_tokens: u32,
	pub retrieval_degraded: bool,
	pub rerank_degraded: bool,
	pub backstop_applied: bool,
}
impl AnswerEnvelope {
	pub fn doc_ids(&self) -> Vec<&str> {
		self.candidates.iter().map(|candidate| candidate.fused.candidate.doc_id.as_str()).collect()
	}

	/// Evidence block first, then the remaining context, then the summary slot.
	pub fn render(&self) -> String {
		let mut out =
			format!("Evidence: {}\n{}\n", self.evidence.source_path, self.evidence.snippet);

		for candidate in self.candidates.iter().skip(1) {
			let inner = &candidate.fused.candidate;

			out.push_str(&format!("\nContext: {}\n{}\n", inner.source_path, inner.snippet));
		}

		out.push_str("\nSummary:\n");
		out.push_str(self.summary.as_deref().unwrap_or_default());

		out
	}
}

impl RetrievalService {
	pub async fn search(&self, request: SearchRequest) -> Result<AnswerEnvelope> {
		self.search_cancellable(request, &CancellationToken::new()).await
	}

	pub async fn search_cancellable(
		&self,
		request: SearchRequest,
		cancel: &CancellationToken,
	) -> Result<AnswerEnvelope> {
		let cfg = self.config.current();

		self.search_with_config(&cfg, request, cancel).await
	}

	/// Run the pipeline against an explicit snapshot, whether or not it is the published one.
	pub async fn search_with_config(
		&self,
		cfg: &PipelineConfig,
		request: SearchRequest,
		cancel: &CancellationToken,
	) -> Result<AnswerEnvelope> {
		let text = request.query.trim();

		if text.is_empty() {
			return Err(Error::InvalidRequest { message: "query must be non-empty.".to_string() });
		}
		if cancel.is_cancelled() {
			return Err(Error::Cancelled);
		}

		let intent = match request.intent {
			Some(intent) => intent,
			None => {
				let classification = intent::classify_detailed(text);

				if classification.defaulted {
					tracing::debug!(query = text, "No intent pattern matched. Using how_to.");
				}

				classification.intent
			},
		};
		let query = Query { text: text.to_string(), intent, session_id: request.session_id };
		let policy = ranking::resolve_intent_policy(cfg, intent);
		let policy_hash = policy.hash();

		tracing::debug!(
			intent = intent.as_str(),
			config_version = cfg.version,
			policy_hash = policy_hash.as_str(),
			session_id = query.session_id.as_deref().unwrap_or_default(),
			"Resolved intent policy."
		);

		let generated = generate::generate(&self.providers, &query.text, &policy, cancel).await?;
		let fused = ranking::fuse(&generated.lexical, &generated.vector, &policy.fusion)?;
		let filtered = ranking::filter(fused, &policy.prefilter);
		let reranked = ranking::rerank(
			self.providers.rerank.as_ref(),
			self.rerank_call,
			&query,
			filtered,
			&policy.rerank,
			cancel,
		)
		.await?;
		let mut packed = ranking::pack(reranked.selected, &policy.packing)?;
		let backstop_applied =
			backstop::ensure_exact_match(&self.providers, &query, &mut packed, &policy, cancel)
				.await?;
		let Some(top) = packed.candidates.first() else {
			return Err(Error::EmptyAnswer { message: "Packed context is empty.".to_string() });
		};
		let evidence = EvidenceHeader {
			source_path: top.fused.candidate.source_path.clone(),
			snippet: top.fused.candidate.snippet.clone(),
		};

		Ok(AnswerEnvelope {
			query: query.text,
			intent,
			session_id: query.session_id,
			config_version: cfg.version,
			policy_hash,
			evidence_first: true,
			evidence,
			candidates: packed.candidates,
			summary: None,
			used_tokens: packed.used_tokens,
			retrieval_degraded: generated.degraded,
			rerank_degraded: reranked.degraded,
			backstop_applied,
		})
	}
}
