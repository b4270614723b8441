use std::{collections::HashMap, time::Duration};

use color_eyre::{Result, eyre};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RerankDocument {
	pub doc_id: String,
	pub text: String,
}

/// Score every document in one batched call. Scores come back aligned with `docs`.
pub async fn rerank(
	cfg: &rift_config::RerankProviderConfig,
	query: &str,
	docs: &[RerankDocument],
) -> Result<Vec<f64>> {
	let client = Client::builder().timeout(Duration::from_millis(cfg.timeout_ms)).build()?;
	let url = format!("{}{}", cfg.api_base, cfg.path);
	let body = serde_json::json!({ "model": cfg.model, "query": query, "documents": docs });
	let res = client
		.post(url)
		.headers(crate::auth_headers(&cfg.api_key, &cfg.default_headers)?)
		.json(&body)
		.send()
		.await?;
	let json: Value = res.error_for_status()?.json().await?;

	parse_rerank_response(json, docs)
}

fn parse_rerank_response(json: Value, docs: &[RerankDocument]) -> Result<Vec<f64>> {
	let results = json
		.get("results")
		.or_else(|| json.get("data"))
		.and_then(|v| v.as_array())
		.ok_or_else(|| eyre::eyre!("Rerank response is missing results array."))?;
	let positions: HashMap<&str, usize> =
		docs.iter().enumerate().map(|(idx, doc)| (doc.doc_id.as_str(), idx)).collect();
	let mut scores: Vec<Option<f64>> = vec![None; docs.len()];

	for item in results {
		let index = match item.get("doc_id").and_then(|v| v.as_str()) {
			Some(doc_id) => positions.get(doc_id).copied(),
			None => item.get("index").and_then(|v| v.as_u64()).map(|v| v as usize),
		}
		.ok_or_else(|| eyre::eyre!("Rerank result has no usable doc_id or index."))?;
		let score = item
			.get("relevance_score")
			.or_else(|| item.get("score"))
			.and_then(|v| v.as_f64())
			.filter(|v| v.is_finite())
			.ok_or_else(|| eyre::eyre!("Rerank result missing score."))?;
		let Some(slot) = scores.get_mut(index) else {
			return Err(eyre::eyre!("Rerank result index {index} is out of range."));
		};

		*slot = Some(score);
	}

	scores
		.into_iter()
		.zip(docs)
		.map(|(score, doc)| {
			score.ok_or_else(|| eyre::eyre!("Rerank response omitted document {}.", doc.doc_id))
		})
		.collect()
}
