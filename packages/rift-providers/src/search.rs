use std::time::Duration;

use color_eyre::{Result, eyre};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One ranked hit from a lexical or vector index, in index order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
	pub doc_id: String,
	pub source_path: String,
	pub snippet: String,
	#[serde(default)]
	pub score: Option<f64>,
}

pub async fn search(
	cfg: &rift_config::SearchProviderConfig,
	query: &str,
	top_k: u32,
) -> Result<Vec<SearchHit>> {
	let client = Client::builder().timeout(Duration::from_millis(cfg.timeout_ms)).build()?;
	let url = format!("{}{}", cfg.api_base, cfg.path);
	let body = serde_json::json!({ "query": query, "top_k": top_k });
	let res = client
		.post(url)
		.headers(crate::auth_headers(&cfg.api_key, &cfg.default_headers)?)
		.json(&body)
		.send()
		.await?;
	let json: Value = res.error_for_status()?.json().await?;

	parse_search_response(json, top_k)
}

fn parse_search_response(json: Value, top_k: u32) -> Result<Vec<SearchHit>> {
	let hits = json
		.get("hits")
		.or_else(|| json.get("results"))
		.and_then(|v| v.as_array())
		.ok_or_else(|| eyre::eyre!("Search response is missing hits array."))?;
	let mut out = Vec::with_capacity(hits.len().min(top_k as usize));

	for item in hits.iter().take(top_k as usize) {
		let doc_id = string_field(item, &["doc_id", "id"])
			.ok_or_else(|| eyre::eyre!("Search hit missing doc_id."))?;
		let source_path = string_field(item, &["source_path", "path"]).unwrap_or_default();
		let snippet = string_field(item, &["snippet", "text"]).unwrap_or_default();
		let score = item.get("score").and_then(|v| v.as_f64());

		out.push(SearchHit { doc_id, source_path, snippet, score });
	}

	Ok(out)
}

fn string_field(item: &Value, keys: &[&str]) -> Option<String> {
	keys.iter().find_map(|key| item.get(*key).and_then(|v| v.as_str())).map(str::to_string)
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn parses_hits_in_index_order() {
		let json = serde_json::json!({
			"hits": [
				{ "doc_id": "a", "source_path": "docs/a.md", "snippet": "alpha", "score": 3.5 },
				{ "id": "b", "path": "docs/b.md", "text": "beta" }
			]
		});
		let hits = parse_search_response(json, 10).expect("parse failed");

		assert_eq!(hits.len(), 2);
		assert_eq!(hits[0].doc_id, "a");
		assert_eq!(hits[0].score, Some(3.5));
		assert_eq!(hits[1].source_path, "docs/b.md");
		assert_eq!(hits[1].snippet, "beta");
		assert_eq!(hits[1].score, None);
	}

	#[test]
	fn truncates_to_top_k() {
		let json = serde_json::json!({
			"results": [
				{ "doc_id": "a" },
				{ "doc_id": "b" },
				{ "doc_id": "c" }
			]
		});
		let hits = parse_search_response(json, 2).expect("parse failed");

		assert_eq!(hits.iter().map(|hit| hit.doc_id.as_str()).collect::<Vec<_>>(), vec!["a", "b"]);
	}

	#[test]
	fn rejects_hit_without_doc_id() {
		let json = serde_json::json!({ "hits": [{ "snippet": "orphan" }] });

		assert!(parse_search_response(json, 5).is_err());
	}
}
