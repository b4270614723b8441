use std::collections::HashSet;

use rift_domain::{
	evidence,
	intent::{self, Intent},
	text,
};

fn terms(values: &[&str]) -> HashSet<String> {
	values.iter().map(|value| value.to_string()).collect()
}

#[test]
fn classifies_representative_queries() {
	let cases = [
		("what port does OLLAMA_HOST use", Intent::Lookup),
		("where is the retry budget configured", Intent::Lookup),
		("which value does config/pipeline.toml set", Intent::Lookup),
		("how does the fusion stage relate to the reranker", Intent::MultiHop),
		("compare lexical and vector recall", Intent::MultiHop),
		("status of the index migration", Intent::Status),
		("is the schema change merged yet", Intent::Status),
		("how do I configure logging", Intent::HowTo),
		("tell me about caching", Intent::HowTo),
	];

	for (query, expected) in cases {
		assert_eq!(intent::classify(query), expected, "Unexpected intent for {query:?}.");
	}
}

#[test]
fn intent_serializes_as_snake_case() {
	let encoded = serde_json::to_string(&Intent::MultiHop).expect("Failed to encode intent.");

	assert_eq!(encoded, "\"multi_hop\"");

	for intent in Intent::ALL {
		let encoded = serde_json::to_value(intent).expect("Failed to encode intent.");

		assert_eq!(encoded.as_str(), Some(intent.as_str()));
	}
}

#[test]
fn status_is_the_only_non_technical_intent() {
	let technical: Vec<Intent> =
		Intent::ALL.into_iter().filter(|intent| intent.is_technical()).collect();

	assert_eq!(technical, vec![Intent::Lookup, Intent::HowTo, Intent::MultiHop]);
}

#[test]
fn tokenize_query_lowercases_and_dedupes() {
	let tokens = text::tokenize_query("Fusion fusion RRF k=60 a", 8);

	assert_eq!(tokens, vec!["fusion", "rrf", "60"]);
}

#[test]
fn tokenize_query_honors_max_terms() {
	let tokens = text::tokenize_query("one two three four", 2);

	assert_eq!(tokens, vec!["one", "two"]);
}

#[test]
fn jaccard_measures_overlap() {
	let lhs = terms(&["fusion", "rank", "score"]);
	let rhs = terms(&["fusion", "rank", "vector"]);

	assert!((text::jaccard(&lhs, &rhs) - 0.5).abs() < 1e-9);
	assert_eq!(text::jaccard(&lhs, &HashSet::new()), 0.0);
	assert_eq!(text::jaccard(&lhs, &lhs), 1.0);
}

#[test]
fn estimate_tokens_ignores_whitespace() {
	assert_eq!(text::estimate_tokens("  alpha   beta\n\tgamma "), 3);
	assert_eq!(text::estimate_tokens(""), 0);
}

#[test]
fn identifier_terms_pick_up_keys_and_paths() {
	let terms = evidence::identifier_terms("what port does OLLAMA_HOST use in config/ollama.toml?");

	assert_eq!(terms, vec!["OLLAMA_HOST", "config/ollama.toml"]);
}

#[test]
fn key_match_requires_verbatim_identifier() {
	let query = "what port does OLLAMA_HOST use";

	assert!(evidence::key_match(query, "export OLLAMA_HOST=0.0.0.0:11434"));
	assert!(!evidence::key_match(query, "ollama host port defaults to 11434"));
	assert!(!evidence::key_match("how do I configure logging", "configure logging here"));
}

#[test]
fn exact_token_match_skips_stopwords() {
	assert!(evidence::has_exact_token_match("how do I rotate logs", "Logs rotate daily."));
	assert!(!evidence::has_exact_token_match("what does this do", "What does this do?"));
}

#[test]
fn fenced_code_detection() {
	assert!(evidence::has_fenced_code("Run:\n```sh\ncargo run\n```"));
	assert!(evidence::has_fenced_code("~~~\nvalue\n~~~"));
	assert!(!evidence::has_fenced_code("inline `code` only"));
}
