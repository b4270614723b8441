use crate::text;

const MAX_TEXT_TERMS: usize = 4_096;
const STOPWORDS: &[&str] = &[
	"about", "and", "are", "can", "does", "for", "from", "how", "into", "the", "this", "that",
	"use", "uses", "what", "when", "where", "which", "who", "why", "with", "you", "your",
];

/// Query terms that look like identifiers: env keys, paths, dotted names, camelCase, or anything
/// carrying digits.
pub fn identifier_terms(query: &str) -> Vec<String> {
	let mut out = Vec::new();

	for raw in query.split_whitespace() {
		let term = raw.trim_matches(|ch: char| {
			!(ch.is_alphanumeric() || matches!(ch, '_' | '.' | '/' | '-'))
		});
		let term = term.trim_end_matches(['.', '-']);

		if term.len() < 2 || !looks_like_identifier(term) {
			continue;
		}
		if !out.iter().any(|existing| existing == term) {
			out.push(term.to_string());
		}
	}

	out
}

/// Whether an identifier-shaped query term appears verbatim in `text`.
pub fn key_match(query: &str, text: &str) -> bool {
	identifier_terms(query).iter().any(|term| text.contains(term.as_str()))
}

pub fn has_exact_token_match(query: &str, text: &str) -> bool {
	if key_match(query, text) {
		return true;
	}

	let terms = text::tokenize_text_terms(text, MAX_TEXT_TERMS);

	text::tokenize_query(query, 32)
		.iter()
		.filter(|token| token.len() >= 3 && !STOPWORDS.contains(&token.as_str()))
		.any(|token| terms.contains(token))
}

pub fn has_fenced_code(text: &str) -> bool {
	text.contains("```") || text.contains("~~~")
}

fn looks_like_identifier(term: &str) -> bool {
	if term.contains(['_', '.', '/']) {
		return term.chars().any(|ch| ch.is_alphanumeric());
	}

	let letters: Vec<char> = term.chars().filter(|ch| ch.is_alphabetic()).collect();
	let all_caps = letters.len() >= 2 && letters.iter().all(|ch| ch.is_uppercase());
	let has_digit = term.chars().any(|ch| ch.is_ascii_digit());
	let camel_case = term.chars().skip(1).any(|ch| ch.is_uppercase())
		&& term.chars().any(|ch| ch.is_lowercase());
	let hyphenated = term.contains('-') && term.split('-').all(|part| !part.is_empty());

	all_caps || has_digit || camel_case || hyphenated
}
