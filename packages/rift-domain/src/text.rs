use std::collections::HashSet;

use unicode_segmentation::UnicodeSegmentation;

pub fn tokenize_query(query: &str, max_terms: usize) -> Vec<String> {
	let normalized = normalize_ascii_terms(query);
	let mut out = Vec::new();
	let mut seen = HashSet::new();

	for token in normalized.split_whitespace() {
		if out.len() >= max_terms {
			break;
		}
		if token.len() < 2 {
			continue;
		}
		if seen.insert(token) {
			out.push(token.to_string());
		}
	}

	out
}

pub fn tokenize_text_terms(text: &str, max_terms: usize) -> HashSet<String> {
	if max_terms == 0 {
		return HashSet::new();
	}

	let normalized = normalize_ascii_terms(text);
	let mut out = HashSet::new();

	for token in normalized.split_whitespace() {
		if token.len() < 2 {
			continue;
		}

		out.insert(token.to_string());

		if out.len() >= max_terms {
			break;
		}
	}

	out
}

/// Jaccard overlap of two term sets. Two empty sets are treated as disjoint.
pub fn jaccard(lhs: &HashSet<String>, rhs: &HashSet<String>) -> f64 {
	if lhs.is_empty() || rhs.is_empty() {
		return 0.0;
	}

	let intersection = lhs.intersection(rhs).count();
	let union = lhs.len() + rhs.len() - intersection;

	intersection as f64 / union as f64
}

/// Approximate model tokens as non-whitespace word-boundary segments.
pub fn estimate_tokens(text: &str) -> u32 {
	let count = text.split_word_bounds().filter(|segment| !segment.trim().is_empty()).count();

	u32::try_from(count).unwrap_or(u32::MAX)
}

/// Truncate `text` to at most `max_tokens` segments, as counted by [`estimate_tokens`].
pub fn truncate_to_tokens(text: &str, max_tokens: u32) -> String {
	if max_tokens == 0 {
		return String::new();
	}

	let mut counted = 0_u32;
	let mut end = 0_usize;

	for (offset, segment) in text.split_word_bound_indices() {
		if segment.trim().is_empty() {
			continue;
		}
		if counted == max_tokens {
			break;
		}

		counted += 1;
		end = offset + segment.len();
	}

	text[..end].to_string()
}

fn normalize_ascii_terms(text: &str) -> String {
	let mut normalized = String::with_capacity(text.len());

	for ch in text.chars() {
		if ch.is_ascii_alphanumeric() {
			normalized.push(ch.to_ascii_lowercase());
		} else {
			normalized.push(' ');
		}
	}

	normalized
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn truncation_respects_estimate() {
		let text = "Set OLLAMA_HOST=0.0.0.0:11434 before starting the daemon.";
		let truncated = truncate_to_tokens(text, 4);

		assert_eq!(estimate_tokens(&truncated), 4);
		assert!(text.starts_with(&truncated));
	}

	#[test]
	fn truncation_keeps_short_text_intact() {
		let text = "short snippet";

		assert_eq!(truncate_to_tokens(text, 10), text);
	}
}
