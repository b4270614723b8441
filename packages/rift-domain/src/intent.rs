use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

const MULTI_HOP_PATTERNS: &[&str] = &[
	r"(?i)\brelat(?:e|es|ed|ion|ionship)\b.*\b(?:to|with|between)\b",
	r"(?i)\bacross\b",
	r"(?i)\bbetween\b.+\band\b",
	r"(?i)\bboth\b.+\band\b",
	r"(?i)\bend[- ]to[- ]end\b",
	r"(?i)\b(?:compare|comparison|versus|vs)\b",
	r"(?i)\b(?:interacts?|interaction|depends\s+on|flows?\s+(?:from|through|into)|wired\s+(?:to|into))\b",
];
const STATUS_PATTERNS: &[&str] = &[
	r"(?i)\b(?:status|progress|eta|roadmap)\b",
	r"(?i)\b(?:is|are|was|were)\b.+\b(?:done|finished|complete|completed|merged|shipped|deployed|blocked|pending)\b",
	r"(?i)\b(?:blocked|blocker|in\s+progress|what'?s\s+left|remaining\s+work|still\s+open)\b",
];
const LOOKUP_PATTERNS: &[&str] = &[
	r"\b[A-Z][A-Z0-9]*(?:_[A-Z0-9]+)+\b",
	r"(?i)\b[\w.-]+\.(?:toml|ya?ml|json|env|ini|cfg|conf|lock|rs|py|ts|js|go|md|sh)\b",
	r"\b[\w-]+/[\w-]+(?:/[\w.-]+|\.\w+)",
	r"(?i)\b(?:what|which)\s+(?:is\s+the\s+)?(?:port|path|value|version|url|host|hostname|key|flag|setting|default)s?\b",
	r"(?i)\bwhere\s+(?:is|are|does|do)\b.*\b(?:defined|declared|configured|set|stored|located)\b",
	r"(?i)\b(?:env(?:ironment)?\s+var(?:iable)?s?|config(?:uration)?\s+keys?|port\s+number|default\s+value)\b",
];
const HOW_TO_PATTERNS: &[&str] = &[
	r"(?i)\bhow\s+(?:do|can|should|would)\s+(?:i|we|you)\b",
	r"(?i)\bhow\s+to\b",
	r"(?i)\b(?:steps?\s+to|guide\s+(?:to|for)|walk\s+me\s+through|set\s*up|install|configure)\b",
];

static MULTI_HOP: LazyLock<Vec<Regex>> = LazyLock::new(|| compile(MULTI_HOP_PATTERNS));
static STATUS: LazyLock<Vec<Regex>> = LazyLock::new(|| compile(STATUS_PATTERNS));
static LOOKUP: LazyLock<Vec<Regex>> = LazyLock::new(|| compile(LOOKUP_PATTERNS));
static HOW_TO: LazyLock<Vec<Regex>> = LazyLock::new(|| compile(HOW_TO_PATTERNS));

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Intent {
	Lookup,
	HowTo,
	Status,
	MultiHop,
}
impl Intent {
	pub const ALL: [Self; 4] = [Self::Lookup, Self::HowTo, Self::Status, Self::MultiHop];

	pub fn as_str(self) -> &'static str {
		match self {
			Self::Lookup => "lookup",
			Self::HowTo => "how_to",
			Self::Status => "status",
			Self::MultiHop => "multi_hop",
		}
	}

	/// Intents whose answers are usually code or configuration.
	pub fn is_technical(self) -> bool {
		match self {
			Self::Lookup | Self::HowTo | Self::MultiHop => true,
			Self::Status => false,
		}
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Classification {
	pub intent: Intent,
	/// No pattern matched and the query fell through to the permissive default.
	pub defaulted: bool,
}

pub fn classify(query: &str) -> Intent {
	classify_detailed(query).intent
}

pub fn classify_detailed(query: &str) -> Classification {
	let query = query.trim();

	for (intent, patterns) in [
		(Intent::MultiHop, &*MULTI_HOP),
		(Intent::Status, &*STATUS),
		(Intent::Lookup, &*LOOKUP),
		(Intent::HowTo, &*HOW_TO),
	] {
		if patterns.iter().any(|re| re.is_match(query)) {
			return Classification { intent, defaulted: false };
		}
	}

	Classification { intent: Intent::HowTo, defaulted: true }
}

fn compile(patterns: &[&str]) -> Vec<Regex> {
	patterns.iter().filter_map(|pattern| Regex::new(pattern).ok()).collect()
}
