use proptest::prelude::*;

use rift_config::{Fusion, Packing, Prefilter, PrefilterRule, Rerank};
use rift_domain::{intent::Intent, text};
use rift_service::{
	Candidate, FusedCandidate, Query, RerankedCandidate,
	search::ranking::{self, Packed},
};

fn candidate(doc_id: &str, lexical_rank: Option<u32>, vector_rank: Option<u32>) -> Candidate {
	Candidate {
		doc_id: doc_id.to_string(),
		source_path: format!("docs/{doc_id}.md"),
		snippet: format!("{doc_id} body"),
		lexical_rank,
		vector_rank,
		lexical_score: None,
		vector_score: None,
	}
}

fn reranked(doc_id: &str, final_score: f64, snippet: &str) -> RerankedCandidate {
	RerankedCandidate {
		fused: FusedCandidate {
			candidate: Candidate {
				doc_id: doc_id.to_string(),
				source_path: format!("docs/{doc_id}.md"),
				snippet: snippet.to_string(),
				lexical_rank: Some(1),
				vector_rank: None,
				lexical_score: None,
				vector_score: None,
			},
			fused_score: final_score,
			survived_prefilter: true,
		},
		rerank_score: None,
		final_score,
	}
}

fn query(text: &str, intent: Intent) -> Query {
	Query { text: text.to_string(), intent, session_id: None }
}

fn ids(candidates: &[RerankedCandidate]) -> Vec<&str> {
	candidates.iter().map(|candidate| candidate.fused.candidate.doc_id.as_str()).collect()
}

#[test]
fn fuse_is_independent_of_input_interleaving() {
	let weights = Fusion::default();
	let lexical = vec![candidate("a", Some(1), None), candidate("b", Some(2), None)];
	let vector = vec![candidate("c", None, Some(1)), candidate("a", None, Some(2))];
	let forward = ranking::fuse(&lexical, &vector, &weights).expect("fusion failed");
	let lexical_rev: Vec<Candidate> = lexical.iter().rev().cloned().collect();
	let vector_rev: Vec<Candidate> = vector.iter().rev().cloned().collect();
	let reversed = ranking::fuse(&lexical_rev, &vector_rev, &weights).expect("fusion failed");

	assert_eq!(forward, reversed);
	assert_eq!(forward[0].candidate.doc_id, "a");
}

#[test]
fn better_lexical_rank_strictly_raises_fused_score() {
	let weights = Fusion::default();

	for rank in 2..=80 {
		let worse = ranking::fused_score(&candidate("d", Some(rank), Some(5)), &weights);
		let better = ranking::fused_score(&candidate("d", Some(rank - 1), Some(5)), &weights);

		assert!(better > worse, "Rank {} should beat rank {rank}.", rank - 1);
	}
}

#[test]
fn both_lists_never_score_below_either_single_list() {
	let weights = Fusion::default();

	for lexical in 1..=60 {
		for vector in 1..=60 {
			let both = ranking::fused_score(&candidate("d", Some(lexical), Some(vector)), &weights);
			let lexical_only = ranking::fused_score(&candidate("d", Some(lexical), None), &weights);
			let vector_only = ranking::fused_score(&candidate("d", None, Some(vector)), &weights);

			assert!(both >= lexical_only, "Lexical {lexical}, vector {vector}.");
			assert!(both >= vector_only, "Lexical {lexical}, vector {vector}.");
		}
	}
}

#[test]
fn filter_caps_survivors_and_marks_them() {
	let fused: Vec<FusedCandidate> = (1..=10)
		.map(|rank| FusedCandidate {
			candidate: Candidate {
				vector_score: Some(0.9),
				..candidate(&format!("d{rank:02}"), Some(rank), None)
			},
			fused_score: 1.0 / rank as f64,
			survived_prefilter: false,
		})
		.collect();
	let cfg = Prefilter { keep_top_fused: 4, ..Prefilter::default() };
	let survivors = ranking::filter(fused, &cfg);

	assert_eq!(survivors.len(), 4);
	assert!(survivors.iter().all(|candidate| candidate.survived_prefilter));
	assert_eq!(survivors[0].candidate.doc_id, "d01");
}

#[test]
fn signal_only_drops_weak_lexical_hits() {
	let weak = FusedCandidate {
		candidate: Candidate { vector_score: Some(0.1), ..candidate("w", Some(1), Some(9)) },
		fused_score: 0.02,
		survived_prefilter: false,
	};
	let backstop = Prefilter::default();
	let strict = Prefilter { rule: PrefilterRule::SignalOnly, ..Prefilter::default() };
	let off = Prefilter { rule: PrefilterRule::Off, ..Prefilter::default() };

	assert!(!ranking::should_drop(&weak, &backstop));
	assert!(ranking::should_drop(&weak, &strict));
	assert!(!ranking::should_drop(&weak, &off));
}

proptest! {
	#[test]
	fn prefilter_never_starves_strong_lexical_hits(
		lexical_rank in proptest::option::of(1_u32..=200),
		vector_score in proptest::option::of(-1.0_f64..1.0),
		fused_score in 0.0_f64..0.05,
		cosine_min in 0.0_f64..1.0,
		backstop_rank in 1_u32..=50,
	) {
		let has_vector = vector_score.is_some();
		let fused = FusedCandidate {
			candidate: Candidate {
				vector_score,
				..candidate("p", lexical_rank, if has_vector { Some(1) } else { None })
			},
			fused_score,
			survived_prefilter: false,
		};
		let cfg = Prefilter {
			keep_top_fused: 50,
			cosine_min,
			bm25_backstop_rank: backstop_rank,
			rule: PrefilterRule::LexicalBackstop,
		};

		if lexical_rank.is_some_and(|rank| rank <= backstop_rank) {
			prop_assert!(!ranking::should_drop(&fused, &cfg));
			prop_assert_eq!(ranking::filter(vec![fused], &cfg).len(), 1);
		}
	}
}

#[test]
fn blend_without_scores_keeps_fused_score() {
	let fused = vec![FusedCandidate {
		candidate: candidate("a", Some(1), None),
		fused_score: 0.3,
		survived_prefilter: true,
	}];
	let blended = ranking::blend(fused.clone(), None, 0.6);
	let scored = ranking::blend(fused, Some(&[0.8][..]), 0.5);

	assert_eq!(blended[0].final_score, 0.3);
	assert_eq!(blended[0].rerank_score, None);
	assert!((scored[0].final_score - 0.55).abs() < 1e-12);
}

#[test]
fn ties_prefer_exact_identifier_match() {
	let pool = vec![
		reranked("a", 0.5, "the daemon listens on a port"),
		reranked("b", 0.5, "OLLAMA_HOST=0.0.0.0:11434"),
	];
	let selected = ranking::select_top_n(
		pool,
		&query("what port does OLLAMA_HOST use", Intent::Lookup),
		&Rerank { select_top_n: 2, ..Rerank::default() },
	);

	assert_eq!(ids(&selected), vec!["b", "a"]);
}

#[test]
fn ties_prefer_plain_word_match() {
	let pool = vec![
		reranked("a", 0.5, "daily maintenance notes"),
		reranked("b", 0.5, "rotate the files with logrotate"),
	];
	let selected = ranking::select_top_n(
		pool,
		&query("how do I rotate logs", Intent::HowTo),
		&Rerank { select_top_n: 2, ..Rerank::default() },
	);

	assert_eq!(ids(&selected), vec!["b", "a"]);
}

#[test]
fn ties_prefer_fenced_code_only_for_technical_intents() {
	let pool = || {
		vec![reranked("a", 0.5, "plain prose answer"), reranked("b", 0.5, "```sh\nrun it\n```")]
	};
	let cfg = Rerank { select_top_n: 2, ..Rerank::default() };
	let technical = ranking::select_top_n(pool(), &query("steps to deploy", Intent::HowTo), &cfg);
	let status = ranking::select_top_n(pool(), &query("deploy status", Intent::Status), &cfg);

	assert_eq!(ids(&technical), vec!["b", "a"]);
	assert_eq!(ids(&status), vec!["a", "b"]);
}

#[test]
fn ties_prefer_path_shared_with_selected_candidate() {
	let mut sibling = reranked("c", 0.4, "second half of the guide");

	sibling.fused.candidate.source_path = "docs/a.md".to_string();

	let pool = vec![
		reranked("a", 0.9, "first half of the guide"),
		reranked("b", 0.4, "unrelated note"),
		sibling,
	];
	let selected = ranking::select_top_n(
		pool,
		&query("tell me about the guide", Intent::HowTo),
		&Rerank { select_top_n: 3, ..Rerank::default() },
	);

	assert_eq!(ids(&selected), vec!["a", "c", "b"]);
}

#[test]
fn scores_outside_epsilon_are_not_reordered() {
	let pool = vec![
		reranked("a", 0.5, "no identifier here"),
		reranked("b", 0.49, "OLLAMA_HOST=0.0.0.0"),
	];
	let selected = ranking::select_top_n(
		pool,
		&query("what port does OLLAMA_HOST use", Intent::Lookup),
		&Rerank { select_top_n: 2, ..Rerank::default() },
	);

	assert_eq!(ids(&selected), vec!["a", "b"]);
}

#[test]
fn pack_respects_budget_and_is_deterministic() {
	let pool: Vec<RerankedCandidate> = (0..12)
		.map(|idx| {
			let words = (0..(5 + idx * 3)).map(|n| format!("w{idx}x{n}")).collect::<Vec<_>>();

			reranked(&format!("d{idx:02}"), 1.0 - idx as f64 * 0.05, &words.join(" "))
		})
		.collect();
	let policy = Packing { context_cap_tokens: 60, ..Packing::default() };
	let first = ranking::pack(pool.clone(), &policy).expect("pack failed");
	let second = ranking::pack(pool, &policy).expect("pack failed");
	let counted: u32 = first
		.candidates
		.iter()
		.map(|candidate| text::estimate_tokens(&candidate.fused.candidate.snippet))
		.sum();

	assert_eq!(first, second);
	assert!(!first.candidates.is_empty());
	assert!(first.used_tokens <= 60);
	assert_eq!(first.used_tokens, counted);
}

#[test]
fn pack_skips_oversized_candidate_but_keeps_smaller_ones() {
	let pool = vec![
		reranked("a", 0.9, "alpha beta gamma"),
		reranked("b", 0.8, &"long ".repeat(50)),
		reranked("c", 0.7, "delta epsilon"),
	];
	let Packed { candidates, used_tokens } =
		ranking::pack(pool, &Packing { context_cap_tokens: 10, ..Packing::default() })
			.expect("pack failed");

	assert_eq!(ids(&candidates), vec!["a", "c"]);
	assert_eq!(used_tokens, 5);
}

#[test]
fn pack_truncates_single_oversized_top_candidate() {
	let pool = vec![reranked("a", 0.9, &"token ".repeat(100))];
	let packed = ranking::pack(pool, &Packing { context_cap_tokens: 12, ..Packing::default() })
		.expect("pack failed");

	assert_eq!(packed.candidates.len(), 1);
	assert_eq!(packed.used_tokens, 12);
	assert_eq!(text::estimate_tokens(&packed.candidates[0].fused.candidate.snippet), 12);
}

#[test]
fn pack_prefers_diverse_snippets() {
	let pool = vec![
		reranked("a", 1.0, "rotate logs daily with logrotate"),
		reranked("b", 0.95, "rotate logs daily with logrotate"),
		reranked("c", 0.9, "ship metrics to the collector"),
	];
	let packed = ranking::pack(pool, &Packing { mmr_lambda: 0.5, ..Packing::default() })
		.expect("pack failed");

	assert_eq!(ids(&packed.candidates), vec!["a", "c", "b"]);
}

#[test]
fn pack_rejects_empty_pool() {
	assert!(matches!(
		ranking::pack(Vec::new(), &Packing::default()),
		Err(rift_service::Error::EmptyAnswer { .. })
	));
}
