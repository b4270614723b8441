mod common;

use std::fs;

use rift_config::{GateStep, PipelineConfig, PrefilterRule};
use rift_tuning::{
	Error, EvaluationResult, GateRecord, RatchetState, StateStore, evaluation::QueryMetrics,
};

fn evaluation(config_version: u64, passed: bool) -> EvaluationResult {
	EvaluationResult {
		run_id: format!("run-{config_version}"),
		config_version,
		gate_step: 0,
		thresholds: GateStep { precision_min: 0.3, recall_min: 0.5, faithfulness_min: 0.5 },
		passed,
		aggregate: common::aggregate(0.5, 0.5, 1.0),
		per_query: vec![QueryMetrics {
			id: "q1".to_string(),
			query: "what port does OLLAMA_HOST use".to_string(),
			retrieved_doc_ids: vec!["env".to_string()],
			precision: 1.0,
			recall: 1.0,
			rr: 1.0,
			faithfulness: 1.0,
			latency_ms: 3.5,
			error: None,
		}],
		recorded_at: "2026-01-01T00:00:00Z".to_string(),
	}
}

#[test]
fn config_snapshots_round_trip_and_stay_monotonic() {
	let root = common::temp_state_dir("configs");
	let store = StateStore::open(&root).expect("Store must open.");

	assert_eq!(store.load_current_config().expect("Load must succeed."), None);

	let mut first = PipelineConfig::default();

	first.prefilter.rule = PrefilterRule::SignalOnly;
	first.packing.mmr_lambda = 0.55;

	let path = store.save_config(&first).expect("First snapshot must save.");

	assert!(path.ends_with("configs/pipeline-v1.toml"));
	assert_eq!(store.load_current_config().expect("Load must succeed."), Some(first.clone()));

	let err = store.save_config(&first).expect_err("Same version must be rejected.");

	assert!(matches!(err, Error::StaleWrite { current: 1, attempted: 1, .. }));

	let second = first.successor();

	store.save_config(&second).expect("Successor must save.");

	assert_eq!(store.current_version().expect("Pointer must read."), Some(2));
	assert_eq!(store.load_config(1).expect("Old snapshot must stay."), first);
	assert!(!root.join("configs/pipeline-v2.tmp").exists());

	fs::remove_dir_all(&root).expect("Failed to remove state dir.");
}

#[test]
fn gate_record_round_trips_and_rejects_stale_versions() {
	let root = common::temp_state_dir("gate");
	let store = StateStore::open(&root).expect("Store must open.");
	let record = GateRecord {
		ratchet: RatchetState { version: 3, step_index: 1, consecutive_passes: 1 },
		steps: vec![
			GateStep { precision_min: 0.3, recall_min: 0.5, faithfulness_min: 0.5 },
			GateStep { precision_min: 0.4, recall_min: 0.6, faithfulness_min: 0.7 },
		],
	};

	store.save_gate(&record).expect("Gate must save.");

	assert_eq!(store.load_gate().expect("Gate must load."), Some(record.clone()));

	let stale = GateRecord {
		ratchet: RatchetState { version: 2, ..record.ratchet },
		steps: record.steps.clone(),
	};

	assert!(matches!(store.save_gate(&stale), Err(Error::StaleWrite { kind: "gate", .. })));

	let raw = fs::read_to_string(root.join("gate.toml")).expect("Gate file must exist.");

	assert!(raw.contains("step_index = 1"));

	fs::remove_dir_all(&root).expect("Failed to remove state dir.");
}

#[test]
fn evaluations_append_in_order() {
	let root = common::temp_state_dir("history");
	let store = StateStore::open(&root).expect("Store must open.");

	assert!(store.evaluations().expect("Empty history must read.").is_empty());

	store.append_evaluation(&evaluation(1, false)).expect("Append must succeed.");
	store.append_evaluation(&evaluation(2, true)).expect("Append must succeed.");

	let history = store.evaluations().expect("History must read.");

	assert_eq!(history, vec![evaluation(1, false), evaluation(2, true)]);

	fs::remove_dir_all(&root).expect("Failed to remove state dir.");
}
