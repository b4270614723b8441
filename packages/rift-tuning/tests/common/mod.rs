#![allow(dead_code)]

use std::{
	env,
	path::PathBuf,
	sync::atomic::{AtomicU64, AtomicUsize, Ordering},
	time::{SystemTime, UNIX_EPOCH},
};

use rift_config::PipelineConfig;
use rift_service::BoxFuture;
use rift_tuning::{
	AggregateMetrics, Error, EvaluationHarness, HarnessReport, LabeledQuery, Result, metrics,
};

pub type Scorer = fn(&PipelineConfig) -> Option<(f64, f64, f64)>;

/// Scores a config from its knobs alone. `None` from the scorer is a harness failure.
pub struct ScriptedHarness {
	scorer: Scorer,
	pub calls: AtomicUsize,
}
impl ScriptedHarness {
	pub fn new(scorer: Scorer) -> Self {
		Self { scorer, calls: AtomicUsize::new(0) }
	}
}

impl EvaluationHarness for ScriptedHarness {
	fn evaluate<'a>(
		&'a self,
		config: &'a PipelineConfig,
		_queries: &'a [LabeledQuery],
	) -> BoxFuture<'a, Result<HarnessReport>> {
		self.calls.fetch_add(1, Ordering::SeqCst);

		let outcome = match (self.scorer)(config) {
			Some((precision, recall, faithfulness)) => Ok(HarnessReport {
				config_version: config.version,
				per_query: Vec::new(),
				aggregate: aggregate(precision, recall, faithfulness),
			}),
			None => Err(Error::Harness { message: "scripted failure".to_string() }),
		};

		Box::pin(async move { outcome })
	}
}

pub fn aggregate(precision: f64, recall: f64, faithfulness: f64) -> AggregateMetrics {
	AggregateMetrics {
		precision,
		recall,
		f1: metrics::f1(precision, recall),
		faithfulness,
		..AggregateMetrics::default()
	}
}

pub fn queries() -> Vec<LabeledQuery> {
	vec![LabeledQuery::new("what port does OLLAMA_HOST use", &["env"])]
}

pub fn temp_state_dir(label: &str) -> PathBuf {
	static COUNTER: AtomicU64 = AtomicU64::new(0);

	let nanos = SystemTime::now()
		.duration_since(UNIX_EPOCH)
		.expect("System time must be valid.")
		.as_nanos();
	let ordinal = COUNTER.fetch_add(1, Ordering::SeqCst);
	let pid = std::process::id();
	let mut path = env::temp_dir();

	path.push(format!("rift_tuning_{label}_{nanos}_{pid}_{ordinal}"));

	path
}
