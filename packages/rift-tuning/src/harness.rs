use std::{collections::HashSet, sync::Arc, time::Instant};

use tokio::{sync::Semaphore, task::JoinSet};
use tokio_util::sync::CancellationToken;

use crate::{
	Error, Result,
	evaluation::{HarnessReport, LabeledQuery, QueryMetrics},
	metrics,
};
use rift_config::PipelineConfig;
use rift_service::{BoxFuture, RetrievalService, SearchRequest};

/// Scores a pipeline snapshot against labeled queries.
pub trait EvaluationHarness
where
	Self: Send + Sync,
{
	fn evaluate<'a>(
		&'a self,
		config: &'a PipelineConfig,
		queries: &'a [LabeledQuery],
	) -> BoxFuture<'a, Result<HarnessReport>>;
}

/// Replays labeled queries through the live pipeline with an explicit config snapshot.
pub struct ReplayHarness {
	service: Arc<RetrievalService>,
	concurrency: usize,
	cancel: CancellationToken,
}
impl ReplayHarness {
	pub fn new(service: Arc<RetrievalService>, concurrency: u32) -> Self {
		Self { service, concurrency: concurrency.max(1) as usize, cancel: CancellationToken::new() }
	}

	pub fn with_cancel(mut self, cancel: CancellationToken) -> Self {
		self.cancel = cancel;

		self
	}

	async fn replay(
		&self,
		config: &PipelineConfig,
		queries: &[LabeledQuery],
	) -> Result<HarnessReport> {
		if queries.is_empty() {
			return Err(Error::Harness { message: "No labeled queries to replay.".to_string() });
		}

		let config = Arc::new(config.clone());
		let semaphore = Arc::new(Semaphore::new(self.concurrency));
		let mut tasks = JoinSet::new();

		for (index, labeled) in queries.iter().cloned().enumerate() {
			let permit = Arc::clone(&semaphore).acquire_owned().await.map_err(|err| {
				Error::Harness { message: format!("Replay worker pool closed: {err}.") }
			})?;
			let service = Arc::clone(&self.service);
			let config = Arc::clone(&config);
			let cancel = self.cancel.child_token();

			tasks.spawn(async move {
				let metrics = replay_one(&service, &config, index, labeled, &cancel).await;

				drop(permit);

				(index, metrics)
			});
		}

		let mut slots: Vec<Option<QueryMetrics>> = vec![None; queries.len()];

		while let Some(joined) = tasks.join_next().await {
			let (index, metrics) = joined
				.map_err(|err| Error::Harness { message: format!("Replay task failed: {err}.") })?;

			slots[index] = Some(metrics?);
		}

		let per_query: Vec<QueryMetrics> = slots.into_iter().flatten().collect();

		if per_query.iter().all(|query| query.error.is_some()) {
			return Err(Error::Harness {
				message: format!("All {} replayed queries failed.", per_query.len()),
			});
		}

		let aggregate = metrics::summarize(&per_query);

		tracing::debug!(
			config_version = config.version,
			queries = per_query.len(),
			precision = aggregate.precision,
			recall = aggregate.recall,
			faithfulness = aggregate.faithfulness,
			"Replay finished."
		);

		Ok(HarnessReport { config_version: config.version, per_query, aggregate })
	}
}

impl EvaluationHarness for ReplayHarness {
	fn evaluate<'a>(
		&'a self,
		config: &'a PipelineConfig,
		queries: &'a [LabeledQuery],
	) -> BoxFuture<'a, Result<HarnessReport>> {
		Box::pin(self.replay(config, queries))
	}
}

/// A failed query scores zero and keeps its error. Only cancellation aborts the replay.
async fn replay_one(
	service: &RetrievalService,
	config: &PipelineConfig,
	index: usize,
	labeled: LabeledQuery,
	cancel: &CancellationToken,
) -> Result<QueryMetrics> {
	let id = labeled.label(index);
	let request =
		SearchRequest { query: labeled.query.clone(), intent: labeled.intent, session_id: None };
	let started = Instant::now();
	let outcome = service.search_with_config(config, request, cancel).await;
	let latency_ms = started.elapsed().as_secs_f64() * 1_000.0;
	let expected: HashSet<&str> = labeled.expected_doc_ids.iter().map(String::as_str).collect();

	match outcome {
		Ok(envelope) => {
			let retrieved: Vec<String> =
				envelope.doc_ids().into_iter().map(str::to_string).collect();
			let scored = metrics::compute_metrics(&retrieved, &expected);

			Ok(QueryMetrics {
				id,
				query: labeled.query,
				retrieved_doc_ids: retrieved,
				precision: scored.precision,
				recall: scored.recall,
				rr: scored.rr,
				faithfulness: scored.faithfulness,
				latency_ms,
				error: None,
			})
		},
		Err(rift_service::Error::Cancelled) =>
			Err(Error::Harness { message: format!("Replay of {id} was cancelled.") }),
		Err(err) => {
			tracing::warn!(error = %err, query_id = id.as_str(), "Replayed query failed.");

			Ok(QueryMetrics {
				id,
				query: labeled.query,
				retrieved_doc_ids: Vec::new(),
				precision: 0.0,
				recall: 0.0,
				rr: 0.0,
				faithfulness: 0.0,
				latency_ms,
				error: Some(err.to_string()),
			})
		},
	}
}
