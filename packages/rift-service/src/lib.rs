pub mod config_store;
pub mod search;

mod error;

pub use config_store::ConfigStore;
pub use error::{Error, Result};
pub use rift_providers::{rerank::RerankDocument, search::SearchHit};
pub use search::{
	AnswerEnvelope, Candidate, EvidenceHeader, FusedCandidate, Query, RerankCallPolicy,
	RerankedCandidate, SearchRequest,
};

use std::{future::Future, pin::Pin, sync::Arc};

use rift_config::{RerankProviderConfig, SearchProviderConfig};

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// A ranked index over the document corpus. Both the lexical and the vector index implement it.
pub trait SearchIndex
where
	Self: Send + Sync,
{
	fn search<'a>(
		&'a self,
		query: &'a str,
		top_k: u32,
	) -> BoxFuture<'a, color_eyre::Result<Vec<SearchHit>>>;
}

pub trait RerankProvider
where
	Self: Send + Sync,
{
	/// Scores come back aligned with `docs`.
	fn rerank<'a>(
		&'a self,
		query: &'a str,
		docs: &'a [RerankDocument],
	) -> BoxFuture<'a, color_eyre::Result<Vec<f64>>>;
}

#[derive(Clone)]
pub struct Providers {
	pub lexical: Arc<dyn SearchIndex>,
	pub vector: Arc<dyn SearchIndex>,
	pub rerank: Arc<dyn RerankProvider>,
}
impl Providers {
	pub fn new(
		lexical: Arc<dyn SearchIndex>,
		vector: Arc<dyn SearchIndex>,
		rerank: Arc<dyn RerankProvider>,
	) -> Self {
		Self { lexical, vector, rerank }
	}

	pub fn http(cfg: &rift_config::Providers) -> Self {
		Self {
			lexical: Arc::new(HttpSearchIndex { cfg: cfg.lexical.clone() }),
			vector: Arc::new(HttpSearchIndex { cfg: cfg.vector.clone() }),
			rerank: Arc::new(HttpRerankProvider { cfg: cfg.rerank.clone() }),
		}
	}
}

pub struct RetrievalService {
	pub config: Arc<ConfigStore>,
	pub providers: Providers,
	pub rerank_call: RerankCallPolicy,
}
impl RetrievalService {
	pub fn new(config: Arc<ConfigStore>, providers: Providers) -> Self {
		Self { config, providers, rerank_call: RerankCallPolicy::default() }
	}

	pub fn from_config(cfg: &rift_config::Config) -> Result<Self> {
		let store = ConfigStore::new(cfg.pipeline.clone())?;

		Ok(Self {
			config: Arc::new(store),
			providers: Providers::http(&cfg.providers),
			rerank_call: RerankCallPolicy::from_config(&cfg.providers.rerank),
		})
	}

	pub fn with_rerank_call(mut self, rerank_call: RerankCallPolicy) -> Self {
		self.rerank_call = rerank_call;

		self
	}
}

struct HttpSearchIndex {
	cfg: SearchProviderConfig,
}

struct HttpRerankProvider {
	cfg: RerankProviderConfig,
}

impl SearchIndex for HttpSearchIndex {
	fn search<'a>(
		&'a self,
		query: &'a str,
		top_k: u32,
	) -> BoxFuture<'a, color_eyre::Result<Vec<SearchHit>>> {
		Box::pin(rift_providers::search::search(&self.cfg, query, top_k))
	}
}

impl RerankProvider for HttpRerankProvider {
	fn rerank<'a>(
		&'a self,
		query: &'a str,
		docs: &'a [RerankDocument],
	) -> BoxFuture<'a, color_eyre::Result<Vec<f64>>> {
		Box::pin(rift_providers::rerank::rerank(&self.cfg, query, docs))
	}
}
