pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("Retrieval unavailable: {message}")]
	RetrievalUnavailable { message: String },
	#[error("Rerank degraded: {message}")]
	RerankDegraded { message: String },
	#[error("Empty answer: {message}")]
	EmptyAnswer { message: String },
	#[error("Invalid candidate: {message}")]
	InvalidCandidate { message: String },
	#[error("Invalid request: {message}")]
	InvalidRequest { message: String },
	#[error("Stale config: version {attempted} does not supersede published version {current}.")]
	StaleConfig { current: u64, attempted: u64 },
	#[error("Request cancelled.")]
	Cancelled,
	#[error("Provider error: {message}")]
	Provider { message: String },
}
impl From<rift_config::Error> for Error {
	fn from(err: rift_config::Error) -> Self {
		Self::InvalidRequest { message: err.to_string() }
	}
}
