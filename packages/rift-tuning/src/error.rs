use std::path::PathBuf;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("Sweep value {value} for {dimension} regressed every metric against the baseline.")]
	TuningDivergence { dimension: String, value: f64 },
	#[error("Evaluation harness failed: {message}")]
	Harness { message: String },
	#[error("State store error at {path:?}: {message}")]
	Store { path: PathBuf, message: String },
	#[error("Refusing to write {kind} version {attempted}; version {current} is already stored.")]
	StaleWrite { kind: &'static str, current: u64, attempted: u64 },
	#[error("{message}")]
	Validation { message: String },
	#[error(transparent)]
	Config(#[from] rift_config::Error),
	#[error(transparent)]
	Service(#[from] rift_service::Error),
}
impl Error {
	pub(crate) fn store(path: &std::path::Path, err: impl std::fmt::Display) -> Self {
		Self::Store { path: path.to_path_buf(), message: err.to_string() }
	}
}
