use std::{
	fs::{self, OpenOptions},
	io::Write,
	path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};

use crate::{
	Error, Result,
	evaluation::EvaluationResult,
	gate::{GateRatchet, RatchetState},
};
use rift_config::{GateStep, PipelineConfig};

const CONFIGS_DIR: &str = "configs";
const CURRENT_FILE: &str = "CURRENT";
const GATE_FILE: &str = "gate.toml";
const HISTORY_FILE: &str = "evaluations.jsonl";

/// Gate thresholds together with the ratchet position, as stored in `gate.toml`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GateRecord {
	pub ratchet: RatchetState,
	pub steps: Vec<GateStep>,
}
impl From<&GateRatchet> for GateRecord {
	fn from(ratchet: &GateRatchet) -> Self {
		Self { ratchet: ratchet.state(), steps: ratchet.steps().to_vec() }
	}
}

/// On-disk tuning state:
///
/// - `configs/pipeline-v{version}.toml` plus a `configs/CURRENT` pointer,
/// - `gate.toml`,
/// - `evaluations.jsonl`, append only.
///
/// Snapshot and gate writes go through a temp file and a rename.
#[derive(Clone, Debug)]
pub struct StateStore {
	root: PathBuf,
}
impl StateStore {
	pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
		let root = root.into();
		let configs = root.join(CONFIGS_DIR);

		fs::create_dir_all(&configs).map_err(|err| Error::store(&configs, err))?;

		Ok(Self { root })
	}

	pub fn root(&self) -> &Path {
		&self.root
	}

	pub fn config_path(&self, version: u64) -> PathBuf {
		self.root.join(CONFIGS_DIR).join(format!("pipeline-v{version}.toml"))
	}

	pub fn current_version(&self) -> Result<Option<u64>> {
		let path = self.root.join(CONFIGS_DIR).join(CURRENT_FILE);
		let Some(raw) = read_optional(&path)? else { return Ok(None) };
		let version = raw.trim().parse::<u64>().map_err(|err| Error::store(&path, err))?;

		Ok(Some(version))
	}

	pub fn load_config(&self, version: u64) -> Result<PipelineConfig> {
		let path = self.config_path(version);
		let raw = fs::read_to_string(&path).map_err(|err| Error::store(&path, err))?;
		let cfg: PipelineConfig = toml::from_str(&raw).map_err(|err| Error::store(&path, err))?;

		if cfg.version != version {
			return Err(Error::store(
				&path,
				format!("snapshot declares version {} instead of {version}", cfg.version),
			));
		}

		Ok(cfg)
	}

	pub fn load_current_config(&self) -> Result<Option<PipelineConfig>> {
		match self.current_version()? {
			Some(version) => self.load_config(version).map(Some),
			None => Ok(None),
		}
	}

	/// Write a snapshot and point `CURRENT` at it. The version must beat the current one.
	pub fn save_config(&self, cfg: &PipelineConfig) -> Result<PathBuf> {
		if let Some(current) = self.current_version()?
			&& cfg.version <= current
		{
			return Err(Error::StaleWrite {
				kind: "pipeline config",
				current,
				attempted: cfg.version,
			});
		}

		let path = self.config_path(cfg.version);
		let raw = toml::to_string_pretty(cfg).map_err(|err| Error::store(&path, err))?;

		let pointer = self.root.join(CONFIGS_DIR).join(CURRENT_FILE);

		write_atomic(&path, raw.as_bytes())?;
		write_atomic(&pointer, cfg.version.to_string().as_bytes())?;

		Ok(path)
	}

	pub fn load_gate(&self) -> Result<Option<GateRecord>> {
		let path = self.root.join(GATE_FILE);
		let Some(raw) = read_optional(&path)? else { return Ok(None) };
		let record = toml::from_str(&raw).map_err(|err| Error::store(&path, err))?;

		Ok(Some(record))
	}

	pub fn save_gate(&self, record: &GateRecord) -> Result<()> {
		if let Some(stored) = self.load_gate()?
			&& record.ratchet.version <= stored.ratchet.version
		{
			return Err(Error::StaleWrite {
				kind: "gate",
				current: stored.ratchet.version,
				attempted: record.ratchet.version,
			});
		}

		let path = self.root.join(GATE_FILE);
		let raw = toml::to_string_pretty(record).map_err(|err| Error::store(&path, err))?;

		write_atomic(&path, raw.as_bytes())
	}

	pub fn append_evaluation(&self, result: &EvaluationResult) -> Result<()> {
		let path = self.root.join(HISTORY_FILE);
		let mut line = serde_json::to_string(result).map_err(|err| Error::store(&path, err))?;

		line.push('\n');

		let mut file = OpenOptions::new()
			.create(true)
			.append(true)
			.open(&path)
			.map_err(|err| Error::store(&path, err))?;

		file.write_all(line.as_bytes()).map_err(|err| Error::store(&path, err))?;
		file.sync_all().map_err(|err| Error::store(&path, err))?;

		Ok(())
	}

	pub fn evaluations(&self) -> Result<Vec<EvaluationResult>> {
		let path = self.root.join(HISTORY_FILE);
		let Some(raw) = read_optional(&path)? else { return Ok(Vec::new()) };

		raw.lines()
			.filter(|line| !line.trim().is_empty())
			.map(|line| serde_json::from_str(line).map_err(|err| Error::store(&path, err)))
			.collect()
	}
}

fn read_optional(path: &Path) -> Result<Option<String>> {
	match fs::read_to_string(path) {
		Ok(raw) => Ok(Some(raw)),
		Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
		Err(err) => Err(Error::store(path, err)),
	}
}

fn write_atomic(path: &Path, data: &[u8]) -> Result<()> {
	let tmp_path = path.with_extension("tmp");

	{
		let mut file = fs::File::create(&tmp_path).map_err(|err| Error::store(&tmp_path, err))?;

		file.write_all(data).map_err(|err| Error::store(&tmp_path, err))?;
		file.sync_all().map_err(|err| Error::store(&tmp_path, err))?;
	}

	fs::rename(&tmp_path, path).map_err(|err| Error::store(path, err))
}
