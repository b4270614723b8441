mod error;
mod types;

pub use error::{Error, Result};
pub use types::{
	Config, Fusion, Gate, GateStep, IntentOverride, IntentOverrides, Knob, Packing,
	PipelineConfig, Prefilter, PrefilterRule, Providers, Rerank, RerankProviderConfig, Retrieval,
	SearchProviderConfig, Service, SweepDimension, Tuning, TuningPhase,
};

use std::{fs, path::Path};

pub fn load(path: &Path) -> Result<Config> {
	let raw = fs::read_to_string(path)
		.map_err(|err| Error::ReadConfig { path: path.to_path_buf(), source: err })?;

	let mut cfg: Config = toml::from_str(&raw)
		.map_err(|err| Error::ParseConfig { path: path.to_path_buf(), source: err })?;

	normalize(&mut cfg);

	validate(&cfg)?;

	Ok(cfg)
}

pub fn validate(cfg: &Config) -> Result<()> {
	if cfg.service.log_level.trim().is_empty() {
		return Err(Error::Validation {
			message: "service.log_level must be non-empty.".to_string(),
		});
	}

	for (label, base, key) in [
		("lexical", &cfg.providers.lexical.api_base, &cfg.providers.lexical.api_key),
		("vector", &cfg.providers.vector.api_base, &cfg.providers.vector.api_key),
		("rerank", &cfg.providers.rerank.api_base, &cfg.providers.rerank.api_key),
	] {
		if base.trim().is_empty() {
			return Err(Error::Validation {
				message: format!("Provider {label} api_base must be non-empty."),
			});
		}
		if key.trim().is_empty() {
			return Err(Error::Validation {
				message: format!("Provider {label} api_key must be non-empty."),
			});
		}
	}

	if cfg.providers.rerank.timeout_ms == 0 {
		return Err(Error::Validation {
			message: "providers.rerank.timeout_ms must be greater than zero.".to_string(),
		});
	}

	validate_pipeline(&cfg.pipeline)?;
	validate_tuning(&cfg.tuning)?;
	validate_gate(&cfg.gate)?;

	Ok(())
}

pub fn validate_pipeline(cfg: &PipelineConfig) -> Result<()> {
	if cfg.version == 0 {
		return Err(Error::Validation {
			message: "pipeline.version must be greater than zero.".to_string(),
		});
	}
	if cfg.retrieval.lexical_top_k == 0 || cfg.retrieval.vector_top_k == 0 {
		return Err(Error::Validation {
			message: "pipeline.retrieval top_k values must be greater than zero.".to_string(),
		});
	}
	if !cfg.fusion.k.is_finite() || cfg.fusion.k < 0.0 {
		return Err(Error::Validation {
			message: "pipeline.fusion.k must be a finite number, zero or greater.".to_string(),
		});
	}

	for (label, weight) in [
		("pipeline.fusion.lexical_weight", cfg.fusion.lexical_weight),
		("pipeline.fusion.vector_weight", cfg.fusion.vector_weight),
	] {
		if !weight.is_finite() || weight < 0.0 {
			return Err(Error::Validation {
				message: format!("{label} must be a finite number, zero or greater."),
			});
		}
	}

	if cfg.fusion.lexical_weight == 0.0 && cfg.fusion.vector_weight == 0.0 {
		return Err(Error::Validation {
			message: "pipeline.fusion weights must not both be zero.".to_string(),
		});
	}
	if cfg.prefilter.keep_top_fused == 0 {
		return Err(Error::Validation {
			message: "pipeline.prefilter.keep_top_fused must be greater than zero.".to_string(),
		});
	}
	if !cfg.prefilter.cosine_min.is_finite() {
		return Err(Error::Validation {
			message: "pipeline.prefilter.cosine_min must be a finite number.".to_string(),
		});
	}

	check_unit_interval("pipeline.rerank.alpha", cfg.rerank.alpha)?;

	if cfg.rerank.select_top_n == 0 {
		return Err(Error::Validation {
			message: "pipeline.rerank.select_top_n must be greater than zero.".to_string(),
		});
	}
	if cfg.rerank.select_top_n > cfg.prefilter.keep_top_fused {
		return Err(Error::Validation {
			message: "pipeline.rerank.select_top_n must not exceed pipeline.prefilter.keep_top_fused."
				.to_string(),
		});
	}
	if !cfg.rerank.tie_epsilon.is_finite() || cfg.rerank.tie_epsilon < 0.0 {
		return Err(Error::Validation {
			message: "pipeline.rerank.tie_epsilon must be a finite number, zero or greater."
				.to_string(),
		});
	}

	check_unit_interval("pipeline.packing.mmr_lambda", cfg.packing.mmr_lambda)?;

	if cfg.packing.context_cap_tokens == 0 {
		return Err(Error::Validation {
			message: "pipeline.packing.context_cap_tokens must be greater than zero.".to_string(),
		});
	}
	if cfg.packing.lookup_backstop_k == 0 {
		return Err(Error::Validation {
			message: "pipeline.packing.lookup_backstop_k must be greater than zero.".to_string(),
		});
	}

	for (label, intent) in [
		("lookup", &cfg.intents.lookup),
		("how_to", &cfg.intents.how_to),
		("status", &cfg.intents.status),
		("multi_hop", &cfg.intents.multi_hop),
	] {
		validate_intent_override(label, intent, cfg)?;
	}

	Ok(())
}

pub fn validate_gate(gate: &Gate) -> Result<()> {
	if gate.steps.is_empty() {
		return Err(Error::Validation { message: "gate.steps must be non-empty.".to_string() });
	}

	for step in &gate.steps {
		check_unit_interval("gate.steps.precision_min", step.precision_min)?;
		check_unit_interval("gate.steps.recall_min", step.recall_min)?;
		check_unit_interval("gate.steps.faithfulness_min", step.faithfulness_min)?;
	}

	Ok(())
}

fn validate_tuning(tuning: &Tuning) -> Result<()> {
	if tuning.concurrency == 0 {
		return Err(Error::Validation {
			message: "tuning.concurrency must be greater than zero.".to_string(),
		});
	}

	check_unit_interval("tuning.precision_floor", tuning.precision_floor)?;
	check_unit_interval("tuning.recall_floor", tuning.recall_floor)?;

	if tuning.phases.is_empty() {
		return Err(Error::Validation {
			message: "tuning.phases must be non-empty.".to_string(),
		});
	}

	for dimension in &tuning.dimensions {
		if dimension.values.is_empty() {
			return Err(Error::Validation {
				message: format!(
					"tuning.dimensions.{} must list at least one value.",
					dimension.knob.as_str()
				),
			});
		}
		if dimension.values.iter().any(|value| !value.is_finite()) {
			return Err(Error::Validation {
				message: format!(
					"tuning.dimensions.{} values must be finite numbers.",
					dimension.knob.as_str()
				),
			});
		}
	}

	Ok(())
}

fn validate_intent_override(
	label: &str,
	intent: &IntentOverride,
	cfg: &PipelineConfig,
) -> Result<()> {
	if intent.lexical_top_k == Some(0) || intent.vector_top_k == Some(0) {
		return Err(Error::Validation {
			message: format!("pipeline.intents.{label} top_k values must be greater than zero."),
		});
	}
	if let Some(cosine_min) = intent.cosine_min
		&& !cosine_min.is_finite()
	{
		return Err(Error::Validation {
			message: format!("pipeline.intents.{label}.cosine_min must be a finite number."),
		});
	}
	if let Some(select_top_n) = intent.select_top_n
		&& (select_top_n == 0 || select_top_n > cfg.prefilter.keep_top_fused)
	{
		return Err(Error::Validation {
			message: format!(
				"pipeline.intents.{label}.select_top_n must be between 1 and pipeline.prefilter.keep_top_fused."
			),
		});
	}
	if let Some(lambda) = intent.mmr_lambda {
		check_unit_interval(&format!("pipeline.intents.{label}.mmr_lambda"), lambda)?;
	}
	if intent.context_cap_tokens == Some(0) {
		return Err(Error::Validation {
			message: format!(
				"pipeline.intents.{label}.context_cap_tokens must be greater than zero."
			),
		});
	}

	Ok(())
}

fn check_unit_interval(label: &str, value: f64) -> Result<()> {
	if !value.is_finite() {
		return Err(Error::Validation { message: format!("{label} must be a finite number.") });
	}
	if !(0.0..=1.0).contains(&value) {
		return Err(Error::Validation {
			message: format!("{label} must be in the range 0.0-1.0."),
		});
	}

	Ok(())
}

fn normalize(cfg: &mut Config) {
	for base in [
		&mut cfg.providers.lexical.api_base,
		&mut cfg.providers.vector.api_base,
		&mut cfg.providers.rerank.api_base,
	] {
		let trimmed = base.trim().trim_end_matches('/').to_string();

		*base = trimmed;
	}

	if cfg.providers.rerank.max_retries > 1 {
		cfg.providers.rerank.max_retries = 1;
	}
}
