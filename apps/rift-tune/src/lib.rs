use std::{path::PathBuf, sync::Arc};

use clap::Parser;

use rift_service::RetrievalService;
use rift_tuning::{ReplayHarness, StateStore, TuningController};

#[derive(Debug, Parser)]
#[command(
	version = rift_cli::VERSION,
	rename_all = "kebab",
	styles = rift_cli::styles(),
)]
pub struct Args {
	#[arg(long, short = 'c', value_name = "FILE")]
	pub config: PathBuf,
	/// JSON file of labeled queries.
	#[arg(long, short = 'd', value_name = "FILE")]
	pub dataset: PathBuf,
	/// Directory holding config snapshots, gate state, and evaluation history.
	#[arg(long, short = 's', value_name = "DIR")]
	pub state_dir: PathBuf,
	/// Evaluate and sweep without persisting or publishing anything.
	#[arg(long)]
	pub dry_run: bool,
}

pub async fn run(args: Args) -> color_eyre::Result<()> {
	let config = rift_config::load(&args.config)?;

	rift_cli::init_tracing(&config.service.log_level);

	let dataset = rift_tuning::load_dataset(&args.dataset)?;
	let service = Arc::new(RetrievalService::from_config(&config)?);
	let harness = ReplayHarness::new(Arc::clone(&service), config.tuning.concurrency);
	let store = StateStore::open(&args.state_dir)?;
	let mut controller = TuningController::open(
		Arc::clone(&service.config),
		Arc::new(harness),
		store,
		config.tuning.clone(),
		&config.gate,
	)?;

	tracing::info!(
		dataset = dataset.name.as_deref().unwrap_or("unnamed"),
		queries = dataset.queries.len(),
		dry_run = args.dry_run,
		"Starting tuning cycle."
	);

	let report = controller.run_cycle(&dataset.queries, args.dry_run).await?;
	let json = serde_json::to_string_pretty(&report)?;

	println!("{json}");

	Ok(())
}
