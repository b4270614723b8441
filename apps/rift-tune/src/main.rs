// crates.io
use clap::Parser;
// self
use rift_tune::Args;

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
	color_eyre::install()?;
	let args = Args::parse();
	rift_tune::run(args).await
}
