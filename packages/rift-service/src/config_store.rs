use std::sync::Arc;

use arc_swap::ArcSwap;

use crate::{Error, Result};
use rift_config::PipelineConfig;

/// Process-wide pointer to the live pipeline snapshot.
///
/// Readers take an `Arc` and keep it for the whole request, so a publish never changes the
/// knobs of an in-flight query.
pub struct ConfigStore {
	current: ArcSwap<PipelineConfig>,
}
impl ConfigStore {
	pub fn new(initial: PipelineConfig) -> Result<Self> {
		rift_config::validate_pipeline(&initial)?;

		Ok(Self { current: ArcSwap::from_pointee(initial) })
	}

	pub fn current(&self) -> Arc<PipelineConfig> {
		self.current.load_full()
	}

	pub fn version(&self) -> u64 {
		self.current.load().version
	}

	/// Swap in `next` if it validates and carries a strictly greater version than the live one.
	pub fn publish(&self, next: PipelineConfig) -> Result<Arc<PipelineConfig>> {
		rift_config::validate_pipeline(&next)?;

		let next = Arc::new(next);
		let mut current = self.current.load_full();

		loop {
			if next.version <= current.version {
				return Err(Error::StaleConfig {
					current: current.version,
					attempted: next.version,
				});
			}

			let previous = self.current.compare_and_swap(&current, Arc::clone(&next));

			if Arc::ptr_eq(&*previous, &current) {
				break;
			}

			current = arc_swap::Guard::into_inner(previous);
		}

		tracing::info!(
			previous_version = current.version,
			version = next.version,
			"Published pipeline config."
		);

		Ok(next)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn publish_requires_strictly_greater_version() {
		let store =
			ConfigStore::new(PipelineConfig::default()).expect("Default config must be valid.");
		let held = store.current();
		let next = held.successor();

		store.publish(next.clone()).expect("Successor must publish.");

		assert_eq!(store.version(), 2);
		assert_eq!(held.version, 1);

		let err = store.publish(next).expect_err("Same version must be rejected.");

		assert!(matches!(err, Error::StaleConfig { current: 2, attempted: 2 }));
	}

	#[test]
	fn publish_rejects_invalid_snapshot() {
		let store =
			ConfigStore::new(PipelineConfig::default()).expect("Default config must be valid.");
		let mut next = store.current().successor();

		next.rerank.alpha = 2.0;

		assert!(matches!(store.publish(next), Err(Error::InvalidRequest { .. })));
		assert_eq!(store.version(), 1);
	}
}
