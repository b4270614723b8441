mod diversity;
mod fusion;
mod policy;
mod prefilter;
mod rerank;

pub use diversity::{Packed, pack};
pub use fusion::{cmp_f64_desc, fuse, fused_score};
pub use policy::{ResolvedIntentPolicy, resolve_intent_policy};
pub use prefilter::{filter, should_drop, signal};
pub use rerank::{RerankCallPolicy, blend, select_top_n};

pub(crate) use rerank::{RerankOutcome, rerank};
