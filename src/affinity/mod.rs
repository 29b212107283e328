//! Affinity Builder (§4.7): resource-to-resource `SEE_ALSO` edges from
//! nearest-neighbor embedding similarity, optionally refined into a typed
//! relationship by an LLM second pass.

pub mod builder;

pub use builder::{AffinityBuilder, AffinityResult};
