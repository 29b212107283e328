//! Canonical data model (spec §3): the shapes every other module reads and
//! writes. Each submodule owns one table or value type; nothing here talks
//! to storage.

pub mod embedding;
pub mod entity;
pub mod image;
pub mod job;
pub mod kv;
pub mod model;
pub mod moment;
pub mod resource;
pub mod session;
pub mod user_context;

pub use embedding::{cosine_similarity, l2_distance, EmbeddingRecord};
pub use entity::{merge_edge, EntityMeta, GraphEdge};
pub use image::Image;
pub use job::{DataWindow, Job, JobMode, JobStatus};
pub use kv::{KvEntry, ReverseNameEntry};
pub use model::{EmbeddingFieldSpec, ModelDescriptor};
pub use moment::{Moment, MomentType, MomentValidationIssue, PersonDescriptor, SpeakerDescriptor};
pub use resource::{EntityDescriptor, EntityKind, Resource};
pub use session::{Message, Session};
pub use user_context::UserContext;
