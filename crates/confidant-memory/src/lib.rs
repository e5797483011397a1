//! Memory & Relationship Service (spec §4.5 / C5): owner-scoped CRUD and
//! search over a per-user collection shared by memories and relationships.

pub mod memory_service;
pub mod model;
pub mod relationship_service;

pub use memory_service::{DeleteOutcome, MemoryService};
pub use model::{DocRecord, MemoryPatch, NewMemory, NewRelationship, RelationshipPatch};
pub use relationship_service::RelationshipService;
