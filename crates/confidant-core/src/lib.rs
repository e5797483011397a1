//! Shared primitives for the Confidant core: the `Collection`/`KVDocStore`/
//! `CredentialsProvider` boundaries the trust-and-publication components are
//! built against (spec §6), plus an in-memory stub of each for tests.

pub mod auth;
pub mod collection;
pub mod filter;
pub mod kvstore;
pub mod model;
pub mod testing;

pub use auth::{AuthContext, CredentialsProvider, GroupMembership, Permissions};
pub use collection::{Collection, QueryOptions, StoredObject};
pub use filter::{FilterExpr, and, by_property, or};
pub use kvstore::{KVDocStore, WhereClause, WhereOp};
pub use model::{DocType, Location, Memory, MemoryContext, Relationship};
