//! MongoDB persistence
//!
//! Typed collections and the document schemas shared by every store
//! implementation.

pub mod mongo;
pub mod schemas;

pub use mongo::{IntoIndexes, MongoClient, MongoCollection, MutMetadata};
