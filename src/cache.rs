//! Time-boxed in-memory caches for issuer metadata and key sets.

pub mod entry;
pub mod manager;
pub mod state;
