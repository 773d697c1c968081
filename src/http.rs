//! HTTP helpers for issuer document retrieval.

pub mod client;
