//! treadle-core: store and fingerprint primitives for the treadle build engine
//!
//! This crate provides the leaf types the engine is built on:
//! - `Store`: the persisted key→value mapping plus one strategy-owned metadata value
//! - `ContentDigest` / `Fingerprint`: deterministic value fingerprinting
//! - `ContentStore`: the content-addressable cache contract and its in-memory backend

mod content;
mod digest;
mod error;
mod store;

pub use content::{ContentStore, MemoryContentStore};
pub use digest::{ContentDigest, DigestError, Fingerprint, digest_bytes};
pub use error::StoreError;
pub use store::{Store, ValueStore};
