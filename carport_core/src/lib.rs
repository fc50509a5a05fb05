//! Core carport types and traits.
//!
//! This crate defines the small shared surface used by all carport crates:
//!
//! - Content identifiers (`id::ContentId`) — blake3-derived, multibase
//!   encoded, used both as store keys and as integrity proofs.
//! - The content-addressed storage contract (`store::BlockStore`) consumed
//!   by the publish pipeline; backends live in their own crates.
//!
//! Identifier encoding is wire-stable; changes to it are considered
//! protocol changes.

pub mod id;
pub mod store;

pub use id::{ContentId, ContentIdError};
pub use store::{BlockStore, StoreError, StoreResult};
