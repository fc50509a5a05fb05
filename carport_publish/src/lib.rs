//! # Carport publish pipeline
//!
//! Builds a hierarchical content-addressed directory tree incrementally
//! as files arrive out of order, recomputes ancestor ids bottom-up,
//! serializes sub-trees into self-contained archives, and coordinates
//! concurrent publish campaigns over shared per-campaign state.
//!
//! ## Layers
//! 1. `node` / `tree` – pure data structures (CBOR encoded) and the
//!    bottom-up rewrite that grafts files into the tree.
//! 2. `archive` – self-contained serialization of a node plus everything
//!    reachable from it.
//! 3. `session` / `registry` – per-campaign mutable state behind a
//!    mutex, looked up by campaign id.
//! 4. `publisher` – the save/finalize façade storage drivers call into.
//!
//! External collaborators enter through two traits: the content store
//! (`carport_core::BlockStore`) and the remote archive service
//! ([`RemoteStore`]).

mod archive;
mod error;
mod node;
mod publisher;
mod registry;
mod remote;
mod session;
mod tree;

pub use archive::Archive;
pub use error::{PublishError, PublishResult};
pub use node::{DirNode, Link};
pub use publisher::{DEFAULT_TIMEOUT, LOCATOR_SCHEME, Publisher, SessionHandle};
pub use registry::SessionRegistry;
pub use remote::RemoteStore;
#[cfg(not(target_arch = "wasm32"))]
pub use remote::cli::{CliRemote, CliRemoteConfig};
pub use session::PublishSession;
