use std::collections::BTreeMap;
use std::convert::Infallible;

use bytes::Bytes;
use carport_core::ContentId;
use minicbor::{CborLen, Decode, Encode};

use crate::error::PublishResult;

const DIR_MAGIC: &str = "carport/dir1";

/// A content-addressed directory node: a named link table.
///
/// Nodes are immutable by replacement. Any link change produces a new
/// node with a new [`ContentId`]; the previous node becomes unreachable
/// garbage once no ancestor points at it, and its id must never be reused.
///
/// The canonical serialization orders links by name (`BTreeMap` key
/// order), so the id is independent of insertion order.
#[derive(Encode, Decode, CborLen, Clone, Debug, PartialEq)]
#[cbor(array)]
pub struct DirNode {
    #[n(0)]
    magic: String,
    #[n(1)]
    pub links: BTreeMap<String, Link>,
}

/// A single entry in a directory node's link table.
///
/// A file link's target is caller-supplied content assumed to reside in
/// (or be about to be added to) the backing store; a directory link's
/// target must resolve to a `DirNode` in that same store.
#[derive(Encode, Decode, CborLen, Clone, Debug, PartialEq)]
#[cbor(map)]
pub struct Link {
    #[n(0)]
    #[cbor(with = "minicbor::bytes")]
    pub target: [u8; 32],
    #[n(1)]
    pub is_dir: bool,
}

impl Link {
    pub fn file(target: ContentId) -> Self {
        Self {
            target: target.into(),
            is_dir: false,
        }
    }

    pub fn dir(target: ContentId) -> Self {
        Self {
            target: target.into(),
            is_dir: true,
        }
    }

    pub fn target_id(&self) -> ContentId {
        ContentId::from_bytes(self.target)
    }
}

impl DirNode {
    /// Creates an empty directory node.
    pub fn new() -> Self {
        Self {
            magic: DIR_MAGIC.to_string(),
            links: BTreeMap::new(),
        }
    }

    /// Decodes a node from CBOR bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<DirNode, minicbor::decode::Error> {
        minicbor::decode(bytes)
    }

    /// Encodes this node to CBOR.
    pub fn to_vec(&self) -> Result<Vec<u8>, minicbor::encode::Error<Infallible>> {
        minicbor::to_vec(self)
    }

    pub fn to_bytes(&self) -> Result<Bytes, minicbor::encode::Error<Infallible>> {
        Ok(self.to_vec()?.into())
    }

    /// The id of this node's canonical serialization. A pure function of
    /// the current link set.
    pub fn id(&self) -> PublishResult<ContentId> {
        Ok(ContentId::from_data(self.to_vec()?))
    }
}

impl Default for DirNode {
    fn default() -> Self {
        Self::new()
    }
}
