//! Self-contained serialized archives.
//!
//! An archive carries a root id plus every block reachable from it that
//! the content store can resolve, so it can be verified and unpacked
//! without access to the store that produced it. Links that do not
//! resolve (file references whose content lives in a separate archive)
//! are left dangling; the remote binder stitches the full archive set
//! back together under the root id.

use std::collections::HashSet;
use std::convert::Infallible;

use bytes::Bytes;
use carport_core::{BlockStore, ContentId, StoreError};
use minicbor::{CborLen, Decode, Encode};

use crate::error::{PublishError, PublishResult};
use crate::node::DirNode;

const ARCHIVE_MAGIC: &str = "carport/ar1";

#[derive(Encode, Decode, CborLen, Clone, Debug)]
#[cbor(array)]
pub struct Archive {
    #[n(0)]
    magic: String,
    #[n(1)]
    #[cbor(with = "minicbor::bytes")]
    root: [u8; 32],
    #[n(2)]
    blocks: Vec<Block>,
}

#[derive(Encode, Decode, CborLen, Clone, Debug)]
#[cbor(array)]
pub struct Block {
    #[n(0)]
    #[cbor(with = "minicbor::bytes")]
    hash: [u8; 32],
    #[n(1)]
    #[cbor(with = "minicbor::bytes")]
    data: Vec<u8>,
}

impl Archive {
    /// Packs a single blob into its own archive. Used for incoming files
    /// before they are grafted into the directory tree.
    pub fn single_file(bytes: Bytes) -> Self {
        let root = ContentId::from_data(&bytes);
        Self {
            magic: ARCHIVE_MAGIC.to_string(),
            root: root.into(),
            blocks: vec![Block {
                hash: root.into(),
                data: bytes.to_vec(),
            }],
        }
    }

    /// Builds an archive for `root` by walking the content store.
    ///
    /// The root block must exist. Directory nodes are followed link by
    /// link; a link whose target is absent from the store is a file
    /// reference and is skipped.
    pub async fn build(store: &dyn BlockStore, root: ContentId) -> PublishResult<Self> {
        let mut blocks = Vec::new();
        let mut seen: HashSet<ContentId> = HashSet::new();
        let mut queue = vec![root];
        let mut is_root = true;

        while let Some(id) = queue.pop() {
            if !seen.insert(id) {
                continue;
            }
            let bytes = match store.get(id).await {
                Ok(bytes) => bytes,
                // only the root is required to resolve
                Err(StoreError::NotFound) if !is_root => continue,
                Err(err) => return Err(err.into()),
            };
            is_root = false;
            if let Ok(node) = DirNode::from_bytes(&bytes) {
                queue.extend(node.links.values().map(|link| link.target_id()));
            }
            blocks.push(Block {
                hash: id.into(),
                data: bytes.to_vec(),
            });
        }

        Ok(Self {
            magic: ARCHIVE_MAGIC.to_string(),
            root: root.into(),
            blocks,
        })
    }

    pub fn root_id(&self) -> ContentId {
        ContentId::from_bytes(self.root)
    }

    /// Iterates over `(id, data)` pairs of all contained blocks.
    pub fn blocks(&self) -> impl Iterator<Item = (ContentId, &[u8])> {
        self.blocks
            .iter()
            .map(|b| (ContentId::from_bytes(b.hash), b.data.as_slice()))
    }

    /// Checks that every block's data matches its id and that the root
    /// block is present.
    pub fn verify(&self) -> PublishResult<()> {
        for block in &self.blocks {
            let actual = ContentId::from_data(&block.data);
            if actual != ContentId::from_bytes(block.hash) {
                return Err(PublishError::CorruptArchive(actual.fmt_short()));
            }
        }
        if !self.blocks.iter().any(|b| b.hash == self.root) {
            return Err(PublishError::CorruptArchive(self.root_id().fmt_short()));
        }
        Ok(())
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Archive, minicbor::decode::Error> {
        minicbor::decode(bytes)
    }

    pub fn to_bytes(&self) -> Result<Bytes, minicbor::encode::Error<Infallible>> {
        Ok(minicbor::to_vec(self)?.into())
    }
}
