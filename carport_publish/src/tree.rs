//! Bottom-up directory tree updates.
//!
//! Adding a file rewrites every node from the insertion point up to the
//! root: each node's id is a function of its full link set, so a changed
//! child link forces a new parent node. Superseded nodes are left in the
//! store as unreferenced garbage; correctness only depends on ids never
//! being reused, not on eager deletion.

use std::future::Future;
use std::pin::Pin;

use carport_core::BlockStore;
use carport_core::ContentId;

use crate::error::PublishResult;
use crate::node::{DirNode, Link};

/// Splits a slash-separated path into segments, discarding empties from
/// leading, trailing, or repeated separators.
pub(crate) fn split_segments(path: &str) -> Vec<&str> {
    path.split('/').filter(|s| !s.is_empty()).collect()
}

/// Grafts a file link named `filename` at `segments` below `node`,
/// creating intermediate directories as needed, and returns the rewritten
/// node. Every rewritten node is persisted to `store`.
///
/// A file added twice at the same full path overwrites: last write wins.
/// A file link occupying a name needed as a directory is likewise
/// replaced by a fresh directory.
pub(crate) fn add_file_at_path<'a>(
    store: &'a dyn BlockStore,
    node: DirNode,
    segments: &'a [&'a str],
    filename: &'a str,
    file_id: ContentId,
) -> Pin<Box<dyn Future<Output = PublishResult<DirNode>> + Send + 'a>> {
    Box::pin(async move {
        let mut node = node;

        if segments.is_empty() {
            node.links.insert(filename.to_string(), Link::file(file_id));
            store.put(node.to_bytes()?).await?;
            return Ok(node);
        }

        let (head, rest) = (segments[0], &segments[1..]);
        let child = match node.links.get(head) {
            Some(link) if link.is_dir => {
                let bytes = store.get(link.target_id()).await?;
                DirNode::from_bytes(&bytes)?
            }
            _ => DirNode::new(),
        };

        let child = add_file_at_path(store, child, rest, filename, file_id).await?;

        node.links.insert(head.to_string(), Link::dir(child.id()?));
        store.put(node.to_bytes()?).await?;
        Ok(node)
    })
}
