//! End-to-end publish flow against an in-process remote store.
//!
//! Verifies that a campaign saved file by file can be finalized into a
//! bound archive set from which every file is retrievable again by
//! locator and relative path, and that session lifecycle (cleanup on
//! success, survival on failure) behaves as the drivers above expect.

use std::collections::HashMap;
use std::pin::Pin;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::task::{Context, Poll};
use std::time::Duration;

use anyhow::anyhow;
use bytes::Bytes;
use carport_core::ContentId;
use carport_publish::{
    Archive, DirNode, LOCATOR_SCHEME, PublishError, Publisher, PublishResult, RemoteStore,
};

#[derive(Debug, Default)]
struct MemoryRemote {
    archives: Mutex<HashMap<String, Bytes>>,
    binds: Mutex<Vec<(ContentId, Vec<String>)>>,
    fail_bind: AtomicBool,
}

#[async_trait::async_trait]
impl RemoteStore for MemoryRemote {
    async fn store_archive(&self, archive: Bytes) -> PublishResult<String> {
        let id = ContentId::from_data(&archive).to_base32();
        self.archives.lock().unwrap().insert(id.clone(), archive);
        Ok(id)
    }

    async fn bind_upload(&self, root: ContentId, archive_ids: &[String]) -> PublishResult<()> {
        if self.fail_bind.load(Ordering::SeqCst) {
            return Err(PublishError::Remote(anyhow!("bind refused")));
        }
        self.binds
            .lock()
            .unwrap()
            .push((root, archive_ids.to_vec()));
        Ok(())
    }
}

impl MemoryRemote {
    /// Collects the id -> bytes block map of the bind anchored at the
    /// locator's root, verifying each archive on the way.
    fn blocks_for(&self, locator: &str) -> Option<(ContentId, HashMap<ContentId, Vec<u8>>)> {
        let root: ContentId = locator
            .strip_prefix(&format!("{LOCATOR_SCHEME}://"))?
            .parse()
            .ok()?;
        let binds = self.binds.lock().unwrap();
        let (_, archive_ids) = binds.iter().find(|(r, _)| *r == root)?;

        let archives = self.archives.lock().unwrap();
        let mut blocks = HashMap::new();
        for archive_id in archive_ids {
            let archive = Archive::from_bytes(archives.get(archive_id)?).ok()?;
            archive.verify().ok()?;
            for (id, data) in archive.blocks() {
                blocks.insert(id, data.to_vec());
            }
        }
        Some((root, blocks))
    }

    /// Resolves `path` relative to the published locator, returning the
    /// file bytes.
    fn fetch(&self, locator: &str, path: &str) -> Option<Vec<u8>> {
        let (root, blocks) = self.blocks_for(locator)?;
        let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
        let (filename, dirs) = segments.split_last()?;

        let mut node = DirNode::from_bytes(blocks.get(&root)?).ok()?;
        for seg in dirs {
            let link = node.links.get(*seg)?;
            node = DirNode::from_bytes(blocks.get(&link.target_id())?).ok()?;
        }
        blocks.get(&node.links.get(*filename)?.target_id()).cloned()
    }
}

#[tokio::test]
async fn finalize_round_trip() {
    let remote = Arc::new(MemoryRemote::default());
    let publisher = Publisher::new(remote.clone());
    let handle = publisher.session("stream-42");

    let files: &[(&str, &str, &[u8])] = &[
        ("foo/video/hls", "f1", b"segment one"),
        ("bar/video/hls", "f2", b"segment two"),
        ("bar/video/hls", "f3", b"segment three"),
        ("bar", "f4", b"manifest"),
        ("", "f5", b"top level"),
    ];

    for (dir, name, content) in files {
        let id = handle.save_file(dir, name, *content, None).await.unwrap();
        assert_eq!(id, ContentId::from_data(content));
    }

    let locator = handle.finalize(None).await.unwrap();
    assert!(locator.starts_with("car://"));

    for (dir, name, content) in files {
        let path = format!("{dir}/{name}");
        let fetched = remote.fetch(&locator, &path).unwrap_or_else(|| {
            panic!("file {path} not resolvable through published archives")
        });
        assert_eq!(fetched.as_slice(), *content);
    }
}

#[tokio::test]
async fn concurrent_saves_lose_no_files() {
    let remote = Arc::new(MemoryRemote::default());
    let publisher = Publisher::new(remote.clone());

    let mut handles = Vec::new();
    for i in 0..12u32 {
        let handle = publisher.session("concurrent");
        handles.push(tokio::spawn(async move {
            let content = format!("chunk {i}").into_bytes();
            handle
                .save_file(&format!("video/rendition{}", i % 3), &format!("seg{i}.ts"), content.as_slice(), None)
                .await
                .unwrap();
        }));
    }
    for h in handles {
        h.await.unwrap();
    }

    let locator = publisher.session("concurrent").finalize(None).await.unwrap();

    for i in 0..12u32 {
        let path = format!("video/rendition{}/seg{i}.ts", i % 3);
        let expected = format!("chunk {i}").into_bytes();
        assert_eq!(remote.fetch(&locator, &path), Some(expected));
    }
}

#[tokio::test]
async fn directory_and_file_links_are_discriminated_by_lookup() {
    let remote = Arc::new(MemoryRemote::default());
    let publisher = Publisher::new(remote.clone());
    let handle = publisher.session("mixed");

    // one file link and one directory link at the same (root) level
    handle
        .save_file("", "plain.txt", &b"plain"[..], None)
        .await
        .unwrap();
    handle
        .save_file("sub", "nested.txt", &b"nested"[..], None)
        .await
        .unwrap();

    let locator = handle.finalize(None).await.unwrap();
    let (root, blocks) = remote.blocks_for(&locator).unwrap();
    let root_node = DirNode::from_bytes(blocks.get(&root).unwrap()).unwrap();

    // the file link passed through unchanged: its target is the raw
    // content id and does not decode as a directory node
    let file_link = root_node.links.get("plain.txt").unwrap();
    assert!(!file_link.is_dir);
    assert_eq!(file_link.target_id(), ContentId::from_data(b"plain"));

    // the directory link was recursed into: its target decodes as a node
    let dir_link = root_node.links.get("sub").unwrap();
    assert!(dir_link.is_dir);
    let sub = DirNode::from_bytes(blocks.get(&dir_link.target_id()).unwrap()).unwrap();
    assert!(sub.links.contains_key("nested.txt"));
}

#[tokio::test]
async fn registry_cleanup_on_success_survival_on_failure() {
    let remote = Arc::new(MemoryRemote::default());
    let publisher = Publisher::new(remote.clone());
    let handle = publisher.session("lifecycle");

    handle
        .save_file("a", "f.txt", &b"data"[..], None)
        .await
        .unwrap();
    assert!(publisher.registry().contains("lifecycle"));

    let root_before = publisher
        .registry()
        .get_or_create("lifecycle")
        .root_id()
        .await
        .unwrap();

    remote.fail_bind.store(true, Ordering::SeqCst);
    assert!(handle.finalize(None).await.is_err());

    // still registered, tree intact
    assert!(publisher.registry().contains("lifecycle"));
    let root_after = publisher
        .registry()
        .get_or_create("lifecycle")
        .root_id()
        .await
        .unwrap();
    assert_eq!(root_after, root_before);

    remote.fail_bind.store(false, Ordering::SeqCst);
    let locator = handle.finalize(None).await.unwrap();
    assert!(!publisher.registry().contains("lifecycle"));
    assert_eq!(remote.fetch(&locator, "a/f.txt"), Some(b"data".to_vec()));
}

#[tokio::test]
async fn root_archive_is_part_of_the_bound_set() {
    let remote = Arc::new(MemoryRemote::default());
    let publisher = Publisher::new(remote.clone());
    let handle = publisher.session("shards");

    handle
        .save_file("dir", "f.txt", &b"x"[..], None)
        .await
        .unwrap();
    let locator = handle.finalize(None).await.unwrap();

    let (root, _) = remote.blocks_for(&locator).unwrap();
    let binds = remote.binds.lock().unwrap();
    let (_, archive_ids) = binds.iter().find(|(r, _)| *r == root).unwrap();
    // file archive + "dir" archive + root archive
    assert_eq!(archive_ids.len(), 3);

    // the last bound archive is the root's own
    let archives = remote.archives.lock().unwrap();
    let last = Archive::from_bytes(archives.get(archive_ids.last().unwrap()).unwrap()).unwrap();
    assert_eq!(last.root_id(), root);
}

/// A reader that never yields data and never completes.
struct StalledReader;

impl tokio::io::AsyncRead for StalledReader {
    fn poll_read(
        self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        _buf: &mut tokio::io::ReadBuf<'_>,
    ) -> Poll<std::io::Result<()>> {
        Poll::Pending
    }
}

#[tokio::test]
async fn save_file_times_out_on_stalled_input() {
    let remote = Arc::new(MemoryRemote::default());
    let publisher = Publisher::new(remote);
    let handle = publisher.session("stalled");

    let err = handle
        .save_file("a", "f", StalledReader, Some(Duration::from_millis(20)))
        .await
        .unwrap_err();
    assert!(matches!(err, PublishError::Timeout(_)));
}
