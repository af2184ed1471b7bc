//! Captured frames and the bounded on-disk retention store.
//!
//! Disk usage is bounded solely by `FrameStore`: retaining a frame beyond
//! the capacity bound permanently deletes the oldest frame's backing file.
//! Deletion happens exactly once per frame, either at eviction or at the
//! final purge when the acquisition loop exits.

use std::collections::VecDeque;
use std::path::PathBuf;
use std::time::Instant;

/// One captured image: monotonic sequence index, capture timestamp, and the
/// path of the stored pixel data.
#[derive(Clone, Debug)]
pub struct Frame {
    pub index: u64,
    pub captured_at: Instant,
    pub path: PathBuf,
}

/// Bounded FIFO of retained frames.
///
/// The acquisition loop only ever compares the newest frame against the
/// immediately preceding one, so eviction (which removes the oldest) can
/// never delete a frame still inside the comparison window as long as the
/// capacity is at least 2; config validation enforces that.
pub struct FrameStore {
    frames: VecDeque<Frame>,
    capacity: usize,
    evictions: u64,
}

impl FrameStore {
    pub fn new(capacity: usize) -> Self {
        Self {
            frames: VecDeque::with_capacity(capacity),
            capacity,
            evictions: 0,
        }
    }

    /// Retain a frame, evicting and deleting the oldest first if the store
    /// is at capacity. A failed unlink is logged and does not fail
    /// retention; the frame reference is dropped either way.
    pub fn retain(&mut self, frame: Frame) {
        while self.frames.len() >= self.capacity {
            if let Some(oldest) = self.frames.pop_front() {
                delete_backing_file(&oldest);
                self.evictions += 1;
            }
        }
        self.frames.push_back(frame);
    }

    /// Most recently retained frame.
    pub fn latest(&self) -> Option<&Frame> {
        self.frames.back()
    }

    /// Frame retained immediately before the latest one.
    pub fn previous(&self) -> Option<&Frame> {
        let len = self.frames.len();
        if len < 2 {
            return None;
        }
        self.frames.get(len - 2)
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Number of eviction-deletions performed so far.
    pub fn evictions(&self) -> u64 {
        self.evictions
    }

    /// Iterate retained frames in retention order (oldest first).
    pub fn iter(&self) -> impl Iterator<Item = &Frame> {
        self.frames.iter()
    }

    /// Delete every retained frame's backing file and empty the store.
    ///
    /// This is the final-cleanup path; after `purge` the `Drop` impl has
    /// nothing left to delete, so no file is ever unlinked twice.
    pub fn purge(&mut self) {
        while let Some(frame) = self.frames.pop_front() {
            delete_backing_file(&frame);
        }
    }
}

impl Drop for FrameStore {
    fn drop(&mut self) {
        // Fatal loop faults skip the explicit purge; clean up here instead.
        self.purge();
    }
}

fn delete_backing_file(frame: &Frame) {
    if let Err(err) = std::fs::remove_file(&frame.path) {
        log::warn!(
            "failed to delete frame {} at {}: {}",
            frame.index,
            frame.path.display(),
            err
        );
    }
}
