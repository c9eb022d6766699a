//! Pending outbound frame buffer.
//!
//! While the local CDP link is down, tunnel frames park here in arrival
//! order. The buffer is bounded: when full, the oldest frame is evicted to
//! make room, keeping memory flat under a panel that keeps sending. The
//! at-most-once delivery contract lives in the pump; this type only
//! guarantees FIFO order and the cap.

// ============================================================================
// Imports
// ============================================================================

use std::collections::VecDeque;

use crate::relay::frame::RelayFrame;

// ============================================================================
// Constants
// ============================================================================

/// Maximum number of frames parked while the local link is down.
pub const PENDING_FRAME_LIMIT: usize = 1024;

// ============================================================================
// Pending Buffer
// ============================================================================

/// Bounded FIFO of frames awaiting the local CDP link.
#[derive(Debug)]
pub struct PendingOutbound {
    frames: VecDeque<RelayFrame>,
    limit: usize,
    dropped_total: u64,
}

impl PendingOutbound {
    /// Creates a buffer with the default cap.
    #[must_use]
    pub fn new() -> Self {
        Self::with_limit(PENDING_FRAME_LIMIT)
    }

    /// Creates a buffer with an explicit cap (at least one frame).
    #[must_use]
    pub fn with_limit(limit: usize) -> Self {
        Self {
            frames: VecDeque::new(),
            limit: limit.max(1),
            dropped_total: 0,
        }
    }

    /// Appends a frame, evicting and returning the oldest one when full.
    pub fn push(&mut self, frame: RelayFrame) -> Option<RelayFrame> {
        let evicted = if self.frames.len() == self.limit {
            self.dropped_total += 1;
            self.frames.pop_front()
        } else {
            None
        };
        self.frames.push_back(frame);
        evicted
    }

    /// Removes and returns the oldest frame.
    pub fn pop(&mut self) -> Option<RelayFrame> {
        self.frames.pop_front()
    }

    /// Discards all frames, counting them as dropped; returns how many.
    pub fn clear(&mut self) -> usize {
        let discarded = self.frames.len();
        self.dropped_total += discarded as u64;
        self.frames.clear();
        discarded
    }

    /// Number of parked frames.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    /// Returns `true` when nothing is parked.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Total frames ever dropped by eviction or [`clear`](Self::clear).
    #[inline]
    #[must_use]
    pub fn dropped_total(&self) -> u64 {
        self.dropped_total
    }
}

impl Default for PendingOutbound {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Tests
// ============================================================================
