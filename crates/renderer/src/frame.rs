//! Frame slots and frame pacing.
//!
//! This module provides the per-slot synchronization bundle and the
//! round-robin tracker the presentation loop cycles through.
//!
//! # Overview
//!
//! A [`FrameSlot`] groups the synchronization objects one in-flight frame
//! needs:
//!
//! ```text
//! 1. Wait on in_flight fence (CPU waits for the previous use of this slot)
//! 2. Reset in_flight fence
//! 3. Acquire swapchain image (signals image_available semaphore)
//! 4. Submit pre-recorded command buffer:
//!    - Wait on image_available at COLOR_ATTACHMENT_OUTPUT
//!    - Signal render_finished
//!    - Signal in_flight fence on completion
//! 5. Present (waits on render_finished)
//! ```
//!
//! Exactly [`MAX_FRAMES_IN_FLIGHT`](crate::MAX_FRAMES_IN_FLIGHT) slots exist
//! regardless of how many images the swapchain has. The slot index advances
//! with the iteration count; the image index comes back from the acquire
//! call. The two indices are independent and must never be conflated.

use std::sync::Arc;

use tracing::{debug, info};

use prism_rhi::device::Device;
use prism_rhi::sync::{Fence, Semaphore};
use prism_rhi::RhiResult;

use crate::MAX_FRAMES_IN_FLIGHT;

/// Per-slot synchronization primitives.
///
/// The semaphore pair keeps acquire -> submit -> present ordered entirely on
/// the GPU timeline; the fence is the one CPU-visible signal, used to keep a
/// slot's objects from being reused while the GPU still references them.
pub struct FrameSlot {
    /// Semaphore signaled when a swapchain image is available.
    image_available: Semaphore,
    /// Semaphore signaled when rendering is complete.
    render_finished: Semaphore,
    /// Fence signaled when this slot's submission has fully completed.
    in_flight: Fence,
}

impl FrameSlot {
    /// Creates a new set of per-slot synchronization primitives.
    ///
    /// The in-flight fence is created in the signaled state so the first
    /// wait on the slot does not block forever.
    ///
    /// # Errors
    ///
    /// Returns an error if any synchronization object creation fails.
    pub fn new(device: Arc<Device>) -> RhiResult<Self> {
        let image_available = Semaphore::new(device.clone())?;
        let render_finished = Semaphore::new(device.clone())?;
        // Start signaled so the first wait doesn't block forever
        let in_flight = Fence::new(device, true)?;

        Ok(Self {
            image_available,
            render_finished,
            in_flight,
        })
    }

    /// Creates the full ring of frame slots.
    ///
    /// # Errors
    ///
    /// Returns an error if any slot creation fails.
    pub fn ring(device: &Arc<Device>) -> RhiResult<Vec<Self>> {
        let mut slots = Vec::with_capacity(MAX_FRAMES_IN_FLIGHT);
        for i in 0..MAX_FRAMES_IN_FLIGHT {
            slots.push(Self::new(device.clone())?);
            debug!("Created frame slot {}", i);
        }

        info!("Created {} frame slots", MAX_FRAMES_IN_FLIGHT);
        Ok(slots)
    }

    /// Returns a reference to the image available semaphore.
    #[inline]
    pub fn image_available(&self) -> &Semaphore {
        &self.image_available
    }

    /// Returns a reference to the render finished semaphore.
    #[inline]
    pub fn render_finished(&self) -> &Semaphore {
        &self.render_finished
    }

    /// Returns a reference to the in-flight fence.
    #[inline]
    pub fn in_flight(&self) -> &Fence {
        &self.in_flight
    }
}

/// Round-robin frame tracker.
///
/// Tracks which slot the current iteration uses and which swapchain image
/// the most recent acquire returned. Slot index = iteration count modulo
/// [`MAX_FRAMES_IN_FLIGHT`](crate::MAX_FRAMES_IN_FLIGHT).
pub struct FrameTracker {
    /// Current slot index (0 to MAX_FRAMES_IN_FLIGHT - 1).
    current_frame: usize,
    /// Swapchain image index returned by the most recent acquire.
    image_index: u32,
}

impl FrameTracker {
    /// Create a new frame tracker starting at slot 0.
    pub fn new() -> Self {
        Self {
            current_frame: 0,
            image_index: 0,
        }
    }

    /// Get the current slot index.
    #[inline]
    pub fn current_frame(&self) -> usize {
        self.current_frame
    }

    /// Get the current swapchain image index.
    #[inline]
    pub fn image_index(&self) -> u32 {
        self.image_index
    }

    /// Set the current swapchain image index.
    #[inline]
    pub fn set_image_index(&mut self, index: u32) {
        self.image_index = index;
    }

    /// Advance to the next slot.
    #[inline]
    pub fn next_frame(&mut self) {
        self.current_frame = (self.current_frame + 1) % MAX_FRAMES_IN_FLIGHT;
    }
}

impl Default for FrameTracker {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_max_frames_in_flight_constant() {
        // Two is the double-buffered baseline; anything above four would
        // defeat the point of bounding latency
        assert!(MAX_FRAMES_IN_FLIGHT >= 1);
        assert!(MAX_FRAMES_IN_FLIGHT <= 4);
    }

    #[test]
    fn test_tracker_round_robin_sequence() {
        // Three consecutive iterations with two slots use slots 0, 1, 0:
        // the third iteration waits on the fence the first one signaled
        let mut tracker = FrameTracker::new();

        let mut sequence = Vec::new();
        for _ in 0..3 {
            sequence.push(tracker.current_frame());
            tracker.next_frame();
        }

        assert_eq!(sequence, vec![0, 1, 0]);
    }

    #[test]
    fn test_tracker_slot_index_stays_in_bounds() {
        let mut tracker = FrameTracker::new();
        for _ in 0..100 {
            assert!(tracker.current_frame() < MAX_FRAMES_IN_FLIGHT);
            tracker.next_frame();
        }
    }

    #[test]
    fn test_tracker_image_index_independent_of_slot() {
        // The acquire result does not influence the slot sequence
        let mut tracker = FrameTracker::new();

        tracker.set_image_index(2);
        assert_eq!(tracker.current_frame(), 0);
        assert_eq!(tracker.image_index(), 2);

        tracker.next_frame();
        assert_eq!(tracker.current_frame(), 1);
        assert_eq!(tracker.image_index(), 2);
    }

    #[test]
    fn test_frame_slot_is_send() {
        // Compile-time check that FrameSlot is Send
        fn assert_send<T: Send>() {}
        assert_send::<FrameSlot>();
    }
}
