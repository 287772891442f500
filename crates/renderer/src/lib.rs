//! Presentation engine core.
//!
//! This crate orchestrates the rendering process:
//! - Frame-slot ring and synchronization
//! - Acquire / submit / present cycle
//! - Resource construction and ordered teardown

pub mod frame;
pub mod renderer;

pub use frame::{FrameSlot, FrameTracker};
pub use renderer::Renderer;

/// Maximum number of frames that can be in flight simultaneously.
///
/// Two slots let the CPU record/submit frame N+1 while the GPU still works
/// on frame N; the per-slot fence stops the CPU from getting further ahead
/// than that.
pub const MAX_FRAMES_IN_FLIGHT: usize = 2;
