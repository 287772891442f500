//! Platform abstraction layer for the presentation engine.
//!
//! This crate provides platform-specific functionality:
//! - Window management via winit
//! - Vulkan surface creation through ash-window

mod window;

pub use window::{Surface, Window};

// Re-export winit types that users might need
pub use winit::event::WindowEvent;
pub use winit::event_loop::EventLoop;
