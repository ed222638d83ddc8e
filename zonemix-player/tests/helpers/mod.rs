//! Test helper modules for zonemix-player integration tests
//!
//! Provides reusable test infrastructure components:
//! - PlaybackCapture: Record channel and host calls made by the manager

pub mod playback_capture;

// Re-export commonly used types
#[allow(unused_imports)]
pub use playback_capture::{manager_with_capture, PlaybackCapture, Recorded};
