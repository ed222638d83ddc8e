//! # Zonemix Common Library
//!
//! Shared code for the zonemix workspace including:
//! - Error types
//! - Fade curve definitions and the pluggable `Easing` trait
//! - Configuration schema, validation and file resolution
//! - Zone event types and the event bus

pub mod config;
pub mod error;
pub mod events;
pub mod fade_curves;

pub use error::{Error, Result};
pub use fade_curves::{Easing, FadeCurve};
