//! # Zonemix Player Library (zonemix-player)
//!
//! Background music across application zones with crossfaded transitions.
//!
//! **Purpose:** Decide which music channel fades out, which fades in or
//! restarts, and with what delay when the active zone changes, then apply
//! that decision to the channels while keeping a single current-channel
//! pointer consistent under interrupted or repeated requests.
//!
//! **Architecture:** a pure, table-driven [`zone::ZoneTransitionEngine`]
//! produces plans; [`playback::TransitionExecutor`] applies them through the
//! [`playback::FadeController`] and [`playback::ChannelRegistry`];
//! [`MusicManager`] owns all of it and is ticked by the host.

pub mod error;
pub mod manager;
pub mod playback;
pub mod zone;

pub use error::{Error, Result};
pub use manager::{ManagerSnapshot, MusicManager, TransitionOutcome};
pub use zone::{TransitionDecision, TransitionPlan, ZoneId, ZoneState};
