//! Playback side of zone transitions
//!
//! - `channels`: fixed set of music channels and delayed plays
//! - `fader`: per-channel volume ramps
//! - `executor`: applies transition plans and commits zone state

pub mod channels;
pub mod executor;
pub mod fader;

pub use channels::{AudioSource, Channel, ChannelRegistry, NullSource};
pub use executor::{
    ExecutionReport, MixerEffects, NoopMixerEffects, NoopZoneLoader, TransitionExecutor,
    ZoneLoader,
};
pub use fader::{FadeController, FadeOperation};
