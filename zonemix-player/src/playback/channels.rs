//! Channel registry
//!
//! Owns the fixed set of music channels, one per configured track. Channels
//! are created once at startup and live for the whole process; their play
//! state and volume are mirrored onto an opaque [`AudioSource`] backend.
//!
//! Delayed plays are deferred actions keyed by an absolute due time on the
//! registry clock, which advances only through [`ChannelRegistry::advance`].
//! A channel holds at most one pending delayed play; scheduling another, or
//! issuing `play`/`stop`, replaces it.

use crate::error::{Error, Result};
use std::time::Duration;
use tracing::{debug, trace};
use zonemix_common::config::ChannelConfig;

/// Opaque audio output for one channel
///
/// The registry only calls these when the channel state actually changes.
pub trait AudioSource: Send {
    fn play(&mut self);
    fn stop(&mut self);
    fn set_volume(&mut self, volume: f32);
}

/// Backend that produces no sound
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSource;

impl AudioSource for NullSource {
    fn play(&mut self) {}
    fn stop(&mut self) {}
    fn set_volume(&mut self, _volume: f32) {}
}

/// One track bound to one playback slot
pub struct Channel {
    index: usize,
    clip: String,
    volume: f32,
    is_playing: bool,
    looping: bool,
    pending_play_at: Option<Duration>,
    source: Box<dyn AudioSource>,
}

impl Channel {
    pub fn index(&self) -> usize {
        self.index
    }

    /// Audio asset reference
    pub fn clip(&self) -> &str {
        &self.clip
    }

    pub fn volume(&self) -> f32 {
        self.volume
    }

    pub fn is_playing(&self) -> bool {
        self.is_playing
    }

    /// Music channels always loop
    pub fn is_looping(&self) -> bool {
        self.looping
    }

    /// Registry clock time at which a delayed play is due
    pub fn pending_play_at(&self) -> Option<Duration> {
        self.pending_play_at
    }
}

impl std::fmt::Debug for Channel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Channel")
            .field("index", &self.index)
            .field("clip", &self.clip)
            .field("volume", &self.volume)
            .field("is_playing", &self.is_playing)
            .field("looping", &self.looping)
            .field("pending_play_at", &self.pending_play_at)
            .finish()
    }
}

/// Clamp a volume to [0, 1], mapping NaN to silence
pub fn clamp_volume(volume: f32) -> f32 {
    if volume.is_nan() {
        0.0
    } else {
        volume.clamp(0.0, 1.0)
    }
}

/// Fixed set of channels addressed by index
#[derive(Debug)]
pub struct ChannelRegistry {
    channels: Vec<Channel>,
    clock: Duration,
}

impl ChannelRegistry {
    /// Create one channel per configured track
    ///
    /// `make_source` builds the audio backend for each channel.
    pub fn new<F>(configs: &[ChannelConfig], mut make_source: F) -> Self
    where
        F: FnMut(usize, &ChannelConfig) -> Box<dyn AudioSource>,
    {
        let channels = configs
            .iter()
            .enumerate()
            .map(|(index, config)| {
                let volume = clamp_volume(config.initial_volume);
                let mut source = make_source(index, config);
                source.set_volume(volume);
                Channel {
                    index,
                    clip: config.clip.clone(),
                    volume,
                    is_playing: false,
                    looping: true,
                    pending_play_at: None,
                    source,
                }
            })
            .collect::<Vec<_>>();

        debug!("Created {} music channels", channels.len());
        Self {
            channels,
            clock: Duration::ZERO,
        }
    }

    /// Create channels backed by [`NullSource`]
    pub fn silent(configs: &[ChannelConfig]) -> Self {
        Self::new(configs, |_, _| Box::new(NullSource))
    }

    pub fn len(&self) -> usize {
        self.channels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }

    /// Registry clock (sum of all `advance` deltas)
    pub fn clock(&self) -> Duration {
        self.clock
    }

    pub fn iter(&self) -> impl Iterator<Item = &Channel> {
        self.channels.iter()
    }

    /// Fail with `InvalidChannelIndex` unless `index` is configured
    pub fn check_index(&self, index: usize) -> Result<()> {
        if index < self.channels.len() {
            Ok(())
        } else {
            Err(Error::InvalidChannelIndex {
                index,
                count: self.channels.len(),
            })
        }
    }

    pub fn get(&self, index: usize) -> Result<&Channel> {
        self.check_index(index)?;
        Ok(&self.channels[index])
    }

    fn get_mut(&mut self, index: usize) -> Result<&mut Channel> {
        self.check_index(index)?;
        Ok(&mut self.channels[index])
    }

    pub fn volume(&self, index: usize) -> Result<f32> {
        Ok(self.get(index)?.volume)
    }

    pub fn is_playing(&self, index: usize) -> Result<bool> {
        Ok(self.get(index)?.is_playing)
    }

    /// Start playback at the channel's current volume
    ///
    /// Idempotent. Cancels a pending delayed play. Returns whether the
    /// channel was started by this call.
    pub fn play(&mut self, index: usize) -> Result<bool> {
        let channel = self.get_mut(index)?;
        channel.pending_play_at = None;
        if channel.is_playing {
            return Ok(false);
        }
        channel.is_playing = true;
        channel.source.play();
        debug!(channel = index, volume = channel.volume, "Channel playing");
        Ok(true)
    }

    /// Halt playback regardless of volume
    ///
    /// Idempotent. Cancels a pending delayed play. Returns whether the
    /// channel was playing.
    pub fn stop(&mut self, index: usize) -> Result<bool> {
        let channel = self.get_mut(index)?;
        channel.pending_play_at = None;
        if !channel.is_playing {
            return Ok(false);
        }
        channel.is_playing = false;
        channel.source.stop();
        debug!(channel = index, "Channel stopped");
        Ok(true)
    }

    /// Schedule a play `delay` from now, replacing any pending one
    ///
    /// A zero delay plays immediately.
    pub fn play_delayed(&mut self, index: usize, delay: Duration) -> Result<()> {
        if delay.is_zero() {
            self.play(index)?;
            return Ok(());
        }
        let due = self.clock.saturating_add(delay);
        let channel = self.get_mut(index)?;
        if channel.pending_play_at.is_some() {
            trace!(channel = index, "Replacing pending delayed play");
        }
        channel.pending_play_at = Some(due);
        debug!(channel = index, delay_ms = delay.as_millis() as u64, "Delayed play scheduled");
        Ok(())
    }

    /// Clamp `volume` to [0, 1] and apply it; returns the applied value
    pub fn set_volume(&mut self, index: usize, volume: f32) -> Result<f32> {
        let volume = clamp_volume(volume);
        let channel = self.get_mut(index)?;
        if channel.volume != volume {
            channel.volume = volume;
            channel.source.set_volume(volume);
        }
        Ok(volume)
    }

    /// Advance the clock and fire due delayed plays
    ///
    /// Returns the channels started by this call.
    pub fn advance(&mut self, dt: Duration) -> Vec<usize> {
        self.clock = self.clock.saturating_add(dt);
        let now = self.clock;

        let due: Vec<usize> = self
            .channels
            .iter()
            .filter(|c| c.pending_play_at.is_some_and(|at| at <= now))
            .map(|c| c.index)
            .collect();

        let mut started = Vec::with_capacity(due.len());
        for index in due {
            // Index comes from the registry itself
            if let Ok(true) = self.play(index) {
                started.push(index);
            }
        }
        started
    }
}
