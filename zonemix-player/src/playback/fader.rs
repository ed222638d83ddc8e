//! Time-based volume ramps
//!
//! The fade controller drives at most one ramp per channel. A ramp moves a
//! channel's volume from the value it had when the fade started to a target
//! over a duration, shaped by an [`Easing`] curve:
//!
//! ```text
//! volume(t) = start + (target - start) × curve(elapsed / duration)
//! ```
//!
//! Starting a fade on a channel that is already fading replaces the old ramp
//! (last writer wins); the new ramp starts from the channel's live volume.
//! The controller only ever changes channel volume, never play state.

use crate::error::Result;
use crate::playback::channels::{clamp_volume, ChannelRegistry};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, trace, warn};
use zonemix_common::{Easing, FadeCurve};

/// An in-flight volume ramp
#[derive(Clone)]
pub struct FadeOperation {
    channel: usize,
    start_volume: f32,
    target_volume: f32,
    duration: Duration,
    elapsed: Duration,
    curve: Arc<dyn Easing>,
}

impl FadeOperation {
    pub fn channel(&self) -> usize {
        self.channel
    }

    pub fn start_volume(&self) -> f32 {
        self.start_volume
    }

    pub fn target_volume(&self) -> f32 {
        self.target_volume
    }

    pub fn duration(&self) -> Duration {
        self.duration
    }

    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }

    pub fn is_complete(&self) -> bool {
        self.elapsed >= self.duration
    }

    /// Normalized progress (0.0 to 1.0)
    pub fn progress(&self) -> f32 {
        if self.duration.is_zero() {
            return 1.0;
        }
        (self.elapsed.as_secs_f64() / self.duration.as_secs_f64()).clamp(0.0, 1.0) as f32
    }

    /// Volume the ramp prescribes at its current position
    pub fn current_volume(&self) -> f32 {
        if self.is_complete() {
            return self.target_volume;
        }
        let shaped = self.curve.ease(self.progress()).clamp(0.0, 1.0);
        clamp_volume(self.start_volume + (self.target_volume - self.start_volume) * shaped)
    }
}

impl std::fmt::Debug for FadeOperation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FadeOperation")
            .field("channel", &self.channel)
            .field("start_volume", &self.start_volume)
            .field("target_volume", &self.target_volume)
            .field("duration", &self.duration)
            .field("elapsed", &self.elapsed)
            .finish_non_exhaustive()
    }
}

/// Drives volume ramps for the channels of a [`ChannelRegistry`]
pub struct FadeController {
    fades: BTreeMap<usize, FadeOperation>,
    default_curve: Arc<dyn Easing>,
}

impl FadeController {
    /// Create a controller whose fades use `curve` unless overridden
    pub fn new(curve: FadeCurve) -> Self {
        Self::with_easing(Arc::new(curve))
    }

    /// Create a controller with a custom default interpolation function
    pub fn with_easing(curve: Arc<dyn Easing>) -> Self {
        Self {
            fades: BTreeMap::new(),
            default_curve: curve,
        }
    }

    /// Replace the default curve for fades started from now on
    pub fn set_default_curve(&mut self, curve: Arc<dyn Easing>) {
        self.default_curve = curve;
    }

    /// Ramp `channel` to `target_volume` over `duration` with the default curve
    pub fn start_fade(
        &mut self,
        channels: &mut ChannelRegistry,
        channel: usize,
        target_volume: f32,
        duration: Duration,
    ) -> Result<()> {
        let curve = Arc::clone(&self.default_curve);
        self.start_fade_with_curve(channels, channel, target_volume, duration, curve)
    }

    /// Ramp `channel` to `target_volume` over `duration` with `curve`
    ///
    /// Replaces any fade already running on the channel. A zero duration
    /// sets the volume immediately and leaves no fade behind.
    pub fn start_fade_with_curve(
        &mut self,
        channels: &mut ChannelRegistry,
        channel: usize,
        target_volume: f32,
        duration: Duration,
        curve: Arc<dyn Easing>,
    ) -> Result<()> {
        let start_volume = channels.volume(channel)?;
        let target_volume = clamp_volume(target_volume);

        if self.fades.remove(&channel).is_some() {
            trace!(channel, "Replacing active fade");
        }

        if duration.is_zero() {
            channels.set_volume(channel, target_volume)?;
            debug!(channel, target_volume, "Volume set without ramp");
            return Ok(());
        }

        debug!(
            channel,
            start_volume,
            target_volume,
            duration_ms = duration.as_millis() as u64,
            "Fade started"
        );
        self.fades.insert(
            channel,
            FadeOperation {
                channel,
                start_volume,
                target_volume,
                duration,
                elapsed: Duration::ZERO,
                curve,
            },
        );
        Ok(())
    }

    /// Drop the fade on `channel`, leaving its volume where it is
    pub fn cancel(&mut self, channel: usize) -> Option<FadeOperation> {
        self.fades.remove(&channel)
    }

    pub fn is_fading(&self, channel: usize) -> bool {
        self.fades.contains_key(&channel)
    }

    pub fn get(&self, channel: usize) -> Option<&FadeOperation> {
        self.fades.get(&channel)
    }

    pub fn active_count(&self) -> usize {
        self.fades.len()
    }

    /// Advance every active fade by `dt`
    ///
    /// Completed fades leave the channel exactly at the target volume and
    /// are removed. Returns `(channel, volume)` for each completed fade.
    pub fn tick(&mut self, channels: &mut ChannelRegistry, dt: Duration) -> Vec<(usize, f32)> {
        let mut completed = Vec::new();

        for (&channel, fade) in self.fades.iter_mut() {
            fade.elapsed = fade.elapsed.saturating_add(dt).min(fade.duration);
            let volume = fade.current_volume();

            if let Err(e) = channels.set_volume(channel, volume) {
                warn!(channel, "Fade targets a missing channel: {}", e);
                completed.push((channel, volume));
                continue;
            }

            if fade.is_complete() {
                completed.push((channel, volume));
            } else {
                trace!(channel, volume, progress = fade.progress(), "Fade step");
            }
        }

        for (channel, volume) in &completed {
            self.fades.remove(channel);
            debug!(channel = *channel, volume = *volume, "Fade completed");
        }
        completed
    }
}

impl Default for FadeController {
    fn default() -> Self {
        Self::new(FadeCurve::default())
    }
}

impl std::fmt::Debug for FadeController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FadeController")
            .field("fades", &self.fades)
            .finish_non_exhaustive()
    }
}
