//! Transition executor
//!
//! Applies a [`TransitionPlan`] to the channels and fades, fires the host
//! side effects and commits the new zone state. The plan is validated
//! before anything is touched, so a rejected plan leaves every channel,
//! fade and the zone state exactly as they were.
//!
//! Order of operations:
//! 1. Fade the outgoing channel to 0.0 over `fade_time`.
//! 2. Crossfade: play the incoming channel if idle (from silence) and fade
//!    it to 1.0 concurrently.
//! 3. Stop-immediately: hard-stop the outgoing channel now, restart the
//!    incoming channel at 1.0 after `start_delay`.
//! 4. Trigger the mixer effect, if any, and load the zone.
//! 5. Commit the zone and the current-channel pointer.

use crate::error::Result;
use crate::playback::channels::ChannelRegistry;
use crate::playback::fader::FadeController;
use crate::zone::{StopBehavior, TransitionPlan, ZoneId, ZoneState};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};
use zonemix_common::Easing;

/// Host scene loading, fire-and-forget
pub trait ZoneLoader: Send {
    fn load_zone(&mut self, zone: ZoneId);
}

/// Global mixer/snapshot effects, fire-and-forget
pub trait MixerEffects: Send {
    fn trigger_effect(&mut self, effect: &str, duration: Duration);
}

/// Loader that does nothing
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopZoneLoader;

impl ZoneLoader for NoopZoneLoader {
    fn load_zone(&mut self, _zone: ZoneId) {}
}

/// Effects sink that does nothing
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopMixerEffects;

impl MixerEffects for NoopMixerEffects {
    fn trigger_effect(&mut self, _effect: &str, _duration: Duration) {}
}

/// Channel-level changes made by one execution
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecutionReport {
    /// Channels started immediately
    pub started: Vec<usize>,
    /// Channels stopped immediately
    pub stopped: Vec<usize>,
    /// Effect fired, if any
    pub effect: Option<String>,
}

/// Applies plans through the fade controller and channel registry
pub struct TransitionExecutor {
    zone_loader: Box<dyn ZoneLoader>,
    effects: Box<dyn MixerEffects>,
}

impl TransitionExecutor {
    pub fn new(zone_loader: Box<dyn ZoneLoader>, effects: Box<dyn MixerEffects>) -> Self {
        Self {
            zone_loader,
            effects,
        }
    }

    /// Execute `plan` and commit it to `state`
    pub fn execute(
        &mut self,
        plan: &TransitionPlan,
        state: &mut ZoneState,
        channels: &mut ChannelRegistry,
        fader: &mut FadeController,
    ) -> Result<ExecutionReport> {
        let fade_in = plan.validate(channels.len())?;
        let mut report = ExecutionReport::default();

        let fade = |fader: &mut FadeController,
                    channels: &mut ChannelRegistry,
                    channel: usize,
                    target: f32|
         -> Result<()> {
            match plan.curve {
                Some(curve) => {
                    let curve: Arc<dyn Easing> = Arc::new(curve);
                    fader.start_fade_with_curve(channels, channel, target, plan.fade_time, curve)
                }
                None => fader.start_fade(channels, channel, target, plan.fade_time),
            }
        };

        if let Some(fade_out) = plan.fade_out_channel {
            fade(fader, channels, fade_out, 0.0)?;
        }

        match plan.stop_behavior {
            StopBehavior::LetFadeFinish => {
                if !channels.is_playing(fade_in)? {
                    channels.set_volume(fade_in, 0.0)?;
                    channels.play(fade_in)?;
                    report.started.push(fade_in);
                }
                fade(fader, channels, fade_in, 1.0)?;
            }
            StopBehavior::StopImmediately => {
                if let Some(fade_out) = plan.fade_out_channel {
                    if channels.stop(fade_out)? {
                        report.stopped.push(fade_out);
                    }
                }
                // Restart the incoming track from the top at full volume
                if channels.stop(fade_in)? {
                    report.stopped.push(fade_in);
                }
                fader.cancel(fade_in);
                channels.set_volume(fade_in, 1.0)?;
                channels.play_delayed(fade_in, plan.start_delay)?;
                if channels.is_playing(fade_in)? {
                    report.started.push(fade_in);
                }
            }
        }

        if let Some(effect) = &plan.effect {
            debug!(effect = %effect.effect, "Triggering mixer effect");
            self.effects.trigger_effect(&effect.effect, effect.duration);
            report.effect = Some(effect.effect.clone());
        }

        self.zone_loader.load_zone(plan.zone);

        state.commit(plan.zone, fade_in);
        info!(
            from = %plan.from_zone,
            to = %plan.zone,
            channel = fade_in,
            "Zone transition committed"
        );
        Ok(report)
    }
}

impl Default for TransitionExecutor {
    fn default() -> Self {
        Self::new(Box::new(NoopZoneLoader), Box::new(NoopMixerEffects))
    }
}

impl std::fmt::Debug for TransitionExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransitionExecutor").finish_non_exhaustive()
    }
}
