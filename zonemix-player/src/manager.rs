//! Music manager
//!
//! The single owned instance that holds the zone state, the transition
//! engine, the channels, the fades and the executor. It is created once at
//! startup and handed by reference to whatever drives it; there is no global
//! instance. Zone requests and ticks both take `&mut self`, so a request can
//! never interleave with a tick.

use crate::error::Result;
use crate::playback::{ChannelRegistry, ExecutionReport, FadeController, TransitionExecutor};
use crate::zone::{TransitionDecision, TransitionPlan, ZoneId, ZoneState, ZoneTransitionEngine};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use zonemix_common::config::MusicConfig;
use zonemix_common::events::{EventBus, ZoneEvent};
use zonemix_common::Easing;

/// Result of a zone request
#[derive(Debug, Clone, PartialEq)]
pub enum TransitionOutcome {
    /// The plan was executed and committed
    Committed {
        plan: TransitionPlan,
        report: ExecutionReport,
    },
    /// The zone was already active; nothing changed
    NoOpTransition { zone: ZoneId },
}

impl TransitionOutcome {
    pub fn is_noop(&self) -> bool {
        matches!(self, TransitionOutcome::NoOpTransition { .. })
    }

    pub fn plan(&self) -> Option<&TransitionPlan> {
        match self {
            TransitionOutcome::Committed { plan, .. } => Some(plan),
            TransitionOutcome::NoOpTransition { .. } => None,
        }
    }
}

/// Point-in-time view of one channel
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChannelSnapshot {
    pub index: usize,
    pub clip: String,
    pub volume: f32,
    pub playing: bool,
    pub fading: bool,
    /// Milliseconds until a pending delayed play fires
    pub pending_play_in_ms: Option<u64>,
}

/// Point-in-time view of the manager
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ManagerSnapshot {
    pub zone: ZoneId,
    pub zone_name: String,
    pub current_channel: usize,
    pub clock_ms: u64,
    pub active_fades: usize,
    pub channels: Vec<ChannelSnapshot>,
}

/// Owns every piece of music state for the process
#[derive(Debug)]
pub struct MusicManager {
    engine: ZoneTransitionEngine,
    state: ZoneState,
    channels: ChannelRegistry,
    fader: FadeController,
    executor: TransitionExecutor,
    events: Option<EventBus>,
    started: bool,
}

impl MusicManager {
    /// Build a manager from configuration, channels and executor
    ///
    /// `channels` must hold every channel the configured zones refer to.
    pub fn new(
        config: &MusicConfig,
        channels: ChannelRegistry,
        executor: TransitionExecutor,
    ) -> Result<Self> {
        let engine = ZoneTransitionEngine::from_config_with_channels(config, channels.len())?;
        let state = engine.initial_state(ZoneId(config.startup_zone))?;

        info!(
            zone = %state.current_zone(),
            channel = state.current_channel(),
            fade_ms = engine.fade_time().as_millis() as u64,
            curve = %config.curve,
            "Music manager initialized"
        );

        Ok(Self {
            engine,
            state,
            channels,
            fader: FadeController::new(config.curve),
            executor,
            events: None,
            started: false,
        })
    }

    /// Build a manager with silent channels and no-op host side effects
    pub fn silent(config: &MusicConfig) -> Result<Self> {
        Self::new(
            config,
            ChannelRegistry::silent(&config.channels),
            TransitionExecutor::default(),
        )
    }

    /// Publish zone and channel events on `bus`
    pub fn with_event_bus(mut self, bus: EventBus) -> Self {
        self.events = Some(bus);
        self
    }

    /// Use a custom default interpolation function for fades
    pub fn with_easing(mut self, curve: Arc<dyn Easing>) -> Self {
        self.fader.set_default_curve(curve);
        self
    }

    fn emit(&self, event: ZoneEvent) {
        if let Some(bus) = &self.events {
            bus.emit_lossy(event);
        }
    }

    /// Start the startup zone's music; later calls do nothing
    pub fn start(&mut self) -> Result<()> {
        if self.started {
            return Ok(());
        }
        let channel = self.state.current_channel();
        if self.channels.play(channel)? {
            self.emit(ZoneEvent::ChannelStarted {
                channel,
                timestamp: chrono::Utc::now(),
            });
        }
        self.started = true;
        info!(zone = %self.state.current_zone(), channel, "Music started");
        Ok(())
    }

    /// Move to `zone` using the transition table
    pub fn request_zone(&mut self, zone: ZoneId) -> Result<TransitionOutcome> {
        let decision = self.engine.request_zone(&self.state, zone)?;
        self.apply(decision)
    }

    /// Move to `zone` with a hard cut: no ramps, no delay
    pub fn cut_to_zone(&mut self, zone: ZoneId) -> Result<TransitionOutcome> {
        let decision = self.engine.request_cut(&self.state, zone)?;
        self.apply(decision)
    }

    fn apply(&mut self, decision: TransitionDecision) -> Result<TransitionOutcome> {
        let plan = match decision {
            TransitionDecision::Plan(plan) => plan,
            TransitionDecision::NoOpTransition { zone } => {
                warn!(zone = %zone, "Zone request rejected: already active");
                self.emit(ZoneEvent::TransitionRejected {
                    zone: zone.0,
                    timestamp: chrono::Utc::now(),
                });
                return Ok(TransitionOutcome::NoOpTransition { zone });
            }
        };

        let report = self.executor.execute(
            &plan,
            &mut self.state,
            &mut self.channels,
            &mut self.fader,
        )?;

        let timestamp = chrono::Utc::now();
        for &channel in &report.stopped {
            self.emit(ZoneEvent::ChannelStopped { channel, timestamp });
        }
        for &channel in &report.started {
            self.emit(ZoneEvent::ChannelStarted { channel, timestamp });
        }
        if let Some(effect) = &plan.effect {
            self.emit(ZoneEvent::EffectTriggered {
                effect: effect.effect.clone(),
                duration_ms: effect.duration.as_millis() as u64,
                timestamp,
            });
        }
        self.emit(ZoneEvent::TransitionCommitted {
            from_zone: plan.from_zone.0,
            to_zone: plan.zone.0,
            fade_out_channel: plan.fade_out_channel,
            fade_in_channel: self.state.current_channel(),
            timestamp,
        });

        Ok(TransitionOutcome::Committed { plan, report })
    }

    /// Advance fades and delayed plays by `dt`
    pub fn tick(&mut self, dt: Duration) {
        let completed = self.fader.tick(&mut self.channels, dt);
        let started = self.channels.advance(dt);

        if self.events.is_none() {
            return;
        }
        let timestamp = chrono::Utc::now();
        for (channel, volume) in completed {
            self.emit(ZoneEvent::FadeCompleted {
                channel,
                volume,
                timestamp,
            });
        }
        for channel in started {
            self.emit(ZoneEvent::ChannelStarted { channel, timestamp });
        }
    }

    pub fn state(&self) -> &ZoneState {
        &self.state
    }

    pub fn current_zone(&self) -> ZoneId {
        self.state.current_zone()
    }

    pub fn current_channel(&self) -> usize {
        self.state.current_channel()
    }

    pub fn engine(&self) -> &ZoneTransitionEngine {
        &self.engine
    }

    pub fn channels(&self) -> &ChannelRegistry {
        &self.channels
    }

    pub fn fader(&self) -> &FadeController {
        &self.fader
    }

    pub fn is_started(&self) -> bool {
        self.started
    }

    pub fn snapshot(&self) -> ManagerSnapshot {
        let clock = self.channels.clock();
        let zone = self.state.current_zone();
        ManagerSnapshot {
            zone,
            zone_name: self
                .engine
                .zone(zone)
                .map(|z| z.name.clone())
                .unwrap_or_default(),
            current_channel: self.state.current_channel(),
            clock_ms: clock.as_millis() as u64,
            active_fades: self.fader.active_count(),
            channels: self
                .channels
                .iter()
                .map(|c| ChannelSnapshot {
                    index: c.index(),
                    clip: c.clip().to_string(),
                    volume: c.volume(),
                    playing: c.is_playing(),
                    fading: self.fader.is_fading(c.index()),
                    pending_play_in_ms: c
                        .pending_play_at()
                        .map(|at| at.saturating_sub(clock).as_millis() as u64),
                })
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_starts_in_startup_zone() {
        let manager = MusicManager::silent(&MusicConfig::reference()).unwrap();
        assert_eq!(manager.current_zone(), ZoneId::MAIN_MENU);
        assert_eq!(manager.current_channel(), 0);
        assert!(!manager.is_started());
        assert!(!manager.channels().is_playing(0).unwrap());
    }

    #[test]
    fn test_start_is_idempotent() {
        let mut manager = MusicManager::silent(&MusicConfig::reference()).unwrap();
        manager.start().unwrap();
        manager.start().unwrap();
        assert!(manager.is_started());
        assert!(manager.channels().is_playing(0).unwrap());
        assert_eq!(manager.channels().volume(0).unwrap(), 1.0);
    }

    #[test]
    fn test_channel_count_mismatch_rejected() {
        let config = MusicConfig::reference();
        let result = MusicManager::new(
            &config,
            ChannelRegistry::silent(&config.channels[..2]),
            TransitionExecutor::default(),
        );
        assert!(matches!(
            result,
            Err(crate::Error::InvalidChannelIndex { index: 2, count: 2 })
        ));
    }

    #[test]
    fn test_invalid_config_rejected() {
        let mut config = MusicConfig::reference();
        config.fade_time = -1.0;
        assert!(matches!(
            MusicManager::silent(&config),
            Err(crate::Error::Config(_))
        ));
    }

    #[test]
    fn test_out_of_range_fade_time_rejected() {
        let mut config = MusicConfig::reference();
        config.fade_time = 1e20;
        assert!(matches!(
            MusicManager::silent(&config),
            Err(crate::Error::Config(_))
        ));
    }

    #[test]
    fn test_huge_tick_settles_everything() {
        let mut manager = MusicManager::silent(&MusicConfig::reference()).unwrap();
        manager.start().unwrap();
        manager.request_zone(ZoneId::LEVEL_1).unwrap();
        manager.tick(Duration::from_millis(10));

        manager.tick(Duration::MAX);
        manager.tick(Duration::from_millis(10));

        assert_eq!(manager.channels().clock(), Duration::MAX);
        assert_eq!(manager.channels().volume(0).unwrap(), 0.0);
        assert!(manager.channels().is_playing(1).unwrap());
        assert_eq!(manager.fader().active_count(), 0);
    }

    #[test]
    fn test_snapshot_reports_pending_play() {
        let mut manager = MusicManager::silent(&MusicConfig::reference()).unwrap();
        manager.start().unwrap();
        manager.request_zone(ZoneId::LEVEL_1).unwrap();
        manager.tick(Duration::from_millis(250));

        let snapshot = manager.snapshot();
        assert_eq!(snapshot.zone, ZoneId::LEVEL_1);
        assert_eq!(snapshot.zone_name, "level_1");
        assert_eq!(snapshot.current_channel, 1);
        assert_eq!(snapshot.clock_ms, 250);
        assert_eq!(snapshot.active_fades, 1);
        assert_eq!(snapshot.channels[1].pending_play_in_ms, Some(750));
        assert!(snapshot.channels[0].fading);
        assert!(!snapshot.channels[0].playing);
    }
}
