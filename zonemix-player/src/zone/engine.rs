//! Zone transition state machine
//!
//! Maps (current zone, requested zone) to a [`TransitionPlan`] using the
//! [`TransitionTable`]. Deciding is kept apart from executing: the engine
//! never touches channels, fades or the host, so every route can be checked
//! without any audio or scene side effects.
//!
//! | Style            | Outgoing channel             | Incoming channel                      | Delay                     |
//! |------------------|------------------------------|---------------------------------------|---------------------------|
//! | `Crossfade`      | fades to 0, keeps running    | plays if idle, fades to 1.0           | 0                         |
//! | `DelayedRestart` | fades to 0, stopped at once  | volume reset to 1.0, delayed play     | `fade_time + extra_delay` |
//! | `Cut`            | stopped at once, no ramp     | volume reset to 1.0, plays at once    | 0                         |

use crate::error::{Error, Result};
use crate::zone::table::TransitionTable;
use crate::zone::{ZoneId, ZoneState};
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::debug;
use zonemix_common::config::{MusicConfig, TransitionStyle};
use zonemix_common::FadeCurve;

/// What happens to the outgoing channel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopBehavior {
    /// Hard-stop at commit, independent of its fade ramp; the incoming
    /// channel is reset to full volume and played after `start_delay`
    StopImmediately,
    /// Leave it running so its volume reaches 0 through the fade
    LetFadeFinish,
}

/// Global mixer effect fired with a transition
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EffectTrigger {
    pub effect: String,
    pub duration: Duration,
}

/// Decision output for one transition request
#[derive(Debug, Clone, PartialEq)]
pub struct TransitionPlan {
    pub from_zone: ZoneId,
    /// Zone to load and commit
    pub zone: ZoneId,
    pub fade_out_channel: Option<usize>,
    pub fade_in_channel: Option<usize>,
    pub fade_time: Duration,
    /// Delay before the incoming channel becomes audible
    pub start_delay: Duration,
    pub stop_behavior: StopBehavior,
    /// Curve override for this transition's fades
    pub curve: Option<FadeCurve>,
    pub effect: Option<EffectTrigger>,
}

impl TransitionPlan {
    /// Concurrent fade-out/fade-in with the outgoing channel left running
    pub fn is_crossfade(&self) -> bool {
        self.stop_behavior == StopBehavior::LetFadeFinish
    }

    /// Check the plan against `channel_count` configured channels
    ///
    /// Returns the fade-in channel.
    pub fn validate(&self, channel_count: usize) -> Result<usize> {
        let fade_in = self
            .fade_in_channel
            .ok_or(Error::MissingPlanTarget(self.zone))?;

        for index in self.fade_out_channel.into_iter().chain(Some(fade_in)) {
            if index >= channel_count {
                return Err(Error::InvalidChannelIndex {
                    index,
                    count: channel_count,
                });
            }
        }

        if self.fade_out_channel == Some(fade_in) {
            return Err(Error::ConflictingPlanChannels(fade_in));
        }
        Ok(fade_in)
    }
}

/// Result of a zone request
#[derive(Debug, Clone, PartialEq)]
pub enum TransitionDecision {
    /// Execute this plan
    Plan(TransitionPlan),
    /// The requested zone is already active; nothing to do
    NoOpTransition { zone: ZoneId },
}

impl TransitionDecision {
    pub fn plan(&self) -> Option<&TransitionPlan> {
        match self {
            TransitionDecision::Plan(plan) => Some(plan),
            TransitionDecision::NoOpTransition { .. } => None,
        }
    }

    pub fn into_plan(self) -> Option<TransitionPlan> {
        match self {
            TransitionDecision::Plan(plan) => Some(plan),
            TransitionDecision::NoOpTransition { .. } => None,
        }
    }

    pub fn is_noop(&self) -> bool {
        matches!(self, TransitionDecision::NoOpTransition { .. })
    }
}

/// A zone and its canonical music channel
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Zone {
    pub id: ZoneId,
    pub name: String,
    pub channel: usize,
}

/// The zone-to-track state machine
#[derive(Debug, Clone)]
pub struct ZoneTransitionEngine {
    zones: BTreeMap<ZoneId, Zone>,
    table: TransitionTable,
    fade_time: Duration,
}

impl ZoneTransitionEngine {
    /// Create an engine; every zone must name one of `channel_count` channels
    pub fn new(
        zones: Vec<Zone>,
        table: TransitionTable,
        fade_time: Duration,
        channel_count: usize,
    ) -> Result<Self> {
        let mut by_id = BTreeMap::new();
        for zone in zones {
            if zone.channel >= channel_count {
                return Err(Error::InvalidChannelIndex {
                    index: zone.channel,
                    count: channel_count,
                });
            }
            by_id.insert(zone.id, zone);
        }
        Ok(Self {
            zones: by_id,
            table,
            fade_time,
        })
    }

    /// Build an engine for the configured channel list
    pub fn from_config(config: &MusicConfig) -> Result<Self> {
        Self::from_config_with_channels(config, config.channels.len())
    }

    /// Build an engine whose zones must fit in `channel_count` channels
    pub fn from_config_with_channels(config: &MusicConfig, channel_count: usize) -> Result<Self> {
        config.validate()?;
        let zones = config
            .zones
            .iter()
            .map(|z| Zone {
                id: ZoneId(z.id),
                name: z.name.clone(),
                channel: z.channel,
            })
            .collect();
        Self::new(
            zones,
            TransitionTable::from_config(&config.transitions),
            config.fade_duration()?,
            channel_count,
        )
    }

    pub fn fade_time(&self) -> Duration {
        self.fade_time
    }

    pub fn table(&self) -> &TransitionTable {
        &self.table
    }

    pub fn zones(&self) -> impl Iterator<Item = &Zone> {
        self.zones.values()
    }

    pub fn zone(&self, id: ZoneId) -> Result<&Zone> {
        self.zones.get(&id).ok_or(Error::UnknownZone(id))
    }

    /// Look up a zone by name (case-insensitive)
    pub fn zone_by_name(&self, name: &str) -> Option<&Zone> {
        self.zones
            .values()
            .find(|z| z.name.eq_ignore_ascii_case(name))
    }

    /// Canonical channel of a zone
    pub fn canonical_channel(&self, id: ZoneId) -> Result<usize> {
        Ok(self.zone(id)?.channel)
    }

    /// State for starting out in `zone`
    pub fn initial_state(&self, zone: ZoneId) -> Result<ZoneState> {
        Ok(ZoneState::new(zone, self.canonical_channel(zone)?))
    }

    /// Decide how to move from the current zone to `target`
    ///
    /// Requests for the active zone return `NoOpTransition`.
    pub fn request_zone(&self, state: &ZoneState, target: ZoneId) -> Result<TransitionDecision> {
        if target == state.current_zone() {
            debug!(zone = %target, "Zone already active");
            return Ok(TransitionDecision::NoOpTransition { zone: target });
        }

        let target_zone = self.zone(target)?;
        let rule = self
            .table
            .lookup(state.current_zone(), target)
            .ok_or(Error::NoTransitionRule {
                from: state.current_zone(),
                to: target,
            })?;

        let plan = self.build_plan(
            state,
            target_zone,
            rule.style,
            rule.extra_delay,
            rule.curve,
            rule.effect.as_deref(),
        );
        debug!(
            from = %plan.from_zone,
            to = %plan.zone,
            style = ?rule.style,
            fade_out = ?plan.fade_out_channel,
            fade_in = ?plan.fade_in_channel,
            start_delay_ms = plan.start_delay.as_millis() as u64,
            "Transition planned"
        );
        Ok(TransitionDecision::Plan(plan))
    }

    /// Decide a hard cut to `target`, bypassing the table
    pub fn request_cut(&self, state: &ZoneState, target: ZoneId) -> Result<TransitionDecision> {
        if target == state.current_zone() {
            return Ok(TransitionDecision::NoOpTransition { zone: target });
        }
        let target_zone = self.zone(target)?;
        let plan = self.build_plan(
            state,
            target_zone,
            TransitionStyle::Cut,
            Duration::ZERO,
            None,
            None,
        );
        debug!(from = %plan.from_zone, to = %plan.zone, "Cut planned");
        Ok(TransitionDecision::Plan(plan))
    }

    fn build_plan(
        &self,
        state: &ZoneState,
        target: &Zone,
        style: TransitionStyle,
        extra_delay: Duration,
        curve: Option<FadeCurve>,
        effect: Option<&str>,
    ) -> TransitionPlan {
        let fade_in = target.channel;
        let fade_out = Some(state.current_channel()).filter(|&c| c != fade_in);

        // Zones sharing a track keep it running
        let style = if fade_out.is_none() {
            TransitionStyle::Crossfade
        } else {
            style
        };

        let (stop_behavior, fade_time, start_delay) = match style {
            TransitionStyle::Crossfade => (StopBehavior::LetFadeFinish, self.fade_time, Duration::ZERO),
            TransitionStyle::DelayedRestart => (
                StopBehavior::StopImmediately,
                self.fade_time,
                self.fade_time.saturating_add(extra_delay),
            ),
            TransitionStyle::Cut => (StopBehavior::StopImmediately, Duration::ZERO, Duration::ZERO),
        };

        TransitionPlan {
            from_zone: state.current_zone(),
            zone: target.id,
            fade_out_channel: fade_out,
            fade_in_channel: Some(fade_in),
            fade_time,
            start_delay,
            stop_behavior,
            curve,
            effect: effect.map(|e| EffectTrigger {
                effect: e.to_string(),
                duration: self.fade_time,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::zone::table::{SourceMatch, TransitionRule};
    use zonemix_common::config::MENU_RETURN_EFFECT;

    fn reference_engine() -> ZoneTransitionEngine {
        ZoneTransitionEngine::from_config(&MusicConfig::reference()).unwrap()
    }

    fn state_in(engine: &ZoneTransitionEngine, zone: ZoneId) -> ZoneState {
        engine.initial_state(zone).unwrap()
    }

    #[test]
    fn test_menu_to_level_is_delayed_restart() {
        let engine = reference_engine();
        let state = state_in(&engine, ZoneId::MAIN_MENU);

        let plan = engine
            .request_zone(&state, ZoneId::LEVEL_1)
            .unwrap()
            .into_plan()
            .unwrap();

        assert_eq!(plan.fade_out_channel, Some(0));
        assert_eq!(plan.fade_in_channel, Some(1));
        assert_eq!(plan.stop_behavior, StopBehavior::StopImmediately);
        assert_eq!(plan.start_delay, Duration::from_secs(1));
        assert_eq!(plan.fade_time, Duration::from_secs(1));
        assert_eq!(plan.zone, ZoneId::LEVEL_1);
        assert!(plan.effect.is_none());
    }

    #[test]
    fn test_level_to_shop_is_crossfade() {
        let engine = reference_engine();
        let state = state_in(&engine, ZoneId::LEVEL_1);

        let plan = engine
            .request_zone(&state, ZoneId::ITEM_SHOP)
            .unwrap()
            .into_plan()
            .unwrap();

        assert_eq!(plan.fade_out_channel, Some(1));
        assert_eq!(plan.fade_in_channel, Some(2));
        assert!(plan.is_crossfade());
        assert_eq!(plan.start_delay, Duration::ZERO);
    }

    #[test]
    fn test_exit_shop_is_crossfade() {
        let engine = reference_engine();
        let state = state_in(&engine, ZoneId::ITEM_SHOP);

        let plan = engine
            .request_zone(&state, ZoneId::LEVEL_1)
            .unwrap()
            .into_plan()
            .unwrap();

        assert_eq!(plan.fade_out_channel, Some(2));
        assert_eq!(plan.fade_in_channel, Some(1));
        assert!(plan.is_crossfade());
    }

    #[test]
    fn test_return_to_menu_triggers_effect() {
        let engine = reference_engine();
        let state = state_in(&engine, ZoneId::ITEM_SHOP);

        let plan = engine
            .request_zone(&state, ZoneId::MAIN_MENU)
            .unwrap()
            .into_plan()
            .unwrap();

        assert_eq!(plan.stop_behavior, StopBehavior::StopImmediately);
        assert_eq!(plan.start_delay, Duration::from_secs(1));
        assert_eq!(
            plan.effect,
            Some(EffectTrigger {
                effect: MENU_RETURN_EFFECT.to_string(),
                duration: Duration::from_secs(1),
            })
        );
    }

    #[test]
    fn test_same_zone_is_noop() {
        let engine = reference_engine();
        for zone in [ZoneId::MAIN_MENU, ZoneId::LEVEL_1, ZoneId::ITEM_SHOP] {
            let state = state_in(&engine, zone);
            assert_eq!(
                engine.request_zone(&state, zone).unwrap(),
                TransitionDecision::NoOpTransition { zone }
            );
            assert!(engine.request_cut(&state, zone).unwrap().is_noop());
        }
    }

    #[test]
    fn test_extra_delay_extends_start_delay() {
        let mut config = MusicConfig::reference();
        config.transitions[0].extra_delay = 0.5;
        let engine = ZoneTransitionEngine::from_config(&config).unwrap();
        let state = state_in(&engine, ZoneId::MAIN_MENU);

        let plan = engine
            .request_zone(&state, ZoneId::LEVEL_1)
            .unwrap()
            .into_plan()
            .unwrap();
        assert_eq!(plan.start_delay, Duration::from_millis(1500));
        assert_eq!(plan.fade_time, Duration::from_secs(1));
    }

    #[test]
    fn test_out_of_range_durations_rejected() {
        let mut config = MusicConfig::reference();
        config.fade_time = 1e20;
        assert!(matches!(
            ZoneTransitionEngine::from_config(&config),
            Err(Error::Config(_))
        ));

        let mut config = MusicConfig::reference();
        config.transitions[0].extra_delay = 1e20;
        assert!(matches!(
            ZoneTransitionEngine::from_config(&config),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn test_start_delay_saturates() {
        let mut config = MusicConfig::reference();
        config.fade_time = 1e19;
        config.transitions[0].extra_delay = 1e19;
        let engine = ZoneTransitionEngine::from_config(&config).unwrap();
        let state = state_in(&engine, ZoneId::MAIN_MENU);

        let plan = engine
            .request_zone(&state, ZoneId::LEVEL_1)
            .unwrap()
            .into_plan()
            .unwrap();
        assert_eq!(plan.start_delay, Duration::MAX);
    }

    #[test]
    fn test_from_config_with_fewer_channels() {
        let config = MusicConfig::reference();
        assert!(matches!(
            ZoneTransitionEngine::from_config_with_channels(&config, 2),
            Err(Error::InvalidChannelIndex { index: 2, count: 2 })
        ));
    }

    #[test]
    fn test_unknown_zone() {
        let engine = reference_engine();
        let state = state_in(&engine, ZoneId::MAIN_MENU);
        assert!(matches!(
            engine.request_zone(&state, ZoneId(9)),
            Err(Error::UnknownZone(ZoneId(9)))
        ));
    }

    #[test]
    fn test_missing_rule() {
        let zones = vec![
            Zone {
                id: ZoneId(0),
                name: "a".to_string(),
                channel: 0,
            },
            Zone {
                id: ZoneId(1),
                name: "b".to_string(),
                channel: 1,
            },
        ];
        let engine =
            ZoneTransitionEngine::new(zones, TransitionTable::new(), Duration::from_secs(1), 2)
                .unwrap();
        let state = state_in(&engine, ZoneId(0));

        assert!(matches!(
            engine.request_zone(&state, ZoneId(1)),
            Err(Error::NoTransitionRule {
                from: ZoneId(0),
                to: ZoneId(1)
            })
        ));
    }

    #[test]
    fn test_zone_with_missing_channel_rejected() {
        let zones = vec![Zone {
            id: ZoneId(0),
            name: "a".to_string(),
            channel: 4,
        }];
        let result =
            ZoneTransitionEngine::new(zones, TransitionTable::new(), Duration::from_secs(1), 2);
        assert!(matches!(
            result,
            Err(Error::InvalidChannelIndex { index: 4, count: 2 })
        ));
    }

    #[test]
    fn test_shared_track_keeps_running() {
        let zones = vec![
            Zone {
                id: ZoneId(0),
                name: "town".to_string(),
                channel: 0,
            },
            Zone {
                id: ZoneId(1),
                name: "town_inn".to_string(),
                channel: 0,
            },
        ];
        let mut table = TransitionTable::new();
        table.insert(TransitionRule::new(
            SourceMatch::Any,
            ZoneId(1),
            TransitionStyle::DelayedRestart,
        ));
        let engine = ZoneTransitionEngine::new(zones, table, Duration::from_secs(1), 1).unwrap();
        let state = state_in(&engine, ZoneId(0));

        let plan = engine
            .request_zone(&state, ZoneId(1))
            .unwrap()
            .into_plan()
            .unwrap();
        assert_eq!(plan.fade_out_channel, None);
        assert_eq!(plan.fade_in_channel, Some(0));
        assert!(plan.is_crossfade());
        assert_eq!(plan.start_delay, Duration::ZERO);
        plan.validate(1).unwrap();
    }

    #[test]
    fn test_cut_plan() {
        let engine = reference_engine();
        let state = state_in(&engine, ZoneId::LEVEL_1);

        let plan = engine
            .request_cut(&state, ZoneId::MAIN_MENU)
            .unwrap()
            .into_plan()
            .unwrap();
        assert_eq!(plan.fade_out_channel, Some(1));
        assert_eq!(plan.fade_in_channel, Some(0));
        assert_eq!(plan.fade_time, Duration::ZERO);
        assert_eq!(plan.start_delay, Duration::ZERO);
        assert_eq!(plan.stop_behavior, StopBehavior::StopImmediately);
        assert!(plan.effect.is_none());
    }

    #[test]
    fn test_rule_curve_carried_into_plan() {
        let mut config = MusicConfig::reference();
        config.transitions[1].curve = Some(FadeCurve::EqualPower);
        let engine = ZoneTransitionEngine::from_config(&config).unwrap();
        let state = state_in(&engine, ZoneId::LEVEL_1);

        let plan = engine
            .request_zone(&state, ZoneId::ITEM_SHOP)
            .unwrap()
            .into_plan()
            .unwrap();
        assert_eq!(plan.curve, Some(FadeCurve::EqualPower));
    }

    #[test]
    fn test_plan_validation() {
        let engine = reference_engine();
        let state = state_in(&engine, ZoneId::MAIN_MENU);
        let plan = engine
            .request_zone(&state, ZoneId::LEVEL_1)
            .unwrap()
            .into_plan()
            .unwrap();

        assert_eq!(plan.validate(3).unwrap(), 1);
        assert!(matches!(
            plan.validate(1),
            Err(Error::InvalidChannelIndex { index: 1, count: 1 })
        ));

        let mut no_target = plan.clone();
        no_target.fade_in_channel = None;
        assert!(matches!(
            no_target.validate(3),
            Err(Error::MissingPlanTarget(ZoneId::LEVEL_1))
        ));

        let mut conflicting = plan.clone();
        conflicting.fade_out_channel = Some(1);
        assert!(matches!(
            conflicting.validate(3),
            Err(Error::ConflictingPlanChannels(1))
        ));
    }

    #[test]
    fn test_zone_by_name() {
        let engine = reference_engine();
        assert_eq!(engine.zone_by_name("LEVEL_1").map(|z| z.id), Some(ZoneId::LEVEL_1));
        assert!(engine.zone_by_name("castle").is_none());
    }
}
