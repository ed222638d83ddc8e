//! Zones and the zone-to-track state machine
//!
//! - `table`: transition policy keyed by (source zone, target zone)
//! - `engine`: turns a zone request into a [`TransitionPlan`]

pub mod engine;
pub mod table;

pub use engine::{
    EffectTrigger, StopBehavior, TransitionDecision, TransitionPlan, Zone, ZoneTransitionEngine,
};
pub use table::{SourceMatch, TransitionRule, TransitionTable};

use serde::{Deserialize, Serialize};

/// Stable zone identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ZoneId(pub u32);

impl ZoneId {
    pub const MAIN_MENU: ZoneId = ZoneId(zonemix_common::config::MAIN_MENU_ZONE);
    pub const LEVEL_1: ZoneId = ZoneId(zonemix_common::config::LEVEL_1_ZONE);
    pub const ITEM_SHOP: ZoneId = ZoneId(zonemix_common::config::ITEM_SHOP_ZONE);
}

impl std::fmt::Display for ZoneId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for ZoneId {
    fn from(id: u32) -> Self {
        ZoneId(id)
    }
}

/// Where the music currently is
///
/// `current_channel` is the single active-channel pointer. It switches the
/// moment a plan is committed, while the outgoing channel may still be
/// fading.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ZoneState {
    current_zone: ZoneId,
    current_channel: usize,
}

impl ZoneState {
    pub fn new(current_zone: ZoneId, current_channel: usize) -> Self {
        Self {
            current_zone,
            current_channel,
        }
    }

    pub fn current_zone(&self) -> ZoneId {
        self.current_zone
    }

    pub fn current_channel(&self) -> usize {
        self.current_channel
    }

    pub(crate) fn commit(&mut self, zone: ZoneId, channel: usize) {
        self.current_zone = zone;
        self.current_channel = channel;
    }
}
