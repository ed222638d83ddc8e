//! Configuration schema, validation and file resolution
//!
//! The music configuration is a single TOML document:
//!
//! ```toml
//! fade_time = 1.0
//! curve = "linear"
//! startup_zone = 0
//!
//! [[channels]]
//! clip = "music/main_menu.ogg"
//!
//! [[zones]]
//! id = 0
//! name = "main_menu"
//! channel = 0
//!
//! [[transitions]]
//! to = 0
//! style = "delayed_restart"
//! effect = "menu_return"
//! ```
//!
//! Config file resolution follows this priority order:
//! 1. Command-line argument (highest priority)
//! 2. `ZONEMIX_CONFIG` environment variable
//! 3. User config file (`<config dir>/zonemix/config.toml`)
//! 4. Built-in reference configuration (fallback)

use crate::fade_curves::FadeCurve;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Environment variable naming the config file
pub const CONFIG_ENV_VAR: &str = "ZONEMIX_CONFIG";

/// Reference zone ids
pub const MAIN_MENU_ZONE: u32 = 0;
pub const LEVEL_1_ZONE: u32 = 1;
pub const ITEM_SHOP_ZONE: u32 = 2;

/// Effect triggered on returns to the main menu in the reference configuration
pub const MENU_RETURN_EFFECT: &str = "menu_return";

/// Complete music configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MusicConfig {
    /// Crossfade duration in seconds (must be > 0)
    #[serde(default = "default_fade_time")]
    pub fade_time: f32,

    /// Default interpolation curve for all fades
    #[serde(default)]
    pub curve: FadeCurve,

    /// Zone active at startup
    #[serde(default)]
    pub startup_zone: u32,

    /// Logging configuration (optional)
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Ordered track list; a channel's index is its position here
    pub channels: Vec<ChannelConfig>,

    /// Zones and their canonical channels
    pub zones: Vec<ZoneConfig>,

    /// Transition policy table
    #[serde(default)]
    pub transitions: Vec<TransitionRuleConfig>,
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

/// One track bound to one playback channel
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelConfig {
    /// Opaque audio asset reference
    pub clip: String,

    /// Volume before any fade touches the channel
    #[serde(default = "default_initial_volume")]
    pub initial_volume: f32,
}

/// A named application zone
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ZoneConfig {
    pub id: u32,
    pub name: String,
    /// Index of the zone's canonical music channel
    pub channel: usize,
}

/// How the outgoing and incoming channels are handled on a transition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransitionStyle {
    /// Fade out and in concurrently; the outgoing channel keeps running
    Crossfade,
    /// Fade out and hard-stop the outgoing channel, then restart the
    /// incoming channel at full volume after `fade_time + extra_delay`
    DelayedRestart,
    /// Stop the outgoing channel and start the incoming one with no ramp
    Cut,
}

/// One row of the transition policy table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransitionRuleConfig {
    /// Source zone; `None` matches any zone
    #[serde(default)]
    pub from: Option<u32>,

    /// Target zone
    pub to: u32,

    pub style: TransitionStyle,

    /// Additional delay in seconds before a delayed restart begins
    #[serde(default)]
    pub extra_delay: f32,

    /// Curve override for this transition
    #[serde(default)]
    pub curve: Option<FadeCurve>,

    /// Mixer effect triggered with `fade_time` as its duration
    #[serde(default)]
    pub effect: Option<String>,
}

fn default_fade_time() -> f32 {
    1.0
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_initial_volume() -> f32 {
    1.0
}

impl MusicConfig {
    /// Built-in reference configuration: main menu, first level and item shop
    pub fn reference() -> Self {
        let channel = |clip: &str| ChannelConfig {
            clip: clip.to_string(),
            initial_volume: 1.0,
        };
        let zone = |id: u32, name: &str| ZoneConfig {
            id,
            name: name.to_string(),
            channel: id as usize,
        };
        let rule = |from: Option<u32>, to: u32, style: TransitionStyle| TransitionRuleConfig {
            from,
            to,
            style,
            extra_delay: 0.0,
            curve: None,
            effect: None,
        };

        Self {
            fade_time: default_fade_time(),
            curve: FadeCurve::Linear,
            startup_zone: MAIN_MENU_ZONE,
            logging: LoggingConfig::default(),
            channels: vec![
                channel("music/main_menu.ogg"),
                channel("music/level_1.ogg"),
                channel("music/item_shop.ogg"),
            ],
            zones: vec![
                zone(MAIN_MENU_ZONE, "main_menu"),
                zone(LEVEL_1_ZONE, "level_1"),
                zone(ITEM_SHOP_ZONE, "item_shop"),
            ],
            transitions: vec![
                rule(None, LEVEL_1_ZONE, TransitionStyle::DelayedRestart),
                rule(None, ITEM_SHOP_ZONE, TransitionStyle::Crossfade),
                rule(Some(ITEM_SHOP_ZONE), LEVEL_1_ZONE, TransitionStyle::Crossfade),
                TransitionRuleConfig {
                    effect: Some(MENU_RETURN_EFFECT.to_string()),
                    ..rule(None, MAIN_MENU_ZONE, TransitionStyle::DelayedRestart)
                },
            ],
        }
    }

    /// Parse and validate a TOML document
    pub fn from_toml_str(toml_str: &str) -> Result<Self> {
        let config: MusicConfig = toml::from_str(toml_str)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a config file
    pub fn load(path: &Path) -> Result<Self> {
        let toml_str = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("Failed to read config file {:?}: {}", path, e))
        })?;
        let config = Self::from_toml_str(&toml_str)?;
        info!("Loaded music configuration from {:?}", path);
        Ok(config)
    }

    /// Load the resolved config file, or the reference configuration when
    /// no file is found
    pub fn load_or_reference(cli_path: Option<&Path>) -> Result<Self> {
        match resolve_config_path(cli_path) {
            Some(path) => Self::load(&path),
            None => {
                warn!("No config file found, using reference configuration");
                Ok(Self::reference())
            }
        }
    }

    /// Check every cross-reference in the configuration
    pub fn validate(&self) -> Result<()> {
        if self.fade_time <= 0.0 || seconds_to_duration(self.fade_time).is_none() {
            return Err(Error::Config(format!(
                "fade_time must be a positive number of seconds, got {}",
                self.fade_time
            )));
        }

        if self.channels.is_empty() {
            return Err(Error::Config("at least one channel is required".to_string()));
        }

        for (index, channel) in self.channels.iter().enumerate() {
            if !channel.initial_volume.is_finite() {
                return Err(Error::Config(format!(
                    "channel {} has a non-finite initial_volume",
                    index
                )));
            }
        }

        let mut zone_ids = HashSet::new();
        for zone in &self.zones {
            if !zone_ids.insert(zone.id) {
                return Err(Error::Config(format!("duplicate zone id {}", zone.id)));
            }
            if zone.channel >= self.channels.len() {
                return Err(Error::Config(format!(
                    "zone '{}' refers to channel {} but only {} channels are configured",
                    zone.name,
                    zone.channel,
                    self.channels.len()
                )));
            }
        }

        if !zone_ids.contains(&self.startup_zone) {
            return Err(Error::Config(format!(
                "startup_zone {} is not a configured zone",
                self.startup_zone
            )));
        }

        for rule in &self.transitions {
            if let Some(from) = rule.from {
                if !zone_ids.contains(&from) {
                    return Err(Error::Config(format!(
                        "transition source zone {} is not configured",
                        from
                    )));
                }
            }
            if !zone_ids.contains(&rule.to) {
                return Err(Error::Config(format!(
                    "transition target zone {} is not configured",
                    rule.to
                )));
            }
            if seconds_to_duration(rule.extra_delay).is_none() {
                return Err(Error::Config(format!(
                    "transition to zone {} has invalid extra_delay {}",
                    rule.to, rule.extra_delay
                )));
            }
        }

        debug!(
            channels = self.channels.len(),
            zones = self.zones.len(),
            rules = self.transitions.len(),
            "Configuration validated"
        );
        Ok(())
    }

    /// Crossfade duration as Duration
    pub fn fade_duration(&self) -> Result<Duration> {
        seconds_to_duration(self.fade_time).ok_or_else(|| {
            Error::Config(format!("fade_time {} is not a valid duration", self.fade_time))
        })
    }

    /// Look up a zone by id
    pub fn zone(&self, id: u32) -> Option<&ZoneConfig> {
        self.zones.iter().find(|z| z.id == id)
    }

    /// Look up a zone by name (case-insensitive)
    pub fn zone_by_name(&self, name: &str) -> Option<&ZoneConfig> {
        self.zones.iter().find(|z| z.name.eq_ignore_ascii_case(name))
    }
}

impl Default for MusicConfig {
    fn default() -> Self {
        Self::reference()
    }
}

/// Convert seconds to a Duration
///
/// `None` for NaN, negative, infinite or out-of-range values.
pub fn seconds_to_duration(secs: f32) -> Option<Duration> {
    Duration::try_from_secs_f32(secs).ok()
}

/// Resolve the config file path
///
/// Returns `None` when neither the CLI nor the environment names a file and
/// no user config file exists.
pub fn resolve_config_path(cli_arg: Option<&Path>) -> Option<PathBuf> {
    // Priority 1: Command-line argument
    if let Some(path) = cli_arg {
        return Some(path.to_path_buf());
    }

    // Priority 2: Environment variable
    if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
        if !path.is_empty() {
            return Some(PathBuf::from(path));
        }
    }

    // Priority 3: User config file
    dirs::config_dir()
        .map(|d| d.join("zonemix").join("config.toml"))
        .filter(|p| p.exists())
}
