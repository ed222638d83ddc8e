//! Transition policy table
//!
//! Rules are keyed by (source, target). A rule for an exact source zone
//! takes precedence over an any-source rule for the same target, so adding
//! a zone or a special-case route is a data change.

use crate::zone::ZoneId;
use std::collections::HashMap;
use std::time::Duration;
use zonemix_common::config::{seconds_to_duration, TransitionRuleConfig, TransitionStyle};
use zonemix_common::FadeCurve;

/// Source side of a rule
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceMatch {
    Any,
    Zone(ZoneId),
}

impl From<Option<u32>> for SourceMatch {
    fn from(from: Option<u32>) -> Self {
        match from {
            Some(id) => SourceMatch::Zone(ZoneId(id)),
            None => SourceMatch::Any,
        }
    }
}

/// Policy for one (source, target) route
#[derive(Debug, Clone, PartialEq)]
pub struct TransitionRule {
    pub from: SourceMatch,
    pub to: ZoneId,
    pub style: TransitionStyle,
    /// Added to `fade_time` before a delayed restart begins
    pub extra_delay: Duration,
    /// Overrides the controller's default curve
    pub curve: Option<FadeCurve>,
    /// Mixer effect fired with `fade_time` as its duration
    pub effect: Option<String>,
}

impl TransitionRule {
    pub fn new(from: SourceMatch, to: ZoneId, style: TransitionStyle) -> Self {
        Self {
            from,
            to,
            style,
            extra_delay: Duration::ZERO,
            curve: None,
            effect: None,
        }
    }

    pub fn with_extra_delay(mut self, extra_delay: Duration) -> Self {
        self.extra_delay = extra_delay;
        self
    }

    pub fn with_curve(mut self, curve: FadeCurve) -> Self {
        self.curve = Some(curve);
        self
    }

    pub fn with_effect(mut self, effect: impl Into<String>) -> Self {
        self.effect = Some(effect.into());
        self
    }
}

impl From<&TransitionRuleConfig> for TransitionRule {
    fn from(config: &TransitionRuleConfig) -> Self {
        Self {
            from: config.from.into(),
            to: ZoneId(config.to),
            style: config.style,
            // Range checked at config load
            extra_delay: seconds_to_duration(config.extra_delay).unwrap_or_default(),
            curve: config.curve,
            effect: config.effect.clone(),
        }
    }
}

/// Table of transition rules
#[derive(Debug, Clone, Default)]
pub struct TransitionTable {
    rules: HashMap<(SourceMatch, ZoneId), TransitionRule>,
}

impl TransitionTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a table from configured rules; later rows replace earlier
    /// rows for the same route
    pub fn from_config(rules: &[TransitionRuleConfig]) -> Self {
        let mut table = Self::new();
        for rule in rules {
            table.insert(rule.into());
        }
        table
    }

    /// Add a rule, returning the rule it replaced
    pub fn insert(&mut self, rule: TransitionRule) -> Option<TransitionRule> {
        self.rules.insert((rule.from, rule.to), rule)
    }

    /// Find the rule for `from -> to`, preferring an exact source match
    pub fn lookup(&self, from: ZoneId, to: ZoneId) -> Option<&TransitionRule> {
        self.rules
            .get(&(SourceMatch::Zone(from), to))
            .or_else(|| self.rules.get(&(SourceMatch::Any, to)))
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &TransitionRule> {
        self.rules.values()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use zonemix_common::config::MusicConfig;

    #[test]
    fn test_exact_source_beats_any() {
        let table = TransitionTable::from_config(&MusicConfig::reference().transitions);

        let exit_shop = table.lookup(ZoneId::ITEM_SHOP, ZoneId::LEVEL_1).unwrap();
        assert_eq!(exit_shop.style, TransitionStyle::Crossfade);
        assert_eq!(exit_shop.from, SourceMatch::Zone(ZoneId::ITEM_SHOP));

        let from_menu = table.lookup(ZoneId::MAIN_MENU, ZoneId::LEVEL_1).unwrap();
        assert_eq!(from_menu.style, TransitionStyle::DelayedRestart);
        assert_eq!(from_menu.from, SourceMatch::Any);
    }

    #[test]
    fn test_missing_route() {
        let mut table = TransitionTable::new();
        table.insert(TransitionRule::new(
            SourceMatch::Zone(ZoneId(1)),
            ZoneId(2),
            TransitionStyle::Cut,
        ));
        assert!(table.lookup(ZoneId(0), ZoneId(2)).is_none());
        assert!(table.lookup(ZoneId(1), ZoneId(2)).is_some());
    }

    #[test]
    fn test_insert_replaces_same_route() {
        let mut table = TransitionTable::new();
        table.insert(TransitionRule::new(SourceMatch::Any, ZoneId(3), TransitionStyle::Cut));
        let replaced = table.insert(
            TransitionRule::new(SourceMatch::Any, ZoneId(3), TransitionStyle::Crossfade)
                .with_curve(FadeCurve::EqualPower),
        );

        assert_eq!(replaced.map(|r| r.style), Some(TransitionStyle::Cut));
        assert_eq!(table.len(), 1);
        let rule = table.lookup(ZoneId(9), ZoneId(3)).unwrap();
        assert_eq!(rule.style, TransitionStyle::Crossfade);
        assert_eq!(rule.curve, Some(FadeCurve::EqualPower));
    }

    #[test]
    fn test_config_rule_conversion() {
        let config = TransitionRuleConfig {
            from: Some(4),
            to: 5,
            style: TransitionStyle::DelayedRestart,
            extra_delay: 0.5,
            curve: Some(FadeCurve::Logarithmic),
            effect: Some("duck".to_string()),
        };
        let rule = TransitionRule::from(&config);
        assert_eq!(rule.from, SourceMatch::Zone(ZoneId(4)));
        assert_eq!(rule.to, ZoneId(5));
        assert_eq!(rule.extra_delay, Duration::from_millis(500));
        assert_eq!(rule.effect.as_deref(), Some("duck"));
    }
}
