//! Fade curve implementations for volume ramps
//!
//! A fade curve maps normalized ramp progress (0.0 at the start of a fade,
//! 1.0 at its end) to normalized ramp completion. A ramp from `start` to
//! `target` evaluates to `start + (target - start) * curve(progress)`, so the
//! same curve serves fade-ins and fade-outs.
//!
//! Curves are pluggable through the [`Easing`] trait: the built-in
//! [`FadeCurve`] presets implement it, and so does any `Fn(f32) -> f32`.

use serde::{Deserialize, Serialize};
use std::f32::consts::{FRAC_PI_2, PI};
use std::str::FromStr;

/// Interpolation function used by fades
///
/// Implementations must be monotonic on `[0, 1]` with `ease(0.0) == 0.0`
/// and `ease(1.0) == 1.0`.
pub trait Easing: Send + Sync {
    /// Map ramp progress in `[0, 1]` to ramp completion in `[0, 1]`
    fn ease(&self, t: f32) -> f32;
}

impl<F> Easing for F
where
    F: Fn(f32) -> f32 + Send + Sync,
{
    fn ease(&self, t: f32) -> f32 {
        self(t)
    }
}

/// Built-in fade curves
///
/// Each curve type provides a different perceptual quality:
/// - Linear: Constant rate of change (precise, predictable)
/// - Exponential: Slow start, fast finish (ease-in)
/// - Logarithmic: Fast start, slow finish (ease-out)
/// - SCurve: Smooth acceleration and deceleration (gentle, musical)
/// - EqualPower: Constant perceived loudness during crossfade
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FadeCurve {
    /// Linear: v(t) = t
    #[default]
    Linear,

    /// Exponential: v(t) = t²
    #[serde(alias = "ease_in")]
    Exponential,

    /// Logarithmic: v(t) = √t
    #[serde(alias = "ease_out")]
    Logarithmic,

    /// S-Curve: v(t) = 0.5 × (1 - cos(π × t))
    #[serde(alias = "cosine", alias = "scurve")]
    SCurve,

    /// Equal-Power: v(t) = sin(t × π/2)
    EqualPower,
}

impl FadeCurve {
    /// Calculate ramp completion at given position
    ///
    /// # Arguments
    /// * `position` - Normalized position through fade (0.0 to 1.0), clamped
    ///
    /// # Returns
    /// Ramp completion (0.0 = still at start volume, 1.0 = at target volume)
    pub fn apply(&self, position: f32) -> f32 {
        let t = position.clamp(0.0, 1.0);

        match self {
            FadeCurve::Linear => t,
            FadeCurve::Exponential => t * t,
            FadeCurve::Logarithmic => t.sqrt(),
            FadeCurve::SCurve => 0.5 * (1.0 - (PI * t).cos()),
            FadeCurve::EqualPower => (t * FRAC_PI_2).sin(),
        }
    }

    /// Canonical configuration string (lowercase, underscored)
    pub fn as_config_str(&self) -> &'static str {
        match self {
            FadeCurve::Linear => "linear",
            FadeCurve::Exponential => "exponential",
            FadeCurve::Logarithmic => "logarithmic",
            FadeCurve::SCurve => "s_curve",
            FadeCurve::EqualPower => "equal_power",
        }
    }

    /// Get human-readable display name
    pub fn display_name(&self) -> &'static str {
        match self {
            FadeCurve::Linear => "Linear",
            FadeCurve::Exponential => "Exponential",
            FadeCurve::Logarithmic => "Logarithmic",
            FadeCurve::SCurve => "S-Curve",
            FadeCurve::EqualPower => "Equal Power",
        }
    }

    /// Get all available fade curve variants
    pub fn all_variants() -> &'static [FadeCurve] {
        &[
            FadeCurve::Linear,
            FadeCurve::Exponential,
            FadeCurve::Logarithmic,
            FadeCurve::SCurve,
            FadeCurve::EqualPower,
        ]
    }
}

impl Easing for FadeCurve {
    fn ease(&self, t: f32) -> f32 {
        self.apply(t)
    }
}

impl FromStr for FadeCurve {
    type Err = String;

    /// Parse curve name, case-insensitive
    ///
    /// Accepts the canonical names plus the `ease_in`, `ease_out`, `cosine`
    /// and hyphenated aliases.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "linear" => Ok(FadeCurve::Linear),
            "exponential" | "ease_in" | "ease-in" => Ok(FadeCurve::Exponential),
            "logarithmic" | "ease_out" | "ease-out" => Ok(FadeCurve::Logarithmic),
            "cosine" | "scurve" | "s-curve" | "s_curve" => Ok(FadeCurve::SCurve),
            "equal_power" | "equalpower" | "equal-power" => Ok(FadeCurve::EqualPower),
            other => Err(format!("unknown fade curve '{}'", other)),
        }
    }
}

impl std::fmt::Display for FadeCurve {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display_name())
    }
}
