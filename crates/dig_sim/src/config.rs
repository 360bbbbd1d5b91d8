//! Tunables supplied by the host (upgrades, presentation settings).

use crate::cell::Unlocks;
use crate::render::DirtStyle;
use rand::rngs::SmallRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Seed used when the host does not supply one. The wasm target has no
/// entropy source wired up.
pub const DEFAULT_SEED: u64 = 0x5eed_d166;

/// Errors raised while loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to parse configuration: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid configuration: {0}")]
    Invalid(&'static str),
}

/// Per-agent behavior tunables, read-only during a tick.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AgentConfig {
    /// Health removed per frame while digging, applied in one hit per
    /// 60-frame window.
    pub dig_speed: f32,
    /// Completed digs before the agent dies of exhaustion.
    pub dig_count: u32,
    /// Per-tick chance of starting to dig.
    pub dig_probability: f64,
    /// Per-tick chance of taking a step once the move cooldown has elapsed.
    pub move_probability: f64,
    pub min_frames_between_moves: u32,
    /// Chance of keeping the previous walk direction.
    pub direction_persistence: f64,
    pub explosion_radius: f32,
    pub explosion_chance: f64,
    /// Always dig unlocked gold, diamonds and magic when standing on them.
    pub gold_seeker: bool,
    pub afterlife: bool,
    pub egg_handling: bool,
    pub saintly_chance_immaculate: f64,
    pub saintly_chance_maculate: f64,
    pub unlocks: Unlocks,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            dig_speed: 0.5,
            dig_count: 3,
            dig_probability: 0.005,
            move_probability: 0.02,
            min_frames_between_moves: 10,
            direction_persistence: 0.9,
            explosion_radius: 5.0,
            explosion_chance: 0.0,
            gold_seeker: false,
            afterlife: false,
            egg_handling: false,
            saintly_chance_immaculate: 0.9,
            saintly_chance_maculate: 0.5,
            unlocks: Unlocks::default(),
        }
    }
}

impl AgentConfig {
    /// # Errors
    /// Returns [`ConfigError::Invalid`] naming the first bad field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let probabilities = [
            (self.dig_probability, "dig_probability must be within [0, 1]"),
            (self.move_probability, "move_probability must be within [0, 1]"),
            (self.direction_persistence, "direction_persistence must be within [0, 1]"),
            (self.explosion_chance, "explosion_chance must be within [0, 1]"),
            (self.saintly_chance_immaculate, "saintly_chance_immaculate must be within [0, 1]"),
            (self.saintly_chance_maculate, "saintly_chance_maculate must be within [0, 1]"),
        ];
        for (value, message) in probabilities {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigError::Invalid(message));
            }
        }
        if self.dig_speed <= 0.0 || !self.dig_speed.is_finite() {
            return Err(ConfigError::Invalid("dig_speed must be positive"));
        }
        if self.dig_count == 0 {
            return Err(ConfigError::Invalid("dig_count must be at least 1"));
        }
        if self.explosion_radius < 0.0 || !self.explosion_radius.is_finite() {
            return Err(ConfigError::Invalid("explosion_radius must not be negative"));
        }
        Ok(())
    }
}

/// Presentation settings consumed by the render helpers.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RenderConfig {
    pub dirt_style: DirtStyle,
    /// Health percentages are rounded up to a multiple of this before being
    /// turned into alpha. 1 shows every point of damage.
    pub health_visual_pct_interval: f32,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            dirt_style: DirtStyle::Dirt,
            health_visual_pct_interval: 1.0,
        }
    }
}

/// Top-level configuration for a [`crate::Simulation`].
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SimConfig {
    /// Optional RNG seed for reproducible runs.
    pub rng_seed: Option<u64>,
    pub agent: AgentConfig,
    pub render: RenderConfig,
}

impl SimConfig {
    /// Parses and validates a TOML document. Missing keys take defaults.
    ///
    /// # Errors
    /// Returns [`ConfigError`] on malformed TOML or out-of-range values.
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    /// # Errors
    /// Returns [`ConfigError::Invalid`] naming the first bad field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.agent.validate()?;
        let interval = self.render.health_visual_pct_interval;
        if interval <= 0.0 || !interval.is_finite() {
            return Err(ConfigError::Invalid(
                "health_visual_pct_interval must be positive",
            ));
        }
        Ok(())
    }

    /// Returns an RNG from the configured seed, or [`DEFAULT_SEED`] if
    /// none is set.
    #[must_use]
    pub fn seeded_rng(&self) -> SmallRng {
        SmallRng::seed_from_u64(self.rng_seed.unwrap_or(DEFAULT_SEED))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        SimConfig::default().validate().unwrap();
    }

    #[test]
    fn toml_overrides_and_defaults() {
        let config = SimConfig::from_toml_str(
            r#"
            rng_seed = 7

            [agent]
            dig_speed = 2.0
            afterlife = true

            [agent.unlocks]
            gold = true

            [render]
            dirt_style = "Ice"
            health_visual_pct_interval = 10.0
            "#,
        )
        .unwrap();
        assert_eq!(config.rng_seed, Some(7));
        assert_eq!(config.agent.dig_speed, 2.0);
        assert!(config.agent.afterlife);
        assert!(config.agent.unlocks.gold);
        assert!(!config.agent.unlocks.diamonds);
        assert_eq!(config.agent.dig_count, AgentConfig::default().dig_count);
        assert_eq!(config.render.dirt_style, DirtStyle::Ice);
    }

    #[test]
    fn out_of_range_probability_is_rejected() {
        let err = SimConfig::from_toml_str("[agent]\nmove_probability = 1.5\n").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(msg) if msg.contains("move_probability")));
    }

    #[test]
    fn zero_dig_count_is_rejected() {
        let err = SimConfig::from_toml_str("[agent]\ndig_count = 0\n").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn nan_radius_and_interval_are_rejected() {
        let config = SimConfig {
            agent: AgentConfig {
                explosion_radius: f32::NAN,
                ..AgentConfig::default()
            },
            ..SimConfig::default()
        };
        assert!(config.validate().is_err());

        for interval in [f32::NAN, f32::INFINITY] {
            let config = SimConfig {
                render: RenderConfig {
                    health_visual_pct_interval: interval,
                    ..RenderConfig::default()
                },
                ..SimConfig::default()
            };
            assert!(config.validate().is_err());
        }
    }

    #[test]
    fn malformed_toml_is_a_parse_error() {
        let err = SimConfig::from_toml_str("[agent\n").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn seeded_rng_is_reproducible() {
        use rand::Rng;
        let config = SimConfig {
            rng_seed: Some(42),
            ..SimConfig::default()
        };
        let a: u64 = config.seeded_rng().random();
        let b: u64 = config.seeded_rng().random();
        assert_eq!(a, b);
    }
}
