//! Configuration module - environment variable parsing

use std::env;
use std::str::FromStr;

use crate::camera::Point;
use crate::util::rate_limit::INPUT_RATE_LIMIT;
use crate::util::time::{MAX_TICK_RATE, SIMULATION_TPS};

/// Session configuration loaded from environment variables
#[derive(Clone, Debug)]
pub struct Config {
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
    /// Local display name
    pub player_name: String,

    /// Host simulation ticks per second
    pub tick_rate: u32,
    /// Board width
    pub board_width: f32,
    /// Board height
    pub board_height: f32,
    /// Player radius
    pub player_size: f32,
    /// Playable slots per team
    pub max_per_team: usize,

    /// Input frames accepted per follower each second
    pub input_rate_limit: u32,
    /// Per-peer channel and event queue capacity
    pub link_capacity: usize,

    /// Followers spawned by the demo binary
    pub demo_followers: usize,
    /// Host ticks the demo binary runs before teardown
    pub demo_ticks: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            player_name: "Player".to_string(),
            tick_rate: SIMULATION_TPS,
            board_width: 1100.0,
            board_height: 600.0,
            player_size: 30.0,
            max_per_team: 5,
            input_rate_limit: INPUT_RATE_LIMIT,
            link_capacity: 256,
            demo_followers: 2,
            demo_ticks: 180,
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let config = Self {
            log_level: env::var("LOG_LEVEL").unwrap_or(defaults.log_level),
            player_name: env::var("PLAYER_NAME").unwrap_or(defaults.player_name),
            tick_rate: parse_var("TICK_RATE", defaults.tick_rate)?,
            board_width: parse_var("BOARD_WIDTH", defaults.board_width)?,
            board_height: parse_var("BOARD_HEIGHT", defaults.board_height)?,
            player_size: parse_var("PLAYER_SIZE", defaults.player_size)?,
            max_per_team: parse_var("MAX_PER_TEAM", defaults.max_per_team)?,
            input_rate_limit: parse_var("INPUT_RATE_LIMIT", defaults.input_rate_limit)?,
            link_capacity: parse_var("LINK_CAPACITY", defaults.link_capacity)?,
            demo_followers: parse_var("DEMO_FOLLOWERS", defaults.demo_followers)?,
            demo_ticks: parse_var("DEMO_TICKS", defaults.demo_ticks)?,
        };

        config.validate()
    }

    /// Reject values the session cannot run with
    pub fn validate(self) -> Result<Self, ConfigError> {
        if self.tick_rate == 0 || self.tick_rate > MAX_TICK_RATE {
            return Err(ConfigError::Invalid("TICK_RATE"));
        }
        if self.link_capacity == 0 {
            return Err(ConfigError::Invalid("LINK_CAPACITY"));
        }

        for (name, value) in [
            ("BOARD_WIDTH", self.board_width),
            ("BOARD_HEIGHT", self.board_height),
            ("PLAYER_SIZE", self.player_size),
        ] {
            if !value.is_finite() || value <= 0.0 {
                return Err(ConfigError::Invalid(name));
            }
        }

        Ok(self)
    }

    /// Camera origin used before the viewer has a known position
    pub fn default_origin(&self) -> Point {
        Point {
            x: self.board_width / 2.0 + self.player_size * 2.0,
            y: self.board_height / 2.0 + self.player_size * 2.0,
        }
    }
}

fn parse_var<T: FromStr>(name: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(name) {
        Ok(raw) => raw.trim().parse().map_err(|_| ConfigError::Invalid(name)),
        Err(_) => Ok(default),
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for environment variable: {0}")]
    Invalid(&'static str),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_origin_is_offset_board_center() {
        let config = Config::default();
        assert_eq!(config.default_origin(), Point { x: 610.0, y: 360.0 });
    }

    #[test]
    fn defaults_are_valid() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn tick_rate_must_fit_microsecond_ticks() {
        for tick_rate in [0, MAX_TICK_RATE + 1, u32::MAX] {
            let config = Config {
                tick_rate,
                ..Config::default()
            };
            assert!(matches!(
                config.validate(),
                Err(ConfigError::Invalid("TICK_RATE"))
            ));
        }

        let fastest = Config {
            tick_rate: MAX_TICK_RATE,
            ..Config::default()
        };
        assert!(fastest.validate().is_ok());
    }

    #[test]
    fn board_dimensions_must_be_finite_and_positive() {
        for bad in [f32::NAN, f32::INFINITY, f32::NEG_INFINITY, 0.0, -5.0] {
            let config = Config {
                player_size: bad,
                ..Config::default()
            };
            assert!(matches!(
                config.validate(),
                Err(ConfigError::Invalid("PLAYER_SIZE"))
            ));

            let config = Config {
                board_width: bad,
                ..Config::default()
            };
            assert!(matches!(
                config.validate(),
                Err(ConfigError::Invalid("BOARD_WIDTH"))
            ));

            let config = Config {
                board_height: bad,
                ..Config::default()
            };
            assert!(matches!(
                config.validate(),
                Err(ConfigError::Invalid("BOARD_HEIGHT"))
            ));
        }
    }

    #[test]
    fn parse_var_falls_back_when_unset() {
        let value: u32 = parse_var("PITCH_SYNC_TEST_UNSET_VARIABLE", 7).unwrap();
        assert_eq!(value, 7);
    }
}
