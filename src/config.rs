use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("initial dimension {0} must be odd and at least 3")]
    BadDimension(usize),
    #[error("growth step {0} must be even and at least 2")]
    BadStep(usize),
    #[error("{0} players is outside the supported range 2..=8")]
    BadPlayers(u32),
    #[error("each player needs at least one piece")]
    NoPieces,
    #[error("malformed configuration: {0}")]
    Json(#[from] serde_json::Error),
}

/// How a boardless board starts and grows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GrowthConfig {
    pub initial_dimension: usize,
    pub step: usize,
}

impl Default for GrowthConfig {
    fn default() -> Self {
        GrowthConfig {
            initial_dimension: 5,
            step: 2,
        }
    }
}

impl GrowthConfig {
    /// An odd side and an even step keep a single centre cell in place.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.initial_dimension < 3 || self.initial_dimension % 2 == 0 {
            return Err(ConfigError::BadDimension(self.initial_dimension));
        }
        if self.step < 2 || self.step % 2 == 1 {
            return Err(ConfigError::BadStep(self.step));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    pub players: u32,
    pub pieces_per_player: u32,
    pub growth: GrowthConfig,
    /// Base seed for every Zobrist basis.
    pub seed: u64,
}

impl Default for GameConfig {
    fn default() -> Self {
        GameConfig {
            players: 2,
            pieces_per_player: 3,
            growth: GrowthConfig::default(),
            seed: 0x5EED_B0A2_D1E5_5000,
        }
    }
}

impl GameConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.growth.validate()?;
        if !(2..=8).contains(&self.players) {
            return Err(ConfigError::BadPlayers(self.players));
        }
        if self.pieces_per_player == 0 {
            return Err(ConfigError::NoPieces);
        }
        Ok(())
    }

    pub fn from_json(json: &str) -> Result<GameConfig, ConfigError> {
        let config: GameConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }
}

#[derive(Debug, Clone)]
pub struct MatchConfig {
    pub time_per_move: Duration,
    pub max_moves: usize,
    pub game: GameConfig,
}

impl Default for MatchConfig {
    fn default() -> Self {
        MatchConfig {
            time_per_move: Duration::from_secs(5),
            max_moves: 200,
            game: GameConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        assert!(GameConfig::default().validate().is_ok());
        assert_eq!(GrowthConfig::default().initial_dimension, 5);
        assert_eq!(GrowthConfig::default().step, 2);
    }

    #[test]
    fn test_growth_validation() {
        let even = GrowthConfig {
            initial_dimension: 6,
            step: 2,
        };
        assert!(matches!(even.validate(), Err(ConfigError::BadDimension(6))));
        let odd_step = GrowthConfig {
            initial_dimension: 5,
            step: 3,
        };
        assert!(matches!(odd_step.validate(), Err(ConfigError::BadStep(3))));
    }

    #[test]
    fn test_from_json_fills_defaults() {
        let config = GameConfig::from_json(r#"{"pieces_per_player": 5}"#).unwrap();
        assert_eq!(config.pieces_per_player, 5);
        assert_eq!(config.players, 2);
        assert_eq!(config.growth, GrowthConfig::default());
    }

    #[test]
    fn test_from_json_validates() {
        assert!(matches!(
            GameConfig::from_json(r#"{"players": 1}"#),
            Err(ConfigError::BadPlayers(1))
        ));
        assert!(matches!(
            GameConfig::from_json("not json"),
            Err(ConfigError::Json(_))
        ));
    }
}
