pub mod arena;
pub mod bot;
pub mod chunks;
pub mod config;
pub mod context;
pub mod equipment;
pub mod error;
pub mod game;
pub mod growing;
pub mod index_map;
pub mod rules;
pub mod store;
pub mod topology;
pub mod trial;
pub mod web;
pub mod zobrist;

pub use arena::*;
pub use bot::*;
pub use config::{ConfigError, GameConfig, GrowthConfig, MatchConfig};
pub use context::Context;
pub use error::{GameError, GrowError, PersistError, PlayError, StoreError};
pub use game::*;
pub use growing::{GrowReport, GrowingBoard, PostGrowCallback};
pub use rules::{GameResult, PlacementRules, Rules};
pub use trial::{Action, ActionKind, Move, SavedMove, SavedTrial, Trial};
