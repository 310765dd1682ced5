use thiserror::Error;

use crate::config::ConfigError;
use crate::equipment::Tiling;

/// Misuse of a packed cell store. These are programming errors: callers are
/// not expected to recover from them.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("index {index} out of range for a container of {len} cells")]
    IndexOutOfRange { index: usize, len: usize },
    #[error("value {value} does not fit a slice holding at most {max}")]
    BadValue { value: u32, max: u32 },
    #[error("index map sends two occupied cells to {cell}")]
    NonInjectiveMap { cell: usize },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GameError {
    #[error("Invalid move: {0}")]
    InvalidMove(String),
    #[error("Game already over")]
    GameOver,
    #[error("Not your turn")]
    NotYourTurn,
    #[error("container {container} is not a flat packed state")]
    UnsupportedContainerKind { container: usize },
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Failure of a grow transaction.
///
/// `NotBoardless`, `NonSquareTiling` and `UnsupportedContainerKind` are raised
/// before anything is mutated. Any other variant leaves the context corrupt and
/// the caller must reload a known-good trial.
#[derive(Debug, Error)]
pub enum GrowError {
    #[error("the board is not boardless and cannot grow")]
    NotBoardless,
    #[error("{0:?} tiling is not supported, only square boards can grow")]
    NonSquareTiling(Tiling),
    #[error("container {container} is not a flat packed state")]
    UnsupportedContainerKind { container: usize },
    #[error("replaying move {move_index} failed: {source}")]
    ReplayFailed {
        move_index: usize,
        #[source]
        source: GameError,
    },
    #[error("replayed position hash {actual:#018x} differs from migrated hash {expected:#018x}")]
    ReplayDiverged { expected: u64, actual: u64 },
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Failure of one `Game::make_move`.
#[derive(Debug, Error)]
pub enum PlayError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Game(#[from] GameError),
    #[error("board growth failed: {0}")]
    Grow(#[from] GrowError),
}

impl PlayError {
    /// The engine state can no longer be trusted.
    pub fn is_corrupting(&self) -> bool {
        match self {
            PlayError::Grow(GrowError::NotBoardless)
            | PlayError::Grow(GrowError::NonSquareTiling(_))
            | PlayError::Grow(GrowError::UnsupportedContainerKind { .. }) => false,
            PlayError::Grow(_) => true,
            PlayError::Config(_) | PlayError::Game(_) => false,
        }
    }
}

/// Saving or restoring a trial.
#[derive(Debug, Error)]
pub enum PersistError {
    #[error("malformed saved trial: {0}")]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("saved move {move_index} rejected: {source}")]
    Replay {
        move_index: usize,
        #[source]
        source: GameError,
    },
    #[error(transparent)]
    Grow(#[from] GrowError),
}
