use serde::{Deserialize, Serialize};
use std::fmt;

use crate::config::GameConfig;
use crate::error::{PersistError, StoreError};
use crate::index_map::IndexMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ActionKind {
    Add,
    Move,
    Remove,
}

/// One atomic change. `None` sites mean undefined.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Action {
    pub kind: ActionKind,
    pub from: Option<usize>,
    pub to: Option<usize>,
    pub who: u32,
    pub what: u32,
    pub count: u32,
    pub state: u32,
    pub decision: bool,
}

impl Action {
    pub fn add(to: usize, who: u32, what: u32, count: u32) -> Self {
        Action {
            kind: ActionKind::Add,
            from: None,
            to: Some(to),
            who,
            what,
            count,
            state: 0,
            decision: true,
        }
    }

    pub fn move_piece(from: usize, to: usize, who: u32, what: u32) -> Self {
        Action {
            kind: ActionKind::Move,
            from: Some(from),
            to: Some(to),
            who,
            what,
            count: 1,
            state: 0,
            decision: true,
        }
    }

    /// A consequence removing the piece at `at`.
    pub fn remove(at: usize, who: u32, what: u32) -> Self {
        Action {
            kind: ActionKind::Remove,
            from: Some(at),
            to: None,
            who,
            what,
            count: 1,
            state: 0,
            decision: false,
        }
    }

    /// Same action with every defined site sent through `map`.
    pub fn remapped(&self, map: &IndexMap) -> Result<Action, StoreError> {
        let through = |site: Option<usize>| -> Result<Option<usize>, StoreError> {
            match site {
                None => Ok(None),
                Some(s) => map
                    .get(s)
                    .map(Some)
                    .ok_or(StoreError::IndexOutOfRange {
                        index: s,
                        len: map.len(),
                    }),
            }
        };
        Ok(Action {
            from: through(self.from)?,
            to: through(self.to)?,
            ..self.clone()
        })
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let site = |s: Option<usize>| s.map_or_else(|| "-".to_string(), |s| s.to_string());
        write!(
            f,
            "{:?}({} -> {}, who={}, what={})",
            self.kind,
            site(self.from),
            site(self.to),
            self.who,
            self.what
        )
    }
}

/// A move: the decision action first, then its consequences.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Move {
    pub mover: u32,
    pub actions: Vec<Action>,
}

impl Move {
    pub fn new(mover: u32, actions: Vec<Action>) -> Self {
        Move { mover, actions }
    }

    /// Places a piece of `what` from the hand at `hand` onto `to`.
    pub fn place(mover: u32, hand: usize, to: usize, what: u32) -> Self {
        Move::new(mover, vec![Action::move_piece(hand, to, mover, what)])
    }

    pub fn decision(&self) -> Option<&Action> {
        self.actions.iter().find(|a| a.decision)
    }

    pub fn from(&self) -> Option<usize> {
        self.decision().and_then(|a| a.from)
    }

    pub fn to(&self) -> Option<usize> {
        self.decision().and_then(|a| a.to)
    }

    pub fn remapped(&self, map: &IndexMap) -> Result<Move, StoreError> {
        let actions = self
            .actions
            .iter()
            .map(|a| a.remapped(map))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Move::new(self.mover, actions))
    }
}

impl fmt::Display for Move {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "P{}:", self.mover)?;
        for action in &self.actions {
            write!(f, " {}", action)?;
        }
        Ok(())
    }
}

/// The move log of one game plus its legal-move cache.
#[derive(Debug, Clone, Default)]
pub struct Trial {
    moves: Vec<Move>,
    num_initial_placement_moves: usize,
    /// `None` when the cache is stale.
    legal_moves: Option<Vec<Move>>,
}

impl Trial {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn moves(&self) -> &[Move] {
        &self.moves
    }

    pub fn num_moves(&self) -> usize {
        self.moves.len()
    }

    pub fn num_initial_placement_moves(&self) -> usize {
        self.num_initial_placement_moves
    }

    pub fn set_num_initial_placement_moves(&mut self, count: usize) {
        self.num_initial_placement_moves = count;
    }

    /// Moves after the scripted setup.
    pub fn decisions(&self) -> &[Move] {
        &self.moves[self.num_initial_placement_moves.min(self.moves.len())..]
    }

    pub fn push(&mut self, mv: Move) {
        self.moves.push(mv);
        self.invalidate_legal_moves();
    }

    pub fn last_move(&self) -> Option<&Move> {
        self.moves.last()
    }

    /// Cached legal moves. An empty cache counts as unknown.
    pub fn legal_moves(&self) -> Option<&[Move]> {
        self.legal_moves
            .as_deref()
            .filter(|moves| !moves.is_empty())
    }

    pub fn set_legal_moves(&mut self, moves: Vec<Move>) {
        self.legal_moves = Some(moves);
    }

    pub fn invalidate_legal_moves(&mut self) {
        self.legal_moves = None;
    }

    /// Drops the whole log and returns it with the setup length.
    pub fn take(&mut self) -> (Vec<Move>, usize) {
        let k = self.num_initial_placement_moves;
        self.num_initial_placement_moves = 0;
        self.invalidate_legal_moves();
        (std::mem::take(&mut self.moves), k)
    }
}

/// A move as it was played, with the board side at that time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SavedMove {
    pub dimension: usize,
    #[serde(rename = "move")]
    pub mv: Move,
}

/// Saved-game format: the configuration and the decisions in play order.
/// Loading replays from a fresh board, so grows recur at the same points.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavedTrial {
    pub config: GameConfig,
    pub moves: Vec<SavedMove>,
}

impl SavedTrial {
    pub fn to_json(&self) -> Result<String, PersistError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(json: &str) -> Result<SavedTrial, PersistError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn save(&self, path: impl AsRef<std::path::Path>) -> Result<(), PersistError> {
        std::fs::write(path, self.to_json()?)?;
        Ok(())
    }

    pub fn load(path: impl AsRef<std::path::Path>) -> Result<SavedTrial, PersistError> {
        Self::from_json(&std::fs::read_to_string(path)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_remap_keeps_undefined_sites() {
        let map = IndexMap::square(5, 2, 2);
        let mv = Move::new(
            1,
            vec![Action::move_piece(25, 10, 1, 2), Action::remove(11, 2, 3)],
        );
        let remapped = mv.remapped(&map).unwrap();
        assert_eq!(remapped.from(), Some(49));
        assert_eq!(remapped.to(), Some(22));
        assert_eq!(remapped.actions[1].from, Some(23));
        assert_eq!(remapped.actions[1].to, None);
        assert_eq!(remapped.actions[1].kind, ActionKind::Remove);
    }

    #[test]
    fn test_remap_rejects_unknown_site() {
        let map = IndexMap::square(5, 2, 2);
        let mv = Move::new(1, vec![Action::add(40, 1, 2, 1)]);
        assert!(matches!(
            mv.remapped(&map),
            Err(StoreError::IndexOutOfRange { index: 40, .. })
        ));
    }

    #[test]
    fn test_empty_legal_cache_is_unknown() {
        let mut trial = Trial::new();
        assert!(trial.legal_moves().is_none());
        trial.set_legal_moves(Vec::new());
        assert!(trial.legal_moves().is_none());
        trial.set_legal_moves(vec![Move::place(1, 25, 3, 2)]);
        assert_eq!(trial.legal_moves().map(<[Move]>::len), Some(1));
        trial.push(Move::place(1, 25, 3, 2));
        assert!(trial.legal_moves().is_none());
    }

    #[test]
    fn test_take_resets_log() {
        let mut trial = Trial::new();
        trial.push(Move::new(1, vec![Action::add(25, 1, 2, 3)]));
        trial.set_num_initial_placement_moves(1);
        trial.push(Move::place(1, 25, 12, 2));
        assert_eq!(trial.decisions().len(), 1);
        let (moves, k) = trial.take();
        assert_eq!((moves.len(), k), (2, 1));
        assert_eq!(trial.num_moves(), 0);
        assert_eq!(trial.num_initial_placement_moves(), 0);
    }

    #[test]
    fn test_saved_trial_json() {
        let saved = SavedTrial {
            config: GameConfig::default(),
            moves: vec![SavedMove {
                dimension: 5,
                mv: Move::place(1, 25, 10, 2),
            }],
        };
        let json = saved.to_json().unwrap();
        assert!(json.contains("\"move\""));
        assert_eq!(SavedTrial::from_json(&json).unwrap(), saved);
        assert!(matches!(
            SavedTrial::from_json("{\"moves\": 3}"),
            Err(PersistError::Json(_))
        ));
    }

    #[test]
    fn test_saved_trial_file() {
        let path = std::env::temp_dir().join(format!("boardless-trial-{}.json", std::process::id()));
        let saved = SavedTrial {
            config: GameConfig::default(),
            moves: vec![SavedMove {
                dimension: 5,
                mv: Move::place(1, 25, 12, 2),
            }],
        };
        saved.save(&path).unwrap();
        let loaded = SavedTrial::load(&path).unwrap();
        std::fs::remove_file(&path).unwrap();
        assert_eq!(loaded, saved);
        assert!(matches!(SavedTrial::load(&path), Err(PersistError::Io(_))));
    }
}
