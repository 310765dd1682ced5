//! Rule engine seam and the boardless placement game.

use serde::{Deserialize, Serialize};

use crate::config::GameConfig;
use crate::context::Context;
use crate::equipment::{Board, ContainerKind};
use crate::error::{GameError, GrowError};
use crate::store::{FlatStore, Slice, SliceLimits};
use crate::topology::{AbsoluteDirection, Topology};
use crate::trial::{Action, ActionKind, Move};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GameResult {
    Winner(u32),
    Draw,
}

/// What the engine consumes from a rule set.
pub trait Rules: Send + Sync {
    fn name(&self) -> &str;

    fn num_players(&self) -> u32;

    fn is_boardless(&self) -> bool;

    /// A fresh context at the starting board size.
    fn new_context(&self) -> Result<Context, GrowError>;

    /// Plays the scripted initial placement.
    fn start(&self, ctx: &mut Context) -> Result<(), GameError>;

    /// Performs `mv` and returns the canonical move actually played. Does
    /// not touch the trial.
    fn apply(&self, ctx: &mut Context, mv: &Move) -> Result<Move, GameError>;

    fn legal_moves(&self, ctx: &Context) -> Vec<Move>;

    fn result(&self, ctx: &Context) -> Option<GameResult>;
}

/// Players take turns moving pieces from their hand onto playable cells.
///
/// A cell is playable when it is empty and touches an occupied cell, or when
/// the board is empty. Placing a piece captures any orthogonally adjacent
/// enemy piece that ends up flanked by one of the mover's pieces. The game
/// ends when every hand is empty; most pieces on the board wins.
#[derive(Debug, Clone)]
pub struct PlacementRules {
    config: GameConfig,
}

impl PlacementRules {
    pub fn new(config: GameConfig) -> Self {
        PlacementRules { config }
    }

    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    /// Piece kind used by `player`.
    pub fn kind_of(player: u32) -> u32 {
        player + 1
    }

    /// Board cells hold at most one piece.
    pub fn board_limits(&self) -> SliceLimits {
        SliceLimits {
            who: self.config.players,
            what: Self::kind_of(self.config.players),
            count: 1,
            state: 1,
            rotation: 1,
            value: 1,
        }
    }

    /// A hand holds the whole stock of its owner.
    pub fn hand_limits(&self) -> SliceLimits {
        SliceLimits {
            count: self.config.pieces_per_player,
            ..self.board_limits()
        }
    }

    fn next_player(&self, player: u32) -> u32 {
        player % self.config.players + 1
    }

    /// Scripted Add of a full hand.
    fn apply_setup(&self, ctx: &mut Context, action: &Action) -> Result<Move, GameError> {
        if ctx.trial.num_initial_placement_moves() > 0 {
            return Err(GameError::InvalidMove(
                "hands are only filled before the first decision".to_string(),
            ));
        }
        let to = action
            .to
            .ok_or_else(|| GameError::InvalidMove("setup needs a target".to_string()))?;
        let (container, local) = ctx
            .locate(to)
            .ok_or_else(|| GameError::InvalidMove(format!("site {} does not exist", to)))?;
        let owner = match ctx.equipment.containers()[container].kind {
            ContainerKind::Hand { owner } => owner,
            ContainerKind::Board => {
                return Err(GameError::InvalidMove("setup fills hands only".to_string()));
            }
        };
        if action.kind != ActionKind::Add || action.who != owner {
            return Err(GameError::InvalidMove(format!(
                "hand at {} belongs to player {}",
                to, owner
            )));
        }
        let what = Self::kind_of(owner);

        let state = &mut ctx.state;
        state.flat_mut(container)?.place(local, owner, what, action.count)?;
        state.owned_mut().add(owner, what, to);
        update_playable(state.flat_mut(0)?, &ctx.topology)?;

        Ok(Move::new(
            owner,
            vec![Action::add(to, owner, what, action.count)],
        ))
    }

    fn apply_placement(&self, ctx: &mut Context, mover: u32, action: &Action) -> Result<Move, GameError> {
        if self.result(ctx).is_some() {
            return Err(GameError::GameOver);
        }
        if mover != ctx.state.mover() {
            return Err(GameError::NotYourTurn);
        }
        let to = action
            .to
            .ok_or_else(|| GameError::InvalidMove("placement needs a target".to_string()))?;
        let hand = ctx
            .equipment
            .hand_of(mover)
            .ok_or_else(|| GameError::InvalidMove(format!("player {} has no hand", mover)))?;
        let (hand_id, hand_site) = (hand.id, hand.index);

        match (action.kind, action.from) {
            (ActionKind::Move, Some(from)) if from == hand_site => {}
            (ActionKind::Add, None) => {}
            _ => {
                return Err(GameError::InvalidMove(format!(
                    "player {} places from site {}",
                    mover, hand_site
                )));
            }
        }

        let Context {
            topology, state, ..
        } = ctx;

        let count = state.flat(hand_id)?.count(0)?;
        if count == 0 {
            return Err(GameError::InvalidMove(format!(
                "player {} has no pieces left",
                mover
            )));
        }
        {
            let board = state.flat(0)?;
            if !board.is_empty_cell(to)? {
                return Err(GameError::InvalidMove(format!("cell {} is occupied", to)));
            }
            if !board.is_playable(to)? {
                return Err(GameError::InvalidMove(format!("cell {} is not playable", to)));
            }
        }

        let what = Self::kind_of(mover);
        if count == 1 {
            state.flat_mut(hand_id)?.clear_cell(0)?;
            state.owned_mut().remove(mover, what, hand_site);
        } else {
            state.flat_mut(hand_id)?.set(Slice::Count, 0, count - 1)?;
        }
        state.flat_mut(0)?.place(to, mover, what, 1)?;
        state.owned_mut().add(mover, what, to);

        let mut actions = vec![Action::move_piece(hand_site, to, mover, what)];
        for dir in AbsoluteDirection::ORTHOGONAL {
            let &[victim, flank, ..] = topology.trajectory(to, dir) else {
                continue;
            };
            let board = state.flat(0)?;
            let owner = board.who(victim)?;
            if owner == 0 || owner == mover || board.who(flank)? != mover {
                continue;
            }
            let kind = board.what(victim)?;
            state.flat_mut(0)?.clear_cell(victim)?;
            state.owned_mut().remove(owner, kind, victim);
            actions.push(Action::remove(victim, owner, kind));
        }

        update_playable(state.flat_mut(0)?, topology)?;
        state.set_mover(self.next_player(mover));

        Ok(Move::new(mover, actions))
    }
}

impl Default for PlacementRules {
    fn default() -> Self {
        Self::new(GameConfig::default())
    }
}

/// Recomputes the playable set from the occupied cells.
fn update_playable(board: &mut FlatStore, topology: &Topology) -> Result<(), GameError> {
    let occupied: Vec<usize> = board.non_zero_cells(Slice::What).collect();
    let mut playable = vec![occupied.is_empty(); board.len()];
    for &cell in &occupied {
        for &n in &topology.cells()[cell].adjacent {
            if board.is_empty_cell(n)? {
                playable[n] = true;
            }
        }
    }
    for (cell, &on) in playable.iter().enumerate() {
        if board.is_playable(cell)? != on {
            board.set_playable(cell, on)?;
        }
    }
    Ok(())
}

impl Rules for PlacementRules {
    fn name(&self) -> &str {
        "Boardless Placement"
    }

    fn num_players(&self) -> u32 {
        self.config.players
    }

    fn is_boardless(&self) -> bool {
        true
    }

    fn new_context(&self) -> Result<Context, GrowError> {
        let growth = self.config.growth;
        let owners: Vec<u32> = (1..=self.config.players).collect();
        Context::new(
            Board::boardless(growth.initial_dimension, growth.step),
            &owners,
            self.board_limits(),
            self.hand_limits(),
            self.config.seed,
        )
    }

    fn start(&self, ctx: &mut Context) -> Result<(), GameError> {
        for player in 1..=self.config.players {
            let hand = ctx
                .equipment
                .hand_of(player)
                .map(|h| h.index)
                .ok_or_else(|| GameError::InvalidMove(format!("player {} has no hand", player)))?;
            let setup = Move::new(
                player,
                vec![Action::add(
                    hand,
                    player,
                    Self::kind_of(player),
                    self.config.pieces_per_player,
                )],
            );
            ctx.apply(self, &setup)?;
        }
        ctx.trial.set_num_initial_placement_moves(ctx.trial.num_moves());
        ctx.state.set_mover(1);
        Ok(())
    }

    fn apply(&self, ctx: &mut Context, mv: &Move) -> Result<Move, GameError> {
        let action = mv
            .decision()
            .ok_or_else(|| GameError::InvalidMove("move has no decision".to_string()))?
            .clone();
        let to = action
            .to
            .ok_or_else(|| GameError::InvalidMove("move has no target".to_string()))?;
        if ctx.equipment.is_board_site(to) {
            self.apply_placement(ctx, mv.mover, &action)
        } else {
            self.apply_setup(ctx, &action)
        }
    }

    fn legal_moves(&self, ctx: &Context) -> Vec<Move> {
        if self.result(ctx).is_some() {
            return Vec::new();
        }
        let mover = ctx.state.mover();
        let Some(hand) = ctx.equipment.hand_of(mover) else {
            return Vec::new();
        };
        let (Ok(hand_state), Ok(board)) = (ctx.state.flat(hand.id), ctx.state.flat(0)) else {
            return Vec::new();
        };
        if hand_state.count(0).unwrap_or(0) == 0 {
            return Vec::new();
        }
        let what = Self::kind_of(mover);
        board
            .playable_cells()
            .map(|cell| Move::place(mover, hand.index, cell, what))
            .collect()
    }

    fn result(&self, ctx: &Context) -> Option<GameResult> {
        if ctx.trial.num_initial_placement_moves() == 0 {
            return None;
        }
        let hands_empty = ctx
            .equipment
            .containers()
            .iter()
            .filter(|c| matches!(c.kind, ContainerKind::Hand { .. }))
            .all(|c| {
                ctx.state
                    .flat(c.id)
                    .map_or(0, |s| s.count(0).unwrap_or(0))
                    == 0
            });
        if !hands_empty {
            return None;
        }

        let board = ctx.state.flat(0).ok()?;
        let mut counts = vec![0usize; self.config.players as usize + 1];
        for cell in board.non_zero_cells(Slice::Who) {
            let who = board.who(cell).ok()? as usize;
            if let Some(n) = counts.get_mut(who) {
                *n += 1;
            }
        }
        let best = counts.iter().skip(1).copied().max().unwrap_or(0);
        let mut leaders = (1..counts.len()).filter(|&p| counts[p] == best);
        match (leaders.next(), leaders.next()) {
            (Some(p), None) => Some(GameResult::Winner(p as u32)),
            _ => Some(GameResult::Draw),
        }
    }
}
