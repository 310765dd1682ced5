//! Growing the board of a boardless game.
//!
//! After every applied move the controller checks whether the move's target
//! lies on the board perimeter. If it does, the board grows by one step in a
//! single synchronous transaction:
//!
//! 1. snapshot the dimensions and build the index map
//! 2. resize the board and regenerate the topology
//! 3. lay the containers out again
//! 4. reallocate every packed store and copy it through the map
//! 5. rewrite the move log under the map and replay it from empty
//! 6. regenerate the legal-move cache
//!
//! Anything that failed after the pre-flight checks leaves the context
//! corrupt; callers should reload a known-good saved trial.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::context::Context;
use crate::equipment::{Equipment, Tiling};
use crate::error::GrowError;
use crate::index_map::GrowContext;
use crate::rules::Rules;
use crate::store::ContainerState;
use crate::topology::Topology;
use crate::trial::Move;

/// Diagnostics of the last grow event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GrowReport {
    pub prev_dim: usize,
    pub new_dim: usize,
    pub prev_area: usize,
    pub new_area: usize,
    pub prev_total: usize,
    pub new_total: usize,
    pub diff: usize,
    pub prev_to_new: BTreeMap<usize, usize>,
    pub new_to_prev: BTreeMap<usize, usize>,
    pub added: BTreeSet<usize>,
    pub replayed_moves: usize,
    /// Piece hash straight after the copy-through, before replay.
    pub migrated_hash: u64,
}

impl GrowReport {
    fn new(grow: &GrowContext, replayed_moves: usize, migrated_hash: u64) -> Self {
        GrowReport {
            prev_dim: grow.prev_dim,
            new_dim: grow.new_dim,
            prev_area: grow.prev_area,
            new_area: grow.new_area,
            prev_total: grow.prev_total,
            new_total: grow.new_total,
            diff: grow.diff,
            prev_to_new: grow.index_map.prev_to_new().clone(),
            new_to_prev: grow.index_map.new_to_prev().clone(),
            added: grow.index_map.added().clone(),
            replayed_moves,
            migrated_hash,
        }
    }
}

pub type PostGrowCallback = Box<dyn FnMut(&GrowReport) + Send>;

/// Grow controller. Holds no board state of its own between grows.
#[derive(Default)]
pub struct GrowingBoard {
    callback: Option<PostGrowCallback>,
    last_report: Option<GrowReport>,
}

impl fmt::Debug for GrowingBoard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GrowingBoard")
            .field("callback", &self.callback.is_some())
            .field("last_report", &self.last_report)
            .finish()
    }
}

/// Whether `target` is one of the sorted `perimeter` sites.
pub fn is_touching_edge(perimeter: &[usize], target: Option<usize>) -> bool {
    target.is_some_and(|t| perimeter.binary_search(&t).is_ok())
}

impl GrowingBoard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a hook run once after each committed grow.
    pub fn set_post_grow_callback(&mut self, callback: PostGrowCallback) {
        self.callback = Some(callback);
    }

    pub fn last_report(&self) -> Option<&GrowReport> {
        self.last_report.as_ref()
    }

    /// Entry point after every applied move. Grows when the board is
    /// boardless and `mv` lands on the perimeter, otherwise does nothing.
    pub fn check_move_impact_on_board(
        &mut self,
        rules: &dyn Rules,
        ctx: &mut Context,
        mv: &Move,
    ) -> Result<Option<&GrowReport>, GrowError> {
        if !ctx.board.is_boardless() {
            return Ok(None);
        }
        let site_type = ctx.board.default_site_type();
        if !is_touching_edge(ctx.topology.perimeter(site_type), mv.to()) {
            return Ok(None);
        }
        debug!(target_site = ?mv.to(), dim = ctx.board.dimension(), "move touches the perimeter");
        self.grow(rules, ctx).map(Some)
    }

    /// Grows the board by one step.
    pub fn grow(&mut self, rules: &dyn Rules, ctx: &mut Context) -> Result<&GrowReport, GrowError> {
        preflight(ctx)?;

        let prev_layout = ctx.equipment.clone();
        let grow = GrowContext::new(
            ctx.board.dimension(),
            ctx.board.step(),
            ctx.equipment.aux_count(),
        );
        let mover = ctx.state.mover();

        ctx.board.set_dimension(grow.new_dim);
        ctx.topology = Topology::generate(ctx.board.tiling(), grow.new_dim)?;
        ctx.equipment.layout(grow.new_area);

        let migrated = migrate_containers(ctx.state.containers(), &prev_layout, &ctx.equipment, &grow)?;
        ctx.state.replace_containers(migrated);
        let migrated_hash = ctx.state.pieces_hash();

        let replayed_moves = replay(rules, ctx, &grow)?;
        ctx.state.set_mover(mover);

        let replayed_hash = ctx.state.pieces_hash();
        if replayed_hash != migrated_hash {
            warn!(
                expected = migrated_hash,
                actual = replayed_hash,
                "replay diverged from migrated state"
            );
            return Err(GrowError::ReplayDiverged {
                expected: migrated_hash,
                actual: replayed_hash,
            });
        }

        ctx.refresh_legal_moves(rules);

        info!(
            prev_dim = grow.prev_dim,
            new_dim = grow.new_dim,
            diff = grow.diff,
            replayed = replayed_moves,
            "board grew"
        );

        let report = GrowReport::new(&grow, replayed_moves, migrated_hash);
        if let Some(callback) = self.callback.as_mut() {
            callback(&report);
        }
        Ok(&*self.last_report.insert(report))
    }
}

/// Rejects grows that cannot succeed, before anything is mutated.
fn preflight(ctx: &Context) -> Result<(), GrowError> {
    if !ctx.board.is_boardless() {
        return Err(GrowError::NotBoardless);
    }
    if ctx.board.tiling() != Tiling::Square {
        return Err(GrowError::NonSquareTiling(ctx.board.tiling()));
    }
    for (container, state) in ctx.state.containers().iter().enumerate() {
        if state.as_flat().is_none() {
            return Err(GrowError::UnsupportedContainerKind { container });
        }
    }
    Ok(())
}

/// Reallocates every container for `new_layout` and copies its contents
/// through the grow's index map.
///
/// Maps are applied per container on local indices: local `p` of container
/// `k` goes to `map(prev_from[k] + p) - new_from[k]`. Hands therefore keep
/// their local contents while their global indices shift.
pub fn migrate_containers(
    containers: &[ContainerState],
    prev_layout: &Equipment,
    new_layout: &Equipment,
    grow: &GrowContext,
) -> Result<Vec<ContainerState>, GrowError> {
    containers
        .iter()
        .enumerate()
        .map(|(k, state)| -> Result<ContainerState, GrowError> {
            let src = state
                .as_flat()
                .ok_or(GrowError::UnsupportedContainerKind { container: k })?;
            let prev_from = prev_layout.sites_from()[k];
            let new_from = new_layout.sites_from()[k];
            let new_len = new_layout.containers()[k].num_sites;

            let mut dst = src.reallocate(new_len);
            src.copy_through(&mut dst, |p| {
                grow.index_map
                    .get(prev_from + p)
                    .and_then(|q| q.checked_sub(new_from))
            })?;
            Ok(ContainerState::Flat(dst))
        })
        .collect()
}

/// Rewrites the trial under the map and re-applies it from an empty state.
/// Returns the number of replayed moves.
fn replay(rules: &dyn Rules, ctx: &mut Context, grow: &GrowContext) -> Result<usize, GrowError> {
    let (log, setup_len) = ctx.trial.take();
    let rewritten = log
        .iter()
        .map(|mv| mv.remapped(&grow.index_map))
        .collect::<Result<Vec<_>, _>>()?;

    ctx.state.reset();
    for (move_index, mv) in rewritten.iter().enumerate() {
        if move_index == setup_len {
            ctx.trial.set_num_initial_placement_moves(setup_len);
        }
        ctx.apply(rules, mv)
            .map_err(|source| GrowError::ReplayFailed { move_index, source })?;
    }
    ctx.trial.set_num_initial_placement_moves(setup_len);
    Ok(rewritten.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::equipment::Board;
    use crate::rules::PlacementRules;
    use crate::store::{Slice, StackStore};
    use std::sync::{Arc, Mutex};

    fn started() -> (PlacementRules, Context) {
        let rules = PlacementRules::default();
        let mut ctx = rules.new_context().unwrap();
        rules.start(&mut ctx).unwrap();
        ctx.refresh_legal_moves(&rules);
        (rules, ctx)
    }

    fn play(rules: &PlacementRules, ctx: &mut Context, cell: usize) -> Move {
        let mover = ctx.state().mover();
        let hand = ctx.equipment().hand_of(mover).unwrap().index;
        ctx.apply(rules, &Move::place(mover, hand, cell, PlacementRules::kind_of(mover)))
            .unwrap()
    }

    #[test]
    fn test_is_touching_edge() {
        let perimeter = [0, 1, 2, 3, 4, 5, 9, 10, 14, 15, 19, 20, 21, 22, 23, 24];
        assert!(is_touching_edge(&perimeter, Some(10)));
        assert!(!is_touching_edge(&perimeter, Some(7)));
        assert!(!is_touching_edge(&perimeter, None));
    }

    #[test]
    fn test_interior_move_does_not_grow() {
        let (rules, mut ctx) = started();
        let mv = play(&rules, &mut ctx, 7);
        let hash = ctx.state().hash();
        let mut growing = GrowingBoard::new();
        let report = growing.check_move_impact_on_board(&rules, &mut ctx, &mv).unwrap();
        assert!(report.is_none());
        assert_eq!(ctx.board().dimension(), 5);
        assert_eq!(ctx.state().hash(), hash);
        assert!(growing.last_report().is_none());
    }

    #[test]
    fn test_grow_keeps_pieces_and_hands() {
        let (rules, mut ctx) = started();
        let mv = play(&rules, &mut ctx, 10);
        let mut growing = GrowingBoard::new();
        let report = growing
            .check_move_impact_on_board(&rules, &mut ctx, &mv)
            .unwrap()
            .cloned()
            .unwrap();

        assert_eq!(report.new_dim, 7);
        assert_eq!(report.diff, 24);
        assert_eq!(report.replayed_moves, 3);
        assert_eq!(ctx.board().dimension(), 7);
        assert_eq!(ctx.topology().dimension(), 7);
        assert_eq!(ctx.equipment().sites_from(), &[0, 49, 50]);

        let board = ctx.state().flat(0).unwrap();
        assert_eq!(board.non_zero_cells(Slice::What).collect::<Vec<_>>(), vec![22]);
        assert_eq!(board.what(22).unwrap(), 2);
        assert_eq!(ctx.state().flat(1).unwrap().count(0).unwrap(), 2);
        assert_eq!(ctx.state().flat(2).unwrap().count(0).unwrap(), 3);
        assert_eq!(ctx.state().mover(), 2);
        assert_eq!(ctx.state().owned().positions(1, 2), &[22, 49]);
        assert_eq!(ctx.trial().num_initial_placement_moves(), 2);
        assert_eq!(ctx.trial().moves()[2].to(), Some(22));
        assert_eq!(ctx.trial().moves()[2].from(), Some(49));
    }

    #[test]
    fn test_legal_moves_regenerated() {
        let (rules, mut ctx) = started();
        let mv = play(&rules, &mut ctx, 10);
        GrowingBoard::new()
            .check_move_impact_on_board(&rules, &mut ctx, &mv)
            .unwrap();
        let cached = ctx.trial().legal_moves().map(<[Move]>::to_vec).unwrap();
        let mut targets: Vec<usize> = cached.iter().filter_map(Move::to).collect();
        targets.sort_unstable();
        assert_eq!(targets, vec![14, 15, 16, 21, 23, 28, 29, 30]);
        assert!(cached.iter().all(|m| m.from() == Some(50) && m.mover == 2));
    }

    #[test]
    fn test_migration_before_replay() {
        let (rules, mut ctx) = started();
        play(&rules, &mut ctx, 10);
        let before = ctx.state().flat(0).unwrap().clone();

        let grow = GrowContext::new(5, 2, 2);
        let mut after = ctx.equipment().clone();
        after.layout(grow.new_area);
        let migrated = migrate_containers(ctx.state().containers(), ctx.equipment(), &after, &grow).unwrap();
        let board = migrated[0].as_flat().unwrap();

        for cell in before.non_zero_cells(Slice::What) {
            let q = grow.index_map.get(cell).unwrap();
            for slice in Slice::ALL {
                assert_eq!(board.get(slice, q).unwrap(), before.get(slice, cell).unwrap());
            }
        }
        for &q in grow.index_map.added() {
            if q < grow.new_area {
                assert_eq!(board.who(q).unwrap(), 0);
                assert_eq!(board.count(q).unwrap(), 0);
                assert!(board.is_empty_cell(q).unwrap());
            }
        }
        assert_eq!(board.pieces_hash(), board.folded_pieces_hash());
        assert_eq!(
            migrated[1].as_flat().unwrap().pieces_hash(),
            ctx.state().flat(1).unwrap().pieces_hash()
        );
    }

    #[test]
    fn test_not_boardless_is_idempotent_and_rejected() {
        let (rules, mut ctx) = started();
        ctx.board = Board::new(Tiling::Square, 5, 2, false);
        let mv = play(&rules, &mut ctx, 10);
        let mut growing = GrowingBoard::new();
        assert!(growing.check_move_impact_on_board(&rules, &mut ctx, &mv).unwrap().is_none());
        assert!(matches!(growing.grow(&rules, &mut ctx), Err(GrowError::NotBoardless)));
        assert_eq!(ctx.board().dimension(), 5);
    }

    #[test]
    fn test_preflight_rejects_before_mutation() {
        let (rules, mut ctx) = started();
        play(&rules, &mut ctx, 10);
        let board_hash = ctx.state().flat(0).unwrap().hash();

        ctx.board = Board::new(Tiling::Hexagonal, 5, 2, true);
        assert!(matches!(
            GrowingBoard::new().grow(&rules, &mut ctx),
            Err(GrowError::NonSquareTiling(Tiling::Hexagonal))
        ));

        ctx.board = Board::boardless(5, 2);
        let mut containers = ctx.state().containers().to_vec();
        containers[2] = ContainerState::Stacked(StackStore::new(1));
        ctx.state.replace_containers(containers);
        assert!(matches!(
            GrowingBoard::new().grow(&rules, &mut ctx),
            Err(GrowError::UnsupportedContainerKind { container: 2 })
        ));
        assert_eq!(ctx.board().dimension(), 5);
        assert_eq!(ctx.state().flat(0).unwrap().hash(), board_hash);
        assert_eq!(ctx.trial().num_moves(), 3);
    }

    #[test]
    fn test_callback_runs_once_per_grow() {
        let (rules, mut ctx) = started();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let mut growing = GrowingBoard::new();
        growing.set_post_grow_callback(Box::new(move |report: &GrowReport| {
            sink.lock().unwrap().push(report.new_dim);
        }));

        let mv = play(&rules, &mut ctx, 10);
        growing.check_move_impact_on_board(&rules, &mut ctx, &mv).unwrap();
        let mv = play(&rules, &mut ctx, 21);
        growing.check_move_impact_on_board(&rules, &mut ctx, &mv).unwrap();

        assert_eq!(*seen.lock().unwrap(), vec![7, 9]);
        assert_eq!(growing.last_report().map(|r| r.new_total), Some(83));
    }

    #[test]
    fn test_corrupted_log_fails_replay() {
        let (rules, mut ctx) = started();
        play(&rules, &mut ctx, 12);
        // a second setup move after the scripted prefix cannot be replayed
        ctx.trial.push(Move::new(
            1,
            vec![crate::trial::Action::add(25, 1, 2, 3)],
        ));
        let mut growing = GrowingBoard::new();
        let result = growing.grow(&rules, &mut ctx);
        assert!(matches!(
            result,
            Err(GrowError::ReplayFailed { move_index: 3, .. })
        ));
    }
}
