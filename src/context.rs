//! Mutable engine state: board, equipment, topology, container states and
//! the trial.
//!
//! Handles into the containers or topology are only valid until the next
//! grow; re-fetch them through `Context` afterwards.

use std::collections::BTreeMap;

use crate::equipment::{Board, Equipment};
use crate::error::{GameError, GrowError};
use crate::rules::Rules;
use crate::store::{ContainerState, FlatStore, SliceLimits};
use crate::topology::Topology;
use crate::trial::{Move, Trial};

/// Sites holding each (player, piece kind), ascending.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Owned {
    sites: BTreeMap<(u32, u32), Vec<usize>>,
}

impl Owned {
    pub fn add(&mut self, who: u32, what: u32, site: usize) {
        let sites = self.sites.entry((who, what)).or_default();
        if let Err(pos) = sites.binary_search(&site) {
            sites.insert(pos, site);
        }
    }

    pub fn remove(&mut self, who: u32, what: u32, site: usize) {
        if let Some(sites) = self.sites.get_mut(&(who, what)) {
            if let Ok(pos) = sites.binary_search(&site) {
                sites.remove(pos);
            }
            if sites.is_empty() {
                self.sites.remove(&(who, what));
            }
        }
    }

    pub fn positions(&self, who: u32, what: u32) -> &[usize] {
        self.sites
            .get(&(who, what))
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Every site holding a piece of `who`, ascending.
    pub fn sites_of(&self, who: u32) -> Vec<usize> {
        let mut sites: Vec<usize> = self
            .sites
            .iter()
            .filter(|((w, _), _)| *w == who)
            .flat_map(|(_, s)| s.iter().copied())
            .collect();
        sites.sort_unstable();
        sites
    }

    pub fn clear(&mut self) {
        self.sites.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.sites.is_empty()
    }
}

#[derive(Debug, Clone)]
pub struct State {
    containers: Vec<ContainerState>,
    mover: u32,
    owned: Owned,
}

impl State {
    pub fn new(containers: Vec<ContainerState>) -> Self {
        State {
            containers,
            mover: 1,
            owned: Owned::default(),
        }
    }

    pub fn containers(&self) -> &[ContainerState] {
        &self.containers
    }

    pub(crate) fn replace_containers(&mut self, containers: Vec<ContainerState>) {
        self.containers = containers;
    }

    /// Flat state of a container, failing for stacked ones.
    pub fn flat(&self, container: usize) -> Result<&FlatStore, GameError> {
        self.containers
            .get(container)
            .and_then(ContainerState::as_flat)
            .ok_or(GameError::UnsupportedContainerKind { container })
    }

    pub fn flat_mut(&mut self, container: usize) -> Result<&mut FlatStore, GameError> {
        self.containers
            .get_mut(container)
            .and_then(ContainerState::as_flat_mut)
            .ok_or(GameError::UnsupportedContainerKind { container })
    }

    pub fn mover(&self) -> u32 {
        self.mover
    }

    pub fn set_mover(&mut self, mover: u32) {
        self.mover = mover;
    }

    pub fn owned(&self) -> &Owned {
        &self.owned
    }

    pub fn owned_mut(&mut self) -> &mut Owned {
        &mut self.owned
    }

    /// Combined piece hash of every flat container.
    pub fn pieces_hash(&self) -> u64 {
        self.containers
            .iter()
            .filter_map(ContainerState::as_flat)
            .fold(0, |acc, store| acc ^ store.pieces_hash())
    }

    /// Piece and playable hash of every flat container.
    pub fn hash(&self) -> u64 {
        self.containers
            .iter()
            .filter_map(ContainerState::as_flat)
            .fold(0, |acc, store| acc ^ store.hash())
    }

    /// Empties every container and the owned listings; the mover goes
    /// back to player 1.
    pub fn reset(&mut self) {
        for container in self.containers.iter_mut() {
            if let Some(store) = container.as_flat_mut() {
                store.reset();
            }
        }
        self.owned.clear();
        self.mover = 1;
    }
}

#[derive(Debug, Clone)]
pub struct Context {
    pub(crate) board: Board,
    pub(crate) equipment: Equipment,
    pub(crate) topology: Topology,
    pub(crate) state: State,
    pub(crate) trial: Trial,
}

impl Context {
    /// Fresh context with one single-site hand per entry of `hand_owners`.
    pub fn new(
        board: Board,
        hand_owners: &[u32],
        board_limits: SliceLimits,
        hand_limits: SliceLimits,
        seed: u64,
    ) -> Result<Context, GrowError> {
        let topology = Topology::generate(board.tiling(), board.dimension())?;
        let equipment = Equipment::new(board.area(), hand_owners);

        let containers = equipment
            .containers()
            .iter()
            .enumerate()
            .map(|(i, c)| {
                let limits = if i == 0 { board_limits } else { hand_limits };
                ContainerState::Flat(FlatStore::new(c.id, c.num_sites, limits, seed, i == 0))
            })
            .collect();

        Ok(Context {
            board,
            equipment,
            topology,
            state: State::new(containers),
            trial: Trial::new(),
        })
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn equipment(&self) -> &Equipment {
        &self.equipment
    }

    pub fn topology(&self) -> &Topology {
        &self.topology
    }

    pub fn state(&self) -> &State {
        &self.state
    }

    pub fn state_mut(&mut self) -> &mut State {
        &mut self.state
    }

    pub fn trial(&self) -> &Trial {
        &self.trial
    }

    pub fn trial_mut(&mut self) -> &mut Trial {
        &mut self.trial
    }

    /// Container and local index of a global site.
    pub fn locate(&self, site: usize) -> Option<(usize, usize)> {
        self.equipment.locate(site)
    }

    /// Applies `mv` through the rules and records the canonical move.
    pub fn apply(&mut self, rules: &dyn Rules, mv: &Move) -> Result<Move, GameError> {
        let done = rules.apply(self, mv)?;
        self.trial.push(done.clone());
        Ok(done)
    }

    /// Cached legal moves, recomputed when the cache is stale or empty.
    pub fn legal_moves(&self, rules: &dyn Rules) -> Vec<Move> {
        match self.trial.legal_moves() {
            Some(moves) => moves.to_vec(),
            None => rules.legal_moves(self),
        }
    }

    pub fn refresh_legal_moves(&mut self, rules: &dyn Rules) {
        let moves = rules.legal_moves(self);
        self.trial.set_legal_moves(moves);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::Slice;

    fn limits() -> SliceLimits {
        SliceLimits {
            who: 2,
            what: 3,
            count: 3,
            state: 1,
            rotation: 1,
            value: 1,
        }
    }

    #[test]
    fn test_owned_listing() {
        let mut owned = Owned::default();
        owned.add(1, 2, 12);
        owned.add(1, 2, 3);
        owned.add(1, 2, 12);
        owned.add(2, 3, 7);
        assert_eq!(owned.positions(1, 2), &[3, 12]);
        owned.remove(1, 2, 3);
        assert_eq!(owned.positions(1, 2), &[12]);
        assert_eq!(owned.sites_of(2), vec![7]);
        owned.remove(2, 3, 7);
        assert!(owned.positions(2, 3).is_empty());
    }

    #[test]
    fn test_context_layout() {
        let ctx = Context::new(Board::boardless(5, 2), &[1, 2], limits(), limits(), 3).unwrap();
        assert_eq!(ctx.state().containers().len(), 3);
        assert_eq!(ctx.state().flat(0).unwrap().len(), 25);
        assert_eq!(ctx.state().flat(2).unwrap().len(), 1);
        assert_eq!(ctx.locate(26), Some((2, 0)));
        assert_eq!(ctx.state().mover(), 1);
    }

    #[test]
    fn test_reset_clears_everything() {
        let mut ctx = Context::new(Board::boardless(5, 2), &[1, 2], limits(), limits(), 3).unwrap();
        ctx.state_mut().flat_mut(0).unwrap().place(12, 1, 2, 1).unwrap();
        ctx.state_mut().owned_mut().add(1, 2, 12);
        ctx.state_mut().set_mover(2);
        ctx.state_mut().reset();
        assert_eq!(ctx.state().pieces_hash(), 0);
        assert!(ctx.state().owned().is_empty());
        assert_eq!(ctx.state().mover(), 1);
        assert_eq!(ctx.state().flat(0).unwrap().non_zero_cells(Slice::What).count(), 0);
    }

    #[test]
    fn test_stacked_container_is_rejected() {
        let mut ctx = Context::new(Board::boardless(5, 2), &[1, 2], limits(), limits(), 3).unwrap();
        ctx.state.containers[1] = ContainerState::Stacked(crate::store::StackStore::new(1));
        assert!(matches!(
            ctx.state().flat(1),
            Err(GameError::UnsupportedContainerKind { container: 1 })
        ));
    }
}
