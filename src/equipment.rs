use serde::{Deserialize, Serialize};

use crate::topology::SiteType;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Tiling {
    Square,
    Hexagonal,
    Triangular,
}

/// The main playing surface.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Board {
    tiling: Tiling,
    dimension: usize,
    step: usize,
    boardless: bool,
}

impl Board {
    pub fn new(tiling: Tiling, dimension: usize, step: usize, boardless: bool) -> Self {
        Board {
            tiling,
            dimension,
            step,
            boardless,
        }
    }

    /// Boardless square board starting at `dimension`.
    pub fn boardless(dimension: usize, step: usize) -> Self {
        Self::new(Tiling::Square, dimension, step, true)
    }

    pub fn tiling(&self) -> Tiling {
        self.tiling
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    pub fn step(&self) -> usize {
        self.step
    }

    pub fn is_boardless(&self) -> bool {
        self.boardless
    }

    pub fn area(&self) -> usize {
        self.dimension * self.dimension
    }

    pub fn default_site_type(&self) -> SiteType {
        SiteType::Cell
    }

    pub(crate) fn set_dimension(&mut self, dimension: usize) {
        self.dimension = dimension;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ContainerKind {
    Board,
    Hand { owner: u32 },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Container {
    pub id: usize,
    pub kind: ContainerKind,
    pub num_sites: usize,
    /// Global index of the container's first site.
    pub index: usize,
}

/// Placement of every container in the global site space.
///
/// The board owns `[0, A)`; each hand follows with its own sites. The
/// `offset` of a board site is its local index, auxiliary sites store 0.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Equipment {
    containers: Vec<Container>,
    container_id: Vec<usize>,
    offset: Vec<usize>,
    sites_from: Vec<usize>,
}

impl Equipment {
    /// A board of `board_area` sites and one single-site hand per owner.
    pub fn new(board_area: usize, hand_owners: &[u32]) -> Self {
        let mut containers = vec![Container {
            id: 0,
            kind: ContainerKind::Board,
            num_sites: board_area,
            index: 0,
        }];
        for (i, &owner) in hand_owners.iter().enumerate() {
            containers.push(Container {
                id: i + 1,
                kind: ContainerKind::Hand { owner },
                num_sites: 1,
                index: 0,
            });
        }
        let mut equipment = Equipment {
            containers,
            container_id: Vec::new(),
            offset: Vec::new(),
            sites_from: Vec::new(),
        };
        equipment.layout(board_area);
        equipment
    }

    /// Re-derives every index array for a board of `board_area` sites.
    pub fn layout(&mut self, board_area: usize) {
        self.containers[0].num_sites = board_area;

        self.sites_from.clear();
        self.container_id.clear();
        self.offset.clear();

        let mut next = 0;
        for container in self.containers.iter_mut() {
            container.index = next;
            self.sites_from.push(next);
            for local in 0..container.num_sites {
                self.container_id.push(container.id);
                self.offset.push(match container.kind {
                    ContainerKind::Board => local,
                    ContainerKind::Hand { .. } => 0,
                });
            }
            next += container.num_sites;
        }
    }

    pub fn containers(&self) -> &[Container] {
        &self.containers
    }

    pub fn container_id(&self) -> &[usize] {
        &self.container_id
    }

    pub fn offset(&self) -> &[usize] {
        &self.offset
    }

    pub fn sites_from(&self) -> &[usize] {
        &self.sites_from
    }

    pub fn total_sites(&self) -> usize {
        self.container_id.len()
    }

    /// Sites outside the board.
    pub fn aux_count(&self) -> usize {
        self.total_sites() - self.containers[0].num_sites
    }

    /// Container and local index owning a global site.
    pub fn locate(&self, site: usize) -> Option<(usize, usize)> {
        let container = *self.container_id.get(site)?;
        Some((container, site - self.sites_from[container]))
    }

    pub fn hand_of(&self, player: u32) -> Option<&Container> {
        self.containers
            .iter()
            .find(|c| c.kind == ContainerKind::Hand { owner: player })
    }

    pub fn is_board_site(&self, site: usize) -> bool {
        site < self.containers[0].num_sites
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initial_layout() {
        let eq = Equipment::new(25, &[1, 2]);
        assert_eq!(eq.total_sites(), 27);
        assert_eq!(eq.sites_from(), &[0, 25, 26]);
        assert_eq!(eq.container_id()[24], 0);
        assert_eq!(eq.container_id()[25], 1);
        assert_eq!(eq.container_id()[26], 2);
        assert_eq!(eq.offset()[24], 24);
        assert_eq!(eq.offset()[26], 0);
        assert_eq!(eq.hand_of(2).map(|c| c.index), Some(26));
        assert_eq!(eq.aux_count(), 2);
    }

    #[test]
    fn test_layout_after_grow() {
        let mut eq = Equipment::new(25, &[1, 2]);
        eq.layout(49);
        assert_eq!(eq.total_sites(), 51);
        assert_eq!(eq.sites_from(), &[0, 49, 50]);
        assert_eq!(eq.hand_of(1).map(|c| c.index), Some(49));
        assert_eq!(eq.locate(50), Some((2, 0)));
        assert_eq!(eq.locate(51), None);
        assert!(eq.sites_from().windows(2).all(|w| w[0] < w[1]));
        assert!(eq.container_id().windows(2).all(|w| w[0] <= w[1]));
    }

    #[test]
    fn test_board_setters() {
        let mut board = Board::boardless(5, 2);
        assert!(board.is_boardless());
        board.set_dimension(7);
        assert_eq!(board.area(), 49);
        assert_eq!(board.default_site_type(), SiteType::Cell);
    }
}
