//! Square-grid topology.
//!
//! Cells, vertices and edges are stored in flat arenas and refer to each
//! other by index. Row 0 is the bottom row.
//!
//! * cell `(r, c)` is `r * D + c`
//! * vertex `(r, c)` is `r * (D + 1) + c`
//! * edges are grouped per vertex row `r` with stride `2D + 1`: first the `D`
//!   horizontal edges `r * (2D + 1) + c`, then (below the top row) the
//!   `D + 1` vertical edges `r * (2D + 1) + D + c`.

use std::collections::{BTreeMap, VecDeque};

use serde::{Deserialize, Serialize};

use crate::equipment::Tiling;
use crate::error::GrowError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SiteType {
    Cell,
    Vertex,
    Edge,
}

/// The sixteen compass points, clockwise from north.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum CompassDirection {
    N,
    NNE,
    NE,
    ENE,
    E,
    ESE,
    SE,
    SSE,
    S,
    SSW,
    SW,
    WSW,
    W,
    WNW,
    NW,
    NNW,
}

impl CompassDirection {
    pub const ALL: [CompassDirection; 16] = [
        CompassDirection::N,
        CompassDirection::NNE,
        CompassDirection::NE,
        CompassDirection::ENE,
        CompassDirection::E,
        CompassDirection::ESE,
        CompassDirection::SE,
        CompassDirection::SSE,
        CompassDirection::S,
        CompassDirection::SSW,
        CompassDirection::SW,
        CompassDirection::WSW,
        CompassDirection::W,
        CompassDirection::WNW,
        CompassDirection::NW,
        CompassDirection::NNW,
    ];
}

/// Directions a piece can step in on a square grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AbsoluteDirection {
    N,
    NE,
    E,
    SE,
    S,
    SW,
    W,
    NW,
}

impl AbsoluteDirection {
    pub const ALL: [AbsoluteDirection; 8] = [
        AbsoluteDirection::N,
        AbsoluteDirection::NE,
        AbsoluteDirection::E,
        AbsoluteDirection::SE,
        AbsoluteDirection::S,
        AbsoluteDirection::SW,
        AbsoluteDirection::W,
        AbsoluteDirection::NW,
    ];

    pub const ORTHOGONAL: [AbsoluteDirection; 4] = [
        AbsoluteDirection::N,
        AbsoluteDirection::E,
        AbsoluteDirection::S,
        AbsoluteDirection::W,
    ];

    /// (row, column) step. North increases the row.
    pub fn delta(self) -> (i64, i64) {
        match self {
            AbsoluteDirection::N => (1, 0),
            AbsoluteDirection::NE => (1, 1),
            AbsoluteDirection::E => (0, 1),
            AbsoluteDirection::SE => (-1, 1),
            AbsoluteDirection::S => (-1, 0),
            AbsoluteDirection::SW => (-1, -1),
            AbsoluteDirection::W => (0, -1),
            AbsoluteDirection::NW => (1, -1),
        }
    }

    pub fn is_orthogonal(self) -> bool {
        let (dr, dc) = self.delta();
        dr == 0 || dc == 0
    }

    #[inline]
    fn index(self) -> usize {
        self as usize
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Axis {
    Horizontal,
    Vertical,
}

#[derive(Debug, Clone)]
pub struct Cell {
    pub index: usize,
    pub row: usize,
    pub col: usize,
    pub orthogonal: Vec<usize>,
    pub diagonal: Vec<usize>,
    /// Orthogonal and diagonal neighbours.
    pub adjacent: Vec<usize>,
    pub vertices: Vec<usize>,
    pub edges: Vec<usize>,
}

#[derive(Debug, Clone)]
pub struct Vertex {
    pub index: usize,
    pub row: usize,
    pub col: usize,
    pub adjacent: Vec<usize>,
    pub cells: Vec<usize>,
    pub edges: Vec<usize>,
}

#[derive(Debug, Clone)]
pub struct Edge {
    pub index: usize,
    pub axis: Axis,
    pub vertices: [usize; 2],
    pub cells: Vec<usize>,
    /// Edges sharing a vertex with this one.
    pub adjacent: Vec<usize>,
}

/// Closed-set families for one site type. Every list is sorted ascending.
#[derive(Debug, Clone, Default)]
pub struct Regions {
    pub corners: Vec<usize>,
    pub corners_convex: Vec<usize>,
    pub corners_concave: Vec<usize>,
    pub major: Vec<usize>,
    pub minor: Vec<usize>,
    pub outer: Vec<usize>,
    pub perimeter: Vec<usize>,
    pub inner: Vec<usize>,
    pub interlayer: Vec<usize>,
    pub top: Vec<usize>,
    pub bottom: Vec<usize>,
    pub left: Vec<usize>,
    pub right: Vec<usize>,
    pub centre: Vec<usize>,
    pub columns: Vec<Vec<usize>>,
    pub rows: Vec<Vec<usize>>,
    /// One entry per compass direction; only N, E, S and W are non-empty.
    pub sides: BTreeMap<CompassDirection, Vec<usize>>,
}

impl Regions {
    pub fn side(&self, direction: CompassDirection) -> &[usize] {
        self.sides.get(&direction).map(Vec::as_slice).unwrap_or_default()
    }
}

/// Step distances from every cell to the named regions.
#[derive(Debug, Clone, Default)]
pub struct Distances {
    pub to_centre: Vec<usize>,
    pub to_corners: Vec<usize>,
    pub to_sides: Vec<usize>,
}

#[derive(Debug, Clone)]
pub struct Topology {
    dimension: usize,
    cells: Vec<Cell>,
    vertices: Vec<Vertex>,
    edges: Vec<Edge>,
    cell_regions: Regions,
    vertex_regions: Regions,
    edge_regions: Regions,
    axials: Vec<usize>,
    horizontal: Vec<usize>,
    vertical: Vec<usize>,
    /// `trajectories[cell][direction]`: cells walked until the border.
    trajectories: Vec<[Vec<usize>; 8]>,
    distances: Distances,
}

impl Topology {
    /// Builds the full catalogue for a board of side `dimension`.
    pub fn generate(tiling: Tiling, dimension: usize) -> Result<Topology, GrowError> {
        if tiling != Tiling::Square {
            return Err(GrowError::NonSquareTiling(tiling));
        }
        Ok(Self::square(dimension))
    }

    fn square(d: usize) -> Topology {
        let grid = SquareGrid { d };
        let cells = grid.cells();
        let vertices = grid.vertices();
        let edges = grid.edges();

        let horizontal: Vec<usize> = edges
            .iter()
            .filter(|e| e.axis == Axis::Horizontal)
            .map(|e| e.index)
            .collect();
        let vertical: Vec<usize> = edges
            .iter()
            .filter(|e| e.axis == Axis::Vertical)
            .map(|e| e.index)
            .collect();
        let axials = (0..edges.len()).collect();

        let cell_regions = grid.cell_regions();
        let vertex_regions = grid.vertex_regions();
        let edge_regions = grid.edge_regions();

        let trajectories = (0..cells.len()).map(|c| grid.trajectories_from(c)).collect();
        let distances = Distances {
            to_centre: bfs(&cells, &cell_regions.centre),
            to_corners: bfs(&cells, &cell_regions.corners),
            to_sides: bfs(&cells, &cell_regions.perimeter),
        };

        Topology {
            dimension: d,
            cells,
            vertices,
            edges,
            cell_regions,
            vertex_regions,
            edge_regions,
            axials,
            horizontal,
            vertical,
            trajectories,
            distances,
        }
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    pub fn vertices(&self) -> &[Vertex] {
        &self.vertices
    }

    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    pub fn num_sites(&self, site_type: SiteType) -> usize {
        match site_type {
            SiteType::Cell => self.cells.len(),
            SiteType::Vertex => self.vertices.len(),
            SiteType::Edge => self.edges.len(),
        }
    }

    pub fn regions(&self, site_type: SiteType) -> &Regions {
        match site_type {
            SiteType::Cell => &self.cell_regions,
            SiteType::Vertex => &self.vertex_regions,
            SiteType::Edge => &self.edge_regions,
        }
    }

    /// Outer ring for `site_type`, sorted by index.
    pub fn perimeter(&self, site_type: SiteType) -> &[usize] {
        &self.regions(site_type).perimeter
    }

    pub fn axials(&self) -> &[usize] {
        &self.axials
    }

    pub fn horizontal(&self) -> &[usize] {
        &self.horizontal
    }

    pub fn vertical(&self) -> &[usize] {
        &self.vertical
    }

    pub fn cell_at(&self, row: usize, col: usize) -> Option<usize> {
        (row < self.dimension && col < self.dimension).then_some(row * self.dimension + col)
    }

    pub fn trajectory(&self, cell: usize, direction: AbsoluteDirection) -> &[usize] {
        self.trajectories
            .get(cell)
            .map(|t| t[direction.index()].as_slice())
            .unwrap_or_default()
    }

    pub fn distances(&self) -> &Distances {
        &self.distances
    }
}

/// Multi-source breadth-first step distances over cell adjacency.
fn bfs(cells: &[Cell], sources: &[usize]) -> Vec<usize> {
    let mut dist = vec![usize::MAX; cells.len()];
    let mut queue = VecDeque::new();
    for &s in sources {
        dist[s] = 0;
        queue.push_back(s);
    }
    while let Some(c) = queue.pop_front() {
        for &n in &cells[c].adjacent {
            if dist[n] == usize::MAX {
                dist[n] = dist[c] + 1;
                queue.push_back(n);
            }
        }
    }
    dist
}

struct SquareGrid {
    d: usize,
}

impl SquareGrid {
    fn cell(&self, r: usize, c: usize) -> usize {
        r * self.d + c
    }

    fn vertex(&self, r: usize, c: usize) -> usize {
        r * (self.d + 1) + c
    }

    fn horizontal_edge(&self, r: usize, c: usize) -> usize {
        r * (2 * self.d + 1) + c
    }

    fn vertical_edge(&self, r: usize, c: usize) -> usize {
        r * (2 * self.d + 1) + self.d + c
    }

    fn step(&self, r: usize, c: usize, dir: AbsoluteDirection) -> Option<(usize, usize)> {
        let (dr, dc) = dir.delta();
        let nr = r as i64 + dr;
        let nc = c as i64 + dc;
        let d = self.d as i64;
        (nr >= 0 && nr < d && nc >= 0 && nc < d).then_some((nr as usize, nc as usize))
    }

    fn cells(&self) -> Vec<Cell> {
        let d = self.d;
        let mut cells = Vec::with_capacity(d * d);
        for r in 0..d {
            for c in 0..d {
                let mut orthogonal = Vec::new();
                let mut diagonal = Vec::new();
                for dir in AbsoluteDirection::ALL {
                    if let Some((nr, nc)) = self.step(r, c, dir) {
                        if dir.is_orthogonal() {
                            orthogonal.push(self.cell(nr, nc));
                        } else {
                            diagonal.push(self.cell(nr, nc));
                        }
                    }
                }
                orthogonal.sort_unstable();
                diagonal.sort_unstable();
                let mut adjacent: Vec<usize> = orthogonal.iter().chain(&diagonal).copied().collect();
                adjacent.sort_unstable();

                cells.push(Cell {
                    index: self.cell(r, c),
                    row: r,
                    col: c,
                    orthogonal,
                    diagonal,
                    adjacent,
                    vertices: vec![
                        self.vertex(r, c),
                        self.vertex(r, c + 1),
                        self.vertex(r + 1, c),
                        self.vertex(r + 1, c + 1),
                    ],
                    edges: vec![
                        self.horizontal_edge(r, c),
                        self.vertical_edge(r, c),
                        self.vertical_edge(r, c + 1),
                        self.horizontal_edge(r + 1, c),
                    ],
                });
            }
        }
        cells
    }

    fn vertices(&self) -> Vec<Vertex> {
        let d = self.d;
        let mut vertices = Vec::with_capacity((d + 1) * (d + 1));
        for r in 0..=d {
            for c in 0..=d {
                let mut adjacent = Vec::new();
                let mut edges = Vec::new();
                if r > 0 {
                    adjacent.push(self.vertex(r - 1, c));
                    edges.push(self.vertical_edge(r - 1, c));
                }
                if c > 0 {
                    adjacent.push(self.vertex(r, c - 1));
                    edges.push(self.horizontal_edge(r, c - 1));
                }
                if c < d {
                    adjacent.push(self.vertex(r, c + 1));
                    edges.push(self.horizontal_edge(r, c));
                }
                if r < d {
                    adjacent.push(self.vertex(r + 1, c));
                    edges.push(self.vertical_edge(r, c));
                }

                let mut cells = Vec::new();
                let below = r.wrapping_sub(1);
                let before = c.wrapping_sub(1);
                for (cr, cc) in [(below, before), (below, c), (r, before), (r, c)] {
                    // wrapped indices fall outside the grid
                    if cr < d && cc < d {
                        cells.push(self.cell(cr, cc));
                    }
                }

                vertices.push(Vertex {
                    index: self.vertex(r, c),
                    row: r,
                    col: c,
                    adjacent,
                    cells,
                    edges,
                });
            }
        }
        vertices
    }

    fn edges(&self) -> Vec<Edge> {
        let d = self.d;
        let mut edges = Vec::with_capacity(2 * d * (d + 1));
        for r in 0..=d {
            for c in 0..d {
                let mut cells = Vec::new();
                if r > 0 {
                    cells.push(self.cell(r - 1, c));
                }
                if r < d {
                    cells.push(self.cell(r, c));
                }
                edges.push(Edge {
                    index: self.horizontal_edge(r, c),
                    axis: Axis::Horizontal,
                    vertices: [self.vertex(r, c), self.vertex(r, c + 1)],
                    cells,
                    adjacent: Vec::new(),
                });
            }
            if r < d {
                for c in 0..=d {
                    let mut cells = Vec::new();
                    if c > 0 {
                        cells.push(self.cell(r, c - 1));
                    }
                    if c < d {
                        cells.push(self.cell(r, c));
                    }
                    edges.push(Edge {
                        index: self.vertical_edge(r, c),
                        axis: Axis::Vertical,
                        vertices: [self.vertex(r, c), self.vertex(r + 1, c)],
                        cells,
                        adjacent: Vec::new(),
                    });
                }
            }
        }

        let mut by_vertex: Vec<Vec<usize>> = vec![Vec::new(); (d + 1) * (d + 1)];
        for edge in &edges {
            for &v in &edge.vertices {
                by_vertex[v].push(edge.index);
            }
        }
        for edge in edges.iter_mut() {
            let mut adjacent: Vec<usize> = edge
                .vertices
                .iter()
                .flat_map(|&v| by_vertex[v].iter().copied())
                .filter(|&e| e != edge.index)
                .collect();
            adjacent.sort_unstable();
            adjacent.dedup();
            edge.adjacent = adjacent;
        }
        edges
    }

    fn trajectories_from(&self, cell: usize) -> [Vec<usize>; 8] {
        let start = (cell / self.d, cell % self.d);
        AbsoluteDirection::ALL.map(|dir| {
            let mut ray = Vec::new();
            let (mut r, mut c) = start;
            while let Some((nr, nc)) = self.step(r, c, dir) {
                ray.push(self.cell(nr, nc));
                (r, c) = (nr, nc);
            }
            ray
        })
    }

    fn empty_sides() -> BTreeMap<CompassDirection, Vec<usize>> {
        CompassDirection::ALL.iter().map(|&d| (d, Vec::new())).collect()
    }

    fn with_sides(
        top: &[usize],
        right: &[usize],
        bottom: &[usize],
        left: &[usize],
    ) -> BTreeMap<CompassDirection, Vec<usize>> {
        let mut sides = Self::empty_sides();
        sides.insert(CompassDirection::N, top.to_vec());
        sides.insert(CompassDirection::E, right.to_vec());
        sides.insert(CompassDirection::S, bottom.to_vec());
        sides.insert(CompassDirection::W, left.to_vec());
        sides
    }

    fn cell_regions(&self) -> Regions {
        let d = self.d;
        let all: Vec<usize> = (0..d * d).collect();
        let on_border = |i: &usize| {
            let (r, c) = (i / d, i % d);
            r == 0 || c == 0 || r + 1 == d || c + 1 == d
        };
        let perimeter: Vec<usize> = all.iter().copied().filter(on_border).collect();
        let inner: Vec<usize> = all.iter().copied().filter(|i| !on_border(i)).collect();

        let mut corners = vec![
            self.cell(0, 0),
            self.cell(0, d - 1),
            self.cell(d - 1, 0),
            self.cell(d - 1, d - 1),
        ];
        corners.sort_unstable();
        corners.dedup();

        let top: Vec<usize> = (0..d).map(|c| self.cell(d - 1, c)).collect();
        let bottom: Vec<usize> = (0..d).map(|c| self.cell(0, c)).collect();
        let left: Vec<usize> = (0..d).map(|r| self.cell(r, 0)).collect();
        let right: Vec<usize> = (0..d).map(|r| self.cell(r, d - 1)).collect();

        let centre = if d % 2 == 1 {
            vec![self.cell(d / 2, d / 2)]
        } else {
            let (lo, hi) = (d / 2 - 1, d / 2);
            vec![self.cell(lo, lo), self.cell(lo, hi), self.cell(hi, lo), self.cell(hi, hi)]
        };

        Regions {
            corners_convex: corners.clone(),
            corners,
            corners_concave: Vec::new(),
            major: all.clone(),
            minor: Vec::new(),
            outer: perimeter.clone(),
            perimeter,
            inner,
            interlayer: Vec::new(),
            sides: Self::with_sides(&top, &right, &bottom, &left),
            top,
            bottom,
            left,
            right,
            centre,
            columns: (0..d).map(|c| (0..d).map(|r| self.cell(r, c)).collect()).collect(),
            rows: (0..d).map(|r| (0..d).map(|c| self.cell(r, c)).collect()).collect(),
        }
    }

    fn vertex_regions(&self) -> Regions {
        let d = self.d;
        let n = d + 1;
        let all: Vec<usize> = (0..n * n).collect();
        let on_border = |i: &usize| {
            let (r, c) = (i / n, i % n);
            r == 0 || c == 0 || r == d || c == d
        };
        let perimeter: Vec<usize> = all.iter().copied().filter(on_border).collect();
        let inner: Vec<usize> = all.iter().copied().filter(|i| !on_border(i)).collect();

        let corners = vec![
            self.vertex(0, 0),
            self.vertex(0, d),
            self.vertex(d, 0),
            self.vertex(d, d),
        ];

        let top: Vec<usize> = (0..=d).map(|c| self.vertex(d, c)).collect();
        let bottom: Vec<usize> = (0..=d).map(|c| self.vertex(0, c)).collect();
        let left: Vec<usize> = (0..=d).map(|r| self.vertex(r, 0)).collect();
        let right: Vec<usize> = (0..=d).map(|r| self.vertex(r, d)).collect();

        let centre = if d % 2 == 1 {
            let (lo, hi) = (d / 2, d / 2 + 1);
            vec![self.vertex(lo, lo), self.vertex(lo, hi), self.vertex(hi, lo), self.vertex(hi, hi)]
        } else {
            vec![self.vertex(d / 2, d / 2)]
        };

        Regions {
            corners_convex: corners.clone(),
            corners,
            outer: perimeter.clone(),
            perimeter,
            inner,
            sides: Self::with_sides(&top, &right, &bottom, &left),
            top,
            bottom,
            left,
            right,
            centre,
            columns: (0..=d).map(|c| (0..=d).map(|r| self.vertex(r, c)).collect()).collect(),
            rows: (0..=d).map(|r| (0..=d).map(|c| self.vertex(r, c)).collect()).collect(),
            ..Regions::default()
        }
    }

    fn edge_regions(&self) -> Regions {
        let d = self.d;

        let top: Vec<usize> = (0..d).map(|c| self.horizontal_edge(d, c)).collect();
        let bottom: Vec<usize> = (0..d).map(|c| self.horizontal_edge(0, c)).collect();
        let left: Vec<usize> = (0..d).map(|r| self.vertical_edge(r, 0)).collect();
        let right: Vec<usize> = (0..d).map(|r| self.vertical_edge(r, d)).collect();

        let mut perimeter: Vec<usize> = top.iter().chain(&bottom).chain(&left).chain(&right).copied().collect();
        perimeter.sort_unstable();
        let inner: Vec<usize> = (0..2 * d * (d + 1))
            .filter(|e| perimeter.binary_search(e).is_err())
            .collect();

        let mut corners = vec![
            self.horizontal_edge(0, 0),
            self.horizontal_edge(0, d - 1),
            self.vertical_edge(0, 0),
            self.vertical_edge(0, d),
            self.vertical_edge(d - 1, 0),
            self.vertical_edge(d - 1, d),
            self.horizontal_edge(d, 0),
            self.horizontal_edge(d, d - 1),
        ];
        corners.sort_unstable();
        corners.dedup();

        // edges with a vertex on each side
        let mut north: Vec<usize> = (0..=d).map(|c| self.vertical_edge(d - 1, c)).chain(top.iter().copied()).collect();
        let mut south: Vec<usize> = bottom.iter().copied().chain((0..=d).map(|c| self.vertical_edge(0, c))).collect();
        let mut east: Vec<usize> = (0..=d).map(|r| self.horizontal_edge(r, d - 1)).chain(right.iter().copied()).collect();
        let mut west: Vec<usize> = (0..=d).map(|r| self.horizontal_edge(r, 0)).chain(left.iter().copied()).collect();
        for side in [&mut north, &mut south, &mut east, &mut west] {
            side.sort_unstable();
        }

        let centre = if d % 2 == 1 {
            let m = d / 2;
            let mut centre = vec![
                self.horizontal_edge(m, m),
                self.vertical_edge(m, m),
                self.vertical_edge(m, m + 1),
                self.horizontal_edge(m + 1, m),
            ];
            centre.sort_unstable();
            centre
        } else {
            let m = d / 2;
            let mut centre = vec![
                self.horizontal_edge(m, m - 1),
                self.horizontal_edge(m, m),
                self.vertical_edge(m - 1, m),
                self.vertical_edge(m, m),
            ];
            centre.sort_unstable();
            centre
        };

        // alternate vertical and horizontal groups
        let mut columns = Vec::with_capacity(2 * d + 1);
        for x in 0..=d {
            columns.push((0..d).map(|r| self.vertical_edge(r, x)).collect());
            if x < d {
                columns.push((0..=d).map(|r| self.horizontal_edge(r, x)).collect());
            }
        }
        let mut rows = Vec::with_capacity(2 * d + 1);
        for y in 0..=d {
            rows.push((0..d).map(|c| self.horizontal_edge(y, c)).collect());
            if y < d {
                rows.push((0..=d).map(|c| self.vertical_edge(y, c)).collect());
            }
        }

        let mut sides = Self::empty_sides();
        sides.insert(CompassDirection::N, north);
        sides.insert(CompassDirection::E, east);
        sides.insert(CompassDirection::S, south);
        sides.insert(CompassDirection::W, west);

        Regions {
            corners_convex: corners.clone(),
            corners,
            outer: perimeter.clone(),
            perimeter,
            inner,
            top,
            bottom,
            left,
            right,
            centre,
            columns,
            rows,
            sides,
            ..Regions::default()
        }
    }
}
