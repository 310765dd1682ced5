//! Re-indexing of the global site space for one grow event.

use std::collections::{BTreeMap, BTreeSet};

/// Bijection between the previous global indices and their images in the
/// grown space, plus the new indices nothing maps onto.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IndexMap {
    prev_to_new: BTreeMap<usize, usize>,
    new_to_prev: BTreeMap<usize, usize>,
    added: BTreeSet<usize>,
}

impl IndexMap {
    /// Map for a square board of side `prev_dim` growing by `step`, followed
    /// by `aux_count` auxiliary sites.
    ///
    /// Board cell `p` on row `r` lands at `p + (step / 2) * (new_dim + 1) +
    /// step * r`, which centres the old board inside the new one with a
    /// border of `step / 2` cells. Auxiliary sites shift by the area
    /// increase.
    pub fn square(prev_dim: usize, step: usize, aux_count: usize) -> Self {
        let new_dim = prev_dim + step;
        let prev_area = prev_dim * prev_dim;
        let new_area = new_dim * new_dim;
        let border = step / 2;
        let shift = border * (new_dim + 1);

        let mut prev_to_new = BTreeMap::new();
        let mut new_to_prev = BTreeMap::new();

        for p in 0..prev_area {
            let row = p / prev_dim;
            let q = p + shift + step * row;
            prev_to_new.insert(p, q);
            new_to_prev.insert(q, p);
        }

        let diff = new_area - prev_area;
        for p in prev_area..prev_area + aux_count {
            prev_to_new.insert(p, p + diff);
            new_to_prev.insert(p + diff, p);
        }

        let added = (0..new_area + aux_count)
            .filter(|q| !new_to_prev.contains_key(q))
            .collect();

        IndexMap {
            prev_to_new,
            new_to_prev,
            added,
        }
    }

    /// Image of a previous index.
    #[inline]
    pub fn get(&self, prev: usize) -> Option<usize> {
        self.prev_to_new.get(&prev).copied()
    }

    /// Pre-image of a new index, `None` for added sites.
    #[inline]
    pub fn prev_of(&self, new: usize) -> Option<usize> {
        self.new_to_prev.get(&new).copied()
    }

    pub fn is_added(&self, new: usize) -> bool {
        self.added.contains(&new)
    }

    pub fn prev_to_new(&self) -> &BTreeMap<usize, usize> {
        &self.prev_to_new
    }

    pub fn new_to_prev(&self) -> &BTreeMap<usize, usize> {
        &self.new_to_prev
    }

    pub fn added(&self) -> &BTreeSet<usize> {
        &self.added
    }

    /// Number of previous indices covered.
    pub fn len(&self) -> usize {
        self.prev_to_new.len()
    }

    pub fn is_empty(&self) -> bool {
        self.prev_to_new.is_empty()
    }
}

/// Everything one grow event needs, built at its start and dropped at its
/// end.
#[derive(Debug, Clone)]
pub struct GrowContext {
    pub prev_dim: usize,
    pub new_dim: usize,
    pub step: usize,
    pub prev_area: usize,
    pub new_area: usize,
    pub aux_count: usize,
    pub prev_total: usize,
    pub new_total: usize,
    pub diff: usize,
    pub index_map: IndexMap,
}

impl GrowContext {
    pub fn new(prev_dim: usize, step: usize, aux_count: usize) -> Self {
        let new_dim = prev_dim + step;
        let prev_area = prev_dim * prev_dim;
        let new_area = new_dim * new_dim;
        GrowContext {
            prev_dim,
            new_dim,
            step,
            prev_area,
            new_area,
            aux_count,
            prev_total: prev_area + aux_count,
            new_total: new_area + aux_count,
            diff: new_area - prev_area,
            index_map: IndexMap::square(prev_dim, step, aux_count),
        }
    }

    /// Image of an optional site; `None` stays `None`.
    pub fn map_site(&self, site: Option<usize>) -> Option<usize> {
        site.and_then(|s| self.index_map.get(s))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_grow_from_five() {
        let grow = GrowContext::new(5, 2, 2);
        assert_eq!(grow.new_dim, 7);
        assert_eq!(grow.new_area, 49);
        assert_eq!(grow.prev_total, 27);
        assert_eq!(grow.new_total, 51);
        assert_eq!(grow.diff, 24);

        let map = &grow.index_map;
        assert_eq!(map.len(), 27);
        assert_eq!(map.get(0), Some(8));
        assert_eq!(map.get(10), Some(22));
        assert_eq!(map.get(12), Some(24));
        assert_eq!(map.get(24), Some(40));
        assert_eq!(map.get(25), Some(49));
        assert_eq!(map.get(26), Some(50));
        assert_eq!(map.get(27), None);

        let mut expected: Vec<usize> = (0..=7).collect();
        expected.extend([13, 14, 20, 21, 27, 28, 34, 35]);
        expected.extend(41..=48);
        let added: Vec<usize> = map.added().iter().copied().collect();
        assert_eq!(added, expected);
    }

    #[test]
    fn test_second_grow_from_seven() {
        let grow = GrowContext::new(7, 2, 2);
        assert_eq!(grow.new_dim, 9);
        assert_eq!(grow.new_area, 81);
        assert_eq!(grow.new_total, 83);
        assert_eq!(grow.diff, 32);
        assert_eq!(grow.index_map.get(49), Some(81));
        assert_eq!(grow.index_map.get(50), Some(82));
        assert_eq!(grow.index_map.get(24), Some(40));
    }

    #[test]
    fn test_partition_of_new_space() {
        for (dim, step) in [(3, 2), (5, 2), (5, 4), (9, 6)] {
            let grow = GrowContext::new(dim, step, 3);
            let map = &grow.index_map;
            assert_eq!(map.added().len(), grow.new_area - grow.prev_area);
            for (&p, &q) in map.prev_to_new() {
                assert!(!map.is_added(q));
                assert_eq!(map.prev_of(q), Some(p));
            }
            assert_eq!(map.added().len() + map.len(), grow.new_total);
        }
    }

    #[test]
    fn test_centre_is_preserved() {
        for (dim, step) in [(5, 2), (7, 4), (11, 2)] {
            let grow = GrowContext::new(dim, step, 0);
            let old_centre = (dim / 2) * dim + dim / 2;
            let new_dim = grow.new_dim;
            let new_centre = (new_dim / 2) * new_dim + new_dim / 2;
            assert_eq!(grow.index_map.get(old_centre), Some(new_centre));
        }
    }

    #[test]
    fn test_map_site_keeps_undefined() {
        let grow = GrowContext::new(5, 2, 2);
        assert_eq!(grow.map_site(None), None);
        assert_eq!(grow.map_site(Some(10)), Some(22));
    }
}
