/* ************************************************************************ **
** This file is part of bopcalc, and is licensed under EITHER the MIT       **
** license or the Apache 2.0 license, at your option.                       **
**                                                                          **
**     http://www.apache.org/licenses/LICENSE-2.0                           **
**     http://opensource.org/licenses/MIT                                   **
** ************************************************************************ */

//! Per-atom neighbor tables.
//!
//! Each atom's list holds `(neighbor, offset)` pairs, where `offset` is the
//! integer triple of cell vectors added to the neighbor's wrapped position
//! to reach the interacting image. Candidate pairs are discovered by
//! scanning the subcell stencil and are appended to both atoms' lists
//! exactly when [`crate::order::pick`] keeps the orientation being scanned,
//! so no pair is ever double-listed.

use crate::FailResult;
use crate::cell::Cell;
use crate::order::pick;
use crate::partition::SubcellGrid;
use bopcalc_array_types::V3;
use rayon_cond::CondIterator;

/// Hard upper bound on the size of a single atom's neighbor list.
///
/// Hitting this indicates a pathological cutoff for the system density, and
/// the build fails instead of exhausting memory.
pub const MAX_NEIGHBORS: usize = 1 << 16;

#[derive(Debug, Clone, Default)]
pub struct NeighborTables {
    lists: Vec<Vec<(usize, V3<i32>)>>,
    wrap: Vec<V3<i32>>,
}

impl NeighborTables {
    /// Tables with empty lists for `n_atoms` atoms.
    pub fn empty(n_atoms: usize) -> NeighborTables {
        NeighborTables {
            lists: vec![vec![]; n_atoms],
            wrap: vec![V3([0; 3]); n_atoms],
        }
    }

    #[inline]
    pub fn n_atoms(&self) -> usize { self.lists.len() }

    #[inline]
    pub fn neighbors(&self, atom: usize) -> &[(usize, V3<i32>)] { &self.lists[atom] }

    #[inline]
    pub fn n_neighbors(&self, atom: usize) -> usize { self.lists[atom].len() }

    /// The wrap offset triple recorded for an atom at build time, such that
    /// `working_position == position + wrap_offset * cell`.
    #[inline]
    pub fn wrap_offset(&self, atom: usize) -> V3<i32> { self.wrap[atom] }

    /// Overwrite one atom's list directly (the externally-supplied list
    /// path). The caller is responsible for providing the mirror entries.
    pub fn set_list(&mut self, atom: usize, entries: Vec<(usize, V3<i32>)>) -> FailResult<()> {
        ensure!(atom < self.lists.len(), "no such atom: {}", atom);
        ensure!(
            entries.len() <= MAX_NEIGHBORS,
            "neighbor list of atom {} exceeds the hard bound of {} entries",
            atom, MAX_NEIGHBORS,
        );
        self.lists[atom] = entries;
        Ok(())
    }
}

/// Build neighbor tables for all atoms.
///
/// `cutoffs` gives each atom's interaction reach; a pair is listed when its
/// minimum-image distance is below the larger of the two atoms' cutoffs, so
/// the symmetry property holds even with non-uniform cutoffs. Distances of
/// exactly zero are permitted and produce entries like any other.
pub fn build_neighbor_tables(
    cell: &Cell,
    positions: &[V3],
    cutoffs: &[f64],
    use_rayon: bool,
) -> FailResult<NeighborTables> {
    ensure!(
        positions.len() == cutoffs.len(),
        "got {} positions but {} cutoffs", positions.len(), cutoffs.len(),
    );
    if positions.is_empty() {
        return Ok(NeighborTables::empty(0));
    }

    let max_cutoff = cutoffs.iter().cloned().fold(0.0, f64::max);
    ensure!(max_cutoff > 0.0, "no positive cutoff among {} atoms", cutoffs.len());

    let grid = SubcellGrid::new(cell, max_cutoff)?;

    // Wrap everything into the primary image, remembering the wrap offsets;
    // all separations below are measured between wrapped positions.
    let mut wrapped = Vec::with_capacity(positions.len());
    let mut wrap = Vec::with_capacity(positions.len());
    for &pos in positions {
        let (w, shift) = cell.wrap(pos);
        wrapped.push(w);
        wrap.push(shift);
    }

    // Bin atoms into subcells.
    let mut bins: Vec<Vec<usize>> = vec![vec![]; grid.n_cells()];
    for (atom, &w) in wrapped.iter().enumerate() {
        bins[grid.cell_of_frac(cell.to_frac(w))].push(atom);
    }

    // For each atom, gather the canonical pairs it heads. Scanning both
    // orientations of every pair and keeping only the canonical one is what
    // guarantees the exactly-once property, including self-image pairs in
    // small cells.
    let atom_cell: Vec<usize> = {
        wrapped.iter().map(|&w| grid.cell_of_frac(cell.to_frac(w))).collect()
    };
    let canonical: Vec<Vec<(usize, V3<i32>)>> = {
        CondIterator::new(0..positions.len(), use_rayon).map(|a| {
            let mut found = vec![];
            for entry in grid.neighbors_of(atom_cell[a]) {
                if !entry.include {
                    continue;
                }
                for &b in &bins[entry.cell] {
                    let offset = entry.image;
                    if a == b && offset == V3([0; 3]) {
                        continue;
                    }
                    let sep = cell.separation(wrapped[a], wrapped[b], offset);
                    let cut = f64::max(cutoffs[a], cutoffs[b]);
                    if sep.sqnorm() < cut * cut && pick(a, b, offset) {
                        found.push((b, offset));
                    }
                }
            }
            found
        }).collect()
    };

    // Scatter to both endpoints' lists.
    let mut tables = NeighborTables::empty(positions.len());
    tables.wrap = wrap;
    for (a, found) in canonical.into_iter().enumerate() {
        for (b, offset) in found {
            tables.lists[a].push((b, offset));
            tables.lists[b].push((a, -offset));
        }
    }

    // A deterministic ordering, independent of how the scan was scheduled.
    for (atom, list) in tables.lists.iter_mut().enumerate() {
        list.sort();
        ensure!(
            list.len() <= MAX_NEIGHBORS,
            "neighbor list of atom {} exceeds the hard bound of {} entries",
            atom, MAX_NEIGHBORS,
        );
    }

    let total: usize = tables.lists.iter().map(|l| l.len()).sum();
    debug!("neighbor tables: {} atoms, {} entries", positions.len(), total);
    Ok(tables)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    fn entries(tables: &NeighborTables, atom: usize) -> BTreeSet<(usize, V3<i32>)> {
        tables.neighbors(atom).iter().cloned().collect()
    }

    #[test]
    fn dimer_in_large_cell() {
        let cell = Cell::cubic(20.0, [true; 3]);
        let positions = [V3([1.0, 1.0, 1.0]), V3([2.0, 1.0, 1.0])];
        let tables = build_neighbor_tables(&cell, &positions, &[1.5, 1.5], false).unwrap();
        assert_eq!(entries(&tables, 0), vec![(1, V3([0, 0, 0]))].into_iter().collect());
        assert_eq!(entries(&tables, 1), vec![(0, V3([0, 0, 0]))].into_iter().collect());
    }

    #[test]
    fn self_images_in_small_cell() {
        //   . . . . .
        //   . # # # .   o : the atom
        //   . # o # .   # : images in range
        //   . # # # .   . : too far
        //   . . . . .
        let cell = Cell::orthorhombic(1.0, 1.0, 2.0, [true; 3]);
        let positions = [V3([0.0, 0.0, 0.0])];
        let range = f64::sqrt(2.0) * 1.1;
        let tables = build_neighbor_tables(&cell, &positions, &[range], false).unwrap();

        let expected: BTreeSet<_> = vec![
            // other images of the atom, but not the atom itself
            (0, V3([1, 0, 0])),
            (0, V3([-1, 0, 0])),
            (0, V3([0, 1, 0])),
            (0, V3([0, -1, 0])),
            (0, V3([1, 1, 0])),
            (0, V3([1, -1, 0])),
            (0, V3([-1, 1, 0])),
            (0, V3([-1, -1, 0])),
        ].into_iter().collect();
        assert_eq!(entries(&tables, 0), expected);
    }

    #[test]
    fn weird_initial_images() {
        // A short-range interaction with one interacting pair, but starting
        // from far-flung images; the offsets are relative to the wrapped
        // positions, and the wrap offsets record how to get back.
        let cell = Cell::cubic(1.0, [true; 3]);
        let positions = [
            V3([6.5, -3.5, 2.5]),   // the [6, -4, 2] image of [0.5, 0.5, 0.5]
            V3([8.5, -3.5, -7.4]),  // the [8, -4, -8] image of [0.5, 0.5, 0.6]
        ];
        let tables = build_neighbor_tables(&cell, &positions, &[0.11, 0.11], false).unwrap();

        assert_eq!(entries(&tables, 0), vec![(1, V3([0, 0, 0]))].into_iter().collect());
        assert_eq!(tables.wrap_offset(0), V3([-6, 4, -2]));
        assert_eq!(tables.wrap_offset(1), V3([-8, 4, 8]));
    }

    #[test]
    fn aperiodic_axis_blocks_wraparound() {
        let cell = Cell::orthorhombic(4.0, 4.0, 4.0, [false, true, true]);
        // 0.5 apart through the x boundary; interacting only if x is periodic
        let positions = [V3([0.25, 2.0, 2.0]), V3([3.75, 2.0, 2.0])];
        let tables = build_neighbor_tables(&cell, &positions, &[1.0, 1.0], false).unwrap();
        assert!(tables.neighbors(0).is_empty());
        assert!(tables.neighbors(1).is_empty());

        let cell = Cell::cubic(4.0, [true; 3]);
        let tables = build_neighbor_tables(&cell, &positions, &[1.0, 1.0], false).unwrap();
        assert_eq!(entries(&tables, 0), vec![(1, V3([-1, 0, 0]))].into_iter().collect());
    }

    #[test]
    fn symmetry_with_unequal_cutoffs() {
        let cell = Cell::cubic(10.0, [true; 3]);
        let positions = [V3([0.0, 0.0, 0.0]), V3([2.0, 0.0, 0.0])];
        // only atom 0's cutoff reaches, but both lists must agree
        let tables = build_neighbor_tables(&cell, &positions, &[2.5, 1.0], false).unwrap();
        assert_eq!(tables.n_neighbors(0), 1);
        assert_eq!(tables.n_neighbors(1), 1);
    }

    #[test]
    fn zero_distance_pair() {
        // two sites superimposed on each other
        let cell = Cell::cubic(10.0, [true; 3]);
        let positions = [V3([4.0, 4.0, 4.0]), V3([4.0, 4.0, 4.0])];
        let tables = build_neighbor_tables(&cell, &positions, &[1.0, 1.0], false).unwrap();
        assert_eq!(entries(&tables, 0), vec![(1, V3([0, 0, 0]))].into_iter().collect());
        assert_eq!(entries(&tables, 1), vec![(0, V3([0, 0, 0]))].into_iter().collect());
    }

    #[test]
    fn rayon_matches_serial() {
        let cell = Cell::orthorhombic(6.0, 5.0, 7.0, [true, true, false]);
        let positions: Vec<V3> = (0..40).map(|i| {
            let i = i as f64;
            V3([i * 0.37 % 6.0, (i * 1.13) % 5.0, (i * 0.71) % 7.0])
        }).collect();
        let cutoffs = vec![1.7; positions.len()];
        let serial = build_neighbor_tables(&cell, &positions, &cutoffs, false).unwrap();
        let parallel = build_neighbor_tables(&cell, &positions, &cutoffs, true).unwrap();
        for atom in 0..positions.len() {
            assert_eq!(serial.neighbors(atom), parallel.neighbors(atom));
        }
    }
}
