/* ************************************************************************ **
** This file is part of bopcalc, and is licensed under EITHER the MIT       **
** license or the Apache 2.0 license, at your option.                       **
**                                                                          **
**     http://www.apache.org/licenses/LICENSE-2.0                           **
**     http://opensource.org/licenses/MIT                                   **
** ************************************************************************ */

//! Subcell decomposition of the simulation cell.
//!
//! The cell is split along each axis into subcells whose thickness is at
//! least the largest interaction cutoff, so that all neighbors of an atom
//! live in the 27 subcells around it. When an axis is thinner than the
//! cutoff (so only one subcell fits), the stencil instead reaches as many
//! images along that axis as the cutoff requires; this is what makes the
//! same neighbor appear multiple times with distinct offsets in small cells.

use crate::FailResult;
use crate::cell::Cell;
use bopcalc_array_types::V3;

/// One entry of a subcell's neighbor table.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct StencilEntry {
    /// Flat index of the neighboring subcell.
    pub cell: usize,
    /// Image offset accumulated by crossing the periodic boundary.
    pub image: V3<i32>,
    /// False for stencil positions that fall outside a non-periodic axis.
    pub include: bool,
}

#[derive(Debug, Clone)]
pub struct SubcellGrid {
    counts: [usize; 3],
    /// Stencil reach along each axis (1 in the ordinary regime).
    reach: [i32; 3],
    periodic: [bool; 3],
    /// Neighbor table per subcell, row-major over the grid.
    stencil: Vec<Vec<StencilEntry>>,
}

impl SubcellGrid {
    /// Partition `cell` into subcells for interactions up to `max_cutoff`.
    pub fn new(cell: &Cell, max_cutoff: f64) -> FailResult<SubcellGrid> {
        ensure!(max_cutoff > 0.0, "cutoff must be positive (got {})", max_cutoff);

        let periodic = cell.periodic();
        let mut counts = [0usize; 3];
        let mut reach = [0i32; 3];
        for axis in 0..3 {
            let extent = cell.plane_spacing(axis);
            counts[axis] = std::cmp::max(1, f64::floor(extent / max_cutoff) as usize);
            reach[axis] = if counts[axis] == 1 && periodic[axis] {
                // a single subcell thinner than the cutoff: look through as
                // many periodic images as the cutoff can span
                f64::ceil(max_cutoff / extent) as i32
            } else {
                1
            };
        }
        trace!("subcell grid: counts = {:?}, reach = {:?}", counts, reach);

        let n_cells = counts[0] * counts[1] * counts[2];
        let mut stencil = Vec::with_capacity(n_cells);
        for flat in 0..n_cells {
            stencil.push(cell_stencil(counts, reach, periodic, unflatten(counts, flat)));
        }
        Ok(SubcellGrid { counts, reach, periodic, stencil })
    }

    #[inline]
    pub fn counts(&self) -> [usize; 3] { self.counts }

    #[inline]
    pub fn n_cells(&self) -> usize { self.counts[0] * self.counts[1] * self.counts[2] }

    /// The subcell containing a position with the given fractional coords.
    ///
    /// Fractional coordinates are assumed wrapped on periodic axes; on
    /// non-periodic axes out-of-cell positions are clamped into the border
    /// subcell.
    pub fn cell_of_frac(&self, frac: V3) -> usize {
        let mut triple = [0usize; 3];
        for axis in 0..3 {
            let n = self.counts[axis] as i64;
            let raw = f64::floor(frac[axis] * n as f64) as i64;
            triple[axis] = raw.max(0).min(n - 1) as usize;
        }
        flatten(self.counts, triple)
    }

    /// The neighbor table of a subcell.
    #[inline]
    pub fn neighbors_of(&self, flat: usize) -> &[StencilEntry] { &self.stencil[flat] }
}

fn flatten(counts: [usize; 3], triple: [usize; 3]) -> usize {
    (triple[0] * counts[1] + triple[1]) * counts[2] + triple[2]
}

fn unflatten(counts: [usize; 3], flat: usize) -> [usize; 3] {
    let z = flat % counts[2];
    let y = (flat / counts[2]) % counts[1];
    let x = flat / (counts[1] * counts[2]);
    [x, y, z]
}

fn cell_stencil(
    counts: [usize; 3],
    reach: [i32; 3],
    periodic: [bool; 3],
    triple: [usize; 3],
) -> Vec<StencilEntry> {
    let mut entries = vec![];
    for dx in -reach[0]..=reach[0] {
        for dy in -reach[1]..=reach[1] {
            for dz in -reach[2]..=reach[2] {
                let mut neighbor = [0usize; 3];
                let mut image = V3([0i32; 3]);
                let mut include = true;
                for (axis, &d) in [dx, dy, dz].iter().enumerate() {
                    let n = counts[axis] as i32;
                    let raw = triple[axis] as i32 + d;
                    if periodic[axis] {
                        neighbor[axis] = raw.rem_euclid(n) as usize;
                        image[axis] = raw.div_euclid(n);
                    } else if 0 <= raw && raw < n {
                        neighbor[axis] = raw as usize;
                    } else {
                        include = false;
                    }
                }
                if include {
                    entries.push(StencilEntry {
                        cell: flatten(counts, neighbor),
                        image,
                        include,
                    });
                } else {
                    entries.push(StencilEntry { cell: 0, image, include });
                }
            }
        }
    }
    entries
}
