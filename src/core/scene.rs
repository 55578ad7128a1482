/* ************************************************************************ **
** This file is part of bopcalc, and is licensed under EITHER the MIT       **
** license or the Apache 2.0 license, at your option.                       **
**                                                                          **
**     http://www.apache.org/licenses/LICENSE-2.0                           **
**     http://opensource.org/licenses/MIT                                   **
** ************************************************************************ */

//! A read-only view of the scene during one calculation step, plus the
//! chain geometry shared by the interaction loop and the bond-order walks.

use crate::atoms::Atom;
use bopcalc_array_types::V3;
use bopcalc_structure::{Cell, NeighborTables};

pub const MAX_CHAIN: usize = bopcalc_potentials::forms::MAX_BODIES;

/// Everything the loops read: atoms, cell, neighbor tables. Immutable for
/// the duration of a step.
#[derive(Copy, Clone)]
pub struct Scene<'a> {
    pub cell: &'a Cell,
    pub atoms: &'a [Atom],
    pub tables: &'a NeighborTables,
}

impl<'a> Scene<'a> {
    /// The position an atom is evaluated at: its stored position translated
    /// by the wrap offset recorded when the neighbor tables were built.
    /// Using the recorded offset keeps positions continuous when atoms
    /// drift across the boundary between rebuilds.
    #[inline]
    pub fn working_position(&self, atom: usize) -> V3 {
        let wrap = self.tables.wrap_offset(atom);
        self.atoms[atom].position + wrap.map(|x| x as f64) * self.cell.matrix()
    }

    /// Separation from atom `i` to the `offset` image of atom `j`.
    #[inline]
    pub fn separation(&self, i: usize, j: usize, offset: V3<i32>) -> V3 {
        self.cell.separation(self.working_position(i), self.working_position(j), offset)
    }
}

/// An interacting tuple as an open chain `a0 - a1 - ... - a(n-1)`.
///
/// Offsets are image offsets of each chain atom relative to chain atom 0,
/// so that every separation is evaluated between the correct images. The
/// chain and its reversal describe the same physical tuple; enumeration
/// guarantees only one of them is ever produced.
#[derive(Debug, Clone)]
pub struct Chain {
    pub len: usize,
    pub atoms: [usize; MAX_CHAIN],
    pub offsets: [V3<i32>; MAX_CHAIN],
    /// `seps[p]` points from chain atom `p` to `p + 1`.
    pub seps: [V3; MAX_CHAIN - 1],
    pub dists: [f64; MAX_CHAIN - 1],
}

impl Chain {
    /// A chain of one atom.
    pub fn single(atom: usize) -> Chain {
        Chain {
            len: 1,
            atoms: [atom; MAX_CHAIN],
            offsets: [V3([0; 3]); MAX_CHAIN],
            seps: [V3::zero(); MAX_CHAIN - 1],
            dists: [0.0; MAX_CHAIN - 1],
        }
    }

    /// Extend the chain at its tail by a neighbor of the tail atom.
    ///
    /// `offset` is relative to the tail atom, as stored in its neighbor
    /// list; it is rebased onto the chain head here.
    pub fn extended(&self, scene: &Scene<'_>, atom: usize, offset: V3<i32>) -> Chain {
        let mut out = self.clone();
        let tail = self.len - 1;
        let sep = scene.separation(self.atoms[tail], atom, offset);
        out.atoms[self.len] = atom;
        out.offsets[self.len] = self.offsets[tail] + offset;
        out.seps[tail] = sep;
        out.dists[tail] = sep.norm();
        out.len += 1;
        out
    }

    /// Extend the chain at its head by a neighbor of the head atom.
    pub fn extended_front(&self, scene: &Scene<'_>, atom: usize, offset: V3<i32>) -> Chain {
        let mut out = Chain::single(atom);
        // the new head becomes the offset origin
        out.offsets[0] = V3([0; 3]);
        let sep = scene.separation(atom, self.atoms[0], -offset);
        out.atoms[1] = self.atoms[0];
        out.offsets[1] = -offset;
        out.seps[0] = sep;
        out.dists[0] = sep.norm();
        out.len = 2;
        for p in 1..self.len {
            out.atoms[p + 1] = self.atoms[p];
            out.offsets[p + 1] = self.offsets[p] - offset;
            out.seps[p] = self.seps[p - 1];
            out.dists[p] = self.dists[p - 1];
            out.len += 1;
        }
        out
    }

    #[inline]
    pub fn atoms(&self) -> &[usize] { &self.atoms[..self.len] }

    #[inline]
    pub fn seps(&self) -> &[V3] { &self.seps[..self.len - 1] }

    #[inline]
    pub fn dists(&self) -> &[f64] { &self.dists[..self.len - 1] }

    /// Position of chain atom `p` relative to chain atom 0.
    #[inline]
    pub fn relative_position(&self, p: usize) -> V3 {
        let mut out = V3::zero();
        for sep in &self.seps[..p] {
            out += *sep;
        }
        out
    }

    /// Whether a `(neighbor, offset)` entry of the tail atom names the same
    /// atom image as chain position `p`.
    #[inline]
    pub fn tail_neighbor_is(&self, p: usize, atom: usize, offset: V3<i32>) -> bool {
        let tail = self.len - 1;
        self.atoms[p] == atom && self.offsets[tail] + offset == self.offsets[p]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bopcalc_assert_close::assert_close;

    fn scene_fixture() -> (Cell, Vec<Atom>, NeighborTables) {
        let cell = Cell::cubic(10.0, [true; 3]);
        let atoms = vec![
            Atom::new("X", V3([1.0, 1.0, 1.0])),
            Atom::new("X", V3([2.0, 1.0, 1.0])),
            Atom::new("X", V3([2.0, 2.0, 1.0])),
        ];
        let positions: Vec<V3> = atoms.iter().map(|a| a.position).collect();
        let tables = bopcalc_structure::build_neighbor_tables(
            &cell, &positions, &[1.5; 3], false,
        ).unwrap();
        (cell, atoms, tables)
    }

    #[test]
    fn chain_accumulates_offsets_and_seps() {
        let (cell, atoms, tables) = scene_fixture();
        let scene = Scene { cell: &cell, atoms: &atoms, tables: &tables };

        let chain = Chain::single(0)
            .extended(&scene, 1, V3([0, 0, 0]))
            .extended(&scene, 2, V3([0, 0, 0]));
        assert_eq!(chain.atoms(), &[0, 1, 2]);
        assert_close!(abs=1e-12, chain.dists()[0], 1.0);
        assert_close!(abs=1e-12, chain.dists()[1], 1.0);
        let r13 = chain.relative_position(2);
        assert_close!(abs=1e-12, r13[0], 1.0);
        assert_close!(abs=1e-12, r13[1], 1.0);
    }

    #[test]
    fn front_extension_matches_rebuilt_chain() {
        let (cell, atoms, tables) = scene_fixture();
        let scene = Scene { cell: &cell, atoms: &atoms, tables: &tables };

        let pair = Chain::single(1).extended(&scene, 2, V3([0, 0, 0]));
        // neighbor entry of atom 1 pointing at atom 0
        let chain = pair.extended_front(&scene, 0, V3([0, 0, 0]));
        let direct = Chain::single(0)
            .extended(&scene, 1, V3([0, 0, 0]))
            .extended(&scene, 2, V3([0, 0, 0]));
        assert_eq!(chain.atoms(), direct.atoms());
        assert_eq!(chain.seps(), direct.seps());
        assert_eq!(&chain.offsets[..3], &direct.offsets[..3]);
    }

    #[test]
    fn tail_neighbor_identity_includes_images() {
        let (cell, atoms, tables) = scene_fixture();
        let scene = Scene { cell: &cell, atoms: &atoms, tables: &tables };

        let pair = Chain::single(0).extended(&scene, 1, V3([0, 0, 0]));
        // from the tail (atom 1), atom 0 at zero offset is chain position 0
        assert!(pair.tail_neighbor_is(0, 0, V3([0, 0, 0])));
        // a different image of atom 0 is not
        assert!(!pair.tail_neighbor_is(0, 0, V3([1, 0, 0])));
    }
}
