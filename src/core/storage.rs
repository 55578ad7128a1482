/* ************************************************************************ **
** This file is part of bopcalc, and is licensed under EITHER the MIT       **
** license or the Apache 2.0 license, at your option.                       **
**                                                                          **
**     http://www.apache.org/licenses/LICENSE-2.0                           **
**     http://opensource.org/licenses/MIT                                   **
** ************************************************************************ */

//! The two-level bond-order cache.
//!
//! Level one holds, per touched group, the raw per-atom sums `S_i` and the
//! scaled factors `b_i = f_i(S_i)` (with `f_i'` kept alongside so gradient
//! scaling cannot disagree with factor scaling). Level two is a small table
//! of gradient slots keyed by `(group, position-in-tuple)`, each holding
//! the most recently requested center atom's factor-gradient field and its
//! virial. Group ids map onto slots in first-touch order within a step and
//! the map recycles when the storage is emptied.

use crate::errors::{internal_err, resource_err};
use crate::scene::MAX_CHAIN;
use crate::FailResult;
use bopcalc_array_types::V3;

#[derive(Debug, Clone)]
pub struct GradientSlot {
    /// The atom whose factor the stored gradients differentiate.
    pub center: Option<usize>,
    /// For each atom alpha, the gradient of the center's scaled factor with
    /// respect to alpha's position.
    pub gradients: Vec<V3>,
    /// The matching Voigt virial of the gradient field.
    pub virial: [f64; 6],
}

impl GradientSlot {
    fn empty(n_atoms: usize) -> GradientSlot {
        GradientSlot {
            center: None,
            gradients: vec![V3::zero(); n_atoms],
            virial: [0.0; 6],
        }
    }

    fn clear(&mut self) {
        self.center = None;
        for gradient in &mut self.gradients {
            *gradient = V3::zero();
        }
        self.virial = [0.0; 6];
    }
}

#[derive(Debug, Clone)]
pub struct BondOrderStorage {
    n_atoms: usize,
    n_slots: usize,
    /// Which group occupies each slot this step.
    groups: Vec<Option<i32>>,
    /// Whether the sums and factors of each slot have been filled.
    filled: Vec<bool>,
    /// `[slot * n_atoms + atom]`
    sums: Vec<f64>,
    factors: Vec<f64>,
    factor_d_sums: Vec<f64>,
    /// `[slot * MAX_CHAIN + position]`
    gradient_slots: Vec<GradientSlot>,
}

impl BondOrderStorage {
    pub fn new(n_atoms: usize, n_groups: usize, n_factors: usize) -> FailResult<BondOrderStorage> {
        if n_factors > 0 && n_groups == 0 {
            return Err(resource_err(format!(
                "cache sized for 0 groups cannot serve {} bond-order records", n_factors,
            )));
        }
        Ok(BondOrderStorage {
            n_atoms,
            n_slots: n_groups,
            groups: vec![None; n_groups],
            filled: vec![false; n_groups],
            sums: vec![0.0; n_groups * n_atoms],
            factors: vec![0.0; n_groups * n_atoms],
            factor_d_sums: vec![0.0; n_groups * n_atoms],
            gradient_slots: (0..n_groups * MAX_CHAIN).map(|_| GradientSlot::empty(n_atoms)).collect(),
        })
    }

    #[inline]
    pub fn n_atoms(&self) -> usize { self.n_atoms }

    #[inline]
    pub fn n_slots(&self) -> usize { self.n_slots }

    /// Clear sums, factors, the slot map, and all gradient slots.
    pub fn clear(&mut self) {
        for group in &mut self.groups {
            *group = None;
        }
        for flag in &mut self.filled {
            *flag = false;
        }
        for value in self.sums.iter_mut()
            .chain(self.factors.iter_mut())
            .chain(self.factor_d_sums.iter_mut())
        {
            *value = 0.0;
        }
        self.clear_gradients(None);
    }

    /// Clear the gradient slots at one tuple position, or all of them.
    pub fn clear_gradients(&mut self, position: Option<usize>) {
        for (index, slot) in self.gradient_slots.iter_mut().enumerate() {
            if position.map_or(true, |p| index % MAX_CHAIN == p) {
                slot.clear();
            }
        }
    }

    /// The slot currently assigned to a group.
    pub fn slot_of(&self, group: i32) -> Option<usize> {
        self.groups.iter().position(|&g| g == Some(group))
    }

    /// The slot for a group, assigning the next free one on first touch.
    pub fn ensure_slot(&mut self, group: i32) -> FailResult<usize> {
        if let Some(slot) = self.slot_of(group) {
            return Ok(slot);
        }
        match self.groups.iter().position(|g| g.is_none()) {
            Some(slot) => {
                self.groups[slot] = Some(group);
                Ok(slot)
            },
            None => Err(resource_err(format!(
                "bond-order cache sized for {} groups cannot hold group {}",
                self.n_slots, group,
            ))),
        }
    }

    /// Store the filled sums, factors, and factor slopes of a slot.
    pub fn fill_slot(
        &mut self,
        slot: usize,
        sums: &[f64],
        factors: &[f64],
        factor_d_sums: &[f64],
    ) {
        let range = slot * self.n_atoms..(slot + 1) * self.n_atoms;
        self.sums[range.clone()].copy_from_slice(sums);
        self.factors[range.clone()].copy_from_slice(factors);
        self.factor_d_sums[range].copy_from_slice(factor_d_sums);
        self.filled[slot] = true;
    }

    #[inline]
    pub fn is_filled(&self, slot: usize) -> bool { self.filled[slot] }

    /// The scaled factor of an atom; an internal error if the slot was
    /// never filled, since evaluation always fills before it reads.
    pub fn factor(&self, slot: usize, atom: usize) -> FailResult<f64> {
        if !self.filled[slot] {
            return Err(internal_err(format!(
                "bond-order factor read from unfilled slot {}", slot,
            )));
        }
        Ok(self.factors[slot * self.n_atoms + atom])
    }

    #[inline]
    pub fn sum(&self, slot: usize, atom: usize) -> f64 {
        self.sums[slot * self.n_atoms + atom]
    }

    #[inline]
    pub fn factor_d_sum(&self, slot: usize, atom: usize) -> f64 {
        self.factor_d_sums[slot * self.n_atoms + atom]
    }

    #[inline]
    pub fn gradient_slot(&self, slot: usize, position: usize) -> &GradientSlot {
        &self.gradient_slots[slot * MAX_CHAIN + position]
    }

    #[inline]
    pub fn gradient_slot_mut(&mut self, slot: usize, position: usize) -> &mut GradientSlot {
        &mut self.gradient_slots[slot * MAX_CHAIN + position]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::{kind_of, ErrorKind};

    #[test]
    fn slots_recycle_on_clear() {
        let mut storage = BondOrderStorage::new(4, 2, 3).unwrap();
        assert_eq!(storage.ensure_slot(7).unwrap(), 0);
        assert_eq!(storage.ensure_slot(3).unwrap(), 1);
        assert_eq!(storage.ensure_slot(7).unwrap(), 0);

        let err = storage.ensure_slot(99).unwrap_err();
        assert_eq!(kind_of(&err), Some(ErrorKind::Resource));

        storage.clear();
        assert_eq!(storage.ensure_slot(99).unwrap(), 0);
    }

    #[test]
    fn factors_require_a_fill() {
        let mut storage = BondOrderStorage::new(2, 1, 1).unwrap();
        let slot = storage.ensure_slot(1).unwrap();
        let err = storage.factor(slot, 0).unwrap_err();
        assert_eq!(kind_of(&err), Some(ErrorKind::Internal));

        storage.fill_slot(slot, &[1.0, 2.0], &[10.0, 20.0], &[1.0, 1.0]);
        assert_eq!(storage.factor(slot, 1).unwrap(), 20.0);
        assert_eq!(storage.sum(slot, 0), 1.0);
    }

    #[test]
    fn gradient_positions_clear_independently() {
        let mut storage = BondOrderStorage::new(2, 1, 1).unwrap();
        storage.gradient_slot_mut(0, 0).center = Some(1);
        storage.gradient_slot_mut(0, 1).center = Some(0);

        storage.clear_gradients(Some(1));
        assert_eq!(storage.gradient_slot(0, 0).center, Some(1));
        assert_eq!(storage.gradient_slot(0, 1).center, None);

        storage.clear_gradients(None);
        assert_eq!(storage.gradient_slot(0, 0).center, None);
    }

    #[test]
    fn zero_group_cache_with_factors_is_a_resource_error() {
        let err = BondOrderStorage::new(2, 0, 1).unwrap_err();
        assert_eq!(kind_of(&err), Some(ErrorKind::Resource));
    }
}
