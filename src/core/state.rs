/* ************************************************************************ **
** This file is part of bopcalc, and is licensed under EITHER the MIT       **
** license or the Apache 2.0 license, at your option.                       **
**                                                                          **
**     http://www.apache.org/licenses/LICENSE-2.0                           **
**     http://opensource.org/licenses/MIT                                   **
** ************************************************************************ */

//! The core state and its imperative operation surface.

use crate::atoms::Atom;
use crate::dump;
use crate::errors::{self, state_err, ErrorKind};
use crate::gradients;
use crate::loops::{self, CalcKind, Totals};
use crate::parallel::{compensated_all_reduce, owns_atom, Comm, SerialComm};
use crate::registry::{
    self, BondOrderRecord, PotentialRecord, TargetFilter,
};
use crate::scene::Scene;
use crate::storage::BondOrderStorage;
use crate::FailResult;
use bopcalc_array_types::{V3, M3};
use bopcalc_potentials::bond_order::Bodies;
use bopcalc_potentials::ewald::{self, EwaldParams};
use bopcalc_structure::{build_neighbor_tables, Cell, NeighborTables, SubcellGrid};
use enum_map::EnumMap;

use std::path::PathBuf;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::time::Instant;

/// All state of one evaluation engine.
///
/// Every operation takes the state explicitly; nothing here is process
/// global. A single-process program holds exactly one value, tests build
/// as many as they like.
#[derive(Default)]
pub struct CoreState {
    cell: Option<Cell>,
    atoms: Vec<Atom>,
    potentials: Vec<PotentialRecord>,
    bond_orders: Vec<BondOrderRecord>,
    potential_indices_assigned: bool,
    bond_order_indices_assigned: bool,
    tables: Option<NeighborTables>,
    partition_cutoff: Option<f64>,
    storage: Option<BondOrderStorage>,
    ewald: Option<EwaldParams>,
    use_rayon: bool,
    dump_directory: Option<PathBuf>,
    cancel: Option<Arc<AtomicBool>>,
    step: u64,
}

impl CoreState {
    pub fn new() -> CoreState { CoreState::default() }

    // -----------------------------------------------------------------
    // structure

    /// Install the atom arena, replacing any previous one. Indices are
    /// dense and stable from here on; neighbor tables, target index lists,
    /// and the bond-order cache all start over.
    pub fn generate_atoms(&mut self, atoms: Vec<Atom>) {
        self.atoms = atoms;
        self.tables = None;
        self.storage = None;
        self.potential_indices_assigned = false;
        self.bond_order_indices_assigned = false;
    }

    /// Overwrite positions (and momenta, when given). Neighbor tables are
    /// left alone; rebuild them if anything may have moved past a cutoff.
    pub fn update_coordinates(
        &mut self,
        positions: &[V3],
        momenta: Option<&[V3]>,
    ) -> FailResult<()> {
        if positions.len() != self.atoms.len() {
            return Err(state_err(format!(
                "got {} positions for {} atoms", positions.len(), self.atoms.len(),
            )));
        }
        for (atom, &position) in self.atoms.iter_mut().zip(positions) {
            atom.position = position;
        }
        if let Some(momenta) = momenta {
            if momenta.len() != self.atoms.len() {
                return Err(state_err(format!(
                    "got {} momenta for {} atoms", momenta.len(), self.atoms.len(),
                )));
            }
            for (atom, &momentum) in self.atoms.iter_mut().zip(momenta) {
                atom.momentum = momentum;
            }
        }
        Ok(())
    }

    pub fn update_charges(&mut self, charges: &[f64]) -> FailResult<()> {
        if charges.len() != self.atoms.len() {
            return Err(state_err(format!(
                "got {} charges for {} atoms", charges.len(), self.atoms.len(),
            )));
        }
        for (atom, &charge) in self.atoms.iter_mut().zip(charges) {
            atom.charge = charge;
        }
        Ok(())
    }

    /// Install the simulation cell. Rebuilding the cell invalidates the
    /// neighbor tables and the bond-order cache.
    pub fn create_cell(&mut self, vectors: [[f64; 3]; 3], periodic: [bool; 3]) -> FailResult<()> {
        let matrix = M3([V3(vectors[0]), V3(vectors[1]), V3(vectors[2])]);
        let cell = errors::with_kind(ErrorKind::Configuration, Cell::new(matrix, periodic))?;
        self.cell = Some(cell);
        self.tables = None;
        self.storage = None;
        Ok(())
    }

    pub fn get_cell_vectors(&self) -> FailResult<[[f64; 3]; 3]> {
        let cell = self.cell.as_ref()
            .ok_or_else(|| state_err("no cell has been created".to_string()))?;
        let v = cell.vectors();
        Ok([v[0].0, v[1].0, v[2].0])
    }

    pub fn get_number_of_atoms(&self) -> usize { self.atoms.len() }

    pub fn atoms(&self) -> &[Atom] { &self.atoms }

    /// Log the atoms (debug aid).
    pub fn list_atoms(&self) {
        for (index, atom) in self.atoms.iter().enumerate() {
            info!("atom {:6}: {}", index, atom);
        }
    }

    /// Log the cell (debug aid).
    pub fn list_cell(&self) {
        match &self.cell {
            Some(cell) => {
                for (axis, vector) in cell.vectors().iter().enumerate() {
                    info!("cell vector {}: {:?} (periodic: {})", axis, vector, cell.periodic()[axis]);
                }
            },
            None => info!("no cell"),
        }
    }

    // -----------------------------------------------------------------
    // registration

    /// Reserve room for potential records about to be added.
    pub fn allocate_potentials(&mut self, count: usize) {
        self.potentials.reserve(count);
    }

    /// Register a potential. The target list is validated and expanded
    /// over its orderings here; evaluation never re-permutes.
    pub fn add_potential(
        &mut self,
        name: &str,
        parameters: Vec<f64>,
        cutoff: f64,
        soft_cutoff: f64,
        filter: TargetFilter,
        group: Option<i32>,
    ) -> FailResult<()> {
        let records = registry::make_potential_records(
            name, parameters, cutoff, soft_cutoff, filter, group,
        )?;
        self.potentials.extend(records);
        self.potential_indices_assigned = false;
        Ok(())
    }

    pub fn allocate_bond_order_factors(&mut self, count: usize) {
        self.bond_orders.reserve(count);
    }

    /// Register a bond-order factor record, with parameters split by the
    /// body count of the term they govern.
    pub fn add_bond_order_factor(
        &mut self,
        name: &str,
        parameters: EnumMap<Bodies, Vec<f64>>,
        cutoff: f64,
        soft_cutoff: f64,
        filter: TargetFilter,
        group: i32,
    ) -> FailResult<()> {
        let records = registry::make_bond_order_records(
            name, parameters, cutoff, soft_cutoff, filter, group,
        )?;
        self.bond_orders.extend(records);
        self.bond_order_indices_assigned = false;
        Ok(())
    }

    /// Precompute, per atom, the potential records whose first-position
    /// target accepts it. Must run after registration and before
    /// evaluation, and again after any atom relabeling.
    pub fn assign_potential_indices(&mut self) -> FailResult<()> {
        if self.atoms.is_empty() {
            return Err(state_err("cannot assign potential indices with no atoms".to_string()));
        }
        let potentials = &self.potentials;
        for index in 0..self.atoms.len() {
            let list = registry::indices_targeting_first(
                potentials, |r| &r.filter, &self.atoms[index], index,
            );
            self.atoms[index].potential_indices = list;
        }
        self.potential_indices_assigned = true;
        Ok(())
    }

    pub fn assign_bond_order_factor_indices(&mut self) -> FailResult<()> {
        if self.atoms.is_empty() {
            return Err(state_err("cannot assign bond-order indices with no atoms".to_string()));
        }
        let bond_orders = &self.bond_orders;
        for index in 0..self.atoms.len() {
            let list = registry::indices_targeting_first(
                bond_orders, |r| &r.filter, &self.atoms[index], index,
            );
            self.atoms[index].bond_order_indices = list;
        }
        self.bond_order_indices_assigned = true;
        Ok(())
    }

    // -----------------------------------------------------------------
    // neighbor infrastructure

    /// Validate that a subcell partitioning can cover the cell for the
    /// given cutoff, and remember the cutoff for later builds.
    pub fn create_space_partitioning(&mut self, max_cutoff: f64) -> FailResult<()> {
        let cell = self.cell.as_ref()
            .ok_or_else(|| state_err("no cell to partition".to_string()))?;
        errors::with_kind(ErrorKind::Configuration, SubcellGrid::new(cell, max_cutoff))?;
        self.partition_cutoff = Some(max_cutoff);
        Ok(())
    }

    /// Build neighbor tables for all atoms from per-atom cutoffs.
    pub fn build_neighbor_lists(&mut self, cutoffs: &[f64]) -> FailResult<()> {
        let cell = self.cell.as_ref()
            .ok_or_else(|| state_err("no cell for the neighbor search".to_string()))?;
        if cutoffs.len() != self.atoms.len() {
            return Err(state_err(format!(
                "got {} cutoffs for {} atoms", cutoffs.len(), self.atoms.len(),
            )));
        }
        let positions: Vec<V3> = self.atoms.iter().map(|a| a.position).collect();
        let tables = errors::with_kind(
            ErrorKind::Resource,
            build_neighbor_tables(cell, &positions, cutoffs, self.use_rayon),
        )?;
        self.tables = Some(tables);
        Ok(())
    }

    /// Build neighbor tables with one cutoff for every atom, derived from
    /// the registered records (or the stored partition cutoff).
    pub fn build_neighbor_lists_from_records(&mut self) -> FailResult<()> {
        let record_cutoff = self.potentials.iter().map(|r| r.cutoff)
            .chain(self.bond_orders.iter().map(|r| r.cutoff))
            .fold(0.0, f64::max);
        let cutoff = match self.partition_cutoff {
            Some(stored) => f64::max(stored, record_cutoff),
            None => record_cutoff,
        };
        if cutoff <= 0.0 {
            return Err(state_err("no positive cutoff is known; register records first".to_string()));
        }
        let cutoffs = vec![cutoff; self.atoms.len()];
        self.build_neighbor_lists(&cutoffs)
    }

    /// Install one atom's neighbor list directly. The caller provides the
    /// mirror entries itself.
    pub fn create_neighbor_list(
        &mut self,
        atom: usize,
        neighbors: &[usize],
        offsets: &[V3<i32>],
    ) -> FailResult<()> {
        if neighbors.len() != offsets.len() {
            return Err(state_err(format!(
                "got {} neighbors but {} offsets", neighbors.len(), offsets.len(),
            )));
        }
        if self.tables.is_none() {
            self.tables = Some(NeighborTables::empty(self.atoms.len()));
        }
        let tables = self.tables.as_mut().unwrap();
        let entries = neighbors.iter().cloned().zip(offsets.iter().cloned()).collect();
        errors::with_kind(ErrorKind::Resource, tables.set_list(atom, entries))
    }

    pub fn get_number_of_neighbors(&self, atom: usize) -> FailResult<usize> {
        let tables = self.tables.as_ref()
            .ok_or_else(|| state_err("neighbor lists have not been built".to_string()))?;
        Ok(tables.n_neighbors(atom))
    }

    pub fn get_neighbor_list_of_atom(&self, atom: usize) -> FailResult<&[(usize, V3<i32>)]> {
        let tables = self.tables.as_ref()
            .ok_or_else(|| state_err("neighbor lists have not been built".to_string()))?;
        Ok(tables.neighbors(atom))
    }

    // -----------------------------------------------------------------
    // bond-order storage

    pub fn allocate_bond_order_storage(&mut self, n_groups: usize) -> FailResult<()> {
        self.storage = Some(BondOrderStorage::new(
            self.atoms.len(), n_groups, self.bond_orders.len(),
        )?);
        Ok(())
    }

    pub fn empty_bond_order_storage(&mut self) {
        if let Some(storage) = &mut self.storage {
            storage.clear();
        }
    }

    pub fn empty_bond_order_gradient_storage(&mut self, position: Option<usize>) {
        if let Some(storage) = &mut self.storage {
            storage.clear_gradients(position);
        }
    }

    /// Groups referenced by any registered potential, in first-use order.
    fn referenced_groups(&self) -> Vec<i32> {
        let mut groups = vec![];
        for record in &self.potentials {
            if let Some(group) = record.group {
                if !groups.contains(&group) {
                    groups.push(group);
                }
            }
        }
        groups
    }

    /// Fill the bond-order sums and scaled factors of every group any
    /// potential references. Allocates the storage on first use.
    pub fn fill_bond_order_storage(&mut self) -> FailResult<()> {
        let groups = self.referenced_groups();
        if groups.is_empty() {
            return Ok(());
        }
        if self.storage.is_none() {
            self.allocate_bond_order_storage(groups.len())?;
        }

        let mut storage = self.storage.take()
            .ok_or_else(|| state_err("bond-order storage vanished".to_string()))?;
        let result = (|| -> FailResult<()> {
            let scene = self.scene()?;
            for &group in &groups {
                let slot = storage.ensure_slot(group)?;
                let sums = gradients::fill_group_sums(&scene, &self.bond_orders, group)?;
                let (factors, factor_d_sums) = gradients::post_process_sums(
                    &self.atoms, &self.bond_orders, group, &sums,
                );
                storage.fill_slot(slot, &sums, &factors, &factor_d_sums);
            }
            Ok(())
        })();
        // the fill phase is recoverable; partial sums are discarded
        if result.is_err() {
            storage.clear();
        }
        self.storage = Some(storage);
        result
    }

    /// The raw bond-order sums of a group (debug aid; bypasses the cache).
    pub fn get_bond_order_sums(&self, group: i32) -> FailResult<Vec<f64>> {
        let scene = self.scene()?;
        gradients::fill_group_sums(&scene, &self.bond_orders, group)
    }

    /// The scaled bond-order factors of a group (debug aid).
    pub fn get_bond_order_factors(&self, group: i32) -> FailResult<Vec<f64>> {
        let sums = self.get_bond_order_sums(group)?;
        let (factors, _) = gradients::post_process_sums(
            &self.atoms, &self.bond_orders, group, &sums,
        );
        Ok(factors)
    }

    /// Per-factor mode: the gradient of one atom's scaled factor with
    /// respect to every atom, and the virial of the field.
    pub fn get_bond_order_gradients_of_factor(
        &self,
        group: i32,
        atom: usize,
    ) -> FailResult<(Vec<V3>, [f64; 6])> {
        let scene = self.scene()?;
        let sums = gradients::fill_group_sums(&scene, &self.bond_orders, group)?;
        let (_, factor_d_sums) = gradients::post_process_sums(
            &self.atoms, &self.bond_orders, group, &sums,
        );
        gradients::compute_factor_gradient(
            &scene, &self.bond_orders, group, atom, factor_d_sums[atom],
        )
    }

    /// Per-moving-atom mode: the gradients of every raw sum with respect
    /// to one atom's position.
    pub fn get_bond_order_gradients_of_move(
        &self,
        group: i32,
        atom: usize,
    ) -> FailResult<Vec<V3>> {
        let scene = self.scene()?;
        gradients::compute_sum_gradients_for_move(&scene, &self.bond_orders, group, atom)
    }

    // -----------------------------------------------------------------
    // long range

    pub fn set_ewald_parameters(
        &mut self,
        real_cutoff: f64,
        k_cutoffs: [usize; 3],
        sigma: f64,
        epsilon: f64,
        scaler: Vec<f64>,
    ) -> FailResult<()> {
        if scaler.len() != self.atoms.len() {
            return Err(state_err(format!(
                "got {} ewald scalers for {} atoms", scaler.len(), self.atoms.len(),
            )));
        }
        self.ewald = Some(EwaldParams { real_cutoff, k_cutoffs, sigma, epsilon, scaler });
        Ok(())
    }

    pub fn clear_ewald_parameters(&mut self) {
        self.ewald = None;
    }

    /// The Ewald energy alone (debug aid).
    pub fn get_ewald_energy(&self) -> FailResult<f64> {
        let params = self.ewald.as_ref()
            .ok_or_else(|| state_err("no ewald parameters set".to_string()))?;
        let cell = self.cell.as_ref()
            .ok_or_else(|| state_err("no cell has been created".to_string()))?;
        let positions: Vec<V3> = self.atoms.iter().map(|a| a.position).collect();
        let charges: Vec<f64> = self.atoms.iter().map(|a| a.charge).collect();
        let include = vec![true; self.atoms.len()];
        let out = errors::with_kind(
            ErrorKind::Numerical,
            ewald::evaluate(cell, &positions, &charges, &include, params),
        )?;
        Ok(out.energy)
    }

    // -----------------------------------------------------------------
    // evaluation

    pub fn calculate_energy(&mut self) -> FailResult<f64> {
        self.calculate_energy_on(&SerialComm)
    }

    pub fn calculate_energy_on(&mut self, comm: &dyn Comm) -> FailResult<f64> {
        let totals = self.run_step(CalcKind::Energy, comm)?;
        Ok(totals.energy)
    }

    pub fn calculate_forces(&mut self) -> FailResult<(Vec<V3>, [f64; 6])> {
        self.calculate_forces_on(&SerialComm)
    }

    pub fn calculate_forces_on(&mut self, comm: &dyn Comm) -> FailResult<(Vec<V3>, [f64; 6])> {
        let totals = self.run_step(CalcKind::Forces, comm)?;
        Ok((totals.forces, totals.stress))
    }

    /// Forces as a flat `3 N` buffer, for callers marshalling into foreign
    /// array layouts.
    pub fn calculate_forces_flat(&mut self) -> FailResult<(Vec<f64>, [f64; 6])> {
        use slice_of_array::prelude::*;
        let (forces, stress) = self.calculate_forces()?;
        Ok((forces.flat().to_vec(), stress))
    }

    pub fn calculate_electronegativities(&mut self) -> FailResult<Vec<f64>> {
        self.calculate_electronegativities_on(&SerialComm)
    }

    pub fn calculate_electronegativities_on(&mut self, comm: &dyn Comm) -> FailResult<Vec<f64>> {
        let totals = self.run_step(CalcKind::Electronegativity, comm)?;
        Ok(totals.chis)
    }

    fn scene(&self) -> FailResult<Scene<'_>> {
        let cell = self.cell.as_ref()
            .ok_or_else(|| state_err("no cell has been created".to_string()))?;
        let tables = self.tables.as_ref()
            .ok_or_else(|| state_err("neighbor lists have not been built".to_string()))?;
        Ok(Scene { cell, atoms: &self.atoms, tables })
    }

    fn check_ready(&self) -> FailResult<()> {
        if self.atoms.is_empty() {
            return Err(state_err("no atoms to evaluate".to_string()));
        }
        if self.cell.is_none() {
            return Err(state_err("no cell has been created".to_string()));
        }
        if !self.potential_indices_assigned {
            return Err(state_err("potential indices have not been assigned".to_string()));
        }
        if !self.bond_orders.is_empty() && !self.bond_order_indices_assigned {
            return Err(state_err("bond-order indices have not been assigned".to_string()));
        }
        if self.tables.is_none() {
            return Err(state_err("neighbor lists have not been built".to_string()));
        }
        // a degenerate smoothening interval invalidates the observable
        for record in &self.potentials {
            if record.soft_cutoff > record.cutoff {
                return Err(errors::numerical_err(format!(
                    "degenerate smoothening interval ({} > {})",
                    record.soft_cutoff, record.cutoff,
                )));
            }
        }
        Ok(())
    }

    fn run_step(&mut self, kind: CalcKind, comm: &dyn Comm) -> FailResult<Totals> {
        let started = Instant::now();
        self.check_ready()?;

        self.empty_bond_order_storage();
        self.fill_bond_order_storage()?;

        let rank = comm.rank();
        let n_ranks = comm.n_ranks();

        let local = {
            // the loop needs the storage mutably alongside the scene view
            let mut storage = match self.storage.take() {
                Some(storage) => storage,
                None => BondOrderStorage::new(self.atoms.len(), 0, 0)?,
            };
            let cancel = self.cancel.clone();
            let result = (|| {
                let scene = self.scene()?;
                loops::accumulate_local(
                    &scene,
                    &self.potentials,
                    &self.bond_orders,
                    &mut storage,
                    kind,
                    |atom| owns_atom(rank, n_ranks, atom),
                    cancel.as_deref(),
                )
            })();
            self.storage = Some(storage);
            result
        };

        // all ranks must agree on the outcome before reducing
        let local_code = match &local {
            Ok(_) => 0u8,
            Err(error) => error_code(error),
        };
        let global_code = comm.all_reduce_max(local_code)?;
        let mut totals = match local {
            Ok(totals) => {
                if global_code != 0 {
                    return Err(error_from_code(global_code));
                }
                totals
            },
            Err(error) => return Err(error),
        };

        reduce_totals(&mut totals, comm)?;

        // the long-range add-on runs only once short-range succeeded
        if let Some(params) = &self.ewald {
            let cell = self.cell.as_ref().unwrap();
            let positions: Vec<V3> = self.atoms.iter().map(|a| a.position).collect();
            let charges: Vec<f64> = self.atoms.iter().map(|a| a.charge).collect();
            let include = vec![true; self.atoms.len()];
            let long_range = errors::with_kind(
                ErrorKind::Numerical,
                ewald::evaluate(cell, &positions, &charges, &include, params),
            )?;
            totals.energy += long_range.energy;
            for (force, add) in izip!(&mut totals.forces, &long_range.forces) {
                *force += *add;
            }
            for (chi, add) in izip!(&mut totals.chis, &long_range.chis) {
                *chi += *add;
            }
            for (component, add) in izip!(&mut totals.stress, &long_range.stress) {
                *component += *add;
            }
            totals.check_finite()?;
        }

        if let Some(directory) = &self.dump_directory {
            let forces = match kind {
                CalcKind::Forces => Some(&totals.forces[..]),
                _ => None,
            };
            dump::write_dump(directory, rank, self.step, &self.scene()?, forces)?;
        }

        debug!(
            "step {} ({:?}) evaluated in {:.3} ms",
            self.step, kind, started.elapsed().as_secs_f64() * 1e3,
        );
        self.step += 1;
        Ok(totals)
    }

    // -----------------------------------------------------------------
    // lifecycle

    pub fn set_use_rayon(&mut self, use_rayon: bool) {
        self.use_rayon = use_rayon;
    }

    pub fn set_dump_directory(&mut self, directory: Option<PathBuf>) {
        self.dump_directory = directory;
    }

    pub fn set_cancel_flag(&mut self, cancel: Option<Arc<AtomicBool>>) {
        self.cancel = cancel;
    }

    pub fn clear_atoms(&mut self) {
        self.atoms.clear();
        self.tables = None;
        self.storage = None;
        self.potential_indices_assigned = false;
        self.bond_order_indices_assigned = false;
    }

    pub fn clear_potentials(&mut self) {
        self.potentials.clear();
        self.potential_indices_assigned = false;
        for atom in &mut self.atoms {
            atom.potential_indices.clear();
        }
    }

    pub fn clear_bond_order_factors(&mut self) {
        self.bond_orders.clear();
        self.bond_order_indices_assigned = false;
        for atom in &mut self.atoms {
            atom.bond_order_indices.clear();
        }
    }

    pub fn clear_bond_order_storage(&mut self) {
        self.storage = None;
    }

    /// Drop everything: atoms, cell, registries, tables, caches.
    pub fn release_all_memory(&mut self) {
        *self = CoreState::default();
    }
}

fn error_code(error: &failure::Error) -> u8 {
    match errors::kind_of(error) {
        Some(ErrorKind::Configuration) => 1,
        Some(ErrorKind::Resource) => 2,
        Some(ErrorKind::State) => 3,
        Some(ErrorKind::Numerical) => 4,
        Some(ErrorKind::Internal) => 5,
        None => 6,
    }
}

fn error_from_code(code: u8) -> failure::Error {
    let kind = match code {
        1 => ErrorKind::Configuration,
        2 => ErrorKind::Resource,
        3 => ErrorKind::State,
        4 => ErrorKind::Numerical,
        5 => ErrorKind::Internal,
        _ => ErrorKind::Internal,
    };
    format_err!("a peer rank failed the step").context(kind).into()
}

/// Sum the partial totals of all ranks in a fixed flattened layout, with
/// the compensated reduction so totals do not depend on the rank count.
fn reduce_totals(totals: &mut Totals, comm: &dyn Comm) -> FailResult<()> {
    if comm.n_ranks() <= 1 {
        return Ok(());
    }
    let n_atoms = totals.forces.len();
    let mut flat = Vec::with_capacity(7 + 4 * n_atoms);
    flat.push(totals.energy);
    flat.extend_from_slice(&totals.stress);
    for force in &totals.forces {
        flat.extend_from_slice(&force.0);
    }
    flat.extend_from_slice(&totals.chis);

    compensated_all_reduce(comm, &mut flat)?;

    totals.energy = flat[0];
    totals.stress.copy_from_slice(&flat[1..7]);
    for (index, force) in totals.forces.iter_mut().enumerate() {
        let base = 7 + 3 * index;
        *force = V3([flat[base], flat[base + 1], flat[base + 2]]);
    }
    let base = 7 + 3 * n_atoms;
    totals.chis.copy_from_slice(&flat[base..base + n_atoms]);
    Ok(())
}
