/* ************************************************************************ **
** This file is part of bopcalc, and is licensed under EITHER the MIT       **
** license or the Apache 2.0 license, at your option.                       **
**                                                                          **
**     http://www.apache.org/licenses/LICENSE-2.0                           **
**     http://opensource.org/licenses/MIT                                   **
** ************************************************************************ */

//! Facade crate re-exporting the evaluation core.
//!
//! The interesting code lives in the workspace members under `src/`; see
//! `bopcalc-core` for the state and evaluation surface, `bopcalc-potentials`
//! for the form catalogs, and `bopcalc-structure` for cells and neighbor
//! tables.

pub use bopcalc_core::{
    Atom, BondOrderRecord, CalcKind, Comm, CoreState, ErrorKind, PotentialRecord, SerialComm,
    TargetFilter, Totals,
};
pub use bopcalc_core::errors::kind_of;
pub use bopcalc_core::parallel::{owns_atom, KahanSum};

pub use bopcalc_array_types::{M3, M33, V3};
pub use bopcalc_potentials::bond_order::Bodies;
pub use bopcalc_potentials::{bond_order, cutoff, ewald, forms, numerical};
pub use bopcalc_structure::{pick, Cell, NeighborTables, SubcellGrid};

pub type FailResult<T> = Result<T, failure::Error>;

pub mod prelude {
    pub use crate::{Atom, CoreState, SerialComm, TargetFilter, V3};
}
