/* ************************************************************************ **
** This file is part of bopcalc, and is licensed under EITHER the MIT       **
** license or the Apache 2.0 license, at your option.                       **
**                                                                          **
**     http://www.apache.org/licenses/LICENSE-2.0                           **
**     http://opensource.org/licenses/MIT                                   **
** ************************************************************************ */

//! The evaluation core.
//!
//! [`CoreState`] owns the scene (atoms, cell, neighbor tables), the
//! registries of potential and bond-order records, and the bond-order
//! cache, and exposes the imperative surface for building a system and
//! evaluating energies, forces, electronegativities, and the Voigt stress.
//! All state lives in the `CoreState` value handed to the caller; a
//! single-process program holds exactly one, tests construct many.

#[macro_use] extern crate failure;
#[macro_use] extern crate log;
#[macro_use] extern crate itertools;

pub mod errors;
pub mod atoms;
pub mod registry;
pub mod storage;
pub mod scene;
pub mod gradients;
pub mod loops;
pub mod parallel;
pub mod dump;
pub mod state;

pub use crate::atoms::Atom;
pub use crate::errors::ErrorKind;
pub use crate::loops::{CalcKind, Totals};
pub use crate::parallel::{Comm, SerialComm};
pub use crate::registry::{BondOrderRecord, PotentialRecord, TargetFilter};
pub use crate::state::CoreState;

pub type FailResult<T> = Result<T, failure::Error>;
