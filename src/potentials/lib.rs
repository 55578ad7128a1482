/* ************************************************************************ **
** This file is part of bopcalc, and is licensed under EITHER the MIT       **
** license or the Apache 2.0 license, at your option.                       **
**                                                                          **
**     http://www.apache.org/licenses/LICENSE-2.0                           **
**     http://opensource.org/licenses/MIT                                   **
** ************************************************************************ */

//! The closed catalog of functional forms.
//!
//! This crate owns the math of the individual interactions: potential
//! energy forms and their analytic derivatives, bond-order factor forms,
//! per-atom post-processing scalers, the smoothening switch applied near
//! cutoffs, and the Ewald summation kernel. The evaluation core invokes
//! these through the descriptor tables registered at startup; it never
//! implements the math of any single form itself.

#[macro_use] extern crate failure;
#[macro_use] extern crate log;
#[macro_use] extern crate lazy_static;

pub mod cutoff;
pub mod numerical;
pub mod geometry;
pub mod forms;
pub mod bond_order;
pub mod ewald;

pub type FailResult<T> = Result<T, failure::Error>;
