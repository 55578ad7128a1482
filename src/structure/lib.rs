/* ************************************************************************ **
** This file is part of bopcalc, and is licensed under EITHER the MIT       **
** license or the Apache 2.0 license, at your option.                       **
**                                                                          **
**     http://www.apache.org/licenses/LICENSE-2.0                           **
**     http://opensource.org/licenses/MIT                                   **
** ************************************************************************ */

//! Periodic cell geometry, spatial partitioning, and neighbor tables.

#[macro_use] extern crate failure;
#[macro_use] extern crate log;

pub mod cell;
pub mod order;
pub mod partition;
pub mod neighbor;

pub use crate::cell::Cell;
pub use crate::order::pick;
pub use crate::partition::SubcellGrid;
pub use crate::neighbor::{NeighborTables, build_neighbor_tables};

pub type FailResult<T> = Result<T, failure::Error>;
