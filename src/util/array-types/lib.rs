/* ************************************************************************ **
** This file is part of bopcalc, and is licensed under EITHER the MIT       **
** license or the Apache 2.0 license, at your option.                       **
**                                                                          **
**     http://www.apache.org/licenses/LICENSE-2.0                           **
**     http://opensource.org/licenses/MIT                                   **
** ************************************************************************ */

//! Small fixed-size vector and matrix types for 3D geometry.
//!
//! Vectors are `V3([x, y, z])`; matrices are stored as rows (`M33` is three
//! row `V3`s), and the product `v * m` treats `v` as a row vector, which is
//! the convention used for converting fractional coordinates to cartesian
//! against a row-based cell matrix.

mod types;
mod methods_v;
mod methods_m;
mod ops;

pub use crate::types::{V3, M3, M33};
pub use crate::methods_v::dot;
pub use crate::methods_m::inv;
