/* ************************************************************************ **
** This file is part of bopcalc, and is licensed under EITHER the MIT       **
** license or the Apache 2.0 license, at your option.                       **
**                                                                          **
**     http://www.apache.org/licenses/LICENSE-2.0                           **
**     http://opensource.org/licenses/MIT                                   **
** ************************************************************************ */

use bopcalc_array_types::V3;
use std::fmt;

/// One atom of the scene.
///
/// Atoms live in a contiguous arena inside the core state and are referred
/// to everywhere by their dense index, which never changes over a run.
/// Positions and charges mutate between calculation steps; the target index
/// lists are populated by the `assign_*_indices` operations.
#[derive(Debug, Clone, PartialEq)]
pub struct Atom {
    /// Chemical symbol.
    pub symbol: String,
    /// Free-form integer label.
    pub tag: i32,
    pub mass: f64,
    pub charge: f64,
    pub position: V3,
    pub momentum: V3,
    /// Indices of potential records whose first-position target accepts
    /// this atom.
    pub potential_indices: Vec<usize>,
    /// Same, for bond-order factor records.
    pub bond_order_indices: Vec<usize>,
}

impl Atom {
    pub fn new(symbol: impl Into<String>, position: V3) -> Atom {
        Atom {
            symbol: symbol.into(),
            tag: 0,
            mass: 0.0,
            charge: 0.0,
            position,
            momentum: V3::zero(),
            potential_indices: vec![],
            bond_order_indices: vec![],
        }
    }

    pub fn with_charge(self, charge: f64) -> Atom {
        Atom { charge, ..self }
    }

    pub fn with_tag(self, tag: i32) -> Atom {
        Atom { tag, ..self }
    }

    pub fn with_mass(self, mass: f64) -> Atom {
        Atom { mass, ..self }
    }
}

impl fmt::Display for Atom {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f, "{:2} tag {:3} q {:+.4} at [{:.6}, {:.6}, {:.6}]",
            self.symbol, self.tag, self.charge,
            self.position[0], self.position[1], self.position[2],
        )
    }
}
