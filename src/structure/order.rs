/* ************************************************************************ **
** This file is part of bopcalc, and is licensed under EITHER the MIT       **
** license or the Apache 2.0 license, at your option.                       **
**                                                                          **
**     http://www.apache.org/licenses/LICENSE-2.0                           **
**     http://opensource.org/licenses/MIT                                   **
** ************************************************************************ */

//! The global pair-orientation rule.
//!
//! Every interacting pair can be described from either of its ends; the
//! neighbor tables deliberately store both directed entries so that any
//! atom's surroundings can be walked locally. Enumeration therefore needs
//! one fixed, global rule for which of the two descriptions is *the* pair,
//! and the same rule doubles as the tie-breaker whenever a walk would
//! otherwise discover a tuple once per end.

use bopcalc_array_types::V3;

/// Whether the directed description `(from, to, offset)` is the one the
/// enumeration keeps.
///
/// `offset` counts the cell vectors separating the interacting image of
/// `to` from the primary image of `from`. For any two distinct atom images
/// exactly one of `pick(i, j, off)` and `pick(j, i, -off)` holds:
///
/// * between different atoms, the lower index leads;
/// * between two images of the same atom, the kept direction is the one
///   whose offset leaves the primary cell positively, judged by the first
///   nonzero component.
///
/// # Panics
///
/// An atom paired with its own primary image (`from == to` with a zero
/// offset) is not a pair at all; well-formed neighbor tables never contain
/// such an entry, and this panics to keep it that way.
pub fn pick(from: usize, to: usize, offset: V3<i32>) -> bool {
    if from != to {
        return from < to;
    }
    match offset.iter().find(|&&component| component != 0) {
        Some(&component) => component > 0,
        None => panic!("an atom cannot pair with its own primary image"),
    }
}
