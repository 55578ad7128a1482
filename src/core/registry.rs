/* ************************************************************************ **
** This file is part of bopcalc, and is licensed under EITHER the MIT       **
** license or the Apache 2.0 license, at your option.                       **
**                                                                          **
**     http://www.apache.org/licenses/LICENSE-2.0                           **
**     http://opensource.org/licenses/MIT                                   **
** ************************************************************************ */

//! Registries of potential and bond-order records.
//!
//! Records are created from user input at registration time, where target
//! lists are validated and expanded over their permutations (a pair record
//! for `[Si, O]` also yields one for `[O, Si]`, and chain records also get
//! their reversal). The original, unpermuted target list is retained in
//! each record so that asymmetric forms can still single out their
//! distinguished atom during evaluation. The hot loop never re-permutes.

use crate::atoms::Atom;
use crate::errors::config_err;
use crate::FailResult;
use bopcalc_potentials::bond_order::{self, Bodies};
use bopcalc_potentials::forms;
use enum_map::EnumMap;

/// Per-position element / tag / index filters of a target list.
///
/// An empty list at a position accepts any atom in that respect; a
/// non-empty list is a whitelist. All three axes must pass.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TargetFilter {
    pub elements: Vec<Vec<String>>,
    pub tags: Vec<Vec<i32>>,
    pub indices: Vec<Vec<usize>>,
}

impl TargetFilter {
    /// A filter with exactly one acceptable element per position.
    pub fn of_elements(symbols: &[&str]) -> TargetFilter {
        TargetFilter {
            elements: symbols.iter().map(|s| vec![s.to_string()]).collect(),
            tags: vec![vec![]; symbols.len()],
            indices: vec![vec![]; symbols.len()],
        }
    }

    pub fn n_positions(&self) -> usize { self.elements.len() }

    fn validate(&self, n_targets: usize) -> FailResult<()> {
        if self.elements.len() != n_targets
            || self.tags.len() != n_targets
            || self.indices.len() != n_targets
        {
            return Err(config_err(format!(
                "target filter has arity {}/{}/{} but the form takes {} targets",
                self.elements.len(), self.tags.len(), self.indices.len(), n_targets,
            )));
        }
        Ok(())
    }

    /// Whether the filter at `position` accepts the given atom.
    pub fn accepts(&self, position: usize, atom: &Atom, atom_index: usize) -> bool {
        let elements = &self.elements[position];
        let tags = &self.tags[position];
        let indices = &self.indices[position];
        (elements.is_empty() || elements.iter().any(|s| *s == atom.symbol))
            && (tags.is_empty() || tags.contains(&atom.tag))
            && (indices.is_empty() || indices.contains(&atom_index))
    }

    fn reversed(&self) -> TargetFilter {
        let mut out = self.clone();
        out.elements.reverse();
        out.tags.reverse();
        out.indices.reverse();
        out
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PotentialRecord {
    /// Index into the startup form table.
    pub form: usize,
    pub parameters: Vec<f64>,
    pub cutoff: f64,
    /// Nonpositive disables smoothening.
    pub soft_cutoff: f64,
    /// The permuted filter this record checks positionally.
    pub filter: TargetFilter,
    /// The unpermuted filter as the user registered it.
    pub original_filter: TargetFilter,
    /// Bond-order group modulating this record, if any.
    pub group: Option<i32>,
}

impl PotentialRecord {
    #[inline]
    pub fn form(&self) -> &'static forms::PotentialForm { forms::form(self.form) }

    #[inline]
    pub fn n_targets(&self) -> usize { self.form().n_targets }

    /// Positional match of a chain of atoms against this record, including
    /// the central-atom check for asymmetric forms.
    pub fn matches_chain(&self, atoms: &[Atom], chain: &[usize]) -> bool {
        if chain.len() != self.n_targets() {
            return false;
        }
        let positional = chain.iter().enumerate()
            .all(|(pos, &atom)| self.filter.accepts(pos, &atoms[atom], atom));
        if !positional {
            return false;
        }
        if self.form().asymmetric && chain.len() == 3 {
            // the center of the chain must be acceptable at the center of
            // the original, unpermuted target list
            let center = chain[1];
            if !self.original_filter.accepts(1, &atoms[center], center) {
                return false;
            }
        }
        true
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BondOrderRecord {
    /// Index into the startup bond-order form table.
    pub form: usize,
    /// Parameters, split by the body count of the term they govern.
    pub parameters: EnumMap<Bodies, Vec<f64>>,
    pub cutoff: f64,
    pub soft_cutoff: f64,
    pub filter: TargetFilter,
    pub original_filter: TargetFilter,
    /// Records sharing a group id sum into one additive factor.
    pub group: i32,
}

impl BondOrderRecord {
    #[inline]
    pub fn form(&self) -> &'static bond_order::BondOrderForm { bond_order::form(self.form) }

    #[inline]
    pub fn n_targets(&self) -> usize { self.form().n_targets }

    #[inline]
    pub fn is_scaler(&self) -> bool { self.form().scaler }

    pub fn params_for(&self, bodies: Bodies) -> &[f64] { &self.parameters[bodies] }

    pub fn matches_chain(&self, atoms: &[Atom], chain: &[usize]) -> bool {
        chain.len() == self.n_targets()
            && chain.iter().enumerate()
                .all(|(pos, &atom)| self.filter.accepts(pos, &atoms[atom], atom))
    }
}

/// Validate user input and produce the expanded potential records.
pub fn make_potential_records(
    name: &str,
    parameters: Vec<f64>,
    cutoff: f64,
    soft_cutoff: f64,
    filter: TargetFilter,
    group: Option<i32>,
) -> FailResult<Vec<PotentialRecord>> {
    let tag = forms::form_index(name)
        .ok_or_else(|| config_err(format!("no such potential form: {:?}", name)))?;
    let form = forms::form(tag);

    filter.validate(form.n_targets)?;
    if parameters.len() != form.param_names.len() {
        return Err(config_err(format!(
            "form {:?} takes parameters {:?}, got {} values",
            name, form.param_names, parameters.len(),
        )));
    }
    if form.n_targets > 1 && cutoff <= 0.0 {
        return Err(config_err(format!(
            "cutoff for {:?} must be positive (got {})", name, cutoff,
        )));
    }

    let make = |permuted: TargetFilter| PotentialRecord {
        form: tag,
        parameters: parameters.clone(),
        cutoff,
        soft_cutoff,
        filter: permuted,
        original_filter: filter.clone(),
        group,
    };

    let mut records = vec![make(filter.clone())];
    let reversed = filter.reversed();
    if reversed != filter {
        records.push(make(reversed));
    }
    Ok(records)
}

/// Validate user input and produce the expanded bond-order records.
pub fn make_bond_order_records(
    name: &str,
    parameters: EnumMap<Bodies, Vec<f64>>,
    cutoff: f64,
    soft_cutoff: f64,
    filter: TargetFilter,
    group: i32,
) -> FailResult<Vec<BondOrderRecord>> {
    let tag = bond_order::form_index(name)
        .ok_or_else(|| config_err(format!("no such bond-order form: {:?}", name)))?;
    let form = bond_order::form(tag);

    filter.validate(form.n_targets)?;
    for bodies in Bodies::iter_all() {
        let expected = form.param_names[bodies].len();
        if parameters[bodies].len() != expected {
            return Err(config_err(format!(
                "bond-order form {:?} takes {}-body parameters {:?}, got {} values",
                name, bodies.n(), form.param_names[bodies], parameters[bodies].len(),
            )));
        }
    }
    if cutoff <= 0.0 {
        return Err(config_err(format!(
            "cutoff for bond-order form {:?} must be positive (got {})", name, cutoff,
        )));
    }

    let make = |permuted: TargetFilter| BondOrderRecord {
        form: tag,
        parameters: parameters.clone(),
        cutoff,
        soft_cutoff,
        filter: permuted,
        original_filter: filter.clone(),
        group,
    };

    let mut records = vec![make(filter.clone())];
    let reversed = filter.reversed();
    if reversed != filter {
        records.push(make(reversed));
    }
    Ok(records)
}

/// The indices of records whose first-position target accepts the atom.
pub fn indices_targeting_first<R>(
    records: &[R],
    filter_of: impl Fn(&R) -> &TargetFilter,
    atom: &Atom,
    atom_index: usize,
) -> Vec<usize> {
    records.iter().enumerate()
        .filter(|(_, record)| filter_of(record).accepts(0, atom, atom_index))
        .map(|(index, _)| index)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::{kind_of, ErrorKind};
    use bopcalc_array_types::V3;
    use enum_map::enum_map;

    fn atom(symbol: &str) -> Atom { Atom::new(symbol, V3::zero()) }

    #[test]
    fn pair_targets_expand_both_ways() {
        let records = make_potential_records(
            "lennard-jones", vec![1.0, 1.0], 2.5, 0.0,
            TargetFilter::of_elements(&["Si", "O"]), None,
        ).unwrap();
        assert_eq!(records.len(), 2);

        let atoms = vec![atom("Si"), atom("O")];
        assert!(records[0].matches_chain(&atoms, &[0, 1]));
        assert!(records[1].matches_chain(&atoms, &[1, 0]));
        assert!(!records[0].matches_chain(&atoms, &[1, 0]));
        // both records remember the same original ordering
        assert_eq!(records[0].original_filter, records[1].original_filter);
    }

    #[test]
    fn palindromic_targets_do_not_duplicate() {
        let records = make_potential_records(
            "lennard-jones", vec![1.0, 1.0], 2.5, 0.0,
            TargetFilter::of_elements(&["O", "O"]), None,
        ).unwrap();
        assert_eq!(records.len(), 1);
    }

    #[test]
    fn asymmetric_center_is_filtered_by_original_order() {
        // bond bending around Si: H-Si-H chains only
        let records = make_potential_records(
            "bond-bending", vec![1.0, 1.9], 2.0, 0.0,
            TargetFilter::of_elements(&["H", "Si", "H"]), None,
        ).unwrap();

        let atoms = vec![atom("H"), atom("Si"), atom("H")];
        assert!(records[0].matches_chain(&atoms, &[0, 1, 2]));

        // a chain with Si at an end never matches
        let atoms = vec![atom("Si"), atom("H"), atom("H")];
        for record in &records {
            assert!(!record.matches_chain(&atoms, &[0, 1, 2]));
            assert!(!record.matches_chain(&atoms, &[2, 1, 0]));
        }
    }

    #[test]
    fn unknown_form_is_a_configuration_error() {
        let result = make_potential_records(
            "bogus", vec![], 1.0, 0.0, TargetFilter::of_elements(&["X"]), None,
        );
        assert_eq!(kind_of(&result.unwrap_err()), Some(ErrorKind::Configuration));
    }

    #[test]
    fn wrong_arity_is_a_configuration_error() {
        let result = make_potential_records(
            "lennard-jones", vec![1.0, 1.0], 2.5, 0.0,
            TargetFilter::of_elements(&["Si"]), None,
        );
        assert_eq!(kind_of(&result.unwrap_err()), Some(ErrorKind::Configuration));

        let result = make_potential_records(
            "lennard-jones", vec![1.0], 2.5, 0.0,
            TargetFilter::of_elements(&["Si", "O"]), None,
        );
        assert_eq!(kind_of(&result.unwrap_err()), Some(ErrorKind::Configuration));
    }

    #[test]
    fn nonpositive_cutoff_is_rejected() {
        let result = make_potential_records(
            "lennard-jones", vec![1.0, 1.0], 0.0, 0.0,
            TargetFilter::of_elements(&["Si", "O"]), None,
        );
        assert_eq!(kind_of(&result.unwrap_err()), Some(ErrorKind::Configuration));
    }

    #[test]
    fn empty_filter_position_accepts_anything() {
        let mut filter = TargetFilter::of_elements(&["Si", "O"]);
        filter.elements[1].clear();
        let records = make_potential_records(
            "lennard-jones", vec![1.0, 1.0], 2.5, 0.0, filter, None,
        ).unwrap();
        let atoms = vec![atom("Si"), atom("Xx")];
        assert!(records[0].matches_chain(&atoms, &[0, 1]));
    }

    #[test]
    fn tag_and_index_filters_restrict() {
        let mut filter = TargetFilter::of_elements(&["Si", "Si"]);
        filter.tags[0] = vec![7];
        let records = make_potential_records(
            "spring", vec![1.0, 1.0], 2.5, 0.0, filter, None,
        ).unwrap();

        let tagged = atom("Si").with_tag(7);
        let plain = atom("Si");
        assert!(records[0].filter.accepts(0, &tagged, 0));
        assert!(!records[0].filter.accepts(0, &plain, 0));
    }

    #[test]
    fn bond_order_param_split_is_validated() {
        let bad = make_bond_order_records(
            "neighbors",
            enum_map! { _ => vec![] },
            1.5, 0.0, TargetFilter::of_elements(&["Cu", "O"]), 1,
        );
        assert_eq!(kind_of(&bad.unwrap_err()), Some(ErrorKind::Configuration));

        let good = make_bond_order_records(
            "neighbors",
            enum_map! { Bodies::Two => vec![0.5], _ => vec![] },
            1.5, 0.0, TargetFilter::of_elements(&["Cu", "O"]), 1,
        );
        assert_eq!(good.unwrap().len(), 2);
    }

    #[test]
    fn first_position_indexing() {
        let records = make_potential_records(
            "lennard-jones", vec![1.0, 1.0], 2.5, 0.0,
            TargetFilter::of_elements(&["Si", "O"]), None,
        ).unwrap();
        let si = atom("Si");
        let indices = indices_targeting_first(&records, |r| &r.filter, &si, 0);
        assert_eq!(indices, vec![0]);
        let o = atom("O");
        let indices = indices_targeting_first(&records, |r| &r.filter, &o, 1);
        assert_eq!(indices, vec![1]);
    }
}
