use crate::core::models::atom::AtomRecord;
use nalgebra::{Point3, distance_squared};
use std::collections::HashMap;

type AtomKey<'a> = (i32, &'a str, usize);

// Repeated (residue, atom) pairs, e.g. receptor and peptide both numbered
// from 1, are told apart by their occurrence count.
fn keyed_positions<'a>(atoms: &'a [AtomRecord]) -> HashMap<AtomKey<'a>, &'a Point3<f64>> {
    let mut seen: HashMap<(i32, &str), usize> = HashMap::new();
    atoms
        .iter()
        .map(|atom| {
            let occurrence = seen
                .entry((atom.residue_number(), atom.atom_name()))
                .or_insert(0);
            let key = (atom.residue_number(), atom.atom_name(), *occurrence);
            *occurrence += 1;
            (key, atom.position())
        })
        .collect()
}

/// Root-mean-square displacement between two poses of the same structure.
///
/// Atoms are matched by residue number, atom name and occurrence order;
/// atoms present in only one pose are ignored. Returns `None` when the poses
/// share no atoms.
pub fn coordinate_drift(before: &[AtomRecord], after: &[AtomRecord]) -> Option<f64> {
    let before_positions = keyed_positions(before);
    let (sum, count) = keyed_positions(after)
        .into_iter()
        .filter_map(|(key, p)| before_positions.get(&key).map(|q| distance_squared(p, *q)))
        .fold((0.0, 0usize), |(sum, n), d2| (sum + d2, n + 1));
    (count > 0).then(|| (sum / count as f64).sqrt())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn atom(index: usize, residue: i32, name: &str, position: Point3<f64>) -> AtomRecord {
        AtomRecord::new(index, index + 1, residue, "GLY", name, position, "")
    }

    #[test]
    fn identical_poses_have_zero_drift() {
        let pose = vec![
            atom(0, 1, "N", Point3::new(0.0, 0.0, 0.0)),
            atom(1, 1, "CA", Point3::new(1.5, 0.0, 0.0)),
        ];
        assert_eq!(coordinate_drift(&pose, &pose), Some(0.0));
    }

    #[test]
    fn uniform_translation_yields_translation_length() {
        let before = vec![
            atom(0, 1, "N", Point3::new(0.0, 0.0, 0.0)),
            atom(1, 1, "CA", Point3::new(1.5, 0.0, 0.0)),
        ];
        let after = vec![
            atom(0, 1, "N", Point3::new(0.0, 3.0, 4.0)),
            atom(1, 1, "CA", Point3::new(1.5, 3.0, 4.0)),
        ];
        let drift = coordinate_drift(&before, &after).unwrap();
        assert!((drift - 5.0).abs() < 1e-12);
    }

    #[test]
    fn repeated_residue_numbers_are_matched_by_occurrence() {
        let before = vec![
            atom(0, 1, "N", Point3::new(0.0, 0.0, 0.0)),
            atom(1, 1, "N", Point3::new(10.0, 0.0, 0.0)),
        ];
        let after = vec![
            atom(0, 1, "N", Point3::new(0.0, 0.0, 0.0)),
            atom(1, 1, "N", Point3::new(10.0, 0.0, 0.0)),
        ];
        assert_eq!(coordinate_drift(&before, &after), Some(0.0));
    }

    #[test]
    fn atoms_missing_from_one_pose_are_ignored() {
        let before = vec![atom(0, 1, "N", Point3::origin())];
        let after = vec![
            atom(0, 1, "N", Point3::new(2.0, 0.0, 0.0)),
            atom(1, 1, "H", Point3::new(9.0, 9.0, 9.0)),
        ];
        assert_eq!(coordinate_drift(&before, &after), Some(2.0));
    }

    #[test]
    fn disjoint_poses_have_no_drift() {
        let before = vec![atom(0, 1, "N", Point3::origin())];
        let after = vec![atom(0, 2, "N", Point3::origin())];
        assert_eq!(coordinate_drift(&before, &after), None);
    }
}
