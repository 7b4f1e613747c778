use phf::{Set, phf_set};

/// Residue name given to histidines whose tautomer has not been decided.
pub const UNASSIGNED_HISTIDINE: &str = "HIS";

/// Names under which the hydrogen on NE2 appears across naming conventions.
pub static EPSILON_HYDROGEN_NAMES: Set<&'static str> = phf_set! {
    "HE2", "HNE2", "HSE", "2HNE",
};

/// Names under which the hydrogen on ND1 appears across naming conventions.
pub static DELTA_HYDROGEN_NAMES: Set<&'static str> = phf_set! {
    "HD1", "HND1", "HSD", "1HND",
};

pub fn is_epsilon_hydrogen(atom_name: &str) -> bool {
    EPSILON_HYDROGEN_NAMES.contains(atom_name.trim())
}

pub fn is_delta_hydrogen(atom_name: &str) -> bool {
    DELTA_HYDROGEN_NAMES.contains(atom_name.trim())
}
