use serde::{Deserialize, Serialize};
use std::ops::Sub;

/// Energy terms reported by the minimizer for one stage, in kcal/mol.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct EnergyVector {
    pub complex: f64,
    pub receptor: f64,
    pub peptide: f64,
    pub interaction: f64,
    pub complex_minus_receptor: f64,
}

impl EnergyVector {
    pub fn new(
        complex: f64,
        receptor: f64,
        peptide: f64,
        interaction: f64,
        complex_minus_receptor: f64,
    ) -> Self {
        Self {
            complex,
            receptor,
            peptide,
            interaction,
            complex_minus_receptor,
        }
    }

    /// Relative decrease of the peptide-internal term from `previous` to `self`.
    ///
    /// Positive when the energy went down. The denominator is floored so that a
    /// previous value of zero does not divide by zero.
    pub fn relative_peptide_decrease(&self, previous: &EnergyVector) -> f64 {
        (previous.peptide - self.peptide) / previous.peptide.abs().max(f64::EPSILON)
    }
}

impl Sub for EnergyVector {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self::Output {
        Self {
            complex: self.complex - rhs.complex,
            receptor: self.receptor - rhs.receptor,
            peptide: self.peptide - rhs.peptide,
            interaction: self.interaction - rhs.interaction,
            complex_minus_receptor: self.complex_minus_receptor - rhs.complex_minus_receptor,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn relative_peptide_decrease_is_positive_when_energy_drops() {
        let previous = EnergyVector::new(0.0, 0.0, -100.0, 0.0, 0.0);
        let current = EnergyVector::new(0.0, 0.0, -110.0, 0.0, 0.0);
        assert!((current.relative_peptide_decrease(&previous) - 0.1).abs() < 1e-12);
    }

    #[test]
    fn relative_peptide_decrease_is_negative_when_energy_rises() {
        let previous = EnergyVector::new(0.0, 0.0, 50.0, 0.0, 0.0);
        let current = EnergyVector::new(0.0, 0.0, 60.0, 0.0, 0.0);
        assert!((current.relative_peptide_decrease(&previous) + 0.2).abs() < 1e-12);
    }

    #[test]
    fn relative_peptide_decrease_handles_zero_previous() {
        let previous = EnergyVector::default();
        let current = EnergyVector::new(0.0, 0.0, -1.0, 0.0, 0.0);
        assert!(current.relative_peptide_decrease(&previous).is_finite());
        assert!(current.relative_peptide_decrease(&previous) > 0.0);
    }

    #[test]
    fn sub_differences_each_term() {
        let a = EnergyVector::new(5.0, 4.0, 3.0, 2.0, 1.0);
        let b = EnergyVector::new(1.0, 1.0, 1.0, 1.0, 1.0);
        assert_eq!(a - b, EnergyVector::new(4.0, 3.0, 2.0, 1.0, 0.0));
    }
}
