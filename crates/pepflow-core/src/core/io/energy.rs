use crate::core::models::energy::EnergyVector;
use phf::{Map, phf_map};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Term {
    Complex,
    Receptor,
    Peptide,
    Interaction,
    ComplexMinusReceptor,
}

// Keys are labels with non-alphanumerics dropped and lowercased.
static TERM_LABELS: Map<&'static str, Term> = phf_map! {
    "ecomplex" => Term::Complex,
    "ereceptor" => Term::Receptor,
    "epeptide" => Term::Peptide,
    "deinteraction" => Term::Interaction,
    "decomplexreceptor" => Term::ComplexMinusReceptor,
};

#[derive(Debug, Error, PartialEq)]
pub enum EnergyReportError {
    #[error("Energy term '{0}' is missing from the report")]
    MissingTerm(&'static str),
    #[error("Line {line}: invalid value '{value}' for '{label}'")]
    InvalidValue {
        line: usize,
        label: String,
        value: String,
    },
}

fn normalize_label(label: &str) -> String {
    label
        .chars()
        .filter(char::is_ascii_alphanumeric)
        .map(|c| c.to_ascii_lowercase())
        .collect()
}

/// Parses the minimizer's energy report.
///
/// Lines of the form `label = value` or `label: value` are considered; a
/// trailing unit after the value is ignored. All five terms are required. When
/// a term is reported more than once the last occurrence wins.
pub fn parse_energy_report(text: &str) -> Result<EnergyVector, EnergyReportError> {
    let mut values: [Option<f64>; 5] = [None; 5];

    for (line_num, line) in text.lines().enumerate() {
        let Some(split_at) = line.find(['=', ':']) else {
            continue;
        };
        let (label, rest) = line.split_at(split_at);
        let Some(&term) = TERM_LABELS.get(normalize_label(label).as_str()) else {
            continue;
        };
        let token = rest[1..].split_whitespace().next().unwrap_or("");
        let value: f64 = token.parse().map_err(|_| EnergyReportError::InvalidValue {
            line: line_num + 1,
            label: label.trim().to_string(),
            value: token.to_string(),
        })?;
        values[term as usize] = Some(value);
    }

    let get = |term: Term, name: &'static str| {
        values[term as usize].ok_or(EnergyReportError::MissingTerm(name))
    };
    Ok(EnergyVector {
        complex: get(Term::Complex, "E_Complex")?,
        receptor: get(Term::Receptor, "E_Receptor")?,
        peptide: get(Term::Peptide, "E_Peptide")?,
        interaction: get(Term::Interaction, "dE_Interaction")?,
        complex_minus_receptor: get(Term::ComplexMinusReceptor, "dE_Complex-Receptor")?,
    })
}
