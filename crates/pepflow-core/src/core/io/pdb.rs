use crate::core::models::atom::AtomRecord;
use nalgebra::Point3;
use phf::{Map, phf_map};
use std::io;
use thiserror::Error;

pub const SEPARATOR_RECORD: &str = "TER";
pub const TERMINATOR_RECORD: &str = "END";

/// Classification of a record by its tag in columns 1-6.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordKind {
    Coordinate,
    Separator,
    Terminator,
    ModelStart,
    ModelEnd,
    Other,
}

static RECORD_KINDS: Map<&'static str, RecordKind> = phf_map! {
    "ATOM" => RecordKind::Coordinate,
    "HETATM" => RecordKind::Coordinate,
    "TER" => RecordKind::Separator,
    "END" => RecordKind::Terminator,
    "MODEL" => RecordKind::ModelStart,
    "ENDMDL" => RecordKind::ModelEnd,
};

#[derive(Debug, Error)]
pub enum PdbError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("Malformed record on line {line}: {kind}")]
    Parse { line: usize, kind: MalformedRecord },
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum MalformedRecord {
    #[error("Invalid integer in columns {columns} (value: '{value}')")]
    InvalidInt {
        columns: &'static str,
        value: String,
    },
    #[error("Invalid float in columns {columns} (value: '{value}')")]
    InvalidFloat {
        columns: &'static str,
        value: String,
    },
    #[error("Required field in columns {columns} is empty")]
    MissingRequiredField { columns: &'static str },
    #[error("Atom name '{atom_name}' appears twice in residue {residue_number}")]
    DuplicateAtomName {
        residue_number: i32,
        atom_name: String,
    },
}

pub fn slice_and_trim(line: &str, start: usize, end: usize) -> &str {
    line.get(start..end.min(line.len()))
        .unwrap_or("")
        .trim()
}

pub fn record_tag(line: &str) -> &str {
    slice_and_trim(line, 0, 6)
}

pub fn record_kind(line: &str) -> RecordKind {
    RECORD_KINDS
        .get(record_tag(line))
        .copied()
        .unwrap_or(RecordKind::Other)
}

pub fn is_coordinate_record(line: &str) -> bool {
    record_kind(line) == RecordKind::Coordinate
}

pub fn is_separator_record(line: &str) -> bool {
    record_kind(line) == RecordKind::Separator
}

/// Parses one ATOM/HETATM line using the fixed column contract.
///
/// `line_number` is 1-based and only used for error reporting; `index` is the
/// record's position among the coordinate records of its stream.
pub fn parse_atom_line(line: &str, line_number: usize, index: usize) -> Result<AtomRecord, PdbError> {
    let fail = |kind| PdbError::Parse {
        line: line_number,
        kind,
    };

    let atom_name = slice_and_trim(line, 12, 16);
    if atom_name.is_empty() {
        return Err(fail(MalformedRecord::MissingRequiredField { columns: "13-16" }));
    }
    let residue_name = slice_and_trim(line, 17, 20);
    if residue_name.is_empty() {
        return Err(fail(MalformedRecord::MissingRequiredField { columns: "18-20" }));
    }

    let res_seq_str = slice_and_trim(line, 22, 26);
    if res_seq_str.is_empty() {
        return Err(fail(MalformedRecord::MissingRequiredField { columns: "23-26" }));
    }
    let residue_number: i32 = res_seq_str.parse().map_err(|_| {
        fail(MalformedRecord::InvalidInt {
            columns: "23-26",
            value: res_seq_str.to_string(),
        })
    })?;

    let coordinate = |start: usize, end: usize, columns: &'static str| {
        let value = slice_and_trim(line, start, end);
        value.parse::<f64>().map_err(|_| {
            fail(MalformedRecord::InvalidFloat {
                columns,
                value: value.to_string(),
            })
        })
    };
    let x = coordinate(30, 38, "31-38")?;
    let y = coordinate(38, 46, "39-46")?;
    let z = coordinate(46, 54, "47-54")?;

    Ok(AtomRecord::new(
        index,
        line_number,
        residue_number,
        residue_name,
        atom_name,
        Point3::new(x, y, z),
        line,
    ))
}

/// Rewrites columns 18-20 of a record, padding short lines with spaces.
pub fn with_residue_name(line: &str, residue_name: &str) -> String {
    let mut padded = line.to_string();
    while padded.len() < 20 {
        padded.push(' ');
    }
    match (padded.get(..17), padded.get(20..)) {
        (Some(head), Some(tail)) => format!("{}{:>3}{}", head, residue_name, tail),
        _ => line.to_string(),
    }
}
