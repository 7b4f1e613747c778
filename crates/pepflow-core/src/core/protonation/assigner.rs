use super::rules::{UNASSIGNED_HISTIDINE, is_delta_hydrogen, is_epsilon_hydrogen};
use crate::core::io::blocks::ResidueBlocksBuilder;
use crate::core::io::pdb::{self, PdbError, RecordKind};
use crate::core::models::residue::ResidueBlock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HistidineState {
    /// Hydrogen on ND1 only.
    Hid,
    /// Hydrogen on NE2 only.
    Hie,
    /// Hydrogens on both ring nitrogens (positively charged).
    Hip,
}

impl HistidineState {
    pub fn residue_name(self) -> &'static str {
        match self {
            Self::Hid => "HID",
            Self::Hie => "HIE",
            Self::Hip => "HIP",
        }
    }
}

impl fmt::Display for HistidineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.residue_name())
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("Unknown histidine state: '{0}'")]
pub struct ParseHistidineStateError(String);

impl FromStr for HistidineState {
    type Err = ParseHistidineStateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "HID" => Ok(Self::Hid),
            "HIE" => Ok(Self::Hie),
            "HIP" => Ok(Self::Hip),
            _ => Err(ParseHistidineStateError(s.to_string())),
        }
    }
}

/// What to do with a histidine that carries neither ring hydrogen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum UnresolvedPolicy {
    /// Label it HID.
    #[default]
    DefaultToHid,
    /// Fail with [`ProtonationError::UnresolvedHistidine`].
    Strict,
}

/// The decision made for one histidine block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProtonationCall {
    pub residue_number: i32,
    pub state: HistidineState,
    pub has_epsilon_hydrogen: bool,
    pub has_delta_hydrogen: bool,
}

impl ProtonationCall {
    /// True when neither ring hydrogen was found and HID was chosen by default.
    pub fn is_defaulted(&self) -> bool {
        !self.has_epsilon_hydrogen && !self.has_delta_hydrogen
    }
}

#[derive(Debug, Error)]
pub enum ProtonationError {
    #[error(transparent)]
    Structure(#[from] PdbError),
    #[error("Histidine {residue_number} (line {line}) carries neither an ND1 nor an NE2 hydrogen")]
    UnresolvedHistidine { residue_number: i32, line: usize },
}

/// Output of [`assign_stream`]: the rewritten file and one call per histidine.
#[derive(Debug, Clone, PartialEq)]
pub struct AssignedStream {
    pub text: String,
    pub calls: Vec<ProtonationCall>,
}

/// Classifies a residue from the names of its atoms.
///
/// Rules, in order: NE2 hydrogen without ND1 hydrogen is HIE; both is HIP;
/// anything else (ND1 only, or neither) is HID.
pub fn classify<'a>(atom_names: impl IntoIterator<Item = &'a str>) -> (HistidineState, bool, bool) {
    let (mut epsilon, mut delta) = (false, false);
    for name in atom_names {
        epsilon |= is_epsilon_hydrogen(name);
        delta |= is_delta_hydrogen(name);
    }
    let state = match (epsilon, delta) {
        (true, false) => HistidineState::Hie,
        (true, true) => HistidineState::Hip,
        _ => HistidineState::Hid,
    };
    (state, epsilon, delta)
}

fn call_for_block(
    block: &ResidueBlock,
    policy: UnresolvedPolicy,
) -> Result<Option<ProtonationCall>, ProtonationError> {
    if block.residue_name() != UNASSIGNED_HISTIDINE {
        return Ok(None);
    }
    let (state, has_epsilon_hydrogen, has_delta_hydrogen) =
        classify(block.atoms().iter().map(|a| a.atom_name()));
    let call = ProtonationCall {
        residue_number: block.residue_number(),
        state,
        has_epsilon_hydrogen,
        has_delta_hydrogen,
    };
    if call.is_defaulted() && policy == UnresolvedPolicy::Strict {
        return Err(ProtonationError::UnresolvedHistidine {
            residue_number: call.residue_number,
            line: block.atoms().first().map_or(0, |a| a.line_number()),
        });
    }
    Ok(Some(call))
}

/// Relabels every unassigned histidine block; other blocks are cloned as is.
pub fn assign_blocks(
    blocks: &[ResidueBlock],
    policy: UnresolvedPolicy,
) -> Result<(Vec<ResidueBlock>, Vec<ProtonationCall>), ProtonationError> {
    let mut assigned = Vec::with_capacity(blocks.len());
    let mut calls = Vec::new();
    for block in blocks {
        match call_for_block(block, policy)? {
            Some(call) => {
                assigned.push(block.renamed(call.state.residue_name()));
                calls.push(call);
            }
            None => assigned.push(block.clone()),
        }
    }
    Ok((assigned, calls))
}

/// Relabels histidines in a coordinate file while keeping every line in place.
///
/// The stream is cut into segments at chain separators and each segment is
/// grouped into residue blocks on its own, so equal residue numbers in
/// different chains never share evidence. Only columns 18-20 of histidine
/// coordinate records change; all other lines are copied through.
pub fn assign_stream(text: &str, policy: UnresolvedPolicy) -> Result<AssignedStream, ProtonationError> {
    let mut segment_of_line: Vec<usize> = Vec::new();
    let mut segments: Vec<ResidueBlocksBuilder> = vec![ResidueBlocksBuilder::new()];

    for (line_num, line) in text.lines().enumerate() {
        match pdb::record_kind(line) {
            RecordKind::Separator | RecordKind::ModelStart | RecordKind::ModelEnd => {
                segments.push(ResidueBlocksBuilder::new());
            }
            RecordKind::Coordinate => {
                if let Some(builder) = segments.last_mut() {
                    builder.push_line(line, line_num + 1)?;
                }
            }
            _ => {}
        }
        segment_of_line.push(segments.len() - 1);
    }

    let mut renames: HashMap<(usize, i32), HistidineState> = HashMap::new();
    let mut calls = Vec::new();
    for (segment_idx, builder) in segments.into_iter().enumerate() {
        for block in builder.build() {
            if let Some(call) = call_for_block(&block, policy)? {
                renames.insert((segment_idx, call.residue_number), call.state);
                calls.push(call);
            }
        }
    }

    let mut output = String::with_capacity(text.len());
    for (line, segment_idx) in text.lines().zip(segment_of_line) {
        let state = pdb::is_coordinate_record(line)
            .then(|| pdb::slice_and_trim(line, 22, 26).parse::<i32>().ok())
            .flatten()
            .filter(|_| pdb::slice_and_trim(line, 17, 20) == UNASSIGNED_HISTIDINE)
            .and_then(|residue_number| renames.get(&(segment_idx, residue_number)));
        match state {
            Some(state) => output.push_str(&pdb::with_residue_name(line, state.residue_name())),
            None => output.push_str(line),
        }
        output.push('\n');
    }

    Ok(AssignedStream {
        text: output,
        calls,
    })
}
