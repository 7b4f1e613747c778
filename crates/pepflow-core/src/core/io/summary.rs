use serde::{Deserialize, Serialize};
use thiserror::Error;

/// One ranked pose listed in a search replicate's summary table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PoseSummary {
    pub rank: usize,
    pub affinity: f64,
    pub cluster_metric: Option<f64>,
    pub reference_rmsd: Option<f64>,
    pub contact_fraction: Option<f64>,
    pub cluster_size: Option<usize>,
    pub best_run: Option<String>,
}

#[derive(Debug, Error, PartialEq)]
pub enum SummaryError {
    #[error("No ranked-pose table header (a line starting with 'mode') was found")]
    MissingHeader,
    #[error("Required column '{0}' is missing from the table header")]
    MissingColumn(&'static str),
    #[error("Row {row}: invalid value '{value}' for column '{column}'")]
    InvalidValue {
        row: usize,
        column: &'static str,
        value: String,
    },
    #[error("The table lists no poses")]
    Empty,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Column {
    Rank,
    Affinity,
    ClusterMetric,
    ReferenceRmsd,
    ContactFraction,
    ClusterSize,
    BestRun,
}

impl Column {
    fn classify(label: &str) -> Option<Self> {
        let has = |needle: &str| label.contains(needle);
        if label == "mode" {
            Some(Self::Rank)
        } else if label.starts_with("affinity") {
            Some(Self::Affinity)
        } else if has("ref") && has("fnc") {
            Some(Self::ContactFraction)
        } else if has("ref") && has("rmsd") {
            Some(Self::ReferenceRmsd)
        } else if has("clust") && has("size") {
            Some(Self::ClusterSize)
        } else if has("clust") && (has("rmsd") || has("fnc")) {
            Some(Self::ClusterMetric)
        } else if has("best") && has("run") {
            Some(Self::BestRun)
        } else {
            None
        }
    }

    fn name(self) -> &'static str {
        match self {
            Self::Rank => "mode",
            Self::Affinity => "affinity",
            Self::ClusterMetric => "clust. rmsd",
            Self::ReferenceRmsd => "ref. rmsd",
            Self::ContactFraction => "ref. fnc",
            Self::ClusterSize => "clust. size",
            Self::BestRun => "best run",
        }
    }
}

fn header_cells(line: &str) -> Vec<String> {
    line.split('|')
        .map(|cell| cell.trim().to_ascii_lowercase())
        .collect()
}

fn column_layout(first: &str, second: Option<&str>) -> Vec<Option<Column>> {
    let top = header_cells(first);
    let bottom = second.map(header_cells).unwrap_or_default();
    (0..top.len().max(bottom.len()))
        .map(|i| {
            let a = top.get(i).map_or("", String::as_str);
            let b = bottom.get(i).map_or("", String::as_str);
            let label = format!("{} {}", a, b);
            let label = label.split_whitespace().collect::<Vec<_>>().join(" ");
            Column::classify(&label)
        })
        .collect()
}

fn optional<T: std::str::FromStr>(
    token: Option<&str>,
    row: usize,
    column: Column,
) -> Result<Option<T>, SummaryError> {
    match token {
        None | Some("NA") | Some("-") => Ok(None),
        Some(value) => value
            .parse()
            .map(Some)
            .map_err(|_| SummaryError::InvalidValue {
                row,
                column: column.name(),
                value: value.to_string(),
            }),
    }
}

/// Parses the ranked-pose table printed by the search tool.
///
/// The header spans one or two `|`-separated lines whose cells are joined per
/// column to form labels (`affinity (kcal/mol)`, `ref. rmsd`, `ref. fnc`, ...).
/// Data rows follow a dashed rule and are whitespace separated; the table ends
/// at the first blank line or row whose first token is not a rank.
pub fn parse_summary(text: &str) -> Result<Vec<PoseSummary>, SummaryError> {
    let lines: Vec<&str> = text.lines().collect();
    let header_idx = lines
        .iter()
        .position(|l| l.trim_start().starts_with("mode") && l.contains('|'))
        .ok_or(SummaryError::MissingHeader)?;

    let second = lines
        .get(header_idx + 1)
        .filter(|l| l.contains('|') && !l.trim_start().starts_with('-'))
        .copied();
    let layout = column_layout(lines[header_idx], second);

    let find = |wanted: Column| layout.iter().position(|c| *c == Some(wanted));
    let rank_col = find(Column::Rank).ok_or(SummaryError::MissingColumn("mode"))?;
    let affinity_col = find(Column::Affinity).ok_or(SummaryError::MissingColumn("affinity"))?;

    let rule_idx = lines
        .iter()
        .enumerate()
        .skip(header_idx + 1)
        .find(|(_, l)| l.trim_start().starts_with('-'))
        .map_or(header_idx + 1, |(i, _)| i);

    let mut poses = Vec::new();
    for (row, line) in lines.iter().enumerate().skip(rule_idx + 1) {
        let tokens: Vec<&str> = line.split_whitespace().collect();
        let Some(first) = tokens.get(rank_col) else {
            break;
        };
        let Ok(rank) = first.parse::<usize>() else {
            break;
        };
        let row = row + 1;

        let affinity_token = tokens.get(affinity_col).copied();
        let affinity = optional::<f64>(affinity_token, row, Column::Affinity)?.ok_or_else(|| {
            SummaryError::InvalidValue {
                row,
                column: Column::Affinity.name(),
                value: affinity_token.unwrap_or("").to_string(),
            }
        })?;

        let cell = |column: Column| find(column).and_then(|i| tokens.get(i).copied());
        poses.push(PoseSummary {
            rank,
            affinity,
            cluster_metric: optional(cell(Column::ClusterMetric), row, Column::ClusterMetric)?,
            reference_rmsd: optional(cell(Column::ReferenceRmsd), row, Column::ReferenceRmsd)?,
            contact_fraction: optional(
                cell(Column::ContactFraction),
                row,
                Column::ContactFraction,
            )?,
            cluster_size: optional(cell(Column::ClusterSize), row, Column::ClusterSize)?,
            best_run: cell(Column::BestRun).map(str::to_string),
        });
    }

    if poses.is_empty() {
        return Err(SummaryError::Empty);
    }
    Ok(poses)
}
