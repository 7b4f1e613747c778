use super::pdb::{self, RecordKind};

/// Extracts up to `count` poses from a multi-pose coordinate file.
///
/// Poses are delimited by MODEL/ENDMDL records and returned in file order,
/// each as a standalone text ending in `END`. A file without MODEL records is
/// treated as a single pose. Poses without coordinate records are skipped.
pub fn extract_poses(text: &str, count: usize) -> Vec<String> {
    let mut poses = Vec::new();
    let mut current: Vec<&str> = Vec::new();
    let mut saw_model = false;

    for line in text.lines() {
        if poses.len() >= count {
            break;
        }
        match pdb::record_kind(line) {
            RecordKind::ModelStart => {
                saw_model = true;
                current.clear();
            }
            RecordKind::ModelEnd => {
                push_pose(&mut poses, &current);
                current.clear();
            }
            RecordKind::Coordinate | RecordKind::Separator => current.push(line),
            RecordKind::Terminator => break,
            RecordKind::Other => {}
        }
    }
    if poses.len() < count && (!saw_model || !current.is_empty()) {
        push_pose(&mut poses, &current);
    }
    poses
}

/// The first pose of a multi-pose file, if any.
pub fn top_pose(text: &str) -> Option<String> {
    extract_poses(text, 1).into_iter().next()
}

fn push_pose(poses: &mut Vec<String>, lines: &[&str]) {
    if !lines.iter().any(|l| pdb::is_coordinate_record(l)) {
        return;
    }
    let mut pose = String::new();
    for line in lines {
        pose.push_str(line);
        pose.push('\n');
    }
    pose.push_str(pdb::TERMINATOR_RECORD);
    pose.push('\n');
    poses.push(pose);
}
