use pepflow::engine::config::DockingConfig;
use std::path::PathBuf;

/// Programs resolved from `[tools]` and the built-in defaults.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolPaths {
    pub search: PathBuf,
    pub minimizer: PathBuf,
    pub protonator: PathBuf,
}

#[derive(Debug)]
pub struct AppConfig {
    pub tools: ToolPaths,
    /// One validated configuration per selected target, in file order.
    pub targets: Vec<DockingConfig>,
}
