use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

const HELP_TEMPLATE: &str = "\
{before-help}{name} {version}
{author-with-newline}{about-with-newline}
{usage-heading} {usage}

{all-args}{after-help}
";

#[derive(Parser, Debug)]
#[command(
    version,
    about = "pepflow - orchestrates peptide-protein docking: structure preparation, replicate searches with reference propagation and staged minimization.",
    help_template = HELP_TEMPLATE,
)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Increase verbosity level (-v for INFO, -vv for DEBUG, -vvv for TRACE)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all log output
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Write logs to a specified file in addition to the console output
    #[arg(long, global = true, value_name = "PATH")]
    pub log_file: Option<PathBuf>,

    /// Set the number of threads used to run targets in parallel.
    /// Defaults to the number of available logical cores.
    #[arg(short = 'j', long, global = true, value_name = "NUM")]
    pub threads: Option<usize>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Merge a receptor and a peptide into one complex file.
    Assemble(AssembleArgs),
    /// Assign histidine protonation states from the hydrogens present in a structure.
    Protonate(ProtonateArgs),
    /// Assemble, protonate with the external tool, split and label histidines per role.
    Prepare(PrepareArgs),
    /// Run replicate searches and staged minimization for the configured targets.
    Dock(DockArgs),
    /// Run only the staged minimization on one pose of a configured target.
    Minimize(MinimizeArgs),
}

#[derive(Args, Debug)]
pub struct AssembleArgs {
    /// Receptor coordinate file (PDB).
    #[arg(short, long, required = true, value_name = "PATH")]
    pub receptor: PathBuf,

    /// Peptide coordinate file (PDB).
    #[arg(short, long, required = true, value_name = "PATH")]
    pub ligand: PathBuf,

    /// Path for the assembled complex.
    #[arg(short, long, required = true, value_name = "PATH")]
    pub output: PathBuf,
}

#[derive(Args, Debug)]
pub struct ProtonateArgs {
    /// Protonated input structure (PDB).
    #[arg(short, long, required = true, value_name = "PATH")]
    pub input: PathBuf,

    /// Path for the relabeled structure.
    #[arg(short, long, required = true, value_name = "PATH")]
    pub output: PathBuf,

    /// Fail on histidines without ring hydrogens instead of labeling them HID.
    #[arg(long)]
    pub strict: bool,
}

#[derive(Args, Debug)]
pub struct PrepareArgs {
    /// Receptor coordinate file (PDB).
    #[arg(short, long, required = true, value_name = "PATH")]
    pub receptor: PathBuf,

    /// Peptide coordinate file (PDB).
    #[arg(short, long, required = true, value_name = "PATH")]
    pub ligand: PathBuf,

    /// Directory receiving the prepared files.
    #[arg(short = 'd', long = "output-dir", required = true, value_name = "DIR")]
    pub output_dir: PathBuf,

    /// Configuration file providing the protonation tool.
    #[arg(short, long, required = true, value_name = "PATH")]
    pub config: PathBuf,

    #[command(flatten)]
    pub flip: FlipChoice,

    /// Fail on histidines without ring hydrogens instead of labeling them HID.
    #[arg(long)]
    pub strict: bool,
}

/// Mutually exclusive flags forwarded to the protonation tool.
#[derive(Args, Debug, Clone, Copy)]
#[group(required = false, multiple = false)]
pub struct FlipChoice {
    /// Allow side-chain flips while protonating.
    #[arg(long)]
    pub flip: bool,
    /// Forbid side-chain flips while protonating.
    #[arg(long)]
    pub no_flip: bool,
}

impl FlipChoice {
    pub fn as_option(self) -> Option<bool> {
        match (self.flip, self.no_flip) {
            (true, false) => Some(true),
            (false, true) => Some(false),
            _ => None,
        }
    }
}

#[derive(Args, Debug, Default)]
pub struct DockArgs {
    /// Path to the configuration file in TOML format.
    #[arg(short, long, required = true, value_name = "PATH")]
    pub config: PathBuf,

    /// Dock only the named target (may be repeated). Defaults to all targets.
    #[arg(short, long = "target", value_name = "NAME")]
    pub targets: Vec<String>,

    #[command(flatten)]
    pub overrides: SearchOverrides,
}

/// Command-line overrides of the `[search]` table.
#[derive(Args, Debug, Default, Clone)]
pub struct SearchOverrides {
    /// Override the number of reference-propagating replicates.
    #[arg(long, value_name = "INT")]
    pub replicates: Option<usize>,

    /// Override the number of independent runs per search.
    #[arg(long, value_name = "INT")]
    pub runs: Option<usize>,

    /// Override the number of steps per run.
    #[arg(long, value_name = "INT")]
    pub steps: Option<u64>,

    /// Override the number of worker threads given to the search tool.
    #[arg(long, value_name = "INT")]
    pub workers: Option<usize>,

    /// Override the contact occupancy cutoff of the refinement search.
    #[arg(long, value_name = "FLOAT")]
    pub contact_cutoff: Option<f64>,

    /// Abort when two replicates tie on affinity.
    #[arg(long)]
    pub strict_ties: bool,

    /// Set a specific configuration value, overriding the config file.
    /// Can be used multiple times. Example: -S search.runs=8
    #[arg(short = 'S', long = "set", value_name = "KEY=VALUE", num_args(0..))]
    pub set_values: Vec<String>,
}

#[derive(Args, Debug)]
pub struct MinimizeArgs {
    /// Path to the configuration file in TOML format.
    #[arg(short, long, required = true, value_name = "PATH")]
    pub config: PathBuf,

    /// Pose to minimize (PDB).
    #[arg(short, long, required = true, value_name = "PATH")]
    pub input: PathBuf,

    /// Configured target providing the preparation file and working directory.
    #[arg(short, long, required = true, value_name = "NAME")]
    pub target: String,

    /// Set a specific configuration value, overriding the config file.
    #[arg(short = 'S', long = "set", value_name = "KEY=VALUE", num_args(0..))]
    pub set_values: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_definition_is_consistent() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn dock_accepts_overrides_and_repeated_targets() {
        let cli = Cli::parse_from([
            "pepflow", "-vv", "dock", "-c", "run.toml", "--target", "a", "--target", "b",
            "--runs", "8", "--strict-ties", "-S", "search.steps=500",
        ]);
        assert_eq!(cli.verbose, 2);
        let Commands::Dock(args) = cli.command else {
            panic!("expected dock");
        };
        assert_eq!(args.targets, vec!["a", "b"]);
        assert_eq!(args.overrides.runs, Some(8));
        assert!(args.overrides.strict_ties);
        assert_eq!(args.overrides.set_values, vec!["search.steps=500"]);
    }

    #[test]
    fn flip_flags_are_exclusive() {
        let parsed = Cli::try_parse_from([
            "pepflow", "prepare", "-r", "r.pdb", "-l", "l.pdb", "-d", "out", "-c", "c.toml",
            "--flip", "--no-flip",
        ]);
        assert!(parsed.is_err());

        let cli = Cli::parse_from([
            "pepflow", "prepare", "-r", "r.pdb", "-l", "l.pdb", "-d", "out", "-c", "c.toml",
            "--no-flip",
        ]);
        let Commands::Prepare(args) = cli.command else {
            panic!("expected prepare");
        };
        assert_eq!(args.flip.as_option(), Some(false));
    }
}
