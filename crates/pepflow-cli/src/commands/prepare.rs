use crate::cli::{PrepareArgs, SearchOverrides};
use crate::config;
use crate::error::Result;
use crate::utils::progress::CliProgressHandler;
use pepflow::core::protonation::assigner::UnresolvedPolicy;
use pepflow::engine::cancel::CancellationToken;
use pepflow::engine::progress::ProgressReporter;
use pepflow::engine::tools::protonator::CommandProtonator;
use pepflow::workflows::prepare::{self, PrepareOptions};
use tracing::info;

pub fn run(args: PrepareArgs) -> Result<()> {
    let app = config::build_config(&args.config, &[], &SearchOverrides::default())?;
    info!(protonator = %app.tools.protonator.display(), "Using protonation tool.");
    let protonator = CommandProtonator::new(app.tools.protonator);

    let options = PrepareOptions {
        flip: args.flip.as_option(),
        policy: if args.strict {
            UnresolvedPolicy::Strict
        } else {
            UnresolvedPolicy::DefaultToHid
        },
    };

    let progress_handler = CliProgressHandler::new();
    let reporter = ProgressReporter::with_callback(progress_handler.get_callback());
    let prepared = prepare::run(
        &args.receptor,
        &args.ligand,
        &args.output_dir,
        &protonator,
        &options,
        &reporter,
        &CancellationToken::new(),
    );
    progress_handler.clear();
    let prepared = prepared?;

    println!("✓ Receptor written to: {}", prepared.receptor_path.display());
    println!("✓ Peptide written to: {}", prepared.ligand_path.display());
    for (role, calls) in [
        ("receptor", &prepared.receptor_calls),
        ("peptide", &prepared.ligand_calls),
    ] {
        for call in calls {
            let note = if call.is_defaulted() { " (defaulted)" } else { "" };
            println!("  {} HIS {} -> {}{}", role, call.residue_number, call.state, note);
        }
    }
    Ok(())
}
