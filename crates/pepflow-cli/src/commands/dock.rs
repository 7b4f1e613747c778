use crate::cli::DockArgs;
use crate::commands::minimize::print_outcome;
use crate::config;
use crate::error::{CliError, Result};
use crate::utils::progress::CliProgressHandler;
use pepflow::engine::cancel::CancellationToken;
use pepflow::engine::progress::ProgressReporter;
use pepflow::engine::tools::minimizer::CommandMinimizer;
use pepflow::engine::tools::search::CommandSearchTool;
use pepflow::workflows::dock::{self, DockingResult, DockingTools};
use tracing::info;

pub fn run(args: DockArgs) -> Result<()> {
    let app = config::build_config(&args.config, &args.targets, &args.overrides)?;
    if app.targets.is_empty() {
        return Err(CliError::Config(format!(
            "'{}' defines no [[targets]]",
            args.config.display()
        )));
    }

    let search = CommandSearchTool::new(app.tools.search);
    let minimizer = CommandMinimizer::new(app.tools.minimizer);
    let tools = DockingTools {
        search: &search,
        minimizer: &minimizer,
    };
    let cancel = CancellationToken::new();

    if let [single] = app.targets.as_slice() {
        let progress_handler = CliProgressHandler::new();
        let reporter = ProgressReporter::with_callback(progress_handler.get_callback());
        let result = dock::run(single, &tools, &reporter, &cancel);
        progress_handler.clear();
        print_result(&result?);
        return Ok(());
    }

    info!(targets = app.targets.len(), "Docking targets in parallel.");
    let results = dock::run_batch(&app.targets, &tools, &cancel)?;
    let total = results.len();
    let mut failed = 0;
    for (name, result) in results {
        match result {
            Ok(result) => print_result(&result),
            Err(e) => {
                failed += 1;
                eprintln!("❌ {}: {}", name, e);
            }
        }
    }
    if failed > 0 {
        return Err(CliError::Other(anyhow::anyhow!(
            "{} of {} targets failed",
            failed,
            total
        )));
    }
    Ok(())
}

fn print_result(result: &DockingResult) {
    let selected = &result.replicates.selected;
    println!(
        "✓ {}: best replicate {}, affinity {:.3} kcal/mol, contact fraction {:.3}",
        result.target, result.replicates.best, selected.pose.affinity, selected.contact_fraction
    );
    println!("  Selected pose: {}", selected.pose_path.display());
    for candidate in &result.candidates {
        println!("  Candidate pose {}:", candidate.rank);
        print_outcome(&candidate.outcome);
    }
    if let Some(path) = &result.complex_path {
        println!("  Complex written to: {}", path.display());
    }
}
