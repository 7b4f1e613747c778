use crate::cli::{MinimizeArgs, SearchOverrides};
use crate::config;
use crate::error::{CliError, Result};
use crate::utils::progress::CliProgressHandler;
use pepflow::engine::cancel::CancellationToken;
use pepflow::engine::progress::ProgressReporter;
use pepflow::engine::state::{Convergence, MinimizationOutcome};
use pepflow::engine::tools::minimizer::CommandMinimizer;
use pepflow::workflows::dock;
use tracing::warn;

pub fn run(args: MinimizeArgs) -> Result<()> {
    let overrides = SearchOverrides {
        set_values: args.set_values.clone(),
        ..Default::default()
    };
    let app = config::build_config(&args.config, std::slice::from_ref(&args.target), &overrides)?;
    let target = app
        .targets
        .first()
        .ok_or_else(|| CliError::Argument(format!("no target named '{}'", args.target)))?;
    let minimizer = CommandMinimizer::new(app.tools.minimizer);

    let progress_handler = CliProgressHandler::new();
    let reporter = ProgressReporter::with_callback(progress_handler.get_callback());
    let outcome = dock::minimize(
        target,
        &minimizer,
        &args.input,
        &reporter,
        &CancellationToken::new(),
    );
    progress_handler.clear();
    let outcome = outcome?;

    print_outcome(&outcome);
    Ok(())
}

pub(crate) fn print_outcome(outcome: &MinimizationOutcome) {
    for stage in &outcome.stages {
        println!(
            "  {:<40} E(peptide) {:>12.4}  dE(int) {:>10.4}  drift {:>6.2} Å",
            stage.label, stage.energies.peptide, stage.energies.interaction, stage.drift
        );
    }
    match (&outcome.convergence, outcome.final_stage()) {
        (Convergence::Converged { stage }, Some(last)) => {
            println!("✓ Converged at stage {}: {}", stage, last.output.display());
        }
        (Convergence::NonConvergent { reason }, last) => {
            warn!(%reason, "Pose did not converge.");
            println!("⚠ NonConvergent: {}", reason);
            if let Some(last) = last {
                println!("  Last stage output (not accepted): {}", last.output.display());
            }
        }
        (Convergence::Converged { .. }, None) => {}
    }
}
