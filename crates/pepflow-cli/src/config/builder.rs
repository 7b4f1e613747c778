use super::defaults::DefaultsConfig;
use super::file::{FileConfig, FileMinimizationConfig, FileSearchConfig, FileTargetConfig};
use super::models::{AppConfig, ToolPaths};
use crate::cli::SearchOverrides;
use crate::error::{CliError, Result};
use pepflow::engine::config::{
    DockingConfig, DockingConfigBuilder, MinimizationConfig, MinimizationConfigBuilder,
};
use std::collections::HashSet;
use std::path::Path;
use std::str::FromStr;

/// Reads `config_path` and merges it with the command-line overrides and the
/// built-in defaults, in that order of precedence.
///
/// `selected` restricts the result to the named targets; when empty, every
/// configured target is returned.
pub fn build_config(
    config_path: &Path,
    selected: &[String],
    overrides: &SearchOverrides,
) -> Result<AppConfig> {
    let file_config = FileConfig::from_file(config_path)?;
    merge(file_config, selected, overrides)
}

fn merge(
    file_config: FileConfig,
    selected: &[String],
    overrides: &SearchOverrides,
) -> Result<AppConfig> {
    let defaults = DefaultsConfig::default();
    let mut file_config = apply_set_values(file_config, &overrides.set_values)?;

    let tools_file = file_config.tools.take().unwrap_or_default();
    let tools = ToolPaths {
        search: tools_file.search.unwrap_or(defaults.search_program.clone()),
        minimizer: tools_file
            .minimizer
            .unwrap_or(defaults.minimizer_program.clone()),
        protonator: tools_file
            .protonator
            .unwrap_or(defaults.protonator_program.clone()),
    };

    let mut seen = HashSet::new();
    if let Some(dup) = file_config
        .targets
        .iter()
        .find(|t| !seen.insert(t.name.as_str()))
    {
        return Err(CliError::Config(format!(
            "target '{}' is defined more than once",
            dup.name
        )));
    }
    if let Some(missing) = selected.iter().find(|n| file_config.target(n).is_none()) {
        return Err(CliError::Argument(format!(
            "no target named '{}' in the configuration",
            missing
        )));
    }

    let search_file = file_config.search.take().unwrap_or_default();
    let minimization = merge_minimization(file_config.minimization.take(), &defaults)?;

    let targets = file_config
        .targets
        .iter()
        .filter(|t| selected.is_empty() || selected.contains(&t.name))
        .map(|t| merge_target(t, &search_file, overrides, minimization.clone(), &defaults))
        .collect::<Result<Vec<_>>>()?;

    Ok(AppConfig { tools, targets })
}

fn merge_target(
    target: &FileTargetConfig,
    search_file: &FileSearchConfig,
    overrides: &SearchOverrides,
    minimization: MinimizationConfig,
    defaults: &DefaultsConfig,
) -> Result<DockingConfig> {
    DockingConfigBuilder::new()
        .name(target.name.clone())
        .preparation_file(target.preparation_file.clone())
        .sequence(target.sequence.clone())
        .working_directory(target.working_directory.clone())
        .receptor_path(target.receptor.clone())
        .seed_structure(target.seed_structure.clone())
        .replicates(
            overrides
                .replicates
                .or(search_file.replicates)
                .unwrap_or(defaults.replicates),
        )
        .runs(overrides.runs.or(search_file.runs).unwrap_or(defaults.runs))
        .steps(overrides.steps.or(search_file.steps).unwrap_or(defaults.steps))
        .workers(
            overrides
                .workers
                .or(search_file.workers)
                .unwrap_or(defaults.workers),
        )
        .contact_cutoff(
            overrides
                .contact_cutoff
                .or(search_file.contact_cutoff)
                .unwrap_or(defaults.contact_cutoff),
        )
        .strict_ties(
            overrides.strict_ties || search_file.strict_ties.unwrap_or(defaults.strict_ties),
        )
        .minimization(minimization)
        .build()
        .map_err(|e| CliError::Config(format!("target '{}': {}", target.name, e)))
}

fn merge_minimization(
    file_val: Option<FileMinimizationConfig>,
    defaults: &DefaultsConfig,
) -> Result<MinimizationConfig> {
    let file_val = file_val.unwrap_or_default();
    let stages = match file_val.stages {
        Some(stages) => stages.into_iter().map(Into::into).collect(),
        None => defaults.stages.clone(),
    };
    MinimizationConfigBuilder::new()
        .stages(stages)
        .relative_energy_threshold(
            file_val
                .relative_energy_threshold
                .unwrap_or(defaults.relative_energy_threshold),
        )
        .max_drift(file_val.max_drift.unwrap_or(defaults.max_drift))
        .stable_stages(file_val.stable_stages.unwrap_or(defaults.stable_stages))
        .candidate_poses(file_val.candidate_poses.unwrap_or(defaults.candidate_poses))
        .keep_parameters(file_val.keep_parameters.unwrap_or(defaults.keep_parameters))
        .build()
        .map_err(|e| CliError::Config(format!("[minimization]: {}", e)))
}

fn parse_value<T: FromStr>(key: &str, value: &str) -> Result<T> {
    value.parse().map_err(|_| {
        CliError::Config(format!(
            "Invalid {} value for {}: {}",
            std::any::type_name::<T>(),
            key,
            value
        ))
    })
}

fn apply_set_values(mut config: FileConfig, set_values: &[String]) -> Result<FileConfig> {
    for kv_pair in set_values {
        let Some((key, value_str)) = kv_pair.split_once('=') else {
            return Err(CliError::Config(format!(
                "Invalid --set format: '{}'. Expected KEY=VALUE.",
                kv_pair
            )));
        };

        match key {
            "search.replicates" => {
                config.search.get_or_insert_with(Default::default).replicates =
                    Some(parse_value(key, value_str)?);
            }
            "search.runs" => {
                config.search.get_or_insert_with(Default::default).runs = Some(parse_value(key, value_str)?);
            }
            "search.steps" => {
                config.search.get_or_insert_with(Default::default).steps =
                    Some(parse_value(key, value_str)?);
            }
            "search.workers" => {
                config.search.get_or_insert_with(Default::default).workers =
                    Some(parse_value(key, value_str)?);
            }
            "search.contact-cutoff" => {
                config.search.get_or_insert_with(Default::default).contact_cutoff =
                    Some(parse_value(key, value_str)?);
            }
            "search.strict-ties" => {
                config.search.get_or_insert_with(Default::default).strict_ties =
                    Some(parse_value(key, value_str)?);
            }
            "minimization.relative-energy-threshold" => {
                config
                    .minimization
                    .get_or_insert_with(Default::default)
                    .relative_energy_threshold = Some(parse_value(key, value_str)?);
            }
            "minimization.max-drift" => {
                config.minimization.get_or_insert_with(Default::default).max_drift =
                    Some(parse_value(key, value_str)?);
            }
            "minimization.stable-stages" => {
                config
                    .minimization
                    .get_or_insert_with(Default::default)
                    .stable_stages = Some(parse_value(key, value_str)?);
            }
            "minimization.candidate-poses" => {
                config
                    .minimization
                    .get_or_insert_with(Default::default)
                    .candidate_poses = Some(parse_value(key, value_str)?);
            }
            "minimization.keep-parameters" => {
                config
                    .minimization
                    .get_or_insert_with(Default::default)
                    .keep_parameters = Some(parse_value(key, value_str)?);
            }
            _ => {
                return Err(CliError::Config(format!(
                    "Unsupported configuration key for --set: '{}'",
                    key
                )));
            }
        }
    }
    Ok(config)
}
