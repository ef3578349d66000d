// sensid_sim/src/pipeline.rs

//! Running scenarios end to end: data, estimation, reporting, replay.

use anyhow::{Context, Result};
use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};
use walkdir::WalkDir;

use sensid_core::estimation::estimator::ParameterEstimator;
use sensid_core::estimation::reporting::{FanoutReporter, TracingReporter};
use sensid_core::estimation::EstimationResult;
use sensid_core::models::LinearSystemModel;
use sensid_core::params::FreeParameters;
use sensid_core::simulation::simulate;
use sensid_core::trajectory::Trajectory;

use crate::config::{load_scenario, DataSource, ScenarioConfig};
use crate::io::comparison::write_comparison;
use crate::io::measurements::load_observations;
use crate::io::reporter::{timestamp, FileReporter, OutputFiles};
use crate::synthetic;

/// Everything a finished scenario produced.
#[derive(Debug, Clone)]
pub struct ScenarioOutcome {
    pub name: String,
    pub initial: FreeParameters,
    pub result: EstimationResult,
    /// Largest absolute gap between the measurements and a replay of the
    /// model at the identified parameters.
    pub max_deviation: f64,
    /// `None` when file output is disabled or failed.
    pub files: Option<OutputFiles>,
    pub comparison: Option<PathBuf>,
    pub snapshot: Option<PathBuf>,
}

/// Reads or generates the measurements a scenario asks for.
pub fn load_measurements(
    config: &ScenarioConfig,
    model: &dyn LinearSystemModel,
) -> Result<Trajectory> {
    match config.data.source()? {
        DataSource::File(path) => load_observations(path),
        DataSource::Synthetic(synthetic) => synthetic::generate(
            model,
            &config.parameters.fixed,
            synthetic,
            config.estimator.dt,
        ),
    }
}

pub fn run_scenario(config: &ScenarioConfig) -> Result<ScenarioOutcome> {
    run_scenario_stamped(config, &timestamp())
}

/// `run_scenario` with a caller-chosen time stamp for the output names.
pub fn run_scenario_stamped(config: &ScenarioConfig, stamp: &str) -> Result<ScenarioOutcome> {
    info!("Running scenario '{}'", config.name);
    let model = config.model.build()?;
    let measured = load_measurements(config, model.as_ref())?;
    let initial = config.parameters.free_parameters()?;
    info!(
        "{} samples of a {}-dimensional state, {} free parameter(s)",
        measured.len(),
        measured.state_dim(),
        initial.len()
    );

    let estimator = ParameterEstimator::new(
        model,
        config.parameters.fixed.clone(),
        initial,
        measured,
        config.estimator,
    )?;

    let mut tracing_reporter = TracingReporter;
    let mut file_reporter = if config.output.write_files {
        let files = OutputFiles::new(&config.output.directory, &config.name, stamp);
        Some(FileReporter::create(files, &estimator.initial().names())?)
    } else {
        None
    };

    let result = {
        let mut fanout = FanoutReporter::new().with(&mut tracing_reporter);
        if let Some(reporter) = file_reporter.as_mut() {
            fanout = fanout.with(reporter);
        }
        estimator.run(&mut fanout)?
    };

    // From here on the estimate is final; output failures only cost files.
    let files = file_reporter.and_then(|reporter| {
        kept_output(&config.name, "iteration log", reporter.finish())
    });

    // Replay from the measured initial state.
    let measured = estimator.measured();
    let all = estimator
        .fixed()
        .merged(&result.parameters.to_parameter_set())?;
    let replay = simulate(
        estimator.model(),
        &all,
        &measured.sample(0),
        config.estimator.dt,
        measured.len(),
    )?;
    let max_deviation = (replay.as_matrix() - measured.as_matrix()).amax();

    let (comparison, snapshot) = if config.output.write_files {
        let path = config
            .output
            .directory
            .join(format!("{}_comparison_{}.csv", config.name, stamp));
        let written = write_comparison(
            &path,
            &estimator.model().get_state_labels(),
            config.estimator.dt,
            measured,
            &replay,
        )
        .map(|()| path);
        (
            kept_output(&config.name, "comparison table", written),
            kept_output(&config.name, "scenario snapshot", write_snapshot(config, stamp)),
        )
    } else {
        (None, None)
    };

    Ok(ScenarioOutcome {
        name: config.name.clone(),
        initial: estimator.initial().clone(),
        result,
        max_deviation,
        files,
        comparison,
        snapshot,
    })
}

fn kept_output<T>(scenario: &str, what: &str, written: Result<T>) -> Option<T> {
    match written {
        Ok(value) => Some(value),
        Err(e) => {
            warn!("No {} for '{}': {:#}", what, scenario, e);
            None
        }
    }
}

/// Stores the resolved scenario next to the outputs so a run can be repeated
/// even when environment overrides were in effect.
fn write_snapshot(config: &ScenarioConfig, stamp: &str) -> Result<PathBuf> {
    let path = config
        .output
        .directory
        .join(format!("{}_scenario_{}.toml", config.name, stamp));
    let text = toml::to_string_pretty(config).context("cannot serialize scenario")?;
    fs::write(&path, text).with_context(|| format!("cannot write {}", path.display()))?;
    Ok(path)
}

/// Console report of a finished scenario.
pub fn render_report(outcome: &ScenarioOutcome) -> String {
    let result = &outcome.result;
    let list = |p: &FreeParameters| {
        p.iter()
            .map(|(name, value)| format!("{name} = {value:.6}"))
            .collect::<Vec<_>>()
            .join(", ")
    };

    let mut text = format!("Scenario '{}'\n", outcome.name);
    text.push_str(&format!("  initial guess:  {}\n", list(&outcome.initial)));
    text.push_str(&format!("  identified:     {}\n", list(&result.parameters)));
    text.push_str(&format!("  cost:           {:.6e}\n", result.cost));
    text.push_str(&format!(
        "  iterations:     {} ({})\n",
        result.iterations,
        if result.converged {
            "converged"
        } else {
            "budget exhausted"
        }
    ));
    text.push_str(&format!("  last step:      {:.6e}\n", result.step_norm));
    text.push_str(&format!(
        "  max deviation:  {:.6e}\n",
        outcome.max_deviation
    ));
    text.push_str(&format!(
        "  time:           {:.2} s\n",
        result.elapsed.as_secs_f64()
    ));
    if let Some(files) = &outcome.files {
        text.push_str(&format!("  log:            {}\n", files.log.display()));
        text.push_str(&format!("  summary:        {}\n", files.summary.display()));
    }
    if let Some(path) = &outcome.comparison {
        text.push_str(&format!("  comparison:     {}\n", path.display()));
    }
    if let Some(path) = &outcome.snapshot {
        text.push_str(&format!("  scenario:       {}\n", path.display()));
    }
    text
}

// =========================================================================
// == Batch Runs ==
// =========================================================================

/// One scenario file and what running it gave.
#[derive(Debug)]
pub struct BatchEntry {
    pub path: PathBuf,
    pub outcome: Result<ScenarioOutcome>,
}

/// Every `.toml` file under `dir`, sorted.
pub fn discover_scenarios(dir: &Path) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        anyhow::bail!("scenario directory {} does not exist", dir.display());
    }
    let mut paths: Vec<PathBuf> = WalkDir::new(dir)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|e| {
            !e.file_type().is_dir() && e.path().extension().map_or(false, |ext| ext == "toml")
        })
        .map(|e| e.into_path())
        .collect();
    paths.sort();
    Ok(paths)
}

/// Runs every scenario under `dir`, each on its own thread. A failing
/// scenario is logged and reported; the others still run.
///
/// Scenarios that would write under the same name into the same output
/// directory are renamed first, see `assign_unique_names`.
pub fn run_batch(dir: &Path) -> Result<Vec<BatchEntry>> {
    let paths = discover_scenarios(dir)?;
    info!("Found {} scenario(s) in {:?}", paths.len(), dir);

    let mut scenarios: Vec<(PathBuf, Result<ScenarioConfig>)> = paths
        .into_iter()
        .map(|path| {
            let config = load_scenario(&path);
            (path, config)
        })
        .collect();
    assign_unique_names(dir, &mut scenarios);

    let stamp = timestamp();
    let entries: Vec<BatchEntry> = std::thread::scope(|scope| {
        let handles: Vec<_> = scenarios
            .into_iter()
            .map(|(path, config)| {
                let stamp = stamp.as_str();
                let handle = scope
                    .spawn(move || config.and_then(|config| run_scenario_stamped(&config, stamp)));
                (path, handle)
            })
            .collect();

        handles
            .into_iter()
            .map(|(path, handle)| {
                let outcome = handle
                    .join()
                    .unwrap_or_else(|_| Err(anyhow::anyhow!("scenario thread panicked")));
                if let Err(e) = &outcome {
                    error!("Scenario {:?} failed: {:#}", path, e);
                }
                BatchEntry { path, outcome }
            })
            .collect()
    });
    Ok(entries)
}

/// Renames scenarios whose `(output directory, name)` pair is shared, by
/// appending their path relative to `root`. Output file names are built
/// from that pair, so after this every scenario writes its own files.
pub fn assign_unique_names(root: &Path, scenarios: &mut [(PathBuf, Result<ScenarioConfig>)]) {
    let key = |config: &ScenarioConfig| (config.output.directory.clone(), config.name.clone());

    let mut counts: HashMap<(PathBuf, String), usize> = HashMap::new();
    for config in scenarios.iter().filter_map(|(_, c)| c.as_ref().ok()) {
        *counts.entry(key(config)).or_default() += 1;
    }

    let mut taken: HashSet<(PathBuf, String)> = HashSet::new();
    for (path, config) in scenarios.iter_mut() {
        let Ok(config) = config else {
            continue;
        };
        let base = if counts[&key(&*config)] > 1 {
            format!("{}_{}", config.name, path_slug(root, path.as_path()))
        } else {
            config.name.clone()
        };

        let mut name = base.clone();
        let mut suffix = 2;
        while !taken.insert((config.output.directory.clone(), name.clone())) {
            name = format!("{base}_{suffix}");
            suffix += 1;
        }
        if name != config.name {
            info!("Scenario {:?} renamed '{}' -> '{}'", path, config.name, name);
            config.name = name;
        }
    }
}

/// `a/x.toml` under `root` becomes `a_x`.
fn path_slug(root: &Path, path: &Path) -> String {
    path.strip_prefix(root)
        .unwrap_or(path)
        .with_extension("")
        .to_string_lossy()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect()
}
