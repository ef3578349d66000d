// sensid_sim/src/main.rs

use anyhow::Result;
use clap::Parser;
use tracing::info;

use sensid_sim::cli::{Cli, Command};
use sensid_sim::config::load_scenario;
use sensid_sim::io::measurements::write_observations;
use sensid_sim::pipeline::{load_measurements, render_report, run_batch, run_scenario};
use sensid_sim::logging;

fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init(cli.log_filter.as_deref());

    match cli.command {
        Command::Identify { scenario } => {
            info!("Loading scenario from: {:?}", scenario);
            let config = load_scenario(&scenario)?;
            let outcome = run_scenario(&config)?;
            print!("{}", render_report(&outcome));
        }
        Command::Generate { scenario, out } => {
            let config = load_scenario(&scenario)?;
            let model = config.model.build()?;
            let measurements = load_measurements(&config, model.as_ref())?;
            write_observations(&out, &measurements)?;
            info!(
                "Wrote {} samples of {} components to {:?}",
                measurements.len(),
                measurements.state_dim(),
                out
            );
        }
        Command::Batch { dir } => {
            let entries = run_batch(&dir)?;
            let mut failed = 0;
            for entry in &entries {
                match &entry.outcome {
                    Ok(outcome) => print!("{}", render_report(outcome)),
                    Err(e) => {
                        failed += 1;
                        println!("Scenario {:?} failed: {:#}", entry.path, e);
                    }
                }
            }
            if failed > 0 {
                anyhow::bail!("{} of {} scenario(s) failed", failed, entries.len());
            }
        }
    }
    Ok(())
}
