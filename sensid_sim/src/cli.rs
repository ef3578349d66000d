// sensid_sim/src/cli.rs

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// sensid: identify unknown parameters of a linear dynamical system from
/// measured trajectories.
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Overrides the log filter (same syntax as `RUST_LOG`).
    #[arg(long, global = true)]
    pub log_filter: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Run one identification scenario.
    Identify {
        /// The path to the scenario TOML file to run.
        #[arg(
            short,
            long,
            default_value = "assets/scenarios/three_mass_synthetic.toml"
        )]
        scenario: PathBuf,
    },

    /// Write the measurements a scenario would use to a text file.
    Generate {
        #[arg(short, long)]
        scenario: PathBuf,

        /// Destination, one line per state component.
        #[arg(short, long)]
        out: PathBuf,
    },

    /// Run every scenario file found under a directory.
    Batch {
        #[arg(short, long, default_value = "assets/scenarios")]
        dir: PathBuf,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_identify_with_global_filter() {
        let cli = Cli::try_parse_from([
            "sensid",
            "identify",
            "--scenario",
            "a.toml",
            "--log-filter",
            "debug",
        ])
        .unwrap();
        assert_eq!(cli.log_filter.as_deref(), Some("debug"));
        match cli.command {
            Command::Identify { scenario } => assert_eq!(scenario, PathBuf::from("a.toml")),
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn generate_requires_an_output() {
        assert!(Cli::try_parse_from(["sensid", "generate", "-s", "a.toml"]).is_err());
    }
}
