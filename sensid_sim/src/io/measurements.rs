// sensid_sim/src/io/measurements.rs

//! Measurement files.
//!
//! Plain text, whitespace separated. Each line holds one state component
//! across all time samples, so a file for a six-dimensional state sampled
//! 100 times has 6 lines of 100 numbers. Blank lines and lines starting
//! with `#` are ignored.

use anyhow::{anyhow, bail, Context, Result};
use std::fs;
use std::io::Write;
use std::path::Path;

use sensid_core::trajectory::Trajectory;

pub fn load_observations(path: &Path) -> Result<Trajectory> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("cannot read measurements from {}", path.display()))?;
    parse_observations(&text).with_context(|| format!("in {}", path.display()))
}

/// Parses the on-disk layout and transposes it to one row per sample.
pub fn parse_observations(text: &str) -> Result<Trajectory> {
    let mut rows: Vec<Vec<f64>> = Vec::new();
    for (line_no, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let values = line
            .split_whitespace()
            .map(|token| {
                token
                    .parse::<f64>()
                    .map_err(|e| anyhow!("line {}: '{}': {}", line_no + 1, token, e))
            })
            .collect::<Result<Vec<_>>>()?;
        if let Some(first) = rows.first() {
            if values.len() != first.len() {
                bail!(
                    "line {}: expected {} samples, found {}",
                    line_no + 1,
                    first.len(),
                    values.len()
                );
            }
        }
        rows.push(values);
    }

    if rows.is_empty() {
        bail!("no measurements found");
    }

    let state_dim = rows.len();
    let samples = rows[0].len();
    let mut data = Vec::with_capacity(state_dim * samples);
    for k in 0..samples {
        data.extend(rows.iter().map(|row| row[k]));
    }
    Ok(Trajectory::from_row_slice(samples, state_dim, &data)?)
}

/// Writes a trajectory in the layout `load_observations` reads.
pub fn write_observations(path: &Path, trajectory: &Trajectory) -> Result<()> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        fs::create_dir_all(dir)
            .with_context(|| format!("cannot create directory {}", dir.display()))?;
    }
    let mut file = fs::File::create(path)
        .with_context(|| format!("cannot create {}", path.display()))?;

    let samples = trajectory.as_matrix();
    for i in 0..trajectory.state_dim() {
        let line = samples
            .column(i)
            .iter()
            .map(|v| format!("{v:e}"))
            .collect::<Vec<_>>()
            .join(" ");
        writeln!(file, "{line}")?;
    }
    Ok(())
}
