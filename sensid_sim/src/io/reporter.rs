// sensid_sim/src/io/reporter.rs

//! A `Reporter` that leaves a per-iteration CSV log and a text summary on disk.

use anyhow::{Context, Result};
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use sensid_core::estimation::reporting::{EstimationSummary, IterationRecord, Reporter};

/// Local time stamp used in output file names, e.g. `20261017_142501`.
pub fn timestamp() -> String {
    chrono::Local::now().format("%Y%m%d_%H%M%S").to_string()
}

/// Where a `FileReporter` writes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputFiles {
    pub log: PathBuf,
    pub summary: PathBuf,
}

impl OutputFiles {
    pub fn new(directory: &Path, prefix: &str, stamp: &str) -> Self {
        Self {
            log: directory.join(format!("{prefix}_approximation_log_{stamp}.csv")),
            summary: directory.join(format!("{prefix}_summary_{stamp}.txt")),
        }
    }
}

/// Writes `iteration, <parameter names...>, cost` rows as the run proceeds,
/// then a human-readable summary when it ends.
///
/// Write failures never interrupt the estimator. The first one is logged,
/// further logging to that file stops, and `finish` returns it.
pub struct FileReporter {
    files: OutputFiles,
    writer: Option<csv::Writer<File>>,
    error: Option<anyhow::Error>,
}

impl FileReporter {
    /// Creates the directory if needed and writes the CSV header.
    pub fn create(files: OutputFiles, parameter_names: &[String]) -> Result<Self> {
        if let Some(dir) = files.log.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir)
                .with_context(|| format!("cannot create output directory {}", dir.display()))?;
        }

        let mut writer = csv::Writer::from_path(&files.log)
            .with_context(|| format!("cannot create {}", files.log.display()))?;
        let header = std::iter::once("iteration".to_string())
            .chain(parameter_names.iter().cloned())
            .chain(std::iter::once("cost".to_string()));
        writer.write_record(header)?;
        debug!("Logging iterations to {:?}", files.log);

        Ok(Self {
            files,
            writer: Some(writer),
            error: None,
        })
    }

    /// Flushes the log and reports the first write failure, if any.
    pub fn finish(mut self) -> Result<OutputFiles> {
        if let Some(mut writer) = self.writer.take() {
            if let Err(e) = writer.flush() {
                self.fail(e.into());
            }
        }
        match self.error {
            Some(e) => Err(e),
            None => Ok(self.files),
        }
    }

    fn fail(&mut self, error: anyhow::Error) {
        warn!("Output file error: {:#}", error);
        self.writer = None;
        if self.error.is_none() {
            self.error = Some(error);
        }
    }
}

impl Reporter for FileReporter {
    fn on_iteration(&mut self, record: &IterationRecord) {
        let Some(writer) = self.writer.as_mut() else {
            return;
        };
        let row = std::iter::once(record.iteration.to_string())
            .chain(record.parameters.iter().map(|(_, value)| value.to_string()))
            .chain(std::iter::once(record.cost.to_string()));
        if let Err(e) = writer.write_record(row) {
            let path = self.files.log.display().to_string();
            self.fail(anyhow::Error::new(e).context(format!("writing {path}")));
        }
    }

    fn on_finish(&mut self, summary: &EstimationSummary) {
        if let Err(e) = fs::write(&self.files.summary, render_summary(summary)) {
            let path = self.files.summary.display().to_string();
            self.fail(anyhow::Error::new(e).context(format!("writing {path}")));
        }
    }
}

pub fn render_summary(summary: &EstimationSummary) -> String {
    let mut text = String::from("Parameter Identification Results\n");
    text.push_str("--------------------------------\n\n");
    text.push_str("Identified parameters:\n");
    for (name, value) in summary.parameters.iter() {
        text.push_str(&format!("{name}: {value:.6}\n"));
    }
    text.push('\n');
    text.push_str(&format!("Cost function: {:.6e}\n", summary.cost));
    text.push_str(&format!("Iterations: {}\n", summary.iterations));
    text.push_str(&format!("Converged: {}\n", summary.converged));
    text.push_str(&format!(
        "Execution time: {:.2} s\n",
        summary.elapsed.as_secs_f64()
    ));
    text
}

#[cfg(test)]
mod tests {
    use super::*;
    use sensid_core::params::FreeParameters;
    use std::time::Duration;

    fn scratch(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("sensid-{name}-{}", std::process::id()))
    }

    fn record(iteration: usize, m2: f64, cost: f64) -> IterationRecord {
        IterationRecord {
            iteration,
            parameters: FreeParameters::new([("c1", 0.1), ("m2", m2)]).unwrap(),
            cost,
        }
    }

    #[test]
    fn writes_log_rows_and_summary() {
        let dir = scratch("reporter");
        let files = OutputFiles::new(&dir, "run", "20260101_000000");
        let names = vec!["c1".to_string(), "m2".to_string()];
        let mut reporter = FileReporter::create(files.clone(), &names).unwrap();

        reporter.on_iteration(&record(0, 21.0, 0.5));
        reporter.on_iteration(&record(1, 20.0, 0.25));
        reporter.on_finish(&EstimationSummary {
            parameters: FreeParameters::new([("c1", 0.12), ("m2", 20.0)]).unwrap(),
            cost: 1.5e-9,
            iterations: 2,
            converged: true,
            elapsed: Duration::from_millis(1250),
        });
        let written = reporter.finish().unwrap();
        assert_eq!(written, files);

        let log = fs::read_to_string(&files.log).unwrap();
        let lines: Vec<&str> = log.lines().collect();
        assert_eq!(lines, vec!["iteration,c1,m2,cost", "0,0.1,21,0.5", "1,0.1,20,0.25"]);

        let summary = fs::read_to_string(&files.summary).unwrap();
        assert!(summary.contains("c1: 0.120000"), "{summary}");
        assert!(summary.contains("m2: 20.000000"), "{summary}");
        assert!(summary.contains("Cost function: 1.500000e-9"), "{summary}");
        assert!(summary.contains("Iterations: 2"), "{summary}");
        assert!(summary.contains("Execution time: 1.25 s"), "{summary}");

        fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn summary_failure_surfaces_from_finish() {
        let dir = scratch("reporter-fail");
        let mut files = OutputFiles::new(&dir, "run", "20260101_000000");
        // A directory where the summary file should go makes the write fail.
        files.summary = dir.clone();
        let mut reporter = FileReporter::create(files, &["c1".to_string()]).unwrap();

        reporter.on_finish(&EstimationSummary {
            parameters: FreeParameters::new([("c1", 0.12)]).unwrap(),
            cost: 0.0,
            iterations: 1,
            converged: true,
            elapsed: Duration::ZERO,
        });
        assert!(reporter.finish().is_err());

        fs::remove_dir_all(&dir).ok();
    }
}
