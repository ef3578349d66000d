// sensid_sim/src/io/comparison.rs

//! Side-by-side table of measured and model trajectories, for plotting
//! elsewhere.

use anyhow::{bail, Context, Result};
use std::fs;
use std::path::Path;

use sensid_core::trajectory::Trajectory;

/// Writes `t, <label>_measured, <label>_model, ...` with one row per sample.
pub fn write_comparison(
    path: &Path,
    labels: &[String],
    dt: f64,
    measured: &Trajectory,
    model: &Trajectory,
) -> Result<()> {
    if measured.as_matrix().shape() != model.as_matrix().shape() {
        bail!(
            "measured {:?} and model {:?} trajectories differ in shape",
            measured.as_matrix().shape(),
            model.as_matrix().shape()
        );
    }
    if labels.len() != measured.state_dim() {
        bail!(
            "{} labels for a {}-dimensional state",
            labels.len(),
            measured.state_dim()
        );
    }

    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        fs::create_dir_all(dir)?;
    }
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("cannot create {}", path.display()))?;

    let mut header = vec!["t".to_string()];
    for label in labels {
        header.push(format!("{label}_measured"));
        header.push(format!("{label}_model"));
    }
    writer.write_record(&header)?;

    let time = measured.time_grid(dt);
    let (y, y_hat) = (measured.as_matrix(), model.as_matrix());
    for k in 0..measured.len() {
        let mut row = Vec::with_capacity(header.len());
        row.push(time[k].to_string());
        for i in 0..labels.len() {
            row.push(y[(k, i)].to_string());
            row.push(y_hat[(k, i)].to_string());
        }
        writer.write_record(&row)?;
    }
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interleaves_measured_and_model_columns() {
        let measured = Trajectory::from_row_slice(2, 2, &[1.0, 2.0, 3.0, 4.0]).unwrap();
        let model = Trajectory::from_row_slice(2, 2, &[1.5, 2.5, 3.5, 4.5]).unwrap();
        let path = std::env::temp_dir()
            .join(format!("sensid-comparison-{}", std::process::id()))
            .join("cmp.csv");

        write_comparison(&path, &["y1".into(), "y2".into()], 0.5, &measured, &model).unwrap();

        let text = fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(
            lines,
            vec![
                "t,y1_measured,y1_model,y2_measured,y2_model",
                "0,1,1.5,2,2.5",
                "0.5,3,3.5,4,4.5",
            ]
        );

        fs::remove_dir_all(path.parent().unwrap()).ok();
    }

    #[test]
    fn shape_mismatch_is_rejected() {
        let a = Trajectory::from_row_slice(2, 1, &[1.0, 2.0]).unwrap();
        let b = Trajectory::from_row_slice(1, 1, &[1.0]).unwrap();
        let path = std::env::temp_dir().join("sensid-never-written.csv");
        assert!(write_comparison(&path, &["y1".into()], 0.1, &a, &b).is_err());
    }
}
