use std::{fs, path::Path};

use charts::{CHART_SPECS, chart_data, render_bar_chart};
use common::result::{PayloadShape, load_results};
use eyre::{Context, Result};
use tracing::debug;

/// Runs the full pipeline: load, aggregate, render one chart per metric.
/// Fails fast; charts written before a failure stay on disk.
pub fn run_report(
    input: &Path,
    output: Option<&Path>,
    shape: PayloadShape,
    headroom: bool,
) -> Result<()> {
    let table = load_results(input, shape)?;
    debug!("Aggregated {} records", table.len());

    if let Some(dir) = output {
        fs::create_dir_all(dir).context("Create report folder")?;
    }

    let mut written = Vec::with_capacity(CHART_SPECS.len());
    for spec in &CHART_SPECS {
        let target = match output {
            Some(dir) => dir.join(spec.filename),
            None => Path::new(spec.filename).to_path_buf(),
        };
        let data = chart_data(&table, spec.metric);
        render_bar_chart(&target, &data, spec, headroom)
            .context(format!("Render {}", spec.filename))?;
        written.push(target.display().to_string());
    }

    println!("Saved: {}", written.join(", "));
    Ok(())
}
