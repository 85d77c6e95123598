use crate::error::{Error, Result};
use crate::heart_analysis::HeartRateSeries;
use crate::surface::RadialSurface;
use log::info;
use serde::Serialize;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

fn io_error(path: &Path) -> impl Fn(std::io::Error) -> Error + '_ {
    move |source| Error::Io {
        path: path.to_path_buf(),
        source,
    }
}

pub fn ensure_parent_dir(path: &Path) -> Result<()> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir).map_err(io_error(path))?;
    }
    Ok(())
}

fn create(path: &Path) -> Result<BufWriter<File>> {
    ensure_parent_dir(path)?;
    Ok(BufWriter::new(File::create(path).map_err(io_error(path))?))
}

/// Write one value per line.
pub fn write_values(path: &Path, values: &[f64]) -> Result<()> {
    let mut writer = create(path)?;
    for value in values {
        writeln!(writer, "{}", value).map_err(io_error(path))?;
    }
    writer.flush().map_err(io_error(path))?;
    info!("Wrote {} values to {}", values.len(), path.display());
    Ok(())
}

/// Write the grid as whitespace-separated rows, first row is `y = -t_max`.
pub fn write_grid(path: &Path, surface: &RadialSurface) -> Result<()> {
    let mut writer = create(path)?;
    for row in surface.values.rows() {
        let line: Vec<String> = row.iter().map(|v| v.to_string()).collect();
        writeln!(writer, "{}", line.join(" ")).map_err(io_error(path))?;
    }
    writer.flush().map_err(io_error(path))?;
    info!(
        "Wrote {}x{} grid to {}",
        surface.resolution(),
        surface.resolution(),
        path.display()
    );
    Ok(())
}

#[derive(Debug, Serialize)]
struct HeartRateRecord {
    timestamp: String,
    elapsed_s: f64,
    bpm: f64,
}

/// Write the series with human readable timestamps.
pub fn write_heart_rate_csv(path: &Path, series: &HeartRateSeries) -> Result<()> {
    let mut writer = csv::Writer::from_writer(create(path)?);

    for sample in series.samples() {
        writer.serialize(HeartRateRecord {
            timestamp: sample
                .timestamp
                .map(|t| t.format("%Y-%m-%d %H:%M:%S%.3f").to_string())
                .unwrap_or_default(),
            elapsed_s: sample.elapsed_s,
            bpm: sample.bpm,
        })?;
    }

    writer.flush().map_err(io_error(path))?;
    info!("Wrote {} rows to {}", series.len(), path.display());
    Ok(())
}
