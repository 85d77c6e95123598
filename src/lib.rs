pub mod config;
pub mod data_loading;
pub mod error;
pub mod heart_analysis;
pub mod output;
pub mod plotting;
pub mod preprocessing;
pub mod surface;

pub use error::{Error, Result};
pub use heart_analysis::{HeartRateSample, HeartRateSeries, Lookup, RPeak, TimeIndex};
pub use surface::{build_radial_surface, RadialSurface};

use serde::Serialize;

/// Summary of a heart rate recording, printed by `attys-hrv info`.
#[derive(Debug, Clone, Serialize)]
pub struct SeriesSummary {
    pub samples: usize,
    pub start: Option<String>,
    pub end: Option<String>,
    pub duration_s: f64,
    pub bpm_min: f64,
    pub bpm_mean: f64,
    pub bpm_max: f64,
    /// Median sampling interval used by `--lookup interval`, absent when the
    /// series is too irregular for that lookup
    pub interval_s: Option<f64>,
    /// Largest `--t-max` accepted with `--lookup interval`
    pub max_t_max_s: Option<f64>,
    /// Mean spacing between samples, used by `--lookup nearest`
    pub mean_interval_s: Option<f64>,
    /// Largest `--t-max` accepted with `--lookup nearest`
    pub nearest_max_t_max_s: Option<f64>,
}

impl SeriesSummary {
    /// Summarise `series`, measuring both lookups with the given step tolerance.
    pub fn from_series(series: &HeartRateSeries, tolerance: f64) -> Result<Self> {
        let bpms = series.bpm_values();
        let bpm_min = bpms.iter().copied().fold(f64::INFINITY, f64::min);
        let bpm_max = bpms.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let bpm_mean = bpms.iter().sum::<f64>() / bpms.len() as f64;

        if !(tolerance >= 0.0) {
            return Err(Error::InvalidParameter(format!(
                "tolerance must be non-negative, got {}",
                tolerance
            )));
        }

        let measure = |lookup: Lookup| match TimeIndex::new(series, lookup, tolerance) {
            Ok(index) => Some(index),
            Err(e) => {
                log::debug!("{:?} lookup unavailable: {}", lookup, e);
                None
            }
        };
        let uniform = measure(Lookup::Interval);
        let nearest = measure(Lookup::Nearest);

        let format = |t: chrono::DateTime<chrono::Utc>| t.format("%Y-%m-%d %H:%M:%S%.3f").to_string();

        Ok(Self {
            samples: series.len(),
            start: series.start_time().map(format),
            end: series.end_time().map(format),
            duration_s: series.duration_s(),
            bpm_min,
            bpm_mean,
            bpm_max,
            interval_s: uniform.as_ref().map(|i| i.interval()),
            max_t_max_s: uniform.as_ref().map(|i| i.max_t_max()),
            mean_interval_s: nearest
                .as_ref()
                .filter(|_| series.len() > 1)
                .map(|i| i.interval()),
            nearest_max_t_max_s: nearest.as_ref().map(|i| i.max_t_max()),
        })
    }
}
