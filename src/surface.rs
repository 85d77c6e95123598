//! Radial remap of a heart rate series onto a square time grid.
//!
//! Each cell at `(x, y)` takes the heart rate recorded `sqrt(x² + y²)` seconds
//! after the start of the series, so the series becomes a radially symmetric
//! surface centred on the origin.

use crate::error::{Error, Result};
use crate::heart_analysis::TimeIndex;
use log::debug;
use ndarray::Array2;

pub const DEFAULT_RESOLUTION: usize = 500;

#[derive(Debug, Clone)]
pub struct RadialSurface {
    /// Coordinates shared by both axes, ascending from -t_max to t_max
    pub axis: Vec<f64>,
    /// `values[[row, col]]` is the cell at `y = axis[row]`, `x = axis[col]`
    pub values: Array2<f64>,
    t_max: f64,
}

impl RadialSurface {
    pub fn resolution(&self) -> usize {
        self.axis.len()
    }

    /// Requested half-width, also kept for a single-cell grid.
    pub fn t_max(&self) -> f64 {
        self.t_max
    }

    /// Smallest and largest cell value.
    pub fn value_range(&self) -> (f64, f64) {
        self.values
            .iter()
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| {
                (lo.min(v), hi.max(v))
            })
    }
}

/// `n` coordinates from -t_max to t_max, exactly symmetric about zero.
pub fn symmetric_axis(t_max: f64, n: usize) -> Vec<f64> {
    if n == 1 {
        return vec![0.0];
    }
    let last = (n - 1) as i64;
    (0..n as i64)
        .map(|k| (2 * k - last) as f64 * t_max / last as f64)
        .collect()
}

/// Build the `resolution × resolution` radial surface.
///
/// Fails with [`Error::OutOfCoverage`] when the grid corner lies beyond the
/// last sample instead of clamping or wrapping.
pub fn build_radial_surface(
    index: &TimeIndex<'_>,
    t_max: f64,
    resolution: usize,
) -> Result<RadialSurface> {
    if !(t_max >= 0.0) || !t_max.is_finite() {
        return Err(Error::InvalidParameter(format!(
            "t_max must be finite and non-negative, got {}",
            t_max
        )));
    }
    if resolution == 0 {
        return Err(Error::InvalidParameter(
            "grid resolution must be at least 1".into(),
        ));
    }

    // the corner is the farthest point of the grid, check it before filling
    index.index_of(t_max * std::f64::consts::SQRT_2)?;

    let axis = symmetric_axis(t_max, resolution);

    let mut values = Vec::with_capacity(resolution * resolution);
    for &y in &axis {
        for &x in &axis {
            values.push(index.bpm_at((x * x + y * y).sqrt())?);
        }
    }

    let values = Array2::from_shape_vec((resolution, resolution), values)
        .map_err(|e| Error::InvalidParameter(e.to_string()))?;

    debug!(
        "Built {}x{} radial surface over +/-{}s",
        resolution, resolution, t_max
    );

    Ok(RadialSurface {
        axis,
        values,
        t_max,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::heart_analysis::{HeartRateSeries, Lookup};

    fn one_hz(bpms: &[f64]) -> HeartRateSeries {
        let pairs: Vec<(f64, f64)> = bpms
            .iter()
            .enumerate()
            .map(|(i, &b)| (i as f64, b))
            .collect();
        HeartRateSeries::from_pairs(&pairs).unwrap()
    }

    fn ramp(len: usize) -> HeartRateSeries {
        one_hz(&(0..len).map(|i| 50.0 + i as f64).collect::<Vec<_>>())
    }

    #[test]
    fn end_to_end_scenario() {
        let series = one_hz(&[60.0, 62.0, 64.0, 66.0]);
        let index = TimeIndex::new(&series, Lookup::Interval, 0.5).unwrap();
        let surface = build_radial_surface(&index, 2.0, 5).unwrap();

        assert_eq!(surface.axis, vec![-2.0, -1.0, 0.0, 1.0, 2.0]);
        // origin
        assert_eq!(surface.values[[2, 2]], 60.0);
        // (x=2, y=0)
        assert_eq!(surface.values[[2, 4]], 64.0);
        // (x=1, y=1), distance 1.414
        assert_eq!(surface.values[[3, 3]], 62.0);
        // corner, distance 2.83 -> sample 3
        assert_eq!(surface.values[[0, 0]], 66.0);
    }

    #[test]
    fn cells_match_rounded_distance() {
        let series = ramp(40);
        let index = TimeIndex::new(&series, Lookup::Interval, 0.5).unwrap();
        let surface = build_radial_surface(&index, 25.0, 101).unwrap();

        for (row, &y) in surface.axis.iter().enumerate() {
            for (col, &x) in surface.axis.iter().enumerate() {
                let expected = series.samples()[(x * x + y * y).sqrt().round() as usize].bpm;
                assert_eq!(surface.values[[row, col]], expected);
            }
        }
    }

    #[test]
    fn surface_is_symmetric_in_both_axes() {
        let series = ramp(60);
        let index = TimeIndex::new(&series, Lookup::Interval, 0.5).unwrap();
        let surface = build_radial_surface(&index, 37.3, 64).unwrap();
        let n = surface.resolution();

        for i in 0..n {
            assert_eq!(surface.axis[i], -surface.axis[n - 1 - i]);
            for j in 0..n {
                let v = surface.values[[i, j]];
                assert_eq!(v, surface.values[[n - 1 - i, j]]);
                assert_eq!(v, surface.values[[i, n - 1 - j]]);
                assert_eq!(v, surface.values[[n - 1 - i, n - 1 - j]]);
                // swapping x and y keeps the radius
                assert_eq!(v, surface.values[[j, i]]);
            }
        }
    }

    #[test]
    fn band_is_constant_on_a_circle() {
        let series = ramp(20);
        let index = TimeIndex::new(&series, Lookup::Interval, 0.5).unwrap();
        let surface = build_radial_surface(&index, 10.0, 21).unwrap();
        // (x=3, y=4), (x=4, y=3), (x=5, y=0) and (x=0, y=-5) all sit at radius 5
        let centre = 10;
        let at = |x: i64, y: i64| {
            surface.values[[(centre as i64 + y) as usize, (centre as i64 + x) as usize]]
        };
        assert_eq!(at(3, 4), 55.0);
        assert_eq!(at(4, 3), 55.0);
        assert_eq!(at(5, 0), 55.0);
        assert_eq!(at(0, -5), 55.0);
    }

    #[test]
    fn corner_beyond_last_sample_fails() {
        let series = one_hz(&[60.0, 62.0, 64.0, 66.0]);
        let index = TimeIndex::new(&series, Lookup::Interval, 0.5).unwrap();
        // round(sqrt(2) * 2.5) = 4 >= 4 samples
        let err = build_radial_surface(&index, 2.5, 5).unwrap_err();
        assert!(matches!(err, Error::OutOfCoverage { index: 4, len: 4, .. }));
    }

    #[test]
    fn boundary_matches_sample_count() {
        let series = ramp(30);
        let index = TimeIndex::new(&series, Lookup::Interval, 0.5).unwrap();
        for resolution in [1, 3] {
            for tenth in 0..300 {
                let t_max = tenth as f64 / 10.0;
                let corner_index = (std::f64::consts::SQRT_2 * t_max).round() as usize;
                let result = build_radial_surface(&index, t_max, resolution);
                if corner_index >= series.len() {
                    assert!(
                        matches!(result, Err(Error::OutOfCoverage { .. })),
                        "t_max {t_max}, resolution {resolution}"
                    );
                } else {
                    assert!(result.is_ok(), "t_max {t_max}, resolution {resolution}");
                }
            }
        }
    }

    #[test]
    fn single_cell_grid_is_the_first_sample() {
        let series = one_hz(&[71.0]);
        let index = TimeIndex::new(&series, Lookup::Interval, 0.5).unwrap();
        let surface = build_radial_surface(&index, 0.0, 1).unwrap();
        assert_eq!(surface.values.shape(), &[1, 1]);
        assert_eq!(surface.values[[0, 0]], 71.0);
    }

    #[test]
    fn single_cell_grid_still_checks_coverage() {
        let series = one_hz(&[60.0, 62.0, 64.0, 66.0]);
        let index = TimeIndex::new(&series, Lookup::Interval, 0.5).unwrap();
        let err = build_radial_surface(&index, 100.0, 1).unwrap_err();
        assert!(matches!(err, Error::OutOfCoverage { len: 4, .. }));

        let surface = build_radial_surface(&index, 2.0, 1).unwrap();
        assert_eq!(surface.t_max(), 2.0);
        assert_eq!(surface.values[[0, 0]], 60.0);
    }

    #[test]
    fn invalid_parameters_are_rejected() {
        let series = ramp(10);
        let index = TimeIndex::new(&series, Lookup::Interval, 0.5).unwrap();
        assert!(build_radial_surface(&index, -1.0, 5).is_err());
        assert!(build_radial_surface(&index, f64::NAN, 5).is_err());
        assert!(build_radial_surface(&index, 1.0, 0).is_err());
    }

    #[test]
    fn default_resolution_builds_full_grid() {
        let series = ramp(100);
        let index = TimeIndex::new(&series, Lookup::Interval, 0.5).unwrap();
        let surface = build_radial_surface(&index, 60.0, DEFAULT_RESOLUTION).unwrap();
        assert_eq!(surface.values.shape(), &[500, 500]);
        assert_eq!(surface.t_max(), 60.0);
        let (lo, hi) = surface.value_range();
        assert_eq!(lo, 50.0);
        assert_eq!(hi, 50.0 + (60.0 * std::f64::consts::SQRT_2).round());
    }
}
