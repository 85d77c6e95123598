use crate::error::{Error, Result};
use crate::heart_analysis::HeartRateSeries;
use crate::output::ensure_parent_dir;
use crate::surface::RadialSurface;
use chrono::{DateTime, Duration, Utc};
use log::info;
use plotters::coord::Shift;
use plotters::prelude::*;
use std::path::Path;
use std::str::FromStr;

/// The 3-D view draws at most this many cells along each axis
const MAX_SURFACE_CELLS: usize = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum View {
    /// BPM over date/time
    Timeline,
    /// Filled bands of the radial surface seen from above
    Contour,
    /// Radial surface in 3-D
    Surface,
}

impl FromStr for View {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "timeline" => Ok(View::Timeline),
            "contour" => Ok(View::Contour),
            "surface" => Ok(View::Surface),
            _ => Err(format!(
                "Invalid view: {}. Use timeline, contour or surface",
                s
            )),
        }
    }
}

impl View {
    pub fn is_radial(&self) -> bool {
        matches!(self, View::Contour | View::Surface)
    }
}

#[derive(Clone, Debug)]
pub struct PlotStyle {
    pub width: u32,
    pub height: u32,
    pub caption: String,
    /// Fixed BPM axis of the timeline
    pub bpm_range: (f64, f64),
}

impl Default for PlotStyle {
    fn default() -> Self {
        Self {
            width: 1000,
            height: 600,
            caption: "Heartrate".to_string(),
            bpm_range: (0.0, 200.0),
        }
    }
}

fn is_svg(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.eq_ignore_ascii_case("svg"))
        .unwrap_or(false)
}

/// Tick label for a position on the elapsed-seconds axis.
pub fn format_elapsed(start: Option<DateTime<Utc>>, elapsed_s: f64, long_span: bool) -> String {
    match start {
        Some(start) => {
            let at = start + Duration::milliseconds((elapsed_s * 1000.0).round() as i64);
            if long_span {
                at.format("%m-%d %H:%M").to_string()
            } else {
                at.format("%H:%M:%S").to_string()
            }
        }
        None => format!("{:.0}", elapsed_s),
    }
}

/// Colour band (0..levels) a value falls into between `lo` and `hi`.
pub fn band_level(value: f64, lo: f64, hi: f64, levels: usize) -> usize {
    if levels <= 1 || !(hi > lo) {
        return 0;
    }
    let t = ((value - lo) / (hi - lo)).clamp(0.0, 1.0);
    ((t * levels as f64) as usize).min(levels - 1)
}

fn band_color(level: usize, levels: usize) -> HSLColor {
    let t = if levels > 1 {
        level as f64 / (levels - 1) as f64
    } else {
        0.0
    };
    // blue for the lowest band through to red for the highest
    HSLColor(0.66 * (1.0 - t), 0.85, 0.5)
}

/// Plot BPM against time, optionally with a smoothed overlay.
pub fn render_timeline(
    series: &HeartRateSeries,
    smoothed: Option<&[f64]>,
    path: &Path,
    style: &PlotStyle,
) -> Result<()> {
    ensure_parent_dir(path)?;
    let size = (style.width, style.height);
    if is_svg(path) {
        draw_timeline(SVGBackend::new(path, size).into_drawing_area(), series, smoothed, style)?;
    } else {
        draw_timeline(BitMapBackend::new(path, size).into_drawing_area(), series, smoothed, style)?;
    }
    info!("Rendered heart rate timeline to {}", path.display());
    Ok(())
}

fn draw_timeline<DB: DrawingBackend>(
    root: DrawingArea<DB, Shift>,
    series: &HeartRateSeries,
    smoothed: Option<&[f64]>,
    style: &PlotStyle,
) -> Result<()>
where
    DB::ErrorType: 'static,
{
    root.fill(&WHITE)?;

    let start = series.start_time();
    let span = series.duration_s().max(1.0);
    let long_span = span > 86_400.0;

    let mut chart = ChartBuilder::on(&root)
        .margin(10)
        .caption(&style.caption, ("sans-serif", 24))
        .x_label_area_size(40)
        .y_label_area_size(50)
        .build_cartesian_2d(0f64..span, style.bpm_range.0..style.bpm_range.1)?;

    chart
        .configure_mesh()
        .x_desc(if start.is_some() { "Date/time" } else { "Elapsed/s" })
        .y_desc("HR/BPM")
        .x_label_formatter(&|x| format_elapsed(start, *x, long_span))
        .draw()?;

    chart.draw_series(LineSeries::new(
        series.samples().iter().map(|s| (s.elapsed_s, s.bpm)),
        &BLUE,
    ))?;

    if let Some(smoothed) = smoothed {
        chart.draw_series(LineSeries::new(
            series
                .samples()
                .iter()
                .zip(smoothed.iter())
                .map(|(s, &bpm)| (s.elapsed_s, bpm)),
            &RED,
        ))?;
    }

    root.present()?;
    Ok(())
}

/// Top view of the radial surface with values quantised into `levels` bands.
pub fn render_contour(
    surface: &RadialSurface,
    path: &Path,
    style: &PlotStyle,
    levels: usize,
) -> Result<()> {
    if levels == 0 {
        return Err(Error::InvalidParameter("contour needs at least one level".into()));
    }
    ensure_parent_dir(path)?;
    let size = (style.width, style.height);
    if is_svg(path) {
        draw_contour(SVGBackend::new(path, size).into_drawing_area(), surface, style, levels)?;
    } else {
        draw_contour(BitMapBackend::new(path, size).into_drawing_area(), surface, style, levels)?;
    }
    info!("Rendered radial contour to {}", path.display());
    Ok(())
}

fn cell_size(surface: &RadialSurface) -> f64 {
    let n = surface.resolution();
    if n > 1 && surface.t_max() > 0.0 {
        2.0 * surface.t_max() / (n - 1) as f64
    } else {
        1.0
    }
}

fn draw_contour<DB: DrawingBackend>(
    root: DrawingArea<DB, Shift>,
    surface: &RadialSurface,
    style: &PlotStyle,
    levels: usize,
) -> Result<()>
where
    DB::ErrorType: 'static,
{
    root.fill(&WHITE)?;

    let (lo, hi) = surface.value_range();
    let half = cell_size(surface) / 2.0;
    let extent = surface.t_max() + half;

    let mut chart = ChartBuilder::on(&root)
        .margin(10)
        .caption(&style.caption, ("sans-serif", 24))
        .x_label_area_size(40)
        .y_label_area_size(50)
        .build_cartesian_2d(-extent..extent, -extent..extent)?;

    chart
        .configure_mesh()
        .disable_mesh()
        .x_desc("t/s")
        .y_desc("t/s")
        .draw()?;

    chart.draw_series(surface.values.indexed_iter().map(|((row, col), &bpm)| {
        let x = surface.axis[col];
        let y = surface.axis[row];
        let color = band_color(band_level(bpm, lo, hi, levels), levels);
        Rectangle::new([(x - half, y - half), (x + half, y + half)], color.filled())
    }))?;

    root.present()?;
    Ok(())
}

/// 3-D view of the radial surface, BPM on the vertical axis.
pub fn render_surface3d(surface: &RadialSurface, path: &Path, style: &PlotStyle) -> Result<()> {
    if surface.resolution() < 2 {
        return Err(Error::InvalidParameter(
            "a 3-D surface needs a grid resolution of at least 2".into(),
        ));
    }
    ensure_parent_dir(path)?;
    let size = (style.width, style.height);
    if is_svg(path) {
        draw_surface3d(SVGBackend::new(path, size).into_drawing_area(), surface, style)?;
    } else {
        draw_surface3d(BitMapBackend::new(path, size).into_drawing_area(), surface, style)?;
    }
    info!("Rendered radial surface to {}", path.display());
    Ok(())
}

/// Every `stride`-th grid index, always including the last one.
pub fn surface_indices(resolution: usize, max_cells: usize) -> Vec<usize> {
    let stride = resolution.div_ceil(max_cells.max(1)).max(1);
    let mut indices: Vec<usize> = (0..resolution).step_by(stride).collect();
    if indices.last() != Some(&(resolution - 1)) {
        indices.push(resolution - 1);
    }
    indices
}

fn draw_surface3d<DB: DrawingBackend>(
    root: DrawingArea<DB, Shift>,
    surface: &RadialSurface,
    style: &PlotStyle,
) -> Result<()>
where
    DB::ErrorType: 'static,
{
    root.fill(&WHITE)?;

    let (lo, hi) = surface.value_range();
    let hi = if hi > lo { hi } else { lo + 1.0 };
    let t_max = if surface.t_max() > 0.0 { surface.t_max() } else { 0.5 };
    let step = cell_size(surface);

    let mut chart = ChartBuilder::on(&root)
        .margin(20)
        .caption(&style.caption, ("sans-serif", 24))
        .build_cartesian_3d(-t_max..t_max, lo..hi, -t_max..t_max)?;

    chart.with_projection(|mut pb| {
        pb.yaw = 0.6;
        pb.pitch = 0.4;
        pb.scale = 0.8;
        pb.into_matrix()
    });

    chart
        .configure_axes()
        .light_grid_style(BLACK.mix(0.15))
        .max_light_lines(3)
        .draw()?;

    let indices = surface_indices(surface.resolution(), MAX_SURFACE_CELLS);
    let coords: Vec<f64> = indices.iter().map(|&i| surface.axis[i]).collect();
    let last = surface.resolution() - 1;
    let index_of = |coord: f64| (((coord + surface.t_max()) / step).round() as usize).min(last);

    chart.draw_series(
        SurfaceSeries::xoz(coords.iter().copied(), coords.iter().copied(), |x, z| {
            surface.values[[index_of(z), index_of(x)]]
        })
        .style(BLUE.mix(0.3).filled()),
    )?;

    root.present()?;
    Ok(())
}
