use crate::data_loading::TimeUnit;
use crate::heart_analysis::Lookup;
use crate::plotting::View;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Convert, detect and plot ECG and heart rate recordings
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Downsample one ECG column and scale it, one value per output line
    Decimate(DecimateArgs),
    /// Plot a heart rate recording or turn it into a radial surface
    HeartRate(HeartRateArgs),
    /// Detect R peaks in a single-column ECG and write one BPM per line
    Detect(DetectArgs),
    /// Print a JSON summary of a heart rate recording
    Info(InfoArgs),
}

#[derive(Parser, Debug)]
pub struct DecimateArgs {
    /// Whitespace-delimited ECG recording
    pub input: PathBuf,

    /// Output file, one sample per line
    pub output: PathBuf,

    /// Column holding the ECG signal
    #[arg(long, default_value = "2")]
    pub column: usize,

    /// Integer downsampling factor
    #[arg(long, default_value = "4")]
    pub factor: usize,

    /// Divide the decimated signal by this value
    #[arg(long, default_value = "500.0")]
    pub divisor: f64,
}

#[derive(Parser, Debug)]
pub struct HeartRateArgs {
    /// Heart rate file, column 0 time and column 1 BPM
    pub input: PathBuf,

    /// Unit of the time column (millis = Unix epoch milliseconds, seconds)
    #[arg(long, default_value = "millis")]
    pub time_unit: TimeUnit,

    /// Visualization to render (timeline, contour or surface)
    #[arg(long, default_value = "timeline")]
    pub view: View,

    /// Plot output, .svg for SVG and anything else for PNG
    #[arg(long)]
    pub plot: Option<PathBuf>,

    /// Half-width of the radial grid in seconds, defaults to the largest the recording covers (radial views only)
    #[arg(long)]
    pub t_max: Option<f64>,

    /// Number of grid steps along each axis of the radial grid (radial views only)
    #[arg(long, default_value = "500")]
    pub resolution: usize,

    /// How radii map to samples (interval for uniform sampling, nearest for per-beat logs), radial views only
    #[arg(long, default_value = "interval")]
    pub lookup: Lookup,

    /// Allowed relative deviation from the measured interval (radial views only)
    #[arg(long, default_value = "0.5")]
    pub tolerance: f64,

    /// Write the radial grid as whitespace-separated rows
    #[arg(long)]
    pub grid_output: Option<PathBuf>,

    /// Write the series with readable timestamps as CSV
    #[arg(long)]
    pub csv_output: Option<PathBuf>,

    /// Lower bound of the BPM axis
    #[arg(long, default_value = "0.0")]
    pub y_min: f64,

    /// Upper bound of the BPM axis
    #[arg(long, default_value = "200.0")]
    pub y_max: f64,

    /// Window size for smoothing HR on the timeline (0 disables the overlay)
    #[arg(long, default_value = "0")]
    pub hr_smoothing_window: usize,

    /// Number of colour bands of the contour view (contour only)
    #[arg(long, default_value = "20")]
    pub levels: usize,

    /// Plot width in pixels
    #[arg(long, default_value = "1000")]
    pub width: u32,

    /// Plot height in pixels
    #[arg(long, default_value = "600")]
    pub height: u32,
}

#[derive(Parser, Debug)]
pub struct DetectArgs {
    /// ECG in volts, one sample per line
    pub input: PathBuf,

    /// Output file, one BPM per detected beat
    #[arg(long, default_value = "hr.dat")]
    pub output: PathBuf,

    /// Column holding the ECG signal
    #[arg(long, default_value = "0")]
    pub column: usize,

    /// Sampling rate in Hz
    #[arg(long, default_value = "250.0")]
    pub fs: f64,

    /// Mains frequency removed before detection
    #[arg(long, env = "MAINS_HZ", default_value = "50.0")]
    pub mains_hz: f64,

    /// Width of the mains notch in Hz
    #[arg(long, default_value = "2.0")]
    pub notch_width: f64,

    /// Skip the mains notch filter
    #[arg(long)]
    pub no_notch: bool,
}

#[derive(Parser, Debug)]
pub struct InfoArgs {
    /// Heart rate file, column 0 time and column 1 BPM
    pub input: PathBuf,

    /// Unit of the time column (millis = Unix epoch milliseconds, seconds)
    #[arg(long, default_value = "millis")]
    pub time_unit: TimeUnit,

    /// Allowed relative deviation from the measured interval
    #[arg(long, default_value = "0.5")]
    pub tolerance: f64,
}
