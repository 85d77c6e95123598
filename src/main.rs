use anyhow::{bail, Context, Result};
use attys_hrv_tools::config::{Args, Command, DecimateArgs, DetectArgs, HeartRateArgs, InfoArgs};
use attys_hrv_tools::data_loading::{load_ecg_column, load_heart_rate_series};
use attys_hrv_tools::heart_analysis::{detect_heart_rate, DetectorConfig};
use attys_hrv_tools::plotting::{self, PlotStyle, View};
use attys_hrv_tools::preprocessing::{decimate, scale, smooth_series};
use attys_hrv_tools::{build_radial_surface, output, SeriesSummary, TimeIndex};
use clap::Parser;
use log::{debug, info};

fn run_decimate(args: &DecimateArgs) -> Result<()> {
    let ecg = load_ecg_column(&args.input, args.column)
        .with_context(|| format!("Failed to load ECG from {}", args.input.display()))?;
    println!("Loaded {} samples from column {}", ecg.len(), args.column);

    let decimated = decimate(&ecg, args.factor)?;
    let scaled = scale(&decimated, args.divisor)?;
    output::write_values(&args.output, &scaled)?;

    println!(
        "Wrote {} samples (factor {}) to {}",
        scaled.len(),
        args.factor,
        args.output.display()
    );
    Ok(())
}

fn run_heart_rate(args: &HeartRateArgs) -> Result<()> {
    let series = load_heart_rate_series(&args.input, args.time_unit)
        .with_context(|| format!("Failed to load heart rate from {}", args.input.display()))?;
    println!(
        "Loaded {} heart rate samples spanning {:.1}s",
        series.len(),
        series.duration_s()
    );

    if let Some(csv_path) = &args.csv_output {
        output::write_heart_rate_csv(csv_path, &series)?;
        println!("Wrote readable series to {}", csv_path.display());
    }

    let style = PlotStyle {
        width: args.width,
        height: args.height,
        bpm_range: (args.y_min, args.y_max),
        ..PlotStyle::default()
    };

    if !args.view.is_radial() {
        if args.grid_output.is_some() {
            bail!("--grid-output needs --view contour or --view surface");
        }
        if args.t_max.is_some() {
            bail!("--t-max needs --view contour or --view surface");
        }
        if let Some(plot_path) = &args.plot {
            let smoothed = (args.hr_smoothing_window > 0)
                .then(|| smooth_series(&series.bpm_values(), args.hr_smoothing_window));
            plotting::render_timeline(&series, smoothed.as_deref(), plot_path, &style)?;
            println!("Saved timeline to {}", plot_path.display());
        }
        return Ok(());
    }

    let index = TimeIndex::new(&series, args.lookup, args.tolerance)?;
    let t_max = args.t_max.unwrap_or_else(|| index.max_t_max());
    debug!(
        "Radial grid with interval {:.4}s, t_max {:.3}s, resolution {}",
        index.interval(),
        t_max,
        args.resolution
    );

    let surface = build_radial_surface(&index, t_max, args.resolution)
        .with_context(|| format!("Cannot build a radial surface over +/-{}s", t_max))?;
    let (lo, hi) = surface.value_range();
    println!(
        "Built {}x{} radial surface over +/-{:.3}s, BPM {}..{}",
        surface.resolution(),
        surface.resolution(),
        t_max,
        lo,
        hi
    );

    if let Some(grid_path) = &args.grid_output {
        output::write_grid(grid_path, &surface)?;
        println!("Wrote grid to {}", grid_path.display());
    }

    if let Some(plot_path) = &args.plot {
        if args.view == View::Contour {
            plotting::render_contour(&surface, plot_path, &style, args.levels)?;
        } else {
            plotting::render_surface3d(&surface, plot_path, &style)?;
        }
        println!("Saved radial plot to {}", plot_path.display());
    }

    Ok(())
}

fn run_detect(args: &DetectArgs) -> Result<()> {
    let ecg = load_ecg_column(&args.input, args.column)
        .with_context(|| format!("Failed to load ECG from {}", args.input.display()))?;
    info!("Running R peak detection over {} samples at {} Hz", ecg.len(), args.fs);

    let config = DetectorConfig {
        fs: args.fs,
        mains_hz: (!args.no_notch).then_some(args.mains_hz),
        notch_width_hz: args.notch_width,
    };
    let peaks = detect_heart_rate(&ecg, &config)?;

    let bpms: Vec<f64> = peaks.iter().map(|p| p.bpm).collect();
    output::write_values(&args.output, &bpms)?;

    match config.mains_hz {
        Some(mains_hz) => println!("Removed {} Hz mains with a notch filter", mains_hz),
        None => println!("Mains notch disabled"),
    }
    println!("Detected {} beats, wrote BPM to {}", bpms.len(), args.output.display());
    Ok(())
}

fn run_info(args: &InfoArgs) -> Result<()> {
    let series = load_heart_rate_series(&args.input, args.time_unit)
        .with_context(|| format!("Failed to load heart rate from {}", args.input.display()))?;
    let summary = SeriesSummary::from_series(&series, args.tolerance)?;
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}

fn main() -> Result<()> {
    env_logger::init();

    let args = Args::parse();
    match &args.command {
        Command::Decimate(a) => run_decimate(a),
        Command::HeartRate(a) => run_heart_rate(a),
        Command::Detect(a) => run_detect(a),
        Command::Info(a) => run_info(a),
    }
}
