use crate::error::{Error, Result};
use crate::preprocessing::{butterworth_sos, mains_notch};
use chrono::{DateTime, Utc};
use log::{debug, trace};
use sci_rs::signal::filter::design::{FilterBandType, Sos};
use sci_rs::signal::filter::sosfilt_dyn;
use serde::Serialize;
use std::str::FromStr;

/// One heart rate reading.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct HeartRateSample {
    /// Seconds since the first sample of the series
    pub elapsed_s: f64,
    pub bpm: f64,
    /// Absolute time, present when the source carried epoch timestamps
    pub timestamp: Option<DateTime<Utc>>,
}

/// Non-empty heart rate series with non-decreasing elapsed time.
#[derive(Debug, Clone)]
pub struct HeartRateSeries {
    samples: Vec<HeartRateSample>,
}

impl HeartRateSeries {
    pub fn new(samples: Vec<HeartRateSample>) -> Result<Self> {
        if samples.is_empty() {
            return Err(Error::EmptySeries);
        }

        for (i, pair) in samples.windows(2).enumerate() {
            if !(pair[1].elapsed_s >= pair[0].elapsed_s) {
                return Err(Error::NonMonotonicTime {
                    index: i + 1,
                    previous: pair[0].elapsed_s,
                    current: pair[1].elapsed_s,
                });
            }
        }

        Ok(Self { samples })
    }

    /// Series from (elapsed seconds, bpm) pairs without absolute timestamps.
    pub fn from_pairs(pairs: &[(f64, f64)]) -> Result<Self> {
        Self::new(
            pairs
                .iter()
                .map(|&(elapsed_s, bpm)| HeartRateSample {
                    elapsed_s,
                    bpm,
                    timestamp: None,
                })
                .collect(),
        )
    }

    pub fn samples(&self) -> &[HeartRateSample] {
        &self.samples
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn duration_s(&self) -> f64 {
        self.samples[self.samples.len() - 1].elapsed_s - self.samples[0].elapsed_s
    }

    pub fn bpm_values(&self) -> Vec<f64> {
        self.samples.iter().map(|s| s.bpm).collect()
    }

    pub fn start_time(&self) -> Option<DateTime<Utc>> {
        self.samples[0].timestamp
    }

    pub fn end_time(&self) -> Option<DateTime<Utc>> {
        self.samples[self.samples.len() - 1].timestamp
    }
}

/// How a radius in seconds is turned into a sample index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lookup {
    /// `round(elapsed / measured interval)`, needs quasi-uniform sampling
    Interval,
    /// Sample with the nearest elapsed time
    Nearest,
}

impl FromStr for Lookup {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "interval" => Ok(Lookup::Interval),
            "nearest" => Ok(Lookup::Nearest),
            _ => Err(format!(
                "Invalid lookup: {}. Use interval for uniformly sampled series or nearest for per-beat logs",
                s
            )),
        }
    }
}

/// Validated mapping from elapsed time to sample index.
#[derive(Debug, Clone)]
pub struct TimeIndex<'a> {
    series: &'a HeartRateSeries,
    lookup: Lookup,
    interval: f64,
}

impl<'a> TimeIndex<'a> {
    /// Measure the sampling interval of `series`.
    ///
    /// With [`Lookup::Interval`] every step must stay within `tolerance`
    /// (relative) of the median step. A single-sample series is treated as 1 Hz.
    pub fn new(series: &'a HeartRateSeries, lookup: Lookup, tolerance: f64) -> Result<Self> {
        if !(tolerance >= 0.0) {
            return Err(Error::InvalidParameter(format!(
                "tolerance must be non-negative, got {}",
                tolerance
            )));
        }

        let steps: Vec<f64> = series
            .samples()
            .windows(2)
            .map(|w| w[1].elapsed_s - w[0].elapsed_s)
            .collect();

        let interval = match lookup {
            Lookup::Interval => median(&steps).unwrap_or(1.0),
            Lookup::Nearest if steps.is_empty() => 1.0,
            Lookup::Nearest => series.duration_s() / steps.len() as f64,
        };

        if !(interval > 0.0) || !interval.is_finite() {
            return Err(Error::InvalidParameter(format!(
                "series has no usable sampling interval (measured {}s)",
                interval
            )));
        }

        if lookup == Lookup::Interval {
            for (i, &step) in steps.iter().enumerate() {
                if (step - interval).abs() > tolerance * interval {
                    return Err(Error::IrregularSampling {
                        index: i + 1,
                        found: step,
                        expected: interval,
                        tolerance,
                    });
                }
            }

            // small per-step deviations must not add up to a shifted index
            for (i, sample) in series.samples().iter().enumerate() {
                let expected = i as f64 * interval;
                if (sample.elapsed_s - expected).abs() > tolerance * interval {
                    return Err(Error::IrregularSampling {
                        index: i,
                        found: sample.elapsed_s,
                        expected,
                        tolerance,
                    });
                }
            }
        }

        debug!(
            "Time index over {} samples: {:?} lookup, interval {:.4}s",
            series.len(),
            lookup,
            interval
        );

        Ok(Self {
            series,
            lookup,
            interval,
        })
    }

    /// Measured (median or mean) sampling interval in seconds.
    pub fn interval(&self) -> f64 {
        self.interval
    }

    pub fn lookup(&self) -> Lookup {
        self.lookup
    }

    pub fn series(&self) -> &'a HeartRateSeries {
        self.series
    }

    /// Index of the sample at `elapsed_s` seconds.
    pub fn index_of(&self, elapsed_s: f64) -> Result<usize> {
        let len = self.series.len();
        let samples = self.series.samples();

        let index = match self.lookup {
            Lookup::Interval => (elapsed_s / self.interval).round() as usize,
            Lookup::Nearest => {
                let last = samples[len - 1].elapsed_s;
                if elapsed_s >= last + self.interval / 2.0 {
                    len
                } else {
                    let upper = samples.partition_point(|s| s.elapsed_s < elapsed_s);
                    if upper == 0 {
                        0
                    } else if upper == len {
                        len - 1
                    } else if elapsed_s - samples[upper - 1].elapsed_s
                        < samples[upper].elapsed_s - elapsed_s
                    {
                        upper - 1
                    } else {
                        upper
                    }
                }
            }
        };

        if index >= len {
            return Err(Error::OutOfCoverage {
                radius: elapsed_s,
                index,
                len,
            });
        }
        Ok(index)
    }

    pub fn bpm_at(&self, elapsed_s: f64) -> Result<f64> {
        Ok(self.series.samples()[self.index_of(elapsed_s)?].bpm)
    }

    /// Largest grid half-width whose corners still land on a sample.
    pub fn max_t_max(&self) -> f64 {
        let reach = match self.lookup {
            Lookup::Interval => (self.series.len() - 1) as f64 * self.interval,
            Lookup::Nearest => self.series.samples()[self.series.len() - 1].elapsed_s,
        };
        reach / std::f64::consts::SQRT_2
    }
}

fn median(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        Some((sorted[mid - 1] + sorted[mid]) / 2.0)
    } else {
        Some(sorted[mid])
    }
}

/// R peak accepted by [`RPeakDetector`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RPeak {
    /// Sample number since the last reset
    pub sample: u64,
    pub bpm: f64,
    /// Adaptive amplitude of the detector output at the time of the peak
    pub amplitude: f64,
    /// Detector output over threshold, 1 is just enough
    pub confidence: f64,
}

#[derive(Debug, Clone, Copy)]
pub struct DetectorConfig {
    pub fs: f64,
    /// Mains frequency to notch out before detection, `None` to skip
    pub mains_hz: Option<f64>,
    pub notch_width_hz: f64,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            fs: 250.0,
            mains_hz: Some(50.0),
            notch_width_hz: 2.0,
        }
    }
}

// how fast the adaptive amplitude decays, per second
const AMPLITUDE_DECAY: f64 = 0.25;
// detection threshold relative to the adaptive amplitude
const THRESHOLD_FACTOR: f64 = 0.6;
// band-passed output above this (mV) is an artefact
const ARTEFACT_THRESHOLD_MV: f64 = 10.0;
const MIN_BPM: f64 = 30.0;
const MAX_BPM: f64 = 250.0;

/// Streaming R-peak detector with an adaptive threshold.
///
/// Input is ECG in volts. Filter state carries over between [`process`]
/// calls, so a recording can be fed in chunks.
///
/// [`process`]: RPeakDetector::process
#[derive(Debug, Clone)]
pub struct RPeakDetector {
    fs: f64,
    highpass_design: Vec<Sos<f64>>,
    bandpass_design: Vec<Sos<f64>>,
    highpass: Vec<Sos<f64>>,
    bandpass: Vec<Sos<f64>>,
    timestamp: u64,
    last_peak: u64,
    prev_bpm: f64,
    do_not_detect: usize,
    ignore_rr: u32,
    ignore_ecg: usize,
    amplitude: f64,
}

impl RPeakDetector {
    pub fn new(fs: f64) -> Result<Self> {
        let highpass = butterworth_sos(2, vec![5.0], FilterBandType::Highpass, Some(fs))?;
        let bandpass = butterworth_sos(2, vec![12.5, 27.5], FilterBandType::Bandpass, Some(fs))?;

        let mut detector = Self {
            fs,
            highpass: highpass.clone(),
            bandpass: bandpass.clone(),
            highpass_design: highpass,
            bandpass_design: bandpass,
            timestamp: 0,
            last_peak: 0,
            prev_bpm: 0.0,
            do_not_detect: 0,
            ignore_rr: 2,
            ignore_ecg: 0,
            amplitude: 0.0,
        };
        detector.reset();
        Ok(detector)
    }

    pub fn reset(&mut self) {
        self.highpass = self.highpass_design.clone();
        self.bandpass = self.bandpass_design.clone();
        self.amplitude = 0.0;
        self.last_peak = 0;
        self.timestamp = 0;
        // one second for the filters to settle
        self.do_not_detect = self.fs as usize;
        self.ignore_ecg = self.fs as usize;
    }

    pub fn amplitude(&self) -> f64 {
        self.amplitude
    }

    pub fn process(&mut self, samples: &[f64]) -> Vec<RPeak> {
        let millivolts: Vec<f64> = samples.iter().map(|v| v * 1000.0).collect();
        let highpassed = sosfilt_dyn(millivolts.iter(), &mut self.highpass);
        let bandpassed = sosfilt_dyn(highpassed.iter(), &mut self.bandpass);

        bandpassed.into_iter().filter_map(|h| self.step(h)).collect()
    }

    fn step(&mut self, filtered: f64) -> Option<RPeak> {
        let sample = self.timestamp;
        self.timestamp += 1;

        if self.ignore_ecg > 0 {
            self.ignore_ecg -= 1;
            return None;
        }

        let h = filtered * filtered;
        if h.sqrt() > ARTEFACT_THRESHOLD_MV {
            trace!("Artefact at sample {}: {:.2} mV", sample, h.sqrt());
            self.ignore_ecg = self.fs as usize;
            self.ignore_rr = 2;
            return None;
        }

        if h > self.amplitude {
            self.amplitude = h;
        }
        self.amplitude -= AMPLITUDE_DECAY * self.amplitude / self.fs;

        if self.do_not_detect > 0 {
            self.do_not_detect -= 1;
            return None;
        }

        let threshold = THRESHOLD_FACTOR * self.amplitude;
        if h <= threshold {
            return None;
        }

        let bpm = 60.0 * self.fs / (sample - self.last_peak) as f64;
        let mut peak = None;

        if bpm > MIN_BPM && bpm < MAX_BPM {
            if self.ignore_rr > 0 {
                self.ignore_rr -= 1;
            } else {
                if bpm * 1.5 < self.prev_bpm || bpm * 0.75 > self.prev_bpm {
                    trace!("Rejecting jump {:.1} -> {:.1} bpm", self.prev_bpm, bpm);
                    self.ignore_rr = 3;
                } else {
                    peak = Some(RPeak {
                        sample,
                        bpm,
                        amplitude: self.amplitude,
                        confidence: h / threshold,
                    });
                }
                self.prev_bpm = bpm;
            }
        } else {
            self.ignore_rr = 3;
        }

        self.last_peak = sample;
        // no second detection within 200 ms
        self.do_not_detect = (self.fs / 5.0) as usize;
        peak
    }
}

/// Run the full detection chain over a recording in volts.
pub fn detect_heart_rate(ecg: &[f64], config: &DetectorConfig) -> Result<Vec<RPeak>> {
    let input = match config.mains_hz {
        Some(mains_hz) => {
            let mut notch = vec![mains_notch(config.fs, mains_hz, config.notch_width_hz)?];
            sosfilt_dyn(ecg.iter(), &mut notch)
        }
        None => ecg.to_vec(),
    };

    let mut detector = RPeakDetector::new(config.fs)?;
    let peaks = detector.process(&input);
    debug!(
        "Detected {} R peaks in {} samples at {} Hz",
        peaks.len(),
        ecg.len(),
        config.fs
    );
    Ok(peaks)
}
