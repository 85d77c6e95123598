use crate::error::{Error, Result};
use log::debug;
use sci_rs::signal::filter::design::{
    butter_dyn, DigitalFilter, FilterBandType, FilterOutputType, Sos,
};
use sci_rs::signal::filter::sosfiltfilt_dyn;
use std::f64::consts::PI;

/// Order of the anti-aliasing low-pass used by [`decimate`]
const DECIMATION_ORDER: usize = 8;

/// Design a digital Butterworth filter as second-order sections.
///
/// Cutoffs are in Hz when `fs` is given, otherwise normalised to Nyquist (0..1).
pub fn butterworth_sos(
    order: usize,
    cutoffs: Vec<f64>,
    band: FilterBandType,
    fs: Option<f64>,
) -> Result<Vec<Sos<f64>>> {
    let nyquist = fs.map(|fs| fs / 2.0).unwrap_or(1.0);
    if order == 0 {
        return Err(Error::InvalidParameter("filter order must be at least 1".into()));
    }
    if cutoffs.iter().any(|&c| !(c > 0.0 && c < nyquist)) {
        return Err(Error::InvalidParameter(format!(
            "cutoffs {:?} must lie strictly between 0 and {}",
            cutoffs, nyquist
        )));
    }

    match butter_dyn(
        order,
        cutoffs,
        Some(band),
        Some(false),
        Some(FilterOutputType::Sos),
        fs,
    ) {
        DigitalFilter::Sos(filter) => Ok(filter.sos),
        _ => Err(Error::InvalidParameter(
            "filter design did not produce second-order sections".into(),
        )),
    }
}

/// Downsample by an integer factor after zero-phase anti-alias filtering.
///
/// The low-pass sits at 0.8 of the new Nyquist frequency. Samples 0, factor,
/// 2*factor... are kept and a trailing partial block is dropped, so the result
/// has `signal.len() / factor` samples.
pub fn decimate(signal: &[f64], factor: usize) -> Result<Vec<f64>> {
    if factor == 0 {
        return Err(Error::InvalidParameter(
            "decimation factor must be at least 1".into(),
        ));
    }
    if factor == 1 {
        return Ok(signal.to_vec());
    }

    let sos = butterworth_sos(
        DECIMATION_ORDER,
        vec![0.8 / factor as f64],
        FilterBandType::Lowpass,
        None,
    )?;

    // sosfiltfilt pads both ends with an odd extension of this length
    let padlen = 3 * (2 * sos.len() + 1);
    if signal.len() <= padlen {
        return Err(Error::SignalTooShort {
            len: signal.len(),
            required: padlen + 1,
        });
    }

    let filtered = sosfiltfilt_dyn(signal.iter(), &sos);
    let kept = signal.len() / factor;
    debug!(
        "Decimating {} samples by {} -> {} samples ({} sections)",
        signal.len(),
        factor,
        kept,
        sos.len()
    );

    Ok(filtered.into_iter().step_by(factor).take(kept).collect())
}

/// Divide every sample by a constant, e.g. ADC units to volts.
pub fn scale(signal: &[f64], divisor: f64) -> Result<Vec<f64>> {
    if divisor == 0.0 || !divisor.is_finite() {
        return Err(Error::InvalidParameter(format!(
            "divisor must be finite and non-zero, got {}",
            divisor
        )));
    }
    Ok(signal.iter().map(|x| x / divisor).collect())
}

/// Second-order notch at the mains frequency.
///
/// `width_hz` is the -3 dB bandwidth, so Q = mains_hz / width_hz.
pub fn mains_notch(fs: f64, mains_hz: f64, width_hz: f64) -> Result<Sos<f64>> {
    if !(fs > 0.0) {
        return Err(Error::InvalidParameter("fs must be positive".into()));
    }
    if !(width_hz > 0.0) {
        return Err(Error::InvalidParameter("notch width must be positive".into()));
    }

    let w0 = 2.0 * mains_hz / fs;
    if !(w0 > 0.0 && w0 < 1.0) {
        return Err(Error::InvalidParameter(format!(
            "mains frequency {} Hz must be below Nyquist ({} Hz)",
            mains_hz,
            fs / 2.0
        )));
    }

    let q = mains_hz / width_hz;
    let bw = w0 / q * PI;
    let w0 = w0 * PI;

    let beta = (bw / 2.0).tan();
    let gain = 1.0 / (1.0 + beta);

    let b = [gain, -2.0 * gain * w0.cos(), gain];
    let a = [1.0, -2.0 * gain * w0.cos(), 2.0 * gain - 1.0];

    Ok(Sos::new(b, a))
}

/// Gaussian-weighted centred moving average.
pub fn smooth_series(values: &[f64], window_size: usize) -> Vec<f64> {
    if window_size <= 1 || values.is_empty() {
        return values.to_vec();
    }

    let half_window = window_size / 2;
    let sigma = window_size as f64 / 4.0;

    (0..values.len())
        .map(|i| {
            let start = i.saturating_sub(half_window);
            let end = (i + half_window + 1).min(values.len());

            let mut weighted_sum = 0.0;
            let mut weight_sum = 0.0;
            for (j, value) in values[start..end].iter().enumerate() {
                let x = ((start + j) as f64 - i as f64) / sigma;
                let weight = (-0.5 * x * x).exp();
                weighted_sum += value * weight;
                weight_sum += weight;
            }

            weighted_sum / weight_sum
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use sci_rs::signal::filter::sosfilt_dyn;

    fn tone(freq: f64, fs: f64, len: usize) -> Vec<f64> {
        (0..len)
            .map(|i| (2.0 * PI * freq * i as f64 / fs).sin())
            .collect()
    }

    fn rms(values: &[f64]) -> f64 {
        (values.iter().map(|v| v * v).sum::<f64>() / values.len() as f64).sqrt()
    }

    #[test]
    fn decimated_length_is_floor_of_ratio() {
        for len in [1000, 1001, 1002, 1003] {
            let signal = tone(5.0, 1000.0, len);
            assert_eq!(decimate(&signal, 4).unwrap().len(), len / 4);
        }
    }

    #[test]
    fn decimation_keeps_passband_and_removes_alias() {
        let fs = 1000.0;
        let low = tone(5.0, fs, 4000);
        let high = tone(300.0, fs, 4000);
        let mixed: Vec<f64> = low.iter().zip(high.iter()).map(|(a, b)| a + b).collect();

        let out = decimate(&mixed, 4).unwrap();
        let expected: Vec<f64> = low.iter().step_by(4).copied().collect();

        // stay clear of the edges where padding dominates
        let middle = 100..out.len() - 100;
        let error: Vec<f64> = out[middle.clone()]
            .iter()
            .zip(expected[middle].iter())
            .map(|(a, b)| a - b)
            .collect();
        assert!(rms(&error) < 0.02, "residual rms {}", rms(&error));
    }

    #[test]
    fn factor_one_is_identity_and_zero_is_rejected() {
        let signal = vec![1.0, 2.0, 3.0];
        assert_eq!(decimate(&signal, 1).unwrap(), signal);
        assert!(matches!(
            decimate(&signal, 0),
            Err(Error::InvalidParameter(_))
        ));
    }

    #[test]
    fn short_signal_is_rejected() {
        assert!(matches!(
            decimate(&[0.0; 10], 4),
            Err(Error::SignalTooShort { len: 10, .. })
        ));
    }

    #[test]
    fn scale_divides_and_rejects_zero() {
        assert_eq!(scale(&[500.0, -250.0], 500.0).unwrap(), vec![1.0, -0.5]);
        assert!(scale(&[1.0], 0.0).is_err());
        assert!(scale(&[1.0], f64::NAN).is_err());
    }

    #[test]
    fn notch_removes_mains_and_passes_low_frequencies() {
        let fs = 250.0;
        let mut sections = vec![mains_notch(fs, 50.0, 2.0).unwrap()];
        let hum = sosfilt_dyn(tone(50.0, fs, 5000).iter(), &mut sections);
        assert!(rms(&hum[2500..]) < 0.05);

        let mut sections = vec![mains_notch(fs, 50.0, 2.0).unwrap()];
        let slow = sosfilt_dyn(tone(5.0, fs, 5000).iter(), &mut sections);
        assert!((rms(&slow[2500..]) - rms(&tone(5.0, fs, 2500))).abs() < 0.05);
    }

    #[test]
    fn notch_above_nyquist_is_rejected() {
        assert!(mains_notch(80.0, 50.0, 2.0).is_err());
    }

    #[test]
    fn notch_rejects_nan_parameters() {
        assert!(mains_notch(f64::NAN, 50.0, 2.0).is_err());
        assert!(mains_notch(250.0, 50.0, f64::NAN).is_err());
        assert!(mains_notch(250.0, f64::NAN, 2.0).is_err());
        assert!(mains_notch(250.0, 50.0, 0.0).is_err());
    }

    #[test]
    fn smoothing_preserves_constants_and_length() {
        let flat = vec![70.0; 25];
        let smoothed = smooth_series(&flat, 7);
        assert_eq!(smoothed.len(), flat.len());
        assert!(smoothed.iter().all(|v| (v - 70.0).abs() < 1e-9));
        assert_eq!(smooth_series(&[1.0, 5.0], 0), vec![1.0, 5.0]);
    }

    #[test]
    fn smoothing_damps_a_spike() {
        let mut values = vec![60.0; 21];
        values[10] = 120.0;
        let smoothed = smooth_series(&values, 9);
        assert!(smoothed[10] < 90.0);
        assert!(smoothed[9] > 60.0);
    }
}
