//! Zero-phase digital filters for windowed biosignals
//!
//! Filters are designed once as cascades of second-order sections and applied
//! forward-backward over the whole window on every processed tick. The window
//! is small, so recomputing from scratch replaces stateful streaming taps.

use neurocast_core::{NeurocastError, NeurocastResult, SlidingWindowBuffer};
use num_complex::Complex64;
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// Order of the Butterworth lowpass prototype used for the bandpass
pub const BANDPASS_ORDER: usize = 4;

/// Quality factor of the notch filter
pub const NOTCH_QUALITY: f64 = 30.0;

/// Bandpass, optional notch and clamp bounds applied to every processed window
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterSpec {
    /// Lower bandpass corner (Hz)
    pub lowcut_hz: f64,
    /// Upper bandpass corner (Hz)
    pub highcut_hz: f64,
    /// Notch centre (Hz); `None` or 0 disables the notch
    pub notch_hz: Option<f64>,
    /// Lower clamp bound
    pub min_threshold: f64,
    /// Upper clamp bound
    pub max_threshold: f64,
}

impl FilterSpec {
    /// Notch frequency when the notch is enabled
    pub fn notch(&self) -> Option<f64> {
        self.notch_hz.filter(|&f| f != 0.0)
    }

    /// Check the specification against a sampling rate
    pub fn validate(&self, sample_rate: f64) -> NeurocastResult<()> {
        let nyquist = sample_rate / 2.0;

        if !(sample_rate.is_finite() && sample_rate > 0.0) {
            return Err(filter_error(format!("sampling rate must be positive, got {} Hz", sample_rate)));
        }
        if !(self.lowcut_hz.is_finite() && self.lowcut_hz > 0.0) {
            return Err(filter_error(format!("low cutoff must be positive, got {} Hz", self.lowcut_hz)));
        }
        if !(self.highcut_hz.is_finite() && self.highcut_hz > self.lowcut_hz) {
            return Err(filter_error(format!(
                "high cutoff ({} Hz) must be greater than low cutoff ({} Hz)",
                self.highcut_hz, self.lowcut_hz
            )));
        }
        if self.highcut_hz >= nyquist {
            return Err(filter_error(format!(
                "high cutoff ({} Hz) must be less than Nyquist ({} Hz)",
                self.highcut_hz, nyquist
            )));
        }
        if let Some(notch) = self.notch() {
            if !(notch.is_finite() && notch > 0.0 && notch < nyquist) {
                return Err(filter_error(format!(
                    "notch frequency ({} Hz) must lie in (0, {}) Hz",
                    notch, nyquist
                )));
            }
        }
        if !(self.min_threshold.is_finite() && self.max_threshold.is_finite())
            || self.min_threshold >= self.max_threshold
        {
            return Err(filter_error(format!(
                "clamp bounds [{}, {}] are not an interval",
                self.min_threshold, self.max_threshold
            )));
        }

        Ok(())
    }
}

impl Default for FilterSpec {
    fn default() -> Self {
        FilterSpec {
            lowcut_hz: 1.0,
            highcut_hz: 50.0,
            notch_hz: Some(50.0),
            min_threshold: -100.0,
            max_threshold: 100.0,
        }
    }
}

fn filter_error(reason: String) -> NeurocastError {
    NeurocastError::InvalidFilterSpec { reason }
}

/// Second-order section coefficients
/// Transfer function: H(z) = (b0 + b1*z^-1 + b2*z^-2) / (1 + a1*z^-1 + a2*z^-2)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BiquadCoeffs {
    pub b0: f64,
    pub b1: f64,
    pub b2: f64,
    pub a1: f64,
    pub a2: f64,
}

impl BiquadCoeffs {
    /// Gain at DC
    pub fn dc_gain(&self) -> f64 {
        (self.b0 + self.b1 + self.b2) / (1.0 + self.a1 + self.a2)
    }

    /// Magnitude response at `frequency` for a given sampling rate
    pub fn magnitude(&self, frequency: f64, sample_rate: f64) -> f64 {
        let z_inv = Complex64::from_polar(1.0, -2.0 * PI * frequency / sample_rate);
        let z_inv2 = z_inv * z_inv;
        let num = self.b0 + z_inv * self.b1 + z_inv2 * self.b2;
        let den = 1.0 + z_inv * self.a1 + z_inv2 * self.a2;
        (num / den).norm()
    }

    /// Direct Form II transposed state reached after a unit step has settled
    fn steady_state(&self) -> [f64; 2] {
        let rhs1 = self.b1 - self.a1 * self.b0;
        let rhs2 = self.b2 - self.a2 * self.b0;
        let z1 = (rhs1 + rhs2) / (1.0 + self.a1 + self.a2);
        [z1, rhs2 - self.a2 * z1]
    }

    #[inline]
    fn process(&self, input: f64, state: &mut [f64; 2]) -> f64 {
        let output = self.b0 * input + state[0];
        state[0] = self.b1 * input - self.a1 * output + state[1];
        state[1] = self.b2 * input - self.a2 * output;
        output
    }
}

/// Cascade of second-order sections
#[derive(Debug, Clone, PartialEq)]
pub struct SosFilter {
    sections: Vec<BiquadCoeffs>,
}

impl SosFilter {
    pub fn new(sections: Vec<BiquadCoeffs>) -> Self {
        SosFilter { sections }
    }

    pub fn sections(&self) -> &[BiquadCoeffs] {
        &self.sections
    }

    /// Magnitude response of the whole cascade
    pub fn magnitude(&self, frequency: f64, sample_rate: f64) -> f64 {
        self.sections
            .iter()
            .map(|s| s.magnitude(frequency, sample_rate))
            .product()
    }

    /// Edge padding used by `filtfilt`
    pub fn pad_len(&self) -> usize {
        let trailing_zero_b = self.sections.iter().filter(|s| s.b2 == 0.0).count();
        let trailing_zero_a = self.sections.iter().filter(|s| s.a2 == 0.0).count();
        let taps = 2 * self.sections.len() + 1 - trailing_zero_b.min(trailing_zero_a);
        3 * taps
    }

    /// Filter in place, starting every section from the steady state of a
    /// constant input equal to the first sample.
    pub fn filter_in_place(&self, signal: &mut [f64]) {
        let Some(&first) = signal.first() else {
            return;
        };

        let mut scale = 1.0;
        for section in &self.sections {
            let [z1, z2] = section.steady_state();
            let mut state = [z1 * scale * first, z2 * scale * first];
            for value in signal.iter_mut() {
                *value = section.process(*value, &mut state);
            }
            scale *= section.dc_gain();
        }
    }

    /// Zero-phase forward-backward filtering with odd extension at both edges
    pub fn filtfilt(&self, signal: &[f64]) -> Vec<f64> {
        let n = signal.len();
        if n == 0 {
            return Vec::new();
        }

        let pad = self.pad_len().min(n - 1);
        let first = signal[0];
        let last = signal[n - 1];

        let mut extended = Vec::with_capacity(n + 2 * pad);
        extended.extend((1..=pad).rev().map(|i| 2.0 * first - signal[i]));
        extended.extend_from_slice(signal);
        extended.extend((n - 1 - pad..n - 1).rev().map(|i| 2.0 * last - signal[i]));

        self.filter_in_place(&mut extended);
        extended.reverse();
        self.filter_in_place(&mut extended);
        extended.reverse();

        extended.drain(..pad);
        extended.truncate(n);
        extended
    }
}

/// Butterworth filter designer
pub struct ButterworthFilter;

impl ButterworthFilter {
    /// Design a bandpass from an `order`-pole lowpass prototype.
    ///
    /// The bandpass transform doubles the pole count, so the result has
    /// `order` sections. Corners are pre-warped for the bilinear transform.
    pub fn bandpass(low_hz: f64, high_hz: f64, sample_rate: f64, order: usize) -> NeurocastResult<SosFilter> {
        let nyquist = sample_rate / 2.0;
        if order == 0 {
            return Err(filter_error("filter order must be at least 1".to_string()));
        }
        if !(low_hz > 0.0 && low_hz < high_hz && high_hz < nyquist) {
            return Err(filter_error(format!(
                "bandpass corners [{}, {}] Hz must satisfy 0 < low < high < {} Hz",
                low_hz, high_hz, nyquist
            )));
        }

        // Analog design on a normalised sampling rate of 2
        let bilinear_k = 4.0;
        let warped_low = bilinear_k * (PI * low_hz / sample_rate).tan();
        let warped_high = bilinear_k * (PI * high_hz / sample_rate).tan();
        let bandwidth = warped_high - warped_low;
        let centre_sq = warped_low * warped_high;

        let mut analog_poles = Vec::with_capacity(2 * order);
        for k in 0..order {
            let theta = PI * (2 * k + order + 1) as f64 / (2 * order) as f64;
            let prototype = Complex64::from_polar(1.0, theta) * (bandwidth / 2.0);
            let offset = (prototype * prototype - centre_sq).sqrt();
            analog_poles.push(prototype + offset);
            analog_poles.push(prototype - offset);
        }

        // `order` zeros at s = 0 map to z = 1, the rest to z = -1
        let denominator: Complex64 = analog_poles.iter().map(|p| bilinear_k - *p).product();
        let gain = (bandwidth.powi(order as i32) * bilinear_k.powi(order as i32) / denominator).re;

        let digital_poles: Vec<Complex64> = analog_poles
            .iter()
            .map(|p| (bilinear_k + *p) / (bilinear_k - *p))
            .collect();

        let mut sections = pair_poles(&digital_poles)
            .into_iter()
            .map(|(a1, a2)| BiquadCoeffs { b0: 1.0, b1: 0.0, b2: -1.0, a1, a2 })
            .collect::<Vec<_>>();

        if let Some(first) = sections.first_mut() {
            first.b0 *= gain;
            first.b2 *= gain;
        }

        Ok(SosFilter::new(sections))
    }
}

/// Group poles into conjugate (or real) pairs and return each pair's
/// denominator coefficients `(a1, a2)`.
fn pair_poles(poles: &[Complex64]) -> Vec<(f64, f64)> {
    const IMAG_TOLERANCE: f64 = 1e-12;

    let mut pairs: Vec<(f64, f64)> = poles
        .iter()
        .filter(|p| p.im > IMAG_TOLERANCE)
        .map(|p| (-2.0 * p.re, p.norm_sqr()))
        .collect();

    let real: Vec<f64> = poles
        .iter()
        .filter(|p| p.im.abs() <= IMAG_TOLERANCE)
        .map(|p| p.re)
        .collect();
    for pair in real.chunks(2) {
        match pair {
            [r1, r2] => pairs.push((-(r1 + r2), r1 * r2)),
            [r] => pairs.push((-r, 0.0)),
            _ => {}
        }
    }

    pairs
}

/// Notch (band-reject) filter for powerline interference
pub struct NotchFilter;

impl NotchFilter {
    /// Design a second-order notch at `center_hz` with quality factor `q`
    pub fn design(center_hz: f64, sample_rate: f64, q: f64) -> NeurocastResult<SosFilter> {
        let nyquist = sample_rate / 2.0;
        if !(center_hz > 0.0 && center_hz < nyquist) {
            return Err(filter_error(format!(
                "notch frequency ({} Hz) must lie in (0, {}) Hz",
                center_hz, nyquist
            )));
        }
        if !(q > 0.0) {
            return Err(filter_error(format!("notch quality factor must be positive, got {}", q)));
        }

        let w0 = PI * center_hz / nyquist;
        let beta = (w0 / q / 2.0).tan();
        let gain = 1.0 / (1.0 + beta);
        let cos_w0 = w0.cos();

        Ok(SosFilter::new(vec![BiquadCoeffs {
            b0: gain,
            b1: -2.0 * gain * cos_w0,
            b2: gain,
            a1: -2.0 * gain * cos_w0,
            a2: 2.0 * gain - 1.0,
        }]))
    }
}

/// Filter output for one window, stored `[channel][time]`
#[derive(Debug, Clone, PartialEq)]
pub struct FilteredWindow {
    channels: Vec<Vec<f64>>,
}

impl FilteredWindow {
    pub fn channels(&self) -> &[Vec<f64>] {
        &self.channels
    }

    /// Samples per channel
    pub fn len(&self) -> usize {
        self.channels.first().map_or(0, Vec::len)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Values of every channel at time index `index`
    pub fn row(&self, index: usize) -> Option<Vec<f64>> {
        if index >= self.len() {
            return None;
        }
        Some(self.channels.iter().map(|c| c[index]).collect())
    }

    /// The last `count` rows, oldest first
    pub fn tail_rows(&self, count: usize) -> impl Iterator<Item = Vec<f64>> + '_ {
        let len = self.len();
        (len - count.min(len)..len).filter_map(move |i| self.row(i))
    }
}

/// Bandpass, optional notch, then clamp, designed once for a sampling rate
#[derive(Debug, Clone)]
pub struct FilterPipeline {
    spec: FilterSpec,
    sample_rate: f64,
    bandpass: SosFilter,
    notch: Option<SosFilter>,
}

impl FilterPipeline {
    /// Validate `spec` and design its filters
    pub fn design(spec: FilterSpec, sample_rate: f64) -> NeurocastResult<Self> {
        spec.validate(sample_rate)?;

        let bandpass = ButterworthFilter::bandpass(spec.lowcut_hz, spec.highcut_hz, sample_rate, BANDPASS_ORDER)?;
        let notch = spec
            .notch()
            .map(|f| NotchFilter::design(f, sample_rate, NOTCH_QUALITY))
            .transpose()?;

        tracing::debug!(
            lowcut_hz = spec.lowcut_hz,
            highcut_hz = spec.highcut_hz,
            notch_hz = ?spec.notch(),
            sections = bandpass.sections().len(),
            "designed filter pipeline"
        );

        Ok(FilterPipeline {
            spec,
            sample_rate,
            bandpass,
            notch,
        })
    }

    pub fn spec(&self) -> &FilterSpec {
        &self.spec
    }

    pub fn sample_rate(&self) -> f64 {
        self.sample_rate
    }

    /// Magnitude response of bandpass and notch combined (one pass)
    pub fn magnitude(&self, frequency: f64) -> f64 {
        let notch = self
            .notch
            .as_ref()
            .map_or(1.0, |n| n.magnitude(frequency, self.sample_rate));
        self.bandpass.magnitude(frequency, self.sample_rate) * notch
    }

    /// Filter one channel's samples
    pub fn filter_channel(&self, samples: &[f64]) -> Vec<f64> {
        let mut filtered = self.bandpass.filtfilt(samples);
        if let Some(notch) = &self.notch {
            filtered = notch.filtfilt(&filtered);
        }
        for value in &mut filtered {
            *value = value.clamp(self.spec.min_threshold, self.spec.max_threshold);
        }
        filtered
    }

    /// Filter every channel independently; input and output are `[channel][time]`
    pub fn filter_channels(&self, channels: &[Vec<f64>]) -> FilteredWindow {
        FilteredWindow {
            channels: channels.iter().map(|c| self.filter_channel(c)).collect(),
        }
    }

    /// Filter the full current window
    pub fn filter_window(&self, window: &SlidingWindowBuffer) -> FilteredWindow {
        self.filter_channels(&window.to_channel_major())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use neurocast_core::Sample;

    fn sine(frequency: f64, amplitude: f64, sample_rate: f64, len: usize) -> Vec<f64> {
        (0..len)
            .map(|i| amplitude * (2.0 * PI * frequency * i as f64 / sample_rate).sin())
            .collect()
    }

    fn rms(data: &[f64]) -> f64 {
        (data.iter().map(|x| x * x).sum::<f64>() / data.len() as f64).sqrt()
    }

    fn spec(notch_hz: Option<f64>) -> FilterSpec {
        FilterSpec {
            notch_hz,
            ..FilterSpec::default()
        }
    }

    #[test]
    fn test_bandpass_response() {
        let filter = ButterworthFilter::bandpass(1.0, 50.0, 125.0, 4).unwrap();
        assert_eq!(filter.sections().len(), 4);

        // -3 dB at both corners, flat in the passband, closed at DC and Nyquist
        assert!((filter.magnitude(1.0, 125.0) - std::f64::consts::FRAC_1_SQRT_2).abs() < 1e-3);
        assert!((filter.magnitude(50.0, 125.0) - std::f64::consts::FRAC_1_SQRT_2).abs() < 1e-3);
        assert!((filter.magnitude(10.0, 125.0) - 1.0).abs() < 1e-3);
        assert!(filter.magnitude(0.01, 125.0) < 1e-3);
        assert!(filter.magnitude(62.4, 125.0) < 1e-2);
    }

    #[test]
    fn test_notch_response() {
        let notch = NotchFilter::design(50.0, 250.0, NOTCH_QUALITY).unwrap();
        assert!(notch.magnitude(50.0, 250.0) < 1e-9);
        assert!((notch.magnitude(10.0, 250.0) - 1.0).abs() < 1e-3);
    }

    #[test]
    fn test_in_band_sinusoid_passes_unattenuated() {
        // 250-sample window at 125 Hz, 10 Hz at amplitude 50, bandpass [1, 50], no notch
        let pipeline = FilterPipeline::design(spec(None), 125.0).unwrap();
        let input = sine(10.0, 50.0, 125.0, 250);
        let output = pipeline.filter_channel(&input);

        assert_eq!(output.len(), input.len());
        let ratio = rms(&output[75..175]) / rms(&input[75..175]);
        assert!((ratio - 1.0).abs() < 0.05, "ratio {}", ratio);
        assert!(output.iter().all(|v| (-100.0..=100.0).contains(v)));
    }

    #[test]
    fn test_zero_phase_alignment() {
        let pipeline = FilterPipeline::design(spec(None), 125.0).unwrap();
        let input = sine(10.0, 20.0, 125.0, 250);
        let output = pipeline.filter_channel(&input);

        // cross-correlation over the interior peaks at zero lag
        let correlation = |lag: isize| -> f64 {
            (75..175)
                .map(|i| input[i] * output[(i as isize + lag) as usize])
                .sum()
        };
        let best_lag = (-3..=3)
            .max_by(|a, b| correlation(*a).total_cmp(&correlation(*b)))
            .unwrap();
        assert_eq!(best_lag, 0);
    }

    #[test]
    fn test_notch_removes_powerline() {
        let pipeline = FilterPipeline::design(
            FilterSpec {
                lowcut_hz: 1.0,
                highcut_hz: 100.0,
                notch_hz: Some(50.0),
                min_threshold: -100.0,
                max_threshold: 100.0,
            },
            250.0,
        )
        .unwrap();
        let input = sine(50.0, 10.0, 250.0, 500);
        let output = pipeline.filter_channel(&input);

        assert!(rms(&output[150..350]) < 0.1 * rms(&input[150..350]));
    }

    #[test]
    fn test_output_is_clamped() {
        let pipeline = FilterPipeline::design(
            FilterSpec {
                min_threshold: -10.0,
                max_threshold: 10.0,
                ..spec(Some(50.0))
            },
            125.0,
        )
        .unwrap();
        let channels = vec![sine(10.0, 80.0, 125.0, 250), sine(20.0, 3.0, 125.0, 250)];
        let filtered = pipeline.filter_channels(&channels);

        for channel in filtered.channels() {
            assert!(channel.iter().all(|v| (-10.0..=10.0).contains(v)));
        }
        assert!(filtered.channels()[0].iter().any(|v| *v == 10.0));
    }

    #[test]
    fn test_degenerate_specs_rejected() {
        let cases = [
            FilterSpec { lowcut_hz: 0.0, ..spec(None) },
            FilterSpec { lowcut_hz: 30.0, highcut_hz: 20.0, ..spec(None) },
            FilterSpec { highcut_hz: 62.5, ..spec(None) },
            FilterSpec { notch_hz: Some(70.0), ..spec(None) },
            FilterSpec { min_threshold: 5.0, max_threshold: 5.0, ..spec(None) },
        ];

        for case in cases {
            let result = FilterPipeline::design(case.clone(), 125.0);
            assert!(
                matches!(result, Err(NeurocastError::InvalidFilterSpec { .. })),
                "{:?} should be rejected",
                case
            );
        }
    }

    #[test]
    fn test_zero_notch_disables() {
        let pipeline = FilterPipeline::design(spec(Some(0.0)), 125.0).unwrap();
        assert_eq!(pipeline.spec().notch(), None);
        assert!((pipeline.magnitude(50.0 - 1e-6) - std::f64::consts::FRAC_1_SQRT_2).abs() < 1e-3);
    }

    #[test]
    fn test_filter_window_and_tail_rows() {
        let mut window = SlidingWindowBuffer::new(250, 2).unwrap();
        let rows: Vec<Sample> = (0..250)
            .map(|i| {
                let t = i as f64 / 125.0;
                Sample::new(i, vec![30.0 * (2.0 * PI * 10.0 * t).sin(), 1.0])
            })
            .collect();
        window.append(&rows).unwrap();

        let pipeline = FilterPipeline::design(spec(Some(50.0)), 125.0).unwrap();
        let filtered = pipeline.filter_window(&window);

        assert_eq!(filtered.len(), 250);
        assert_eq!(filtered.channels().len(), 2);
        let tail: Vec<Vec<f64>> = filtered.tail_rows(3).collect();
        assert_eq!(tail.len(), 3);
        assert_eq!(tail[2], filtered.row(249).unwrap());
        // a constant channel carries no in-band energy
        assert!(filtered.channels()[1][100..150].iter().all(|v| v.abs() < 0.05));
    }

    #[test]
    fn test_short_signal_does_not_panic() {
        let pipeline = FilterPipeline::design(spec(Some(50.0)), 125.0).unwrap();
        assert_eq!(pipeline.filter_channel(&[]).len(), 0);
        assert_eq!(pipeline.filter_channel(&[1.0]).len(), 1);
        assert_eq!(pipeline.filter_channel(&[1.0, -1.0, 0.5]).len(), 3);
    }
}
