//! Welch band power estimation
//!
//! Spectral density per channel is estimated with Welch's method (periodic
//! Hann window, constant detrend, one-sided density scaling), averaged across
//! channels, then averaged over the bins of each band.

use neurocast_core::{BandPowerResult, BandSet, NeurocastError, NeurocastResult};
use realfft::RealFftPlanner;
use std::f64::consts::PI;

/// One-sided power spectral density
#[derive(Debug, Clone, PartialEq)]
pub struct Psd {
    pub frequencies: Vec<f64>,
    pub density: Vec<f64>,
}

impl Psd {
    /// Mean density over bins inside `[low_hz, high_hz]`, 0.0 when no bin falls inside
    pub fn band_mean(&self, low_hz: f64, high_hz: f64) -> f64 {
        let (sum, count) = self
            .frequencies
            .iter()
            .zip(&self.density)
            .filter(|(f, _)| **f >= low_hz && **f <= high_hz)
            .fold((0.0, 0usize), |(sum, count), (_, p)| (sum + p, count + 1));

        if count == 0 {
            0.0
        } else {
            sum / count as f64
        }
    }
}

/// Welch estimator for a fixed band set
pub struct BandPowerEstimator {
    sample_rate: f64,
    bands: BandSet,
    ceiling: f64,
    segment_len: usize,
    overlap: usize,
    planner: RealFftPlanner<f64>,
}

impl std::fmt::Debug for BandPowerEstimator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BandPowerEstimator")
            .field("sample_rate", &self.sample_rate)
            .field("bands", &self.bands)
            .field("ceiling", &self.ceiling)
            .field("segment_len", &self.segment_len)
            .field("overlap", &self.overlap)
            .finish()
    }
}

impl BandPowerEstimator {
    /// Segment length is half a second of samples, overlap a quarter second.
    pub fn new(sample_rate: f64, bands: BandSet, ceiling: f64) -> NeurocastResult<Self> {
        if !sample_rate.is_finite() || sample_rate <= 0.0 {
            return Err(NeurocastError::Spectral {
                reason: format!("sample rate must be positive, got {}", sample_rate),
            });
        }
        if ceiling.is_nan() || ceiling <= 0.0 {
            return Err(NeurocastError::Spectral {
                reason: format!("band power ceiling must be positive, got {}", ceiling),
            });
        }

        let segment_len = (sample_rate / 2.0).floor() as usize;
        if segment_len < 2 {
            return Err(NeurocastError::Spectral {
                reason: format!(
                    "sample rate {} Hz is too low for a spectral segment",
                    sample_rate
                ),
            });
        }
        let overlap = (sample_rate / 4.0).floor() as usize;

        tracing::debug!(
            sample_rate,
            segment_len,
            overlap,
            bands = bands.len(),
            "band power estimator ready"
        );

        Ok(BandPowerEstimator {
            sample_rate,
            bands,
            ceiling,
            segment_len,
            overlap,
            planner: RealFftPlanner::new(),
        })
    }

    pub fn segment_len(&self) -> usize {
        self.segment_len
    }

    pub fn overlap(&self) -> usize {
        self.overlap
    }

    pub fn bands(&self) -> &BandSet {
        &self.bands
    }

    pub fn ceiling(&self) -> f64 {
        self.ceiling
    }

    /// Welch PSD of one channel.
    ///
    /// A signal shorter than the nominal segment is analysed as a single
    /// segment of its own length.
    pub fn welch(&mut self, signal: &[f64]) -> NeurocastResult<Psd> {
        let n = signal.len();
        if n < 2 {
            return Err(NeurocastError::Spectral {
                reason: format!("need at least 2 samples, got {}", n),
            });
        }

        let segment_len = self.segment_len.min(n);
        let overlap = if self.overlap >= segment_len {
            segment_len / 2
        } else {
            self.overlap
        };
        let step = segment_len - overlap;
        let segments = (n - overlap) / step;

        let window: Vec<f64> = (0..segment_len)
            .map(|i| 0.5 - 0.5 * (2.0 * PI * i as f64 / segment_len as f64).cos())
            .collect();
        let scale = 1.0 / (self.sample_rate * window.iter().map(|w| w * w).sum::<f64>());

        let fft = self.planner.plan_fft_forward(segment_len);
        let mut input = fft.make_input_vec();
        let mut spectrum = fft.make_output_vec();
        let bins = spectrum.len();
        let mut density = vec![0.0; bins];

        for s in 0..segments {
            let segment = &signal[s * step..s * step + segment_len];
            let mean = segment.iter().sum::<f64>() / segment_len as f64;
            for ((slot, x), w) in input.iter_mut().zip(segment).zip(&window) {
                *slot = (x - mean) * w;
            }

            fft.process(&mut input, &mut spectrum)
                .map_err(|e| NeurocastError::Spectral {
                    reason: e.to_string(),
                })?;

            for (k, (acc, c)) in density.iter_mut().zip(&spectrum).enumerate() {
                let mut p = c.norm_sqr() * scale;
                let nyquist = segment_len % 2 == 0 && k == segment_len / 2;
                if k != 0 && !nyquist {
                    p *= 2.0;
                }
                *acc += p;
            }
        }

        for p in density.iter_mut() {
            *p /= segments as f64;
        }

        let resolution = self.sample_rate / segment_len as f64;
        let frequencies = (0..bins).map(|k| k as f64 * resolution).collect();

        Ok(Psd {
            frequencies,
            density,
        })
    }

    /// PSD averaged across channels
    pub fn mean_psd(&mut self, channels: &[Vec<f64>]) -> NeurocastResult<Psd> {
        let mut mean: Option<Psd> = None;

        for channel in channels {
            let psd = self.welch(channel)?;
            match mean.as_mut() {
                Some(acc) => {
                    if acc.density.len() != psd.density.len() {
                        return Err(NeurocastError::Spectral {
                            reason: "channels have different lengths".to_string(),
                        });
                    }
                    for (a, p) in acc.density.iter_mut().zip(&psd.density) {
                        *a += p;
                    }
                }
                None => mean = Some(psd),
            }
        }

        let mut mean = mean.ok_or_else(|| NeurocastError::Spectral {
            reason: "no channels to analyse".to_string(),
        })?;
        let count = channels.len() as f64;
        for p in mean.density.iter_mut() {
            *p /= count;
        }
        Ok(mean)
    }

    /// Band powers for a channel-major window, one entry per band in order
    pub fn estimate(&mut self, channels: &[Vec<f64>]) -> NeurocastResult<BandPowerResult> {
        let psd = self.mean_psd(channels)?;

        let mut result = BandPowerResult::with_capacity(self.bands.len());
        for band in self.bands.iter() {
            let power = psd.band_mean(band.low_hz, band.high_hz).min(self.ceiling);
            result.push(&band.name, power);
        }
        Ok(result)
    }
}
