//! Oscillatory patterns for synthetic EEG

use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// One oscillatory component of a simulated channel (amplitudes in µV)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "pattern", rename_all = "snake_case")]
pub enum SignalPattern {
    /// Steady sinusoidal rhythm
    Rhythm { frequency_hz: f64, amplitude: f64 },
    /// Rhythm whose amplitude waxes and wanes (alpha spindles)
    Modulated {
        frequency_hz: f64,
        amplitude: f64,
        modulation_hz: f64,
        /// 0.0 = constant, 1.0 = fully silenced at the trough
        depth: f64,
    },
    /// Rhythm switched on and off in fixed cycles
    Burst {
        frequency_hz: f64,
        amplitude: f64,
        on_secs: f64,
        off_secs: f64,
    },
    /// Slow baseline wander
    Drift { period_secs: f64, amplitude: f64 },
}

impl SignalPattern {
    /// Value at `time` seconds; `phase` offsets the oscillation per channel
    pub fn value_at(&self, time: f64, phase: f64) -> f64 {
        match *self {
            SignalPattern::Rhythm { frequency_hz, amplitude } => {
                amplitude * (2.0 * PI * frequency_hz * time + phase).sin()
            }

            SignalPattern::Modulated { frequency_hz, amplitude, modulation_hz, depth } => {
                let depth = depth.clamp(0.0, 1.0);
                let envelope = 1.0 - depth * 0.5 * (1.0 - (2.0 * PI * modulation_hz * time).cos());
                amplitude * envelope * (2.0 * PI * frequency_hz * time + phase).sin()
            }

            SignalPattern::Burst { frequency_hz, amplitude, on_secs, off_secs } => {
                let cycle = on_secs + off_secs;
                if cycle <= 0.0 || time % cycle >= on_secs {
                    0.0
                } else {
                    amplitude * (2.0 * PI * frequency_hz * time + phase).sin()
                }
            }

            SignalPattern::Drift { period_secs, amplitude } => {
                if period_secs <= 0.0 {
                    0.0
                } else {
                    amplitude * (2.0 * PI * time / period_secs + phase).sin()
                }
            }
        }
    }

    /// Oscillation frequency, if the pattern has one
    pub fn frequency_hz(&self) -> Option<f64> {
        match *self {
            SignalPattern::Rhythm { frequency_hz, .. }
            | SignalPattern::Modulated { frequency_hz, .. }
            | SignalPattern::Burst { frequency_hz, .. } => Some(frequency_hz),
            SignalPattern::Drift { period_secs, .. } => {
                (period_secs > 0.0).then(|| 1.0 / period_secs)
            }
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            SignalPattern::Rhythm { .. } => "Steady rhythm",
            SignalPattern::Modulated { .. } => "Waxing and waning rhythm",
            SignalPattern::Burst { .. } => "Rhythm bursts",
            SignalPattern::Drift { .. } => "Baseline drift",
        }
    }

    /// Resting state with eyes closed: dominant alpha
    pub fn resting_alpha() -> Vec<SignalPattern> {
        vec![
            SignalPattern::Rhythm { frequency_hz: 2.0, amplitude: 8.0 },
            SignalPattern::Rhythm { frequency_hz: 6.0, amplitude: 5.0 },
            SignalPattern::Modulated {
                frequency_hz: 10.0,
                amplitude: 25.0,
                modulation_hz: 0.25,
                depth: 0.6,
            },
            SignalPattern::Rhythm { frequency_hz: 20.0, amplitude: 4.0 },
            SignalPattern::Rhythm { frequency_hz: 38.0, amplitude: 1.5 },
        ]
    }

    /// Named presets
    pub fn presets() -> Vec<(&'static str, Vec<SignalPattern>)> {
        vec![
            ("Resting Alpha", SignalPattern::resting_alpha()),
            ("Drowsy Theta", vec![
                SignalPattern::Rhythm { frequency_hz: 2.5, amplitude: 12.0 },
                SignalPattern::Rhythm { frequency_hz: 6.0, amplitude: 20.0 },
                SignalPattern::Rhythm { frequency_hz: 10.0, amplitude: 6.0 },
            ]),
            ("Focused Beta", vec![
                SignalPattern::Rhythm { frequency_hz: 10.0, amplitude: 5.0 },
                SignalPattern::Burst {
                    frequency_hz: 21.0,
                    amplitude: 12.0,
                    on_secs: 0.5,
                    off_secs: 0.25,
                },
                SignalPattern::Rhythm { frequency_hz: 40.0, amplitude: 3.0 },
            ]),
            ("Movement Artifact", vec![
                SignalPattern::Drift { period_secs: 4.0, amplitude: 40.0 },
                SignalPattern::Rhythm { frequency_hz: 10.0, amplitude: 10.0 },
            ]),
        ]
    }
}
