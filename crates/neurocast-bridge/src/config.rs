//! Bridge configuration, loaded once at startup

use neurocast_core::{config_error, BandDefinition, BandSet, NeurocastResult};
use neurocast_processing::FilterSpec;
use neurocast_simulation::SimulationConfig;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Complete bridge configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    pub osc: OscConfig,
    pub acquisition: AcquisitionConfig,
    pub processing: ProcessingConfig,
    pub source: SourceConfig,
}

/// Outgoing OSC target
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OscConfig {
    pub host: String,
    pub port: u16,
}

/// Stream resolution and pull parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AcquisitionConfig {
    /// Signal type to resolve (e.g. "EEG")
    pub signal_type: String,
    pub resolve_timeout_secs: f64,
    /// Upper bound on active channels
    pub max_channels: usize,
    /// Maximum samples pulled per cycle
    pub chunk_size: usize,
    /// Longest wait for the first sample of a pull
    pub poll_timeout_secs: f64,
    /// Samples kept per channel in the sliding window
    pub window_capacity: usize,
}

/// What the bridge emits each cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum EmissionMode {
    /// Every new sample, unfiltered
    Raw,
    /// Band powers and filtered samples at the update rate
    Processed,
}

impl std::fmt::Display for EmissionMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EmissionMode::Raw => write!(f, "raw"),
            EmissionMode::Processed => write!(f, "processed"),
        }
    }
}

/// Filtering, band power and emission parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProcessingConfig {
    pub mode: EmissionMode,
    /// Target processed emissions per second
    pub processed_update_rate_hz: f64,
    pub lowcut_hz: f64,
    pub highcut_hz: f64,
    /// `null` or 0 disables the notch
    pub notch_hz: Option<f64>,
    pub min_threshold: f64,
    pub max_threshold: f64,
    /// Upper bound on every reported band power
    pub bandpower_ceiling: f64,
    /// Band table, in emission order
    pub bands: Vec<BandDefinition>,
}

/// Where samples come from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SourceConfig {
    /// Lab Streaming Layer inlet (needs the `lsl` feature)
    Lsl,
    /// Synthetic EEG stream
    Simulated(SimulationConfig),
}

impl Default for OscConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 5008,
        }
    }
}

impl Default for AcquisitionConfig {
    fn default() -> Self {
        Self {
            signal_type: "EEG".to_string(),
            resolve_timeout_secs: 5.0,
            max_channels: 8,
            chunk_size: 10,
            poll_timeout_secs: 0.1,
            window_capacity: 250,
        }
    }
}

impl Default for ProcessingConfig {
    fn default() -> Self {
        let filter = FilterSpec::default();
        Self {
            mode: EmissionMode::Processed,
            processed_update_rate_hz: 8.0,
            lowcut_hz: filter.lowcut_hz,
            highcut_hz: filter.highcut_hz,
            notch_hz: filter.notch_hz,
            min_threshold: filter.min_threshold,
            max_threshold: filter.max_threshold,
            bandpower_ceiling: 200.0,
            bands: BandDefinition::eeg_bands(),
        }
    }
}

impl Default for SourceConfig {
    fn default() -> Self {
        if cfg!(feature = "lsl") {
            SourceConfig::Lsl
        } else {
            SourceConfig::Simulated(SimulationConfig::default())
        }
    }
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            osc: OscConfig::default(),
            acquisition: AcquisitionConfig::default(),
            processing: ProcessingConfig::default(),
            source: SourceConfig::default(),
        }
    }
}

fn secs(value: f64) -> Duration {
    Duration::try_from_secs_f64(value).unwrap_or(Duration::ZERO)
}

impl OscConfig {
    /// `host:port` socket address string
    pub fn target(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl AcquisitionConfig {
    pub fn resolve_timeout(&self) -> Duration {
        secs(self.resolve_timeout_secs)
    }

    pub fn poll_timeout(&self) -> Duration {
        secs(self.poll_timeout_secs)
    }
}

impl ProcessingConfig {
    /// Minimum time between processed emissions
    pub fn update_interval(&self) -> Duration {
        secs(1.0 / self.processed_update_rate_hz)
    }

    pub fn filter_spec(&self) -> FilterSpec {
        FilterSpec {
            lowcut_hz: self.lowcut_hz,
            highcut_hz: self.highcut_hz,
            notch_hz: self.notch_hz,
            min_threshold: self.min_threshold,
            max_threshold: self.max_threshold,
        }
    }

    pub fn band_set(&self) -> NeurocastResult<BandSet> {
        BandSet::new(self.bands.clone())
    }
}

impl BridgeConfig {
    /// Load a JSON configuration file
    pub fn load(path: &Path) -> NeurocastResult<Self> {
        let json = std::fs::read_to_string(path)
            .map_err(|e| config_error!("failed to read {}: {}", path.display(), e))?;
        Self::from_json(&json)
    }

    /// Export configuration to JSON
    pub fn to_json(&self) -> NeurocastResult<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| config_error!("failed to serialize configuration: {}", e))
    }

    /// Import configuration from JSON
    pub fn from_json(json: &str) -> NeurocastResult<Self> {
        serde_json::from_str(json)
            .map_err(|e| config_error!("failed to deserialize configuration: {}", e))
    }

    /// Static checks; filter cutoffs against Nyquist are checked once the
    /// stream's sample rate is known.
    pub fn validate(&self) -> NeurocastResult<()> {
        if self.osc.host.trim().is_empty() {
            return Err(config_error!("OSC host must not be empty"));
        }
        if self.osc.port == 0 {
            return Err(config_error!("OSC port must be non-zero"));
        }

        let acquisition = &self.acquisition;
        if acquisition.signal_type.trim().is_empty() {
            return Err(config_error!("signal type must not be empty"));
        }
        if !positive(acquisition.resolve_timeout_secs) {
            return Err(config_error!(
                "resolve timeout must be positive, got {}",
                acquisition.resolve_timeout_secs
            ));
        }
        if !(acquisition.poll_timeout_secs.is_finite() && acquisition.poll_timeout_secs >= 0.0) {
            return Err(config_error!(
                "poll timeout must be non-negative, got {}",
                acquisition.poll_timeout_secs
            ));
        }
        if acquisition.max_channels == 0 {
            return Err(config_error!("max_channels must be greater than 0"));
        }
        if acquisition.window_capacity == 0 {
            return Err(config_error!("window_capacity must be greater than 0"));
        }
        if acquisition.chunk_size == 0 || acquisition.chunk_size > acquisition.window_capacity {
            return Err(config_error!(
                "chunk_size must be in 1..={}, got {}",
                acquisition.window_capacity,
                acquisition.chunk_size
            ));
        }

        let processing = &self.processing;
        // Welch needs at least two samples per segment
        if processing.mode == EmissionMode::Processed && acquisition.window_capacity < 2 {
            return Err(config_error!(
                "processed mode needs a window_capacity of at least 2, got {}",
                acquisition.window_capacity
            ));
        }
        if !positive(processing.processed_update_rate_hz) {
            return Err(config_error!(
                "processed update rate must be positive, got {}",
                processing.processed_update_rate_hz
            ));
        }
        if !positive(processing.lowcut_hz) || !(processing.highcut_hz > processing.lowcut_hz) {
            return Err(config_error!(
                "bandpass [{}, {}] Hz is not a valid range",
                processing.lowcut_hz,
                processing.highcut_hz
            ));
        }
        if let Some(notch) = processing.notch_hz {
            if !(notch.is_finite() && notch >= 0.0) {
                return Err(config_error!("notch frequency must be non-negative, got {}", notch));
            }
        }
        if !(processing.min_threshold < processing.max_threshold) {
            return Err(config_error!(
                "min_threshold ({}) must be below max_threshold ({})",
                processing.min_threshold,
                processing.max_threshold
            ));
        }
        if !positive(processing.bandpower_ceiling) {
            return Err(config_error!(
                "bandpower ceiling must be positive, got {}",
                processing.bandpower_ceiling
            ));
        }
        processing.band_set()?;

        if let SourceConfig::Simulated(simulation) = &self.source {
            simulation
                .validate()
                .map_err(|e| config_error!("simulated source: {}", e))?;
        }

        Ok(())
    }
}

fn positive(value: f64) -> bool {
    value.is_finite() && value > 0.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config_is_valid() {
        let config = BridgeConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.osc.target(), "127.0.0.1:5008");
        assert_eq!(config.processing.update_interval(), Duration::from_millis(125));
        assert_eq!(config.processing.band_set().unwrap().len(), 5);
    }

    #[test]
    fn test_json_file_round_trip() {
        let mut config = BridgeConfig::default();
        config.processing.mode = EmissionMode::Raw;
        config.osc.port = 9000;

        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(config.to_json().unwrap().as_bytes()).unwrap();

        let loaded = BridgeConfig::load(file.path()).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let json = r#"{
            "processing": { "mode": "raw", "notch_hz": null },
            "source": { "kind": "simulated", "sample_rate_hz": 128.0, "seed": 1 }
        }"#;
        let config = BridgeConfig::from_json(json).unwrap();

        assert_eq!(config.processing.mode, EmissionMode::Raw);
        assert_eq!(config.processing.filter_spec().notch(), None);
        assert_eq!(config.acquisition.chunk_size, 10);
        match &config.source {
            SourceConfig::Simulated(sim) => {
                assert_eq!(sim.sample_rate_hz, 128.0);
                assert_eq!(sim.seed, Some(1));
                assert_eq!(sim.channel_labels.len(), 8);
            }
            other => panic!("unexpected source {:?}", other),
        }
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_lsl_source_kind() {
        let config = BridgeConfig::from_json(r#"{ "source": { "kind": "lsl" } }"#).unwrap();
        assert_eq!(config.source, SourceConfig::Lsl);
    }

    #[test]
    fn test_invalid_configs_rejected() {
        let mut config = BridgeConfig::default();
        config.acquisition.chunk_size = 300;
        assert!(config.validate().is_err());

        let mut config = BridgeConfig::default();
        config.processing.processed_update_rate_hz = 0.0;
        assert!(config.validate().is_err());

        let mut config = BridgeConfig::default();
        config.processing.min_threshold = 100.0;
        assert!(config.validate().is_err());

        let mut config = BridgeConfig::default();
        config.processing.bands.clear();
        assert!(config.validate().is_err());

        let mut config = BridgeConfig::default();
        config.osc.port = 0;
        assert!(config.validate().is_err());

        let mut config = BridgeConfig::default();
        config.acquisition.window_capacity = 1;
        config.acquisition.chunk_size = 1;
        assert!(config.validate().is_err());
        config.processing.mode = EmissionMode::Raw;
        assert!(config.validate().is_ok());

        assert!(BridgeConfig::from_json("{ not json").is_err());
    }
}
