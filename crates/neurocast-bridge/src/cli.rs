//! Command line interface

use crate::config::{BridgeConfig, EmissionMode, SourceConfig};
use anyhow::Context;
use clap::Parser;
use neurocast_simulation::SimulationConfig;
use std::path::PathBuf;

/// Forward an LSL biosignal stream to OSC, raw or as band powers
#[derive(Debug, Parser)]
#[command(name = "neurocast-bridge")]
#[command(version)]
#[command(about = "Forward an LSL biosignal stream to OSC", long_about = None)]
pub struct Cli {
    /// JSON configuration file
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Emission mode
    #[arg(long, value_enum)]
    pub mode: Option<EmissionMode>,

    /// OSC target host
    #[arg(long)]
    pub osc_host: Option<String>,

    /// OSC target port
    #[arg(long)]
    pub osc_port: Option<u16>,

    /// Use the built-in simulated EEG stream instead of LSL
    #[arg(long)]
    pub simulate: bool,

    /// Log level when RUST_LOG is not set
    #[arg(long, default_value = "info")]
    pub log_level: String,

    /// Print the effective configuration as JSON and exit
    #[arg(long)]
    pub print_config: bool,
}

impl Cli {
    /// Configuration file (or defaults) with command line overrides applied
    pub fn effective_config(&self) -> anyhow::Result<BridgeConfig> {
        let mut config = match &self.config {
            Some(path) => BridgeConfig::load(path)
                .with_context(|| format!("loading configuration from {}", path.display()))?,
            None => BridgeConfig::default(),
        };
        self.apply(&mut config);
        Ok(config)
    }

    pub fn apply(&self, config: &mut BridgeConfig) {
        if let Some(mode) = self.mode {
            config.processing.mode = mode;
        }
        if let Some(host) = &self.osc_host {
            config.osc.host = host.clone();
        }
        if let Some(port) = self.osc_port {
            config.osc.port = port;
        }
        if self.simulate && !matches!(config.source, SourceConfig::Simulated(_)) {
            config.source = SourceConfig::Simulated(SimulationConfig {
                signal_type: config.acquisition.signal_type.clone(),
                ..SimulationConfig::default()
            });
        }
    }
}
