//! Neurocast-Simulation: synthetic EEG streams
//!
//! Lets the bridge run end to end without acquisition hardware.

pub mod signal_patterns;
pub mod eeg_simulator;
pub mod simulated_source;

pub use eeg_simulator::{EegSimulator, SimulationConfig};
pub use signal_patterns::SignalPattern;
pub use simulated_source::SimulatedSource;
