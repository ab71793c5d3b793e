//! Neurocast-Bridge: forwards a biosignal stream to OSC
//!
//! Raw mode relays every sample per channel; processed mode filters the
//! sliding window and emits band powers plus the filtered new samples at a
//! bounded rate.

pub mod acquisition;
pub mod app;
pub mod cli;
pub mod config;
#[cfg(feature = "lsl")]
pub mod lsl_source;
pub mod scheduler;
pub mod transport;

pub use acquisition::{AcquisitionLoop, LoopSettings, LoopStats};
pub use app::{open_source, run_bridge};
pub use config::{BridgeConfig, EmissionMode, SourceConfig};
pub use scheduler::{build_scheduler, CycleOutcome, EmissionScheduler, EmissionState};
pub use transport::OscSink;
