//! Neurocast-Processing: zero-phase filtering and band power estimation
//!
//! Everything here runs over a full window snapshot on each processed tick.

pub mod filters;
pub mod bandpower;
pub mod pipeline;

pub use filters::{
    BiquadCoeffs, ButterworthFilter, FilterPipeline, FilterSpec, FilteredWindow, NotchFilter,
    SosFilter,
};
pub use bandpower::{BandPowerEstimator, Psd};
pub use pipeline::{ProcessedFrame, SpectralPipeline};
