//! Channel catalog: resolves channel identity from stream metadata

use crate::error::NeurocastResult;
use crate::invalid_input;

/// Ordered, immutable set of active channel names.
///
/// A channel's index is its identity for the lifetime of a run. OSC addresses
/// (`/<name>`) are built once here so the emission path never formats strings.
#[derive(Debug, Clone, PartialEq)]
pub struct ChannelSet {
    names: Vec<String>,
    addresses: Vec<String>,
}

impl ChannelSet {
    /// Build a channel set from explicit names
    pub fn new(names: Vec<String>) -> NeurocastResult<Self> {
        if names.is_empty() {
            return Err(invalid_input!("a channel set needs at least one channel"));
        }
        if let Some(blank) = names.iter().position(|n| n.trim().is_empty()) {
            return Err(invalid_input!("channel {} has an empty name", blank));
        }

        let addresses = names.iter().map(|n| format!("/{}", n)).collect();
        Ok(ChannelSet { names, addresses })
    }

    /// Resolve the active channels from a stream's advertised channel count
    /// and per-channel labels.
    ///
    /// The set holds `min(advertised_count, max_channels)` entries. Labels are
    /// used verbatim; missing or blank ones fall back to `Channel_<n>` (1-based).
    pub fn resolve(
        advertised_count: usize,
        labels: &[Option<String>],
        max_channels: usize,
    ) -> NeurocastResult<Self> {
        let count = advertised_count.min(max_channels);
        let names = (0..count)
            .map(|i| {
                labels
                    .get(i)
                    .and_then(|label| label.as_deref())
                    .filter(|label| !label.trim().is_empty())
                    .map(str::to_string)
                    .unwrap_or_else(|| format!("Channel_{}", i + 1))
            })
            .collect();

        Self::new(names)
    }

    /// Number of active channels
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Always false for a constructed set
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Channel names in index order
    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Name of the channel at `index`
    pub fn name(&self, index: usize) -> Option<&str> {
        self.names.get(index).map(String::as_str)
    }

    /// Outgoing address (`/<name>`) of the channel at `index`
    pub fn address(&self, index: usize) -> Option<&str> {
        self.addresses.get(index).map(String::as_str)
    }

    /// Outgoing addresses in index order
    pub fn addresses(&self) -> &[String] {
        &self.addresses
    }
}
