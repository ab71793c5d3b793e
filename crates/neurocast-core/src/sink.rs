//! Outgoing value sink boundary

use crate::error::NeurocastResult;

/// Fire-and-forget, per-value transport addressed by a string path.
///
/// No acknowledgement and no batching: one call hands off one value.
pub trait ValueSink {
    fn send(&mut self, address: &str, value: f64) -> NeurocastResult<()>;
}

impl<K: ValueSink + ?Sized> ValueSink for Box<K> {
    fn send(&mut self, address: &str, value: f64) -> NeurocastResult<()> {
        (**self).send(address, value)
    }
}

impl<K: ValueSink + ?Sized> ValueSink for &mut K {
    fn send(&mut self, address: &str, value: f64) -> NeurocastResult<()> {
        (**self).send(address, value)
    }
}

/// Sink that keeps every message in memory, in send order
#[derive(Debug, Clone, Default)]
pub struct RecordingSink {
    messages: Vec<(String, f64)>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> &[(String, f64)] {
        &self.messages
    }

    /// Drain recorded messages
    pub fn take(&mut self) -> Vec<(String, f64)> {
        std::mem::take(&mut self.messages)
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

impl ValueSink for RecordingSink {
    fn send(&mut self, address: &str, value: f64) -> NeurocastResult<()> {
        self.messages.push((address.to_string(), value));
        Ok(())
    }
}
