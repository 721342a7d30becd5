//! Host-side settings applied when a session is created.

use serde::{Deserialize, Serialize};
use vsthost_abi::abi::{ENTRY_SYMBOL, LEGACY_ENTRY_SYMBOL};

/// Smallest scratch region handed to a plugin. String replies may run to the
/// 64-byte name limit and plugins are known to overshoot it.
pub const MIN_SCRATCH_BYTES: usize = 256;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HostConfig {
    /// Initial block size. Only sent to the plugin by `set_block_size`.
    pub block_size: usize,

    /// Sent right after the plugin is opened when set.
    #[serde(default)]
    pub sample_rate: Option<f32>,

    /// Entry symbols tried in order.
    pub entry_symbols: Vec<String>,

    /// Size of the region used for string, pointer and chunk replies.
    /// Never below [`MIN_SCRATCH_BYTES`].
    pub scratch_bytes: usize,

    /// Query effect name, programs and parameters at load.
    pub query_metadata: bool,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            block_size: 1024,
            sample_rate: None,
            entry_symbols: vec![ENTRY_SYMBOL.to_string(), LEGACY_ENTRY_SYMBOL.to_string()],
            scratch_bytes: MIN_SCRATCH_BYTES,
            query_metadata: true,
        }
    }
}

impl HostConfig {
    pub fn block_size(mut self, block_size: usize) -> Self {
        self.block_size = block_size;
        self
    }

    pub fn sample_rate(mut self, hz: f32) -> Self {
        self.sample_rate = Some(hz);
        self
    }

    pub fn entry_symbols<I, S>(mut self, symbols: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.entry_symbols = symbols.into_iter().map(Into::into).collect();
        self
    }

    pub fn scratch_bytes(mut self, bytes: usize) -> Self {
        self.scratch_bytes = bytes;
        self
    }

    pub fn query_metadata(mut self, query: bool) -> Self {
        self.query_metadata = query;
        self
    }

    /// Block size as the session uses it: never below one frame.
    pub(crate) fn effective_block_size(&self) -> usize {
        self.block_size.max(1)
    }

    /// Scratch as the session allocates it. Larger settings only help
    /// `set_chunk` avoid a temporary region.
    pub(crate) fn effective_scratch_bytes(&self) -> usize {
        self.scratch_bytes.max(MIN_SCRATCH_BYTES)
    }
}
