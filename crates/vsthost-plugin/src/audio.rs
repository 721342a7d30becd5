//! Audio exchange buffer: one native allocation holding the pointer arrays
//! and the per-channel sample storage the plugin processes in place.
//!
//! Region order is fixed: input pointers, output pointers, input samples,
//! output samples. The buffer is built lazily for the configured block size
//! and dropped whenever that size changes.

use crate::region::NativeRegion;
use std::mem::size_of;

const PTR_BYTES: usize = size_of::<usize>();
const SAMPLE_BYTES: usize = size_of::<f32>();

/// Byte offsets of the four regions for one channel configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AudioLayout {
    pub inputs: usize,
    pub outputs: usize,
    pub block_size: usize,
    pub output_pointers: usize,
    pub input_samples: usize,
    pub output_samples: usize,
    pub total: usize,
}

impl AudioLayout {
    pub const INPUT_POINTERS: usize = 0;

    pub fn new(inputs: usize, outputs: usize, block_size: usize) -> Self {
        let block_bytes = block_size * SAMPLE_BYTES;
        let output_pointers = Self::INPUT_POINTERS + inputs * PTR_BYTES;
        let input_samples = output_pointers + outputs * PTR_BYTES;
        let output_samples = input_samples + inputs * block_bytes;
        let total = output_samples + outputs * block_bytes;
        Self {
            inputs,
            outputs,
            block_size,
            output_pointers,
            input_samples,
            output_samples,
            total,
        }
    }

    pub fn block_bytes(&self) -> usize {
        self.block_size * SAMPLE_BYTES
    }

    pub fn input_offset(&self, channel: usize) -> usize {
        self.input_samples + channel * self.block_bytes()
    }

    pub fn output_offset(&self, channel: usize) -> usize {
        self.output_samples + channel * self.block_bytes()
    }
}

#[derive(Debug, Default)]
pub struct AudioExchange {
    layout: Option<AudioLayout>,
    region: NativeRegion,
    allocations: usize,
}

impl AudioExchange {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn layout(&self) -> Option<&AudioLayout> {
        self.layout.as_ref()
    }

    pub fn is_allocated(&self) -> bool {
        self.layout.is_some()
    }

    /// Number of times the buffer has been (re)built.
    pub fn allocations(&self) -> usize {
        self.allocations
    }

    /// Frees the buffer; the next [`prepare`](Self::prepare) rebuilds it.
    pub fn release(&mut self) {
        if self.layout.take().is_some() {
            tracing::debug!("released audio exchange buffer");
        }
        self.region.release();
    }

    /// Builds the buffer for this configuration unless it already exists.
    pub fn prepare(&mut self, inputs: usize, outputs: usize, block_size: usize) -> AudioLayout {
        let wanted = AudioLayout::new(inputs, outputs, block_size);
        if let Some(layout) = self.layout {
            if layout == wanted {
                return layout;
            }
        }

        self.region.reallocate(wanted.total);
        let base = self.region.as_mut_ptr() as usize;
        for channel in 0..inputs {
            self.region.write_pointer(
                AudioLayout::INPUT_POINTERS + channel * PTR_BYTES,
                base + wanted.input_offset(channel),
            );
        }
        for channel in 0..outputs {
            self.region.write_pointer(
                wanted.output_pointers + channel * PTR_BYTES,
                base + wanted.output_offset(channel),
            );
        }

        self.layout = Some(wanted);
        self.allocations += 1;
        tracing::debug!(
            inputs,
            outputs,
            block_size,
            bytes = wanted.total,
            "allocated audio exchange buffer"
        );
        wanted
    }

    /// Copies caller input into the plugin's input channels.
    ///
    /// Each channel takes up to one block and is zero-padded; channels the
    /// caller did not supply are silenced. `None` silences every channel.
    pub fn load_inputs(&mut self, inputs: Option<&[&[f32]]>) {
        let Some(layout) = self.layout else {
            return;
        };
        let block = layout.block_size;
        let provided = inputs.unwrap_or(&[]);
        let shared = provided.len().min(layout.inputs);

        for (channel, input) in provided.iter().take(shared).enumerate() {
            let dst = self.region.floats_mut(layout.input_offset(channel), block);
            let copy = input.len().min(block);
            dst[..copy].copy_from_slice(&input[..copy]);
            dst[copy..].fill(0.0);
        }
        if shared < layout.inputs {
            self.region
                .floats_mut(layout.input_offset(shared), (layout.inputs - shared) * block)
                .fill(0.0);
        }
    }

    /// Copies the plugin's output channels into the caller's buffers.
    ///
    /// A single caller buffer facing a multi-output plugin receives the
    /// average of channels 0 and 1. Otherwise caller buffers the plugin has no
    /// channel for are cleared, except buffer 1, which repeats buffer 0.
    pub fn store_outputs(&self, outputs: &mut [&mut [f32]]) {
        let Some(layout) = self.layout else {
            return;
        };
        if outputs.is_empty() {
            return;
        }
        let block = layout.block_size;
        let shared = outputs.len().min(layout.outputs);

        for (channel, dst) in outputs.iter_mut().take(shared).enumerate() {
            let src = self.region.floats(layout.output_offset(channel), block);
            let copy = dst.len().min(block);
            dst[..copy].copy_from_slice(&src[..copy]);
            dst[copy..].fill(0.0);
        }

        if outputs.len() == 1 && layout.outputs > 1 {
            let second = self.region.floats(layout.output_offset(1), block);
            let dst = &mut outputs[0];
            let copy = dst.len().min(block);
            for (sample, &other) in dst[..copy].iter_mut().zip(second) {
                *sample = (*sample + other) * 0.5;
            }
            return;
        }

        for channel in shared..outputs.len() {
            if channel == 1 {
                let (head, tail) = outputs.split_at_mut(1);
                let (src, dst) = (&*head[0], &mut *tail[0]);
                let copy = src.len().min(dst.len());
                dst[..copy].copy_from_slice(&src[..copy]);
            } else {
                outputs[channel].fill(0.0);
            }
        }
    }

    /// Input and output pointer arrays, in that order.
    pub fn pointer_arrays(&mut self) -> Option<(*mut *mut f32, *mut *mut f32)> {
        let layout = self.layout?;
        let base = self.region.as_mut_ptr();
        Some((
            base as *mut *mut f32,
            base.wrapping_add(layout.output_pointers) as *mut *mut f32,
        ))
    }

    pub fn input_channel(&self, channel: usize) -> Option<&[f32]> {
        let layout = self.layout?;
        (channel < layout.inputs)
            .then(|| self.region.floats(layout.input_offset(channel), layout.block_size))
    }

    pub fn output_channel_mut(&mut self, channel: usize) -> Option<&mut [f32]> {
        let layout = self.layout?;
        if channel >= layout.outputs {
            return None;
        }
        Some(
            self.region
                .floats_mut(layout.output_offset(channel), layout.block_size),
        )
    }
}
