//! A hosted plugin instance.
//!
//! [`Session`] owns the loaded module, the descriptor it returned and the
//! three native regions shared with the plugin (scratch, audio, events).
//! Every operation takes the session's lock for its whole duration, so calls
//! from different threads on one session are totally ordered. Separate
//! sessions share nothing except the host callback.

use crate::audio::AudioExchange;
use crate::config::HostConfig;
use crate::descriptor::{self, Capabilities, Descriptor, EntryPoints};
use crate::dispatch::Dispatcher;
use crate::error::{HostError, LoadStage, Result};
use crate::events::{midi_batch, EventBuffer};
use crate::lifecycle::{Lifecycle, LifecycleState};
use crate::metadata::{CanDoFeature, ParameterInfo, PluginMetadata, ProgramInfo};
use crate::module::{ModuleOrigin, PluginModule};
use crate::region::NativeRegion;
use crate::snapshot::SessionSnapshot;
use parking_lot::Mutex;
use std::ffi::c_void;
use std::path::{Path, PathBuf};
use vsthost_abi::abi::{opcode, AEffect, PluginMainProc, Rect};
use vsthost_abi::{Event, MidiEvent};

pub struct Session {
    metadata: PluginMetadata,
    descriptor: Descriptor,
    capabilities: Capabilities,
    config: HostConfig,
    origin: ModuleOrigin,
    inner: Mutex<SessionInner>,
}

struct SessionInner {
    effect: *mut AEffect,
    dispatcher: Dispatcher,
    entry_points: EntryPoints,
    descriptor: Descriptor,
    capabilities: Capabilities,
    lifecycle: Lifecycle,
    block_size: usize,
    events_delivered: bool,
    scratch: NativeRegion,
    audio: AudioExchange,
    events: EventBuffer,
    module: Option<PluginModule>,
}

// SAFETY: the descriptor pointer is only dereferenced by the plugin through
// calls made while the session lock is held, one call at a time.
unsafe impl Send for SessionInner {}

impl Session {
    /// Loads the plugin at `path` with default settings.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        Self::load_with(path, HostConfig::default())
    }

    pub fn load_with(path: impl AsRef<Path>, config: HostConfig) -> Result<Self> {
        let path = path.as_ref();
        let module = PluginModule::open(path, &config.entry_symbols).inspect_err(|e| {
            tracing::warn!(path = %path.display(), error = %e, "failed to open plugin");
        })?;
        Self::instantiate(module, config)
    }

    /// Hosts a plugin whose entry function is linked into this process.
    ///
    /// # Safety
    /// `entry` must behave like an exported `VSTPluginMain`: return null or a
    /// descriptor whose function pointers stay valid until the plugin is closed.
    pub unsafe fn from_entry(entry: PluginMainProc, config: HostConfig) -> Result<Self> {
        Self::instantiate(PluginModule::from_entry(entry), config)
    }

    fn instantiate(module: PluginModule, config: HostConfig) -> Result<Self> {
        let origin = module.origin().clone();
        let effect = module.instantiate();

        // SAFETY: the entry point returned either null or its descriptor.
        let (descriptor, entry_points) = match unsafe { descriptor::validate(effect) } {
            Ok(validated) => validated,
            Err(err) => {
                let error = HostError::LoadFailed {
                    path: origin.display_path(),
                    stage: err.stage(),
                    reason: err.to_string(),
                };
                tracing::warn!(error = %error, "rejected plugin");
                // Dropping `module` unloads the library.
                return Err(error);
            }
        };

        let dispatcher = Dispatcher::new(effect, entry_points.dispatcher);
        let mut inner = SessionInner {
            effect,
            dispatcher,
            entry_points,
            descriptor,
            capabilities: Capabilities::default(),
            lifecycle: Lifecycle::default(),
            block_size: config.effective_block_size(),
            events_delivered: false,
            scratch: NativeRegion::new(),
            audio: AudioExchange::new(),
            events: EventBuffer::new(),
            module: Some(module),
        };

        inner.lifecycle.open(&inner.dispatcher);
        if let Some(hz) = config.sample_rate {
            inner.set_sample_rate(hz);
        }
        inner.scratch = NativeRegion::zeroed(config.effective_scratch_bytes());

        let metadata = if config.query_metadata {
            inner.collect_metadata()
        } else {
            PluginMetadata::new("", &descriptor)
        };
        inner.capabilities =
            Capabilities::query(&descriptor, &inner.entry_points, &inner.dispatcher);
        let metadata = metadata.capabilities(inner.capabilities);

        tracing::info!(
            name = %metadata.name,
            unique_id = %metadata.unique_id_code(),
            inputs = metadata.inputs,
            outputs = metadata.outputs,
            "loaded plugin"
        );

        Ok(Self {
            descriptor,
            capabilities: inner.capabilities,
            metadata,
            config,
            origin,
            inner: Mutex::new(inner),
        })
    }

    pub fn metadata(&self) -> &PluginMetadata {
        &self.metadata
    }

    pub fn descriptor(&self) -> &Descriptor {
        &self.descriptor
    }

    pub fn capabilities(&self) -> Capabilities {
        self.capabilities
    }

    pub fn config(&self) -> &HostConfig {
        &self.config
    }

    /// Library path, `None` for in-process entries.
    pub fn path(&self) -> Option<PathBuf> {
        match &self.origin {
            ModuleOrigin::Library(path) => Some(path.clone()),
            ModuleOrigin::Entry(_) => None,
        }
    }

    pub fn state(&self) -> LifecycleState {
        self.inner.lock().lifecycle.state()
    }

    pub fn is_editor_open(&self) -> bool {
        self.inner.lock().lifecycle.is_editor_open()
    }

    /// `false` once the session has been disposed.
    pub fn is_loaded(&self) -> bool {
        self.inner.lock().module.is_some()
    }

    pub fn open(&self) {
        let mut inner = self.inner.lock();
        let inner = &mut *inner;
        inner.lifecycle.open(&inner.dispatcher);
    }

    pub fn close(&self) {
        let mut inner = self.inner.lock();
        let inner = &mut *inner;
        inner.lifecycle.close(&inner.dispatcher);
    }

    /// Mains on.
    pub fn enable(&self) {
        let mut inner = self.inner.lock();
        let inner = &mut *inner;
        inner.lifecycle.enable(&inner.dispatcher);
    }

    /// Mains off; stops processing first when needed.
    pub fn disable(&self) {
        let mut inner = self.inner.lock();
        let inner = &mut *inner;
        inner.lifecycle.disable(&inner.dispatcher);
    }

    pub fn start_process(&self) {
        let mut inner = self.inner.lock();
        let inner = &mut *inner;
        inner.lifecycle.start_process(&inner.dispatcher);
    }

    pub fn stop_process(&self) {
        let mut inner = self.inner.lock();
        let inner = &mut *inner;
        inner.lifecycle.stop_process(&inner.dispatcher);
    }

    pub fn block_size(&self) -> usize {
        self.inner.lock().block_size
    }

    /// Sets the block size (at least one frame) and always tells the plugin.
    /// A changed size drops the audio buffer so the next block rebuilds it.
    pub fn set_block_size(&self, frames: usize) {
        self.inner.lock().set_block_size(frames);
    }

    pub fn set_sample_rate(&self, hz: f32) {
        self.inner.lock().set_sample_rate(hz);
    }

    pub fn program(&self) -> i32 {
        self.inner.lock().dispatcher.send(opcode::GET_PROGRAM, 0, 0, 0.0) as i32
    }

    pub fn set_program(&self, index: i32) {
        self.inner
            .lock()
            .dispatcher
            .send(opcode::SET_PROGRAM, 0, index as isize, 0.0);
    }

    pub fn program_name(&self, index: i32) -> Option<String> {
        self.inner
            .lock()
            .query_string(opcode::GET_PROGRAM_NAME_INDEXED, index)
    }

    pub fn effect_name(&self) -> Option<String> {
        self.inner.lock().query_string(opcode::GET_EFFECT_NAME, 0)
    }

    /// Current value, 0.0 when the plugin has no getter.
    pub fn parameter(&self, index: i32) -> f32 {
        self.inner.lock().parameter(index)
    }

    pub fn set_parameter(&self, index: i32, value: f32) {
        self.inner.lock().set_parameter(index, value);
    }

    pub fn parameter_name(&self, index: i32) -> Option<String> {
        self.inner.lock().query_string(opcode::GET_PARAM_NAME, index)
    }

    pub fn parameter_label(&self, index: i32) -> Option<String> {
        self.inner.lock().query_string(opcode::GET_PARAM_LABEL, index)
    }

    pub fn parameter_display(&self, index: i32) -> Option<String> {
        self.inner.lock().query_string(opcode::GET_PARAM_DISPLAY, index)
    }

    pub fn editor_rect(&self) -> Rect {
        let mut inner = self.inner.lock();
        let inner = &mut *inner;
        inner.dispatcher.editor_rect(&mut inner.scratch)
    }

    /// Opens the plugin editor inside `window`.
    ///
    /// # Safety
    /// `window` must be a native parent window handle valid until the editor
    /// is closed.
    pub unsafe fn open_editor(&self, window: *mut c_void) -> bool {
        let mut inner = self.inner.lock();
        let inner = &mut *inner;
        inner.lifecycle.open_editor(&inner.dispatcher, window)
    }

    pub fn close_editor(&self) {
        let mut inner = self.inner.lock();
        let inner = &mut *inner;
        inner.lifecycle.close_editor(&inner.dispatcher);
    }

    /// The plugin's persisted state, `None` if it has none to give.
    pub fn chunk(&self, current_program_only: bool) -> Option<Vec<u8>> {
        self.inner.lock().chunk(current_program_only)
    }

    pub fn set_chunk(&self, chunk: &[u8], current_program_only: bool) {
        self.inner.lock().set_chunk(chunk, current_program_only);
    }

    pub fn can_do(&self, feature: &str) -> bool {
        self.inner.lock().dispatcher.can_do(feature)
    }

    pub fn can_do_feature(&self, feature: CanDoFeature) -> bool {
        self.can_do(feature.as_str())
    }

    /// Delivers events for the coming block, starting processing if needed.
    pub fn process_events(&self, events: &[Event]) {
        self.inner.lock().process_events(events);
    }

    pub fn process_midi(&self, midi: &[MidiEvent]) {
        self.process_events(&midi_batch(midi));
    }

    /// Runs one block through the plugin.
    ///
    /// `frames` of 0, or more than the block size, means a full block.
    /// `inputs` of `None` feeds silence.
    pub fn process_replacing(
        &self,
        inputs: Option<&[&[f32]]>,
        outputs: &mut [&mut [f32]],
        frames: usize,
    ) {
        self.inner.lock().process_replacing(inputs, outputs, frames);
    }

    /// Raw dispatcher access for opcodes without a dedicated method.
    ///
    /// # Safety
    /// `ptr` must satisfy what `opcode` expects of its data argument.
    pub unsafe fn dispatch(
        &self,
        opcode: i32,
        index: i32,
        value: isize,
        ptr: *mut c_void,
        opt: f32,
    ) -> isize {
        self.inner.lock().dispatcher.call(opcode, index, value, ptr, opt)
    }

    /// Parameter values plus the current program's chunk.
    pub fn snapshot(&self) -> SessionSnapshot {
        let mut inner = self.inner.lock();
        let parameters = (0..self.descriptor.num_params.max(0))
            .map(|index| inner.parameter(index))
            .collect();
        SessionSnapshot {
            unique_id: self.descriptor.unique_id,
            version: self.descriptor.version,
            parameters,
            chunk: inner.chunk(true),
        }
    }

    /// Applies parameter values, then the chunk as current-program state.
    pub fn restore(&self, snapshot: &SessionSnapshot) -> Result<()> {
        if snapshot.unique_id != self.descriptor.unique_id {
            return Err(HostError::SnapshotMismatch {
                expected: self.descriptor.unique_id,
                found: snapshot.unique_id,
            });
        }
        let mut inner = self.inner.lock();
        for (index, &value) in snapshot.parameters.iter().enumerate() {
            inner.set_parameter(index as i32, value);
        }
        if let Some(chunk) = &snapshot.chunk {
            inner.set_chunk(chunk, true);
        }
        Ok(())
    }

    /// A new instance of the same plugin carrying this one's state.
    pub fn try_clone(&self) -> Result<Self> {
        let snapshot = self.snapshot();
        let module = {
            let inner = self.inner.lock();
            match &inner.module {
                Some(module) => module.reopen(&self.config.entry_symbols)?,
                None => {
                    return Err(HostError::LoadFailed {
                        path: self.origin.display_path(),
                        stage: LoadStage::Opening,
                        reason: "session has been disposed".to_string(),
                    })
                }
            }
        };
        let clone = Self::instantiate(module, self.config.clone())?;
        clone.restore(&snapshot)?;
        Ok(clone)
    }

    /// Shuts the plugin down and unloads it. Safe to call more than once;
    /// every later operation is a no-op.
    pub fn dispose(&self) {
        self.inner.lock().dispose();
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.inner.get_mut().dispose();
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("name", &self.metadata.name)
            .field("origin", &self.origin)
            .finish_non_exhaustive()
    }
}

impl SessionInner {
    fn set_block_size(&mut self, frames: usize) {
        if !self.dispatcher.is_available() {
            return;
        }
        let frames = frames.max(1);
        if frames != self.block_size {
            self.audio.release();
            tracing::debug!(from = self.block_size, to = frames, "block size changed");
            self.block_size = frames;
        }
        self.dispatcher
            .send(opcode::SET_BLOCK_SIZE, 0, frames as isize, 0.0);
    }

    fn set_sample_rate(&mut self, hz: f32) {
        self.dispatcher.send(opcode::SET_SAMPLE_RATE, 0, 0, hz);
    }

    fn query_string(&mut self, opcode: i32, index: i32) -> Option<String> {
        self.dispatcher.query_string(opcode, index, &mut self.scratch)
    }

    fn parameter(&self, index: i32) -> f32 {
        match self.entry_points.get_parameter {
            // SAFETY: entry points are cleared before the module is unloaded.
            Some(get) => unsafe { get(self.effect, index) },
            None => 0.0,
        }
    }

    fn set_parameter(&mut self, index: i32, value: f32) {
        if let Some(set) = self.entry_points.set_parameter {
            // SAFETY: see `parameter`.
            unsafe { set(self.effect, index, value) };
        }
    }

    fn chunk(&mut self, current_program_only: bool) -> Option<Vec<u8>> {
        self.dispatcher.chunk(&mut self.scratch, current_program_only)
    }

    fn set_chunk(&mut self, chunk: &[u8], current_program_only: bool) {
        self.dispatcher
            .set_chunk(&mut self.scratch, chunk, current_program_only);
    }

    fn collect_metadata(&mut self) -> PluginMetadata {
        let name = self
            .query_string(opcode::GET_EFFECT_NAME, 0)
            .unwrap_or_default();

        let programs = (0..self.descriptor.num_programs.max(0))
            .map(|index| ProgramInfo {
                index,
                name: self
                    .query_string(opcode::GET_PROGRAM_NAME_INDEXED, index)
                    .unwrap_or_default(),
            })
            .collect();

        let parameters = (0..self.descriptor.num_params.max(0))
            .map(|index| ParameterInfo {
                index,
                name: self
                    .query_string(opcode::GET_PARAM_NAME, index)
                    .unwrap_or_default(),
                label: self
                    .query_string(opcode::GET_PARAM_LABEL, index)
                    .unwrap_or_default(),
                display: self
                    .query_string(opcode::GET_PARAM_DISPLAY, index)
                    .unwrap_or_default(),
                default_value: self.parameter(index),
            })
            .collect();

        PluginMetadata::new(name, &self.descriptor)
            .programs(programs)
            .parameters(parameters)
    }

    fn process_events(&mut self, events: &[Event]) {
        if !self.dispatcher.is_available() {
            return;
        }
        let block = match self.events.build(events) {
            Ok(block) => block,
            Err(err) => {
                tracing::warn!(error = %err, "dropping event batch");
                return;
            }
        };
        if !self.lifecycle.is_processing() {
            self.lifecycle.start_process(&self.dispatcher);
        }
        // SAFETY: the block lives in `self.events` until the next build.
        unsafe {
            self.dispatcher
                .call(opcode::PROCESS_EVENTS, 0, 0, block.cast(), 0.0);
        }
        self.events_delivered = true;
    }

    fn process_replacing(
        &mut self,
        inputs: Option<&[&[f32]]>,
        outputs: &mut [&mut [f32]],
        frames: usize,
    ) {
        let Some(process) = self.entry_points.process_replacing else {
            return;
        };
        let block_size = self.block_size;
        let frames = if frames == 0 || frames > block_size {
            block_size
        } else {
            frames
        };

        self.audio
            .prepare(self.descriptor.inputs(), self.descriptor.outputs(), block_size);
        self.audio.load_inputs(inputs);

        if !self.lifecycle.is_processing() {
            self.lifecycle.start_process(&self.dispatcher);
        }
        if self.capabilities.can_process_events && !self.events_delivered {
            self.process_events(&[]);
        }

        if let Some((input_ptrs, output_ptrs)) = self.audio.pointer_arrays() {
            // SAFETY: both arrays point into the exchange buffer, which holds
            // `block_size` samples per channel and outlives the call.
            unsafe { process(self.effect, input_ptrs, output_ptrs, frames as i32) };
        }
        self.events_delivered = false;

        self.audio.store_outputs(outputs);
    }

    fn dispose(&mut self) {
        let Some(module) = self.module.take() else {
            return;
        };
        self.lifecycle.shut_down(&self.dispatcher);
        self.dispatcher = Dispatcher::detached();
        self.entry_points = EntryPoints::default();
        self.effect = std::ptr::null_mut();
        self.scratch.release();
        self.audio.release();
        self.events.release();
        drop(module);
        tracing::debug!("plugin disposed");
    }
}
