//! An in-process plugin with the same `extern "C"` surface as a library.
//!
//! Each test configures a [`MockSpec`], hosts it through
//! `Session::from_entry` and inspects what the plugin saw through the
//! returned [`MockHandle`]. Specs and instance lists are thread-local, so
//! tests running in parallel never see each other's plugins.

use parking_lot::{Mutex, MutexGuard};
use std::cell::RefCell;
use std::ffi::{c_char, c_void, CStr};
use std::ptr;
use std::slice;
use std::sync::Arc;
use vsthost::abi::layout::read_event_block;
use vsthost::abi::{
    host_opcode, opcode, AEffect, EffectFlags, HostCallbackProc, Rect, VstEvents, MAGIC,
};
use vsthost::{Event, HostConfig, Result, Session};

/// Pseudo-opcode recorded when the process-replacing entry point runs.
pub const PROCESS: i32 = -1;

/// How a mock plugin presents itself and behaves.
#[derive(Clone)]
pub struct MockSpec {
    pub name: &'static str,
    pub magic: i32,
    /// Entry point returns null instead of a descriptor.
    pub null_descriptor: bool,
    pub inputs: i32,
    pub outputs: i32,
    pub flags: EffectFlags,
    pub unique_id: i32,
    pub version: i32,
    pub latency: i32,
    pub programs: Vec<&'static str>,
    /// Name, label and initial value per parameter.
    pub params: Vec<(&'static str, &'static str, f32)>,
    pub can_do: Vec<&'static str>,
    /// Initial persisted state; empty means the plugin reports no chunk.
    pub chunk: Vec<u8>,
    pub rect: Option<Rect>,
    pub editor_accepts: bool,
    pub process_replacing: bool,
    /// Output sample for `(channel, input sample of the same channel)`.
    pub output: fn(usize, f32) -> f32,
}

impl Default for MockSpec {
    fn default() -> Self {
        Self {
            name: "Mock",
            magic: MAGIC,
            null_descriptor: false,
            inputs: 2,
            outputs: 2,
            flags: EffectFlags::CAN_REPLACING | EffectFlags::HAS_EDITOR,
            unique_id: i32::from_be_bytes(*b"Mock"),
            version: 1,
            latency: 0,
            programs: vec!["Init", "Bright"],
            params: vec![("Gain", "dB", 0.5), ("Mix", "%", 1.0)],
            can_do: vec!["receiveVstEvents", "receiveVstMidiEvent"],
            chunk: b"mock-state".to_vec(),
            rect: Some(Rect {
                top: 0,
                left: 0,
                bottom: 300,
                right: 400,
            }),
            editor_accepts: true,
            process_replacing: true,
            output: channel_level,
        }
    }
}

/// Default output: the input plus a per-channel offset of 0.25, 0.5, 0.75...
pub fn channel_level(channel: usize, input: f32) -> f32 {
    input + (channel + 1) as f32 * 0.25
}

/// Output equals input.
pub fn passthrough(_channel: usize, input: f32) -> f32 {
    input
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Call {
    pub opcode: i32,
    pub index: i32,
    pub value: isize,
}

#[derive(Debug, Clone)]
pub struct ProcessCall {
    pub frames: usize,
    pub inputs: Vec<Vec<f32>>,
}

/// Everything one plugin instance observed.
#[derive(Debug, Default)]
pub struct MockState {
    pub calls: Vec<Call>,
    pub host_version: isize,
    pub sample_rate: f32,
    pub block_size: isize,
    pub program: i32,
    pub params: Vec<f32>,
    pub chunk: Vec<u8>,
    /// Index argument of every chunk request.
    pub chunk_requests: Vec<i32>,
    pub event_blocks: Vec<Vec<Event>>,
    pub process_calls: Vec<ProcessCall>,
    pub editor_window: Option<usize>,
}

#[derive(Clone)]
pub struct MockHandle(Arc<Mutex<MockState>>);

impl MockHandle {
    pub fn state(&self) -> MutexGuard<'_, MockState> {
        self.0.lock()
    }

    pub fn opcodes(&self) -> Vec<i32> {
        self.0.lock().calls.iter().map(|call| call.opcode).collect()
    }

    pub fn count(&self, opcode: i32) -> usize {
        self.0
            .lock()
            .calls
            .iter()
            .filter(|call| call.opcode == opcode)
            .count()
    }

    /// Lifecycle opcodes with their value argument, in call order.
    pub fn lifecycle(&self) -> Vec<(i32, isize)> {
        const LIFECYCLE: [i32; 7] = [
            opcode::OPEN,
            opcode::CLOSE,
            opcode::MAINS_CHANGED,
            opcode::START_PROCESS,
            opcode::STOP_PROCESS,
            opcode::EDIT_OPEN,
            opcode::EDIT_CLOSE,
        ];
        self.0
            .lock()
            .calls
            .iter()
            .filter(|call| LIFECYCLE.contains(&call.opcode))
            .map(|call| (call.opcode, call.value))
            .collect()
    }

    pub fn clear_calls(&self) {
        self.0.lock().calls.clear();
    }
}

thread_local! {
    static SPEC: RefCell<MockSpec> = RefCell::new(MockSpec::default());
    static INSTANCES: RefCell<Vec<MockHandle>> = const { RefCell::new(Vec::new()) };
}

/// Hosts `spec` with the default test configuration.
pub fn host(spec: MockSpec) -> (Session, MockHandle) {
    host_with(spec, super::test_config())
}

pub fn host_with(spec: MockSpec, config: HostConfig) -> (Session, MockHandle) {
    let session = try_host(spec, config).expect("mock plugin failed to load");
    let handle = instances()
        .into_iter()
        .next()
        .expect("mock entry point was not called");
    (session, handle)
}

/// Loads `spec` and returns whatever the session reports.
pub fn try_host(spec: MockSpec, config: HostConfig) -> Result<Session> {
    SPEC.with(|current| *current.borrow_mut() = spec);
    INSTANCES.with(|instances| instances.borrow_mut().clear());
    // SAFETY: `mock_main` returns null or a leaked descriptor that is never freed.
    unsafe { Session::from_entry(mock_main, config) }
}

/// Every instance created on this thread since the last `try_host`.
pub fn instances() -> Vec<MockHandle> {
    INSTANCES.with(|instances| instances.borrow().clone())
}

#[repr(C)]
struct MockPlugin {
    effect: AEffect,
    spec: MockSpec,
    state: Arc<Mutex<MockState>>,
    rect: Rect,
    chunk_out: Vec<u8>,
}

unsafe fn plugin<'a>(effect: *mut AEffect) -> &'a mut MockPlugin {
    &mut *(effect as *mut MockPlugin)
}

pub unsafe extern "C" fn mock_main(callback: HostCallbackProc) -> *mut AEffect {
    let spec = SPEC.with(|current| current.borrow().clone());
    if spec.null_descriptor {
        return ptr::null_mut();
    }

    let host_version = callback(
        ptr::null_mut(),
        host_opcode::VERSION,
        0,
        0,
        ptr::null_mut(),
        0.0,
    );
    let state = Arc::new(Mutex::new(MockState {
        host_version,
        params: spec.params.iter().map(|param| param.2).collect(),
        chunk: spec.chunk.clone(),
        ..MockState::default()
    }));
    INSTANCES.with(|instances| instances.borrow_mut().push(MockHandle(state.clone())));

    let mut effect: AEffect = std::mem::zeroed();
    effect.magic = spec.magic;
    effect.dispatcher = Some(mock_dispatch);
    effect.set_parameter = Some(mock_set_parameter);
    effect.get_parameter = Some(mock_get_parameter);
    effect.process_replacing = if spec.process_replacing {
        Some(mock_process)
    } else {
        None
    };
    effect.num_programs = spec.programs.len() as i32;
    effect.num_params = spec.params.len() as i32;
    effect.num_inputs = spec.inputs;
    effect.num_outputs = spec.outputs;
    effect.flags = spec.flags.bits();
    effect.initial_delay = spec.latency;
    effect.unique_id = spec.unique_id;
    effect.version = spec.version;

    let plugin = Box::leak(Box::new(MockPlugin {
        effect,
        spec,
        state,
        rect: Rect::default(),
        chunk_out: Vec::new(),
    }));
    &mut plugin.effect
}

unsafe fn write_string(ptr: *mut c_void, text: &str) -> isize {
    let bytes = text.as_bytes();
    ptr::copy_nonoverlapping(bytes.as_ptr(), ptr as *mut u8, bytes.len());
    *(ptr as *mut u8).add(bytes.len()) = 0;
    1
}

unsafe extern "C" fn mock_dispatch(
    effect: *mut AEffect,
    opcode: i32,
    index: i32,
    value: isize,
    ptr: *mut c_void,
    opt: f32,
) -> isize {
    let plugin = plugin(effect);
    let shared = plugin.state.clone();
    let mut state = shared.lock();
    state.calls.push(Call {
        opcode,
        index,
        value,
    });

    match opcode {
        opcode::SET_SAMPLE_RATE => {
            state.sample_rate = opt;
            0
        }
        opcode::SET_BLOCK_SIZE => {
            state.block_size = value;
            0
        }
        opcode::GET_PROGRAM => state.program as isize,
        opcode::SET_PROGRAM => {
            state.program = value as i32;
            0
        }
        opcode::GET_EFFECT_NAME => write_string(ptr, plugin.spec.name),
        opcode::GET_PROGRAM_NAME_INDEXED => match plugin.spec.programs.get(index as usize) {
            Some(name) => write_string(ptr, name),
            None => 0,
        },
        opcode::GET_PARAM_NAME => match plugin.spec.params.get(index as usize) {
            Some((name, _, _)) => write_string(ptr, name),
            None => 0,
        },
        opcode::GET_PARAM_LABEL => match plugin.spec.params.get(index as usize) {
            Some((_, label, _)) => write_string(ptr, label),
            None => 0,
        },
        opcode::GET_PARAM_DISPLAY => match state.params.get(index as usize) {
            Some(value) => write_string(ptr, &format!("{value:.2}")),
            None => 0,
        },
        opcode::CAN_DO => {
            let feature = CStr::from_ptr(ptr as *const c_char).to_string_lossy();
            if plugin.spec.can_do.iter().any(|known| *known == feature) {
                1
            } else {
                -1
            }
        }
        opcode::EDIT_GET_RECT => match plugin.spec.rect {
            Some(rect) => {
                plugin.rect = rect;
                *(ptr as *mut *const Rect) = &plugin.rect;
                1
            }
            None => 0,
        },
        opcode::EDIT_OPEN => {
            if plugin.spec.editor_accepts {
                state.editor_window = Some(ptr as usize);
                1
            } else {
                0
            }
        }
        opcode::EDIT_CLOSE => {
            state.editor_window = None;
            0
        }
        opcode::GET_CHUNK => {
            state.chunk_requests.push(index);
            if state.chunk.is_empty() {
                return 0;
            }
            plugin.chunk_out = state.chunk.clone();
            *(ptr as *mut *const u8) = plugin.chunk_out.as_ptr();
            plugin.chunk_out.len() as isize
        }
        opcode::SET_CHUNK => {
            state.chunk = slice::from_raw_parts(ptr as *const u8, value as usize).to_vec();
            1
        }
        opcode::PROCESS_EVENTS => {
            let events = read_event_block(ptr as *const VstEvents);
            state.event_blocks.push(events);
            1
        }
        _ => 0,
    }
}

unsafe extern "C" fn mock_process(
    effect: *mut AEffect,
    inputs: *mut *mut f32,
    outputs: *mut *mut f32,
    frames: i32,
) {
    let plugin = plugin(effect);
    let shared = plugin.state.clone();
    let mut state = shared.lock();
    state.calls.push(Call {
        opcode: PROCESS,
        index: 0,
        value: frames as isize,
    });

    let frames = frames.max(0) as usize;
    let received: Vec<Vec<f32>> = (0..plugin.spec.inputs.max(0) as usize)
        .map(|channel| slice::from_raw_parts(*inputs.add(channel), frames).to_vec())
        .collect();
    for channel in 0..plugin.spec.outputs.max(0) as usize {
        let out = slice::from_raw_parts_mut(*outputs.add(channel), frames);
        for (frame, sample) in out.iter_mut().enumerate() {
            let input = received.get(channel).map_or(0.0, |samples| samples[frame]);
            *sample = (plugin.spec.output)(channel, input);
        }
    }
    state.process_calls.push(ProcessCall {
        frames,
        inputs: received,
    });
}

unsafe extern "C" fn mock_get_parameter(effect: *mut AEffect, index: i32) -> f32 {
    let plugin = plugin(effect);
    let value = plugin
        .state
        .lock()
        .params
        .get(index as usize)
        .copied()
        .unwrap_or(0.0);
    value
}

unsafe extern "C" fn mock_set_parameter(effect: *mut AEffect, index: i32, value: f32) {
    let plugin = plugin(effect);
    if let Some(param) = plugin.state.lock().params.get_mut(index as usize) {
        *param = value;
    }
}
