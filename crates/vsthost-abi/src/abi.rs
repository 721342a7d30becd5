//! `#[repr(C)]` mirrors of the VST2 binary interface.
//!
//! Field order, widths and padding follow the published `aeffect.h` /
//! `aeffectx.h` layouts. Nothing here may be reordered.

use serde::{Deserialize, Serialize};
use std::ffi::c_void;

/// `'VstP'` read as a big-endian 32-bit integer.
pub const MAGIC: i32 = i32::from_be_bytes(*b"VstP");

/// Version reported to plugins that ask the host for its VST version.
pub const HOST_VERSION: isize = 2400;

/// Entry symbol exported by current plugins.
pub const ENTRY_SYMBOL: &str = "VSTPluginMain";

/// Entry symbol exported by legacy plugins.
pub const LEGACY_ENTRY_SYMBOL: &str = "main";

/// Host upcall: the plugin calls this to talk to the host.
pub type HostCallbackProc = unsafe extern "C" fn(
    effect: *mut AEffect,
    opcode: i32,
    index: i32,
    value: isize,
    ptr: *mut c_void,
    opt: f32,
) -> isize;

/// Opcode dispatcher exported by the plugin.
pub type DispatcherProc = unsafe extern "C" fn(
    effect: *mut AEffect,
    opcode: i32,
    index: i32,
    value: isize,
    ptr: *mut c_void,
    opt: f32,
) -> isize;

pub type ProcessProc = unsafe extern "C" fn(
    effect: *mut AEffect,
    inputs: *mut *mut f32,
    outputs: *mut *mut f32,
    sample_frames: i32,
);

pub type ProcessDoubleProc = unsafe extern "C" fn(
    effect: *mut AEffect,
    inputs: *mut *mut f64,
    outputs: *mut *mut f64,
    sample_frames: i32,
);

pub type SetParameterProc = unsafe extern "C" fn(effect: *mut AEffect, index: i32, value: f32);

pub type GetParameterProc = unsafe extern "C" fn(effect: *mut AEffect, index: i32) -> f32;

/// Signature of `VSTPluginMain` / `main`.
pub type PluginMainProc = unsafe extern "C" fn(host: HostCallbackProc) -> *mut AEffect;

/// The plugin descriptor returned by the entry point.
#[repr(C)]
pub struct AEffect {
    /// Must equal [`MAGIC`].
    pub magic: i32,
    pub dispatcher: Option<DispatcherProc>,
    /// Deprecated accumulating process.
    pub process: Option<ProcessProc>,
    pub set_parameter: Option<SetParameterProc>,
    pub get_parameter: Option<GetParameterProc>,
    pub num_programs: i32,
    pub num_params: i32,
    pub num_inputs: i32,
    pub num_outputs: i32,
    pub flags: i32,
    pub reserved1: isize,
    pub reserved2: isize,
    pub initial_delay: i32,
    pub real_qualities: i32,
    pub off_qualities: i32,
    pub io_ratio: f32,
    pub object: *mut c_void,
    pub user: *mut c_void,
    pub unique_id: i32,
    pub version: i32,
    pub process_replacing: Option<ProcessProc>,
    pub process_double_replacing: Option<ProcessDoubleProc>,
    pub future: [u8; 56],
}

/// Plugin dispatcher opcodes (`effXxx`).
pub mod opcode {
    pub const OPEN: i32 = 0;
    pub const CLOSE: i32 = 1;
    pub const GET_PROGRAM: i32 = 2;
    pub const SET_PROGRAM: i32 = 3;
    pub const GET_PARAM_LABEL: i32 = 6;
    pub const GET_PARAM_DISPLAY: i32 = 7;
    pub const GET_PARAM_NAME: i32 = 8;
    pub const SET_SAMPLE_RATE: i32 = 10;
    pub const SET_BLOCK_SIZE: i32 = 11;
    pub const MAINS_CHANGED: i32 = 12;
    pub const EDIT_GET_RECT: i32 = 13;
    pub const EDIT_OPEN: i32 = 14;
    pub const EDIT_CLOSE: i32 = 15;
    pub const GET_CHUNK: i32 = 23;
    pub const SET_CHUNK: i32 = 24;
    pub const PROCESS_EVENTS: i32 = 25;
    pub const GET_PROGRAM_NAME_INDEXED: i32 = 29;
    pub const GET_EFFECT_NAME: i32 = 45;
    pub const CAN_DO: i32 = 51;
    pub const START_PROCESS: i32 = 71;
    pub const STOP_PROCESS: i32 = 72;
}

/// Host callback opcodes (`audioMasterXxx`) the host recognizes.
pub mod host_opcode {
    pub const VERSION: i32 = 1;
}

/// `effFlagsXxx` bits of [`AEffect::flags`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EffectFlags(i32);

impl EffectFlags {
    pub const HAS_EDITOR: Self = Self(1 << 0);
    pub const CAN_REPLACING: Self = Self(1 << 4);
    pub const PROGRAM_CHUNKS: Self = Self(1 << 5);
    pub const IS_SYNTH: Self = Self(1 << 8);
    pub const NO_SOUND_IN_STOP: Self = Self(1 << 9);
    pub const CAN_DOUBLE_REPLACING: Self = Self(1 << 12);

    // Deprecated, still reported by old plugins.
    pub const HAS_CLIP: Self = Self(1 << 1);
    pub const HAS_VU: Self = Self(1 << 2);
    pub const CAN_MONO: Self = Self(1 << 3);
    pub const EXT_IS_ASYNC: Self = Self(1 << 10);
    pub const EXT_HAS_BUFFER: Self = Self(1 << 11);

    pub const fn from_bits(bits: i32) -> Self {
        Self(bits)
    }

    pub const fn bits(self) -> i32 {
        self.0
    }

    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }
}

impl std::ops::BitOr for EffectFlags {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

/// `VstEventTypes`.
#[repr(i32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventType {
    Midi = 1,
    Audio = 2,
    Video = 3,
    Parameter = 4,
    Trigger = 5,
    SysEx = 6,
}

impl EventType {
    pub fn from_raw(raw: i32) -> Option<Self> {
        match raw {
            1 => Some(Self::Midi),
            2 => Some(Self::Audio),
            3 => Some(Self::Video),
            4 => Some(Self::Parameter),
            5 => Some(Self::Trigger),
            6 => Some(Self::SysEx),
            _ => None,
        }
    }
}

/// `VstEvents`: a count, a reserved word and a variable-length pointer table.
///
/// Declared with two slots like the C header; the real table holds
/// `num_events` entries.
#[repr(C)]
pub struct VstEvents {
    pub num_events: i32,
    pub reserved: isize,
    pub events: [*mut VstEvent; 2],
}

/// Generic `VstEvent` header plus its 16 data bytes.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct VstEvent {
    pub event_type: i32,
    /// Size of the body excluding `event_type` and `byte_size`.
    pub byte_size: i32,
    pub delta_frames: i32,
    pub flags: i32,
    pub data: [u8; 16],
}

#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct VstMidiEvent {
    pub event_type: i32,
    pub byte_size: i32,
    pub delta_frames: i32,
    pub flags: i32,
    pub note_length: i32,
    pub note_offset: i32,
    pub midi_data: [u8; 4],
    pub detune: i8,
    pub note_off_velocity: u8,
    pub reserved1: u8,
    pub reserved2: u8,
}

#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct VstSysExEvent {
    pub event_type: i32,
    pub byte_size: i32,
    pub delta_frames: i32,
    pub flags: i32,
    pub dump_bytes: i32,
    pub reserved1: isize,
    pub sysex_dump: *mut u8,
    pub reserved2: isize,
}

/// `ERect`, the editor bounds reported by the plugin.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rect {
    pub top: i16,
    pub left: i16,
    pub bottom: i16,
    pub right: i16,
}

impl Rect {
    pub fn width(&self) -> i32 {
        self.right as i32 - self.left as i32
    }

    pub fn height(&self) -> i32 {
        self.bottom as i32 - self.top as i32
    }
}
