//! Binary contract for hosting VST2 plugins.
//!
//! - [`abi`]: `#[repr(C)]` descriptor, event and rectangle mirrors, opcode tables
//! - [`event`]: the event model handed to a plugin each block
//! - [`layout`]: event block serialization and the readers for plugin replies
//!
//! Nothing in this crate loads libraries or calls into plugins.

pub mod abi;
pub mod event;
pub mod layout;

pub use abi::{
    host_opcode, opcode, AEffect, DispatcherProc, EffectFlags, EventType, GetParameterProc,
    HostCallbackProc, PluginMainProc, ProcessProc, Rect, SetParameterProc, VstEvents, MAGIC,
};
pub use event::{Event, EventData, EventPayload, MidiEvent, SysExData, SysExEvent};
pub use layout::{event_block_size, write_event_block, LayoutError};
