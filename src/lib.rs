//! # vsthost - VST2 plugin hosting
//!
//! Loads VST2 plugin libraries into the current process and drives them:
//! lifecycle, parameters, programs, editor, state chunks, events and audio.
//!
//! ## Quick Start
//!
//! ```ignore
//! use vsthost::prelude::*;
//!
//! let session = Session::load_with(
//!     "/usr/lib/vst/Synth.so",
//!     HostConfig::default().block_size(256).sample_rate(48000.0),
//! )?;
//!
//! session.process_midi(&[MidiEvent::note_on(0, 0, 60, 100)]);
//!
//! let mut left = vec![0.0; 256];
//! let mut right = vec![0.0; 256];
//! session.process_replacing(None, &mut [&mut left, &mut right], 256);
//!
//! let state = session.snapshot();
//! state.save("synth.state")?;
//! ```
//!
//! ## Crates
//!
//! - [`abi`] - `#[repr(C)]` mirrors, opcodes and event block layout
//! - [`plugin`] - module loading and the hosting session

/// Re-export of vsthost-abi for direct access
pub use vsthost_abi as abi;

/// Re-export of vsthost-plugin for direct access
pub use vsthost_plugin as plugin;

pub use vsthost_abi::{Event, EventPayload, MidiEvent, SysExEvent};
pub use vsthost_plugin::{
    CanDoFeature, Capabilities, Descriptor, HostConfig, HostError, LifecycleState, LoadStage,
    PluginMetadata, Result, Session, SessionSnapshot,
};

/// Convenience imports for hosting a plugin.
pub mod prelude {
    pub use crate::abi::{EffectFlags, Rect};
    pub use crate::{
        CanDoFeature, Capabilities, Event, HostConfig, HostError, LifecycleState, MidiEvent,
        PluginMetadata, Result, Session, SessionSnapshot, SysExEvent,
    };
}
