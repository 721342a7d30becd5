//! In-process VST2 plugin hosting
//!
//! Loads a plugin library, validates the descriptor its entry point returns
//! and drives it through its lifecycle: events and audio in, audio out.
//!
//! ## Usage
//!
//! ```ignore
//! use vsthost_plugin::{HostConfig, Session};
//! use vsthost_abi::MidiEvent;
//!
//! let session = Session::load_with("/path/to/Synth.so", HostConfig::default().sample_rate(48000.0))?;
//! session.set_block_size(256);
//!
//! session.process_midi(&[MidiEvent::note_on(0, 0, 60, 100)]);
//! let mut left = vec![0.0; 256];
//! let mut right = vec![0.0; 256];
//! session.process_replacing(None, &mut [&mut left, &mut right], 256);
//! ```

pub mod error;
pub use error::{HostError, LoadStage, Result};

mod config;
pub use config::{HostConfig, MIN_SCRATCH_BYTES};

pub mod audio;
pub mod descriptor;
pub use descriptor::{Capabilities, Descriptor, ValidationError};

mod dispatch;
pub use dispatch::host_callback;

mod events;
pub use events::{midi_batch, EventBatch, EventBuffer};

mod lifecycle;
pub use lifecycle::LifecycleState;

mod metadata;
pub use metadata::{CanDoFeature, ParameterInfo, PluginMetadata, ProgramInfo};

mod module;
pub use module::{resolve_bundle_path, ModuleOrigin, PluginModule};

#[doc(hidden)]
pub mod region;

mod session;
pub use session::Session;

mod snapshot;
pub use snapshot::SessionSnapshot;
