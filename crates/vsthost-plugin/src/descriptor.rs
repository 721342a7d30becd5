//! Validated view of the descriptor a plugin returns from its entry point.

use crate::dispatch::Dispatcher;
use crate::error::LoadStage;
use serde::{Deserialize, Serialize};
use std::ptr;
use thiserror::Error;
use vsthost_abi::abi::{
    AEffect, DispatcherProc, EffectFlags, GetParameterProc, ProcessProc, SetParameterProc, MAGIC,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("entry point returned a null descriptor")]
    Null,

    #[error("'VstP' magic mismatch (found {0:#010x})")]
    MagicMismatch(i32),
}

impl ValidationError {
    pub fn stage(&self) -> LoadStage {
        match self {
            ValidationError::Null => LoadStage::Instantiation,
            ValidationError::MagicMismatch(_) => LoadStage::Validation,
        }
    }
}

/// Identity and shape of a loaded plugin. Copied once, never re-read.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Descriptor {
    pub num_programs: i32,
    pub num_params: i32,
    pub num_inputs: i32,
    pub num_outputs: i32,
    pub flags: EffectFlags,
    pub unique_id: i32,
    pub version: i32,
    /// Processing latency in samples.
    pub initial_delay: i32,
}

impl Descriptor {
    pub fn inputs(&self) -> usize {
        self.num_inputs.max(0) as usize
    }

    pub fn outputs(&self) -> usize {
        self.num_outputs.max(0) as usize
    }

    pub fn programs(&self) -> usize {
        self.num_programs.max(0) as usize
    }

    pub fn params(&self) -> usize {
        self.num_params.max(0) as usize
    }
}

/// The plugin's function pointers. Any of them may be absent.
#[derive(Debug, Clone, Copy, Default)]
pub struct EntryPoints {
    pub dispatcher: Option<DispatcherProc>,
    pub process_replacing: Option<ProcessProc>,
    pub get_parameter: Option<GetParameterProc>,
    pub set_parameter: Option<SetParameterProc>,
}

/// Checks the magic value and copies out the descriptor fields.
///
/// # Safety
/// `effect` must be null or point to a readable `AEffect`.
pub unsafe fn validate(effect: *const AEffect) -> Result<(Descriptor, EntryPoints), ValidationError> {
    if effect.is_null() {
        return Err(ValidationError::Null);
    }
    let magic = ptr::read_unaligned(ptr::addr_of!((*effect).magic));
    if magic != MAGIC {
        return Err(ValidationError::MagicMismatch(magic));
    }

    let effect = &*effect;
    let descriptor = Descriptor {
        num_programs: effect.num_programs,
        num_params: effect.num_params,
        num_inputs: effect.num_inputs,
        num_outputs: effect.num_outputs,
        flags: EffectFlags::from_bits(effect.flags),
        unique_id: effect.unique_id,
        version: effect.version,
        initial_delay: effect.initial_delay,
    };
    let entry_points = EntryPoints {
        dispatcher: effect.dispatcher,
        process_replacing: effect.process_replacing,
        get_parameter: effect.get_parameter,
        set_parameter: effect.set_parameter,
    };
    Ok((descriptor, entry_points))
}

/// What the host may rely on before processing begins.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Capabilities {
    pub can_process_replacing: bool,
    pub can_process_events: bool,
}

impl Capabilities {
    pub(crate) fn query(
        descriptor: &Descriptor,
        entry_points: &EntryPoints,
        dispatcher: &Dispatcher,
    ) -> Self {
        Self {
            can_process_replacing: entry_points.process_replacing.is_some()
                && descriptor.flags.contains(EffectFlags::CAN_REPLACING),
            can_process_events: dispatcher.can_do("receiveVstEvents")
                || dispatcher.can_do("receiveVstMidiEvent"),
        }
    }
}
