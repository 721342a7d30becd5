//! Plugin metadata collected at load time.

use crate::descriptor::{Capabilities, Descriptor};
use serde::{Deserialize, Serialize};
use vsthost_abi::EffectFlags;

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ProgramInfo {
    pub index: i32,
    pub name: String,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ParameterInfo {
    pub index: i32,
    pub name: String,
    /// Unit label, e.g. "dB".
    pub label: String,
    /// Value as the plugin formats it at load.
    pub display: String,
    /// Value read at load.
    pub default_value: f32,
}

/// Summary of a loaded plugin
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PluginMetadata {
    pub name: String,
    pub unique_id: i32,
    pub version: i32,
    pub inputs: usize,
    pub outputs: usize,
    pub flags: EffectFlags,
    /// Plugin latency in samples
    pub latency_samples: i32,
    pub capabilities: Capabilities,
    pub programs: Vec<ProgramInfo>,
    pub parameters: Vec<ParameterInfo>,
}

impl PluginMetadata {
    pub fn new(name: impl Into<String>, descriptor: &Descriptor) -> Self {
        Self {
            name: name.into(),
            unique_id: descriptor.unique_id,
            version: descriptor.version,
            inputs: descriptor.inputs(),
            outputs: descriptor.outputs(),
            flags: descriptor.flags,
            latency_samples: descriptor.initial_delay,
            ..Default::default()
        }
    }

    pub fn capabilities(mut self, capabilities: Capabilities) -> Self {
        self.capabilities = capabilities;
        self
    }

    pub fn programs(mut self, programs: Vec<ProgramInfo>) -> Self {
        self.programs = programs;
        self
    }

    pub fn parameters(mut self, parameters: Vec<ParameterInfo>) -> Self {
        self.parameters = parameters;
        self
    }

    pub fn has_editor(&self) -> bool {
        self.flags.contains(EffectFlags::HAS_EDITOR)
    }

    pub fn is_synth(&self) -> bool {
        self.flags.contains(EffectFlags::IS_SYNTH)
    }

    /// Unique id as the four-character code plugins usually choose.
    pub fn unique_id_code(&self) -> String {
        self.unique_id
            .to_be_bytes()
            .iter()
            .map(|&b| if b.is_ascii_graphic() { b as char } else { '.' })
            .collect()
    }
}

/// Well-known capability names understood by the can-do opcode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CanDoFeature {
    SendVstEvents,
    SendVstMidiEvent,
    SendVstTimeInfo,
    ReceiveVstEvents,
    ReceiveVstMidiEvent,
    ReceiveVstTimeInfo,
    Offline,
    MidiProgramNames,
    Bypass,
    In1Out1,
    In1Out2,
    In2Out1,
    In2Out2,
    In2Out4,
    In4Out2,
    In4Out4,
    In4Out8,
    In8Out4,
    In8Out8,
}

impl CanDoFeature {
    pub const ALL: [CanDoFeature; 19] = [
        CanDoFeature::SendVstEvents,
        CanDoFeature::SendVstMidiEvent,
        CanDoFeature::SendVstTimeInfo,
        CanDoFeature::ReceiveVstEvents,
        CanDoFeature::ReceiveVstMidiEvent,
        CanDoFeature::ReceiveVstTimeInfo,
        CanDoFeature::Offline,
        CanDoFeature::MidiProgramNames,
        CanDoFeature::Bypass,
        CanDoFeature::In1Out1,
        CanDoFeature::In1Out2,
        CanDoFeature::In2Out1,
        CanDoFeature::In2Out2,
        CanDoFeature::In2Out4,
        CanDoFeature::In4Out2,
        CanDoFeature::In4Out4,
        CanDoFeature::In4Out8,
        CanDoFeature::In8Out4,
        CanDoFeature::In8Out8,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            CanDoFeature::SendVstEvents => "sendVstEvents",
            CanDoFeature::SendVstMidiEvent => "sendVstMidiEvent",
            CanDoFeature::SendVstTimeInfo => "sendVstTimeInfo",
            CanDoFeature::ReceiveVstEvents => "receiveVstEvents",
            CanDoFeature::ReceiveVstMidiEvent => "receiveVstMidiEvent",
            CanDoFeature::ReceiveVstTimeInfo => "receiveVstTimeInfo",
            CanDoFeature::Offline => "offline",
            CanDoFeature::MidiProgramNames => "midiProgramNames",
            CanDoFeature::Bypass => "bypass",
            CanDoFeature::In1Out1 => "1in1out",
            CanDoFeature::In1Out2 => "1in2out",
            CanDoFeature::In2Out1 => "2in1out",
            CanDoFeature::In2Out2 => "2in2out",
            CanDoFeature::In2Out4 => "2in4out",
            CanDoFeature::In4Out2 => "4in2out",
            CanDoFeature::In4Out4 => "4in4out",
            CanDoFeature::In4Out8 => "4in8out",
            CanDoFeature::In8Out4 => "8in4out",
            CanDoFeature::In8Out8 => "8in8out",
        }
    }
}

impl std::fmt::Display for CanDoFeature {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
