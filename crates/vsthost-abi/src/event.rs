//! Timed events delivered to a plugin through the process-events opcode.
//!
//! [`Event`] is the canonical tagged form that the layout codec serializes.
//! [`MidiEvent`] and [`SysExEvent`] are the typed views callers usually build;
//! each converts into an [`Event`] explicitly via `From`.

use crate::abi::EventType;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

/// `kVstMidiEventIsRealtime`: the event is played live, not from a sequencer track.
pub const MIDI_EVENT_REALTIME: i32 = 1;

/// SysEx payload storage. Most dumps are short enough to stay inline.
pub type SysExData = SmallVec<[u8; 32]>;

// Byte offsets of the MIDI fields inside the 16 data bytes.
const NOTE_LENGTH: usize = 0;
const NOTE_OFFSET: usize = 4;
const MIDI_DATA: usize = 8;
const DETUNE: usize = 12;
const NOTE_OFF_VELOCITY: usize = 13;

/// The 16 type-specific bytes that follow `delta_frames` and `flags`.
///
/// Bytes are kept in memory order, so slot `n` covers bytes `4n..4n + 4`
/// and is read in native byte order, matching what the plugin sees.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EventData([u8; 16]);

impl EventData {
    pub const LEN: usize = 16;

    pub const fn from_bytes(bytes: [u8; 16]) -> Self {
        Self(bytes)
    }

    pub const fn as_bytes(&self) -> &[u8; 16] {
        &self.0
    }

    /// Byte at `index`; zero past the end.
    pub fn byte(&self, index: usize) -> u8 {
        self.0.get(index).copied().unwrap_or(0)
    }

    /// Writes the byte at `index`; ignored past the end.
    pub fn set_byte(&mut self, index: usize, value: u8) {
        if let Some(byte) = self.0.get_mut(index) {
            *byte = value;
        }
    }

    /// 4-byte slot `slot` (0..4) as a native-endian integer.
    pub fn slot(&self, slot: usize) -> i32 {
        let start = slot * 4;
        match self.0.get(start..start + 4) {
            Some(word) => i32::from_ne_bytes([word[0], word[1], word[2], word[3]]),
            None => 0,
        }
    }

    pub fn set_slot(&mut self, slot: usize, value: i32) {
        let start = slot * 4;
        if let Some(word) = self.0.get_mut(start..start + 4) {
            word.copy_from_slice(&value.to_ne_bytes());
        }
    }

    pub fn note_length(&self) -> i32 {
        self.slot(NOTE_LENGTH / 4)
    }

    pub fn note_offset(&self) -> i32 {
        self.slot(NOTE_OFFSET / 4)
    }

    /// Command byte and the two data bytes.
    pub fn midi_bytes(&self) -> [u8; 3] {
        [
            self.0[MIDI_DATA],
            self.0[MIDI_DATA + 1],
            self.0[MIDI_DATA + 2],
        ]
    }

    pub fn detune(&self) -> i8 {
        self.0[DETUNE] as i8
    }

    pub fn note_off_velocity(&self) -> u8 {
        self.0[NOTE_OFF_VELOCITY]
    }

    /// Packs the MIDI fields. The fourth MIDI byte and the two trailing
    /// reserved bytes are always zero.
    pub fn pack_midi(
        note_length: i32,
        note_offset: i32,
        data: [u8; 3],
        detune: i8,
        note_off_velocity: u8,
    ) -> Self {
        let mut packed = Self::default();
        packed.set_slot(NOTE_LENGTH / 4, note_length);
        packed.set_slot(NOTE_OFFSET / 4, note_offset);
        packed.0[MIDI_DATA..MIDI_DATA + 3].copy_from_slice(&data);
        packed.0[DETUNE] = detune as u8;
        packed.0[NOTE_OFF_VELOCITY] = note_off_velocity;
        packed
    }
}

/// Type-specific part of an [`Event`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum EventPayload {
    /// Short MIDI message, packed as by [`EventData::pack_midi`].
    Midi(EventData),
    /// System-exclusive dump.
    SysEx(SysExData),
    /// Any other event type. `byte_size` counts the body after the
    /// 8-byte type/size header, `delta_frames` and `flags` included.
    Generic {
        event_type: i32,
        byte_size: i32,
        data: EventData,
    },
}

/// A timed event as laid out in the event block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    /// Sample offset into the current block.
    pub delta_frames: i32,
    pub flags: i32,
    pub payload: EventPayload,
}

impl Event {
    pub fn generic(
        event_type: i32,
        byte_size: i32,
        delta_frames: i32,
        flags: i32,
        data: EventData,
    ) -> Self {
        Self {
            delta_frames,
            flags,
            payload: EventPayload::Generic {
                event_type,
                byte_size,
                data,
            },
        }
    }

    /// Raw `VstEventTypes` value written into the block.
    pub fn event_type(&self) -> i32 {
        match &self.payload {
            EventPayload::Midi(_) => EventType::Midi as i32,
            EventPayload::SysEx(_) => EventType::SysEx as i32,
            EventPayload::Generic { event_type, .. } => *event_type,
        }
    }

    pub fn as_midi(&self) -> Option<MidiEvent> {
        match &self.payload {
            EventPayload::Midi(data) => Some(MidiEvent {
                delta_frames: self.delta_frames,
                flags: self.flags,
                note_length: data.note_length(),
                note_offset: data.note_offset(),
                data: data.midi_bytes(),
                detune: data.detune(),
                note_off_velocity: data.note_off_velocity(),
            }),
            _ => None,
        }
    }

    pub fn sysex_data(&self) -> Option<&[u8]> {
        match &self.payload {
            EventPayload::SysEx(data) => Some(data.as_slice()),
            _ => None,
        }
    }
}

/// A short MIDI message with VST timing extras.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MidiEvent {
    pub delta_frames: i32,
    pub flags: i32,
    /// Note length in samples, 0 if unknown.
    pub note_length: i32,
    /// Offset into the note from the note start, in samples.
    pub note_offset: i32,
    /// Command byte followed by two data bytes.
    pub data: [u8; 3],
    /// Cents, -64..63.
    pub detune: i8,
    pub note_off_velocity: u8,
}

impl MidiEvent {
    pub fn new(delta_frames: i32, data: [u8; 3]) -> Self {
        Self {
            delta_frames,
            data,
            ..Default::default()
        }
    }

    pub fn note_on(delta_frames: i32, channel: u8, note: u8, velocity: u8) -> Self {
        Self::new(delta_frames, [0x90 | (channel & 0x0F), note & 0x7F, velocity & 0x7F])
    }

    pub fn note_off(delta_frames: i32, channel: u8, note: u8, velocity: u8) -> Self {
        Self::new(delta_frames, [0x80 | (channel & 0x0F), note & 0x7F, velocity & 0x7F])
            .with_note_off_velocity(velocity & 0x7F)
    }

    pub fn realtime(mut self) -> Self {
        self.flags |= MIDI_EVENT_REALTIME;
        self
    }

    pub fn with_detune(mut self, detune: i8) -> Self {
        self.detune = detune;
        self
    }

    pub fn with_note_off_velocity(mut self, velocity: u8) -> Self {
        self.note_off_velocity = velocity;
        self
    }

    pub fn with_note_length(mut self, note_length: i32, note_offset: i32) -> Self {
        self.note_length = note_length;
        self.note_offset = note_offset;
        self
    }
}

impl From<MidiEvent> for Event {
    fn from(midi: MidiEvent) -> Self {
        Event {
            delta_frames: midi.delta_frames,
            flags: midi.flags,
            payload: EventPayload::Midi(EventData::pack_midi(
                midi.note_length,
                midi.note_offset,
                midi.data,
                midi.detune,
                midi.note_off_velocity,
            )),
        }
    }
}

/// A system-exclusive dump.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SysExEvent {
    pub delta_frames: i32,
    pub flags: i32,
    pub data: Vec<u8>,
}

impl SysExEvent {
    pub fn new(delta_frames: i32, data: impl Into<Vec<u8>>) -> Self {
        Self {
            delta_frames,
            flags: 0,
            data: data.into(),
        }
    }
}

impl From<SysExEvent> for Event {
    fn from(sysex: SysExEvent) -> Self {
        Event {
            delta_frames: sysex.delta_frames,
            flags: sysex.flags,
            payload: EventPayload::SysEx(SmallVec::from_vec(sysex.data)),
        }
    }
}
