//! Binary layout codecs.
//!
//! Serializes event batches into the exact memory shape a plugin expects from
//! the process-events opcode, and reads back the few structures a plugin hands
//! to the host (editor rectangle, chunk data, C strings in a scratch region).
//!
//! The writer is plain safe code over a byte slice: pointers inside the block
//! are absolute addresses computed from the slice's own base address, so the
//! slice must not move between [`write_event_block`] and the dispatch call.

use crate::abi::{EventType, Rect, VstEvent, VstEvents, VstMidiEvent, VstSysExEvent};
use crate::event::{Event, EventData, EventPayload};
use std::mem::{offset_of, size_of};
use std::ptr;
use thiserror::Error;

const PTR_BYTES: usize = size_of::<usize>();

/// Every event body starts on this boundary.
pub const EVENT_ALIGN: usize = 8;

/// Count field, padding and reserved pointer ahead of the pointer table.
pub const EVENTS_HEADER_BYTES: usize = offset_of!(VstEvents, events);

/// Body size of a short MIDI event.
pub const MIDI_EVENT_BYTES: usize = size_of::<VstMidiEvent>();

/// Fixed part of a SysEx body; the dump follows immediately.
pub const SYSEX_EVENT_BYTES: usize = size_of::<VstSysExEvent>();

/// `event_type` + `byte_size` of a generic event.
const GENERIC_HEADER_BYTES: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum LayoutError {
    #[error("event block needs {needed} bytes, buffer holds {available}")]
    BufferTooSmall { needed: usize, available: usize },

    #[error("event block buffer is not 8-byte aligned")]
    Misaligned,
}

pub const fn align_up(offset: usize, align: usize) -> usize {
    (offset + align - 1) & !(align - 1)
}

/// Bytes one event occupies in the block, excluding alignment padding.
pub fn body_size(event: &Event) -> usize {
    match &event.payload {
        EventPayload::Midi(_) => MIDI_EVENT_BYTES,
        EventPayload::SysEx(data) => SYSEX_EVENT_BYTES + data.len(),
        EventPayload::Generic { byte_size, .. } => {
            GENERIC_HEADER_BYTES + (*byte_size).max(0) as usize
        }
    }
}

fn bodies_start(count: usize) -> usize {
    EVENTS_HEADER_BYTES + count * PTR_BYTES
}

/// Exact number of bytes [`write_event_block`] writes for `events`.
pub fn event_block_size(events: &[Event]) -> usize {
    events
        .iter()
        .fold(bodies_start(events.len()), |offset, event| {
            align_up(offset, EVENT_ALIGN) + body_size(event)
        })
}

struct BlockWriter<'a> {
    buf: &'a mut [u8],
    base: usize,
    pos: usize,
}

impl<'a> BlockWriter<'a> {
    fn new(buf: &'a mut [u8]) -> Self {
        let base = buf.as_ptr() as usize;
        Self { buf, base, pos: 0 }
    }

    fn put(&mut self, bytes: &[u8]) {
        let end = self.pos + bytes.len();
        self.buf[self.pos..end].copy_from_slice(bytes);
        self.pos = end;
    }

    fn put_i32(&mut self, value: i32) {
        self.put(&value.to_ne_bytes());
    }

    fn put_ptr(&mut self, address: usize) {
        self.put(&address.to_ne_bytes());
    }

    fn zeros(&mut self, count: usize) {
        let end = self.pos + count;
        self.buf[self.pos..end].fill(0);
        self.pos = end;
    }

    fn pad_to(&mut self, offset: usize) {
        self.zeros(offset - self.pos);
    }

    fn address_of(&self, offset: usize) -> usize {
        self.base + offset
    }

    fn write_body(&mut self, event: &Event) {
        let start = self.pos;
        match &event.payload {
            EventPayload::Midi(data) => {
                let bytes = data.as_bytes();
                self.put_i32(EventType::Midi as i32);
                self.put_i32(MIDI_EVENT_BYTES as i32);
                self.put_i32(event.delta_frames);
                self.put_i32(event.flags);
                self.put_i32(data.note_length());
                self.put_i32(data.note_offset());
                // 24-bit command/data field, then 16-bit detune/velocity field.
                self.put(&[bytes[8], bytes[9], bytes[10], 0]);
                self.put(&[bytes[12], bytes[13], 0, 0]);
            }
            EventPayload::SysEx(dump) => {
                self.put_i32(EventType::SysEx as i32);
                self.put_i32(SYSEX_EVENT_BYTES as i32);
                self.put_i32(event.delta_frames);
                self.put_i32(event.flags);
                self.put_i32(dump.len() as i32);
                self.pad_to(start + offset_of!(VstSysExEvent, reserved1));
                self.put_ptr(0);
                let dump_address = self.address_of(start + SYSEX_EVENT_BYTES);
                self.put_ptr(dump_address);
                self.put_ptr(0);
                self.pad_to(start + SYSEX_EVENT_BYTES);
                self.put(dump);
            }
            EventPayload::Generic {
                event_type,
                byte_size,
                data,
            } => {
                let declared = (*byte_size).max(0) as usize;
                self.put_i32(*event_type);
                self.put_i32(*byte_size);
                if declared >= 8 {
                    self.put_i32(event.delta_frames);
                    self.put_i32(event.flags);
                    let extra = declared - 8;
                    let copied = extra.min(EventData::LEN);
                    self.put(&data.as_bytes()[..copied]);
                    self.zeros(extra - copied);
                } else {
                    self.zeros(declared);
                }
            }
        }
    }
}

/// Lays out `events` as a `VstEvents` block at the start of `buf`.
///
/// Returns the number of bytes written, always equal to
/// [`event_block_size`]. `buf` must be [`EVENT_ALIGN`]-aligned.
pub fn write_event_block(events: &[Event], buf: &mut [u8]) -> Result<usize, LayoutError> {
    let needed = event_block_size(events);
    if buf.len() < needed {
        return Err(LayoutError::BufferTooSmall {
            needed,
            available: buf.len(),
        });
    }
    if buf.as_ptr() as usize % EVENT_ALIGN != 0 {
        return Err(LayoutError::Misaligned);
    }

    let mut writer = BlockWriter::new(buf);
    writer.put_i32(events.len() as i32);
    writer.pad_to(offset_of!(VstEvents, reserved));
    writer.put_ptr(0);

    let mut body = bodies_start(events.len());
    for event in events {
        body = align_up(body, EVENT_ALIGN);
        let address = writer.address_of(body);
        writer.put_ptr(address);
        body += body_size(event);
    }

    for event in events {
        writer.pad_to(align_up(writer.pos, EVENT_ALIGN));
        writer.write_body(event);
    }

    debug_assert_eq!(writer.pos, needed);
    Ok(writer.pos)
}

/// Reads an event block back into [`Event`]s through the `repr(C)` views.
///
/// # Safety
/// `events` must be null or point to a readable `VstEvents` whose first
/// `num_events` table entries are null or point to complete event bodies.
pub unsafe fn read_event_block(events: *const VstEvents) -> Vec<Event> {
    if events.is_null() {
        return Vec::new();
    }
    let count = ptr::read_unaligned(ptr::addr_of!((*events).num_events)).max(0) as usize;
    let table = ptr::addr_of!((*events).events) as *const *const VstEvent;

    let mut out = Vec::with_capacity(count);
    for i in 0..count {
        let event = ptr::read_unaligned(table.add(i));
        if !event.is_null() {
            out.push(read_event(event));
        }
    }
    out
}

unsafe fn read_event(event: *const VstEvent) -> Event {
    let words = event as *const i32;
    let event_type = ptr::read_unaligned(words);
    let byte_size = ptr::read_unaligned(words.add(1));

    match EventType::from_raw(event_type) {
        Some(EventType::Midi) => {
            let midi = ptr::read_unaligned(event as *const VstMidiEvent);
            Event {
                delta_frames: midi.delta_frames,
                flags: midi.flags,
                payload: EventPayload::Midi(EventData::pack_midi(
                    midi.note_length,
                    midi.note_offset,
                    [midi.midi_data[0], midi.midi_data[1], midi.midi_data[2]],
                    midi.detune,
                    midi.note_off_velocity,
                )),
            }
        }
        Some(EventType::SysEx) => {
            let sysex = ptr::read_unaligned(event as *const VstSysExEvent);
            let dump = if sysex.sysex_dump.is_null() || sysex.dump_bytes <= 0 {
                Default::default()
            } else {
                std::slice::from_raw_parts(sysex.sysex_dump, sysex.dump_bytes as usize).into()
            };
            Event {
                delta_frames: sysex.delta_frames,
                flags: sysex.flags,
                payload: EventPayload::SysEx(dump),
            }
        }
        _ => {
            let declared = byte_size.max(0) as usize;
            let mut data = EventData::default();
            let (delta_frames, flags) = if declared >= 8 {
                let body = (event as *const u8).add(16);
                for i in 0..(declared - 8).min(EventData::LEN) {
                    data.set_byte(i, ptr::read(body.add(i)));
                }
                (
                    ptr::read_unaligned(words.add(2)),
                    ptr::read_unaligned(words.add(3)),
                )
            } else {
                (0, 0)
            };
            Event::generic(event_type, byte_size, delta_frames, flags, data)
        }
    }
}

/// Reads the rectangle a plugin points to; zero rectangle for null.
///
/// # Safety
/// `rect` must be null or point to a readable `ERect`.
pub unsafe fn read_rect(rect: *const Rect) -> Rect {
    if rect.is_null() {
        Rect::default()
    } else {
        ptr::read_unaligned(rect)
    }
}

/// Copies `len` bytes of plugin-owned chunk data.
///
/// # Safety
/// `data` must be null or valid for `len` bytes of reads.
pub unsafe fn read_chunk(data: *const u8, len: isize) -> Option<Vec<u8>> {
    if data.is_null() || len <= 0 {
        return None;
    }
    Some(std::slice::from_raw_parts(data, len as usize).to_vec())
}

/// Pointer-sized value stored at the start of `bytes`, 0 if too short.
pub fn read_pointer(bytes: &[u8]) -> usize {
    bytes
        .get(..PTR_BYTES)
        .and_then(|word| word.try_into().ok())
        .map(usize::from_ne_bytes)
        .unwrap_or(0)
}

/// NUL-terminated string at the start of `bytes`, lossily decoded.
pub fn read_c_string(bytes: &[u8]) -> String {
    let end = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
    String::from_utf8_lossy(&bytes[..end]).into_owned()
}
