//! The dispatch bridge and the host callback.
//!
//! Every opcode the host sends goes through [`Dispatcher`]. Replies that come
//! back through memory (names, the editor rectangle, chunk pointers) use the
//! session's scratch region.

use crate::region::NativeRegion;
use std::ffi::{c_void, CString};
use std::ptr;
use vsthost_abi::abi::{host_opcode, opcode, AEffect, DispatcherProc, Rect, HOST_VERSION};
use vsthost_abi::layout::{read_c_string, read_chunk, read_pointer, read_rect};

/// Answers upcalls from every hosted plugin.
///
/// Only the version query is recognized; anything else gets 0.
pub unsafe extern "C" fn host_callback(
    _effect: *mut AEffect,
    opcode: i32,
    index: i32,
    _value: isize,
    _ptr: *mut c_void,
    _opt: f32,
) -> isize {
    match opcode {
        host_opcode::VERSION => HOST_VERSION,
        _ => {
            tracing::trace!(opcode, index, "unhandled host callback opcode");
            0
        }
    }
}

/// Calls into the plugin's opcode dispatcher.
///
/// A `Dispatcher` without a function pointer answers every call with 0.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Dispatcher {
    effect: *mut AEffect,
    proc_: Option<DispatcherProc>,
}

impl Dispatcher {
    pub(crate) fn new(effect: *mut AEffect, proc_: Option<DispatcherProc>) -> Self {
        Self { effect, proc_ }
    }

    /// A dispatcher that never reaches a plugin.
    pub(crate) fn detached() -> Self {
        Self {
            effect: ptr::null_mut(),
            proc_: None,
        }
    }

    pub fn is_available(&self) -> bool {
        self.proc_.is_some() && !self.effect.is_null()
    }

    /// Forwards one call and returns the plugin's answer unchanged.
    ///
    /// # Safety
    /// The descriptor must still be live and `ptr` must satisfy whatever
    /// `opcode` expects of its data argument.
    pub unsafe fn call(
        &self,
        opcode: i32,
        index: i32,
        value: isize,
        ptr: *mut c_void,
        opt: f32,
    ) -> isize {
        match self.proc_ {
            Some(dispatch) if !self.effect.is_null() => {
                dispatch(self.effect, opcode, index, value, ptr, opt)
            }
            _ => 0,
        }
    }

    /// Call with no data argument.
    pub(crate) fn send(&self, opcode: i32, index: i32, value: isize, opt: f32) -> isize {
        // SAFETY: sessions only build a dispatcher from a validated
        // descriptor and drop it before the module is unloaded.
        unsafe { self.call(opcode, index, value, ptr::null_mut(), opt) }
    }

    /// Asks the plugin to write a C string into `scratch`.
    pub(crate) fn query_string(
        &self,
        opcode: i32,
        index: i32,
        scratch: &mut NativeRegion,
    ) -> Option<String> {
        if !self.is_available() {
            return None;
        }
        scratch.fill_zero();
        // SAFETY: sessions size scratch to at least MIN_SCRATCH_BYTES, four
        // times the longest name a plugin may write, and keep it alive for the call.
        unsafe { self.call(opcode, index, 0, scratch.as_mut_ptr().cast(), 0.0) };
        Some(read_c_string(scratch.as_bytes()))
    }

    /// Free-form capability query; "greater than zero" means yes.
    pub(crate) fn can_do(&self, feature: &str) -> bool {
        if !self.is_available() {
            return false;
        }
        let Ok(feature) = CString::new(feature) else {
            return false;
        };
        // SAFETY: the string lives until the call returns and the plugin
        // only reads it.
        let answer =
            unsafe { self.call(opcode::CAN_DO, 0, 0, feature.as_ptr() as *mut c_void, 0.0) };
        answer > 0
    }

    /// Editor bounds; the zero rectangle when the plugin leaves the pointer null.
    pub(crate) fn editor_rect(&self, scratch: &mut NativeRegion) -> Rect {
        if !self.is_available() {
            return Rect::default();
        }
        scratch.write_pointer(0, 0);
        // SAFETY: the plugin stores one pointer into the scratch region.
        unsafe {
            self.call(opcode::EDIT_GET_RECT, 0, 0, scratch.as_mut_ptr().cast(), 0.0);
            read_rect(read_pointer(scratch.as_bytes()) as *const Rect)
        }
    }

    /// Copies the plugin's persisted state out of plugin-owned memory.
    pub(crate) fn chunk(&self, scratch: &mut NativeRegion, current_program_only: bool) -> Option<Vec<u8>> {
        if !self.is_available() {
            return None;
        }
        scratch.fill_zero();
        // SAFETY: the plugin stores a data pointer into the scratch region and
        // returns its length; the data stays valid until the next call.
        unsafe {
            let len = self.call(
                opcode::GET_CHUNK,
                current_program_only as i32,
                0,
                scratch.as_mut_ptr().cast(),
                0.0,
            );
            if len == 0 {
                return None;
            }
            read_chunk(read_pointer(scratch.as_bytes()) as *const u8, len)
        }
    }

    /// Hands a chunk to the plugin through `scratch` or, when it does not
    /// fit, a temporary region released before returning.
    pub(crate) fn set_chunk(&self, scratch: &mut NativeRegion, chunk: &[u8], current_program_only: bool) {
        if !self.is_available() {
            return;
        }
        let mut temporary;
        let region = if chunk.len() <= scratch.len() {
            scratch
        } else {
            temporary = NativeRegion::zeroed(chunk.len());
            &mut temporary
        };
        region.as_bytes_mut()[..chunk.len()].copy_from_slice(chunk);
        // SAFETY: the region holds `chunk.len()` bytes for the duration of the call.
        unsafe {
            self.call(
                opcode::SET_CHUNK,
                current_program_only as i32,
                chunk.len() as isize,
                region.as_mut_ptr().cast(),
                0.0,
            );
        }
    }
}
