//! Host-owned byte regions handed to the plugin by address.
//!
//! Backed by `u64` words so the base address is always 8-byte aligned, which
//! the event block layout and the `f32` sample views both rely on.

use std::slice;

#[derive(Debug, Default)]
pub struct NativeRegion {
    words: Vec<u64>,
    len: usize,
}

impl NativeRegion {
    pub const ALIGN: usize = 8;

    pub fn new() -> Self {
        Self::default()
    }

    /// A zeroed region of `len` bytes.
    pub fn zeroed(len: usize) -> Self {
        let mut region = Self::new();
        region.reallocate(len);
        region
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn is_allocated(&self) -> bool {
        !self.words.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.words.len() * Self::ALIGN
    }

    /// Makes the region `len` bytes long, reusing storage when it is large
    /// enough. Returns `true` if new storage was allocated. Contents are
    /// unspecified afterwards.
    pub fn ensure(&mut self, len: usize) -> bool {
        if self.is_allocated() && len <= self.capacity() {
            self.len = len;
            return false;
        }
        self.reallocate(len);
        true
    }

    /// Drops the current storage and allocates `len` zeroed bytes.
    pub fn reallocate(&mut self, len: usize) {
        self.words = vec![0; len.div_ceil(Self::ALIGN).max(1)];
        self.len = len;
    }

    pub fn release(&mut self) {
        self.words = Vec::new();
        self.len = 0;
    }

    pub fn fill_zero(&mut self) {
        self.words.fill(0);
    }

    pub fn as_bytes(&self) -> &[u8] {
        // SAFETY: `len` never exceeds the word storage and u64 storage is
        // valid to view as bytes.
        unsafe { slice::from_raw_parts(self.words.as_ptr() as *const u8, self.len) }
    }

    pub fn as_bytes_mut(&mut self) -> &mut [u8] {
        // SAFETY: see `as_bytes`; the borrow is exclusive.
        unsafe { slice::from_raw_parts_mut(self.words.as_mut_ptr() as *mut u8, self.len) }
    }

    /// Base address passed to the plugin.
    pub fn as_mut_ptr(&mut self) -> *mut u8 {
        self.words.as_mut_ptr() as *mut u8
    }

    /// `count` samples starting at byte `offset`.
    ///
    /// Panics if the range is out of bounds or `offset` is not 4-byte aligned.
    pub fn floats(&self, offset: usize, count: usize) -> &[f32] {
        let bytes = &self.as_bytes()[offset..offset + count * 4];
        assert_eq!(offset % 4, 0, "sample offset {offset} is not f32 aligned");
        // SAFETY: the range is in bounds, the base is 8-aligned and the offset
        // 4-aligned, and every bit pattern is a valid f32.
        unsafe { slice::from_raw_parts(bytes.as_ptr() as *const f32, count) }
    }

    pub fn floats_mut(&mut self, offset: usize, count: usize) -> &mut [f32] {
        assert_eq!(offset % 4, 0, "sample offset {offset} is not f32 aligned");
        let bytes = &mut self.as_bytes_mut()[offset..offset + count * 4];
        // SAFETY: see `floats`; the borrow is exclusive.
        unsafe { slice::from_raw_parts_mut(bytes.as_mut_ptr() as *mut f32, count) }
    }

    /// Stores a native pointer-sized value at byte `offset`.
    pub fn write_pointer(&mut self, offset: usize, value: usize) {
        let width = std::mem::size_of::<usize>();
        self.as_bytes_mut()[offset..offset + width].copy_from_slice(&value.to_ne_bytes());
    }
}
