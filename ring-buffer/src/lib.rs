// Copyright 2022 Google LLC
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     https://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! A byte ring with separate insert and extract cursors over a power-of-two
//! sized array.
//!
//! The ring is shared between one producer and one consumer that may run in
//! different execution contexts (application code, an interrupt handler, or a
//! DMA engine writing memory directly). Each cursor has a single writer and is
//! stored already masked to the capacity, so the other side can load it with
//! one atomic-width read.
//!
//! The ring is empty when the cursors are equal. It is full when the insert
//! cursor sits one slot behind the extract cursor; that slot is never filled,
//! which is what lets empty and full be told apart without a count.
//!
//! `push` and `pop` are the plain single-byte operations for a ring whose
//! producer and consumer are both software. `push_slice` is the bulk producer
//! path, and `pop_before` serves rings whose producer is hardware that never
//! touches the insert cursor.

#![cfg_attr(not(test), no_std)]

use core::cell::UnsafeCell;
use core::sync::atomic::{AtomicUsize, Ordering};

pub struct RingBuffer<const N: usize> {
    data: UnsafeCell<[u8; N]>,
    insert: AtomicUsize,
    extract: AtomicUsize,
}

// Slots between extract and insert belong to the consumer, the rest to the
// producer; cursor stores publish ownership changes.
unsafe impl<const N: usize> Sync for RingBuffer<N> {}

impl<const N: usize> Default for RingBuffer<N> {
    fn default() -> Self { Self::new() }
}

impl<const N: usize> RingBuffer<N> {
    pub const CAPACITY: usize = N;
    const MASK: usize = N - 1;

    /// Creates an empty ring.
    ///
    /// Panics if `N` is not a power of two (at compile time when used to
    /// initialize a `static`). Wraparound is done by masking, which only works
    /// for power-of-two capacities.
    pub const fn new() -> Self {
        assert!(N >= 2 && N.is_power_of_two(), "ring capacity must be a power of two");
        Self {
            data: UnsafeCell::new([0; N]),
            insert: AtomicUsize::new(0),
            extract: AtomicUsize::new(0),
        }
    }

    /// Maps any position onto a slot index.
    #[inline]
    pub const fn wrap(position: usize) -> usize { position & Self::MASK }

    /// Number of bytes between `extract` and `insert`.
    #[inline]
    pub const fn len_between(insert: usize, extract: usize) -> usize {
        Self::wrap(insert.wrapping_sub(extract))
    }

    /// The slot the producer must not fill given the consumer is at `extract`.
    #[inline]
    pub const fn blocking_boundary(extract: usize) -> usize { Self::wrap(extract.wrapping_sub(1)) }

    /// Length of the pending run starting at `extract` that does not cross
    /// the physical end of the storage.
    ///
    /// When the pending bytes wrap, only the part up to the end is counted; the
    /// remainder starts at slot zero and is a separate run.
    pub const fn contiguous_run(insert: usize, extract: usize) -> usize {
        if insert > extract {
            insert - extract
        } else if insert < extract {
            N - extract
        } else {
            0
        }
    }

    pub fn insert_cursor(&self) -> usize { self.insert.load(Ordering::Acquire) }

    pub fn extract_cursor(&self) -> usize { self.extract.load(Ordering::Acquire) }

    /// Stores the insert cursor. Only the producer may call this.
    pub fn set_insert_cursor(&self, position: usize) {
        self.insert.store(Self::wrap(position), Ordering::Release);
    }

    /// Stores the extract cursor. Only the consumer may call this.
    pub fn set_extract_cursor(&self, position: usize) {
        self.extract.store(Self::wrap(position), Ordering::Release);
    }

    /// Resets both cursors to zero.
    ///
    /// This does not modify the data.
    pub fn clear(&self) {
        self.insert.store(0, Ordering::Release);
        self.extract.store(0, Ordering::Release);
    }

    /// Returns the number of bytes waiting for the consumer.
    pub fn len(&self) -> usize { Self::len_between(self.insert_cursor(), self.extract_cursor()) }

    /// Returns true if buffer is empty, false otherwise.
    pub fn is_empty(&self) -> bool { self.insert_cursor() == self.extract_cursor() }

    /// Returns the number of slots the producer may still fill.
    pub fn available_data(&self) -> usize { N - 1 - self.len() }

    /// Start of the backing storage, for handing to a DMA engine.
    pub fn as_ptr(&self) -> *const u8 { self.data.get() as *const u8 }

    pub fn as_mut_ptr(&self) -> *mut u8 { self.data.get() as *mut u8 }

    /// Converts a pointer into (or one past the end of) the storage into a
    /// slot index. Returns None for pointers outside the storage.
    pub fn offset_of(&self, ptr: *const u8) -> Option<usize> {
        let offset = (ptr as usize).wrapping_sub(self.as_ptr() as usize);
        if offset <= N {
            Some(Self::wrap(offset))
        } else {
            None
        }
    }

    /// Reads the byte in slot `position`.
    ///
    /// The read is volatile since the slot may have been filled by hardware.
    pub fn byte_at(&self, position: usize) -> u8 {
        unsafe { self.as_ptr().add(Self::wrap(position)).read_volatile() }
    }

    /// Writes the byte in slot `position`.
    ///
    /// # Safety
    ///
    /// The caller must be the producer and `position` must not be in the
    /// range currently owned by the consumer.
    pub unsafe fn set_byte_at(&self, position: usize, item: u8) {
        self.as_mut_ptr().add(Self::wrap(position)).write_volatile(item);
    }

    /// Adds an item to the buffer.
    ///
    /// Returns false if buffer is full, otherwise true.
    #[must_use]
    pub fn push(&self, item: u8) -> bool { self.push_slice(&[item]) == 1 }

    /// Copies as much of `data` as fits, stopping at the blocking boundary.
    ///
    /// The extract cursor is sampled once; if the consumer advances while the
    /// copy runs the estimate is only conservative. Returns the number of
    /// bytes accepted.
    pub fn push_slice(&self, data: &[u8]) -> usize {
        let boundary = Self::blocking_boundary(self.extract_cursor());
        let mut insert = self.insert_cursor();
        let mut accepted = 0;
        for &item in data {
            if insert == boundary {
                break;
            }
            unsafe { self.set_byte_at(insert, item) };
            insert = Self::wrap(insert + 1);
            accepted += 1;
        }
        if accepted != 0 {
            self.set_insert_cursor(insert);
        }
        accepted
    }

    /// Removes the item at the front of the buffer, treating `producer` as the
    /// insert position.
    ///
    /// This is for rings whose producer does not maintain the insert cursor
    /// itself (e.g. a DMA engine). Returns None if no byte precedes
    /// `producer`.
    #[must_use]
    pub fn pop_before(&self, producer: usize) -> Option<u8> {
        let extract = self.extract_cursor();
        if extract == Self::wrap(producer) {
            return None;
        }
        let result = self.byte_at(extract);
        self.set_extract_cursor(extract + 1);
        Some(result)
    }

    /// Remove an item at the front of the buffer.
    ///
    /// Returns None if buffer is empty, otherwise the result.
    #[must_use]
    pub fn pop(&self) -> Option<u8> { self.pop_before(self.insert_cursor()) }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CAPACITY: usize = 32;
    type Ring = RingBuffer<CAPACITY>;

    /// Pop will return pushed value.
    #[test]
    fn push_pop() {
        let buffer = Ring::new();
        assert!(buffer.push(1));
        assert_eq!(Some(1), buffer.pop());
    }

    /// Check that popping an empty buffer will return None.
    #[test]
    fn pop_empty_buffer() {
        let buffer = Ring::new();
        assert_eq!(None, buffer.pop());
        assert!(buffer.push(1));
        assert_eq!(Some(1), buffer.pop());
        assert_eq!(None, buffer.pop());
        assert_eq!(None, buffer.pop());
    }

    /// Pop will return FIFO order.
    #[test]
    fn pop_fifo() {
        let buffer = Ring::new();
        assert!(buffer.push(1));
        assert!(buffer.push(2));
        assert_eq!(Some(1), buffer.pop());
        assert_eq!(Some(2), buffer.pop());
    }

    /// One slot is always left empty.
    #[test]
    fn push_full_buffer() {
        let buffer = Ring::new();
        for i in 0..(CAPACITY - 1) {
            assert!(buffer.push(i as u8));
        }
        assert_eq!(CAPACITY - 1, buffer.len());
        assert_eq!(0, buffer.available_data());
        assert!(!buffer.push(0xff));
        assert_eq!(Some(0), buffer.pop());
        assert!(buffer.push(0xff));
    }

    #[test]
    fn push_slice_accepts_capacity_minus_one() {
        let buffer = Ring::new();
        let data = [0x5a; CAPACITY];
        assert_eq!(CAPACITY - 1, buffer.push_slice(&data[..CAPACITY - 1]));
        buffer.clear();
        assert_eq!(CAPACITY - 1, buffer.push_slice(&data));
        assert_eq!(0, buffer.push_slice(&data));
    }

    /// Check that push and pop over capacity will wrap and not break.
    #[test]
    fn buffer_begin_wrap() {
        let buffer = Ring::new();
        for i in 0..(CAPACITY * 3) {
            let value = i as u8;
            assert!(buffer.push(value));
            assert_eq!(Some(value), buffer.pop());
            assert!(buffer.insert_cursor() < CAPACITY);
            assert!(buffer.extract_cursor() < CAPACITY);
        }
        assert!(buffer.is_empty());
    }

    #[test]
    fn pop_before_external_producer() {
        let buffer = Ring::new();
        unsafe {
            buffer.set_byte_at(0, b'a');
            buffer.set_byte_at(1, b'b');
        }
        assert_eq!(None, buffer.pop_before(0));
        assert_eq!(Some(b'a'), buffer.pop_before(2));
        assert_eq!(Some(b'b'), buffer.pop_before(2));
        assert_eq!(None, buffer.pop_before(2));
        // Positions are masked.
        assert_eq!(None, buffer.pop_before(2 + CAPACITY));
    }

    #[test]
    fn boundary_wraps_below_zero() {
        assert_eq!(CAPACITY - 1, Ring::blocking_boundary(0));
        assert_eq!(4, Ring::blocking_boundary(5));
        assert_eq!(3, Ring::len_between(1, CAPACITY - 2));
    }

    #[test]
    fn contiguous_run_stops_at_end() {
        assert_eq!(0, Ring::contiguous_run(7, 7));
        assert_eq!(5, Ring::contiguous_run(12, 7));
        assert_eq!(12, Ring::contiguous_run(8, 20));
        assert_eq!(CAPACITY - 20, Ring::contiguous_run(0, 20));
    }

    #[test]
    fn offset_of_storage_pointers() {
        let buffer = Ring::new();
        let base = buffer.as_ptr();
        assert_eq!(Some(0), buffer.offset_of(base));
        assert_eq!(Some(9), buffer.offset_of(base.wrapping_add(9)));
        // One past the end maps back to slot zero.
        assert_eq!(Some(0), buffer.offset_of(base.wrapping_add(CAPACITY)));
        assert_eq!(None, buffer.offset_of(base.wrapping_add(CAPACITY + 1)));
        assert_eq!(None, buffer.offset_of(core::ptr::null()));
    }

    #[test]
    #[should_panic(expected = "power of two")]
    fn non_power_of_two_rejected() { let _ = RingBuffer::<24>::new(); }
}
