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

//! Character I/O over a UART using two ring buffers.
//!
//! Receive: the peripheral streams bytes into `rx` continuously. Software
//! never learns about individual bytes; the producer position is recomputed
//! from the hardware remaining count on every read. If reads fall behind by a
//! full ring, the oldest unread bytes are overwritten without any signal. That
//! is deliberate: keeping reception running matters more than detecting the
//! loss. `rx_saturation_count` is available for callers that want a hint.
//!
//! Transmit (interrupt mode): writers copy into `tx`, then claim the
//! transmitter and arm a transfer if nobody owns it. While a transfer is in
//! flight, or its completion has not been handled yet, the transmitter stays
//! claimed and new bytes go out from the completion handler. The
//! transfer-complete interrupt calls `on_tx_complete`, which reads back how
//! far the hardware got and arms the next contiguous run, releasing the
//! transmitter once the ring is empty. A run that would cross the end of the
//! storage is split and the remainder goes out on the following completion.
//! A transfer that fails to start releases the transmitter, so the next write
//! arms it again.
//!
//! Transmit (blocking mode): every write is a synchronous transfer with a
//! timeout and `tx` is unused.
//!
//! No locks are taken. The application thread is the only writer of the
//! transmit insert cursor and the receive extract cursor; the completion
//! handler is the only writer of the transmit extract cursor.

#![cfg_attr(not(test), no_std)]

pub mod config;
pub mod io;
pub mod stdio;

use core::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use log::{error, info, trace, warn};
use ring_buffer::RingBuffer;

pub use uart_hal_interface::{HalStatus, UartHal, UartIoError};

/// How writes reach the wire.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum TxMode {
    /// Queue into the transmit ring; drain from the completion interrupt.
    Interrupt,
    /// Hand each write to the peripheral and wait for it to finish.
    Blocking { timeout_ms: u32 },
}

pub struct UartIo<H, const RX: usize, const TX: usize> {
    hal: H,
    tx_mode: TxMode,
    rx: RingBuffer<RX>,
    tx: RingBuffer<TX>,
    tx_active: AtomicBool,
    rx_saturated: AtomicUsize,
}

impl<H: UartHal, const RX: usize, const TX: usize> UartIo<H, RX, TX> {
    /// Creates an adapter using the transmit policy selected at build time.
    pub const fn new(hal: H) -> Self { Self::with_tx_mode(hal, config::TX_MODE) }

    pub const fn with_tx_mode(hal: H, tx_mode: TxMode) -> Self {
        Self {
            hal,
            tx_mode,
            rx: RingBuffer::new(),
            tx: RingBuffer::new(),
            tx_active: AtomicBool::new(false),
            rx_saturated: AtomicUsize::new(0),
        }
    }

    /// Resets both rings and starts continuous reception.
    ///
    /// Requires a `'static` borrow since the peripheral keeps writing into
    /// the receive storage for the rest of the program.
    pub fn init(&'static self) {
        self.rx.clear();
        self.tx.clear();
        self.tx_active.store(false, Ordering::SeqCst);
        self.rx_saturated.store(0, Ordering::Relaxed);
        match self.hal.receive_circular(self.rx.as_mut_ptr(), RX) {
            HalStatus::Ok => {}
            status => error!("Failed to start receive: {:?}", status),
        }
        info!("uart-io: rx {} bytes, tx {} bytes, {:?}", RX, TX, self.tx_mode);
    }

    pub fn hal(&self) -> &H { &self.hal }

    pub fn tx_mode(&self) -> TxMode { self.tx_mode }

    // Receive.

    // Where the peripheral will write next, derived from its remaining count.
    fn rx_producer(&self) -> usize {
        RingBuffer::<RX>::wrap(RX.wrapping_sub(self.hal.rx_remaining()))
    }

    fn note_saturation(&self, producer: usize) {
        if RingBuffer::<RX>::len_between(producer, self.rx.extract_cursor()) == RX - 1 {
            self.rx_saturated.fetch_add(1, Ordering::Relaxed);
            warn!("rx ring full, unread bytes may be overwritten");
        }
    }

    /// Number of received bytes not yet read.
    pub fn rx_available(&self) -> usize {
        RingBuffer::<RX>::len_between(self.rx_producer(), self.rx.extract_cursor())
    }

    /// Number of reads that found the receive ring completely full.
    ///
    /// A full ring means the peripheral may already have lapped the reader.
    /// The count is informational; reads behave the same either way.
    pub fn rx_saturation_count(&self) -> usize { self.rx_saturated.load(Ordering::Relaxed) }

    /// Returns the next received byte, or None if nothing is waiting.
    pub fn getchar(&self) -> Option<u8> {
        let producer = self.rx_producer();
        self.note_saturation(producer);
        self.rx.pop_before(producer)
    }

    /// Copies waiting bytes into `buf` without blocking.
    ///
    /// Returns the number of bytes copied, possibly zero.
    pub fn read(&self, buf: &mut [u8]) -> usize {
        let producer = self.rx_producer();
        self.note_saturation(producer);
        let mut num_read = 0;
        for slot in buf.iter_mut() {
            match self.rx.pop_before(producer) {
                Some(b) => *slot = b,
                None => break,
            }
            num_read += 1;
        }
        num_read
    }

    // Transmit.

    /// Writes `data` using the configured transmit policy.
    ///
    /// In interrupt mode this never fails and never blocks; it returns how
    /// many bytes fit in the transmit ring, which may be fewer than offered.
    /// In blocking mode it returns the full length once the peripheral has
    /// sent everything, or the peripheral's failure.
    pub fn write(&self, data: &[u8]) -> Result<usize, UartIoError> {
        match self.tx_mode {
            TxMode::Interrupt => Ok(self.queue(data)),
            TxMode::Blocking { timeout_ms } => self.write_blocking(data, timeout_ms),
        }
    }

    /// Single byte form of `write`.
    pub fn putchar(&self, ch: u8) -> Result<usize, UartIoError> { self.write(&[ch]) }

    fn queue(&self, data: &[u8]) -> usize {
        let accepted = self.tx.push_slice(data);
        if accepted < data.len() {
            trace!("tx ring full, accepted {} of {}", accepted, data.len());
        }
        // Claimed means a completion is on the way and will send these bytes.
        if !self.tx_active.swap(true, Ordering::SeqCst) {
            self.kick_tx();
        }
        accepted
    }

    // Starts a transfer at the extract cursor. Only called while holding the
    // transmitter, so no completion can move the extract cursor underneath.
    fn kick_tx(&self) {
        let extract = self.tx.extract_cursor();
        let run = RingBuffer::<TX>::contiguous_run(self.tx.insert_cursor(), extract);
        if run == 0 {
            self.tx_active.store(false, Ordering::SeqCst);
            return;
        }
        self.arm_tx(extract, run);
    }

    // Releases the transmitter if the transfer did not start.
    fn arm_tx(&self, extract: usize, run: usize) {
        let start = self.tx.as_ptr().wrapping_add(extract);
        match self.hal.transmit(start, run) {
            HalStatus::Ok => {
                trace!("tx armed {} bytes at {}", run, extract);
                return;
            }
            HalStatus::Busy => warn!("Transmitter busy, {} bytes left queued", run),
            status => error!("Failed to transmit {} bytes: {:?}", run, status),
        }
        self.tx_active.store(false, Ordering::SeqCst);
    }

    fn write_blocking(&self, data: &[u8], timeout_ms: u32) -> Result<usize, UartIoError> {
        if data.is_empty() {
            return Ok(0);
        }
        match self.hal.transmit_blocking(data, timeout_ms) {
            HalStatus::Ok => Ok(data.len()),
            status => {
                warn!("Blocking transmit of {} bytes failed: {:?}", data.len(), status);
                Err(status.into())
            }
        }
    }

    /// Transfer-complete handler; called by the platform's interrupt glue.
    ///
    /// Takes the hardware's transmit pointer as the new extract position and
    /// arms the next contiguous run, if any. With nothing pending this
    /// changes nothing.
    pub fn on_tx_complete(&self) {
        let extract = match self.tx.offset_of(self.hal.tx_pointer()) {
            Some(extract) => extract,
            None => {
                warn!("tx complete with pointer outside the ring, ignored");
                return;
            }
        };
        self.tx.set_extract_cursor(extract);
        let mut insert = self.tx.insert_cursor();
        if extract == insert {
            self.tx_active.store(false, Ordering::SeqCst);
            // A writer may have pushed after the cursor check but before the
            // release; whoever claims the transmitter now sends those bytes.
            insert = self.tx.insert_cursor();
            if extract == insert || self.tx_active.swap(true, Ordering::SeqCst) {
                return; // Nothing more to do
            }
        }
        self.arm_tx(extract, RingBuffer::<TX>::contiguous_run(insert, extract));
    }

    /// Number of bytes queued but not yet confirmed sent.
    pub fn tx_pending(&self) -> usize { self.tx.len() }

    pub fn is_tx_idle(&self) -> bool { self.tx.is_empty() }

    /// Spins until the transmit ring has drained.
    ///
    /// Returns immediately in blocking mode. Relies on completion interrupts
    /// arriving; a transfer that failed to start stalls the caller until
    /// another write arms it again.
    pub fn flush(&self) {
        if self.tx_mode == TxMode::Interrupt {
            while !self.tx.is_empty() {
                core::hint::spin_loop();
            }
        }
    }

    /// Cursor positions as (rx extract, tx insert, tx extract).
    pub fn cursors(&self) -> (usize, usize, usize) {
        (self.rx.extract_cursor(), self.tx.insert_cursor(), self.tx.extract_cursor())
    }
}
