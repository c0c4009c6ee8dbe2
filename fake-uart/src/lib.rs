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

//! Software stand-in for a DMA-capable UART.
//!
//! Received bytes are injected by the test and written straight into the
//! buffer handed to `receive_circular`, exactly as a DMA engine would, with
//! the remaining count running down and reloading. Transmit transfers are
//! recorded and only finish when the test calls `complete_tx`, which plays
//! the role of the hardware finishing a block.

use spin::Mutex;
use uart_hal_interface::{HalStatus, UartHal};

#[derive(Default)]
struct RxState {
    base: usize,
    len: usize,
    // Offset of the next byte the engine writes.
    position: usize,
}

#[derive(Default)]
struct TxState {
    start: usize,
    len: usize,
    busy: bool,
    pointer: usize,
    sent: Vec<u8>,
    transfers: Vec<usize>,
    next_status: Option<HalStatus>,
}

#[derive(Default)]
pub struct FakeUart {
    rx: Mutex<RxState>,
    tx: Mutex<TxState>,
}

impl FakeUart {
    pub fn new() -> Self { Self::default() }

    /// Delivers `bytes` into the receive buffer at the engine's position.
    ///
    /// Nothing stops the engine from overwriting unread data. Returns the
    /// number of bytes stored, which is zero until reception is armed.
    pub fn inject_rx(&self, bytes: &[u8]) -> usize {
        let mut rx = self.rx.lock();
        if rx.len == 0 {
            return 0;
        }
        for &b in bytes {
            unsafe { (rx.base as *mut u8).add(rx.position).write_volatile(b) };
            rx.position = (rx.position + 1) % rx.len;
        }
        bytes.len()
    }

    /// Forces the remaining-count register to `remaining`.
    pub fn set_rx_remaining(&self, remaining: usize) {
        let mut rx = self.rx.lock();
        if rx.len != 0 {
            rx.position = (rx.len - remaining % (rx.len + 1)) % rx.len;
        }
    }

    pub fn rx_armed(&self) -> bool { self.rx.lock().len != 0 }

    /// Makes the next transmit request (either policy) return `status`
    /// without doing anything.
    pub fn fail_next_transmit(&self, status: HalStatus) {
        self.tx.lock().next_status = Some(status);
    }

    pub fn is_tx_busy(&self) -> bool { self.tx.lock().busy }

    /// Finishes the active transmit block, if any.
    ///
    /// The bytes are appended to the sent log and the transfer pointer moves
    /// one past the block. The caller is expected to run the completion
    /// handler afterwards.
    pub fn complete_tx(&self) -> bool {
        let mut tx = self.tx.lock();
        if !tx.busy {
            return false;
        }
        let block = unsafe { core::slice::from_raw_parts(tx.start as *const u8, tx.len) }.to_vec();
        tx.sent.extend_from_slice(&block);
        tx.pointer = tx.start + tx.len;
        tx.busy = false;
        true
    }

    /// Completes transfers until the transmitter stays idle, invoking
    /// `on_complete` after each one. Returns the number of completions.
    pub fn drain(&self, mut on_complete: impl FnMut()) -> usize {
        let mut completions = 0;
        while self.complete_tx() {
            on_complete();
            completions += 1;
        }
        completions
    }

    /// Bytes that have left the transmitter so far.
    pub fn sent(&self) -> Vec<u8> { self.tx.lock().sent.clone() }

    pub fn take_sent(&self) -> Vec<u8> { core::mem::take(&mut self.tx.lock().sent) }

    /// Lengths of all interrupt-driven transfers armed so far.
    pub fn transfers(&self) -> Vec<usize> { self.tx.lock().transfers.clone() }

    pub fn clear_transfers(&self) { self.tx.lock().transfers.clear(); }
}

impl UartHal for FakeUart {
    fn receive_circular(&self, buf: *mut u8, len: usize) -> HalStatus {
        if len == 0 {
            return HalStatus::Error;
        }
        let mut rx = self.rx.lock();
        rx.base = buf as usize;
        rx.len = len;
        rx.position = 0;
        HalStatus::Ok
    }

    fn rx_remaining(&self) -> usize {
        let rx = self.rx.lock();
        rx.len - rx.position
    }

    fn transmit(&self, buf: *const u8, len: usize) -> HalStatus {
        let mut tx = self.tx.lock();
        if tx.busy {
            return HalStatus::Busy;
        }
        if let Some(status) = tx.next_status.take() {
            return status;
        }
        if len == 0 {
            return HalStatus::Error;
        }
        tx.start = buf as usize;
        tx.len = len;
        tx.pointer = tx.start;
        tx.busy = true;
        tx.transfers.push(len);
        HalStatus::Ok
    }

    fn tx_pointer(&self) -> *const u8 { self.tx.lock().pointer as *const u8 }

    fn transmit_blocking(&self, data: &[u8], _timeout_ms: u32) -> HalStatus {
        let mut tx = self.tx.lock();
        if let Some(status) = tx.next_status.take() {
            return status;
        }
        tx.sent.extend_from_slice(data);
        HalStatus::Ok
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rx_counter_runs_down_and_reloads() {
        let mut buf = [0u8; 8];
        let uart = FakeUart::new();
        assert_eq!(0, uart.inject_rx(b"x"));
        assert_eq!(HalStatus::Ok, uart.receive_circular(buf.as_mut_ptr(), buf.len()));
        assert_eq!(8, uart.rx_remaining());
        assert_eq!(3, uart.inject_rx(b"abc"));
        assert_eq!(5, uart.rx_remaining());
        uart.inject_rx(b"defgh");
        assert_eq!(8, uart.rx_remaining());
        assert_eq!(b"abcdefgh", &buf);
    }

    #[test]
    fn set_rx_remaining_moves_position() {
        let mut buf = [0u8; 8];
        let uart = FakeUart::new();
        uart.receive_circular(buf.as_mut_ptr(), buf.len());
        uart.set_rx_remaining(3);
        assert_eq!(3, uart.rx_remaining());
        uart.set_rx_remaining(8);
        assert_eq!(8, uart.rx_remaining());
    }

    #[test]
    fn transmit_busy_until_completed() {
        let buf = *b"hello";
        let uart = FakeUart::new();
        assert_eq!(HalStatus::Ok, uart.transmit(buf.as_ptr(), 5));
        assert_eq!(HalStatus::Busy, uart.transmit(buf.as_ptr(), 1));
        assert_eq!(buf.as_ptr(), uart.tx_pointer());
        assert!(uart.complete_tx());
        assert!(!uart.complete_tx());
        assert_eq!(buf.as_ptr().wrapping_add(5), uart.tx_pointer());
        assert_eq!(b"hello".to_vec(), uart.sent());
        assert_eq!(vec![5], uart.transfers());
    }

    #[test]
    fn injected_failure_applies_once() {
        let uart = FakeUart::new();
        uart.fail_next_transmit(HalStatus::Timeout);
        assert_eq!(HalStatus::Timeout, uart.transmit_blocking(b"ab", 10));
        assert_eq!(HalStatus::Ok, uart.transmit_blocking(b"ab", 10));
        assert_eq!(b"ab".to_vec(), uart.sent());
    }
}
