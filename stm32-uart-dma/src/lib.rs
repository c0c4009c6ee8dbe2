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

//! `UartHal` for an STM32F4-style USART served by two DMA streams.
//!
//! Reception runs on a stream in circular mode, so the stream's NDTR register
//! is the remaining count. Transmission runs on a second stream in normal
//! mode with the transfer-complete interrupt enabled; the stream clears EN
//! itself when the block is done, which is what `transmit` uses to report
//! `Busy`.
//!
//! The platform's DMA interrupt handler must clear the TX stream's flags in
//! LIFCR/HIFCR before calling the owner's completion handler, otherwise the
//! next `transmit` cannot enable the stream.

#![cfg_attr(not(test), no_std)]

mod register;

use core::sync::atomic::{AtomicUsize, Ordering};
use log::trace;
use register::*;
use uart_hal_interface::{HalStatus, UartHal};

pub use register::Direction;

/// One DMA stream: its register block and the request channel that routes
/// the USART to it.
#[derive(Clone, Copy, Debug)]
pub struct DmaStream {
    pub base: usize,
    pub channel: u8,
}

pub struct Stm32UartDma {
    usart: usize,
    rx: DmaStream,
    tx: DmaStream,
    // Start and length of the last TX block; the hardware keeps only the
    // remaining count.
    tx_start: AtomicUsize,
    tx_len: AtomicUsize,
    ticks_ms: fn() -> u32,
}

impl Stm32UartDma {
    /// # Safety
    ///
    /// `usart`, `rx.base` and `tx.base` must be the register blocks of a
    /// configured USART and two DMA streams not used by anything else.
    /// `ticks_ms` must return a free-running millisecond counter.
    pub const unsafe fn new(
        usart: usize,
        rx: DmaStream,
        tx: DmaStream,
        ticks_ms: fn() -> u32,
    ) -> Self {
        Self {
            usart,
            rx,
            tx,
            tx_start: AtomicUsize::new(0),
            tx_len: AtomicUsize::new(0),
            ticks_ms,
        }
    }

    fn stream_cr(stream: &DmaStream, dir: Direction, circ: bool, tcie: bool) -> StreamCr {
        StreamCr::new()
            .with_chsel(stream.channel & 0x7)
            .with_dir(dir)
            .with_minc(true)
            .with_circ(circ)
            .with_tcie(tcie)
    }

    fn expired(&self, start: u32, timeout_ms: u32) -> bool {
        (self.ticks_ms)().wrapping_sub(start) >= timeout_ms
    }
}

impl UartHal for Stm32UartDma {
    fn receive_circular(&self, buf: *mut u8, len: usize) -> HalStatus {
        if len == 0 || len > DMA_MAX_NDTR {
            return HalStatus::Error;
        }
        let stream = self.rx.base;
        unsafe {
            set_stream_cr(stream, get_stream_cr(stream).with_en(false));
            while get_stream_cr(stream).en() {}
            set_par(stream, self.usart + USART_DR_OFFSET);
            set_m0ar(stream, buf as usize);
            set_ndtr(stream, len);
            let dir = Direction::PeripheralToMemory;
            set_stream_cr(stream, Self::stream_cr(&self.rx, dir, true, false));
            set_stream_cr(stream, Self::stream_cr(&self.rx, dir, true, false).with_en(true));
            set_cr3(self.usart, get_cr3(self.usart).with_dmar(true));
        }
        HalStatus::Ok
    }

    fn rx_remaining(&self) -> usize { unsafe { get_ndtr(self.rx.base) } }

    fn transmit(&self, buf: *const u8, len: usize) -> HalStatus {
        if len == 0 || len > DMA_MAX_NDTR {
            return HalStatus::Error;
        }
        let stream = self.tx.base;
        unsafe {
            if get_stream_cr(stream).en() {
                return HalStatus::Busy;
            }
            self.tx_start.store(buf as usize, Ordering::Relaxed);
            self.tx_len.store(len, Ordering::Release);
            set_par(stream, self.usart + USART_DR_OFFSET);
            set_m0ar(stream, buf as usize);
            set_ndtr(stream, len);
            let dir = Direction::MemoryToPeripheral;
            set_stream_cr(stream, Self::stream_cr(&self.tx, dir, false, true));
            set_stream_cr(stream, Self::stream_cr(&self.tx, dir, false, true).with_en(true));
            set_cr3(self.usart, get_cr3(self.usart).with_dmat(true));
        }
        trace!("dma tx {} bytes", len);
        HalStatus::Ok
    }

    fn tx_pointer(&self) -> *const u8 {
        let len = self.tx_len.load(Ordering::Acquire);
        let start = self.tx_start.load(Ordering::Relaxed);
        let remaining = unsafe { get_ndtr(self.tx.base) };
        (start + len.saturating_sub(remaining)) as *const u8
    }

    fn transmit_blocking(&self, data: &[u8], timeout_ms: u32) -> HalStatus {
        unsafe {
            if get_stream_cr(self.tx.base).en() {
                return HalStatus::Busy;
            }
            let start = (self.ticks_ms)();
            for &b in data {
                while !get_sr(self.usart).txe() {
                    if self.expired(start, timeout_ms) {
                        return HalStatus::Timeout;
                    }
                }
                set_dr(self.usart, b);
            }
            while !get_sr(self.usart).tc() {
                if self.expired(start, timeout_ms) {
                    return HalStatus::Timeout;
                }
            }
        }
        HalStatus::Ok
    }
}
