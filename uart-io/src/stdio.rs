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

//! C runtime style console hooks.
//!
//! A program registers one console at startup; after that the free
//! functions here can back `getchar`/`write`/`putchar` retargeting and the
//! transfer-complete interrupt vector without passing the adapter around.

use crate::{UartHal, UartIo, UartIoError};
use log::warn;
use spin::Once;

/// Returned by `io_getchar`/`io_putchar` when there is nothing to return.
pub const EOF: i32 = -1;

/// Object-safe view of a `UartIo`.
pub trait Console: Sync {
    fn start(&'static self);
    fn getchar(&self) -> Option<u8>;
    fn write(&self, data: &[u8]) -> Result<usize, UartIoError>;
    fn tx_complete(&self);
}

impl<H: UartHal + Sync, const RX: usize, const TX: usize> Console for UartIo<H, RX, TX> {
    fn start(&'static self) { self.init() }
    fn getchar(&self) -> Option<u8> { UartIo::getchar(self) }
    fn write(&self, data: &[u8]) -> Result<usize, UartIoError> { UartIo::write(self, data) }
    fn tx_complete(&self) { self.on_tx_complete() }
}

static CONSOLE: Once<&'static dyn Console> = Once::new();

/// Starts `console` and makes it the target of the hooks below.
///
/// Only the first registration takes effect; later calls leave the running
/// console alone and return `UartIoError::Busy`.
pub fn init(console: &'static dyn Console) -> Result<(), UartIoError> {
    let mut installed = false;
    CONSOLE.call_once(|| {
        console.start();
        installed = true;
        console
    });
    if !installed {
        warn!("Console already initialized");
        return Err(UartIoError::Busy);
    }
    Ok(())
}

fn console() -> Result<&'static dyn Console, UartIoError> {
    CONSOLE.get().copied().ok_or(UartIoError::NotInitialized)
}

/// Next received byte as a non-negative value, or `EOF` if none is waiting.
pub fn io_getchar() -> i32 {
    match console().ok().and_then(|c| c.getchar()) {
        Some(ch) => ch as i32,
        None => EOF,
    }
}

/// Number of bytes accepted, or -1 on failure.
pub fn io_write(data: &[u8]) -> isize {
    match console().and_then(|c| c.write(data)) {
        Ok(n) => n as isize,
        Err(_) => -1,
    }
}

/// Returns `ch` if it was accepted, `EOF` otherwise.
pub fn io_putchar(ch: u8) -> i32 {
    match io_write(&[ch]) {
        1 => ch as i32,
        _ => EOF,
    }
}

/// Transfer-complete interrupt entry point.
pub fn tx_cplt_callback() {
    if let Ok(c) = console() {
        c.tx_complete();
    }
}
