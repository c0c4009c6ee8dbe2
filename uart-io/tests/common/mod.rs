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

#![allow(dead_code)]

use fake_uart::FakeUart;
use lazy_static::lazy_static;
use uart_io::{TxMode, UartIo};

pub const CAPACITY: usize = 32;

pub type TestUart = UartIo<FakeUart, CAPACITY, CAPACITY>;

lazy_static! {
    static ref LOG_INIT: Result<(), log::SetLoggerError> =
        env_logger::builder().is_test(true).try_init();
}

/// Returns an initialized adapter over a fresh fake peripheral.
///
/// The adapter is leaked since the peripheral keeps pointers into it.
pub fn setup(tx_mode: TxMode) -> &'static TestUart {
    let _ = LOG_INIT.is_ok();
    let uart: &'static TestUart =
        Box::leak(Box::new(UartIo::with_tx_mode(FakeUart::new(), tx_mode)));
    uart.init();
    uart
}

/// Plays completion interrupts until the transmitter goes idle. Returns the
/// number of interrupts delivered.
pub fn drain(uart: &TestUart) -> usize { uart.hal().drain(|| uart.on_tx_complete()) }

pub fn assert_cursors_in_range(uart: &TestUart) {
    let (rx_extract, tx_insert, tx_extract) = uart.cursors();
    assert!(rx_extract < CAPACITY);
    assert!(tx_insert < CAPACITY);
    assert!(tx_extract < CAPACITY);
}

pub fn random_bytes(len: usize) -> Vec<u8> {
    use rand::Rng;
    let mut buf = vec![0u8; len];
    rand::thread_rng().fill_bytes(&mut buf);
    buf
}
