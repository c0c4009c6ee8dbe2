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

//! Build-time configuration.

use crate::{TxMode, UartIo};
use cfg_if::cfg_if;

/// Receive ring size. Must be a power of two and larger than the biggest
/// burst expected between reads.
pub const RX_BUFF_SZ: usize = 32;

/// Transmit ring size. Must be a power of two; writes larger than this are
/// accepted only in part.
pub const TX_BUFF_SZ: usize = 32;

/// How long a blocking write may wait for the transmitter.
pub const TX_BLOCKING_TIMEOUT_MS: u32 = 100;

cfg_if! {
    if #[cfg(feature = "CONFIG_TX_MODE_BLOCKING")] {
        pub const TX_MODE: TxMode = TxMode::Blocking { timeout_ms: TX_BLOCKING_TIMEOUT_MS };
    } else {
        // NB: the completion interrupt must be routed to on_tx_complete.
        pub const TX_MODE: TxMode = TxMode::Interrupt;
    }
}

pub type DefaultUartIo<H> = UartIo<H, RX_BUFF_SZ, TX_BUFF_SZ>;
