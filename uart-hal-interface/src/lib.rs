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

//! Interface between the character I/O layer and a serial peripheral that
//! can receive into memory continuously and transmit from memory.

#![cfg_attr(not(test), no_std)]

use num_enum::{FromPrimitive, IntoPrimitive};

/// Status word returned by peripheral operations.
///
/// Matches the layout of the usual vendor HAL status so FFI shims can decode
/// raw codes with `HalStatus::from(code)`.
#[repr(usize)]
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, FromPrimitive, IntoPrimitive)]
pub enum HalStatus {
    Ok = 0,
    Error,
    Busy,
    Timeout,
    #[default]
    Unknown,
}

#[repr(usize)]
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, FromPrimitive, IntoPrimitive)]
pub enum UartIoError {
    Success = 0,
    Timeout,
    TransferFailed,
    Busy,
    NotInitialized,
    #[default]
    UnknownError,
}
impl From<UartIoError> for Result<(), UartIoError> {
    fn from(err: UartIoError) -> Result<(), UartIoError> {
        if err == UartIoError::Success {
            Ok(())
        } else {
            Err(err)
        }
    }
}
impl From<HalStatus> for UartIoError {
    fn from(status: HalStatus) -> UartIoError {
        match status {
            HalStatus::Ok => UartIoError::Success,
            HalStatus::Error => UartIoError::TransferFailed,
            HalStatus::Busy => UartIoError::Busy,
            HalStatus::Timeout => UartIoError::Timeout,
            HalStatus::Unknown => UartIoError::UnknownError,
        }
    }
}
impl From<HalStatus> for Result<(), UartIoError> {
    fn from(status: HalStatus) -> Result<(), UartIoError> { UartIoError::from(status).into() }
}

/// A serial peripheral with memory-to-memory style transfer engines.
///
/// Methods take `&self` because they are called both from application code
/// and from the transmit-complete interrupt; implementations talk to
/// hardware registers or otherwise provide their own interior mutability.
pub trait UartHal {
    /// Starts continuous reception into `buf[..len]`.
    ///
    /// The engine writes bytes in order and restarts at `buf` after the last
    /// slot, without any notification to software.
    fn receive_circular(&self, buf: *mut u8, len: usize) -> HalStatus;

    /// Number of bytes the active receive block has yet to write before it
    /// wraps. Must be a single consistent read of the hardware counter.
    fn rx_remaining(&self) -> usize;

    /// Starts transmitting `len` bytes from `buf`.
    ///
    /// Returns `HalStatus::Busy` without side effects if a transmission is
    /// already in progress. Completion is reported by the platform calling
    /// back into the owner of the buffer.
    fn transmit(&self, buf: *const u8, len: usize) -> HalStatus;

    /// Address of the next byte the transmit engine would send; one past the
    /// last byte once a transfer has completed.
    fn tx_pointer(&self) -> *const u8;

    /// Sends `data` synchronously, giving up after `timeout_ms`.
    fn transmit_blocking(&self, data: &[u8], timeout_ms: u32) -> HalStatus;
}
