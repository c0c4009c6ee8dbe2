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

//! Byte stream adapters over a `UartIo`.
//!
//! Neither side buffers: every call goes straight to the rings.

use crate::{UartHal, UartIo, UartIoError};

#[derive(Debug, Eq, PartialEq)]
pub struct Error;

impl From<UartIoError> for Error {
    fn from(_err: UartIoError) -> Error { Error }
}

pub type Result<T> = core::result::Result<T, Error>;

pub trait Read {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize>;
}

pub trait Write {
    fn write(&mut self, buf: &[u8]) -> Result<usize>;

    fn flush(&mut self) -> Result<()>;

    /// Writes all of `buf`, failing if the sink stops accepting bytes.
    fn write_all(&mut self, mut buf: &[u8]) -> Result<()> {
        while !buf.is_empty() {
            match self.write(buf)? {
                0 => return Err(Error),
                n => buf = &buf[n..],
            }
        }
        Ok(())
    }
}

/// Adapter for writing core::fmt formatted strings.
impl core::fmt::Write for dyn Write + '_ {
    fn write_str(&mut self, s: &str) -> core::fmt::Result {
        self.write_all(s.as_bytes()).or(Err(core::fmt::Error))
    }
}

impl dyn Read + '_ {
    /// Reads one byte; fails if none is waiting.
    pub fn get_u8(&mut self) -> Result<u8> {
        let mut buf: [u8; 1] = [0u8];
        match self.read(&mut buf)? {
            1usize => Ok(buf[0]),
            _ => Err(Error),
        }
    }
}

pub struct Rx<'a, H, const RX: usize, const TX: usize> {
    uart: &'a UartIo<H, RX, TX>,
}

impl<'a, H: UartHal, const RX: usize, const TX: usize> Read for Rx<'a, H, RX, TX> {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize> { Ok(self.uart.read(buf)) }
}

pub struct Tx<'a, H, const RX: usize, const TX: usize> {
    uart: &'a UartIo<H, RX, TX>,
}

impl<'a, H: UartHal, const RX: usize, const TX: usize> Write for Tx<'a, H, RX, TX> {
    fn write(&mut self, buf: &[u8]) -> Result<usize> { Ok(self.uart.write(buf)?) }

    fn flush(&mut self) -> Result<()> {
        self.uart.flush();
        Ok(())
    }
}

impl<H: UartHal, const RX: usize, const TX: usize> UartIo<H, RX, TX> {
    pub fn rx(&self) -> Rx<'_, H, RX, TX> { Rx { uart: self } }

    pub fn tx(&self) -> Tx<'_, H, RX, TX> { Tx { uart: self } }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::fmt::Write as _;

    // Sink that takes at most `limit` bytes per call.
    struct Trickle {
        limit: usize,
        out: Vec<u8>,
    }
    impl Write for Trickle {
        fn write(&mut self, buf: &[u8]) -> Result<usize> {
            let n = buf.len().min(self.limit);
            self.out.extend_from_slice(&buf[..n]);
            Ok(n)
        }
        fn flush(&mut self) -> Result<()> { Ok(()) }
    }

    struct Bytes<'a>(&'a [u8]);
    impl Read for Bytes<'_> {
        fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
            let n = buf.len().min(self.0.len());
            buf[..n].copy_from_slice(&self.0[..n]);
            self.0 = &self.0[n..];
            Ok(n)
        }
    }

    #[test]
    fn write_all_loops_over_short_writes() {
        let mut sink = Trickle { limit: 3, out: Vec::new() };
        sink.write_all(b"hello world").unwrap();
        assert_eq!(b"hello world".to_vec(), sink.out);
    }

    #[test]
    fn write_all_fails_when_sink_stalls() {
        let mut sink = Trickle { limit: 0, out: Vec::new() };
        assert_eq!(Err(Error), sink.write_all(b"x"));
        assert_eq!(Ok(()), sink.write_all(b""));
    }

    #[test]
    fn fmt_adapter() {
        let mut sink = Trickle { limit: 2, out: Vec::new() };
        let out: &mut dyn Write = &mut sink;
        write!(out, "{}-{}", 12, "ab").unwrap();
        assert_eq!(b"12-ab".to_vec(), sink.out);
    }

    #[test]
    fn get_u8_until_empty() {
        let mut bytes = Bytes(b"ok");
        let input: &mut dyn Read = &mut bytes;
        assert_eq!(Ok(b'o'), input.get_u8());
        assert_eq!(Ok(b'k'), input.get_u8());
        assert_eq!(Err(Error), input.get_u8());
    }
}
