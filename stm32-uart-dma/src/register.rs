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

// Helpers to read/write USART and DMA stream registers.

use modular_bitfield::prelude::*;

pub const USART_SR_OFFSET: usize = 0x00;
pub const USART_DR_OFFSET: usize = 0x04;
pub const USART_CR3_OFFSET: usize = 0x14;

// Offsets within one DMA stream's register block.
pub const DMA_SXCR_OFFSET: usize = 0x00;
pub const DMA_SXNDTR_OFFSET: usize = 0x04;
pub const DMA_SXPAR_OFFSET: usize = 0x08;
pub const DMA_SXM0AR_OFFSET: usize = 0x0c;

// NDTR is 16 bits wide.
pub const DMA_MAX_NDTR: usize = 0xffff;

unsafe fn reg(base: usize, offset: usize) -> *mut u32 { (base + offset) as *mut u32 }

unsafe fn read(base: usize, offset: usize) -> u32 { reg(base, offset).read_volatile() }

unsafe fn write(base: usize, offset: usize, value: u32) { reg(base, offset).write_volatile(value) }

// USART status register (RO).
#[bitfield]
pub struct Sr {
    pub pe: bool,
    pub fe: bool,
    pub nf: bool,
    pub ore: bool,
    pub idle: bool,
    pub rxne: bool,
    pub tc: bool,
    pub txe: bool,
    pub lbd: bool,
    pub cts: bool,
    #[skip]
    __: B22,
}
pub unsafe fn get_sr(usart: usize) -> Sr {
    Sr::from_bytes(read(usart, USART_SR_OFFSET).to_ne_bytes())
}

// USART data register; only the low byte is used in 8-bit mode.
pub unsafe fn set_dr(usart: usize, data: u8) { write(usart, USART_DR_OFFSET, data as u32) }

// USART control register 3.
#[bitfield]
pub struct Cr3 {
    pub eie: bool,
    pub iren: bool,
    pub irlp: bool,
    pub hdsel: bool,
    pub nack: bool,
    pub scen: bool,
    pub dmar: bool,
    pub dmat: bool,
    pub rtse: bool,
    pub ctse: bool,
    pub ctsie: bool,
    pub onebit: bool,
    #[skip]
    __: B20,
}
pub unsafe fn get_cr3(usart: usize) -> Cr3 {
    Cr3::from_bytes(read(usart, USART_CR3_OFFSET).to_ne_bytes())
}
pub unsafe fn set_cr3(usart: usize, cr3: Cr3) {
    write(usart, USART_CR3_OFFSET, u32::from_ne_bytes(cr3.into_bytes()))
}

// DMA stream configuration register.
#[derive(BitfieldSpecifier, Clone, Copy, Debug, PartialEq)]
#[bits = 2]
pub enum Direction {
    PeripheralToMemory = 0,
    MemoryToPeripheral = 1,
    MemoryToMemory = 2,
}
#[bitfield]
pub struct StreamCr {
    pub en: bool,
    pub dmeie: bool,
    pub teie: bool,
    pub htie: bool,
    pub tcie: bool,
    pub pfctrl: bool,
    pub dir: Direction,
    pub circ: bool,
    pub pinc: bool,
    pub minc: bool,
    pub psize: B2,
    pub msize: B2,
    pub pincos: bool,
    pub pl: B2,
    pub dbm: bool,
    pub ct: bool,
    #[skip]
    __: B1,
    pub pburst: B2,
    pub mburst: B2,
    pub chsel: B3,
    #[skip]
    __: B4,
}
pub unsafe fn get_stream_cr(stream: usize) -> StreamCr {
    StreamCr::from_bytes(read(stream, DMA_SXCR_OFFSET).to_ne_bytes())
}
pub unsafe fn set_stream_cr(stream: usize, cr: StreamCr) {
    write(stream, DMA_SXCR_OFFSET, u32::from_ne_bytes(cr.into_bytes()))
}

// Remaining item count; reloads in circular mode.
pub unsafe fn get_ndtr(stream: usize) -> usize {
    (read(stream, DMA_SXNDTR_OFFSET) as usize) & DMA_MAX_NDTR
}
pub unsafe fn set_ndtr(stream: usize, count: usize) {
    write(stream, DMA_SXNDTR_OFFSET, (count & DMA_MAX_NDTR) as u32)
}

// Addresses are 32-bit on the target; wider host pointers are truncated.
pub unsafe fn set_par(stream: usize, addr: usize) { write(stream, DMA_SXPAR_OFFSET, addr as u32) }
pub unsafe fn set_m0ar(stream: usize, addr: usize) { write(stream, DMA_SXM0AR_OFFSET, addr as u32) }
