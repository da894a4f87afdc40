//! Register and address map: the I/O page handle table, per-register
//! descriptors, and the address decode that the data-slave state machine
//! consults on every DATI/DATO cycle (spec section 4.2).
//!
//! Grounded in the original firmware's `pru_iopage_register_t` /
//! `pru_iopage_registers_t` layout: a dense array of register descriptors
//! indexed by an 8-bit handle, and a handle table covering every even
//! address in the I/O page. Kept a power-of-two-sized record so indexing
//! stays a shift, never a multiply, as the original comments insist.

use bitflags::bitflags;

use crate::constants::{HANDLE_NONE, HANDLE_ROM, IO_PAGE_WORDS, MAX_REGISTERS};
use crate::error::{BusError, Result};

bitflags! {
    /// Which cycle types raise a device-register access event.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct EventFlags: u8 {
        const DATI = 0x01;
        const DATO = 0x02;
    }
}

/// A single QBUS/UNIBUS-visible register: current value, INIT reset value,
/// and a per-bit write mask. `writable_mask == 0` makes the register
/// effectively ROM; `writable_mask == 0xffff` makes it plain read/write
/// memory with no event routing required.
#[derive(Debug, Clone, Copy)]
pub struct RegisterDescriptor {
    pub value: u16,
    pub reset_value: u16,
    pub writable_mask: u16,
    pub event_flags: EventFlags,
    pub event_device_handle: u8,
    pub event_register_index: u8,
}

impl RegisterDescriptor {
    pub const fn rom(reset_value: u16) -> Self {
        Self {
            value: reset_value,
            reset_value,
            writable_mask: 0,
            event_flags: EventFlags::empty(),
            event_device_handle: HANDLE_NONE,
            event_register_index: 0,
        }
    }

    pub const fn device(reset_value: u16, writable_mask: u16, event_flags: EventFlags, device_handle: u8, register_index: u8) -> Self {
        Self {
            value: reset_value,
            reset_value,
            writable_mask,
            event_flags,
            event_device_handle: device_handle,
            event_register_index: register_index,
        }
    }

    /// Apply a full 16-bit DATO, keeping unwritable bits at their preset
    /// value. Returns the resulting register content.
    pub fn apply_write_word(&mut self, data: u16) -> u16 {
        self.value = (self.value & !self.writable_mask) | (data & self.writable_mask);
        self.value
    }

    /// Apply a byte-wide DATOB. `low_byte` selects A00: `true` writes bits
    /// 0..8, `false` writes bits 8..16. Unselected byte and unwritable bits
    /// are unaffected.
    pub fn apply_write_byte(&mut self, data: u8, low_byte: bool) -> u16 {
        let (byte_mask, shift) = if low_byte { (0x00ff, 0) } else { (0xff00, 8) };
        let word = (data as u16) << shift;
        let effective_mask = self.writable_mask & byte_mask;
        self.value = (self.value & !effective_mask) | (word & effective_mask);
        self.value
    }

    pub fn reset(&mut self) {
        self.value = self.reset_value;
    }

    pub fn raises_event(&self, flags: EventFlags) -> bool {
        self.event_flags.intersects(flags)
    }
}

/// Dense, handle-indexed register descriptor array. Handle 0
/// ([`HANDLE_NONE`]) is never installed; handle 255 ([`HANDLE_ROM`]) is
/// reserved for the memory-backed region and never indexes into this array.
pub struct RegisterFile {
    descriptors: [Option<RegisterDescriptor>; MAX_REGISTERS],
}

impl RegisterFile {
    pub const fn new() -> Self {
        Self { descriptors: [None; MAX_REGISTERS] }
    }

    /// Install a descriptor under `handle`. `handle` must be neither
    /// [`HANDLE_NONE`] nor [`HANDLE_ROM`].
    pub fn install(&mut self, handle: u8, descriptor: RegisterDescriptor) -> Result<()> {
        if handle == HANDLE_NONE || handle == HANDLE_ROM {
            return Err(BusError::InvalidConfiguration("reserved register handle"));
        }
        self.descriptors[handle as usize] = Some(descriptor);
        Ok(())
    }

    pub fn get(&self, handle: u8) -> Option<&RegisterDescriptor> {
        self.descriptors[handle as usize].as_ref()
    }

    pub fn get_mut(&mut self, handle: u8) -> Option<&mut RegisterDescriptor> {
        self.descriptors[handle as usize].as_mut()
    }

    pub fn reset_all(&mut self) {
        for d in self.descriptors.iter_mut().flatten() {
            d.reset();
        }
    }
}

impl Default for RegisterFile {
    fn default() -> Self {
        Self::new()
    }
}

/// Outcome of decoding a bus address.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decoded {
    /// Falls inside the emulated-memory range; served directly from DDR-like
    /// backing storage, no register lookup needed.
    Memory,
    /// Falls inside the I/O page at the given handle (0 = unimplemented, 255 = ROM).
    IoPage { handle: u8 },
    /// Outside both ranges: the bus engine does not respond (no RPLY/SSYN).
    Foreign,
}

/// The address map: a contiguous emulated-memory region plus the I/O page's
/// handle table. One instance per configured backplane; address ranges are
/// validated disjoint at construction.
pub struct AddressMap {
    memory_start: u32,
    memory_limit: u32,
    iopage_start: u32,
    register_handles: [u8; IO_PAGE_WORDS],
}

impl AddressMap {
    /// `memory_limit == memory_start` disables memory emulation entirely,
    /// per the original firmware's convention.
    pub fn new(memory_start: u32, memory_limit: u32, iopage_start: u32) -> Result<Self> {
        if memory_limit > 0 && memory_limit <= memory_start {
            return Err(BusError::InvalidConfiguration("memory_limit must exceed memory_start"));
        }
        if memory_limit > iopage_start {
            return Err(BusError::InvalidConfiguration("emulated memory overlaps the I/O page"));
        }
        Ok(Self { memory_start, memory_limit, iopage_start, register_handles: [HANDLE_NONE; IO_PAGE_WORDS] })
    }

    /// Install a handle at a word-aligned I/O page address.
    pub fn set_handle(&mut self, addr: u32, handle: u8) -> Result<()> {
        let index = self.iopage_index(addr).ok_or(BusError::InvalidConfiguration("address outside I/O page"))?;
        self.register_handles[index] = handle;
        Ok(())
    }

    fn iopage_index(&self, addr: u32) -> Option<usize> {
        if addr < self.iopage_start {
            return None;
        }
        let offset = (addr - self.iopage_start) as usize;
        let index = offset / 2;
        if index < IO_PAGE_WORDS {
            Some(index)
        } else {
            None
        }
    }

    pub fn decode(&self, addr: u32) -> Decoded {
        if self.memory_limit > self.memory_start && addr >= self.memory_start && addr < self.memory_limit {
            return Decoded::Memory;
        }
        if let Some(index) = self.iopage_index(addr) {
            return Decoded::IoPage { handle: self.register_handles[index] };
        }
        Decoded::Foreign
    }
}
