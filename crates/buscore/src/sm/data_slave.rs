//! Data-slave state machine: answers a bus master's DATI/DATO/DATOB cycles
//! against the emulated memory range or an installed device register,
//! following the PDP-11 bus handbook handshake (spec section 4.3).
//!
//! Grounded directly in `pru1_statemachine_data_slave.c`'s
//! `sm_data_slave_func`: the same state names, the same "latch snapshot,
//! inspect bits, branch" shape, generalized over [`crate::latch::WireTable`]
//! so the same machine drives either backplane variant.

use crate::latch::{LatchBackend, LatchFabric, WireTable};
use crate::mailbox::{DeviceRegisterEvent, DeviceRegisterEventChannel};
use crate::regmap::{AddressMap, Decoded, EventFlags, RegisterFile};

use super::StepResult;

/// Backing store for the emulated-memory address range. The bus engine
/// itself owns no memory array — spec non-goals exclude device/memory
/// models — so callers (tests, the adapter's simulated-bus mode) supply one.
pub trait EmulatedMemory {
    fn read_word(&self, addr: u32) -> Option<u16>;
    fn write_word(&mut self, addr: u32, value: u16) -> bool;
    fn write_byte(&mut self, addr: u32, value: u8) -> bool;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataSlaveState {
    Stop,
    Start,
    DindoutStart,
    DinSingleComplete,
    DoutSingleComplete,
    DinBlockComplete,
    DoutBlockComplete,
}

impl Default for DataSlaveState {
    fn default() -> Self {
        DataSlaveState::Stop
    }
}

/// Outcome of the address-decode step, mirroring `emulated_addr_*`'s
/// tri-state return (non-existent / memory / register).
enum AccessResult {
    NonExistent,
    Memory,
    Register,
}

pub struct DataSlave {
    pub state: DataSlaveState,
    addr: u32,
}

impl DataSlave {
    pub const fn new() -> Self {
        Self { state: DataSlaveState::Stop, addr: 0 }
    }

    /// Advance one transition. `ack_pending` reports whether the adapter has
    /// cleared the device-register event for the in-flight access (always
    /// `true` for pure-memory accesses, which need no round trip).
    pub fn step<B, W, M>(
        &mut self,
        latch: &mut LatchFabric<B>,
        map: &AddressMap,
        regs: &mut RegisterFile,
        events: &mut DeviceRegisterEventChannel,
        memory: &mut M,
    ) -> StepResult
    where
        B: LatchBackend,
        W: WireTable,
        M: EmulatedMemory,
    {
        match self.state {
            DataSlaveState::Stop | DataSlaveState::Start => {
                let sync = Self::wire_bit::<W>(latch, "SYNC");
                if !sync {
                    return StepResult::Yield;
                }
                self.addr = Self::latched_address(latch);
                self.state = DataSlaveState::DindoutStart;
                StepResult::Continue
            }
            DataSlaveState::DindoutStart => self.step_dindout_start::<B, W, M>(latch, map, regs, events, memory),
            DataSlaveState::DinSingleComplete => self.step_din_single_complete::<B, W>(latch, events),
            DataSlaveState::DoutSingleComplete => self.step_dout_single_complete::<B, W>(latch, events),
            DataSlaveState::DinBlockComplete => self.step_din_block_complete::<B, W>(latch),
            DataSlaveState::DoutBlockComplete => self.step_dout_block_complete::<B, W>(latch),
        }
    }

    fn wire_bit<W: WireTable>(latch: &mut LatchFabric<impl LatchBackend>, name: &str) -> bool {
        let wire = W::find_in(name).expect("wire present in active table");
        let byte = latch.get_byte(wire.register);
        let bit = (byte >> wire.bit) & 1 != 0;
        if wire.inverted {
            !bit
        } else {
            bit
        }
    }

    fn latched_address(latch: &mut LatchFabric<impl LatchBackend>) -> u32 {
        let low = latch.get_byte(0) as u32;
        let mid = latch.get_byte(1) as u32;
        let high = latch.get_byte(2) as u32 & 0x7f;
        low | (mid << 8) | (high << 16)
    }

    /// INIT takes priority over every other signal mid-cycle: drop the
    /// reply, discard whatever side effect was in flight, and go back to
    /// `Stop` rather than let a half-finished cycle complete.
    fn aborted_by_init<W: WireTable>(&mut self, latch: &mut LatchFabric<impl LatchBackend>) -> bool {
        if !Self::wire_bit::<W>(latch, "INIT") {
            return false;
        }
        self.negate_reply::<W>(latch);
        self.state = DataSlaveState::Stop;
        true
    }

    fn step_dindout_start<B, W, M>(
        &mut self,
        latch: &mut LatchFabric<B>,
        map: &AddressMap,
        regs: &mut RegisterFile,
        events: &mut DeviceRegisterEventChannel,
        memory: &mut M,
    ) -> StepResult
    where
        B: LatchBackend,
        W: WireTable,
        M: EmulatedMemory,
    {
        if self.aborted_by_init::<W>(latch) {
            return StepResult::Continue;
        }
        let sync = Self::wire_bit::<W>(latch, "SYNC");
        if !sync {
            self.state = DataSlaveState::Stop;
            return StepResult::Continue;
        }
        let din = Self::wire_bit::<W>(latch, "DIN");
        let dout = Self::wire_bit::<W>(latch, "DOUT");

        if din {
            let result = match map.decode(self.addr) {
                Decoded::Foreign => AccessResult::NonExistent,
                Decoded::Memory => match memory.read_word(self.addr) {
                    Some(value) => {
                        Self::drive_data(latch, value);
                        AccessResult::Memory
                    }
                    None => AccessResult::NonExistent,
                },
                Decoded::IoPage { handle } if handle != 0 && handle != 255 => match regs.get(handle) {
                    Some(desc) => {
                        Self::drive_data(latch, desc.value);
                        if desc.raises_event(EventFlags::DATI) {
                            events.event = DeviceRegisterEvent {
                                unibus_control: 0,
                                device_handle: desc.event_device_handle,
                                register_index: desc.event_register_index,
                                data: desc.value,
                                addr: self.addr,
                            };
                            events.counter.signal();
                            AccessResult::Register
                        } else {
                            AccessResult::Memory
                        }
                    }
                    None => AccessResult::NonExistent,
                },
                Decoded::IoPage { .. } => AccessResult::NonExistent,
            };

            match result {
                AccessResult::NonExistent => {
                    self.state = DataSlaveState::Stop;
                    StepResult::Continue
                }
                AccessResult::Memory => {
                    self.assert_reply::<W>(latch);
                    self.state = DataSlaveState::DinSingleComplete;
                    StepResult::Continue
                }
                AccessResult::Register => {
                    self.assert_reply::<W>(latch);
                    self.state = DataSlaveState::DinSingleComplete;
                    StepResult::Yield
                }
            }
        } else if dout {
            let byte_mode = Self::wire_bit::<W>(latch, "WTBT");
            let result = match map.decode(self.addr) {
                Decoded::Foreign => AccessResult::NonExistent,
                Decoded::Memory => {
                    let ok = if byte_mode {
                        let value = if self.addr & 1 != 0 { latch.get_byte(1) } else { latch.get_byte(0) };
                        memory.write_byte(self.addr, value)
                    } else {
                        let low = latch.get_byte(0) as u16;
                        let high = latch.get_byte(1) as u16;
                        memory.write_word(self.addr, low | (high << 8))
                    };
                    if ok {
                        AccessResult::Memory
                    } else {
                        AccessResult::NonExistent
                    }
                }
                Decoded::IoPage { handle } if handle != 0 && handle != 255 => match regs.get_mut(handle) {
                    Some(desc) => {
                        let new_value = if byte_mode {
                            let low_byte = self.addr & 1 == 0;
                            let byte = if low_byte { latch.get_byte(0) } else { latch.get_byte(1) };
                            desc.apply_write_byte(byte, low_byte)
                        } else {
                            let low = latch.get_byte(0) as u16;
                            let high = latch.get_byte(1) as u16;
                            desc.apply_write_word(low | (high << 8))
                        };
                        if desc.raises_event(EventFlags::DATO) {
                            events.event = DeviceRegisterEvent {
                                unibus_control: if byte_mode { 1 } else { 0 },
                                device_handle: desc.event_device_handle,
                                register_index: desc.event_register_index,
                                data: new_value,
                                addr: self.addr,
                            };
                            events.counter.signal();
                            AccessResult::Register
                        } else {
                            AccessResult::Memory
                        }
                    }
                    None => AccessResult::NonExistent,
                },
                Decoded::IoPage { .. } => AccessResult::NonExistent,
            };

            match result {
                AccessResult::NonExistent => {
                    self.state = DataSlaveState::Stop;
                    StepResult::Continue
                }
                AccessResult::Memory => {
                    self.assert_reply::<W>(latch);
                    self.state = DataSlaveState::DoutSingleComplete;
                    StepResult::Continue
                }
                AccessResult::Register => {
                    self.assert_reply::<W>(latch);
                    self.state = DataSlaveState::DoutSingleComplete;
                    StepResult::Yield
                }
            }
        } else {
            StepResult::Yield
        }
    }

    fn drive_data(latch: &mut LatchFabric<impl LatchBackend>, value: u16) {
        latch.set_byte(0, (value & 0xff) as u8);
        latch.set_byte(1, ((value >> 8) & 0xff) as u8);
    }

    fn assert_reply<W: WireTable>(&self, latch: &mut LatchFabric<impl LatchBackend>) {
        let reply = W::find_out("RPLY").expect("RPLY wire present");
        latch.set_bits(reply.register, 1 << reply.bit, 0xff);
    }

    fn negate_reply<W: WireTable>(&self, latch: &mut LatchFabric<impl LatchBackend>) {
        let reply = W::find_out("RPLY").expect("RPLY wire present");
        latch.set_bits(reply.register, 1 << reply.bit, 0);
    }

    fn step_din_single_complete<B: LatchBackend, W: WireTable>(&mut self, latch: &mut LatchFabric<B>, events: &DeviceRegisterEventChannel) -> StepResult {
        let din = Self::wire_bit::<W>(latch, "DIN");
        if din {
            return StepResult::Yield;
        }
        if events.counter.is_pending() {
            return StepResult::Yield;
        }
        self.negate_reply::<W>(latch);
        self.state = DataSlaveState::DinBlockComplete;
        StepResult::Continue
    }

    fn step_dout_single_complete<B: LatchBackend, W: WireTable>(&mut self, latch: &mut LatchFabric<B>, events: &DeviceRegisterEventChannel) -> StepResult {
        let dout = Self::wire_bit::<W>(latch, "DOUT");
        if dout {
            return StepResult::Yield;
        }
        if events.counter.is_pending() {
            return StepResult::Yield;
        }
        self.negate_reply::<W>(latch);
        self.state = DataSlaveState::DoutBlockComplete;
        StepResult::Continue
    }

    fn step_din_block_complete<B: LatchBackend, W: WireTable>(&mut self, latch: &mut LatchFabric<B>) -> StepResult {
        if self.aborted_by_init::<W>(latch) {
            return StepResult::Continue;
        }
        let sync = Self::wire_bit::<W>(latch, "SYNC");
        if !sync {
            self.state = DataSlaveState::Stop;
            return StepResult::Continue;
        }
        if Self::wire_bit::<W>(latch, "DOUT") {
            self.state = DataSlaveState::DindoutStart;
            StepResult::Continue
        } else if Self::wire_bit::<W>(latch, "DIN") {
            self.addr = self.addr.wrapping_add(2);
            self.state = DataSlaveState::DindoutStart;
            StepResult::Continue
        } else {
            StepResult::Yield
        }
    }

    fn step_dout_block_complete<B: LatchBackend, W: WireTable>(&mut self, latch: &mut LatchFabric<B>) -> StepResult {
        if self.aborted_by_init::<W>(latch) {
            return StepResult::Continue;
        }
        let sync = Self::wire_bit::<W>(latch, "SYNC");
        if !sync {
            self.state = DataSlaveState::Stop;
            return StepResult::Continue;
        }
        if Self::wire_bit::<W>(latch, "DOUT") {
            self.addr = self.addr.wrapping_add(2);
            self.state = DataSlaveState::DindoutStart;
            StepResult::Continue
        } else {
            StepResult::Yield
        }
    }
}

impl Default for DataSlave {
    fn default() -> Self {
        Self::new()
    }
}
