//! Interrupt transaction machine: transmits an interrupt vector once
//! arbitration has granted a BR/IAK level (spec section 4.6).
//!
//! Grounded in `pru1_statemachine_arbitration.c`'s `state_arbitration_intr_*`
//! states: the grant is already held (arbitration's job), so this machine's
//! entire job is to wait for DIN, gate the vector onto the data lines,
//! assert RPLY, and wait for the IAK line to fall before cleaning up and
//! signalling the adapter.
//!
//! Interrupt-slave support — the coprocessor receiving a vector as a bus
//! slave rather than transmitting one as a grant-holder — is stubbed as a
//! trait: no target in this workspace plays the slave role, so the default
//! implementation reports [`InterruptSlaveError::NotSupported`] rather than
//! silently pretending to implement a protocol direction nothing exercises.

use crate::latch::{LatchBackend, LatchFabric, WireTable};
use crate::mailbox::EventCounter;

use super::StepResult;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InterruptMasterState {
    WaitDin,
    WaitIakNegate,
}

impl Default for InterruptMasterState {
    fn default() -> Self {
        InterruptMasterState::WaitDin
    }
}

/// A granted interrupt request, built once arbitration accepts a BR level.
pub struct InterruptRequest {
    pub level_index: u8,
    pub vector: u16,
}

pub struct InterruptMaster {
    pub state: InterruptMasterState,
    level_index: u8,
    vector: u16,
}

impl InterruptMaster {
    pub const fn new() -> Self {
        Self { state: InterruptMasterState::WaitDin, level_index: 0, vector: 0 }
    }

    pub fn start(&mut self, request: &InterruptRequest) {
        self.level_index = request.level_index;
        self.vector = request.vector;
        self.state = InterruptMasterState::WaitDin;
    }

    pub fn step<B, W>(&mut self, latch: &mut LatchFabric<B>, completion: &[EventCounter; 4]) -> StepResult
    where
        B: LatchBackend,
        W: WireTable,
    {
        match self.state {
            InterruptMasterState::WaitDin => {
                let din = Self::wire_bit::<W>(latch, "DIN");
                if !din {
                    return StepResult::Yield;
                }
                let reply = W::find_out("RPLY").expect("RPLY wire present");
                latch.set_bits(reply.register, 1 << reply.bit, 0xff);
                latch.set_byte(0, (self.vector & 0xff) as u8);
                latch.set_byte(1, ((self.vector >> 8) & 0xff) as u8);
                self.state = InterruptMasterState::WaitIakNegate;
                StepResult::Continue
            }
            InterruptMasterState::WaitIakNegate => {
                let iak = Self::wire_bit::<W>(latch, "IAKI");
                if iak {
                    return StepResult::Yield;
                }
                let reply = W::find_out("RPLY").expect("RPLY wire present");
                latch.set_bits(reply.register, 1 << reply.bit, 0);
                latch.set_byte(0, 0);
                latch.set_byte(1, 0);
                completion[self.level_index as usize].signal();
                self.state = InterruptMasterState::WaitDin;
                StepResult::Continue
            }
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
}

impl Default for InterruptMaster {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InterruptSlaveError {
    NotSupported,
}

/// Receiving an interrupt vector as a bus slave — answering another
/// master's IAK cycle — rather than transmitting one as the grant holder.
/// No configuration in this workspace plays that role; implement this
/// trait on a target-specific type to add it.
pub trait InterruptSlave {
    fn receive_vector(&mut self, level_index: u8) -> Result<u16, InterruptSlaveError> {
        let _ = level_index;
        Err(InterruptSlaveError::NotSupported)
    }
}
