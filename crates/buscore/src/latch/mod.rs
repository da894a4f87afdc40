//! Latch fabric: the bank of eight 8-bit registers between the coprocessor
//! I/O pins and the backplane (spec section 4.1).

pub mod qbus;
pub mod unibus;
pub mod wire;

pub use wire::{Direction, RegisterInfo, WireInfo, WireTable};

use crate::constants::LATCH_REGISTER_COUNT;

#[cfg(feature = "unibus")]
pub type ActiveWireTable = unibus::Unibus;
#[cfg(feature = "qbus")]
pub type ActiveWireTable = qbus::Qbus;

/// Drives the physical data-out coprocessor pipe: sequence a data word,
/// drive the 3-bit selector and write pulse, and let the caller account for
/// the platform-specific propagation delay. Implemented once per target;
/// tests and the adapter's simulated-bus mode use an in-memory mock.
pub trait LatchBackend {
    /// Write `data` into register `selector` and wait for the signal to
    /// reach its target level before returning.
    fn write_register(&mut self, selector: u8, data: u8);

    /// Read register `selector` combinationally. The returned value
    /// reflects the bus at an earlier stable moment, per the hardware
    /// contract in spec 4.1.
    fn read_register(&mut self, selector: u8) -> u8;

    /// Gate all outgoing drivers so the backplane is tri-stated.
    fn set_output_enable(&mut self, enabled: bool);
}

/// The three latch fabric primitives plus the QBUS address-latching mux
/// helper, built over any `LatchBackend`.
pub struct LatchFabric<B: LatchBackend> {
    backend: B,
    /// Last value written to each register, used by `set_bits` to avoid an
    /// actual read-back for the read-modify-write.
    shadow: [u8; LATCH_REGISTER_COUNT],
}

impl<B: LatchBackend> LatchFabric<B> {
    pub fn new(backend: B) -> Self {
        Self { backend, shadow: [0; LATCH_REGISTER_COUNT] }
    }

    /// Reset all latches to the protocol's neutral state (the `latch-init`
    /// opcode). Idempotent: issuing it twice leaves every register neutral.
    pub fn latch_init(&mut self) {
        for reg in 0..LATCH_REGISTER_COUNT as u8 {
            self.set_byte(reg, 0);
        }
    }

    /// Set a register to an absolute value. On return, the bus line has
    /// reached its target level.
    pub fn set_byte(&mut self, register: u8, value: u8) {
        self.backend.write_register(register, value);
        self.shadow[register as usize] = value;
    }

    /// Read-modify-write using the shadow value, not an actual read, so the
    /// written bits are known-good even while other bits are in flight.
    pub fn set_bits(&mut self, register: u8, mask: u8, value: u8) {
        let prev = self.shadow[register as usize];
        let next = (prev & !mask) | (value & mask);
        self.set_byte(register, next);
    }

    /// Read a register combinationally.
    pub fn get_byte(&mut self, register: u8) -> u8 {
        self.backend.read_register(register)
    }

    pub fn output_enable(&mut self, enabled: bool) {
        self.backend.set_output_enable(enabled);
    }

    /// QBUS address-latching trick: SYNC latches address/BS7 into a CPLD, so
    /// writes to the "latched address" registers must temporarily repurpose
    /// the data lines, drive the mux selector, then restore the data lines
    /// to their prior role.
    pub fn mux_latched_address(&mut self, mux_selector_register: u8, mux_selector_value: u8, data_register: u8, data_value: u8) {
        let saved = self.shadow[data_register as usize];
        self.set_byte(mux_selector_register, mux_selector_value);
        self.set_byte(data_register, data_value);
        self.set_byte(data_register, saved);
    }
}

/// Fixed sequence of (register, write value, expected read value) used by
/// the factory-test exerciser and timing-test mailbox opcodes. Only the
/// opcode shape is specified; the concrete patterns are a diagnostic detail
/// left to the device-exerciser tooling this crate does not own.
#[derive(Debug, Clone, Copy)]
pub struct ExerciserStep {
    pub register: u8,
    pub write_value: u8,
    pub expect_value: u8,
}

impl<B: LatchBackend> LatchFabric<B> {
    /// Drive a prearranged pattern through the registers and report the
    /// first mismatch, if any, as a `LatchMismatch` (diagnostic only — does
    /// not alter protocol state).
    pub fn run_exerciser(&mut self, steps: &[ExerciserStep]) -> crate::Result<()> {
        for step in steps {
            self.set_byte(step.register, step.write_value);
            let actual = self.get_byte(step.register);
            if actual != step.expect_value {
                for bit in 0..8u8 {
                    let expected_bit = (step.expect_value >> bit) & 1 != 0;
                    let actual_bit = (actual >> bit) & 1 != 0;
                    if expected_bit != actual_bit {
                        return Err(crate::BusError::LatchMismatch {
                            register: step.register,
                            bit,
                            expected: expected_bit,
                            actual: actual_bit,
                        });
                    }
                }
            }
        }
        Ok(())
    }
}
