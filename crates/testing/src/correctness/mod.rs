//! Drivers that push the state machines through a handful of transitions
//! and return the observable result, shared by the concrete end-to-end
//! scenario tests in `tests/`.

use buscore::latch::qbus::Qbus;
use buscore::latch::{LatchFabric, WireTable};
use buscore::mailbox::{DeviceRegisterEventChannel, EventCounter};
use buscore::regmap::{AddressMap, RegisterDescriptor, RegisterFile};
use buscore::sm::data_slave::DataSlave;
use buscore::sm::StepResult;

use crate::{MockLatch, MockMemory};

/// Drives a single DATI/DATO register or memory cycle against a freshly
/// built data-slave machine, acking device-register events the instant
/// they are raised (an adapter with zero extra latency). Bit sequencing
/// follows exactly what [`buscore::sm::data_slave::DataSlave`] expects on
/// the QBUS wire table.
pub struct SingleCycleHarness {
    pub latch: LatchFabric<MockLatch>,
    pub map: AddressMap,
    pub regs: RegisterFile,
    pub events: DeviceRegisterEventChannel,
    pub memory: MockMemory,
    slave: DataSlave,
}

impl SingleCycleHarness {
    pub fn new(memory_start: u32, memory_limit: u32, iopage_start: u32) -> Self {
        Self {
            latch: LatchFabric::new(MockLatch::new()),
            map: AddressMap::new(memory_start, memory_limit, iopage_start).expect("valid test address map"),
            regs: RegisterFile::new(),
            events: DeviceRegisterEventChannel::new(),
            memory: MockMemory::new(memory_start, memory_limit),
            slave: DataSlave::new(),
        }
    }

    pub fn install_register(&mut self, handle: u8, addr: u32, descriptor: RegisterDescriptor) {
        self.regs.install(handle, descriptor).expect("room for test register");
        self.map.set_handle(addr, handle).expect("address inside iopage range");
    }

    /// Drive an individual wire by name, for tests that need lower-level
    /// control than [`Self::read_word`]/[`Self::write_word`] (e.g. asserting
    /// INIT mid-cycle).
    pub fn set_wire(&mut self, name: &str, asserted: bool) {
        let wire = Qbus::find_out(name).or_else(|| Qbus::find_in(name)).expect("wire present in qbus table");
        let level = asserted != wire.inverted;
        self.latch.set_bits(wire.register, 1 << wire.bit, if level { 0xff } else { 0 });
    }

    pub fn step(&mut self) -> StepResult {
        let result = self.slave.step::<_, Qbus, _>(&mut self.latch, &self.map, &mut self.regs, &mut self.events, &mut self.memory);
        if self.events.counter.is_pending() {
            self.events.counter.ack();
        }
        result
    }

    pub fn state(&self) -> buscore::sm::data_slave::DataSlaveState {
        self.slave.state
    }

    pub fn rply_asserted(&mut self) -> bool {
        let wire = Qbus::find_in("RPLY").expect("RPLY wire present in qbus table");
        let byte = self.latch.get_byte(wire.register);
        let bit = (byte >> wire.bit) & 1 != 0;
        if wire.inverted {
            !bit
        } else {
            bit
        }
    }

    pub fn latch_address(&mut self, addr: u32) {
        self.latch.set_byte(0, (addr & 0xff) as u8);
        self.latch.set_byte(1, ((addr >> 8) & 0xff) as u8);
        self.latch.set_byte(2, ((addr >> 16) & 0x7f) as u8);
        self.set_wire("SYNC", true);
    }

    /// Run a complete single-word DATI: address, DIN, read result, negate
    /// DIN and SYNC, return to `Stop`.
    pub fn read_word(&mut self, addr: u32) -> u16 {
        self.latch_address(addr);
        self.step(); // Stop/Start -> DindoutStart
        self.set_wire("DIN", true);
        self.step(); // DindoutStart -> DinSingleComplete, data now on DAL
        let low = self.latch.get_byte(0) as u16;
        let high = self.latch.get_byte(1) as u16;
        self.set_wire("DIN", false);
        self.step(); // DinSingleComplete -> DinBlockComplete
        self.set_wire("SYNC", false);
        self.step(); // DinBlockComplete -> Stop
        low | (high << 8)
    }

    /// Run a complete single-word DATO.
    pub fn write_word(&mut self, addr: u32, value: u16) {
        self.latch_address(addr);
        self.step(); // Stop/Start -> DindoutStart
        self.latch.set_byte(0, (value & 0xff) as u8);
        self.latch.set_byte(1, ((value >> 8) & 0xff) as u8);
        self.set_wire("DOUT", true);
        self.step(); // DindoutStart -> DoutSingleComplete
        self.set_wire("DOUT", false);
        self.step(); // DoutSingleComplete -> DoutBlockComplete
        self.set_wire("SYNC", false);
        self.step(); // DoutBlockComplete -> Stop
    }
}

/// `EventCounter` starts at rest — exercised directly because several
/// invariants (spec section 7, "pending iff signalled != acked") hinge on
/// this.
pub fn fresh_counter_is_not_pending() -> bool {
    !EventCounter::new().is_pending()
}
