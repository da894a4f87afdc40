//! Mailbox: the single shared-memory record through which the host adapter
//! and the coprocessor exchange commands, arguments, and completion events
//! (spec section 5).
//!
//! The opcode word is the only synchronization primitive between the two
//! sides: the adapter writes every argument sub-record first, then the
//! opcode last; the coprocessor clears the opcode back to
//! [`Opcode::None`] only once it has consumed the arguments and produced
//! its result. Event pairs use the same single-writer-per-variable
//! discipline, grounded in the same pattern as [`crate::latch`]'s shadow
//! cache: each side only ever writes the field it owns.

use core::sync::atomic::{AtomicU32, AtomicU8, Ordering};

use crate::constants::MAX_DMA_WORDS;

/// Adapter-to-coprocessor opcode. Discriminant order follows the original
/// `ARM2PRU_*` enumeration so trace dumps line up with the hardware's own
/// diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Opcode {
    /// Operation complete. Must be zero: the coprocessor's idle/done signal.
    None = 0,
    Nop = 1,
    Halt = 2,
    MailboxTest = 3,
    BuslatchInit = 4,
    BuslatchSet = 5,
    BuslatchGet = 6,
    BuslatchExerciser = 7,
    BuslatchTest = 8,
    InitializationSignalSet = 9,
    AddressOverlay = 10,
    ArbModeNone = 11,
    ArbModeClient = 12,
    Dma = 13,
    Intr = 14,
    IntrCancel = 15,
    CpuEnable = 16,
    DdrFillPattern = 17,
    DdrSlaveMemory = 18,
    ArbGrantIntrRequests = 19,
    CpuBusAccess = 20,
}

impl Opcode {
    pub const fn from_u8(v: u8) -> Option<Opcode> {
        Some(match v {
            0 => Opcode::None,
            1 => Opcode::Nop,
            2 => Opcode::Halt,
            3 => Opcode::MailboxTest,
            4 => Opcode::BuslatchInit,
            5 => Opcode::BuslatchSet,
            6 => Opcode::BuslatchGet,
            7 => Opcode::BuslatchExerciser,
            8 => Opcode::BuslatchTest,
            9 => Opcode::InitializationSignalSet,
            10 => Opcode::AddressOverlay,
            11 => Opcode::ArbModeNone,
            12 => Opcode::ArbModeClient,
            13 => Opcode::Dma,
            14 => Opcode::Intr,
            15 => Opcode::IntrCancel,
            16 => Opcode::CpuEnable,
            17 => Opcode::DdrFillPattern,
            18 => Opcode::DdrSlaveMemory,
            19 => Opcode::ArbGrantIntrRequests,
            20 => Opcode::CpuBusAccess,
            _ => return None,
        })
    }
}

/// A single-writer event pair: the producer increments `signalled`, the
/// consumer increments `acked` once it has handled the event. Both are
/// rollaround counters; a pending event is `signalled != acked`.
#[derive(Debug, Default)]
pub struct EventCounter {
    signalled: AtomicU32,
    acked: AtomicU32,
}

impl EventCounter {
    pub const fn new() -> Self {
        Self { signalled: AtomicU32::new(0), acked: AtomicU32::new(0) }
    }

    /// Called only by the side that raises this event.
    pub fn signal(&self) {
        self.signalled.fetch_add(1, Ordering::Release);
    }

    /// Called only by the side that consumes this event.
    pub fn ack(&self) {
        self.acked.fetch_add(1, Ordering::Release);
    }

    pub fn is_pending(&self) -> bool {
        self.signalled.load(Ordering::Acquire) != self.acked.load(Ordering::Acquire)
    }

    /// Raw signal count, for callers that need to notice "did this fire at
    /// least once since I last looked" without consuming the event the way
    /// `ack` does (the opcode dispatcher waiting for one interrupt
    /// transmission to finish, not for the adapter's own drain loop).
    pub fn signalled_count(&self) -> u32 {
        self.signalled.load(Ordering::Acquire)
    }
}

/// Device-register access event: raised whenever a data-slave cycle touches
/// a register with `event_on_read`/`event_on_write` set.
#[derive(Debug, Default, Clone, Copy)]
pub struct DeviceRegisterEvent {
    pub unibus_control: u8,
    pub device_handle: u8,
    pub register_index: u8,
    pub data: u16,
    pub addr: u32,
}

#[derive(Debug)]
pub struct DeviceRegisterEventChannel {
    pub counter: EventCounter,
    pub event: DeviceRegisterEvent,
}

impl DeviceRegisterEventChannel {
    pub const fn new() -> Self {
        Self { counter: EventCounter::new(), event: DeviceRegisterEvent { unibus_control: 0, device_handle: 0, register_index: 0, data: 0, addr: 0 } }
    }
}

/// DMA transfer state, mirrored in the mailbox so the adapter can poll or
/// wait on completion without a second channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DmaStatus {
    Ready,
    Arbitrating,
    Running,
    TimedOutStop,
    InitStop,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DmaCycle {
    DatI,
    DatO,
}

/// DMA-master argument and result sub-record.
pub struct DmaRecord {
    pub status: DmaStatus,
    pub cycle: DmaCycle,
    pub word_count: u16,
    /// 0 for a device DMA, 1 when the coprocessor is emulating the CPU's
    /// own memory traffic.
    pub cpu_access: bool,
    pub cur_addr: u32,
    pub start_addr: u32,
    pub words: [u16; MAX_DMA_WORDS],
}

impl DmaRecord {
    pub const fn new() -> Self {
        Self {
            status: DmaStatus::Ready,
            cycle: DmaCycle::DatI,
            word_count: 0,
            cpu_access: false,
            cur_addr: 0,
            start_addr: 0,
            words: [0; MAX_DMA_WORDS],
        }
    }
}

/// Bit positions of BR4/BR5/BR6/BR7/NPR within the priority-arbitration
/// request mask (latches 0/1 on UNIBUS, register 6 on QBUS).
pub mod priority_bit {
    pub const B4: u8 = 0x01;
    pub const B5: u8 = 0x02;
    pub const B6: u8 = 0x04;
    pub const B7: u8 = 0x08;
    pub const NP: u8 = 0x10;
    pub const INTR_MASK: u8 = 0x0f;
    pub const ALL_MASK: u8 = 0x1f;
}

/// Interrupt-master argument and result sub-record: up to 4 pending
/// interrupt vectors (one per BR/IRQ level) plus the currently requested
/// level's detail.
pub struct IntrRecord {
    pub vectors: [u16; 4],
    pub priority_arbitration_bit: u8,
    pub level_index: u8,
    pub iopage_register_value: u16,
    pub iopage_register_handle: u8,
}

impl IntrRecord {
    pub const fn new() -> Self {
        Self { vectors: [0; 4], priority_arbitration_bit: 0, level_index: 0, iopage_register_value: 0, iopage_register_handle: 0 }
    }
}

/// CPU priority level as seen by the arbitrator: either a concrete PSW
/// level or the [`crate::constants::CPU_PRIORITY_FETCHING`] sentinel during
/// which no interrupt may be granted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CpuPriority {
    Level(u8),
    Fetching,
}

impl CpuPriority {
    pub const fn from_raw(v: u8) -> CpuPriority {
        if v == crate::constants::CPU_PRIORITY_FETCHING {
            CpuPriority::Fetching
        } else {
            CpuPriority::Level(v)
        }
    }

    pub const fn as_raw(self) -> u8 {
        match self {
            CpuPriority::Level(l) => l,
            CpuPriority::Fetching => crate::constants::CPU_PRIORITY_FETCHING,
        }
    }
}

/// Emulated-CPU arbitrator sub-record: the CPU's current priority level and
/// whether a grant is due.
pub struct ArbitratorRecord {
    cpu_priority_level: AtomicU8,
    intr_arbitration_pending: AtomicU8,
}

impl ArbitratorRecord {
    pub const fn new() -> Self {
        Self { cpu_priority_level: AtomicU8::new(0), intr_arbitration_pending: AtomicU8::new(0) }
    }

    pub fn priority(&self) -> CpuPriority {
        CpuPriority::from_raw(self.cpu_priority_level.load(Ordering::Acquire))
    }

    pub fn set_priority(&self, priority: CpuPriority) {
        self.cpu_priority_level.store(priority.as_raw(), Ordering::Release);
    }

    pub fn arbitration_pending(&self) -> bool {
        self.intr_arbitration_pending.load(Ordering::Acquire) != 0
    }

    pub fn set_arbitration_pending(&self, pending: bool) {
        self.intr_arbitration_pending.store(pending as u8, Ordering::Release);
    }
}

/// Generic (register, bitmask, value) argument for the buslatch opcodes.
#[derive(Debug, Default, Clone, Copy)]
pub struct BuslatchArgs {
    pub addr: u8,
    pub bitmask: u8,
    pub val: u8,
}

/// A fixed exerciser/timing-test pattern posted ahead of
/// [`Opcode::BuslatchExerciser`]/[`Opcode::BuslatchTest`]; `count` of the
/// `steps` are actually run, the rest ignored.
pub struct ExerciserArgs {
    pub steps: [crate::latch::ExerciserStep; 8],
    pub count: u8,
}

impl ExerciserArgs {
    pub const fn new() -> Self {
        Self { steps: [crate::latch::ExerciserStep { register: 0, write_value: 0, expect_value: 0 }; 8], count: 0 }
    }
}

impl Default for ExerciserArgs {
    fn default() -> Self {
        Self::new()
    }
}

/// The complete shared-memory mailbox. Owns one opcode word (the sole
/// synchronization primitive), the per-feature argument sub-records, and
/// the event channels the coprocessor uses to notify the adapter.
pub struct Mailbox {
    opcode: AtomicU8,
    pub buslatch: BuslatchArgs,
    pub arbitrator: ArbitratorRecord,
    pub intr: IntrRecord,
    pub dma: DmaRecord,
    pub deviceregister_event: DeviceRegisterEventChannel,
    pub dma_event: EventCounter,
    pub intr_master_event: [EventCounter; 4],
    pub init_event: EventCounter,
    pub power_event: EventCounter,
    pub power_signals_prev: AtomicU8,
    pub power_signals_cur: AtomicU8,
    /// Bit0 INIT, bit1 POK, bit2 DCOK: the power/init line state last
    /// commanded by [`Opcode::InitializationSignalSet`].
    pub init_signal_cur: AtomicU8,
    /// OR-mask posted by [`Opcode::AddressOverlay`] (spec section 4.3).
    pub address_overlay: AtomicU32,
    pub exerciser: ExerciserArgs,
}

impl Mailbox {
    pub const fn new() -> Self {
        Self {
            opcode: AtomicU8::new(Opcode::None as u8),
            buslatch: BuslatchArgs { addr: 0, bitmask: 0, val: 0 },
            arbitrator: ArbitratorRecord::new(),
            intr: IntrRecord::new(),
            dma: DmaRecord::new(),
            deviceregister_event: DeviceRegisterEventChannel::new(),
            dma_event: EventCounter::new(),
            intr_master_event: [EventCounter::new(), EventCounter::new(), EventCounter::new(), EventCounter::new()],
            init_event: EventCounter::new(),
            power_event: EventCounter::new(),
            power_signals_prev: AtomicU8::new(0),
            power_signals_cur: AtomicU8::new(0),
            init_signal_cur: AtomicU8::new(0),
            address_overlay: AtomicU32::new(0),
            exerciser: ExerciserArgs::new(),
        }
    }

    /// Adapter side: post a request. Callers must finish writing every
    /// argument sub-record before calling this — it is the publish step.
    pub fn post(&self, opcode: Opcode) {
        self.opcode.store(opcode as u8, Ordering::Release);
    }

    /// Coprocessor side: inspect the pending opcode without consuming it.
    pub fn peek(&self) -> Option<Opcode> {
        Opcode::from_u8(self.opcode.load(Ordering::Acquire)).filter(|o| *o != Opcode::None)
    }

    /// Coprocessor side: mark the request complete. Must be the last write
    /// after all result fields have been stored.
    pub fn complete(&self) {
        self.opcode.store(Opcode::None as u8, Ordering::Release);
    }

    /// Adapter side: has the coprocessor finished the outstanding request?
    pub fn is_idle(&self) -> bool {
        self.opcode.load(Ordering::Acquire) == Opcode::None as u8
    }
}

impl Default for Mailbox {
    fn default() -> Self {
        Self::new()
    }
}
