//! Mailbox opcode dispatch: the coprocessor-side half of the contract
//! described in spec section 6 ("the coprocessor clears it to 0 when the
//! operation is complete"). Every `ARM2PRU_*` opcode needs exactly one
//! consumer that peeks the mailbox, performs the action, and either
//! completes the request immediately (register pokes, mode switches) or
//! leaves it open until a multi-tick sub-machine finishes (DMA, interrupt
//! transmission).
//!
//! Grounded in the original PRU main loop's one-opcode-at-a-time servicing
//! discipline (`pru1_main.c`'s dispatch switch over `ARM2PRU_*`): a single
//! opcode is serviced per pass, synchronous opcodes complete in that same
//! pass, and `Dma`/`Intr`/`CpuBusAccess` only raise a request here — the
//! bus-mastership handshake that actually moves data is arbitration's job,
//! wired up in [`accept_grant`].

use crate::latch::{LatchBackend, LatchFabric, WireTable};
use crate::mailbox::{priority_bit, DmaStatus, Mailbox, Opcode};

use super::arbitration::{assert_sack, ArbitrationMode, ArbitrationState, Grant};
use super::dma::{DmaMaster, DmaRequest};
use super::interrupt::{InterruptMaster, InterruptRequest};

/// A multi-tick request this dispatcher has accepted but not yet completed
/// in the mailbox. Only one can be in flight, since the opcode word itself
/// is the mailbox's only synchronization primitive.
#[derive(Debug, Clone, Copy)]
enum InFlight {
    Dma,
    Intr { level_index: u8, baseline_signal: u32 },
}

/// Coprocessor-side state the opcode dispatcher owns: the arbitration mode
/// and CPU-enable flag the adapter toggles via opcodes, and the DMA-master
/// / interrupt-master sub-machines a `Dma`/`Intr`/`CpuBusAccess` opcode
/// eventually drives once arbitration grants the bus.
pub struct CoprocessorState {
    pub arbitration_mode: ArbitrationMode,
    pub cpu_enabled: bool,
    pub dma: DmaMaster,
    pub interrupt: InterruptMaster,
    in_flight: Option<InFlight>,
}

impl CoprocessorState {
    pub const fn new(arbitration_mode: ArbitrationMode) -> Self {
        Self { arbitration_mode, cpu_enabled: false, dma: DmaMaster::new(), interrupt: InterruptMaster::new(), in_flight: None }
    }

    /// Service at most one opcode per call. If a `Dma`/`Intr`/`CpuBusAccess`
    /// request is already in flight, this only checks whether it has
    /// finished (and completes the mailbox if so) rather than re-reading the
    /// still-unchanged opcode word.
    pub fn service<B: LatchBackend, W: WireTable>(&mut self, latch: &mut LatchFabric<B>, mailbox: &mut Mailbox, arbitration: &mut ArbitrationState) {
        if let Some(in_flight) = self.in_flight {
            match in_flight {
                InFlight::Dma => {
                    if matches!(mailbox.dma.status, DmaStatus::Ready | DmaStatus::TimedOutStop | DmaStatus::InitStop) {
                        self.in_flight = None;
                        mailbox.complete();
                    }
                }
                InFlight::Intr { level_index, baseline_signal } => {
                    if mailbox.intr_master_event[level_index as usize].signalled_count() != baseline_signal {
                        self.in_flight = None;
                        mailbox.complete();
                    }
                }
            }
            return;
        }

        let Some(opcode) = mailbox.peek() else { return };

        match opcode {
            Opcode::None => {}
            Opcode::Nop | Opcode::MailboxTest | Opcode::Halt => {
                if opcode == Opcode::Halt {
                    self.cpu_enabled = false;
                }
                mailbox.complete();
            }
            Opcode::BuslatchInit => {
                latch.latch_init();
                mailbox.complete();
            }
            Opcode::BuslatchSet => {
                latch.set_bits(mailbox.buslatch.addr, mailbox.buslatch.bitmask, mailbox.buslatch.val);
                mailbox.complete();
            }
            Opcode::BuslatchGet => {
                mailbox.buslatch.val = latch.get_byte(mailbox.buslatch.addr);
                mailbox.complete();
            }
            Opcode::BuslatchExerciser | Opcode::BuslatchTest => {
                let count = mailbox.exerciser.count as usize;
                let steps = mailbox.exerciser.steps;
                mailbox.buslatch.val = match latch.run_exerciser(&steps[..count.min(steps.len())]) {
                    Ok(()) => 0,
                    Err(_) => 1,
                };
                mailbox.complete();
            }
            Opcode::InitializationSignalSet => {
                let bits = mailbox.init_signal_cur.load(core::sync::atomic::Ordering::Acquire);
                Self::set_wire::<B, W>(latch, "INIT", bits & 0x01 != 0);
                Self::set_wire::<B, W>(latch, "POK", bits & 0x02 != 0);
                Self::set_wire::<B, W>(latch, "DCOK", bits & 0x04 != 0);
                mailbox.complete();
            }
            Opcode::AddressOverlay => {
                self.dma.set_address_overlay(mailbox.address_overlay.load(core::sync::atomic::Ordering::Acquire));
                mailbox.complete();
            }
            Opcode::ArbModeNone => {
                self.arbitration_mode = ArbitrationMode::None;
                mailbox.complete();
            }
            Opcode::ArbModeClient => {
                self.arbitration_mode = ArbitrationMode::Device;
                mailbox.complete();
            }
            Opcode::ArbGrantIntrRequests => {
                mailbox.arbitrator.set_arbitration_pending(true);
                mailbox.complete();
            }
            Opcode::CpuEnable => {
                self.cpu_enabled = mailbox.buslatch.val != 0;
                mailbox.complete();
            }
            Opcode::DdrFillPattern | Opcode::DdrSlaveMemory => {
                // The bus engine owns no memory array of its own (spec
                // non-goals); the backing store these configure is supplied
                // externally, so there is nothing left to do but ack.
                mailbox.complete();
            }
            Opcode::Dma | Opcode::CpuBusAccess => {
                mailbox.dma.cpu_access = opcode == Opcode::CpuBusAccess;
                mailbox.dma.status = DmaStatus::Arbitrating;
                arbitration.raise(priority_bit::NP);
                self.in_flight = Some(InFlight::Dma);
            }
            Opcode::Intr => {
                let bits = mailbox.intr.priority_arbitration_bit & priority_bit::INTR_MASK;
                arbitration.raise(bits);
                let level_index = mailbox.intr.level_index;
                let baseline_signal = mailbox.intr_master_event[level_index as usize].signalled_count();
                self.in_flight = Some(InFlight::Intr { level_index, baseline_signal });
            }
            Opcode::IntrCancel => {
                arbitration.clear(mailbox.intr.priority_arbitration_bit & priority_bit::INTR_MASK);
                mailbox.complete();
            }
        }
    }

    /// Called after an [`super::arbitration::ArbitrationWorker`] grants a
    /// request this dispatcher raised (`Device`/`None` mode only — in `Cpu`
    /// mode this coprocessor is granting someone *else's* request and has no
    /// sub-flow of its own to start, see
    /// [`super::arbitration::CpuWorker::await_sack`]). Asserts SACK and
    /// starts the matching sub-machine (spec section 4.4).
    pub fn accept_grant<B: LatchBackend, W: WireTable>(&mut self, latch: &mut LatchFabric<B>, mailbox: &mut Mailbox, grant: Grant) {
        if grant.mask == 0 {
            return;
        }
        assert_sack::<B, W>(latch, grant);

        if grant.has(priority_bit::NP) {
            mailbox.dma.status = DmaStatus::Running;
            self.dma.start(&DmaRequest { start_addr: mailbox.dma.start_addr, cycle: mailbox.dma.cycle, total_words: mailbox.dma.word_count });
            return;
        }
        let level_index = match grant.mask {
            priority_bit::B4 => 0,
            priority_bit::B5 => 1,
            priority_bit::B6 => 2,
            priority_bit::B7 => 3,
            _ => return,
        };
        self.interrupt.start(&InterruptRequest { level_index, vector: mailbox.intr.vectors[level_index as usize] });
    }

    fn set_wire<B: LatchBackend, W: WireTable>(latch: &mut LatchFabric<B>, name: &str, asserted: bool) {
        let wire = W::find_out(name).expect("wire present in active table");
        let level = asserted != wire.inverted;
        latch.set_bits(wire.register, 1 << wire.bit, if level { 0xff } else { 0 });
    }
}

impl Default for CoprocessorState {
    fn default() -> Self {
        Self::new(ArbitrationMode::Device)
    }
}
