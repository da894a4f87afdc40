//! Priority arbitration: the NPR/NPG/SACK and BR/BG/SACK protocol that
//! grants bus mastership to a DMA or interrupt request (spec section 4.5).
//!
//! Grounded in `pru1_statemachine_arbitration.c`'s `sm_arb_worker_*`
//! family: a device-side worker (request external/physical-CPU arbitration
//! and wait for the grant to come back down the chain), a cpu-side worker
//! (emulate the PDP-11 CPU's own instant-grant rule), and a none worker
//! (DMA without any NPR/NPG/SACK exchange, for cases where the bus has no
//! other master). Exactly one worker is active per configured instance.

use crate::constants::DEFAULT_SACK_TIMEOUT_MS;
use crate::error::BusError;
use crate::latch::{LatchBackend, LatchFabric, WireTable};
use crate::mailbox::{priority_bit, CpuPriority};

/// Which arbitration worker drives this bus engine instance. Selected once
/// at configuration time, not per-request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArbitrationMode {
    /// Request is forwarded to, and granted by, an external or emulated
    /// arbitrator via the BR/BG or NPR/NPG chain.
    Device,
    /// This instance emulates the PDP-11 CPU's own arbitration logic.
    Cpu,
    /// No arbitration protocol at all; DMA proceeds as soon as the bus is
    /// idle (SYNC and RPLY both clear).
    None,
}

/// Outcome of a single arbitration poll: which request levels now hold
/// SACK and may proceed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Grant {
    pub mask: u8,
}

impl Grant {
    pub const fn none() -> Self {
        Self { mask: 0 }
    }

    pub fn has(self, bit: u8) -> bool {
        self.mask & bit != 0
    }
}

/// Per-worker arbitration state: open requests, grants already forwarded
/// to other devices, and which requests this instance has itself
/// signalled.
#[derive(Debug, Default)]
pub struct ArbitrationState {
    pub request_mask: u8,
    pub forwarded_grant_mask: u8,
    pub signalled_mask: u8,
}

impl ArbitrationState {
    pub const fn new() -> Self {
        Self { request_mask: 0, forwarded_grant_mask: 0, signalled_mask: 0 }
    }

    pub fn raise(&mut self, bit: u8) {
        self.request_mask |= bit;
    }

    pub fn clear(&mut self, bit: u8) {
        self.request_mask &= !bit;
        self.signalled_mask &= !bit;
    }

    /// INIT protocol rule: every open request and grant is dropped
    /// immediately.
    pub fn reset(&mut self) {
        self.request_mask = 0;
        self.forwarded_grant_mask = 0;
        self.signalled_mask = 0;
    }
}

/// Turn an accepted grant into an asserted SACK wire (spec section 4.4: "A
/// grant for a level we did request is accepted: assert SACK, clear the
/// corresponding request"). `poll` already cleared the request bit; this is
/// the other half of accepting a grant that callers must not skip.
pub fn assert_sack<B: LatchBackend, W: WireTable>(latch: &mut LatchFabric<B>, grant: Grant) {
    if grant.mask == 0 {
        return;
    }
    let wire = W::find_out("SACK").expect("SACK wire present in active table");
    let level = true != wire.inverted;
    latch.set_bits(wire.register, 1 << wire.bit, if level { 0xff } else { 0 });
}

/// A worker inspects the incoming grant-chain state and the current
/// request mask and decides which, if any, requests it may accept.
pub trait ArbitrationWorker {
    /// `incoming_grants`: the BG4-7/NPG lines as currently observed
    /// (already OR'd with any chain input on UNIBUS). Bits not accepted by
    /// this worker must be forwarded ("passing the grant") by the caller.
    fn poll(&mut self, state: &mut ArbitrationState, incoming_grants: u8) -> Grant;
}

/// Forward requests to, and wait on, an external or physical-CPU
/// arbitrator. A grant is only accepted once the bus is idle (no SYNC/RPLY
/// in flight from the previous master).
pub struct DeviceWorker {
    pub bus_idle: bool,
}

impl ArbitrationWorker for DeviceWorker {
    fn poll(&mut self, state: &mut ArbitrationState, incoming_grants: u8) -> Grant {
        let requested = state.request_mask;
        let acceptable = incoming_grants & requested;
        if acceptable == 0 || !self.bus_idle {
            state.forwarded_grant_mask = incoming_grants & !requested;
            return Grant::none();
        }
        // Accept the lowest requested, granted bit; the rest stay pending.
        let accepted = acceptable & acceptable.wrapping_neg();
        state.clear(accepted);
        state.forwarded_grant_mask = incoming_grants & !accepted;
        Grant { mask: accepted }
    }
}

/// Emulate the PDP-11 CPU's own arbitration: grant the highest-priority
/// open BR level above the CPU's current PSW priority, or NPR
/// unconditionally (DMA always outranks program execution), but never
/// while interrupt arbitration is pending and the CPU is about to fetch
/// the next instruction (`CpuPriority::Fetching`).
pub struct CpuWorker {
    pub priority: CpuPriority,
    /// Bits granted but not yet confirmed by SACK; zero once `await_sack`
    /// sees SACK asserted or retracts the grant on timeout.
    pending_grant: u8,
    elapsed_ms: u32,
}

impl CpuWorker {
    pub const fn new(priority: CpuPriority) -> Self {
        Self { priority, pending_grant: 0, elapsed_ms: 0 }
    }

    /// Called once per dispatch pass after `poll`, with the freshly sampled
    /// SACK wire state. Spec section 4.4: "After issuing a grant, start a
    /// SACK-acceptance timeout; if no SACK arrives within the timeout,
    /// retract the grant." `timeout_ms` is caller-supplied
    /// (`BusConfig::sack_timeout_ms` on the adapter side) rather than
    /// hardcoded, so [`DEFAULT_SACK_TIMEOUT_MS`] is only the fallback a
    /// caller with no override reaches for.
    pub fn await_sack(&mut self, sack_asserted: bool, dt_ms: u32, timeout_ms: u32, state: &mut ArbitrationState) -> Result<(), BusError> {
        if self.pending_grant == 0 {
            return Ok(());
        }
        if sack_asserted {
            self.pending_grant = 0;
            self.elapsed_ms = 0;
            return Ok(());
        }
        self.elapsed_ms += dt_ms;
        if self.elapsed_ms >= timeout_ms {
            state.raise(self.pending_grant);
            self.pending_grant = 0;
            self.elapsed_ms = 0;
            return Err(BusError::ArbitrationSackTimeout);
        }
        Ok(())
    }

    /// [`Self::await_sack`] with [`DEFAULT_SACK_TIMEOUT_MS`], for callers
    /// that have not configured an override.
    pub fn await_sack_default(&mut self, sack_asserted: bool, dt_ms: u32, state: &mut ArbitrationState) -> Result<(), BusError> {
        self.await_sack(sack_asserted, dt_ms, DEFAULT_SACK_TIMEOUT_MS, state)
    }
}

impl ArbitrationWorker for CpuWorker {
    fn poll(&mut self, state: &mut ArbitrationState, _incoming_grants: u8) -> Grant {
        if state.request_mask & priority_bit::NP != 0 {
            state.clear(priority_bit::NP);
            self.pending_grant = priority_bit::NP;
            self.elapsed_ms = 0;
            return Grant { mask: priority_bit::NP };
        }
        let current = match self.priority {
            CpuPriority::Fetching => return Grant::none(),
            CpuPriority::Level(l) => l,
        };
        for (index, bit) in [priority_bit::B7, priority_bit::B6, priority_bit::B5, priority_bit::B4].iter().enumerate() {
            let level = 7 - index as u8;
            if state.request_mask & bit != 0 && level > current {
                state.clear(*bit);
                self.pending_grant = *bit;
                self.elapsed_ms = 0;
                return Grant { mask: *bit };
            }
        }
        Grant::none()
    }
}

/// No arbitration protocol: grant every open request immediately once the
/// bus is idle, for bus configurations with no competing master.
pub struct NoneWorker {
    pub bus_idle: bool,
}

impl ArbitrationWorker for NoneWorker {
    fn poll(&mut self, state: &mut ArbitrationState, _incoming_grants: u8) -> Grant {
        if !self.bus_idle || state.request_mask == 0 {
            return Grant::none();
        }
        let mask = state.request_mask;
        state.clear(mask);
        Grant { mask }
    }
}
