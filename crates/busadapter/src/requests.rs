//! DMA and interrupt requests submitted by device models, and the
//! per-level FIFOs the dispatch loop drains (spec section 3, "DMA
//! request" / "Interrupt request").

use std::collections::VecDeque;

use buscore::mailbox::DmaCycle;

/// A DMA request's lifecycle, mirrored from spec: created by a device,
/// submitted to the adapter, marshalled into the mailbox, executed by the
/// coprocessor, completion signalled, observed by the adapter, result
/// returned to the requester.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DmaRequestStatus {
    Ready,
    Arbitrating,
    Running,
    TimedOutStop,
    InitStop,
}

pub struct DmaRequest {
    pub start_addr: u32,
    pub cycle: DmaCycle,
    pub words: Vec<u16>,
    pub cpu_access: bool,
    pub status: DmaRequestStatus,
}

impl DmaRequest {
    pub fn new(start_addr: u32, cycle: DmaCycle, words: Vec<u16>) -> Self {
        Self { start_addr, cycle, words, cpu_access: false, status: DmaRequestStatus::Ready }
    }
}

/// A pending interrupt request. At most one per level may be in flight
/// inside the coprocessor at a time (spec section 3); additional requests
/// for the same level queue behind it.
pub struct InterruptRequest {
    pub level_index: u8,
    pub vector: u16,
    pub register_value: Option<(u8, u16)>,
}

/// Per-level interrupt FIFOs plus the single DMA queue, owned by the
/// adapter. Device models submit into these; the dispatch loop drains them
/// in priority order (BR7 first).
pub struct RequestQueues {
    pub dma: VecDeque<DmaRequest>,
    pub interrupts: [VecDeque<InterruptRequest>; 4],
}

impl RequestQueues {
    pub fn new() -> Self {
        Self { dma: VecDeque::new(), interrupts: [VecDeque::new(), VecDeque::new(), VecDeque::new(), VecDeque::new()] }
    }

    pub fn submit_dma(&mut self, request: DmaRequest) {
        self.dma.push_back(request);
    }

    pub fn submit_interrupt(&mut self, request: InterruptRequest) {
        let level = request.level_index as usize;
        self.interrupts[level].push_back(request);
    }

    /// Highest-priority level with a waiting request, BR7 down to BR4.
    pub fn next_interrupt_level(&self) -> Option<usize> {
        (0..4).rev().find(|&level| !self.interrupts[level].is_empty())
    }
}

impl Default for RequestQueues {
    fn default() -> Self {
        Self::new()
    }
}
