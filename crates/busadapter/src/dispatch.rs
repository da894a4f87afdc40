//! The adapter's dispatch loop (spec section 4.6): polls mailbox event
//! counters and delivers pending events to device models, services
//! device-submitted DMA requests, and services interrupt requests by
//! selecting the highest-priority waiting request per level.

use std::collections::HashMap;
use std::time::Duration;

use buscore::mailbox::{DmaCycle, DmaStatus, Mailbox, Opcode};
use tokio::sync::mpsc;
use tokio::time::sleep;
use tracing::{debug, warn};

use crate::device::DeviceModel;
use crate::mailbox_handle::MailboxHandle;
use crate::requests::{DmaRequest, DmaRequestStatus, InterruptRequest, RequestQueues};

/// One iteration's worth of idle backoff when nothing is pending, so the
/// dispatch loop does not spin a host CPU core at 100%.
const IDLE_BACKOFF: Duration = Duration::from_micros(200);

pub enum DispatchCommand {
    SubmitDma(DmaRequest),
    SubmitInterrupt(InterruptRequest),
    Shutdown,
}

/// Handle device models use to reach the dispatch loop without sharing its
/// internal state directly.
#[derive(Clone)]
pub struct Dispatcher {
    tx: mpsc::UnboundedSender<DispatchCommand>,
}

impl Dispatcher {
    pub fn submit_dma(&self, request: DmaRequest) {
        let _ = self.tx.send(DispatchCommand::SubmitDma(request));
    }

    pub fn submit_interrupt(&self, request: InterruptRequest) {
        let _ = self.tx.send(DispatchCommand::SubmitInterrupt(request));
    }

    pub fn shutdown(&self) {
        let _ = self.tx.send(DispatchCommand::Shutdown);
    }
}

/// Owns the mailbox handle, the request queues, and the device-handle
/// routing table. `run` is the adapter's single long-lived dispatch
/// thread's body (spec section 4.6).
pub struct DispatchLoop {
    mailbox: MailboxHandle,
    queues: RequestQueues,
    devices: HashMap<u8, Box<dyn DeviceModel>>,
    rx: mpsc::UnboundedReceiver<DispatchCommand>,
}

impl DispatchLoop {
    pub fn new(mailbox: MailboxHandle) -> (Self, Dispatcher) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { mailbox, queues: RequestQueues::new(), devices: HashMap::new(), rx }, Dispatcher { tx })
    }

    pub fn register_device(&mut self, handle: u8, model: Box<dyn DeviceModel>) {
        self.devices.insert(handle, model);
    }

    pub async fn run(mut self) {
        loop {
            let mut did_work = false;

            while let Ok(command) = self.rx.try_recv() {
                did_work = true;
                match command {
                    DispatchCommand::SubmitDma(req) => self.queues.submit_dma(req),
                    DispatchCommand::SubmitInterrupt(req) => self.queues.submit_interrupt(req),
                    DispatchCommand::Shutdown => return,
                }
            }

            if self.drain_register_events().await {
                did_work = true;
            }
            if self.drain_dma_event().await {
                did_work = true;
            }
            if self.drain_intr_events().await {
                did_work = true;
            }

            if self.mailbox.with_lock(|mb: &mut Mailbox| mb.is_idle()).await {
                if let Some(req) = self.queues.dma.pop_front() {
                    self.run_dma(req).await;
                    did_work = true;
                } else if let Some(level) = self.queues.next_interrupt_level() {
                    let req = self.queues.interrupts[level].pop_front().expect("level reported non-empty");
                    self.run_interrupt(req).await;
                    did_work = true;
                }
            }

            if !did_work {
                sleep(IDLE_BACKOFF).await;
            }
        }
    }

    /// Deliver pending device-register events to their owning model and ack
    /// each one once consumed.
    async fn drain_register_events(&mut self) -> bool {
        let pending = self.mailbox.with_lock(|mb| mb.deviceregister_event.counter.is_pending()).await;
        if !pending {
            return false;
        }
        let event = self.mailbox.with_lock(|mb| mb.deviceregister_event.event).await;
        if let Some(model) = self.devices.get_mut(&event.device_handle) {
            model.on_register_event(&event);
        } else {
            warn!(handle = event.device_handle, "register event for unknown device handle");
        }
        self.mailbox.with_lock(|mb| mb.deviceregister_event.counter.ack()).await;
        true
    }

    async fn drain_dma_event(&mut self) -> bool {
        self.mailbox
            .with_lock(|mb| {
                if mb.dma_event.is_pending() {
                    debug!(status = ?mb.dma.status, "DMA completion observed");
                    mb.dma_event.ack();
                    true
                } else {
                    false
                }
            })
            .await
    }

    async fn drain_intr_events(&mut self) -> bool {
        let mut any = false;
        for level in 0..4 {
            let pending = self.mailbox.with_lock(|mb| mb.intr_master_event[level].is_pending()).await;
            if pending {
                self.mailbox.with_lock(|mb| mb.intr_master_event[level].ack()).await;
                any = true;
            }
        }
        any
    }

    async fn run_dma(&mut self, mut req: DmaRequest) {
        req.status = DmaRequestStatus::Arbitrating;
        self.mailbox
            .issue(Opcode::Dma, |mb| {
                mb.dma.start_addr = req.start_addr;
                mb.dma.cycle = req.cycle;
                mb.dma.word_count = req.words.len() as u16;
                mb.dma.cpu_access = req.cpu_access;
                if req.cycle == DmaCycle::DatO {
                    for (slot, word) in mb.dma.words.iter_mut().zip(req.words.iter()) {
                        *slot = *word;
                    }
                }
                mb.dma.status = DmaStatus::Arbitrating;
            })
            .await;

        let (status, words) = self
            .mailbox
            .with_lock(|mb| (mb.dma.status, mb.dma.words[..req.words.len()].to_vec()))
            .await;
        req.status = match status {
            DmaStatus::Ready => DmaRequestStatus::Ready,
            DmaStatus::TimedOutStop => DmaRequestStatus::TimedOutStop,
            DmaStatus::InitStop => DmaRequestStatus::InitStop,
            DmaStatus::Arbitrating | DmaStatus::Running => DmaRequestStatus::Running,
        };
        if req.cycle == DmaCycle::DatI {
            req.words = words;
        }
    }

    async fn run_interrupt(&mut self, req: InterruptRequest) {
        self.mailbox
            .issue(Opcode::Intr, |mb| {
                mb.intr.vectors[req.level_index as usize] = req.vector;
                mb.intr.level_index = req.level_index;
                if let Some((handle, value)) = req.register_value {
                    mb.intr.iopage_register_handle = handle;
                    mb.intr.iopage_register_value = value;
                }
            })
            .await;
    }
}
