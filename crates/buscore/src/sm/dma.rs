//! DMA-master state machine: drives block DATI*/DATO* cycles as bus master
//! once arbitration has granted the bus, transferring the mailbox's word
//! buffer (spec section 4.4).
//!
//! Grounded in `pru1_statemachine_dma.c`: SACK is already held asserted on
//! entry (arbitration's job), blocks are capped at
//! [`crate::constants::QBUS_MAX_BLOCK_WORDS`] words before re-arbitrating the
//! next sub-block — without releasing SACK, since the whole multi-block
//! transfer is still one bus mastership — and SACK is only released once,
//! one handshake before the final SYNC drop, at the true end of the entire
//! transfer.

use crate::constants::QBUS_MAX_BLOCK_WORDS;
use crate::latch::{LatchBackend, LatchFabric, WireTable};
use crate::mailbox::{DmaCycle, DmaRecord, DmaStatus};

use super::StepResult;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DmaState {
    Addr,
    DinStart,
    DinComplete,
    DoutStart,
    DoutComplete,
    /// SACK released one handshake before the final SYNC drop, so the
    /// arbitrator can start granting the next request in parallel.
    LastWordSackRelease,
    Finish,
}

/// A single DMA-master transfer request, built from [`DmaRecord`] at the
/// point arbitration grants the bus.
pub struct DmaRequest {
    pub start_addr: u32,
    pub cycle: DmaCycle,
    pub total_words: u16,
}

pub struct DmaMaster {
    pub state: DmaState,
    cur_addr: u32,
    words_left: u16,
    block_words_left: u16,
    word_index: usize,
    /// OR-mask applied to the address actually driven onto the bus, never
    /// to `cur_addr`/`record.cur_addr` bookkeeping (spec section 4.3,
    /// "Address overlay" — an emulated CPU with a boot ROM substituted in
    /// over part of the address space still reports its real addresses).
    overlay_mask: u32,
}

impl DmaMaster {
    pub const fn new() -> Self {
        Self { state: DmaState::Addr, cur_addr: 0, words_left: 0, block_words_left: 0, word_index: 0, overlay_mask: 0 }
    }

    pub fn start(&mut self, request: &DmaRequest) {
        self.cur_addr = request.start_addr;
        self.words_left = request.total_words;
        self.block_words_left = 0;
        self.word_index = 0;
        self.state = DmaState::Addr;
    }

    /// Set by the `AddressOverlay` opcode: every address this machine
    /// drives from now on is OR'd with `mask` before reaching the latch.
    pub fn set_address_overlay(&mut self, mask: u32) {
        self.overlay_mask = mask;
    }

    /// Advance one transition, reading/writing `record.words` in place.
    /// Returns the next [`StepResult`]; callers inspect `record.status` to
    /// learn when the transfer has finished, timed out, or been aborted by
    /// INIT.
    pub fn step<B, W>(&mut self, latch: &mut LatchFabric<B>, record: &mut DmaRecord, init_asserted: bool, reply_ok: bool) -> StepResult
    where
        B: LatchBackend,
        W: WireTable,
    {
        if init_asserted && !matches!(self.state, DmaState::Finish) {
            record.status = DmaStatus::InitStop;
            record.cur_addr = self.cur_addr;
            self.negate_sack::<W>(latch);
            self.state = DmaState::Finish;
            return StepResult::Continue;
        }

        match self.state {
            DmaState::Addr => {
                self.drive_address::<W>(latch);
                self.block_words_left = self.words_left.min(QBUS_MAX_BLOCK_WORDS as u16);
                self.state = match record.cycle {
                    DmaCycle::DatI => DmaState::DinStart,
                    DmaCycle::DatO => DmaState::DoutStart,
                };
                StepResult::Continue
            }
            DmaState::DinStart => {
                self.assert_din::<W>(latch);
                if !reply_ok {
                    record.status = DmaStatus::TimedOutStop;
                    record.cur_addr = self.cur_addr;
                    self.negate_sack::<W>(latch);
                    self.state = DmaState::Finish;
                    return StepResult::Continue;
                }
                let value = self.read_data::<W>(latch);
                record.words[self.word_index] = value;
                self.word_index += 1;
                self.negate_din::<W>(latch);
                self.state = DmaState::DinComplete;
                StepResult::Continue
            }
            DmaState::DinComplete => {
                self.block_words_left -= 1;
                self.words_left -= 1;
                self.cur_addr = self.cur_addr.wrapping_add(2);
                self.finish_word(record)
            }
            DmaState::DoutStart => {
                let value = record.words[self.word_index];
                self.word_index += 1;
                self.drive_data::<W>(latch, value);
                self.assert_dout::<W>(latch);
                if !reply_ok {
                    record.status = DmaStatus::TimedOutStop;
                    record.cur_addr = self.cur_addr;
                    self.negate_sack::<W>(latch);
                    self.state = DmaState::Finish;
                    return StepResult::Continue;
                }
                self.negate_dout::<W>(latch);
                self.state = DmaState::DoutComplete;
                StepResult::Continue
            }
            DmaState::DoutComplete => {
                self.block_words_left -= 1;
                self.words_left -= 1;
                self.cur_addr = self.cur_addr.wrapping_add(2);
                self.finish_word(record)
            }
            DmaState::LastWordSackRelease => {
                self.negate_sack::<W>(latch);
                record.status = DmaStatus::Ready;
                self.state = DmaState::Finish;
                StepResult::Continue
            }
            DmaState::Finish => StepResult::Yield,
        }
    }

    /// Mid-sub-block, the next word continues straight into `DinStart`/
    /// `DoutStart` with no address re-latch (REF/block-continue territory).
    /// `block_words_left` reaching zero ends the current sub-block only;
    /// SACK stays asserted across that boundary and the next sub-block
    /// re-arbitrates from `Addr` without releasing the bus. SACK is only
    /// released once, one handshake early, at the true end of the whole
    /// transfer (`words_left == 0`), which takes priority over an
    /// in-progress sub-block boundary.
    fn finish_word(&mut self, record: &mut DmaRecord) -> StepResult {
        record.cur_addr = self.cur_addr;
        self.state = if self.words_left == 0 {
            DmaState::LastWordSackRelease
        } else if self.block_words_left == 0 {
            DmaState::Addr
        } else {
            match record.cycle {
                DmaCycle::DatI => DmaState::DinStart,
                DmaCycle::DatO => DmaState::DoutStart,
            }
        };
        StepResult::Continue
    }

    fn drive_address<W: WireTable>(&self, latch: &mut LatchFabric<impl LatchBackend>) {
        let addr = self.cur_addr | self.overlay_mask;
        latch.set_byte(0, (addr & 0xff) as u8);
        latch.set_byte(1, ((addr >> 8) & 0xff) as u8);
        latch.set_byte(2, ((addr >> 16) & 0x7f) as u8);
    }

    fn drive_data<W: WireTable>(&self, latch: &mut LatchFabric<impl LatchBackend>, value: u16) {
        latch.set_byte(0, (value & 0xff) as u8);
        latch.set_byte(1, ((value >> 8) & 0xff) as u8);
    }

    fn read_data<W: WireTable>(&self, latch: &mut LatchFabric<impl LatchBackend>) -> u16 {
        let low = latch.get_byte(0) as u16;
        let high = latch.get_byte(1) as u16;
        low | (high << 8)
    }

    fn set_wire<W: WireTable>(&self, latch: &mut LatchFabric<impl LatchBackend>, name: &str, asserted: bool) {
        let wire = W::find_out(name).expect("wire present in active table");
        let level = asserted != wire.inverted;
        latch.set_bits(wire.register, 1 << wire.bit, if level { 0xff } else { 0 });
    }

    fn assert_din<W: WireTable>(&self, latch: &mut LatchFabric<impl LatchBackend>) {
        self.set_wire::<W>(latch, "DIN", true);
    }
    fn negate_din<W: WireTable>(&self, latch: &mut LatchFabric<impl LatchBackend>) {
        self.set_wire::<W>(latch, "DIN", false);
    }
    fn assert_dout<W: WireTable>(&self, latch: &mut LatchFabric<impl LatchBackend>) {
        self.set_wire::<W>(latch, "DOUT", true);
    }
    fn negate_dout<W: WireTable>(&self, latch: &mut LatchFabric<impl LatchBackend>) {
        self.set_wire::<W>(latch, "DOUT", false);
    }
    fn negate_sack<W: WireTable>(&self, latch: &mut LatchFabric<impl LatchBackend>) {
        self.set_wire::<W>(latch, "SACK", false);
    }
}

impl Default for DmaMaster {
    fn default() -> Self {
        Self::new()
    }
}
