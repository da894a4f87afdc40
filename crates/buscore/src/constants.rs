//! Build-time constants shared across the latch fabric, mailbox, and state
//! machines. Mirrors the original firmware's `mailbox.h` / `tuning.h`
//! constants, scaled down where the original value only matters for a
//! physical DDR buffer size (documented as an Open Question resolution in
//! `DESIGN.md`).

/// Maximum number of 16-bit words buffered in a single mailbox DMA request.
/// The original PRU firmware sizes this at 8*512 words against a large DDR
/// staging buffer; this rewrite targets a fixed in-mailbox array sized for
/// realistic block transfers and test fixtures.
pub const MAX_DMA_WORDS: usize = 1024;

/// Maximum words transferred in a single DMA-master block before the state
/// machine must re-arbitrate (QBUS). UNIBUS does not sub-divide blocks.
pub const QBUS_MAX_BLOCK_WORDS: usize = 8;

/// Sentinel `ifs_priority_level` meaning "CPU is between INTR receipt and
/// fetch of the next PSW" — interrupts may not be granted while this value
/// is current (spec section 4.4).
pub const CPU_PRIORITY_FETCHING: u8 = 0xff;

/// Interrupt request levels, low to high.
pub const INTERRUPT_LEVELS: [u8; 4] = [4, 5, 6, 7];

/// Size in words of the I/O page (top of the address space).
pub const IO_PAGE_WORDS: usize = 4096;

/// Register handle meaning "address not implemented".
pub const HANDLE_NONE: u8 = 0;

/// Register handle meaning "served from the memory region" (ROM-backed).
pub const HANDLE_ROM: u8 = 255;

/// Upper bound on installed register descriptors; keeping this a power of
/// two lets descriptor indexing be a shift rather than a multiply.
pub const MAX_REGISTERS: usize = 256;

/// Number of latch fabric registers.
pub const LATCH_REGISTER_COUNT: usize = 8;

/// Default external bus-reply timeout during DMA, in microseconds.
pub const DEFAULT_REPLY_TIMEOUT_US: u32 = 10;

/// Default SACK-acceptance timeout when emulating the arbitrator, in milliseconds.
pub const DEFAULT_SACK_TIMEOUT_MS: u32 = 10;

/// Default INIT event-ack elongation timeout, in milliseconds. The source
/// carries variant-specific comments suggesting up to 50ms can be needed;
/// 10ms is the documented default and callers should log if it is reached.
pub const DEFAULT_INIT_ELONGATION_TIMEOUT_MS: u32 = 10;
