//! `proptest` strategies for the value ranges the bus engine cares about:
//! 16-bit words, 22-bit addresses, and register write masks.

use proptest::prelude::*;

pub fn word() -> impl Strategy<Value = u16> {
    any::<u16>()
}

/// 22-bit address, the widest variant this crate supports.
pub fn address22() -> impl Strategy<Value = u32> {
    0u32..(1 << 22)
}

pub fn writable_mask() -> impl Strategy<Value = u16> {
    any::<u16>()
}

/// A handful of words, sized like a realistic block transfer rather than
/// the full `MAX_DMA_WORDS` buffer.
pub fn word_block() -> impl Strategy<Value = Vec<u16>> {
    prop::collection::vec(any::<u16>(), 1..=16)
}
