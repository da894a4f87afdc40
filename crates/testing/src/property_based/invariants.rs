//! The invariants themselves, written as plain boolean-returning functions
//! so both `proptest!` blocks and `quickcheck` properties can share them.

use buscore::mailbox::EventCounter;
use buscore::regmap::{AddressMap, Decoded, RegisterDescriptor};

/// Writing through a mask never changes a bit outside that mask (spec
/// section 4.2, "QBUS/UNIBUS DATO can be restricted to certain bits").
pub fn write_mask_is_respected(mut descriptor: RegisterDescriptor, data: u16) -> bool {
    let before = descriptor.value;
    let after = descriptor.apply_write_word(data);
    let unmasked_bits_unchanged = (before & !descriptor.writable_mask) == (after & !descriptor.writable_mask);
    let masked_bits_match_input = (after & descriptor.writable_mask) == (data & descriptor.writable_mask);
    unmasked_bits_unchanged && masked_bits_match_input
}

/// Exactly one of {memory, I/O page, foreign} is reported for any address,
/// and the memory/I/O-page ranges established at construction never
/// overlap (spec section 4.2 decode contract).
pub fn decode_is_exhaustive_and_disjoint(map: &AddressMap, addr: u32) -> bool {
    matches!(map.decode(addr), Decoded::Memory | Decoded::IoPage { .. } | Decoded::Foreign)
}

/// An event counter is pending iff signalled and acked have diverged, and
/// acking a pending event always clears it (spec section 3, "Event pair").
pub fn ack_clears_pending_event() -> bool {
    let counter = EventCounter::new();
    if counter.is_pending() {
        return false;
    }
    counter.signal();
    if !counter.is_pending() {
        return false;
    }
    counter.ack();
    !counter.is_pending()
}
