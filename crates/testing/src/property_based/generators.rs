//! Helpers that turn raw strategy output into the domain objects the
//! invariant checks operate on.

use buscore::regmap::{AddressMap, RegisterDescriptor};

/// Build a register with `writable_mask` and a value already inside the
/// writable bits, so `apply_write_word` round-trips are meaningful.
pub fn register_with_mask(writable_mask: u16) -> RegisterDescriptor {
    RegisterDescriptor::device(0, writable_mask, buscore::regmap::EventFlags::empty(), 1, 0)
}

/// A memory/I/O-page split with `memory_limit` guaranteed not to overlap
/// `iopage_start`, clamped into range so generated addresses stay
/// meaningful.
pub fn address_map(memory_limit: u32, iopage_start: u32) -> Option<AddressMap> {
    let iopage_start = iopage_start.max(memory_limit);
    AddressMap::new(0, memory_limit, iopage_start).ok()
}
