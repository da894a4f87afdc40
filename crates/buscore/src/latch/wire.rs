//! Per-variant backplane wire table (spec section 6, "Backplane wire table").
//!
//! A build-time constant, one table per variant, enumerating every signal
//! the latch fabric multiplexes: which register and bit it lives in, which
//! direction it is driven, whether the driver inverts it, and a
//! human-readable name/trace string for diagnostics.

/// Direction a wire is driven in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Latch fabric drives the backplane (coprocessor is a master/slave).
    Out,
    /// Backplane drives the latch fabric (coprocessor observes).
    In,
}

/// One signal's location in the latch register bank.
#[derive(Debug, Clone, Copy)]
pub struct WireInfo {
    pub register: u8,
    pub bit: u8,
    pub direction: Direction,
    pub inverted: bool,
    pub name: &'static str,
    pub trace: &'static str,
}

/// Per-register bit masks: which bits carry real signals, which of those
/// may be exercised in loopback, and which the output driver inverts.
#[derive(Debug, Clone, Copy)]
pub struct RegisterInfo {
    pub valid_mask: u8,
    pub testable_mask: u8,
    pub inverted_mask: u8,
}

impl RegisterInfo {
    pub const EMPTY: RegisterInfo = RegisterInfo { valid_mask: 0, testable_mask: 0, inverted_mask: 0 };
}

/// A build-time-selected backplane variant's complete wire table.
///
/// Each driven signal is reachable by exactly one write tuple and, if
/// readable, exactly one read tuple (spec section 3 invariant) — callers
/// rely on `find_out`/`find_in` returning at most one match.
pub trait WireTable {
    const REGISTERS: [RegisterInfo; crate::constants::LATCH_REGISTER_COUNT];
    fn wires() -> &'static [WireInfo];

    fn find_out(name: &str) -> Option<&'static WireInfo> {
        Self::wires().iter().find(|w| w.name == name && w.direction == Direction::Out)
    }

    fn find_in(name: &str) -> Option<&'static WireInfo> {
        Self::wires().iter().find(|w| w.name == name && w.direction == Direction::In)
    }
}
