//! Bus engine error kinds (spec section 7).
//!
//! Errors discovered inside the coprocessor domain never unwind or use an
//! exception-like mechanism — they are recorded in the mailbox status
//! fields and picked up by the adapter. This type is what those status
//! fields decode into.

/// Error kinds produced by the real-time bus engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BusError {
    /// External slave did not reply within the configured timeout during a DMA.
    BusTimeout { offending_address: u32 },
    /// INIT interrupted an in-flight DMA.
    InitAbort,
    /// A granted request did not produce SACK within the SACK timeout
    /// (CPU-arbitrator mode only).
    ArbitrationSackTimeout,
    /// Address width unset, variant mismatch, register table full, or
    /// overlapping address regions. Fatal for the call, not the process.
    InvalidConfiguration(&'static str),
    /// Diagnostic-only: a loopback read did not match the written value.
    LatchMismatch { register: u8, bit: u8, expected: bool, actual: bool },
}

impl BusError {
    /// Short machine-readable name, used by the adapter when logging.
    pub const fn name(&self) -> &'static str {
        match self {
            BusError::BusTimeout { .. } => "bus-timeout",
            BusError::InitAbort => "init-abort",
            BusError::ArbitrationSackTimeout => "arbitration-sack-timeout",
            BusError::InvalidConfiguration(_) => "invalid-configuration",
            BusError::LatchMismatch { .. } => "latch-mismatch",
        }
    }
}

pub type Result<T> = core::result::Result<T, BusError>;
