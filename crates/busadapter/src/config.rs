//! Adapter configuration, validated once at construction time (spec section
//! 6, "Configuration"): bus address width, the emulated-memory window, the
//! arbitration mode, and the tunable timeouts.

use buscore::constants::{DEFAULT_INIT_ELONGATION_TIMEOUT_MS, DEFAULT_REPLY_TIMEOUT_US, DEFAULT_SACK_TIMEOUT_MS};
use buscore::sm::arbitration::ArbitrationMode;

use crate::error::{AdapterError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BusVariant {
    Unibus,
    Qbus,
}

/// Adapter-wide configuration. Constructed once at startup; every field is
/// validated in [`BusConfig::validate`] before the adapter touches the
/// mailbox.
#[derive(Debug, Clone)]
pub struct BusConfig {
    pub variant: BusVariant,
    /// 16, 18, or 22 address bits, depending on the attached backplane.
    pub address_bits: u8,
    pub memory_start: u32,
    pub memory_limit: u32,
    pub iopage_start: u32,
    pub arbitration_mode: ArbitrationMode,
    pub reply_timeout_us: u32,
    pub sack_timeout_ms: u32,
    pub init_elongation_timeout_ms: u32,
}

impl BusConfig {
    pub fn new(variant: BusVariant, address_bits: u8, iopage_start: u32) -> Self {
        Self {
            variant,
            address_bits,
            memory_start: 0,
            memory_limit: 0,
            iopage_start,
            arbitration_mode: ArbitrationMode::Device,
            reply_timeout_us: DEFAULT_REPLY_TIMEOUT_US,
            sack_timeout_ms: DEFAULT_SACK_TIMEOUT_MS,
            init_elongation_timeout_ms: DEFAULT_INIT_ELONGATION_TIMEOUT_MS,
        }
    }

    pub fn with_memory_window(mut self, start: u32, limit: u32) -> Self {
        self.memory_start = start;
        self.memory_limit = limit;
        self
    }

    pub fn with_arbitration_mode(mut self, mode: ArbitrationMode) -> Self {
        self.arbitration_mode = mode;
        self
    }

    /// Validate address width, variant match, and that the memory window
    /// does not overlap the I/O page, per spec section 4.6 ("At startup the
    /// adapter validates the bus address width...").
    pub fn validate(&self) -> Result<()> {
        match self.address_bits {
            16 | 18 | 22 => {}
            _ => return Err(AdapterError::InvalidConfiguration("address_bits must be 16, 18, or 22")),
        }
        if self.memory_limit > 0 && self.memory_limit <= self.memory_start {
            return Err(AdapterError::InvalidConfiguration("memory_limit must exceed memory_start"));
        }
        if self.memory_limit > self.iopage_start {
            return Err(AdapterError::InvalidConfiguration("emulated memory overlaps the I/O page"));
        }
        #[cfg(feature = "unibus")]
        if self.variant != BusVariant::Unibus {
            return Err(AdapterError::InvalidConfiguration("crate built for unibus, config requests qbus"));
        }
        #[cfg(feature = "qbus")]
        if self.variant != BusVariant::Qbus {
            return Err(AdapterError::InvalidConfiguration("crate built for qbus, config requests unibus"));
        }
        Ok(())
    }
}
