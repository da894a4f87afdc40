//! Adapter startup sequence (spec section 4.6): validate configuration,
//! configure the emulated-memory window, prime the register-handle table,
//! and tri-state the backplane via the latch fabric's output-enable.
//!
//! Loading the coprocessor firmware image is an external boot-time step
//! (spec non-goal) — this sequence assumes the coprocessor is already
//! running and the mailbox is reachable, and only fails with
//! [`AdapterError::FirmwareMissing`] / [`AdapterError::MailboxMappingFailed`]
//! if the caller reports those preconditions unmet.

use buscore::latch::{LatchBackend, LatchFabric};
use buscore::regmap::AddressMap;

use crate::config::BusConfig;
use crate::error::{AdapterError, Result};
use crate::registry::RegisterHandleMap;

/// Preconditions the caller must have already established before startup
/// can proceed — firmware load and shared-memory mapping happen outside
/// this crate (spec non-goals).
pub struct StartupPreconditions {
    pub firmware_loaded: bool,
    pub mailbox_mapped: bool,
}

/// Run the startup sequence, gating all outgoing latch drivers (tri-state)
/// both before and after, so a diagnostic session never leaves the
/// backplane half-driven on failure.
pub fn startup<B: LatchBackend>(config: &BusConfig, latch: &mut LatchFabric<B>, preconditions: &StartupPreconditions) -> Result<RegisterHandleMap> {
    if !preconditions.firmware_loaded {
        return Err(AdapterError::FirmwareMissing);
    }
    if !preconditions.mailbox_mapped {
        return Err(AdapterError::MailboxMappingFailed);
    }
    config.validate()?;

    latch.output_enable(false);
    latch.latch_init();

    let map = AddressMap::new(config.memory_start, config.memory_limit, config.iopage_start)?;
    let registry = RegisterHandleMap::new(map);

    latch.output_enable(true);

    Ok(registry)
}
