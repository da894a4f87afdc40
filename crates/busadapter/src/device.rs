//! The seam between the adapter and emulated devices (spec section 3,
//! "device models" — themselves a non-goal of this crate, but the trait
//! they plug into is not).
//!
//! Grounded in the teacher's driver trait shape
//! (`kernel::drivers::traits`): a small, synchronous, fallible interface a
//! concrete device implements, with the adapter doing all the scheduling
//! and threading.

use buscore::mailbox::DeviceRegisterEvent;

/// A device model reacts to register accesses the data-slave machine
/// routed to it, and may in response submit DMA or interrupt requests
/// through the [`crate::dispatch::Dispatcher`] handle it was installed
/// with.
pub trait DeviceModel: Send {
    /// Human-readable name used in adapter log lines.
    fn name(&self) -> &str;

    /// Called once for every pending device-register event this model's
    /// handle owns, after the dispatch loop observes `signalled != acked`.
    /// Implementations must not block indefinitely — the bus master is
    /// held waiting via the reply line for the duration (spec section
    /// 4.3, "Write-side-effect timing").
    fn on_register_event(&mut self, event: &DeviceRegisterEvent);

    /// Called once after the adapter has finished propagating an INIT
    /// pulse, so the device can reset its own internal state.
    fn on_init(&mut self) {}
}
