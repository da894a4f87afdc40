//! Real-time backplane bus engine.
//!
//! This crate is the coprocessor-domain half of the bus engine: the latch
//! fabric abstraction, the mailbox layout shared with the host adapter, the
//! register/address map, and the data-slave / DMA-master / arbitration /
//! interrupt / initialization state machines. It never allocates on the
//! heap and never blocks — every state machine is a stateless transition
//! function dispatched with a `match`, returning the next state.
#![no_std]

#[cfg(all(feature = "unibus", feature = "qbus"))]
compile_error!("select exactly one of the `unibus` / `qbus` backplane variant features");
#[cfg(not(any(feature = "unibus", feature = "qbus")))]
compile_error!("select exactly one of the `unibus` / `qbus` backplane variant features");

pub mod constants;
pub mod error;
pub mod latch;
pub mod mailbox;
pub mod regmap;
pub mod sm;

pub use error::{BusError, Result};
