//! Host-side ARM adapter (spec section 4.6): marshals requests and events
//! between emulated devices and the real-time bus engine in [`buscore`].
//!
//! This crate never touches GPIO/I2C, disk images, or device models
//! themselves (spec non-goals) — it owns the mailbox, the dispatch loop,
//! and the register-handle map, and exposes the seams (`DeviceModel`,
//! `Dispatcher`) those excluded layers plug into.

pub mod config;
pub mod device;
pub mod dispatch;
pub mod error;
pub mod mailbox_handle;
pub mod registry;
pub mod requests;
pub mod startup;

pub use config::BusConfig;
pub use device::DeviceModel;
pub use dispatch::{DispatchLoop, Dispatcher};
pub use error::{AdapterError, Result};
