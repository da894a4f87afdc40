//! Canonical register-handle map owned by the adapter (spec section 4.6):
//! device-install allocates a handle, enters it into the I/O-page table at
//! the register's bus address, and stores the descriptor; device-uninstall
//! reverses this.

use buscore::constants::{HANDLE_NONE, HANDLE_ROM};
use buscore::regmap::{AddressMap, RegisterDescriptor, RegisterFile};

use crate::error::{AdapterError, Result};

/// One device's set of installed registers, tracked so `uninstall` can find
/// and release every handle it allocated without the caller having to
/// remember them.
pub struct DeviceRegistration {
    pub device_handle: u8,
    handles: Vec<(u32, u8)>,
}

/// Owns the [`RegisterFile`] descriptor storage and the [`AddressMap`]
/// handle table, and hands out fresh handles on install.
pub struct RegisterHandleMap {
    registers: RegisterFile,
    address_map: AddressMap,
    next_handle: u16,
}

impl RegisterHandleMap {
    pub fn new(address_map: AddressMap) -> Self {
        Self { registers: RegisterFile::new(), address_map, next_handle: 1 }
    }

    /// Allocate a handle, store `descriptor` under it, and map `addr` to
    /// that handle in the I/O page table.
    pub fn install(&mut self, addr: u32, descriptor: RegisterDescriptor) -> Result<u8> {
        let handle = self.allocate_handle()?;
        self.registers.install(handle, descriptor).map_err(AdapterError::from)?;
        self.address_map.set_handle(addr, handle).map_err(AdapterError::from)?;
        Ok(handle)
    }

    fn allocate_handle(&mut self) -> Result<u8> {
        while self.next_handle < HANDLE_ROM as u16 {
            let candidate = self.next_handle as u8;
            self.next_handle += 1;
            if candidate != HANDLE_NONE && self.registers.get(candidate).is_none() {
                return Ok(candidate);
            }
        }
        Err(AdapterError::HandleTableFull)
    }

    /// Remove every register address this device owns and release the
    /// descriptor storage. `addrs` are the bus addresses passed to
    /// `install` for this device, in the same order.
    pub fn uninstall(&mut self, handle: u8, addrs: &[u32]) -> Result<()> {
        if self.registers.get(handle).is_none() {
            return Err(AdapterError::UnknownHandle(handle));
        }
        for &addr in addrs {
            self.address_map.set_handle(addr, HANDLE_NONE).map_err(AdapterError::from)?;
        }
        Ok(())
    }

    pub fn registers(&self) -> &RegisterFile {
        &self.registers
    }

    pub fn registers_mut(&mut self) -> &mut RegisterFile {
        &mut self.registers
    }

    pub fn address_map(&self) -> &AddressMap {
        &self.address_map
    }

    pub fn reset_all(&mut self) {
        self.registers.reset_all();
    }
}

impl DeviceRegistration {
    pub fn new(device_handle: u8) -> Self {
        Self { device_handle, handles: Vec::new() }
    }

    pub fn track(&mut self, addr: u32, handle: u8) {
        self.handles.push((addr, handle));
    }

    pub fn addrs(&self) -> Vec<u32> {
        self.handles.iter().map(|(addr, _)| *addr).collect()
    }
}
