//! Memory-mapped (XIP) access window.

use super::controller::{CacheTarget, Mode, Smif};
use super::hyperbus::{DeviceConfig, Error};
use super::regs;

/// Handle to the memory-mapped (XIP) window of a HyperBus RAM device.
///
/// While this handle exists the controller is in memory-mapped mode and
/// the device contents are ordinary loads and stores at the window base.
/// Created by [`HyperRam::into_xip`](super::hyperbus::HyperRam::into_xip);
/// [`Self::into_inner`] switches the controller back to command mode.
pub struct XipRam<'a> {
    smif: Smif<'a>,
    config: DeviceConfig,
}

impl<'a> XipRam<'a> {
    pub(crate) fn new(smif: Smif<'a>, config: DeviceConfig) -> Self {
        Self { smif, config }
    }

    /// Base address of the mapped window.
    pub fn base_ptr(&self) -> *mut u8 {
        regs::XIP_BASE as *mut u8
    }

    /// Capacity of the mapped device, in bytes.
    pub fn capacity(&self) -> usize {
        self.config.capacity as usize
    }

    /// Copy bytes out of the mapped window.
    ///
    /// Reads are performed with volatile byte loads so the access goes
    /// to the controller even when the compiler could prove the buffer
    /// unused. Subject to the XIP read caches unless they are disabled.
    pub fn read(&self, offset: u32, buffer: &mut [u8]) -> Result<(), Error> {
        self.check_window(offset, buffer.len())?;

        let base = self.base_ptr();
        for (i, byte) in buffer.iter_mut().enumerate() {
            // Safety: the range was checked against the device capacity,
            // and the window is mapped while this handle exists.
            *byte = unsafe { base.add(offset as usize + i).read_volatile() };
        }
        Ok(())
    }

    /// Copy bytes into the mapped window.
    pub fn write(&mut self, offset: u32, data: &[u8]) -> Result<(), Error> {
        self.check_window(offset, data.len())?;

        let base = self.base_ptr();
        for (i, byte) in data.iter().enumerate() {
            // Safety: see `read`.
            unsafe { base.add(offset as usize + i).write_volatile(*byte) };
        }
        cortex_m::asm::dsb();
        Ok(())
    }

    /// Prepare the window for instruction fetch.
    ///
    /// Disables write merging for the device, invalidates and disables
    /// both XIP read caches, and confirms the controller is still in
    /// memory-mapped mode. Long merged bursts hold the slave selected,
    /// which violates the clock duty-cycle requirement of HyperBus
    /// memories during reads.
    pub fn prepare_execute(&mut self) -> Result<(), Error> {
        self.smif.clear_merge_timeout(self.config.slave_select);
        self.smif.invalidate_cache(CacheTarget::Both);
        self.smif.disable_cache(CacheTarget::Both);

        if self.smif.mode() != Mode::Memory {
            return Err(Error::Controller(super::controller::Error::BadParam));
        }

        cortex_m::asm::dsb();
        cortex_m::asm::isb();
        Ok(())
    }

    /// Switch the controller back to command mode and return it.
    pub fn into_inner(mut self) -> Result<Smif<'a>, Error> {
        self.smif.set_mode(Mode::Command)?;
        Ok(self.smif)
    }

    fn check_window(&self, offset: u32, len: usize) -> Result<(), Error> {
        let end = (offset as usize)
            .checked_add(len)
            .ok_or(Error::OutOfBounds)?;
        if end > self.config.capacity as usize {
            return Err(Error::OutOfBounds);
        }
        Ok(())
    }
}
