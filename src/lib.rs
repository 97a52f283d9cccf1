//! SMIF (Serial Memory Interface) driver for PSoC 6 family devices.
//!
//! The SMIF block is the on-chip controller for external serial memories.
//! This crate provides a blocking driver for the controller itself, a
//! HyperBus RAM device driver on top of it, and an ownership-scoped handle
//! for the memory-mapped (XIP) address window.

#![no_std]
#![deny(unsafe_op_in_unsafe_fn)]

pub mod memcheck;
pub mod smif;

pub use embassy_hal_internal::{Peri, PeripheralType};

embassy_hal_internal::peripherals! {
    SMIF,
}

/// Device initialization configuration.
///
/// Clock and pin routing are owned by the boot firmware on this family,
/// so there is nothing to configure here yet.
#[derive(Clone, Copy, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[non_exhaustive]
pub struct Config {}

/// Initialize the HAL and return the peripheral singletons.
///
/// Panics if called more than once.
pub fn init(_config: Config) -> Peripherals {
    Peripherals::take()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_hands_out_singletons() {
        // Goes through the full singleton machinery, so it also keeps
        // the peripherals! expansion and its critical-section use honest.
        let p = init(Config::default());
        let _smif: Peri<'_, peripherals::SMIF> = p.SMIF;
        assert!(Peripherals::try_take().is_none());
    }
}
