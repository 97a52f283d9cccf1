//! Hand-crafted SMIF register access.
//!
//! There is no published PAC for this SMIF revision, so the register
//! block is described here by hand: one offset constant per register
//! plus a thin volatile accessor wrapper. Only the registers the
//! drivers in this crate actually touch are modeled.

/// Base address of the SMIF0 MMIO block.
pub const SMIF_BASE: usize = 0x4042_0000;

/// Base address of the memory-mapped (XIP) window.
pub const XIP_BASE: usize = 0x1800_0000;

/// Size of the memory-mapped (XIP) window.
pub const XIP_SIZE: usize = 0x0800_0000;

/// Number of device (memory slot) register sets.
pub const DEVICE_COUNT: usize = 4;

// Register offsets from `SMIF_BASE`.
pub const CTL: usize = 0x000;
pub const STATUS: usize = 0x004;
pub const TX_CMD_FIFO_STATUS: usize = 0x044;
pub const TX_CMD_FIFO_WR: usize = 0x050;
pub const TX_DATA_FIFO_CTL: usize = 0x080;
pub const TX_DATA_FIFO_STATUS: usize = 0x084;
pub const TX_DATA_FIFO_WR4: usize = 0x090;
pub const TX_DATA_FIFO_WR1: usize = 0x094;
pub const RX_DATA_FIFO_CTL: usize = 0x0C0;
pub const RX_DATA_FIFO_STATUS: usize = 0x0C4;
pub const RX_DATA_FIFO_RD4: usize = 0x0D0;
pub const RX_DATA_FIFO_RD1: usize = 0x0D4;
pub const SLOW_CA_CTL: usize = 0x100;
pub const SLOW_CA_CMD: usize = 0x108;
pub const FAST_CA_CTL: usize = 0x180;
pub const FAST_CA_CMD: usize = 0x188;
pub const INTR: usize = 0x7C0;

// Device slot register sets: `DEVICE_BASE + slot * DEVICE_STRIDE`.
pub const DEVICE_BASE: usize = 0x800;
pub const DEVICE_STRIDE: usize = 0x80;
pub const DEVICE_CTL: usize = 0x00;
pub const DEVICE_ADDR: usize = 0x08;
pub const DEVICE_MASK: usize = 0x0C;
pub const DEVICE_RD_DUMMY_CTL: usize = 0x50;

/// `CTL` register bits.
pub mod ctl {
    /// Controller enabled.
    pub const ENABLED: u32 = 1 << 31;
    /// Memory-mapped (XIP) mode. Clear for command (MMIO) mode.
    pub const XIP_MODE: u32 = 1 << 0;
    /// Deselect delay field, in interface cycles minus one.
    pub const DESELECT_DELAY_SHIFT: u32 = 16;
    pub const DESELECT_DELAY_MASK: u32 = 0x7 << DESELECT_DELAY_SHIFT;
}

/// `STATUS` register bits.
pub mod status {
    /// A transfer is in progress.
    pub const BUSY: u32 = 1 << 31;
}

/// FIFO status registers: byte-granular fill level in the low bits.
pub mod fifo_status {
    pub const USED_MASK: u32 = 0x1FF;
}

/// Data FIFO control register bits (`TX_DATA_FIFO_CTL` / `RX_DATA_FIFO_CTL`).
pub mod data_fifo_ctl {
    /// Discard the FIFO contents.
    pub const CLEAR: u32 = 1 << 0;
}

/// Command FIFO geometry.
pub const TX_CMD_FIFO_DEPTH: u32 = 8;

/// Data FIFO geometry, in bytes.
pub const DATA_FIFO_DEPTH_BYTES: u32 = 32;

/// `INTR` register bits. All are write-one-to-clear.
pub mod intr {
    /// Transfer wants more TX data.
    pub const TR_TX_REQ: u32 = 1 << 0;
    /// Transfer has RX data available.
    pub const TR_RX_REQ: u32 = 1 << 1;
    /// Misaligned access through the XIP window.
    pub const XIP_ALIGNMENT_ERROR: u32 = 1 << 2;
    /// Command FIFO overflowed.
    pub const TX_CMD_FIFO_OVERFLOW: u32 = 1 << 3;
    /// TX data FIFO overflowed.
    pub const TX_DATA_FIFO_OVERFLOW: u32 = 1 << 4;
    /// RX data FIFO underflowed.
    pub const RX_DATA_FIFO_UNDERFLOW: u32 = 1 << 5;
}

/// Cache control register bits (`SLOW_CA_CTL` / `FAST_CA_CTL`).
pub mod ca_ctl {
    pub const ENABLED: u32 = 1 << 31;
}

/// Cache command register bits (`SLOW_CA_CMD` / `FAST_CA_CMD`).
pub mod ca_cmd {
    /// Invalidate the whole cache. Hardware clears the bit when done.
    pub const INV: u32 = 1 << 0;
}

/// Device slot `CTL` register bits.
pub mod device_ctl {
    /// Write access to the device is enabled.
    pub const WR_EN: u32 = 1 << 31;
    /// Data line select field.
    pub const DATA_SEL_SHIFT: u32 = 8;
    pub const DATA_SEL_MASK: u32 = 0x3 << DATA_SEL_SHIFT;
    /// XIP write-merge enable.
    pub const MERGE_EN: u32 = 1 << 12;
    /// XIP write-merge timeout field, in cycles.
    pub const MERGE_TIMEOUT_SHIFT: u32 = 13;
    pub const MERGE_TIMEOUT_MASK: u32 = 0x7 << MERGE_TIMEOUT_SHIFT;
}

/// Volatile accessor over the SMIF register block.
#[derive(Copy, Clone)]
pub struct Regs {
    base: usize,
}

impl Regs {
    /// The SMIF0 instance.
    pub const fn smif0() -> Self {
        Self { base: SMIF_BASE }
    }

    pub fn read(&self, offset: usize) -> u32 {
        unsafe { ((self.base + offset) as *const u32).read_volatile() }
    }

    pub fn write(&self, offset: usize, value: u32) {
        unsafe { ((self.base + offset) as *mut u32).write_volatile(value) }
    }

    pub fn modify(&self, offset: usize, f: impl FnOnce(u32) -> u32) {
        self.write(offset, f(self.read(offset)));
    }

    /// Offset of a device slot register.
    pub fn device(slot: usize, reg: usize) -> usize {
        debug_assert!(slot < DEVICE_COUNT);
        DEVICE_BASE + slot * DEVICE_STRIDE + reg
    }
}
