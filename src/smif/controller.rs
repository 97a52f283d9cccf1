//! Low level SMIF controller access.

use super::regs::{self, Regs};
use crate::peripherals::SMIF;
use crate::Peri;

/// Low level SMIF controller driver.
///
/// Owns the controller in either command mode, where transactions are
/// sequenced through the command and data FIFOs, or memory-mapped (XIP)
/// mode, where the external memory is presented in the address space.
pub struct Smif<'a> {
    #[allow(
        unused,
        reason = "This field represents unique access to the SMIF peripheral, but we don't actually need the object"
    )]
    smif: Peri<'a, SMIF>,
    regs: Regs,
    timeout_polls: u32,
}

/// SMIF controller configuration.
#[derive(Clone, Copy)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Config {
    /// Minimum slave deselect time between transactions, in interface
    /// cycles. Valid range is 1..=8.
    pub deselect_delay: u8,

    /// Upper bound on register polls for any blocking wait.
    ///
    /// Blocking operations poll controller status in a busy loop; when
    /// this many polls pass without progress the operation fails with
    /// [`Error::Timeout`].
    pub timeout_polls: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            deselect_delay: 1,
            timeout_polls: 100_000,
        }
    }
}

/// Controller operating mode.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Mode {
    /// Transactions are sequenced through the command and data FIFOs.
    Command,
    /// The external memory is mapped into the XIP address window.
    Memory,
}

/// Slave select line of a connected memory device.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SlaveSelect {
    Slave0,
    Slave1,
    Slave2,
    Slave3,
}

impl SlaveSelect {
    /// Device slot index of this slave select line.
    pub const fn slot(self) -> usize {
        match self {
            Self::Slave0 => 0,
            Self::Slave1 => 1,
            Self::Slave2 => 2,
            Self::Slave3 => 3,
        }
    }

    /// One-hot encoding used in command FIFO entries.
    pub(crate) const fn one_hot(self) -> u32 {
        1 << self.slot()
    }
}

/// Data line group routed to a device slot.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DataSelect {
    /// Data lines 0..=1 (and 0..=3 / 0..=7 for wider transfers).
    Sel0,
    /// Data lines 2..=3.
    Sel1,
    /// Data lines 4..=5 (and 4..=7 for quad transfers).
    Sel2,
    /// Data lines 6..=7.
    Sel3,
}

impl DataSelect {
    const fn bits(self) -> u32 {
        match self {
            Self::Sel0 => 0,
            Self::Sel1 => 1,
            Self::Sel2 => 2,
            Self::Sel3 => 3,
        }
    }
}

/// Transfer width of a command FIFO entry.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Width {
    Single,
    Dual,
    Quad,
    Octal,
}

impl Width {
    const fn bits(self) -> u32 {
        match self {
            Self::Single => 0,
            Self::Dual => 1,
            Self::Quad => 2,
            Self::Octal => 3,
        }
    }
}

/// XIP read cache selection.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CacheTarget {
    /// The cache in front of the slow (CPU) AHB port.
    Slow,
    /// The cache in front of the fast (DMA) AHB port.
    Fast,
    /// Both caches.
    Both,
}

/// One entry of the TX command FIFO.
///
/// A transaction is described by a short sequence of entries: TX entries
/// for the command/address phase, an optional dummy-cycle entry, a data
/// count entry, and a deselect entry to terminate the transfer.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CmdWord {
    /// Transmit a single command/address byte to the selected slave.
    Tx {
        byte: u8,
        width: Width,
        slave: SlaveSelect,
    },
    /// Transmit `count` bytes from the TX data FIFO.
    TxCount { count: u16, width: Width },
    /// Receive `count` bytes into the RX data FIFO.
    RxCount { count: u16, width: Width },
    /// Insert dummy cycles between the address and data phases.
    DummyCount { cycles: u8 },
    /// Deselect the slave, terminating the transfer.
    Deselect,
}

// Command word layout: entry kind in bits 31:28, transfer width in bits
// 25:24, slave select (one-hot, TX entries only) in bits 19:16, payload
// in bits 15:0. Count payloads are stored as `count - 1`.
const CMD_KIND_TX: u32 = 0 << 28;
const CMD_KIND_TX_COUNT: u32 = 1 << 28;
const CMD_KIND_RX_COUNT: u32 = 2 << 28;
const CMD_KIND_DUMMY_COUNT: u32 = 3 << 28;
const CMD_KIND_DESELECT: u32 = 4 << 28;
const CMD_WIDTH_SHIFT: u32 = 24;
const CMD_SLAVE_SHIFT: u32 = 16;

impl CmdWord {
    /// Encode this entry into its command FIFO word.
    pub const fn encode(self) -> u32 {
        match self {
            Self::Tx { byte, width, slave } => {
                CMD_KIND_TX
                    | (width.bits() << CMD_WIDTH_SHIFT)
                    | (slave.one_hot() << CMD_SLAVE_SHIFT)
                    | byte as u32
            }
            Self::TxCount { count, width } => {
                CMD_KIND_TX_COUNT
                    | (width.bits() << CMD_WIDTH_SHIFT)
                    | (count as u32).saturating_sub(1)
            }
            Self::RxCount { count, width } => {
                CMD_KIND_RX_COUNT
                    | (width.bits() << CMD_WIDTH_SHIFT)
                    | (count as u32).saturating_sub(1)
            }
            Self::DummyCount { cycles } => {
                CMD_KIND_DUMMY_COUNT | (cycles as u32).saturating_sub(1)
            }
            Self::Deselect => CMD_KIND_DESELECT,
        }
    }
}

/// SMIF controller errors.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error {
    /// A blocking wait exceeded its poll budget.
    Timeout,

    /// The TX command FIFO overflowed.
    CommandFifoOverflow,

    /// The TX data FIFO overflowed.
    TxDataFifoOverflow,

    /// The RX data FIFO underflowed.
    RxDataFifoUnderflow,

    /// A parameter was outside its valid range.
    BadParam,

    /// The operation is not available in the current controller mode.
    Busy,
}

impl<'a> Smif<'a> {
    /// Initialize the SMIF controller in command mode.
    ///
    /// The controller is disabled, reconfigured and re-enabled, mirroring
    /// the required bring-up order of the hardware.
    pub fn new(smif: Peri<'a, SMIF>, config: Config) -> Result<Self, Error> {
        if config.deselect_delay < 1 || config.deselect_delay > 8 || config.timeout_polls == 0 {
            return Err(Error::BadParam);
        }

        let me = Self {
            smif,
            regs: Regs::smif0(),
            timeout_polls: config.timeout_polls,
        };

        me.disable();
        me.regs.modify(regs::CTL, |ctl| {
            let delay = (config.deselect_delay as u32 - 1) << regs::ctl::DESELECT_DELAY_SHIFT;
            (ctl & !(regs::ctl::DESELECT_DELAY_MASK | regs::ctl::XIP_MODE)) | delay
        });

        // Start from a clean slate: drop stale FIFO contents and any
        // latched error conditions from before the reconfiguration.
        me.clear_tx_fifo();
        me.clear_rx_fifo();
        me.regs.write(regs::INTR, u32::MAX);

        me.enable();
        Ok(me)
    }

    /// Enable the controller.
    pub fn enable(&self) {
        self.regs.modify(regs::CTL, |ctl| ctl | regs::ctl::ENABLED);
    }

    /// Disable the controller.
    pub fn disable(&self) {
        self.regs.modify(regs::CTL, |ctl| ctl & !regs::ctl::ENABLED);
    }

    /// Current operating mode.
    pub fn mode(&self) -> Mode {
        if self.regs.read(regs::CTL) & regs::ctl::XIP_MODE != 0 {
            Mode::Memory
        } else {
            Mode::Command
        }
    }

    /// Switch the controller operating mode.
    ///
    /// Switching to memory-mapped mode waits for any in-flight command
    /// transaction to drain first.
    pub fn set_mode(&mut self, mode: Mode) -> Result<(), Error> {
        if mode == Mode::Memory {
            self.wait_idle()?;
        }
        self.regs.modify(regs::CTL, |ctl| match mode {
            Mode::Command => ctl & !regs::ctl::XIP_MODE,
            Mode::Memory => ctl | regs::ctl::XIP_MODE,
        });
        Ok(())
    }

    /// Route a data line group to a device slot.
    pub fn set_data_select(&mut self, slave: SlaveSelect, data: DataSelect) {
        let offset = Regs::device(slave.slot(), regs::DEVICE_CTL);
        self.regs.modify(offset, |ctl| {
            (ctl & !regs::device_ctl::DATA_SEL_MASK)
                | (data.bits() << regs::device_ctl::DATA_SEL_SHIFT)
        });
    }

    /// Disable XIP write merging for a device slot and clear its timeout.
    ///
    /// Merged writes keep the slave selected across bursts, which some
    /// memories cannot tolerate during long reads.
    pub fn clear_merge_timeout(&mut self, slave: SlaveSelect) {
        let offset = Regs::device(slave.slot(), regs::DEVICE_CTL);
        self.regs.modify(offset, |ctl| {
            ctl & !(regs::device_ctl::MERGE_EN | regs::device_ctl::MERGE_TIMEOUT_MASK)
        });
    }

    /// Invalidate the selected XIP read cache(s).
    pub fn invalidate_cache(&mut self, target: CacheTarget) {
        if matches!(target, CacheTarget::Slow | CacheTarget::Both) {
            self.regs.write(regs::SLOW_CA_CMD, regs::ca_cmd::INV);
            while self.regs.read(regs::SLOW_CA_CMD) & regs::ca_cmd::INV != 0 {}
        }
        if matches!(target, CacheTarget::Fast | CacheTarget::Both) {
            self.regs.write(regs::FAST_CA_CMD, regs::ca_cmd::INV);
            while self.regs.read(regs::FAST_CA_CMD) & regs::ca_cmd::INV != 0 {}
        }
    }

    /// Disable the selected XIP read cache(s).
    pub fn disable_cache(&mut self, target: CacheTarget) {
        if matches!(target, CacheTarget::Slow | CacheTarget::Both) {
            self.regs
                .modify(regs::SLOW_CA_CTL, |ctl| ctl & !regs::ca_ctl::ENABLED);
        }
        if matches!(target, CacheTarget::Fast | CacheTarget::Both) {
            self.regs
                .modify(regs::FAST_CA_CTL, |ctl| ctl & !regs::ca_ctl::ENABLED);
        }
    }

    /// Wait for the controller to become idle.
    pub fn wait_idle(&mut self) -> Result<(), Error> {
        self.poll(|r| r.read(regs::STATUS) & regs::status::BUSY == 0)
    }

    /// Enqueue one command FIFO entry.
    ///
    /// Waits for FIFO space, bounded by the configured poll budget. Not
    /// available in memory-mapped mode, where the FIFOs belong to the
    /// XIP state machine.
    pub fn enqueue(&mut self, word: CmdWord) -> Result<(), Error> {
        if self.mode() == Mode::Memory {
            return Err(Error::Busy);
        }

        self.poll(|r| {
            let used = r.read(regs::TX_CMD_FIFO_STATUS) & regs::fifo_status::USED_MASK;
            used < regs::TX_CMD_FIFO_DEPTH
        })?;

        self.regs.write(regs::TX_CMD_FIFO_WR, word.encode());
        self.check_errors()
    }

    /// Clear the TX data FIFO.
    pub fn clear_tx_fifo(&self) {
        self.regs.write(regs::TX_DATA_FIFO_CTL, regs::data_fifo_ctl::CLEAR);
    }

    /// Clear the RX data FIFO.
    pub fn clear_rx_fifo(&self) {
        self.regs.write(regs::RX_DATA_FIFO_CTL, regs::data_fifo_ctl::CLEAR);
    }

    /// Write data into the TX data FIFO, up to the available space.
    ///
    /// Returns the number of bytes accepted.
    pub fn fill_tx_fifo(&mut self, buffer: &[u8]) -> usize {
        let used = self.regs.read(regs::TX_DATA_FIFO_STATUS) & regs::fifo_status::USED_MASK;
        let free = (regs::DATA_FIFO_DEPTH_BYTES - used) as usize;
        let copy_len = buffer.len().min(free);
        let buffer = &buffer[..copy_len];

        let mut chunks = buffer.chunks_exact(4);
        for chunk in &mut chunks {
            let word = u32::from_le_bytes(chunk.try_into().unwrap_or_else(|_| unreachable!()));
            self.regs.write(regs::TX_DATA_FIFO_WR4, word);
        }
        for byte in chunks.remainder() {
            self.regs.write(regs::TX_DATA_FIFO_WR1, *byte as u32);
        }

        copy_len
    }

    /// Drain the RX data FIFO into `buffer`.
    ///
    /// Returns the number of bytes written into the buffer.
    pub fn drain_rx_fifo(&mut self, buffer: &mut [u8]) -> usize {
        let avail = (self.regs.read(regs::RX_DATA_FIFO_STATUS) & regs::fifo_status::USED_MASK) as usize;
        let copy_len = buffer.len().min(avail);
        let buffer = &mut buffer[..copy_len];

        let mut chunks = buffer.chunks_exact_mut(4);
        for chunk in &mut chunks {
            let word = self.regs.read(regs::RX_DATA_FIFO_RD4);
            chunk.copy_from_slice(&word.to_le_bytes());
        }
        for byte in chunks.into_remainder() {
            *byte = self.regs.read(regs::RX_DATA_FIFO_RD1) as u8;
        }

        copy_len
    }

    /// Wait for data to become available in the RX data FIFO.
    ///
    /// Should only be called after enqueueing a command sequence that
    /// receives data from the device.
    pub fn wait_rx_ready(&mut self) -> Result<(), Error> {
        self.poll(|r| r.read(regs::RX_DATA_FIFO_STATUS) & regs::fifo_status::USED_MASK != 0)?;
        self.check_errors()
    }

    /// Wait for space in the TX data FIFO.
    ///
    /// Should only be called after enqueueing a command sequence that
    /// transmits data to the device.
    pub fn wait_tx_ready(&mut self) -> Result<(), Error> {
        self.poll(|r| {
            let used = r.read(regs::TX_DATA_FIFO_STATUS) & regs::fifo_status::USED_MASK;
            used < regs::DATA_FIFO_DEPTH_BYTES
        })?;
        self.check_errors()
    }

    /// Check the interrupt register for FIFO errors, and clear them.
    ///
    /// Only the error bits are cleared; the transfer-request bits are
    /// left for the FIFO helpers to observe through the status registers.
    fn check_errors(&mut self) -> Result<(), Error> {
        let intr = self.regs.read(regs::INTR);

        if intr & regs::intr::TX_CMD_FIFO_OVERFLOW != 0 {
            self.regs.write(regs::INTR, regs::intr::TX_CMD_FIFO_OVERFLOW);
            Err(Error::CommandFifoOverflow)
        } else if intr & regs::intr::TX_DATA_FIFO_OVERFLOW != 0 {
            self.regs.write(regs::INTR, regs::intr::TX_DATA_FIFO_OVERFLOW);
            Err(Error::TxDataFifoOverflow)
        } else if intr & regs::intr::RX_DATA_FIFO_UNDERFLOW != 0 {
            self.regs.write(regs::INTR, regs::intr::RX_DATA_FIFO_UNDERFLOW);
            Err(Error::RxDataFifoUnderflow)
        } else {
            Ok(())
        }
    }

    fn poll(&self, done: impl Fn(&Regs) -> bool) -> Result<(), Error> {
        for _ in 0..self.timeout_polls {
            if done(&self.regs) {
                return Ok(());
            }
        }
        Err(Error::Timeout)
    }

    pub(crate) fn regs(&self) -> &Regs {
        &self.regs
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cmd_word_tx_encoding() {
        let word = CmdWord::Tx {
            byte: 0xA0,
            width: Width::Octal,
            slave: SlaveSelect::Slave0,
        };
        assert_eq!(word.encode(), (3 << 24) | (1 << 16) | 0xA0);

        let word = CmdWord::Tx {
            byte: 0x05,
            width: Width::Single,
            slave: SlaveSelect::Slave2,
        };
        assert_eq!(word.encode(), (0 << 24) | (4 << 16) | 0x05);
    }

    #[test]
    fn test_cmd_word_count_encoding() {
        let word = CmdWord::RxCount {
            count: 64,
            width: Width::Octal,
        };
        assert_eq!(word.encode(), (2 << 28) | (3 << 24) | 63);

        let word = CmdWord::TxCount {
            count: 1,
            width: Width::Single,
        };
        assert_eq!(word.encode(), 1 << 28);
    }

    #[test]
    fn test_cmd_word_dummy_and_deselect_encoding() {
        let word = CmdWord::DummyCount { cycles: 14 };
        assert_eq!(word.encode(), (3 << 28) | 13);

        assert_eq!(CmdWord::Deselect.encode(), 4 << 28);
    }
}
