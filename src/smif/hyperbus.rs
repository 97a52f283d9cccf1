//! HyperBus RAM driver.

use embedded_storage::{ReadStorage, Storage};

use super::controller::{CmdWord, DataSelect, Mode, Smif, SlaveSelect, Width};
use super::regs::{self, Regs};
use super::xip::XipRam;

/// HyperBus RAM driver.
///
/// Sequences blocking read and write bursts through the SMIF command
/// interface. Transfers are halfword granular: the HyperBus data phase
/// moves 16-bit words, so addresses and lengths must be even.
pub struct HyperRam<'a> {
    smif: Smif<'a>,
    config: DeviceConfig,
}

/// Memory slot descriptor of an attached HyperBus RAM device.
#[derive(Clone, Copy)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DeviceConfig {
    /// Slave select line the device is wired to.
    pub slave_select: SlaveSelect,

    /// Data line group routed to the device.
    pub data_select: DataSelect,

    /// Initial access latency, in clock cycles.
    ///
    /// Device dependent; see the latency configuration in the part's
    /// datasheet. Valid range is 1..=31.
    pub dummy_cycles: u8,

    /// Device capacity in bytes. Must be a power of two.
    pub capacity: u32,

    /// Sector size in bytes. Must be a power of two.
    pub sector_size: u32,

    /// Burst type used for the data phase.
    pub burst: BurstType,
}

impl Default for DeviceConfig {
    /// Descriptor for a 64 Mbit part with 256 KiB sectors.
    fn default() -> Self {
        Self {
            slave_select: SlaveSelect::Slave0,
            data_select: DataSelect::Sel0,
            dummy_cycles: 16,
            capacity: 8 * 1024 * 1024,
            sector_size: 256 * 1024,
            burst: BurstType::Continuous,
        }
    }
}

/// HyperBus burst type, encoded in the command/address phase.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum BurstType {
    /// Wrapped burst within an aligned group.
    Wrapped,
    /// Linear burst crossing group boundaries.
    Continuous,
}

/// HyperBus address space, encoded in the command/address phase.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum AddressSpace {
    /// The memory array.
    Memory,
    /// The device register space (ID and configuration registers).
    Register,
}

/// Transfer direction, encoded in the command/address phase.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
enum Access {
    Read,
    Write,
}

/// Encode a HyperBus command/address (CA) phase.
///
/// The CA word is 48 bits, transmitted most significant byte first:
/// bit 47 is the R/W# flag, bit 46 selects the address space, bit 45
/// the burst type. Bits 44:16 carry halfword address bits 31:3 and
/// bits 2:0 carry halfword address bits 2:0; bits 15:3 are reserved.
fn command_address(
    access: Access,
    space: AddressSpace,
    burst: BurstType,
    byte_address: u32,
) -> [u8; 6] {
    let halfword = (byte_address >> 1) as u64;

    let mut ca: u64 = 0;
    if access == Access::Read {
        ca |= 1 << 47;
    }
    if space == AddressSpace::Register {
        ca |= 1 << 46;
    }
    if burst == BurstType::Continuous {
        ca |= 1 << 45;
    }
    ca |= (halfword >> 3) << 16;
    ca |= halfword & 0x7;

    let bytes = ca.to_be_bytes();
    [bytes[2], bytes[3], bytes[4], bytes[5], bytes[6], bytes[7]]
}

/// Error that can occur when accessing a HyperBus RAM device.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error {
    /// The controller reported an error.
    Controller(super::controller::Error),

    /// The device descriptor is inconsistent.
    InvalidConfig,

    /// The address or length is not halfword aligned.
    NotAligned,

    /// The transfer length is zero.
    InvalidLength,

    /// The transfer does not fit within the device capacity.
    OutOfBounds,
}

impl From<super::controller::Error> for Error {
    fn from(value: super::controller::Error) -> Self {
        Self::Controller(value)
    }
}

impl<'a> HyperRam<'a> {
    /// Create a new HyperBus RAM driver and program its device slot.
    ///
    /// The controller must be in command mode. The descriptor is
    /// validated and then programmed into the slot registers, including
    /// the XIP address window and the read latency.
    pub fn new(mut smif: Smif<'a>, config: DeviceConfig) -> Result<Self, Error> {
        if smif.mode() == Mode::Memory {
            return Err(Error::Controller(super::controller::Error::Busy));
        }
        if !config.capacity.is_power_of_two()
            || !config.sector_size.is_power_of_two()
            || config.sector_size > config.capacity
            || config.capacity as usize > regs::XIP_SIZE
        {
            return Err(Error::InvalidConfig);
        }
        if config.dummy_cycles < 1 || config.dummy_cycles > 31 {
            return Err(Error::InvalidConfig);
        }

        smif.set_data_select(config.slave_select, config.data_select);

        let slot = config.slave_select.slot();
        let r = smif.regs();
        r.write(
            Regs::device(slot, regs::DEVICE_ADDR),
            regs::XIP_BASE as u32,
        );
        r.write(
            Regs::device(slot, regs::DEVICE_MASK),
            !(config.capacity - 1),
        );
        r.write(
            Regs::device(slot, regs::DEVICE_RD_DUMMY_CTL),
            (config.dummy_cycles - 1) as u32,
        );
        r.modify(Regs::device(slot, regs::DEVICE_CTL), |ctl| {
            ctl | regs::device_ctl::WR_EN
        });

        Ok(Self { smif, config })
    }

    /// The device descriptor this driver was built with.
    pub fn config(&self) -> &DeviceConfig {
        &self.config
    }

    /// Configured initial access latency, in clock cycles.
    pub fn dummy_cycles(&self) -> u8 {
        self.config.dummy_cycles
    }

    /// Read a burst from the given device address.
    ///
    /// NOTE: The address argument is a device address, not a CPU memory
    /// address. Address and length must be even.
    pub fn read(&mut self, address: u32, buffer: &mut [u8]) -> Result<(), Error> {
        check_transfer(address, buffer.len(), self.config.capacity)?;

        self.smif.wait_idle()?;

        // Make sure no old data remains in the RX FIFO.
        self.smif.clear_rx_fifo();

        self.enqueue_command_address(Access::Read, address)?;
        self.smif.enqueue(CmdWord::DummyCount {
            cycles: self.config.dummy_cycles,
        })?;
        self.smif.enqueue(CmdWord::RxCount {
            count: buffer.len() as u16,
            width: Width::Octal,
        })?;
        self.smif.enqueue(CmdWord::Deselect)?;

        // Drain the RX FIFO until the read buffer is full.
        let mut buffer = buffer;
        while !buffer.is_empty() {
            self.smif.wait_rx_ready()?;
            let read = self.smif.drain_rx_fifo(buffer);
            buffer = &mut buffer[read..];
        }

        self.smif.wait_idle()?;
        Ok(())
    }

    /// Write a burst to the given device address.
    ///
    /// NOTE: The address argument is a device address, not a CPU memory
    /// address. Address and length must be even.
    pub fn write(&mut self, address: u32, data: &[u8]) -> Result<(), Error> {
        check_transfer(address, data.len(), self.config.capacity)?;

        self.smif.wait_idle()?;

        // Make sure no old data remains in the TX FIFO.
        self.smif.clear_tx_fifo();

        self.enqueue_command_address(Access::Write, address)?;
        self.smif.enqueue(CmdWord::TxCount {
            count: data.len() as u16,
            width: Width::Octal,
        })?;
        self.smif.enqueue(CmdWord::Deselect)?;

        // Feed the TX FIFO until all data has been accepted.
        let mut data = data;
        while !data.is_empty() {
            self.smif.wait_tx_ready()?;
            let written = self.smif.fill_tx_fifo(data);
            data = &data[written..];
        }

        self.smif.wait_idle()?;
        Ok(())
    }

    /// Switch the controller to memory-mapped mode and hand out the XIP
    /// window.
    ///
    /// Consuming the driver makes the mode change explicit in ownership:
    /// while the [`XipRam`] handle exists, no command transactions can
    /// be issued. [`XipRam::into_inner`] reverses the switch.
    pub fn into_xip(mut self) -> Result<XipRam<'a>, Error> {
        self.smif.wait_idle()?;
        self.smif.set_mode(Mode::Memory)?;
        Ok(XipRam::new(self.smif, self.config))
    }

    fn enqueue_command_address(&mut self, access: Access, address: u32) -> Result<(), Error> {
        let ca = command_address(access, AddressSpace::Memory, self.config.burst, address);
        for byte in ca {
            self.smif.enqueue(CmdWord::Tx {
                byte,
                width: Width::Octal,
                slave: self.config.slave_select,
            })?;
        }
        Ok(())
    }
}

/// Validate a burst against the halfword-granularity and capacity rules.
fn check_transfer(address: u32, len: usize, capacity: u32) -> Result<(), Error> {
    if len == 0 || len > u16::MAX as usize {
        return Err(Error::InvalidLength);
    }
    if address % 2 != 0 || len % 2 != 0 {
        return Err(Error::NotAligned);
    }
    let end = address.checked_add(len as u32).ok_or(Error::OutOfBounds)?;
    if end > capacity {
        return Err(Error::OutOfBounds);
    }
    Ok(())
}

impl ReadStorage for HyperRam<'_> {
    type Error = Error;

    fn read(&mut self, offset: u32, bytes: &mut [u8]) -> Result<(), Self::Error> {
        HyperRam::read(self, offset, bytes)
    }

    fn capacity(&self) -> usize {
        self.config.capacity as usize
    }
}

impl Storage for HyperRam<'_> {
    fn write(&mut self, offset: u32, bytes: &[u8]) -> Result<(), Self::Error> {
        HyperRam::write(self, offset, bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_address_read_at_zero() {
        let ca = command_address(
            Access::Read,
            AddressSpace::Memory,
            BurstType::Continuous,
            0,
        );
        assert_eq!(ca, [0xA0, 0x00, 0x00, 0x00, 0x00, 0x00]);
    }

    #[test]
    fn test_command_address_write_at_zero() {
        let ca = command_address(
            Access::Write,
            AddressSpace::Memory,
            BurstType::Continuous,
            0,
        );
        assert_eq!(ca, [0x20, 0x00, 0x00, 0x00, 0x00, 0x00]);
    }

    #[test]
    fn test_command_address_low_bits() {
        // Byte address 0x0E is halfword 7, which lives entirely in the
        // low CA bits.
        let ca = command_address(
            Access::Read,
            AddressSpace::Memory,
            BurstType::Wrapped,
            0x0E,
        );
        assert_eq!(ca, [0x80, 0x00, 0x00, 0x00, 0x00, 0x07]);
    }

    #[test]
    fn test_command_address_row_bits() {
        // Byte address 0x10 is halfword 8: bit 3 of the halfword
        // address, i.e. bit 0 of the CA row field at bit 16.
        let ca = command_address(
            Access::Read,
            AddressSpace::Memory,
            BurstType::Wrapped,
            0x10,
        );
        assert_eq!(ca, [0x80, 0x00, 0x00, 0x01, 0x00, 0x00]);
    }

    #[test]
    fn test_check_transfer_rules() {
        const CAP: u32 = 8 * 1024 * 1024;

        assert_eq!(check_transfer(0, 64, CAP), Ok(()));
        assert_eq!(check_transfer(0, 0, CAP), Err(Error::InvalidLength));
        assert_eq!(check_transfer(1, 64, CAP), Err(Error::NotAligned));
        assert_eq!(check_transfer(0, 63, CAP), Err(Error::NotAligned));
        assert_eq!(check_transfer(CAP - 2, 2, CAP), Ok(()));
        assert_eq!(check_transfer(CAP, 2, CAP), Err(Error::OutOfBounds));
        assert_eq!(check_transfer(u32::MAX - 1, 4, CAP), Err(Error::OutOfBounds));
    }

    #[test]
    fn test_command_address_register_space() {
        let ca = command_address(
            Access::Read,
            AddressSpace::Register,
            BurstType::Wrapped,
            0,
        );
        assert_eq!(ca, [0xC0, 0x00, 0x00, 0x00, 0x00, 0x00]);
    }
}
