//! HyperRAM read/write demo with an execute-in-place smoke test.
//!
//! Brings up the SMIF controller and the attached HyperRAM, performs a
//! read, a write and a read-back verification through the command
//! interface, then switches to memory-mapped mode, reads through the
//! XIP window and executes a small function placed in external memory.

#![no_std]
#![no_main]

use psoc6_smif::memcheck::{self, HexRows};
use psoc6_smif::smif::controller::{Config as SmifConfig, Smif};
use psoc6_smif::smif::hyperbus::{DeviceConfig, HyperRam};
use {defmt_rtt as _, panic_probe as _};

const TRANSFER_SIZE: usize = 64;
const DUMMY_CYCLE_COUNT: u8 = 14;

const SECTOR_SIZE: u32 = 256 * 1024;
const TEST_SECTOR: u32 = 0;
const TEST_ADDRESS: u32 = TEST_SECTOR * SECTOR_SIZE;

/// `adds r0, #1; bx lr`: the function body executed from the mapped
/// external memory.
const INCREMENT_THUMB: [u8; 4] = [0x01, 0x30, 0x70, 0x47];
const XIP_CODE_OFFSET: u32 = TEST_ADDRESS + 0x100;
const XIP_TEST_INPUT: u8 = 20;

fn dump(label: &str, buffer: &[u8]) {
    defmt::info!("{=str} ({=usize} bytes):", label, buffer.len());
    for row in HexRows::new(buffer) {
        defmt::info!("  {=str}", row.as_str());
    }
}

#[embassy_executor::main]
async fn main(_spawner: embassy_executor::Spawner) {
    let p = psoc6_smif::init(Default::default());

    defmt::info!("****************** HyperRAM Read and Write ******************");

    let smif = match Smif::new(p.SMIF, SmifConfig::default()) {
        Ok(smif) => smif,
        Err(e) => defmt::panic!("SMIF init failed: {}", e),
    };

    let config = DeviceConfig {
        dummy_cycles: DUMMY_CYCLE_COUNT,
        sector_size: SECTOR_SIZE,
        ..Default::default()
    };
    let mut ram = match HyperRam::new(smif, config) {
        Ok(ram) => ram,
        Err(e) => defmt::panic!("HyperRAM slot init failed: {}", e),
    };

    let mut tx_buf = [0u8; TRANSFER_SIZE];
    let mut rx_buf = [0u8; TRANSFER_SIZE];

    match ram.read(TEST_ADDRESS, &mut rx_buf) {
        Ok(()) => defmt::info!("1. Reading data before write - Success"),
        Err(e) => defmt::panic!("1. Reading data before write - Fail: {}", e),
    }
    dump("Received data before write", &rx_buf);

    memcheck::fill_pattern(&mut tx_buf);
    match ram.write(TEST_ADDRESS, &tx_buf) {
        Ok(()) => defmt::info!("2. Writing data to memory - Success"),
        Err(e) => defmt::panic!("2. Writing data to memory - Fail: {}", e),
    }
    dump("Written data", &tx_buf);

    rx_buf.fill(0);
    match ram.read(TEST_ADDRESS, &mut rx_buf) {
        Ok(()) => defmt::info!("3. Reading back for verification - Success"),
        Err(e) => defmt::panic!("3. Reading back for verification - Fail: {}", e),
    }
    dump("Received data", &rx_buf);

    // A data mismatch is an observation about the memory, not a driver
    // failure; report it and carry on.
    match memcheck::first_mismatch(&tx_buf, &rx_buf) {
        None => defmt::info!("SUCCESS: Read data matches with written data!"),
        Some(index) => defmt::warn!(
            "Read data does not match with written data at index {=usize}. Read/Write operation failed.",
            index
        ),
    }

    // Switch over to memory-mapped mode and read the same bytes as
    // ordinary loads.
    let mut xip = match ram.into_xip() {
        Ok(xip) => xip,
        Err(e) => defmt::panic!("Switch to memory-mapped mode failed: {}", e),
    };

    rx_buf.fill(0);
    match xip.read(TEST_ADDRESS, &mut rx_buf) {
        Ok(()) => dump("4. XIP read", &rx_buf),
        Err(e) => defmt::panic!("4. XIP read - Fail: {}", e),
    }

    defmt::info!("Verify execution from memory in XIP mode");

    if let Err(e) = xip.write(XIP_CODE_OFFSET, &INCREMENT_THUMB) {
        defmt::panic!("Placing code in external memory failed: {}", e);
    }
    if let Err(e) = xip.prepare_execute() {
        defmt::panic!("Preparing XIP window for execution failed: {}", e);
    }

    // Bit 0 marks the target as Thumb code.
    let entry = xip.base_ptr() as usize + XIP_CODE_OFFSET as usize;
    let increment: extern "C" fn(u8) -> u8 =
        unsafe { core::mem::transmute(entry | 1) };

    let result = increment(XIP_TEST_INPUT);
    if result == XIP_TEST_INPUT + 1 {
        defmt::info!("XIP read functionality - Success");
    } else {
        defmt::warn!(
            "XIP read functionality - Fail (got {=u8}, expected {=u8})",
            result,
            XIP_TEST_INPUT + 1
        );
    }

    defmt::info!("Completed SMIF HyperRAM demo verification");

    loop {
        cortex_m::asm::wfe();
    }
}
