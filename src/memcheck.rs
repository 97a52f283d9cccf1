//! Buffer pattern, verification and hex-dump helpers for memory demos.

use core::fmt::Write;

use heapless::String;

/// Number of bytes shown per hex-dump row.
pub const BYTES_PER_ROW: usize = 8;

/// Capacity of one formatted row: five characters per byte (`0xNN `).
pub const ROW_CAPACITY: usize = BYTES_PER_ROW * 5;

/// Fill `buffer` with the demo test pattern.
///
/// Byte `i` is set to `i mod 256` for every index except 0, which is
/// left untouched. Callers that need a deterministic first byte should
/// initialize the buffer before filling it.
pub fn fill_pattern(buffer: &mut [u8]) {
    for (i, byte) in buffer.iter_mut().enumerate().skip(1) {
        *byte = i as u8;
    }
}

/// Find the first index at which the two buffers differ.
///
/// A length mismatch counts as a difference at the shorter length.
pub fn first_mismatch(written: &[u8], read_back: &[u8]) -> Option<usize> {
    if let Some(index) = written
        .iter()
        .zip(read_back)
        .position(|(a, b)| a != b)
    {
        return Some(index);
    }
    if written.len() != read_back.len() {
        return Some(written.len().min(read_back.len()));
    }
    None
}

/// Iterator over hex-dump rows of a buffer.
///
/// Yields `ceil(len / 8)` rows; each row formats up to eight bytes as
/// `0xNN ` groups. The demos log one row per line, which reproduces the
/// classic serial-console dump layout.
pub struct HexRows<'a> {
    remaining: &'a [u8],
}

impl<'a> HexRows<'a> {
    pub fn new(buffer: &'a [u8]) -> Self {
        Self { remaining: buffer }
    }
}

impl Iterator for HexRows<'_> {
    type Item = String<ROW_CAPACITY>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining.is_empty() {
            return None;
        }

        let take = self.remaining.len().min(BYTES_PER_ROW);
        let (row, rest) = self.remaining.split_at(take);
        self.remaining = rest;

        let mut line = String::new();
        for byte in row {
            // Capacity is sized for a full row, so this cannot fail.
            let _ = write!(line, "0x{:02X} ", byte);
        }
        Some(line)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pattern_rule() {
        let mut buffer = [0xEEu8; 300];
        fill_pattern(&mut buffer);

        // Index 0 is left untouched.
        assert_eq!(buffer[0], 0xEE);
        for (i, byte) in buffer.iter().enumerate().skip(1) {
            assert_eq!(*byte, i as u8, "index {i}");
        }
    }

    #[test]
    fn test_pattern_on_empty_and_single_byte() {
        fill_pattern(&mut [0u8; 0]);

        let mut one = [0x42u8];
        fill_pattern(&mut one);
        assert_eq!(one, [0x42]);
    }

    #[test]
    fn test_round_trip_matches() {
        let mut tx = [0u8; 64];
        let mut rx = [0u8; 64];
        fill_pattern(&mut tx);
        rx.copy_from_slice(&tx);

        assert_eq!(first_mismatch(&tx, &rx), None);
    }

    #[test]
    fn test_mismatch_is_reported() {
        let mut tx = [0u8; 64];
        fill_pattern(&mut tx);
        let mut rx = tx;
        rx[37] ^= 0x80;

        assert_eq!(first_mismatch(&tx, &rx), Some(37));
    }

    #[test]
    fn test_length_mismatch() {
        assert_eq!(first_mismatch(&[1, 2, 3], &[1, 2]), Some(2));
        assert_eq!(first_mismatch(&[1, 2], &[1, 2, 3]), Some(2));
    }

    #[test]
    fn test_row_count_is_ceil_of_eighths() {
        for (len, rows) in [(0, 0), (1, 1), (7, 1), (8, 1), (9, 2), (63, 8), (64, 8)] {
            let buffer = [0u8; 64];
            assert_eq!(HexRows::new(&buffer[..len]).count(), rows, "len {len}");
        }
    }

    #[test]
    fn test_row_formatting() {
        let buffer = [0x00, 0x01, 0xAB, 0xFF];
        let mut rows = HexRows::new(&buffer);
        assert_eq!(rows.next().unwrap().as_str(), "0x00 0x01 0xAB 0xFF ");
        assert!(rows.next().is_none());
    }

    #[test]
    fn test_full_row_fits_capacity() {
        let buffer = [0xFFu8; BYTES_PER_ROW];
        let row = HexRows::new(&buffer).next().unwrap();
        assert_eq!(row.len(), ROW_CAPACITY);
    }
}
