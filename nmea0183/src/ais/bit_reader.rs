/// Read `bit_len` (1..=32) bits starting at `bit_offset`, MSB first.
///
/// Returns `None` when the range falls outside `buf`.
pub fn read_bits(buf: &[u8], bit_offset: usize, bit_len: usize) -> Option<u32> {
    if bit_len == 0 || bit_len > 32 {
        return None;
    }
    let end = bit_offset.checked_add(bit_len)?;
    if end > buf.len() * 8 {
        return None;
    }

    let mut value: u32 = 0;
    for bit in bit_offset..end {
        let byte = buf[bit / 8];
        let set = (byte >> (7 - (bit % 8))) & 1;
        value = (value << 1) | set as u32;
    }
    Some(value)
}

/// Bits packed MSB first, with an explicit count of meaningful bits.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BitBuffer {
    bytes: Vec<u8>,
    bit_len: usize,
}

impl BitBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bit_len(&self) -> usize {
        self.bit_len
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Append the low `bit_len` bits of `value`, MSB first.
    pub fn push(&mut self, value: u32, bit_len: usize) {
        for i in (0..bit_len.min(32)).rev() {
            let bit = ((value >> i) & 1) as u8;
            if self.bit_len % 8 == 0 {
                self.bytes.push(0);
            }
            if bit == 1 {
                let idx = self.bit_len / 8;
                self.bytes[idx] |= 1 << (7 - (self.bit_len % 8));
            }
            self.bit_len += 1;
        }
    }

    /// Drop trailing bits (AIS fill bits).
    pub fn truncate(&mut self, bit_len: usize) {
        if bit_len < self.bit_len {
            self.bit_len = bit_len;
            self.bytes.truncate(bit_len.div_ceil(8));
        }
    }

    /// Unsigned field; `None` if it extends past the meaningful bits.
    pub fn read_u32(&self, bit_offset: usize, bit_len: usize) -> Option<u32> {
        if bit_offset + bit_len > self.bit_len {
            return None;
        }
        read_bits(&self.bytes, bit_offset, bit_len)
    }

    /// Two's complement signed field.
    pub fn read_i32(&self, bit_offset: usize, bit_len: usize) -> Option<i32> {
        let raw = self.read_u32(bit_offset, bit_len)?;
        if bit_len == 32 {
            return Some(raw as i32);
        }
        let sign_bit = 1u32 << (bit_len - 1);
        if raw & sign_bit != 0 {
            Some((raw as i64 - (1i64 << bit_len)) as i32)
        } else {
            Some(raw as i32)
        }
    }

    /// `chars` six-bit characters; trailing `@` padding and spaces trimmed.
    pub fn read_text(&self, bit_offset: usize, chars: usize) -> Option<String> {
        let mut text = String::with_capacity(chars);
        for i in 0..chars {
            let v = self.read_u32(bit_offset + i * 6, 6)? as u8;
            text.push(crate::ais::armor::sixbit_to_ascii(v));
        }
        Some(text.trim_end_matches(['@', ' ']).to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_bits_msb_first() {
        let buf = [0b1010_1100, 0b0101_0011];
        assert_eq!(read_bits(&buf, 0, 1), Some(1));
        assert_eq!(read_bits(&buf, 0, 4), Some(0b1010));
        assert_eq!(read_bits(&buf, 4, 8), Some(0b1100_0101));
        assert_eq!(read_bits(&buf, 0, 16), Some(0b1010_1100_0101_0011));
    }

    #[test]
    fn test_read_bits_bounds_checked() {
        let buf = [0xff, 0xff];
        assert_eq!(read_bits(&buf, 10, 7), None);
        assert_eq!(read_bits(&buf, 0, 0), None);
        assert_eq!(read_bits(&[0u8; 8], 0, 33), None);
        assert_eq!(read_bits(&buf, usize::MAX, 2), None);
        assert_eq!(read_bits(&buf, 9, 7), Some(0x7f));
    }

    #[test]
    fn test_push_then_read() {
        let mut bits = BitBuffer::new();
        bits.push(1, 6);
        bits.push(477553000, 30);
        bits.push(0b101, 3);
        assert_eq!(bits.bit_len(), 39);
        assert_eq!(bits.read_u32(0, 6), Some(1));
        assert_eq!(bits.read_u32(6, 30), Some(477553000));
        assert_eq!(bits.read_u32(36, 3), Some(0b101));
        assert_eq!(bits.read_u32(36, 4), None);
    }

    #[test]
    fn test_signed_fields() {
        let mut bits = BitBuffer::new();
        bits.push((-73_407_500i32 as u32) & 0x0fff_ffff, 28);
        bits.push(28_549_700, 27);
        assert_eq!(bits.read_i32(0, 28), Some(-73_407_500));
        assert_eq!(bits.read_i32(28, 27), Some(28_549_700));
    }

    #[test]
    fn test_truncate_hides_fill_bits() {
        let mut bits = BitBuffer::new();
        bits.push(0xff, 8);
        bits.push(0x3f, 6);
        bits.truncate(10);
        assert_eq!(bits.bit_len(), 10);
        assert_eq!(bits.read_u32(8, 2), Some(3));
        assert_eq!(bits.read_u32(8, 3), None);
    }
}
