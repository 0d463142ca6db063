use super::bit_reader::BitBuffer;

/// Six-bit value of one armored payload character.
///
/// Valid characters are `'0'..='W'` (0..=39) and `` '`'..='w' `` (40..=63).
pub fn sixbit_value(c: u8) -> Option<u8> {
    match c {
        b'0'..=b'W' => Some(c - 48),
        b'`'..=b'w' => Some(c - 56),
        _ => None,
    }
}

/// Armored payload character for a six-bit value.
pub fn armor_char(v: u8) -> char {
    let v = v & 0x3f;
    if v < 40 { (v + 48) as char } else { (v + 56) as char }
}

/// Six-bit text alphabet: 0..=31 map to `@A..Z[\]^_`, 32..=63 to ` !".../0..9:;<=>?`.
pub fn sixbit_to_ascii(v: u8) -> char {
    let v = v & 0x3f;
    if v < 32 { (v + 64) as char } else { v as char }
}

/// Unpack an armored payload into bits, dropping `fill_bits` padding bits.
///
/// Returns `None` if any character is outside the armoring alphabet.
pub fn dearmor(payload: &str, fill_bits: u8) -> Option<BitBuffer> {
    let mut bits = BitBuffer::new();
    for c in payload.bytes() {
        bits.push(sixbit_value(c)? as u32, 6);
    }
    let meaningful = bits.bit_len().saturating_sub(fill_bits as usize);
    bits.truncate(meaningful);
    Some(bits)
}

/// Armor a bit buffer, returning the payload and the number of fill bits.
pub fn armor(bits: &BitBuffer) -> (String, u8) {
    let fill = (6 - bits.bit_len() % 6) % 6;
    let mut padded = bits.clone();
    padded.push(0, fill);

    let payload = (0..padded.bit_len() / 6)
        .filter_map(|i| padded.read_u32(i * 6, 6))
        .map(|v| armor_char(v as u8))
        .collect();
    (payload, fill as u8)
}
