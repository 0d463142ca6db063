/// Furthest position of the `*` delimiter accepted in a sentence.
pub const MAX_DELIMITER_OFFSET: usize = 80;

/// XOR of every byte in `data`.
pub fn calculate(data: &[u8]) -> u8 {
    data.iter().fold(0u8, |acc, b| acc ^ b)
}

/// Validate the `*hh` checksum of a complete sentence (sentinel included).
///
/// Returns false when the delimiter is missing, sits further than
/// [`MAX_DELIMITER_OFFSET`] bytes from the start, is not followed by two hex
/// digits, or the value does not match the XOR of the bytes between the
/// sentinel and the delimiter. Anything after the two digits other than
/// whitespace also fails.
pub fn validate(line: &str) -> bool {
    let bytes = line.as_bytes();
    if bytes.is_empty() {
        return false;
    }

    let star = match bytes.iter().position(|&b| b == b'*') {
        Some(pos) if pos <= MAX_DELIMITER_OFFSET => pos,
        _ => return false,
    };

    match parse_hex_byte(&bytes[star + 1..]) {
        Some(provided) => calculate(&bytes[1..star]) == provided,
        None => false,
    }
}

/// Build a complete sentence from its body (without sentinel or checksum).
///
/// `with_checksum('$', "PMAR,Server Full")` yields `"$PMAR,Server Full*hh"`.
pub fn with_checksum(sentinel: char, body: &str) -> String {
    format!("{}{}*{:02X}", sentinel, body, calculate(body.as_bytes()))
}

/// Exactly two hex digits; only whitespace may follow them.
fn parse_hex_byte(s: &[u8]) -> Option<u8> {
    let [hi, lo, rest @ ..] = s else {
        return None;
    };
    if !rest.iter().all(u8::is_ascii_whitespace) {
        return None;
    }
    Some(hex_digit(*hi)? << 4 | hex_digit(*lo)?)
}

fn hex_digit(c: u8) -> Option<u8> {
    match c {
        b'0'..=b'9' => Some(c - b'0'),
        b'A'..=b'F' => Some(c - b'A' + 10),
        b'a'..=b'f' => Some(c - b'a' + 10),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_sentence_is_valid() {
        assert!(validate("$GPGGA,123519,4807.038,N,01131.000,E,1,08,0.9,545.4,M,46.9,M,,*47"));
        assert!(validate("!AIVDM,1,1,,B,177KQJ5000G?tO`K>RA1wUbN0TKH,0*5C"));
    }

    #[test]
    fn test_lowercase_hex_accepted() {
        assert!(validate("!AIVDM,1,1,,B,177KQJ5000G?tO`K>RA1wUbN0TKH,0*5c"));
    }

    #[test]
    fn test_mismatch_rejected() {
        assert!(!validate("$GPGGA,123519,4807.038,N,01131.000,E,1,08,0.9,545.4,M,46.9,M,,*48"));
    }

    #[test]
    fn test_missing_delimiter_rejected() {
        assert!(!validate("$GPHDT,274.07,T"));
        assert!(!validate(""));
    }

    #[test]
    fn test_truncated_checksum_rejected() {
        assert!(!validate("$GPHDT,274.07,T*0"));
        assert!(!validate("$GPHDT,274.07,T*"));
        assert!(!validate("$GPHDT,274.07,T*G3"));
    }

    #[test]
    fn test_trailing_garbage_after_checksum_rejected() {
        assert!(!validate("$GPHDT,274.07,T*03X"));
        assert!(!validate("$GPHDT,274.07,T*034"));
        assert!(!validate("$GPHDT,274.07,T*03*03"));
        assert!(validate("$GPHDT,274.07,T*03 "));
        assert!(validate("$GPHDT,274.07,T*03\r\n"));
    }

    #[test]
    fn test_delimiter_too_far_rejected() {
        let body = format!("GPTXT,{}", "A".repeat(80));
        let line = with_checksum('$', &body);
        assert!(line.find('*').unwrap() > MAX_DELIMITER_OFFSET);
        assert!(!validate(&line));
    }

    #[test]
    fn test_checksum_matches_xor_for_all_bodies() {
        for body in ["GPHDT,1.0,T", "IIMWV,045,R,10.0,N,A", "PMAR,Server Full", ""] {
            let expected = calculate(body.as_bytes());
            for candidate in 0..=255u8 {
                let line = format!("${}*{:02X}", body, candidate);
                assert_eq!(validate(&line), candidate == expected, "{}", line);
            }
        }
    }

    #[test]
    fn test_with_checksum_round_trips() {
        let line = with_checksum('$', "PMAR,Marine Gateway Connected");
        assert!(line.starts_with("$PMAR,Marine Gateway Connected*"));
        assert!(validate(&line));
    }
}
