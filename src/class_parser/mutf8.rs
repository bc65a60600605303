//! Modified UTF-8 as used by `CONSTANT_Utf8` entries: NUL is encoded as `C0 80`,
//! supplementary characters as surrogate pairs, and only the 1, 2 and 3 byte forms
//! exist.

/// Decodes one UTF-16 code unit, returning it and the number of bytes it used.
/// Every unit has exactly one encoding: the 2 byte form is only used for NUL and
/// U+0080..U+07FF, the 3 byte form only for U+0800 and above.
pub fn next_unit(bytes: &[u8]) -> Option<(u16, usize)> {
    let b0 = *bytes.first()?;

    match b0 {
        0x01..=0x7F => Some((b0 as u16, 1)),
        0xC0..=0xDF => {
            let b1 = continuation(bytes, 1)?;
            let unit = ((b0 as u16 & 0x1F) << 6) | b1;
            (unit == 0 || unit >= 0x80).then(|| (unit, 2))
        }
        0xE0..=0xEF => {
            let b1 = continuation(bytes, 1)?;
            let b2 = continuation(bytes, 2)?;
            let unit = ((b0 as u16 & 0x0F) << 12) | (b1 << 6) | b2;
            (unit >= 0x800).then(|| (unit, 3))
        }
        // 0x00, stray continuation bytes and 0xF0..=0xFF never appear
        _ => None,
    }
}

fn continuation(bytes: &[u8], at: usize) -> Option<u16> {
    match bytes.get(at) {
        Some(b) if b & 0xC0 == 0x80 => Some((b & 0x3F) as u16),
        _ => None,
    }
}

/// Returns the offset of the first malformed sequence, if any.
pub fn validate(bytes: &[u8]) -> Result<(), usize> {
    let mut offset = 0;
    while offset < bytes.len() {
        match next_unit(&bytes[offset..]) {
            Some((_, used)) => offset += used,
            None => return Err(offset),
        }
    }

    Ok(())
}

/// Decodes a well-formed payload. Unpaired surrogates become U+FFFD.
pub fn decode(bytes: &[u8]) -> Option<String> {
    let mut units = Vec::with_capacity(bytes.len());
    let mut rest = bytes;
    while !rest.is_empty() {
        let (unit, used) = next_unit(rest)?;
        units.push(unit);
        rest = &rest[used..];
    }

    Some(String::from_utf16_lossy(&units))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn is_valid(bytes: &[u8]) -> bool {
        validate(bytes).is_ok()
    }

    // Inverse of `decode`
    fn encode(s: &str) -> Vec<u8> {
        let mut out = Vec::with_capacity(s.len());
        for unit in s.encode_utf16() {
            match unit {
                0x0001..=0x007F => out.push(unit as u8),
                0x0000 | 0x0080..=0x07FF => {
                    out.push(0xC0 | (unit >> 6) as u8);
                    out.push(0x80 | (unit & 0x3F) as u8);
                }
                _ => {
                    out.push(0xE0 | (unit >> 12) as u8);
                    out.push(0x80 | ((unit >> 6) & 0x3F) as u8);
                    out.push(0x80 | (unit & 0x3F) as u8);
                }
            }
        }

        out
    }

    #[test]
    fn raw_nul_is_rejected() {
        assert_eq!(validate(b"ab\0c"), Err(2));
        assert!(is_valid(&[0xC0, 0x80]));
        assert_eq!(decode(&[b'a', 0xC0, 0x80]).unwrap(), "a\0");
    }

    #[test]
    fn four_byte_forms_are_rejected() {
        assert!(!is_valid(&[0xF0, 0x9F, 0x98, 0x80]));
        assert!(!is_valid(&[0xE2, 0x82]));
        assert!(!is_valid(&[0x80]));
    }

    #[test]
    fn overlong_forms_are_rejected() {
        assert_eq!(validate(&[0xC1, 0x81]), Err(0));
        assert_eq!(validate(&[b'a', 0xE0, 0x80, 0x80]), Err(1));
        assert_eq!(validate(&[0xE0, 0x9F, 0xBF]), Err(0));
        assert!(is_valid(&[0xC2, 0x80]));
        assert!(is_valid(&[0xE0, 0xA0, 0x80]));
        assert_eq!(decode(&[0xC1, 0x81]), None);
    }

    #[test]
    fn supplementary_characters_use_surrogate_pairs() {
        let encoded = encode("x\u{1F600}");
        assert_eq!(encoded.len(), 1 + 6);
        assert!(is_valid(&encoded));
        assert_eq!(decode(&encoded).unwrap(), "x\u{1F600}");
        assert_eq!(decode(&encode("é€")).unwrap(), "é€");
    }
}
