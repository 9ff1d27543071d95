use encoding_rs::Encoding;

#[inline(always)]
fn is_trail(b: u8) -> bool {
    b >> 6 == 0b10
}

/// Number of continuation bytes announced by a lead byte, or `None` if `b`
/// cannot start a character.
#[inline(always)]
fn trail_len(b: u8) -> Option<usize> {
    if b >> 7 == 0 {
        Some(0)
    } else if b >> 5 == 0b110 {
        Some(1)
    } else if b >> 4 == 0b1110 {
        Some(2)
    } else if b >> 3 == 0b11110 {
        Some(3)
    } else {
        None
    }
}

/// Checks whether `buffer` has the byte structure of UTF-8: every lead byte
/// is followed by exactly as many continuation bytes as it announces.
///
/// Only the bit patterns are examined. Overlong forms, surrogates and
/// values above U+10FFFF pass. A character cut off by the end of the buffer
/// fails.
pub fn is_utf8(buffer: &[u8]) -> bool {
    let mut i = Encoding::ascii_valid_up_to(buffer);
    while i < buffer.len() {
        let end = match trail_len(buffer[i]) {
            Some(trail) => i + 1 + trail,
            None => return false,
        };
        if end > buffer.len() {
            return false;
        }
        if !buffer[i + 1..end].iter().all(|&b| is_trail(b)) {
            return false;
        }
        i = end;
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use encoding_rs::KOI8_R;
    use encoding_rs::WINDOWS_1251;

    const MIXED: &str = "asdadЯЯЯВВВВWУУУУффff23ййй23";

    #[test]
    fn test_empty() {
        assert!(is_utf8(b""));
    }

    #[test]
    fn test_ascii() {
        assert!(is_utf8(b"asdadasdWWWW12!!!@@@###$$3123"));
        assert!(is_utf8(b"\x00\x7F"));
    }

    #[test]
    fn test_multi_byte() {
        assert!(is_utf8(MIXED.as_bytes()));
        assert!(is_utf8("中国　朝鮮半島の六カ国協議再開を呼びかけ".as_bytes()));
        assert!(is_utf8("ёж 🦔".as_bytes()));
    }

    #[test]
    fn test_single_byte_cyrillic() {
        let (bytes, _, _) = KOI8_R.encode(MIXED);
        assert!(!is_utf8(&bytes));
        let (bytes, _, _) = WINDOWS_1251.encode(MIXED);
        assert!(!is_utf8(&bytes));
        let (bytes, _, _) = WINDOWS_1251.encode("как жрать суши");
        assert!(!is_utf8(&bytes));
    }

    #[test]
    fn test_truncated() {
        assert!(!is_utf8(b"\xD0"));
        assert!(!is_utf8(b"ab\xE2\x82"));
        assert!(!is_utf8(b"\xF0\x9F\xA6"));
    }

    #[test]
    fn test_bad_trail() {
        assert!(!is_utf8(b"\xD0A"));
        assert!(!is_utf8(b"\xE2\x82A"));
        assert!(!is_utf8(b"\xF0\x9F\xA6\xC0"));
        assert!(!is_utf8(b"\xD0\xD0"));
    }

    #[test]
    fn test_bad_lead() {
        assert!(!is_utf8(b"\x80"));
        assert!(!is_utf8(b"a\xBFb"));
        assert!(!is_utf8(b"\xF8\x80\x80\x80\x80"));
        assert!(!is_utf8(b"\xFF"));
    }

    #[test]
    fn test_structural_only() {
        // Overlong NUL
        assert!(is_utf8(b"\xC0\x80"));
        // Surrogate
        assert!(is_utf8(b"\xED\xA0\x80"));
        // Above U+10FFFF
        assert!(is_utf8(b"\xF4\x90\x80\x80"));
    }
}
