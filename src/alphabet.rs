use crate::error::Error;
use crate::error::Result;
use encoding_rs::Encoding;

/// Upper-case letters followed by lower-case letters in the same order.
/// Ё/ё are left out and folded into Е below.
const ALPHABET: &str = "АБВГДЕЖЗИЙКЛМНОПРСТУФХЦЧШЩЪЫЬЭЮЯабвгдежзийклмнопрстуфхцчшщъыьэюя";

const YO: &str = "ёЁ";

/// Index of Е
const YO_INDEX: i8 = 5;

/// Number of letters in the alphabet.
pub const CHARS_NUM: usize = 32;

pub const DIGRAM_TABLE_LEN: usize = CHARS_NUM * CHARS_NUM;

pub const TRIGRAM_TABLE_LEN: usize = CHARS_NUM * CHARS_NUM * CHARS_NUM;

/// End boundaries first, then start boundaries offset by `TRIGRAM_TABLE_LEN`.
pub const BOUNDARY_TABLE_LEN: usize = 2 * TRIGRAM_TABLE_LEN;

pub const NOT_A_LETTER: i8 = -1;

/// Maps each byte of a single-byte encoding to the position of the letter it
/// encodes in the 32-letter alphabet, or to `NOT_A_LETTER`. Upper and lower
/// case share a position.
#[derive(Clone)]
pub struct AlphabetIndex {
    table: [i8; 256],
}

impl AlphabetIndex {
    /// Builds the table by encoding the alphabet with `encoding`.
    ///
    /// Fails if `encoding` is not single-byte or cannot represent every
    /// letter of the alphabet.
    pub fn new(encoding: &'static Encoding) -> Result<Self> {
        if !encoding.is_single_byte() {
            return Err(Error::UnsupportedEncoding(encoding.name()));
        }
        let (letters, _, letters_unmappable) = encoding.encode(ALPHABET);
        let (yo, _, yo_unmappable) = encoding.encode(YO);
        if letters_unmappable || yo_unmappable || letters.len() != 2 * CHARS_NUM {
            return Err(Error::UnsupportedEncoding(encoding.name()));
        }

        let mut table = [NOT_A_LETTER; 256];
        for i in 0..CHARS_NUM {
            table[letters[i] as usize] = i as i8;
            table[letters[i + CHARS_NUM] as usize] = i as i8;
        }
        for &b in yo.iter() {
            table[b as usize] = YO_INDEX;
        }
        Ok(AlphabetIndex { table })
    }

    #[inline(always)]
    pub fn index_of(&self, b: u8) -> i8 {
        self.table[b as usize]
    }
}

#[inline(always)]
pub fn digram_index(i1: i8, i2: i8) -> usize {
    debug_assert!(i1 >= 0 && i2 >= 0);
    i1 as usize * CHARS_NUM + i2 as usize
}

#[inline(always)]
pub fn trigram_index(i1: i8, i2: i8, i3: i8) -> usize {
    debug_assert!(i1 >= 0 && i2 >= 0 && i3 >= 0);
    i1 as usize * CHARS_NUM * CHARS_NUM + i2 as usize * CHARS_NUM + i3 as usize
}

/// The last three letters of a word.
#[inline(always)]
pub fn end_boundary_index(i1: i8, i2: i8, i3: i8) -> usize {
    trigram_index(i1, i2, i3)
}

/// The first three letters of a word.
#[inline(always)]
pub fn start_boundary_index(i2: i8, i3: i8, i4: i8) -> usize {
    TRIGRAM_TABLE_LEN + trigram_index(i2, i3, i4)
}
